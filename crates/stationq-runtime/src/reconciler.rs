//! Queue state reconciler
//!
//! Owns the visible ordering of the selected station queue and keeps it
//! consistent with the server under concurrent edits:
//!
//! - local reorders are applied optimistically, renumbered and published
//!   before the full ordered id list is submitted
//! - while a reorder is in flight, snapshot pushes and `queue_reordered`
//!   refetches are suppressed and the queue is marked stale, so it is
//!   refetched once the reorder settles
//! - a rejected reorder is rolled back by refetching the authoritative order
//! - local actions are serialised by a submission gate; a queued action
//!   re-resolves its entry by identity once it runs
//! - completions for a station that is no longer selected are ignored
//!
//! State sits behind an async mutex that is never held across a request.

use std::sync::Arc;

use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

use stationq_core::reorder::{entry_ids, move_entry, position_of, renumber};
use stationq_core::{
    DomainEvent, EntryId, QueueApi, QueueEntry, Result, ServerFrame, StationId, StationSummary,
    StationqError,
};

// ----------------------------------------------------------------------------
// Published State
// ----------------------------------------------------------------------------

/// Visible queue state published after every change
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueueSnapshot {
    pub station: Option<StationId>,
    pub entries: Vec<QueueEntry>,
    /// A local reorder is awaiting server confirmation
    pub reordering: bool,
    /// Incremented on every publish
    pub revision: u64,
}

impl QueueSnapshot {
    pub fn ids(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.id.as_str()).collect()
    }
}

/// What a push frame did to the visible queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// Embedded list replaced the visible queue
    Replaced,
    /// Dropped because a local reorder is in flight
    Suppressed,
    /// Queue refetched from the server
    Refetched,
    /// Only station summaries were refreshed
    SummariesRefreshed,
    /// Not relevant to the queue
    Ignored,
}

// ----------------------------------------------------------------------------
// Reconciler
// ----------------------------------------------------------------------------

#[derive(Default)]
struct ReconcilerState {
    selected: Option<StationId>,
    entries: Vec<QueueEntry>,
    reordering: bool,
    /// A suppressed update arrived during the current reorder
    stale: bool,
    /// Bumped on every station change
    epoch: u64,
    revision: u64,
}

/// Where a queued move should land, resolved once the gate is held
#[derive(Debug, Clone, Copy)]
enum Target {
    Index(usize),
    Up,
    Down,
}

/// Station identity captured when an operation starts
struct Selection {
    station: StationId,
    epoch: u64,
}

pub struct Reconciler {
    api: Arc<dyn QueueApi>,
    state: Mutex<ReconcilerState>,
    gate: Mutex<()>,
    snapshots: watch::Sender<QueueSnapshot>,
    summaries: watch::Sender<Vec<StationSummary>>,
}

impl Reconciler {
    pub fn new(api: Arc<dyn QueueApi>) -> Self {
        let (snapshots, _) = watch::channel(QueueSnapshot::default());
        let (summaries, _) = watch::channel(Vec::new());
        Self {
            api,
            state: Mutex::new(ReconcilerState::default()),
            gate: Mutex::new(()),
            snapshots,
            summaries,
        }
    }

    /// Current visible state
    pub fn snapshot(&self) -> QueueSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Receive every published state
    pub fn subscribe(&self) -> watch::Receiver<QueueSnapshot> {
        self.snapshots.subscribe()
    }

    pub fn summaries(&self) -> Vec<StationSummary> {
        self.summaries.borrow().clone()
    }

    pub fn subscribe_summaries(&self) -> watch::Receiver<Vec<StationSummary>> {
        self.summaries.subscribe()
    }

    // ------------------------------------------------------------------------
    // Selection and Fetching
    // ------------------------------------------------------------------------

    /// Discard the current queue, select `station` and fetch its queue
    pub async fn select_station(&self, station: StationId) -> Result<()> {
        {
            let mut state = self.state.lock().await;
            state.selected = Some(station.clone());
            state.epoch += 1;
            state.entries.clear();
            state.reordering = false;
            state.stale = false;
            self.publish(&mut state);
        }
        info!(%station, "Station selected");
        self.refresh().await
    }

    /// Discard the current queue without selecting another station
    pub async fn clear_selection(&self) {
        let mut state = self.state.lock().await;
        state.selected = None;
        state.epoch += 1;
        state.entries.clear();
        state.reordering = false;
        state.stale = false;
        self.publish(&mut state);
    }

    /// Replace the visible queue with the server's order
    pub async fn refresh(&self) -> Result<()> {
        let selection = self.selection().await?;
        self.refetch(&selection, false).await.map(|_| ())
    }

    pub async fn refresh_summaries(&self) -> Result<()> {
        let summaries = self.api.fetch_summaries().await?;
        debug!(count = summaries.len(), "Station summaries refreshed");
        self.summaries.send_replace(summaries);
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Local Actions
    // ------------------------------------------------------------------------

    /// Move the entry at `from` to `to`, optimistically
    ///
    /// On rejection the authoritative order is refetched before the error is
    /// returned.
    pub async fn reorder(&self, from: usize, to: usize) -> Result<()> {
        if from == to {
            return Ok(());
        }
        let (selection, moved) = {
            let state = self.state.lock().await;
            let station = state.selected.clone().ok_or(StationqError::NoStationSelected)?;
            let len = state.entries.len();
            if from >= len || to >= len {
                return Err(StationqError::invalid_move(from, to, len));
            }
            let selection = Selection {
                station,
                epoch: state.epoch,
            };
            (selection, state.entries[from].id.clone())
        };
        self.reorder_entry(selection, moved, Target::Index(to)).await
    }

    /// Move an entry one place towards the front
    pub async fn move_up(&self, entry: &EntryId) -> Result<()> {
        let selection = self.locate(entry).await?;
        self.reorder_entry(selection, entry.clone(), Target::Up).await
    }

    /// Move an entry one place towards the back
    pub async fn move_down(&self, entry: &EntryId) -> Result<()> {
        let selection = self.locate(entry).await?;
        self.reorder_entry(selection, entry.clone(), Target::Down).await
    }

    /// Remove an entry; local state is unchanged when the server rejects it
    pub async fn delete(&self, entry: &EntryId) -> Result<()> {
        let selection = self.selection().await?;
        let _gate = self.gate.lock().await;

        self.api
            .delete_entry(&selection.station, entry)
            .await
            .map_err(|source| {
                warn!(station = %selection.station, %entry, error = %source, "Delete rejected");
                StationqError::DeleteRejected {
                    entry: entry.clone(),
                    source,
                }
            })?;
        info!(station = %selection.station, %entry, "Entry deleted");

        if let Err(e) = self.refetch(&selection, false).await {
            warn!(error = %e, "Refetch after delete failed, removing locally");
            let mut state = self.state.lock().await;
            if state.epoch == selection.epoch {
                state.entries.retain(|candidate| &candidate.id != entry);
                renumber(&mut state.entries);
                self.publish(&mut state);
            }
        }
        self.refresh_summaries_logged().await;
        Ok(())
    }

    /// Insert or replace an entry in the visible queue
    pub async fn add(&self, entry: QueueEntry) {
        let mut state = self.state.lock().await;
        if state.selected.is_none() {
            debug!(entry = %entry.id, "No station selected, ignoring added entry");
            return;
        }
        match position_of(&state.entries, &entry.id) {
            Some(index) => state.entries[index] = entry,
            None => state.entries.push(entry),
        }
        renumber(&mut state.entries);
        self.publish(&mut state);
    }

    /// Enter a vehicle into the selected station's queue
    pub async fn add_vehicle(&self, vehicle_id: &str, station_name: &str) -> Result<QueueEntry> {
        let selection = self.selection().await?;
        let entry = {
            let _gate = self.gate.lock().await;
            let entry = self
                .api
                .add_vehicle(&selection.station, vehicle_id, station_name)
                .await?;
            info!(station = %selection.station, entry = %entry.id, vehicle_id, "Vehicle queued");
            if self.is_current(selection.epoch).await {
                self.add(entry.clone()).await;
            }
            entry
        };

        if let Err(e) = self.refetch(&selection, true).await {
            warn!(error = %e, "Refetch after add failed");
        }
        self.refresh_summaries_logged().await;
        Ok(entry)
    }

    // ------------------------------------------------------------------------
    // Push Reconciliation
    // ------------------------------------------------------------------------

    /// Reconcile a pushed frame with the visible queue
    pub async fn apply_push(&self, frame: &ServerFrame) -> PushOutcome {
        let Some(event) = frame.event() else {
            return PushOutcome::Ignored;
        };

        if event.is_queue_event() {
            if let Some(queue) = frame.embedded_queue() {
                let mut state = self.state.lock().await;
                if state.selected.is_none() {
                    return PushOutcome::Ignored;
                }
                if state.reordering {
                    debug!(%event, "Reorder in flight, suppressing snapshot");
                    state.stale = true;
                    return PushOutcome::Suppressed;
                }
                state.entries = queue.to_vec();
                renumber(&mut state.entries);
                self.publish(&mut state);
                debug!(%event, count = state.entries.len(), "Snapshot applied");
                return PushOutcome::Replaced;
            }
        }

        match event {
            DomainEvent::QueueReordered => self.refetch_from_push(event).await,
            DomainEvent::QueueEntryAdded | DomainEvent::QueueEntryRemoved => {
                self.refresh_summaries_logged().await;
                let selected = self.state.lock().await.selected.clone();
                match (frame.destination(), selected) {
                    (Some(destination), Some(selected)) if *destination == selected => {
                        self.refetch_from_push(event).await
                    }
                    _ => PushOutcome::SummariesRefreshed,
                }
            }
            _ => PushOutcome::Ignored,
        }
    }

    async fn refetch_from_push(&self, event: DomainEvent) -> PushOutcome {
        let selection = {
            let mut state = self.state.lock().await;
            let Some(station) = state.selected.clone() else {
                return PushOutcome::Ignored;
            };
            if state.reordering {
                debug!(%event, "Reorder in flight, deferring refetch");
                state.stale = true;
                return PushOutcome::Suppressed;
            }
            Selection {
                station,
                epoch: state.epoch,
            }
        };
        match self.refetch(&selection, true).await {
            Ok(true) => PushOutcome::Refetched,
            Ok(false) => PushOutcome::Suppressed,
            Err(e) => {
                warn!(%event, error = %e, "Refetch after push failed");
                PushOutcome::Ignored
            }
        }
    }

    // ------------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------------

    async fn reorder_entry(&self, selection: Selection, moved: EntryId, to: Target) -> Result<()> {
        let _gate = self.gate.lock().await;

        let (order, previous) = {
            let mut state = self.state.lock().await;
            if state.epoch != selection.epoch {
                debug!(entry = %moved, "Station changed while queued, dropping move");
                return Ok(());
            }
            let Some(from) = position_of(&state.entries, &moved) else {
                debug!(entry = %moved, "Entry vanished while queued, dropping move");
                return Ok(());
            };
            let last = state.entries.len() - 1;
            let target = match to {
                Target::Index(index) => index.min(last),
                Target::Up => from.saturating_sub(1),
                Target::Down => (from + 1).min(last),
            };
            let previous = state.entries.clone();
            if !move_entry(&mut state.entries, from, target)? {
                return Ok(());
            }
            renumber(&mut state.entries);
            state.reordering = true;
            state.stale = false;
            self.publish(&mut state);
            (entry_ids(&state.entries), previous)
        };

        info!(station = %selection.station, entry = %moved, ?to, "Submitting reorder");
        let result = self.api.submit_reorder(&selection.station, &order).await;

        match result {
            Ok(()) => {
                let stale = {
                    let mut state = self.state.lock().await;
                    if state.epoch != selection.epoch {
                        return Ok(());
                    }
                    state.reordering = false;
                    self.publish(&mut state);
                    std::mem::take(&mut state.stale)
                };
                if stale {
                    debug!(station = %selection.station, "Catching up on updates suppressed during reorder");
                    if let Err(e) = self.refetch(&selection, true).await {
                        warn!(error = %e, "Refetch after reorder failed");
                    }
                }
                Ok(())
            }
            Err(source) => {
                warn!(station = %selection.station, error = %source, "Reorder rejected, restoring server order");
                let restored = self.refetch(&selection, false).await;
                let mut state = self.state.lock().await;
                if state.epoch == selection.epoch {
                    state.reordering = false;
                    state.stale = false;
                    if let Err(e) = restored {
                        warn!(error = %e, "Refetch after rejected reorder failed, restoring previous order");
                        state.entries = previous;
                    }
                    self.publish(&mut state);
                }
                Err(StationqError::ReorderRejected {
                    station: selection.station,
                    source,
                })
            }
        }
    }

    /// Fetch and apply the server order; `Ok(false)` when it was not applied
    async fn refetch(&self, selection: &Selection, yield_to_reorder: bool) -> Result<bool> {
        let mut entries = self.api.fetch_queue(&selection.station).await?;
        let mut state = self.state.lock().await;
        if state.epoch != selection.epoch {
            debug!(station = %selection.station, "Discarding fetch for deselected station");
            return Ok(false);
        }
        if yield_to_reorder && state.reordering {
            state.stale = true;
            return Ok(false);
        }
        renumber(&mut entries);
        state.entries = entries;
        self.publish(&mut state);
        Ok(true)
    }

    async fn refresh_summaries_logged(&self) {
        if let Err(e) = self.refresh_summaries().await {
            warn!(error = %e, "Summary refresh failed");
        }
    }

    async fn selection(&self) -> Result<Selection> {
        let state = self.state.lock().await;
        let station = state.selected.clone().ok_or(StationqError::NoStationSelected)?;
        Ok(Selection {
            station,
            epoch: state.epoch,
        })
    }

    async fn locate(&self, entry: &EntryId) -> Result<Selection> {
        let state = self.state.lock().await;
        let station = state.selected.clone().ok_or(StationqError::NoStationSelected)?;
        if position_of(&state.entries, entry).is_none() {
            return Err(StationqError::EntryNotFound {
                entry: entry.clone(),
            });
        }
        Ok(Selection {
            station,
            epoch: state.epoch,
        })
    }

    async fn is_current(&self, epoch: u64) -> bool {
        self.state.lock().await.epoch == epoch
    }

    fn publish(&self, state: &mut ReconcilerState) {
        state.revision += 1;
        self.snapshots.send_replace(QueueSnapshot {
            station: state.selected.clone(),
            entries: state.entries.clone(),
            reordering: state.reordering,
            revision: state.revision,
        });
    }
}
