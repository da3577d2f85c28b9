//! REST collaborator abstraction
//!
//! The reconciler consumes queue service endpoints through [`QueueApi`] so the
//! HTTP client can be swapped for a scripted one in tests.

use async_trait::async_trait;

use crate::errors::ApiResult;
use crate::types::{EntryId, QueueEntry, StationId, StationSummary};

// ----------------------------------------------------------------------------
// Queue API Trait
// ----------------------------------------------------------------------------

/// Request/response endpoints of the queue service
#[async_trait]
pub trait QueueApi: Send + Sync {
    /// Fetch the authoritative ordered queue of a station
    async fn fetch_queue(&self, station: &StationId) -> ApiResult<Vec<QueueEntry>>;

    /// Submit the complete ordered identity list of a station
    async fn submit_reorder(&self, station: &StationId, order: &[EntryId]) -> ApiResult<()>;

    /// Remove an entry from a station queue
    async fn delete_entry(&self, station: &StationId, entry: &EntryId) -> ApiResult<()>;

    /// Fetch per-station aggregates
    async fn fetch_summaries(&self) -> ApiResult<Vec<StationSummary>>;

    /// Enter a vehicle into a station queue
    async fn add_vehicle(
        &self,
        station: &StationId,
        vehicle_id: &str,
        station_name: &str,
    ) -> ApiResult<QueueEntry>;
}
