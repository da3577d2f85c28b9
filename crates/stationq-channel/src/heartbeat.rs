//! Heartbeat monitor
//!
//! Owns the ping and health check timers of one channel. Timers exist only
//! between [`HeartbeatMonitor::start`] and [`HeartbeatMonitor::stop`], so a
//! stopped monitor never ticks and nothing carries over to the next connection
//! except the last measured latency.

use std::time::Duration;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

use stationq_core::HeartbeatConfig;

/// Timer that fired
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatTick {
    /// Send a ping
    Ping,
    /// Verify the connection is still open
    HealthCheck,
}

struct Timers {
    ping: Interval,
    health: Interval,
}

pub struct HeartbeatMonitor {
    config: HeartbeatConfig,
    timers: Option<Timers>,
    last_ping: Option<Instant>,
    latency: Duration,
}

impl HeartbeatMonitor {
    pub fn new(config: HeartbeatConfig) -> Self {
        Self {
            config,
            timers: None,
            last_ping: None,
            latency: Duration::ZERO,
        }
    }

    /// Arm both timers; each first fires one period from now
    pub fn start(&mut self) {
        let now = Instant::now();
        let mut ping = interval_at(now + self.config.ping_interval, self.config.ping_interval);
        let mut health = interval_at(
            now + self.config.health_check_interval,
            self.config.health_check_interval,
        );
        ping.set_missed_tick_behavior(MissedTickBehavior::Delay);
        health.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.timers = Some(Timers { ping, health });
        self.last_ping = None;
    }

    /// Drop both timers (idempotent)
    pub fn stop(&mut self) {
        self.timers = None;
        self.last_ping = None;
    }

    pub fn is_running(&self) -> bool {
        self.timers.is_some()
    }

    /// Wait for the next timer; pending forever while stopped
    pub async fn next_tick(&mut self) -> HeartbeatTick {
        match self.timers.as_mut() {
            Some(timers) => tokio::select! {
                _ = timers.ping.tick() => HeartbeatTick::Ping,
                _ = timers.health.tick() => HeartbeatTick::HealthCheck,
            },
            None => std::future::pending().await,
        }
    }

    /// Note that a ping just went out
    pub fn record_ping(&mut self) {
        self.last_ping = Some(Instant::now());
    }

    /// Measure latency from the outstanding ping; `None` when none is outstanding
    pub fn on_pong(&mut self) -> Option<Duration> {
        let sent = self.last_ping.take()?;
        self.latency = sent.elapsed();
        Some(self.latency)
    }

    /// Last measured round trip
    pub fn latency(&self) -> Duration {
        self.latency
    }

    pub fn latency_ms(&self) -> u64 {
        self.latency.as_millis() as u64
    }
}
