//! Heartbeat policy.
//!
//! A session that sends nothing for two intervals is considered dead. With
//! [`HeartbeatMechanism::Tick`] the server also pings on every interval;
//! client pings are answered by the WebSocket layer either way.

use tokio::time::{interval_at, Duration, Instant, Interval, MissedTickBehavior};

use crate::config::HeartbeatMechanism;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Heartbeat {
    interval: Duration,
    mechanism: HeartbeatMechanism,
}

impl Heartbeat {
    pub fn new(interval: Duration, mechanism: HeartbeatMechanism) -> Self {
        Self { interval, mechanism }
    }

    pub fn is_enabled(&self) -> bool {
        !self.interval.is_zero()
    }

    /// Idle time after which a session is dropped.
    pub fn timeout(&self) -> Duration {
        self.interval * 2
    }

    pub fn sends_ping(&self) -> bool {
        self.mechanism == HeartbeatMechanism::Tick
    }

    pub fn is_expired(&self, last_seen: Instant, now: Instant) -> bool {
        self.is_enabled() && now.saturating_duration_since(last_seen) > self.timeout()
    }

    /// Ticker for the session loop, first tick one interval from now.
    pub fn ticker(&self) -> Option<Interval> {
        self.is_enabled().then(|| {
            let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker
        })
    }
}
