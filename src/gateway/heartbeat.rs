use std::time::Duration;

use tokio::time::{self, Instant, Interval, MissedTickBehavior};

pub const DEFAULT_MAX_MISSED_ACKS: u32 = 2;

/// What the connection should do when the heartbeat timer fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Beat {
    /// Send a heartbeat frame.
    Due,
    /// Too many heartbeats went unacknowledged; the connection is a zombie.
    Missed { outstanding: u32 },
}

/// Fixed-cadence heartbeat timer for one connection.
///
/// Holds at most one timer: `start` replaces it, `stop` drops it. The timer is
/// polled from the connection's event loop through [`HeartbeatScheduler::tick`],
/// so dropping it is all the cancellation needed.
#[derive(Debug)]
pub struct HeartbeatScheduler {
    timer: Option<Interval>,
    max_missed_acks: u32,
    outstanding: u32,
    last_sent: Option<Instant>,
    latency: Option<Duration>,
}

impl HeartbeatScheduler {
    pub fn new(max_missed_acks: u32) -> Self {
        Self {
            timer: None,
            max_missed_acks: max_missed_acks.max(1),
            outstanding: 0,
            last_sent: None,
            latency: None,
        }
    }

    /// Start beating every `period`; the first tick fires one full period from
    /// now. Any previous timer is dropped first.
    pub fn start(&mut self, period: Duration) {
        self.stop();
        let mut timer = time::interval_at(Instant::now() + period, period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.timer = Some(timer);
    }

    pub fn stop(&mut self) {
        self.timer = None;
        self.outstanding = 0;
        self.last_sent = None;
    }

    /// Current beat period, `None` while stopped.
    pub fn period(&self) -> Option<Duration> {
        self.timer.as_ref().map(Interval::period)
    }

    /// Wait for the next tick. Pends forever while stopped.
    pub async fn tick(&mut self) -> Beat {
        match self.timer.as_mut() {
            Some(timer) => {
                timer.tick().await;
            }
            None => std::future::pending::<()>().await,
        }

        if self.outstanding >= self.max_missed_acks {
            Beat::Missed {
                outstanding: self.outstanding,
            }
        } else {
            Beat::Due
        }
    }

    pub fn record_sent(&mut self) {
        self.outstanding += 1;
        self.last_sent = Some(Instant::now());
    }

    pub fn record_ack(&mut self) {
        self.outstanding = 0;
        if let Some(sent) = self.last_sent {
            self.latency = Some(sent.elapsed());
        }
    }

    /// Round-trip time of the most recently acknowledged heartbeat.
    pub fn latency(&self) -> Option<Duration> {
        self.latency
    }
}

impl Default for HeartbeatScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_MISSED_ACKS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_first_tick_waits_a_full_period() {
        let mut hb = HeartbeatScheduler::default();
        let started = Instant::now();
        hb.start(Duration::from_millis(41_250));

        assert_eq!(hb.tick().await, Beat::Due);
        assert!(started.elapsed() >= Duration::from_millis(41_250));
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_replaces_the_period() {
        let mut hb = HeartbeatScheduler::default();
        hb.start(Duration::from_secs(10));
        hb.start(Duration::from_secs(3));
        assert_eq!(hb.period(), Some(Duration::from_secs(3)));

        let started = Instant::now();
        hb.tick().await;
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(3) && elapsed < Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stopped_scheduler_never_ticks() {
        let mut hb = HeartbeatScheduler::default();
        hb.start(Duration::from_millis(100));
        hb.stop();
        hb.stop();
        assert_eq!(hb.period(), None);

        let result = time::timeout(Duration::from_secs(60), hb.tick()).await;
        assert!(result.is_err(), "stopped scheduler must not tick");
    }

    #[tokio::test(start_paused = true)]
    async fn test_reports_missed_acks_at_limit() {
        let mut hb = HeartbeatScheduler::new(2);
        hb.start(Duration::from_millis(100));

        assert_eq!(hb.tick().await, Beat::Due);
        hb.record_sent();
        assert_eq!(hb.tick().await, Beat::Due);
        hb.record_sent();
        assert_eq!(hb.tick().await, Beat::Missed { outstanding: 2 });
    }

    #[tokio::test(start_paused = true)]
    async fn test_ack_resets_outstanding_and_records_latency() {
        let mut hb = HeartbeatScheduler::new(1);
        hb.start(Duration::from_millis(100));

        hb.tick().await;
        hb.record_sent();
        time::advance(Duration::from_millis(30)).await;
        hb.record_ack();

        assert_eq!(hb.latency(), Some(Duration::from_millis(30)));
        assert_eq!(hb.tick().await, Beat::Due);
    }

    #[test]
    fn test_zero_missed_acks_is_clamped() {
        let hb = HeartbeatScheduler::new(0);
        assert_eq!(hb.max_missed_acks, 1);
    }
}
