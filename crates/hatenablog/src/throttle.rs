//! Request pacing for bulk operations.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::{Instant, sleep_until};
use tracing::debug;

/// A fixed-interval gate between consecutive requests.
///
/// Each [`wait`](Throttle::wait) sleeps until the gate opens and then
/// re-arms it one interval ahead, so a loop of N waits spends at least
/// (N−1) × interval in total. The gate starts open; a `Retry-After` hint
/// from the service can push the next opening further out. Timing
/// anomalies degrade to a shorter delay, never to an error.
#[derive(Debug)]
pub struct Throttle {
    interval: Duration,
    open_at: Mutex<Option<Instant>>,
}

impl Throttle {
    pub fn new(interval: Duration) -> Self {
        Throttle {
            interval,
            open_at: Mutex::new(None),
        }
    }

    /// A gate that never delays (zero interval). It still honors
    /// [`note_retry_after`](Throttle::note_retry_after) hints.
    pub fn disabled() -> Self {
        Throttle::new(Duration::ZERO)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Sleeps until the gate opens, then re-arms it one interval ahead.
    /// The first wait on a fresh gate returns immediately.
    pub async fn wait(&self) {
        let mut open_at = self.open_at.lock().await;
        if let Some(at) = *open_at {
            let now = Instant::now();
            if at > now {
                debug!(delay_ms = (at - now).as_millis() as u64, "pacing before next request");
                sleep_until(at).await;
            }
        }
        *open_at = Some(Instant::now() + self.interval);
    }

    /// Time until the gate next opens; zero when it is already open.
    pub async fn remaining(&self) -> Duration {
        match *self.open_at.lock().await {
            Some(at) => at.saturating_duration_since(Instant::now()),
            None => Duration::ZERO,
        }
    }

    /// Pushes the next gate opening at least `secs` seconds out, for
    /// honoring a `Retry-After` hint. Never pulls the gate earlier.
    pub async fn note_retry_after(&self, secs: u64) {
        let hinted = Instant::now() + Duration::from_secs(secs);
        let mut open_at = self.open_at.lock().await;
        *open_at = match *open_at {
            Some(current) => Some(current.max(hinted)),
            None => Some(hinted),
        };
        debug!(secs, "recorded retry-after hint");
    }
}
