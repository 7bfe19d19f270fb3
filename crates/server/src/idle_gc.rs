use std::sync::Mutex as StdMutex;
use std::time::{Duration, Instant};

use quillcore_rpc::BaseConnection;

/// Default idle threshold after which a connection's non-evergreen
/// targets become eligible for collection (spec.md §4.2 deployment
/// policy — "SHOULD default to on the order of tens of minutes").
pub const DEFAULT_IDLE_GC_THRESHOLD: Duration = Duration::from_secs(20 * 60);

/// Connection-level idle tracker. `Context` only exposes `gc_except`
/// with a caller-supplied keep-set; the per-target last-access bookkeeping
/// the spec leaves to "the surrounding deployment" is approximated here
/// at connection granularity — any inbound message resets the clock for
/// every target the connection currently holds. A quieter connection
/// frees its whole working set at once rather than target-by-target.
pub struct IdleGc {
    last_activity: StdMutex<Instant>,
    threshold: Duration,
}

impl IdleGc {
    pub fn new(threshold: Duration) -> Self {
        Self { last_activity: StdMutex::new(Instant::now()), threshold }
    }

    pub fn touch(&self) {
        if let Ok(mut guard) = self.last_activity.lock() {
            *guard = Instant::now();
        }
    }

    fn idle_for(&self) -> Duration {
        self.last_activity.lock().map(|g| g.elapsed()).unwrap_or_default()
    }

    /// Runs until `conn` reports closed. Intended to be spawned alongside
    /// a connection's read loop.
    pub async fn run(&self, conn: &BaseConnection) {
        let poll_interval = (self.threshold / 4).max(Duration::from_secs(1));
        let mut ticker = tokio::time::interval(poll_interval);
        loop {
            ticker.tick().await;
            if conn.is_closed() {
                return;
            }
            if self.idle_for() >= self.threshold {
                conn.context().gc_except(&Default::default()).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    #[test]
    fn touch_resets_the_idle_clock() {
        let gc = IdleGc::new(Duration::from_secs(60));
        std::thread::sleep(Duration::from_millis(5));
        assert!(gc.idle_for() >= Duration::from_millis(5));
        gc.touch();
        assert!(gc.idle_for() < Duration::from_millis(5));
    }
}
