use std::collections::VecDeque;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

/// Sliding-window admission controller bounding outbound call rate to a
/// rate-limited external dependency.
///
/// Admission check and timestamp record happen under a single lock
/// acquisition, so two concurrent callers can never both observe spare
/// capacity and both admit past the limit.
pub struct RateGate {
    capacity: usize,
    window: Duration,
    stamps: Mutex<VecDeque<Instant>>,
}

impl RateGate {
    pub fn new(capacity: usize, window: Duration) -> Self {
        Self {
            capacity: capacity.max(1),
            window,
            stamps: Mutex::new(VecDeque::new()),
        }
    }

    /// Suspend the caller until admitted. Never busy-spins: when the window
    /// is full this sleeps exactly until the oldest timestamp exits the
    /// window, then re-evaluates (timestamps may have expired while asleep).
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut stamps = self.stamps.lock().await;
                let now = Instant::now();

                while let Some(&oldest) = stamps.front() {
                    if now.duration_since(oldest) >= self.window {
                        stamps.pop_front();
                    } else {
                        break;
                    }
                }

                if stamps.len() < self.capacity {
                    stamps.push_back(now);
                    return;
                }

                match stamps.front() {
                    Some(&oldest) => self.window - now.duration_since(oldest),
                    None => return,
                }
            };

            debug!(wait_ms = wait.as_millis() as u64, "Rate gate full, waiting");
            tokio::time::sleep(wait).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn admits_up_to_capacity_immediately() {
        let gate = RateGate::new(2, Duration::from_millis(1000));
        let start = Instant::now();
        gate.acquire().await;
        gate.acquire().await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn third_caller_waits_for_oldest_stamp_to_expire() {
        let gate = RateGate::new(2, Duration::from_millis(1000));
        let start = Instant::now();
        gate.acquire().await;
        gate.acquire().await;
        // Window is full; the third acquire must wait out the full window.
        gate.acquire().await;
        assert!(start.elapsed() >= Duration::from_millis(1000));
    }

    #[tokio::test(start_paused = true)]
    async fn capacity_frees_as_stamps_age_out() {
        let gate = RateGate::new(1, Duration::from_millis(500));
        gate.acquire().await;
        tokio::time::advance(Duration::from_millis(600)).await;
        let start = Instant::now();
        gate.acquire().await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }
}
