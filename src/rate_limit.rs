use std::collections::VecDeque;

use tokio::sync::Mutex;
use tokio::time::{sleep, Duration, Instant};

use crate::error::{Error, Result};

const WINDOW: Duration = Duration::from_secs(60);

/// Sliding-window request limiter shared by every worker that talks to the
/// search service. The window of issue timestamps lives behind a single mutex,
/// so the ceiling holds globally no matter how many workers call `acquire`
/// concurrently.
pub struct RateLimiter {
    max_per_minute: usize,
    window: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    pub fn new(max_per_minute: usize) -> Result<Self> {
        if max_per_minute == 0 {
            return Err(Error::Config(
                "rate ceiling must be at least 1 request per minute".to_string(),
            ));
        }
        Ok(Self {
            max_per_minute,
            window: Mutex::new(VecDeque::new()),
        })
    }

    /// Blocks until one more request fits under the ceiling, then records the
    /// slot and returns. Never fails.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut window = self.window.lock().await;
                let now = Instant::now();
                while let Some(front) = window.front() {
                    if now.duration_since(*front) >= WINDOW {
                        window.pop_front();
                    } else {
                        break;
                    }
                }
                if window.len() < self.max_per_minute {
                    window.push_back(now);
                    return;
                }
                match window.front() {
                    Some(&oldest) => WINDOW.saturating_sub(now.duration_since(oldest)),
                    None => Duration::ZERO,
                }
            };
            sleep(wait).await;
        }
    }
}
