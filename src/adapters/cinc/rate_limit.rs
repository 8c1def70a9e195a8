use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// 以固定間隔排隊請求，不做重試
#[derive(Debug)]
pub struct RateLimiter {
    interval: Option<Duration>,
    next_slot: Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// 0 代表不限速
    pub fn per_second(requests: u32) -> Self {
        let interval = (requests > 0).then(|| Duration::from_secs(1) / requests);
        Self {
            interval,
            next_slot: Mutex::new(None),
        }
    }

    pub fn unlimited() -> Self {
        Self::per_second(0)
    }

    pub async fn acquire(&self) {
        let Some(interval) = self.interval else {
            return;
        };

        let slot = {
            let mut next = self.next_slot.lock().await;
            let now = Instant::now();
            let slot = next.map_or(now, |n| n.max(now));
            *next = Some(slot + interval);
            slot
        };

        tokio::time::sleep_until(slot).await;
    }
}
