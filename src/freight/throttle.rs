use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, OnceLock};

use tokio::sync::Mutex;
use tokio::time::{sleep, Duration, Instant};
use tracing::debug;

use crate::config::constant::BROKER_MIN_INTERVAL_MS;

/// Spaces out calls to the broker by a minimum interval.
///
/// Callers queue on the lock and each one sleeps off whatever is left of the
/// interval since the previous call, so concurrent quotes go out one by one.
#[derive(Debug)]
pub struct BrokerThrottle {
    min_interval: Duration,
    last_call: Mutex<Option<Instant>>,
}

impl BrokerThrottle {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_call: Mutex::new(None),
        }
    }

    /// Process-wide gate with the default interval.
    pub fn shared() -> Arc<Self> {
        Self::shared_with(Duration::from_millis(BROKER_MIN_INTERVAL_MS))
    }

    /// Process-wide gate for `min_interval`. Every caller asking for the same
    /// interval gets the same gate.
    pub fn shared_with(min_interval: Duration) -> Arc<Self> {
        static GATES: OnceLock<StdMutex<HashMap<Duration, Arc<BrokerThrottle>>>> = OnceLock::new();
        let mut gates = GATES
            .get_or_init(|| StdMutex::new(HashMap::new()))
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        gates
            .entry(min_interval)
            .or_insert_with(|| Arc::new(BrokerThrottle::new(min_interval)))
            .clone()
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    pub async fn wait(&self) {
        let mut last_call = self.last_call.lock().await;
        if let Some(previous) = *last_call {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                let remaining = self.min_interval - elapsed;
                debug!("Throttling broker call for {:?}", remaining);
                sleep(remaining).await;
            }
        }
        *last_call = Some(Instant::now());
    }
}
