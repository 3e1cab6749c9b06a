//! Per-environment deploy lease
//!
//! Two concurrent runs must never interleave traffic-shift calls against
//! the same environment. Every deploy/canary/rollback call sequence takes
//! the environment's lease first.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

/// Lazily created async mutex per environment name
#[derive(Clone, Default)]
pub struct EnvironmentLeases {
    inner: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl EnvironmentLeases {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lease for an environment, waiting if another holder is
    /// mid-deploy. The guard releases on drop.
    pub async fn acquire(&self, environment: &str) -> OwnedMutexGuard<()> {
        let lease = {
            let mut map = self.inner.lock().await;
            map.entry(environment.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };

        lease.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_same_environment_is_serialized() {
        let leases = EnvironmentLeases::new();
        let in_flight = Arc::new(AtomicU32::new(0));
        let max_seen = Arc::new(AtomicU32::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let leases = leases.clone();
            let in_flight = Arc::clone(&in_flight);
            let max_seen = Arc::clone(&max_seen);
            handles.push(tokio::spawn(async move {
                let _guard = leases.acquire("production").await;
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                max_seen.fetch_max(now, Ordering::SeqCst);
                tokio::task::yield_now().await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
            }));
        }

        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_different_environments_do_not_block() {
        let leases = EnvironmentLeases::new();

        let _prod = leases.acquire("production").await;
        // Must not deadlock: staging has its own lease.
        let _staging = leases.acquire("staging").await;
    }
}
