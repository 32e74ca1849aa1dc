//! Shared application state
//!
//! The store and the seed slot are the only mutable pieces. The seed pointer
//! is swappable by the admin plane; handlers capture it by value (an `Arc`
//! clone) at the start of a request so a concurrent swap never changes the
//! seed mid-aggregation. Admin writes serialize on a dedicated lock.

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;

use codetel_shared::{Config, Seed};

use crate::store::CorpusStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<CorpusStore>,
    seed: Arc<RwLock<Arc<Seed>>>,
    /// Serializes seed swaps and regenerations with respect to each other
    pub admin_lock: Arc<Mutex<()>>,
    pub config: Arc<Config>,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(config: Config, seed: Seed) -> Self {
        Self {
            store: Arc::new(CorpusStore::new()),
            seed: Arc::new(RwLock::new(Arc::new(seed))),
            admin_lock: Arc::new(Mutex::new(())),
            config: Arc::new(config),
            started_at: Utc::now(),
        }
    }

    /// Capture the current seed by value
    pub fn seed(&self) -> Arc<Seed> {
        self.seed.read().clone()
    }

    /// Atomically swap the in-process seed reference
    pub fn swap_seed(&self, seed: Seed) {
        *self.seed.write() = Arc::new(seed);
    }

    pub fn uptime_seconds(&self) -> u64 {
        (Utc::now() - self.started_at).num_seconds().max(0) as u64
    }

    pub fn uptime_human(&self) -> String {
        let total = self.uptime_seconds();
        let hours = total / 3600;
        let minutes = (total % 3600) / 60;
        let seconds = total % 60;
        format!("{}h{}m{}s", hours, minutes, seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed_loader;

    #[test]
    fn seed_swap_is_visible_to_later_captures() {
        let state = AppState::new(Config::default(), seed_loader::preset("small-team").unwrap());
        let before = state.seed();
        let replacement = seed_loader::preset("multi-region").unwrap();
        state.swap_seed(replacement.clone());
        assert_eq!(before.developers.len(), 5);
        assert_eq!(state.seed().developers.len(), replacement.developers.len());
    }
}
