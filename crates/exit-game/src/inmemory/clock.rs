//! A clock that only moves when told to.

use std::sync::Arc;

use parking_lot::RwLock;
use plasma_primitives::types::Timestamp;

use crate::external::Clock;

/// A manually driven [`Clock`].
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<RwLock<Timestamp>>,
}

impl ManualClock {
    /// Creates a clock reading `start`.
    pub fn new(start: Timestamp) -> Self {
        Self {
            now: Arc::new(RwLock::new(start)),
        }
    }

    /// Moves the clock forward by `seconds`.
    pub fn advance(&self, seconds: u64) {
        let mut now = self.now.write();
        *now = now.saturating_add(seconds);
    }

    /// Sets the clock.
    pub fn set(&self, timestamp: Timestamp) {
        *self.now.write() = timestamp;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        *self.now.read()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_time() {
        let clock = ManualClock::new(10);
        let observer = clock.clone();

        clock.advance(5);
        assert_eq!(observer.now(), 15);

        observer.set(100);
        assert_eq!(clock.now(), 100);
    }
}
