use std::sync::atomic::{AtomicI64, Ordering};

use crate::model::Secs;

/// Time source injected into the engine.
pub trait Clock: Send + Sync {
    fn now(&self) -> Secs;
}

/// Wall clock in unix seconds.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Secs {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs() as Secs)
            .unwrap_or(0)
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(start: Secs) -> Self {
        Self {
            now: AtomicI64::new(start),
        }
    }

    pub fn set(&self, t: Secs) {
        self.now.store(t, Ordering::SeqCst);
    }

    pub fn advance(&self, secs: Secs) {
        self.now.fetch_add(secs, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Secs {
        self.now.load(Ordering::SeqCst)
    }
}
