use chrono::{DateTime, Duration, Local};
use std::sync::{Arc, Mutex, PoisonError};

/// Source of wall-clock time for the timer
pub trait Clock: Send + 'static {
    fn now(&self) -> DateTime<Local>;
}

/// Production clock backed by the local system time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// Manually driven clock for tests and scripted sessions.
///
/// Clones share the same instant, so a test can keep one copy and advance it
/// while the timer (possibly on another thread) reads from another.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Local>>>,
}

impl ManualClock {
    pub fn new(at: DateTime<Local>) -> Self {
        Self {
            now: Arc::new(Mutex::new(at)),
        }
    }

    pub fn set(&self, at: DateTime<Local>) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) = at;
    }

    pub fn advance(&self, delta: Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += delta;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Local> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Milliseconds from `start` to `end`, zero if the clock went backwards
pub fn elapsed_ms(start: DateTime<Local>, end: DateTime<Local>) -> u64 {
    end.signed_duration_since(start)
        .num_milliseconds()
        .try_into()
        .unwrap_or(0)
}
