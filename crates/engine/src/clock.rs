//! Time source port.
//!
//! Month resolution and cache expiry both depend on "now", so the engine
//! never calls `Utc::now()` directly; it goes through an injected [`Clock`].

use chrono::{DateTime, Utc};

/// Source of the current time.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
