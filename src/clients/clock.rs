use chrono::{DateTime, Utc};

/// Injectable time source, so token expiry can be tested deterministically
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Current Unix timestamp in seconds
    fn unix_timestamp(&self) -> i64 {
        self.now().timestamp()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock frozen at a given instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl FixedClock {
    /// Returns `None` for timestamps chrono cannot represent
    pub fn at(timestamp: i64) -> Option<Self> {
        DateTime::from_timestamp(timestamp, 0).map(FixedClock)
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
