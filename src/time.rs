use chrono::{DateTime, Utc};
use std::time::Instant;

/// Clock trait for abstracting time operations
/// Provides UTC time for record-expiry checks and uptime for debouncing
pub trait Clock: Send + Sync {
    /// Current UTC time as seconds since the Unix epoch
    /// (supplied on the device by the NTP collaborator)
    fn now_epoch_seconds(&self) -> i64;

    /// Milliseconds since the device booted
    fn uptime_millis(&self) -> u64;
}

/// Production implementation of Clock using system time
#[derive(Debug, Clone)]
pub struct SystemClock {
    started: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_epoch_seconds(&self) -> i64 {
        Utc::now().timestamp()
    }

    fn uptime_millis(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }
}

/// Test implementation of Clock with fixed/controllable time
/// Useful for deterministic testing of expiry and cooldown behavior
#[derive(Debug, Clone)]
pub struct FixedClock {
    timestamp: DateTime<Utc>,
    uptime_ms: u64,
}

impl FixedClock {
    /// Create a new FixedClock with the given timestamp and zero uptime
    pub fn new(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            uptime_ms: 0,
        }
    }

    /// Create a FixedClock from an RFC3339 string
    pub fn from_rfc3339(timestamp_str: &str) -> Result<Self, chrono::ParseError> {
        let timestamp = DateTime::parse_from_rfc3339(timestamp_str)?.with_timezone(&Utc);
        Ok(Self::new(timestamp))
    }

    /// Create a FixedClock from epoch seconds
    pub fn from_epoch_seconds(seconds: i64) -> Self {
        let timestamp = DateTime::from_timestamp(seconds, 0).expect("Invalid timestamp");
        Self::new(timestamp)
    }

    /// Update the fixed time without touching uptime
    pub fn set_time(&mut self, timestamp: DateTime<Utc>) {
        self.timestamp = timestamp;
    }

    /// Advance both wall time and uptime by the given number of seconds
    pub fn advance_seconds(&mut self, seconds: i64) {
        self.timestamp += chrono::Duration::seconds(seconds);
        self.uptime_ms = self
            .uptime_ms
            .saturating_add_signed(seconds.saturating_mul(1000));
    }

    /// Advance both wall time and uptime by the given number of milliseconds
    pub fn advance_millis(&mut self, millis: u64) {
        self.timestamp += chrono::Duration::milliseconds(millis as i64);
        self.uptime_ms += millis;
    }
}

impl Clock for FixedClock {
    fn now_epoch_seconds(&self) -> i64 {
        self.timestamp.timestamp()
    }

    fn uptime_millis(&self) -> u64 {
        self.uptime_ms
    }
}
