//! Timestamp helpers for checkpoints and export file names.

use chrono::{DateTime, Utc};

/// Represents a timestamp that can be serialized/deserialized.
pub type Timestamp = DateTime<Utc>;

/// Returns the current UTC timestamp.
#[must_use]
pub fn now_utc() -> Timestamp {
    Utc::now()
}

/// Milliseconds since the Unix epoch for `ts`.
#[must_use]
pub fn epoch_millis(ts: &Timestamp) -> i64 {
    ts.timestamp_millis()
}

/// Whole seconds elapsed between `since` and `now`, clamped at zero.
#[must_use]
pub fn age_secs(since: &Timestamp, now: &Timestamp) -> u64 {
    u64::try_from((*now - *since).num_seconds()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_epoch_millis() {
        let ts = Utc.timestamp_opt(1_700_000_000, 500_000_000).single().unwrap();
        assert_eq!(epoch_millis(&ts), 1_700_000_000_500);
    }

    #[test]
    fn test_age_secs() {
        let now = now_utc();
        assert_eq!(age_secs(&(now - Duration::seconds(90)), &now), 90);
    }

    #[test]
    fn test_age_in_future_is_zero() {
        let now = now_utc();
        assert_eq!(age_secs(&(now + Duration::seconds(5)), &now), 0);
    }
}
