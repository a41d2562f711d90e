//! Time source for TTL decisions.

use chrono::{DateTime, Utc};

/// Supplies the current time to the cache and the history ledger.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Whether something created at `created_at` has outlived `ttl` at `now`.
///
/// An entry exactly `ttl` old is still alive.
pub fn is_expired(created_at: DateTime<Utc>, now: DateTime<Utc>, ttl: std::time::Duration) -> bool {
    match chrono::Duration::from_std(ttl) {
        Ok(ttl) => now.signed_duration_since(created_at) > ttl,
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_expiry_boundary() {
        let t0 = Utc::now();
        let ttl = Duration::from_secs(1200);
        assert!(!is_expired(t0, t0 + chrono::Duration::minutes(19), ttl));
        assert!(!is_expired(t0, t0 + chrono::Duration::minutes(20), ttl));
        assert!(is_expired(t0, t0 + chrono::Duration::minutes(21), ttl));
    }

    #[test]
    fn test_future_entries_are_alive() {
        let t0 = Utc::now();
        assert!(!is_expired(t0 + chrono::Duration::minutes(5), t0, Duration::from_secs(60)));
    }
}
