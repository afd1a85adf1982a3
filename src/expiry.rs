use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::store::{Member, EXPIRY_TIME_FIELD};

/// Current wall-clock time in unix milliseconds.
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// Absolute expiry timestamp for a member created at `created_at`, or `0`
/// when it never expires.
pub fn expiry_time(created_at: i64, expire_in: Option<Duration>) -> i64 {
    match expire_in {
        Some(d) if !d.is_zero() => {
            created_at.saturating_add(i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
        }
        _ => 0,
    }
}

/// Lazy expiry check against a caller-supplied `now`. A member without a
/// usable `expiry_time` never expires.
pub fn is_valid(member: &Member, now: i64) -> bool {
    match member.get(EXPIRY_TIME_FIELD).and_then(|v| v.as_i64()) {
        Some(0) | None => true,
        Some(expires_at) => now < expires_at,
    }
}

#[cfg(test)]
mod tests {
    use super::{expiry_time, is_valid};
    use serde_json::json;
    use std::time::Duration;

    fn member(value: serde_json::Value) -> crate::store::Member {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn never_expires() {
        let m = member(json!({"id": "1", "expiry_time": 0}));
        assert!(is_valid(&m, 0));
        assert!(is_valid(&m, i64::MAX));

        let m = member(json!({"id": "1"}));
        assert!(is_valid(&m, i64::MAX));
    }

    #[test]
    fn expires_at_boundary() {
        let m = member(json!({"id": "1", "expiry_time": 1000}));
        assert!(is_valid(&m, 999));
        assert!(!is_valid(&m, 1000));
        assert!(!is_valid(&m, 1001));
    }

    #[test]
    fn computes_expiry_time() {
        assert_eq!(expiry_time(5000, None), 0);
        assert_eq!(expiry_time(5000, Some(Duration::ZERO)), 0);
        assert_eq!(expiry_time(5000, Some(Duration::from_secs(1))), 6000);
        assert_eq!(expiry_time(5000, Some(Duration::MAX)), i64::MAX);
    }
}
