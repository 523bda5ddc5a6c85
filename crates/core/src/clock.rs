//! UTC timestamps with per-entity monotonicity.
//!
//! Audit sequences require non-decreasing timestamps within one entity.
//! The wall clock alone cannot promise that (NTP steps, coarse clocks),
//! so appends go through [`monotonic_after`], which clamps to the
//! entity's last recorded instant.

use time::OffsetDateTime;

/// Current instant, UTC.
pub fn now_utc() -> OffsetDateTime {
    OffsetDateTime::now_utc()
}

/// Current instant, clamped to be no earlier than `last`.
pub fn monotonic_after(last: Option<OffsetDateTime>) -> OffsetDateTime {
    let now = now_utc();
    match last {
        Some(prev) if prev > now => prev,
        _ => now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    #[test]
    fn monotonic_clamps_to_last() {
        let future = now_utc() + Duration::hours(1);
        assert_eq!(monotonic_after(Some(future)), future);
    }

    #[test]
    fn monotonic_uses_now_when_ahead() {
        let past = now_utc() - Duration::hours(1);
        assert!(monotonic_after(Some(past)) > past);
    }

    #[test]
    fn monotonic_without_last_is_now_ish() {
        let before = now_utc();
        let ts = monotonic_after(None);
        assert!(ts >= before);
    }
}
