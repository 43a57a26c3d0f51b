//! Zone-aware clock and countdown arithmetic.
//!
//! All countdown math runs on wall-clock instants projected into one
//! configured IANA zone, so a bot restarted in a different server zone
//! keeps producing identical phrases.

use chrono::{DateTime, Duration, LocalResult, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

pub const MS_PER_HOUR: i64 = 3_600_000;
pub const MS_PER_DAY: i64 = 86_400_000;

/// Wall-clock source pinned to one IANA zone.
#[derive(Debug, Clone, Copy)]
pub struct Clock {
    tz: Tz,
}

impl Clock {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    pub fn zone(&self) -> Tz {
        self.tz
    }

    /// Current instant in the configured zone.
    pub fn now(&self) -> DateTime<Tz> {
        Utc::now().with_timezone(&self.tz)
    }

    /// Resolve a civil date-time in the configured zone.
    ///
    /// Spring-forward gaps shift to the first valid instant after the gap;
    /// ambiguous fall-back times take the earlier offset.
    pub fn resolve_local(&self, naive: NaiveDateTime) -> DateTime<Tz> {
        match self.tz.from_local_datetime(&naive) {
            LocalResult::Single(dt) => dt,
            LocalResult::Ambiguous(earliest, _) => earliest,
            LocalResult::None => {
                let mut probe = naive;
                for _ in 0..27 {
                    probe = probe + Duration::hours(1);
                    if let Some(dt) = self.tz.from_local_datetime(&probe).earliest() {
                        return dt;
                    }
                }
                // No real zone has a gap this wide; fall back to UTC reading.
                self.tz.from_utc_datetime(&naive)
            }
        }
    }

    /// `DD.MM.YYYY HH:MM:SS` stamp for log lines.
    pub fn format_stamp(&self, dt: &DateTime<Tz>) -> String {
        dt.format("%d.%m.%Y %H:%M:%S").to_string()
    }

    /// Most recent instant at `reset_hour:reset_minute` on or before `now`.
    ///
    /// Compared at wall-clock precision below the minute: 08:59:59 against a
    /// 09:00 reset yields yesterday 09:00, while 09:00:00 sharp yields today.
    pub fn effective_base(
        &self,
        now: DateTime<Tz>,
        reset_hour: u32,
        reset_minute: u32,
    ) -> DateTime<Tz> {
        let now_naive = now.naive_local();
        let today_reset = now
            .date_naive()
            .and_hms_opt(reset_hour, reset_minute, 0)
            .unwrap_or(now_naive);

        let base_naive = if now_naive < today_reset {
            today_reset - Duration::days(1)
        } else {
            today_reset
        };
        self.resolve_local(base_naive)
    }
}

/// Signed difference `target - base`.
pub fn diff<Z1: TimeZone, Z2: TimeZone>(target: DateTime<Z1>, base: DateTime<Z2>) -> Duration {
    target.signed_duration_since(base)
}

/// Whole days in `target - base`, floored toward negative infinity.
pub fn days_floor<Z1: TimeZone, Z2: TimeZone>(target: DateTime<Z1>, base: DateTime<Z2>) -> i64 {
    diff(target, base).num_milliseconds().div_euclid(MS_PER_DAY)
}

/// Hours in `target - base`, rounded up.
pub fn hours_ceil<Z1: TimeZone, Z2: TimeZone>(target: DateTime<Z1>, base: DateTime<Z2>) -> i64 {
    let ms = diff(target, base).num_milliseconds();
    ms.div_euclid(MS_PER_HOUR) + i64::from(ms.rem_euclid(MS_PER_HOUR) > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use chrono_tz::America::New_York;
    use chrono_tz::Europe::Moscow;

    fn moscow_clock() -> Clock {
        Clock::new(Moscow)
    }

    fn at(clock: &Clock, y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Tz> {
        let naive = NaiveDate::from_ymd_opt(y, mo, d)
            .expect("valid date")
            .and_hms_opt(h, mi, s)
            .expect("valid time");
        clock.resolve_local(naive)
    }

    #[test]
    fn test_days_floor_and_hours_ceil_disagree_midspan() {
        let clock = moscow_clock();
        let base = at(&clock, 2026, 6, 1, 9, 0, 0);
        let target = at(&clock, 2026, 6, 2, 12, 30, 0); // 27.5h later

        assert_eq!(days_floor(target, base), 1);
        assert_eq!(hours_ceil(target, base), 28);
    }

    #[test]
    fn test_exact_day_boundary() {
        let clock = moscow_clock();
        let base = at(&clock, 2026, 6, 1, 9, 0, 0);
        let target = at(&clock, 2026, 6, 2, 9, 0, 0);

        assert_eq!(days_floor(target, base), 1);
        assert_eq!(hours_ceil(target, base), 24);
    }

    #[test]
    fn test_negative_spans_floor_downward() {
        let clock = moscow_clock();
        let base = at(&clock, 2026, 6, 10, 9, 0, 0);
        let target = at(&clock, 2026, 6, 10, 8, 0, 0); // 1h earlier

        assert_eq!(days_floor(target, base), -1);
        assert_eq!(hours_ceil(target, base), -1);

        let barely_past = at(&clock, 2026, 6, 10, 8, 59, 59);
        assert_eq!(days_floor(barely_past, base), -1);
        assert_eq!(hours_ceil(barely_past, base), 0);
    }

    #[test]
    fn test_floor_and_ceil_stay_consistent() {
        let clock = moscow_clock();
        let base = at(&clock, 2026, 6, 1, 9, 0, 0);
        let offsets_min: [i64; 6] = [0, 59, 60, 1439, 1440, 1650];

        for minutes in offsets_min {
            let target = base + Duration::minutes(minutes);
            let days = days_floor(target, base);
            let hours = hours_ceil(target, base);
            assert!(
                days * 24 <= hours && hours <= (days + 1) * 24,
                "inconsistent at {minutes}min: days={days} hours={hours}"
            );
        }
    }

    #[test]
    fn test_effective_base_around_reset_time() {
        let clock = moscow_clock();

        let before = clock.effective_base(at(&clock, 2026, 6, 10, 8, 59, 0), 9, 0);
        assert_eq!(clock.format_stamp(&before), "09.06.2026 09:00:00");

        let sharp = clock.effective_base(at(&clock, 2026, 6, 10, 9, 0, 0), 9, 0);
        assert_eq!(clock.format_stamp(&sharp), "10.06.2026 09:00:00");

        let with_seconds = clock.effective_base(at(&clock, 2026, 6, 10, 9, 0, 30), 9, 0);
        assert_eq!(clock.format_stamp(&with_seconds), "10.06.2026 09:00:00");

        let after = clock.effective_base(at(&clock, 2026, 6, 10, 9, 1, 0), 9, 0);
        assert_eq!(clock.format_stamp(&after), "10.06.2026 09:00:00");
    }

    #[test]
    fn test_effective_base_lands_inside_dst_gap() {
        // 2025-03-09 02:00-03:00 does not exist in New York; a 02:30 reset
        // resolves to the first valid instant after the gap.
        let clock = Clock::new(New_York);
        let now = at(&clock, 2025, 3, 9, 10, 0, 0);

        let base = clock.effective_base(now, 2, 30);
        assert_eq!(clock.format_stamp(&base), "09.03.2025 03:30:00");
    }

    #[test]
    fn test_resolve_local_ambiguous_takes_earlier_offset() {
        use chrono::Offset;

        // 2025-11-02 01:30 happens twice in New York; the EDT reading wins.
        let clock = Clock::new(New_York);
        let naive = NaiveDate::from_ymd_opt(2025, 11, 2)
            .expect("valid date")
            .and_hms_opt(1, 30, 0)
            .expect("valid time");

        let resolved = clock.resolve_local(naive);
        assert_eq!(resolved.offset().fix().local_minus_utc(), -4 * 3600);
    }

    #[test]
    fn test_format_stamp_uses_zone() {
        let clock = moscow_clock();
        let utc = Utc
            .with_ymd_and_hms(2026, 1, 2, 3, 4, 5)
            .single()
            .expect("unambiguous");
        let stamped = clock.format_stamp(&utc.with_timezone(&clock.zone()));
        assert_eq!(stamped, "02.01.2026 06:04:05");
    }
}
