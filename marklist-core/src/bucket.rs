//! Day and week bucket identifiers used for time-windowed aggregation.

use chrono::{DateTime, Datelike, Utc};

/// UTC calendar day as `YYYYMMDD`, e.g. `20241231`.
pub fn day_number(at: DateTime<Utc>) -> u32 {
    let year = at.year().max(0) as u32;
    year * 10_000 + at.month() * 100 + at.day()
}

/// ISO-8601 week as `YYYYWW`, using the ISO week-year, e.g. `202501` for
/// 2024-12-31.
pub fn week_number(at: DateTime<Utc>) -> u32 {
    let week = at.iso_week();
    let year = week.year().max(0) as u32;
    year * 100 + week.week()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn day_number_is_calendar_date() {
        let at = Utc.with_ymd_and_hms(2024, 3, 7, 23, 59, 0).unwrap();
        assert_eq!(day_number(at), 20240307);
    }

    #[test]
    fn week_number_uses_iso_week_year() {
        let new_years_eve = Utc.with_ymd_and_hms(2024, 12, 31, 12, 0, 0).unwrap();
        assert_eq!(week_number(new_years_eve), 202501);

        let mid_year = Utc.with_ymd_and_hms(2024, 7, 1, 0, 0, 0).unwrap();
        assert_eq!(week_number(mid_year), 202427);
    }
}
