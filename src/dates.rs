use time::macros::format_description;
use time::{Date, OffsetDateTime, Time, UtcOffset};

/// Parse a `YYYY-MM-DD` query parameter.
pub fn parse_day(s: &str) -> anyhow::Result<Date> {
    let fmt = format_description!("[year]-[month]-[day]");
    Date::parse(s, &fmt).map_err(|e| anyhow::anyhow!("invalid date '{s}': {e}"))
}

/// Half-open UTC range covering one calendar day.
pub fn day_bounds(day: Date) -> (OffsetDateTime, OffsetDateTime) {
    let start = day.midnight().assume_utc();
    (start, start + time::Duration::days(1))
}

/// Midnight UTC of the timestamp's calendar day.
pub fn day_start(dt: OffsetDateTime) -> OffsetDateTime {
    dt.to_offset(UtcOffset::UTC).replace_time(Time::MIDNIGHT)
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    #[test]
    fn parses_iso_dates() {
        let day = parse_day("2024-05-01").unwrap();
        assert_eq!(day.to_string(), "2024-05-01");
        assert!(parse_day("05/01/2024").is_err());
        assert!(parse_day("").is_err());
    }

    #[test]
    fn day_bounds_are_half_open() {
        let (from, to) = day_bounds(parse_day("2024-05-01").unwrap());
        assert_eq!(from, datetime!(2024-05-01 00:00 UTC));
        assert_eq!(to, datetime!(2024-05-02 00:00 UTC));
    }

    #[test]
    fn day_start_truncates_to_midnight() {
        assert_eq!(
            day_start(datetime!(2024-05-01 18:45:12 UTC)),
            datetime!(2024-05-01 00:00 UTC)
        );
        assert_eq!(
            day_start(datetime!(2024-05-01 00:00 UTC)),
            datetime!(2024-05-01 00:00 UTC)
        );
    }
}
