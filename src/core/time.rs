use time::{
    format_description::well_known::Rfc3339, macros::format_description, OffsetDateTime,
    PrimitiveDateTime, UtcOffset,
};

pub(crate) fn primitive_now_utc() -> PrimitiveDateTime {
    let now = OffsetDateTime::now_utc();
    PrimitiveDateTime::new(now.date(), now.time())
}

pub(crate) fn to_primitive_utc(value: OffsetDateTime) -> PrimitiveDateTime {
    let utc = value.to_offset(UtcOffset::UTC);
    PrimitiveDateTime::new(utc.date(), utc.time())
}

pub(crate) fn format_primitive(value: PrimitiveDateTime) -> String {
    value.assume_utc().format(&Rfc3339).unwrap_or_else(|_| value.assume_utc().to_string())
}

pub(crate) fn format_offset(value: OffsetDateTime) -> String {
    value.format(&Rfc3339).unwrap_or_else(|_| value.to_string())
}

/// `YYYY-MM-DD`, used in download filenames and CSV exports.
pub(crate) fn format_date(value: PrimitiveDateTime) -> String {
    value
        .date()
        .format(format_description!("[year]-[month]-[day]"))
        .unwrap_or_else(|_| value.date().to_string())
}

/// Human-readable UTC timestamp for plain-text reports.
pub(crate) fn format_report_timestamp(value: PrimitiveDateTime) -> String {
    value
        .format(format_description!("[year]-[month]-[day] [hour]:[minute]:[second] UTC"))
        .unwrap_or_else(|_| value.to_string())
}

/// Whole seconds from `from` until `until`, never negative.
pub(crate) fn seconds_until(from: PrimitiveDateTime, until: PrimitiveDateTime) -> i64 {
    let remaining = until.assume_utc().unix_timestamp() - from.assume_utc().unix_timestamp();
    remaining.max(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::{Date, Duration, Time, UtcOffset};

    fn sample() -> PrimitiveDateTime {
        let date = Date::from_calendar_date(2025, time::Month::January, 2).unwrap();
        let time = Time::from_hms(10, 20, 30).unwrap();
        PrimitiveDateTime::new(date, time)
    }

    #[test]
    fn format_primitive_outputs_utc_z() {
        assert_eq!(format_primitive(sample()), "2025-01-02T10:20:30Z");
    }

    #[test]
    fn format_offset_preserves_offset() {
        let utc = sample().assume_utc();
        let offset = UtcOffset::from_hms(5, 30, 0).unwrap();
        assert_eq!(format_offset(utc.to_offset(offset)), "2025-01-02T15:50:30+05:30");
    }

    #[test]
    fn date_and_report_formats() {
        assert_eq!(format_date(sample()), "2025-01-02");
        assert_eq!(format_report_timestamp(sample()), "2025-01-02 10:20:30 UTC");
    }

    #[test]
    fn seconds_until_clamps_past_deadlines() {
        let start = sample();
        assert_eq!(seconds_until(start, start + Duration::seconds(90)), 90);
        assert_eq!(seconds_until(start + Duration::seconds(90), start), 0);
    }
}
