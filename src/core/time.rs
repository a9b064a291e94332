use time::macros::format_description;
use time::{format_description::well_known::Rfc3339, OffsetDateTime, PrimitiveDateTime, UtcOffset};

pub(crate) fn primitive_now_utc() -> PrimitiveDateTime {
    to_primitive_utc(OffsetDateTime::now_utc())
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

/// Calendar-day label (`YYYY-MM-DD`) used for chart axes.
pub(crate) fn date_label(value: PrimitiveDateTime) -> String {
    value
        .date()
        .format(format_description!("[year]-[month]-[day]"))
        .unwrap_or_else(|_| value.date().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::{Date, Time};

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
        let offset = UtcOffset::from_hms(3, 0, 0).unwrap();
        let shifted = sample().assume_utc().to_offset(offset);
        assert_eq!(format_offset(shifted), "2025-01-02T13:20:30+03:00");
    }

    #[test]
    fn to_primitive_utc_normalizes_offset() {
        let offset = UtcOffset::from_hms(3, 0, 0).unwrap();
        let shifted = sample().assume_utc().to_offset(offset);
        assert_eq!(to_primitive_utc(shifted), sample());
    }

    #[test]
    fn date_label_is_iso_day() {
        assert_eq!(date_label(sample()), "2025-01-02");
    }
}
