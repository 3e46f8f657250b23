use time::macros::format_description;
use time::{format_description::well_known::Rfc3339, Date, OffsetDateTime, PrimitiveDateTime};

pub(crate) fn primitive_now_utc() -> PrimitiveDateTime {
    let now = OffsetDateTime::now_utc();
    PrimitiveDateTime::new(now.date(), now.time())
}

pub(crate) fn format_primitive(value: PrimitiveDateTime) -> String {
    value.assume_utc().format(&Rfc3339).unwrap_or_else(|_| value.assume_utc().to_string())
}

/// Exam dates travel as plain `YYYY-MM-DD`.
pub(crate) fn format_date(value: Date) -> String {
    value.format(format_description!("[year]-[month]-[day]")).unwrap_or_else(|_| value.to_string())
}

pub(crate) fn parse_date(value: &str) -> Option<Date> {
    let trimmed = value.trim();
    // Accept full timestamps from clients that serialise JS `Date` objects.
    let date_part = trimmed.get(..10).unwrap_or(trimmed);
    Date::parse(date_part, format_description!("[year]-[month]-[day]")).ok()
}
