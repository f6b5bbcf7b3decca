//! Date helpers shared by the services.
//!
//! Calendar dates travel as `YYYY-MM-DD`; instants are stored as RFC 3339 text.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

use crate::domain::DomainError;

pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339()
}

pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Parse a `YYYY-MM-DD` field, naming it in the error
pub fn parse_date(raw: &str, field: &str) -> Result<NaiveDate, DomainError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| {
        DomainError::Validation(format!("{} must be a date in YYYY-MM-DD format", field))
    })
}

/// Midnight UTC of `date`, as stored in timestamp columns
pub fn start_of_day(date: NaiveDate) -> String {
    date.and_time(NaiveTime::MIN).and_utc().to_rfc3339()
}

/// Read back a stored timestamp or calendar date
pub fn stored_date(raw: &str) -> Option<NaiveDate> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc).date_naive())
        .ok()
        .or_else(|| NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok())
}

pub fn stored_instant(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .map(|d| d.and_time(NaiveTime::MIN).and_utc())
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_store_round() {
        let d = parse_date("2024-03-05", "Delivery date").unwrap();
        let stored = start_of_day(d);
        assert!(stored.starts_with("2024-03-05T00:00:00"));
        assert_eq!(stored_date(&stored), Some(d));
        assert_eq!(stored_date("2024-03-05"), Some(d));
    }

    #[test]
    fn bad_dates_name_the_field() {
        let err = parse_date("05/03/2024", "Return date").unwrap_err();
        assert!(err.to_string().starts_with("Return date"));
        assert_eq!(stored_date("garbage"), None);
    }
}
