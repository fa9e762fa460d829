//! Parsing the timestamps the model hands to the tools and attaching a
//! timezone to the ones that don't carry one.

use chrono::{
    DateTime, FixedOffset, Local, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone,
    Utc,
};
use chrono_tz::Tz;

use crate::core::BookingError;

// Tried in order after RFC 3339
const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M%:z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%z",
];

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// The zone used for timestamps that arrive without an offset.
#[derive(Clone, Debug)]
pub enum LocalZone {
    /// Whatever the host system is set to
    System,
    Named(Tz),
}

impl LocalZone {
    /// Resolve an optional IANA zone name from config.
    pub fn from_name(name: Option<&str>) -> Result<Self, BookingError> {
        match name {
            None => Ok(LocalZone::System),
            Some(name) => name
                .trim()
                .parse::<Tz>()
                .map(LocalZone::Named)
                .map_err(|_| BookingError::InvalidTimeFormat(format!("unknown timezone {}", name))),
        }
    }

    /// IANA name of the zone when known. The system zone has no
    /// portable name so it's left for the provider to infer from the
    /// offset.
    pub fn name(&self) -> Option<String> {
        match self {
            LocalZone::System => None,
            LocalZone::Named(tz) => Some(tz.name().to_string()),
        }
    }

    pub fn now(&self) -> DateTime<FixedOffset> {
        self.from_utc(&Utc::now())
    }

    pub fn from_utc(&self, dt: &DateTime<Utc>) -> DateTime<FixedOffset> {
        match self {
            LocalZone::System => dt.with_timezone(&Local).fixed_offset(),
            LocalZone::Named(tz) => dt.with_timezone(tz).fixed_offset(),
        }
    }

    /// Attach this zone to a wall clock time. Times repeated by a DST
    /// change resolve to the earlier instant; times skipped by one are
    /// rejected.
    pub fn localize(&self, naive: NaiveDateTime) -> Result<DateTime<FixedOffset>, BookingError> {
        let resolved = match self {
            LocalZone::System => earliest(Local.from_local_datetime(&naive)),
            LocalZone::Named(tz) => earliest(tz.from_local_datetime(&naive)),
        };
        resolved.ok_or_else(|| {
            BookingError::InvalidTimeFormat(format!("{} does not exist in the local timezone", naive))
        })
    }
}

fn earliest<Z: TimeZone>(result: LocalResult<DateTime<Z>>) -> Option<DateTime<FixedOffset>> {
    result.earliest().map(|dt| dt.fixed_offset())
}

/// Parse an ISO 8601 style timestamp. Inputs without an offset are
/// placed in `zone`, a bare date means midnight.
pub fn parse_timestamp(input: &str, zone: &LocalZone) -> Result<DateTime<FixedOffset>, BookingError> {
    let text = input.trim();
    if text.is_empty() {
        return Err(BookingError::InvalidTimeFormat("empty timestamp".to_string()));
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Ok(dt);
    }
    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(text, fmt) {
            return Ok(dt);
        }
    }
    // A trailing "Z" that RFC 3339 rejected, e.g. missing seconds
    if let Some(stripped) = text.strip_suffix('Z').or_else(|| text.strip_suffix('z')) {
        if let Some(naive) = parse_naive(stripped) {
            return Ok(naive.and_utc().fixed_offset());
        }
    }
    if let Some(naive) = parse_naive(text) {
        return zone.localize(naive);
    }

    Err(BookingError::InvalidTimeFormat(text.to_string()))
}

fn parse_naive(text: &str) -> Option<NaiveDateTime> {
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .map(|d| d.and_time(NaiveTime::MIN))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_york() -> LocalZone {
        LocalZone::from_name(Some("America/New_York")).unwrap()
    }

    #[test]
    fn test_parse_rfc3339_keeps_offset() {
        let dt = parse_timestamp("2025-03-10T09:00:00-07:00", &new_york()).unwrap();
        assert_eq!(dt.offset().local_minus_utc(), -7 * 3600);
        assert_eq!(dt.format("%H:%M").to_string(), "09:00");
    }

    #[test]
    fn test_parse_utc_suffix_without_seconds() {
        let dt = parse_timestamp("2025-03-10T09:00Z", &new_york()).unwrap();
        assert_eq!(dt.to_rfc3339(), "2025-03-10T09:00:00+00:00");
    }

    #[test]
    fn test_parse_naive_uses_zone() {
        let dt = parse_timestamp("2025-01-15T14:00:00", &new_york()).unwrap();
        assert_eq!(dt.to_rfc3339(), "2025-01-15T14:00:00-05:00");

        // Daylight saving time in July
        let dt = parse_timestamp("2025-07-15 14:00", &new_york()).unwrap();
        assert_eq!(dt.to_rfc3339(), "2025-07-15T14:00:00-04:00");
    }

    #[test]
    fn test_parse_bare_date_is_midnight() {
        let dt = parse_timestamp("2025-01-15", &new_york()).unwrap();
        assert_eq!(dt.to_rfc3339(), "2025-01-15T00:00:00-05:00");
    }

    #[test]
    fn test_parse_invalid() {
        for input in ["", "tomorrow afternoon", "2025-13-01T09:00:00", "09:00"] {
            let result = parse_timestamp(input, &new_york());
            assert!(
                matches!(result, Err(BookingError::InvalidTimeFormat(_))),
                "expected failure for {:?}",
                input
            );
        }
    }

    #[test]
    fn test_localize_skipped_time_fails() {
        // Clocks jump from 02:00 to 03:00 on 2025-03-09 in New York
        let result = parse_timestamp("2025-03-09T02:30:00", &new_york());
        assert!(matches!(result, Err(BookingError::InvalidTimeFormat(_))));
    }

    #[test]
    fn test_localize_repeated_time_takes_earliest() {
        // 01:30 happens twice on 2025-11-02 in New York
        let dt = parse_timestamp("2025-11-02T01:30:00", &new_york()).unwrap();
        assert_eq!(dt.to_rfc3339(), "2025-11-02T01:30:00-04:00");
    }

    #[test]
    fn test_zone_names() {
        assert_eq!(new_york().name(), Some("America/New_York".to_string()));
        assert_eq!(LocalZone::System.name(), None);
        assert!(LocalZone::from_name(Some("Mars/Olympus_Mons")).is_err());
    }
}
