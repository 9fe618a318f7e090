use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, Utc};

// Form controls carry no zone; they are read and written as UTC.
const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
];

const DISPLAY_DATE: &str = "%Y-%m-%d";
const DISPLAY_DATETIME: &str = "%Y-%m-%dT%H:%M:%S";

pub fn parse_datetime(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }
    None
}

/// Calendar date at midnight UTC. A full timestamp is accepted and truncated.
pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    let date = match NaiveDate::parse_from_str(s, DISPLAY_DATE) {
        Ok(d) => d,
        Err(_) => parse_datetime(s)?.date_naive(),
    };
    Some(date.and_time(NaiveTime::MIN).and_utc())
}

pub fn to_wire(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn to_display_date(dt: &DateTime<Utc>) -> String {
    dt.format(DISPLAY_DATE).to_string()
}

pub fn to_display_datetime(dt: &DateTime<Utc>) -> String {
    dt.format(DISPLAY_DATETIME).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};

    #[test]
    fn display_round_trip_keeps_the_instant() {
        let original = Utc.with_ymd_and_hms(2024, 5, 1, 13, 45, 27).unwrap();
        let shown = to_display_datetime(&original);
        assert_eq!(shown, "2024-05-01T13:45:27");
        assert_eq!(parse_datetime(&shown), Some(original));
    }

    #[test]
    fn display_drops_only_subsecond_precision() {
        let wire = "2024-05-01T13:45:27.750Z";
        let parsed = parse_datetime(wire).expect("parse wire");
        let back = parse_datetime(&to_display_datetime(&parsed)).expect("reparse");
        assert_eq!(back, parsed.with_nanosecond(0).unwrap());
    }

    #[test]
    fn offsets_are_normalized_to_utc() {
        let parsed = parse_datetime("2024-05-01T10:00:00+02:00").expect("parse");
        assert_eq!(to_wire(&parsed), "2024-05-01T08:00:00Z");
    }

    #[test]
    fn minute_precision_control_values_parse() {
        let parsed = parse_datetime("2024-05-01T08:30").expect("parse");
        assert_eq!(to_wire(&parsed), "2024-05-01T08:30:00Z");
    }

    #[test]
    fn dates_land_on_midnight() {
        let d = parse_date("2024-05-01").expect("parse");
        assert_eq!(to_wire(&d), "2024-05-01T00:00:00Z");
        assert_eq!(to_display_date(&d), "2024-05-01");
        let truncated = parse_date("2024-05-01T18:20:00Z").expect("parse");
        assert_eq!(truncated, d);
    }

    #[test]
    fn garbage_is_rejected() {
        assert_eq!(parse_datetime("tomorrow"), None);
        assert_eq!(parse_date("2024-13-40"), None);
        assert_eq!(parse_date(""), None);
    }
}
