use chrono::{NaiveDate, NaiveDateTime};

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];
const DATETIME_FORMATS: [&str; 6] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Parse the date forms seen in the raw extracts. Anything else, including
/// out-of-range calendar values like `2024-13-40`, is `None`.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }
    // tolerate a trailing fractional second or zone marker on ISO timestamps
    let s = s.trim_end_matches('Z');
    let s = s.split('.').next().unwrap_or(s);
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn accepts_known_forms() {
        assert_eq!(parse_date("2024-05-01"), Some(ymd(2024, 5, 1)));
        assert_eq!(parse_date("2024/05/01"), Some(ymd(2024, 5, 1)));
        assert_eq!(parse_date("05/01/2024"), Some(ymd(2024, 5, 1)));
        assert_eq!(parse_date(" 2024-05-01 13:45:00 "), Some(ymd(2024, 5, 1)));
        assert_eq!(parse_date("2024-05-01T13:45:00.123Z"), Some(ymd(2024, 5, 1)));
    }

    #[test]
    fn rejects_impossible_dates() {
        assert_eq!(parse_date("2024-13-40"), None);
        assert_eq!(parse_date("2023-02-29"), None);
        assert_eq!(parse_date("yesterday"), None);
        assert_eq!(parse_date(""), None);
    }
}
