//! Date parsing with Indonesian/English relative terms
//!
//! Accepts ISO dates ("2026-12-31"), relative words ("hari ini", "kemarin",
//! "besok", "today"), duration offsets ("6 bulan", "2 minggu"), year-only
//! input (becomes Dec 31 of that year), and "akhir tahun".

use chrono::{Datelike, Duration, Months, NaiveDate};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref YEAR_ONLY_RE: Regex = Regex::new(r"^\d{4}$").expect("year regex");
    static ref DURATION_RE: Regex =
        Regex::new(r"(?i)^(\d+)\s*(hari|day|days|minggu|week|weeks|bulan|month|months|tahun|year|years)$")
            .expect("duration regex");
}

/// Parse a date string relative to `today`.
pub fn parse_date(text: &str, today: NaiveDate) -> Option<NaiveDate> {
    let text = text.trim().to_lowercase();
    if text.is_empty() {
        return None;
    }

    match text.as_str() {
        "hari ini" | "sekarang" | "today" | "now" => return Some(today),
        "kemarin" | "yesterday" => return Some(today - Duration::days(1)),
        "besok" | "tomorrow" => return Some(today + Duration::days(1)),
        "lusa" => return Some(today + Duration::days(2)),
        "akhir tahun" | "end of year" => {
            return NaiveDate::from_ymd_opt(today.year(), 12, 31);
        }
        "akhir bulan" | "end of month" => {
            let first_next = if today.month() == 12 {
                NaiveDate::from_ymd_opt(today.year() + 1, 1, 1)?
            } else {
                NaiveDate::from_ymd_opt(today.year(), today.month() + 1, 1)?
            };
            return Some(first_next - Duration::days(1));
        }
        _ => {}
    }

    if let Ok(date) = NaiveDate::parse_from_str(&text, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(date) = NaiveDate::parse_from_str(&text, "%d-%m-%Y") {
        return Some(date);
    }

    // Year only: "2026" means the end of that year (deadline semantics)
    if YEAR_ONLY_RE.is_match(&text) {
        let year: i32 = text.parse().ok()?;
        return NaiveDate::from_ymd_opt(year, 12, 31);
    }

    // Duration offset: "6 bulan" -> today + 6 months
    if let Some(caps) = DURATION_RE.captures(&text) {
        let n: u32 = caps.get(1)?.as_str().parse().ok()?;
        let unit = caps.get(2)?.as_str();
        return match unit {
            "hari" | "day" | "days" => Some(today + Duration::days(n as i64)),
            "minggu" | "week" | "weeks" => Some(today + Duration::weeks(n as i64)),
            "bulan" | "month" | "months" => today.checked_add_months(Months::new(n)),
            "tahun" | "year" | "years" => today.checked_add_months(Months::new(n * 12)),
            _ => None,
        };
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 6).unwrap()
    }

    #[test]
    fn test_relative_terms() {
        assert_eq!(parse_date("hari ini", today()), Some(today()));
        assert_eq!(
            parse_date("kemarin", today()),
            NaiveDate::from_ymd_opt(2026, 8, 5)
        );
        assert_eq!(
            parse_date("besok", today()),
            NaiveDate::from_ymd_opt(2026, 8, 7)
        );
    }

    #[test]
    fn test_iso_and_year_only() {
        assert_eq!(
            parse_date("2026-12-25", today()),
            NaiveDate::from_ymd_opt(2026, 12, 25)
        );
        assert_eq!(
            parse_date("2027", today()),
            NaiveDate::from_ymd_opt(2027, 12, 31)
        );
    }

    #[test]
    fn test_duration_offsets() {
        assert_eq!(
            parse_date("6 bulan", today()),
            NaiveDate::from_ymd_opt(2027, 2, 6)
        );
        assert_eq!(
            parse_date("2 minggu", today()),
            NaiveDate::from_ymd_opt(2026, 8, 20)
        );
    }

    #[test]
    fn test_end_of_period() {
        assert_eq!(
            parse_date("akhir tahun", today()),
            NaiveDate::from_ymd_opt(2026, 12, 31)
        );
        assert_eq!(
            parse_date("akhir bulan", today()),
            NaiveDate::from_ymd_opt(2026, 8, 31)
        );
    }

    #[test]
    fn test_rejects_noise() {
        assert_eq!(parse_date("", today()), None);
        assert_eq!(parse_date("nanti aja", today()), None);
    }
}
