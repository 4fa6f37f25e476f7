//! Amount parsing for Indonesian & English number formats
//!
//! Handles "50rb", "50k", "1.5jt", "5 juta", "50.000", "lima puluh ribu",
//! and plain numerics. The multiplier suffixes follow colloquial usage:
//! rb/ribu/k = thousand, jt/juta/m = million, milyar/miliar/b = billion.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref SHORTHAND_RE: Regex = Regex::new(
        r"(?i)(\d+(?:[.,]\d+)?)\s*(rb|ribu|k|jt|juta|m|million|milyar|miliar|b|billion)\b"
    )
    .expect("shorthand regex");
    static ref CURRENCY_RE: Regex = Regex::new(r"(?i)(?:rp\.?|idr|[$€¥£])\s*").expect("currency regex");
    static ref EUROPEAN_RE: Regex = Regex::new(r"\d+\.\d{3}").expect("european regex");
    static ref AMERICAN_RE: Regex = Regex::new(r"\d+,\d{3}").expect("american regex");
    static ref DOT_GROUPS_RE: Regex = Regex::new(r"^\d+(\.\d{3})+$").expect("dot groups regex");
    static ref EMBEDDED_AMOUNT_RE: Regex = Regex::new(
        r"(?i)(?:rp\.?\s*)?\d+(?:[.,]\d+)?\s*(?:rb|ribu|k|jt|juta|m|million|milyar|miliar)\b|(?:rp\.?\s*)?\d+[.,]\d{3}(?:[.,]\d{3})*|\b\d{3,}\b"
    )
    .expect("embedded amount regex");
}

fn suffix_multiplier(suffix: &str) -> f64 {
    match suffix {
        "rb" | "ribu" | "k" => 1_000.0,
        "jt" | "juta" | "m" | "million" => 1_000_000.0,
        "milyar" | "miliar" | "b" | "billion" => 1_000_000_000.0,
        _ => 1.0,
    }
}

/// Parse an amount from any supported text format.
///
/// Returns `None` when the text carries no parseable positive amount.
pub fn parse_amount(text: &str) -> Option<f64> {
    let text = text.trim().to_lowercase();
    if text.is_empty() {
        return None;
    }

    parse_shorthand(&text)
        .or_else(|| parse_numeric(&text))
        .or_else(|| parse_indonesian_words(&text))
        .filter(|v| *v > 0.0 && v.is_finite())
}

/// Shorthand with an explicit multiplier suffix: "50rb", "1.5jt", "2m".
fn parse_shorthand(text: &str) -> Option<f64> {
    let caps = SHORTHAND_RE.captures(text)?;
    let num: f64 = caps
        .get(1)?
        .as_str()
        .replace(',', ".")
        .parse()
        .ok()?;
    let suffix = caps.get(2)?.as_str().to_lowercase();
    Some(num * suffix_multiplier(&suffix))
}

/// Numeric formats with separators: "50.000", "1,000.50", "1.000,50", "25000".
fn parse_numeric(text: &str) -> Option<f64> {
    let cleaned = CURRENCY_RE.replace_all(text, "");
    let cleaned: String = cleaned.chars().filter(|c| !c.is_whitespace()).collect();

    let normalized = if EUROPEAN_RE.is_match(&cleaned) && cleaned.contains(',') {
        // European: 1.000,50 -> 1000.50
        cleaned.replace('.', "").replace(',', ".")
    } else if AMERICAN_RE.is_match(&cleaned) {
        // American: 1,000.50 -> 1000.50
        cleaned.replace(',', "")
    } else if DOT_GROUPS_RE.is_match(&cleaned) {
        // Indonesian: 50.000 -> 50000
        cleaned.replace('.', "")
    } else {
        cleaned
    };

    normalized.parse().ok()
}

const WORD_VALUES: &[(&str, f64)] = &[
    ("nol", 0.0),
    ("satu", 1.0),
    ("dua", 2.0),
    ("tiga", 3.0),
    ("empat", 4.0),
    ("lima", 5.0),
    ("enam", 6.0),
    ("tujuh", 7.0),
    ("delapan", 8.0),
    ("sembilan", 9.0),
    ("sepuluh", 10.0),
    ("sebelas", 11.0),
    ("puluh", 10.0),
    ("ratus", 100.0),
    ("seratus", 100.0),
    ("ribu", 1_000.0),
    ("seribu", 1_000.0),
    ("juta", 1_000_000.0),
    ("sejuta", 1_000_000.0),
    ("jt", 1_000_000.0),
    ("milyar", 1_000_000_000.0),
    ("miliar", 1_000_000_000.0),
];

fn word_value(word: &str) -> Option<f64> {
    WORD_VALUES
        .iter()
        .find(|(w, _)| *w == word)
        .map(|(_, v)| *v)
}

/// Indonesian number words: "lima puluh ribu" -> 50000,
/// "satu juta lima ratus ribu" -> 1500000.
fn parse_indonesian_words(text: &str) -> Option<f64> {
    let words: Vec<&str> = text
        .split_whitespace()
        .filter(|w| *w != "rupiah" && *w != "rp")
        .collect();

    if !words.iter().any(|w| word_value(w).is_some()) {
        return None;
    }

    let mut total = 0.0;
    let mut current = 0.0;

    for word in words {
        let Some(num) = word_value(word) else {
            continue;
        };

        if num >= 1_000.0 {
            // Multiplier word: "ribu", "juta", ...
            if current == 0.0 {
                current = 1.0;
            }
            total += current * num;
            current = 0.0;
        } else if (10.0..1_000.0).contains(&num) {
            // "puluh" / "ratus" scale whatever was accumulated
            if current == 0.0 {
                current = num;
            } else {
                current *= num;
            }
        } else {
            current += num;
        }
    }

    total += current;
    if total > 0.0 {
        Some(total)
    } else {
        None
    }
}

/// Find and parse an amount embedded in a full natural-language message.
///
/// "catat pengeluaran 50rb beli makan" -> 50000
pub fn extract_amount(message: &str) -> Option<f64> {
    let lower = message.to_lowercase();

    for m in EMBEDDED_AMOUNT_RE.find_iter(&lower) {
        if let Some(amount) = parse_amount(m.as_str()) {
            if amount > 0.0 {
                return Some(amount);
            }
        }
    }

    parse_indonesian_words(&lower).filter(|v| *v > 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shorthand_formats() {
        assert_eq!(parse_amount("50rb"), Some(50_000.0));
        assert_eq!(parse_amount("50k"), Some(50_000.0));
        assert_eq!(parse_amount("1.5jt"), Some(1_500_000.0));
        assert_eq!(parse_amount("5 juta"), Some(5_000_000.0));
        assert_eq!(parse_amount("2 milyar"), Some(2_000_000_000.0));
    }

    #[test]
    fn test_numeric_formats() {
        assert_eq!(parse_amount("25000"), Some(25_000.0));
        assert_eq!(parse_amount("50.000"), Some(50_000.0));
        assert_eq!(parse_amount("Rp 50.000"), Some(50_000.0));
        assert_eq!(parse_amount("1,000.50"), Some(1_000.5));
        assert_eq!(parse_amount("1.000,50"), Some(1_000.5));
    }

    #[test]
    fn test_word_numbers() {
        assert_eq!(parse_amount("lima puluh ribu"), Some(50_000.0));
        assert_eq!(parse_amount("satu juta lima ratus ribu"), Some(1_500_000.0));
        assert_eq!(parse_amount("dua ratus ribu"), Some(200_000.0));
    }

    #[test]
    fn test_rejects_garbage() {
        assert_eq!(parse_amount(""), None);
        assert_eq!(parse_amount("makan siang"), None);
        assert_eq!(parse_amount("nol"), None);
    }

    #[test]
    fn test_extract_from_message() {
        assert_eq!(
            extract_amount("catat pengeluaran 50rb beli makan"),
            Some(50_000.0)
        );
        assert_eq!(extract_amount("transfer 1.5jt dari BCA"), Some(1_500_000.0));
        assert_eq!(
            extract_amount("tambah pemasukan lima juta dari gaji"),
            Some(5_000_000.0)
        );
        assert_eq!(extract_amount("halo apa kabar"), None);
    }

    #[test]
    fn test_same_parser_is_stable() {
        // The chat grammar and direct entry share one parser: equal inputs,
        // equal outputs, every time.
        for input in ["50rb", "1 juta", "25000"] {
            assert_eq!(parse_amount(input), parse_amount(input));
        }
        assert_eq!(parse_amount("1 juta"), Some(1_000_000.0));
    }
}
