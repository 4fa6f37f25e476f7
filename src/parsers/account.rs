//! Account name resolution against the known-account enumeration
//!
//! Exact and alias matches are free; everything else is ranked with
//! Jaro-Winkler similarity so "gopya" still finds Gopay. Matches below the
//! acceptance threshold are rejected rather than guessed.

use serde::{Deserialize, Serialize};

/// Minimum Jaro-Winkler similarity for an acceptable fuzzy match
const JARO_WINKLER_THRESHOLD: f64 = 0.80;

/// Similarity above which a fuzzy match needs no confirmation
const HIGH_CONFIDENCE_THRESHOLD: f64 = 0.92;

/// Destination that routes a transfer into the savings bucket; exempt from
/// the source != destination rule.
pub const SAVINGS_PASSTHROUGH: &str = "Savings";

/// Fixed account enumeration, mirrored from the ledger's account set.
pub const KNOWN_ACCOUNTS: &[&str] = &[
    "Cash",
    "BCA",
    "Maybank",
    "Seabank",
    "Shopeepay",
    "Gopay",
    "Jago",
    "ISaku",
    "Ovo",
    "Superbank",
    "Blu",
    SAVINGS_PASSTHROUGH,
];

/// Colloquial aliases that map straight to a known account.
const ACCOUNT_ALIASES: &[(&str, &str)] = &[
    ("tunai", "Cash"),
    ("kas", "Cash"),
    ("dompet", "Cash"),
    ("uang tunai", "Cash"),
    ("bank bca", "BCA"),
    ("shopee", "Shopeepay"),
    ("shopee pay", "Shopeepay"),
    ("go pay", "Gopay"),
    ("gojek", "Gopay"),
    ("i.saku", "ISaku"),
    ("blu bca", "Blu"),
    ("tabungan", SAVINGS_PASSTHROUGH),
    ("saving", SAVINGS_PASSTHROUGH),
];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MatchConfidence {
    Exact,
    High,
    Medium,
    NoMatch,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountMatch {
    pub name: String,
    pub confidence: MatchConfidence,
    pub alternatives: Vec<String>,
}

/// Resolve a user-supplied account name against the known enumeration.
pub fn match_account(input: &str) -> AccountMatch {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return AccountMatch {
            name: String::new(),
            confidence: MatchConfidence::NoMatch,
            alternatives: Vec::new(),
        };
    }

    let lower = trimmed.to_lowercase();

    // Exact match against the enumeration, case-insensitive
    if let Some(name) = KNOWN_ACCOUNTS
        .iter()
        .find(|a| a.to_lowercase() == lower)
    {
        return AccountMatch {
            name: name.to_string(),
            confidence: MatchConfidence::Exact,
            alternatives: Vec::new(),
        };
    }

    // Alias table
    if let Some((_, name)) = ACCOUNT_ALIASES.iter().find(|(alias, _)| *alias == lower) {
        return AccountMatch {
            name: name.to_string(),
            confidence: MatchConfidence::Exact,
            alternatives: Vec::new(),
        };
    }

    // Jaro-Winkler ranking over the enumeration
    let mut scored: Vec<(f64, &&str)> = KNOWN_ACCOUNTS
        .iter()
        .map(|a| (strsim::jaro_winkler(&lower, &a.to_lowercase()), a))
        .collect();
    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

    let (best_score, best) = (scored[0].0, scored[0].1);
    if best_score >= JARO_WINKLER_THRESHOLD {
        let confidence = if best_score >= HIGH_CONFIDENCE_THRESHOLD {
            MatchConfidence::High
        } else {
            MatchConfidence::Medium
        };
        let alternatives = scored
            .iter()
            .skip(1)
            .take(2)
            .filter(|(score, _)| *score >= JARO_WINKLER_THRESHOLD)
            .map(|(_, name)| name.to_string())
            .collect();
        return AccountMatch {
            name: best.to_string(),
            confidence,
            alternatives,
        };
    }

    AccountMatch {
        name: String::new(),
        confidence: MatchConfidence::NoMatch,
        alternatives: Vec::new(),
    }
}

/// Convenience for callers that only need the normalized name.
pub fn normalize_account(input: &str) -> Option<String> {
    let m = match_account(input);
    match m.confidence {
        MatchConfidence::NoMatch => None,
        _ => Some(m.name),
    }
}

/// Listing for clarifying questions ("Dari akun mana? ...").
pub fn known_accounts_display() -> String {
    KNOWN_ACCOUNTS.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_and_case_insensitive() {
        assert_eq!(match_account("Cash").name, "Cash");
        assert_eq!(match_account("cash").confidence, MatchConfidence::Exact);
        assert_eq!(match_account("OVO").name, "Ovo");
    }

    #[test]
    fn test_aliases() {
        assert_eq!(match_account("tunai").name, "Cash");
        assert_eq!(match_account("gojek").name, "Gopay");
        assert_eq!(match_account("tabungan").name, SAVINGS_PASSTHROUGH);
    }

    #[test]
    fn test_fuzzy_typos() {
        let m = match_account("gopya");
        assert_eq!(m.name, "Gopay");
        assert_ne!(m.confidence, MatchConfidence::NoMatch);

        let m = match_account("shoppepay");
        assert_eq!(m.name, "Shopeepay");
    }

    #[test]
    fn test_unknown_rejected() {
        assert_eq!(
            match_account("paypal").confidence,
            MatchConfidence::NoMatch
        );
        assert_eq!(normalize_account("xyzzy"), None);
        assert_eq!(normalize_account(""), None);
    }
}
