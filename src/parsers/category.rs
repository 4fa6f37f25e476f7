//! Category normalization and keyword-based suggestion

use crate::models::TransactionKind;

pub const EXPENSE_CATEGORIES: &[&str] = &[
    "Makan",
    "Transport",
    "Hiburan",
    "Belanja",
    "Kesehatan",
    "Investasi",
    "Utilitas",
    "Pendidikan",
    "Lainnya",
];

pub const INCOME_CATEGORIES: &[&str] = &[
    "Gaji",
    "Bonus",
    "Investment",
    "Freelance",
    "Gift",
    "Refund",
    "Lainnya",
];

/// Description keywords that imply a category.
const CATEGORY_KEYWORDS: &[(&str, &[&str])] = &[
    (
        "Makan",
        &["makan", "resto", "kopi", "cafe", "lunch", "dinner", "warung", "pizza", "sarapan"],
    ),
    (
        "Transport",
        &["gojek", "grab", "bus", "taksi", "kereta", "bensin", "motor", "parkir"],
    ),
    (
        "Hiburan",
        &["bioskop", "game", "spotify", "netflix", "konser", "tiket"],
    ),
    (
        "Belanja",
        &["supermarket", "mall", "toko", "online", "fashion", "sepatu", "baju"],
    ),
    (
        "Kesehatan",
        &["apotek", "dokter", "rumah sakit", "vitamin", "obat"],
    ),
    (
        "Investasi",
        &["saham", "crypto", "reksa dana", "emas", "obligasi"],
    ),
    (
        "Utilitas",
        &["listrik", "air", "internet", "telepon", "gas", "pulsa"],
    ),
    ("Gaji", &["salary", "gaji", "payroll", "upah"]),
    ("Bonus", &["bonus", "thr"]),
    ("Freelance", &["freelance", "proyek", "project"]),
];

pub fn categories_for(kind: TransactionKind) -> &'static [&'static str] {
    match kind {
        TransactionKind::Income => INCOME_CATEGORIES,
        _ => EXPENSE_CATEGORIES,
    }
}

/// Suggest a category from free-text description keywords.
pub fn suggest_category(description: &str, kind: TransactionKind) -> Option<&'static str> {
    if description.trim().is_empty() {
        return None;
    }
    let lower = description.to_lowercase();
    let valid = categories_for(kind);

    CATEGORY_KEYWORDS
        .iter()
        .find(|(category, keywords)| {
            valid.contains(category) && keywords.iter().any(|kw| lower.contains(kw))
        })
        .map(|(category, _)| *category)
}

/// Normalize a user-supplied category. Known names are canonicalized;
/// unknown non-empty names are accepted as custom categories.
pub fn normalize_category(input: &str, kind: TransactionKind) -> Option<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }

    let lower = trimmed.to_lowercase();
    if let Some(known) = categories_for(kind)
        .iter()
        .find(|c| c.to_lowercase() == lower)
    {
        return Some(known.to_string());
    }

    // Custom category: title-case the first letter
    let mut chars = trimmed.chars();
    let first = chars.next()?;
    Some(first.to_uppercase().collect::<String>() + chars.as_str())
}

pub fn categories_display(kind: TransactionKind) -> String {
    categories_for(kind).join(", ")
}
