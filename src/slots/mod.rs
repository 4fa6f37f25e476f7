//! Slot-filling state machine
//!
//! Each intent carries a fixed ordered list of required fields. The first
//! actionable utterance goes through a bulk extraction pass (single-turn
//! fast path); after that, every turn answers exactly one field and the
//! machine asks exactly one clarifying question. Parse failures repeat the
//! question; there is no retry cap short of session expiry. Business
//! validation (account existence, ownership) is NOT done here.

use crate::models::{
    ActionKind, ConversationState, FieldKind, Language, TransactionKind,
};
use crate::parsers::{account, amount, category, date};
use crate::resolver;
use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use tracing::debug;

lazy_static! {
    static ref ID_RE: Regex = Regex::new(r"\b(\d+)\b").expect("id regex");
    static ref FROM_ACCOUNT_RE: Regex =
        Regex::new(r"(?i)\b(?:dari|from|pakai|pake|via)\s+([a-z]+(?:\s[a-z]+)?)").expect("from regex");
    static ref TO_ACCOUNT_RE: Regex =
        Regex::new(r"(?i)\b(?:ke|to)\s+([a-z]+(?:\s[a-z]+)?)").expect("to regex");
}

/// Ordered required fields per intent. Order is the asking order.
pub fn required_fields(intent: ActionKind) -> &'static [FieldKind] {
    match intent {
        ActionKind::AddTransaction => &[
            FieldKind::TransactionType,
            FieldKind::Amount,
            FieldKind::Category,
            FieldKind::Account,
            FieldKind::Date,
        ],
        ActionKind::EditTransaction => &[
            FieldKind::TransactionId,
            FieldKind::EditField,
            FieldKind::NewValue,
        ],
        ActionKind::DeleteTransaction => &[FieldKind::TransactionId],
        ActionKind::TransferFunds => &[
            FieldKind::Amount,
            FieldKind::FromAccount,
            FieldKind::ToAccount,
        ],
        ActionKind::TransferToSavings => &[
            FieldKind::Amount,
            FieldKind::FromAccount,
            FieldKind::GoalId,
        ],
        ActionKind::CreateSavingsGoal => &[FieldKind::Name, FieldKind::TargetAmount],
        ActionKind::UpdateSavingsGoal => &[
            FieldKind::GoalId,
            FieldKind::EditField,
            FieldKind::NewValue,
        ],
        ActionKind::DeleteSavingsGoal => &[FieldKind::GoalId],
        ActionKind::QuerySummary => &[],
    }
}

/// First required field not yet collected.
pub fn next_missing(intent: ActionKind, partial: &serde_json::Map<String, Value>) -> Option<FieldKind> {
    required_fields(intent)
        .iter()
        .find(|field| !partial.contains_key(field.key()))
        .copied()
}

//
// ================= Outcome =================
//

#[derive(Debug, Clone, PartialEq)]
pub enum SlotStatus {
    /// All required fields collected; hand off to the validator
    Complete,
    /// One field still missing; ask exactly this question
    NeedsField { field: FieldKind, question: String },
    /// Explicit cancellation; clear the conversation state
    Cancelled,
}

pub struct SlotMachine;

impl SlotMachine {
    /// Seed a fresh state from the first actionable utterance, extracting
    /// every field the utterance already carries.
    pub fn start(
        state: &mut ConversationState,
        utterance: &str,
        language: Language,
        today: NaiveDate,
    ) -> SlotStatus {
        extract_initial(state.intent, utterance, today, &mut state.partial_data);
        debug!(
            intent = %state.intent,
            collected = state.partial_data.len(),
            "initial slot extraction"
        );
        Self::ask_or_complete(state, language)
    }

    /// Advance the machine with a follow-up utterance. The utterance is
    /// parsed against the single awaited field (field-type priority); on
    /// parse failure the same question repeats, rephrased.
    pub fn advance(
        state: &mut ConversationState,
        utterance: &str,
        language: Language,
        today: NaiveDate,
    ) -> SlotStatus {
        if resolver::is_cancellation(utterance) {
            return SlotStatus::Cancelled;
        }

        let awaited = match state.awaiting.or_else(|| next_missing(state.intent, &state.partial_data)) {
            Some(field) => field,
            None => return SlotStatus::Complete,
        };

        match parse_field_answer(awaited, utterance, state.intent, &state.partial_data, today) {
            Some(value) => {
                state.partial_data.insert(awaited.key().to_string(), value);
                state.awaiting = None;
                Self::ask_or_complete(state, language)
            }
            None => {
                debug!(field = %awaited, "field extraction failed, repeating question");
                let question = question_for(state.intent, awaited, language, &state.partial_data);
                state.awaiting = Some(awaited);
                SlotStatus::NeedsField {
                    field: awaited,
                    question: rephrase(question, language),
                }
            }
        }
    }

    /// Re-enter the machine for one specific field after a validation
    /// failure (the validator's field-level rejection path).
    pub fn reask(
        state: &mut ConversationState,
        field: FieldKind,
        reason: &str,
        language: Language,
    ) -> SlotStatus {
        state.partial_data.remove(field.key());
        state.awaiting = Some(field);
        let question = question_for(state.intent, field, language, &state.partial_data);
        SlotStatus::NeedsField {
            field,
            question: format!("{} {}", reason, question),
        }
    }

    fn ask_or_complete(state: &mut ConversationState, language: Language) -> SlotStatus {
        match next_missing(state.intent, &state.partial_data) {
            None => {
                state.awaiting = None;
                SlotStatus::Complete
            }
            Some(field) => {
                state.awaiting = Some(field);
                let question = question_for(state.intent, field, language, &state.partial_data);
                SlotStatus::NeedsField { field, question }
            }
        }
    }
}

fn rephrase(question: String, language: Language) -> String {
    match language {
        Language::Indonesian => format!("Maaf, saya belum menangkap. {}", question),
        Language::English => format!("Sorry, I didn't catch that. {}", question),
    }
}

//
// ================= Initial Bulk Extraction =================
//

fn transaction_type_from(utterance: &str) -> Option<TransactionKind> {
    const INCOME_HINTS: &[&str] = &[
        "pemasukan", "income", "gaji", "saya dapat", "saya terima", "received",
        "earned", "bonus",
    ];
    const EXPENSE_HINTS: &[&str] = &[
        "pengeluaran", "expense", "habiskan", "spent", "beli", "bayar", "paid",
        "bought",
    ];

    if INCOME_HINTS.iter().any(|kw| utterance.contains(kw)) {
        Some(TransactionKind::Income)
    } else if EXPENSE_HINTS.iter().any(|kw| utterance.contains(kw)) {
        Some(TransactionKind::Expense)
    } else {
        None
    }
}

fn account_from_marker(utterance: &str, re: &Regex) -> Option<String> {
    for caps in re.captures_iter(utterance) {
        let candidate = caps.get(1)?.as_str();
        // Try the two-word capture first, then its first word
        if let Some(name) = account::normalize_account(candidate) {
            return Some(name);
        }
        if let Some(first_word) = candidate.split_whitespace().next() {
            if let Some(name) = account::normalize_account(first_word) {
                return Some(name);
            }
        }
    }
    None
}

fn date_from(utterance: &str, today: NaiveDate) -> Option<NaiveDate> {
    const DATE_TOKENS: &[&str] = &["hari ini", "kemarin", "besok", "lusa", "yesterday", "today"];
    DATE_TOKENS
        .iter()
        .find(|token| utterance.contains(**token))
        .and_then(|token| date::parse_date(token, today))
}

fn first_id(utterance: &str) -> Option<i64> {
    ID_RE
        .captures(utterance)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Words that carry no information for a goal name.
const GOAL_NAME_STOPWORDS: &[&str] = &[
    "buat", "bikin", "target", "tabungan", "tujuan", "menabung", "nabung",
    "saving", "goal", "create", "untuk", "baru", "rb", "ribu", "juta", "jt",
];

fn goal_name_from(utterance: &str) -> Option<String> {
    let words: Vec<&str> = utterance
        .split_whitespace()
        .filter(|w| {
            !GOAL_NAME_STOPWORDS.contains(w)
                && !w.chars().any(|c| c.is_ascii_digit())
                && amount::parse_amount(w).is_none()
        })
        .collect();

    if words.is_empty() {
        return None;
    }

    let name = words.join(" ");
    let mut chars = name.chars();
    let first = chars.next()?;
    Some(first.to_uppercase().collect::<String>() + chars.as_str())
}

/// Pull every extractable field out of the first utterance.
fn extract_initial(
    intent: ActionKind,
    utterance: &str,
    today: NaiveDate,
    partial: &mut serde_json::Map<String, Value>,
) {
    let lower = utterance.to_lowercase();

    let mut put = |field: FieldKind, value: Value| {
        partial.insert(field.key().to_string(), value);
    };

    match intent {
        ActionKind::AddTransaction => {
            let kind = transaction_type_from(&lower).unwrap_or(TransactionKind::Expense);
            put(FieldKind::TransactionType, Value::String(kind.to_string()));

            if let Some(amount) = amount::extract_amount(&lower) {
                put(FieldKind::Amount, json_number(amount));
            }
            if let Some(acct) = account_from_marker(&lower, &FROM_ACCOUNT_RE) {
                put(FieldKind::Account, Value::String(acct));
            }
            if let Some(cat) = category::suggest_category(&lower, kind) {
                put(FieldKind::Category, Value::String(cat.to_string()));
            }
            let date = date_from(&lower, today).unwrap_or(today);
            put(FieldKind::Date, Value::String(date.to_string()));
        }
        ActionKind::TransferFunds => {
            if let Some(amount) = amount::extract_amount(&lower) {
                put(FieldKind::Amount, json_number(amount));
            }
            if let Some(from) = account_from_marker(&lower, &FROM_ACCOUNT_RE) {
                put(FieldKind::FromAccount, Value::String(from));
            }
            if let Some(to) = account_from_marker(&lower, &TO_ACCOUNT_RE) {
                put(FieldKind::ToAccount, Value::String(to));
            }
        }
        ActionKind::TransferToSavings => {
            if let Some(amount) = amount::extract_amount(&lower) {
                put(FieldKind::Amount, json_number(amount));
            }
            if let Some(from) = account_from_marker(&lower, &FROM_ACCOUNT_RE) {
                put(FieldKind::FromAccount, Value::String(from));
            }
        }
        ActionKind::CreateSavingsGoal => {
            if let Some(amount) = amount::extract_amount(&lower) {
                put(FieldKind::TargetAmount, json_number(amount));
            }
            if let Some(name) = goal_name_from(&lower) {
                put(FieldKind::Name, Value::String(name));
            }
        }
        ActionKind::EditTransaction | ActionKind::DeleteTransaction => {
            if let Some(id) = first_id(&lower) {
                put(FieldKind::TransactionId, Value::from(id));
            }
        }
        ActionKind::UpdateSavingsGoal | ActionKind::DeleteSavingsGoal => {
            if let Some(id) = first_id(&lower) {
                put(FieldKind::GoalId, Value::from(id));
            }
        }
        ActionKind::QuerySummary => {}
    }
}

fn json_number(value: f64) -> Value {
    serde_json::Number::from_f64(value)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

//
// ================= Per-Field Answer Parsing =================
//

const EDITABLE_FIELDS: &[(&str, &[&str])] = &[
    ("amount", &["jumlah", "amount", "nominal", "nilai"]),
    ("category", &["kategori", "category"]),
    ("date", &["tanggal", "date"]),
    ("account", &["akun", "account", "rekening"]),
    ("description", &["deskripsi", "description", "keterangan"]),
    ("type", &["tipe", "jenis", "type"]),
    ("name", &["nama", "name"]),
    ("target_amount", &["target"]),
    ("target_date", &["deadline", "tenggat"]),
];

fn editable_field_from(utterance: &str) -> Option<&'static str> {
    let lower = utterance.trim().to_lowercase();
    EDITABLE_FIELDS
        .iter()
        .find(|(_, aliases)| aliases.iter().any(|a| lower.contains(a)))
        .map(|(canonical, _)| *canonical)
}

/// Parse an utterance as the answer to one awaited field. Returns `None`
/// when the expected value cannot be extracted.
fn parse_field_answer(
    field: FieldKind,
    utterance: &str,
    intent: ActionKind,
    partial: &serde_json::Map<String, Value>,
    today: NaiveDate,
) -> Option<Value> {
    let trimmed = utterance.trim();
    if trimmed.is_empty() {
        return None;
    }
    let lower = trimmed.to_lowercase();

    match field {
        FieldKind::Amount | FieldKind::TargetAmount => {
            amount::extract_amount(&lower).map(json_number)
        }
        FieldKind::TransactionType => transaction_type_from(&lower)
            .map(|kind| Value::String(kind.to_string())),
        FieldKind::Category => {
            let kind = partial
                .get(FieldKind::TransactionType.key())
                .and_then(|v| v.as_str())
                .and_then(TransactionKind::parse)
                .unwrap_or(TransactionKind::Expense);
            category::normalize_category(trimmed, kind).map(Value::String)
        }
        FieldKind::Account | FieldKind::FromAccount | FieldKind::ToAccount => {
            let marker_re = if field == FieldKind::ToAccount {
                &*TO_ACCOUNT_RE
            } else {
                &*FROM_ACCOUNT_RE
            };
            account_from_marker(&lower, marker_re)
                .or_else(|| account::normalize_account(trimmed))
                .map(Value::String)
        }
        FieldKind::Date | FieldKind::TargetDate => date::parse_date(&lower, today)
            .map(|d| Value::String(d.to_string())),
        FieldKind::TransactionId | FieldKind::GoalId => first_id(&lower).map(Value::from),
        FieldKind::Name => {
            let name = if matches!(intent, ActionKind::CreateSavingsGoal) {
                goal_name_from(&lower).unwrap_or_else(|| titlecase(trimmed))
            } else {
                trimmed.to_string()
            };
            Some(Value::String(name))
        }
        FieldKind::EditField => editable_field_from(&lower)
            .map(|f| Value::String(f.to_string())),
        FieldKind::NewValue | FieldKind::Description => {
            Some(Value::String(trimmed.to_string()))
        }
    }
}

fn titlecase(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

//
// ================= Clarifying Questions =================
//

/// Exactly one question per turn, never two fields at once.
pub fn question_for(
    intent: ActionKind,
    field: FieldKind,
    language: Language,
    partial: &serde_json::Map<String, Value>,
) -> String {
    let id = matches!(language, Language::Indonesian);

    match field {
        FieldKind::Amount => {
            if intent == ActionKind::TransferFunds || intent == ActionKind::TransferToSavings {
                if id {
                    "Berapa jumlah yang di-transfer? (misal: 50rb, 100k, 5 juta)".to_string()
                } else {
                    "How much should be transferred? (e.g. 50rb, 100k, 5 juta)".to_string()
                }
            } else if id {
                "Berapa jumlahnya? (misal: 50rb, 100k, 5 juta)".to_string()
            } else {
                "How much? (e.g. 50rb, 100k, 5 juta)".to_string()
            }
        }
        FieldKind::TransactionType => {
            if id {
                "Ini pemasukan atau pengeluaran?".to_string()
            } else {
                "Is this income or an expense?".to_string()
            }
        }
        FieldKind::Category => {
            let kind = partial
                .get(FieldKind::TransactionType.key())
                .and_then(|v| v.as_str())
                .and_then(TransactionKind::parse)
                .unwrap_or(TransactionKind::Expense);
            if id {
                format!("Kategori apa? (misal: {})", category::categories_display(kind))
            } else {
                format!("Which category? (e.g. {})", category::categories_display(kind))
            }
        }
        FieldKind::Account => {
            if id {
                "Dari akun mana? (misal: Cash, BCA, Ovo, Gopay)".to_string()
            } else {
                "Which account? (e.g. Cash, BCA, Ovo, Gopay)".to_string()
            }
        }
        FieldKind::Date => {
            if id {
                "Tanggal berapa? (misal: hari ini, kemarin, 2026-08-01)".to_string()
            } else {
                "What date? (e.g. today, yesterday, 2026-08-01)".to_string()
            }
        }
        FieldKind::FromAccount => {
            if id {
                "Transfer dari akun mana? (misal: Cash, BCA)".to_string()
            } else {
                "Transfer from which account? (e.g. Cash, BCA)".to_string()
            }
        }
        FieldKind::ToAccount => {
            if id {
                "Transfer ke akun mana? (misal: Savings, Ovo)".to_string()
            } else {
                "Transfer to which account? (e.g. Savings, Ovo)".to_string()
            }
        }
        FieldKind::TransactionId => {
            if id {
                "Transaksi yang mana? Sebutkan ID-nya.".to_string()
            } else {
                "Which transaction? Give me its ID.".to_string()
            }
        }
        FieldKind::GoalId => {
            if id {
                "Target tabungan yang mana? Sebutkan ID-nya.".to_string()
            } else {
                "Which savings goal? Give me its ID.".to_string()
            }
        }
        FieldKind::Name => {
            if id {
                "Target tabungan untuk apa? (misal: Liburan, Laptop, Rumah)".to_string()
            } else {
                "What is the goal for? (e.g. Vacation, Laptop, House)".to_string()
            }
        }
        FieldKind::TargetAmount => {
            if id {
                "Target berapa jumlahnya?".to_string()
            } else {
                "What is the target amount?".to_string()
            }
        }
        FieldKind::TargetDate => {
            if id {
                "Target kapan? (misal: 6 bulan, akhir tahun, 2026-12-31)".to_string()
            } else {
                "By when? (e.g. 6 bulan, akhir tahun, 2026-12-31)".to_string()
            }
        }
        FieldKind::EditField => {
            if id {
                "Apa yang mau diubah? (jumlah, kategori, tanggal, akun, deskripsi)".to_string()
            } else {
                "What should change? (amount, category, date, account, description)".to_string()
            }
        }
        FieldKind::NewValue => {
            if id {
                "Nilai barunya apa?".to_string()
            } else {
                "What is the new value?".to_string()
            }
        }
        FieldKind::Description => {
            if id {
                "Deskripsinya apa?".to_string()
            } else {
                "What is the description?".to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 6).unwrap()
    }

    fn fresh(intent: ActionKind) -> ConversationState {
        ConversationState::new(Uuid::new_v4(), Uuid::new_v4(), intent)
    }

    #[test]
    fn test_single_turn_add_transaction() {
        // "catat pengeluaran makan 50rb dari cash" carries every field
        let mut state = fresh(ActionKind::AddTransaction);
        let status = SlotMachine::start(
            &mut state,
            "catat pengeluaran makan 50rb dari cash",
            Language::Indonesian,
            today(),
        );

        assert_eq!(status, SlotStatus::Complete);
        let p = &state.partial_data;
        assert_eq!(p.get("type").unwrap(), "expense");
        assert_eq!(p.get("amount").unwrap().as_f64(), Some(50_000.0));
        assert_eq!(p.get("account").unwrap(), "Cash");
        assert_eq!(p.get("category").unwrap(), "Makan");
        assert_eq!(p.get("date").unwrap(), "2026-08-06");
    }

    #[test]
    fn test_transfer_multi_turn_flow() {
        // Turn 1: "transfer ke ovo" -> asks amount
        let mut state = fresh(ActionKind::TransferFunds);
        let status =
            SlotMachine::start(&mut state, "transfer ke ovo", Language::Indonesian, today());
        assert!(matches!(
            status,
            SlotStatus::NeedsField { field: FieldKind::Amount, .. }
        ));
        assert_eq!(state.partial_data.get("to_account").unwrap(), "Ovo");

        // Turn 2: "100000" -> asks source account
        let status = SlotMachine::advance(&mut state, "100000", Language::Indonesian, today());
        assert!(matches!(
            status,
            SlotStatus::NeedsField { field: FieldKind::FromAccount, .. }
        ));
        assert_eq!(
            state.partial_data.get("amount").unwrap().as_f64(),
            Some(100_000.0)
        );

        // Turn 3: "dari cash" -> complete
        let status = SlotMachine::advance(&mut state, "dari cash", Language::Indonesian, today());
        assert_eq!(status, SlotStatus::Complete);
        assert_eq!(state.partial_data.get("from_account").unwrap(), "Cash");
    }

    #[test]
    fn test_parse_failure_repeats_question() {
        let mut state = fresh(ActionKind::TransferFunds);
        SlotMachine::start(&mut state, "transfer ke ovo", Language::Indonesian, today());

        // Garbage while awaiting an amount: same field asked again
        let status =
            SlotMachine::advance(&mut state, "entah berapa ya", Language::Indonesian, today());
        match status {
            SlotStatus::NeedsField { field, question } => {
                assert_eq!(field, FieldKind::Amount);
                assert!(question.starts_with("Maaf"));
            }
            other => panic!("unexpected status: {:?}", other),
        }
        // Nothing was stored
        assert!(!state.partial_data.contains_key("amount"));
    }

    #[test]
    fn test_cancellation_at_any_point() {
        let mut state = fresh(ActionKind::TransferFunds);
        SlotMachine::start(&mut state, "transfer ke ovo", Language::Indonesian, today());
        let status = SlotMachine::advance(&mut state, "batal", Language::Indonesian, today());
        assert_eq!(status, SlotStatus::Cancelled);
    }

    #[test]
    fn test_goal_creation_extraction() {
        let mut state = fresh(ActionKind::CreateSavingsGoal);
        let status = SlotMachine::start(
            &mut state,
            "buat target tabungan liburan 5 juta",
            Language::Indonesian,
            today(),
        );

        assert_eq!(status, SlotStatus::Complete);
        assert_eq!(state.partial_data.get("name").unwrap(), "Liburan");
        assert_eq!(
            state.partial_data.get("target_amount").unwrap().as_f64(),
            Some(5_000_000.0)
        );
    }

    #[test]
    fn test_delete_needs_only_id() {
        let mut state = fresh(ActionKind::DeleteTransaction);
        let status = SlotMachine::start(
            &mut state,
            "hapus transaksi 123",
            Language::Indonesian,
            today(),
        );
        assert_eq!(status, SlotStatus::Complete);
        assert_eq!(state.partial_data.get("transaction_id").unwrap(), 123);
    }

    #[test]
    fn test_path_independence_of_slot_filling() {
        // All fields in one utterance...
        let mut single = fresh(ActionKind::TransferFunds);
        let status = SlotMachine::start(
            &mut single,
            "transfer 100rb dari cash ke ovo",
            Language::Indonesian,
            today(),
        );
        assert_eq!(status, SlotStatus::Complete);

        // ...or spread across three turns: identical collected data
        let mut multi = fresh(ActionKind::TransferFunds);
        SlotMachine::start(&mut multi, "transfer ke ovo", Language::Indonesian, today());
        SlotMachine::advance(&mut multi, "100rb", Language::Indonesian, today());
        let status = SlotMachine::advance(&mut multi, "cash", Language::Indonesian, today());
        assert_eq!(status, SlotStatus::Complete);

        assert_eq!(single.partial_data, multi.partial_data);
    }

    #[test]
    fn test_reask_drops_the_bad_field_only() {
        let mut state = fresh(ActionKind::TransferFunds);
        SlotMachine::start(
            &mut state,
            "transfer 100rb dari cash ke ovo",
            Language::Indonesian,
            today(),
        );

        let status = SlotMachine::reask(
            &mut state,
            FieldKind::ToAccount,
            "Akun tujuan tidak dikenal.",
            Language::Indonesian,
        );
        assert!(matches!(
            status,
            SlotStatus::NeedsField { field: FieldKind::ToAccount, .. }
        ));
        // Amount and source survive the re-ask
        assert!(state.partial_data.contains_key("amount"));
        assert!(state.partial_data.contains_key("from_account"));
        assert!(!state.partial_data.contains_key("to_account"));
    }

    #[test]
    fn test_edit_field_vocabulary() {
        assert_eq!(editable_field_from("jumlah"), Some("amount"));
        assert_eq!(editable_field_from("kategorinya"), Some("category"));
        assert_eq!(editable_field_from("warna"), None);
    }
}
