//! Action validation
//!
//! Turns the untyped `partial_data` bag into typed `ActionArgs`, enforcing
//! range checks, the known-account enumeration, and referential/ownership
//! integrity through the ledger. This is the single choke point: the
//! executor trusts validated args completely. Failures carry the offending
//! field so the orchestrator can re-ask exactly that one question.

use crate::error::PipelineError;
use crate::ledger::LedgerStore;
use crate::models::{
    ActionArgs, ActionKind, FieldKind, GoalPatch, Language, SummaryPeriod, TransactionKind,
    TransactionPatch,
};
use crate::parsers::{account, amount, category, date, SAVINGS_PASSTHROUGH};
use crate::Result;
use chrono::{Duration, NaiveDate};
use serde_json::Value;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

/// Upper bound on any amount (Rp 100 billion), matching form entry.
pub const MAX_AMOUNT: f64 = 100_000_000_000.0;

/// Transaction dates may reach this far back.
const MAX_PAST_YEARS: i64 = 10;

/// Transaction dates may reach this far forward.
const MAX_FUTURE_DAYS: i64 = 366;

/// Goal deadlines may reach this far forward.
const MAX_GOAL_YEARS: i64 = 50;

const MAX_NAME_LEN: usize = 200;

type Partial = serde_json::Map<String, Value>;

fn msg(language: Language, id_text: &str, en_text: &str) -> String {
    match language {
        Language::Indonesian => id_text.to_string(),
        Language::English => en_text.to_string(),
    }
}

pub struct ActionValidator {
    ledger: Arc<dyn LedgerStore>,
}

impl ActionValidator {
    pub fn new(ledger: Arc<dyn LedgerStore>) -> Self {
        Self { ledger }
    }

    /// Validate and normalize collected fields into typed action arguments.
    pub async fn validate(
        &self,
        intent: ActionKind,
        partial: &Partial,
        user_id: Uuid,
        language: Language,
        today: NaiveDate,
    ) -> Result<ActionArgs> {
        match intent {
            ActionKind::AddTransaction => self.validate_add(partial, language, today),
            ActionKind::EditTransaction => {
                self.validate_edit(partial, user_id, language, today).await
            }
            ActionKind::DeleteTransaction => {
                self.validate_delete_transaction(partial, user_id, language).await
            }
            ActionKind::TransferFunds => self.validate_transfer(partial, language, today),
            ActionKind::TransferToSavings => {
                self.validate_transfer_to_savings(partial, user_id, language, today)
                    .await
            }
            ActionKind::CreateSavingsGoal => self.validate_create_goal(partial, language, today),
            ActionKind::UpdateSavingsGoal => {
                self.validate_update_goal(partial, user_id, language, today).await
            }
            ActionKind::DeleteSavingsGoal => {
                self.validate_delete_goal(partial, user_id, language).await
            }
            ActionKind::QuerySummary => Ok(ActionArgs::QuerySummary {
                period: period_from(partial),
            }),
        }
    }

    fn validate_add(
        &self,
        partial: &Partial,
        language: Language,
        today: NaiveDate,
    ) -> Result<ActionArgs> {
        let kind = get_kind(partial).ok_or_else(|| {
            PipelineError::validation(
                msg(language, "Jenis transaksi belum jelas.", "Transaction type is unclear."),
                Some(FieldKind::TransactionType),
            )
        })?;
        let amount = checked_amount(partial, FieldKind::Amount, language)?;
        let category_raw = get_str(partial, FieldKind::Category).ok_or_else(|| {
            PipelineError::validation(
                msg(language, "Kategori wajib diisi.", "Category is required."),
                Some(FieldKind::Category),
            )
        })?;
        let category = category::normalize_category(&category_raw, kind).ok_or_else(|| {
            PipelineError::validation(
                msg(language, "Kategori wajib diisi.", "Category is required."),
                Some(FieldKind::Category),
            )
        })?;
        let account = checked_account(partial, FieldKind::Account, language)?;
        let date = checked_transaction_date(partial, FieldKind::Date, language, today)?;
        let description = get_str(partial, FieldKind::Description).unwrap_or_default();

        Ok(ActionArgs::AddTransaction {
            kind,
            amount,
            category,
            account,
            date,
            description,
        })
    }

    async fn validate_edit(
        &self,
        partial: &Partial,
        user_id: Uuid,
        language: Language,
        today: NaiveDate,
    ) -> Result<ActionArgs> {
        let transaction_id = checked_id(partial, FieldKind::TransactionId, language)?;

        // Ownership gate: a cross-user id fails here, never at execution
        self.ledger
            .get_transaction(transaction_id, user_id)
            .await
            .map_err(|_| {
                warn!(transaction_id, %user_id, "edit target not found for user");
                PipelineError::validation(
                    msg(
                        language,
                        "Transaksi tidak ditemukan atau bukan milik Anda.",
                        "Transaction not found or not yours.",
                    ),
                    Some(FieldKind::TransactionId),
                )
            })?;

        let field = get_str(partial, FieldKind::EditField).ok_or_else(|| {
            PipelineError::validation(
                msg(language, "Field yang diubah belum jelas.", "Unclear which field to change."),
                Some(FieldKind::EditField),
            )
        })?;
        let new_value = get_str(partial, FieldKind::NewValue).ok_or_else(|| {
            PipelineError::validation(
                msg(language, "Nilai baru belum diisi.", "The new value is missing."),
                Some(FieldKind::NewValue),
            )
        })?;

        let patch = transaction_patch(&field, &new_value, language, today)?;
        Ok(ActionArgs::EditTransaction {
            transaction_id,
            patch,
        })
    }

    async fn validate_delete_transaction(
        &self,
        partial: &Partial,
        user_id: Uuid,
        language: Language,
    ) -> Result<ActionArgs> {
        let transaction_id = checked_id(partial, FieldKind::TransactionId, language)?;
        self.ledger
            .get_transaction(transaction_id, user_id)
            .await
            .map_err(|_| {
                PipelineError::validation(
                    msg(
                        language,
                        "Transaksi tidak ditemukan atau bukan milik Anda.",
                        "Transaction not found or not yours.",
                    ),
                    Some(FieldKind::TransactionId),
                )
            })?;
        Ok(ActionArgs::DeleteTransaction { transaction_id })
    }

    fn validate_transfer(
        &self,
        partial: &Partial,
        language: Language,
        today: NaiveDate,
    ) -> Result<ActionArgs> {
        let amount = checked_amount(partial, FieldKind::Amount, language)?;
        let from_account = checked_account(partial, FieldKind::FromAccount, language)?;
        let to_account = checked_account(partial, FieldKind::ToAccount, language)?;

        if from_account == to_account && to_account != SAVINGS_PASSTHROUGH {
            return Err(PipelineError::validation(
                msg(
                    language,
                    "Akun sumber dan tujuan tidak boleh sama.",
                    "Source and destination accounts must differ.",
                ),
                Some(FieldKind::ToAccount),
            ));
        }

        let date = checked_transaction_date(partial, FieldKind::Date, language, today)?;
        let description = get_str(partial, FieldKind::Description).unwrap_or_default();

        Ok(ActionArgs::TransferFunds {
            amount,
            from_account,
            to_account,
            date,
            description,
        })
    }

    async fn validate_transfer_to_savings(
        &self,
        partial: &Partial,
        user_id: Uuid,
        language: Language,
        today: NaiveDate,
    ) -> Result<ActionArgs> {
        let amount = checked_amount(partial, FieldKind::Amount, language)?;
        let from_account = checked_account(partial, FieldKind::FromAccount, language)?;
        let goal_id = checked_id(partial, FieldKind::GoalId, language)?;

        self.ledger.get_goal(goal_id, user_id).await.map_err(|_| {
            PipelineError::validation(
                msg(
                    language,
                    "Target tabungan tidak ditemukan atau bukan milik Anda.",
                    "Savings goal not found or not yours.",
                ),
                Some(FieldKind::GoalId),
            )
        })?;

        let date = checked_transaction_date(partial, FieldKind::Date, language, today)?;

        Ok(ActionArgs::TransferToSavings {
            amount,
            from_account,
            goal_id,
            date,
        })
    }

    fn validate_create_goal(
        &self,
        partial: &Partial,
        language: Language,
        today: NaiveDate,
    ) -> Result<ActionArgs> {
        let name = get_str(partial, FieldKind::Name)
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .ok_or_else(|| {
                PipelineError::validation(
                    msg(language, "Nama target wajib diisi.", "The goal needs a name."),
                    Some(FieldKind::Name),
                )
            })?;
        if name.len() > MAX_NAME_LEN {
            return Err(PipelineError::validation(
                msg(language, "Nama target terlalu panjang.", "The goal name is too long."),
                Some(FieldKind::Name),
            ));
        }

        let target_amount = checked_amount(partial, FieldKind::TargetAmount, language)?;
        let target_date =
            checked_goal_date(partial, FieldKind::TargetDate, language, today)?;
        let description = get_str(partial, FieldKind::Description).unwrap_or_default();

        Ok(ActionArgs::CreateSavingsGoal {
            name,
            target_amount,
            target_date,
            description,
        })
    }

    async fn validate_update_goal(
        &self,
        partial: &Partial,
        user_id: Uuid,
        language: Language,
        today: NaiveDate,
    ) -> Result<ActionArgs> {
        let goal_id = checked_id(partial, FieldKind::GoalId, language)?;
        self.ledger.get_goal(goal_id, user_id).await.map_err(|_| {
            PipelineError::validation(
                msg(
                    language,
                    "Target tabungan tidak ditemukan atau bukan milik Anda.",
                    "Savings goal not found or not yours.",
                ),
                Some(FieldKind::GoalId),
            )
        })?;

        let field = get_str(partial, FieldKind::EditField).ok_or_else(|| {
            PipelineError::validation(
                msg(language, "Field yang diubah belum jelas.", "Unclear which field to change."),
                Some(FieldKind::EditField),
            )
        })?;
        let new_value = get_str(partial, FieldKind::NewValue).ok_or_else(|| {
            PipelineError::validation(
                msg(language, "Nilai baru belum diisi.", "The new value is missing."),
                Some(FieldKind::NewValue),
            )
        })?;

        let patch = goal_patch(&field, &new_value, language, today)?;
        Ok(ActionArgs::UpdateSavingsGoal { goal_id, patch })
    }

    async fn validate_delete_goal(
        &self,
        partial: &Partial,
        user_id: Uuid,
        language: Language,
    ) -> Result<ActionArgs> {
        let goal_id = checked_id(partial, FieldKind::GoalId, language)?;
        self.ledger.get_goal(goal_id, user_id).await.map_err(|_| {
            PipelineError::validation(
                msg(
                    language,
                    "Target tabungan tidak ditemukan atau bukan milik Anda.",
                    "Savings goal not found or not yours.",
                ),
                Some(FieldKind::GoalId),
            )
        })?;
        Ok(ActionArgs::DeleteSavingsGoal { goal_id })
    }
}

//
// ================= Field Accessors =================
//

fn get_str(partial: &Partial, field: FieldKind) -> Option<String> {
    partial.get(field.key()).and_then(|v| match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn get_f64(partial: &Partial, field: FieldKind) -> Option<f64> {
    match partial.get(field.key())? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => amount::parse_amount(s),
        _ => None,
    }
}

fn get_i64(partial: &Partial, field: FieldKind) -> Option<i64> {
    match partial.get(field.key())? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn get_kind(partial: &Partial) -> Option<TransactionKind> {
    get_str(partial, FieldKind::TransactionType)
        .as_deref()
        .and_then(TransactionKind::parse)
}

fn period_from(partial: &Partial) -> SummaryPeriod {
    let current = SummaryPeriod::current();
    match partial.get("period").and_then(|v| v.as_str()) {
        Some("previous") => current.previous(),
        _ => current,
    }
}

//
// ================= Checks =================
//

fn checked_amount(partial: &Partial, field: FieldKind, language: Language) -> Result<f64> {
    let value = get_f64(partial, field).ok_or_else(|| {
        PipelineError::validation(
            msg(language, "Jumlah wajib diisi dengan angka.", "A numeric amount is required."),
            Some(field),
        )
    })?;

    if !value.is_finite() || value <= 0.0 {
        return Err(PipelineError::validation(
            msg(language, "Jumlah harus lebih dari Rp 0.", "Amount must be above Rp 0."),
            Some(field),
        ));
    }
    if value > MAX_AMOUNT {
        return Err(PipelineError::validation(
            msg(
                language,
                "Jumlah melebihi batas maksimal.",
                "Amount exceeds the maximum allowed.",
            ),
            Some(field),
        ));
    }
    Ok(value)
}

fn checked_account(partial: &Partial, field: FieldKind, language: Language) -> Result<String> {
    let raw = get_str(partial, field).ok_or_else(|| {
        PipelineError::validation(
            msg(language, "Nama akun wajib diisi.", "An account name is required."),
            Some(field),
        )
    })?;

    account::normalize_account(&raw).ok_or_else(|| {
        PipelineError::validation(
            msg(
                language,
                &format!(
                    "Akun '{}' tidak dikenali. Akun tersedia: {}.",
                    raw,
                    account::known_accounts_display()
                ),
                &format!(
                    "Account '{}' is not recognized. Available: {}.",
                    raw,
                    account::known_accounts_display()
                ),
            ),
            Some(field),
        )
    })
}

fn checked_id(partial: &Partial, field: FieldKind, language: Language) -> Result<i64> {
    let id = get_i64(partial, field).ok_or_else(|| {
        PipelineError::validation(
            msg(language, "ID wajib diisi dengan angka.", "A numeric ID is required."),
            Some(field),
        )
    })?;
    if id <= 0 {
        return Err(PipelineError::validation(
            msg(language, "ID tidak valid.", "Invalid ID."),
            Some(field),
        ));
    }
    Ok(id)
}

fn checked_transaction_date(
    partial: &Partial,
    field: FieldKind,
    language: Language,
    today: NaiveDate,
) -> Result<NaiveDate> {
    let parsed = match get_str(partial, field) {
        None => today,
        Some(raw) => date::parse_date(&raw, today).ok_or_else(|| {
            PipelineError::validation(
                msg(
                    language,
                    "Format tanggal tidak valid. Coba YYYY-MM-DD atau 'hari ini'.",
                    "Invalid date format. Try YYYY-MM-DD or 'today'.",
                ),
                Some(field),
            )
        })?,
    };

    let earliest = today - Duration::days(MAX_PAST_YEARS * 365);
    let latest = today + Duration::days(MAX_FUTURE_DAYS);
    if parsed < earliest || parsed > latest {
        return Err(PipelineError::validation(
            msg(
                language,
                "Tanggal terlalu jauh dari hari ini.",
                "That date is too far from today.",
            ),
            Some(field),
        ));
    }
    Ok(parsed)
}

fn checked_goal_date(
    partial: &Partial,
    field: FieldKind,
    language: Language,
    today: NaiveDate,
) -> Result<Option<NaiveDate>> {
    let Some(raw) = get_str(partial, field) else {
        return Ok(None);
    };
    let parsed = date::parse_date(&raw, today).ok_or_else(|| {
        PipelineError::validation(
            msg(
                language,
                "Format tanggal target tidak valid.",
                "Invalid target date format.",
            ),
            Some(field),
        )
    })?;

    let latest = today + Duration::days(MAX_GOAL_YEARS * 365);
    if parsed < today || parsed > latest {
        return Err(PipelineError::validation(
            msg(
                language,
                "Tanggal target harus di masa depan.",
                "The target date must be in the future.",
            ),
            Some(field),
        ));
    }
    Ok(Some(parsed))
}

//
// ================= Patch Builders =================
//

fn transaction_patch(
    field: &str,
    new_value: &str,
    language: Language,
    today: NaiveDate,
) -> Result<TransactionPatch> {
    let mut patch = TransactionPatch::default();
    let invalid = |field_kind: FieldKind| {
        PipelineError::validation(
            msg(language, "Nilai baru tidak valid.", "The new value is invalid."),
            Some(field_kind),
        )
    };

    match field {
        "amount" => {
            let value = amount::parse_amount(new_value)
                .filter(|v| *v > 0.0 && *v <= MAX_AMOUNT)
                .ok_or_else(|| invalid(FieldKind::NewValue))?;
            patch.amount = Some(value);
        }
        "category" => {
            patch.category = Some(
                category::normalize_category(new_value, TransactionKind::Expense)
                    .ok_or_else(|| invalid(FieldKind::NewValue))?,
            );
        }
        "date" => {
            patch.date =
                Some(date::parse_date(new_value, today).ok_or_else(|| invalid(FieldKind::NewValue))?);
        }
        "account" => {
            patch.account = Some(
                account::normalize_account(new_value).ok_or_else(|| invalid(FieldKind::NewValue))?,
            );
        }
        "type" => {
            patch.kind = Some(
                TransactionKind::parse(new_value).ok_or_else(|| invalid(FieldKind::NewValue))?,
            );
        }
        "description" => {
            patch.description = Some(new_value.trim().to_string());
        }
        _ => {
            return Err(PipelineError::validation(
                msg(
                    language,
                    "Field itu tidak bisa diubah pada transaksi.",
                    "That field cannot be changed on a transaction.",
                ),
                Some(FieldKind::EditField),
            ));
        }
    }
    Ok(patch)
}

fn goal_patch(
    field: &str,
    new_value: &str,
    language: Language,
    today: NaiveDate,
) -> Result<GoalPatch> {
    let mut patch = GoalPatch::default();
    let invalid = || {
        PipelineError::validation(
            msg(language, "Nilai baru tidak valid.", "The new value is invalid."),
            Some(FieldKind::NewValue),
        )
    };

    match field {
        "name" => {
            let name = new_value.trim();
            if name.is_empty() || name.len() > MAX_NAME_LEN {
                return Err(invalid());
            }
            patch.name = Some(name.to_string());
        }
        "target_amount" | "amount" => {
            let value = amount::parse_amount(new_value)
                .filter(|v| *v > 0.0 && *v <= MAX_AMOUNT)
                .ok_or_else(invalid)?;
            patch.target_amount = Some(value);
        }
        "target_date" | "date" => {
            patch.target_date = Some(date::parse_date(new_value, today).ok_or_else(invalid)?);
        }
        "description" => {
            patch.description = Some(new_value.trim().to_string());
        }
        _ => {
            return Err(PipelineError::validation(
                msg(
                    language,
                    "Field itu tidak bisa diubah pada target tabungan.",
                    "That field cannot be changed on a savings goal.",
                ),
                Some(FieldKind::EditField),
            ));
        }
    }
    Ok(patch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{InMemoryLedger, NewGoal, NewTransaction};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 6).unwrap()
    }

    fn bag(entries: &[(&str, Value)]) -> Partial {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn validator() -> (ActionValidator, Arc<InMemoryLedger>) {
        let ledger = Arc::new(InMemoryLedger::new());
        (ActionValidator::new(ledger.clone()), ledger)
    }

    #[tokio::test]
    async fn test_add_transaction_happy_path() {
        let (validator, _) = validator();
        let partial = bag(&[
            ("type", Value::from("expense")),
            ("amount", Value::from(50_000.0)),
            ("category", Value::from("makan")),
            ("account", Value::from("cash")),
            ("date", Value::from("2026-08-06")),
        ]);

        let args = validator
            .validate(
                ActionKind::AddTransaction,
                &partial,
                Uuid::new_v4(),
                Language::Indonesian,
                today(),
            )
            .await
            .unwrap();

        match args {
            ActionArgs::AddTransaction {
                kind,
                amount,
                category,
                account,
                ..
            } => {
                assert_eq!(kind, TransactionKind::Expense);
                assert_eq!(amount, 50_000.0);
                assert_eq!(category, "Makan");
                assert_eq!(account, "Cash");
            }
            other => panic!("wrong args: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_amount_range_rejected() {
        let (validator, _) = validator();
        let partial = bag(&[
            ("type", Value::from("expense")),
            ("amount", Value::from(-5.0)),
            ("category", Value::from("Makan")),
            ("account", Value::from("Cash")),
        ]);

        let err = validator
            .validate(
                ActionKind::AddTransaction,
                &partial,
                Uuid::new_v4(),
                Language::Indonesian,
                today(),
            )
            .await
            .unwrap_err();

        match err {
            PipelineError::Validation { field, .. } => {
                assert_eq!(field, Some(FieldKind::Amount));
            }
            other => panic!("wrong error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unknown_account_rejected_with_field() {
        let (validator, _) = validator();
        let partial = bag(&[
            ("amount", Value::from(100_000.0)),
            ("from_account", Value::from("paypal")),
            ("to_account", Value::from("ovo")),
        ]);

        let err = validator
            .validate(
                ActionKind::TransferFunds,
                &partial,
                Uuid::new_v4(),
                Language::Indonesian,
                today(),
            )
            .await
            .unwrap_err();

        match err {
            PipelineError::Validation { field, reason } => {
                assert_eq!(field, Some(FieldKind::FromAccount));
                assert!(reason.contains("paypal"));
            }
            other => panic!("wrong error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_same_account_transfer_rejected_unless_savings() {
        let (validator, _) = validator();

        let same = bag(&[
            ("amount", Value::from(100_000.0)),
            ("from_account", Value::from("Cash")),
            ("to_account", Value::from("Cash")),
        ]);
        let err = validator
            .validate(
                ActionKind::TransferFunds,
                &same,
                Uuid::new_v4(),
                Language::Indonesian,
                today(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Validation { .. }));

        // The savings passthrough is exempt
        let passthrough = bag(&[
            ("amount", Value::from(100_000.0)),
            ("from_account", Value::from("Savings")),
            ("to_account", Value::from("Savings")),
        ]);
        assert!(validator
            .validate(
                ActionKind::TransferFunds,
                &passthrough,
                Uuid::new_v4(),
                Language::Indonesian,
                today(),
            )
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_cross_user_isolation() {
        let (validator, ledger) = validator();
        let owner = Uuid::new_v4();
        let intruder = Uuid::new_v4();

        let tx_id = ledger
            .insert_transaction(NewTransaction {
                user_id: owner,
                date: today(),
                kind: TransactionKind::Expense,
                category: "Makan".to_string(),
                amount: 50_000.0,
                account: "Cash".to_string(),
                description: String::new(),
            })
            .await
            .unwrap();

        let partial = bag(&[("transaction_id", Value::from(tx_id))]);

        // Owner passes
        assert!(validator
            .validate(
                ActionKind::DeleteTransaction,
                &partial,
                owner,
                Language::Indonesian,
                today(),
            )
            .await
            .is_ok());

        // Any other user always fails with a ValidationError
        let err = validator
            .validate(
                ActionKind::DeleteTransaction,
                &partial,
                intruder,
                Language::Indonesian,
                today(),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Validation { field: Some(FieldKind::TransactionId), .. }
        ));
    }

    #[tokio::test]
    async fn test_goal_reference_checked() {
        let (validator, ledger) = validator();
        let user = Uuid::new_v4();

        let partial = bag(&[
            ("amount", Value::from(250_000.0)),
            ("from_account", Value::from("Cash")),
            ("goal_id", Value::from(42)),
        ]);

        let err = validator
            .validate(
                ActionKind::TransferToSavings,
                &partial,
                user,
                Language::Indonesian,
                today(),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Validation { field: Some(FieldKind::GoalId), .. }
        ));

        let goal_id = ledger
            .insert_goal(NewGoal {
                user_id: user,
                name: "Liburan".to_string(),
                target_amount: 5_000_000.0,
                target_date: None,
                description: String::new(),
            })
            .await
            .unwrap();

        let partial = bag(&[
            ("amount", Value::from(250_000.0)),
            ("from_account", Value::from("Cash")),
            ("goal_id", Value::from(goal_id)),
        ]);
        assert!(validator
            .validate(
                ActionKind::TransferToSavings,
                &partial,
                user,
                Language::Indonesian,
                today(),
            )
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_edit_patch_parses_shorthand_amount() {
        let (validator, ledger) = validator();
        let user = Uuid::new_v4();
        let tx_id = ledger
            .insert_transaction(NewTransaction {
                user_id: user,
                date: today(),
                kind: TransactionKind::Expense,
                category: "Makan".to_string(),
                amount: 50_000.0,
                account: "Cash".to_string(),
                description: String::new(),
            })
            .await
            .unwrap();

        let partial = bag(&[
            ("transaction_id", Value::from(tx_id)),
            ("field", Value::from("amount")),
            ("new_value", Value::from("75rb")),
        ]);

        let args = validator
            .validate(
                ActionKind::EditTransaction,
                &partial,
                user,
                Language::Indonesian,
                today(),
            )
            .await
            .unwrap();

        match args {
            ActionArgs::EditTransaction { patch, .. } => {
                assert_eq!(patch.amount, Some(75_000.0));
                assert!(patch.category.is_none());
            }
            other => panic!("wrong args: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_far_future_date_rejected() {
        let (validator, _) = validator();
        let partial = bag(&[
            ("type", Value::from("expense")),
            ("amount", Value::from(50_000.0)),
            ("category", Value::from("Makan")),
            ("account", Value::from("Cash")),
            ("date", Value::from("2090-01-01")),
        ]);

        let err = validator
            .validate(
                ActionKind::AddTransaction,
                &partial,
                Uuid::new_v4(),
                Language::Indonesian,
                today(),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Validation { field: Some(FieldKind::Date), .. }
        ));
    }
}
