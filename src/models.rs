//! Core data models for the conversational finance pipeline

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// In-progress conversation state lives this long past its last update.
pub const STATE_TTL_SECONDS: i64 = 3600;

//
// ================= Enums =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    #[serde(rename = "id")]
    Indonesian,
    #[serde(rename = "en")]
    English,
}

impl Language {
    pub fn from_tag(tag: &str) -> Self {
        match tag.to_lowercase().as_str() {
            "en" | "english" => Language::English,
            _ => Language::Indonesian,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Income,
    Expense,
    Transfer,
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TransactionKind::Income => "income",
            TransactionKind::Expense => "expense",
            TransactionKind::Transfer => "transfer",
        };
        write!(f, "{}", s)
    }
}

impl TransactionKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "income" | "pemasukan" => Some(TransactionKind::Income),
            "expense" | "pengeluaran" => Some(TransactionKind::Expense),
            "transfer" => Some(TransactionKind::Transfer),
            _ => None,
        }
    }
}

/// The closed set of actions the pipeline can resolve an utterance to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    AddTransaction,
    EditTransaction,
    DeleteTransaction,
    TransferFunds,
    TransferToSavings,
    CreateSavingsGoal,
    UpdateSavingsGoal,
    DeleteSavingsGoal,
    QuerySummary,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::AddTransaction => "add_transaction",
            ActionKind::EditTransaction => "edit_transaction",
            ActionKind::DeleteTransaction => "delete_transaction",
            ActionKind::TransferFunds => "transfer_funds",
            ActionKind::TransferToSavings => "transfer_to_savings",
            ActionKind::CreateSavingsGoal => "create_savings_goal",
            ActionKind::UpdateSavingsGoal => "update_savings_goal",
            ActionKind::DeleteSavingsGoal => "delete_savings_goal",
            ActionKind::QuerySummary => "query_summary",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "add_transaction" => Some(ActionKind::AddTransaction),
            "edit_transaction" => Some(ActionKind::EditTransaction),
            "delete_transaction" => Some(ActionKind::DeleteTransaction),
            "transfer_funds" => Some(ActionKind::TransferFunds),
            "transfer_to_savings" => Some(ActionKind::TransferToSavings),
            "create_savings_goal" => Some(ActionKind::CreateSavingsGoal),
            "update_savings_goal" => Some(ActionKind::UpdateSavingsGoal),
            "delete_savings_goal" => Some(ActionKind::DeleteSavingsGoal),
            "query_summary" => Some(ActionKind::QuerySummary),
            _ => None,
        }
    }

    /// Destructive actions pass through an explicit CONFIRMING turn.
    pub fn is_destructive(&self) -> bool {
        matches!(
            self,
            ActionKind::DeleteTransaction | ActionKind::DeleteSavingsGoal
        )
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Top-level classification of an utterance.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum IntentCategory {
    /// Mutates the ledger through one of the nine actions
    Actionable,
    /// Reads financial data (summaries, balances)
    Query,
    /// Greeting, education, anything outside the ledger
    General,
}

/// Every slot a state machine can ask for, across all intents.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Amount,
    TransactionType,
    Category,
    Account,
    Date,
    Description,
    FromAccount,
    ToAccount,
    TransactionId,
    GoalId,
    EditField,
    NewValue,
    Name,
    TargetAmount,
    TargetDate,
}

impl FieldKind {
    /// Key used in the untyped `partial_data` bag.
    pub fn key(&self) -> &'static str {
        match self {
            FieldKind::Amount => "amount",
            FieldKind::TransactionType => "type",
            FieldKind::Category => "category",
            FieldKind::Account => "account",
            FieldKind::Date => "date",
            FieldKind::Description => "description",
            FieldKind::FromAccount => "from_account",
            FieldKind::ToAccount => "to_account",
            FieldKind::TransactionId => "transaction_id",
            FieldKind::GoalId => "goal_id",
            FieldKind::EditField => "field",
            FieldKind::NewValue => "new_value",
            FieldKind::Name => "name",
            FieldKind::TargetAmount => "target_amount",
            FieldKind::TargetDate => "target_date",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        const ALL: &[FieldKind] = &[
            FieldKind::Amount,
            FieldKind::TransactionType,
            FieldKind::Category,
            FieldKind::Account,
            FieldKind::Date,
            FieldKind::Description,
            FieldKind::FromAccount,
            FieldKind::ToAccount,
            FieldKind::TransactionId,
            FieldKind::GoalId,
            FieldKind::EditField,
            FieldKind::NewValue,
            FieldKind::Name,
            FieldKind::TargetAmount,
            FieldKind::TargetDate,
        ];
        ALL.iter().find(|f| f.key() == key).copied()
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

//
// ================= Conversation State =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FlowState {
    AwaitingField,
    Confirming,
}

impl FlowState {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlowState::AwaitingField => "AWAITING_FIELD",
            FlowState::Confirming => "CONFIRMING",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "AWAITING_FIELD" => Some(FlowState::AwaitingField),
            "CONFIRMING" => Some(FlowState::Confirming),
            _ => None,
        }
    }
}

/// One in-progress multi-turn intent per chat session. IDLE is the absence
/// of a row; expired rows are treated as absent on next access.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationState {
    pub session_id: Uuid,
    pub user_id: Uuid,
    pub intent: ActionKind,
    pub state: FlowState,
    /// The single field the next utterance is expected to answer.
    pub awaiting: Option<FieldKind>,
    pub partial_data: serde_json::Map<String, serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl ConversationState {
    pub fn new(session_id: Uuid, user_id: Uuid, intent: ActionKind) -> Self {
        let now = Utc::now();
        Self {
            session_id,
            user_id,
            intent,
            state: FlowState::AwaitingField,
            awaiting: None,
            partial_data: serde_json::Map::new(),
            created_at: now,
            updated_at: now,
            expires_at: now + chrono::Duration::seconds(STATE_TTL_SECONDS),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Slide the TTL window after a turn touched this state.
    pub fn touch(&mut self) {
        let now = Utc::now();
        self.updated_at = now;
        self.expires_at = now + chrono::Duration::seconds(STATE_TTL_SECONDS);
    }
}

//
// ================= Ledger Entities =================
//

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub user_id: Uuid,
    pub date: NaiveDate,
    pub kind: TransactionKind,
    pub category: String,
    /// Always positive; sign is carried by `kind`.
    pub amount: f64,
    pub account: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavingsGoal {
    pub id: i64,
    pub user_id: Uuid,
    pub name: String,
    pub target_amount: f64,
    pub current_amount: f64,
    pub target_date: Option<NaiveDate>,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountBalance {
    pub account: String,
    pub balance: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SummaryPeriod {
    pub year: i32,
    pub month: u32,
}

impl SummaryPeriod {
    pub fn current() -> Self {
        let today = Utc::now().date_naive();
        Self {
            year: chrono::Datelike::year(&today),
            month: chrono::Datelike::month(&today),
        }
    }

    pub fn previous(&self) -> Self {
        if self.month == 1 {
            Self {
                year: self.year - 1,
                month: 12,
            }
        } else {
            Self {
                year: self.year,
                month: self.month - 1,
            }
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        chrono::Datelike::year(&date) == self.year && chrono::Datelike::month(&date) == self.month
    }
}

impl fmt::Display for SummaryPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinancialSummary {
    pub period: SummaryPeriod,
    pub total_income: f64,
    pub total_expense: f64,
    pub net: f64,
    pub expense_by_category: Vec<(String, f64)>,
}

//
// ================= Chat Transport =================
//

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub session_id: Uuid,
    pub user_id: Uuid,
    pub utterance: String,
    pub language: Language,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnReply {
    pub reply_text: String,
    pub should_refresh_financial_views: bool,
}

impl TurnReply {
    pub fn text(reply_text: impl Into<String>) -> Self {
        Self {
            reply_text: reply_text.into(),
            should_refresh_financial_views: false,
        }
    }

    pub fn refreshing(reply_text: impl Into<String>) -> Self {
        Self {
            reply_text: reply_text.into(),
            should_refresh_financial_views: true,
        }
    }
}

//
// ================= Action Request (validated) =================
//

/// Partial update for edit_transaction; only supplied fields change.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransactionPatch {
    pub date: Option<NaiveDate>,
    pub kind: Option<TransactionKind>,
    pub category: Option<String>,
    pub amount: Option<f64>,
    pub account: Option<String>,
    pub description: Option<String>,
}

impl TransactionPatch {
    pub fn is_empty(&self) -> bool {
        self.date.is_none()
            && self.kind.is_none()
            && self.category.is_none()
            && self.amount.is_none()
            && self.account.is_none()
            && self.description.is_none()
    }
}

/// Partial update for update_savings_goal.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GoalPatch {
    pub name: Option<String>,
    pub target_amount: Option<f64>,
    pub target_date: Option<NaiveDate>,
    pub description: Option<String>,
}

impl GoalPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.target_amount.is_none()
            && self.target_date.is_none()
            && self.description.is_none()
    }
}

/// Fully validated per-action arguments. Exhaustively matched by the
/// executor so a new action cannot be added without handling it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ActionArgs {
    AddTransaction {
        kind: TransactionKind,
        amount: f64,
        category: String,
        account: String,
        date: NaiveDate,
        description: String,
    },
    EditTransaction {
        transaction_id: i64,
        patch: TransactionPatch,
    },
    DeleteTransaction {
        transaction_id: i64,
    },
    TransferFunds {
        amount: f64,
        from_account: String,
        to_account: String,
        date: NaiveDate,
        description: String,
    },
    TransferToSavings {
        amount: f64,
        from_account: String,
        goal_id: i64,
        date: NaiveDate,
    },
    CreateSavingsGoal {
        name: String,
        target_amount: f64,
        target_date: Option<NaiveDate>,
        description: String,
    },
    UpdateSavingsGoal {
        goal_id: i64,
        patch: GoalPatch,
    },
    DeleteSavingsGoal {
        goal_id: i64,
    },
    QuerySummary {
        period: SummaryPeriod,
    },
}

impl ActionArgs {
    pub fn kind(&self) -> ActionKind {
        match self {
            ActionArgs::AddTransaction { .. } => ActionKind::AddTransaction,
            ActionArgs::EditTransaction { .. } => ActionKind::EditTransaction,
            ActionArgs::DeleteTransaction { .. } => ActionKind::DeleteTransaction,
            ActionArgs::TransferFunds { .. } => ActionKind::TransferFunds,
            ActionArgs::TransferToSavings { .. } => ActionKind::TransferToSavings,
            ActionArgs::CreateSavingsGoal { .. } => ActionKind::CreateSavingsGoal,
            ActionArgs::UpdateSavingsGoal { .. } => ActionKind::UpdateSavingsGoal,
            ActionArgs::DeleteSavingsGoal { .. } => ActionKind::DeleteSavingsGoal,
            ActionArgs::QuerySummary { .. } => ActionKind::QuerySummary,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionRequest {
    pub user_id: Uuid,
    pub args: ActionArgs,
}

//
// ================= Execution Result =================
//

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum AffectedEntity {
    Transaction(i64),
    TransactionPair(i64, i64),
    Goal(i64),
    GoalContribution { goal_id: i64, transaction_id: i64 },
    Summary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub summary_text: String,
    pub affected: AffectedEntity,
    /// Whether cached dashboards should be invalidated by the caller.
    pub refresh_views: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_kind_round_trip() {
        let all = [
            ActionKind::AddTransaction,
            ActionKind::EditTransaction,
            ActionKind::DeleteTransaction,
            ActionKind::TransferFunds,
            ActionKind::TransferToSavings,
            ActionKind::CreateSavingsGoal,
            ActionKind::UpdateSavingsGoal,
            ActionKind::DeleteSavingsGoal,
            ActionKind::QuerySummary,
        ];
        for kind in all {
            assert_eq!(ActionKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(ActionKind::parse("make_coffee"), None);
    }

    #[test]
    fn test_only_deletes_are_destructive() {
        assert!(ActionKind::DeleteTransaction.is_destructive());
        assert!(ActionKind::DeleteSavingsGoal.is_destructive());
        assert!(!ActionKind::AddTransaction.is_destructive());
        assert!(!ActionKind::EditTransaction.is_destructive());
        assert!(!ActionKind::TransferFunds.is_destructive());
    }

    #[test]
    fn test_state_expiry_window() {
        let mut state = ConversationState::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            ActionKind::AddTransaction,
        );
        let now = Utc::now();
        assert!(!state.is_expired(now));
        assert!(state.is_expired(now + chrono::Duration::seconds(STATE_TTL_SECONDS + 1)));

        state.touch();
        assert!(state.expires_at > state.created_at);
    }

    #[test]
    fn test_summary_period_previous_wraps_year() {
        let jan = SummaryPeriod { year: 2026, month: 1 };
        let prev = jan.previous();
        assert_eq!(prev.year, 2025);
        assert_eq!(prev.month, 12);
    }
}
