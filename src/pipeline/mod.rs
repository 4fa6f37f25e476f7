//! Pipeline orchestrator
//!
//! Single entry point `handle_turn`: loads the session's conversation
//! state, routes the utterance through resolver / slot machine / validator /
//! executor, persists or clears the state, and always answers with exactly
//! one localized reply. The session-level machine is
//! IDLE -> AWAITING_FIELD -> (CONFIRMING for deletes) -> IDLE.

use crate::error::PipelineError;
use crate::executor::ActionExecutor;
use crate::ledger::LedgerStore;
use crate::llm::{ClassifyContext, LanguageModel};
use crate::models::{
    ActionKind, ActionRequest, ChatTurn, ConversationState, FieldKind, FlowState, IntentCategory,
    Language, TurnReply,
};
use crate::resolver::{self, IntentResolver, Interrupt};
use crate::slots::{SlotMachine, SlotStatus};
use crate::state::StateStore;
use crate::validator::ActionValidator;
use chrono::{NaiveDate, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};

mod replies;

pub struct ChatPipeline {
    state_store: Arc<dyn StateStore>,
    ledger: Arc<dyn LedgerStore>,
    resolver: IntentResolver,
    validator: ActionValidator,
    executor: ActionExecutor,
    model: Option<Arc<dyn LanguageModel>>,
}

impl ChatPipeline {
    /// Deterministic pipeline: keyword rules only, no provider calls.
    pub fn new(state_store: Arc<dyn StateStore>, ledger: Arc<dyn LedgerStore>) -> Self {
        Self {
            state_store,
            resolver: IntentResolver::rules_only(),
            validator: ActionValidator::new(ledger.clone()),
            executor: ActionExecutor::new(ledger.clone()),
            ledger,
            model: None,
        }
    }

    /// Pipeline with an LLM fallback for ambiguous phrasing and reply polish.
    pub fn with_model(
        state_store: Arc<dyn StateStore>,
        ledger: Arc<dyn LedgerStore>,
        model: Arc<dyn LanguageModel>,
    ) -> Self {
        Self {
            state_store,
            resolver: IntentResolver::with_model(model.clone()),
            validator: ActionValidator::new(ledger.clone()),
            executor: ActionExecutor::new(ledger.clone()),
            ledger,
            model: Some(model),
        }
    }

    /// Handle one chat turn. Every outcome, including every failure mode,
    /// is a single reply; nothing propagates as a raw error.
    pub async fn handle_turn(&self, turn: &ChatTurn) -> TurnReply {
        let today = Utc::now().date_naive();

        info!(
            session_id = %turn.session_id,
            user_id = %turn.user_id,
            "handling chat turn"
        );

        let existing = match self.state_store.get(turn.session_id).await {
            Ok(state) => state,
            Err(e) => {
                warn!("state load failed: {}", e);
                return TurnReply::text(replies::transient_trouble(turn.language));
            }
        };

        let result = match existing {
            Some(state) => self.continue_flow(state, turn, today).await,
            None => self.start_flow(turn, today).await,
        };

        match result {
            Ok(reply) => reply,
            Err(PipelineError::StateConflict(_)) => {
                TurnReply::text(replies::crossed_messages(turn.language))
            }
            Err(e) => {
                warn!("turn failed: {}", e);
                TurnReply::text(replies::transient_trouble(turn.language))
            }
        }
    }

    //
    // ================= IDLE: fresh utterance =================
    //

    async fn start_flow(&self, turn: &ChatTurn, today: NaiveDate) -> Result<TurnReply, PipelineError> {
        let language = turn.language;

        // Cancel with nothing pending is a friendly no-op, never an error
        if resolver::is_cancellation(&turn.utterance) {
            return Ok(TurnReply::text(replies::nothing_to_cancel(language)));
        }

        let intent = self
            .resolver
            .resolve(&turn.utterance, &ClassifyContext::default())
            .await;

        match intent.category {
            IntentCategory::Actionable => {
                let action = match intent.action {
                    Some(action) => action,
                    None => return Ok(TurnReply::text(replies::could_not_understand(language))),
                };
                self.start_actionable(action, turn, today, None).await
            }
            IntentCategory::Query => self.run_query(turn, today).await,
            IntentCategory::General => {
                if intent.confidence > 0.0 {
                    Ok(TurnReply::text(replies::general_help(language)))
                } else {
                    Ok(TurnReply::text(replies::could_not_understand(language)))
                }
            }
        }
    }

    /// Begin (or restart, on topic switch) an actionable flow.
    /// `replacing` carries the `updated_at` of a state being discarded.
    async fn start_actionable(
        &self,
        action: ActionKind,
        turn: &ChatTurn,
        today: NaiveDate,
        replacing: Option<chrono::DateTime<Utc>>,
    ) -> Result<TurnReply, PipelineError> {
        let language = turn.language;
        let mut state = ConversationState::new(turn.session_id, turn.user_id, action);

        let status = SlotMachine::start(&mut state, &turn.utterance, language, today);
        match status {
            SlotStatus::Cancelled => {
                if replacing.is_some() {
                    self.state_store.clear(turn.session_id).await?;
                }
                Ok(TurnReply::text(replies::cancelled(language)))
            }
            SlotStatus::NeedsField { question, .. } => {
                self.state_store.put(state, replacing).await?;
                Ok(TurnReply::text(question))
            }
            SlotStatus::Complete => {
                self.finish_complete_flow(state, turn, today, replacing).await
            }
        }
    }

    //
    // ================= Pending state: follow-up turns =================
    //

    async fn continue_flow(
        &self,
        mut state: ConversationState,
        turn: &ChatTurn,
        today: NaiveDate,
    ) -> Result<TurnReply, PipelineError> {
        let language = turn.language;
        let loaded_at = state.updated_at;

        match state.state {
            // CONFIRMING answers only yes/no/cancel; a stray command is
            // treated as an unrecognized answer, not a new flow
            FlowState::Confirming => self.continue_confirming(state, turn, today).await,
            FlowState::AwaitingField => {
                // The resolver is only asked the narrow question first:
                // cancel or explicit topic switch. Anything else is a slot
                // answer.
                match IntentResolver::detect_interrupt(&turn.utterance, state.intent) {
                    Some(Interrupt::Cancel) => {
                        self.state_store.clear(turn.session_id).await?;
                        info!(session_id = %turn.session_id, "conversation cancelled");
                        return Ok(TurnReply::text(replies::cancelled(language)));
                    }
                    Some(Interrupt::TopicSwitch(new_action)) => {
                        debug!(
                            old = %state.intent,
                            new = %new_action,
                            "topic switch, discarding pending fields"
                        );
                        return self
                            .start_actionable(new_action, turn, today, Some(loaded_at))
                            .await;
                    }
                    None => {}
                }

                let previously_awaited = state.awaiting;
                let mut status = SlotMachine::advance(&mut state, &turn.utterance, language, today);

                // Deterministic extraction failed for the awaited field:
                // let the model take one shot at it before repeating the
                // question. Collected fields survive either way.
                let failed_field = match &status {
                    SlotStatus::NeedsField { field, .. } if Some(*field) == previously_awaited => {
                        Some(*field)
                    }
                    _ => None,
                };
                if let (Some(field), Some(model)) = (failed_field, &self.model) {
                    match model.extract_field(&turn.utterance, field).await {
                        Ok(Some(value)) => {
                            status = SlotMachine::advance(&mut state, &value, language, today);
                        }
                        Ok(None) => {}
                        Err(e) => debug!("model field extraction unavailable: {}", e),
                    }
                }

                match status {
                    SlotStatus::Cancelled => {
                        self.state_store.clear(turn.session_id).await?;
                        Ok(TurnReply::text(replies::cancelled(language)))
                    }
                    SlotStatus::NeedsField { question, .. } => {
                        state.touch();
                        self.state_store.put(state, Some(loaded_at)).await?;
                        Ok(TurnReply::text(question))
                    }
                    SlotStatus::Complete => {
                        self.finish_complete_flow(state, turn, today, Some(loaded_at))
                            .await
                    }
                }
            }
        }
    }

    async fn continue_confirming(
        &self,
        mut state: ConversationState,
        turn: &ChatTurn,
        today: NaiveDate,
    ) -> Result<TurnReply, PipelineError> {
        let language = turn.language;
        let loaded_at = state.updated_at;

        if resolver::is_affirmative(&turn.utterance) {
            return self.validate_and_execute(state, turn, today, true).await;
        }
        if resolver::is_negative(&turn.utterance) {
            self.state_store.clear(turn.session_id).await?;
            return Ok(TurnReply::text(replies::cancelled(language)));
        }

        // Unrecognized answer: repeat the yes/no question, keep the TTL alive
        let question = replies::confirm_question(&state, language);
        state.touch();
        self.state_store.put(state, Some(loaded_at)).await?;
        Ok(TurnReply::text(question))
    }

    //
    // ================= Completion: validate, confirm, execute =================
    //

    /// All required fields are present. Validate; destructive actions park
    /// in CONFIRMING, the rest execute immediately.
    async fn finish_complete_flow(
        &self,
        mut state: ConversationState,
        turn: &ChatTurn,
        today: NaiveDate,
        persisted_at: Option<chrono::DateTime<Utc>>,
    ) -> Result<TurnReply, PipelineError> {
        let language = turn.language;

        match self
            .validator
            .validate(state.intent, &state.partial_data, turn.user_id, language, today)
            .await
        {
            Ok(_) if state.intent.is_destructive() && state.state != FlowState::Confirming => {
                let question = replies::confirm_question(&state, language);
                state.state = FlowState::Confirming;
                state.awaiting = None;
                state.touch();
                self.state_store.put(state, persisted_at).await?;
                Ok(TurnReply::text(question))
            }
            Ok(args) => {
                self.execute_validated(state, args, turn, today, persisted_at.is_some())
                    .await
            }
            Err(PipelineError::Validation { reason, field: Some(field) }) => {
                // Field-level rejection re-enters AWAITING_FIELD for that
                // one field instead of dead-ending
                let status = SlotMachine::reask(&mut state, field, &reason, language);
                state.state = FlowState::AwaitingField;
                state.touch();
                self.state_store.put(state, persisted_at).await?;
                match status {
                    SlotStatus::NeedsField { question, .. } => Ok(TurnReply::text(question)),
                    _ => Ok(TurnReply::text(replies::could_not_understand(language))),
                }
            }
            Err(PipelineError::Validation { reason, field: None }) => {
                if persisted_at.is_some() {
                    self.state_store.clear(turn.session_id).await?;
                }
                Ok(TurnReply::text(replies::rejected(&reason, language)))
            }
            Err(e) => Err(e),
        }
    }

    /// Re-validate parked fields (the world may have moved while the user
    /// was deciding), then execute.
    async fn validate_and_execute(
        &self,
        state: ConversationState,
        turn: &ChatTurn,
        today: NaiveDate,
        state_persisted: bool,
    ) -> Result<TurnReply, PipelineError> {
        let language = turn.language;

        match self
            .validator
            .validate(state.intent, &state.partial_data, turn.user_id, language, today)
            .await
        {
            Ok(args) => {
                self.execute_validated(state, args, turn, today, state_persisted)
                    .await
            }
            Err(PipelineError::Validation { reason, .. }) => {
                if state_persisted {
                    self.state_store.clear(turn.session_id).await?;
                }
                Ok(TurnReply::text(replies::rejected(&reason, language)))
            }
            Err(e) => Err(e),
        }
    }

    /// Execute with one automatic retry for stale references; success and
    /// terminal failure both return the session to IDLE.
    async fn execute_validated(
        &self,
        state: ConversationState,
        args: crate::models::ActionArgs,
        turn: &ChatTurn,
        today: NaiveDate,
        state_persisted: bool,
    ) -> Result<TurnReply, PipelineError> {
        let language = turn.language;
        let request = ActionRequest {
            user_id: turn.user_id,
            args,
        };

        let outcome = match self.executor.execute(&request, language).await {
            Ok(report) => Ok(report),
            Err(PipelineError::Execution { retryable: true, reason }) => {
                // Stale reference: re-validate against the current ledger
                // and try exactly once more
                warn!("retryable execution failure, re-validating: {}", reason);
                match self
                    .validator
                    .validate(state.intent, &state.partial_data, turn.user_id, language, today)
                    .await
                {
                    Ok(args) => {
                        let request = ActionRequest {
                            user_id: turn.user_id,
                            args,
                        };
                        self.executor.execute(&request, language).await
                    }
                    Err(e) => Err(e),
                }
            }
            Err(e) => Err(e),
        };

        if state_persisted {
            self.state_store.clear(turn.session_id).await?;
        }

        match outcome {
            Ok(report) => {
                let text = self.polish(&report.summary_text, language).await;
                Ok(TurnReply {
                    reply_text: text,
                    should_refresh_financial_views: report.refresh_views,
                })
            }
            Err(PipelineError::Validation { reason, .. }) => {
                Ok(TurnReply::text(replies::rejected(&reason, language)))
            }
            Err(e) => {
                warn!("execution failed: {}", e);
                Ok(TurnReply::text(replies::execution_failed(language)))
            }
        }
    }

    /// Optional LLM polish of the deterministic confirmation; the template
    /// text stands on its own when the provider is absent or slow.
    async fn polish(&self, summary: &str, language: Language) -> String {
        let Some(model) = &self.model else {
            return summary.to_string();
        };
        match model.phrase_confirmation(summary, language).await {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => summary.to_string(),
            Err(e) => {
                debug!("confirmation phrasing skipped: {}", e);
                summary.to_string()
            }
        }
    }

    //
    // ================= Query path =================
    //

    async fn run_query(&self, turn: &ChatTurn, today: NaiveDate) -> Result<TurnReply, PipelineError> {
        let language = turn.language;
        let lower = turn.utterance.to_lowercase();

        // Balance questions read accounts directly; everything else is the
        // period summary
        if lower.contains("saldo") || lower.contains("balance") {
            let balances = self.ledger.get_accounts_with_balances(turn.user_id).await?;
            return Ok(TurnReply::text(replies::balances(&balances, language)));
        }

        let mut partial = serde_json::Map::new();
        if lower.contains("bulan lalu") || lower.contains("last month") {
            partial.insert("period".to_string(), serde_json::Value::from("previous"));
        }

        let args = self
            .validator
            .validate(ActionKind::QuerySummary, &partial, turn.user_id, language, today)
            .await?;
        let request = ActionRequest {
            user_id: turn.user_id,
            args,
        };
        let report = self.executor.execute(&request, language).await?;

        Ok(TurnReply {
            reply_text: report.summary_text,
            should_refresh_financial_views: report.refresh_views,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{InMemoryLedger, NewGoal, NewTransaction};
    use crate::models::{TransactionKind, STATE_TTL_SECONDS};
    use crate::state::InMemoryStateStore;
    use uuid::Uuid;

    struct Harness {
        pipeline: ChatPipeline,
        ledger: Arc<InMemoryLedger>,
        state_store: Arc<InMemoryStateStore>,
        session_id: Uuid,
        user_id: Uuid,
    }

    fn harness() -> Harness {
        let ledger = Arc::new(InMemoryLedger::new());
        let state_store = Arc::new(InMemoryStateStore::new());
        let pipeline = ChatPipeline::new(state_store.clone(), ledger.clone());
        Harness {
            pipeline,
            ledger,
            state_store,
            session_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
        }
    }

    impl Harness {
        async fn say(&self, utterance: &str) -> TurnReply {
            self.pipeline
                .handle_turn(&ChatTurn {
                    session_id: self.session_id,
                    user_id: self.user_id,
                    utterance: utterance.to_string(),
                    language: Language::Indonesian,
                })
                .await
        }
    }

    #[tokio::test]
    async fn test_single_turn_add_transaction() {
        let h = harness();
        let reply = h.say("catat pengeluaran makan 50rb dari cash").await;

        assert!(reply.should_refresh_financial_views, "{}", reply.reply_text);
        assert!(reply.reply_text.contains("Rp 50.000"));

        // Executed in one turn: no state left behind
        assert!(h.state_store.get(h.session_id).await.unwrap().is_none());

        let balances = h.ledger.get_accounts_with_balances(h.user_id).await.unwrap();
        assert_eq!(balances.len(), 1);
        assert_eq!(balances[0].account, "Cash");
        assert_eq!(balances[0].balance, -50_000.0);
    }

    #[tokio::test]
    async fn test_transfer_three_turn_flow() {
        let h = harness();

        // Turn 1: intent known, amount missing
        let reply = h.say("transfer ke ovo").await;
        assert!(reply.reply_text.to_lowercase().contains("jumlah"));
        assert!(h.state_store.get(h.session_id).await.unwrap().is_some());

        // Turn 2: amount supplied, source missing
        let reply = h.say("100000").await;
        assert!(reply.reply_text.to_lowercase().contains("dari akun"));

        // Turn 3: source supplied, executes
        let reply = h.say("dari cash").await;
        assert!(reply.should_refresh_financial_views, "{}", reply.reply_text);
        assert!(reply.reply_text.contains("Rp 100.000"));
        assert!(h.state_store.get(h.session_id).await.unwrap().is_none());

        let balances = h.ledger.get_accounts_with_balances(h.user_id).await.unwrap();
        let get = |name: &str| {
            balances
                .iter()
                .find(|b| b.account == name)
                .map(|b| b.balance)
                .unwrap_or(0.0)
        };
        assert_eq!(get("Cash"), -100_000.0);
        assert_eq!(get("Ovo"), 100_000.0);
    }

    #[tokio::test]
    async fn test_path_independence_of_transfer() {
        // One utterance vs three turns lands identical ledger rows
        let single = harness();
        single.say("transfer 100rb dari cash ke ovo").await;

        let multi = harness();
        multi.say("transfer ke ovo").await;
        multi.say("100rb").await;
        multi.say("dari cash").await;

        let a = single
            .ledger
            .get_accounts_with_balances(single.user_id)
            .await
            .unwrap();
        let b = multi
            .ledger
            .get_accounts_with_balances(multi.user_id)
            .await
            .unwrap();
        let flat =
            |v: &[crate::models::AccountBalance]| -> Vec<(String, f64)> {
                v.iter().map(|x| (x.account.clone(), x.balance)).collect()
            };
        assert_eq!(flat(&a), flat(&b));
    }

    #[tokio::test]
    async fn test_delete_requires_confirmation() {
        let h = harness();
        let tx_id = h
            .ledger
            .insert_transaction(NewTransaction {
                user_id: h.user_id,
                date: Utc::now().date_naive(),
                kind: TransactionKind::Expense,
                category: "Makan".to_string(),
                amount: 50_000.0,
                account: "Cash".to_string(),
                description: String::new(),
            })
            .await
            .unwrap();

        // Complete fields put the flow into CONFIRMING, nothing deleted yet
        let reply = h.say(&format!("hapus transaksi {}", tx_id)).await;
        assert!(!reply.should_refresh_financial_views);
        assert!(reply.reply_text.contains("Hapus"));
        assert!(h.ledger.get_transaction(tx_id, h.user_id).await.is_ok());

        let state = h.state_store.get(h.session_id).await.unwrap().unwrap();
        assert_eq!(state.state, FlowState::Confirming);

        // Affirmative executes and returns to IDLE
        let reply = h.say("ya").await;
        assert!(reply.should_refresh_financial_views, "{}", reply.reply_text);
        assert!(h.ledger.get_transaction(tx_id, h.user_id).await.is_err());
        assert!(h.state_store.get(h.session_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_cancelled_at_confirmation() {
        let h = harness();
        let tx_id = h
            .ledger
            .insert_transaction(NewTransaction {
                user_id: h.user_id,
                date: Utc::now().date_naive(),
                kind: TransactionKind::Expense,
                category: "Makan".to_string(),
                amount: 50_000.0,
                account: "Cash".to_string(),
                description: String::new(),
            })
            .await
            .unwrap();

        h.say(&format!("hapus transaksi {}", tx_id)).await;
        let reply = h.say("batal").await;

        assert!(!reply.should_refresh_financial_views);
        // Row survives, state cleared
        assert!(h.ledger.get_transaction(tx_id, h.user_id).await.is_ok());
        assert!(h.state_store.get(h.session_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_topic_switch_discards_pending_fields() {
        let h = harness();

        // Start an add_transaction flow that still needs fields
        h.say("catat pengeluaran 50rb").await;
        let pending = h.state_store.get(h.session_id).await.unwrap().unwrap();
        assert_eq!(pending.intent, ActionKind::AddTransaction);

        // A new goal command mid-flow switches topic and executes fresh
        let reply = h.say("buat target tabungan liburan 5 juta").await;
        assert!(reply.should_refresh_financial_views, "{}", reply.reply_text);
        assert!(reply.reply_text.contains("Liburan"));

        // Old flow is gone; nothing was recorded for it
        assert!(h.state_store.get(h.session_id).await.unwrap().is_none());
        let summary = h
            .ledger
            .get_summary(
                h.user_id,
                crate::models::SummaryPeriod::current(),
            )
            .await
            .unwrap();
        assert_eq!(summary.total_expense, 0.0);
    }

    #[tokio::test]
    async fn test_cancel_when_idle_is_noop() {
        let h = harness();
        let first = h.say("batal").await;
        let second = h.say("batal").await;

        assert!(!first.should_refresh_financial_views);
        assert_eq!(first.reply_text, second.reply_text);
    }

    #[tokio::test]
    async fn test_expired_state_reclassifies_from_scratch() {
        let h = harness();

        // Age a pending transfer past the TTL
        let mut stale = ConversationState::new(h.session_id, h.user_id, ActionKind::TransferFunds);
        stale.awaiting = Some(FieldKind::Amount);
        stale.updated_at = Utc::now() - chrono::Duration::seconds(STATE_TTL_SECONDS + 120);
        stale.expires_at = Utc::now() - chrono::Duration::seconds(120);
        h.state_store.put(stale, None).await.unwrap();

        // "100000" would have answered the amount slot; instead it is
        // reclassified from scratch and falls through to a rephrase ask
        let reply = h.say("100000").await;
        assert!(h.state_store.get(h.session_id).await.unwrap().is_none());
        assert!(!reply.should_refresh_financial_views);
        assert!(reply.reply_text.contains("belum paham") || reply.reply_text.contains("mengerti"));
    }

    #[tokio::test]
    async fn test_validation_failure_reasks_single_field() {
        let h = harness();

        // Unknown destination account passes slot filling (it is fuzzy) but
        // a nonexistent goal id fails validation with that field
        h.ledger
            .insert_goal(NewGoal {
                user_id: h.user_id,
                name: "Liburan".to_string(),
                target_amount: 5_000_000.0,
                target_date: None,
                description: String::new(),
            })
            .await
            .unwrap();

        h.say("nabung 200rb dari cash").await; // goal id still missing
        let reply = h.say("99").await; // wrong id

        // Re-asked for the goal id; amount and source survived
        assert!(reply.reply_text.contains("Target tabungan"));
        let state = h.state_store.get(h.session_id).await.unwrap().unwrap();
        assert_eq!(state.state, FlowState::AwaitingField);
        assert!(state.partial_data.contains_key("amount"));
        assert!(state.partial_data.contains_key("from_account"));
        assert!(!state.partial_data.contains_key("goal_id"));

        // Correct id completes the flow
        let reply = h.say("1").await;
        assert!(reply.should_refresh_financial_views, "{}", reply.reply_text);
        let goal = h.ledger.get_goal(1, h.user_id).await.unwrap();
        assert_eq!(goal.current_amount, 200_000.0);
    }

    #[tokio::test]
    async fn test_query_summary_reads_without_refresh() {
        let h = harness();
        h.ledger
            .insert_transaction(NewTransaction {
                user_id: h.user_id,
                date: Utc::now().date_naive(),
                kind: TransactionKind::Expense,
                category: "Makan".to_string(),
                amount: 75_000.0,
                account: "Cash".to_string(),
                description: String::new(),
            })
            .await
            .unwrap();

        let reply = h.say("berapa total pengeluaran bulan ini?").await;
        assert!(!reply.should_refresh_financial_views);
        assert!(reply.reply_text.contains("Rp 75.000"), "{}", reply.reply_text);
    }

    #[tokio::test]
    async fn test_cross_user_delete_blocked() {
        let h = harness();
        let other_user = Uuid::new_v4();
        let foreign_tx = h
            .ledger
            .insert_transaction(NewTransaction {
                user_id: other_user,
                date: Utc::now().date_naive(),
                kind: TransactionKind::Expense,
                category: "Makan".to_string(),
                amount: 50_000.0,
                account: "Cash".to_string(),
                description: String::new(),
            })
            .await
            .unwrap();

        let reply = h.say(&format!("hapus transaksi {}", foreign_tx)).await;

        // Ownership failure re-asks for the id; the foreign row is untouched
        assert!(!reply.should_refresh_financial_views);
        assert!(reply.reply_text.contains("tidak ditemukan"));
        assert!(h.ledger.get_transaction(foreign_tx, other_user).await.is_ok());
    }

    #[tokio::test]
    async fn test_balance_query_lists_accounts() {
        let h = harness();
        h.say("catat pengeluaran makan 50rb dari cash").await;

        let reply = h.say("berapa saldo saya sekarang?").await;
        assert!(!reply.should_refresh_financial_views);
        assert!(reply.reply_text.contains("Cash"), "{}", reply.reply_text);
        assert!(reply.reply_text.contains("Rp 50.000"));
    }

    #[tokio::test]
    async fn test_model_rescues_failed_field_extraction() {
        use crate::llm::{ClassifyContext, LlmClassification};

        // A model that understands slangy phrasing the rules cannot
        struct ExtractingModel;

        #[async_trait::async_trait]
        impl LanguageModel for ExtractingModel {
            async fn classify(
                &self,
                _utterance: &str,
                _context: &ClassifyContext,
            ) -> crate::Result<LlmClassification> {
                Err(PipelineError::ProviderTimeout)
            }

            async fn extract_field(
                &self,
                _utterance: &str,
                field: FieldKind,
            ) -> crate::Result<Option<String>> {
                Ok(match field {
                    FieldKind::Amount => Some("100000".to_string()),
                    _ => None,
                })
            }

            async fn phrase_confirmation(
                &self,
                summary: &str,
                _language: Language,
            ) -> crate::Result<String> {
                Ok(summary.to_string())
            }
        }

        let ledger = Arc::new(InMemoryLedger::new());
        let state_store = Arc::new(InMemoryStateStore::new());
        let pipeline = ChatPipeline::with_model(
            state_store.clone(),
            ledger.clone(),
            Arc::new(ExtractingModel),
        );
        let session_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();
        let say = |utterance: &str| {
            let pipeline = &pipeline;
            let utterance = utterance.to_string();
            async move {
                pipeline
                    .handle_turn(&ChatTurn {
                        session_id,
                        user_id,
                        utterance,
                        language: Language::Indonesian,
                    })
                    .await
            }
        };

        say("transfer ke ovo").await;

        // Rules cannot parse this amount; the model's extraction fills it
        let reply = say("kirimin secukupnya lah pokoknya").await;
        assert!(
            reply.reply_text.to_lowercase().contains("dari akun"),
            "{}",
            reply.reply_text
        );
        let state = state_store.get(session_id).await.unwrap().unwrap();
        assert_eq!(
            state.partial_data.get("amount").unwrap().as_f64(),
            Some(100_000.0)
        );
    }

    #[tokio::test]
    async fn test_general_greeting_gets_help() {
        let h = harness();
        let reply = h.say("halo").await;
        assert!(!reply.should_refresh_financial_views);
        assert!(!reply.reply_text.is_empty());
        assert!(h.state_store.get(h.session_id).await.unwrap().is_none());
    }
}
