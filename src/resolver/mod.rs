//! Intent resolution
//!
//! Classifies a raw utterance into {actionable, query, general} and, for
//! actionable utterances, one of the nine actions. Strategies run as an
//! ordered chain: deterministic keyword rules first, LLM fallback only when
//! no rule matches. Classification is pure and never mutates state.

use crate::llm::{ClassifyContext, LanguageModel};
use crate::models::{ActionKind, IntentCategory};
use std::sync::Arc;
use tracing::{debug, warn};

/// Static keyword lists per action. Longer keywords are more specific and
/// win ties; bare prepositions ("dari", "ke") are deliberately absent so
/// slot answers like "dari cash" never look like new commands.
const ACTION_RULES: &[(ActionKind, &[&str])] = &[
    (
        ActionKind::TransferToSavings,
        &[
            "nabung", "menabung", "tabung", "setor ke target", "ke tabungan",
            "isi target", "save to goal",
        ],
    ),
    (
        ActionKind::CreateSavingsGoal,
        &[
            "buat target", "bikin target", "target tabungan", "buat tujuan",
            "saving goal", "create goal", "target menabung",
        ],
    ),
    (
        ActionKind::UpdateSavingsGoal,
        &["ubah target", "edit target", "update goal", "ganti target"],
    ),
    (
        ActionKind::DeleteSavingsGoal,
        &["hapus target", "hapus tujuan", "delete goal", "remove goal"],
    ),
    (
        ActionKind::DeleteTransaction,
        &[
            "hapus transaksi", "hapus", "buang", "delete", "remove transaction",
        ],
    ),
    (
        ActionKind::EditTransaction,
        &[
            "ubah transaksi", "edit transaksi", "ubah", "edit", "ganti",
            "perbaiki", "update transaction", "koreksi",
        ],
    ),
    (
        ActionKind::TransferFunds,
        &["transfer", "pindahkan", "pindah dana", "move funds"],
    ),
    (
        ActionKind::AddTransaction,
        &[
            "catat", "record", "tambah", "input", "pemasukan", "pengeluaran",
            "saya habiskan", "saya dapat", "saya terima", "i spent", "spent",
            "paid", "bought", "beli", "bayar", "received", "earned",
        ],
    ),
];

/// Read-only questions route to query_summary.
const QUERY_KEYWORDS: &[&str] = &[
    "berapa total", "berapa saldo", "berapa pengeluaran", "berapa pemasukan",
    "total pengeluaran", "total pemasukan", "ringkasan", "summary", "laporan",
    "report", "saldo", "balance", "overview", "statistik",
];

/// Everything else that is recognizably small talk or education.
const GENERAL_KEYWORDS: &[&str] = &[
    "halo", "hai", "hello", "hi", "selamat pagi", "selamat siang",
    "selamat malam", "apa itu", "jelaskan", "bagaimana cara", "gimana cara",
    "tips", "bantuan", "help", "apa yang bisa", "terima kasih", "makasih",
    "thanks",
];

const CANCEL_KEYWORDS: &[&str] = &[
    "batal", "batalkan", "cancel", "gak jadi", "tidak jadi", "ga jadi",
    "nevermind", "never mind", "stop",
];

const AFFIRMATIVE_KEYWORDS: &[&str] = &[
    "ya", "iya", "y", "yes", "yep", "ok", "oke", "okay", "benar", "betul",
    "konfirmasi", "lanjut", "jadi", "catat", "hapus", "buat", "sip",
];

const NEGATIVE_KEYWORDS: &[&str] = &[
    "tidak", "no", "nggak", "gak", "ga", "jangan", "salah", "bukan",
];

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedIntent {
    pub category: IntentCategory,
    pub action: Option<ActionKind>,
    pub confidence: f32,
}

impl ResolvedIntent {
    fn general(confidence: f32) -> Self {
        Self {
            category: IntentCategory::General,
            action: None,
            confidence,
        }
    }
}

/// What a pending conversation should do with an incoming utterance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    /// Explicit cancellation; clear the state without executing
    Cancel,
    /// A new actionable intent incompatible with the pending one
    TopicSwitch(ActionKind),
}

//
// ================= Strategy Chain =================
//

/// One classifier in the ordered chain; first confident answer wins.
#[async_trait::async_trait]
pub trait IntentStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    async fn resolve(
        &self,
        utterance: &str,
        context: &ClassifyContext,
    ) -> Option<ResolvedIntent>;
}

/// Deterministic keyword rules. Zero allocation on the tables, no network.
pub struct RuleStrategy;

/// Confidence shaping: base 0.7, bonus for a match anchored at the start
/// and for short direct messages, penalty for rambling ones.
fn keyword_confidence(utterance: &str, keyword: &str) -> f32 {
    let mut confidence: f32 = 0.7;
    if utterance.starts_with(keyword) {
        confidence += 0.2;
    }
    let words = utterance.split_whitespace().count();
    if words <= 5 {
        confidence += 0.1;
    } else if words > 15 {
        confidence -= 0.1;
    }
    confidence.clamp(0.0, 1.0)
}

impl RuleStrategy {
    fn best_action_match(utterance: &str) -> Option<(ActionKind, &'static str, f32)> {
        let mut best: Option<(ActionKind, &'static str, f32)> = None;

        for (action, keywords) in ACTION_RULES {
            for keyword in *keywords {
                if !utterance.contains(keyword) {
                    continue;
                }
                let confidence = keyword_confidence(utterance, keyword);
                let better = match &best {
                    None => true,
                    Some((_, best_kw, best_conf)) => {
                        keyword.len() > best_kw.len()
                            || (keyword.len() == best_kw.len() && confidence > *best_conf)
                    }
                };
                if better {
                    best = Some((*action, keyword, confidence));
                }
            }
        }
        best
    }
}

#[async_trait::async_trait]
impl IntentStrategy for RuleStrategy {
    fn name(&self) -> &'static str {
        "rules"
    }

    async fn resolve(
        &self,
        utterance: &str,
        _context: &ClassifyContext,
    ) -> Option<ResolvedIntent> {
        let lower = utterance.to_lowercase();

        let action_match = Self::best_action_match(&lower);
        let query_match = QUERY_KEYWORDS
            .iter()
            .filter(|kw| lower.contains(**kw))
            .max_by_key(|kw| kw.len());

        // Longest keyword wins across tables: "total pengeluaran" is a
        // query even though "pengeluaran" alone would record an expense.
        let query_wins = match (&action_match, query_match) {
            (Some((_, action_kw, _)), Some(query_kw)) => query_kw.len() > action_kw.len(),
            (None, Some(_)) => true,
            _ => false,
        };

        if query_wins {
            let keyword = query_match.expect("query keyword present");
            return Some(ResolvedIntent {
                category: IntentCategory::Query,
                action: Some(ActionKind::QuerySummary),
                confidence: keyword_confidence(&lower, keyword),
            });
        }

        if let Some((action, keyword, confidence)) = action_match {
            debug!(action = %action, keyword, "rule matched actionable intent");
            return Some(ResolvedIntent {
                category: IntentCategory::Actionable,
                action: Some(action),
                confidence,
            });
        }

        if let Some(keyword) = GENERAL_KEYWORDS.iter().find(|kw| lower.contains(**kw)) {
            return Some(ResolvedIntent {
                category: IntentCategory::General,
                action: None,
                confidence: keyword_confidence(&lower, keyword),
            });
        }

        None
    }
}

/// LLM fallback for phrasing the rules cannot see. Failures and timeouts
/// resolve to `None` so the caller degrades instead of hanging.
pub struct LlmStrategy {
    model: Arc<dyn LanguageModel>,
}

impl LlmStrategy {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }
}

#[async_trait::async_trait]
impl IntentStrategy for LlmStrategy {
    fn name(&self) -> &'static str {
        "llm"
    }

    async fn resolve(
        &self,
        utterance: &str,
        context: &ClassifyContext,
    ) -> Option<ResolvedIntent> {
        match self.model.classify(utterance, context).await {
            Ok(c) if c.confidence >= 0.5 => Some(ResolvedIntent {
                category: c.category,
                action: c.action,
                confidence: c.confidence,
            }),
            Ok(_) => None,
            Err(e) => {
                warn!("LLM classification unavailable: {}", e);
                None
            }
        }
    }
}

//
// ================= Resolver =================
//

pub struct IntentResolver {
    strategies: Vec<Box<dyn IntentStrategy>>,
}

impl IntentResolver {
    /// Deterministic rules only.
    pub fn rules_only() -> Self {
        Self {
            strategies: vec![Box::new(RuleStrategy)],
        }
    }

    /// Rules first, model as fallback.
    pub fn with_model(model: Arc<dyn LanguageModel>) -> Self {
        Self {
            strategies: vec![Box::new(RuleStrategy), Box::new(LlmStrategy::new(model))],
        }
    }

    /// Classify an utterance. Unresolvable input comes back as `general`
    /// with zero confidence so the caller can ask the user to rephrase.
    pub async fn resolve(&self, utterance: &str, context: &ClassifyContext) -> ResolvedIntent {
        for strategy in &self.strategies {
            if let Some(intent) = strategy.resolve(utterance, context).await {
                debug!(
                    strategy = strategy.name(),
                    category = ?intent.category,
                    action = ?intent.action,
                    "intent resolved"
                );
                return intent;
            }
        }
        ResolvedIntent::general(0.0)
    }

    /// While a state is pending: is this utterance an explicit interrupt?
    /// Anything that is neither a cancel nor a start-anchored new actionable
    /// intent is treated as an answer to the pending slot.
    pub fn detect_interrupt(utterance: &str, pending: ActionKind) -> Option<Interrupt> {
        let lower = utterance.to_lowercase();

        if is_cancellation(&lower) {
            return Some(Interrupt::Cancel);
        }

        let (action, _, _) = RuleStrategy::best_action_match(&lower)?;
        if action == pending {
            return None;
        }

        // Only a command anchored at the start counts as a switch; any of
        // the winning action's keywords may be the anchor
        let anchored = ACTION_RULES
            .iter()
            .find(|(a, _)| *a == action)
            .map(|(_, keywords)| keywords.iter().any(|kw| lower.starts_with(kw)))
            .unwrap_or(false);

        if anchored {
            Some(Interrupt::TopicSwitch(action))
        } else {
            None
        }
    }
}

//
// ================= Shared Vocabulary =================
//

pub fn is_cancellation(utterance: &str) -> bool {
    let lower = utterance.trim().to_lowercase();
    CANCEL_KEYWORDS
        .iter()
        .any(|kw| lower == *kw || lower.starts_with(&format!("{} ", kw)))
}

pub fn is_affirmative(utterance: &str) -> bool {
    let lower = utterance.trim().to_lowercase();
    AFFIRMATIVE_KEYWORDS.iter().any(|kw| lower == *kw)
        || AFFIRMATIVE_KEYWORDS
            .iter()
            .any(|kw| lower.starts_with(&format!("{} ", kw)))
}

pub fn is_negative(utterance: &str) -> bool {
    let lower = utterance.trim().to_lowercase();
    is_cancellation(&lower) || NEGATIVE_KEYWORDS.iter().any(|kw| lower == *kw)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn resolve(utterance: &str) -> ResolvedIntent {
        IntentResolver::rules_only()
            .resolve(utterance, &ClassifyContext::default())
            .await
    }

    #[tokio::test]
    async fn test_actionable_rules() {
        let cases = [
            ("catat pengeluaran makan 50rb dari cash", ActionKind::AddTransaction),
            ("transfer 100rb dari cash ke ovo", ActionKind::TransferFunds),
            ("buat target tabungan liburan 5 juta", ActionKind::CreateSavingsGoal),
            ("hapus transaksi 123", ActionKind::DeleteTransaction),
            ("nabung 200rb ke target liburan", ActionKind::TransferToSavings),
            ("ubah transaksi 42", ActionKind::EditTransaction),
            ("hapus target 7", ActionKind::DeleteSavingsGoal),
        ];

        for (utterance, expected) in cases {
            let intent = resolve(utterance).await;
            assert_eq!(intent.category, IntentCategory::Actionable, "{}", utterance);
            assert_eq!(intent.action, Some(expected), "{}", utterance);
        }
    }

    #[tokio::test]
    async fn test_query_rules() {
        for utterance in [
            "berapa total pengeluaran bulan ini?",
            "ringkasan keuangan saya",
            "show my balance",
        ] {
            let intent = resolve(utterance).await;
            assert_eq!(intent.category, IntentCategory::Query, "{}", utterance);
            assert_eq!(intent.action, Some(ActionKind::QuerySummary));
        }
    }

    #[tokio::test]
    async fn test_general_and_unknown() {
        let greeting = resolve("halo apa kabar").await;
        assert_eq!(greeting.category, IntentCategory::General);

        let noise = resolve("qwerty zxcvb").await;
        assert_eq!(noise.category, IntentCategory::General);
        assert_eq!(noise.confidence, 0.0);
    }

    #[test]
    fn test_interrupt_detection() {
        // Explicit cancel wins over everything
        assert_eq!(
            IntentResolver::detect_interrupt("batal", ActionKind::AddTransaction),
            Some(Interrupt::Cancel)
        );

        // New command anchored at the start switches topic
        assert_eq!(
            IntentResolver::detect_interrupt(
                "buat target tabungan liburan 5 juta",
                ActionKind::AddTransaction
            ),
            Some(Interrupt::TopicSwitch(ActionKind::CreateSavingsGoal))
        );

        // Slot answers never interrupt
        assert_eq!(
            IntentResolver::detect_interrupt("100000", ActionKind::TransferFunds),
            None
        );
        assert_eq!(
            IntentResolver::detect_interrupt("dari cash", ActionKind::TransferFunds),
            None
        );

        // Same intent repeated is not a switch
        assert_eq!(
            IntentResolver::detect_interrupt(
                "transfer 100rb ke ovo",
                ActionKind::TransferFunds
            ),
            None
        );
    }

    #[test]
    fn test_confirmation_vocabulary() {
        assert!(is_affirmative("ya"));
        assert!(is_affirmative("ok lanjut"));
        assert!(is_negative("tidak"));
        assert!(is_negative("batal"));
        assert!(!is_affirmative("hmm"));
        assert!(is_cancellation("batalkan"));
        assert!(!is_cancellation("jangan batal eh maksudnya lanjut"));
    }
}
