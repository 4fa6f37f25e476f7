//! LLM provider abstraction
//!
//! The pipeline treats the model as a pluggable, possibly-unavailable
//! dependency: every call runs under a timeout and the callers degrade to
//! deterministic rules when it fails. `GeminiModel` is the production
//! implementation; `MockModel` keeps tests deterministic.

use crate::error::PipelineError;
use crate::models::{ActionKind, FieldKind, IntentCategory, Language};
use crate::Result;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, info};

/// Hard ceiling on any single provider call.
pub const PROVIDER_TIMEOUT: Duration = Duration::from_secs(10);

/// Context handed to classification so the model can disambiguate replies
/// to its own question.
#[derive(Debug, Clone, Default)]
pub struct ClassifyContext {
    pub last_assistant_message: Option<String>,
    pub recent_turns: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct LlmClassification {
    pub category: IntentCategory,
    pub action: Option<ActionKind>,
    pub confidence: f32,
}

/// Trait for the language model boundary
#[async_trait::async_trait]
pub trait LanguageModel: Send + Sync {
    async fn classify(
        &self,
        utterance: &str,
        context: &ClassifyContext,
    ) -> Result<LlmClassification>;

    async fn extract_field(&self, utterance: &str, field: FieldKind) -> Result<Option<String>>;

    async fn phrase_confirmation(&self, summary: &str, language: Language) -> Result<String>;
}

/// Run a provider future under the standard timeout.
pub async fn with_timeout<T>(
    fut: impl std::future::Future<Output = Result<T>>,
) -> Result<T> {
    match tokio::time::timeout(PROVIDER_TIMEOUT, fut).await {
        Ok(result) => result,
        Err(_) => Err(PipelineError::ProviderTimeout),
    }
}

//
// ================= Gemini Implementation =================
//

/// Reusable Gemini client (connection-pooled)
pub struct GeminiModel {
    client: Client,
    api_key: String,
    base_url: String,
}

impl GeminiModel {
    pub fn new(api_key: String) -> Self {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(8)
            .timeout(PROVIDER_TIMEOUT)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            api_key,
            base_url: "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent".to_string(),
        }
    }

    /// Build a model from `GEMINI_API_KEY`; `None` when not configured so
    /// the pipeline runs rules-only.
    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var("GEMINI_API_KEY").ok()?;
        if api_key.trim().is_empty() {
            return None;
        }
        Some(Self::new(api_key))
    }

    async fn generate(&self, query: &str, system_prompt: &str) -> Result<String> {
        if self.api_key.is_empty() {
            return Err(PipelineError::Llm("GEMINI_API_KEY not configured".to_string()));
        }

        let url = format!("{}?key={}", self.base_url, self.api_key);

        let request = GeminiRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: query.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: 0.2,
                top_p: 0.9,
                top_k: 40,
                max_output_tokens: 512,
            },
            system_instruction: SystemInstruction {
                parts: vec![Part {
                    text: system_prompt.to_string(),
                }],
            },
        };

        info!("Calling Gemini API");

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!("Gemini API request failed: {}", e);
                PipelineError::Llm(format!("Gemini API error: {}", e))
            })?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("Gemini API error response: {}", error_text);
            return Err(PipelineError::Llm(format!("Gemini API error: {}", error_text)));
        }

        let gemini_response: GeminiResponse = response.json().await.map_err(|e| {
            error!("Failed to parse Gemini response: {}", e);
            PipelineError::Llm(format!("Gemini parse error: {}", e))
        })?;

        let answer = gemini_response
            .candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .map(|p| p.text.clone())
            .ok_or_else(|| PipelineError::Llm("Empty response from Gemini".to_string()))?;

        Ok(answer)
    }
}

/// Strip an optional markdown code fence so the JSON payload parses.
fn extract_json_block(text: &str) -> &str {
    let trimmed = text.trim();
    if let Some(start) = trimmed.find('{') {
        if let Some(end) = trimmed.rfind('}') {
            if end > start {
                return &trimmed[start..=end];
            }
        }
    }
    trimmed
}

#[derive(Debug, Deserialize)]
struct ClassifyPayload {
    category: String,
    action: Option<String>,
    #[serde(default)]
    confidence: Option<f32>,
}

#[async_trait::async_trait]
impl LanguageModel for GeminiModel {
    async fn classify(
        &self,
        utterance: &str,
        context: &ClassifyContext,
    ) -> Result<LlmClassification> {
        let mut prompt = String::new();
        if let Some(last) = &context.last_assistant_message {
            prompt.push_str(&format!("Assistant previously asked: {}\n", last));
        }
        if !context.recent_turns.is_empty() {
            prompt.push_str("Recent turns:\n");
            for turn in &context.recent_turns {
                prompt.push_str(&format!("- {}\n", turn));
            }
        }
        prompt.push_str(&format!("User message: {}", utterance));

        let raw = with_timeout(self.generate(&prompt, CLASSIFY_SYSTEM_PROMPT)).await?;
        let payload: ClassifyPayload = serde_json::from_str(extract_json_block(&raw))
            .map_err(|e| PipelineError::Llm(format!("bad classification payload: {}", e)))?;

        let category = match payload.category.as_str() {
            "actionable" => IntentCategory::Actionable,
            "query" => IntentCategory::Query,
            _ => IntentCategory::General,
        };
        let action = payload.action.as_deref().and_then(ActionKind::parse);

        Ok(LlmClassification {
            category,
            action,
            confidence: payload.confidence.unwrap_or(0.7).clamp(0.0, 1.0),
        })
    }

    async fn extract_field(&self, utterance: &str, field: FieldKind) -> Result<Option<String>> {
        let prompt = format!(
            "Field: {}\nUser message: {}\nReturn ONLY the raw value of that field from the message, or the single word null if it is not present.",
            field.key(),
            utterance
        );
        let raw = with_timeout(self.generate(&prompt, EXTRACT_SYSTEM_PROMPT)).await?;
        let value = raw.trim();
        if value.is_empty() || value.eq_ignore_ascii_case("null") {
            Ok(None)
        } else {
            Ok(Some(value.to_string()))
        }
    }

    async fn phrase_confirmation(&self, summary: &str, language: Language) -> Result<String> {
        let lang_name = match language {
            Language::Indonesian => "Indonesian",
            Language::English => "English",
        };
        let prompt = format!(
            "Rephrase this confirmation for a chat user in {} in one short friendly sentence, keeping every number exactly as written: {}",
            lang_name, summary
        );
        with_timeout(self.generate(&prompt, PHRASE_SYSTEM_PROMPT)).await
    }
}

const CLASSIFY_SYSTEM_PROMPT: &str = r#"You classify personal-finance chat messages.

Respond with JSON only:
{"category": "actionable" | "query" | "general",
 "action": one of add_transaction, edit_transaction, delete_transaction,
           transfer_funds, transfer_to_savings, create_savings_goal,
           update_savings_goal, delete_savings_goal, query_summary, or null,
 "confidence": 0.0-1.0}

"actionable" mutates the ledger, "query" reads balances or summaries,
"general" is everything else. Messages may be Indonesian or English."#;

const EXTRACT_SYSTEM_PROMPT: &str =
    "You extract a single field value from a personal-finance chat message. Respond with the raw value only, no explanation.";

const PHRASE_SYSTEM_PROMPT: &str =
    "You are a friendly personal-finance assistant. Keep replies to one sentence and never change any number.";

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
    system_instruction: SystemInstruction,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
    top_k: i32,
    max_output_tokens: i32,
}

#[derive(Debug, Serialize)]
struct SystemInstruction {
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Content,
}

//
// ================= Mock Implementation =================
//

/// Deterministic model for development & testing.
/// Keeps the pipeline functional without a provider key.
pub struct MockModel {
    pub classification: Option<LlmClassification>,
}

impl MockModel {
    pub fn unavailable() -> Self {
        Self {
            classification: None,
        }
    }

    pub fn classifying(category: IntentCategory, action: Option<ActionKind>) -> Self {
        Self {
            classification: Some(LlmClassification {
                category,
                action,
                confidence: 0.9,
            }),
        }
    }
}

#[async_trait::async_trait]
impl LanguageModel for MockModel {
    async fn classify(
        &self,
        _utterance: &str,
        _context: &ClassifyContext,
    ) -> Result<LlmClassification> {
        self.classification
            .clone()
            .ok_or(PipelineError::ProviderTimeout)
    }

    async fn extract_field(&self, _utterance: &str, _field: FieldKind) -> Result<Option<String>> {
        Ok(None)
    }

    async fn phrase_confirmation(&self, summary: &str, _language: Language) -> Result<String> {
        Ok(summary.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialization() {
        let request = GeminiRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: "catat pengeluaran 50rb".to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: 0.2,
                top_p: 0.9,
                top_k: 40,
                max_output_tokens: 512,
            },
            system_instruction: SystemInstruction {
                parts: vec![Part {
                    text: CLASSIFY_SYSTEM_PROMPT.to_string(),
                }],
            },
        };

        let json = serde_json::to_string(&request);
        assert!(json.is_ok());
        assert!(json.unwrap().contains("catat pengeluaran 50rb"));
    }

    #[test]
    fn test_json_block_extraction() {
        let fenced = "```json\n{\"category\": \"actionable\", \"action\": \"transfer_funds\"}\n```";
        let payload: ClassifyPayload =
            serde_json::from_str(extract_json_block(fenced)).unwrap();
        assert_eq!(payload.category, "actionable");
        assert_eq!(payload.action.as_deref(), Some("transfer_funds"));
    }

    #[tokio::test]
    async fn test_mock_unavailable_times_out() {
        let model = MockModel::unavailable();
        let result = model.classify("anything", &ClassifyContext::default()).await;
        assert!(matches!(result, Err(PipelineError::ProviderTimeout)));
    }
}
