//! Web search collaborator
//!
//! [`WebSearchProvider`] is the capability the decision engine calls when a
//! task needs factual data. [`PerplexityClient`] implements it on top of the
//! Perplexity chat-completion API, asking for a JSON answer and pulling the
//! first `{ ... }` object out of the reply.

use super::content::{DateEvent, Definition, Figure, Formula};
use crate::config::WebConfig;
use crate::error::{FocuspathError, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

const SYSTEM_PROMPT: &str = "Tu es un assistant de recherche factuel. Réponds de manière concise et précise avec des faits vérifiables.";

/// Low temperature for factual answers
const TEMPERATURE: f32 = 0.2;

const ENRICH_MAX_TOKENS: u32 = 1500;

/// Longest single pause between two attempts
pub const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Pause before retry number `retry` (0-based): `base_ms * 2^retry`,
/// saturating and capped at [`MAX_BACKOFF`].
pub fn backoff_delay(base_ms: u64, retry: usize) -> Duration {
    let ms = u32::try_from(retry)
        .ok()
        .and_then(|r| 2_u64.checked_pow(r))
        .and_then(|factor| base_ms.checked_mul(factor))
        .unwrap_or(u64::MAX);
    Duration::from_millis(ms).min(MAX_BACKOFF)
}

/// Facts returned by a web search
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebEnrichment {
    pub success: bool,
    pub definitions: Vec<Definition>,
    pub dates: Vec<DateEvent>,
    pub formulas: Vec<Formula>,
    pub figures: Vec<Figure>,
    pub facts: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl WebEnrichment {
    /// Unsuccessful result carrying the reason
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Default::default()
        }
    }
}

/// Capability: enrich a task with facts from the web
#[async_trait]
pub trait WebSearchProvider: Send + Sync {
    async fn enrich_topic(
        &self,
        task: &str,
        subject: &str,
        topic: Option<&str>,
    ) -> Result<WebEnrichment>;

    /// Source label used in usage logs
    fn source_name(&self) -> &str {
        "web"
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: String,
}

/// Perplexity API client
pub struct PerplexityClient {
    client: Client,
    api_key: String,
    api_url: String,
    model: String,
    max_retries: usize,
    backoff_base_ms: u64,
}

impl PerplexityClient {
    pub fn new(config: &WebConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| FocuspathError::NetworkError(e.to_string()))?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            api_url: config.api_url.clone(),
            model: config.model.clone(),
            max_retries: config.max_retries,
            backoff_base_ms: config.backoff_base_ms,
        })
    }

    /// Whether an API key is configured
    pub fn is_available(&self) -> bool {
        !self.api_key.is_empty()
    }

    /// Free-form factual query; returns the answer text.
    pub async fn search(&self, query: &str, max_tokens: u32) -> Result<String> {
        if !self.is_available() {
            return Err(FocuspathError::WebUnavailable(
                "Perplexity API key not configured".to_string(),
            ));
        }

        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: query.to_string(),
                },
            ],
            max_tokens,
            temperature: TEMPERATURE,
        };

        self.call_api_with_retry(&request).await
    }

    async fn call_api_with_retry(&self, request: &ChatRequest) -> Result<String> {
        let mut retries = 0;

        loop {
            match self.call_api(request).await {
                Ok(answer) => return Ok(answer),
                Err(e) => {
                    if retries >= self.max_retries || !e.is_transient() {
                        return Err(e);
                    }

                    let backoff = backoff_delay(self.backoff_base_ms, retries);
                    warn!(
                        "Perplexity call failed ({}), retrying after {}ms (attempt {}/{})",
                        e,
                        backoff.as_millis(),
                        retries + 1,
                        self.max_retries
                    );

                    sleep(backoff).await;
                    retries += 1;
                }
            }
        }
    }

    async fn call_api(&self, request: &ChatRequest) -> Result<String> {
        debug!("Calling Perplexity API, model: {}", self.model);

        let response = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    FocuspathError::Timeout(e.to_string())
                } else {
                    FocuspathError::NetworkError(e.to_string())
                }
            })?;

        let status = response.status();
        match status {
            StatusCode::OK => {
                let body = response.json::<ChatResponse>().await?;
                body.choices
                    .into_iter()
                    .next()
                    .map(|c| c.message.content)
                    .ok_or_else(|| FocuspathError::NetworkError("Empty response from API".to_string()))
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(FocuspathError::WebUnavailable(
                "Invalid or missing API key".to_string(),
            )),
            StatusCode::TOO_MANY_REQUESTS => Err(FocuspathError::RateLimitExceeded(
                "Perplexity rate limit exceeded".to_string(),
            )),
            _ => {
                let error_text = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unknown error".to_string());
                Err(FocuspathError::NetworkError(format!(
                    "API error (status {}): {}",
                    status, error_text
                )))
            }
        }
    }
}

#[async_trait]
impl WebSearchProvider for PerplexityClient {
    async fn enrich_topic(
        &self,
        task: &str,
        subject: &str,
        topic: Option<&str>,
    ) -> Result<WebEnrichment> {
        let answer = self
            .search(&enrichment_prompt(task, subject, topic), ENRICH_MAX_TOKENS)
            .await?;
        parse_enrichment(&answer)
    }

    fn source_name(&self) -> &str {
        "perplexity"
    }
}

/// Prompt asking for a JSON object with the bundle layout
pub fn enrichment_prompt(task: &str, subject: &str, topic: Option<&str>) -> String {
    let topic = topic.map(|t| format!(" sur {}", t)).unwrap_or_default();

    format!(
        r#"Pour cette tâche scolaire de {subject}{topic}:
"{task}"

Fournis des informations factuelles précises au format JSON:
{{
    "definitions": [{{"term": "...", "definition": "..."}}],
    "dates": [{{"date": "...", "event": "..."}}],
    "formulas": [{{"name": "...", "formula": "...", "usage": "..."}}],
    "figures": [{{"name": "...", "role": "...", "period": "..."}}],
    "facts": ["fait 1", "fait 2"]
}}

Règles:
- Maximum 5 éléments par catégorie
- Informations vérifiables uniquement
- Adapté au niveau scolaire français"#
    )
}

/// Slice from the first `{` to the last `}`, if any
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Parse a model answer into a successful enrichment
pub fn parse_enrichment(answer: &str) -> Result<WebEnrichment> {
    let json = extract_json_object(answer).ok_or_else(|| {
        FocuspathError::ValidationError("No JSON object in web answer".to_string())
    })?;

    let mut enrichment: WebEnrichment = serde_json::from_str(json)?;
    enrichment.success = true;
    enrichment.error = None;
    Ok(enrichment)
}
