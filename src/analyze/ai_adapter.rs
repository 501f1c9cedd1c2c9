//! AI adapter: opinion-provider abstraction + daily call limit.
//!
//! The engine only ever sees `DynOpinionClient`. Every failure comes back as an
//! `OpinionError`; the caller substitutes the deterministic fallback opinion.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Context;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::config::ai::{OpinionConfig, ProviderKind};

// ------------------------------------------------------------
// Public surface
// ------------------------------------------------------------

/// Why an opinion could not be produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpinionError {
    pub provider: &'static str,
    /// One of: disabled, limit, http, decode, empty, timeout.
    pub stage: &'static str,
    pub detail: String,
}

impl OpinionError {
    pub fn new(provider: &'static str, stage: &'static str, detail: impl Into<String>) -> Self {
        Self {
            provider,
            stage,
            detail: detail.into(),
        }
    }
}

impl fmt::Display for OpinionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "opinion provider error (provider={}, stage={}): {}",
            self.provider, self.stage, self.detail
        )
    }
}

impl std::error::Error for OpinionError {}

pub type OpinionFuture<'a> = Pin<Box<dyn Future<Output = Result<String, OpinionError>> + Send + 'a>>;

/// Trait object used by the engine (and by tests to plug failing clients).
pub trait OpinionClient: Send + Sync {
    /// Complete the prompt into a short free-text opinion.
    fn complete<'a>(&'a self, prompt: &'a str) -> OpinionFuture<'a>;
    /// Provider name for diagnostics.
    fn provider_name(&self) -> &'static str;
}

/// Convenient alias used by callers.
pub type DynOpinionClient = Arc<dyn OpinionClient>;

/// Factory: build a client according to config and environment variables.
///
/// * If `AI_TEST_MODE=mock`, returns a deterministic mock client.
/// * Else if the config is disabled or has no key, returns a disabled client.
/// * Else builds the real provider wrapped with the daily limit.
pub fn build_client_from_config(config: &OpinionConfig) -> anyhow::Result<DynOpinionClient> {
    if std::env::var("AI_TEST_MODE")
        .map(|v| v == "mock")
        .unwrap_or(false)
    {
        let mock = MockProvider::new("Sentiment signals are mixed; monitor upcoming news (mock).");
        return Ok(Arc::new(DailyLimited::new(mock, config.daily_limit)));
    }

    if !config.is_usable() {
        return Ok(Arc::new(DisabledClient));
    }

    let client: DynOpinionClient = match config.provider {
        ProviderKind::OpenAi => Arc::new(DailyLimited::new(
            OpenAiProvider::new(config)?,
            config.daily_limit,
        )),
        ProviderKind::Anthropic => Arc::new(DailyLimited::new(
            AnthropicProvider::new(config)?,
            config.daily_limit,
        )),
    };
    Ok(client)
}

// ------------------------------------------------------------
// Provider abstraction + concrete providers
// ------------------------------------------------------------

/// Low-level provider: does a *real* remote call. Separated so the same limit
/// wrapper serves production and tests.
pub trait Provider: Send + Sync + 'static {
    fn fetch<'a>(&'a self, prompt: &'a str) -> OpinionFuture<'a>;
    fn name(&self) -> &'static str;
}

fn http_client(config: &OpinionConfig) -> anyhow::Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent("market-sentiment-recommender/0.1")
        .connect_timeout(Duration::from_secs(4))
        .timeout(Duration::from_secs(config.timeout_secs.max(1)))
        .build()
        .context("failed to build opinion http client")
}

/// OpenAI provider (Chat Completions API).
pub struct OpenAiProvider {
    http: reqwest::Client,
    api_key: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl OpenAiProvider {
    pub const DEFAULT_MODEL: &'static str = "gpt-3.5-turbo";

    pub fn new(config: &OpinionConfig) -> anyhow::Result<Self> {
        Ok(Self {
            http: http_client(config)?,
            api_key: config.api_key.clone(),
            model: config
                .model
                .clone()
                .unwrap_or_else(|| Self::DEFAULT_MODEL.to_string()),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        })
    }
}

impl Provider for OpenAiProvider {
    fn fetch<'a>(&'a self, prompt: &'a str) -> OpinionFuture<'a> {
        Box::pin(async move {
            #[derive(Serialize)]
            struct Msg<'r> {
                role: &'r str,
                content: &'r str,
            }
            #[derive(Serialize)]
            struct Req<'r> {
                model: &'r str,
                messages: Vec<Msg<'r>>,
                max_tokens: u32,
                temperature: f32,
            }
            #[derive(Deserialize)]
            struct Resp {
                choices: Vec<Choice>,
            }
            #[derive(Deserialize)]
            struct Choice {
                message: ChoiceMsg,
            }
            #[derive(Deserialize)]
            struct ChoiceMsg {
                content: String,
            }

            let req = Req {
                model: &self.model,
                messages: vec![Msg {
                    role: "user",
                    content: prompt,
                }],
                max_tokens: self.max_tokens,
                temperature: self.temperature,
            };

            let resp = self
                .http
                .post("https://api.openai.com/v1/chat/completions")
                .bearer_auth(&self.api_key)
                .json(&req)
                .send()
                .await
                .map_err(|e| OpinionError::new("openai", "http", e.to_string()))?;

            let status = resp.status();
            if !status.is_success() {
                return Err(OpinionError::new("openai", "http", format!("status={status}")));
            }
            let body: Resp = resp
                .json()
                .await
                .map_err(|e| OpinionError::new("openai", "decode", e.to_string()))?;
            let content = body
                .choices
                .first()
                .map(|c| c.message.content.as_str())
                .unwrap_or("");
            non_empty("openai", content)
        })
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}

/// Anthropic provider (Messages API).
pub struct AnthropicProvider {
    http: reqwest::Client,
    api_key: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl AnthropicProvider {
    pub const DEFAULT_MODEL: &'static str = "claude-3-sonnet-20240229";
    const API_VERSION: &'static str = "2023-06-01";

    pub fn new(config: &OpinionConfig) -> anyhow::Result<Self> {
        Ok(Self {
            http: http_client(config)?,
            api_key: config.api_key.clone(),
            model: config
                .model
                .clone()
                .unwrap_or_else(|| Self::DEFAULT_MODEL.to_string()),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        })
    }
}

impl Provider for AnthropicProvider {
    fn fetch<'a>(&'a self, prompt: &'a str) -> OpinionFuture<'a> {
        Box::pin(async move {
            #[derive(Serialize)]
            struct Msg<'r> {
                role: &'r str,
                content: &'r str,
            }
            #[derive(Serialize)]
            struct Req<'r> {
                model: &'r str,
                max_tokens: u32,
                temperature: f32,
                messages: Vec<Msg<'r>>,
            }
            #[derive(Deserialize)]
            struct Resp {
                content: Vec<Block>,
            }
            #[derive(Deserialize)]
            struct Block {
                #[serde(default)]
                text: String,
            }

            let req = Req {
                model: &self.model,
                max_tokens: self.max_tokens,
                temperature: self.temperature,
                messages: vec![Msg {
                    role: "user",
                    content: prompt,
                }],
            };

            let resp = self
                .http
                .post("https://api.anthropic.com/v1/messages")
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", Self::API_VERSION)
                .json(&req)
                .send()
                .await
                .map_err(|e| OpinionError::new("anthropic", "http", e.to_string()))?;

            let status = resp.status();
            if !status.is_success() {
                return Err(OpinionError::new("anthropic", "http", format!("status={status}")));
            }
            let body: Resp = resp
                .json()
                .await
                .map_err(|e| OpinionError::new("anthropic", "decode", e.to_string()))?;
            let text = body.content.first().map(|b| b.text.as_str()).unwrap_or("");
            non_empty("anthropic", text)
        })
    }

    fn name(&self) -> &'static str {
        "anthropic"
    }
}

/// Always fails with stage `disabled`; used when no provider is configured.
pub struct DisabledClient;

impl OpinionClient for DisabledClient {
    fn complete<'a>(&'a self, _prompt: &'a str) -> OpinionFuture<'a> {
        Box::pin(async {
            Err::<String, _>(OpinionError::new(
                "disabled",
                "disabled",
                "no opinion provider configured",
            ))
        })
    }
    fn provider_name(&self) -> &'static str {
        "disabled"
    }
}

/// Simple mock provider for tests/local runs.
#[derive(Clone)]
pub struct MockProvider {
    pub fixed: String,
}

impl MockProvider {
    pub fn new(fixed: impl Into<String>) -> Self {
        Self {
            fixed: fixed.into(),
        }
    }
}

impl Provider for MockProvider {
    fn fetch<'a>(&'a self, _prompt: &'a str) -> OpinionFuture<'a> {
        let out = self.fixed.clone();
        Box::pin(async move { Ok(out) })
    }
    fn name(&self) -> &'static str {
        "mock"
    }
}

// ------------------------------------------------------------
// Daily limit wrapper
// ------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
struct DailyCounter {
    day: NaiveDate,
    count: u32,
}

impl DailyCounter {
    fn today() -> Self {
        Self {
            day: Utc::now().date_naive(),
            count: 0,
        }
    }
}

/// Counts real calls per UTC day; once the limit is reached every call fails
/// with stage `limit` until the day rolls over.
pub struct DailyLimited<P: Provider> {
    inner: P,
    daily_limit_max: u32,
    counter: Mutex<DailyCounter>,
}

impl<P: Provider> DailyLimited<P> {
    pub fn new(inner: P, daily_limit_max: u32) -> Self {
        Self {
            inner,
            daily_limit_max,
            counter: Mutex::new(DailyCounter::today()),
        }
    }

    /// Reserve one call slot. Returns false when the limit is exhausted.
    fn try_reserve(&self) -> bool {
        let mut g = self.counter.lock().unwrap_or_else(|e| e.into_inner());
        let today = Utc::now().date_naive();
        if g.day != today {
            *g = DailyCounter::today();
        }
        if g.count >= self.daily_limit_max {
            return false;
        }
        g.count = g.count.saturating_add(1);
        true
    }

    async fn complete_impl(&self, prompt: &str) -> Result<String, OpinionError> {
        if !self.try_reserve() {
            return Err(OpinionError::new(
                self.inner.name(),
                "limit",
                format!("daily limit of {} reached", self.daily_limit_max),
            ));
        }
        debug!(provider = self.inner.name(), prompt_id = %prompt_id(prompt), "opinion request");
        let raw = self.inner.fetch(prompt).await?;
        non_empty(self.inner.name(), &raw)
    }
}

impl<P: Provider> OpinionClient for DailyLimited<P> {
    fn complete<'a>(&'a self, prompt: &'a str) -> OpinionFuture<'a> {
        Box::pin(self.complete_impl(prompt))
    }
    fn provider_name(&self) -> &'static str {
        self.inner.name()
    }
}

// ------------------------------------------------------------
// Helpers
// ------------------------------------------------------------

/// Short stable id for a prompt so logs never carry the prompt text itself.
pub fn prompt_id(prompt: &str) -> String {
    let digest = Sha256::digest(prompt.as_bytes());
    digest.iter().take(6).map(|b| format!("{b:02x}")).collect()
}

fn non_empty(provider: &'static str, raw: &str) -> Result<String, OpinionError> {
    let cleaned = sanitize_opinion(raw);
    if cleaned.is_empty() {
        Err(OpinionError::new(provider, "empty", "provider returned no text"))
    } else {
        Ok(cleaned)
    }
}

/// Single line, collapsed whitespace, at most 1000 chars.
pub fn sanitize_opinion(input: &str) -> String {
    const MAX_CHARS: usize = 1000;
    let mut out = String::with_capacity(input.len().min(MAX_CHARS));
    for (n, word) in input.split_whitespace().enumerate() {
        if n > 0 {
            out.push(' ');
        }
        out.push_str(word);
    }
    if out.chars().count() > MAX_CHARS {
        out = out.chars().take(MAX_CHARS).collect();
    }
    out.trim().to_string()
}
