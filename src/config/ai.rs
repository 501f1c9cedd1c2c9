// src/config/ai.rs
use serde::{Deserialize, Serialize};
use std::{
    env, fs,
    path::{Path, PathBuf},
};
use tracing::warn;

pub const DEFAULT_AI_CONFIG_PATH: &str = "config/ai.json";
pub const ENV_AI_CONFIG_PATH: &str = "AI_CONFIG_PATH";

fn default_enabled() -> bool {
    true
}
fn default_api_key() -> String {
    "ENV".to_string()
}
fn default_max_tokens() -> u32 {
    150
}
fn default_temperature() -> f32 {
    0.7
}
fn default_timeout_secs() -> u64 {
    10
}
fn default_daily_limit() -> u32 {
    200
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    OpenAi,
    #[serde(alias = "claude")]
    Anthropic,
}

impl ProviderKind {
    /// Case-insensitive; accepts "claude" as an alias for anthropic.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Some(Self::OpenAi),
            "anthropic" | "claude" => Some(Self::Anthropic),
            _ => None,
        }
    }

    fn key_env_vars(&self) -> &'static [&'static str] {
        match self {
            Self::OpenAi => &["OPENAI_API_KEY"],
            Self::Anthropic => &["ANTHROPIC_API_KEY", "CLAUDE_API_KEY"],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpinionConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub provider: ProviderKind,
    /// "ENV" means: read from OPENAI_API_KEY / ANTHROPIC_API_KEY (by provider)
    #[serde(default = "default_api_key")]
    pub api_key: String,
    /// Provider default is used when absent.
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Upper bound for one opinion call, connect included.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_daily_limit")]
    pub daily_limit: u32,
}

impl Default for OpinionConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            provider: ProviderKind::default(),
            api_key: default_api_key(),
            model: None,
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            timeout_secs: default_timeout_secs(),
            daily_limit: default_daily_limit(),
        }
    }
}

impl OpinionConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let data = fs::read_to_string(path)?;
        let cfg: OpinionConfig = serde_json::from_str(&data)?;
        Ok(cfg.normalized())
    }

    /// `$AI_CONFIG_PATH`, else `config/ai.json`, else defaults. Env overrides apply in every case.
    pub fn load_default() -> anyhow::Result<Self> {
        let path = env::var(ENV_AI_CONFIG_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_AI_CONFIG_PATH));
        if path.exists() {
            Self::load_from_file(&path)
        } else {
            Ok(Self::default().normalized())
        }
    }

    /// Apply env overrides, resolve the "ENV" key, sanitize ranges.
    fn normalized(mut self) -> Self {
        if let Ok(p) = env::var("LLM_PROVIDER") {
            match ProviderKind::parse(&p) {
                Some(kind) => self.provider = kind,
                None => warn!(provider = %p, "unsupported LLM_PROVIDER; keeping configured provider"),
            }
        }
        if let Ok(v) = env::var("AI_ENABLED") {
            self.enabled = matches!(v.trim(), "1" | "true" | "TRUE" | "yes");
        }

        if self.api_key.trim().eq_ignore_ascii_case("env") {
            self.api_key = self
                .provider
                .key_env_vars()
                .iter()
                .find_map(|k| env::var(k).ok().filter(|v| !v.trim().is_empty()))
                .unwrap_or_default();
        }

        if !(0.0..=2.0).contains(&self.temperature) {
            self.temperature = default_temperature();
        }
        if self.max_tokens == 0 {
            self.max_tokens = default_max_tokens();
        }
        if self.timeout_secs == 0 {
            self.timeout_secs = default_timeout_secs();
        }
        self
    }

    /// True when a real provider call can be attempted.
    pub fn is_usable(&self) -> bool {
        self.enabled && !self.api_key.trim().is_empty()
    }
}
