// src/ingest/config.rs
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

const ENV_PATH: &str = "NEWS_CONFIG_PATH";

fn default_timeout_secs() -> u64 {
    10
}
fn default_company_news_from() -> String {
    "2024-01-01".to_string()
}
fn default_sample_fallback() -> bool {
    true
}
fn default_watchlist() -> Vec<String> {
    ["AAPL", "GOOGL", "MSFT", "TSLA", "AMZN"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// API keys, read from the environment only (never from config files).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderKeys {
    pub finnhub: Option<String>,
    pub alpha_vantage: Option<String>,
    pub news_api: Option<String>,
}

impl ProviderKeys {
    /// Empty values and `your-...-key` placeholders count as absent.
    pub fn from_env() -> Self {
        Self {
            finnhub: key_from_env("FINNHUB_API_KEY"),
            alpha_vantage: key_from_env("ALPHA_VANTAGE_KEY"),
            news_api: key_from_env("NEWS_API_KEY"),
        }
    }
}

fn key_from_env(var: &str) -> Option<String> {
    std::env::var(var).ok().and_then(|v| usable_key(&v))
}

fn usable_key(raw: &str) -> Option<String> {
    let t = raw.trim();
    let placeholder = t.starts_with("your-") && t.ends_with("-key");
    if t.is_empty() || placeholder {
        None
    } else {
        Some(t.to_string())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewsConfig {
    /// Per-request timeout for provider HTTP calls.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Lower bound (YYYY-MM-DD) for company-news queries.
    #[serde(default = "default_company_news_from")]
    pub company_news_from: String,
    /// Serve the built-in sample batch when every provider comes back empty.
    #[serde(default = "default_sample_fallback")]
    pub sample_fallback: bool,
    /// Symbols covered by the market overview, in display order.
    #[serde(default = "default_watchlist")]
    pub watchlist: Vec<String>,
    #[serde(skip)]
    pub keys: ProviderKeys,
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            company_news_from: default_company_news_from(),
            sample_fallback: default_sample_fallback(),
            watchlist: default_watchlist(),
            keys: ProviderKeys::default(),
        }
    }
}

impl NewsConfig {
    fn finish(mut self) -> Self {
        self.watchlist = clean_watchlist(self.watchlist);
        if self.timeout_secs == 0 {
            self.timeout_secs = default_timeout_secs();
        }
        self.keys = ProviderKeys::from_env();
        self
    }
}

/// Load news config from an explicit path. Supports TOML or JSON formats.
pub fn load_news_config_from(path: &Path) -> Result<NewsConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading news config from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_news_config(&content, ext.as_str()).map(NewsConfig::finish)
}

/// Load news config using env var + fallbacks:
/// 1) $NEWS_CONFIG_PATH
/// 2) config/news.toml
/// 3) config/news.json
/// 4) built-in defaults
pub fn load_news_config_default() -> Result<NewsConfig> {
    if let Ok(p) = std::env::var(ENV_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_news_config_from(&pb);
        } else {
            return Err(anyhow!("NEWS_CONFIG_PATH points to non-existent path"));
        }
    }
    let toml_p = PathBuf::from("config/news.toml");
    if toml_p.exists() {
        return load_news_config_from(&toml_p);
    }
    let json_p = PathBuf::from("config/news.json");
    if json_p.exists() {
        return load_news_config_from(&json_p);
    }
    Ok(NewsConfig::default().finish())
}

fn parse_news_config(s: &str, hint_ext: &str) -> Result<NewsConfig> {
    let trimmed = s.trim_start();
    let looks_json = trimmed.starts_with('{');
    if hint_ext == "toml" || (!looks_json && hint_ext != "json") {
        if let Ok(v) = toml::from_str::<NewsConfig>(s) {
            return Ok(v);
        }
    }
    if let Ok(v) = serde_json::from_str::<NewsConfig>(s) {
        return Ok(v);
    }
    // Last attempt with TOML for mislabeled files; keep its error for the caller.
    toml::from_str::<NewsConfig>(s).map_err(|e| anyhow!("unsupported news config format: {e}"))
}

/// Trim, uppercase, drop empties and duplicates; first occurrence keeps its slot.
fn clean_watchlist(items: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(items.len());
    for it in items {
        let t = it.trim().to_ascii_uppercase();
        if !t.is_empty() && !out.contains(&t) {
            out.push(t);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{env, fs};

    #[test]
    fn toml_and_json_formats_work() {
        let toml = r#"
timeout_secs = 3
watchlist = [" aapl ", "", "MSFT", "msft"]
"#;
        let json = r#"{"sample_fallback": false, "watchlist": ["nvda"]}"#;

        let t = parse_news_config(toml, "toml").unwrap().finish();
        assert_eq!(t.timeout_secs, 3);
        assert_eq!(t.watchlist, vec!["AAPL".to_string(), "MSFT".to_string()]);
        assert!(t.sample_fallback);
        assert_eq!(t.company_news_from, "2024-01-01");

        let j = parse_news_config(json, "json").unwrap().finish();
        assert!(!j.sample_fallback);
        assert_eq!(j.watchlist, vec!["NVDA".to_string()]);
        assert_eq!(j.timeout_secs, 10);
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(parse_news_config("timeout_secs = [", "toml").is_err());
    }

    #[test]
    fn placeholder_keys_are_ignored() {
        assert_eq!(usable_key("your-finnhub-api-key"), None);
        assert_eq!(usable_key("   "), None);
        assert_eq!(usable_key(" abc123 "), Some("abc123".to_string()));
    }

    #[serial_test::serial]
    #[test]
    fn default_uses_env_then_fallbacks() {
        // Isolate CWD in a temp dir so the repo's config/ does not interfere
        let old = env::current_dir().unwrap();
        let tmp = tempfile::tempdir().unwrap();
        env::set_current_dir(tmp.path()).unwrap();

        env::remove_var(ENV_PATH);

        // No files in temp CWD -> defaults
        let v = load_news_config_default().unwrap();
        assert_eq!(v.watchlist.len(), 5);

        // Env takes precedence
        let p_json = tmp.path().join("news.json");
        fs::write(&p_json, r#"{"watchlist": ["X"]}"#).unwrap();
        env::set_var(ENV_PATH, p_json.display().to_string());
        let v2 = load_news_config_default().unwrap();
        assert_eq!(v2.watchlist, vec!["X".to_string()]);

        // Env pointing nowhere is an error
        env::set_var(ENV_PATH, tmp.path().join("missing.toml").display().to_string());
        assert!(load_news_config_default().is_err());
        env::remove_var(ENV_PATH);

        env::set_current_dir(&old).unwrap();
    }
}
