use serde::Deserialize;
use std::env;
use std::fmt;
use std::str::FromStr;

fn parse_env_or<T: FromStr>(var: &str, default: T) -> T
where
    T::Err: fmt::Display,
{
    match env::var(var) {
        Ok(val) => match val.parse() {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!("Invalid value '{}' for {}: {}. Using default.", val, var, e);
                default
            }
        },
        Err(_) => default,
    }
}

fn parse_env_opt<T: FromStr>(var: &str) -> Option<T>
where
    T::Err: fmt::Display,
{
    match env::var(var) {
        Ok(val) => match val.parse() {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                tracing::warn!("Invalid value '{}' for {}: {}. Ignoring.", val, var, e);
                None
            }
        },
        Err(_) => None,
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub embeddings: EmbeddingsConfig,
    pub llm: Option<LlmConfig>,
    pub chat: ChatConfig,
    pub catalog: CatalogConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_body_bytes: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub auth_token: Option<String>,
    pub local_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingsConfig {
    pub model: String,
    pub dimensions: usize,
    pub batch_size: usize,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

/// LLM configuration for chat/completion models
#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    pub model: String,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub temperature: Option<f32>,
}

/// How strictly the assistant is held to conversation history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PolicyStrictness {
    /// Prefer history and retrieved context, fall back to general food knowledge.
    #[default]
    PreferHistory,
    /// Answer only from history and retrieved context.
    HistoryOnly,
}

impl FromStr for PolicyStrictness {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "prefer_history" | "prefer-history" | "default" => Ok(Self::PreferHistory),
            "history_only" | "history-only" | "strict" => Ok(Self::HistoryOnly),
            other => Err(format!("unknown chat policy '{other}'")),
        }
    }
}

/// What a turn does when the vector index cannot be reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RetrievalFailurePolicy {
    #[default]
    Fail,
    Degrade,
}

impl FromStr for RetrievalFailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fail" => Ok(Self::Fail),
            "degrade" => Ok(Self::Degrade),
            other => Err(format!("unknown retrieval failure policy '{other}'")),
        }
    }
}

/// What happens to recommended restaurants absent from the retrieval results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UnmatchedPolicy {
    #[default]
    PassThrough,
    Drop,
}

impl FromStr for UnmatchedPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pass_through" | "pass-through" | "passthrough" => Ok(Self::PassThrough),
            "drop" => Ok(Self::Drop),
            other => Err(format!("unknown unmatched policy '{other}'")),
        }
    }
}

/// Number of stored messages fed back to the model, `None` for the whole session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct HistoryWindow(pub Option<usize>);

impl FromStr for HistoryWindow {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("all") {
            return Ok(Self(None));
        }
        match trimmed.parse::<usize>() {
            Ok(0) => Ok(Self(None)),
            Ok(n) => Ok(Self(Some(n))),
            Err(e) => Err(e.to_string()),
        }
    }
}

impl Default for HistoryWindow {
    fn default() -> Self {
        Self(Some(5))
    }
}

pub const MIN_TOP_K: usize = 1;
pub const MAX_TOP_K: usize = 8;

#[derive(Debug, Clone, Deserialize)]
pub struct ChatConfig {
    pub metro_area: String,
    pub policy: PolicyStrictness,
    pub history_window: HistoryWindow,
    pub top_k: usize,
    pub min_score: f32,
    pub retrieval_on_failure: RetrievalFailurePolicy,
    pub unmatched: UnmatchedPolicy,
    pub prefer_model_summaries: bool,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            metro_area: "Los Angeles".to_string(),
            policy: PolicyStrictness::default(),
            history_window: HistoryWindow::default(),
            top_k: 3,
            min_score: 0.0,
            retrieval_on_failure: RetrievalFailurePolicy::default(),
            unmatched: UnmatchedPolicy::default(),
            prefer_model_summaries: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct CatalogConfig {
    pub path: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: env::var("DINEGUIDE_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: parse_env_or("DINEGUIDE_PORT", 3000),
                max_body_bytes: parse_env_or("DINEGUIDE_MAX_BODY_BYTES", 2 * 1024 * 1024),
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").unwrap_or_else(|_| "file:dineguide.db".to_string()),
                auth_token: env::var("DATABASE_AUTH_TOKEN").ok(),
                local_path: env::var("DATABASE_LOCAL_PATH").ok(),
            },
            embeddings: EmbeddingsConfig {
                model: env::var("EMBEDDING_MODEL")
                    .unwrap_or_else(|_| "BAAI/bge-small-en-v1.5".to_string()),
                dimensions: parse_env_or("EMBEDDING_DIMENSIONS", 384),
                batch_size: parse_env_or("EMBEDDING_BATCH_SIZE", 64),
                api_key: env::var("EMBEDDING_API_KEY").ok(),
                base_url: env::var("EMBEDDING_BASE_URL").ok(),
                timeout_secs: parse_env_or("EMBEDDING_TIMEOUT", 30),
                max_retries: parse_env_or("EMBEDDING_MAX_RETRIES", 3),
            },
            llm: env::var("LLM_MODEL").ok().map(|model| LlmConfig {
                model,
                api_key: env::var("LLM_API_KEY").ok(),
                base_url: env::var("LLM_BASE_URL").ok(),
                timeout_secs: parse_env_or("LLM_TIMEOUT", 30),
                max_retries: parse_env_or("LLM_MAX_RETRIES", 3),
                temperature: parse_env_opt("LLM_TEMPERATURE"),
            }),
            chat: ChatConfig {
                metro_area: env::var("CHAT_METRO_AREA")
                    .ok()
                    .filter(|area| !area.trim().is_empty())
                    .unwrap_or_else(|| "Los Angeles".to_string()),
                policy: parse_env_or("CHAT_POLICY", PolicyStrictness::default()),
                history_window: parse_env_or("CHAT_HISTORY_WINDOW", HistoryWindow::default()),
                top_k: parse_env_or("RETRIEVAL_TOP_K", 3usize).clamp(MIN_TOP_K, MAX_TOP_K),
                min_score: parse_env_or("RETRIEVAL_MIN_SCORE", 0.0),
                retrieval_on_failure: parse_env_or(
                    "RETRIEVAL_ON_FAILURE",
                    RetrievalFailurePolicy::default(),
                ),
                unmatched: parse_env_or("RECONCILE_UNMATCHED", UnmatchedPolicy::default()),
                prefer_model_summaries: parse_env_or("RECONCILE_PREFER_MODEL_SUMMARIES", true),
            },
            catalog: CatalogConfig {
                path: env::var("CATALOG_PATH").ok().filter(|p| !p.trim().is_empty()),
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::default()
    }
}

/// Known embedding providers that use OpenAI-compatible APIs
const KNOWN_PROVIDERS: &[&str] = &["openai", "openrouter", "ollama", "lmstudio", "local"];

/// Known LLM providers that use OpenAI-compatible APIs
pub const KNOWN_LLM_PROVIDERS: &[&str] = &["openai", "openrouter", "ollama", "lmstudio"];

/// Parse a model name into (provider, model) tuple.
pub fn parse_provider_model(model: &str) -> (&str, &str) {
    if let Some((prefix, rest)) = model.split_once('/') {
        let prefix_lower = prefix.to_lowercase();
        if KNOWN_PROVIDERS.contains(&prefix_lower.as_str()) {
            return (prefix, rest);
        }
    }
    ("local", model)
}

/// Parse an LLM model name into (provider, model) tuple.
pub fn parse_llm_provider_model(model: &str) -> (&str, &str) {
    if let Some((prefix, rest)) = model.split_once('/') {
        let prefix_lower = prefix.to_lowercase();
        if KNOWN_LLM_PROVIDERS.contains(&prefix_lower.as_str()) {
            return (prefix, rest);
        }
    }
    ("local", model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_TEST_MUTEX: Mutex<()> = Mutex::new(());

    const CHAT_VARS: &[&str] = &[
        "CHAT_METRO_AREA",
        "CHAT_POLICY",
        "CHAT_HISTORY_WINDOW",
        "RETRIEVAL_TOP_K",
        "RETRIEVAL_MIN_SCORE",
        "RETRIEVAL_ON_FAILURE",
        "RECONCILE_UNMATCHED",
        "RECONCILE_PREFER_MODEL_SUMMARIES",
    ];

    fn clear_chat_vars() {
        for var in CHAT_VARS {
            std::env::remove_var(var);
        }
    }

    #[test]
    fn test_chat_config_defaults() {
        let _guard = ENV_TEST_MUTEX.lock().unwrap();
        clear_chat_vars();

        let chat = Config::default().chat;
        assert_eq!(chat.metro_area, "Los Angeles");
        assert_eq!(chat.policy, PolicyStrictness::PreferHistory);
        assert_eq!(chat.history_window, HistoryWindow(Some(5)));
        assert_eq!(chat.top_k, 3);
        assert_eq!(chat.retrieval_on_failure, RetrievalFailurePolicy::Fail);
        assert_eq!(chat.unmatched, UnmatchedPolicy::PassThrough);
        assert!(chat.prefer_model_summaries);
    }

    #[test]
    fn test_chat_config_from_env() {
        let _guard = ENV_TEST_MUTEX.lock().unwrap();
        clear_chat_vars();

        std::env::set_var("CHAT_METRO_AREA", "San Francisco");
        std::env::set_var("CHAT_POLICY", "history_only");
        std::env::set_var("CHAT_HISTORY_WINDOW", "all");
        std::env::set_var("RETRIEVAL_ON_FAILURE", "degrade");
        std::env::set_var("RECONCILE_UNMATCHED", "drop");

        let chat = Config::default().chat;
        assert_eq!(chat.metro_area, "San Francisco");
        assert_eq!(chat.policy, PolicyStrictness::HistoryOnly);
        assert_eq!(chat.history_window, HistoryWindow(None));
        assert_eq!(chat.retrieval_on_failure, RetrievalFailurePolicy::Degrade);
        assert_eq!(chat.unmatched, UnmatchedPolicy::Drop);

        clear_chat_vars();
    }

    #[test]
    fn test_top_k_is_clamped() {
        let _guard = ENV_TEST_MUTEX.lock().unwrap();
        clear_chat_vars();

        std::env::set_var("RETRIEVAL_TOP_K", "50");
        assert_eq!(Config::default().chat.top_k, MAX_TOP_K);

        std::env::set_var("RETRIEVAL_TOP_K", "0");
        assert_eq!(Config::default().chat.top_k, MIN_TOP_K);

        std::env::set_var("RETRIEVAL_TOP_K", "not-a-number");
        assert_eq!(Config::default().chat.top_k, 3);

        clear_chat_vars();
    }

    #[test]
    fn test_history_window_parsing() {
        assert_eq!("0".parse::<HistoryWindow>().unwrap(), HistoryWindow(None));
        assert_eq!("ALL".parse::<HistoryWindow>().unwrap(), HistoryWindow(None));
        assert_eq!("7".parse::<HistoryWindow>().unwrap(), HistoryWindow(Some(7)));
        assert!("-1".parse::<HistoryWindow>().is_err());
    }

    #[test]
    fn test_llm_config_requires_model() {
        let _guard = ENV_TEST_MUTEX.lock().unwrap();

        std::env::remove_var("LLM_MODEL");
        assert!(Config::default().llm.is_none());

        std::env::set_var("LLM_MODEL", "openai/gpt-4o-mini");
        let llm = Config::default().llm.unwrap();
        assert_eq!(llm.model, "openai/gpt-4o-mini");
        assert_eq!(llm.timeout_secs, 30);
        assert_eq!(llm.max_retries, 3);

        std::env::remove_var("LLM_MODEL");
    }

    #[test]
    fn test_parse_env_or_valid_value() {
        let _guard = ENV_TEST_MUTEX.lock().unwrap();
        std::env::set_var("__TEST_PARSE_PORT", "8080");
        let result: u16 = parse_env_or("__TEST_PARSE_PORT", 3000);
        assert_eq!(result, 8080);
        std::env::remove_var("__TEST_PARSE_PORT");
    }

    #[test]
    fn test_parse_provider_model() {
        assert_eq!(
            parse_provider_model("openai/text-embedding-3-small"),
            ("openai", "text-embedding-3-small")
        );
        assert_eq!(
            parse_provider_model("BAAI/bge-small-en-v1.5"),
            ("local", "BAAI/bge-small-en-v1.5")
        );
        assert_eq!(
            parse_llm_provider_model("openrouter/openai/gpt-4o"),
            ("openrouter", "openai/gpt-4o")
        );
    }
}
