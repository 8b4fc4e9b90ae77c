use serde::Deserialize;

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// SQLite database connection URL
    #[serde(default = "default_database_url")]
    pub database_url: String,

    /// Path to the catalog snapshot (JSON array of items)
    #[serde(default = "default_catalog_path")]
    pub catalog_path: String,

    /// OpenAI-compatible API key
    pub openai_api_key: String,

    /// OpenAI-compatible API base URL
    #[serde(default = "default_openai_api_url")]
    pub openai_api_url: String,

    /// Chat model used for extraction, composition and QA
    #[serde(default = "default_model_name")]
    pub model_name: String,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Per-request timeout for LLM calls, in seconds
    #[serde(default = "default_llm_timeout_secs")]
    pub llm_timeout_secs: u64,

    /// Cap on the keyword-scored recommendation set
    #[serde(default = "default_recommend_limit")]
    pub recommend_limit: usize,

    /// Cap on the rating-ranked fallback set
    #[serde(default = "default_fallback_limit")]
    pub fallback_limit: usize,

    /// Minimum extracted-keyword count for the scoring path
    #[serde(default = "default_keyword_threshold")]
    pub keyword_threshold: usize,
}

fn default_database_url() -> String {
    "sqlite://movie_recommendation.db?mode=rwc".to_string()
}

fn default_catalog_path() -> String {
    "data/movie_catalog.json".to_string()
}

fn default_openai_api_url() -> String {
    "https://api.openai.com".to_string()
}

fn default_model_name() -> String {
    "gpt-4.1-mini".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_llm_timeout_secs() -> u64 {
    20
}

fn default_recommend_limit() -> usize {
    5
}

fn default_fallback_limit() -> usize {
    3
}

fn default_keyword_threshold() -> usize {
    5
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        envy::from_env::<Config>().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }
}
