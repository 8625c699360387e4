use std::env;
use std::str::FromStr;
use thiserror::Error;

/// Default Qdrant endpoint used when `QDRANT_URL` is unset.
pub const DEFAULT_QDRANT_URL: &str = "http://127.0.0.1:6333";
const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";
const DEFAULT_OPENAI_URL: &str = "https://api.openai.com";

const DEFAULT_CHUNK_SIZE: usize = 1000;
const DEFAULT_CHUNK_OVERLAP: usize = 200;
const DEFAULT_TOP_K: usize = 3;
const DEFAULT_UPSERT_BATCH_SIZE: usize = 100;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 60;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for the docqa service.
///
/// Built once at process start and passed by reference into every component constructor.
#[derive(Debug, Clone)]
pub struct Config {
    /// Backend used to persist and search vectors.
    pub vector_store: VectorStoreBackend,
    /// Base URL of the Qdrant instance that stores embeddings.
    pub qdrant_url: String,
    /// Name of the index (Qdrant collection) holding document chunks.
    pub qdrant_index_name: String,
    /// Optional API key required to access Qdrant.
    pub qdrant_api_key: Option<String>,
    /// Embedding provider used to generate vector representations.
    pub embedding_provider: EmbeddingProvider,
    /// Embedding model identifier passed to the provider.
    pub embedding_model: String,
    /// Dimensionality of the produced vectors.
    pub embedding_dimension: usize,
    /// Base URL of the embedding provider.
    pub embedding_url: String,
    /// Credential for the embedding provider.
    pub embedding_api_key: Option<String>,
    /// Language-model provider used to answer questions.
    pub llm_provider: LlmProvider,
    /// Language-model identifier passed to the provider.
    pub llm_model: String,
    /// Base URL of the language-model provider.
    pub llm_url: String,
    /// Credential for the language-model provider.
    pub llm_api_key: Option<String>,
    /// Maximum chunk length in characters.
    pub chunk_size: usize,
    /// Characters shared between consecutive chunks.
    pub chunk_overlap: usize,
    /// Number of matches requested from the index per question.
    pub retrieval_top_k: usize,
    /// Minimum similarity score accepted from the index.
    pub retrieval_score_threshold: Option<f32>,
    /// Maximum number of records per upsert request.
    pub upsert_batch_size: usize,
    /// Strategy used to assign record identifiers.
    pub record_id_strategy: RecordIdStrategy,
    /// Request timeout applied to every outbound HTTP client.
    pub http_timeout_secs: u64,
    /// Runtime mode; controls error detail exposure and CORS policy.
    pub runtime_mode: RuntimeMode,
    /// Origins accepted by CORS in production mode.
    pub cors_allowed_origins: Vec<String>,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
}

/// Vector store backends available to the pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VectorStoreBackend {
    /// Remote Qdrant instance over REST.
    Qdrant,
    /// Process-local store; contents vanish on restart.
    Memory,
}

/// Supported embedding backends.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EmbeddingProvider {
    /// Local Ollama runtime.
    Ollama,
    /// Hosted OpenAI embeddings API.
    OpenAI,
    /// Deterministic offline hashing embedder.
    Local,
}

/// Supported language-model backends.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LlmProvider {
    /// Local Ollama runtime (`/api/generate`).
    Ollama,
    /// OpenAI-compatible chat completions API.
    OpenAI,
}

/// How record identifiers are assigned at index time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordIdStrategy {
    /// Random UUIDv4 per record.
    Random,
    /// UUID derived from the SHA-256 of the chunk text.
    ContentHash,
}

/// Deployment mode of the running process.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RuntimeMode {
    /// Production: sanitized errors, CORS allow-list.
    Production,
    /// Development: error details echoed, permissive CORS.
    Development,
}

impl RuntimeMode {
    /// Whether internal error details may be echoed to clients.
    pub fn exposes_error_details(self) -> bool {
        matches!(self, Self::Development)
    }

    /// Lowercase name, as accepted by `APP_ENV`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Production => "production",
            Self::Development => "development",
        }
    }
}

impl Config {
    /// Load configuration from the process environment.
    ///
    /// `.env` files are not read here; the binary loads one before logging starts.
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self::from_lookup(|key| env::var(key).ok())?;
        tracing::debug!(
            vector_store = ?config.vector_store,
            qdrant_url = %config.qdrant_url,
            index = %config.qdrant_index_name,
            embedding_provider = ?config.embedding_provider,
            llm_provider = ?config.llm_provider,
            runtime_mode = ?config.runtime_mode,
            server_port = ?config.server_port,
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Build configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars(lookup);

        let embedding_provider: EmbeddingProvider = vars.required_parsed("EMBEDDING_PROVIDER")?;
        let llm_provider: LlmProvider = vars.required_parsed("LLM_PROVIDER")?;

        let embedding_api_key = vars.optional("EMBEDDING_API_KEY");
        if embedding_provider == EmbeddingProvider::OpenAI && embedding_api_key.is_none() {
            return Err(ConfigError::MissingVariable("EMBEDDING_API_KEY".into()));
        }
        let llm_api_key = vars.optional("LLM_API_KEY");
        if llm_provider == LlmProvider::OpenAI && llm_api_key.is_none() {
            return Err(ConfigError::MissingVariable("LLM_API_KEY".into()));
        }

        let embedding_dimension: usize = vars.required_parsed("EMBEDDING_DIMENSION")?;
        if embedding_dimension == 0 {
            return Err(ConfigError::InvalidValue("EMBEDDING_DIMENSION".into()));
        }

        let chunk_size = vars.parsed_or("TEXT_SPLITTER_CHUNK_SIZE", DEFAULT_CHUNK_SIZE)?;
        let chunk_overlap = vars.parsed_or("TEXT_SPLITTER_CHUNK_OVERLAP", DEFAULT_CHUNK_OVERLAP)?;
        if chunk_size == 0 {
            return Err(ConfigError::InvalidValue("TEXT_SPLITTER_CHUNK_SIZE".into()));
        }
        if chunk_overlap >= chunk_size {
            return Err(ConfigError::InvalidValue(
                "TEXT_SPLITTER_CHUNK_OVERLAP".into(),
            ));
        }

        let retrieval_top_k = vars.parsed_or("RETRIEVAL_TOP_K", DEFAULT_TOP_K)?;
        if retrieval_top_k == 0 {
            return Err(ConfigError::InvalidValue("RETRIEVAL_TOP_K".into()));
        }
        let upsert_batch_size = vars.parsed_or("UPSERT_BATCH_SIZE", DEFAULT_UPSERT_BATCH_SIZE)?;
        if upsert_batch_size == 0 {
            return Err(ConfigError::InvalidValue("UPSERT_BATCH_SIZE".into()));
        }

        Ok(Self {
            vector_store: vars.parsed_or("VECTOR_STORE", VectorStoreBackend::Qdrant)?,
            qdrant_url: vars
                .optional("QDRANT_URL")
                .unwrap_or_else(|| DEFAULT_QDRANT_URL.to_string()),
            qdrant_index_name: vars.required("QDRANT_INDEX_NAME")?,
            qdrant_api_key: vars.optional("QDRANT_API_KEY"),
            embedding_provider,
            embedding_model: vars.required("EMBEDDING_MODEL")?,
            embedding_dimension,
            embedding_url: vars
                .optional("EMBEDDING_URL")
                .unwrap_or_else(|| default_embedding_url(embedding_provider).to_string()),
            embedding_api_key,
            llm_provider,
            llm_model: vars.required("LLM_MODEL")?,
            llm_url: vars
                .optional("LLM_URL")
                .unwrap_or_else(|| default_llm_url(llm_provider).to_string()),
            llm_api_key,
            chunk_size,
            chunk_overlap,
            retrieval_top_k,
            retrieval_score_threshold: vars
                .optional("RETRIEVAL_SCORE_THRESHOLD")
                .map(|value| {
                    value
                        .parse::<f32>()
                        .map(|threshold| threshold.clamp(0.0, 1.0))
                        .map_err(|_| ConfigError::InvalidValue("RETRIEVAL_SCORE_THRESHOLD".into()))
                })
                .transpose()?,
            upsert_batch_size,
            record_id_strategy: vars.parsed_or("RECORD_ID_STRATEGY", RecordIdStrategy::Random)?,
            http_timeout_secs: vars.parsed_or("HTTP_TIMEOUT_SECS", DEFAULT_HTTP_TIMEOUT_SECS)?,
            runtime_mode: vars.parsed_or("APP_ENV", RuntimeMode::Development)?,
            cors_allowed_origins: vars
                .optional("CORS_ALLOWED_ORIGINS")
                .map(|value| {
                    value
                        .split(',')
                        .map(str::trim)
                        .filter(|origin| !origin.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
            server_port: vars
                .optional("SERVER_PORT")
                .map(|value| {
                    value
                        .parse()
                        .map_err(|_| ConfigError::InvalidValue("SERVER_PORT".into()))
                })
                .transpose()?,
        })
    }
}

struct Vars<F>(F);

impl<F> Vars<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|value| !value.trim().is_empty())
    }

    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.optional(key)
            .ok_or_else(|| ConfigError::MissingVariable(key.to_string()))
    }

    fn required_parsed<T: FromStr>(&self, key: &str) -> Result<T, ConfigError> {
        self.required(key)?
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key.to_string()))
    }

    fn parsed_or<T: FromStr>(&self, key: &str, default: T) -> Result<T, ConfigError> {
        match self.optional(key) {
            Some(value) => value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(key.to_string())),
            None => Ok(default),
        }
    }
}

fn default_embedding_url(provider: EmbeddingProvider) -> &'static str {
    match provider {
        EmbeddingProvider::OpenAI => DEFAULT_OPENAI_URL,
        EmbeddingProvider::Ollama | EmbeddingProvider::Local => DEFAULT_OLLAMA_URL,
    }
}

fn default_llm_url(provider: LlmProvider) -> &'static str {
    match provider {
        LlmProvider::OpenAI => DEFAULT_OPENAI_URL,
        LlmProvider::Ollama => DEFAULT_OLLAMA_URL,
    }
}

impl FromStr for EmbeddingProvider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "openai" => Ok(Self::OpenAI),
            "local" => Ok(Self::Local),
            _ => Err(()),
        }
    }
}

impl FromStr for LlmProvider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "openai" => Ok(Self::OpenAI),
            _ => Err(()),
        }
    }
}

impl FromStr for VectorStoreBackend {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "qdrant" => Ok(Self::Qdrant),
            "memory" => Ok(Self::Memory),
            _ => Err(()),
        }
    }
}

impl FromStr for RecordIdStrategy {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "random" | "uuid" => Ok(Self::Random),
            "content-hash" | "content_hash" | "hash" => Ok(Self::ContentHash),
            _ => Err(()),
        }
    }
}

impl FromStr for RuntimeMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "production" | "prod" => Ok(Self::Production),
            "development" | "dev" | "test" => Ok(Self::Development),
            _ => Err(()),
        }
    }
}
