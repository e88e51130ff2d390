use crate::council::CouncilSettings;
use crate::council::ranking::MAX_COUNCIL_MODELS;
use crate::llm::{DEFAULT_BASE_URL, LlmSettings, Provider};
use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Config file picked up from the working directory when none is named.
const DEFAULT_CONFIG_FILE: &str = "config.yaml";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(short, long, env = "CONFIG_FILE")]
    pub config: Option<String>,

    /// Port to listen on
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,

    /// Directory holding conversation files
    #[arg(long, env = "DATA_DIR")]
    pub data_dir: Option<String>,

    /// Keep conversations in memory only
    #[arg(long)]
    pub ephemeral: bool,

    /// Answer with canned replies instead of calling the LLM API
    #[arg(long)]
    pub offline: bool,

    /// Enable rate limiting
    #[arg(long, env = "RATE_LIMIT_ENABLED")]
    pub rate_limit_enabled: Option<bool>,

    /// Disable timeout middleware
    #[arg(long, env = "TIMEOUT_DISABLED")]
    pub timeout_disabled: Option<bool>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub council: CouncilConfig,
    pub storage: StorageConfig,
    pub resilience: ResilienceConfig,
    pub telemetry: TelemetryConfig,
    /// Set by `--offline`; never read from files.
    #[serde(default)]
    pub offline: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    pub cors_origins: Vec<String>,
    /// Request timeout in seconds. Streams get the deep research budget on top.
    pub request_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CouncilConfig {
    pub models: Vec<String>,
    pub chairman_model: String,
    pub title_model: String,
    pub request_timeout_secs: u64,
    pub deep_research_timeout_secs: u64,
}

impl CouncilConfig {
    /// Runtime settings for the council.
    #[must_use]
    pub fn settings(&self) -> CouncilSettings {
        CouncilSettings {
            models: self.models.clone(),
            chairman_model: self.chairman_model.clone(),
            title_model: self.title_model.clone(),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            deep_research_timeout: Duration::from_secs(self.deep_research_timeout_secs),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// `json` (files under `data_dir`) or `memory`.
    pub provider: String,
    pub data_dir: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ResilienceConfig {
    pub rate_limit_enabled: bool,
    pub timeout_disabled: bool,
    pub requests_per_second: f32,
    pub burst_size: f32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TelemetryConfig {
    /// `compact` or `json`.
    pub log_format: String,
    pub metrics_enabled: bool,
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from_args(std::env::args())
    }

    pub fn load_from_args<I, T>(args: I) -> Result<Self, config::ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let cli =
            Cli::try_parse_from(args).map_err(|e| config::ConfigError::Message(e.to_string()))?;

        let defaults = CouncilSettings::default();
        let mut builder = Config::builder();

        // 1. Defaults
        builder = builder
            .set_default("server.port", 8001)?
            .set_default("server.host", "0.0.0.0")?
            .set_default(
                "server.cors_origins",
                vec!["http://localhost:5173", "http://localhost:3000"],
            )?
            .set_default("server.request_timeout_secs", 30)?
            .set_default("council.models", defaults.models)?
            .set_default("council.chairman_model", defaults.chairman_model)?
            .set_default("council.title_model", defaults.title_model)?
            .set_default(
                "council.request_timeout_secs",
                defaults.request_timeout.as_secs(),
            )?
            .set_default(
                "council.deep_research_timeout_secs",
                defaults.deep_research_timeout.as_secs(),
            )?
            .set_default("storage.provider", "json")?
            .set_default("storage.data_dir", "data/conversations")?
            .set_default("resilience.rate_limit_enabled", true)?
            .set_default("resilience.timeout_disabled", false)?
            .set_default("resilience.requests_per_second", 5.0)?
            .set_default("resilience.burst_size", 10.0)?
            .set_default("telemetry.log_format", "compact")?
            .set_default("telemetry.metrics_enabled", true)?;

        // 2. Config file: explicit path must exist, ./config.yaml is optional
        if let Some(path) = &cli.config {
            builder = builder.add_source(File::with_name(path).required(true));
        } else if Path::new(DEFAULT_CONFIG_FILE).exists() {
            builder = builder.add_source(File::with_name(DEFAULT_CONFIG_FILE).required(false));
        }

        // 3. Environment variables prefixed with COUNCIL_
        // E.g. COUNCIL_SERVER__PORT=8000, COUNCIL_COUNCIL__MODELS=a/b,c/d
        builder = builder.add_source(
            Environment::with_prefix("COUNCIL")
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("council.models")
                .with_list_parse_key("server.cors_origins")
                .try_parsing(true),
        );

        // 4. CLI overrides (clap also resolves their env fallbacks)
        if let Some(port) = cli.port {
            builder = builder.set_override("server.port", port)?;
        }
        if let Some(dir) = cli.data_dir {
            builder = builder.set_override("storage.data_dir", dir)?;
        }
        if cli.ephemeral {
            builder = builder.set_override("storage.provider", "memory")?;
        }
        if cli.offline {
            builder = builder.set_override("offline", true)?;
        }
        if let Some(rl) = cli.rate_limit_enabled {
            builder = builder.set_override("resilience.rate_limit_enabled", rl)?;
        }
        if let Some(td) = cli.timeout_disabled {
            builder = builder.set_override("resilience.timeout_disabled", td)?;
        }

        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject councils the anonymous `Response A`..`Response Z` labels cannot cover.
    fn validate(&self) -> Result<(), config::ConfigError> {
        let count = self.council.models.len();
        if count > MAX_COUNCIL_MODELS {
            return Err(config::ConfigError::Message(format!(
                "council.models lists {count} models; at most {MAX_COUNCIL_MODELS} are supported"
            )));
        }
        Ok(())
    }

    /// Address the server binds to.
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

/// Read the LLM connection from the environment.
///
/// `LLM_BASE_URL` defaults to `OpenRouter`; the key comes from `LLM_API_KEY`
/// or, failing that, `OPENROUTER_API_KEY`.
pub fn load_llm_settings() -> Result<LlmSettings, String> {
    let base_url = std::env::var("LLM_BASE_URL")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

    let api_key = ["LLM_API_KEY", "OPENROUTER_API_KEY"]
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .find(|s| !s.trim().is_empty());

    // Auto-detect provider from base URL
    let mut provider = Provider::detect_from_url(&base_url);

    if let Provider::AzureOpenAI { .. } = &provider {
        let deployment = std::env::var("AZURE_DEPLOYMENT_NAME")
            .map_err(|_| "Azure OpenAI requires AZURE_DEPLOYMENT_NAME".to_string())?;
        provider = Provider::AzureOpenAI {
            deployment_name: deployment,
            api_version: std::env::var("AZURE_API_VERSION")
                .unwrap_or_else(|_| "2024-08-01-preview".to_string()),
        };
    }

    if api_key.is_none() && matches!(provider, Provider::OpenRouter) {
        return Err(
            "Missing API key: set LLM_API_KEY or OPENROUTER_API_KEY (or run with --offline)"
                .to_string(),
        );
    }

    Ok(LlmSettings {
        base_url,
        api_key,
        provider,
    })
}
