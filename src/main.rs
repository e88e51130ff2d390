//! LLM Council server
//!
//! Entry point: configuration, telemetry, driver and storage selection.

use mimalloc::MiMalloc;

/// Global allocator for improved performance (M-MIMALLOC-APPS).
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

use std::sync::Arc;

use dotenvy::dotenv;
use tracing::info;

use llm_council::AppState;
use llm_council::config::{AppConfig, load_llm_settings};
use llm_council::council::Council;
use llm_council::llm::{ChatCompletionsDriver, LlmClient, LlmDriver, ScriptedDriver};
use llm_council::storage::{ConversationStore, JsonFileStore, MemoryStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env (if present)
    let _ = dotenv();

    let config = match AppConfig::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            std::process::exit(1);
        }
    };

    let metrics = llm_council::telemetry::init(&config.telemetry);

    let driver: Arc<dyn LlmDriver> = if config.offline {
        info!(name: "llm.config.loaded", driver = "offline", "Using scripted offline driver");
        Arc::new(ScriptedDriver::offline())
    } else {
        let settings = match load_llm_settings() {
            Ok(s) => s,
            Err(msg) => {
                eprintln!("Configuration error: {msg}");
                std::process::exit(1);
            }
        };
        info!(
            name: "llm.config.loaded",
            base_url = %settings.base_url,
            provider = ?settings.provider,
            "LLM configuration loaded"
        );
        Arc::new(ChatCompletionsDriver::new(settings))
    };

    let store: Arc<dyn ConversationStore> = match config.storage.provider.as_str() {
        "memory" => Arc::new(MemoryStore::new()),
        _ => Arc::new(JsonFileStore::open(&config.storage.data_dir).await?),
    };

    let council = Council::new(LlmClient::new(driver), config.council.settings());
    info!(
        models = ?council.settings().models,
        chairman = %council.settings().chairman_model,
        "Council configured"
    );

    let state = AppState::new(council, store, config, metrics);
    llm_council::server::start_server(state).await
}
