use llm_council::config::AppConfig;
use serial_test::serial;
use std::env;
use std::fs;

const ARGS: [&str; 1] = ["llm-council"];

// Helper to clear environment variables that might interfere with tests
fn clear_env_vars() {
    unsafe {
        env::remove_var("COUNCIL_SERVER__PORT");
        env::remove_var("COUNCIL_COUNCIL__MODELS");
        env::remove_var("COUNCIL_STORAGE__PROVIDER");
        env::remove_var("CONFIG_FILE");
        env::remove_var("PORT");
        env::remove_var("DATA_DIR");
        env::remove_var("RATE_LIMIT_ENABLED");
        env::remove_var("TIMEOUT_DISABLED");
    }
}

#[test]
#[serial]
fn test_default_config() {
    clear_env_vars();

    let config = AppConfig::load_from_args(ARGS).expect("defaults should load");
    assert_eq!(config.server.port, 8001);
    assert_eq!(config.storage.provider, "json");
    assert_eq!(config.storage.data_dir, "data/conversations");
    assert_eq!(config.council.models.len(), 4);
    assert_eq!(config.council.chairman_model, "google/gemini-3-pro-preview");
    assert!(config.resilience.rate_limit_enabled);
    assert!(!config.offline);
    assert_eq!(config.bind_address(), "0.0.0.0:8001");
}

#[test]
#[serial]
fn test_env_override() {
    clear_env_vars();
    unsafe {
        env::set_var("COUNCIL_SERVER__PORT", "9090");
        env::set_var("COUNCIL_COUNCIL__MODELS", "a/one,b/two");
    }

    let config = AppConfig::load_from_args(ARGS).expect("Failed to load config");
    assert_eq!(config.server.port, 9090);
    assert_eq!(config.council.models, ["a/one", "b/two"]);

    clear_env_vars();
}

#[test]
#[serial]
fn test_cli_overrides_env() {
    clear_env_vars();
    unsafe {
        env::set_var("COUNCIL_SERVER__PORT", "9090");
    }

    let config = AppConfig::load_from_args([
        "llm-council",
        "--port",
        "7171",
        "--ephemeral",
        "--offline",
        "--rate-limit-enabled",
        "false",
    ])
    .expect("Failed to load config");
    assert_eq!(config.server.port, 7171);
    assert_eq!(config.storage.provider, "memory");
    assert!(config.offline);
    assert!(!config.resilience.rate_limit_enabled);

    clear_env_vars();
}

#[test]
#[serial]
fn test_file_load() {
    clear_env_vars();

    let dir = tempfile::tempdir().expect("tempdir");
    let file_path = dir.path().join("council.yaml");
    let config_content = r#"
server:
  port: 7070
council:
  chairman_model: anthropic/claude-sonnet-4.5
    "#;
    fs::write(&file_path, config_content).expect("Failed to write temp config");

    // Tell AppConfig to use this file via Env Var (mocking CLI arg indirectly)
    unsafe {
        env::set_var("CONFIG_FILE", &file_path);
    }

    let config = AppConfig::load_from_args(ARGS).expect("Failed to load config from file");
    assert_eq!(config.server.port, 7070);
    assert_eq!(config.council.chairman_model, "anthropic/claude-sonnet-4.5");
    // Untouched keys keep their defaults
    assert_eq!(config.council.models.len(), 4);

    clear_env_vars();
}

#[test]
#[serial]
fn test_missing_named_file_is_an_error() {
    clear_env_vars();

    let result = AppConfig::load_from_args(["llm-council", "--config", "does-not-exist.yaml"]);
    assert!(result.is_err());
}

#[test]
#[serial]
fn test_cwd_config_fallback() {
    clear_env_vars();

    // Create ./config.yaml
    let config_content = r#"
server:
  port: 6060
    "#;
    let cwd_path = "config.yaml";
    fs::write(cwd_path, config_content).expect("Failed to write ./config.yaml");

    // No env var, no CLI flag: ./config.yaml should be picked up
    let config = AppConfig::load_from_args(ARGS);

    fs::remove_file(cwd_path).unwrap();

    assert_eq!(config.expect("Failed to load config").server.port, 6060);
}

#[test]
#[serial]
fn test_council_capped_at_26_models() {
    clear_env_vars();
    let models: Vec<String> = (0..27).map(|i| format!("vendor/model-{i}")).collect();
    unsafe {
        env::set_var("COUNCIL_COUNCIL__MODELS", models.join(","));
    }

    let err = AppConfig::load_from_args(ARGS).unwrap_err();
    assert!(err.to_string().contains("at most 26"), "{err}");

    unsafe {
        env::set_var("COUNCIL_COUNCIL__MODELS", models[..26].join(","));
    }
    let config = AppConfig::load_from_args(ARGS).expect("26 models fit the labels");
    assert_eq!(config.council.models.len(), 26);

    clear_env_vars();
}
