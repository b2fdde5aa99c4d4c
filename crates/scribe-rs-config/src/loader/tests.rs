//! Tests for layered configuration loading.

use super::*;
use crate::{LedgerBackend, LedgerConfig, OperationsConfig};
use pretty_assertions::assert_eq;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Write JSON5 contents to a path, creating parent directories if needed.
fn write_json5(path: &Path, contents: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("dir");
    }
    fs::write(path, contents).expect("write");
}

/// Options rooted in a temp project with no system/user layers.
fn isolated_options(cwd: &Path) -> LayeredConfigOptions {
    let mut options = LayeredConfigOptions::new(cwd);
    options.system_config_path = None;
    options.user_config_path = None;
    options.requirements_path = None;
    options
}

#[test]
fn parse_minimal_config() {
    let config = ScribeConfig::load_from_str("{}").expect("config");
    assert_eq!(config.ledger.index_key, "sample_keys");
    assert_eq!(config.ledger.record_prefix, "sample_");
    assert_eq!(config.ledger.backend, LedgerBackend::File);
    assert_eq!(config.operations.success_display_ms, 2000);
    assert_eq!(config.operations.error_display_ms, 3000);
    assert_eq!(config.analysis.recommendations.len(), 5);
    assert_eq!(config.cipher.token_prefix, "FHE-WRITING-");
}

#[test]
fn rejects_unknown_top_level_key() {
    let err = ScribeConfig::load_from_str("{ unexpected: true }").unwrap_err();
    assert!(format!("{err}").contains("unknown key"));
}

#[test]
fn rejects_unknown_backend() {
    let err = ScribeConfig::load_from_str(r#"{ ledger: { backend: "sqlite" } }"#).unwrap_err();
    let msg = format!("{err}");
    assert!(msg.contains("ledger.backend"), "{msg}");
}

#[test]
fn rejects_empty_recommendations() {
    let err = ScribeConfig::load_from_str("{ analysis: { recommendations: [] } }").unwrap_err();
    assert!(format!("{err}").contains("recommendations"));
}

#[test]
fn rejects_zero_deadline() {
    let err = ScribeConfig::load_from_str("{ ledger: { deadline_ms: 0 } }").unwrap_err();
    assert!(format!("{err}").contains("deadline_ms"));
}

#[test]
fn cwd_layer_overrides_project_layer() {
    let temp = TempDir::new().expect("tmp");
    let project_root = temp.path().join("project");
    fs::create_dir_all(project_root.join(".git")).expect("git");
    let cwd = project_root.join("subdir");
    fs::create_dir_all(&cwd).expect("cwd");

    write_json5(
        &project_root.join(DEFAULT_CONFIG_FILE),
        r#"{ ledger: { path: "project", backend: "memory" } }"#,
    );
    write_json5(
        &cwd.join(DEFAULT_CONFIG_FILE),
        r#"{ ledger: { path: "cwd" } }"#,
    );

    let layered = ScribeConfig::load_layered_with_options(isolated_options(&cwd)).expect("layered");
    assert_eq!(layered.config.ledger.path.as_deref(), Some("cwd"));
    assert_eq!(layered.config.ledger.backend, LedgerBackend::Memory);
    let sources: Vec<_> = layered.layers.iter().map(|layer| layer.source).collect();
    assert_eq!(
        sources,
        vec![ConfigLayerSource::Project, ConfigLayerSource::Cwd]
    );
}

#[test]
fn project_and_cwd_layer_load_once_when_same_directory() {
    let temp = TempDir::new().expect("tmp");
    let project_root = temp.path().join("project");
    fs::create_dir_all(project_root.join(".git")).expect("git");
    write_json5(
        &project_root.join(DEFAULT_CONFIG_FILE),
        "{ operations: { success_display_ms: 10 } }",
    );

    let layered =
        ScribeConfig::load_layered_with_options(isolated_options(&project_root)).expect("layered");
    assert_eq!(layered.layers.len(), 1);
    assert_eq!(layered.config.operations.success_display_ms, 10);
}

#[test]
fn requirements_lock_overrides() {
    let temp = TempDir::new().expect("tmp");
    let root = temp.path();
    let cwd = root.join("work");
    fs::create_dir_all(&cwd).expect("cwd");

    let system_config = root.join("system.json5");
    write_json5(
        &system_config,
        r#"{ ledger: { index_key: "system_keys", path: "system" } }"#,
    );
    let requirements = root.join("requirements.json5");
    write_json5(&requirements, r#"{ ledger: { index_key: "locked_keys" } }"#);
    let runtime_config = root.join("runtime.json5");
    write_json5(
        &runtime_config,
        r#"{ ledger: { index_key: "runtime_keys", path: "runtime" } }"#,
    );

    let mut options = isolated_options(&cwd);
    options.system_config_path = Some(system_config);
    options.requirements_path = Some(requirements);
    options.runtime_paths = vec![runtime_config];

    let layered = ScribeConfig::load_layered_with_options(options).expect("layered");
    assert_eq!(layered.config.ledger.index_key, "locked_keys");
    assert_eq!(layered.config.ledger.path.as_deref(), Some("runtime"));
    assert_eq!(layered.layers[0].source, ConfigLayerSource::Requirements);
}

#[test]
fn missing_runtime_layer_is_an_error() {
    let temp = TempDir::new().expect("tmp");
    let options = isolated_options(temp.path()).with_runtime_path(temp.path().join("nope.json5"));
    let err = ScribeConfig::load_layered_with_options(options).unwrap_err();
    assert!(matches!(err, ConfigError::ReadFailed(_)));
}

#[test]
fn schema_errors_name_the_layer() {
    let temp = TempDir::new().expect("tmp");
    let runtime = temp.path().join("runtime.json5");
    write_json5(&runtime, "{ operations: { error_display_ms: \"soon\" } }");
    let options = isolated_options(temp.path()).with_runtime_path(&runtime);
    let err = ScribeConfig::load_layered_with_options(options).unwrap_err();
    let msg = format!("{err}");
    assert!(msg.contains("runtime("), "{msg}");
    assert!(msg.contains("operations.error_display_ms"), "{msg}");
}

#[test]
fn builder_replaces_sections() {
    let config = ScribeConfig::builder()
        .ledger(LedgerConfig {
            backend: LedgerBackend::Memory,
            ..LedgerConfig::default()
        })
        .operations(OperationsConfig {
            success_display_ms: 1,
            error_display_ms: 2,
        })
        .build();
    assert_eq!(config.ledger.backend, LedgerBackend::Memory);
    assert_eq!(config.operations.error_display_ms, 2);
    assert!(config.validate().is_ok());
}
