//! Configuration resolution tests
//!
//! Covers source priority (command line → environment → user file →
//! defaults) and graceful degradation on missing files.
//!
//! Tests that touch environment variables use a test-specific variable name
//! and are marked #[serial] so they never race each other.

use dig_common::config::{ConfigResolver, ConfigSource, TomlConfig};
use serial_test::serial;
use std::env;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use tempfile::{NamedTempFile, TempDir};

const TEST_ENV_VAR: &str = "DIG_CONFIG_TEST";

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

/// Log output buffer shared with a fmt subscriber
#[derive(Clone, Default)]
struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Run `f` under a plain-text subscriber and return what it logged
fn logged_by(f: impl FnOnce()) -> String {
    let buffer = SharedBuffer::default();
    let writer = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .finish();
    tracing::subscriber::with_default(subscriber, f);
    let bytes = buffer.0.lock().unwrap().clone();
    String::from_utf8(bytes).unwrap()
}

#[test]
#[serial]
fn test_command_line_path_wins_over_environment() {
    let cli = write_config("[engine]\nmax_concurrent_sessions = 2\n");
    let envf = write_config("[engine]\nmax_concurrent_sessions = 7\n");
    env::set_var(TEST_ENV_VAR, envf.path());

    let resolver =
        ConfigResolver::new(Some(cli.path().to_path_buf())).with_env_var(TEST_ENV_VAR);
    let (config, source) = resolver.load().unwrap();

    assert_eq!(config.engine.max_concurrent_sessions, 2);
    assert_eq!(source, ConfigSource::CommandLine(cli.path().to_path_buf()));

    env::remove_var(TEST_ENV_VAR);
}

#[test]
#[serial]
fn test_environment_path_used_without_cli() {
    let envf = write_config("[logging]\nlevel = \"debug\"\n");
    env::set_var(TEST_ENV_VAR, envf.path());

    let resolver = ConfigResolver::new(None).with_env_var(TEST_ENV_VAR);
    let (config, source) = resolver.load().unwrap();

    assert_eq!(config.logging.level, "debug");
    assert_eq!(source, ConfigSource::Environment(envf.path().to_path_buf()));

    env::remove_var(TEST_ENV_VAR);
}

#[test]
#[serial]
fn test_explicit_missing_file_is_error() {
    env::remove_var(TEST_ENV_VAR);
    let resolver = ConfigResolver::new(Some("/nonexistent/thedig/config.toml".into()))
        .with_env_var(TEST_ENV_VAR);
    assert!(resolver.load().is_err());
}

#[test]
#[serial]
fn test_explicit_malformed_file_is_error() {
    let bad = write_config("[engine\nenricher_timeout_ms = ");
    let resolver = ConfigResolver::new(Some(bad.path().to_path_buf())).with_env_var(TEST_ENV_VAR);
    assert!(resolver.load().is_err());
}

#[test]
fn test_enricher_settings_from_file() {
    let file = write_config(
        "[enrichers]\ngravatar = true\ngravatar_size = 200\npublic_email_providers = [\"example.org\"]\n",
    );
    let config = TomlConfig::load(file.path()).unwrap();

    assert!(config.enrichers.gravatar);
    assert_eq!(config.enrichers.gravatar_size, 200);
    assert_eq!(config.enrichers.public_email_providers, vec!["example.org"]);
}

#[test]
#[serial]
fn test_malformed_user_file_falls_back_with_warning() {
    env::remove_var(TEST_ENV_VAR);
    let bad = write_config("[engine\nmax_concurrent_sessions = ");

    let resolver = ConfigResolver::new(None)
        .with_env_var(TEST_ENV_VAR)
        .with_user_path(bad.path());
    let (config, source) = resolver.load().unwrap();

    assert_eq!(
        config.engine.max_concurrent_sessions,
        TomlConfig::default().engine.max_concurrent_sessions
    );
    match &source {
        ConfigSource::UserFileIgnored { path, reason } => {
            assert_eq!(path, bad.path());
            assert!(!reason.is_empty());
        }
        other => panic!("expected ignored user file, got {:?}", other),
    }

    let logs = logged_by(|| source.log());
    assert!(logs.contains("WARN"), "logs: {}", logs);
    assert!(logs.contains("Ignoring config file"), "logs: {}", logs);
}

#[test]
#[serial]
fn test_missing_user_file_uses_defaults() {
    env::remove_var(TEST_ENV_VAR);
    let dir = TempDir::new().unwrap();

    let resolver = ConfigResolver::new(None)
        .with_env_var(TEST_ENV_VAR)
        .with_user_path(dir.path().join("thedig").join("config.toml"));
    let (_, source) = resolver.load().unwrap();

    assert_eq!(source, ConfigSource::Defaults);
    assert!(logged_by(|| source.log()).contains("using compiled defaults"));
}

#[test]
#[serial]
fn test_valid_user_file_is_loaded() {
    env::remove_var(TEST_ENV_VAR);
    let file = write_config("[engine]\nmax_concurrent_sessions = 3\n");

    let resolver = ConfigResolver::new(None)
        .with_env_var(TEST_ENV_VAR)
        .with_user_path(file.path());
    let (config, source) = resolver.load().unwrap();

    assert_eq!(config.engine.max_concurrent_sessions, 3);
    assert_eq!(source, ConfigSource::UserFile(file.path().to_path_buf()));
    assert!(logged_by(|| source.log()).contains("Configuration loaded from"));
}
