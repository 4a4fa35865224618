use anyhow::{anyhow, Context, Result};
use std::fs::OpenOptions;
use std::io::IsTerminal;
use std::str::FromStr;
use std::sync::Mutex;
use tracing_subscriber::filter::LevelFilter;

use crate::config::Config;
use crate::util::{non_empty_env, parse_bool_flag};

const DEFAULT_LOG_PATH: &str = "/tmp/devsh.log";
const LOG_PATH_ENV: &str = "DEVSH_LOG_PATH";
const LOG_LEVEL_ENV: &str = "DEVSH_LOG";
const DEBUG_CONFIG_ENV: &str = "DEVSH_DEBUG_CONFIG";

pub fn debug_config_enabled() -> bool {
    non_empty_env(DEBUG_CONFIG_ENV)
        .and_then(parse_bool_flag)
        .unwrap_or(false)
}

/// Installs the global subscriber. Logs never go to the terminal being edited:
/// when stderr is a tty they land in a file instead.
pub fn init() -> Result<()> {
    let level = resolve_level();
    match resolve_log_path() {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .with_context(|| format!("Failed to open log file {path}"))?;
            tracing_subscriber::fmt()
                .with_max_level(level)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
                .map_err(|err| anyhow!("failed to install log subscriber: {err}"))
        }
        None => tracing_subscriber::fmt()
            .with_max_level(level)
            .with_writer(std::io::stderr)
            .try_init()
            .map_err(|err| anyhow!("failed to install log subscriber: {err}")),
    }
}

pub fn emit_config_snapshot(config: &Config) {
    if !debug_config_enabled() {
        return;
    }
    let formatted = serde_json::to_string_pretty(config)
        .unwrap_or_else(|_| "<config serialization error>".to_string());
    tracing::debug!("loaded configuration:\n{formatted}");
}

fn resolve_level() -> LevelFilter {
    non_empty_env(LOG_LEVEL_ENV)
        .and_then(|v| LevelFilter::from_str(&v).ok())
        .unwrap_or(LevelFilter::INFO)
}

fn resolve_log_path() -> Option<String> {
    non_empty_env(LOG_PATH_ENV).or_else(|| {
        if std::io::stderr().is_terminal() {
            Some(DEFAULT_LOG_PATH.to_string())
        } else {
            None
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_debug_config_enabled_accepts_true_variants() {
        std::env::set_var(DEBUG_CONFIG_ENV, "1");
        assert!(debug_config_enabled());
        std::env::set_var(DEBUG_CONFIG_ENV, "TRUE");
        assert!(debug_config_enabled());
        std::env::set_var(DEBUG_CONFIG_ENV, "nope");
        assert!(!debug_config_enabled());
        std::env::remove_var(DEBUG_CONFIG_ENV);
    }

    #[test]
    #[serial]
    fn test_resolve_log_path_uses_env_override() {
        std::env::set_var(LOG_PATH_ENV, "/tmp/test-devsh.log");
        assert_eq!(resolve_log_path().as_deref(), Some("/tmp/test-devsh.log"));
        std::env::remove_var(LOG_PATH_ENV);
    }

    #[test]
    #[serial]
    fn test_resolve_level_falls_back_to_info() {
        std::env::set_var(LOG_LEVEL_ENV, "debug");
        assert_eq!(resolve_level(), LevelFilter::DEBUG);
        std::env::set_var(LOG_LEVEL_ENV, "chatty");
        assert_eq!(resolve_level(), LevelFilter::INFO);
        std::env::remove_var(LOG_LEVEL_ENV);
    }
}
