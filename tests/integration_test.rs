use devshell::config::Config;
use std::path::PathBuf;

fn base_config() -> Config {
    Config {
        shell_name: "devsh".to_string(),
        shell_program: "sh".to_string(),
        display_full_path: false,
        cache_capacity: 50,
        command_prefix: "!".to_string(),
        history_file: None,
        working_dir: std::env::current_dir().expect("cwd"),
    }
}

#[test]
fn test_config_validation_accepts_defaults() {
    assert!(base_config().validate().is_ok());
}

#[test]
fn test_config_validation_rejects_zero_cache_capacity() {
    let config = Config {
        cache_capacity: 0,
        ..base_config()
    };

    assert!(config.validate().is_err());
}

#[test]
fn test_config_validation_rejects_multi_char_prefix() {
    let config = Config {
        command_prefix: "::".to_string(),
        ..base_config()
    };
    assert!(config.validate().is_err());

    let config = Config {
        command_prefix: " ".to_string(),
        ..base_config()
    };
    assert!(config.validate().is_err());
}

#[test]
fn test_config_validation_rejects_blank_shell_name() {
    let config = Config {
        shell_name: "  ".to_string(),
        ..base_config()
    };

    assert!(config.validate().is_err());
}

#[test]
fn test_config_validation_rejects_missing_working_dir() {
    let config = Config {
        working_dir: PathBuf::from("/nonexistent/devsh/workdir"),
        ..base_config()
    };

    assert!(config.validate().is_err());
}
