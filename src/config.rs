use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::util::{home_dir, non_empty_env, parse_bool_flag};

const DEFAULT_SHELL_NAME: &str = "devsh";
const DEFAULT_SHELL_PROGRAM: &str = "sh";
const DEFAULT_CACHE_CAPACITY: usize = 50;
const DEFAULT_COMMAND_PREFIX: char = '!';
const DEFAULT_HISTORY_FILE_NAME: &str = ".devsh_history";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub shell_name: String,
    pub shell_program: String,
    pub display_full_path: bool,
    pub cache_capacity: usize,
    pub command_prefix: String,
    pub history_file: Option<PathBuf>,
    pub working_dir: PathBuf,
}

impl Config {
    pub fn load() -> Result<Self> {
        let shell_name =
            non_empty_env("DEVSH_SHELL_NAME").unwrap_or_else(|| DEFAULT_SHELL_NAME.to_string());
        let shell_program =
            non_empty_env("DEVSH_SHELL").unwrap_or_else(|| DEFAULT_SHELL_PROGRAM.to_string());
        let display_full_path = non_empty_env("DEVSH_DISPLAY_FULL_PATH")
            .and_then(parse_bool_flag)
            .unwrap_or(false);
        let cache_capacity = match non_empty_env("DEVSH_CACHE_CAPACITY") {
            Some(raw) => match raw.parse::<usize>() {
                Ok(capacity) => capacity,
                Err(_) => bail!("Invalid DEVSH_CACHE_CAPACITY '{raw}': expected a whole number"),
            },
            None => DEFAULT_CACHE_CAPACITY,
        };
        let command_prefix = non_empty_env("DEVSH_COMMAND_PREFIX")
            .unwrap_or_else(|| DEFAULT_COMMAND_PREFIX.to_string());
        let history_file = match std::env::var("DEVSH_HISTORY_FILE") {
            Ok(value) if value.trim().is_empty() => None,
            Ok(value) => Some(PathBuf::from(value.trim())),
            Err(_) => home_dir().map(|home| home.join(DEFAULT_HISTORY_FILE_NAME)),
        };

        Ok(Self {
            shell_name,
            shell_program,
            display_full_path,
            cache_capacity,
            command_prefix,
            history_file,
            working_dir: std::env::current_dir()?,
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.shell_name.trim().is_empty() {
            bail!("DEVSH_SHELL_NAME must not be empty");
        }

        if self.cache_capacity == 0 {
            bail!("DEVSH_CACHE_CAPACITY must be at least 1");
        }

        let mut prefix = self.command_prefix.chars();
        match (prefix.next(), prefix.next()) {
            (Some(ch), None) if !ch.is_whitespace() => {}
            _ => bail!(
                "Invalid command prefix '{}': expected a single non-space character",
                self.command_prefix
            ),
        }

        if !self.working_dir.is_dir() {
            bail!(
                "Working directory '{}' does not exist",
                self.working_dir.display()
            );
        }

        Ok(())
    }
}
