use std::path::PathBuf;

/// Owned-string form of `parse_bool_str`, for `Option::and_then` chains.
pub fn parse_bool_flag(s: String) -> Option<bool> {
    parse_bool_str(&s)
}

/// Case-insensitive on/off switch: `true`, `1`, `yes`, `on`, `enable` and
/// their negatives. Anything else is `None`.
pub fn parse_bool_str(s: &str) -> Option<bool> {
    match s.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" | "enable" => Some(true),
        "false" | "0" | "no" | "off" | "disable" => Some(false),
        _ => None,
    }
}

/// Reads an env var, trimming it and treating blank values as unset.
pub fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

pub fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}
