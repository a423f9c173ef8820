//! Configuration file parser
//!
//! Parses Redis-style `name value` configuration files for Ferrous KV.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use super::Config;

/// Error type for configuration parsing
#[derive(Debug, thiserror::Error)]
pub enum ConfigParseError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Invalid line format
    #[error("Invalid line format at line {0}: {1}")]
    Format(usize, String),

    /// Invalid parameter value
    #[error("Invalid value for parameter '{0}' at line {1}: {2}")]
    Value(String, usize, String),
}

/// Parse a configuration file
///
/// A relative `dbfilename` is resolved against the file's directory.
pub fn parse_config_file(path: &Path) -> Result<Config, ConfigParseError> {
    let content = fs::read_to_string(path)?;
    let mut config = parse_config_str(&content)?;

    if let (Some(db_path), Some(parent)) = (config.sqlite.path.as_ref(), path.parent()) {
        if db_path.is_relative() {
            config.sqlite.path = Some(parent.join(db_path));
        }
    }

    Ok(config)
}

/// Parse configuration text
pub fn parse_config_str(content: &str) -> Result<Config, ConfigParseError> {
    let mut config = Config::default();

    for (line_num, line) in content.lines().enumerate() {
        let line = line.trim();

        // Skip empty lines and comments
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let parts: Vec<&str> = line.splitn(2, char::is_whitespace).collect();
        if parts.len() != 2 {
            return Err(ConfigParseError::Format(line_num + 1, line.to_string()));
        }

        let param = parts[0].trim().to_lowercase();
        let value = parts[1].trim();

        apply_config_param(&mut config, &param, value, line_num + 1)?;
    }

    Ok(config)
}

/// Apply a configuration parameter to the config
fn apply_config_param(
    config: &mut Config,
    param: &str,
    value: &str,
    line_num: usize,
) -> Result<(), ConfigParseError> {
    match param {
        // Namespace settings
        "table" => {
            config.store.table = value.to_string();
        }
        "initialize" => {
            config.store.initialize = parse_yes_no(param, value, line_num)?;
        }

        // SQLite settings
        "dbfilename" => {
            let value = value.trim_matches('"');
            config.sqlite.path = if value.is_empty() || value == ":memory:" {
                None
            } else {
                Some(PathBuf::from(value))
            };
        }
        "busy-timeout" => {
            config.sqlite.busy_timeout_ms = parse_value(param, value, line_num)?;
        }

        _ => {
            tracing::warn!(param, line_num, "unknown configuration parameter, skipping");
        }
    }

    Ok(())
}

/// Parse a value that implements FromStr
fn parse_value<T: FromStr>(
    param: &str,
    value: &str,
    line_num: usize,
) -> Result<T, ConfigParseError> {
    value.parse::<T>()
        .map_err(|_| ConfigParseError::Value(param.to_string(), line_num, value.to_string()))
}

/// Parse a yes/no value
fn parse_yes_no(param: &str, value: &str, line_num: usize) -> Result<bool, ConfigParseError> {
    match value.to_lowercase().as_str() {
        "yes" | "1" => Ok(true),
        "no" | "0" => Ok(false),
        _ => Err(ConfigParseError::Value(param.to_string(), line_num, value.to_string())),
    }
}
