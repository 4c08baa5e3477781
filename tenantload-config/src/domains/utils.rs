//! Parsing helpers shared by the configuration domains

use std::collections::BTreeMap;
use std::time::Duration;

use crate::error::{ConfigError, ConfigResult};

/// Split a comma-separated list, trimming entries and dropping blanks
pub fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse `KEY=VALUE,KEY=VALUE` into an ordered map.
///
/// Blank entries are ignored; an entry without `=` or with an empty key is an
/// error naming `source`.
pub fn parse_map(value: &str, source: &str) -> ConfigResult<BTreeMap<String, String>> {
    let mut map = BTreeMap::new();
    for entry in value.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let (key, val) = entry.split_once('=').ok_or_else(|| {
            ConfigError::EnvError(format!("Invalid {} entry '{}': expected KEY=VALUE", source, entry))
        })?;
        let key = key.trim();
        if key.is_empty() {
            return Err(ConfigError::EnvError(format!(
                "Invalid {} entry '{}': empty key",
                source, entry
            )));
        }
        map.insert(key.to_string(), val.trim().to_string());
    }
    Ok(map)
}

/// Parse a positive integer, naming `source` in the error
pub fn parse_positive(value: &str, source: &str) -> ConfigResult<usize> {
    match value.trim().parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        Ok(_) => Err(ConfigError::EnvError(format!("{} must be greater than 0", source))),
        Err(e) => Err(ConfigError::EnvError(format!("Invalid {} '{}': {}", source, value, e))),
    }
}

/// Parse a humantime duration (`"2s"`, `"500ms"`, `"1m 30s"`)
pub fn parse_duration(value: &str, source: &str) -> ConfigResult<Duration> {
    humantime::parse_duration(value.trim())
        .map_err(|e| ConfigError::EnvError(format!("Invalid {} '{}': {}", source, value, e)))
}
