use std::env;

use crate::config::ConfigError;

pub(crate) fn process_env(key: &str) -> Option<String> {
    env::var(key).ok()
}

pub(crate) fn parse_u64_env(
    lookup: impl Fn(&str) -> Option<String>,
    key: &str,
    default: u64,
) -> Result<u64, ConfigError> {
    match optional_trimmed_env(lookup, key) {
        Some(value) => value
            .parse::<u64>()
            .map_err(|_| ConfigError::ParseInt {
                key: key.to_string(),
                value,
            }),
        None => Ok(default),
    }
}

pub(crate) fn optional_trimmed_env(
    lookup: impl Fn(&str) -> Option<String>,
    key: &str,
) -> Option<String> {
    lookup(key).and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}
