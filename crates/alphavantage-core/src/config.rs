use std::env;

use crate::client::{ClientBuilder, DEFAULT_BASE_URL};
use crate::error::ConfigError;
use crate::Client;

pub const TOKEN_VAR: &str = "ALPHA_VANTAGE_TOKEN";
pub const REQUESTS_PER_MINUTE_VAR: &str = "ALPHA_VANTAGE_REQUESTS_PER_MINUTE";
pub const API_URL_VAR: &str = "ALPHA_VANTAGE_API_URL";
pub const FALLBACK_URL_VAR: &str = "ALPHA_VANTAGE_FALLBACK_URL";

/// Client settings gathered from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub api_key: String,
    /// `0` disables pacing.
    pub requests_per_minute: u32,
    pub base_url: String,
    pub fallback_url: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            requests_per_minute: 0,
            base_url: String::from(DEFAULT_BASE_URL),
            fallback_url: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Reads settings through `lookup`; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let read = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };

        let mut config = Self::default();
        if let Some(api_key) = read(TOKEN_VAR) {
            config.api_key = api_key;
        }
        if let Some(raw) = read(REQUESTS_PER_MINUTE_VAR) {
            config.requests_per_minute =
                raw.parse::<u32>()
                    .map_err(|e| ConfigError::InvalidValue {
                        variable: REQUESTS_PER_MINUTE_VAR,
                        value: raw.clone(),
                        reason: e.to_string(),
                    })?;
        }
        if let Some(base_url) = read(API_URL_VAR) {
            config.base_url = base_url;
        }
        config.fallback_url = read(FALLBACK_URL_VAR);
        Ok(config)
    }

    pub fn into_builder(self) -> ClientBuilder {
        let builder = Client::builder()
            .api_key(self.api_key)
            .requests_per_minute(self.requests_per_minute)
            .base_url(self.base_url);
        match self.fallback_url {
            Some(fallback_url) => builder.fallback_url(fallback_url),
            None => builder,
        }
    }

    pub fn client(self) -> Client {
        self.into_builder().build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map = pairs
            .iter()
            .map(|(key, value)| ((*key).to_owned(), (*value).to_owned()))
            .collect::<HashMap<_, _>>();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn empty_environment_uses_defaults() {
        let config = Config::from_lookup(lookup(&[])).expect("config");
        assert_eq!(config, Config::default());
        assert_eq!(config.base_url, "https://www.alphavantage.co");
    }

    #[test]
    fn all_variables_are_read() {
        let config = Config::from_lookup(lookup(&[
            (TOKEN_VAR, "abc"),
            (REQUESTS_PER_MINUTE_VAR, " 75 "),
            (API_URL_VAR, "http://127.0.0.1:9000"),
            (FALLBACK_URL_VAR, "backup.example.com"),
        ]))
        .expect("config");

        assert_eq!(config.api_key, "abc");
        assert_eq!(config.requests_per_minute, 75);
        assert_eq!(config.fallback_url.as_deref(), Some("backup.example.com"));

        let client = config.client();
        assert_eq!(client.base_url(), "http://127.0.0.1:9000");
        assert_eq!(client.fallback_url(), Some("https://backup.example.com"));
        assert_eq!(client.pacer().permits_per_minute(), 75);
    }

    #[test]
    fn invalid_rate_is_rejected() {
        let error = Config::from_lookup(lookup(&[(REQUESTS_PER_MINUTE_VAR, "-5")]))
            .expect_err("negative rate");
        assert!(matches!(
            error,
            ConfigError::InvalidValue { variable, .. } if variable == REQUESTS_PER_MINUTE_VAR
        ));
    }

    #[test]
    fn blank_values_count_as_unset() {
        let config = Config::from_lookup(lookup(&[(TOKEN_VAR, "  "), (FALLBACK_URL_VAR, "")]))
            .expect("config");
        assert!(config.api_key.is_empty());
        assert!(config.fallback_url.is_none());
    }
}
