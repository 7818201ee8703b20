//! Provider configuration
//!
//! Read from the host's provider block, with environment variables filling
//! in whatever the block leaves out.

use std::collections::HashMap;
use std::time::Duration;

use awx_client::{ClientConfig, Credentials, Platform};
use awx_core::provider::ProviderError;
use awx_core::resource::Value;
use thiserror::Error;

pub const ENV_ENDPOINT: &str = "AWX_ENDPOINT";
pub const ENV_PLATFORM: &str = "AWX_PLATFORM";
pub const ENV_USERNAME: &str = "AWX_USERNAME";
pub const ENV_PASSWORD: &str = "AWX_PASSWORD";
pub const ENV_TOKEN: &str = "AWX_TOKEN";
pub const ENV_RETRY_COUNT: &str = "AWX_RETRY_COUNT";
pub const ENV_RETRY_DELAY_SECONDS: &str = "AWX_RETRY_DELAY_SECONDS";
pub const ENV_INSECURE_SKIP_VERIFY: &str = "AWX_INSECURE_SKIP_VERIFY";

/// Errors that can occur while reading provider configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required setting '{key}' (or environment variable {env})")]
    Missing { key: &'static str, env: &'static str },

    #[error("Invalid value for '{key}': {message}")]
    Invalid { key: &'static str, message: String },

    #[error("Set either 'token' or 'username'/'password', not both")]
    ConflictingCredentials,

    #[error("Authentication required: set 'token' or 'username' and 'password'")]
    MissingCredentials,
}

impl From<ConfigError> for ProviderError {
    fn from(err: ConfigError) -> Self {
        ProviderError::configuration(err.to_string()).with_cause(err)
    }
}

/// Settings for one configured provider instance
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub endpoint: String,
    pub platform: Platform,
    pub credentials: Credentials,
    pub retry_count: u32,
    pub retry_delay: Duration,
    pub insecure_skip_verify: bool,
}

/// Lookup of one setting: block attribute first, then environment
struct Settings<'a, F> {
    attributes: &'a HashMap<String, Value>,
    env: F,
}

impl<F> Settings<'_, F>
where
    F: Fn(&str) -> Option<String>,
{
    fn string(&self, key: &str, env: &str) -> Option<String> {
        match self.attributes.get(key) {
            Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
            Some(Value::Int(i)) => Some(i.to_string()),
            Some(Value::Bool(b)) => Some(b.to_string()),
            _ => (self.env)(env).filter(|s| !s.is_empty()),
        }
    }

    fn number(&self, key: &'static str, env: &str) -> Result<Option<u64>, ConfigError> {
        match self.string(key, env) {
            None => Ok(None),
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .map(Some)
                .map_err(|_| ConfigError::Invalid {
                    key,
                    message: format!("'{}' is not a non-negative integer", raw),
                }),
        }
    }

    fn flag(&self, key: &'static str, env: &str) -> Result<Option<bool>, ConfigError> {
        match self.string(key, env) {
            None => Ok(None),
            Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" => Ok(Some(true)),
                "false" | "0" | "no" => Ok(Some(false)),
                _ => Err(ConfigError::Invalid {
                    key,
                    message: format!("'{}' is not a boolean", raw),
                }),
            },
        }
    }
}

impl ProviderConfig {
    /// Read settings from the provider block, falling back to the process environment
    pub fn from_attributes(attributes: &HashMap<String, Value>) -> Result<Self, ConfigError> {
        Self::from_attributes_with_env(attributes, |key| std::env::var(key).ok())
    }

    /// Read settings with an explicit environment lookup
    pub fn from_attributes_with_env<F>(
        attributes: &HashMap<String, Value>,
        env: F,
    ) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let settings = Settings { attributes, env };

        let endpoint = settings
            .string("endpoint", ENV_ENDPOINT)
            .ok_or(ConfigError::Missing {
                key: "endpoint",
                env: ENV_ENDPOINT,
            })?;

        let platform = match settings.string("platform", ENV_PLATFORM) {
            Some(raw) => raw.parse::<Platform>().map_err(|e| ConfigError::Invalid {
                key: "platform",
                message: e.to_string(),
            })?,
            None => Platform::default(),
        };

        let token = settings.string("token", ENV_TOKEN);
        let username = settings.string("username", ENV_USERNAME);
        let password = settings.string("password", ENV_PASSWORD);
        let credentials = match (token, username, password) {
            (Some(_), Some(_), _) | (Some(_), _, Some(_)) => {
                return Err(ConfigError::ConflictingCredentials);
            }
            (Some(token), None, None) => Credentials::token(token),
            (None, Some(username), Some(password)) => Credentials::basic(username, password),
            (None, Some(_), None) => {
                return Err(ConfigError::Missing {
                    key: "password",
                    env: ENV_PASSWORD,
                });
            }
            (None, None, _) => return Err(ConfigError::MissingCredentials),
        };

        let retry_count = settings
            .number("retry_count", ENV_RETRY_COUNT)?
            .unwrap_or(0);
        let retry_count = u32::try_from(retry_count).map_err(|_| ConfigError::Invalid {
            key: "retry_count",
            message: format!("{} is too large", retry_count),
        })?;
        let retry_delay = settings
            .number("retry_delay_seconds", ENV_RETRY_DELAY_SECONDS)?
            .map(Duration::from_secs)
            .unwrap_or(awx_client::config::DEFAULT_RETRY_DELAY);
        let insecure_skip_verify = settings
            .flag("insecure_skip_verify", ENV_INSECURE_SKIP_VERIFY)?
            .unwrap_or(false);

        Ok(Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            platform,
            credentials,
            retry_count,
            retry_delay,
            insecure_skip_verify,
        })
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig::new(self.endpoint.clone(), self.credentials.clone())
            .with_platform(self.platform)
            .with_retry(self.retry_count, self.retry_delay)
            .with_insecure_skip_verify(self.insecure_skip_verify)
    }
}
