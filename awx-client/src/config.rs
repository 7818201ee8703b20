//! Client configuration.
//!
//! Everything here is fixed once the provider is configured; the engine holds
//! it immutably and needs no locking.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use base64::{Engine, engine::general_purpose::STANDARD};
use reqwest::header::HeaderValue;

use crate::error::{ApiError, ApiResult};

/// Default delay between GET retries
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Default per-request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Controller generation, which decides the URL prefixes in use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Platform {
    /// Upstream AWX: everything under `/api/v2/`
    #[default]
    Awx,
    /// Automation Platform 2.4: standalone controller under `/api/v2/`
    Aap24,
    /// Automation Platform 2.5: controller under `/api/controller/v2/`,
    /// identity objects behind the gateway under `/api/gateway/v1/`
    Aap25,
}

impl Platform {
    /// Prefix for controller resources
    pub fn api_prefix(&self) -> &'static str {
        match self {
            Platform::Awx | Platform::Aap24 => "api/v2/",
            Platform::Aap25 => "api/controller/v2/",
        }
    }

    /// Prefix for gateway resources, when the platform has a gateway
    pub fn gateway_prefix(&self) -> Option<&'static str> {
        match self {
            Platform::Aap25 => Some("api/gateway/v1/"),
            Platform::Awx | Platform::Aap24 => None,
        }
    }
}

impl FromStr for Platform {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "awx" => Ok(Platform::Awx),
            "aap2.4" => Ok(Platform::Aap24),
            "aap2.5" => Ok(Platform::Aap25),
            other => Err(ApiError::configuration(format!(
                "unknown platform '{}', expected one of: awx, aap2.4, aap2.5",
                other
            ))),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Platform::Awx => "awx",
            Platform::Aap24 => "aap2.4",
            Platform::Aap25 => "aap2.5",
        };
        write!(f, "{}", name)
    }
}

/// Authentication material
#[derive(Clone)]
pub enum Credentials {
    Basic { username: String, password: String },
    Token(String),
}

impl Credentials {
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Credentials::Basic {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn token(token: impl Into<String>) -> Self {
        Credentials::Token(token.into())
    }

    /// Assemble the `Authorization` header value
    pub fn authorization(&self) -> ApiResult<HeaderValue> {
        let raw = match self {
            Credentials::Basic { username, password } => {
                if username.is_empty() {
                    return Err(ApiError::configuration("username must not be empty"));
                }
                let encoded = STANDARD.encode(format!("{}:{}", username, password));
                format!("Basic {}", encoded)
            }
            Credentials::Token(token) => {
                if token.is_empty() {
                    return Err(ApiError::configuration("token must not be empty"));
                }
                format!("Bearer {}", token)
            }
        };
        let mut value = HeaderValue::from_str(&raw).map_err(|e| {
            ApiError::configuration(format!("credentials cannot form a header: {}", e))
        })?;
        value.set_sensitive(true);
        Ok(value)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
            Credentials::Token(_) => f.debug_tuple("Token").field(&"<redacted>").finish(),
        }
    }
}

/// Configuration for [`crate::ApiClient`]
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the controller, without trailing slash
    pub endpoint: String,
    pub platform: Platform,
    pub credentials: Credentials,
    /// Additional GET attempts beyond the first
    pub retry_count: u32,
    pub retry_delay: Duration,
    pub timeout: Duration,
    pub insecure_skip_verify: bool,
}

impl ClientConfig {
    pub fn new(endpoint: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            platform: Platform::default(),
            credentials,
            retry_count: 0,
            retry_delay: DEFAULT_RETRY_DELAY,
            timeout: DEFAULT_TIMEOUT,
            insecure_skip_verify: false,
        }
    }

    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    pub fn with_retry(mut self, retry_count: u32, retry_delay: Duration) -> Self {
        self.retry_count = retry_count;
        self.retry_delay = retry_delay;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_insecure_skip_verify(mut self, insecure: bool) -> Self {
        self.insecure_skip_verify = insecure;
        self
    }

    /// Check the endpoint is an absolute http(s) URL
    pub fn validate(&self) -> ApiResult<()> {
        if self.endpoint.is_empty() {
            return Err(ApiError::configuration("endpoint is required"));
        }
        let url = url::Url::parse(&self.endpoint).map_err(|e| {
            ApiError::configuration(format!("invalid endpoint '{}': {}", self.endpoint, e))
        })?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ApiError::configuration(format!(
                "endpoint '{}' must use http or https",
                self.endpoint
            )));
        }
        if url.query().is_some() || url.fragment().is_some() {
            return Err(ApiError::configuration(format!(
                "endpoint '{}' must not carry a query or fragment",
                self.endpoint
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_prefixes() {
        assert_eq!(Platform::Awx.api_prefix(), "api/v2/");
        assert_eq!(Platform::Awx.gateway_prefix(), None);
        assert_eq!(Platform::Aap25.api_prefix(), "api/controller/v2/");
        assert_eq!(Platform::Aap25.gateway_prefix(), Some("api/gateway/v1/"));
    }

    #[test]
    fn platform_parses_known_names() {
        assert_eq!("AWX".parse::<Platform>().unwrap(), Platform::Awx);
        assert_eq!("aap2.4".parse::<Platform>().unwrap(), Platform::Aap24);
        assert_eq!("aap2.5".parse::<Platform>().unwrap(), Platform::Aap25);
        assert!(matches!(
            "tower".parse::<Platform>(),
            Err(ApiError::Configuration(_))
        ));
    }

    #[test]
    fn basic_credentials_assemble_header() {
        let header = Credentials::basic("admin", "password")
            .authorization()
            .unwrap();
        assert_eq!(header.to_str().unwrap(), "Basic YWRtaW46cGFzc3dvcmQ=");
        assert!(header.is_sensitive());
    }

    #[test]
    fn token_credentials_assemble_header() {
        let header = Credentials::token("abc123").authorization().unwrap();
        assert_eq!(header.to_str().unwrap(), "Bearer abc123");
    }

    #[test]
    fn empty_credentials_are_rejected() {
        assert!(Credentials::token("").authorization().is_err());
        assert!(Credentials::basic("", "pw").authorization().is_err());
        assert!(Credentials::token("bad\ntoken").authorization().is_err());
    }

    #[test]
    fn debug_redacts_secrets() {
        let rendered = format!("{:?}", Credentials::basic("admin", "hunter2"));
        assert!(rendered.contains("admin"));
        assert!(!rendered.contains("hunter2"));
    }

    #[test]
    fn endpoint_trailing_slash_is_trimmed() {
        let config = ClientConfig::new("https://awx.example.com/", Credentials::token("t"));
        assert_eq!(config.endpoint, "https://awx.example.com");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn endpoint_validation() {
        let bad = ClientConfig::new("", Credentials::token("t"));
        assert!(bad.validate().is_err());
        let bad = ClientConfig::new("awx.example.com", Credentials::token("t"));
        assert!(bad.validate().is_err());
        let bad = ClientConfig::new("ftp://awx.example.com", Credentials::token("t"));
        assert!(bad.validate().is_err());
    }
}
