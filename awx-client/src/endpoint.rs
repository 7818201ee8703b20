//! Endpoint routing
//!
//! Maps a logical path fragment (e.g. `job_templates/42/`) plus a dialect hint
//! onto a fully qualified URL under the configured base.

use crate::config::Platform;

/// Which side of the platform a resource lives on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dialect {
    #[default]
    Controller,
    Gateway,
}

impl Dialect {
    /// Interpret an adapter hint: `"gateway"` or anything else
    pub fn from_hint(hint: &str) -> Self {
        if hint == "gateway" {
            Dialect::Gateway
        } else {
            Dialect::Controller
        }
    }
}

#[derive(Debug, Clone)]
pub struct EndpointRouter {
    base: String,
    api_prefix: &'static str,
    gateway_prefix: Option<&'static str>,
}

impl EndpointRouter {
    pub fn new(base: &str, platform: Platform) -> Self {
        Self {
            base: base.trim_end_matches('/').to_string(),
            api_prefix: platform.api_prefix(),
            gateway_prefix: platform.gateway_prefix(),
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    /// URL for a logical path
    ///
    /// Gateway hints only take effect when the platform has a gateway;
    /// otherwise every path lands under the controller prefix.
    pub fn url(&self, path: &str, dialect: Dialect) -> String {
        let prefix = match (dialect, self.gateway_prefix) {
            (Dialect::Gateway, Some(gateway)) => gateway,
            _ => self.api_prefix,
        };
        format!("{}/{}{}", self.base, prefix, path.trim_start_matches('/'))
    }

    /// Resolve a link returned by the server (e.g. a `next` page)
    pub fn resolve(&self, link: &str) -> String {
        if link.starts_with("http://") || link.starts_with("https://") {
            link.to_string()
        } else {
            format!("{}/{}", self.base, link.trim_start_matches('/'))
        }
    }
}
