//! AWX Core
//!
//! Host-facing model shared by the AWX API client and provider: resources and
//! their state, attribute schemas with cross-field validation, the provider
//! trait, error kinds and host diagnostics.

pub mod diagnostics;
pub mod differ;
pub mod provider;
pub mod resource;
pub mod schema;

pub use tokio_util::sync::CancellationToken;
