//! AWX API Client
//!
//! Generic engine that mediates every resource call against the controller's
//! REST API.
//!
//! ## Module Structure
//!
//! - `config` - Client configuration and `Authorization` header assembly
//! - `endpoint` - Maps logical paths and dialect hints to URLs
//! - `codec` - Wire payloads, polymorphic fields and canonical JSON
//! - `envelope` - Item and count response shapes
//! - `engine` - Authenticated requests with GET retry and cancellation
//! - `error` - Error kinds surfaced by the engine

pub mod codec;
pub mod config;
pub mod endpoint;
pub mod engine;
pub mod envelope;
pub mod error;

// Re-export main types
pub use codec::{Payload, Record, WireField};
pub use config::{ClientConfig, Credentials, Platform};
pub use endpoint::{Dialect, EndpointRouter};
pub use engine::{ApiClient, Response, RetryPolicy, Sleeper, TokioSleeper};
pub use envelope::Shape;
pub use error::{ApiError, ApiResult};
pub use reqwest::Method;
