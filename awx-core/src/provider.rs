//! Provider - Trait abstracting resource operations
//!
//! A Provider projects desired resources onto a remote controller. The host
//! serialises calls per resource instance and may run independent instances
//! in parallel; every call carries a cancellation token.

use std::future::Future;
use std::pin::Pin;

use tokio_util::sync::CancellationToken;

use crate::resource::{Resource, ResourceId, State};
use crate::schema::{ResourceSchema, TypeError};

/// Which contract an error violated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Missing base URL, bad auth assembly, unknown platform
    Configuration,
    /// URL composition or body marshalling failed
    RequestBuild,
    /// Connection refused, timeout, DNS, TLS
    Transport,
    /// Response body could not be read
    BodyRead,
    /// Response status outside the accepted set
    UnexpectedStatus,
    /// Body was not JSON or not the expected envelope shape
    Decode,
    /// Name-based lookup did not return exactly one row
    Cardinality,
    /// A polymorphic wire field decoded to an unexpected variant
    TypeMismatch,
    /// Schema rule failed before any request went out
    Validation,
    /// Operation cancelled while waiting or in flight
    Cancelled,
    /// The controller offers no verb for the operation
    Unsupported,
}

impl ErrorKind {
    /// Diagnostic summary shared by every error of this kind
    pub fn summary(&self) -> &'static str {
        match self {
            ErrorKind::Configuration => "Provider configuration error",
            ErrorKind::RequestBuild => "Unable to build request",
            ErrorKind::Transport => "Unable to reach the controller",
            ErrorKind::BodyRead => "Unable to read response body",
            ErrorKind::UnexpectedStatus => "Backend error",
            ErrorKind::Decode => "Unable to decode response",
            ErrorKind::Cardinality => "Wrong cardinality returned for lookup",
            ErrorKind::TypeMismatch => "Unexpected type",
            ErrorKind::Validation => "Invalid configuration",
            ErrorKind::Cancelled => "Operation cancelled",
            ErrorKind::Unsupported => "Unsupported operation",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.summary())
    }
}

/// Error type for Provider operations
#[derive(Debug)]
pub struct ProviderError {
    pub kind: ErrorKind,
    pub message: String,
    pub resource_id: Option<ResourceId>,
    /// Attribute the error is about, when known
    pub attribute: Option<String>,
    pub cause: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(ref id) = self.resource_id {
            write!(f, "[{}] {}", id, self.message)
        } else {
            write!(f, "{}", self.message)
        }
    }
}

impl std::error::Error for ProviderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_ref()
            .map(|e| e.as_ref() as &dyn std::error::Error)
    }
}

impl ProviderError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            resource_id: None,
            attribute: None,
            cause: None,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    pub fn type_mismatch(attribute: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TypeMismatch, message).on_attribute(attribute)
    }

    /// Schema validation failures joined into a single error
    pub fn from_type_errors(errors: &[TypeError]) -> Self {
        let message = errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ");
        Self::validation(message)
    }

    pub fn for_resource(mut self, id: ResourceId) -> Self {
        self.resource_id = Some(id);
        self
    }

    pub fn on_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.attribute = Some(attribute.into());
        self
    }

    pub fn with_cause(mut self, cause: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    pub fn is_cancelled(&self) -> bool {
        self.kind == ErrorKind::Cancelled
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Return type for async operations
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Definition of resource types that a Provider can handle
pub trait ResourceType: Send + Sync {
    /// Resource type name (e.g., "job_template")
    fn name(&self) -> &'static str;

    /// Attribute schema for this resource type
    fn schema(&self) -> ResourceSchema;

    /// Whether the type can also be read as a data source
    fn has_data_source(&self) -> bool {
        false
    }
}

/// Main Provider trait
///
/// All operations are async and involve side effects. None of them mutate the
/// host's state themselves: each returns the state the host should record.
pub trait Provider: Send + Sync {
    /// Name of this Provider (e.g., "awx")
    fn name(&self) -> &'static str;

    /// List of resource types this Provider can handle
    fn resource_types(&self) -> Vec<Box<dyn ResourceType>>;

    /// Schema of one resource type, if this Provider handles it
    fn schema(&self, resource_type: &str) -> Option<ResourceSchema> {
        self.resource_types()
            .into_iter()
            .find(|t| t.name() == resource_type)
            .map(|t| t.schema())
    }

    /// Get the current state of a resource
    ///
    /// `prior` is the state the host recorded last time; its identifier
    /// addresses the resource. Returns `State::not_found()` if the resource
    /// no longer exists.
    fn read<'a>(
        &'a self,
        ctx: &'a CancellationToken,
        id: &'a ResourceId,
        prior: &'a State,
    ) -> BoxFuture<'a, ProviderResult<State>>;

    /// Look up an existing object by id or by name
    fn read_data_source<'a>(
        &'a self,
        ctx: &'a CancellationToken,
        resource: &'a Resource,
    ) -> BoxFuture<'a, ProviderResult<State>>;

    /// Create a resource
    ///
    /// Returns State with identifier set to the controller id (e.g., "42")
    fn create<'a>(
        &'a self,
        ctx: &'a CancellationToken,
        resource: &'a Resource,
    ) -> BoxFuture<'a, ProviderResult<State>>;

    /// Update a resource in place
    fn update<'a>(
        &'a self,
        ctx: &'a CancellationToken,
        id: &'a ResourceId,
        from: &'a State,
        to: &'a Resource,
    ) -> BoxFuture<'a, ProviderResult<State>>;

    /// Delete a resource
    fn delete<'a>(
        &'a self,
        ctx: &'a CancellationToken,
        id: &'a ResourceId,
        state: &'a State,
    ) -> BoxFuture<'a, ProviderResult<()>>;
}

/// Provider implementation for Box<dyn Provider>
/// This enables dynamic dispatch for Providers
impl Provider for Box<dyn Provider> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn resource_types(&self) -> Vec<Box<dyn ResourceType>> {
        (**self).resource_types()
    }

    fn read<'a>(
        &'a self,
        ctx: &'a CancellationToken,
        id: &'a ResourceId,
        prior: &'a State,
    ) -> BoxFuture<'a, ProviderResult<State>> {
        (**self).read(ctx, id, prior)
    }

    fn read_data_source<'a>(
        &'a self,
        ctx: &'a CancellationToken,
        resource: &'a Resource,
    ) -> BoxFuture<'a, ProviderResult<State>> {
        (**self).read_data_source(ctx, resource)
    }

    fn create<'a>(
        &'a self,
        ctx: &'a CancellationToken,
        resource: &'a Resource,
    ) -> BoxFuture<'a, ProviderResult<State>> {
        (**self).create(ctx, resource)
    }

    fn update<'a>(
        &'a self,
        ctx: &'a CancellationToken,
        id: &'a ResourceId,
        from: &'a State,
        to: &'a Resource,
    ) -> BoxFuture<'a, ProviderResult<State>> {
        (**self).update(ctx, id, from, to)
    }

    fn delete<'a>(
        &'a self,
        ctx: &'a CancellationToken,
        id: &'a ResourceId,
        state: &'a State,
    ) -> BoxFuture<'a, ProviderResult<()>> {
        (**self).delete(ctx, id, state)
    }
}
