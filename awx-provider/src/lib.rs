//! AWX Provider
//!
//! Manages AWX / Ansible Automation Platform controller objects through the
//! REST API.
//!
//! ## Module Structure
//!
//! - `config` - Provider settings with `AWX_*` environment fallback
//! - `resources` - Resource type definitions
//! - `schemas` - Per-type schemas, collections, lookups and bindings
//! - `provider` - AwxProvider implementation
//! - `reconcile` - Wire/state translation and drift suppression
//! - `association` - Child-list association engine
//! - `handlers` - Surveys and approval nodes

pub mod association;
pub mod config;
mod handlers;
pub mod provider;
pub mod reconcile;
pub mod resources;
pub mod schemas;

// Re-export main types
pub use config::{ConfigError, ProviderConfig};
pub use provider::AwxProvider;

use awx_core::provider::{BoxFuture, Provider, ProviderResult, ResourceType};
use awx_core::resource::{Resource, ResourceId, State};
use tokio_util::sync::CancellationToken;

use resources::resource_types;

// =============================================================================
// Provider Trait Implementation
// =============================================================================

impl Provider for AwxProvider {
    fn name(&self) -> &'static str {
        "awx"
    }

    fn resource_types(&self) -> Vec<Box<dyn ResourceType>> {
        resource_types()
    }

    fn read<'a>(
        &'a self,
        ctx: &'a CancellationToken,
        id: &'a ResourceId,
        prior: &'a State,
    ) -> BoxFuture<'a, ProviderResult<State>> {
        Box::pin(async move {
            self.read_resource(ctx, id, prior)
                .await
                .map_err(|e| e.for_resource(id.clone()))
        })
    }

    fn read_data_source<'a>(
        &'a self,
        ctx: &'a CancellationToken,
        resource: &'a Resource,
    ) -> BoxFuture<'a, ProviderResult<State>> {
        Box::pin(async move {
            self.read_data_source_resource(ctx, resource)
                .await
                .map_err(|e| e.for_resource(resource.id.clone()))
        })
    }

    fn create<'a>(
        &'a self,
        ctx: &'a CancellationToken,
        resource: &'a Resource,
    ) -> BoxFuture<'a, ProviderResult<State>> {
        Box::pin(async move {
            self.create_resource(ctx, resource)
                .await
                .map_err(|e| e.for_resource(resource.id.clone()))
        })
    }

    fn update<'a>(
        &'a self,
        ctx: &'a CancellationToken,
        id: &'a ResourceId,
        from: &'a State,
        to: &'a Resource,
    ) -> BoxFuture<'a, ProviderResult<State>> {
        Box::pin(async move {
            self.update_resource(ctx, id, from, to)
                .await
                .map_err(|e| e.for_resource(id.clone()))
        })
    }

    fn delete<'a>(
        &'a self,
        ctx: &'a CancellationToken,
        id: &'a ResourceId,
        state: &'a State,
    ) -> BoxFuture<'a, ProviderResult<()>> {
        Box::pin(async move {
            self.delete_resource(ctx, id, state)
                .await
                .map_err(|e| e.for_resource(id.clone()))
        })
    }
}
