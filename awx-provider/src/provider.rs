//! AWX Provider implementation
//!
//! This module contains the main provider implementation that communicates
//! with the controller REST API to manage resources.

use std::collections::HashMap;

use awx_client::codec::Record;
use awx_client::{ApiClient, ApiError, Method, Shape, envelope};
use awx_core::provider::{ErrorKind, ProviderError, ProviderResult};
use awx_core::resource::{Resource, ResourceId, State, Value};
use log::{debug, info, warn};
use tokio_util::sync::CancellationToken;

use crate::association::Associations;
use crate::config::ProviderConfig;
use crate::reconcile::{self, FieldKind};
use crate::schemas::{AwxSchemaConfig, Handler, UpdateMethod, get_schema_config, role};

/// Look up the schema config of a resource type
pub(crate) fn schema_config(id: &ResourceId) -> ProviderResult<&'static AwxSchemaConfig> {
    get_schema_config(&id.resource_type).ok_or_else(|| {
        ProviderError::new(
            ErrorKind::Unsupported,
            format!("Unknown resource type: {}", id.resource_type),
        )
    })
}

/// AWX / Ansible Automation Platform provider
#[derive(Debug, Clone)]
pub struct AwxProvider {
    client: ApiClient,
}

impl AwxProvider {
    /// Create a provider from validated settings
    pub fn new(config: &ProviderConfig) -> ProviderResult<Self> {
        let client = ApiClient::new(&config.client_config())?;
        info!(
            "Configured provider for {} ({})",
            config.endpoint, config.platform
        );
        Ok(Self { client })
    }

    /// Create a provider from a host attribute map, falling back to `AWX_*`
    /// environment variables
    pub fn from_attributes(attributes: &HashMap<String, Value>) -> ProviderResult<Self> {
        let config = ProviderConfig::from_attributes(attributes)?;
        Self::new(&config)
    }

    /// Create a provider around an existing client
    pub fn with_client(client: ApiClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    // =========================================================================
    // Resource Operations
    // =========================================================================

    /// Read a resource addressed by the identifier in `prior`
    pub async fn read_resource(
        &self,
        ctx: &CancellationToken,
        id: &ResourceId,
        prior: &State,
    ) -> ProviderResult<State> {
        let config = schema_config(id)?;

        let Some(identifier) = prior.identifier.as_deref() else {
            return Ok(State::not_found(id.clone()));
        };

        match config.handler {
            Handler::SurveySpec => {
                return self
                    .read_survey_spec(ctx, config, id, identifier, &prior.attributes)
                    .await;
            }
            Handler::ApprovalNode => {
                return self
                    .read_approval_node(ctx, config, id, identifier, &prior.attributes)
                    .await;
            }
            _ => {}
        }

        let item = item_path(config, &prior.attributes, identifier);
        let Some(record) = self
            .client
            .get_one(ctx, &item, Shape::Item, config.dialect)
            .await?
        else {
            info!("{} no longer exists", id);
            return Ok(State::not_found(id.clone()));
        };

        self.observe(ctx, config, id, &record, &prior.attributes)
            .await
    }

    /// Create a resource and return the state observed afterwards
    pub async fn create_resource(
        &self,
        ctx: &CancellationToken,
        resource: &Resource,
    ) -> ProviderResult<State> {
        let config = schema_config(&resource.id)?;
        validate(config, &resource.attributes)?;

        match config.handler {
            Handler::SurveySpec => return self.write_survey_spec(ctx, config, resource).await,
            Handler::ApprovalNode => return self.create_approval_node(ctx, config, resource).await,
            _ => {}
        }

        let payload = reconcile::create_payload(config, &resource.attributes)?;
        let collection = collection_for(config, &resource.attributes);
        info!("Creating {}", resource.id);
        let record = self
            .client
            .create(
                ctx,
                &format!("{}/", collection),
                &payload.into_value(),
                config.dialect,
            )
            .await?;

        let object_id = require_id(&record, collection)?;
        let item = format!("{}/{}/", collection, object_id);
        if let Err(err) = self.bind_children(ctx, config, &item, resource).await {
            warn!("{}: binding children failed, removing {}", resource.id, item);
            if let Err(cleanup) = self.client.delete(ctx, &item, config.dialect).await {
                warn!("{}: could not remove {}: {}", resource.id, item, cleanup);
            }
            return Err(err);
        }

        self.observe(ctx, config, &resource.id, &record, &resource.attributes)
            .await
    }

    /// Associate every configured child list of a freshly created object
    async fn bind_children(
        &self,
        ctx: &CancellationToken,
        config: &AwxSchemaConfig,
        item: &str,
        resource: &Resource,
    ) -> ProviderResult<()> {
        let associations = Associations::new(&self.client, config.dialect);
        for binding in config.bindings {
            if let Some(value) = resource.get(binding.attribute) {
                associations.create(ctx, item, binding, &value.ids()).await?;
            }
        }
        Ok(())
    }

    /// Update a resource in place
    pub async fn update_resource(
        &self,
        ctx: &CancellationToken,
        id: &ResourceId,
        from: &State,
        to: &Resource,
    ) -> ProviderResult<State> {
        let config = schema_config(id)?;
        if config.update == UpdateMethod::Immutable {
            return Err(ProviderError::new(
                ErrorKind::Unsupported,
                format!(
                    "{} cannot be updated in place, delete and recreate",
                    id.resource_type
                ),
            ));
        }
        validate(config, &to.attributes)?;
        let identifier = require_identifier(from)?;

        match config.handler {
            Handler::SurveySpec => return self.write_survey_spec(ctx, config, to).await,
            Handler::ApprovalNode => {
                return self
                    .update_approval_node(ctx, config, id, identifier, to)
                    .await;
            }
            _ => {}
        }

        let method = match config.update {
            UpdateMethod::Patch => Method::PATCH,
            _ => Method::PUT,
        };
        let payload = reconcile::update_payload(config, &to.attributes)?;
        let item = item_path(config, &to.attributes, identifier);
        info!("Updating {} ({} {})", id, method, item);
        let record = self
            .client
            .update(ctx, method, &item, &payload.into_value(), config.dialect)
            .await?;

        let associations = Associations::new(&self.client, config.dialect);
        for binding in config.bindings {
            let desired = to.get(binding.attribute);
            if desired.is_none() && from.get(binding.attribute).is_none() {
                continue;
            }
            let desired = desired.map(Value::ids).unwrap_or_default();
            associations.update(ctx, &item, binding, &desired).await?;
        }

        self.observe(ctx, config, id, &record, &to.attributes).await
    }

    /// Delete a resource, releasing its bound children first
    pub async fn delete_resource(
        &self,
        ctx: &CancellationToken,
        id: &ResourceId,
        state: &State,
    ) -> ProviderResult<()> {
        let config = schema_config(id)?;
        let Some(identifier) = state.identifier.as_deref() else {
            debug!("{} has no identifier, nothing to delete", id);
            return Ok(());
        };

        match config.handler {
            Handler::Label => {
                warn!(
                    "{}: labels cannot be deleted through the API, dropping it from state only",
                    id
                );
                return Ok(());
            }
            Handler::SurveySpec => return self.delete_survey_spec(ctx, config, id, identifier).await,
            Handler::ApprovalNode => {
                return self
                    .delete_approval_node(ctx, config, id, identifier, state)
                    .await;
            }
            _ => {}
        }

        let item = item_path(config, &state.attributes, identifier);
        let associations = Associations::new(&self.client, config.dialect);
        for binding in config.bindings {
            if let Some(bound) = state.get(binding.attribute) {
                associations
                    .delete(ctx, &item, binding, &bound.ids())
                    .await?;
            }
        }

        info!("Deleting {}", id);
        self.client.delete(ctx, &item, config.dialect).await?;
        Ok(())
    }

    /// Find an existing object by `id` or by its lookup field
    ///
    /// A lookup that matches nothing reports the object as absent; one that
    /// matches several objects is a cardinality error.
    pub async fn read_data_source_resource(
        &self,
        ctx: &CancellationToken,
        resource: &Resource,
    ) -> ProviderResult<State> {
        let config = schema_config(&resource.id)?;
        let lookup = config.lookup.ok_or_else(|| {
            ProviderError::new(
                ErrorKind::Unsupported,
                format!("{} cannot be read as a data source", config.resource_type()),
            )
        })?;

        let by_id = resource.get("id").filter(|v| !v.is_default());
        let by_name = resource.get(lookup.field).filter(|v| !v.is_default());

        let found = match (by_id, by_name) {
            (Some(object_id), None) => {
                let object_id = numeric_id(object_id)?;
                let item = config.item_path(&object_id.to_string());
                self.client
                    .get_one(ctx, &item, Shape::Item, config.dialect)
                    .await?
            }
            (None, Some(name)) => {
                let mut filters = vec![(lookup.field, filter_value(name))];
                let mut missing = Vec::new();
                for (attribute, filter) in lookup.scope {
                    match resource.get(attribute) {
                        Some(value) => filters.push((*filter, filter_value(value))),
                        None => missing.push(*attribute),
                    }
                }
                if lookup.scope_required && !missing.is_empty() {
                    return Err(ProviderError::validation(format!(
                        "Looking up {} by {} requires {}",
                        config.resource_type(),
                        lookup.field,
                        missing.join(", ")
                    )));
                }
                self.client
                    .lookup(ctx, &config.collection_path(), &filters, config.dialect)
                    .await?
            }
            _ => {
                return Err(ProviderError::validation(format!(
                    "Exactly one of id, {} must be set",
                    lookup.field
                )));
            }
        };

        match found {
            Some(record) => {
                self.observe(ctx, config, &resource.id, &record, &resource.attributes)
                    .await
            }
            None => {
                debug!("{} matched no object", resource.id);
                Ok(State::not_found(resource.id.clone()))
            }
        }
    }

    // =========================================================================
    // Observation
    // =========================================================================

    /// Build state from a record and the current child lists
    async fn observe(
        &self,
        ctx: &CancellationToken,
        config: &AwxSchemaConfig,
        id: &ResourceId,
        record: &Record,
        prior: &HashMap<String, Value>,
    ) -> ProviderResult<State> {
        let object_id = require_id(record, config.collection)?;
        let mut attributes = reconcile::read_record(config, record, prior)?;

        let item = item_path(config, prior, &object_id.to_string());
        let associations = Associations::new(&self.client, config.dialect);
        for binding in config.bindings {
            let Some(attr) = config.schema.get(binding.attribute) else {
                continue;
            };
            let observed = associations.read(ctx, &item, binding).await?;
            let value = reconcile::reconcile_value(
                attr,
                FieldKind::of(config, attr),
                prior.get(binding.attribute),
                Some(Value::int_list(observed)),
            );
            if let Some(value) = value {
                attributes.insert(binding.attribute.to_string(), value);
            }
        }

        Ok(State::existing(id.clone(), attributes)
            .with_identifier(object_id.to_string())
            .with_attribute("id", object_id.to_string()))
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn validate(config: &AwxSchemaConfig, attributes: &HashMap<String, Value>) -> ProviderResult<()> {
    config
        .schema
        .validate(attributes)
        .map_err(|errors| ProviderError::from_type_errors(&errors))
}

/// Collection an object lives in; role assignments depend on the grantee
fn collection_for(config: &AwxSchemaConfig, attributes: &HashMap<String, Value>) -> &'static str {
    match config.handler {
        Handler::RoleAssignment => role::assignment_collection(attributes.contains_key("team")),
        _ => config.collection,
    }
}

fn item_path(
    config: &AwxSchemaConfig,
    attributes: &HashMap<String, Value>,
    identifier: &str,
) -> String {
    format!("{}/{}/", collection_for(config, attributes), identifier)
}

pub(crate) fn require_id(record: &Record, collection: &str) -> ProviderResult<i64> {
    envelope::record_id(record).ok_or_else(|| {
        ApiError::decode(collection, "response object has no integer 'id'").into()
    })
}

pub(crate) fn require_identifier(state: &State) -> ProviderResult<&str> {
    state.identifier.as_deref().ok_or_else(|| {
        ProviderError::validation(format!("{} has no identifier in state", state.id))
    })
}

/// Object id given as an integer or a numeric string
fn numeric_id(value: &Value) -> ProviderResult<i64> {
    match value {
        Value::Int(i) => Ok(*i),
        Value::String(s) => s.trim().parse().map_err(|_| {
            ProviderError::validation(format!("'{}' is not a numeric id", s)).on_attribute("id")
        }),
        _ => Err(ProviderError::type_mismatch("id", "expected a number")),
    }
}

/// Query string form of a lookup value
fn filter_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Int(i) => i.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_json().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_assignments_route_by_grantee() {
        let config = get_schema_config("role_assignment").unwrap();
        let mut attrs = HashMap::new();
        attrs.insert("user".to_string(), Value::Int(3));
        assert_eq!(item_path(config, &attrs, "9"), "role_user_assignments/9/");

        let mut attrs = HashMap::new();
        attrs.insert("team".to_string(), Value::Int(4));
        assert_eq!(item_path(config, &attrs, "9"), "role_team_assignments/9/");
    }

    #[test]
    fn numeric_ids_accept_strings() {
        assert_eq!(numeric_id(&Value::from("42")).unwrap(), 42);
        assert_eq!(numeric_id(&Value::Int(7)).unwrap(), 7);
        assert!(numeric_id(&Value::from("x")).is_err());
        let err = numeric_id(&Value::Bool(true)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::TypeMismatch);
        assert_eq!(err.attribute.as_deref(), Some("id"));
    }

    #[test]
    fn filter_values_are_plain_text() {
        assert_eq!(filter_value(&Value::from("bob")), "bob");
        assert_eq!(filter_value(&Value::Int(3)), "3");
    }

    #[test]
    fn unknown_types_are_unsupported() {
        let err = schema_config(&ResourceId::new("widget", "w")).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Unsupported);
    }
}
