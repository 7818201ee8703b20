//! Types that do not fit the standard collection flow
//!
//! - job template surveys live at a fixed sub-path of their template and are
//!   replaced wholesale by POST
//! - approval nodes are a workflow node plus an approval template created
//!   through the node

use std::collections::HashMap;

use awx_client::codec::{Payload, Record, WireField};
use awx_client::{Method, Shape};
use awx_core::provider::{ProviderError, ProviderResult};
use awx_core::resource::{Resource, ResourceId, State, Value};
use log::{debug, info};
use serde_json::Value as JsonValue;
use tokio_util::sync::CancellationToken;

use crate::provider::{AwxProvider, require_id};
use crate::reconcile;
use crate::schemas::AwxSchemaConfig;

const APPROVAL_TEMPLATES: &str = "workflow_approval_templates";

fn survey_path(job_template: &str) -> String {
    format!("job_templates/{}/survey_spec/", job_template)
}

fn approval_template_path(template: i64) -> String {
    format!("{}/{}/", APPROVAL_TEMPLATES, template)
}

fn parse_identifier(identifier: &str) -> ProviderResult<i64> {
    identifier.parse().map_err(|_| {
        ProviderError::validation(format!("'{}' is not a numeric identifier", identifier))
    })
}

fn copy_fields(from: &Record, into: &mut Record, keys: &[&str]) {
    for key in keys {
        if let Some(value) = from.get(*key) {
            into.insert(key.to_string(), value.clone());
        }
    }
}

/// Body of the approval template: timeout only when set
fn approval_template_payload(attributes: &HashMap<String, Value>) -> JsonValue {
    let text = |key: &str| {
        attributes
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };
    Payload::new()
        .set("name", text("name"))
        .set("description", text("description"))
        .set_opt("timeout", attributes.get("timeout").and_then(Value::as_int))
        .into_value()
}

fn approval_node_payload(attributes: &HashMap<String, Value>) -> JsonValue {
    Payload::new()
        .set_opt(
            "workflow_job_template",
            attributes.get("workflow_job_template").and_then(Value::as_int),
        )
        .set_opt(
            "identifier",
            attributes
                .get("identifier")
                .and_then(Value::as_str)
                .map(str::to_string),
        )
        .into_value()
}

impl AwxProvider {
    // =========================================================================
    // Job template survey
    // =========================================================================

    /// Read the survey of the job template `identifier`
    ///
    /// The controller answers `{}` for a template without a survey.
    pub(crate) async fn read_survey_spec(
        &self,
        ctx: &CancellationToken,
        config: &AwxSchemaConfig,
        id: &ResourceId,
        identifier: &str,
        prior: &HashMap<String, Value>,
    ) -> ProviderResult<State> {
        let job_template = parse_identifier(identifier)?;
        let record = self
            .client()
            .get_one(ctx, &survey_path(identifier), Shape::Item, config.dialect)
            .await?;
        let Some(record) = record.filter(|r| !r.is_empty()) else {
            info!("{} no longer exists", id);
            return Ok(State::not_found(id.clone()));
        };

        let mut attributes = reconcile::read_record(config, &record, prior)?;
        attributes.insert("job_template_id".to_string(), Value::Int(job_template));
        Ok(State::existing(id.clone(), attributes)
            .with_identifier(identifier)
            .with_attribute("id", identifier))
    }

    /// Create or replace a survey
    pub(crate) async fn write_survey_spec(
        &self,
        ctx: &CancellationToken,
        config: &AwxSchemaConfig,
        resource: &Resource,
    ) -> ProviderResult<State> {
        let job_template = resource
            .get("job_template_id")
            .and_then(Value::as_int)
            .ok_or_else(|| {
                ProviderError::validation("job_template_id must be set")
                    .on_attribute("job_template_id")
            })?
            .to_string();
        let payload = reconcile::update_payload(config, &resource.attributes)?;

        info!("Writing survey of job template {}", job_template);
        self.client()
            .request(
                ctx,
                Method::POST,
                &survey_path(&job_template),
                Some(&payload.into_value()),
                &[200],
                config.dialect,
            )
            .await?;

        self.read_survey_spec(ctx, config, &resource.id, &job_template, &resource.attributes)
            .await
    }

    pub(crate) async fn delete_survey_spec(
        &self,
        ctx: &CancellationToken,
        config: &AwxSchemaConfig,
        id: &ResourceId,
        identifier: &str,
    ) -> ProviderResult<()> {
        info!("Deleting {}", id);
        self.client()
            .request(
                ctx,
                Method::DELETE,
                &survey_path(identifier),
                None,
                &[200, 202, 204],
                config.dialect,
            )
            .await?;
        Ok(())
    }

    // =========================================================================
    // Workflow approval node
    // =========================================================================

    /// Approval template behind a node record
    fn approval_template_of(node: &Record) -> ProviderResult<Option<i64>> {
        WireField::decode(node, "unified_job_template")
            .into_id("unified_job_template")
            .map_err(ProviderError::from)
    }

    pub(crate) async fn create_approval_node(
        &self,
        ctx: &CancellationToken,
        config: &AwxSchemaConfig,
        resource: &Resource,
    ) -> ProviderResult<State> {
        info!("Creating {}", resource.id);
        let node = self
            .client()
            .create(
                ctx,
                &config.collection_path(),
                &approval_node_payload(&resource.attributes),
                config.dialect,
            )
            .await?;
        let node_id = require_id(&node, config.collection)?.to_string();

        let path = format!("{}create_approval_template/", config.item_path(&node_id));
        self.client()
            .request_object(
                ctx,
                Method::POST,
                &path,
                Some(&approval_template_payload(&resource.attributes)),
                &[200, 201],
                config.dialect,
            )
            .await?;

        self.read_approval_node(ctx, config, &resource.id, &node_id, &resource.attributes)
            .await
    }

    /// Read a node and its approval template into one state
    pub(crate) async fn read_approval_node(
        &self,
        ctx: &CancellationToken,
        config: &AwxSchemaConfig,
        id: &ResourceId,
        identifier: &str,
        prior: &HashMap<String, Value>,
    ) -> ProviderResult<State> {
        let Some(node) = self
            .client()
            .get_one(ctx, &config.item_path(identifier), Shape::Item, config.dialect)
            .await?
        else {
            info!("{} no longer exists", id);
            return Ok(State::not_found(id.clone()));
        };
        let node_id = require_id(&node, config.collection)?;

        let mut merged = Record::new();
        copy_fields(&node, &mut merged, &["workflow_job_template", "identifier"]);
        if let Some(template_id) = Self::approval_template_of(&node)? {
            match self
                .client()
                .get_one(
                    ctx,
                    &approval_template_path(template_id),
                    Shape::Item,
                    config.dialect,
                )
                .await?
            {
                Some(template) => {
                    copy_fields(&template, &mut merged, &["name", "description", "timeout"]);
                }
                None => debug!("approval template {} of {} is gone", template_id, id),
            }
            merged.insert("approval_template_id".to_string(), template_id.into());
        }

        let attributes = reconcile::read_record(config, &merged, prior)?;
        Ok(State::existing(id.clone(), attributes)
            .with_identifier(node_id.to_string())
            .with_attribute("id", node_id.to_string()))
    }

    pub(crate) async fn update_approval_node(
        &self,
        ctx: &CancellationToken,
        config: &AwxSchemaConfig,
        id: &ResourceId,
        identifier: &str,
        to: &Resource,
    ) -> ProviderResult<State> {
        info!("Updating {}", id);
        let node = self
            .client()
            .update(
                ctx,
                Method::PATCH,
                &config.item_path(identifier),
                &approval_node_payload(&to.attributes),
                config.dialect,
            )
            .await?;

        let template_id = Self::approval_template_of(&node)?.ok_or_else(|| {
            ProviderError::validation(format!("{} has no approval template", id))
        })?;
        self.client()
            .update(
                ctx,
                Method::PATCH,
                &approval_template_path(template_id),
                &approval_template_payload(&to.attributes),
                config.dialect,
            )
            .await?;

        self.read_approval_node(ctx, config, id, identifier, &to.attributes)
            .await
    }

    /// Delete the node, then its approval template
    pub(crate) async fn delete_approval_node(
        &self,
        ctx: &CancellationToken,
        config: &AwxSchemaConfig,
        id: &ResourceId,
        identifier: &str,
        state: &State,
    ) -> ProviderResult<()> {
        let item = config.item_path(identifier);
        let node = self
            .client()
            .get_one(ctx, &item, Shape::Item, config.dialect)
            .await?;
        let template_id = match node {
            Some(node) => Self::approval_template_of(&node)?,
            None => None,
        }
        .or_else(|| state.get("approval_template_id").and_then(Value::as_int));

        info!("Deleting {}", id);
        self.client().delete(ctx, &item, config.dialect).await?;
        if let Some(template_id) = template_id {
            self.client()
                .request(
                    ctx,
                    Method::DELETE,
                    &approval_template_path(template_id),
                    None,
                    &[202, 204, 404],
                    config.dialect,
                )
                .await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn approval_timeout_is_omitted_when_unset() {
        let mut attrs = HashMap::new();
        attrs.insert("name".to_string(), Value::from("gate"));
        assert_eq!(
            approval_template_payload(&attrs),
            json!({"name": "gate", "description": ""})
        );

        attrs.insert("timeout".to_string(), Value::Int(3600));
        assert_eq!(
            approval_template_payload(&attrs),
            json!({"name": "gate", "description": "", "timeout": 3600})
        );
    }

    #[test]
    fn node_payload_carries_workflow_and_identifier() {
        let mut attrs = HashMap::new();
        attrs.insert("workflow_job_template".to_string(), Value::Int(9));
        attrs.insert("identifier".to_string(), Value::from("approve"));
        attrs.insert("name".to_string(), Value::from("gate"));
        assert_eq!(
            approval_node_payload(&attrs),
            json!({"workflow_job_template": 9, "identifier": "approve"})
        );
    }

    #[test]
    fn survey_lives_under_its_template() {
        assert_eq!(survey_path("5"), "job_templates/5/survey_spec/");
    }
}
