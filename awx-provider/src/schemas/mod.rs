//! Resource schemas for the controller API
//!
//! Each managed type is described by an [`AwxSchemaConfig`]: where it lives,
//! how it is looked up by name, which verb updates it, which child lists hang
//! off it, and the attribute schema itself.

use std::sync::LazyLock;

use awx_client::Dialect;
use awx_core::schema::{AttributeSchema, AttributeType, ResourceSchema};

use crate::association::Binding;

pub mod credential;
pub mod execution_environment;
pub mod instance_group;
pub mod inventory;
pub mod job_template;
pub mod label;
pub mod notification_template;
pub mod organization;
pub mod project;
pub mod role;
pub mod schedule;
pub mod team;
pub mod user;
pub mod workflow;

/// Name-based lookup of a type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lookup {
    /// Filter field that identifies an object (`name` or `username`)
    pub field: &'static str,
    /// `(attribute, filter)` pairs that narrow the lookup when set
    pub scope: &'static [(&'static str, &'static str)],
    /// Name lookups must supply every scope attribute
    pub scope_required: bool,
}

impl Lookup {
    pub fn by(field: &'static str) -> Self {
        Self {
            field,
            scope: &[],
            scope_required: false,
        }
    }

    pub fn within(mut self, scope: &'static [(&'static str, &'static str)]) -> Self {
        self.scope = scope;
        self
    }

    pub fn scope_required(mut self) -> Self {
        self.scope_required = true;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateMethod {
    Put,
    Patch,
    /// Every change requires replacement
    Immutable,
}

/// Non-generic behavior a type needs on top of the standard CRUD flow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handler {
    Standard,
    /// Survey attached to a job template
    SurveySpec,
    /// Workflow node whose template is created through a sub-call
    ApprovalNode,
    /// Assignment posted to the user or team assignment collection
    RoleAssignment,
    /// The controller offers no DELETE for labels
    Label,
}

/// Controller metadata combined with the attribute schema
#[derive(Debug, Clone)]
pub struct AwxSchemaConfig {
    /// Collection path under the API prefix (e.g. "job_templates")
    pub collection: &'static str,
    pub dialect: Dialect,
    pub lookup: Option<Lookup>,
    pub update: UpdateMethod,
    pub bindings: &'static [Binding],
    /// JSON attributes the controller carries as text rather than as objects
    pub text_json: &'static [&'static str],
    /// Attributes that address the object in its path; never sent in a body
    pub path_params: &'static [&'static str],
    pub handler: Handler,
    pub schema: ResourceSchema,
}

impl AwxSchemaConfig {
    pub fn new(collection: &'static str, schema: ResourceSchema) -> Self {
        Self {
            collection,
            dialect: Dialect::Controller,
            lookup: None,
            update: UpdateMethod::Put,
            bindings: &[],
            text_json: &[],
            path_params: &[],
            handler: Handler::Standard,
            schema,
        }
    }

    pub fn gateway(mut self) -> Self {
        self.dialect = Dialect::Gateway;
        self
    }

    pub fn lookup(mut self, lookup: Lookup) -> Self {
        self.lookup = Some(lookup);
        self
    }

    pub fn update_with(mut self, update: UpdateMethod) -> Self {
        self.update = update;
        self
    }

    pub fn bindings(mut self, bindings: &'static [Binding]) -> Self {
        self.bindings = bindings;
        self
    }

    pub fn text_json(mut self, names: &'static [&'static str]) -> Self {
        self.text_json = names;
        self
    }

    pub fn path_params(mut self, names: &'static [&'static str]) -> Self {
        self.path_params = names;
        self
    }

    pub fn handler(mut self, handler: Handler) -> Self {
        self.handler = handler;
        self
    }

    pub fn resource_type(&self) -> &str {
        &self.schema.resource_type
    }

    pub fn collection_path(&self) -> String {
        format!("{}/", self.collection)
    }

    pub fn item_path(&self, id: &str) -> String {
        format!("{}/{}/", self.collection, id)
    }

    pub fn binding_for(&self, attribute: &str) -> Option<&Binding> {
        self.bindings.iter().find(|b| b.attribute == attribute)
    }

    pub fn is_text_json(&self, attribute: &str) -> bool {
        self.text_json.contains(&attribute)
    }

    pub fn is_path_param(&self, attribute: &str) -> bool {
        self.path_params.contains(&attribute)
    }
}

static CONFIGS: LazyLock<Vec<AwxSchemaConfig>> = LazyLock::new(|| {
    vec![
        organization::organization_config(),
        user::user_config(),
        team::team_config(),
        credential::credential_type_config(),
        credential::credential_config(),
        inventory::inventory_config(),
        inventory::host_config(),
        inventory::group_config(),
        inventory::inventory_source_config(),
        project::project_config(),
        execution_environment::execution_environment_config(),
        label::label_config(),
        instance_group::instance_group_config(),
        job_template::job_template_config(),
        job_template::survey_spec_config(),
        workflow::workflow_job_template_config(),
        workflow::workflow_job_template_node_config(),
        workflow::approval_node_config(),
        schedule::schedule_config(),
        notification_template::notification_template_config(),
        role::role_definition_config(),
        role::role_assignment_config(),
    ]
});

/// All schema configs
pub fn configs() -> &'static [AwxSchemaConfig] {
    &CONFIGS
}

/// Get the schema config for a resource type
pub fn get_schema_config(resource_type: &str) -> Option<&'static AwxSchemaConfig> {
    CONFIGS.iter().find(|c| c.resource_type() == resource_type)
}

// =============================================================================
// Shared attributes
// =============================================================================

/// Controller-assigned id
pub fn id_attribute() -> AttributeSchema {
    AttributeSchema::new("id", AttributeType::String)
        .computed()
        .with_description("Numeric id assigned by the controller (read-only)")
}

pub fn name_attribute() -> AttributeSchema {
    AttributeSchema::new("name", AttributeType::String)
        .required()
        .with_description("Name of the object")
}

pub fn description_attribute() -> AttributeSchema {
    AttributeSchema::new("description", AttributeType::String).with_default("")
}

/// Foreign key to an object of another collection
pub fn reference(name: &str, description: &str) -> AttributeSchema {
    AttributeSchema::new(name, AttributeType::Int)
        .reference()
        .with_description(description)
}

/// Optional YAML or JSON variables, carried as text
pub fn variables_attribute(name: &str) -> AttributeSchema {
    AttributeSchema::new(name, AttributeType::String)
        .with_default("")
        .with_description("Variables as YAML or JSON text")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn resource_types_are_unique() {
        let mut seen = HashSet::new();
        for config in configs() {
            assert!(
                seen.insert(config.resource_type().to_string()),
                "duplicate resource type {}",
                config.resource_type()
            );
        }
    }

    #[test]
    fn every_type_has_a_computed_id() {
        for config in configs() {
            let id = config
                .schema
                .get("id")
                .unwrap_or_else(|| panic!("{} has no id", config.resource_type()));
            assert!(id.computed, "{} id must be computed", config.resource_type());
        }
    }

    #[test]
    fn lookup_fields_exist_in_schema() {
        for config in configs() {
            if let Some(lookup) = config.lookup {
                assert!(config.schema.get(lookup.field).is_some());
                for (scope, _) in lookup.scope {
                    assert!(
                        config.schema.get(scope).is_some(),
                        "{} scope {} missing",
                        config.resource_type(),
                        scope
                    );
                }
            }
        }
    }

    #[test]
    fn binding_attributes_are_id_lists() {
        for config in configs() {
            for binding in config.bindings {
                let attr = config.schema.get(binding.attribute).unwrap_or_else(|| {
                    panic!("{} binding {} missing", config.resource_type(), binding.attribute)
                });
                assert_eq!(
                    attr.attr_type.is_set(),
                    !binding.ordered,
                    "{} binding {} must be a set iff unordered",
                    config.resource_type(),
                    binding.attribute
                );
            }
        }
    }

    #[test]
    fn paths() {
        let config = get_schema_config("job_template").unwrap();
        assert_eq!(config.collection_path(), "job_templates/");
        assert_eq!(config.item_path("42"), "job_templates/42/");
        assert!(get_schema_config("nonexistent").is_none());
    }
}
