//! organization schema definition

use super::{
    AwxSchemaConfig, Lookup, description_attribute, id_attribute, name_attribute, reference,
};
use crate::association::Binding;
use awx_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};

const BINDINGS: &[Binding] = &[
    Binding::ordered("galaxy_credential_ids", "galaxy_credentials"),
    Binding::ordered("instance_group_ids", "instance_groups"),
];

/// Returns the schema config for organization
pub fn organization_config() -> AwxSchemaConfig {
    AwxSchemaConfig::new(
        "organizations",
        ResourceSchema::new("organization")
            .with_description("An organization groups inventories, projects and teams.")
            .attribute(id_attribute())
            .attribute(name_attribute())
            .attribute(description_attribute())
            .attribute(
                AttributeSchema::new("max_hosts", types::int_range(0, i64::from(i32::MAX)))
                    .with_default(0)
                    .with_description("Maximum number of hosts allowed; 0 means unlimited"),
            )
            .attribute(reference(
                "default_environment",
                "Execution environment used when a job does not name one",
            ))
            .attribute(
                AttributeSchema::new("galaxy_credential_ids", types::id_list())
                    .with_description("Galaxy credentials, in lookup precedence order"),
            )
            .attribute(
                AttributeSchema::new("instance_group_ids", types::id_list())
                    .with_description("Instance groups, in preference order"),
            )
            .attribute(
                AttributeSchema::new("custom_virtualenv", AttributeType::String)
                    .computed()
                    .with_description("Legacy virtualenv path (read-only)"),
            ),
    )
    .lookup(Lookup::by("name"))
    .bindings(BINDINGS)
}
