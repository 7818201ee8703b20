//! instance_group schema definition
//!
//! `pod_spec_override` is text on the wire (YAML or JSON) but some controller
//! versions return it as an object.

use super::{AwxSchemaConfig, Lookup, id_attribute, name_attribute, reference};
use awx_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};

/// Returns the schema config for instance_group
pub fn instance_group_config() -> AwxSchemaConfig {
    AwxSchemaConfig::new(
        "instance_groups",
        ResourceSchema::new("instance_group")
            .with_description("A group of execution nodes or a container group.")
            .attribute(id_attribute())
            .attribute(name_attribute())
            .attribute(
                AttributeSchema::new("is_container_group", AttributeType::Bool)
                    .with_default(false),
            )
            .attribute(reference("credential", "Cluster credential for container groups"))
            .attribute(
                AttributeSchema::new("policy_instance_percentage", types::int_range(0, 100))
                    .with_default(0),
            )
            .attribute(
                AttributeSchema::new("policy_instance_minimum", types::int_range(0, i64::MAX))
                    .with_default(0),
            )
            .attribute(
                AttributeSchema::new("max_concurrent_jobs", types::int_range(0, i64::MAX))
                    .with_default(0),
            )
            .attribute(
                AttributeSchema::new("max_forks", types::int_range(0, i64::MAX)).with_default(0),
            )
            .attribute(
                AttributeSchema::new("pod_spec_override", AttributeType::Json)
                    .with_description("Pod spec for container groups"),
            ),
    )
    .lookup(Lookup::by("name"))
    .text_json(&["pod_spec_override"])
}
