//! inventory, host, group and inventory_source schema definitions

use super::{
    AwxSchemaConfig, Lookup, description_attribute, id_attribute, name_attribute, reference,
    variables_attribute,
};
use crate::association::Binding;
use awx_core::schema::{AttributeSchema, AttributeType, Constraint, ResourceSchema, types};

const VALID_INVENTORY_KINDS: &[&str] = &["", "smart", "constructed"];

const VALID_SOURCES: &[&str] = &[
    "scm",
    "ec2",
    "gce",
    "azure_rm",
    "vmware",
    "satellite6",
    "openstack",
    "rhv",
    "controller",
    "insights",
    "terraform",
    "openshift_virtualization",
];

const GROUP_BINDINGS: &[Binding] = &[
    Binding::unordered("host_ids", "hosts"),
    Binding::unordered("child_group_ids", "children"),
];

/// Returns the schema config for inventory
pub fn inventory_config() -> AwxSchemaConfig {
    AwxSchemaConfig::new(
        "inventories",
        ResourceSchema::new("inventory")
            .with_description("A collection of hosts jobs run against.")
            .attribute(id_attribute())
            .attribute(name_attribute())
            .attribute(description_attribute())
            .attribute(reference("organization", "Owning organization").required())
            .attribute(
                AttributeSchema::new("kind", types::one_of(VALID_INVENTORY_KINDS))
                    .with_default("")
                    .with_description("Empty for a regular inventory, or smart / constructed"),
            )
            .attribute(
                AttributeSchema::new("host_filter", AttributeType::String)
                    .with_default("")
                    .with_description("Host filter of a smart inventory"),
            )
            .attribute(variables_attribute("variables"))
            .attribute(
                AttributeSchema::new("prevent_instance_group_fallback", AttributeType::Bool)
                    .with_default(false),
            ),
    )
    .lookup(Lookup::by("name").within(&[("organization", "organization")]))
}

/// Returns the schema config for host
pub fn host_config() -> AwxSchemaConfig {
    AwxSchemaConfig::new(
        "hosts",
        ResourceSchema::new("host")
            .with_description("A managed host within an inventory.")
            .attribute(id_attribute())
            .attribute(name_attribute())
            .attribute(description_attribute())
            .attribute(reference("inventory", "Inventory the host belongs to").required())
            .attribute(AttributeSchema::new("enabled", AttributeType::Bool).with_default(true))
            .attribute(AttributeSchema::new("instance_id", AttributeType::String).with_default(""))
            .attribute(variables_attribute("variables")),
    )
    .lookup(
        Lookup::by("name")
            .within(&[("inventory", "inventory")])
            .scope_required(),
    )
}

/// Returns the schema config for group
pub fn group_config() -> AwxSchemaConfig {
    AwxSchemaConfig::new(
        "groups",
        ResourceSchema::new("group")
            .with_description("A group of hosts within an inventory.")
            .attribute(id_attribute())
            .attribute(name_attribute())
            .attribute(description_attribute())
            .attribute(reference("inventory", "Inventory the group belongs to").required())
            .attribute(variables_attribute("variables"))
            .attribute(
                AttributeSchema::new("host_ids", types::id_set())
                    .with_description("Hosts that are direct members"),
            )
            .attribute(
                AttributeSchema::new("child_group_ids", types::id_set())
                    .with_description("Groups nested under this group"),
            ),
    )
    .lookup(
        Lookup::by("name")
            .within(&[("inventory", "inventory")])
            .scope_required(),
    )
    .bindings(GROUP_BINDINGS)
}

/// Returns the schema config for inventory_source
pub fn inventory_source_config() -> AwxSchemaConfig {
    AwxSchemaConfig::new(
        "inventory_sources",
        ResourceSchema::new("inventory_source")
            .with_description("A dynamic source of hosts for an inventory.")
            .attribute(id_attribute())
            .attribute(name_attribute())
            .attribute(description_attribute())
            .attribute(reference("inventory", "Inventory the source feeds").required())
            .attribute(
                AttributeSchema::new("source", types::one_of(VALID_SOURCES))
                    .required()
                    .with_description("Kind of source"),
            )
            .attribute(reference("source_project", "Project holding the inventory file"))
            .attribute(
                AttributeSchema::new("source_path", AttributeType::String)
                    .with_default("")
                    .with_description("Inventory file path within the project"),
            )
            .attribute(variables_attribute("source_vars"))
            .attribute(reference("credential", "Cloud credential"))
            .attribute(reference("execution_environment", "Execution environment for syncs"))
            .attribute(AttributeSchema::new("overwrite", AttributeType::Bool).with_default(false))
            .attribute(
                AttributeSchema::new("overwrite_vars", AttributeType::Bool).with_default(false),
            )
            .attribute(
                AttributeSchema::new("update_on_launch", AttributeType::Bool).with_default(false),
            )
            .attribute(
                AttributeSchema::new("update_cache_timeout", types::int_range(0, i64::MAX))
                    .with_default(0),
            )
            .attribute(AttributeSchema::new("verbosity", types::int_range(0, 2)).with_default(1))
            .attribute(AttributeSchema::new("host_filter", AttributeType::String).with_default(""))
            .attribute(AttributeSchema::new("enabled_var", AttributeType::String).with_default(""))
            .attribute(
                AttributeSchema::new("enabled_value", AttributeType::String).with_default(""),
            )
            .attribute(AttributeSchema::new("limit", AttributeType::String).with_default(""))
            .constraint(Constraint::required_when(
                "source",
                "scm",
                &["source_project", "source_path"],
            )),
    )
    .lookup(Lookup::by("name").within(&[("inventory", "inventory")]))
}
