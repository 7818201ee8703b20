//! user schema definition
//!
//! Users live behind the gateway on platforms that have one.

use super::{AwxSchemaConfig, Lookup, UpdateMethod, id_attribute};
use awx_core::schema::{AttributeSchema, AttributeType, ResourceSchema};

/// Returns the schema config for user
pub fn user_config() -> AwxSchemaConfig {
    AwxSchemaConfig::new(
        "users",
        ResourceSchema::new("user")
            .with_description("A user account.")
            .attribute(id_attribute())
            .attribute(
                AttributeSchema::new("username", AttributeType::String)
                    .required()
                    .with_description("Login name"),
            )
            .attribute(
                AttributeSchema::new("password", AttributeType::String)
                    .sensitive()
                    .with_description("Login password; never returned by the controller"),
            )
            .attribute(AttributeSchema::new("first_name", AttributeType::String).with_default(""))
            .attribute(AttributeSchema::new("last_name", AttributeType::String).with_default(""))
            .attribute(AttributeSchema::new("email", AttributeType::String).with_default(""))
            .attribute(
                AttributeSchema::new("is_superuser", AttributeType::Bool)
                    .with_default(false)
                    .with_description("Grants every permission"),
            )
            .attribute(
                AttributeSchema::new("is_system_auditor", AttributeType::Bool)
                    .with_default(false)
                    .with_description("Grants read access to everything"),
            ),
    )
    .gateway()
    .lookup(Lookup::by("username"))
    .update_with(UpdateMethod::Patch)
}
