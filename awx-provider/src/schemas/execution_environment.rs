//! execution_environment schema definition

use super::{
    AwxSchemaConfig, Lookup, description_attribute, id_attribute, name_attribute, reference,
};
use awx_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};

const VALID_PULL: &[&str] = &["", "always", "missing", "never"];

/// Returns the schema config for execution_environment
pub fn execution_environment_config() -> AwxSchemaConfig {
    AwxSchemaConfig::new(
        "execution_environments",
        ResourceSchema::new("execution_environment")
            .with_description("A container image jobs run in.")
            .attribute(id_attribute())
            .attribute(name_attribute())
            .attribute(description_attribute())
            .attribute(
                AttributeSchema::new("image", AttributeType::String)
                    .required()
                    .with_description("Full image location, including registry and tag"),
            )
            .attribute(reference("organization", "Owning organization; unset means global"))
            .attribute(reference("credential", "Registry credential"))
            .attribute(
                AttributeSchema::new("pull", types::one_of(VALID_PULL))
                    .with_default("")
                    .with_description("Pull policy: always, missing or never"),
            ),
    )
    .lookup(Lookup::by("name"))
}
