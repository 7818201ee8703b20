//! credential_type and credential schema definitions
//!
//! `inputs` and `injectors` are opaque JSON documents. Secret values inside a
//! credential's `inputs` come back redacted and are replayed from state.

use super::{
    AwxSchemaConfig, Lookup, description_attribute, id_attribute, name_attribute, reference,
};
use awx_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};

const VALID_KINDS: &[&str] = &["cloud", "net"];

/// Returns the schema config for credential_type
pub fn credential_type_config() -> AwxSchemaConfig {
    AwxSchemaConfig::new(
        "credential_types",
        ResourceSchema::new("credential_type")
            .with_description("A custom credential type.")
            .attribute(id_attribute())
            .attribute(name_attribute())
            .attribute(description_attribute())
            .attribute(
                AttributeSchema::new("kind", types::one_of(VALID_KINDS))
                    .required()
                    .with_description("Credential kind: cloud or net"),
            )
            .attribute(
                AttributeSchema::new("inputs", types::json_object())
                    .with_default("{}")
                    .with_description("Input field definitions"),
            )
            .attribute(
                AttributeSchema::new("injectors", types::json_object())
                    .with_default("{}")
                    .with_description("How inputs are injected into jobs"),
            ),
    )
    .lookup(Lookup::by("name").within(&[("kind", "kind")]))
}

/// Returns the schema config for credential
pub fn credential_config() -> AwxSchemaConfig {
    AwxSchemaConfig::new(
        "credentials",
        ResourceSchema::new("credential")
            .with_description("Secrets used to authenticate jobs against external systems.")
            .attribute(id_attribute())
            .attribute(name_attribute())
            .attribute(description_attribute())
            .attribute(reference("organization", "Owning organization"))
            .attribute(reference("credential_type", "Credential type").required())
            .attribute(
                AttributeSchema::new("inputs", types::json_object())
                    .with_default("{}")
                    .with_description("Field values; secret fields are redacted on read"),
            )
            .attribute(
                AttributeSchema::new("kind", AttributeType::String)
                    .computed()
                    .with_description("Namespace of the credential type (read-only)"),
            )
            .attribute(
                AttributeSchema::new("managed", AttributeType::Bool)
                    .computed()
                    .with_description("Whether the controller manages this credential (read-only)"),
            ),
    )
    .lookup(Lookup::by("name").within(&[
        ("organization", "organization"),
        ("credential_type", "credential_type"),
        ("kind", "credential_type__kind"),
    ]))
}
