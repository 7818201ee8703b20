//! team schema definition

use super::{
    AwxSchemaConfig, Lookup, description_attribute, id_attribute, name_attribute, reference,
};
use awx_core::schema::ResourceSchema;

/// Returns the schema config for team
pub fn team_config() -> AwxSchemaConfig {
    AwxSchemaConfig::new(
        "teams",
        ResourceSchema::new("team")
            .with_description("A team of users within an organization.")
            .attribute(id_attribute())
            .attribute(name_attribute())
            .attribute(description_attribute())
            .attribute(reference("organization", "Owning organization").required()),
    )
    .gateway()
    .lookup(Lookup::by("name").within(&[("organization", "organization")]))
}
