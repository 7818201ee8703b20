//! label schema definition

use super::{AwxSchemaConfig, Handler, Lookup, id_attribute, name_attribute, reference};
use awx_core::schema::ResourceSchema;

/// Returns the schema config for label
pub fn label_config() -> AwxSchemaConfig {
    AwxSchemaConfig::new(
        "labels",
        ResourceSchema::new("label")
            .with_description("A label; the controller removes unused labels on its own.")
            .attribute(id_attribute())
            .attribute(name_attribute())
            .attribute(reference("organization", "Owning organization").required()),
    )
    .lookup(Lookup::by("name").within(&[("organization", "organization")]))
    .handler(Handler::Label)
}
