//! notification_template schema definition
//!
//! Secret values inside `notification_configuration` (tokens, passwords) come
//! back redacted and are replayed from state.

use super::{
    AwxSchemaConfig, Lookup, description_attribute, id_attribute, name_attribute, reference,
};
use awx_core::schema::{AttributeSchema, ResourceSchema, types};

const VALID_NOTIFICATION_TYPES: &[&str] = &[
    "email",
    "grafana",
    "irc",
    "mattermost",
    "pagerduty",
    "rocketchat",
    "slack",
    "twilio",
    "webhook",
];

/// Returns the schema config for notification_template
pub fn notification_template_config() -> AwxSchemaConfig {
    AwxSchemaConfig::new(
        "notification_templates",
        ResourceSchema::new("notification_template")
            .with_description("Where and how job notifications are sent.")
            .attribute(id_attribute())
            .attribute(name_attribute())
            .attribute(description_attribute())
            .attribute(reference("organization", "Owning organization").required())
            .attribute(
                AttributeSchema::new("notification_type", types::one_of(VALID_NOTIFICATION_TYPES))
                    .required(),
            )
            .attribute(
                AttributeSchema::new("notification_configuration", types::json_object())
                    .with_default("{}")
                    .with_description("Settings of the notification type"),
            )
            .attribute(
                AttributeSchema::new("messages", types::json_object())
                    .with_description("Custom message templates"),
            ),
    )
    .lookup(Lookup::by("name").within(&[("organization", "organization")]))
}
