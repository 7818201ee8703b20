//! schedule schema definition

use super::{
    AwxSchemaConfig, Lookup, UpdateMethod, description_attribute, id_attribute, name_attribute,
    reference,
};
use awx_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};

/// Returns the schema config for schedule
pub fn schedule_config() -> AwxSchemaConfig {
    AwxSchemaConfig::new(
        "schedules",
        ResourceSchema::new("schedule")
            .with_description("Recurring launch of a template.")
            .attribute(id_attribute())
            .attribute(name_attribute())
            .attribute(description_attribute())
            .attribute(
                AttributeSchema::new("rrule", types::rrule())
                    .required()
                    .with_description("iCalendar rule, e.g. 'DTSTART:20240101T000000Z RRULE:FREQ=DAILY;INTERVAL=1'"),
            )
            .attribute(reference("unified_job_template", "Template to launch").required())
            .attribute(AttributeSchema::new("enabled", AttributeType::Bool).with_default(true))
            .attribute(reference("inventory", "Inventory prompted for the launch"))
            .attribute(
                AttributeSchema::new("extra_data", types::json_object())
                    .with_default("{}")
                    .with_description("Extra variables prompted for the launch"),
            )
            .attribute(
                AttributeSchema::new("next_run", AttributeType::String)
                    .computed()
                    .with_description("Next launch time (read-only)"),
            ),
    )
    .lookup(Lookup::by("name").within(&[("unified_job_template", "unified_job_template")]))
    .update_with(UpdateMethod::Patch)
}
