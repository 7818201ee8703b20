//! job_template and job_template_survey_spec schema definitions

use super::{
    AwxSchemaConfig, Handler, Lookup, UpdateMethod, description_attribute, id_attribute,
    name_attribute, reference, variables_attribute,
};
use crate::association::Binding;
use awx_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};

const VALID_JOB_TYPES: &[&str] = &["run", "check"];
pub(crate) const VALID_WEBHOOK_SERVICES: &[&str] = &["", "github", "gitlab", "bitbucket_dc"];

const BINDINGS: &[Binding] = &[
    Binding::unordered("credential_ids", "credentials"),
    Binding::unordered("label_ids", "labels"),
    Binding::unordered("notification_template_error_ids", "notification_templates_error"),
    Binding::unordered("notification_template_success_ids", "notification_templates_success"),
    Binding::unordered("notification_template_started_ids", "notification_templates_started"),
    Binding::ordered("instance_group_ids", "instance_groups"),
];

/// Prompt-on-launch flags shared by the template
const ASK_ON_LAUNCH: &[&str] = &[
    "ask_scm_branch_on_launch",
    "ask_diff_mode_on_launch",
    "ask_variables_on_launch",
    "ask_limit_on_launch",
    "ask_tags_on_launch",
    "ask_skip_tags_on_launch",
    "ask_job_type_on_launch",
    "ask_verbosity_on_launch",
    "ask_inventory_on_launch",
    "ask_credential_on_launch",
    "ask_execution_environment_on_launch",
    "ask_labels_on_launch",
    "ask_forks_on_launch",
    "ask_job_slice_count_on_launch",
    "ask_timeout_on_launch",
    "ask_instance_groups_on_launch",
];

fn flag(name: &str) -> AttributeSchema {
    AttributeSchema::new(name, AttributeType::Bool).with_default(false)
}

fn text(name: &str) -> AttributeSchema {
    AttributeSchema::new(name, AttributeType::String).with_default("")
}

fn id_binding(name: &str, description: &str) -> AttributeSchema {
    AttributeSchema::new(name, types::id_set()).with_description(description)
}

/// Returns the schema config for job_template
pub fn job_template_config() -> AwxSchemaConfig {
    let mut schema = ResourceSchema::new("job_template")
        .with_description("A playbook run definition.")
        .attribute(id_attribute())
        .attribute(name_attribute())
        .attribute(description_attribute())
        .attribute(AttributeSchema::new("job_type", types::one_of(VALID_JOB_TYPES)).with_default("run"))
        .attribute(reference("inventory", "Inventory the job runs against"))
        .attribute(reference("project", "Project providing the playbook").required())
        .attribute(
            AttributeSchema::new("playbook", AttributeType::String)
                .required()
                .with_description("Playbook path within the project"),
        )
        .attribute(text("scm_branch"))
        .attribute(AttributeSchema::new("forks", types::int_range(0, i64::MAX)).with_default(0))
        .attribute(text("limit"))
        .attribute(AttributeSchema::new("verbosity", types::int_range(0, 5)).with_default(0))
        .attribute(variables_attribute("extra_vars"))
        .attribute(text("job_tags"))
        .attribute(text("skip_tags"))
        .attribute(text("start_at_task"))
        .attribute(flag("force_handlers"))
        .attribute(AttributeSchema::new("timeout", types::int_range(0, i64::MAX)).with_default(0))
        .attribute(flag("use_fact_cache"))
        .attribute(text("host_config_key"))
        .attribute(flag("survey_enabled"))
        .attribute(flag("become_enabled"))
        .attribute(flag("diff_mode"))
        .attribute(flag("allow_simultaneous"))
        .attribute(flag("prevent_instance_group_fallback"))
        .attribute(
            AttributeSchema::new("job_slice_count", types::positive_int()).with_default(1),
        )
        .attribute(
            AttributeSchema::new("custom_virtualenv", AttributeType::String)
                .with_description("Legacy virtualenv path"),
        )
        .attribute(
            AttributeSchema::new("webhook_service", types::one_of(VALID_WEBHOOK_SERVICES))
                .with_default(""),
        )
        .attribute(reference("webhook_credential", "Credential used to post webhook status"))
        .attribute(reference("execution_environment", "Execution environment jobs run in"))
        .attribute(id_binding("credential_ids", "Credentials applied to jobs"))
        .attribute(id_binding("label_ids", "Labels attached to the template"))
        .attribute(id_binding(
            "notification_template_error_ids",
            "Notification templates fired on failure",
        ))
        .attribute(id_binding(
            "notification_template_success_ids",
            "Notification templates fired on success",
        ))
        .attribute(id_binding(
            "notification_template_started_ids",
            "Notification templates fired on start",
        ))
        .attribute(
            AttributeSchema::new("instance_group_ids", types::id_list())
                .with_description("Instance groups, in preference order"),
        );
    for name in ASK_ON_LAUNCH {
        schema = schema.attribute(flag(name));
    }

    AwxSchemaConfig::new("job_templates", schema)
        .lookup(Lookup::by("name"))
        .bindings(BINDINGS)
}

/// Returns the schema config for job_template_survey_spec
///
/// The survey lives at `job_templates/{id}/survey_spec/`: it is written with
/// POST and removed with DELETE. Its identifier is the template id.
pub fn survey_spec_config() -> AwxSchemaConfig {
    AwxSchemaConfig::new(
        "job_templates",
        ResourceSchema::new("job_template_survey_spec")
            .with_description("Survey questions asked when a job template is launched.")
            .attribute(id_attribute())
            .attribute(
                AttributeSchema::new("job_template_id", types::positive_int())
                    .required()
                    .with_description("Job template the survey belongs to"),
            )
            .attribute(text("name"))
            .attribute(description_attribute())
            .attribute(
                AttributeSchema::new("spec", AttributeType::Json)
                    .required()
                    .with_description("Survey questions as a JSON array"),
            ),
    )
    .update_with(UpdateMethod::Put)
    .path_params(&["job_template_id"])
    .handler(Handler::SurveySpec)
}
