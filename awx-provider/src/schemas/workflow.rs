//! workflow_job_template, workflow_job_template_node and
//! workflow_job_template_approval_node schema definitions

use super::job_template::VALID_WEBHOOK_SERVICES;
use super::{
    AwxSchemaConfig, Handler, Lookup, UpdateMethod, description_attribute, id_attribute,
    name_attribute, reference, variables_attribute,
};
use crate::association::Binding;
use awx_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};

const WORKFLOW_BINDINGS: &[Binding] = &[
    Binding::unordered("notification_template_error_ids", "notification_templates_error"),
    Binding::unordered("notification_template_success_ids", "notification_templates_success"),
    Binding::unordered("notification_template_started_ids", "notification_templates_started"),
    Binding::unordered(
        "notification_template_approval_ids",
        "notification_templates_approvals",
    ),
    Binding::unordered("label_ids", "labels"),
];

const NODE_BINDINGS: &[Binding] = &[
    Binding::unordered("success_node_ids", "success_nodes"),
    Binding::unordered("failure_node_ids", "failure_nodes"),
    Binding::unordered("always_node_ids", "always_nodes"),
];

const VALID_JOB_TYPES: &[&str] = &["", "run", "check"];

fn flag(name: &str) -> AttributeSchema {
    AttributeSchema::new(name, AttributeType::Bool).with_default(false)
}

fn id_set(name: &str, description: &str) -> AttributeSchema {
    AttributeSchema::new(name, types::id_set()).with_description(description)
}

/// Returns the schema config for workflow_job_template
pub fn workflow_job_template_config() -> AwxSchemaConfig {
    AwxSchemaConfig::new(
        "workflow_job_templates",
        ResourceSchema::new("workflow_job_template")
            .with_description("A graph of job templates run as one workflow.")
            .attribute(id_attribute())
            .attribute(name_attribute())
            .attribute(description_attribute())
            .attribute(reference("organization", "Owning organization"))
            .attribute(reference("inventory", "Inventory applied to every node"))
            .attribute(AttributeSchema::new("limit", AttributeType::String).with_default(""))
            .attribute(AttributeSchema::new("scm_branch", AttributeType::String).with_default(""))
            .attribute(variables_attribute("extra_vars"))
            .attribute(flag("survey_enabled"))
            .attribute(flag("allow_simultaneous"))
            .attribute(flag("ask_variables_on_launch"))
            .attribute(flag("ask_inventory_on_launch"))
            .attribute(flag("ask_scm_branch_on_launch"))
            .attribute(flag("ask_limit_on_launch"))
            .attribute(flag("ask_labels_on_launch"))
            .attribute(
                AttributeSchema::new("webhook_service", types::one_of(VALID_WEBHOOK_SERVICES))
                    .with_default(""),
            )
            .attribute(reference("webhook_credential", "Credential used to post webhook status"))
            .attribute(id_set(
                "notification_template_error_ids",
                "Notification templates fired on failure",
            ))
            .attribute(id_set(
                "notification_template_success_ids",
                "Notification templates fired on success",
            ))
            .attribute(id_set(
                "notification_template_started_ids",
                "Notification templates fired on start",
            ))
            .attribute(id_set(
                "notification_template_approval_ids",
                "Notification templates fired on approval requests",
            ))
            .attribute(id_set("label_ids", "Labels attached to the workflow")),
    )
    .lookup(Lookup::by("name").within(&[("organization", "organization")]))
    .bindings(WORKFLOW_BINDINGS)
}

/// Returns the schema config for workflow_job_template_node
pub fn workflow_job_template_node_config() -> AwxSchemaConfig {
    AwxSchemaConfig::new(
        "workflow_job_template_nodes",
        ResourceSchema::new("workflow_job_template_node")
            .with_description("A node of a workflow graph.")
            .attribute(id_attribute())
            .attribute(reference("workflow_job_template", "Workflow the node belongs to").required())
            .attribute(reference("unified_job_template", "Template the node runs"))
            .attribute(
                AttributeSchema::new("identifier", AttributeType::String)
                    .with_description("Identifier unique within the workflow"),
            )
            .attribute(reference("inventory", "Inventory prompted for the node"))
            .attribute(
                AttributeSchema::new("extra_data", types::json_object())
                    .with_default("{}")
                    .with_description("Extra variables prompted for the node"),
            )
            .attribute(AttributeSchema::new("scm_branch", AttributeType::String))
            .attribute(AttributeSchema::new("job_type", types::one_of(VALID_JOB_TYPES)))
            .attribute(AttributeSchema::new("job_tags", AttributeType::String))
            .attribute(AttributeSchema::new("skip_tags", AttributeType::String))
            .attribute(AttributeSchema::new("limit", AttributeType::String))
            .attribute(AttributeSchema::new("diff_mode", AttributeType::Bool))
            .attribute(AttributeSchema::new("verbosity", types::int_range(0, 5)))
            .attribute(flag("all_parents_must_converge"))
            .attribute(id_set("success_node_ids", "Nodes run when this node succeeds"))
            .attribute(id_set("failure_node_ids", "Nodes run when this node fails"))
            .attribute(id_set("always_node_ids", "Nodes run whatever the outcome")),
    )
    .update_with(UpdateMethod::Patch)
    .bindings(NODE_BINDINGS)
}

/// Returns the schema config for workflow_job_template_approval_node
///
/// The node is created first; its approval template is then created through
/// the node's `create_approval_template/` sub-resource. `timeout` is integer
/// seconds and is omitted when unset.
pub fn approval_node_config() -> AwxSchemaConfig {
    AwxSchemaConfig::new(
        "workflow_job_template_nodes",
        ResourceSchema::new("workflow_job_template_approval_node")
            .with_description("A workflow node that waits for a manual approval.")
            .attribute(id_attribute())
            .attribute(reference("workflow_job_template", "Workflow the node belongs to").required())
            .attribute(
                AttributeSchema::new("identifier", AttributeType::String)
                    .with_description("Identifier unique within the workflow"),
            )
            .attribute(name_attribute())
            .attribute(description_attribute())
            .attribute(
                AttributeSchema::new("timeout", types::int_range(0, i64::MAX))
                    .with_description("Seconds to wait for approval; unset waits forever"),
            )
            .attribute(
                AttributeSchema::new("approval_template_id", AttributeType::Int)
                    .computed()
                    .with_description("Approval template created for the node (read-only)"),
            ),
    )
    .update_with(UpdateMethod::Patch)
    .handler(Handler::ApprovalNode)
}
