//! Resource type definitions
//!
//! One `ResourceType` per managed object. Schemas come from [`crate::schemas`];
//! every type with a lookup field can also be read as a data source.

use awx_core::provider::ResourceType;
use awx_core::schema::ResourceSchema;

use crate::schemas::get_schema_config;

// =============================================================================
// Resource Type Definitions
// =============================================================================

macro_rules! define_resource_type {
    ($name:ident, $type_name:expr) => {
        pub struct $name;
        impl ResourceType for $name {
            fn name(&self) -> &'static str {
                $type_name
            }
            fn schema(&self) -> ResourceSchema {
                get_schema_config($type_name)
                    .map(|config| config.schema.clone())
                    .unwrap_or_else(|| ResourceSchema::new($type_name))
            }
            fn has_data_source(&self) -> bool {
                get_schema_config($type_name).is_some_and(|config| config.lookup.is_some())
            }
        }
    };
}

define_resource_type!(OrganizationType, "organization");
define_resource_type!(UserType, "user");
define_resource_type!(TeamType, "team");
define_resource_type!(CredentialTypeType, "credential_type");
define_resource_type!(CredentialType, "credential");
define_resource_type!(InventoryType, "inventory");
define_resource_type!(HostType, "host");
define_resource_type!(GroupType, "group");
define_resource_type!(InventorySourceType, "inventory_source");
define_resource_type!(ProjectType, "project");
define_resource_type!(ExecutionEnvironmentType, "execution_environment");
define_resource_type!(LabelType, "label");
define_resource_type!(InstanceGroupType, "instance_group");
define_resource_type!(JobTemplateType, "job_template");
define_resource_type!(JobTemplateSurveySpecType, "job_template_survey_spec");
define_resource_type!(WorkflowJobTemplateType, "workflow_job_template");
define_resource_type!(WorkflowJobTemplateNodeType, "workflow_job_template_node");
define_resource_type!(
    WorkflowJobTemplateApprovalNodeType,
    "workflow_job_template_approval_node"
);
define_resource_type!(ScheduleType, "schedule");
define_resource_type!(NotificationTemplateType, "notification_template");
define_resource_type!(RoleDefinitionType, "role_definition");
define_resource_type!(RoleAssignmentType, "role_assignment");

/// Returns all resource types supported by this provider
pub fn resource_types() -> Vec<Box<dyn ResourceType>> {
    vec![
        Box::new(OrganizationType),
        Box::new(UserType),
        Box::new(TeamType),
        Box::new(CredentialTypeType),
        Box::new(CredentialType),
        Box::new(InventoryType),
        Box::new(HostType),
        Box::new(GroupType),
        Box::new(InventorySourceType),
        Box::new(ProjectType),
        Box::new(ExecutionEnvironmentType),
        Box::new(LabelType),
        Box::new(InstanceGroupType),
        Box::new(JobTemplateType),
        Box::new(JobTemplateSurveySpecType),
        Box::new(WorkflowJobTemplateType),
        Box::new(WorkflowJobTemplateNodeType),
        Box::new(WorkflowJobTemplateApprovalNodeType),
        Box::new(ScheduleType),
        Box::new(NotificationTemplateType),
        Box::new(RoleDefinitionType),
        Box::new(RoleAssignmentType),
    ]
}
