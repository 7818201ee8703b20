//! role_definition and role_assignment schema definitions

use super::{
    AwxSchemaConfig, Handler, Lookup, UpdateMethod, description_attribute, id_attribute,
    name_attribute, reference,
};
use awx_core::schema::{AttributeSchema, AttributeType, Constraint, ResourceSchema};

/// Returns the schema config for role_definition
pub fn role_definition_config() -> AwxSchemaConfig {
    AwxSchemaConfig::new(
        "role_definitions",
        ResourceSchema::new("role_definition")
            .with_description("A named set of permissions on one content type.")
            .attribute(id_attribute())
            .attribute(name_attribute())
            .attribute(description_attribute())
            .attribute(
                AttributeSchema::new("content_type", AttributeType::String)
                    .with_description("Content type the role applies to, e.g. 'awx.inventory'"),
            )
            .attribute(
                AttributeSchema::new(
                    "permissions",
                    AttributeType::Set(Box::new(AttributeType::String)),
                )
                .required()
                .with_description("Permission codenames, e.g. 'awx.view_inventory'"),
            )
            .attribute(
                AttributeSchema::new("managed", AttributeType::Bool)
                    .computed()
                    .with_description("Whether the role is built in (read-only)"),
            ),
    )
    .lookup(Lookup::by("name"))
    .update_with(UpdateMethod::Patch)
}

/// Returns the schema config for role_assignment
///
/// Assignments are posted to `role_user_assignments` or
/// `role_team_assignments` depending on the grantee and cannot be changed.
pub fn role_assignment_config() -> AwxSchemaConfig {
    AwxSchemaConfig::new(
        "role_user_assignments",
        ResourceSchema::new("role_assignment")
            .with_description("Grants a role definition to a user or a team.")
            .attribute(id_attribute())
            .attribute(reference("role_definition", "Role definition granted").required())
            .attribute(reference("user", "User receiving the role"))
            .attribute(reference("team", "Team receiving the role"))
            .attribute(
                AttributeSchema::new("object_id", AttributeType::String)
                    .with_description("Object the role applies to; unset for global roles"),
            )
            .constraint(Constraint::exactly_one_of(&["user", "team"])),
    )
    .update_with(UpdateMethod::Immutable)
    .handler(Handler::RoleAssignment)
}

/// Collection an assignment lives in
pub fn assignment_collection(team: bool) -> &'static str {
    if team {
        "role_team_assignments"
    } else {
        "role_user_assignments"
    }
}
