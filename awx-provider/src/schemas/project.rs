//! project schema definition

use super::{
    AwxSchemaConfig, Lookup, description_attribute, id_attribute, name_attribute, reference,
};
use awx_core::schema::{AttributeSchema, AttributeType, Constraint, ResourceSchema, types};

const VALID_SCM_TYPES: &[&str] = &["", "git", "svn", "insights", "archive"];

/// Returns the schema config for project
pub fn project_config() -> AwxSchemaConfig {
    AwxSchemaConfig::new(
        "projects",
        ResourceSchema::new("project")
            .with_description("A source of playbooks.")
            .attribute(id_attribute())
            .attribute(name_attribute())
            .attribute(description_attribute())
            .attribute(reference("organization", "Owning organization"))
            .attribute(
                AttributeSchema::new("scm_type", types::one_of(VALID_SCM_TYPES))
                    .with_default("")
                    .with_description("Empty for a manual project"),
            )
            .attribute(AttributeSchema::new("scm_url", AttributeType::String).with_default(""))
            .attribute(AttributeSchema::new("scm_branch", AttributeType::String).with_default(""))
            .attribute(AttributeSchema::new("scm_refspec", AttributeType::String).with_default(""))
            .attribute(AttributeSchema::new("scm_clean", AttributeType::Bool).with_default(false))
            .attribute(
                AttributeSchema::new("scm_delete_on_update", AttributeType::Bool)
                    .with_default(false),
            )
            .attribute(
                AttributeSchema::new("scm_track_submodules", AttributeType::Bool)
                    .with_default(false),
            )
            .attribute(
                AttributeSchema::new("scm_update_on_launch", AttributeType::Bool)
                    .with_default(false),
            )
            .attribute(
                AttributeSchema::new("scm_update_cache_timeout", types::int_range(0, i64::MAX))
                    .with_default(0),
            )
            .attribute(
                AttributeSchema::new("allow_override", AttributeType::Bool).with_default(false),
            )
            .attribute(reference("credential", "Source control credential"))
            .attribute(reference(
                "signature_validation_credential",
                "Credential used to verify content signatures",
            ))
            .attribute(reference("default_environment", "Default execution environment"))
            .attribute(
                AttributeSchema::new("local_path", AttributeType::String)
                    .with_default("")
                    .with_description("Directory under the projects root for manual projects"),
            )
            .attribute(AttributeSchema::new("timeout", types::int_range(0, i64::MAX)).with_default(0))
            .attribute(
                AttributeSchema::new("status", AttributeType::String)
                    .computed()
                    .with_description("Last update status (read-only)"),
            )
            .constraint(Constraint::required_when("scm_type", "git", &["scm_url"]))
            .constraint(Constraint::required_when("scm_type", "svn", &["scm_url"]))
            .constraint(Constraint::required_when("scm_type", "archive", &["scm_url"])),
    )
    .lookup(Lookup::by("name").within(&[("organization", "organization")]))
}
