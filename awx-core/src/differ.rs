//! Differ - Compare desired state with current state
//!
//! Compares the desired attributes declared by the host with the state last
//! read from the controller. Only attributes the host declared take part, so
//! values the controller computes on its own never show up as drift.

use std::collections::HashMap;

use crate::resource::{Resource, ResourceId, State, Value};
use crate::schema::{AttributeSchema, ResourceSchema};

/// Marker the controller substitutes for secret values on read
pub const ENCRYPTED_SENTINEL: &str = "$encrypted$";

/// Result of a diff operation
#[derive(Debug, Clone, PartialEq)]
pub enum Diff {
    /// Resource does not exist -> needs creation
    Create(Resource),
    /// Resource exists with differences -> needs update
    Update {
        id: ResourceId,
        from: State,
        to: Resource,
        changed_attributes: Vec<String>,
    },
    /// Resource exists with no differences -> no action needed
    NoChange(ResourceId),
    /// Resource exists but not in desired state -> needs deletion
    Delete(ResourceId),
}

impl Diff {
    /// Returns whether this Diff involves a change
    pub fn is_change(&self) -> bool {
        !matches!(self, Diff::NoChange(_))
    }
}

/// Compare desired state with current state to compute a Diff
pub fn diff(desired: &Resource, current: &State, schema: Option<&ResourceSchema>) -> Diff {
    if !current.exists {
        return Diff::Create(desired.clone());
    }

    let changed = find_changed_attributes(&desired.attributes, &current.attributes, schema);

    if changed.is_empty() {
        Diff::NoChange(desired.id.clone())
    } else {
        Diff::Update {
            id: desired.id.clone(),
            from: current.clone(),
            to: desired.clone(),
            changed_attributes: changed,
        }
    }
}

/// Find changed attributes between desired and current state
fn find_changed_attributes(
    desired: &HashMap<String, Value>,
    current: &HashMap<String, Value>,
    schema: Option<&ResourceSchema>,
) -> Vec<String> {
    let mut changed = Vec::new();

    for (key, desired_value) in desired {
        // Skip internal attributes (starting with _)
        if key.starts_with('_') {
            continue;
        }
        let attr = schema.and_then(|s| s.get(key));
        if attr.is_some_and(|a| a.computed) {
            continue;
        }

        match current.get(key) {
            Some(current_value) if values_equivalent(attr, desired_value, current_value) => {}
            _ => changed.push(key.clone()),
        }
    }

    changed.sort();
    changed
}

/// Whether two values mean the same thing for an attribute
pub fn values_equivalent(attr: Option<&AttributeSchema>, a: &Value, b: &Value) -> bool {
    if a == b {
        return true;
    }
    let Some(attr) = attr else {
        return false;
    };

    if attr.sensitive && b.as_str() == Some(ENCRYPTED_SENTINEL) {
        return true;
    }

    if attr.attr_type.is_set() {
        return same_members(a, b);
    }

    if attr.attr_type.is_json()
        && let (Value::String(x), Value::String(y)) = (a, b)
    {
        return json_equivalent(x, y);
    }

    false
}

/// Compare two lists ignoring order (multiset semantics)
pub fn same_members(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::List(x), Value::List(y)) => {
            if x.len() != y.len() {
                return false;
            }
            let mut remaining: Vec<&Value> = y.iter().collect();
            for item in x {
                match remaining.iter().position(|candidate| *candidate == item) {
                    Some(pos) => {
                        remaining.swap_remove(pos);
                    }
                    None => return false,
                }
            }
            true
        }
        _ => a == b,
    }
}

/// Compare a desired JSON document with the current one by decoded value
///
/// A redacted string in `current` matches any string in `desired`.
pub fn json_equivalent(desired: &str, current: &str) -> bool {
    match (
        serde_json::from_str::<serde_json::Value>(desired),
        serde_json::from_str::<serde_json::Value>(current),
    ) {
        (Ok(x), Ok(y)) => json_matches(&x, &y),
        _ => desired == current,
    }
}

fn json_matches(desired: &serde_json::Value, current: &serde_json::Value) -> bool {
    use serde_json::Value as Json;
    match (desired, current) {
        (Json::String(_), Json::String(s)) if s == ENCRYPTED_SENTINEL => true,
        (Json::Object(x), Json::Object(y)) => {
            x.len() == y.len()
                && x
                    .iter()
                    .all(|(k, v)| y.get(k).is_some_and(|w| json_matches(v, w)))
        }
        (Json::Array(x), Json::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(v, w)| json_matches(v, w))
        }
        _ => desired == current,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{AttributeType, types};

    fn schema() -> ResourceSchema {
        ResourceSchema::new("job_template")
            .attribute(AttributeSchema::new("name", AttributeType::String))
            .attribute(AttributeSchema::new("label_ids", types::id_set()))
            .attribute(AttributeSchema::new("instance_group_ids", types::id_list()))
            .attribute(AttributeSchema::new("extra_vars", AttributeType::Json))
            .attribute(AttributeSchema::new("password", AttributeType::String).sensitive())
            .attribute(AttributeSchema::new("status", AttributeType::String).computed())
    }

    fn existing(pairs: Vec<(&str, Value)>) -> State {
        State::existing(
            ResourceId::new("job_template", "deploy"),
            pairs
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        )
    }

    #[test]
    fn diff_create_when_not_exists() {
        let desired = Resource::new("job_template", "deploy");
        let current = State::not_found(ResourceId::new("job_template", "deploy"));

        let result = diff(&desired, &current, None);
        assert!(matches!(result, Diff::Create(_)));
    }

    #[test]
    fn diff_update_when_different() {
        let desired = Resource::new("job_template", "deploy").with_attribute("name", "new");
        let current = existing(vec![("name", Value::from("old"))]);

        match diff(&desired, &current, Some(&schema())) {
            Diff::Update {
                changed_attributes, ..
            } => assert_eq!(changed_attributes, vec!["name".to_string()]),
            other => panic!("Expected Update, got {:?}", other),
        }
    }

    #[test]
    fn set_order_does_not_induce_drift() {
        let desired = Resource::new("job_template", "deploy")
            .with_attribute("label_ids", Value::int_list([5, 3, 8]));
        let current = existing(vec![("label_ids", Value::int_list([3, 5, 8]))]);
        assert!(!diff(&desired, &current, Some(&schema())).is_change());
    }

    #[test]
    fn list_order_is_observable() {
        let desired = Resource::new("job_template", "deploy")
            .with_attribute("instance_group_ids", Value::int_list([3, 5, 8]));
        let current = existing(vec![("instance_group_ids", Value::int_list([3, 8, 5]))]);
        assert!(diff(&desired, &current, Some(&schema())).is_change());
    }

    #[test]
    fn json_key_order_does_not_induce_drift() {
        let desired = Resource::new("job_template", "deploy")
            .with_attribute("extra_vars", r#"{"b": 1, "a": [1, 2]}"#);
        let current = existing(vec![("extra_vars", Value::from(r#"{"a":[1,2],"b":1}"#))]);
        assert!(!diff(&desired, &current, Some(&schema())).is_change());
    }

    #[test]
    fn redacted_secret_is_not_drift() {
        let desired = Resource::new("job_template", "deploy").with_attribute("password", "hunter2");
        let current = existing(vec![("password", Value::from(ENCRYPTED_SENTINEL))]);
        assert!(!diff(&desired, &current, Some(&schema())).is_change());
    }

    #[test]
    fn redacted_nested_secret_is_not_drift() {
        let desired = Resource::new("job_template", "deploy")
            .with_attribute("extra_vars", r#"{"vault": {"password": "", "user": "ops"}}"#);
        let current = existing(vec![(
            "extra_vars",
            Value::from(r#"{"vault":{"password":"$encrypted$","user":"ops"}}"#),
        )]);
        assert!(!diff(&desired, &current, Some(&schema())).is_change());

        let renamed = existing(vec![(
            "extra_vars",
            Value::from(r#"{"vault":{"password":"$encrypted$","user":"dev"}}"#),
        )]);
        assert!(diff(&desired, &renamed, Some(&schema())).is_change());
        assert!(!json_equivalent(r#"{"a": 1}"#, r#"{"a": "$encrypted$"}"#));
    }

    #[test]
    fn same_members_counts_duplicates() {
        assert!(same_members(&Value::int_list([1, 1, 2]), &Value::int_list([1, 2, 1])));
        assert!(!same_members(&Value::int_list([1, 1, 2]), &Value::int_list([1, 2, 2])));
    }
}
