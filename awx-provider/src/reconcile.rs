//! State reconciliation kernel
//!
//! Moves attribute maps onto the wire and back. Every read is merged with the
//! prior state so that values the controller redacts, reorders or leaves out
//! do not turn into drift:
//!
//! - a secret answered with `$encrypted$` keeps the value from state
//! - a set whose members match state keeps the order from state
//! - a zero value the user never set stays out of state
//! - JSON documents are stored canonically (keys sorted)

use std::collections::HashMap;

use awx_client::codec::{self, Payload, Record, WireField};
use awx_client::{ApiError, ApiResult};
use awx_core::differ::{ENCRYPTED_SENTINEL, same_members};
use awx_core::provider::{ProviderError, ProviderResult};
use awx_core::resource::Value;
use awx_core::schema::{AttributeSchema, AttributeType};
use serde_json::Value as JsonValue;

use crate::schemas::AwxSchemaConfig;

/// How an attribute travels on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Str,
    Int,
    Bool,
    /// JSON document sent as a nested object or array
    Json,
    /// JSON document the controller carries as text
    JsonText,
    List,
    Set,
    Map,
}

impl FieldKind {
    pub fn of(config: &AwxSchemaConfig, attr: &AttributeSchema) -> Self {
        match base_kind(&attr.attr_type) {
            FieldKind::Json if config.is_text_json(&attr.name) => FieldKind::JsonText,
            kind => kind,
        }
    }

    pub fn is_json(&self) -> bool {
        matches!(self, FieldKind::Json | FieldKind::JsonText)
    }
}

fn base_kind(attr_type: &AttributeType) -> FieldKind {
    match attr_type {
        AttributeType::String | AttributeType::Enum(_) => FieldKind::Str,
        AttributeType::Int | AttributeType::IntRange { .. } => FieldKind::Int,
        AttributeType::Bool => FieldKind::Bool,
        AttributeType::Json => FieldKind::Json,
        AttributeType::Custom { base, .. } => base_kind(base),
        AttributeType::List(_) => FieldKind::List,
        AttributeType::Set(_) => FieldKind::Set,
        AttributeType::Map(_) => FieldKind::Map,
    }
}

fn is_enum(attr_type: &AttributeType) -> bool {
    match attr_type {
        AttributeType::Enum(_) => true,
        AttributeType::Custom { base, .. } => is_enum(base),
        _ => false,
    }
}

// =============================================================================
// Wire -> state
// =============================================================================

/// Project a decoded wire field onto the attribute's value type
pub fn project(name: &str, kind: FieldKind, field: WireField) -> ApiResult<Option<Value>> {
    let mismatch = |field: &WireField, expected: &'static str| ApiError::TypeMismatch {
        field: name.to_string(),
        expected,
        got: field.variant_name(),
    };

    match kind {
        FieldKind::Str => Ok(field.into_string(name)?.map(Value::String)),
        FieldKind::Int => match field {
            WireField::Obj(JsonValue::Number(ref n)) => match n.as_f64() {
                Some(f) if f.fract() == 0.0 => Ok(Some(Value::Int(f as i64))),
                _ => Err(mismatch(&field, "integer")),
            },
            other => Ok(other.into_id(name)?.map(Value::Int)),
        },
        FieldKind::Bool => match field {
            WireField::Absent | WireField::Null => Ok(None),
            WireField::Bool(b) => Ok(Some(Value::Bool(b))),
            other => Err(mismatch(&other, "boolean")),
        },
        FieldKind::Json | FieldKind::JsonText => Ok(field.into_json(name)?.map(Value::String)),
        FieldKind::List | FieldKind::Set => match field {
            WireField::Absent | WireField::Null => Ok(None),
            WireField::Obj(ref value @ JsonValue::Array(_)) => Ok(Value::from_json(value)),
            other => Err(mismatch(&other, "array")),
        },
        FieldKind::Map => match field {
            WireField::Absent | WireField::Null => Ok(None),
            WireField::Obj(ref value @ JsonValue::Object(_)) => Ok(Value::from_json(value)),
            other => Err(mismatch(&other, "object")),
        },
    }
}

/// Whether an observed value is the zero value of its kind
fn is_empty_observed(kind: FieldKind, value: &Value) -> bool {
    if value.is_default() {
        return true;
    }
    kind.is_json() && matches!(value.as_str(), Some("{}") | Some("[]"))
}

/// Put secrets from `prior` back where `observed` carries the redaction marker
///
/// Both sides are JSON documents; nested objects are walked key by key. The
/// result is canonical.
pub fn replay_secrets(observed: &str, prior: &str) -> String {
    let (Ok(mut observed_doc), Ok(prior_doc)) = (
        serde_json::from_str::<JsonValue>(observed),
        serde_json::from_str::<JsonValue>(prior),
    ) else {
        return observed.to_string();
    };
    replay_into(&mut observed_doc, &prior_doc);
    codec::canonical_json(&observed_doc)
}

fn replay_into(observed: &mut JsonValue, prior: &JsonValue) {
    let (JsonValue::Object(observed), JsonValue::Object(prior)) = (observed, prior) else {
        return;
    };
    for (key, value) in observed.iter_mut() {
        let Some(previous) = prior.get(key) else {
            continue;
        };
        match value {
            JsonValue::String(s) if s == ENCRYPTED_SENTINEL => {
                if is_concrete_secret(previous) {
                    *value = previous.clone();
                }
            }
            JsonValue::Object(_) => replay_into(value, previous),
            _ => {}
        }
    }
}

fn is_concrete_secret(value: &JsonValue) -> bool {
    match value {
        JsonValue::Null => false,
        JsonValue::String(s) => !s.is_empty() && s != ENCRYPTED_SENTINEL,
        _ => true,
    }
}

/// Merge one observed value with the prior state value
///
/// Returns the value to record, or `None` to leave the attribute unset.
pub fn reconcile_value(
    attr: &AttributeSchema,
    kind: FieldKind,
    prior: Option<&Value>,
    observed: Option<Value>,
) -> Option<Value> {
    if attr.sensitive {
        let redacted = match &observed {
            None => true,
            Some(Value::String(s)) => s == ENCRYPTED_SENTINEL,
            Some(_) => false,
        };
        if redacted {
            return prior.filter(|p| !p.is_default()).cloned();
        }
    }

    let observed = match (kind.is_json(), prior, observed) {
        (true, Some(Value::String(p)), Some(Value::String(o))) if o.contains(ENCRYPTED_SENTINEL) => {
            Some(Value::String(replay_secrets(&o, p)))
        }
        (_, _, observed) => observed,
    };

    if kind == FieldKind::Set
        && let (Some(p), Some(o)) = (prior, &observed)
        && same_members(p, o)
    {
        return Some(p.clone());
    }

    match (prior, observed) {
        (None, Some(o)) if is_empty_observed(kind, &o) => None,
        (_, observed) => observed,
    }
}

/// Build state attributes from a record
///
/// Child bindings are read separately; path parameters are not part of the
/// record and keep their prior value. The `id` attribute is left to the caller.
pub fn read_record(
    config: &AwxSchemaConfig,
    record: &Record,
    prior: &HashMap<String, Value>,
) -> ProviderResult<HashMap<String, Value>> {
    let mut attributes = HashMap::new();

    for attr in config.schema.sorted_attributes() {
        let name = attr.name.as_str();
        if name == "id" || config.binding_for(name).is_some() {
            continue;
        }
        if config.is_path_param(name) {
            if let Some(value) = prior.get(name) {
                attributes.insert(name.to_string(), value.clone());
            }
            continue;
        }

        let kind = FieldKind::of(config, attr);
        let field = WireField::decode(record, attr.wire_name());
        let observed = project(name, kind, field).map_err(ProviderError::from)?;
        if let Some(value) = reconcile_value(attr, kind, prior.get(name), observed) {
            attributes.insert(name.to_string(), value);
        }
    }

    Ok(attributes)
}

// =============================================================================
// State -> wire
// =============================================================================

/// Attributes the user controls: neither computed, bound, nor in the path
fn user_controlled(config: &AwxSchemaConfig, attr: &AttributeSchema) -> bool {
    !attr.computed && config.binding_for(&attr.name).is_none() && !config.is_path_param(&attr.name)
}

/// Encode one attribute value for a request body
pub fn wire_value(
    config: &AwxSchemaConfig,
    attr: &AttributeSchema,
    value: &Value,
) -> ProviderResult<JsonValue> {
    match (FieldKind::of(config, attr), value) {
        (FieldKind::Json, Value::String(raw)) => {
            if raw.trim().is_empty() {
                return Ok(JsonValue::Object(Default::default()));
            }
            serde_json::from_str(raw).map_err(|e| {
                ProviderError::validation(format!("'{}' is not valid JSON: {}", attr.name, e))
                    .on_attribute(attr.name.clone())
            })
        }
        (_, value) => Ok(value.to_json()),
    }
}

/// Body for a create call: only the attributes that are set
pub fn create_payload(
    config: &AwxSchemaConfig,
    attributes: &HashMap<String, Value>,
) -> ProviderResult<Payload> {
    let mut payload = Payload::new();
    for attr in config.schema.sorted_attributes() {
        if !user_controlled(config, attr) {
            continue;
        }
        if let Some(value) = attributes.get(&attr.name) {
            payload.insert(attr.wire_name(), wire_value(config, attr, value)?);
        }
    }
    Ok(payload)
}

/// Body for an update call: every user-controlled attribute
///
/// Unset attributes are sent as their default or zero value so that clearing
/// a field in configuration clears it on the controller. Unset references are
/// sent as `null`. Secrets and enums without a default are left out when unset.
pub fn update_payload(
    config: &AwxSchemaConfig,
    attributes: &HashMap<String, Value>,
) -> ProviderResult<Payload> {
    let mut payload = Payload::new();
    for attr in config.schema.sorted_attributes() {
        if !user_controlled(config, attr) {
            continue;
        }
        let value = match attributes.get(&attr.name).or(attr.default.as_ref()) {
            Some(value) => wire_value(config, attr, value)?,
            None if attr.reference => {
                payload = payload.set_null(attr.wire_name());
                continue;
            }
            None => match unset_value(config, attr) {
                Some(value) => value,
                None => continue,
            },
        };
        payload.insert(attr.wire_name(), value);
    }
    Ok(payload)
}

fn unset_value(config: &AwxSchemaConfig, attr: &AttributeSchema) -> Option<JsonValue> {
    if attr.sensitive || is_enum(&attr.attr_type) {
        return None;
    }
    match FieldKind::of(config, attr) {
        FieldKind::Str | FieldKind::JsonText => Some(JsonValue::String(String::new())),
        FieldKind::Int => Some(JsonValue::from(0)),
        FieldKind::Bool => Some(JsonValue::Bool(false)),
        FieldKind::Json | FieldKind::Map => Some(JsonValue::Object(Default::default())),
        FieldKind::List | FieldKind::Set => Some(JsonValue::Array(Vec::new())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schemas::get_schema_config;
    use serde_json::json;

    fn record(value: JsonValue) -> Record {
        match value {
            JsonValue::Object(map) => map,
            _ => panic!("Expected object"),
        }
    }

    fn attrs(pairs: &[(&str, Value)]) -> HashMap<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn kinds_follow_attribute_types() {
        let config = get_schema_config("instance_group").unwrap();
        let kind = |name: &str| FieldKind::of(config, config.schema.get(name).unwrap());
        assert_eq!(kind("name"), FieldKind::Str);
        assert_eq!(kind("pod_spec_override"), FieldKind::JsonText);
        assert_eq!(kind("is_container_group"), FieldKind::Bool);

        let config = get_schema_config("job_template").unwrap();
        let kind = |name: &str| FieldKind::of(config, config.schema.get(name).unwrap());
        assert_eq!(kind("job_slice_count"), FieldKind::Int);
        assert_eq!(kind("label_ids"), FieldKind::Set);
        assert_eq!(kind("instance_group_ids"), FieldKind::List);
        assert_eq!(kind("job_type"), FieldKind::Str);
    }

    #[test]
    fn polymorphic_reference_projects_onto_id() {
        let summary = WireField::from_json(&json!({"id": 4, "name": "ee"}));
        assert_eq!(
            project("execution_environment", FieldKind::Int, summary).unwrap(),
            Some(Value::Int(4))
        );
        assert_eq!(
            project("execution_environment", FieldKind::Int, WireField::Null).unwrap(),
            None
        );
    }

    #[test]
    fn unexpected_variant_is_type_mismatch() {
        let err = project(
            "custom_virtualenv",
            FieldKind::Str,
            WireField::from_json(&json!({"path": "/venv"})),
        )
        .unwrap_err();
        assert!(matches!(err, ApiError::TypeMismatch { ref field, .. } if field == "custom_virtualenv"));

        let err = project("enabled", FieldKind::Bool, WireField::Str("yes".into())).unwrap_err();
        assert!(matches!(err, ApiError::TypeMismatch { expected: "boolean", got: "string", .. }));
    }

    #[test]
    fn integral_float_projects_onto_int() {
        let field = WireField::from_json(&json!(30.0));
        assert_eq!(project("timeout", FieldKind::Int, field).unwrap(), Some(Value::Int(30)));
    }

    #[test]
    fn secrets_are_replayed_from_prior() {
        let merged = replay_secrets(
            r#"{"username":"u","password":"$encrypted$"}"#,
            r#"{"password":"hunter2","username":"u"}"#,
        );
        assert_eq!(merged, r#"{"password":"hunter2","username":"u"}"#);
    }

    #[test]
    fn redacted_secret_without_prior_stays_redacted() {
        let merged = replay_secrets(r#"{"password":"$encrypted$"}"#, r#"{"password":""}"#);
        assert_eq!(merged, r#"{"password":"$encrypted$"}"#);
    }

    #[test]
    fn nested_secrets_are_replayed() {
        let merged = replay_secrets(
            r#"{"headers":{"token":"$encrypted$"},"url":"https://hook"}"#,
            r#"{"headers":{"token":"abc"},"url":"https://old"}"#,
        );
        assert_eq!(merged, r#"{"headers":{"token":"abc"},"url":"https://hook"}"#);
    }

    #[test]
    fn sensitive_attribute_keeps_prior() {
        let attr = AttributeSchema::new("password", AttributeType::String).sensitive();
        let prior = Value::from("s3cret");
        assert_eq!(
            reconcile_value(&attr, FieldKind::Str, Some(&prior), Some(Value::from("$encrypted$"))),
            Some(prior.clone())
        );
        assert_eq!(reconcile_value(&attr, FieldKind::Str, Some(&prior), None), Some(prior));
        assert_eq!(
            reconcile_value(&attr, FieldKind::Str, None, Some(Value::from("$encrypted$"))),
            None
        );
    }

    #[test]
    fn zero_value_without_prior_is_suppressed() {
        let attr = AttributeSchema::new("limit", AttributeType::String);
        assert_eq!(reconcile_value(&attr, FieldKind::Str, None, Some(Value::from(""))), None);

        let prior = Value::from("");
        assert_eq!(
            reconcile_value(&attr, FieldKind::Str, Some(&prior), Some(Value::from(""))),
            Some(Value::from(""))
        );
        assert_eq!(
            reconcile_value(&attr, FieldKind::Str, None, Some(Value::from("web"))),
            Some(Value::from("web"))
        );

        let json = AttributeSchema::new("extra_data", AttributeType::Json);
        assert_eq!(reconcile_value(&json, FieldKind::Json, None, Some(Value::from("{}"))), None);
    }

    #[test]
    fn reordered_set_keeps_prior_order() {
        let attr = AttributeSchema::new("label_ids", awx_core::schema::types::id_set());
        let prior = Value::int_list([5, 3]);
        assert_eq!(
            reconcile_value(&attr, FieldKind::Set, Some(&prior), Some(Value::int_list([3, 5]))),
            Some(prior)
        );

        let attr = AttributeSchema::new("instance_group_ids", awx_core::schema::types::id_list());
        let prior = Value::int_list([5, 3]);
        assert_eq!(
            reconcile_value(&attr, FieldKind::List, Some(&prior), Some(Value::int_list([3, 5]))),
            Some(Value::int_list([3, 5]))
        );
    }

    #[test]
    fn read_record_canonicalises_and_replays() {
        let config = get_schema_config("credential").unwrap();
        let prior = attrs(&[
            ("name", Value::from("deploy")),
            ("credential_type", Value::Int(1)),
            ("inputs", Value::from(r#"{"username": "u", "password": "hunter2"}"#)),
        ]);
        let body = record(json!({
            "id": 12,
            "name": "deploy",
            "description": "",
            "organization": null,
            "credential_type": 1,
            "inputs": {"username": "u", "password": "$encrypted$"},
            "kind": "ssh",
            "managed": false
        }));

        let state = read_record(config, &body, &prior).unwrap();
        assert_eq!(
            state.get("inputs"),
            Some(&Value::from(r#"{"password":"hunter2","username":"u"}"#))
        );
        assert_eq!(state.get("kind"), Some(&Value::from("ssh")));
        assert!(!state.contains_key("description"));
        assert!(!state.contains_key("organization"));
        assert!(!state.contains_key("managed"));
        assert!(!state.contains_key("id"));
    }

    #[test]
    fn read_record_is_a_fixed_point() {
        let config = get_schema_config("credential_type").unwrap();
        let body = record(json!({
            "id": 7,
            "name": "alpha",
            "description": "",
            "kind": "cloud",
            "inputs": {"fields": [{"id": "token", "type": "string", "label": "Token"}]},
            "injectors": {}
        }));
        let desired = attrs(&[("name", Value::from("alpha")), ("kind", Value::from("cloud"))]);

        let first = read_record(config, &body, &desired).unwrap();
        let second = read_record(config, &body, &first).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn path_params_keep_prior_value() {
        let config = get_schema_config("job_template_survey_spec").unwrap();
        let prior = attrs(&[
            ("job_template_id", Value::Int(5)),
            ("spec", Value::from("[]")),
        ]);
        let body = record(json!({"name": "", "description": "", "spec": [{"variable": "x"}]}));
        let state = read_record(config, &body, &prior).unwrap();
        assert_eq!(state.get("job_template_id"), Some(&Value::Int(5)));
        assert_eq!(state.get("spec"), Some(&Value::from(r#"[{"variable":"x"}]"#)));
    }

    #[test]
    fn create_payload_omits_unset_and_computed() {
        let config = get_schema_config("credential_type").unwrap();
        let payload = create_payload(
            config,
            &attrs(&[("name", Value::from("alpha")), ("kind", Value::from("cloud"))]),
        )
        .unwrap();
        assert_eq!(payload.into_value(), json!({"name": "alpha", "kind": "cloud"}));
    }

    #[test]
    fn create_payload_parses_json_attributes() {
        let config = get_schema_config("credential").unwrap();
        let payload = create_payload(
            config,
            &attrs(&[
                ("name", Value::from("c")),
                ("credential_type", Value::Int(3)),
                ("inputs", Value::from(r#"{"token": "t"}"#)),
            ]),
        )
        .unwrap();
        assert_eq!(payload.get("inputs"), Some(&json!({"token": "t"})));
    }

    #[test]
    fn text_json_is_sent_as_text() {
        let config = get_schema_config("instance_group").unwrap();
        let payload = create_payload(
            config,
            &attrs(&[
                ("name", Value::from("ig")),
                ("pod_spec_override", Value::from("apiVersion: v1\nkind: Pod\n")),
            ]),
        )
        .unwrap();
        assert_eq!(
            payload.get("pod_spec_override"),
            Some(&json!("apiVersion: v1\nkind: Pod\n"))
        );
    }

    #[test]
    fn bindings_stay_out_of_payloads() {
        let config = get_schema_config("job_template").unwrap();
        let payload = create_payload(
            config,
            &attrs(&[
                ("name", Value::from("jt")),
                ("project", Value::Int(2)),
                ("playbook", Value::from("site.yml")),
                ("label_ids", Value::int_list([1, 2])),
            ]),
        )
        .unwrap();
        assert!(!payload.contains("label_ids"));
        assert!(!payload.contains("labels"));
    }

    #[test]
    fn update_payload_clears_unset_fields() {
        let config = get_schema_config("host").unwrap();
        let payload = update_payload(
            config,
            &attrs(&[("name", Value::from("web1")), ("inventory", Value::Int(3))]),
        )
        .unwrap();
        assert_eq!(payload.get("description"), Some(&json!("")));
        assert_eq!(payload.get("variables"), Some(&json!("")));
        assert_eq!(payload.get("enabled"), Some(&json!(true)));
        assert_eq!(payload.get("inventory"), Some(&json!(3)));
        assert!(!payload.contains("id"));
    }

    #[test]
    fn update_payload_nulls_unset_references_and_skips_secrets() {
        let config = get_schema_config("job_template").unwrap();
        let payload = update_payload(
            config,
            &attrs(&[
                ("name", Value::from("jt")),
                ("project", Value::Int(2)),
                ("playbook", Value::from("site.yml")),
            ]),
        )
        .unwrap();
        assert_eq!(payload.get("inventory"), Some(&JsonValue::Null));
        assert_eq!(payload.get("execution_environment"), Some(&JsonValue::Null));

        let config = get_schema_config("user").unwrap();
        let payload =
            update_payload(config, &attrs(&[("username", Value::from("ann"))])).unwrap();
        assert!(!payload.contains("password"));
    }

    #[test]
    fn invalid_json_is_a_validation_error() {
        let config = get_schema_config("credential_type").unwrap();
        let err = create_payload(
            config,
            &attrs(&[
                ("name", Value::from("alpha")),
                ("kind", Value::from("cloud")),
                ("inputs", Value::from("{not json")),
            ]),
        )
        .unwrap_err();
        assert_eq!(err.kind, awx_core::provider::ErrorKind::Validation);
        assert_eq!(err.attribute.as_deref(), Some("inputs"));
    }
}
