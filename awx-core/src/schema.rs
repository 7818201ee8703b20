//! Schema - Define type schemas for resources
//!
//! Each resource adapter declares a schema for its type. Validation runs before
//! any request goes out and reports every violation at once: per-attribute type
//! checks first, then the cross-field constraints.

use std::collections::HashMap;
use std::fmt;

use crate::resource::Value;

/// Attribute type
#[derive(Debug, Clone)]
pub enum AttributeType {
    /// String
    String,
    /// Integer
    Int,
    /// Integer within an inclusive range
    IntRange { min: i64, max: i64 },
    /// Boolean
    Bool,
    /// Enum (list of allowed values)
    Enum(Vec<String>),
    /// Custom type (with validation function)
    Custom {
        name: String,
        base: Box<AttributeType>,
        validate: fn(&Value) -> Result<(), String>,
    },
    /// Ordered list; order is observable
    List(Box<AttributeType>),
    /// Unordered collection; order never induces drift
    Set(Box<AttributeType>),
    /// Map
    Map(Box<AttributeType>),
    /// Opaque JSON document carried as a string
    Json,
}

impl AttributeType {
    /// Check if a value conforms to this type
    pub fn validate(&self, value: &Value) -> Result<(), TypeError> {
        match (self, value) {
            (AttributeType::String, Value::String(_)) => Ok(()),
            (AttributeType::Int, Value::Int(_)) => Ok(()),
            (AttributeType::Bool, Value::Bool(_)) => Ok(()),

            (AttributeType::IntRange { min, max }, Value::Int(n)) => {
                if n >= min && n <= max {
                    Ok(())
                } else {
                    Err(TypeError::OutOfRange {
                        value: *n,
                        min: *min,
                        max: *max,
                    })
                }
            }

            (AttributeType::Enum(variants), Value::String(s)) => {
                if variants.iter().any(|v| v == s) {
                    Ok(())
                } else {
                    Err(TypeError::InvalidEnumVariant {
                        value: s.clone(),
                        expected: variants.clone(),
                    })
                }
            }

            (AttributeType::Custom { validate, base, .. }, v) => {
                base.validate(v)?;
                validate(v).map_err(|msg| TypeError::ValidationFailed { message: msg })
            }

            (AttributeType::List(inner) | AttributeType::Set(inner), Value::List(items)) => {
                for (i, item) in items.iter().enumerate() {
                    inner.validate(item).map_err(|e| TypeError::ListItemError {
                        index: i,
                        inner: Box::new(e),
                    })?;
                }
                Ok(())
            }

            (AttributeType::Map(inner), Value::Map(map)) => {
                for (k, v) in map {
                    inner.validate(v).map_err(|e| TypeError::MapValueError {
                        key: k.clone(),
                        inner: Box::new(e),
                    })?;
                }
                Ok(())
            }

            (AttributeType::Json, Value::String(s)) => serde_json::from_str::<serde_json::Value>(s)
                .map(|_| ())
                .map_err(|e| TypeError::InvalidJson {
                    message: e.to_string(),
                }),

            _ => Err(TypeError::TypeMismatch {
                expected: self.type_name(),
                got: value.type_name(),
            }),
        }
    }

    /// Whether values of this type compare without regard to order
    pub fn is_set(&self) -> bool {
        matches!(self, AttributeType::Set(_))
    }

    pub fn is_json(&self) -> bool {
        match self {
            AttributeType::Json => true,
            AttributeType::Custom { base, .. } => base.is_json(),
            _ => false,
        }
    }

    fn type_name(&self) -> String {
        match self {
            AttributeType::String => "String".to_string(),
            AttributeType::Int => "Int".to_string(),
            AttributeType::IntRange { min, max } => format!("Int({}..={})", min, max),
            AttributeType::Bool => "Bool".to_string(),
            AttributeType::Enum(variants) => format!("Enum({})", variants.join(" | ")),
            AttributeType::Custom { name, .. } => name.clone(),
            AttributeType::List(inner) => format!("List<{}>", inner.type_name()),
            AttributeType::Set(inner) => format!("Set<{}>", inner.type_name()),
            AttributeType::Map(inner) => format!("Map<{}>", inner.type_name()),
            AttributeType::Json => "Json".to_string(),
        }
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.type_name())
    }
}

/// Type error
#[derive(Debug, Clone, thiserror::Error)]
pub enum TypeError {
    #[error("Type mismatch: expected {expected}, got {got}")]
    TypeMismatch { expected: String, got: String },

    #[error("Invalid enum variant '{value}', expected one of: {}", expected.join(", "))]
    InvalidEnumVariant {
        value: String,
        expected: Vec<String>,
    },

    #[error("Value {value} is out of range {min}..={max}")]
    OutOfRange { value: i64, min: i64, max: i64 },

    #[error("Invalid JSON document: {message}")]
    InvalidJson { message: String },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    #[error("Required attribute '{name}' is missing")]
    MissingRequired { name: String },

    #[error("Attribute '{name}' is computed and cannot be set")]
    ComputedAttribute { name: String },

    #[error("Attributes {} conflict, only one may be set", names.join(", "))]
    Conflicting { names: Vec<String> },

    #[error("Exactly one of {} must be set", names.join(", "))]
    ExactlyOneOf { names: Vec<String> },

    #[error("Attributes {} must be set together", names.join(", "))]
    RequiredTogether { names: Vec<String> },

    #[error("'{attribute}' = {value} requires {}", missing.join(", "))]
    RequiredWhen {
        attribute: String,
        value: String,
        missing: Vec<String>,
    },

    #[error("Attribute '{name}': {inner}")]
    AttributeError { name: String, inner: Box<TypeError> },

    #[error("List item at index {index}: {inner}")]
    ListItemError { index: usize, inner: Box<TypeError> },

    #[error("Map value for key '{key}': {inner}")]
    MapValueError { key: String, inner: Box<TypeError> },
}

impl Value {
    fn type_name(&self) -> String {
        match self {
            Value::String(_) => "String".to_string(),
            Value::Int(_) => "Int".to_string(),
            Value::Bool(_) => "Bool".to_string(),
            Value::List(_) => "List".to_string(),
            Value::Map(_) => "Map".to_string(),
        }
    }
}

/// Attribute schema
#[derive(Debug, Clone)]
pub struct AttributeSchema {
    pub name: String,
    pub attr_type: AttributeType,
    pub required: bool,
    /// Populated by the controller only; never sent
    pub computed: bool,
    /// Redacted by the controller on read
    pub sensitive: bool,
    /// Foreign key to another object; sent as `null` when unset on update
    pub reference: bool,
    pub default: Option<Value>,
    pub description: Option<String>,
    /// Wire field name when it differs from the attribute name
    pub provider_name: Option<String>,
}

impl AttributeSchema {
    pub fn new(name: impl Into<String>, attr_type: AttributeType) -> Self {
        Self {
            name: name.into(),
            attr_type,
            required: false,
            computed: false,
            sensitive: false,
            reference: false,
            default: None,
            description: None,
            provider_name: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn computed(mut self) -> Self {
        self.computed = true;
        self
    }

    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    pub fn reference(mut self) -> Self {
        self.reference = true;
        self
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    pub fn with_provider_name(mut self, name: impl Into<String>) -> Self {
        self.provider_name = Some(name.into());
        self
    }

    /// Field name used on the wire
    pub fn wire_name(&self) -> &str {
        self.provider_name.as_deref().unwrap_or(&self.name)
    }
}

/// Cross-field rule checked after per-attribute validation
#[derive(Debug, Clone)]
pub enum Constraint {
    /// At most one of the attributes may be set
    ConflictsWith(Vec<String>),
    /// Exactly one of the attributes must be set
    ExactlyOneOf(Vec<String>),
    /// Either all or none of the attributes are set
    RequiredTogether(Vec<String>),
    /// When `attribute` equals `equals`, every attribute in `requires` must be set
    RequiredWhen {
        attribute: String,
        equals: Value,
        requires: Vec<String>,
    },
}

impl Constraint {
    pub fn conflicts_with(names: &[&str]) -> Self {
        Constraint::ConflictsWith(to_strings(names))
    }

    pub fn exactly_one_of(names: &[&str]) -> Self {
        Constraint::ExactlyOneOf(to_strings(names))
    }

    pub fn required_together(names: &[&str]) -> Self {
        Constraint::RequiredTogether(to_strings(names))
    }

    pub fn required_when(attribute: &str, equals: impl Into<Value>, requires: &[&str]) -> Self {
        Constraint::RequiredWhen {
            attribute: attribute.to_string(),
            equals: equals.into(),
            requires: to_strings(requires),
        }
    }

    /// Check the constraint against a set of attributes
    pub fn check(&self, attributes: &HashMap<String, Value>) -> Result<(), TypeError> {
        let is_set = |name: &str| attributes.contains_key(name);
        match self {
            Constraint::ConflictsWith(names) => {
                let present: Vec<String> = names.iter().filter(|n| is_set(n.as_str())).cloned().collect();
                if present.len() > 1 {
                    return Err(TypeError::Conflicting { names: present });
                }
            }
            Constraint::ExactlyOneOf(names) => {
                if names.iter().filter(|n| is_set(n.as_str())).count() != 1 {
                    return Err(TypeError::ExactlyOneOf {
                        names: names.clone(),
                    });
                }
            }
            Constraint::RequiredTogether(names) => {
                let count = names.iter().filter(|n| is_set(n.as_str())).count();
                if count != 0 && count != names.len() {
                    return Err(TypeError::RequiredTogether {
                        names: names.clone(),
                    });
                }
            }
            Constraint::RequiredWhen {
                attribute,
                equals,
                requires,
            } => {
                if attributes.get(attribute) == Some(equals) {
                    let missing: Vec<String> =
                        requires.iter().filter(|n| !is_set(n.as_str())).cloned().collect();
                    if !missing.is_empty() {
                        return Err(TypeError::RequiredWhen {
                            attribute: attribute.clone(),
                            value: display_value(equals),
                            missing,
                        });
                    }
                }
            }
        }
        Ok(())
    }
}

fn to_strings(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => format!("\"{}\"", s),
        other => other.to_json().to_string(),
    }
}

/// Resource schema
#[derive(Debug, Clone)]
pub struct ResourceSchema {
    pub resource_type: String,
    pub attributes: HashMap<String, AttributeSchema>,
    pub constraints: Vec<Constraint>,
    pub description: Option<String>,
}

impl ResourceSchema {
    pub fn new(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            attributes: HashMap::new(),
            constraints: Vec::new(),
            description: None,
        }
    }

    pub fn attribute(mut self, schema: AttributeSchema) -> Self {
        self.attributes.insert(schema.name.clone(), schema);
        self
    }

    pub fn constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&AttributeSchema> {
        self.attributes.get(name)
    }

    /// Attributes sorted by name, for deterministic payload and state order
    pub fn sorted_attributes(&self) -> Vec<&AttributeSchema> {
        let mut attrs: Vec<&AttributeSchema> = self.attributes.values().collect();
        attrs.sort_by(|a, b| a.name.cmp(&b.name));
        attrs
    }

    /// Validate resource attributes
    pub fn validate(&self, attributes: &HashMap<String, Value>) -> Result<(), Vec<TypeError>> {
        let mut errors = Vec::new();

        for schema in self.sorted_attributes() {
            if schema.required && !attributes.contains_key(&schema.name) && schema.default.is_none()
            {
                errors.push(TypeError::MissingRequired {
                    name: schema.name.clone(),
                });
            }
        }

        let mut names: Vec<&String> = attributes.keys().collect();
        names.sort();
        for name in names {
            // Unknown attributes are allowed (for flexibility)
            let Some(schema) = self.attributes.get(name) else {
                continue;
            };
            if schema.computed {
                errors.push(TypeError::ComputedAttribute { name: name.clone() });
                continue;
            }
            if let Err(e) = schema.attr_type.validate(&attributes[name]) {
                errors.push(TypeError::AttributeError {
                    name: name.clone(),
                    inner: Box::new(e),
                });
            }
        }

        for constraint in &self.constraints {
            if let Err(e) = constraint.check(attributes) {
                errors.push(e);
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Helper functions for common types
pub mod types {
    use std::sync::LazyLock;

    use regex::Regex;

    use super::*;

    /// Positive integer type
    pub fn positive_int() -> AttributeType {
        AttributeType::Custom {
            name: "PositiveInt".to_string(),
            base: Box::new(AttributeType::Int),
            validate: |value| match value {
                Value::Int(n) if *n > 0 => Ok(()),
                Value::Int(_) => Err("Value must be positive".to_string()),
                _ => Err("Expected integer".to_string()),
            },
        }
    }

    /// Integer in `min..=max`
    pub fn int_range(min: i64, max: i64) -> AttributeType {
        AttributeType::IntRange { min, max }
    }

    /// One of a fixed list of strings
    pub fn one_of(values: &[&str]) -> AttributeType {
        AttributeType::Enum(values.iter().map(|s| s.to_string()).collect())
    }

    /// Set of controller object ids
    pub fn id_set() -> AttributeType {
        AttributeType::Set(Box::new(AttributeType::Int))
    }

    /// Ordered list of controller object ids
    pub fn id_list() -> AttributeType {
        AttributeType::List(Box::new(AttributeType::Int))
    }

    /// Opaque JSON document that must be an object
    pub fn json_object() -> AttributeType {
        AttributeType::Custom {
            name: "JsonObject".to_string(),
            base: Box::new(AttributeType::Json),
            validate: |value| match value {
                Value::String(s) => match serde_json::from_str::<serde_json::Value>(s) {
                    Ok(serde_json::Value::Object(_)) => Ok(()),
                    Ok(_) => Err("Expected a JSON object".to_string()),
                    Err(e) => Err(e.to_string()),
                },
                _ => Err("Expected string".to_string()),
            },
        }
    }

    /// iCalendar recurrence rule as accepted by controller schedules
    pub fn rrule() -> AttributeType {
        AttributeType::Custom {
            name: "RRule".to_string(),
            base: Box::new(AttributeType::String),
            validate: |value| match value {
                Value::String(s) => validate_rrule(s),
                _ => Err("Expected string".to_string()),
            },
        }
    }

    static RRULE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"^DTSTART(;TZID=[A-Za-z_/+\-0-9]+)?:\d{8}T\d{6}Z? RRULE:FREQ=(MINUTELY|HOURLY|DAILY|WEEKLY|MONTHLY|YEARLY)(;[A-Z]+=[A-Za-z0-9,+\-]+)*$")
            .expect("rrule pattern is valid")
    });

    /// Validate a schedule rule (e.g., "DTSTART:20240101T000000Z RRULE:FREQ=DAILY;INTERVAL=1")
    pub fn validate_rrule(rule: &str) -> Result<(), String> {
        if RRULE.is_match(rule) {
            Ok(())
        } else {
            Err(format!(
                "Invalid schedule rule '{}': expected 'DTSTART:<timestamp> RRULE:FREQ=<freq>[;...]'",
                rule
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(pairs: &[(&str, Value)]) -> HashMap<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn validate_string_type() {
        let t = AttributeType::String;
        assert!(t.validate(&Value::String("hello".to_string())).is_ok());
        assert!(t.validate(&Value::Int(42)).is_err());
    }

    #[test]
    fn validate_enum_type() {
        let t = types::one_of(&["run", "check"]);
        assert!(t.validate(&Value::from("run")).is_ok());
        assert!(t.validate(&Value::from("scan")).is_err());
    }

    #[test]
    fn validate_int_range() {
        let t = types::int_range(0, 5);
        assert!(t.validate(&Value::Int(0)).is_ok());
        assert!(t.validate(&Value::Int(5)).is_ok());
        assert!(matches!(
            t.validate(&Value::Int(6)),
            Err(TypeError::OutOfRange { value: 6, .. })
        ));
    }

    #[test]
    fn validate_positive_int() {
        let t = types::positive_int();
        assert!(t.validate(&Value::Int(1)).is_ok());
        assert!(t.validate(&Value::Int(0)).is_err());
        assert!(t.validate(&Value::Int(-1)).is_err());
    }

    #[test]
    fn validate_json_object() {
        let t = types::json_object();
        assert!(t.validate(&Value::from(r#"{"a": 1}"#)).is_ok());
        assert!(t.validate(&Value::from("[1, 2]")).is_err());
        assert!(t.validate(&Value::from("{not json")).is_err());
        assert!(AttributeType::Json.validate(&Value::from("[1, 2]")).is_ok());
    }

    #[test]
    fn validate_set_items() {
        let t = types::id_set();
        assert!(t.validate(&Value::int_list([3, 5])).is_ok());
        assert!(
            t.validate(&Value::List(vec![Value::Int(1), Value::from("x")]))
                .is_err()
        );
    }

    #[test]
    fn validate_rrule() {
        let t = types::rrule();
        assert!(
            t.validate(&Value::from(
                "DTSTART;TZID=America/New_York:20240101T090000 RRULE:FREQ=WEEKLY;INTERVAL=1;BYDAY=MO"
            ))
            .is_ok()
        );
        assert!(
            t.validate(&Value::from("DTSTART:20240101T000000Z RRULE:FREQ=DAILY"))
                .is_ok()
        );
        assert!(t.validate(&Value::from("every day")).is_err());
    }

    #[test]
    fn missing_required_attribute() {
        let schema = ResourceSchema::new("organization")
            .attribute(AttributeSchema::new("name", AttributeType::String).required());

        let result = schema.validate(&HashMap::new());
        assert!(matches!(
            result.unwrap_err().as_slice(),
            [TypeError::MissingRequired { .. }]
        ));
    }

    #[test]
    fn computed_attribute_cannot_be_set() {
        let schema = ResourceSchema::new("project")
            .attribute(AttributeSchema::new("status", AttributeType::String).computed());
        let errors = schema
            .validate(&attrs(&[("status", Value::from("ok"))]))
            .unwrap_err();
        assert!(matches!(errors[0], TypeError::ComputedAttribute { .. }));
    }

    #[test]
    fn exactly_one_of_rejects_both_and_neither() {
        let c = Constraint::exactly_one_of(&["id", "name"]);
        assert!(c.check(&attrs(&[("id", Value::Int(1))])).is_ok());
        assert!(c.check(&attrs(&[])).is_err());
        assert!(
            c.check(&attrs(&[("id", Value::Int(1)), ("name", Value::from("a"))]))
                .is_err()
        );
    }

    #[test]
    fn conflicts_with_allows_none() {
        let c = Constraint::conflicts_with(&["user", "team"]);
        assert!(c.check(&attrs(&[])).is_ok());
        assert!(
            c.check(&attrs(&[("user", Value::Int(1)), ("team", Value::Int(2))]))
                .is_err()
        );
    }

    #[test]
    fn required_together() {
        let c = Constraint::required_together(&["name", "inventory"]);
        assert!(c.check(&attrs(&[])).is_ok());
        assert!(
            c.check(&attrs(&[("name", Value::from("web")), ("inventory", Value::Int(3))]))
                .is_ok()
        );
        assert!(c.check(&attrs(&[("name", Value::from("web"))])).is_err());
    }

    #[test]
    fn required_when_source_is_scm() {
        let c = Constraint::required_when("source", "scm", &["source_project", "source_path"]);
        assert!(c.check(&attrs(&[("source", Value::from("ec2"))])).is_ok());
        let err = c
            .check(&attrs(&[
                ("source", Value::from("scm")),
                ("source_project", Value::Int(4)),
            ]))
            .unwrap_err();
        match err {
            TypeError::RequiredWhen { missing, .. } => {
                assert_eq!(missing, vec!["source_path".to_string()])
            }
            other => panic!("Expected RequiredWhen, got {:?}", other),
        }
    }

    #[test]
    fn validate_resource_schema_collects_all_errors() {
        let schema = ResourceSchema::new("job_template")
            .attribute(AttributeSchema::new("name", AttributeType::String).required())
            .attribute(AttributeSchema::new("verbosity", types::int_range(0, 5)))
            .attribute(AttributeSchema::new("job_type", types::one_of(&["run", "check"])));

        let errors = schema
            .validate(&attrs(&[
                ("verbosity", Value::Int(9)),
                ("job_type", Value::from("scan")),
            ]))
            .unwrap_err();
        assert_eq!(errors.len(), 3);
    }
}
