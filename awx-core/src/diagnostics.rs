//! Diagnostics - Host-facing error and warning reports

use crate::provider::{ErrorKind, ProviderError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub summary: String,
    pub detail: String,
    /// Attribute the diagnostic points at, when known
    pub attribute: Option<String>,
    pub kind: Option<ErrorKind>,
}

impl Diagnostic {
    pub fn error(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            summary: summary.into(),
            detail: detail.into(),
            attribute: None,
            kind: None,
        }
    }

    pub fn warning(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::error(summary, detail)
        }
    }
}

impl From<&ProviderError> for Diagnostic {
    fn from(err: &ProviderError) -> Self {
        Self {
            severity: Severity::Error,
            summary: err.kind.summary().to_string(),
            detail: err.to_string(),
            attribute: err.attribute.clone(),
            kind: Some(err.kind),
        }
    }
}

/// Collected diagnostics for one host call
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.items.push(diagnostic);
    }

    pub fn error(&mut self, summary: impl Into<String>, detail: impl Into<String>) {
        self.push(Diagnostic::error(summary, detail));
    }

    pub fn warning(&mut self, summary: impl Into<String>, detail: impl Into<String>) {
        self.push(Diagnostic::warning(summary, detail));
    }

    /// Record a provider error, unwrapping it into the caller's `Option` flow
    pub fn report<T>(&mut self, result: Result<T, ProviderError>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(err) => {
                self.push(Diagnostic::from(&err));
                None
            }
        }
    }

    pub fn has_errors(&self) -> bool {
        self.items.iter().any(|d| d.severity == Severity::Error)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::ResourceId;

    #[test]
    fn report_records_error_and_returns_none() {
        let mut diags = Diagnostics::new();
        let err = ProviderError::new(ErrorKind::Cardinality, "2 objects matched name 'bob'")
            .for_resource(ResourceId::new("credential", "bob"));
        let value: Option<()> = diags.report(Err(err));
        assert!(value.is_none());
        assert!(diags.has_errors());

        let found: Vec<&Diagnostic> = diags.iter().collect();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].kind, Some(ErrorKind::Cardinality));
        assert_eq!(found[0].summary, "Wrong cardinality returned for lookup");
        assert!(found[0].detail.contains("credential.bob"));
    }

    #[test]
    fn warnings_are_not_errors() {
        let mut diags = Diagnostics::new();
        diags.warning("Label not deleted", "labels are removed by the controller");
        assert!(!diags.has_errors());
        assert_eq!(diags.len(), 1);
    }

    #[test]
    fn attribute_carries_over() {
        let err = ProviderError::type_mismatch("execution_environment", "expected integer");
        let diag = Diagnostic::from(&err);
        assert_eq!(diag.attribute.as_deref(), Some("execution_environment"));
        assert_eq!(diag.summary, "Unexpected type");
    }
}
