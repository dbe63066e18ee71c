use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use thiserror::Error;

use super::cbc::{Code, Key};

/// Errors returned by the engine and the definition registries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FiscalError {
    /// One or more rules failed. The tree holds every failure, keyed by field path.
    #[error("{0}")]
    Validation(FieldErrors),

    /// A tax combo could not be resolved against the regime's categories.
    #[error("tax rate error: {0}")]
    Rate(#[from] RateError),

    /// A packaged catalogue could not be parsed.
    #[error("catalogue '{name}' could not be loaded: {source}")]
    Catalogue {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    /// No packaged catalogue has the requested name.
    #[error("catalogue '{0}' not packaged")]
    UnknownCatalogue(String),

    /// An amount left the representable `Decimal` range during calculation.
    #[error("arithmetic error: {0}")]
    Arithmetic(String),
}

impl From<FieldErrors> for FiscalError {
    fn from(errs: FieldErrors) -> Self {
        FiscalError::Validation(errs)
    }
}

/// Failure to resolve a `(category, rate, date)` triple to a percentage.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum RateError {
    #[error("category '{0}' not defined")]
    CategoryNotFound(Code),

    #[error("rate '{rate}' not defined in category '{category}'")]
    RateNotFound { category: Code, rate: Key },

    #[error("rate '{rate}' in category '{category}' has no value on {date}")]
    NotValidOnDate {
        category: Code,
        rate: Key,
        date: NaiveDate,
    },
}

/// A single validation error with field path and message.
///
/// This is the flattened form of [`FieldErrors`], handy for callers that
/// want a list rather than a tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dot-separated path to the invalid field (e.g. "preceding.0.ext.co-dian-credit-code").
    pub field: String,
    /// Human-readable error description.
    pub message: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// One node of a [`FieldErrors`] tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorNode {
    Message(String),
    Fields(FieldErrors),
}

/// Tree-shaped validation errors keyed by field name.
///
/// Rendering follows the nested `field: (child: message.).` convention, with
/// keys sorted at every level:
///
/// ```
/// use fiskal::FieldErrors;
///
/// let mut ext = FieldErrors::new();
/// ext.add("co-dian-credit-code", "required");
/// let mut entry = FieldErrors::new();
/// entry.nest("ext", ext);
/// let mut preceding = FieldErrors::new();
/// preceding.nest("0", entry);
/// let mut errs = FieldErrors::new();
/// errs.nest("preceding", preceding);
///
/// assert_eq!(
///     errs.to_string(),
///     "preceding: (0: (ext: (co-dian-credit-code: required.).).)."
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<String, ErrorNode>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Single leaf error at `field`.
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errs = Self::new();
        errs.add(field, message);
        errs
    }

    /// Record a leaf message. An existing entry for the field is kept.
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0
            .entry(field.into())
            .or_insert_with(|| ErrorNode::Message(message.into()));
    }

    /// Attach child errors under `field`. Empty children are ignored.
    pub fn nest(&mut self, field: impl Into<String>, child: FieldErrors) {
        if child.is_empty() {
            return;
        }
        let field = field.into();
        match self.0.get_mut(&field) {
            Some(ErrorNode::Fields(existing)) => existing.merge(child),
            Some(ErrorNode::Message(_)) => {}
            None => {
                self.0.insert(field, ErrorNode::Fields(child));
            }
        }
    }

    /// Merge another tree into this one. Nested nodes merge recursively;
    /// on any other collision the entry already present wins.
    pub fn merge(&mut self, other: FieldErrors) {
        for (field, node) in other.0 {
            match node {
                ErrorNode::Message(msg) => self.add(field, msg),
                ErrorNode::Fields(child) => self.nest(field, child),
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, field: &str) -> Option<&ErrorNode> {
        self.0.get(field)
    }

    /// Look up a nested node by dotted path, e.g. `"lines.0.taxes"`.
    pub fn at(&self, path: &str) -> Option<&ErrorNode> {
        let mut parts = path.split('.');
        let mut node = self.0.get(parts.next()?)?;
        for part in parts {
            match node {
                ErrorNode::Fields(inner) => node = inner.0.get(part)?,
                ErrorNode::Message(_) => return None,
            }
        }
        Some(node)
    }

    /// True when an error exists at the dotted `path`.
    pub fn contains(&self, path: &str) -> bool {
        self.at(path).is_some()
    }

    /// Ok when no errors were recorded.
    pub fn into_result(self) -> Result<(), FieldErrors> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }

    /// Flatten into dotted-path [`ValidationError`]s, in key order.
    pub fn flatten(&self) -> Vec<ValidationError> {
        let mut out = Vec::new();
        self.flatten_into("", &mut out);
        out
    }

    fn flatten_into(&self, prefix: &str, out: &mut Vec<ValidationError>) {
        for (field, node) in &self.0 {
            let path = if prefix.is_empty() {
                field.clone()
            } else {
                format!("{prefix}.{field}")
            };
            match node {
                ErrorNode::Message(msg) => out.push(ValidationError::new(path, msg.clone())),
                ErrorNode::Fields(inner) => inner.flatten_into(&path, out),
            }
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (field, node)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            match node {
                ErrorNode::Message(msg) => write!(f, "{field}: {msg}")?,
                ErrorNode::Fields(inner) => write!(f, "{field}: ({inner})")?,
            }
        }
        if !self.0.is_empty() {
            f.write_str(".")?;
        }
        Ok(())
    }
}

impl std::error::Error for FieldErrors {}
