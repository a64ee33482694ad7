//! Structural validation — the contract request and response models implement.
//!
//! Models describe their own rules by implementing [`Validate`]; the engine
//! entry point [`try_validate`] collects every finding without
//! short-circuiting, so a caller sees all problems at once. The helpers
//! below cover the common rules (required fields, numeric ranges, declared
//! membership); anything beyond that is plain Rust inside the model's
//! `validate`.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One validation finding: a human-readable message, plus the offending
/// field's path when the rule concerns a single field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub message: String,
    #[serde(
        rename = "fieldPath",
        skip_serializing_if = "Option::is_none",
        default
    )]
    pub field_path: Option<String>,
}

impl ValidationIssue {
    /// Finding not tied to a single field.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            field_path: None,
        }
    }

    /// Finding scoped to one field path (e.g. `"email"`, `"items[2].sku"`).
    pub fn for_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            field_path: Some(field.into()),
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.field_path {
            Some(path) => write!(f, "{path}: {}", self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// Implemented by request and response models that carry structural rules.
///
/// The default body reports nothing, so rule-free models opt in with an
/// empty `impl Validate for T {}`.
pub trait Validate {
    /// Appends a [`ValidationIssue`] per violated rule. Must not panic and
    /// must not depend on anything but the value itself, so repeated runs
    /// over an unchanged value report identical findings.
    fn validate(&self, issues: &mut Vec<ValidationIssue>) {
        let _ = issues;
    }
}

/// Engine entry point: runs `value`'s rules and reports
/// `(is_valid, findings)`. Findings are returned, never thrown.
pub fn try_validate<V: Validate + ?Sized>(value: &V) -> (bool, Vec<ValidationIssue>) {
    let mut issues = Vec::new();
    value.validate(&mut issues);
    (issues.is_empty(), issues)
}

// Plain data types carry no rules of their own, so responses like `String`
// or `()` need no wrapper.
macro_rules! rule_free {
    ($($ty:ty),* $(,)?) => {
        $(impl Validate for $ty {})*
    };
}

rule_free!(
    (),
    bool,
    char,
    i8,
    i16,
    i32,
    i64,
    i128,
    u8,
    u16,
    u32,
    u64,
    u128,
    usize,
    isize,
    f32,
    f64,
    String,
);

impl<T: Validate> Validate for Option<T> {
    fn validate(&self, issues: &mut Vec<ValidationIssue>) {
        if let Some(value) = self {
            value.validate(issues);
        }
    }
}

impl<T: Validate> Validate for Vec<T> {
    fn validate(&self, issues: &mut Vec<ValidationIssue>) {
        for value in self {
            value.validate(issues);
        }
    }
}

impl<T: Validate + ?Sized> Validate for Box<T> {
    fn validate(&self, issues: &mut Vec<ValidationIssue>) {
        (**self).validate(issues);
    }
}

// ── rule helpers ─────────────────────────────────────────────────────────────

/// Flags `field` when the string is empty or whitespace-only.
pub fn require_non_empty(issues: &mut Vec<ValidationIssue>, field: &str, value: &str) {
    if value.trim().is_empty() {
        issues.push(ValidationIssue::for_field(field, "must not be empty"));
    }
}

/// Flags `field` when a required optional value is absent.
pub fn require_present<T>(issues: &mut Vec<ValidationIssue>, field: &str, value: &Option<T>) {
    if value.is_none() {
        issues.push(ValidationIssue::for_field(field, "must be provided"));
    }
}

/// Flags `field` when the value falls outside `[min, max]`. An incomparable
/// value (a floating-point NaN) is outside every range.
pub fn require_in_range<T>(issues: &mut Vec<ValidationIssue>, field: &str, value: T, min: T, max: T)
where
    T: PartialOrd + fmt::Display,
{
    let range = min..=max;
    if !range.contains(&value) {
        issues.push(ValidationIssue::for_field(
            field,
            format!(
                "must be between {} and {} (got {value})",
                range.start(),
                range.end()
            ),
        ));
    }
}

/// Flags `field` when the value matches none of the declared members.
pub fn require_one_of<T>(issues: &mut Vec<ValidationIssue>, field: &str, value: &T, allowed: &[T])
where
    T: PartialEq + fmt::Display,
{
    if !allowed.contains(value) {
        let members = allowed
            .iter()
            .map(T::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        issues.push(ValidationIssue::for_field(
            field,
            format!("must be one of [{members}] (got {value})"),
        ));
    }
}

// ── tests ─────────────────────────────────────────────────────────────────────
