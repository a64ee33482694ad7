//! Per-dispatch context — invocation identity, the request value, accumulated
//! validation findings, and the caller's cancellation signal.

use std::fmt;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::InteractionError;
use crate::validate::ValidationIssue;

/// Identity of one dispatched interaction.
///
/// Minted once per dispatch and never reused. Validation failures carry the
/// id they were produced under, which is how a stray failure smuggled out of
/// a nested dispatch is told apart from a failure of the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InvocationId(Uuid);

impl InvocationId {
    /// Mints a fresh id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for InvocationId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for InvocationId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl fmt::Display for InvocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Carries one interaction through its dispatch.
///
/// Owns the request value for the duration of the invocation. Findings are
/// recorded before the handler runs; the handler decides whether they abort
/// via [`InteractionContext::ensure_valid`] (the validation decorator does
/// this uniformly when installed).
#[derive(Debug)]
pub struct InteractionContext<R> {
    invocation: InvocationId,
    request: R,
    issues: Vec<ValidationIssue>,
    cancel: CancellationToken,
}

impl<R> InteractionContext<R> {
    /// Fresh context with a fresh invocation id and its own cancellation
    /// token (useful for exercising handlers directly in tests).
    pub fn new(request: R) -> Self {
        Self::with_cancellation(request, CancellationToken::new())
    }

    /// Fresh context observing the caller's cancellation signal. The token
    /// handed in here is the one handlers see, unmodified.
    pub fn with_cancellation(request: R, cancel: CancellationToken) -> Self {
        Self::for_invocation(InvocationId::new(), request, cancel)
    }

    pub(crate) fn for_invocation(
        invocation: InvocationId,
        request: R,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            invocation,
            request,
            issues: Vec::new(),
            cancel,
        }
    }

    pub fn invocation(&self) -> InvocationId {
        self.invocation
    }

    pub fn request(&self) -> &R {
        &self.request
    }

    /// The caller's cancellation signal. Handlers observe it at their own
    /// suspension points; the dispatcher never races them against it.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn issues(&self) -> &[ValidationIssue] {
        &self.issues
    }

    pub fn add_issue(&mut self, issue: ValidationIssue) {
        self.issues.push(issue);
    }

    pub fn add_issues(&mut self, issues: impl IntoIterator<Item = ValidationIssue>) {
        self.issues.extend(issues);
    }

    /// Errors with the accumulated findings, stamped with this context's
    /// invocation id. `Ok(())` when nothing has been recorded.
    pub fn ensure_valid(&self) -> Result<(), InteractionError> {
        if self.issues.is_empty() {
            Ok(())
        } else {
            Err(InteractionError::invalid_request(
                self.invocation,
                self.issues.clone(),
            ))
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Cooperative cancellation checkpoint: errors with
    /// [`InteractionError::Cancelled`] once the caller's signal has fired.
    pub fn ensure_active(&self) -> Result<(), InteractionError> {
        if self.cancel.is_cancelled() {
            Err(InteractionError::Cancelled)
        } else {
            Ok(())
        }
    }
}

// ── tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn every_context_gets_a_distinct_invocation() {
        let a = InteractionContext::new("one");
        let b = InteractionContext::new("two");
        assert_ne!(a.invocation(), b.invocation());
    }

    #[test]
    fn ensure_valid_reports_recorded_issues_under_own_invocation() {
        let mut ctx = InteractionContext::new(());
        ctx.add_issue(ValidationIssue::for_field("email", "must not be empty"));
        let err = ctx.ensure_valid().unwrap_err();
        match err {
            InteractionError::InvalidRequest { invocation, issues } => {
                assert_eq!(invocation, ctx.invocation());
                assert_eq!(issues.len(), 1);
            }
            other => panic!("expected InvalidRequest, got {other:?}"),
        }
    }

    #[test]
    fn clean_context_passes_ensure_valid() {
        let ctx = InteractionContext::new(());
        assert!(ctx.ensure_valid().is_ok());
    }

    #[test]
    fn caller_token_is_observed_inside_the_context() {
        let token = CancellationToken::new();
        let ctx = InteractionContext::with_cancellation((), token.clone());
        assert!(!ctx.is_cancelled());
        token.cancel();
        assert!(ctx.is_cancelled());
        assert_eq!(ctx.ensure_active().unwrap_err().kind(), ErrorKind::Cancelled);
    }

    #[test]
    fn invocation_id_serializes_as_a_plain_string() {
        let id = InvocationId::new();
        let json = serde_json::to_value(id).unwrap();
        assert_eq!(json, serde_json::json!(id.to_string()));
        let back: InvocationId = serde_json::from_value(json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn invocation_ids_are_version_4_uuids() {
        let id = InvocationId::new();
        assert_eq!(id.as_uuid().get_version_num(), 4);
        assert_eq!(id.as_uuid().to_string(), id.to_string());
    }
}
