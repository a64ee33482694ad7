//! Dispatch error taxonomy — the closed set of failures a dispatch can report.
//!
//! Every error leaving [`crate::Dispatcher::dispatch`] is one of the
//! [`InteractionError`] members below; anything a handler raises outside
//! this set (including a panic) is re-homed as [`InteractionError::Unexpected`]
//! before the caller sees it. The `Unexpected` cause chain is local-only
//! diagnostic state and never crosses the wire (see [`crate::wire`]).

use std::{any::Any, error::Error as StdError, fmt};

use thiserror::Error;

use crate::context::InvocationId;
use crate::validate::ValidationIssue;

/// Discriminant of an [`InteractionError`], handy for branching and for
/// structured log fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    MissingHandler,
    InvalidRequest,
    InvalidResponse,
    Business,
    Unexpected,
    Cancelled,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::MissingHandler => "missing_handler",
            ErrorKind::InvalidRequest => "invalid_request",
            ErrorKind::InvalidResponse => "invalid_response",
            ErrorKind::Business => "business",
            ErrorKind::Unexpected => "unexpected",
            ErrorKind::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Caller-meaningful domain failure raised by a handler.
///
/// Implementations travel through dispatch untouched and encode onto the
/// wire under [`BusinessError::wire_name`]. Types that should also decode
/// back into their concrete form implement [`crate::wire::WireFault`]
/// instead, which supplies this trait via a blanket impl.
pub trait BusinessError: StdError + Send + Sync + 'static {
    /// Stable wire identifier, e.g. `"billing.InsufficientFundsError"`.
    fn wire_name(&self) -> &str;

    /// Wire-eligible payload fields (plain data only, lowerCamelCase keys).
    fn wire_fields(&self) -> serde_json::Map<String, serde_json::Value> {
        serde_json::Map::new()
    }

    /// Supports downcasting back to the concrete type.
    fn as_any(&self) -> &dyn Any;
}

/// The closed failure taxonomy for one dispatched interaction.
#[derive(Debug, Error)]
pub enum InteractionError {
    /// No handler is registered for the request's concrete type.
    #[error("no handler registered for request type `{request_type}`")]
    MissingHandler { request_type: String },

    /// The request failed structural validation for this invocation.
    #[error("invocation {invocation}: request validation failed with {} issue(s)", .issues.len())]
    InvalidRequest {
        invocation: InvocationId,
        issues: Vec<ValidationIssue>,
    },

    /// The handler's response failed structural validation for this
    /// invocation.
    #[error("invocation {invocation}: response validation failed with {} issue(s)", .issues.len())]
    InvalidResponse {
        invocation: InvocationId,
        issues: Vec<ValidationIssue>,
    },

    /// A domain failure the caller is expected to understand.
    #[error("{0}")]
    Business(Box<dyn BusinessError>),

    /// Anything outside the taxonomy: handler panics, stray validation
    /// failures from another invocation, infrastructure faults. `cause`
    /// stays local and is never serialized.
    #[error("unexpected dispatch failure: {message}")]
    Unexpected {
        message: String,
        #[source]
        cause: Option<Box<dyn StdError + Send + Sync>>,
    },

    /// The caller's cancellation signal fired before completion.
    #[error("interaction was cancelled")]
    Cancelled,
}

impl InteractionError {
    pub fn missing_handler(request_type: impl Into<String>) -> Self {
        Self::MissingHandler {
            request_type: request_type.into(),
        }
    }

    pub fn invalid_request(invocation: InvocationId, issues: Vec<ValidationIssue>) -> Self {
        Self::InvalidRequest { invocation, issues }
    }

    pub fn invalid_response(invocation: InvocationId, issues: Vec<ValidationIssue>) -> Self {
        Self::InvalidResponse { invocation, issues }
    }

    pub fn business(error: impl BusinessError) -> Self {
        Self::Business(Box::new(error))
    }

    /// `Unexpected` with a bare message and no local cause (wire decode,
    /// internal invariant breaches).
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected {
            message: message.into(),
            cause: None,
        }
    }

    /// Maps a handler panic payload onto the taxonomy. The payload message
    /// (when the panic carried one) becomes both the error message and the
    /// local cause.
    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&'static str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "handler panicked".to_string()
        };
        Self::Unexpected {
            message: message.clone(),
            cause: Some(Box::new(HandlerPanic(message))),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingHandler { .. } => ErrorKind::MissingHandler,
            Self::InvalidRequest { .. } => ErrorKind::InvalidRequest,
            Self::InvalidResponse { .. } => ErrorKind::InvalidResponse,
            Self::Business(_) => ErrorKind::Business,
            Self::Unexpected { .. } => ErrorKind::Unexpected,
            Self::Cancelled => ErrorKind::Cancelled,
        }
    }

    /// Downcasts a [`InteractionError::Business`] payload to its concrete
    /// type.
    pub fn business_as<T: BusinessError>(&self) -> Option<&T> {
        match self {
            Self::Business(inner) => inner.as_any().downcast_ref::<T>(),
            _ => None,
        }
    }
}

/// Local cause recorded when a handler panic is re-homed as `Unexpected`.
#[derive(Debug)]
struct HandlerPanic(String);

impl fmt::Display for HandlerPanic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl StdError for HandlerPanic {}

// ── tests ─────────────────────────────────────────────────────────────────────
