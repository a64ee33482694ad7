//! Validation decorator — structural checks wrapped around any handler.
//!
//! `Validated<H>` runs the request's rules before the inner handler and the
//! response's rules after it, raising [`InteractionError::InvalidRequest`] /
//! [`InteractionError::InvalidResponse`] stamped with the current invocation
//! id. Errors coming out of the inner handler go through the same
//! [`normalize`](crate::dispatch) step the dispatcher applies, so a stray
//! validation failure from a nested invocation can never masquerade as this
//! one's.

use std::sync::Arc;

use tracing::debug;

use crate::context::InteractionContext;
use crate::dispatch::handler::{Handle, HandlerFuture, Interaction};
use crate::dispatch::normalize;
use crate::error::InteractionError;
use crate::validate::try_validate;

/// Process-wide switches for the decorator, sourced from
/// [`CoreConfig`](crate::config::CoreConfig). Both sides default to on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationOptions {
    pub validate_requests: bool,
    pub validate_responses: bool,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            validate_requests: true,
            validate_responses: true,
        }
    }
}

/// Wraps a handler with pre- and post-validation.
///
/// The context, and with it the caller's cancellation token, is handed to
/// the inner handler untouched.
pub struct Validated<H> {
    inner: Arc<H>,
    options: ValidationOptions,
}

impl<H> Validated<H> {
    pub fn new(inner: H) -> Self {
        Self::with_options(inner, ValidationOptions::default())
    }

    pub fn with_options(inner: H, options: ValidationOptions) -> Self {
        Self {
            inner: Arc::new(inner),
            options,
        }
    }
}

impl<I, H> Handle<I> for Validated<H>
where
    I: Interaction,
    H: Handle<I>,
{
    fn handle(&self, ctx: InteractionContext<I>) -> HandlerFuture<I::Response> {
        let inner = Arc::clone(&self.inner);
        let options = self.options;
        Box::pin(async move {
            let invocation = ctx.invocation();

            if options.validate_requests {
                let (ok, issues) = try_validate(ctx.request());
                if !ok {
                    debug!(%invocation, issues = issues.len(), "request failed validation");
                    return Err(InteractionError::invalid_request(invocation, issues));
                }
            }

            let response = match inner.handle(ctx).await {
                Ok(response) => response,
                Err(error) => return Err(normalize(invocation, error)),
            };

            if options.validate_responses {
                let (ok, issues) = try_validate(&response);
                if !ok {
                    debug!(%invocation, issues = issues.len(), "response failed validation");
                    return Err(InteractionError::invalid_response(invocation, issues));
                }
            }

            Ok(response)
        })
    }
}

// ── tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::InvocationId;
    use crate::error::ErrorKind;
    use crate::validate::{require_non_empty, Validate, ValidationIssue};

    struct Ping {
        value: String,
    }

    impl Validate for Ping {
        fn validate(&self, issues: &mut Vec<ValidationIssue>) {
            require_non_empty(issues, "value", &self.value);
        }
    }

    impl Interaction for Ping {
        type Response = Pong;
    }

    #[derive(Debug)]
    struct Pong {
        value: String,
    }

    impl Validate for Pong {
        fn validate(&self, issues: &mut Vec<ValidationIssue>) {
            require_non_empty(issues, "value", &self.value);
        }
    }

    /// Echoes the request value back, optionally mangled to trip response
    /// validation.
    struct Echo {
        blank_response: bool,
    }

    impl Handle<Ping> for Echo {
        fn handle(&self, ctx: InteractionContext<Ping>) -> HandlerFuture<Pong> {
            let blank = self.blank_response;
            Box::pin(async move {
                Ok(Pong {
                    value: if blank {
                        String::new()
                    } else {
                        ctx.request().value.clone()
                    },
                })
            })
        }
    }

    /// Fails with whatever the constructor builds.
    struct Failing(fn() -> InteractionError);

    impl Handle<Ping> for Failing {
        fn handle(&self, _ctx: InteractionContext<Ping>) -> HandlerFuture<Pong> {
            let build = self.0;
            Box::pin(async move { Err(build()) })
        }
    }

    fn ping(value: &str) -> InteractionContext<Ping> {
        InteractionContext::new(Ping {
            value: value.into(),
        })
    }

    #[tokio::test]
    async fn valid_request_reaches_the_inner_handler() {
        let wrapped = Validated::new(Echo {
            blank_response: false,
        });
        let pong = wrapped.handle(ping("hello")).await.unwrap();
        assert_eq!(pong.value, "hello");
    }

    #[tokio::test]
    async fn invalid_request_is_blocked_under_the_current_invocation() {
        let wrapped = Validated::new(Echo {
            blank_response: false,
        });
        let ctx = ping("  ");
        let expected = ctx.invocation();
        let err = wrapped.handle(ctx).await.unwrap_err();
        match err {
            InteractionError::InvalidRequest { invocation, issues } => {
                assert_eq!(invocation, expected);
                assert_eq!(issues[0].field_path.as_deref(), Some("value"));
            }
            other => panic!("expected InvalidRequest, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn invalid_response_is_reported_after_a_successful_call() {
        let wrapped = Validated::new(Echo {
            blank_response: true,
        });
        let ctx = ping("hello");
        let expected = ctx.invocation();
        let err = wrapped.handle(ctx).await.unwrap_err();
        match err {
            InteractionError::InvalidResponse { invocation, .. } => {
                assert_eq!(invocation, expected);
            }
            other => panic!("expected InvalidResponse, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn disabled_toggles_skip_both_checks() {
        let wrapped = Validated::with_options(
            Echo {
                blank_response: true,
            },
            ValidationOptions {
                validate_requests: false,
                validate_responses: false,
            },
        );
        // Invalid request and invalid response both sail through.
        let pong = wrapped.handle(ping("  ")).await.unwrap();
        assert!(pong.value.is_empty());
    }

    #[tokio::test]
    async fn foreign_validation_failure_is_rehomed() {
        let wrapped = Validated::new(Failing(|| {
            InteractionError::invalid_request(
                InvocationId::new(),
                vec![ValidationIssue::new("smuggled")],
            )
        }));
        let err = wrapped.handle(ping("hello")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unexpected);
    }

    #[tokio::test]
    async fn cancellation_from_the_inner_handler_stays_verbatim() {
        let wrapped = Validated::new(Failing(|| InteractionError::Cancelled));
        let err = wrapped.handle(ping("hello")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Cancelled);
    }

    #[tokio::test]
    async fn business_failures_pass_through_untouched() {
        use std::fmt;

        #[derive(Debug)]
        struct Refused;
        impl fmt::Display for Refused {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("refused")
            }
        }
        impl std::error::Error for Refused {}
        impl crate::error::BusinessError for Refused {
            fn wire_name(&self) -> &str {
                "test.RefusedError"
            }
            fn as_any(&self) -> &dyn std::any::Any {
                self
            }
        }

        let wrapped = Validated::new(Failing(|| InteractionError::business(Refused)));
        let err = wrapped.handle(ping("hello")).await.unwrap_err();
        assert!(err.business_as::<Refused>().is_some());
    }
}
