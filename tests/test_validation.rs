//! Integration tests for the validation decorator and cooperative
//! cancellation.
//!
//! Run with:
//!   cargo test --test test_validation

use tokio_util::sync::CancellationToken;

use switchboard::{
    Dispatcher, ErrorKind, Handle, HandlerFuture, HandlerRole, Interaction, InteractionContext,
    InteractionError, RegistryBuilder, Validate, ValidationIssue, ValidationOptions,
};

// ── helpers ──────────────────────────────────────────────────────────────────

struct SignUp {
    email: String,
}

impl Validate for SignUp {
    fn validate(&self, issues: &mut Vec<ValidationIssue>) {
        switchboard::validate::require_non_empty(issues, "email", &self.email);
    }
}

impl Interaction for SignUp {
    type Response = Profile;
}

#[derive(Debug)]
struct Profile {
    email: String,
}

impl Validate for Profile {
    fn validate(&self, issues: &mut Vec<ValidationIssue>) {
        switchboard::validate::require_non_empty(issues, "email", &self.email);
    }
}

/// Echoes the request's email into the profile, findings or not.
struct Enroll;

impl Handle<SignUp> for Enroll {
    fn handle(&self, ctx: InteractionContext<SignUp>) -> HandlerFuture<Profile> {
        Box::pin(async move {
            Ok(Profile {
                email: ctx.request().email.clone(),
            })
        })
    }
}

/// Aborts on recorded findings before doing any work.
struct Guarded;

impl Handle<SignUp> for Guarded {
    fn handle(&self, ctx: InteractionContext<SignUp>) -> HandlerFuture<Profile> {
        Box::pin(async move {
            ctx.ensure_valid()?;
            Ok(Profile {
                email: ctx.request().email.clone(),
            })
        })
    }
}

fn enrollment(options: Option<ValidationOptions>) -> Dispatcher {
    let mut builder = match options {
        Some(options) => RegistryBuilder::new().validation(options),
        None => RegistryBuilder::new(),
    };
    builder
        .register::<SignUp, _>(HandlerRole::Local, Enroll)
        .expect("register signup");
    Dispatcher::new(builder.build())
}

// ── request validation ────────────────────────────────────────────────────────

#[tokio::test]
async fn invalid_request_is_blocked_before_the_handler() {
    let dispatcher = enrollment(None);
    let err = dispatcher
        .dispatch(SignUp {
            email: String::new(),
        })
        .await
        .unwrap_err();
    match err {
        InteractionError::InvalidRequest { issues, .. } => {
            assert_eq!(issues.len(), 1);
            assert_eq!(issues[0].field_path.as_deref(), Some("email"));
            assert!(issues[0].message.contains("empty"));
        }
        other => panic!("expected InvalidRequest, got {other:?}"),
    }
}

#[tokio::test]
async fn valid_request_passes() {
    let dispatcher = enrollment(None);
    let profile = dispatcher
        .dispatch(SignUp {
            email: "kim@example.org".into(),
        })
        .await
        .unwrap();
    assert_eq!(profile.email, "kim@example.org");
}

#[tokio::test]
async fn cross_field_rules_are_plain_code() {
    struct Transfer {
        from: String,
        to: String,
    }

    impl Validate for Transfer {
        fn validate(&self, issues: &mut Vec<ValidationIssue>) {
            if self.from == self.to {
                issues.push(ValidationIssue::for_field(
                    "to",
                    "must differ from the source account",
                ));
            }
        }
    }

    impl Interaction for Transfer {
        type Response = ();
    }

    struct Mover;

    impl Handle<Transfer> for Mover {
        fn handle(&self, _ctx: InteractionContext<Transfer>) -> HandlerFuture<()> {
            Box::pin(async move { Ok(()) })
        }
    }

    let mut builder = RegistryBuilder::new();
    builder
        .register::<Transfer, _>(HandlerRole::Local, Mover)
        .expect("register transfer");
    let dispatcher = Dispatcher::new(builder.build());

    let err = dispatcher
        .dispatch(Transfer {
            from: "acc-1".into(),
            to: "acc-1".into(),
        })
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidRequest);

    dispatcher
        .dispatch(Transfer {
            from: "acc-1".into(),
            to: "acc-2".into(),
        })
        .await
        .unwrap();
}

// ── response validation ───────────────────────────────────────────────────────

#[tokio::test]
async fn invalid_response_is_reported_as_such() {
    // A blank email is invalid in both directions; the blank *request* must
    // be let through to show the response check firing.
    let dispatcher = enrollment(Some(ValidationOptions {
        validate_requests: false,
        validate_responses: true,
    }));
    let err = dispatcher
        .dispatch(SignUp {
            email: String::new(),
        })
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidResponse);
}

#[tokio::test]
async fn disabled_toggles_let_everything_through() {
    let dispatcher = enrollment(Some(ValidationOptions {
        validate_requests: false,
        validate_responses: false,
    }));
    let profile = dispatcher
        .dispatch(SignUp {
            email: String::new(),
        })
        .await
        .unwrap();
    assert!(profile.email.is_empty());
}

// ── handler-driven aborts ─────────────────────────────────────────────────────

#[tokio::test]
async fn handlers_can_abort_on_recorded_findings() {
    // No decorator: the handler consults the findings the dispatcher
    // recorded on the context and aborts itself.
    let mut builder = RegistryBuilder::new().without_validation();
    builder
        .register::<SignUp, _>(HandlerRole::Local, Guarded)
        .expect("register guarded");
    let dispatcher = Dispatcher::new(builder.build());

    let err = dispatcher
        .dispatch(SignUp {
            email: String::new(),
        })
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidRequest);

    dispatcher
        .dispatch(SignUp {
            email: "kim@example.org".into(),
        })
        .await
        .unwrap();
}

// ── cancellation ──────────────────────────────────────────────────────────────

struct Nap;

impl Validate for Nap {}

impl Interaction for Nap {
    type Response = ();
}

/// Parks on the caller's token and reports cancellation when it fires.
struct Sleepy;

impl Handle<Nap> for Sleepy {
    fn handle(&self, ctx: InteractionContext<Nap>) -> HandlerFuture<()> {
        Box::pin(async move {
            ctx.cancellation().cancelled().await;
            Err(InteractionError::Cancelled)
        })
    }
}

fn nursery() -> Dispatcher {
    let mut builder = RegistryBuilder::new();
    builder
        .register::<Nap, _>(HandlerRole::Local, Sleepy)
        .expect("register nap");
    Dispatcher::new(builder.build())
}

#[tokio::test]
async fn the_callers_token_reaches_the_handler() {
    let dispatcher = nursery();
    let token = CancellationToken::new();
    let pending = dispatcher.dispatch_with_cancellation(Nap, token.clone());
    // The handler is parked on this very token; firing it is the only way
    // the dispatch can finish.
    token.cancel();
    let err = pending.await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Cancelled);
}

#[tokio::test]
async fn cancellation_is_never_rewrapped() {
    // Sleepy sits behind the validation decorator; Cancelled must come out
    // verbatim, not as Unexpected.
    let dispatcher = nursery();
    let token = CancellationToken::new();
    token.cancel();
    let err = dispatcher
        .dispatch_with_cancellation(Nap, token)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Cancelled);
}
