//! Handler contract — typed request/response traits and the erased adapter
//! the registry stores.
//!
//! Callers and handlers only ever see the typed side ([`Interaction`],
//! [`Handle`]). The registry stores handlers type-erased behind
//! [`ErasedHandler`] keyed by the request's `TypeId`; [`TypedHandler`]
//! bridges the two, so no reflective scanning is involved anywhere.

use std::{any::Any, future::Future, marker::PhantomData, pin::Pin, sync::Arc};

use tokio_util::sync::CancellationToken;

use crate::context::{InteractionContext, InvocationId};
use crate::error::InteractionError;
use crate::validate::{try_validate, Validate};

/// Request marker: a value dispatched for exactly one response type.
///
/// The implementing concrete type doubles as the routing key, so one
/// request type maps to at most one handler per registry.
pub trait Interaction: Validate + Send + 'static {
    type Response: Validate + Send + 'static;
}

/// Boxed future every handler returns.
pub type HandlerFuture<T> =
    Pin<Box<dyn Future<Output = Result<T, InteractionError>> + Send + 'static>>;

/// A handler for one request type.
///
/// Implementations return `Box::pin(async move { .. })` and clone whatever
/// shared state the future needs, so the returned future is `'static` and
/// can be scheduled on the hosting pool. The context carries the request,
/// the invocation id, and the caller's cancellation token.
pub trait Handle<I: Interaction>: Send + Sync + 'static {
    fn handle(&self, ctx: InteractionContext<I>) -> HandlerFuture<I::Response>;
}

// ── erased layer ─────────────────────────────────────────────────────────────

pub(crate) type ErasedResponse = Box<dyn Any + Send>;

pub(crate) type ErasedFuture =
    Pin<Box<dyn Future<Output = Result<ErasedResponse, InteractionError>> + Send + 'static>>;

/// Object-safe slot the registry stores under the request's `TypeId`.
pub(crate) trait ErasedHandler: Send + Sync + 'static {
    fn invoke(
        &self,
        request: Box<dyn Any + Send>,
        invocation: InvocationId,
        cancel: CancellationToken,
    ) -> ErasedFuture;
}

/// Adapts a typed [`Handle`] impl to an [`ErasedHandler`] slot: recovers the
/// concrete request, builds the per-dispatch context, records structural
/// findings on it, and hands it to the handler.
pub(crate) struct TypedHandler<I, H> {
    handler: Arc<H>,
    _request: PhantomData<fn(I)>,
}

impl<I, H> TypedHandler<I, H> {
    pub(crate) fn new(handler: H) -> Self {
        Self {
            handler: Arc::new(handler),
            _request: PhantomData,
        }
    }
}

impl<I, H> ErasedHandler for TypedHandler<I, H>
where
    I: Interaction,
    H: Handle<I>,
{
    fn invoke(
        &self,
        request: Box<dyn Any + Send>,
        invocation: InvocationId,
        cancel: CancellationToken,
    ) -> ErasedFuture {
        let handler = Arc::clone(&self.handler);
        Box::pin(async move {
            // The registry keys slots by TypeId, so this downcast only fails
            // if the table itself is corrupted.
            let request = match request.downcast::<I>() {
                Ok(request) => *request,
                Err(_) => {
                    return Err(InteractionError::unexpected(
                        "request payload does not match the registered request type",
                    ));
                }
            };
            let mut ctx = InteractionContext::for_invocation(invocation, request, cancel);
            let (_, issues) = try_validate(ctx.request());
            ctx.add_issues(issues);
            let response = handler.handle(ctx).await?;
            Ok(Box::new(response) as ErasedResponse)
        })
    }
}

// ── tests ─────────────────────────────────────────────────────────────────────
