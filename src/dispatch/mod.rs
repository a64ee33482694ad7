//! Interaction dispatch — typed mediation between callers and handlers.
//!
//! [`Dispatcher::dispatch`] resolves the handler registered for the
//! request's concrete type, mints the invocation id, and runs the invocation
//! as one task on the hosting pool. That task boundary is where a panicking
//! handler is contained, and [`normalize`] is the single step every failure
//! passes through before the caller sees it.

pub mod decorator;
pub mod handler;
pub mod pending;
pub mod registry;

use std::any::{type_name, TypeId};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::context::InvocationId;
use crate::error::InteractionError;

pub use decorator::{Validated, ValidationOptions};
pub use handler::{Handle, HandlerFuture, Interaction};
pub use pending::Pending;
pub use registry::{
    HandlerDescriptor, HandlerRegistry, HandlerRole, HandlerSet, RegistryBuilder, RegistryError,
};

/// Routes request values to their registered handlers.
///
/// Cloning is cheap; every clone shares the same frozen registry.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<HandlerRegistry>,
}

impl Dispatcher {
    pub fn new(registry: HandlerRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    /// Builds on a registry that is already shared.
    pub fn from_shared(registry: Arc<HandlerRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    /// Dispatches `request` under a token nothing cancels.
    pub fn dispatch<I: Interaction>(&self, request: I) -> Pending<I::Response> {
        self.dispatch_with_cancellation(request, CancellationToken::new())
    }

    /// Dispatches `request`; `cancel` is the signal the handler observes at
    /// its own suspension points.
    ///
    /// Must be called from within a Tokio runtime: the invocation runs as
    /// its own task, so a panicking handler unwinds into that task's join
    /// result instead of tearing the caller down.
    pub fn dispatch_with_cancellation<I: Interaction>(
        &self,
        request: I,
        cancel: CancellationToken,
    ) -> Pending<I::Response> {
        let Some(slot) = self.registry.slot(TypeId::of::<I>()) else {
            let request_type = short_type_name::<I>();
            warn!(request_type, "no handler registered");
            return Pending::failed(InteractionError::missing_handler(request_type));
        };

        let invocation = InvocationId::new();
        debug!(
            %invocation,
            request_type = slot.descriptor.request_type,
            handler = slot.descriptor.handler_type,
            "dispatching"
        );

        let future = slot.handler.invoke(Box::new(request), invocation, cancel);
        let task = tokio::spawn(future);
        Pending::running(Box::pin(async move {
            match task.await {
                Ok(result) => result.map_err(|error| normalize(invocation, error)),
                Err(join_error) if join_error.is_panic() => {
                    warn!(%invocation, "handler panicked");
                    Err(InteractionError::from_panic(join_error.into_panic()))
                }
                Err(_) => Err(InteractionError::Cancelled),
            }
        }))
    }
}

/// The one normalization step for failures leaving a dispatch. Applied by
/// the dispatcher after the handler task joins and by the validation
/// decorator to inner-handler errors.
///
/// A validation failure stamped with a different invocation id did not come
/// from this dispatch; letting it through would mislabel the current request
/// as invalid, so it is re-homed as `Unexpected` with the original error
/// kept as the local cause. Cancellation and every other taxonomy member
/// pass through verbatim. Applying the step twice changes nothing.
pub(crate) fn normalize(invocation: InvocationId, error: InteractionError) -> InteractionError {
    let foreign = match &error {
        InteractionError::InvalidRequest {
            invocation: origin, ..
        }
        | InteractionError::InvalidResponse {
            invocation: origin, ..
        } => (*origin != invocation).then_some(*origin),
        _ => None,
    };
    match foreign {
        Some(origin) => {
            warn!(%invocation, %origin, "re-homing validation failure from another invocation");
            InteractionError::Unexpected {
                message: format!("validation failure escaped invocation {origin}"),
                cause: Some(Box::new(error)),
            }
        }
        None => error,
    }
}

/// Unqualified name of `T`, used in errors, logs and descriptors. Generic
/// types keep their full rendering so the parameters stay readable.
pub(crate) fn short_type_name<T>() -> &'static str {
    let full = type_name::<T>();
    if full.contains('<') {
        full
    } else {
        full.rsplit("::").next().unwrap_or(full)
    }
}

// ── tests ─────────────────────────────────────────────────────────────────────
