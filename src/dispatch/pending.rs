//! Response handle — the awaitable a dispatch hands back.

use std::{
    any::type_name,
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};

use crate::dispatch::handler::ErasedFuture;
use crate::error::InteractionError;

/// The in-flight result of one dispatched interaction.
///
/// Awaiting yields `Result<T, InteractionError>` where `T` is the response
/// type the request declares. The ready-made constructors (`ready`,
/// `failed`, `cancelled`) give callers and test doubles a completed handle
/// without going through dispatch.
#[must_use = "a dispatch result must be awaited to observe success or failure"]
pub struct Pending<T> {
    state: State<T>,
}

enum State<T> {
    Ready(Option<Result<T, InteractionError>>),
    Running(ErasedFuture),
}

// No field is structurally pinned: the running future is boxed and the ready
// slot is moved out whole.
impl<T> Unpin for Pending<T> {}

impl<T: Send + 'static> Pending<T> {
    /// Completed handle carrying a response.
    pub fn ready(value: T) -> Self {
        Self {
            state: State::Ready(Some(Ok(value))),
        }
    }

    /// Completed handle carrying a failure.
    pub fn failed(error: InteractionError) -> Self {
        Self {
            state: State::Ready(Some(Err(error))),
        }
    }

    /// Completed handle reporting cancellation.
    pub fn cancelled() -> Self {
        Self::failed(InteractionError::Cancelled)
    }

    pub(crate) fn running(future: ErasedFuture) -> Self {
        Self {
            state: State::Running(future),
        }
    }
}

impl<T: Send + 'static> Future for Pending<T> {
    type Output = Result<T, InteractionError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        match &mut this.state {
            State::Ready(slot) => match slot.take() {
                Some(result) => Poll::Ready(result),
                None => panic!("Pending polled after completion"),
            },
            State::Running(future) => {
                let result = match future.as_mut().poll(cx) {
                    Poll::Pending => return Poll::Pending,
                    Poll::Ready(Ok(response)) => match response.downcast::<T>() {
                        Ok(value) => Ok(*value),
                        Err(_) => Err(InteractionError::unexpected(format!(
                            "handler response did not match the expected type `{}`",
                            type_name::<T>()
                        ))),
                    },
                    Poll::Ready(Err(error)) => Err(error),
                };
                this.state = State::Ready(None);
                Poll::Ready(result)
            }
        }
    }
}

// ── tests ─────────────────────────────────────────────────────────────────────
