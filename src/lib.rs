//! Typed interaction dispatch core.
//!
//! A request value is dispatched to the one handler registered for its
//! concrete type; the handler answers asynchronously with the response type
//! the request declares. Around that exchange this crate layers:
//!
//! - structural validation of requests and responses ([`validate`]), applied
//!   uniformly by the [`Validated`] decorator the registry installs;
//! - a closed failure taxonomy ([`error`]) with strict normalization: a
//!   panic or a validation failure leaked from another invocation surfaces
//!   as [`InteractionError::Unexpected`], and cancellation is never
//!   rewrapped;
//! - a wire-safe fault codec ([`wire`]) that emits only declared fields and
//!   decodes through an explicit, lazily sealed catalog;
//! - explicit, role-filtered handler registration ([`dispatch::registry`])
//!   that fails at wiring time, not at first dispatch.
//!
//! Hosts resolve settings with [`config::load`] and install logging with
//! [`logger::init`].
//!
//! # Example
//!
//! ```
//! use switchboard::{
//!     Dispatcher, Handle, HandlerFuture, HandlerRole, Interaction, InteractionContext,
//!     RegistryBuilder, Validate,
//! };
//!
//! struct Greet {
//!     name: String,
//! }
//!
//! impl Validate for Greet {
//!     fn validate(&self, issues: &mut Vec<switchboard::ValidationIssue>) {
//!         switchboard::validate::require_non_empty(issues, "name", &self.name);
//!     }
//! }
//!
//! impl Interaction for Greet {
//!     type Response = String;
//! }
//!
//! struct GreetHandler;
//!
//! impl Handle<Greet> for GreetHandler {
//!     fn handle(&self, ctx: InteractionContext<Greet>) -> HandlerFuture<String> {
//!         Box::pin(async move { Ok(format!("Hello, {}!", ctx.request().name)) })
//!     }
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let mut builder = RegistryBuilder::new();
//! builder
//!     .register::<Greet, _>(HandlerRole::Local, GreetHandler)
//!     .unwrap();
//! let dispatcher = Dispatcher::new(builder.build());
//!
//! let greeting = dispatcher
//!     .dispatch(Greet {
//!         name: "Jerry".into(),
//!     })
//!     .await
//!     .unwrap();
//! assert_eq!(greeting, "Hello, Jerry!");
//! # }
//! ```

pub mod config;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod logger;
pub mod validate;
pub mod wire;

pub use context::{InteractionContext, InvocationId};
pub use dispatch::{
    Dispatcher, Handle, HandlerDescriptor, HandlerFuture, HandlerRegistry, HandlerRole,
    HandlerSet, Interaction, Pending, RegistryBuilder, RegistryError, Validated,
    ValidationOptions,
};
pub use error::{BusinessError, ErrorKind, InteractionError};
pub use validate::{try_validate, Validate, ValidationIssue};
pub use wire::{encode, FaultCatalog, WireError, WireFault};
