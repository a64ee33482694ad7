//! Handler registry — explicit registration, role-filtered composition, and
//! the frozen lookup table dispatch resolves against.
//!
//! Handlers are contributed as data ([`HandlerSet`]) or registered directly
//! on the [`RegistryBuilder`]; either way the wiring is explicit code, so a
//! composition mistake (two handlers for one request type, a set that
//! contributes nothing) fails while the process is starting, not at first
//! dispatch. `build` freezes the table; afterwards the registry is immutable
//! and cheap to share.

use std::{any::TypeId, collections::hash_map::Entry, collections::HashMap, sync::Arc};

use thiserror::Error;
use tracing::info;

use crate::dispatch::decorator::{Validated, ValidationOptions};
use crate::dispatch::handler::{ErasedHandler, Handle, Interaction, TypedHandler};
use crate::dispatch::short_type_name;

/// Where a handler does its work: in this process, or by forwarding to a
/// remote collaborator. Deployment composition filters on this when
/// installing a [`HandlerSet`]; the handler code itself never encodes the
/// choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandlerRole {
    Local,
    Remote,
}

impl HandlerRole {
    pub fn as_str(self) -> &'static str {
        match self {
            HandlerRole::Local => "local",
            HandlerRole::Remote => "remote",
        }
    }
}

/// Registration-time metadata for one handler slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandlerDescriptor {
    pub request_type: &'static str,
    pub response_type: &'static str,
    pub handler_type: &'static str,
    pub role: HandlerRole,
}

#[derive(Debug, Error)]
pub enum RegistryError {
    /// Two handlers claimed the same request type.
    #[error("request type `{request_type}` already has a registered handler")]
    DuplicateHandler { request_type: String },

    /// A handler set contributed no candidates, which always means a wiring
    /// bug.
    #[error("handler set `{name}` contributed no handlers")]
    EmptySet { name: String },
}

pub(crate) struct Slot {
    pub(crate) handler: Arc<dyn ErasedHandler>,
    pub(crate) descriptor: HandlerDescriptor,
}

/// One module's contributed handler candidates, declared explicitly.
///
/// A set is plain data: building one registers nothing. Installation picks
/// the candidates whose role matches the deployment's filter, so the same
/// set serves both the in-process and the forwarding composition.
pub struct HandlerSet {
    name: String,
    entries: Vec<Candidate>,
}

struct Candidate {
    role: HandlerRole,
    register: Box<dyn FnOnce(&mut RegistryBuilder) -> Result<(), RegistryError> + Send>,
}

impl HandlerSet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: Vec::new(),
        }
    }

    /// Adds a candidate handler for `I` under `role`.
    pub fn provide<I, H>(mut self, role: HandlerRole, handler: H) -> Self
    where
        I: Interaction,
        H: Handle<I>,
    {
        self.entries.push(Candidate {
            role,
            register: Box::new(move |builder| builder.register::<I, H>(role, handler)),
        });
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Builder for a [`HandlerRegistry`].
///
/// Registration runs under `&mut self`, so the build phase is serialised by
/// ownership and needs no lock. Every handler is wrapped with the
/// validation decorator unless [`RegistryBuilder::without_validation`] was
/// called, using one process-wide [`ValidationOptions`].
pub struct RegistryBuilder {
    slots: HashMap<TypeId, Slot>,
    options: ValidationOptions,
    wrap_validation: bool,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self {
            slots: HashMap::new(),
            options: ValidationOptions::default(),
            wrap_validation: true,
        }
    }

    /// Applies one set of toggles to every handler wrapped from here on.
    pub fn validation(mut self, options: ValidationOptions) -> Self {
        self.options = options;
        self
    }

    /// Registers handlers bare, with no validation decorator.
    pub fn without_validation(mut self) -> Self {
        self.wrap_validation = false;
        self
    }

    /// Registers `handler` for request type `I`. A second registration for
    /// the same request type is rejected.
    pub fn register<I, H>(&mut self, role: HandlerRole, handler: H) -> Result<(), RegistryError>
    where
        I: Interaction,
        H: Handle<I>,
    {
        let descriptor = HandlerDescriptor {
            request_type: short_type_name::<I>(),
            response_type: short_type_name::<I::Response>(),
            handler_type: short_type_name::<H>(),
            role,
        };
        let handler: Arc<dyn ErasedHandler> = if self.wrap_validation {
            Arc::new(TypedHandler::<I, _>::new(Validated::with_options(
                handler,
                self.options,
            )))
        } else {
            Arc::new(TypedHandler::<I, _>::new(handler))
        };
        match self.slots.entry(TypeId::of::<I>()) {
            Entry::Occupied(existing) => Err(RegistryError::DuplicateHandler {
                request_type: existing.get().descriptor.request_type.to_string(),
            }),
            Entry::Vacant(vacant) => {
                vacant.insert(Slot {
                    handler,
                    descriptor,
                });
                Ok(())
            }
        }
    }

    /// Installs every candidate in `set` whose role passes `filter`
    /// (`None` installs all). An empty set fails outright.
    pub fn install(
        &mut self,
        set: HandlerSet,
        filter: Option<HandlerRole>,
    ) -> Result<(), RegistryError> {
        if set.entries.is_empty() {
            return Err(RegistryError::EmptySet { name: set.name });
        }
        for candidate in set.entries {
            if filter.is_none_or(|role| role == candidate.role) {
                (candidate.register)(self)?;
            }
        }
        Ok(())
    }

    /// Freezes the table into the shared read-only registry.
    pub fn build(self) -> HandlerRegistry {
        let registry = HandlerRegistry { slots: self.slots };
        let listing: Vec<_> = registry
            .descriptors()
            .iter()
            .map(|d| format!("{} ({})", d.request_type, d.role.as_str()))
            .collect();
        info!(handlers = ?listing, "handler registry built");
        registry
    }
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Frozen request-type to handler table.
pub struct HandlerRegistry {
    slots: HashMap<TypeId, Slot>,
}

impl HandlerRegistry {
    pub(crate) fn slot(&self, key: TypeId) -> Option<&Slot> {
        self.slots.get(&key)
    }

    pub fn contains<I: Interaction>(&self) -> bool {
        self.slots.contains_key(&TypeId::of::<I>())
    }

    /// Descriptors of every registered handler, sorted by request type.
    pub fn descriptors(&self) -> Vec<HandlerDescriptor> {
        let mut all: Vec<_> = self.slots.values().map(|s| s.descriptor).collect();
        all.sort_unstable_by_key(|d| d.request_type);
        all
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

// ── tests ─────────────────────────────────────────────────────────────────────
