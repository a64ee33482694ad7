//! Wire-safe fault transport — the JSON envelope faults cross process
//! boundaries in, and the catalog that turns envelopes back into typed
//! errors.
//!
//! Encoding is lossy on purpose: only the wire name, the optional message,
//! and a fault's explicitly declared fields are emitted. Cause chains,
//! panic payloads and backtraces never leave the process. On decode the
//! `type` string is nothing but a catalog key; an unknown name falls back
//! to [`InteractionError::Unexpected`] with the message preserved.

use std::{
    collections::HashMap,
    error::Error as StdError,
    sync::Mutex,
};

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::context::InvocationId;
use crate::error::{BusinessError, InteractionError};
use crate::validate::ValidationIssue;

pub const MISSING_HANDLER_WIRE_NAME: &str = "interaction.MissingHandlerError";
pub const INVALID_REQUEST_WIRE_NAME: &str = "interaction.InvalidRequestError";
pub const INVALID_RESPONSE_WIRE_NAME: &str = "interaction.InvalidResponseError";
pub const UNEXPECTED_WIRE_NAME: &str = "interaction.UnexpectedError";
pub const CANCELLED_WIRE_NAME: &str = "interaction.CancelledError";

/// The JSON envelope one fault travels in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireError {
    /// Stable type identifier; a catalog key, nothing more.
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub message: Option<String>,
    /// Declared wire-eligible fields, flattened beside `type` and `message`.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

/// Encodes `error` into its wire envelope.
pub fn encode(error: &InteractionError) -> WireError {
    match error {
        InteractionError::MissingHandler { request_type } => {
            let mut fields = Map::new();
            fields.insert("requestType".into(), Value::String(request_type.clone()));
            WireError {
                type_name: MISSING_HANDLER_WIRE_NAME.into(),
                message: Some(error.to_string()),
                fields,
            }
        }
        InteractionError::InvalidRequest { invocation, issues } => {
            validation_envelope(INVALID_REQUEST_WIRE_NAME, error.to_string(), invocation, issues)
        }
        InteractionError::InvalidResponse { invocation, issues } => {
            validation_envelope(INVALID_RESPONSE_WIRE_NAME, error.to_string(), invocation, issues)
        }
        InteractionError::Business(inner) => WireError {
            type_name: inner.wire_name().to_string(),
            message: Some(inner.to_string()),
            fields: inner.wire_fields(),
        },
        InteractionError::Unexpected { message, .. } => WireError {
            type_name: UNEXPECTED_WIRE_NAME.into(),
            message: Some(message.clone()),
            fields: Map::new(),
        },
        InteractionError::Cancelled => WireError {
            type_name: CANCELLED_WIRE_NAME.into(),
            message: Some(error.to_string()),
            fields: Map::new(),
        },
    }
}

fn validation_envelope(
    type_name: &str,
    message: String,
    invocation: &InvocationId,
    issues: &[ValidationIssue],
) -> WireError {
    let mut fields = Map::new();
    fields.insert("invocationId".into(), Value::String(invocation.to_string()));
    fields.insert(
        "validationResults".into(),
        serde_json::to_value(issues).unwrap_or_else(|_| Value::Array(Vec::new())),
    );
    WireError {
        type_name: type_name.into(),
        message: Some(message),
        fields,
    }
}

/// Contract a business fault type implements to round-trip the wire.
///
/// `WIRE_FIELDS` is the explicit allow-list of payload keys in their
/// declared (lowerCamelCase) spelling; `to_wire_fields` / `from_wire` are
/// the explicit pair the codec calls. Nothing is scraped from the type at
/// runtime, and values are plain data with no type information beyond the
/// envelope's `type` key. A blanket impl derives [`BusinessError`] from
/// this trait.
pub trait WireFault: StdError + Send + Sync + Sized + 'static {
    const WIRE_NAME: &'static str;
    const WIRE_FIELDS: &'static [&'static str] = &[];

    fn to_wire_fields(&self) -> Map<String, Value> {
        Map::new()
    }

    /// Rebuilds the fault from an envelope. Keys in `fields` arrive already
    /// canonical (declared spelling, ineligible keys dropped); absent
    /// fields take the type's defaults.
    fn from_wire(message: Option<&str>, fields: &Map<String, Value>) -> Self;
}

impl<T: WireFault> BusinessError for T {
    fn wire_name(&self) -> &str {
        T::WIRE_NAME
    }

    fn wire_fields(&self) -> Map<String, Value> {
        self.to_wire_fields()
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

// ── fault catalog ─────────────────────────────────────────────────────────────

struct CatalogEntry {
    name: &'static str,
    fields: &'static [&'static str],
    decode: fn(Option<&str>, &Map<String, Value>) -> Box<dyn BusinessError>,
    folded: OnceCell<HashMap<String, &'static str>>,
}

impl CatalogEntry {
    /// Folded-spelling table for this type, built on its first decode.
    fn folded_fields(&self) -> &HashMap<String, &'static str> {
        self.folded
            .get_or_init(|| self.fields.iter().map(|f| (fold_name(f), *f)).collect())
    }
}

fn decode_entry<T: WireFault>(
    message: Option<&str>,
    fields: &Map<String, Value>,
) -> Box<dyn BusinessError> {
    Box::new(T::from_wire(message, fields))
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("wire name `{name}` is already registered")]
    DuplicateName { name: String },

    #[error("catalog is sealed; register fault types before the first decode")]
    Sealed,
}

/// Decode-side registry of business fault types.
///
/// Registration happens while the process wires up; the first business-fault
/// decode drains the pending list into the lookup index and seals the
/// catalog. Draining and sealing are one step under the `pending` lock
/// (`None` is the sealed state), so a concurrent registration either reaches
/// the index or fails with [`CatalogError::Sealed`]; it is never silently
/// dropped. The index and each per-type field table are built exactly once
/// even under concurrent first use.
pub struct FaultCatalog {
    pending: Mutex<Option<Vec<CatalogEntry>>>,
    index: OnceCell<HashMap<&'static str, CatalogEntry>>,
}

impl FaultCatalog {
    pub fn new() -> Self {
        Self {
            pending: Mutex::new(Some(Vec::new())),
            index: OnceCell::new(),
        }
    }

    /// Process-wide catalog for hosts that do not thread their own through.
    pub fn global() -> &'static FaultCatalog {
        static GLOBAL: OnceCell<FaultCatalog> = OnceCell::new();
        GLOBAL.get_or_init(FaultCatalog::new)
    }

    /// Registers `T` under [`WireFault::WIRE_NAME`]. Fails once the catalog
    /// is sealed or when the name is already taken.
    pub fn register<T: WireFault>(&self) -> Result<(), CatalogError> {
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        let Some(entries) = pending.as_mut() else {
            return Err(CatalogError::Sealed);
        };
        if entries.iter().any(|entry| entry.name == T::WIRE_NAME) {
            return Err(CatalogError::DuplicateName {
                name: T::WIRE_NAME.to_string(),
            });
        }
        entries.push(CatalogEntry {
            name: T::WIRE_NAME,
            fields: T::WIRE_FIELDS,
            decode: decode_entry::<T>,
            folded: OnceCell::new(),
        });
        Ok(())
    }

    pub fn is_sealed(&self) -> bool {
        self.pending.lock().unwrap_or_else(|e| e.into_inner()).is_none()
    }

    /// Decodes an envelope back into the taxonomy. Built-in names map to
    /// their members; registered names rebuild the concrete business fault;
    /// anything else degrades to `Unexpected` with the message preserved.
    pub fn decode(&self, wire: &WireError) -> InteractionError {
        let message = wire.message.as_deref();
        match wire.type_name.as_str() {
            MISSING_HANDLER_WIRE_NAME => InteractionError::missing_handler(
                wire.fields
                    .get("requestType")
                    .and_then(Value::as_str)
                    .unwrap_or_default(),
            ),
            INVALID_REQUEST_WIRE_NAME => {
                let (invocation, issues) = decode_validation_fields(&wire.fields);
                InteractionError::invalid_request(invocation, issues)
            }
            INVALID_RESPONSE_WIRE_NAME => {
                let (invocation, issues) = decode_validation_fields(&wire.fields);
                InteractionError::invalid_response(invocation, issues)
            }
            UNEXPECTED_WIRE_NAME => InteractionError::unexpected(
                message.unwrap_or("unexpected dispatch failure"),
            ),
            CANCELLED_WIRE_NAME => InteractionError::Cancelled,
            name => match self.index().get(name) {
                Some(entry) => {
                    let canonical = canonicalize_fields(entry, &wire.fields);
                    InteractionError::Business((entry.decode)(message, &canonical))
                }
                None => {
                    debug!(type_name = name, "unknown wire fault type");
                    InteractionError::unexpected(message.unwrap_or("unknown wire fault"))
                }
            },
        }
    }

    /// Lookup index, built from the pending registrations on first use.
    /// Taking the pending list to `None` is what seals the catalog.
    fn index(&self) -> &HashMap<&'static str, CatalogEntry> {
        self.index.get_or_init(|| {
            let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
            pending
                .take()
                .unwrap_or_default()
                .into_iter()
                .map(|entry| (entry.name, entry))
                .collect()
        })
    }
}

impl Default for FaultCatalog {
    fn default() -> Self {
        Self::new()
    }
}

/// Keeps only declared-eligible payload fields, re-keyed to their declared
/// spelling.
fn canonicalize_fields(entry: &CatalogEntry, payload: &Map<String, Value>) -> Map<String, Value> {
    let folded = entry.folded_fields();
    let mut canonical = Map::new();
    for (key, value) in payload {
        if let Some(declared) = folded.get(&fold_name(key)) {
            canonical.insert((*declared).to_string(), value.clone());
        }
    }
    canonical
}

/// Folds a field name for tolerant matching: ASCII lowercase with `_` and
/// `-` stripped, so `orderId`, `order_id` and `OrderID` all land on the
/// same key.
fn fold_name(name: &str) -> String {
    name.chars()
        .filter(|c| *c != '_' && *c != '-')
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

fn decode_validation_fields(fields: &Map<String, Value>) -> (InvocationId, Vec<ValidationIssue>) {
    let invocation = fields
        .get("invocationId")
        .and_then(Value::as_str)
        .and_then(|s| Uuid::parse_str(s).ok())
        .unwrap_or_else(Uuid::nil)
        .into();
    let issues = fields
        .get("validationResults")
        .cloned()
        .and_then(|v| serde_json::from_value(v).ok())
        .unwrap_or_default();
    (invocation, issues)
}

// ── tests ─────────────────────────────────────────────────────────────────────
