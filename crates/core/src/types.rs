//! Core data model: parameter values, descriptors, operation records,
//! and the engine state snapshot.
//!
//! Everything here is a plain value. The engine never mutates a snapshot
//! in place; each mutation produces a new `EngineState`, so readers never
//! observe a partially-updated record.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

// ──────────────────────────────────────────────
// Clock
// ──────────────────────────────────────────────

/// Epoch-millisecond timestamp. `0` means "never".
pub type EpochMillis = i64;

/// Current wall-clock time in epoch milliseconds.
///
/// Transitions take the reading as an explicit argument so one reading is
/// shared across every field a transition stamps, and so tests can pass a
/// fixed clock.
pub fn now_epoch_ms() -> EpochMillis {
    (time::OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as EpochMillis
}

// ──────────────────────────────────────────────
// Closed enums
// ──────────────────────────────────────────────

/// Whether an operation fetches data or mutates it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationType {
    Read,
    Write,
}

/// Lifecycle step applied to an operation record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Step {
    Begin,
    Resolve,
    Reject,
}

/// Lifecycle of the fetch attempt itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FetchStatus {
    Null,
    Pending,
    Successful,
    Failed,
}

/// Validity of the data a read operation produced, independent of the
/// fetch history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DataStatus {
    Absent,
    Present,
}

// ──────────────────────────────────────────────
// Parameter values
// ──────────────────────────────────────────────

/// A parameter value identifying one operation instance.
///
/// `Wildcard` is the match-any sentinel for bulk invalidation. It is a
/// dedicated variant rather than a magic string so strict-equality
/// matching can never confuse a literal `"*"` with the sentinel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParamValue {
    Null,
    Bool(bool),
    Int(i64),
    Text(String),
    List(Vec<ParamValue>),
    Wildcard,
}

/// The match-any sentinel accepted by the invalidation engine.
pub const WILDCARD: ParamValue = ParamValue::Wildcard;

/// Parameter record for one operation instance, keyed by parameter name.
pub type Params = BTreeMap<String, ParamValue>;

impl ParamValue {
    /// Human-readable type name for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            ParamValue::Null => "Null",
            ParamValue::Bool(_) => "Bool",
            ParamValue::Int(_) => "Int",
            ParamValue::Text(_) => "Text",
            ParamValue::List(_) => "List",
            ParamValue::Wildcard => "Wildcard",
        }
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Bool(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Int(value)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Text(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Text(value)
    }
}

impl From<Vec<ParamValue>> for ParamValue {
    fn from(items: Vec<ParamValue>) -> Self {
        ParamValue::List(items)
    }
}

// ──────────────────────────────────────────────
// Operation descriptors
// ──────────────────────────────────────────────

/// Side-effecting callback invoked when a step is applied. Callbacks may
/// re-enter the engine through the process-wide holder, e.g. to invalidate
/// another descriptor's cached records.
pub type StepCallback = Arc<dyn Fn(&Params) + Send + Sync>;

/// Static registered metadata describing one class of async operation.
///
/// `Default` supplies the registration defaults, so hosts write
/// `OperationDescriptor { descriptor_id, operation_type, required_params,
/// ..Default::default() }`. `operation_type` and `required_params` are
/// immutable for the lifetime of the process once instances exist;
/// changing them mid-flight is undefined behavior.
#[derive(Clone)]
pub struct OperationDescriptor {
    pub descriptor_id: String,
    pub operation_type: OperationType,
    /// Parameter names that must be present to identify an instance.
    pub required_params: Vec<String>,
    /// Parameter names included in key derivation when present.
    pub optional_params: Vec<String>,
    /// A broader read descriptor whose freshness supersedes this one's.
    pub parent_descriptor_id: Option<String>,
    /// Descriptors whose successful completion invalidates this one's
    /// cached instances. A self-reference invalidates on every resolve.
    pub invalidating_descriptor_ids: Option<Vec<String>>,
    /// Minimum ms between runs; `should_run_operation` suppresses re-runs
    /// inside this window.
    pub min_cache_time: u64,
    /// Advisory staleness ceiling in ms; the engine never auto-evicts.
    pub max_cache_time: u64,
    pub always_immutable: bool,
    pub on_begin: Option<StepCallback>,
    pub on_resolve: Option<StepCallback>,
    pub on_reject: Option<StepCallback>,
    /// Verbose diagnostic logging; no effect on state transitions.
    pub debug: bool,
}

impl Default for OperationDescriptor {
    fn default() -> Self {
        OperationDescriptor {
            descriptor_id: String::new(),
            operation_type: OperationType::Read,
            required_params: Vec::new(),
            optional_params: Vec::new(),
            parent_descriptor_id: None,
            invalidating_descriptor_ids: None,
            min_cache_time: 5000,
            max_cache_time: 60000,
            always_immutable: false,
            on_begin: None,
            on_resolve: None,
            on_reject: None,
            debug: false,
        }
    }
}

impl OperationDescriptor {
    /// The callback registered for a step, if any.
    pub fn step_callback(&self, step: Step) -> Option<&StepCallback> {
        match step {
            Step::Begin => self.on_begin.as_ref(),
            Step::Resolve => self.on_resolve.as_ref(),
            Step::Reject => self.on_reject.as_ref(),
        }
    }
}

impl fmt::Debug for OperationDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationDescriptor")
            .field("descriptor_id", &self.descriptor_id)
            .field("operation_type", &self.operation_type)
            .field("required_params", &self.required_params)
            .field("optional_params", &self.optional_params)
            .field("parent_descriptor_id", &self.parent_descriptor_id)
            .field(
                "invalidating_descriptor_ids",
                &self.invalidating_descriptor_ids,
            )
            .field("min_cache_time", &self.min_cache_time)
            .field("max_cache_time", &self.max_cache_time)
            .field("always_immutable", &self.always_immutable)
            .field("on_begin", &self.on_begin.is_some())
            .field("on_resolve", &self.on_resolve.is_some())
            .field("on_reject", &self.on_reject.is_some())
            .field("debug", &self.debug)
            .finish()
    }
}

// ──────────────────────────────────────────────
// Operation records
// ──────────────────────────────────────────────

/// Runtime lifecycle state of one operation instance, i.e. one point in
/// the (descriptor × concrete params) space.
///
/// Invariant: a read record always carries `data_status`, a write record
/// never does. `last_data_status_time` is monotone non-decreasing except
/// on explicit invalidation, which resets it to 0.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationRecord {
    pub descriptor_id: String,
    /// The derived instance key; redundant with the store's own key but
    /// carried for re-dispatch convenience.
    pub key: String,
    pub fetch_status: FetchStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_status: Option<DataStatus>,
    pub message: Option<String>,
    pub last_fetch_status_time: EpochMillis,
    pub last_data_status_time: EpochMillis,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_fetch_failed: Option<bool>,
    /// Concrete declared parameter values for this instance.
    pub params: Params,
    /// Undeclared passthrough fields threaded from resolution so they
    /// round-trip to re-dispatched events.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: Params,
}

// ──────────────────────────────────────────────
// Engine state
// ──────────────────────────────────────────────

/// The aggregate snapshot: registered descriptors plus the keyed store of
/// operation records.
///
/// A plain value. Hosts may keep it anywhere; every core function takes a
/// snapshot and returns a new one. The process-wide holder in
/// [`crate::holder`] is a convenience, not a requirement.
#[derive(Debug, Clone, Default)]
pub struct EngineState {
    pub descriptors: BTreeMap<String, OperationDescriptor>,
    pub operations: BTreeMap<String, OperationRecord>,
}

impl EngineState {
    pub fn new() -> Self {
        EngineState::default()
    }

    pub fn descriptor(&self, descriptor_id: &str) -> Option<&OperationDescriptor> {
        self.descriptors.get(descriptor_id)
    }

    /// Look up a descriptor that the host contract requires to exist.
    ///
    /// Resolving, stepping, or invalidating an operation whose descriptor
    /// was never registered is a wiring error in the host, not a runtime
    /// condition, so it fails loudly instead of being smoothed over.
    pub fn expect_descriptor(&self, descriptor_id: &str) -> &OperationDescriptor {
        self.descriptors.get(descriptor_id).unwrap_or_else(|| {
            panic!("no operation descriptor registered for '{descriptor_id}'")
        })
    }
}
