//! cachet-core: caching and invalidation engine for asynchronous
//! read/write operations.
//!
//! The engine tracks, for every (descriptor, parameter-set) pair, a
//! lifecycle record saying whether the operation has run, is running,
//! succeeded, or failed, plus the timestamps staleness decisions are made
//! from. It performs no I/O itself: the host applies a `Begin` step
//! before starting real work and a `Resolve`/`Reject` step when it
//! completes, and the engine records the outcome.
//!
//! Every function here is a synchronous computation over an immutable
//! [`EngineState`] snapshot; mutations return a new snapshot. The
//! process-wide holder ([`manager_state`]/[`set_manager_state`]/
//! [`clear_manager_state`]) is a convenience for hosts with no other
//! place to keep the snapshot, and the re-entry point step callbacks use
//! for cross-operation invalidation.
//!
//! # Public API
//!
//! - [`register_operation_descriptors`] -- install descriptor metadata
//! - [`get_operation`] -- resolve the record a caller should see
//! - [`apply_step`] -- run one begin/resolve/reject transition
//! - [`invalidate_operation`] -- reset cached records, with wildcards
//! - [`should_run_operation`] -- min-cache-time run suppression

pub mod config;
pub mod error;
pub mod holder;
pub mod invalidate;
pub mod key;
pub mod registry;
pub mod resolve;
pub mod store;
pub mod transition;
pub mod types;

pub use config::{initialize, EngineOptions, OperationLogger, TracingLogger};
pub use error::Violation;
pub use holder::{clear_manager_state, manager_state, set_manager_state};
pub use key::{collect_params, derive_key, derive_key_and_params, KeyedParams};
pub use resolve::{resolve_operation, ResolveContext};
pub use store::{bulk_write_operations, read_operation, write_operation, OperationUpdate};
pub use transition::{initial_operation, transition_operation};
pub use types::{
    now_epoch_ms, DataStatus, EngineState, EpochMillis, FetchStatus, OperationDescriptor,
    OperationRecord, OperationType, ParamValue, Params, Step, StepCallback, WILDCARD,
};

/// Register descriptors into the process-wide state, returning the new
/// snapshot. Re-registering an id replaces it.
pub fn register_operation_descriptors(
    descriptors: Vec<OperationDescriptor>,
) -> EngineState {
    let state = holder::manager_state();
    let next = registry::register_descriptors(&state, descriptors);
    holder::set_manager_state(next)
}

/// Resolve the current record for (descriptor, params) as a plain
/// read-only lookup.
///
/// The passed snapshot flows through to the process-wide holder so state
/// initialized in userland and state held by the engine stay in step.
pub fn get_operation(
    state: &EngineState,
    descriptor_id: &str,
    params: &Params,
    extra_fields: Option<&Params>,
) -> OperationRecord {
    let state = holder::set_manager_state(state.clone());
    let empty = Params::new();
    resolve::resolve_operation(
        &state,
        descriptor_id,
        params,
        extra_fields.unwrap_or(&empty),
        ResolveContext::Lookup,
    )
}

/// Reset matching records of a descriptor to their initial state in the
/// process-wide snapshot. `params` may carry [`WILDCARD`] entries meaning
/// "match any value for this parameter".
///
/// Callable from inside another descriptor's step callback; the write/read
/// cache-busting chain is exactly that.
pub fn invalidate_operation(descriptor_id: &str, params: &Params) -> EngineState {
    let state = holder::manager_state();
    let next = invalidate::invalidated_operations(&state, descriptor_id, params);
    holder::set_manager_state(next)
}

/// Whether the host should start this operation now, at the current
/// wall-clock time.
pub fn should_run_operation(state: &EngineState, descriptor_id: &str, params: &Params) -> bool {
    should_run_operation_at(state, descriptor_id, params, types::now_epoch_ms())
}

/// [`should_run_operation`] against an explicit clock reading.
///
/// Writes are never suppressed. A read that has never run should run; an
/// already-run read should run again once `min_cache_time` has elapsed
/// since its last fetch transition.
pub fn should_run_operation_at(
    state: &EngineState,
    descriptor_id: &str,
    params: &Params,
    now_ms: EpochMillis,
) -> bool {
    let descriptor = state.expect_descriptor(descriptor_id).clone();
    let record = resolve::resolve_operation(
        state,
        descriptor_id,
        params,
        &Params::new(),
        ResolveContext::Lookup,
    );
    if descriptor.operation_type == OperationType::Read
        && record.fetch_status != FetchStatus::Null
    {
        return (now_ms - record.last_fetch_status_time) >= descriptor.min_cache_time as EpochMillis;
    }
    true
}

/// Apply a begin/resolve/reject step at the current wall-clock time.
pub fn apply_step(
    state: &EngineState,
    step: Step,
    descriptor_id: &str,
    raw: &Params,
) -> EngineState {
    apply_step_at(state, step, descriptor_id, raw, types::now_epoch_ms())
}

/// [`apply_step`] against an explicit clock reading.
///
/// The one entry point a reducer-style adapter calls for every step
/// event: seed the holder with the passed snapshot, invoke the
/// descriptor's step callback, re-read the holder (the callback may have
/// invalidated other descriptors through it), resolve, transition with a
/// single clock reading, write the record back, and publish the result.
pub fn apply_step_at(
    state: &EngineState,
    step: Step,
    descriptor_id: &str,
    raw: &Params,
    now_ms: EpochMillis,
) -> EngineState {
    let current = holder::set_manager_state(state.clone());

    let descriptor = current.expect_descriptor(descriptor_id).clone();
    let keyed = key::derive_key_and_params(&descriptor, raw);

    if let Some(callback) = descriptor.step_callback(step) {
        callback(&keyed.params);
    }
    // the callback may have moved the process-wide snapshot forward
    let current = holder::manager_state();

    let context = match step {
        Step::Resolve => ResolveContext::ResolveStep,
        Step::Begin | Step::Reject => ResolveContext::Lookup,
    };
    let record = resolve::resolve_operation(
        &current,
        descriptor_id,
        &keyed.params,
        &keyed.remainder,
        context,
    );
    let next_record =
        transition::transition_operation(&record, step, descriptor.operation_type, now_ms);
    let next = store::write_operation(&current, descriptor_id, next_record);
    holder::set_manager_state(next)
}
