//! Lifecycle resolution: which record a caller should see.
//!
//! Resolution decides between four answers for a (descriptor, params)
//! pair: a synthesized initial record, the stored record, the stored
//! record with its parent's freshness pulled over it, or a freshly
//! invalidated initial record. It is a pure function of the snapshot it
//! is given (debug logging aside) and never mutates the store.

use crate::config::logger;
use crate::error::Violation;
use crate::key::derive_key_and_params;
use crate::transition::initial_operation;
use crate::types::{
    EngineState, FetchStatus, OperationDescriptor, OperationRecord, OperationType, Params,
};

/// Parent chains are expected to be acyclic; the guard turns an
/// accidental cycle into a logged violation instead of an endless walk.
const MAX_PARENT_DEPTH: usize = 32;

/// Whether resolution is happening inside a resolve step or as a plain
/// read-only lookup. Only a resolve step runs the invalidating-descriptor
/// scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveContext {
    Lookup,
    ResolveStep,
}

/// Resolve the record a caller should see for (descriptor, params).
///
/// `extra_fields` are undeclared passthrough values merged into any
/// synthesized initial record so they survive to re-dispatch.
pub fn resolve_operation(
    state: &EngineState,
    descriptor_id: &str,
    raw: &Params,
    extra_fields: &Params,
    context: ResolveContext,
) -> OperationRecord {
    resolve_at_depth(state, descriptor_id, raw, extra_fields, context, 0)
}

fn resolve_at_depth(
    state: &EngineState,
    descriptor_id: &str,
    raw: &Params,
    extra_fields: &Params,
    context: ResolveContext,
    depth: usize,
) -> OperationRecord {
    let descriptor = state.expect_descriptor(descriptor_id);
    let keyed = derive_key_and_params(descriptor, raw);
    let stored = state.operations.get(&keyed.key);

    if descriptor.debug {
        let log = logger();
        log.verbose(&format!("resolving operation {}", keyed.key));
        log.info(
            "resolve_operation snapshot",
            serde_json::json!({
                "key": &keyed.key,
                "params": &keyed.params,
                "stored": stored.is_some(),
            }),
        );
    }

    let parent = resolve_parent(state, descriptor, raw, extra_fields, depth);

    let base = match stored {
        Some(record) => record.clone(),
        None => {
            if descriptor.debug {
                logger().verbose(&format!(
                    "no operation record at {}; defaulting to an initial record",
                    keyed.key
                ));
            }
            initial_operation(
                descriptor,
                &keyed.key,
                keyed.params.clone(),
                extra_fields.clone(),
            )
        }
    };

    if context == ResolveContext::ResolveStep {
        if let Some(invalidating_ids) = &descriptor.invalidating_descriptor_ids {
            let triggered = invalidating_ids
                .iter()
                .any(|invalidating_id| invalidated_by(state, descriptor, &base, invalidating_id));
            if triggered {
                return initial_operation(
                    descriptor,
                    &keyed.key,
                    keyed.params,
                    extra_fields.clone(),
                );
            }
        }
    }

    if let Some(parent) = parent {
        if parent.last_data_status_time >= base.last_data_status_time {
            return pull_parent_fields(base, &parent);
        }
    }

    base
}

/// Resolve the parent record when the descriptor declares a read parent.
/// Parents are always resolved as plain lookups; the invalidation scan
/// belongs to the record being stepped, not its ancestors.
fn resolve_parent(
    state: &EngineState,
    descriptor: &OperationDescriptor,
    raw: &Params,
    extra_fields: &Params,
    depth: usize,
) -> Option<OperationRecord> {
    let parent_id = descriptor.parent_descriptor_id.as_ref()?;
    if depth >= MAX_PARENT_DEPTH {
        logger().exception(
            &format!(
                "parent chain above '{}' is deeper than {MAX_PARENT_DEPTH} levels",
                descriptor.descriptor_id
            ),
            &Violation::ParentDepthExceeded {
                descriptor_id: descriptor.descriptor_id.clone(),
                depth: MAX_PARENT_DEPTH,
            },
        );
        return None;
    }
    let parent_descriptor = state.expect_descriptor(parent_id);
    if parent_descriptor.operation_type != OperationType::Read {
        return None;
    }
    Some(resolve_at_depth(
        state,
        parent_id,
        raw,
        extra_fields,
        ResolveContext::Lookup,
        depth + 1,
    ))
}

/// Whether one invalidating descriptor id marks `base` stale.
///
/// A self-reference invalidates unconditionally on every resolve step.
/// Otherwise only the most recently fetched record of the invalidating
/// descriptor that actually completed successfully is considered: an
/// in-flight or failed run never busts the cache.
fn invalidated_by(
    state: &EngineState,
    descriptor: &OperationDescriptor,
    base: &OperationRecord,
    invalidating_id: &str,
) -> bool {
    if invalidating_id == descriptor.descriptor_id {
        return true;
    }
    let invalidating_descriptor = state.expect_descriptor(invalidating_id);
    let latest = state
        .operations
        .values()
        .filter(|record| {
            record.descriptor_id == invalidating_id
                && record.fetch_status == FetchStatus::Successful
        })
        .max_by_key(|record| record.last_fetch_status_time);
    let Some(latest) = latest else {
        return false;
    };
    match invalidating_descriptor.operation_type {
        OperationType::Read => latest.last_data_status_time >= base.last_data_status_time,
        OperationType::Write => latest.last_fetch_status_time >= base.last_fetch_status_time,
    }
}

/// Overwrite the parent-owned freshness fields on a record with the
/// parent's values, keeping the record's own identity and params.
fn pull_parent_fields(mut record: OperationRecord, parent: &OperationRecord) -> OperationRecord {
    record.fetch_status = parent.fetch_status;
    if record.data_status.is_some() {
        // write records never carry data status
        record.data_status = parent.data_status;
    }
    record.message = parent.message.clone();
    record.last_fetch_status_time = parent.last_fetch_status_time;
    record.last_data_status_time = parent.last_data_status_time;
    record.last_fetch_failed = parent.last_fetch_failed;
    record
}
