//! Initial-record synthesis and step transitions.
//!
//! The transition rules are one exhaustive match over
//! `(OperationType, Step)`, so adding a step or an operation type is a
//! compile-time event, not a missed string lookup.

use crate::types::{
    DataStatus, EpochMillis, FetchStatus, OperationDescriptor, OperationRecord, OperationType,
    Params, Step,
};

/// Synthesize the initial record for an instance that has never run (or
/// has just been invalidated): `fetch_status = Null`, timestamps 0, and
/// for read operations `data_status = Absent`.
pub fn initial_operation(
    descriptor: &OperationDescriptor,
    key: &str,
    params: Params,
    extra: Params,
) -> OperationRecord {
    OperationRecord {
        descriptor_id: descriptor.descriptor_id.clone(),
        key: key.to_string(),
        fetch_status: FetchStatus::Null,
        data_status: match descriptor.operation_type {
            OperationType::Read => Some(DataStatus::Absent),
            OperationType::Write => None,
        },
        message: None,
        last_fetch_status_time: 0,
        last_data_status_time: 0,
        last_fetch_failed: None,
        params,
        extra,
    }
}

/// Apply a begin/resolve/reject step to a record.
///
/// `now_ms` is one wall-clock reading shared by every field the step
/// stamps, so fields set together carry identical timestamps. All fields
/// a row does not touch pass through unchanged.
pub fn transition_operation(
    record: &OperationRecord,
    step: Step,
    operation_type: OperationType,
    now_ms: EpochMillis,
) -> OperationRecord {
    let mut next = record.clone();
    match (operation_type, step) {
        (OperationType::Read, Step::Begin) => {
            next.fetch_status = FetchStatus::Pending;
            next.last_fetch_status_time = now_ms;
        }
        (OperationType::Read, Step::Resolve) => {
            next.fetch_status = FetchStatus::Successful;
            next.data_status = Some(DataStatus::Present);
            next.last_fetch_status_time = now_ms;
            next.last_data_status_time = now_ms;
            next.last_fetch_failed = Some(false);
        }
        (OperationType::Read, Step::Reject) => {
            next.fetch_status = FetchStatus::Failed;
            next.last_fetch_status_time = now_ms;
            next.last_fetch_failed = Some(true);
        }
        (OperationType::Write, Step::Begin) => {
            next.fetch_status = FetchStatus::Pending;
            next.last_fetch_status_time = now_ms;
        }
        (OperationType::Write, Step::Resolve) => {
            next.fetch_status = FetchStatus::Successful;
            next.last_fetch_status_time = now_ms;
            next.last_fetch_failed = Some(false);
        }
        (OperationType::Write, Step::Reject) => {
            next.fetch_status = FetchStatus::Failed;
            next.last_fetch_status_time = now_ms;
            next.last_fetch_failed = Some(true);
        }
    }
    next
}
