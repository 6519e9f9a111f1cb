//! Pure keyed accessors over the operation store.
//!
//! Writes derive the record's key from its declared params, validate the
//! read/write shape invariant, and produce a new snapshot. Nothing here
//! consults the process-wide holder.

use crate::config::logger;
use crate::error::Violation;
use crate::key::derive_key;
use crate::types::{EngineState, OperationRecord, OperationType};

/// One entry of a bulk write.
pub struct OperationUpdate {
    pub descriptor_id: String,
    pub record: OperationRecord,
}

fn validate_record_shape(key: &str, operation_type: OperationType, record: &OperationRecord) {
    let message = match (operation_type, record.data_status.is_some()) {
        (OperationType::Read, false) => Some("read record is missing data_status"),
        (OperationType::Write, true) => Some("write record carries data_status"),
        _ => None,
    };
    if let Some(message) = message {
        logger().exception(
            &format!("operation record at '{key}' failed shape validation"),
            &Violation::RecordShape {
                key: key.to_string(),
                message: message.to_string(),
            },
        );
    }
}

/// The stored record at an instance key, if any.
pub fn read_operation<'a>(state: &'a EngineState, key: &str) -> Option<&'a OperationRecord> {
    state.operations.get(key)
}

/// Write one record, keyed by its declared params, returning the new
/// snapshot. Shape violations are logged, never refused.
pub fn write_operation(
    state: &EngineState,
    descriptor_id: &str,
    record: OperationRecord,
) -> EngineState {
    let descriptor = state.expect_descriptor(descriptor_id);
    let key = derive_key(descriptor_id, &record.params);
    validate_record_shape(&key, descriptor.operation_type, &record);

    if descriptor.debug {
        let log = logger();
        log.verbose(&format!("writing operation record for {key}"));
        log.info(
            "write_operation snapshot",
            serde_json::json!({ "key": &key, "record": &record }),
        );
    }

    let mut next = state.clone();
    let mut record = record;
    record.key = key.clone();
    next.operations.insert(key, record);
    next
}

/// Write a batch of records in order.
pub fn bulk_write_operations(state: &EngineState, updates: Vec<OperationUpdate>) -> EngineState {
    updates.into_iter().fold(state.clone(), |acc, update| {
        write_operation(&acc, &update.descriptor_id, update.record)
    })
}
