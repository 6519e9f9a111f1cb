//! Explicit bulk invalidation with wildcard matching.
//!
//! Invalidation resets matching records to their initial state outside
//! the step lifecycle. It is the cache-busting half of write/read
//! chains: a write descriptor's resolve callback invalidates the read
//! descriptors whose cached data it made stale.

use crate::key::derive_key_and_params;
use crate::transition::initial_operation;
use crate::types::{EngineState, OperationRecord, ParamValue, Params};

/// Reset every record of `descriptor_id` whose params satisfy the given
/// constraints, returning the new snapshot.
///
/// A `ParamValue::Wildcard` entry matches any value for that parameter;
/// omitted parameters impose no constraint either. Every non-wildcard
/// entry must match the record's corresponding declared value exactly,
/// so an empty or fully wildcarded constraint set resets every record of
/// the descriptor. Records of other descriptors are never touched, and a
/// descriptor with no stored records is a no-op, not an error.
pub fn invalidated_operations(
    state: &EngineState,
    descriptor_id: &str,
    params: &Params,
) -> EngineState {
    let matching: Vec<OperationRecord> = state
        .operations
        .values()
        .filter(|record| record.descriptor_id == descriptor_id)
        .cloned()
        .collect();
    if matching.is_empty() {
        return state.clone();
    }

    let descriptor = state.expect_descriptor(descriptor_id);
    let constraints: Params = params
        .iter()
        .filter(|(_, value)| **value != ParamValue::Wildcard)
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect();

    let mut next = state.clone();
    for record in matching {
        // recompute the record's declared params through the descriptor
        // rather than trusting whatever the record carries
        let keyed = derive_key_and_params(descriptor, &record.params);
        let matched = constraints
            .iter()
            .filter(|(name, value)| keyed.params.get(name.as_str()) == Some(*value))
            .count();
        if matched == constraints.len() {
            let reset =
                initial_operation(descriptor, &keyed.key, keyed.params, record.extra.clone());
            next.operations.insert(reset.key.clone(), reset);
        }
    }
    next
}
