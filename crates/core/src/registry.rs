//! Descriptor registration.
//!
//! Registration upserts descriptors by id into a new state snapshot.
//! Defaults for unset optional fields come from
//! `OperationDescriptor::default()`; validation reports violations through
//! the logger and still registers best-effort.

use crate::config::logger;
use crate::error::Violation;
use crate::types::{EngineState, OperationDescriptor};

fn validate_descriptor(descriptor: &OperationDescriptor) {
    if descriptor.descriptor_id.is_empty() {
        logger().exception(
            "descriptor is missing a descriptor id; registering it anyway",
            &Violation::MissingDescriptorId,
        );
    }
}

/// Upsert one descriptor, returning the new state. No other registry
/// entries are disturbed; re-registering an id replaces it.
pub fn register_descriptor(state: &EngineState, descriptor: OperationDescriptor) -> EngineState {
    validate_descriptor(&descriptor);
    let mut next = state.clone();
    next.descriptors
        .insert(descriptor.descriptor_id.clone(), descriptor);
    next
}

/// Upsert a batch of descriptors in order.
pub fn register_descriptors(
    state: &EngineState,
    descriptors: Vec<OperationDescriptor>,
) -> EngineState {
    descriptors
        .into_iter()
        .fold(state.clone(), |acc, descriptor| {
            register_descriptor(&acc, descriptor)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::OperationType;

    #[test]
    fn registers_one_descriptor() {
        let state = register_descriptor(
            &EngineState::new(),
            OperationDescriptor {
                descriptor_id: "FETCH_ALL_BEVERAGES_FOR_ORG".to_string(),
                operation_type: OperationType::Read,
                required_params: vec!["orgId".to_string()],
                ..Default::default()
            },
        );
        assert_eq!(state.descriptors.len(), 1);
        assert!(state.descriptor("FETCH_ALL_BEVERAGES_FOR_ORG").is_some());
    }

    #[test]
    fn registers_a_batch_in_order() {
        let state = register_descriptors(
            &EngineState::new(),
            vec![
                OperationDescriptor {
                    descriptor_id: "FETCH_ALL_BEVERAGES_FOR_ORG".to_string(),
                    operation_type: OperationType::Read,
                    required_params: vec!["orgId".to_string()],
                    ..Default::default()
                },
                OperationDescriptor {
                    descriptor_id: "DRINK_BEVERAGE_BY_ID_FOR_ORG".to_string(),
                    operation_type: OperationType::Write,
                    required_params: vec!["orgId".to_string(), "beverageId".to_string()],
                    ..Default::default()
                },
            ],
        );
        assert_eq!(state.descriptors.len(), 2);
        assert!(state.descriptor("DRINK_BEVERAGE_BY_ID_FOR_ORG").is_some());
    }

    #[test]
    fn reregistering_replaces_by_id() {
        let first = register_descriptor(
            &EngineState::new(),
            OperationDescriptor {
                descriptor_id: "FETCH_PERSON_DATA".to_string(),
                operation_type: OperationType::Read,
                min_cache_time: 5000,
                ..Default::default()
            },
        );
        let second = register_descriptor(
            &first,
            OperationDescriptor {
                descriptor_id: "FETCH_PERSON_DATA".to_string(),
                operation_type: OperationType::Read,
                min_cache_time: 250,
                ..Default::default()
            },
        );
        assert_eq!(second.descriptors.len(), 1);
        assert_eq!(
            second.expect_descriptor("FETCH_PERSON_DATA").min_cache_time,
            250
        );
    }

    #[test]
    fn descriptor_without_id_is_still_registered() {
        let state = register_descriptor(
            &EngineState::new(),
            OperationDescriptor {
                operation_type: OperationType::Write,
                required_params: vec!["personId".to_string()],
                ..Default::default()
            },
        );
        assert!(state.descriptor("").is_some());
    }

    #[test]
    fn registration_does_not_disturb_other_entries() {
        let mut state = EngineState::new();
        for id in ["A", "B", "C"] {
            state = register_descriptor(
                &state,
                OperationDescriptor {
                    descriptor_id: id.to_string(),
                    operation_type: OperationType::Read,
                    ..Default::default()
                },
            );
        }
        let next = register_descriptor(
            &state,
            OperationDescriptor {
                descriptor_id: "B".to_string(),
                operation_type: OperationType::Read,
                debug: true,
                ..Default::default()
            },
        );
        assert_eq!(next.descriptors.len(), 3);
        assert!(next.expect_descriptor("B").debug);
        assert!(!next.expect_descriptor("A").debug);
    }
}
