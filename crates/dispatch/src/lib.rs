//! cachet-dispatch: event and reducer adapter for the cachet engine.
//!
//! Translates reducer-style host dispatch into core engine calls and
//! back. Hosts build step-tagged events with the builders here, feed
//! every event through [`reduce_operation_event`], and turn stored
//! records back into dispatchable events with [`event_for_operation`].
//! The engine itself never sees event envelopes; payload unwrapping stays
//! on this side of the boundary.

use serde::{Deserialize, Serialize};

use cachet_core::config::logger;
use cachet_core::{
    apply_step_at, derive_key_and_params, manager_state, now_epoch_ms, EngineState, EpochMillis,
    OperationRecord, Params, Step, Violation,
};

pub use cachet_core::WILDCARD;

/// A dispatchable operation event.
///
/// Step events carry a conventional `event_type` of
/// `"BEGIN__<descriptorId>"`, `"RESOLVE__<descriptorId>"`, or
/// `"REJECT__<descriptorId>"`; untagged events use the descriptor id
/// itself. `remainder` carries every input field the descriptor does not
/// declare, so ids and payload fields survive the round trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationEvent {
    pub event_type: String,
    pub descriptor_id: String,
    pub step: Option<Step>,
    pub params: Params,
    pub key: String,
    pub remainder: Params,
}

fn step_tag(step: Step) -> &'static str {
    match step {
        Step::Begin => "BEGIN",
        Step::Resolve => "RESOLVE",
        Step::Reject => "REJECT",
    }
}

/// The conventional event type of a descriptor's resolve step.
pub fn resolve_event_type(descriptor_id: &str) -> String {
    format!("RESOLVE__{descriptor_id}")
}

fn build_event(descriptor_id: &str, raw: &Params, step: Option<Step>) -> OperationEvent {
    let state = manager_state();
    let descriptor = state.expect_descriptor(descriptor_id);
    let keyed = derive_key_and_params(descriptor, raw);
    let event_type = match step {
        Some(step) => format!("{}__{}", step_tag(step), descriptor_id),
        None => descriptor_id.to_string(),
    };
    OperationEvent {
        event_type,
        descriptor_id: descriptor_id.to_string(),
        step,
        params: keyed.params,
        key: keyed.key,
        remainder: keyed.remainder,
    }
}

/// An untagged event for a descriptor, carrying derived params and key.
/// Reducing it is a no-op; hosts use it to seed their own bookkeeping.
pub fn initial_event(descriptor_id: &str, raw: &Params) -> OperationEvent {
    build_event(descriptor_id, raw, None)
}

/// A `BEGIN__<descriptorId>` step event.
pub fn begin_event(descriptor_id: &str, raw: &Params) -> OperationEvent {
    build_event(descriptor_id, raw, Some(Step::Begin))
}

/// A `RESOLVE__<descriptorId>` step event.
pub fn resolve_event(descriptor_id: &str, raw: &Params) -> OperationEvent {
    build_event(descriptor_id, raw, Some(Step::Resolve))
}

/// A `REJECT__<descriptorId>` step event.
pub fn reject_event(descriptor_id: &str, raw: &Params) -> OperationEvent {
    build_event(descriptor_id, raw, Some(Step::Reject))
}

/// Reduce one event against a snapshot at the current wall-clock time.
pub fn reduce_operation_event(state: &EngineState, event: &OperationEvent) -> EngineState {
    reduce_operation_event_at(state, event, now_epoch_ms())
}

/// [`reduce_operation_event`] against an explicit clock reading.
///
/// Step-tagged events flow into the engine's step application; anything
/// else returns the snapshot unchanged.
pub fn reduce_operation_event_at(
    state: &EngineState,
    event: &OperationEvent,
    now_ms: EpochMillis,
) -> EngineState {
    let Some(step) = event.step else {
        return state.clone();
    };
    if event.descriptor_id.is_empty() {
        return state.clone();
    }
    let mut raw = event.params.clone();
    raw.extend(
        event
            .remainder
            .iter()
            .map(|(name, value)| (name.clone(), value.clone())),
    );
    apply_step_at(state, step, &event.descriptor_id, &raw, now_ms)
}

/// Turn a stored record back into a dispatchable event.
///
/// Lifecycle fields (statuses, timestamps, message) are stripped; params
/// and passthrough fields are kept, with `extra` merged over them. A
/// record without a descriptor id is reported through the logger and
/// still returned with whatever fields it has.
pub fn event_for_operation(record: &OperationRecord, extra: &Params) -> OperationEvent {
    if record.descriptor_id.is_empty() {
        logger().exception(
            "operation record has no descriptor id to re-dispatch under",
            &Violation::MissingDescriptorIdOnDispatch,
        );
    }
    let mut remainder = record.extra.clone();
    remainder.extend(
        extra
            .iter()
            .map(|(name, value)| (name.clone(), value.clone())),
    );
    OperationEvent {
        event_type: record.descriptor_id.clone(),
        descriptor_id: record.descriptor_id.clone(),
        step: None,
        params: record.params.clone(),
        key: record.key.clone(),
        remainder,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cachet_core::{
        clear_manager_state, register_operation_descriptors, FetchStatus, OperationDescriptor,
        OperationType, ParamValue,
    };
    use std::sync::{Mutex, MutexGuard};

    static GUARD: Mutex<()> = Mutex::new(());

    fn serial() -> MutexGuard<'static, ()> {
        GUARD.lock().unwrap_or_else(|poison| poison.into_inner())
    }

    fn params(entries: &[(&str, ParamValue)]) -> Params {
        entries
            .iter()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect()
    }

    fn register_fetch_person() -> EngineState {
        register_operation_descriptors(vec![OperationDescriptor {
            descriptor_id: "FETCH_PERSON_DATA".to_string(),
            operation_type: OperationType::Read,
            required_params: vec!["personId".to_string()],
            ..Default::default()
        }])
    }

    #[test]
    fn begin_event_is_step_tagged_and_keyed() {
        let _guard = serial();
        clear_manager_state();
        register_fetch_person();

        let event = begin_event(
            "FETCH_PERSON_DATA",
            &params(&[("personId", 111.into()), ("source", "profile".into())]),
        );
        assert_eq!(event.event_type, "BEGIN__FETCH_PERSON_DATA");
        assert_eq!(event.step, Some(Step::Begin));
        assert_eq!(event.key, "FETCH_PERSON_DATA_111");
        assert_eq!(event.params, params(&[("personId", 111.into())]));
        assert_eq!(event.remainder, params(&[("source", "profile".into())]));
    }

    #[test]
    fn initial_event_uses_the_descriptor_id_as_its_type() {
        let _guard = serial();
        clear_manager_state();
        register_fetch_person();

        let event = initial_event("FETCH_PERSON_DATA", &params(&[("personId", 111.into())]));
        assert_eq!(event.event_type, "FETCH_PERSON_DATA");
        assert!(event.step.is_none());
    }

    #[test]
    fn resolve_event_type_matches_resolve_events() {
        let _guard = serial();
        clear_manager_state();
        register_fetch_person();

        let event = resolve_event("FETCH_PERSON_DATA", &params(&[("personId", 111.into())]));
        assert_eq!(event.event_type, resolve_event_type("FETCH_PERSON_DATA"));
    }

    #[test]
    fn untagged_events_reduce_to_the_same_state() {
        let _guard = serial();
        clear_manager_state();
        let state = register_fetch_person();

        let event = initial_event("FETCH_PERSON_DATA", &params(&[("personId", 111.into())]));
        let next = reduce_operation_event_at(&state, &event, 1_530_518_207_007);
        assert!(next.operations.is_empty());
    }

    #[test]
    fn event_for_operation_round_trips_params_and_extras() {
        let _guard = serial();
        clear_manager_state();
        let state = register_fetch_person();

        let raw = params(&[("personId", 111.into())]);
        let begin = begin_event("FETCH_PERSON_DATA", &raw);
        let state = reduce_operation_event_at(&state, &begin, 1_530_518_207_007);
        let record = &state.operations["FETCH_PERSON_DATA_111"];
        assert_eq!(record.fetch_status, FetchStatus::Pending);

        let event = event_for_operation(record, &params(&[("refetch", true.into())]));
        assert_eq!(event.event_type, "FETCH_PERSON_DATA");
        assert_eq!(event.params, raw);
        assert_eq!(event.key, "FETCH_PERSON_DATA_111");
        assert_eq!(event.remainder, params(&[("refetch", true.into())]));
    }

    #[test]
    fn event_for_operation_tolerates_a_missing_descriptor_id() {
        let record = OperationRecord {
            descriptor_id: String::new(),
            key: "ORPHAN_111".to_string(),
            fetch_status: FetchStatus::Successful,
            data_status: None,
            message: None,
            last_fetch_status_time: 1,
            last_data_status_time: 0,
            last_fetch_failed: Some(false),
            params: params(&[("personId", 111.into())]),
            extra: Params::new(),
        };
        let event = event_for_operation(&record, &Params::new());
        assert_eq!(event.event_type, "");
        assert_eq!(event.params, params(&[("personId", 111.into())]));
    }
}
