//! Deterministic instance-key derivation and parameter validation.
//!
//! An instance key identifies one (descriptor, concrete params) pairing.
//! Only parameter values take part, never names, and every value is
//! sorted into place independently, so any permutation of the same
//! parameter record derives the same key.

use crate::config::logger;
use crate::error::Violation;
use crate::types::{OperationDescriptor, ParamValue, Params};

/// A raw input bag split into its derived parts.
pub struct KeyedParams {
    /// The declared (required + optional) parameter values.
    pub params: Params,
    /// The derived instance key.
    pub key: String,
    /// Everything in the input the descriptor does not declare.
    pub remainder: Params,
}

fn value_string(value: &ParamValue) -> String {
    match value {
        ParamValue::Null => "null".to_string(),
        ParamValue::Bool(flag) => flag.to_string(),
        ParamValue::Int(number) => number.to_string(),
        ParamValue::Text(text) => text.clone(),
        ParamValue::Wildcard => "*".to_string(),
        ParamValue::List(items) => {
            let mut parts: Vec<String> = items.iter().map(value_string).collect();
            parts.sort();
            parts.join(",")
        }
    }
}

/// Derive the instance key for a descriptor id and parameter record.
///
/// Each value is stringified (list elements sorted and joined with `,`
/// first), the value strings are sorted, joined with `_`, and appended to
/// the descriptor id with a `_` separator. With no params the key is the
/// descriptor id verbatim. The input is never mutated.
///
/// An empty descriptor id is reported as a [`Violation::LabelError`] and
/// the empty label is used as a sentinel rather than failing.
pub fn derive_key(descriptor_id: &str, params: &Params) -> String {
    if descriptor_id.is_empty() {
        logger().exception(
            "cannot derive an operation key without a label",
            &Violation::LabelError,
        );
    }
    if params.is_empty() {
        return descriptor_id.to_string();
    }
    let mut parts: Vec<String> = params.values().map(value_string).collect();
    parts.sort();
    format!("{}_{}", descriptor_id, parts.join("_"))
}

/// Pick the declared params out of a raw input bag.
///
/// Required params must be present; absence is reported as a
/// [`Violation::MissingRequiredParam`] and the param is skipped, so the
/// result carries only what was resolvable. A `Null` value is present and
/// valid. Optional params are included when present.
pub fn collect_params(raw: &Params, descriptor: &OperationDescriptor) -> Params {
    let mut params = Params::new();
    for name in &descriptor.required_params {
        match raw.get(name) {
            Some(value) => {
                params.insert(name.clone(), value.clone());
            }
            None => {
                logger().exception(
                    &format!(
                        "operation '{}' is missing required param '{}'",
                        descriptor.descriptor_id, name
                    ),
                    &Violation::MissingRequiredParam {
                        descriptor_id: descriptor.descriptor_id.clone(),
                        param: name.clone(),
                    },
                );
            }
        }
    }
    for name in &descriptor.optional_params {
        if let Some(value) = raw.get(name) {
            params.insert(name.clone(), value.clone());
        }
    }
    params
}

/// Split a raw input bag into declared params, derived key, and the
/// unrecognized remainder.
pub fn derive_key_and_params(descriptor: &OperationDescriptor, raw: &Params) -> KeyedParams {
    let params = collect_params(raw, descriptor);
    let key = derive_key(&descriptor.descriptor_id, &params);
    let remainder = raw
        .iter()
        .filter(|(name, _)| !params.contains_key(*name))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect();
    KeyedParams {
        params,
        key,
        remainder,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::OperationType;

    fn params(entries: &[(&str, ParamValue)]) -> Params {
        entries
            .iter()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect()
    }

    fn text_list(items: &[&str]) -> ParamValue {
        ParamValue::List(items.iter().map(|item| ParamValue::from(*item)).collect())
    }

    #[test]
    fn key_with_no_params_is_the_descriptor_id() {
        assert_eq!(
            derive_key("UPDATE_PERSON_DATA", &Params::new()),
            "UPDATE_PERSON_DATA"
        );
    }

    #[test]
    fn key_with_one_param() {
        let key = derive_key("UPDATE_PERSON_DATA", &params(&[("personId", 111.into())]));
        assert_eq!(key, "UPDATE_PERSON_DATA_111");
    }

    #[test]
    fn key_sorts_values_not_names() {
        let key = derive_key(
            "UPDATE_PERSON_DATA",
            &params(&[("orgId", 222.into()), ("personId", 111.into())]),
        );
        assert_eq!(key, "UPDATE_PERSON_DATA_111_222");
    }

    #[test]
    fn key_sorts_list_elements_independently() {
        let key = derive_key(
            "UPDATE_KITTY_DATA",
            &params(&[
                ("orgId", 222.into()),
                ("personId", 111.into()),
                ("catIds", text_list(&["c", "a", "b"])),
            ]),
        );
        assert_eq!(key, "UPDATE_KITTY_DATA_111_222_a,b,c");
    }

    #[test]
    fn key_is_order_independent() {
        let forward = derive_key(
            "UPDATE_KITTY_DATA",
            &params(&[
                ("orgId", 222.into()),
                ("personId", 111.into()),
                (
                    "catIds",
                    text_list(&["person_1246_25291", "person_1246_25271", "person_1246_25292"]),
                ),
            ]),
        );
        let shuffled = derive_key(
            "UPDATE_KITTY_DATA",
            &params(&[
                (
                    "catIds",
                    text_list(&["person_1246_25292", "person_1246_25271", "person_1246_25291"]),
                ),
                ("personId", 111.into()),
                ("orgId", 222.into()),
            ]),
        );
        assert_eq!(forward, shuffled);
        assert_eq!(
            forward,
            "UPDATE_KITTY_DATA_111_222_person_1246_25271,person_1246_25291,person_1246_25292"
        );
    }

    #[test]
    fn key_derivation_does_not_mutate_input() {
        let input = params(&[
            ("personId", 111.into()),
            ("orgId", 222.into()),
            ("catIds", text_list(&["1", "3", "2"])),
        ]);
        let before = input.clone();
        derive_key("UPDATE_KITTY_DATA", &input);
        assert_eq!(input, before);
        assert_eq!(input["catIds"], text_list(&["1", "3", "2"]));
    }

    #[test]
    fn empty_label_derives_sentinel_key() {
        let key = derive_key("", &params(&[("personId", 111.into())]));
        assert_eq!(key, "_111");
        assert_eq!(derive_key("", &Params::new()), "");
    }

    fn descriptor(required: &[&str], optional: &[&str]) -> OperationDescriptor {
        OperationDescriptor {
            descriptor_id: "FETCH_PERSON_DATA".to_string(),
            operation_type: OperationType::Read,
            required_params: required.iter().map(|name| name.to_string()).collect(),
            optional_params: optional.iter().map(|name| name.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn collect_params_picks_required_values() {
        let raw = params(&[
            ("personId", 2.into()),
            ("orgId", 10.into()),
            ("name", "Name".into()),
        ]);
        let collected = collect_params(&raw, &descriptor(&["personId", "orgId"], &[]));
        assert_eq!(
            collected,
            params(&[("personId", 2.into()), ("orgId", 10.into())])
        );
    }

    #[test]
    fn collect_params_includes_optional_when_present() {
        let raw = params(&[
            ("personId", 2.into()),
            ("orgId", 10.into()),
            ("age", 25.into()),
        ]);
        let collected = collect_params(&raw, &descriptor(&["personId", "orgId"], &["age"]));
        assert_eq!(
            collected,
            params(&[
                ("personId", 2.into()),
                ("orgId", 10.into()),
                ("age", 25.into()),
            ])
        );
    }

    #[test]
    fn collect_params_returns_only_optional_when_none_required() {
        let raw = params(&[("personId", 2.into()), ("age", 25.into())]);
        let collected = collect_params(&raw, &descriptor(&[], &["age"]));
        assert_eq!(collected, params(&[("age", 25.into())]));
    }

    #[test]
    fn collect_params_skips_missing_required_param() {
        let raw = params(&[("personId", 2.into())]);
        let collected = collect_params(&raw, &descriptor(&["personId", "orgId"], &[]));
        assert_eq!(collected, params(&[("personId", 2.into())]));
    }

    #[test]
    fn collect_params_accepts_null_required_param() {
        let raw = params(&[("personId", ParamValue::Null), ("orgId", 10.into())]);
        let collected = collect_params(&raw, &descriptor(&["personId", "orgId"], &[]));
        assert_eq!(collected.len(), 2);
        assert_eq!(collected["personId"], ParamValue::Null);
    }

    #[test]
    fn derive_key_and_params_splits_remainder() {
        let raw = params(&[
            ("personId", 111.into()),
            ("note", "keep me".into()),
        ]);
        let keyed = derive_key_and_params(&descriptor(&["personId"], &[]), &raw);
        assert_eq!(keyed.params, params(&[("personId", 111.into())]));
        assert_eq!(keyed.key, "FETCH_PERSON_DATA_111");
        assert_eq!(keyed.remainder, params(&[("note", "keep me".into())]));
    }
}
