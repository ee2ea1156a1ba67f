//! # Error-record normalization.
//!
//! Every failed execution emits one record shaped as the failure's response
//! body with a `statusCode` key laid over it:
//!
//! ```text
//! body {a: 1}            status 404   →  {a: 1, statusCode: 404}
//! body {a: {b: 1}}       status 500   →  {a: {b: 1}, statusCode: 500}
//! no body                status 503   →  {statusCode: 503}
//! no body                no status    →  {statusCode: null}
//! body "Bad Gateway"     status 502   →  {body: "Bad Gateway", statusCode: 502}
//! ```
//!
//! ## Merge rule
//! [`merge`] is a recursive two-sided merge:
//! - both sides objects → merged key by key, recursively;
//! - an empty object on the overlay side never erases an existing base value;
//! - otherwise the overlay value wins.
//!
//! Arrays are not composites here: an overlay array replaces the base value.

use serde_json::{Map, Value};

use crate::error::OperationError;

/// Key under which the numeric status is recorded.
pub const STATUS_KEY: &str = "statusCode";

/// Key under which a non-object response body is kept.
pub const BODY_KEY: &str = "body";

/// Merges `overlay` into `base` and returns the result.
///
/// # Example
/// ```
/// use serde_json::json;
/// use reqvisor::merge;
///
/// let merged = merge(json!({"a": {"b": 1}, "c": 2}), json!({"a": {}, "c": 3}));
/// assert_eq!(merged, json!({"a": {"b": 1}, "c": 3}));
/// ```
pub fn merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut target), Value::Object(source)) => {
            for (key, incoming) in source {
                let merged = match target.remove(&key) {
                    Some(existing) => merge_value(existing, incoming),
                    None => incoming,
                };
                target.insert(key, merged);
            }
            Value::Object(target)
        }
        (base, overlay) => merge_value(base, overlay),
    }
}

fn merge_value(existing: Value, incoming: Value) -> Value {
    match (existing, incoming) {
        (existing @ Value::Object(_), incoming @ Value::Object(_)) => merge(existing, incoming),
        (existing, Value::Object(map)) if map.is_empty() && !existing.is_null() => existing,
        (_, incoming) => incoming,
    }
}

/// Builds the `_FAILED` payload for an operation failure.
///
/// # Example
/// ```
/// use serde_json::json;
/// use reqvisor::{OperationError, normalize_error};
///
/// let err = OperationError::response(404, json!({"a": 1}));
/// assert_eq!(normalize_error(&err), json!({"a": 1, "statusCode": 404}));
///
/// let err = OperationError::transport("connection reset");
/// assert_eq!(normalize_error(&err), json!({"statusCode": null}));
/// ```
pub fn normalize_error(err: &OperationError) -> Value {
    let body = match &err.body {
        None | Some(Value::Null) => Value::Object(Map::new()),
        Some(obj @ Value::Object(_)) => obj.clone(),
        Some(other) => {
            let mut wrapped = Map::new();
            wrapped.insert(BODY_KEY.into(), other.clone());
            Value::Object(wrapped)
        }
    };

    let mut overlay = Map::new();
    overlay.insert(
        STATUS_KEY.into(),
        err.status.map_or(Value::Null, Value::from),
    );

    merge(body, Value::Object(overlay))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn nested_objects_merge_recursively() {
        let merged = merge(
            json!({"a": {"b": 1, "c": {"d": 2}}}),
            json!({"a": {"c": {"e": 3}}, "f": 4}),
        );
        assert_eq!(merged, json!({"a": {"b": 1, "c": {"d": 2, "e": 3}}, "f": 4}));
    }

    #[test]
    fn empty_overlay_object_keeps_base_value() {
        assert_eq!(merge(json!({"a": {"x": 1}}), json!({"a": {}})), json!({"a": {"x": 1}}));
        assert_eq!(merge(json!({"a": 1}), json!({"a": {}})), json!({"a": 1}));
    }

    #[test]
    fn empty_base_object_takes_overlay() {
        assert_eq!(merge(json!({"a": {}}), json!({"a": 5})), json!({"a": 5}));
        assert_eq!(merge(json!({}), json!({"a": {"b": 1}})), json!({"a": {"b": 1}}));
    }

    #[test]
    fn null_base_is_replaced_by_empty_object() {
        assert_eq!(merge(json!({"a": null}), json!({"a": {}})), json!({"a": {}}));
    }

    #[test]
    fn scalar_and_array_overlay_wins() {
        assert_eq!(merge(json!({"a": 1}), json!({"a": 2})), json!({"a": 2}));
        assert_eq!(merge(json!({"a": [1, 2]}), json!({"a": [3]})), json!({"a": [3]}));
        assert_eq!(merge(json!({"a": {"b": 1}}), json!({"a": null})), json!({"a": null}));
    }

    #[test]
    fn body_and_status() {
        let err = OperationError::response(404, json!({"a": 1}));
        assert_eq!(normalize_error(&err), json!({"a": 1, "statusCode": 404}));
    }

    #[test]
    fn nested_body_survives() {
        let err = OperationError::response(500, json!({"a": {"b": 1}}));
        assert_eq!(normalize_error(&err), json!({"a": {"b": 1}, "statusCode": 500}));
    }

    #[test]
    fn status_without_body() {
        assert_eq!(
            normalize_error(&OperationError::status(503)),
            json!({"statusCode": 503})
        );
    }

    #[test]
    fn transport_failure() {
        assert_eq!(
            normalize_error(&OperationError::transport("dns")),
            json!({"statusCode": null})
        );
    }

    #[test]
    fn body_status_code_is_overridden() {
        let err = OperationError::response(409, json!({"statusCode": 200, "msg": "busy"}));
        assert_eq!(
            normalize_error(&err),
            json!({"statusCode": 409, "msg": "busy"})
        );
    }

    #[test]
    fn non_object_body_is_wrapped() {
        let err = OperationError::response(502, json!("Bad Gateway"));
        assert_eq!(
            normalize_error(&err),
            json!({"body": "Bad Gateway", "statusCode": 502})
        );
    }
}
