// ── Structural equality ──
//
// Deep comparison over `serde_json::Value`, used only to decide whether
// the capability surface must be rebuilt. Recording state never goes
// through here; it uses plain boolean comparison.

use serde_json::Value;

/// Structural equality: nulls equal only nulls, arrays compare index-wise,
/// objects compare by key set (order-insensitive) and value, everything
/// else by primitive equality.
pub fn deep_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Array(x), Value::Array(y)) => arrays_equal_slices(x, y),
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x.iter()
                    .all(|(key, value)| y.get(key).is_some_and(|other| deep_equal(value, other)))
        }
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => numbers_equal(x, y),
        (Value::String(x), Value::String(y)) => x == y,
        _ => false,
    }
}

/// Positional equality of two arrays; `false` unless both are arrays.
pub fn arrays_equal(a: &Value, b: &Value) -> bool {
    match (a.as_array(), b.as_array()) {
        (Some(x), Some(y)) => arrays_equal_slices(x, y),
        _ => false,
    }
}

fn arrays_equal_slices(x: &[Value], y: &[Value]) -> bool {
    x.len() == y.len() && x.iter().zip(y).all(|(l, r)| deep_equal(l, r))
}

// 1 and 1.0 are the same number on the wire.
#[allow(clippy::float_cmp)]
fn numbers_equal(x: &serde_json::Number, y: &serde_json::Number) -> bool {
    if x == y {
        return true;
    }
    match (x.as_f64(), y.as_f64()) {
        (Some(l), Some(r)) => l == r,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn samples() -> Vec<Value> {
        vec![
            Value::Null,
            json!(true),
            json!(1),
            json!("main"),
            json!([1, 2, 3]),
            json!([3, 2, 1]),
            json!({ "a": 1, "b": [1, { "c": null }] }),
            json!({ "main": [{ "id": "1", "label": "Rtmp_push", "type": "Rtmp_push" }] }),
        ]
    }

    #[test]
    fn reflexive_and_symmetric() {
        let values = samples();
        for a in &values {
            assert!(deep_equal(a, a), "{a} should equal itself");
            for b in &values {
                assert_eq!(deep_equal(a, b), deep_equal(b, a), "{a} vs {b}");
            }
        }
    }

    #[test]
    fn object_key_order_is_ignored() {
        let a: Value = serde_json::from_str(r#"{"main": [], "sub": [{"id": "1"}]}"#).unwrap();
        let b: Value = serde_json::from_str(r#"{"sub": [{"id": "1"}], "main": []}"#).unwrap();
        assert!(deep_equal(&a, &b));
    }

    #[test]
    fn array_order_matters() {
        assert!(!deep_equal(&json!([1, 2]), &json!([2, 1])));
        assert!(!deep_equal(&json!([1, 2]), &json!([1, 2, 3])));
    }

    #[test]
    fn extra_keys_differ() {
        assert!(!deep_equal(&json!({ "a": 1 }), &json!({ "a": 1, "b": 2 })));
        assert!(!deep_equal(&json!({ "a": 1 }), &json!({ "b": 1 })));
    }

    #[test]
    fn null_only_equals_null() {
        assert!(!deep_equal(&Value::Null, &json!(false)));
        assert!(!deep_equal(&Value::Null, &json!({})));
        assert!(!deep_equal(&json!(0), &json!("0")));
    }

    #[test]
    fn integer_and_float_forms_match() {
        assert!(deep_equal(&json!(1), &json!(1.0)));
        assert!(!deep_equal(&json!(1), &json!(1.5)));
    }

    #[test]
    fn arrays_equal_requires_arrays() {
        assert!(arrays_equal(&json!([]), &json!([])));
        assert!(!arrays_equal(&json!({}), &json!({})));
        assert!(!arrays_equal(&json!([]), &Value::Null));
    }
}
