use serde_json::Value;

/// Sentinel substituted for any scalar value that must not be logged.
const REDACTED: &str = "<redacted>";

/// Depth limit for redacted recursion (spec.md §4.4: "up to a fixed
/// depth"). Past this depth, nested containers collapse to the sentinel
/// too rather than recursing forever on pathological input.
const MAX_DEPTH: usize = 4;

/// Recursively replaces all scalar values with a sentinel, preserving
/// container shape (arrays stay arrays, object keys are preserved) but not
/// contents. Used whenever a logging policy slot says "redact".
pub fn redact(value: &Value) -> Value {
    redact_at_depth(value, MAX_DEPTH)
}

fn redact_at_depth(value: &Value, depth: usize) -> Value {
    if depth == 0 {
        return Value::String(REDACTED.to_string());
    }
    match value {
        Value::Array(items) => {
            Value::Array(items.iter().map(|v| redact_at_depth(v, depth - 1)).collect())
        }
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), redact_at_depth(v, depth - 1)))
                .collect(),
        ),
        Value::Null => Value::Null,
        _ => Value::String(REDACTED.to_string()),
    }
}

/// Redacts an argument list per a method's `args_loggable` policy, or
/// fully redacts every argument when `args_loggable` is `None` (target
/// unknown, spec.md §4.1 "If the target for a call is unknown... treat
/// all arguments and results as redacted").
pub fn redact_args(args: &[Value], args_loggable: Option<&[bool]>) -> Vec<Value> {
    args.iter()
        .enumerate()
        .map(|(i, v)| {
            let loggable = args_loggable.and_then(|l| l.get(i)).copied().unwrap_or(false);
            if loggable {
                v.clone()
            } else {
                redact(v)
            }
        })
        .collect()
}

pub fn redact_result(result: &Value, result_loggable: bool) -> Value {
    if result_loggable {
        result.clone()
    } else {
        redact(result)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use serde_json::json;

    #[test]
    fn redact_preserves_shape_not_contents() {
        let v = json!({"a": [1, 2, {"b": "secret"}], "c": null});
        let redacted = redact(&v);
        assert_eq!(redacted["a"][2]["b"], json!(REDACTED));
        assert_eq!(redacted["c"], Value::Null);
        assert!(redacted["a"].is_array());
        assert_eq!(redacted["a"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn redact_args_never_equals_the_original_for_non_loggable_slots() {
        let args = vec![json!("super-secret"), json!(42)];
        let out = redact_args(&args, Some(&[false, true]));
        assert_ne!(out[0], args[0]);
        assert_eq!(out[1], args[1]);
    }

    #[test]
    fn unknown_target_redacts_everything() {
        let args = vec![json!("secret"), json!("also secret")];
        let out = redact_args(&args, None);
        assert_ne!(out[0], args[0]);
        assert_ne!(out[1], args[1]);
    }

    #[test]
    fn depth_limit_collapses_deep_nesting() {
        let deep = json!({"a": {"b": {"c": {"d": {"e": "leaf"}}}}});
        let redacted = redact(&deep);
        // At depth 4 the fifth level collapses to the sentinel string.
        assert_eq!(redacted["a"]["b"]["c"]["d"], json!(REDACTED));
    }
}
