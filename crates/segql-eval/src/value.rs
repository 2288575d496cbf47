//! Coercions between JSON cell values and the engine's string, number and
//! boolean views of them

use serde_json::Value;

use segql_ir::NativeLiteral;

/// Booleans are longs
pub fn from_bool(value: bool) -> Value {
    Value::from(i64::from(value))
}

pub fn from_literal(literal: &NativeLiteral) -> Value {
    match literal {
        NativeLiteral::Null => Value::Null,
        NativeLiteral::Long(v) => Value::from(*v),
        NativeLiteral::Double(v) => Value::from(*v),
        NativeLiteral::String(s) => Value::String(s.clone()),
    }
}

/// String form a column scan sees; `None` for null
pub fn as_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(i64::from(*b).to_string()),
        Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}

pub fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub fn is_number(value: &Value) -> bool {
    matches!(value, Value::Number(_) | Value::Bool(_))
}

/// Truth value of a non-null result
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|v| v != 0.0),
        Value::String(s) => s.trim().parse::<f64>().is_ok_and(|v| v != 0.0),
        Value::Null => false,
        _ => true,
    }
}

/// Three-valued truth of a result: `None` when it is null
pub fn truth(value: &Value) -> Option<bool> {
    (!value.is_null()).then(|| is_truthy(value))
}

pub fn from_truth(truth: Option<bool>) -> Value {
    truth.map(from_bool).unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_string_forms() {
        assert_eq!(as_string(&json!("a")), Some("a".to_string()));
        assert_eq!(as_string(&json!(10)), Some("10".to_string()));
        assert_eq!(as_string(&json!(true)), Some("1".to_string()));
        assert_eq!(as_string(&Value::Null), None);
    }

    #[test]
    fn test_truth() {
        assert_eq!(truth(&json!(1)), Some(true));
        assert_eq!(truth(&json!(0)), Some(false));
        assert_eq!(truth(&Value::Null), None);
        assert_eq!(as_number(&json!(" 2.5 ")), Some(2.5));
    }
}
