// store/cell.rs
//
// A cell may arrive as text, integer or floating point depending on how the
// sheet was edited. These conversions are total: they return a defined
// default instead of propagating a type error. Only `id_value` is strict,
// because an unparseable primary identifier means the row must be skipped.
use serde_json::Value;

pub fn string_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

pub fn int_value(value: &Value) -> i64 {
    id_value(value).unwrap_or(0)
}

pub fn float_value(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => clean_numeric(s).parse::<f64>().unwrap_or(0.0),
        _ => {
            let s = string_value(value);
            clean_numeric(&s).parse::<f64>().unwrap_or(0.0)
        }
    }
}

/// Strict integer parse for primary identifiers. Strings are cleaned of all
/// whitespace first, non-breaking spaces included: imported id columns
/// frequently carry "7 968 044"-style grouping.
pub fn id_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => {
            let cleaned = clean_numeric(s);
            if cleaned.is_empty() {
                return None;
            }
            cleaned.parse::<i64>().ok()
        }
        _ => None,
    }
}

pub fn clean_numeric(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn string_value_trims_and_defaults() {
        assert_eq!(string_value(&json!("  AB12CD  ")), "AB12CD");
        assert_eq!(string_value(&Value::Null), "");
        assert_eq!(string_value(&json!(42)), "42");
    }

    #[test]
    fn float_value_is_total() {
        assert_eq!(float_value(&json!(12.5)), 12.5);
        assert_eq!(float_value(&json!("12.5")), 12.5);
        assert_eq!(float_value(&json!("")), 0.0);
        assert_eq!(float_value(&json!("not a number")), 0.0);
        assert_eq!(float_value(&Value::Null), 0.0);
    }

    #[test]
    fn int_value_is_total() {
        assert_eq!(int_value(&json!(7)), 7);
        assert_eq!(int_value(&json!("7")), 7);
        assert_eq!(int_value(&json!("x")), 0);
    }

    #[test]
    fn id_value_cleans_nbsp_grouping() {
        assert_eq!(id_value(&json!("7\u{a0}968\u{a0}044")), Some(7_968_044));
        assert_eq!(id_value(&json!(" 1001 ")), Some(1001));
        assert_eq!(id_value(&json!(1001.0)), Some(1001));
    }

    #[test]
    fn id_value_rejects_text() {
        assert_eq!(id_value(&json!("no id here")), None);
        assert_eq!(id_value(&json!("")), None);
        assert_eq!(id_value(&Value::Null), None);
    }
}
