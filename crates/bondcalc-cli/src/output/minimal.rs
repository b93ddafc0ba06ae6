use serde_json::Value;

/// Key answer fields, most specific first.
const PRIORITY_KEYS: [&str; 9] = [
    "ytw_pct",
    "ytm_pct",
    "stressed_present_value",
    "present_value",
    "stressed_rate",
    "annual_yield",
    "cashflows",
    "worst_cashflows",
    "results",
];

/// Print just the key answer value from the output, falling back to the
/// first field in the result object.
pub fn print_minimal(value: &Value) {
    println!("{}", minimal_line(value));
}

fn minimal_line(value: &Value) -> String {
    let result_obj = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    if let Value::Object(map) = result_obj {
        for key in PRIORITY_KEYS {
            if let Some(val) = map.get(key).filter(|v| !v.is_null()) {
                return format_minimal(val);
            }
        }
        if let Some((key, val)) = map.iter().next() {
            return format!("{key}: {}", format_minimal(val));
        }
    }

    format_minimal(result_obj)
}

fn format_minimal(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        Value::Array(items) => items.iter().map(format_minimal).collect::<Vec<_>>().join(" "),
        Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ytw_wins_over_ytm() {
        let v = json!({ "result": { "ytm_pct": "6.19", "ytw_pct": "5.82" } });
        assert_eq!(minimal_line(&v), "5.82");
    }

    #[test]
    fn test_cashflows_printed_space_separated() {
        let v = json!({ "result": { "periods": 2, "cashflows": ["50", "1050"] } });
        assert_eq!(minimal_line(&v), "50 1050");
    }

    #[test]
    fn test_falls_back_to_first_field() {
        let v = json!({ "result": { "stress": "x" } });
        assert_eq!(minimal_line(&v), "stress: x");
    }
}
