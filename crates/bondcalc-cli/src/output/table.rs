use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

/// Format output as a table using the tabled crate.
pub fn print_table(value: &Value) {
    match value {
        Value::Object(map) => match (map.get("result"), map.get("results")) {
            (Some(Value::Object(result)), _) => {
                println!("{}", field_table(result));
                print_envelope_notes(map);
            }
            (_, Some(Value::Array(rows))) => println!("{}", rows_table(rows)),
            _ => println!("{}", field_table(map)),
        },
        Value::Array(rows) => println!("{}", rows_table(rows)),
        other => println!("{other}"),
    }
}

fn print_envelope_notes(envelope: &Map<String, Value>) {
    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings.iter().filter_map(Value::as_str) {
                println!("  - {w}");
            }
        }
    }

    if let Some(Value::String(meth)) = envelope.get("methodology") {
        println!("\nMethodology: {meth}");
    }
}

fn field_table(map: &Map<String, Value>) -> Table {
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    for (key, val) in map {
        builder.push_record([key.as_str(), &format_value(val)]);
    }
    builder.build()
}

fn rows_table(rows: &[Value]) -> String {
    let Some(Value::Object(first)) = rows.first() else {
        if rows.is_empty() {
            return "(empty)".to_string();
        }
        return rows.iter().map(format_value).collect::<Vec<_>>().join("\n");
    };

    let headers: Vec<String> = first.keys().cloned().collect();
    let mut builder = Builder::default();
    builder.push_record(&headers);
    for item in rows {
        if let Value::Object(map) = item {
            let row: Vec<String> = headers
                .iter()
                .map(|h| map.get(h.as_str()).map(format_value).unwrap_or_default())
                .collect();
            builder.push_record(row);
        }
    }
    builder.build().to_string()
}

fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "-".to_string(),
        Value::Array(arr) => arr.iter().map(format_value).collect::<Vec<_>>().join(", "),
        Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}
