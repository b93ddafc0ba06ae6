use serde::Serialize;
use serde_json::Value;
use std::io;
use std::path::Path;

/// Write output as CSV to stdout.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());

    let written = match value {
        Value::Object(map) => match (map.get("result"), map.get("results")) {
            (Some(Value::Object(result)), _) => write_fields(&mut wtr, result),
            (_, Some(Value::Array(rows))) => write_rows(&mut wtr, rows),
            _ => write_fields(&mut wtr, map),
        },
        Value::Array(rows) => write_rows(&mut wtr, rows),
        other => wtr.write_record([&format_csv_value(other)]),
    };

    if let Err(e) = written.and_then(|_| wtr.flush().map_err(csv::Error::from)) {
        tracing::error!(error = %e, "CSV output failed");
    }
}

/// Serialize typed records to a CSV file, header row first.
pub fn write_records<T: Serialize>(
    path: &Path,
    records: &[T],
) -> Result<(), Box<dyn std::error::Error>> {
    let mut wtr = csv::Writer::from_path(path)
        .map_err(|e| format!("Failed to create '{}': {}", path.display(), e))?;
    for record in records {
        wtr.serialize(record)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Two-column CSV: field, value
fn write_fields<W: io::Write>(
    wtr: &mut csv::Writer<W>,
    map: &serde_json::Map<String, Value>,
) -> csv::Result<()> {
    wtr.write_record(["field", "value"])?;
    for (key, val) in map {
        wtr.write_record([key.as_str(), &format_csv_value(val)])?;
    }
    Ok(())
}

fn write_rows<W: io::Write>(wtr: &mut csv::Writer<W>, rows: &[Value]) -> csv::Result<()> {
    let Some(Value::Object(first)) = rows.first() else {
        for item in rows {
            wtr.write_record([&format_csv_value(item)])?;
        }
        return Ok(());
    };

    let headers: Vec<&str> = first.keys().map(String::as_str).collect();
    wtr.write_record(&headers)?;
    for item in rows {
        if let Value::Object(map) = item {
            let row: Vec<String> = headers
                .iter()
                .map(|h| map.get(*h).map(format_csv_value).unwrap_or_default())
                .collect();
            wtr.write_record(&row)?;
        }
    }
    Ok(())
}

/// Cashflow arrays are joined with `;` so they stay in one cell.
fn format_csv_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        Value::Array(items) if items.iter().all(|v| !v.is_object() && !v.is_array()) => items
            .iter()
            .map(format_csv_value)
            .collect::<Vec<_>>()
            .join(";"),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn render(value: &Value) -> String {
        let mut wtr = csv::Writer::from_writer(Vec::new());
        match value {
            Value::Array(rows) => write_rows(&mut wtr, rows).unwrap(),
            Value::Object(map) => write_fields(&mut wtr, map).unwrap(),
            _ => unreachable!(),
        }
        String::from_utf8(wtr.into_inner().unwrap()).unwrap()
    }

    #[test]
    fn test_cashflow_array_joined_in_one_cell() {
        let out = render(&json!({ "cashflows": ["50", "50", "1050"] }));
        assert_eq!(out, "field,value\ncashflows,50;50;1050\n");
    }

    #[test]
    fn test_rows_use_first_object_headers() {
        let out = render(&json!([
            { "id": "A", "ytm_pct": "6.19" },
            { "id": "B", "ytm_pct": null }
        ]));
        assert_eq!(out, "id,ytm_pct\nA,6.19\nB,\n");
    }
}
