use clap::Args;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::{json, Value};
use std::path::Path;

use bondcalc_core::valuation::{self, BondValuationOutput};

use crate::input::csv_in::{self, BondRow, ParsedRow};
use crate::output::csv_out;

/// Decimal places kept in batch output.
const OUTPUT_DP: u32 = 6;

/// Arguments for batch valuation
#[derive(Args)]
pub struct BatchArgs {
    /// CSV file with one bond per row
    #[arg(long)]
    pub input: String,

    /// Write results to this CSV file as well as stdout
    #[arg(long)]
    pub out: Option<String>,
}

/// One output row. A failed bond keeps its id and carries the error text.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchResultRow {
    pub id: String,
    pub instrument: Option<String>,
    pub subtype: Option<String>,
    pub periods: Option<u32>,
    pub ytm_pct: Option<Decimal>,
    pub ytw_pct: Option<Decimal>,
    pub present_value: Option<Decimal>,
    pub stressed_present_value: Option<Decimal>,
    pub worst_scenario: Option<String>,
    /// `;`-separated cashflows to maturity
    pub cashflows: Option<String>,
    pub error: Option<String>,
}

impl BatchResultRow {
    fn from_valuation(id: &str, r: &BondValuationOutput) -> Self {
        let round = |d: Option<Decimal>| d.map(|v| v.round_dp(OUTPUT_DP));
        BatchResultRow {
            id: id.to_string(),
            instrument: Some(r.instrument.to_string()),
            subtype: Some(r.subtype.to_string()),
            periods: Some(r.periods),
            ytm_pct: round(r.ytm_pct),
            ytw_pct: round(r.ytw_pct),
            present_value: round(r.present_value),
            stressed_present_value: round(r.stressed_present_value),
            worst_scenario: r.worst_scenario.map(|s| s.to_string()),
            cashflows: Some(
                r.cashflows
                    .iter()
                    .map(|c| c.normalize().to_string())
                    .collect::<Vec<_>>()
                    .join(";"),
            ),
            error: None,
        }
    }

    fn failed(id: &str, error: String) -> Self {
        BatchResultRow {
            id: id.to_string(),
            error: Some(error),
            ..Default::default()
        }
    }
}

/// Value one row; any failure becomes an error row.
pub fn value_row(row: &BondRow) -> BatchResultRow {
    let outcome = row
        .to_valuation_input()
        .and_then(|input| Ok(valuation::value_bond(&input)?));
    match outcome {
        Ok(out) => {
            for w in &out.warnings {
                tracing::debug!(id = %row.id, "{w}");
            }
            BatchResultRow::from_valuation(&row.id, &out.result)
        }
        Err(e) => {
            tracing::warn!(id = %row.id, error = %e, "bond valuation failed");
            BatchResultRow::failed(&row.id, e.to_string())
        }
    }
}

/// Value a parsed record, or report why it could not be read.
pub fn value_parsed(row: &ParsedRow) -> BatchResultRow {
    match row {
        Ok(row) => value_row(row),
        Err(e) => {
            tracing::warn!(id = %e.id, error = %e.reason, "unreadable bond row");
            BatchResultRow::failed(&e.id, e.reason.clone())
        }
    }
}

pub fn run_batch(args: BatchArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let rows = csv_in::read_bond_rows(&args.input)?;
    tracing::info!(path = %args.input, bonds = rows.len(), "valuing batch");

    let results: Vec<BatchResultRow> = rows.iter().map(value_parsed).collect();
    let failed = results.iter().filter(|r| r.error.is_some()).count();
    tracing::info!(valued = results.len() - failed, failed, "batch complete");

    if let Some(ref out) = args.out {
        csv_out::write_records(Path::new(out), &results)?;
        tracing::info!(path = %out, "wrote batch results");
    }

    Ok(json!({ "results": results }))
}
