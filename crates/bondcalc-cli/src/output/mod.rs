pub mod csv_out;
pub mod json;
pub mod minimal;
pub mod table;

use clap::ValueEnum;
use serde_json::Value;

/// How command results are written to stdout.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Pretty-printed result envelope
    #[default]
    Json,
    /// Field/value table, or one row per bond for batch results
    Table,
    /// Two-column CSV, or one row per bond for batch results
    Csv,
    /// Just the headline figure (YTW, YTM or PV)
    Minimal,
}

pub fn format_output(format: OutputFormat, value: &Value) {
    match format {
        OutputFormat::Json => json::print_json(value),
        OutputFormat::Table => table::print_table(value),
        OutputFormat::Csv => csv_out::print_csv(value),
        OutputFormat::Minimal => minimal::print_minimal(value),
    }
}
