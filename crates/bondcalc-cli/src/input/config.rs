use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::file::read_text;

/// Parameters for the `report` command. Any field left out of the config
/// file keeps its default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub face_value: Decimal,
    pub coupon_rate: Decimal,
    pub maturity: u32,
    pub payment_frequency: u32,
    pub market_price: Decimal,
    pub rfr: Decimal,
    pub spread: Decimal,
    pub stress_rfr_bps: Decimal,
    pub stress_spread_bps: Decimal,
    /// Coupon haircut for the stressed yields.
    pub haircut_bps: Decimal,
    pub call_dates: Vec<u32>,
    pub call_prices: Vec<Decimal>,
    /// Gilt inflation multipliers, one per period.
    pub inflation_curve: Vec<Decimal>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        ReportConfig {
            face_value: dec!(1000),
            coupon_rate: dec!(0.05),
            maturity: 5,
            payment_frequency: 1,
            market_price: dec!(950),
            rfr: dec!(0.03),
            spread: dec!(0.02),
            stress_rfr_bps: dec!(50),
            stress_spread_bps: dec!(100),
            haircut_bps: dec!(25),
            call_dates: vec![5, 10],
            call_prices: vec![dec!(1020), dec!(1010)],
            inflation_curve: vec![dec!(1.01), dec!(1.02), dec!(1.03), dec!(1.04), dec!(1.05)],
        }
    }
}

/// Load a report config; `.yaml`/`.yml` files are read as YAML, anything
/// else as JSON. No path means all defaults.
pub fn load_report_config(path: Option<&str>) -> Result<ReportConfig, Box<dyn std::error::Error>> {
    let Some(path) = path else {
        return Ok(ReportConfig::default());
    };

    let (canonical, contents) = read_text(path)?;
    let config = parse_report_config(&canonical, &contents)
        .map_err(|e| format!("Failed to parse '{}': {}", canonical.display(), e))?;
    tracing::info!(path = %canonical.display(), "loaded report config");
    Ok(config)
}

fn parse_report_config(
    path: &Path,
    contents: &str,
) -> Result<ReportConfig, Box<dyn std::error::Error>> {
    let is_yaml = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"));

    if is_yaml {
        Ok(serde_yaml::from_str(contents)?)
    } else {
        Ok(serde_json::from_str(contents)?)
    }
}
