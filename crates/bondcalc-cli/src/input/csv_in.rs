//! Bond rows for the `batch` command.
//!
//! One bond per row. List-valued columns (`inflation_curve`, `call_dates`,
//! `call_prices`) hold `;`-separated values in a single cell. Blank optional
//! cells switch the corresponding output off.

use rust_decimal::Decimal;
use serde::Deserialize;
use std::io;
use std::str::FromStr;

use bondcalc_core::callable::CallSchedule;
use bondcalc_core::cashflows::{BondParameters, BondSubtype};
use bondcalc_core::stress::RateStress;
use bondcalc_core::valuation::BondValuationInput;
use bondcalc_core::InstrumentKind;

use super::file::resolve_path;

/// Raw CSV record, before list parsing and defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct BondRow {
    pub id: String,
    #[serde(default)]
    pub instrument: Option<String>,
    #[serde(default)]
    pub subtype: Option<String>,
    pub face_value: Decimal,
    pub coupon_rate: Decimal,
    pub maturity: u32,
    pub payment_frequency: u32,
    #[serde(default)]
    pub market_price: Option<Decimal>,
    #[serde(default)]
    pub haircut_bps: Option<Decimal>,
    #[serde(default)]
    pub discount_rate: Option<Decimal>,
    #[serde(default)]
    pub rfr: Option<Decimal>,
    #[serde(default)]
    pub spread: Option<Decimal>,
    #[serde(default)]
    pub stress_rfr_bps: Option<Decimal>,
    #[serde(default)]
    pub stress_spread_bps: Option<Decimal>,
    #[serde(default)]
    pub inflation_curve: Option<String>,
    #[serde(default)]
    pub call_dates: Option<String>,
    #[serde(default)]
    pub call_prices: Option<String>,
}

impl BondRow {
    /// Build the valuation request this row describes.
    pub fn to_valuation_input(&self) -> Result<BondValuationInput, Box<dyn std::error::Error>> {
        let instrument = match non_blank(&self.instrument) {
            Some(s) => InstrumentKind::from_str(s)?,
            None => InstrumentKind::Corporate,
        };
        let subtype = match non_blank(&self.subtype) {
            Some(s) => BondSubtype::from_str(s)?,
            None => BondSubtype::Fixed,
        };

        let bond = BondParameters {
            subtype,
            haircut_bps: self.haircut_bps.unwrap_or(Decimal::ZERO),
            inflation_curve: parse_list(&self.inflation_curve, "inflation_curve")?,
            ..BondParameters::fixed(
                self.face_value,
                self.coupon_rate,
                self.maturity,
                self.payment_frequency,
            )
        };

        let call_dates: Option<Vec<u32>> = parse_list(&self.call_dates, "call_dates")?;
        let call_prices: Option<Vec<Decimal>> = parse_list(&self.call_prices, "call_prices")?;
        let call_schedule = match (call_dates, call_prices) {
            (None, None) => None,
            (dates, prices) => Some(CallSchedule::new(
                dates.unwrap_or_default(),
                prices.unwrap_or_default(),
            )),
        };

        let stress = match (self.rfr, self.spread) {
            (None, None) => None,
            (rfr, spread) => Some(RateStress {
                rfr: rfr.unwrap_or(Decimal::ZERO),
                spread: spread.unwrap_or(Decimal::ZERO),
                stress_rfr_bps: self.stress_rfr_bps.unwrap_or(Decimal::ZERO),
                stress_spread_bps: self.stress_spread_bps.unwrap_or(Decimal::ZERO),
            }),
        };

        Ok(BondValuationInput {
            instrument,
            bond,
            market_price: self.market_price,
            discount_rate: self.discount_rate,
            stress,
            call_schedule,
        })
    }
}

/// A record that could not be read as a [`BondRow`].
#[derive(Debug, Clone, PartialEq)]
pub struct RowError {
    /// The row's `id` cell, or `line N` when it has none.
    pub id: String,
    pub reason: String,
}

impl std::fmt::Display for RowError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.id, self.reason)
    }
}

/// One parsed record; a malformed record does not stop the rest.
pub type ParsedRow = Result<BondRow, RowError>;

/// Read every bond row from a CSV file.
pub fn read_bond_rows(path: &str) -> Result<Vec<ParsedRow>, Box<dyn std::error::Error>> {
    let canonical = resolve_path(path)?;
    let file = std::fs::File::open(&canonical)
        .map_err(|e| format!("Failed to read '{}': {}", canonical.display(), e))?;
    parse_bond_rows(file)
        .map_err(|e| format!("Failed to parse '{}': {}", canonical.display(), e).into())
}

/// Deserialize rows from any reader; headers are required, whitespace trimmed.
///
/// Only an unreadable header line fails the whole read. Each data record is
/// deserialized on its own.
pub fn parse_bond_rows<R: io::Read>(reader: R) -> csv::Result<Vec<ParsedRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let headers = rdr.headers()?.clone();
    let id_column = headers.iter().position(|h| h == "id");

    let rows = rdr
        .records()
        .enumerate()
        .map(|(i, record)| {
            // Header is line 1
            let fallback_id = format!("line {}", i + 2);
            let record = record.map_err(|e| RowError {
                id: fallback_id.clone(),
                reason: e.to_string(),
            })?;
            record.deserialize::<BondRow>(Some(&headers)).map_err(|e| {
                let id = id_column
                    .and_then(|c| record.get(c))
                    .filter(|s| !s.is_empty())
                    .map_or(fallback_id, str::to_string);
                RowError {
                    id,
                    reason: e.to_string(),
                }
            })
        })
        .collect();
    Ok(rows)
}

fn non_blank(cell: &Option<String>) -> Option<&str> {
    cell.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Split a `;`-separated cell. Blank cells are `None`.
fn parse_list<T>(cell: &Option<String>, column: &str) -> Result<Option<Vec<T>>, String>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let Some(raw) = non_blank(cell) else {
        return Ok(None);
    };
    raw.split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<T>()
                .map_err(|e| format!("{column}: cannot parse '{s}': {e}"))
        })
        .collect::<Result<Vec<T>, String>>()
        .map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    const HEADER: &str = "id,instrument,subtype,face_value,coupon_rate,maturity,payment_frequency,\
market_price,haircut_bps,discount_rate,rfr,spread,stress_rfr_bps,stress_spread_bps,\
inflation_curve,call_dates,call_prices";

    fn parsed(body: &str) -> Vec<ParsedRow> {
        parse_bond_rows(format!("{HEADER}\n{body}").as_bytes()).unwrap()
    }

    fn rows(body: &str) -> Vec<BondRow> {
        parsed(body).into_iter().map(Result::unwrap).collect()
    }

    #[test]
    fn test_corporate_row_with_stress() {
        let r = rows("CORP1,corporate,fixed,1000,0.05,5,1,950,25,0.05,0.03,0.02,50,100,,,");
        let input = r[0].to_valuation_input().unwrap();
        assert_eq!(input.instrument, InstrumentKind::Corporate);
        assert_eq!(input.bond.haircut_bps, dec!(25));
        assert_eq!(input.market_price, Some(dec!(950)));
        assert_eq!(input.stress.unwrap().stressed_rate(), dec!(0.065));
        assert!(input.call_schedule.is_none());
        assert!(input.bond.inflation_curve.is_none());
    }

    #[test]
    fn test_list_columns_split_on_semicolon() {
        let r = rows(
            "CALL1,callable,,1000,0.05,5,1,950,,,,,,,,5;10,1020;1010\n\
             LINK1,gilt,inflation-linked,1000,0.05,5,1,950,,,,,,,1.01;1.02;1.03;1.04;1.05,,",
        );
        let call = r[0].to_valuation_input().unwrap();
        assert_eq!(
            call.call_schedule,
            Some(CallSchedule::new(vec![5, 10], vec![dec!(1020), dec!(1010)]))
        );
        assert!(call.stress.is_none());

        let linker = r[1].to_valuation_input().unwrap();
        assert_eq!(linker.bond.subtype, BondSubtype::InflationLinked);
        assert_eq!(linker.bond.inflation_curve.map(|c| c.len()), Some(5));
    }

    #[test]
    fn test_blank_instrument_defaults_to_corporate() {
        let r = rows("X,,,1000,0.04,3,2,,,,,,,,,,");
        let input = r[0].to_valuation_input().unwrap();
        assert_eq!(input.instrument, InstrumentKind::Corporate);
        assert_eq!(input.bond.subtype, BondSubtype::Fixed);
        assert!(input.market_price.is_none());
    }

    #[test]
    fn test_bad_list_value_names_column() {
        let r = rows("X,callable,,1000,0.05,5,1,950,,,,,,,,5;ten,1020;1010");
        let err = r[0].to_valuation_input().unwrap_err().to_string();
        assert!(err.contains("call_dates"), "{err}");
    }

    #[test]
    fn test_unknown_instrument_rejected() {
        let r = rows("X,municipal,,1000,0.05,5,1,,,,,,,,,,");
        assert!(r[0].to_valuation_input().is_err());
    }

    #[test]
    fn test_malformed_rows_fail_alone() {
        let r = parsed(
            "GOOD,corporate,fixed,1000,0.05,5,1,950,,,,,,,,,\n\
             TEXT,corporate,fixed,abc,0.05,5,1,950,,,,,,,,,\n\
             NEG,corporate,fixed,1000,0.05,-5,1,950,,,,,,,,,\n\
             ,corporate,fixed,1000,0.05,5,x,950,,,,,,,,,\n\
             LAST,gilt,fixed,1000,0.04,3,2,,,,,,,,,,",
        );
        assert_eq!(r.len(), 5);
        assert_eq!(r[0].as_ref().unwrap().id, "GOOD");
        assert!(r[4].is_ok());

        assert_eq!(r[1].as_ref().unwrap_err().id, "TEXT");
        assert_eq!(r[2].as_ref().unwrap_err().id, "NEG");
        // No id cell: identified by line number
        assert_eq!(r[3].as_ref().unwrap_err().id, "line 5");
    }

    #[test]
    fn test_short_record_is_row_error() {
        let r = parsed("SHORT,corporate,fixed\nOK,,,1000,0.04,3,2,,,,,,,,,,");
        assert_eq!(r[0].as_ref().unwrap_err().id, "line 2");
        assert!(r[1].is_ok());
    }
}
