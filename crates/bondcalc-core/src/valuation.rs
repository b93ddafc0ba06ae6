//! Single-call valuation of a corporate bond, gilt or callable bond:
//! cashflows, yield to maturity or yield to worst, and base/stressed PV.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::callable::{callable_scenarios, worst_scenario, CallSchedule, ScenarioKind, ScenarioYield};
use crate::cashflows::{
    cashflow_warnings, generate_instrument_cashflows, BondParameters, BondSubtype,
};
use crate::error::BondCalcError;
use crate::present_value::present_value;
use crate::stress::RateStress;
use crate::types::{with_metadata, CashflowSequence, ComputationOutput, InstrumentKind, Money, Rate};
use crate::yields::calculate_yield;
use crate::BondCalcResult;

// ---------------------------------------------------------------------------
// Input / Output types
// ---------------------------------------------------------------------------

/// Everything needed to value one bond. Optional pieces switch the
/// corresponding outputs on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BondValuationInput {
    #[serde(default)]
    pub instrument: InstrumentKind,
    #[serde(flatten)]
    pub bond: BondParameters,
    /// Price for YTM / YTW.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market_price: Option<Money>,
    /// Flat annual rate for the base present value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount_rate: Option<Rate>,
    /// Rate stress for the stressed present value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stress: Option<RateStress>,
    /// Call schedule; only read for callable bonds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_schedule: Option<CallSchedule>,
}

/// Result of a bond valuation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BondValuationOutput {
    pub instrument: InstrumentKind,
    pub subtype: BondSubtype,
    /// Number of cashflows to maturity.
    pub periods: u32,
    pub coupon_payment: Money,
    /// Cashflows to maturity.
    pub cashflows: CashflowSequence,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ytm_pct: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ytw_pct: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub worst_scenario: Option<ScenarioKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub worst_cashflows: Option<CashflowSequence>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub scenarios: Vec<ScenarioYield>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub present_value: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stressed_rate: Option<Rate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stressed_present_value: Option<Money>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Value a bond: generate cashflows, solve YTM (or YTW for callables) when a
/// price is given, and discount at the base and stressed rates when given.
pub fn value_bond(
    input: &BondValuationInput,
) -> BondCalcResult<ComputationOutput<BondValuationOutput>> {
    let start = Instant::now();
    let bond = &input.bond;
    let mut warnings = cashflow_warnings(bond);

    let cashflows = generate_instrument_cashflows(input.instrument, bond)?;
    let freq = bond.payment_frequency;

    let mut output = BondValuationOutput {
        instrument: input.instrument,
        subtype: bond.subtype,
        periods: cashflows.len() as u32,
        coupon_payment: bond.coupon_payment()?,
        cashflows,
        ytm_pct: None,
        ytw_pct: None,
        worst_scenario: None,
        worst_cashflows: None,
        scenarios: Vec::new(),
        present_value: None,
        stressed_rate: None,
        stressed_present_value: None,
    };

    match (input.instrument, input.market_price) {
        (InstrumentKind::Callable, Some(price)) => {
            let schedule = input.call_schedule.clone().unwrap_or_default();
            for date in schedule.call_dates.iter().filter(|d| **d > bond.maturity) {
                warnings.push(format!(
                    "Call date {date}y is after maturity {}y",
                    bond.maturity
                ));
            }
            let scenarios = callable_scenarios(
                bond.face_value,
                bond.coupon_rate,
                &schedule,
                bond.maturity,
                price,
                freq,
                bond.haircut_bps,
            )?;
            let worst = worst_scenario(&scenarios).ok_or_else(|| {
                BondCalcError::DomainError("No redemption scenarios to evaluate".into())
            })?;
            output.ytw_pct = Some(worst.yield_rate * dec!(100));
            output.worst_scenario = Some(worst.kind);
            output.worst_cashflows = Some(worst.cashflows.clone());
            output.ytm_pct = scenarios
                .iter()
                .find(|s| s.kind == ScenarioKind::Maturity)
                .map(|s| s.yield_rate * dec!(100));
            output.scenarios = scenarios
                .iter()
                .map(|s| ScenarioYield {
                    scenario: s.kind,
                    periods: s.periods,
                    yield_pct: s.yield_rate * dec!(100),
                })
                .collect();
        }
        (_, Some(price)) => {
            output.ytm_pct = Some(calculate_yield(&output.cashflows, price, freq)? * dec!(100));
        }
        (_, None) => warnings.push("No market price supplied; yields not computed".into()),
    }

    if input.instrument != InstrumentKind::Callable && input.call_schedule.is_some() {
        warnings.push(format!(
            "Call schedule ignored for a {} bond",
            input.instrument
        ));
    }

    if let Some(rate) = input.discount_rate {
        output.present_value = Some(present_value(&output.cashflows, rate, freq)?);
    }

    if let Some(stress) = &input.stress {
        let rate = stress.stressed_rate();
        output.stressed_rate = Some(rate);
        output.stressed_present_value = Some(present_value(&output.cashflows, rate, freq)?);
    }

    if input.discount_rate.is_none() && input.stress.is_none() {
        warnings.push("No discount rate or stress supplied; present value not computed".into());
    }

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Bond valuation (flat-rate PV, IRR yield, worst-of call scenarios)",
        input,
        warnings,
        elapsed,
        output,
    ))
}
