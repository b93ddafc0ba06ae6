//! Discounting of periodic cashflow sequences at a single flat rate.
//!
//! Period `t` (1-based) is discounted by `(1 + r/f)^t`, where `f` is the
//! payment frequency. Discount factors are accumulated by repeated
//! multiplication rather than `powd` so results stay exact in 128-bit decimal.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::BondCalcError;
use crate::stress::{apply_stress, RateStress};
use crate::types::{with_metadata, ComputationOutput, Money, Rate};
use crate::BondCalcResult;

// ---------------------------------------------------------------------------
// Input / Output types
// ---------------------------------------------------------------------------

/// Input for a plain or time-shifted present value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresentValueInput {
    /// Cashflows, one per payment period.
    pub cashflows: Vec<Money>,
    /// Annual discount rate as a decimal.
    pub discount_rate: Rate,
    /// Payments per year.
    pub payment_frequency: u32,
    /// Whole years already elapsed; earlier cashflows are dropped.
    #[serde(default)]
    pub time_t: u32,
    /// Multipliers applied to the remaining cashflows after truncation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inflation_adjustment: Option<Vec<Decimal>>,
}

/// Output of a present value calculation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresentValueOutput {
    pub present_value: Money,
    pub periodic_rate: Rate,
    /// Number of cashflows remaining after truncation at `time_t`.
    pub periods_discounted: usize,
}

/// Input for a stressed present value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StressedPresentValueInput {
    pub cashflows: Vec<Money>,
    #[serde(flatten)]
    pub stress: RateStress,
    pub payment_frequency: u32,
}

/// Output of a stressed present value calculation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StressedPresentValueOutput {
    /// Unstressed rfr + spread.
    pub base_rate: Rate,
    pub stressed_rate: Rate,
    pub base_present_value: Money,
    pub stressed_present_value: Money,
    /// stressed minus base.
    pub pv_change: Money,
}

// ---------------------------------------------------------------------------
// Public API: primitives
// ---------------------------------------------------------------------------

/// Present value of `cashflows` at an annual rate compounded
/// `payment_frequency` times a year.
pub fn present_value(
    cashflows: &[Money],
    annual_discount_rate: Rate,
    payment_frequency: u32,
) -> BondCalcResult<Money> {
    let periodic = periodic_rate(annual_discount_rate, payment_frequency)?;
    discount_sequence(cashflows, periodic)
}

/// Present value of the cashflows remaining after `time_t` whole years.
///
/// The sequence is cut at `time_t * payment_frequency`; the first remaining
/// cashflow is discounted one period. A cut beyond the end leaves nothing to
/// discount and returns zero. An empty `inflation_adjustment` is ignored.
pub fn present_value_at_time(
    cashflows: &[Money],
    annual_discount_rate: Rate,
    payment_frequency: u32,
    time_t: u32,
    inflation_adjustment: Option<&[Decimal]>,
) -> BondCalcResult<Money> {
    let periodic = periodic_rate(annual_discount_rate, payment_frequency)?;
    let remaining = remaining_cashflows(cashflows, payment_frequency, time_t, inflation_adjustment)?;
    discount_sequence(&remaining, periodic)
}

/// Present value at the flat rate produced by [`apply_stress`].
pub fn stressed_present_value(
    cashflows: &[Money],
    rfr: Rate,
    spread: Rate,
    stress_rfr_bps: Decimal,
    stress_spread_bps: Decimal,
    payment_frequency: u32,
) -> BondCalcResult<Money> {
    let stressed_rate = apply_stress(rfr, spread, stress_rfr_bps, stress_spread_bps);
    present_value(cashflows, stressed_rate, payment_frequency)
}

// ---------------------------------------------------------------------------
// Public API: envelopes
// ---------------------------------------------------------------------------

/// Present value (optionally from time t, optionally inflation-adjusted).
pub fn calculate_present_value(
    input: &PresentValueInput,
) -> BondCalcResult<ComputationOutput<PresentValueOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let periodic = periodic_rate(input.discount_rate, input.payment_frequency)?;
    let remaining = remaining_cashflows(
        &input.cashflows,
        input.payment_frequency,
        input.time_t,
        input.inflation_adjustment.as_deref(),
    )?;
    if remaining.is_empty() {
        warnings.push(format!(
            "time_t = {} is beyond the last cashflow; present value is zero",
            input.time_t
        ));
    }
    let pv = discount_sequence(&remaining, periodic)?;

    let output = PresentValueOutput {
        present_value: pv,
        periodic_rate: periodic,
        periods_discounted: remaining.len(),
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Present value of periodic cashflows at a flat rate",
        input,
        warnings,
        elapsed,
        output,
    ))
}

/// Base and stressed present value of a cashflow sequence.
pub fn calculate_stressed_present_value(
    input: &StressedPresentValueInput,
) -> BondCalcResult<ComputationOutput<StressedPresentValueOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let base_rate = input.stress.rfr + input.stress.spread;
    let stressed_rate = input.stress.stressed_rate();

    let base_present_value = present_value(&input.cashflows, base_rate, input.payment_frequency)?;
    let stressed_pv = present_value(&input.cashflows, stressed_rate, input.payment_frequency)?;

    if stressed_rate < base_rate {
        warnings.push("Net stress is negative (relief scenario)".into());
    }

    let output = StressedPresentValueOutput {
        base_rate,
        stressed_rate,
        base_present_value,
        stressed_present_value: stressed_pv,
        pv_change: stressed_pv - base_present_value,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Stressed present value (rfr + spread basis-point shocks)",
        input,
        warnings,
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// Annual rate divided by frequency, rejecting a non-positive `1 + r`.
pub(crate) fn periodic_rate(annual_rate: Rate, payment_frequency: u32) -> BondCalcResult<Rate> {
    if payment_frequency == 0 {
        return Err(BondCalcError::invalid(
            "payment_frequency",
            "Payment frequency must be positive",
        ));
    }
    let periodic = annual_rate / Decimal::from(payment_frequency);
    if Decimal::ONE + periodic <= Decimal::ZERO {
        return Err(BondCalcError::DomainError(format!(
            "Discount base 1 + {periodic} is not positive"
        )));
    }
    Ok(periodic)
}

fn remaining_cashflows(
    cashflows: &[Money],
    payment_frequency: u32,
    time_t: u32,
    inflation_adjustment: Option<&[Decimal]>,
) -> BondCalcResult<Vec<Money>> {
    let cut = (time_t as usize).saturating_mul(payment_frequency as usize);
    let remaining = cashflows.get(cut..).unwrap_or(&[]);

    match inflation_adjustment {
        Some(adj) if !adj.is_empty() => {
            if adj.len() < remaining.len() {
                return Err(BondCalcError::invalid(
                    "inflation_adjustment",
                    format!(
                        "Adjustment has {} entries but {} cashflows remain",
                        adj.len(),
                        remaining.len()
                    ),
                ));
            }
            Ok(remaining.iter().zip(adj).map(|(cf, f)| cf * f).collect())
        }
        _ => Ok(remaining.to_vec()),
    }
}

/// Sum of `cf[t-1] / (1 + r)^t`. Assumes `1 + r > 0`.
fn discount_sequence(cashflows: &[Money], periodic: Rate) -> BondCalcResult<Money> {
    let one_plus_r = Decimal::ONE + periodic;
    let mut discount = Decimal::ONE;
    let mut pv = Decimal::ZERO;

    for (t, cf) in cashflows.iter().enumerate() {
        discount = match discount.checked_mul(one_plus_r) {
            Some(d) => d,
            // Later terms are below decimal resolution.
            None => break,
        };
        let term = cf.checked_div(discount).ok_or_else(|| {
            BondCalcError::DomainError(format!("Discount factor underflow at period {}", t + 1))
        })?;
        pv += term;
    }

    Ok(pv)
}
