use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::BondCalcError;
use crate::types::{with_metadata, ComputationOutput, Money, Rate};
use crate::BondCalcResult;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Maximum Newton-Raphson iterations for the IRR solve.
const MAX_IRR_ITERATIONS: u32 = 100;

/// Maximum bisection iterations once a bracket is found.
const MAX_BISECTION_ITERATIONS: u32 = 200;

/// Convergence tolerance on NPV (1e-7).
const IRR_EPSILON: Decimal = dec!(0.0000001);

/// Bracket width below which bisection stops refining.
const BISECTION_WIDTH: Decimal = dec!(0.000000000000000001);

/// Newton iterates are clamped to this range.
const RATE_FLOOR: Decimal = dec!(-0.99);
const RATE_CAP: Decimal = dec!(100);

/// Candidate periodic rates scanned for a sign change before bisecting.
const BRACKET_GRID: [Decimal; 14] = [
    dec!(-0.9),
    dec!(-0.5),
    dec!(-0.2),
    dec!(-0.05),
    dec!(0),
    dec!(0.05),
    dec!(0.1),
    dec!(0.25),
    dec!(0.5),
    dec!(1),
    dec!(2),
    dec!(5),
    dec!(10),
    dec!(100),
];

// ---------------------------------------------------------------------------
// Input / Output types
// ---------------------------------------------------------------------------

/// Input for a yield to maturity calculation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YieldInput {
    /// Cashflows received, one per period, first one period from now.
    pub cashflows: Vec<Money>,
    /// Price paid today.
    pub market_price: Money,
    /// Payments per year.
    pub payment_frequency: u32,
}

/// Output of a yield to maturity calculation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YieldOutput {
    /// Annualized yield as a percentage (5.0 = 5%).
    pub ytm_pct: Decimal,
    /// Annualized yield as a decimal (periodic x frequency).
    pub annual_yield: Rate,
    /// Solved per-period rate.
    pub periodic_yield: Rate,
    /// (1 + periodic)^frequency - 1; absent when it exceeds the decimal range.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effective_annual_yield: Option<Rate>,
    /// Sum of cashflows less the price paid.
    pub undiscounted_gain: Money,
}

// ---------------------------------------------------------------------------
// Public API: primitives
// ---------------------------------------------------------------------------

/// Periodic internal rate of return of `flows`, where `flows[0]` is at time 0.
///
/// Newton-Raphson from `guess`; if that fails to converge the root is
/// bracketed on a fixed grid and bisected. Both stages are iteration-capped.
pub fn irr(flows: &[Money], guess: Rate) -> BondCalcResult<Rate> {
    if flows.len() < 2 {
        return Err(BondCalcError::invalid(
            "cashflows",
            "IRR requires at least 2 cash flows",
        ));
    }

    let mut rate = guess.clamp(RATE_FLOOR, RATE_CAP);
    let mut last_delta = Decimal::MAX;

    for _ in 0..MAX_IRR_ITERATIONS {
        let Some((npv_val, slope)) = npv_and_slope(flows, rate) else {
            break;
        };
        last_delta = npv_val;

        if npv_val.abs() < IRR_EPSILON {
            return Ok(rate);
        }
        if slope.is_zero() {
            break;
        }
        let Some(step) = npv_val.checked_div(slope) else {
            break;
        };
        rate = (rate - step).clamp(RATE_FLOOR, RATE_CAP);
    }

    bisect(flows).ok_or(BondCalcError::ConvergenceFailure {
        function: "IRR".into(),
        iterations: MAX_IRR_ITERATIONS + MAX_BISECTION_ITERATIONS,
        last_delta,
    })
}

/// Annualized yield (decimal) of buying `cashflows` at `market_price`.
pub fn calculate_yield(
    cashflows: &[Money],
    market_price: Money,
    payment_frequency: u32,
) -> BondCalcResult<Rate> {
    validate_yield_input(cashflows, market_price, payment_frequency)?;

    let mut flows = Vec::with_capacity(cashflows.len() + 1);
    flows.push(-market_price);
    flows.extend_from_slice(cashflows);

    let periodic = irr(&flows, initial_guess(cashflows, market_price))?;
    Ok(periodic * Decimal::from(payment_frequency))
}

/// Yield to maturity as a percentage (5.0 = 5%).
pub fn yield_to_maturity(
    cashflows: &[Money],
    market_price: Money,
    payment_frequency: u32,
) -> BondCalcResult<Decimal> {
    Ok(calculate_yield(cashflows, market_price, payment_frequency)? * dec!(100))
}

// ---------------------------------------------------------------------------
// Public API: envelope
// ---------------------------------------------------------------------------

/// Yield to maturity with periodic, annual and effective figures.
pub fn calculate_ytm(input: &YieldInput) -> BondCalcResult<ComputationOutput<YieldOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let annual_yield = calculate_yield(&input.cashflows, input.market_price, input.payment_frequency)?;
    let freq = Decimal::from(input.payment_frequency);
    let periodic_yield = annual_yield / freq;
    let effective_annual_yield =
        compound(Decimal::ONE + periodic_yield, input.payment_frequency).map(|g| g - Decimal::ONE);
    if effective_annual_yield.is_none() {
        warnings.push(format!(
            "Effective annual yield omitted: (1 + {periodic_yield})^{} overflows the decimal range",
            input.payment_frequency
        ));
    }
    let undiscounted_gain = input.cashflows.iter().copied().sum::<Money>() - input.market_price;

    if annual_yield < Decimal::ZERO {
        warnings.push("Negative yield: cashflows total less than the price paid".into());
    }

    let output = YieldOutput {
        ytm_pct: annual_yield * dec!(100),
        annual_yield,
        periodic_yield,
        effective_annual_yield,
        undiscounted_gain,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    let assumptions = serde_json::json!({
        "ytm_method": "Newton-Raphson with bisection fallback",
        "max_iterations": MAX_IRR_ITERATIONS,
        "convergence_eps": "1e-7",
        "annualization": "periodic x frequency",
    });

    Ok(with_metadata(
        "Yield to Maturity (IRR of price vs. cashflows)",
        &assumptions,
        warnings,
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn validate_yield_input(
    cashflows: &[Money],
    market_price: Money,
    payment_frequency: u32,
) -> BondCalcResult<()> {
    if payment_frequency == 0 {
        return Err(BondCalcError::invalid(
            "payment_frequency",
            "Payment frequency must be positive",
        ));
    }
    if cashflows.is_empty() {
        return Err(BondCalcError::invalid(
            "cashflows",
            "At least one cashflow is required",
        ));
    }
    if market_price <= Decimal::ZERO {
        return Err(BondCalcError::invalid(
            "market_price",
            "Market price must be positive",
        ));
    }
    Ok(())
}

/// Simple-interest estimate of the periodic rate, kept away from the clamps.
fn initial_guess(cashflows: &[Money], market_price: Money) -> Rate {
    let total: Money = cashflows.iter().copied().sum();
    let n = Decimal::from(cashflows.len() as u64);
    let guess = (total - market_price) / (market_price * n);
    guess.clamp(dec!(-0.5), dec!(1))
}

/// NPV of `flows` at `rate` and its derivative with respect to `rate`.
///
/// Returns `None` when the rate is outside the domain or a term leaves the
/// range of `Decimal`. Terms whose discount factor overflows are dropped.
fn npv_and_slope(flows: &[Money], rate: Rate) -> Option<(Decimal, Decimal)> {
    let one_plus_r = Decimal::ONE + rate;
    if one_plus_r <= Decimal::ZERO {
        return None;
    }

    let mut npv_val = Decimal::ZERO;
    let mut slope = Decimal::ZERO;
    let mut discount = Decimal::ONE;

    for (t, cf) in flows.iter().enumerate() {
        if t > 0 {
            match discount.checked_mul(one_plus_r) {
                Some(d) => discount = d,
                None => break,
            }
        }
        if discount.is_zero() {
            return None;
        }
        npv_val = npv_val.checked_add(cf.checked_div(discount)?)?;

        if t > 0 {
            if let Some(next) = discount.checked_mul(one_plus_r) {
                let term = (Decimal::from(t as u64) * cf).checked_div(next)?;
                slope = slope.checked_sub(term)?;
            }
        }
    }

    Some((npv_val, slope))
}

fn npv_at(flows: &[Money], rate: Rate) -> Option<Decimal> {
    npv_and_slope(flows, rate).map(|(v, _)| v)
}

/// Bisection over the first sign change found on `BRACKET_GRID`.
fn bisect(flows: &[Money]) -> Option<Rate> {
    let samples: Vec<(Rate, Decimal)> = BRACKET_GRID
        .iter()
        .filter_map(|r| npv_at(flows, *r).map(|v| (*r, v)))
        .collect();

    if let Some((r, _)) = samples.iter().find(|(_, v)| v.abs() < IRR_EPSILON) {
        return Some(*r);
    }

    let (mut lo, mut f_lo, mut hi) = samples.windows(2).find_map(|w| {
        let (a, fa) = w[0];
        let (b, fb) = w[1];
        (fa.is_sign_negative() != fb.is_sign_negative()).then_some((a, fa, b))
    })?;

    for _ in 0..MAX_BISECTION_ITERATIONS {
        let mid = (lo + hi) / dec!(2);
        let f_mid = npv_at(flows, mid)?;
        if f_mid.abs() < IRR_EPSILON || (hi - lo) < BISECTION_WIDTH {
            return Some(mid);
        }
        if f_mid.is_sign_negative() == f_lo.is_sign_negative() {
            lo = mid;
            f_lo = f_mid;
        } else {
            hi = mid;
        }
    }

    None
}

/// `base^n` by repeated multiplication, `None` on overflow.
fn compound(base: Decimal, n: u32) -> Option<Decimal> {
    let mut result = Decimal::ONE;
    for _ in 0..n {
        result = result.checked_mul(base)?;
    }
    Some(result)
}
