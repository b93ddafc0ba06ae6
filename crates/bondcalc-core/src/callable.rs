//! Callable bonds: one cashflow scenario per call date plus the maturity
//! scenario, and yield to worst across them.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::cashflows::{coupon_payment, level_coupon_schedule, periods, validate_bond_terms};
use crate::error::BondCalcError;
use crate::types::{with_metadata, Bps, CashflowSequence, ComputationOutput, Money, Rate};
use crate::yields::calculate_yield;
use crate::BondCalcResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Call dates (whole years) and the price paid on each.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CallSchedule {
    #[serde(default)]
    pub call_dates: Vec<u32>,
    #[serde(default)]
    pub call_prices: Vec<Money>,
}

impl CallSchedule {
    pub fn new(call_dates: Vec<u32>, call_prices: Vec<Money>) -> Self {
        CallSchedule {
            call_dates,
            call_prices,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.call_dates.is_empty() && self.call_prices.is_empty()
    }

    pub fn validate(&self) -> BondCalcResult<()> {
        if self.call_dates.len() != self.call_prices.len() {
            return Err(BondCalcError::invalid(
                "call_prices",
                format!(
                    "{} call dates but {} call prices",
                    self.call_dates.len(),
                    self.call_prices.len()
                ),
            ));
        }
        if let Some(pos) = self.call_dates.iter().position(|d| *d == 0) {
            return Err(BondCalcError::invalid(
                "call_dates",
                format!("Call date at index {pos} must be at least one year"),
            ));
        }
        Ok(())
    }

    /// `(call_date, call_price)` pairs in input order.
    pub fn calls(&self) -> impl Iterator<Item = (u32, Money)> + '_ {
        self.call_dates
            .iter()
            .copied()
            .zip(self.call_prices.iter().copied())
    }
}

/// How a scenario ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScenarioKind {
    /// Redeemed at `call_price` after `call_date` years.
    Call { call_date: u32, call_price: Money },
    /// Runs to maturity and repays face value.
    Maturity,
}

impl std::fmt::Display for ScenarioKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScenarioKind::Call {
                call_date,
                call_price,
            } => write!(f, "call@{call_date}y/{call_price}"),
            ScenarioKind::Maturity => f.write_str("maturity"),
        }
    }
}

/// Cashflows of one redemption scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioCashflows {
    pub kind: ScenarioKind,
    pub periods: u32,
    pub redemption: Money,
    pub cashflows: CashflowSequence,
}

/// One priced redemption scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallScenario {
    pub kind: ScenarioKind,
    pub periods: u32,
    pub redemption: Money,
    pub cashflows: CashflowSequence,
    /// Annualized yield as a decimal.
    pub yield_rate: Rate,
}

/// Input for yield to worst.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YieldToWorstInput {
    pub face_value: Money,
    pub coupon_rate: Rate,
    #[serde(flatten)]
    pub schedule: CallSchedule,
    pub maturity: u32,
    pub market_price: Money,
    pub payment_frequency: u32,
    #[serde(default)]
    pub haircut_bps: Bps,
}

/// Yield of a single scenario, for reporting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioYield {
    pub scenario: ScenarioKind,
    pub periods: u32,
    pub yield_pct: Decimal,
}

/// Output of yield to worst.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YieldToWorstOutput {
    /// Worst yield as a percentage.
    pub ytw_pct: Decimal,
    pub worst_scenario: ScenarioKind,
    pub worst_cashflows: CashflowSequence,
    /// Yield of the maturity scenario as a percentage.
    pub ytm_pct: Decimal,
    pub scenarios: Vec<ScenarioYield>,
}

// ---------------------------------------------------------------------------
// Public API: primitives
// ---------------------------------------------------------------------------

/// Build the unpriced cashflows of every scenario: each call in schedule
/// order, then maturity.
///
/// A call date past maturity still gets its full-length scenario.
pub fn build_scenarios(
    face_value: Money,
    coupon_rate: Rate,
    schedule: &CallSchedule,
    maturity: u32,
    payment_frequency: u32,
    haircut_bps: Bps,
) -> BondCalcResult<Vec<ScenarioCashflows>> {
    validate_bond_terms(face_value, maturity, payment_frequency)?;
    schedule.validate()?;

    let coupon = coupon_payment(face_value, coupon_rate, payment_frequency, haircut_bps)?;
    let mut scenarios = Vec::with_capacity(schedule.call_dates.len() + 1);

    for (call_date, call_price) in schedule.calls() {
        let n = periods(call_date, payment_frequency)?;
        scenarios.push(ScenarioCashflows {
            kind: ScenarioKind::Call {
                call_date,
                call_price,
            },
            periods: n,
            redemption: call_price,
            cashflows: level_coupon_schedule(coupon, n, call_price),
        });
    }

    let n = periods(maturity, payment_frequency)?;
    scenarios.push(ScenarioCashflows {
        kind: ScenarioKind::Maturity,
        periods: n,
        redemption: face_value,
        cashflows: level_coupon_schedule(coupon, n, face_value),
    });

    Ok(scenarios)
}

/// Every scenario with its yield against `market_price`.
pub fn callable_scenarios(
    face_value: Money,
    coupon_rate: Rate,
    schedule: &CallSchedule,
    maturity: u32,
    market_price: Money,
    payment_frequency: u32,
    haircut_bps: Bps,
) -> BondCalcResult<Vec<CallScenario>> {
    build_scenarios(
        face_value,
        coupon_rate,
        schedule,
        maturity,
        payment_frequency,
        haircut_bps,
    )?
    .into_iter()
    .map(|s| {
        let yield_rate = calculate_yield(&s.cashflows, market_price, payment_frequency)?;
        Ok(CallScenario {
            kind: s.kind,
            periods: s.periods,
            redemption: s.redemption,
            cashflows: s.cashflows,
            yield_rate,
        })
    })
    .collect()
}

/// Lowest-yielding scenario; the first one wins a tie.
pub fn worst_scenario(scenarios: &[CallScenario]) -> Option<&CallScenario> {
    worst_index(scenarios).map(|i| &scenarios[i])
}

fn worst_index(scenarios: &[CallScenario]) -> Option<usize> {
    let mut worst: Option<usize> = None;
    for (i, s) in scenarios.iter().enumerate() {
        match worst {
            Some(w) if s.yield_rate >= scenarios[w].yield_rate => {}
            _ => worst = Some(i),
        }
    }
    worst
}

/// Yield to worst as a percentage, with the cashflows that produce it.
#[allow(clippy::too_many_arguments)]
pub fn yield_to_worst(
    face_value: Money,
    coupon_rate: Rate,
    call_dates: &[u32],
    call_prices: &[Money],
    maturity: u32,
    market_price: Money,
    payment_frequency: u32,
    haircut_bps: Bps,
) -> BondCalcResult<(Decimal, CashflowSequence)> {
    let schedule = CallSchedule::new(call_dates.to_vec(), call_prices.to_vec());
    let scenarios = callable_scenarios(
        face_value,
        coupon_rate,
        &schedule,
        maturity,
        market_price,
        payment_frequency,
        haircut_bps,
    )?;
    let worst = pick_worst(scenarios)?;
    Ok((worst.yield_rate * dec!(100), worst.cashflows))
}

// ---------------------------------------------------------------------------
// Public API: envelope
// ---------------------------------------------------------------------------

/// Yield to worst with every scenario's yield.
pub fn calculate_yield_to_worst(
    input: &YieldToWorstInput,
) -> BondCalcResult<ComputationOutput<YieldToWorstOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let scenarios = callable_scenarios(
        input.face_value,
        input.coupon_rate,
        &input.schedule,
        input.maturity,
        input.market_price,
        input.payment_frequency,
        input.haircut_bps,
    )?;

    for date in input.schedule.call_dates.iter().filter(|d| **d > input.maturity) {
        warnings.push(format!(
            "Call date {date}y is after maturity {}y; scenario runs past maturity",
            input.maturity
        ));
    }
    if input.schedule.is_empty() {
        warnings.push("Empty call schedule; yield to worst equals yield to maturity".into());
    }

    let summaries: Vec<ScenarioYield> = scenarios
        .iter()
        .map(|s| ScenarioYield {
            scenario: s.kind,
            periods: s.periods,
            yield_pct: s.yield_rate * dec!(100),
        })
        .collect();
    let ytm_pct = summaries
        .iter()
        .find(|s| s.scenario == ScenarioKind::Maturity)
        .map(|s| s.yield_pct)
        .unwrap_or_default();

    let worst = pick_worst(scenarios)?;

    let output = YieldToWorstOutput {
        ytw_pct: worst.yield_rate * dec!(100),
        worst_scenario: worst.kind,
        worst_cashflows: worst.cashflows,
        ytm_pct,
        scenarios: summaries,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Yield to Worst (minimum IRR across call and maturity scenarios)",
        input,
        warnings,
        elapsed,
        output,
    ))
}

fn pick_worst(mut scenarios: Vec<CallScenario>) -> BondCalcResult<CallScenario> {
    let idx = worst_index(&scenarios)
        .ok_or_else(|| BondCalcError::DomainError("No redemption scenarios to evaluate".into()))?;
    Ok(scenarios.swap_remove(idx))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn reference_input() -> YieldToWorstInput {
        YieldToWorstInput {
            face_value: dec!(1000),
            coupon_rate: dec!(0.05),
            schedule: CallSchedule::new(vec![5, 10], vec![dec!(1020), dec!(1010)]),
            maturity: 5,
            market_price: dec!(950),
            payment_frequency: 1,
            haircut_bps: Decimal::ZERO,
        }
    }

    #[test]
    fn test_reference_scenarios_built_per_period_count() {
        let i = reference_input();
        let scenarios =
            build_scenarios(i.face_value, i.coupon_rate, &i.schedule, i.maturity, 1, Decimal::ZERO)
                .unwrap();
        assert_eq!(scenarios.len(), 3);

        let call5 = &scenarios[0];
        assert_eq!(call5.periods, 5);
        assert_eq!(
            call5.kind,
            ScenarioKind::Call {
                call_date: 5,
                call_price: dec!(1020)
            }
        );
        assert_eq!(
            call5.cashflows,
            vec![dec!(50), dec!(50), dec!(50), dec!(50), dec!(1070)]
        );

        // Call date past maturity still builds the long scenario
        let call10 = &scenarios[1];
        assert_eq!(call10.periods, 10);
        assert_eq!(call10.cashflows.len(), 10);
        assert_eq!(call10.cashflows[9], dec!(1060));

        let maturity = &scenarios[2];
        assert_eq!(maturity.kind, ScenarioKind::Maturity);
        assert_eq!(maturity.redemption, dec!(1000));
        assert_eq!(
            maturity.cashflows,
            vec![dec!(50), dec!(50), dec!(50), dec!(50), dec!(1050)]
        );
    }

    #[test]
    fn test_reference_ytw_picks_long_call() {
        let i = reference_input();
        let (ytw, flows) = yield_to_worst(
            i.face_value,
            i.coupon_rate,
            &i.schedule.call_dates,
            &i.schedule.call_prices,
            i.maturity,
            i.market_price,
            1,
            Decimal::ZERO,
        )
        .unwrap();
        // call@10y: 9 x 50 then 1060 at 950 ≈ 5.817%
        assert!((ytw - dec!(5.817)).abs() < dec!(0.001), "got {ytw}");
        assert_eq!(flows.len(), 10);
    }

    #[test]
    fn test_expensive_calls_fall_back_to_maturity() {
        let (ytw, flows) = yield_to_worst(
            dec!(1000),
            dec!(0.05),
            &[3, 4],
            &[dec!(1100), dec!(1080)],
            5,
            dec!(950),
            1,
            Decimal::ZERO,
        )
        .unwrap();
        assert_eq!(flows, vec![dec!(50), dec!(50), dec!(50), dec!(50), dec!(1050)]);
        assert!((ytw - dec!(6.193)).abs() < dec!(0.001), "got {ytw}");
    }

    #[test]
    fn test_empty_schedule_is_maturity_only() {
        let (ytw, flows) =
            yield_to_worst(dec!(1000), dec!(0.05), &[], &[], 5, dec!(950), 1, Decimal::ZERO)
                .unwrap();
        assert_eq!(flows.len(), 5);
        assert!((ytw - dec!(6.193)).abs() < dec!(0.001));
    }

    #[test]
    fn test_call_after_one_year_single_flow() {
        let scenarios = build_scenarios(
            dec!(1000),
            dec!(0.05),
            &CallSchedule::new(vec![1], vec![dec!(1070)]),
            5,
            1,
            Decimal::ZERO,
        )
        .unwrap();
        assert_eq!(scenarios[0].cashflows, vec![dec!(1120)]);
    }

    #[test]
    fn test_mismatched_schedule_rejected() {
        let err = yield_to_worst(
            dec!(1000),
            dec!(0.05),
            &[3, 4],
            &[dec!(1020)],
            5,
            dec!(950),
            1,
            Decimal::ZERO,
        )
        .unwrap_err();
        assert!(matches!(err, BondCalcError::InvalidInput { .. }));
    }

    #[test]
    fn test_zero_call_date_rejected() {
        let schedule = CallSchedule::new(vec![0], vec![dec!(1000)]);
        assert!(schedule.validate().is_err());
    }

    #[test]
    fn test_haircut_shared_with_generator() {
        let scenarios = build_scenarios(
            dec!(1000),
            dec!(0.05),
            &CallSchedule::default(),
            2,
            1,
            dec!(25),
        )
        .unwrap();
        assert_eq!(scenarios[0].cashflows, vec![dec!(49.875), dec!(1049.875)]);
    }

    #[test]
    fn test_tie_goes_to_first_scenario() {
        let flows = vec![dec!(1050)];
        let scenarios: Vec<CallScenario> = [
            ScenarioKind::Call {
                call_date: 1,
                call_price: dec!(1000),
            },
            ScenarioKind::Maturity,
        ]
        .into_iter()
        .map(|kind| CallScenario {
            kind,
            periods: 1,
            redemption: dec!(1000),
            cashflows: flows.clone(),
            yield_rate: dec!(0.05),
        })
        .collect();
        let worst = worst_scenario(&scenarios).unwrap();
        assert!(matches!(worst.kind, ScenarioKind::Call { .. }));
    }

    #[test]
    fn test_semiannual_call_periods() {
        let scenarios = build_scenarios(
            dec!(100),
            dec!(0.06),
            &CallSchedule::new(vec![2], vec![dec!(101)]),
            5,
            2,
            Decimal::ZERO,
        )
        .unwrap();
        assert_eq!(scenarios[0].periods, 4);
        assert_eq!(scenarios[0].cashflows, vec![dec!(3), dec!(3), dec!(3), dec!(104)]);
        assert_eq!(scenarios[1].periods, 10);
    }

    #[test]
    fn test_calculate_yield_to_worst_envelope() {
        let out = calculate_yield_to_worst(&reference_input()).unwrap();
        let r = &out.result;
        assert_eq!(
            r.worst_scenario,
            ScenarioKind::Call {
                call_date: 10,
                call_price: dec!(1010)
            }
        );
        assert_eq!(r.scenarios.len(), 3);
        assert!((r.ytm_pct - dec!(6.193)).abs() < dec!(0.001));
        assert!(r.ytw_pct <= r.ytm_pct);
        // call date 10 > maturity 5
        assert_eq!(out.warnings.len(), 1);
    }
}
