//! Cashflow generation for corporate bonds, gilts and the fixed leg of
//! callable bonds.
//!
//! All instrument families share one shaping routine keyed on
//! [`BondSubtype`]; the instrument kind only restricts which subtypes are
//! allowed.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Instant;

use crate::error::BondCalcError;
use crate::stress::bps_to_rate;
use crate::types::{with_metadata, Bps, CashflowSequence, ComputationOutput, InstrumentKind, Money, Rate};
use crate::BondCalcResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Payment structure of a bond.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BondSubtype {
    /// Level coupons plus face value at maturity.
    #[default]
    Fixed,
    /// Face value only.
    ZeroCoupon,
    /// Coupons and redemption scaled by an inflation curve.
    InflationLinked,
}

impl BondSubtype {
    pub fn as_str(&self) -> &'static str {
        match self {
            BondSubtype::Fixed => "fixed",
            BondSubtype::ZeroCoupon => "zero-coupon",
            BondSubtype::InflationLinked => "inflation-linked",
        }
    }
}

impl std::fmt::Display for BondSubtype {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BondSubtype {
    type Err = BondCalcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "fixed" => Ok(BondSubtype::Fixed),
            "zero-coupon" | "zero" => Ok(BondSubtype::ZeroCoupon),
            "inflation-linked" | "linker" => Ok(BondSubtype::InflationLinked),
            other => Err(BondCalcError::invalid(
                "subtype",
                format!("Unknown bond subtype '{other}'"),
            )),
        }
    }
}

impl FromStr for InstrumentKind {
    type Err = BondCalcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "corporate" | "corp" => Ok(InstrumentKind::Corporate),
            "gilt" => Ok(InstrumentKind::Gilt),
            "callable" => Ok(InstrumentKind::Callable),
            other => Err(BondCalcError::invalid(
                "instrument",
                format!("Unknown instrument kind '{other}'"),
            )),
        }
    }
}

/// Static description of a bond.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BondParameters {
    /// Par value (e.g. 1000).
    pub face_value: Money,
    /// Annual coupon rate as a decimal; ignored for zero-coupon bonds.
    pub coupon_rate: Rate,
    /// Whole years to maturity.
    pub maturity: u32,
    /// Coupon payments per year.
    pub payment_frequency: u32,
    #[serde(default)]
    pub subtype: BondSubtype,
    /// Haircut on the coupon rate (25 = coupon scaled by 0.9975).
    #[serde(default)]
    pub haircut_bps: Bps,
    /// One multiplier per period; required for inflation-linked bonds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inflation_curve: Option<Vec<Decimal>>,
}

impl BondParameters {
    /// Plain fixed-coupon bond with no haircut.
    pub fn fixed(face_value: Money, coupon_rate: Rate, maturity: u32, payment_frequency: u32) -> Self {
        BondParameters {
            face_value,
            coupon_rate,
            maturity,
            payment_frequency,
            subtype: BondSubtype::Fixed,
            haircut_bps: Decimal::ZERO,
            inflation_curve: None,
        }
    }

    pub fn periods(&self) -> BondCalcResult<u32> {
        periods(self.maturity, self.payment_frequency)
    }

    pub fn coupon_payment(&self) -> BondCalcResult<Money> {
        coupon_payment(
            self.face_value,
            self.coupon_rate,
            self.payment_frequency,
            self.haircut_bps,
        )
    }

    pub fn cashflows(&self) -> BondCalcResult<CashflowSequence> {
        generate_cashflows(
            self.face_value,
            self.coupon_rate,
            self.maturity,
            self.payment_frequency,
            self.subtype,
            self.inflation_curve.as_deref(),
            self.haircut_bps,
        )
    }
}

/// Input for the cashflow envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CashflowInput {
    #[serde(default)]
    pub instrument: InstrumentKind,
    #[serde(flatten)]
    pub bond: BondParameters,
}

/// Output of cashflow generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CashflowOutput {
    pub instrument: InstrumentKind,
    pub subtype: BondSubtype,
    /// Number of cashflows; a zero-coupon bond has one.
    pub periods: u32,
    /// Coupon rate after the haircut.
    pub adjusted_coupon_rate: Rate,
    /// Nominal coupon per period, before any inflation scaling.
    pub coupon_payment: Money,
    pub cashflows: CashflowSequence,
    /// Undiscounted sum of all cashflows.
    pub total_cashflow: Money,
}

// ---------------------------------------------------------------------------
// Public API: primitives
// ---------------------------------------------------------------------------

/// Number of payment periods, `maturity * payment_frequency`.
pub fn periods(maturity: u32, payment_frequency: u32) -> BondCalcResult<u32> {
    match maturity.checked_mul(payment_frequency) {
        Some(0) => Err(BondCalcError::DomainError(format!(
            "maturity {maturity} x frequency {payment_frequency} gives zero periods"
        ))),
        Some(n) => Ok(n),
        None => Err(BondCalcError::DomainError(format!(
            "maturity {maturity} x frequency {payment_frequency} overflows the period count"
        ))),
    }
}

/// Coupon rate after a basis-point haircut: `rate * (1 - bps / 10000)`.
pub fn adjusted_coupon_rate(coupon_rate: Rate, haircut_bps: Bps) -> Rate {
    coupon_rate * (Decimal::ONE - bps_to_rate(haircut_bps))
}

/// Coupon paid each period after the haircut.
pub fn coupon_payment(
    face_value: Money,
    coupon_rate: Rate,
    payment_frequency: u32,
    haircut_bps: Bps,
) -> BondCalcResult<Money> {
    if payment_frequency == 0 {
        return Err(BondCalcError::invalid(
            "payment_frequency",
            "Payment frequency must be positive",
        ));
    }
    Ok(face_value * adjusted_coupon_rate(coupon_rate, haircut_bps) / Decimal::from(payment_frequency))
}

/// `periods - 1` coupons followed by `coupon + redemption`.
///
/// Shared by the fixed subtype and every callable scenario. `periods` must be
/// at least 1.
pub(crate) fn level_coupon_schedule(coupon: Money, periods: u32, redemption: Money) -> CashflowSequence {
    let n = periods as usize;
    let mut flows = vec![coupon; n.saturating_sub(1)];
    flows.push(coupon + redemption);
    flows
}

/// Generate the cashflow sequence of a bond.
///
/// * zero-coupon: `[face_value]`
/// * fixed: level coupons, face value added to the last one
/// * inflation-linked: coupon `i` scaled by `inflation_curve[i]`; the final
///   coupon plus redemption is scaled by the *last* entry of the curve, which
///   differs from `inflation_curve[periods - 1]` when the curve is longer
///   than the bond.
pub fn generate_cashflows(
    face_value: Money,
    coupon_rate: Rate,
    maturity: u32,
    payment_frequency: u32,
    subtype: BondSubtype,
    inflation_curve: Option<&[Decimal]>,
    haircut_bps: Bps,
) -> BondCalcResult<CashflowSequence> {
    validate_bond_terms(face_value, maturity, payment_frequency)?;

    if subtype == BondSubtype::ZeroCoupon {
        return Ok(vec![face_value]);
    }

    let n = periods(maturity, payment_frequency)?;
    let coupon = coupon_payment(face_value, coupon_rate, payment_frequency, haircut_bps)?;

    match subtype {
        BondSubtype::InflationLinked => {
            let curve = validate_inflation_curve(inflation_curve, n)?;
            let mut flows: CashflowSequence = curve[..(n as usize - 1)]
                .iter()
                .map(|factor| coupon * factor)
                .collect();
            // Non-empty after validation.
            let last_factor = curve[curve.len() - 1];
            flows.push((coupon + face_value) * last_factor);
            Ok(flows)
        }
        _ => Ok(level_coupon_schedule(coupon, n, face_value)),
    }
}

/// Subtypes each instrument family supports.
pub fn allowed_subtypes(kind: InstrumentKind) -> &'static [BondSubtype] {
    match kind {
        InstrumentKind::Corporate => &[
            BondSubtype::Fixed,
            BondSubtype::ZeroCoupon,
            BondSubtype::InflationLinked,
        ],
        InstrumentKind::Gilt => &[BondSubtype::Fixed, BondSubtype::InflationLinked],
        InstrumentKind::Callable => &[BondSubtype::Fixed],
    }
}

/// Generate cashflows after checking the subtype is valid for `kind`.
pub fn generate_instrument_cashflows(
    kind: InstrumentKind,
    bond: &BondParameters,
) -> BondCalcResult<CashflowSequence> {
    check_subtype(kind, bond.subtype)?;
    bond.cashflows()
}

// ---------------------------------------------------------------------------
// Public API: envelope
// ---------------------------------------------------------------------------

/// Generate cashflows with derived coupon figures and warnings.
pub fn build_cashflows(input: &CashflowInput) -> BondCalcResult<ComputationOutput<CashflowOutput>> {
    let start = Instant::now();
    let bond = &input.bond;

    let cashflows = generate_instrument_cashflows(input.instrument, bond)?;
    let warnings = cashflow_warnings(bond);

    let output = CashflowOutput {
        instrument: input.instrument,
        subtype: bond.subtype,
        periods: cashflows.len() as u32,
        adjusted_coupon_rate: adjusted_coupon_rate(bond.coupon_rate, bond.haircut_bps),
        coupon_payment: bond.coupon_payment()?,
        total_cashflow: cashflows.iter().copied().sum(),
        cashflows,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Bond cashflow schedule (whole-year maturity, level coupons)",
        input,
        warnings,
        elapsed,
        output,
    ))
}

/// Non-fatal observations about a bond's parameters.
pub fn cashflow_warnings(bond: &BondParameters) -> Vec<String> {
    let mut warnings = Vec::new();
    match bond.subtype {
        BondSubtype::ZeroCoupon if !bond.coupon_rate.is_zero() => {
            warnings.push(format!(
                "Coupon rate {} ignored for a zero-coupon bond",
                bond.coupon_rate
            ));
        }
        BondSubtype::InflationLinked => {
            if let (Some(curve), Ok(n)) = (&bond.inflation_curve, bond.periods()) {
                if curve.len() > n as usize {
                    warnings.push(format!(
                        "Inflation curve has {} entries for {} periods; redemption uses the last entry",
                        curve.len(),
                        n
                    ));
                }
            }
        }
        _ => {}
    }
    if bond.subtype != BondSubtype::InflationLinked && bond.inflation_curve.is_some() {
        warnings.push(format!("Inflation curve ignored for a {} bond", bond.subtype));
    }
    warnings
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

pub(crate) fn validate_bond_terms(
    face_value: Money,
    maturity: u32,
    payment_frequency: u32,
) -> BondCalcResult<()> {
    if face_value <= Decimal::ZERO {
        return Err(BondCalcError::invalid("face_value", "Face value must be positive"));
    }
    if maturity == 0 {
        return Err(BondCalcError::invalid("maturity", "Maturity must be positive"));
    }
    if payment_frequency == 0 {
        return Err(BondCalcError::invalid(
            "payment_frequency",
            "Payment frequency must be positive",
        ));
    }
    Ok(())
}

fn validate_inflation_curve(curve: Option<&[Decimal]>, periods: u32) -> BondCalcResult<&[Decimal]> {
    let curve = match curve {
        Some(c) if c.len() >= periods as usize => c,
        Some(c) => {
            return Err(BondCalcError::invalid(
                "inflation_curve",
                format!(
                    "inflation curve must cover all periods ({} entries for {} periods)",
                    c.len(),
                    periods
                ),
            ))
        }
        None => {
            return Err(BondCalcError::invalid(
                "inflation_curve",
                "inflation curve must cover all periods (none supplied)",
            ))
        }
    };
    if let Some(pos) = curve.iter().position(|f| *f <= Decimal::ZERO) {
        return Err(BondCalcError::invalid(
            "inflation_curve",
            format!("Inflation factor at index {pos} must be positive"),
        ));
    }
    Ok(curve)
}

fn check_subtype(kind: InstrumentKind, subtype: BondSubtype) -> BondCalcResult<()> {
    if allowed_subtypes(kind).contains(&subtype) {
        Ok(())
    } else {
        Err(BondCalcError::invalid(
            "subtype",
            format!("A {kind} bond cannot be {subtype}"),
        ))
    }
}
