//! Basis-point shocks on a risk-free rate and credit spread.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::types::{Bps, Rate};

/// Basis points in one unit of decimal rate.
pub const BPS_PER_UNIT: Decimal = dec!(10000);

/// A base rate/spread pair with optional shocks in basis points.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RateStress {
    /// Base risk-free rate as a decimal.
    pub rfr: Rate,
    /// Base credit spread as a decimal.
    pub spread: Rate,
    /// Shock applied to the risk-free rate.
    #[serde(default)]
    pub stress_rfr_bps: Bps,
    /// Shock applied to the spread.
    #[serde(default)]
    pub stress_spread_bps: Bps,
}

impl RateStress {
    /// The single flat discount rate this stress produces.
    pub fn stressed_rate(&self) -> Rate {
        apply_stress(
            self.rfr,
            self.spread,
            self.stress_rfr_bps,
            self.stress_spread_bps,
        )
    }

    /// Each leg after its shock.
    pub fn stressed_legs(&self) -> StressedLegs {
        stressed_legs(
            self.rfr,
            self.spread,
            self.stress_rfr_bps,
            self.stress_spread_bps,
        )
    }
}

/// Risk-free rate and spread after their shocks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StressedLegs {
    pub stressed_rfr: Rate,
    pub stressed_spread: Rate,
}

impl StressedLegs {
    /// Combined flat discount rate.
    pub fn rate(&self) -> Rate {
        self.stressed_rfr + self.stressed_spread
    }
}

/// Convert basis points to a decimal rate.
pub fn bps_to_rate(bps: Bps) -> Rate {
    bps / BPS_PER_UNIT
}

/// Shift each leg by its own shock.
pub fn stressed_legs(
    rfr: Rate,
    spread: Rate,
    stress_rfr_bps: Bps,
    stress_spread_bps: Bps,
) -> StressedLegs {
    StressedLegs {
        stressed_rfr: rfr + bps_to_rate(stress_rfr_bps),
        stressed_spread: spread + bps_to_rate(stress_spread_bps),
    }
}

/// Stressed flat rate: `(rfr + rfr shock) + (spread + spread shock)`.
///
/// Negative shocks are valid and model relief scenarios.
pub fn apply_stress(rfr: Rate, spread: Rate, stress_rfr_bps: Bps, stress_spread_bps: Bps) -> Rate {
    stressed_legs(rfr, spread, stress_rfr_bps, stress_spread_bps).rate()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_apply_stress_reference() {
        let rate = apply_stress(dec!(0.03), dec!(0.02), dec!(50), dec!(100));
        assert_eq!(rate, dec!(0.065));
    }

    #[test]
    fn test_apply_stress_no_shock() {
        let rate = apply_stress(dec!(0.03), dec!(0.02), Decimal::ZERO, Decimal::ZERO);
        assert_eq!(rate, dec!(0.05));
    }

    #[test]
    fn test_negative_shock_is_relief() {
        let rate = apply_stress(dec!(0.03), dec!(0.02), dec!(-100), dec!(-50));
        assert_eq!(rate, dec!(0.035));
    }

    #[test]
    fn test_rate_stress_struct_matches_free_fn() {
        let stress = RateStress {
            rfr: dec!(0.04),
            spread: dec!(0.015),
            stress_rfr_bps: dec!(25),
            stress_spread_bps: dec!(10),
        };
        assert_eq!(stress.stressed_rate(), dec!(0.0585));
    }

    #[test]
    fn test_bps_to_rate() {
        assert_eq!(bps_to_rate(dec!(1)), dec!(0.0001));
        assert_eq!(bps_to_rate(dec!(250)), dec!(0.025));
    }

    #[test]
    fn test_stressed_legs_shift_each_leg() {
        let legs = RateStress {
            rfr: dec!(0.03),
            spread: dec!(0.02),
            stress_rfr_bps: dec!(50),
            stress_spread_bps: dec!(100),
        }
        .stressed_legs();
        assert_eq!(legs.stressed_rfr, dec!(0.035));
        assert_eq!(legs.stressed_spread, dec!(0.03));
        assert_eq!(legs.rate(), dec!(0.065));
    }
}
