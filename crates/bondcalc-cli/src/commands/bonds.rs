use clap::Args;
use rust_decimal::Decimal;
use serde_json::{json, Value};

use bondcalc_core::cashflows::{self, BondParameters, BondSubtype, CashflowInput};
use bondcalc_core::present_value::{self, PresentValueInput, StressedPresentValueInput};
use bondcalc_core::stress::RateStress;
use bondcalc_core::valuation::{self, BondValuationInput};
use bondcalc_core::yields::{self, YieldInput};
use bondcalc_core::InstrumentKind;

use crate::input;

/// Bond terms given as flags instead of a JSON request
#[derive(Args)]
pub struct BondFlags {
    /// Face (par) value
    #[arg(long)]
    pub face_value: Option<Decimal>,

    /// Annual coupon rate as a decimal (0.05 = 5%)
    #[arg(long)]
    pub coupon_rate: Option<Decimal>,

    /// Whole years to maturity
    #[arg(long)]
    pub maturity: Option<u32>,

    /// Coupon payments per year
    #[arg(long, default_value_t = 1)]
    pub frequency: u32,

    /// fixed, zero-coupon or inflation-linked
    #[arg(long, default_value = "fixed")]
    pub subtype: BondSubtype,

    /// Coupon haircut in basis points
    #[arg(long, default_value = "0")]
    pub haircut_bps: Decimal,

    /// Inflation multipliers, one per period (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub inflation_curve: Option<Vec<Decimal>>,
}

impl BondFlags {
    fn to_params(&self) -> Result<BondParameters, Box<dyn std::error::Error>> {
        let face_value = self
            .face_value
            .ok_or("--face-value is required (or provide --input)")?;
        let maturity = self
            .maturity
            .ok_or("--maturity is required (or provide --input)")?;
        // Zero-coupon bonds need no coupon
        let coupon_rate = match (self.coupon_rate, self.subtype) {
            (Some(rate), _) => rate,
            (None, BondSubtype::ZeroCoupon) => Decimal::ZERO,
            (None, _) => return Err("--coupon-rate is required (or provide --input)".into()),
        };

        Ok(BondParameters {
            subtype: self.subtype,
            haircut_bps: self.haircut_bps,
            inflation_curve: self.inflation_curve.clone(),
            ..BondParameters::fixed(face_value, coupon_rate, maturity, self.frequency)
        })
    }
}

// ---------------------------------------------------------------------------
// cashflows
// ---------------------------------------------------------------------------

/// Arguments for cashflow generation
#[derive(Args)]
pub struct CashflowsArgs {
    /// Path to JSON input file
    #[arg(long)]
    pub input: Option<String>,

    /// corporate or gilt
    #[arg(long, default_value = "corporate")]
    pub instrument: InstrumentKind,

    #[command(flatten)]
    pub bond: BondFlags,
}

pub fn run_cashflows(args: CashflowsArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let cf_input: CashflowInput = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        data
    } else {
        CashflowInput {
            instrument: args.instrument,
            bond: args.bond.to_params()?,
        }
    };
    let result = cashflows::build_cashflows(&cf_input)?;
    tracing::debug!(
        instrument = %result.result.instrument,
        periods = result.result.periods,
        "generated cashflows"
    );
    Ok(serde_json::to_value(result)?)
}

// ---------------------------------------------------------------------------
// ytm
// ---------------------------------------------------------------------------

/// Arguments for yield to maturity
#[derive(Args)]
pub struct YtmArgs {
    /// Path to JSON input file
    #[arg(long)]
    pub input: Option<String>,

    /// Explicit cashflows (comma-separated); otherwise generated from bond terms
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub cashflows: Option<Vec<Decimal>>,

    /// Price paid today
    #[arg(long)]
    pub market_price: Option<Decimal>,

    /// corporate or gilt, when generating from bond terms
    #[arg(long, default_value = "corporate")]
    pub instrument: InstrumentKind,

    #[command(flatten)]
    pub bond: BondFlags,
}

pub fn run_ytm(args: YtmArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let ytm_input: YieldInput = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        data
    } else {
        let market_price = args
            .market_price
            .ok_or("--market-price is required (or provide --input)")?;
        let flows = match args.cashflows {
            Some(flows) => flows,
            None => cashflows::generate_instrument_cashflows(
                args.instrument,
                &args.bond.to_params()?,
            )?,
        };
        YieldInput {
            cashflows: flows,
            market_price,
            payment_frequency: args.bond.frequency,
        }
    };
    let result = yields::calculate_ytm(&ytm_input)?;
    Ok(serde_json::to_value(result)?)
}

// ---------------------------------------------------------------------------
// pv / stressed-pv / stress
// ---------------------------------------------------------------------------

/// Arguments for present value
#[derive(Args)]
pub struct PvArgs {
    /// Path to JSON input file
    #[arg(long)]
    pub input: Option<String>,

    /// Cashflows, one per period (comma-separated)
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub cashflows: Option<Vec<Decimal>>,

    /// Annual discount rate as a decimal
    #[arg(long, allow_hyphen_values = true)]
    pub discount_rate: Option<Decimal>,

    /// Payments per year
    #[arg(long, default_value_t = 1)]
    pub frequency: u32,

    /// Whole years already elapsed
    #[arg(long, default_value_t = 0)]
    pub time_t: u32,

    /// Multipliers for the remaining cashflows (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub inflation_adjustment: Option<Vec<Decimal>>,
}

pub fn run_pv(args: PvArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let pv_input: PresentValueInput = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        data
    } else {
        PresentValueInput {
            cashflows: args
                .cashflows
                .ok_or("--cashflows is required (or provide --input)")?,
            discount_rate: args
                .discount_rate
                .ok_or("--discount-rate is required (or provide --input)")?,
            payment_frequency: args.frequency,
            time_t: args.time_t,
            inflation_adjustment: args.inflation_adjustment,
        }
    };
    let result = present_value::calculate_present_value(&pv_input)?;
    Ok(serde_json::to_value(result)?)
}

/// Base risk-free rate, spread and their shocks
#[derive(Args)]
pub struct StressFlags {
    /// Base risk-free rate as a decimal
    #[arg(long, allow_hyphen_values = true)]
    pub rfr: Option<Decimal>,

    /// Base credit spread as a decimal
    #[arg(long, allow_hyphen_values = true)]
    pub spread: Option<Decimal>,

    /// Shock to the risk-free rate in basis points
    #[arg(long, default_value = "0", allow_hyphen_values = true)]
    pub stress_rfr_bps: Decimal,

    /// Shock to the spread in basis points
    #[arg(long, default_value = "0", allow_hyphen_values = true)]
    pub stress_spread_bps: Decimal,
}

impl StressFlags {
    fn to_stress(&self) -> Result<RateStress, Box<dyn std::error::Error>> {
        Ok(RateStress {
            rfr: self.rfr.ok_or("--rfr is required")?,
            spread: self.spread.ok_or("--spread is required")?,
            stress_rfr_bps: self.stress_rfr_bps,
            stress_spread_bps: self.stress_spread_bps,
        })
    }
}

/// Arguments for stressed present value
#[derive(Args)]
pub struct StressedPvArgs {
    /// Path to JSON input file
    #[arg(long)]
    pub input: Option<String>,

    /// Cashflows, one per period (comma-separated)
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub cashflows: Option<Vec<Decimal>>,

    /// Payments per year
    #[arg(long, default_value_t = 1)]
    pub frequency: u32,

    #[command(flatten)]
    pub stress: StressFlags,
}

pub fn run_stressed_pv(args: StressedPvArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let spv_input: StressedPresentValueInput = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        data
    } else {
        StressedPresentValueInput {
            cashflows: args
                .cashflows
                .ok_or("--cashflows is required (or provide --input)")?,
            stress: args.stress.to_stress()?,
            payment_frequency: args.frequency,
        }
    };
    let result = present_value::calculate_stressed_present_value(&spv_input)?;
    Ok(serde_json::to_value(result)?)
}

/// Arguments for rate stress
#[derive(Args)]
pub struct StressArgs {
    #[command(flatten)]
    pub stress: StressFlags,
}

pub fn run_stress(args: StressArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let stress = args.stress.to_stress()?;
    let legs = stress.stressed_legs();
    Ok(json!({
        "result": {
            "base_rate": stress.rfr + stress.spread,
            "stressed_rfr": legs.stressed_rfr,
            "stressed_spread": legs.stressed_spread,
            "stressed_rate": legs.rate(),
        },
        "assumptions": stress,
    }))
}

// ---------------------------------------------------------------------------
// value
// ---------------------------------------------------------------------------

/// Arguments for a full bond valuation
#[derive(Args)]
pub struct ValueArgs {
    /// Path to JSON input file
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_value(args: ValueArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let val_input: BondValuationInput = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        data
    } else {
        return Err("--input <file.json> or stdin required for bond valuation".into());
    };
    let result = valuation::value_bond(&val_input)?;
    for w in &result.warnings {
        tracing::warn!("{w}");
    }
    Ok(serde_json::to_value(result)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn flags() -> BondFlags {
        BondFlags {
            face_value: Some(dec!(1000)),
            coupon_rate: Some(dec!(0.05)),
            maturity: Some(5),
            frequency: 1,
            subtype: BondSubtype::Fixed,
            haircut_bps: Decimal::ZERO,
            inflation_curve: None,
        }
    }

    #[test]
    fn test_flags_build_fixed_bond() {
        let params = flags().to_params().unwrap();
        assert_eq!(params, BondParameters::fixed(dec!(1000), dec!(0.05), 5, 1));
    }

    #[test]
    fn test_zero_coupon_flags_need_no_coupon() {
        let f = BondFlags {
            coupon_rate: None,
            subtype: BondSubtype::ZeroCoupon,
            ..flags()
        };
        assert_eq!(f.to_params().unwrap().coupon_rate, Decimal::ZERO);
    }

    #[test]
    fn test_missing_face_value_names_flag() {
        let f = BondFlags {
            face_value: None,
            ..flags()
        };
        let err = f.to_params().unwrap_err().to_string();
        assert!(err.contains("--face-value"), "{err}");
    }

    #[test]
    fn test_stress_command_result() {
        let value = run_stress(StressArgs {
            stress: StressFlags {
                rfr: Some(dec!(0.03)),
                spread: Some(dec!(0.02)),
                stress_rfr_bps: dec!(50),
                stress_spread_bps: dec!(100),
            },
        })
        .unwrap();
        let field = |name: &str| -> Decimal {
            serde_json::from_value(value["result"][name].clone()).unwrap()
        };
        assert_eq!(field("stressed_rfr"), dec!(0.035));
        assert_eq!(field("stressed_spread"), dec!(0.03));
        assert_eq!(field("stressed_rate"), dec!(0.065));
    }
}
