use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use bondcalc_core::callable::{self, CallSchedule, YieldToWorstInput};

use crate::input;

/// Arguments for yield to worst
#[derive(Args)]
pub struct YtwArgs {
    /// Path to JSON input file
    #[arg(long)]
    pub input: Option<String>,

    /// Face (par) value
    #[arg(long)]
    pub face_value: Option<Decimal>,

    /// Annual coupon rate as a decimal
    #[arg(long)]
    pub coupon_rate: Option<Decimal>,

    /// Call dates in whole years (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub call_dates: Vec<u32>,

    /// Call price for each call date (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub call_prices: Vec<Decimal>,

    /// Whole years to maturity
    #[arg(long)]
    pub maturity: Option<u32>,

    /// Price paid today
    #[arg(long)]
    pub market_price: Option<Decimal>,

    /// Coupon payments per year
    #[arg(long, default_value_t = 1)]
    pub frequency: u32,

    /// Coupon haircut in basis points
    #[arg(long, default_value = "0")]
    pub haircut_bps: Decimal,
}

pub fn run_ytw(args: YtwArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let ytw_input: YieldToWorstInput = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        data
    } else {
        YieldToWorstInput {
            face_value: args
                .face_value
                .ok_or("--face-value is required (or provide --input)")?,
            coupon_rate: args
                .coupon_rate
                .ok_or("--coupon-rate is required (or provide --input)")?,
            schedule: CallSchedule::new(args.call_dates, args.call_prices),
            maturity: args
                .maturity
                .ok_or("--maturity is required (or provide --input)")?,
            market_price: args
                .market_price
                .ok_or("--market-price is required (or provide --input)")?,
            payment_frequency: args.frequency,
            haircut_bps: args.haircut_bps,
        }
    };

    let result = callable::calculate_yield_to_worst(&ytw_input)?;
    tracing::info!(
        ytw_pct = %result.result.ytw_pct,
        worst = %result.result.worst_scenario,
        scenarios = result.result.scenarios.len(),
        "yield to worst"
    );
    Ok(serde_json::to_value(result)?)
}
