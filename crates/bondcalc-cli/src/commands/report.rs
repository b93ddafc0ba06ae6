use clap::Args;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::{json, Value};
use std::fmt::Write as _;

use bondcalc_core::callable;
use bondcalc_core::cashflows::{generate_instrument_cashflows, BondParameters, BondSubtype};
use bondcalc_core::present_value::{present_value, stressed_present_value};
use bondcalc_core::stress::apply_stress;
use bondcalc_core::yields::yield_to_maturity;
use bondcalc_core::{BondCalcResult, CashflowSequence, InstrumentKind, Money, Rate};

use crate::input::config::{load_report_config, ReportConfig};

const RULE_WIDTH: usize = 50;

/// Arguments for the scenario report
#[derive(Args)]
pub struct ReportArgs {
    /// JSON or YAML config file (defaults apply without one)
    #[arg(long)]
    pub config: Option<String>,

    /// Print the fixed-layout text report instead of structured output
    #[arg(long)]
    pub plain: bool,
}

/// Base and haircut-stressed yield for one instrument.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioPair {
    pub base_pct: Decimal,
    pub base_cashflows: CashflowSequence,
    pub stressed_pct: Decimal,
    pub stressed_cashflows: CashflowSequence,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    /// YTM of the fixed corporate bond.
    pub corporate: ScenarioPair,
    /// YTW and worst-case cashflows of the callable bond.
    pub callable: ScenarioPair,
    /// YTM of the inflation-linked gilt.
    pub gilt: ScenarioPair,
    pub base_rate: Rate,
    pub base_present_value: Money,
    pub stressed_rate: Rate,
    pub stressed_present_value: Money,
    pub version: String,
    pub support_contact: String,
}

/// Value the three reference instruments with and without the coupon haircut.
pub fn build_report(cfg: &ReportConfig) -> BondCalcResult<ScenarioReport> {
    let base = BondParameters::fixed(
        cfg.face_value,
        cfg.coupon_rate,
        cfg.maturity,
        cfg.payment_frequency,
    );
    let cut = BondParameters {
        haircut_bps: cfg.haircut_bps,
        ..base.clone()
    };
    let freq = cfg.payment_frequency;

    let corporate = ytm_pair(InstrumentKind::Corporate, &base, &cut, cfg.market_price)?;

    let ytw = |haircut_bps: Decimal| {
        callable::yield_to_worst(
            cfg.face_value,
            cfg.coupon_rate,
            &cfg.call_dates,
            &cfg.call_prices,
            cfg.maturity,
            cfg.market_price,
            freq,
            haircut_bps,
        )
    };
    let (base_ytw, base_worst) = ytw(Decimal::ZERO)?;
    let (stressed_ytw, stressed_worst) = ytw(cfg.haircut_bps)?;
    let callable = ScenarioPair {
        base_pct: base_ytw,
        base_cashflows: base_worst,
        stressed_pct: stressed_ytw,
        stressed_cashflows: stressed_worst,
    };

    let linker = |bond: &BondParameters| BondParameters {
        subtype: BondSubtype::InflationLinked,
        inflation_curve: Some(cfg.inflation_curve.clone()),
        ..bond.clone()
    };
    let gilt = ytm_pair(
        InstrumentKind::Gilt,
        &linker(&base),
        &linker(&cut),
        cfg.market_price,
    )?;

    let base_rate = cfg.rfr + cfg.spread;
    let stressed_rate = apply_stress(cfg.rfr, cfg.spread, cfg.stress_rfr_bps, cfg.stress_spread_bps);
    let base_present_value = present_value(&corporate.base_cashflows, base_rate, freq)?;
    let stressed_pv = stressed_present_value(
        &corporate.base_cashflows,
        cfg.rfr,
        cfg.spread,
        cfg.stress_rfr_bps,
        cfg.stress_spread_bps,
        freq,
    )?;

    Ok(ScenarioReport {
        corporate,
        callable,
        gilt,
        base_rate,
        base_present_value,
        stressed_rate,
        stressed_present_value: stressed_pv,
        version: env!("CARGO_PKG_VERSION").to_string(),
        support_contact: env!("CARGO_PKG_AUTHORS").to_string(),
    })
}

fn ytm_pair(
    kind: InstrumentKind,
    base: &BondParameters,
    stressed: &BondParameters,
    market_price: Money,
) -> BondCalcResult<ScenarioPair> {
    let base_cashflows = generate_instrument_cashflows(kind, base)?;
    let stressed_cashflows = generate_instrument_cashflows(kind, stressed)?;
    Ok(ScenarioPair {
        base_pct: yield_to_maturity(&base_cashflows, market_price, base.payment_frequency)?,
        stressed_pct: yield_to_maturity(
            &stressed_cashflows,
            market_price,
            stressed.payment_frequency,
        )?,
        base_cashflows,
        stressed_cashflows,
    })
}

/// Fixed-layout text rendering of a report.
pub fn render_plain(report: &ScenarioReport) -> String {
    let mut out = String::new();
    let sections = [
        ("Corporate Bond Results", "YTM", "Cashflows", &report.corporate),
        ("Callable Bond Results", "YTW", "Worst-Case Cashflows", &report.callable),
        ("Gilt Results", "YTM", "Cashflows", &report.gilt),
    ];

    for (i, (title, measure, flows, pair)) in sections.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        let _ = writeln!(out, "{title}:");
        let _ = writeln!(out, "  Base {measure}: {}%", pct(pair.base_pct));
        let _ = writeln!(out, "  Base {flows}: {}", cashflow_list(&pair.base_cashflows));
        let _ = writeln!(
            out,
            "  Stressed {measure} (with Haircut): {}%",
            pct(pair.stressed_pct)
        );
        let _ = writeln!(
            out,
            "  Stressed {flows}: {}",
            cashflow_list(&pair.stressed_cashflows)
        );
    }

    let _ = writeln!(out, "\nPresent Value (corporate, base cashflows):");
    let _ = writeln!(
        out,
        "  Base ({}%): {:.2}",
        pct(report.base_rate * Decimal::ONE_HUNDRED),
        report.base_present_value.round_dp(2)
    );
    let _ = writeln!(
        out,
        "  Stressed ({}%): {:.2}",
        pct(report.stressed_rate * Decimal::ONE_HUNDRED),
        report.stressed_present_value.round_dp(2)
    );

    let rule = "-".repeat(RULE_WIDTH);
    let _ = writeln!(out, "\n{rule}");
    let _ = writeln!(out, "{:^width$}", "Run Complete", width = RULE_WIDTH);
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "Version: {}", report.version);
    let _ = writeln!(out, "Support Contact: {}", report.support_contact);
    let _ = writeln!(out, "{rule}");
    out
}

fn pct(value: Decimal) -> String {
    format!("{:.2}", value.round_dp(2))
}

fn cashflow_list(flows: &[Money]) -> String {
    let items: Vec<String> = flows.iter().map(|c| c.normalize().to_string()).collect();
    format!("[{}]", items.join(", "))
}

pub fn run_report(args: ReportArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let cfg = load_report_config(args.config.as_deref())?;
    let report = build_report(&cfg)?;
    tracing::info!(
        corporate_ytm = %report.corporate.base_pct.round_dp(4),
        callable_ytw = %report.callable.base_pct.round_dp(4),
        gilt_ytm = %report.gilt.base_pct.round_dp(4),
        "report complete"
    );

    if args.plain {
        print!("{}", render_plain(&report));
        return Ok(Value::Null);
    }
    Ok(json!({ "result": report, "assumptions": cfg }))
}
