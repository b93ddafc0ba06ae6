mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::process;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use commands::batch::BatchArgs;
use commands::bonds::{CashflowsArgs, PvArgs, StressArgs, StressedPvArgs, ValueArgs, YtmArgs};
use commands::callable::YtwArgs;
use commands::report::ReportArgs;
use output::OutputFormat;

/// Bond present value, yield to maturity and yield to worst
#[derive(Parser)]
#[command(
    name = "bondcalc",
    version,
    about = "Bond present value, yield to maturity and yield to worst",
    long_about = "A CLI for valuing corporate bonds, gilts and callable bonds with decimal \
                  precision. Generates cashflows (fixed, zero-coupon, inflation-linked), \
                  solves YTM and YTW, and discounts at base and stressed flat rates."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Debug-level logging on stderr (RUST_LOG overrides)
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate the cashflow schedule of a corporate bond or gilt
    Cashflows(CashflowsArgs),
    /// Yield to maturity from cashflows or bond terms and a market price
    Ytm(YtmArgs),
    /// Present value, optionally from year t and inflation-adjusted
    Pv(PvArgs),
    /// Present value under risk-free rate and spread stress
    StressedPv(StressedPvArgs),
    /// Apply basis-point stress to a risk-free rate and spread
    Stress(StressArgs),
    /// Yield to worst of a callable bond
    Ytw(YtwArgs),
    /// Full valuation of one bond from a JSON request
    Value(ValueArgs),
    /// Value every bond in a CSV file
    Batch(BatchArgs),
    /// Base vs. stressed report for a corporate bond, callable bond and gilt
    Report(ReportArgs),
    /// Print version information
    Version,
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("bondcalc_cli=debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("bondcalc_cli=info"))
    };

    // stdout carries results; logs go to stderr
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Cashflows(args) => commands::bonds::run_cashflows(args),
        Commands::Ytm(args) => commands::bonds::run_ytm(args),
        Commands::Pv(args) => commands::bonds::run_pv(args),
        Commands::StressedPv(args) => commands::bonds::run_stressed_pv(args),
        Commands::Stress(args) => commands::bonds::run_stress(args),
        Commands::Ytw(args) => commands::callable::run_ytw(args),
        Commands::Value(args) => commands::bonds::run_value(args),
        Commands::Batch(args) => commands::batch::run_batch(args),
        Commands::Report(args) => commands::report::run_report(args),
        Commands::Version => {
            println!("bondcalc {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) if value.is_null() => process::exit(0),
        Ok(value) => {
            output::format_output(cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            tracing::debug!(error = %e, "command failed");
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
