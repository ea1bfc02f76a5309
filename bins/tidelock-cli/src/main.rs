//! tidelock: Command-line front end for the time-locked staking ledger.
//!
//! Prints rate schedules, validates deployment configs, and replays scripted
//! operation sequences against an in-memory token so parameter choices can
//! be checked before deployment.

mod script;

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tidelock_core::config::LedgerConfig;
use tidelock_core::constants::{BPS_PRECISION, COIN, SECONDS_PER_DAY};
use tidelock_core::traits::YieldCurve;
use tidelock_curve::LinearDecayCurve;
use tracing::info;

/// Time-locked staking ledger tools.
#[derive(Parser)]
#[command(name = "tidelock")]
#[command(version, about = "Lock tokens, earn a decaying rate, share the exit fees.")]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Log output format ("text" or "json")
    #[arg(long, global = true, default_value = "text")]
    log_format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the yield rate schedule over the lock period.
    Rates(RatesArgs),
    /// Validate a configuration and print it as JSON.
    Config(ConfigSource),
    /// Replay a JSON operation script and print each outcome.
    Simulate(SimulateArgs),
}

#[derive(Args)]
struct ConfigSource {
    /// Built-in preset (monthly or semi_annual).
    #[arg(short, long, conflicts_with = "config")]
    preset: Option<String>,

    /// TOML config file. TIDELOCK_* environment variables override it.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

impl ConfigSource {
    fn resolve(&self) -> Result<LedgerConfig> {
        match (&self.preset, &self.config) {
            (_, Some(path)) => LedgerConfig::load(path)
                .with_context(|| format!("Failed to load config: {}", path.display())),
            (Some(name), None) => match LedgerConfig::preset(name) {
                Some(config) => Ok(config),
                None => bail!("Unknown preset: {name} (expected monthly or semi_annual)"),
            },
            (None, None) => Ok(LedgerConfig::monthly()),
        }
    }
}

#[derive(Args)]
struct RatesArgs {
    #[command(flatten)]
    source: ConfigSource,

    /// Days between rows.
    #[arg(short, long, default_value_t = 30)]
    step_days: u64,
}

#[derive(Args)]
struct SimulateArgs {
    #[command(flatten)]
    source: ConfigSource,

    /// Path to the JSON script.
    #[arg(short, long)]
    script: PathBuf,

    /// Stop at the first rejected step.
    #[arg(long)]
    strict: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level, &cli.log_format);

    match cli.command {
        Commands::Rates(args) => rates(args),
        Commands::Config(source) => show_config(source),
        Commands::Simulate(args) => simulate(args),
    }
}

fn rates(args: RatesArgs) -> Result<()> {
    if args.step_days == 0 {
        bail!("--step-days must be greater than zero");
    }
    let config = args.source.resolve()?;
    let curve = LinearDecayCurve::from_config(&config).context("Invalid rate curve")?;
    let step = args.step_days.saturating_mul(SECONDS_PER_DAY);
    let lock_days = config.lock_period_secs.div_ceil(SECONDS_PER_DAY);

    println!("{:>6}  {:>8}  {:>8}  {:>16}", "day", "bps", "percent", "per 1000/step");
    let mut elapsed = 0u64;
    loop {
        let rate = curve.rate_at(elapsed);
        let earned = curve
            .yield_for(1_000 * COIN, rate, step)
            .context("Yield overflow")?;
        println!(
            "{:>6}  {:>8}  {:>7.2}%  {:>16.8}",
            elapsed / SECONDS_PER_DAY,
            rate,
            rate as f64 * 100.0 / BPS_PRECISION as f64,
            earned as f64 / COIN as f64,
        );
        if elapsed >= config.lock_period_secs {
            break;
        }
        elapsed = elapsed.saturating_add(step).min(lock_days * SECONDS_PER_DAY);
    }
    Ok(())
}

fn show_config(source: ConfigSource) -> Result<()> {
    let config = source.resolve()?;
    println!(
        "{}",
        serde_json::to_string_pretty(&config).context("Failed to encode config")?
    );
    Ok(())
}

fn simulate(args: SimulateArgs) -> Result<()> {
    let config = args.source.resolve()?;
    let script = script::Script::load(&args.script)?;
    info!(
        steps = script.steps.len(),
        accounts = script.balances.len(),
        "replaying script"
    );

    let replay = script::run(config, &script, args.strict)?;
    for outcome in &replay.outcomes {
        println!(
            "{}",
            serde_json::to_string(outcome).context("Failed to encode outcome")?
        );
    }
    println!(
        "{}",
        serde_json::to_string(&replay.summary).context("Failed to encode summary")?
    );
    if !replay.summary.sound {
        bail!("Ledger books do not balance after replay");
    }
    Ok(())
}

/// Initialize the tracing subscriber. Output goes to stderr so stdout stays
/// machine readable.
fn init_logging(level_str: &str, format: &str) {
    use tracing_subscriber::filter::EnvFilter;
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level_str));

    if format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_level(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}
