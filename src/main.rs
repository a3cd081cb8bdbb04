use std::io::{stderr, stdout, BufWriter, Write};
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::Parser;
use rust_decimal::Decimal;
use tracing::info;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, Layer};

use sacco_ledger::clock::ReplayClock;
use sacco_ledger::config::{AccrualPeriod, LedgerConfig};
use sacco_ledger::engine::{JournalEngine, Sacco};
use sacco_ledger::events::TracingSink;
use sacco_ledger::reporting::Reporter;
use sacco_ledger::storage::LedgerStorage;

/// Replays a command journal and writes the member leaderboard as CSV to stdout.
#[derive(Parser)]
#[command(name = "sacco-ledger")]
#[command(version)]
struct Cli {
    /// Journal CSV: at,command,caller,role,member,amount,target,reason
    journal: String,

    /// error, warn, info, debug or trace
    #[arg(long, env = "SACCO_LOG", default_value = "error")]
    log_level: String,

    #[arg(long, env = "SACCO_INTEREST_RATE", default_value = "0.10")]
    interest_rate: Decimal,

    #[arg(long, env = "SACCO_ACCRUAL_PERIOD", value_enum, default_value_t = AccrualPeriod::Day)]
    accrual_period: AccrualPeriod,

    #[arg(long, env = "SACCO_PENALTY_PER_WEEK", default_value = "50")]
    penalty_per_week: Decimal,

    #[arg(long, env = "SACCO_GRACE_PERIOD_DAYS", default_value_t = 30)]
    grace_period_days: i64,

    #[arg(long, env = "SACCO_INACTIVITY_THRESHOLD_DAYS", default_value_t = 90)]
    inactivity_threshold_days: i64,

    #[arg(long, env = "SACCO_INACTIVITY_FINE", default_value = "100")]
    inactivity_fine: Decimal,

    /// Lowest balance a member may reach, unbounded when omitted.
    #[arg(long, env = "SACCO_BALANCE_FLOOR")]
    balance_floor: Option<Decimal>,

    #[arg(long, env = "SACCO_GROUP_GOAL", default_value = "100000")]
    group_goal: Decimal
}

impl Cli {
    fn ledger_config(&self) -> LedgerConfig {
        LedgerConfig {
            interest_rate: self.interest_rate,
            accrual_period: self.accrual_period,
            penalty_per_week: self.penalty_per_week,
            grace_period_days: self.grace_period_days,
            inactivity_threshold_days: self.inactivity_threshold_days,
            inactivity_fine: self.inactivity_fine,
            balance_floor: self.balance_floor,
            group_goal: self.group_goal
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(parse_log_level(&cli.log_level));

    let config = cli.ledger_config();
    config.validate()?;

    //NOTE: The journal carries its own timestamps, the clock starts at the epoch and follows the rows.
    let clock = Arc::new(ReplayClock::new(DateTime::<Utc>::UNIX_EPOCH));
    let sacco = Sacco::in_memory(&config, clock.clone(), Arc::new(TracingSink));
    let engine = JournalEngine::new(sacco, clock);

    let timer = Instant::now();
    let stats = engine.run(&cli.journal).await?;
    let duration = timer.elapsed();

    info!("Replayed [{}] journal rows in: {duration:?}", stats.applied + stats.rejected + stats.malformed);

    let reporter = engine.sacco().reporter();
    let summary = reporter.financial_summary();

    info!("Financial summary: {summary:?}");
    info!("Group goal progress: [{}]%", reporter.goal_progress());

    write_leaderboard_to_stdout(reporter)?;

    Ok(())
}

fn parse_log_level(level: &str) -> LevelFilter {
    match level.to_lowercase().as_str() {
        "trace" => LevelFilter::TRACE,
        "debug" => LevelFilter::DEBUG,
        "info" => LevelFilter::INFO,
        "warn" => LevelFilter::WARN,
        "error" => LevelFilter::ERROR,
        _ => {
            eprintln!("Invalid log level '{}', defaulting to 'error'", level);
            LevelFilter::ERROR
        }
    }
}

fn setup_logging(level: LevelFilter) {
    //NOTE: stdout carries the report, logs go to stderr.
    let terminal_log = fmt::layer()
        .with_target(false)
        .with_writer(stderr)
        .with_filter(level);

    tracing_subscriber::registry()
        .with(terminal_log)
        .init();
}

fn write_leaderboard_to_stdout(reporter: &Reporter<LedgerStorage>) -> Result<()> {
    let mut output = BufWriter::new(stdout().lock());

    writeln!(output, "rank,member,role,balance,last_activity")?;

    for entry in reporter.leaderboard() {
        let last_activity = entry.last_activity_at
            .map(|at| at.to_rfc3339())
            .unwrap_or_default();

        writeln!(output, "{},{},{},{},{}", entry.rank, entry.member_id, entry.role.as_str(), entry.balance, last_activity)?;
    }

    output.flush()?;

    Ok(())
}
