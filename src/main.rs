use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use tallybook::config::{default_config_path, ResolvedConfig};
use tallybook::format::render_report_text;
use tallybook::fx::{JsonlFxRateStore, RateConverter};
use tallybook::report::{ReportPeriodInput, ReportRequest, ReportService};
use tallybook::storage::JsonFileStorage;

fn parse_duration_arg(s: &str) -> Result<Duration, String> {
    tallybook::duration::parse_duration(s).map_err(|e| e.to_string())
}

#[derive(Parser)]
#[command(name = "tallybook")]
#[command(about = "Income, spending and cap reports over a local ledger")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value_os_t = default_config_path())]
    config: PathBuf,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate a report
    Report(ReportArgs),
    /// Show current configuration
    Config,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Json,
    Text,
}

#[derive(Args)]
struct ReportArgs {
    /// range, monthly, bimonthly or quarterly (defaults to monthly when --month is set)
    #[arg(long)]
    scope: Option<String>,

    /// First month of a month-scoped report (YYYY-MM)
    #[arg(long)]
    month: Option<String>,

    /// Range start: RFC3339 timestamp or YYYY-MM-DD
    #[arg(long)]
    from: Option<String>,

    /// Range end: RFC3339 timestamp or YYYY-MM-DD (inclusive)
    #[arg(long)]
    to: Option<String>,

    /// day, week or month
    #[arg(long)]
    group_by: Option<String>,

    /// Only entries in this category
    #[arg(long)]
    category: Option<i64>,

    /// Label filter; repeat for several labels
    #[arg(long = "label")]
    labels: Vec<i64>,

    /// any, all or none
    #[arg(long, default_value = "any")]
    label_mode: String,

    /// cash or card
    #[arg(long)]
    payment_method: Option<String>,

    /// Only entries paid with this card
    #[arg(long)]
    card: Option<i64>,

    /// Also total everything in this currency
    #[arg(long)]
    convert_to: Option<String>,

    /// Override the per-call timeout (e.g. "5s", "500ms")
    #[arg(long, value_name = "DURATION", value_parser = parse_duration_arg)]
    timeout: Option<Duration>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    format: OutputFormat,
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(fmt::layer().with_writer(std::io::stderr).json())
            .init();
    } else {
        registry
            .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
            .init();
    }
}

async fn run_report(config: &ResolvedConfig, args: ReportArgs) -> Result<()> {
    let storage = Arc::new(JsonFileStorage::new(&config.data_dir));
    let converter = RateConverter::new(Arc::new(JsonlFxRateStore::new(&config.data_dir)))
        .with_lookback_days(config.fx.lookback_days);

    let mut service = ReportService::new(storage.clone())
        .with_category_source(storage.clone())
        .with_cap_reader(storage.clone())
        .with_settings_reader(storage)
        .with_converter(Arc::new(converter))
        .with_default_thresholds(config.report.thresholds());
    if let Some(timeout) = args.timeout.or(config.report.call_timeout()) {
        service = service.with_call_timeout(timeout);
    }

    let scope = args.scope.unwrap_or_else(|| {
        if args.month.is_some() {
            "monthly".to_string()
        } else {
            "range".to_string()
        }
    });
    let request = ReportRequest {
        period: ReportPeriodInput {
            scope,
            month_key: args.month.unwrap_or_default(),
            date_from_utc: args.from.unwrap_or_default(),
            date_to_utc: args.to.unwrap_or_default(),
        },
        grouping: args
            .group_by
            .unwrap_or_else(|| config.report.default_grouping.clone()),
        category_id: args.category,
        label_ids: args.labels,
        label_mode: args.label_mode,
        convert_to: args.convert_to.or_else(|| config.report.convert_to.clone()),
        payment_method: args.payment_method,
        card_id: args.card,
    };
    debug!(data_dir = %config.data_dir.display(), "running report");

    let generated = service.generate(request).await?;

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&generated)?),
        OutputFormat::Text => println!("{}", render_report_text(&generated)),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let config = ResolvedConfig::load_or_default(&cli.config)
        .with_context(|| format!("Failed to load config: {}", cli.config.display()))?;

    match cli.command {
        Command::Report(args) => run_report(&config, args).await,
        Command::Config => {
            print!(
                "{}",
                toml::to_string_pretty(&config).context("Failed to render config")?
            );
            Ok(())
        }
    }
}
