//! rusty-retail CLI - run the retail planning pipeline from the command line
//!
//! ## Example Usage
//!
//! ```bash
//! # Full pipeline for one category
//! rusty-retail --data-dir data run tv --as-of 2024-10-20
//!
//! # Several categories in parallel
//! rusty-retail batch tv phone fashion --concurrency 3
//!
//! # Forecast only, as JSON
//! rusty-retail --json forecast groceries --horizon 14
//!
//! # Show loaded reference data
//! rusty-retail info
//! ```

use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use rusty_retail::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// rusty-retail: demand forecast, replenishment and pricing per category
#[derive(Parser)]
#[command(name = "rusty-retail")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(author = "Robert Fall")]
#[command(about = "Retail demand, replenishment and pricing pipeline", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding the reference data files
    #[arg(short, long, global = true)]
    data_dir: Option<PathBuf>,

    /// Forecast start date (YYYY-MM-DD, default today)
    #[arg(long, global = true)]
    as_of: Option<String>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline for one category
    Run {
        #[arg(value_name = "CATEGORY")]
        category: String,

        /// Forecast horizon in days
        #[arg(long)]
        horizon: Option<u32>,

        /// Current stock on hand
        #[arg(long)]
        stock: Option<f64>,

        /// Stock already on order
        #[arg(long)]
        in_transit: Option<f64>,

        /// Supplier lead time in days
        #[arg(long)]
        lead_time: Option<u32>,

        /// Minimum order quantity
        #[arg(long)]
        moq: Option<f64>,

        /// Demand volatility (low, medium, high)
        #[arg(long)]
        volatility: Option<Volatility>,

        /// Current unit price
        #[arg(long)]
        price: Option<f64>,
    },

    /// Run the pipeline for several categories in parallel
    Batch {
        #[arg(value_name = "CATEGORY", required = true)]
        categories: Vec<String>,

        /// Maximum number of concurrent runs
        #[arg(short = 'n', long, default_value = "4")]
        concurrency: usize,
    },

    /// Forecast demand only
    Forecast {
        #[arg(value_name = "CATEGORY")]
        category: String,

        /// Forecast horizon in days
        #[arg(long)]
        horizon: Option<u32>,
    },

    /// Show reference data and configuration
    Info,
}

/// Configuration file structure
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Config {
    #[serde(default = "default_data_dir")]
    data_dir: PathBuf,
    #[serde(default)]
    pipeline: PipelineConfig,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            pipeline: PipelineConfig::default(),
        }
    }
}

impl Config {
    fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => match dirs::home_dir() {
                Some(home) => {
                    let default_config = home.join(".rusty-retail").join("config.toml");
                    if !default_config.exists() {
                        return Ok(Config::default());
                    }
                    default_config
                }
                None => return Ok(Config::default()),
            },
        };

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        config.pipeline.validate()?;
        Ok(config)
    }
}

struct Session {
    config: Config,
    data: Arc<InMemoryReferenceData>,
    as_of: NaiveDate,
    json: bool,
    verbose: bool,
}

impl Session {
    fn open(cli: &Cli) -> Result<Self> {
        let mut config = Config::load(cli.config.as_deref())?;
        if let Some(dir) = &cli.data_dir {
            config.data_dir = dir.clone();
        }
        let as_of = match &cli.as_of {
            Some(date) => NaiveDate::parse_from_str(date, "%Y-%m-%d")
                .with_context(|| format!("invalid --as-of date '{}'", date))?,
            None => Utc::now().date_naive(),
        };
        let data = ReferenceDataLoader::new(&config.data_dir)
            .load()
            .with_context(|| format!("failed to load data from {}", config.data_dir.display()))?;

        if cli.verbose {
            println!(
                "{} v{}",
                "rusty-retail".cyan().bold(),
                env!("CARGO_PKG_VERSION")
            );
            println!(
                "Data dir: {}",
                config.data_dir.display().to_string().dimmed()
            );
            println!("As of: {}", as_of.to_string().dimmed());
        }

        Ok(Self {
            config,
            data: Arc::new(data),
            as_of,
            json: cli.json,
            verbose: cli.verbose,
        })
    }

    fn pipeline(&self) -> RetailPipeline {
        RetailPipeline::from_reference_data(
            self.data.clone(),
            &self.config.pipeline,
            Arc::new(TemplateNarrator),
            self.as_of,
        )
    }

    fn request(&self, category: &str) -> PipelineRequest {
        PipelineRequest::for_category(category, &self.config.pipeline)
    }
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if let Err(e) = dispatch(&cli) {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        process::exit(1);
    }
}

fn dispatch(cli: &Cli) -> Result<()> {
    let session = Session::open(cli)?;
    match &cli.command {
        Commands::Run {
            category,
            horizon,
            stock,
            in_transit,
            lead_time,
            moq,
            volatility,
            price,
        } => {
            let overrides = RequestOverrides {
                horizon_days: *horizon,
                current_stock: *stock,
                in_transit_stock: *in_transit,
                lead_time_days: *lead_time,
                minimum_order_quantity: *moq,
                volatility: *volatility,
                current_price: *price,
            };
            let request = session.request(category).with_overrides(&overrides);
            run_single(&session, &request)
        }
        Commands::Batch {
            categories,
            concurrency,
        } => run_batch(&session, categories, *concurrency),
        Commands::Forecast { category, horizon } => run_forecast(
            &session,
            category,
            horizon.unwrap_or(session.config.pipeline.default_horizon_days),
        ),
        Commands::Info => show_info(&session),
    }
}

fn run_single(session: &Session, request: &PipelineRequest) -> Result<()> {
    let start = Instant::now();
    let state = session.pipeline().run(request);

    if session.json {
        println!("{}", serde_json::to_string_pretty(&state)?);
    } else {
        print_state(&state);
        if session.verbose {
            println!("Finished in {:.2?}", start.elapsed());
        }
    }

    if state.status().is_failed() {
        bail!("pipeline {} ended with {}", state.run_id(), state.status());
    }
    Ok(())
}

fn run_batch(session: &Session, categories: &[String], concurrency: usize) -> Result<()> {
    let requests: Vec<PipelineRequest> = categories.iter().map(|c| session.request(c)).collect();

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")?
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    pb.enable_steady_tick(Duration::from_millis(80));
    pb.set_message(format!("Running {} categories...", requests.len()));

    let states = session.pipeline().run_batch(&requests, concurrency)?;
    pb.finish_and_clear();

    let summary = BatchSummary::from_states(&states);
    if session.json {
        let rows: Vec<PipelineSummary> = states.iter().map(PipelineSummary::from_state).collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    println!("{}", "Batch results".cyan().bold());
    println!(
        "  {:<20} {:<22} {:>12} {:>10} {:>10} {:>12}",
        "CATEGORY", "STATUS", "FORECAST", "REORDER", "STRATEGY", "PRICE"
    );
    for state in &states {
        let row = PipelineSummary::from_state(state);
        println!(
            "  {:<20} {:<22} {:>12} {:>10} {:>10} {:>12}",
            row.category,
            colored_status(row.status),
            fmt_opt(row.final_demand, 1),
            fmt_opt(row.reorder_qty.map(f64::ceil), 0),
            row.strategy.map(|s| s.to_string()).unwrap_or_else(|| "-".into()),
            fmt_opt(row.recommended_price, 2),
        );
    }
    println!();
    println!(
        "{} {}/{} completed ({:.0}%), {} failed, {} cancelled",
        "Summary:".bold(),
        summary.completed,
        summary.total,
        summary.success_rate() * 100.0,
        summary.failed,
        summary.cancelled
    );
    if !summary.immediate_reorders.is_empty() {
        println!(
            "{} {}",
            "Reorder now:".yellow().bold(),
            summary.immediate_reorders.join(", ")
        );
    }
    Ok(())
}

fn run_forecast(session: &Session, category: &str, horizon: u32) -> Result<()> {
    let forecaster = MovingAverageForecaster::new(session.data.clone(), session.as_of)
        .with_config(session.config.pipeline.forecast.clone());
    let forecast = forecaster.forecast(category, horizon)?;

    if session.json {
        println!("{}", serde_json::to_string_pretty(&forecast)?);
    } else {
        print_forecast(&forecast);
    }
    Ok(())
}

fn show_info(session: &Session) -> Result<()> {
    println!("{}", "Reference data".cyan().bold());
    println!(
        "  {} {}",
        "Directory:".bold(),
        session.config.data_dir.display()
    );
    println!("  {} {}", "As of:".bold(), session.as_of);
    println!();

    println!("{}", "Categories".bold());
    for category in session.data.categories() {
        let profile = session.config.pipeline.profile(&category);
        println!(
            "  {:<20} {:>5} days  stock {:>7.0} (+{:.0})  price {:>10.2}",
            category,
            session.data.history_len(&category),
            profile.current_stock,
            profile.in_transit_stock,
            profile.current_price
        );
    }
    println!();

    println!("{}", "Events".bold());
    let calendar = session.data.calendar();
    if calendar.is_empty() {
        println!("  {}", "none".dimmed());
    }
    for event in calendar.events() {
        let marker = match event.days_from(session.as_of) {
            Some(days) if days <= session.config.pipeline.forecast.event_window_days => {
                format!("in {} days", days).green().to_string()
            }
            Some(days) => format!("in {} days", days),
            None => "past".dimmed().to_string(),
        };
        println!(
            "  {:<20} {}  x{:<5} {}",
            event.name, event.date, event.multiplier, marker
        );
    }
    Ok(())
}

fn print_state(state: &PipelineState) {
    println!(
        "{} {} [{}]",
        "Pipeline".cyan().bold(),
        state.category().bold(),
        colored_status(state.status())
    );
    println!("  {} {}", "Run:".bold(), state.run_id().to_string().dimmed());
    println!();

    if let Some(forecast) = state.forecast() {
        print_forecast(forecast);
    }

    if let Some(r) = state.replenishment() {
        println!("{}", "Replenishment".bold());
        println!("  Reorder quantity: {:.0}", r.reorder_qty.ceil());
        println!("  Timing:           {}", r.timing);
        println!("  Stockout risk:    {}", r.stockout_risk);
        match r.runway_days {
            Some(days) => println!("  Runway:           {:.1} days", days),
            None => println!("  Runway:           unlimited"),
        }
        if let Some(text) = &r.narrative {
            println!("  {}", text.dimmed());
        }
        println!();
    }

    if let Some(p) = state.pricing() {
        println!("{}", "Pricing".bold());
        println!("  Strategy:          {}", p.strategy);
        println!("  Current price:     {:.2}", p.current_price);
        println!(
            "  Recommended price: {:.2} ({:+}%)",
            p.recommended_price, p.change_pct
        );
        if let Some(text) = &p.narrative {
            println!("  {}", text.dimmed());
        }
        println!();
    }

    for error in state.errors() {
        println!("{} {}: {}", "Failed".red().bold(), error.stage, error.message);
    }
}

fn print_forecast(forecast: &ForecastResult) {
    println!("{}", "Forecast".bold());
    println!("  Base demand:         {:.2}", forecast.base);
    println!("  Seasonal multiplier: {}", forecast.seasonal_multiplier);
    println!("  Surge factor:        {}", forecast.surge_factor);
    println!("  Final demand:        {:.2}", forecast.final_demand);
    if let (Some(event), Some(days)) = (&forecast.nearest_event, forecast.days_to_event) {
        println!("  Event:               {} in {} days", event, days);
    }
    if let Some(text) = &forecast.narrative {
        println!("  {}", text.dimmed());
    }
    println!();
}

fn colored_status(status: PipelineStatus) -> String {
    match status {
        PipelineStatus::Completed => status.as_str().green().to_string(),
        PipelineStatus::Cancelled | PipelineStatus::Running => status.as_str().yellow().to_string(),
        _ => status.as_str().red().to_string(),
    }
}

fn fmt_opt(value: Option<f64>, decimals: usize) -> String {
    match value {
        Some(v) => format!("{:.*}", decimals, v),
        None => "-".to_string(),
    }
}
