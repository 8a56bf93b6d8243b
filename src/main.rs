mod config;
mod digest;
mod error;
mod model;
mod pipeline;
mod runner;
mod sources;
mod telegram;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;

use crate::config::{DedupLifetime, RunMode, Settings};
use pipeline::dedup::DedupStore;
use runner::Runner;
use sources::HttpSourceAdapter;
use telegram::{ConsoleGateway, DeliveryGateway, TelegramGateway};

#[derive(Parser)]
#[command(name = "deal_digest", about = "Amazon India / Flipkart deal digest for Telegram")]
struct Cli {
    /// Optional TOML config file
    #[arg(short, long, global = true, default_value = "deals.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch, rank and deliver once
    Run {
        /// Print messages instead of posting to Telegram
        #[arg(long)]
        dry_run: bool,
        /// Override the configured run mode
        #[arg(long, value_enum)]
        mode: Option<ModeArg>,
        /// Print the run report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Run every `interval_secs` until Ctrl-C
    Watch {
        /// Print messages instead of posting to Telegram
        #[arg(long)]
        dry_run: bool,
    },
    /// Classify and extract a single posting
    Check {
        #[arg(short, long)]
        title: String,
        #[arg(short, long, default_value = "")]
        body: String,
        /// Apply the loose keyword check instead of the strict one
        #[arg(long)]
        loose: bool,
    },
    /// List configured sources
    Sources,
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    Batch,
    Stream,
}

impl From<ModeArg> for RunMode {
    fn from(m: ModeArg) -> Self {
        match m {
            ModeArg::Batch => RunMode::Batch,
            ModeArg::Stream => RunMode::Stream,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let mut settings = Settings::load(&cli.config)?;

    match cli.command {
        Commands::Run { dry_run, mode, json } => {
            if let Some(mode) = mode {
                settings.mode = mode.into();
            }
            let runner = build_runner(settings, dry_run)?;
            let store = DedupStore::new(DedupLifetime::PerRun);
            let report = runner.run_once(&store).await;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
                return Ok(());
            }
            println!(
                "Fetched {} items from {} sources: {} deals, {} unique, {} selected, {} sent, {} failed.",
                report.raw_items,
                report.sources,
                report.candidates,
                report.unique,
                report.selected,
                report.sent,
                report.failed
            );
        }
        Commands::Watch { dry_run } => {
            let runner = build_runner(settings, dry_run)?;
            watch(&runner).await;
        }
        Commands::Check { title, body, loose } => {
            check(&settings, &title, &body, loose);
        }
        Commands::Sources => {
            for (i, s) in settings.sources.iter().enumerate() {
                println!(
                    "{:>2}. {:<24} {:<9} {:<7} {}",
                    i + 1,
                    s.name,
                    format!("{:?}", s.parser),
                    format!("{:?}", s.strictness),
                    s.endpoint
                );
            }
            println!("\n{} sources", settings.sources.len());
        }
    }

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        info!("Done in {:.1}s", elapsed.as_secs_f64());
    }
    Ok(())
}

fn build_runner(settings: Settings, dry_run: bool) -> anyhow::Result<Runner> {
    let adapter = Arc::new(HttpSourceAdapter::new(settings.fetch_timeout())?);
    let gateway: Arc<dyn DeliveryGateway> = if dry_run {
        Arc::new(ConsoleGateway)
    } else {
        Arc::new(TelegramGateway::from_env()?)
    };

    info!(
        sources = settings.sources.len(),
        mode = ?settings.mode,
        top_k = settings.top_k,
        dry_run,
        "deal digest ready"
    );
    Ok(Runner::new(settings, adapter, gateway))
}

/// Scheduler loop. The dedup store lives as long as the configured lifetime says.
async fn watch(runner: &Runner) {
    let settings = runner.settings();
    let store = DedupStore::new(settings.dedup_lifetime);
    let mut ticker = tokio::time::interval(settings.interval());
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = tokio::signal::ctrl_c() => break,
        }
        tokio::select! {
            report = runner.run_once(&store) => {
                info!(
                    run_id = %report.run_id,
                    sent = report.sent,
                    remembered = store.len(),
                    lifetime = ?store.lifetime(),
                    "next scan in {}",
                    digest::human_interval(settings.interval())
                );
            }
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted, abandoning in-flight run");
                break;
            }
        }
    }
    info!("watch stopped");
}

fn check(settings: &Settings, title: &str, body: &str, loose: bool) {
    use pipeline::classify::{is_deal, is_editorial, Strictness};
    use pipeline::extract::{detect_platform, extract_discount, extract_prices};

    let strictness = if loose { Strictness::Loose } else { Strictness::Strict };
    let text = model::analysis_text(title, body);
    println!("Editorial: {}", is_editorial(title));
    println!("Deal:      {}", is_deal(title, body, strictness));
    println!("Discount:  {}%", extract_discount(&text, settings.discount_bounds));
    println!("Prices:    {:?}", extract_prices(&text, settings.price_window));
    println!("Platform:  {}", detect_platform(&text));

    let item = model::RawItem {
        title: title.to_string(),
        link: String::new(),
        body: body.to_string(),
        source_name: "cli".to_string(),
    };
    let opts = pipeline::ExtractOptions::from(settings);
    if let Some(c) = pipeline::process_item(&item, strictness, &opts) {
        println!("Resolved:  {}% off", c.discount_percent);
    }
}
