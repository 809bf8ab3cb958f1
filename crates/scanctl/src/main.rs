use clap::{Parser, Subcommand};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use prettytable::{row, Table};
use scan_engine::intel::sync::{SyncStatus, SyncTrigger};
use scan_engine::{ScanEngine, ScanEngineConfig};

mod config_loader;

#[derive(Parser)]
#[command(name = "scanctl", about = "Operator CLI for the URL threat scanning engine")]
struct Cli {
    /// Path to a scan-engine config file (defaults to ./scan-engine.toml if present)
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan a single URL and print the verdict
    Scan {
        url: String,
        #[arg(long)]
        json: bool,
    },
    /// Threat-intelligence sync operations
    #[command(subcommand)]
    Sync(SyncCommands),
    /// Threat-intelligence indicator lookups
    #[command(subcommand)]
    Intel(IntelCommands),
    /// Scan result cache operations
    #[command(subcommand)]
    Cache(CacheCommands),
}

#[derive(Subcommand)]
enum SyncCommands {
    /// Run a one-off sync for a configured source
    Run { source_id: String },
}

#[derive(Subcommand)]
enum IntelCommands {
    /// Look up a raw value (URL, domain, or IP) against stored indicators
    Lookup { value: String },
    /// Deactivate one indicator and invalidate any cache entries it affects
    Evict { source_id: String, value: String },
}

#[derive(Subcommand)]
enum CacheCommands {
    /// Evict a cached verdict by its URL
    Evict { url: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Cli::parse();
    let config: ScanEngineConfig = config_loader::load(args.config.as_deref())?;
    let engine = ScanEngine::new(config);

    match args.command {
        Commands::Scan { url, json } => scan(&engine, &url, json).await?,
        Commands::Sync(SyncCommands::Run { source_id }) => sync_run(&engine, &source_id).await?,
        Commands::Intel(IntelCommands::Lookup { value }) => intel_lookup(&engine, &value).await,
        Commands::Intel(IntelCommands::Evict { source_id, value }) => intel_evict(&engine, &source_id, &value),
        Commands::Cache(CacheCommands::Evict { url }) => cache_evict(&engine, &url).await,
    }

    Ok(())
}

async fn scan(engine: &ScanEngine, url: &str, json: bool) -> anyhow::Result<()> {
    let verdict = engine.scan(url).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&verdict)?);
        return Ok(());
    }

    println!(
        "{} {} ({}/{}) risk {:?}",
        style("verdict:").bold(),
        verdict.canonical.as_url_string(),
        verdict.total_score,
        verdict.max_score,
        verdict.risk_level
    );

    let mut table = Table::new();
    table.add_row(row!["category", "score", "max", "skipped", "findings"]);
    for category in &verdict.categories {
        table.add_row(row![
            category.category_name,
            category.score,
            category.max_weight,
            category.skipped,
            category.findings.len()
        ]);
    }
    table.printstd();

    Ok(())
}

async fn sync_run(engine: &ScanEngine, source_id: &str) -> anyhow::Result<()> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template("{spinner} {msg}").unwrap());
    spinner.set_message(format!("syncing {source_id}"));
    spinner.enable_steady_tick(std::time::Duration::from_millis(100));

    let run = engine.trigger_sync(source_id, SyncTrigger::Manual).await?;

    match run.status {
        SyncStatus::Success => {
            spinner.finish_with_message(format!(
                "{} {source_id}: +{} ~{} -{} in {}ms",
                style("synced").green().bold(),
                run.indicators_added,
                run.indicators_updated,
                run.indicators_removed,
                run.duration_ms.unwrap_or(0)
            ));
        }
        SyncStatus::Failed => {
            spinner.finish_with_message(format!(
                "{} {source_id}: {}",
                style("sync failed").red().bold(),
                run.error_message.unwrap_or_default()
            ));
        }
        SyncStatus::InProgress => {
            spinner.finish_with_message(format!("{} {source_id}", style("still running").yellow()));
        }
    }
    Ok(())
}

async fn intel_lookup(engine: &ScanEngine, value: &str) {
    let hash = scan_engine::intel::value_hash(value);
    let mut found = false;
    for indicator_type in [
        scan_engine::intel::IndicatorType::Url,
        scan_engine::intel::IndicatorType::Domain,
        scan_engine::intel::IndicatorType::Ip,
    ] {
        for indicator in engine.store.lookup(indicator_type, &hash) {
            found = true;
            println!(
                "{:?} {} [{}] confidence={} source={}",
                indicator.indicator_type,
                indicator.value,
                indicator.threat_type,
                indicator.confidence,
                indicator.source_id
            );
        }
    }
    if !found {
        println!("{}", style("no matching indicators").dim());
    }
}

fn intel_evict(engine: &ScanEngine, source_id: &str, value: &str) {
    let hash = scan_engine::intel::value_hash(value);
    if engine.evict_indicator(source_id, &hash) {
        println!("{} {value} from {source_id}", style("evicted").bold());
    } else {
        println!("{}", style("no active indicator matched").dim());
    }
}

async fn cache_evict(engine: &ScanEngine, url: &str) {
    if let Ok(canonical) = scan_engine::canonical::canonicalize(url) {
        engine.orchestrator.cache().invalidate(&canonical.fingerprint_hash);
        println!("{} {}", style("evicted").bold(), canonical.fingerprint_hash);
    } else {
        eprintln!("{} could not canonicalize {url}", style("error:").red());
    }
}
