use scan_engine::ScanEngineConfig;
use tracing::info;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: jemallocator::Jemalloc = jemallocator::Jemalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = load_config()?;
    info!(sources = config.sources.len(), "starting scan-engine-service");

    let engine = scan_engine::ScanEngine::new(config);
    engine.schedule_sync();

    info!("scan-engine-service ready");

    // The engine is consumed in-process by embedders (e.g. the mail pipeline
    // checking links in inbound messages); this binary's job is to keep the
    // sync scheduler alive. Block forever on a shutdown signal.
    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received");
    Ok(())
}

fn load_config() -> anyhow::Result<ScanEngineConfig> {
    let mut builder = config::Config::builder();
    if std::path::Path::new("scan-engine.toml").exists() {
        builder = builder.add_source(config::File::with_name("scan-engine"));
    }
    builder = builder.add_source(config::Environment::with_prefix("SCAN_ENGINE").separator("__"));

    match builder.build() {
        Ok(settings) => Ok(settings.try_deserialize().unwrap_or_default()),
        Err(_) => Ok(ScanEngineConfig::default()),
    }
}
