//! Loads `scan-engine.toml` (or a path given with `--config`) layered with
//! `SCAN_ENGINE__SECTION__KEY` environment overrides, per the engine's
//! config file contract.

use scan_engine::ScanEngineConfig;

pub fn load(path: Option<&str>) -> anyhow::Result<ScanEngineConfig> {
    let mut builder = config::Config::builder();
    if let Some(path) = path {
        builder = builder.add_source(config::File::with_name(path));
    } else if std::path::Path::new("scan-engine.toml").exists() {
        builder = builder.add_source(config::File::with_name("scan-engine"));
    }
    builder = builder.add_source(
        config::Environment::with_prefix("SCAN_ENGINE").separator("__"),
    );

    let settings = builder.build()?;
    match settings.try_deserialize() {
        Ok(cfg) => Ok(cfg),
        Err(_) if path.is_none() => Ok(ScanEngineConfig::default()),
        Err(err) => Err(err.into()),
    }
}
