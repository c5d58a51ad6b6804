use anyhow::bail;
use plcstream::config::AppConfig;
use plcstream::device::build_modbus_pool;
use plcstream::pipeline::Pipeline;
use plcstream::storage::{InfluxWriter, PointWriter};
use std::sync::Arc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "plcstream.toml".to_string());
    let config = AppConfig::load_or_default(&config_path);

    let file_appender = tracing_appender::rolling::daily(
        &config.logging.directory,
        format!("{}.log", config.logging.file_prefix),
    );
    let (file_writer, _appender_guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,plcstream=debug")),
        )
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(file_writer)
                .with_ansi(false),
        )
        .init();

    tracing::info!("Starting plcstream (config: {})", config_path);
    config.validate()?;

    let sessions = config.pipeline.sessions;
    let (pool, failures) = build_modbus_pool(&config.device, sessions);
    for failure in &failures {
        tracing::error!("Session slot {} failed to connect: {}", failure.slot, failure.error);
    }
    if pool.is_empty() {
        bail!("all {} session slots failed to connect to {}", sessions, config.device.address);
    }
    if !failures.is_empty() {
        if config.pipeline.require_full_pool {
            bail!(
                "{} of {} session slots failed to connect and require_full_pool is set",
                failures.len(),
                sessions
            );
        }
        tracing::warn!(
            "Running degraded with {} of {} sessions",
            pool.connected_slots(),
            sessions
        );
    }

    let writer = Arc::new(InfluxWriter::connect(&config.storage)?);
    match writer.health_check() {
        Ok(status) => tracing::info!("Storage backend healthy: {}", status),
        Err(e) => tracing::warn!("Storage health check failed, continuing anyway: {}", e),
    }

    let pipeline = Pipeline::new(config, pool, writer);
    let report = pipeline.run()?;

    tracing::info!(
        "Run complete: {} samples ingested, {} read errors, {} write failures in {:.2} s",
        report.completed,
        report.read_errors,
        report.write_failures,
        report.elapsed.as_secs_f64()
    );
    Ok(())
}
