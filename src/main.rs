mod analytics;
mod config;
mod discovery;
mod inspection;
mod models;
mod server;
mod storage;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::analytics::sampler::{ResourceSampler, SystemUsage};
use crate::config::defaults::DEFAULT_CONFIG_PATH;
use crate::config::settings::{LoggingConfig, Settings};
use crate::inspection::client_chain::ClientChainResolver;
use crate::inspection::executor::NoopExecutor;
use crate::inspection::responder::InspectionResponder;
use crate::inspection::validator::{DirectiveValidator, ValidatorTable};
use crate::models::resource::ResourceKind;
use crate::server::access_log::AccessLogger;
use crate::server::http_handler::HttpHandler;
use crate::server::server::InspectionServer;
use crate::storage::resource_registry::ResourceRegistry;

/// Parse the `--config` CLI flag. `None` means the default location.
fn parse_config_path() -> Option<String> {
    let args: Vec<String> = std::env::args().collect();
    let mut config_path = None;

    let mut i = 1;
    while i < args.len() {
        if args[i] == "--config" {
            if let Some(path) = args.get(i + 1) {
                config_path = Some(path.clone());
            }
            i += 2;
        } else {
            i += 1;
        }
    }

    config_path
}

/// Initialise the `tracing` subscriber with stdout and optional file output.
/// The returned guard must live as long as the process.
fn init_tracing(logging: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let (file_layer, guard) = if logging.file.is_empty() {
        (None, None)
    } else {
        let path = Path::new(&logging.file);
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let file_name = path
            .file_name()
            .context("Log file path has no file name")?;
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create log directory {}", dir.display()))?;

        let appender = tracing_appender::rolling::never(dir, file_name);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let layer = fmt::layer()
            .with_writer(writer)
            .with_ansi(false)
            .with_target(true);
        (Some(layer), Some(guard))
    };

    let stdout_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_target(true);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("{level},reqhandle={level}", level = logging.level))
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    Ok(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
    // ---------------------------------------------------------------
    // 1. Configuration
    // ---------------------------------------------------------------
    let explicit_path = parse_config_path();
    let settings = match explicit_path {
        Some(ref path) => Settings::load(path)?,
        None => Settings::load_or_default(DEFAULT_CONFIG_PATH)?,
    };

    // ---------------------------------------------------------------
    // 2. Logging
    // ---------------------------------------------------------------
    let _log_guard = init_tracing(&settings.logging)?;

    info!("Starting reqhandle");
    info!(
        "Config loaded from {}",
        explicit_path.as_deref().unwrap_or(DEFAULT_CONFIG_PATH)
    );

    // ---------------------------------------------------------------
    // 3. Host identity & shared state
    // ---------------------------------------------------------------
    let host = Arc::new(discovery::discover_host(&settings.host)?);

    let registry = Arc::new(ResourceRegistry::new());
    registry.set_target(ResourceKind::Cpu, settings.resource.cpu_target);
    registry.set_target(ResourceKind::Memory, settings.resource.memory_target);

    let validator = DirectiveValidator::new(ValidatorTable::new()?);
    let resolver = ClientChainResolver::new(settings.server.validate_forwarded_for);
    if settings.server.validate_forwarded_for {
        info!("X-Forwarded-For entries will be validated as IP literals");
    }

    let responder = Arc::new(InspectionResponder::new(
        Arc::clone(&host),
        Arc::clone(&registry),
        resolver,
        validator,
        Arc::new(NoopExecutor),
    ));

    // ---------------------------------------------------------------
    // 4. HTTP server
    // ---------------------------------------------------------------
    let access_log = if settings.logging.access_log.is_empty() {
        None
    } else {
        match AccessLogger::new(&settings.logging.access_log) {
            Ok(logger) => {
                info!("Access log enabled: {}", settings.logging.access_log);
                Some(Arc::new(logger))
            }
            Err(e) => {
                error!("Failed to open access log {}: {}", settings.logging.access_log, e);
                None
            }
        }
    };

    let handler = Arc::new(HttpHandler::new(responder, access_log));
    let server = InspectionServer::new(settings.server.clone(), handler);
    let listener = server.bind()?;

    // ---------------------------------------------------------------
    // 5. Spawn everything
    // ---------------------------------------------------------------
    let server_handle = tokio::spawn(async move {
        if let Err(e) = server.serve(listener).await {
            error!("HTTP server error: {}", e);
        }
    });

    let sampler_handle = if settings.sampler.enabled {
        let interval = Duration::from_secs(settings.sampler.interval_secs.max(1));
        let sampler = ResourceSampler::new(Arc::clone(&registry), SystemUsage::new(), interval);
        Some(tokio::spawn(sampler.run()))
    } else {
        warn!("Resource sampler disabled; current readings stay at 0");
        None
    };

    info!("reqhandle is running. Press Ctrl+C to shut down.");

    // ---------------------------------------------------------------
    // 6. Wait for shutdown signal
    // ---------------------------------------------------------------
    tokio::signal::ctrl_c().await?;
    info!("Shutting down reqhandle...");

    server_handle.abort();
    if let Some(handle) = sampler_handle {
        handle.abort();
    }

    info!("reqhandle shut down");
    Ok(())
}
