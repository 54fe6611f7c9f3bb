//! Content Guardian - text moderation service.
//!
//! Runs the moderation pipeline behind the HTTP API.

use clap::Parser;
use guardian_app::cli::Args;
use guardian_app::wiring;
use guardian_server::{AppState, Server};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize logging, with daily file rotation when a log directory is set.
fn init_logging(args: &Args) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let log_level = &args.log_level;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "guardian={0},tower_http={0},warn",
            log_level
        ))
    });

    if let Some(ref log_dir) = args.log_dir {
        if std::fs::create_dir_all(log_dir).is_ok() {
            let file_appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .max_log_files(7)
                .filename_prefix("guardian")
                .filename_suffix("log")
                .build(log_dir)
                .ok();

            if let Some(appender) = file_appender {
                let (non_blocking, guard) = tracing_appender::non_blocking(appender);

                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt::layer().with_writer(std::io::stdout))
                    .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
                    .init();

                tracing::info!("Logging to {:?}", log_dir);
                return Some(guard);
            }
        }

        tracing_subscriber::fmt().with_env_filter(env_filter).init();
        tracing::warn!("File logging unavailable, using console only");
        return None;
    }

    tracing_subscriber::fmt().with_env_filter(env_filter).init();
    None
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Keep the guard alive so buffered log lines are flushed on exit
    let _log_guard = init_logging(&args);

    tracing::info!("Starting Content Guardian v{}", env!("CARGO_PKG_VERSION"));

    let components = wiring::build(&args)?;

    let _purge = components
        .sqlite_cache
        .map(|store| wiring::spawn_cache_purge(store, args.cache_ttl()));

    let server = Server::with_state(
        wiring::server_config(&args),
        AppState::new(components.pipeline),
    )
    .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    server
        .run()
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    Ok(())
}
