use anyhow::{Context, Result};
use oxrule_server::app;
use oxrule_server::config::EngineConfig;
use oxrule_server::logging;
use oxrule_storage::store;
use tokio::sync::watch;

#[allow(clippy::print_stderr)]
fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  oxrule-server [config.toml]             Start the rule engine");
    eprintln!("  oxrule-server migrate [config.toml]     Apply database migrations and exit");
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();

    match args.get(1).map(String::as_str) {
        Some("-h") | Some("--help") => {
            print_usage();
            Ok(())
        }
        Some("migrate") => run_migrate(args.get(2).map(String::as_str)).await,
        path => run(path).await,
    }
}

async fn run_migrate(config_path: Option<&str>) -> Result<()> {
    let config = EngineConfig::load(config_path)?;
    logging::init(&config.log)?;

    store::connect(&config.database.rules_url, true)
        .await
        .context("failed to migrate rule database")?;
    if config.database.audit_url != config.database.rules_url {
        store::connect(&config.database.audit_url, true)
            .await
            .context("failed to migrate audit database")?;
    }
    tracing::info!("Migrations applied");
    Ok(())
}

async fn run(config_path: Option<&str>) -> Result<()> {
    let config = EngineConfig::load(config_path)?;
    logging::init(&config.log)?;
    oxrule_common::id::init(config.database.machine_id, config.database.node_id);

    let evaluator = app::build_evaluator(&config).await?;
    let source = app::open_source(&config).await?;
    let readers = source.readers().await.context("failed to open partition readers")?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handles = app::spawn_workers(readers, evaluator, config.retry_backoff(), shutdown_rx);

    tracing::info!(
        engine = %config.engine,
        topic = %config.source_topic(),
        workers = handles.len(),
        "Rule engine started"
    );

    shutdown_signal().await;
    tracing::info!("Shutting down gracefully");
    let _ = shutdown_tx.send(true);

    let stats = app::join_workers(handles).await;
    tracing::info!(
        committed = stats.committed,
        skipped = stats.skipped,
        failed = stats.failed,
        "Rule engine stopped"
    );
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
