mod cli;
mod logging;

use anyhow::Result;
use clap::Parser;

use logship_core::config::LogshipConfig;
use logship_daemon::agent::Agent;
use logship_daemon::metrics_server;

use crate::cli::DaemonCli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = DaemonCli::parse();

    let mut config = LogshipConfig::load(&cli.config)
        .await
        .map_err(|e| anyhow::anyhow!("failed to load config {}: {}", cli.config.display(), e))?;

    // CLI 인자가 최우선
    if let Some(level) = cli.log_level {
        config.general.log_level = level;
    }
    if let Some(format) = cli.log_format {
        config.general.log_format = format;
    }
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("config validation failed: {}", e))?;

    if cli.validate {
        println!("configuration is valid: {}", cli.config.display());
        return Ok(());
    }

    logging::init_tracing(&config.general)?;
    tracing::info!(config = %cli.config.display(), "logship-daemon starting");

    if let Some(addr) = cli.metrics_addr {
        metrics_server::install_metrics_recorder(addr)?;
    }

    let mut agent = Agent::build_from_config(config).await?;

    let input = tokio::io::BufReader::new(tokio::io::stdin());
    let stats = agent.run(input, shutdown_signal()).await?;

    tracing::info!(
        accepted = stats.accepted,
        invalid = stats.invalid,
        rejected = stats.rejected,
        failed = stats.failed,
        "logship-daemon shut down"
    );
    Ok(())
}

/// SIGINT(Ctrl+C)를 기다립니다. 핸들러 설치에 실패하면 영원히 대기합니다.
async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("shutdown signal received"),
        Err(e) => {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    }
}
