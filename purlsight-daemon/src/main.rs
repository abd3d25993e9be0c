use anyhow::Result;
use clap::Parser;

use purlsight_core::PurlsightConfig;
use purlsight_daemon::cli::DaemonCli;
use purlsight_daemon::logging;
use purlsight_daemon::orchestrator::Orchestrator;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = DaemonCli::parse();

    // file -> env -> CLI -> validate
    let mut config = PurlsightConfig::from_file(&cli.config)
        .await
        .map_err(|e| anyhow::anyhow!("failed to load config {}: {e}", cli.config.display()))?;
    config.apply_env_overrides();
    cli.apply_overrides(&mut config);
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("config validation failed: {e}"))?;

    if cli.validate {
        println!("configuration OK: {}", cli.config.display());
        return Ok(());
    }

    logging::init_tracing(&config.general)?;
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %cli.config.display(),
        "purlsight-daemon starting"
    );

    let orchestrator = Orchestrator::build_from_config(config).await?;
    orchestrator.run().await?;

    tracing::info!("purlsight-daemon shut down");
    Ok(())
}
