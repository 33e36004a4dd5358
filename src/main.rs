use std::sync::Arc;

use anyhow::Result;
use fuelwatch::{Server, ServerConfig, WriterSink};
use tokio_util::sync::CancellationToken;

fn init_tracing() -> Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,fuelwatch=info".into());
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow::anyhow!(err.to_string()))?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing()?;
    let config = ServerConfig::from_env()?;

    let server = Server::bind(&config).await?;
    tracing::info!(addr = %server.local_addr()?, "fuelwatch listening");

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("shutdown signal received");
        }
        shutdown.cancel();
    });

    let stats = server.run(Arc::new(WriterSink::stdout()), cancel).await;
    tracing::info!(dispatched = stats.dispatched, failed = stats.failed, "fuelwatch stopped");
    Ok(())
}
