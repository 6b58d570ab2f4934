//! CLI entry point: runs the bridge against the built-in mock host.

use agent_bridge_error::BridgeError;
use clap::Parser;

use crate::server::{self, BridgeConfig};
use crate::{mock, telemetry};

#[derive(Parser, Debug)]
#[command(
    name = "agent-bridge",
    about = "Session bridge server with a built-in mock host",
    version
)]
struct Cli {
    /// Port to listen on (loopback only).
    #[arg(long, default_value_t = 41243)]
    port: u16,

    /// Session identifier advertised to peers.
    #[arg(long, default_value = "mock-session")]
    session_id: String,

    /// Capacity of each peer's outbound frame queue.
    #[arg(long, default_value_t = crate::registry::DEFAULT_QUEUE_CAPACITY)]
    queue_capacity: usize,
}

pub fn run() -> Result<(), BridgeError> {
    let cli = Cli::parse();
    telemetry::init();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| BridgeError::internal(err.to_string()))?;

    runtime.block_on(async move {
        let (host, mock_task) = mock::spawn_mock_host(&cli.session_id, cli.port);
        let config = BridgeConfig {
            port: Some(cli.port),
            queue_capacity: cli.queue_capacity,
        };
        let Some(handle) = server::start(host, config).await? else {
            return Ok(());
        };

        tracing::info!(addr = %handle.addr(), "agent-bridge ready; press Ctrl-C to stop");
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to wait for shutdown signal");
        }

        handle.stop().await;
        mock_task.abort();
        Ok(())
    })
}
