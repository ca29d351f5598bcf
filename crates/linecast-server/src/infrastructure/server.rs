//! TCP server: accept loop and per-connection task spawning.
//!
//! 1. Bind a TCP listener on the configured address.
//! 2. Start the single broadcaster task.
//! 3. Accept connections, spawning one [`handle_connection`] task per client so
//!    a slow client never delays the accept loop.
//! 4. Stop accepting once the `running` flag is cleared.
//!
//! Accept errors (for example, running out of file descriptors) are logged and
//! never end the loop.

use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::Context;
use linecast_core::RelayConfig;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tracing::{error, info, warn};

use crate::application::{Broadcaster, RegistryHandle};
use crate::infrastructure::connection::handle_connection;

/// How often the accept loop wakes up to check the shutdown flag.
const SHUTDOWN_POLL: Duration = Duration::from_millis(200);

/// Binds `config.bind_addr` and serves until `running` is set to `false`.
///
/// # Errors
///
/// Returns an error if the listener cannot be bound (port in use, missing
/// permission).  Nothing else is fatal once the listener exists.
pub async fn run_server(config: RelayConfig, running: Arc<AtomicBool>) -> anyhow::Result<()> {
    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind listener on {}", config.bind_addr))?;

    serve(listener, config, running).await
}

/// Serves connections from an already-bound `listener`.
///
/// Lets callers (and tests) bind port 0 and learn the real address first.
///
/// # Errors
///
/// Returns an error only if the listener's local address cannot be read.
pub async fn serve(
    listener: TcpListener,
    config: RelayConfig,
    running: Arc<AtomicBool>,
) -> anyhow::Result<()> {
    let local_addr = listener
        .local_addr()
        .context("failed to read listener address")?;
    info!(
        "linecast listening on {local_addr} (idle timeout {:?}, mailbox {})",
        config.idle_timeout, config.mailbox_capacity
    );

    let config = Arc::new(config);
    let (broadcaster, registry) =
        Broadcaster::channel(config.event_queue_capacity, config.backpressure);
    tokio::spawn(broadcaster.run());

    loop {
        if !running.load(Ordering::Relaxed) {
            info!("shutdown flag set; stopping accept loop");
            break;
        }

        match timeout(SHUTDOWN_POLL, listener.accept()).await {
            Ok(Ok((stream, peer_addr))) => {
                let registry = registry.clone();
                let cfg = Arc::clone(&config);
                tokio::spawn(async move {
                    handle_client(stream, peer_addr, registry, cfg).await;
                });
            }
            Ok(Err(e)) => {
                error!("accept error: {e}");
            }
            Err(_) => {
                // No connection within the poll window; re-check the flag.
            }
        }
    }

    Ok(())
}

/// Runs one connection and logs how it ended.
async fn handle_client(
    stream: TcpStream,
    peer_addr: SocketAddr,
    registry: RegistryHandle,
    config: Arc<RelayConfig>,
) {
    if let Err(e) = stream.set_nodelay(true) {
        warn!("could not set TCP_NODELAY for {peer_addr}: {e}");
    }

    match handle_connection(stream, peer_addr, registry, config).await {
        Ok(()) => info!("connection {peer_addr} closed normally"),
        Err(e) => warn!("connection {peer_addr} closed with error: {e}"),
    }
}
