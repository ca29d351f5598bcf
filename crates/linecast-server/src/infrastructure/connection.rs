//! Per-connection lifecycle.
//!
//! ```text
//! CONNECTING ──► ACTIVE ──► CLOSING ──► CLOSED
//!     │             │           │           │
//!  Session::open  read loop   depart +    writer drained,
//!                 + touch     "left"      stream dropped
//! ```
//!
//! Three tasks serve one connection: the handler itself (read loop), the
//! outbound writer draining the mailbox, and the idle monitor.  The handler
//! owns the writer's join handle and the monitor's activity handle, and ends
//! both before it returns:
//!
//! - the writer stops when the registry closes the mailbox on Depart, or is
//!   aborted on idle expiry or when the drain timeout runs out;
//! - the monitor stops when the activity handle is dropped.
//!
//! An aborted writer drops the mailbox receiver, so a broadcaster blocked on
//! this session's full mailbox is released before Depart is submitted.
//!
//! CLOSING is entered on EOF, a read error, an over-long line, idle expiry, or
//! the writer ending early (write failure, or eviction by the broadcaster).

use std::net::SocketAddr;
use std::sync::Arc;

use linecast_core::{Message, RelayConfig, SessionId};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::application::{IdleMonitor, Mailbox, RegistryError, RegistryHandle, Session};
use crate::infrastructure::line_reader::LineReader;

/// Reasons a connection ended abnormally.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("connection I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("line exceeds {limit} bytes")]
    LineTooLong { limit: usize },
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Runs the complete lifecycle of one client connection.
///
/// Works on any byte stream, so tests can drive it over an in-memory duplex
/// pipe.  Returns after the session has departed and its writer has finished.
///
/// # Errors
///
/// Returns the read or write failure that ended the session, or
/// [`ConnectionError::Registry`] if the broadcaster is gone.  EOF and idle
/// expiry are normal endings and return `Ok(())`.
pub async fn handle_connection<S>(
    stream: S,
    peer_addr: SocketAddr,
    registry: RegistryHandle,
    config: Arc<RelayConfig>,
) -> Result<(), ConnectionError>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let (read_half, write_half) = tokio::io::split(stream);

    // ── CONNECTING ────────────────────────────────────────────────────────────
    let (session, mailbox) = Session::open(peer_addr.to_string(), config.mailbox_capacity);
    let id = session.id();
    info!("session {id} connected from {peer_addr}");

    // ── ACTIVE ────────────────────────────────────────────────────────────────
    let mut writer = tokio::spawn(write_mailbox(write_half, mailbox, id));

    if session
        .deliver(Message::welcome(id, session.peer_addr()))
        .await
        .is_err()
    {
        debug!("session {id}: writer gone before welcome");
    }
    registry.publish(Message::joined(id)).await?;
    registry.admit(session).await?;

    let (activity, mut idle) = IdleMonitor::spawn(config.idle_timeout);
    let mut lines = LineReader::new(read_half, config.max_line_bytes);
    let mut writer_finished = false;
    let mut idle_expired = false;

    let outcome = loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(text)) => {
                    activity.touch();
                    if text.is_empty() {
                        continue;
                    }
                    if let Err(e) = registry.publish(Message::chat(id, &text)).await {
                        break Err(e.into());
                    }
                }
                Ok(None) => {
                    debug!("session {id}: peer closed the connection");
                    break Ok(());
                }
                Err(e) => {
                    warn!("session {id}: read failed: {e}");
                    break Err(e);
                }
            },
            () = idle.expired() => {
                info!("session {id}: idle for {:?}, closing", config.idle_timeout);
                idle_expired = true;
                break Ok(());
            }
            joined = &mut writer => {
                writer_finished = true;
                break match joined {
                    Ok(Ok(())) => {
                        debug!("session {id}: mailbox closed by broadcaster");
                        Ok(())
                    }
                    Ok(Err(e)) => {
                        warn!("session {id}: write failed: {e}");
                        Err(ConnectionError::Io(e))
                    }
                    Err(e) => {
                        error!("session {id}: writer task failed: {e}");
                        Ok(())
                    }
                };
            }
        }
    };

    // ── CLOSING ───────────────────────────────────────────────────────────────
    drop(activity);
    if idle_expired && !writer_finished {
        // Idle expiry closes the connection without flushing.
        writer.abort();
    }

    // The broadcaster may be stalled on this session's full mailbox.
    match timeout(config.drain_timeout, registry.depart(id)).await {
        Ok(submitted) => submitted?,
        Err(_) => {
            warn!(
                "session {id}: depart not accepted within {:?}; aborting writer",
                config.drain_timeout
            );
            writer.abort();
            registry.depart(id).await?;
        }
    }
    registry.publish(Message::left(id)).await?;

    // ── CLOSED ────────────────────────────────────────────────────────────────
    if !writer_finished {
        match timeout(config.drain_timeout, &mut writer).await {
            Ok(Ok(Ok(()))) => {}
            Ok(Ok(Err(e))) => debug!("session {id}: write failed while draining: {e}"),
            Ok(Err(e)) if e.is_cancelled() => debug!("session {id}: writer aborted"),
            Ok(Err(e)) => error!("session {id}: writer task failed: {e}"),
            Err(_) => {
                warn!(
                    "session {id}: mailbox not drained within {:?}; aborting writer",
                    config.drain_timeout
                );
                writer.abort();
            }
        }
    }

    info!("session {id} closed");
    outcome
}

/// Drains `mailbox` onto `writer`, one line per message.
///
/// Shuts the write side down once the mailbox is closed and empty.
async fn write_mailbox<W>(
    mut writer: W,
    mut mailbox: Mailbox,
    id: SessionId,
) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(message) = mailbox.recv().await {
        writer.write_all(message.content().as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
    }

    debug!("session {id}: mailbox closed; shutting down write side");
    writer.shutdown().await
}

// ── Tests ─────────────────────────────────────────────────────────────────────
