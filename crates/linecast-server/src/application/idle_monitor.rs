//! Per-session inactivity watchdog.
//!
//! [`IdleMonitor::spawn`] starts the watchdog task and returns both ends of it
//! at once, so the activity conduit always exists before the connection
//! handler can read its first line.
//!
//! ```text
//!   read loop ── touch() ──► [cap 1] ──► monitor task ── deadline passed ──► IdleExpiry
//! ```
//!
//! `touch` never waits: if a reset is already pending the extra signal is
//! redundant and discarded.  Dropping the [`ActivityHandle`] stops the monitor
//! without firing.

use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time::{sleep, Instant};

/// Namespace for starting idle monitors.
pub struct IdleMonitor;

impl IdleMonitor {
    /// Starts a monitor that fires once `window` passes with no activity.
    pub fn spawn(window: Duration) -> (ActivityHandle, IdleExpiry) {
        let (activity_tx, mut activity_rx) = mpsc::channel::<()>(1);
        let (expired_tx, expired_rx) = oneshot::channel();

        tokio::spawn(async move {
            let deadline = sleep(window);
            tokio::pin!(deadline);

            loop {
                tokio::select! {
                    () = &mut deadline => {
                        let _ = expired_tx.send(());
                        break;
                    }
                    signal = activity_rx.recv() => match signal {
                        Some(()) => deadline.as_mut().reset(Instant::now() + window),
                        None => break,
                    },
                }
            }
        });

        (
            ActivityHandle { tx: activity_tx },
            IdleExpiry {
                rx: Some(expired_rx),
                fired: false,
            },
        )
    }
}

/// Signals activity to the monitor.
#[derive(Debug)]
pub struct ActivityHandle {
    tx: mpsc::Sender<()>,
}

impl ActivityHandle {
    /// Pushes the deadline out to now + window.  Never blocks.
    pub fn touch(&self) {
        let _ = self.tx.try_send(());
    }
}

/// Resolves when the monitor's deadline has passed.
#[derive(Debug)]
pub struct IdleExpiry {
    rx: Option<oneshot::Receiver<()>>,
    fired: bool,
}

impl IdleExpiry {
    /// Waits for the idle deadline.
    ///
    /// Cancel safe, so it can sit in a `select!` loop.  If the monitor stopped
    /// without firing, this never resolves.
    pub async fn expired(&mut self) {
        if let Some(rx) = self.rx.as_mut() {
            let fired = rx.await.is_ok();
            self.rx = None;
            self.fired = fired;
        }
        if !self.fired {
            std::future::pending::<()>().await;
        }
    }
}
