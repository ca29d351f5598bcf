//! The broadcaster: single serialized owner of the membership set.
//!
//! Every mutation of the [`Registry`] and every fan-out happens inside
//! [`Broadcaster::run`], one event at a time, in the order events were
//! submitted through a [`RegistryHandle`].  No lock protects the set because
//! nothing else can reach it.
//!
//! ```text
//!  connection tasks ──RegistryHandle──► [event queue] ──► Broadcaster::run
//!                                                              │
//!                                  mailbox A ◄─────────────────┤
//!                                  mailbox B ◄─────────────────┘
//! ```
//!
//! # Full mailboxes
//!
//! What Publish does when a recipient's mailbox is full is decided by
//! [`BackpressurePolicy`].  Under `Block` the loop waits for space, which
//! stalls every other event until the slow recipient drains.

use linecast_core::{BackpressurePolicy, Message, SessionId};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::application::registry::{Registry, RegistryError};
use crate::application::session::Session;

/// Events processed by the broadcaster loop.
#[derive(Debug)]
enum RegistryEvent {
    Admit(Session),
    Depart(SessionId),
    Publish(Message),
    MemberCount(oneshot::Sender<usize>),
}

/// Cloneable submit side of the broadcaster.
///
/// Each method enqueues one event and returns once it is queued, not once it
/// is processed.  Events from a single handle are processed in call order.
#[derive(Debug, Clone)]
pub struct RegistryHandle {
    events: mpsc::Sender<RegistryEvent>,
}

impl RegistryHandle {
    /// Queues an Admit for `session`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Closed`] if the broadcaster has stopped.
    pub async fn admit(&self, session: Session) -> Result<(), RegistryError> {
        self.submit(RegistryEvent::Admit(session)).await
    }

    /// Queues a Depart for `id`.  Once processed, the session's mailbox is
    /// closed and receives nothing further.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Closed`] if the broadcaster has stopped.
    pub async fn depart(&self, id: SessionId) -> Result<(), RegistryError> {
        self.submit(RegistryEvent::Depart(id)).await
    }

    /// Queues `message` for delivery to every member except its author.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Closed`] if the broadcaster has stopped.
    pub async fn publish(&self, message: Message) -> Result<(), RegistryError> {
        self.submit(RegistryEvent::Publish(message)).await
    }

    /// Number of admitted sessions, observed after every event queued before
    /// this call has been processed.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Closed`] if the broadcaster has stopped.
    pub async fn member_count(&self) -> Result<usize, RegistryError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.submit(RegistryEvent::MemberCount(reply_tx)).await?;
        reply_rx.await.map_err(|_| RegistryError::Closed)
    }

    async fn submit(&self, event: RegistryEvent) -> Result<(), RegistryError> {
        self.events
            .send(event)
            .await
            .map_err(|_| RegistryError::Closed)
    }
}

/// The control loop owning the membership set.
pub struct Broadcaster {
    registry: Registry,
    events: mpsc::Receiver<RegistryEvent>,
    policy: BackpressurePolicy,
}

impl Broadcaster {
    /// Creates a broadcaster and the first handle to it.
    ///
    /// `queue_capacity` bounds the number of events waiting to be processed;
    /// submitters wait when it is full.
    pub fn channel(queue_capacity: usize, policy: BackpressurePolicy) -> (Self, RegistryHandle) {
        let (tx, rx) = mpsc::channel(queue_capacity);
        let broadcaster = Self {
            registry: Registry::new(),
            events: rx,
            policy,
        };
        (broadcaster, RegistryHandle { events: tx })
    }

    /// Processes events until every [`RegistryHandle`] has been dropped.
    pub async fn run(mut self) {
        info!("broadcaster started (backpressure={})", self.policy);

        while let Some(event) = self.events.recv().await {
            self.dispatch(event).await;
        }

        if self.registry.is_empty() {
            info!("broadcaster stopped");
        } else {
            warn!(
                "broadcaster stopped with {} session(s) still admitted",
                self.registry.len()
            );
        }
    }

    async fn dispatch(&mut self, event: RegistryEvent) {
        match event {
            RegistryEvent::Admit(session) => {
                let id = session.id();
                match self.registry.admit(session) {
                    Ok(()) => debug!("admitted {id} ({} online)", self.registry.len()),
                    Err(e) => warn!("admit rejected: {e}"),
                }
            }
            RegistryEvent::Depart(id) => match self.registry.depart(id) {
                Ok(session) => {
                    drop(session);
                    debug!("departed {id} ({} online)", self.registry.len());
                }
                // An evicted session still departs from its own handler.
                Err(e) => debug!("depart ignored: {e}"),
            },
            RegistryEvent::Publish(message) => self.publish(message).await,
            RegistryEvent::MemberCount(reply) => {
                let _ = reply.send(self.registry.len());
            }
        }
    }

    async fn publish(&mut self, message: Message) {
        let author = message.author();
        let mut evicted = Vec::new();

        for session in self.registry.recipients(author) {
            match self.policy {
                BackpressurePolicy::Block => {
                    if session.mailbox().send(message.clone()).await.is_err() {
                        debug!("mailbox of {} is closed; skipping", session.id());
                    }
                }
                BackpressurePolicy::Drop | BackpressurePolicy::Disconnect => {
                    match session.mailbox().try_send(message.clone()) {
                        Ok(()) => {}
                        Err(TrySendError::Full(_)) => {
                            if self.policy == BackpressurePolicy::Drop {
                                warn!("mailbox of {} is full; message dropped", session.id());
                            } else {
                                evicted.push(session.id());
                            }
                        }
                        Err(TrySendError::Closed(_)) => {
                            debug!("mailbox of {} is closed; skipping", session.id());
                        }
                    }
                }
            }
        }

        for id in evicted {
            if self.registry.depart(id).is_ok() {
                warn!("evicted {id}: mailbox full");
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
