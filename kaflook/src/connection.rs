use crate::backend::BrokerBackend;
use crate::connection_settings::ConnectionSettings;
use crate::error::{BrowseError, BrowseResult};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Lifecycle of the shared broker connection as seen by callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Failed(BrowseError),
}

enum Slot<C> {
    Disconnected,
    Connecting,
    Connected(Arc<C>),
    Failed(BrowseError),
}

impl<C> Slot<C> {
    fn state(&self) -> ConnectionState {
        match self {
            Slot::Disconnected => ConnectionState::Disconnected,
            Slot::Connecting => ConnectionState::Connecting,
            Slot::Connected(_) => ConnectionState::Connected,
            Slot::Failed(e) => ConnectionState::Failed(e.clone()),
        }
    }
}

/// The single connection to a broker cluster.
///
/// Catalog and tailer borrow the client through [`BrokerConnection::client`] and never dial
/// themselves. Concurrent [`BrokerConnection::connect`] calls share one dial: the first caller
/// drives it, the others wait for its outcome.
pub struct BrokerConnection<B: BrokerBackend> {
    backend: B,
    settings: ConnectionSettings,
    slot: watch::Sender<Slot<B::Client>>,
}

impl<B: BrokerBackend> BrokerConnection<B> {
    pub fn new(backend: B, settings: ConnectionSettings) -> Self {
        let (slot, _) = watch::channel(Slot::Disconnected);

        Self {
            backend,
            settings,
            slot,
        }
    }

    pub fn settings(&self) -> &ConnectionSettings {
        &self.settings
    }

    /// Current state. Never dials.
    pub fn status(&self) -> ConnectionState {
        self.slot.borrow().state()
    }

    pub fn client(&self) -> BrowseResult<Arc<B::Client>> {
        match &*self.slot.borrow() {
            Slot::Connected(client) => Ok(client.clone()),
            _ => Err(BrowseError::NotConnected),
        }
    }

    #[tracing::instrument(skip_all)]
    pub async fn connect(&self) -> BrowseResult<ConnectionState> {
        loop {
            let mut receiver = self.slot.subscribe();

            let mut drive = false;
            self.slot.send_if_modified(|slot| match slot {
                Slot::Connected(_) | Slot::Connecting => false,
                Slot::Disconnected | Slot::Failed(_) => {
                    *slot = Slot::Connecting;
                    drive = true;
                    true
                }
            });

            if drive {
                return self.dial().await;
            }

            let outcome = receiver
                .wait_for(|slot| !matches!(slot, Slot::Connecting))
                .await
                .map(|slot| slot.state())
                .map_err(|_| BrowseError::NotConnected)?;

            match outcome {
                ConnectionState::Connected => return Ok(outcome),
                ConnectionState::Failed(e) => return Err(e),
                _ => debug!("In-flight dial was abandoned, dialing again"),
            }
        }
    }

    /// Drops the shared client. A dial in progress is left alone.
    pub fn disconnect(&self) {
        let disconnected = self.slot.send_if_modified(|slot| match slot {
            Slot::Connecting | Slot::Disconnected => false,
            Slot::Connected(_) | Slot::Failed(_) => {
                *slot = Slot::Disconnected;
                true
            }
        });

        if disconnected {
            info!("Disconnected from {}", self.settings.bootstrap_servers());
        }
    }

    async fn dial(&self) -> BrowseResult<ConnectionState> {
        let guard = AbandonedDialGuard {
            slot: &self.slot,
            armed: true,
        };

        let result = match self.settings.validate() {
            Ok(()) => {
                let timeout = self.settings.timeouts.connect();
                tokio::time::timeout(timeout, self.backend.dial(&self.settings))
                    .await
                    .unwrap_or_else(|_| Err(BrowseError::timeout("connecting", timeout)))
            }
            Err(e) => Err(e),
        };
        guard.disarm();

        match result {
            Ok(client) => {
                info!("Connected to {}", self.settings.bootstrap_servers());
                self.slot.send_replace(Slot::Connected(Arc::new(client)));
                Ok(ConnectionState::Connected)
            }
            Err(e) => {
                warn!(
                    "Connecting to {} failed: {}",
                    self.settings.bootstrap_servers(),
                    e
                );
                self.slot.send_replace(Slot::Failed(e.clone()));
                Err(e)
            }
        }
    }
}

/// Resets a dial whose future was dropped, so waiters don't wait for it forever.
struct AbandonedDialGuard<'a, C> {
    slot: &'a watch::Sender<Slot<C>>,
    armed: bool,
}

impl<C> AbandonedDialGuard<'_, C> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl<C> Drop for AbandonedDialGuard<'_, C> {
    fn drop(&mut self) {
        if self.armed {
            warn!("Dial was cancelled before completing");
            self.slot.send_replace(Slot::Disconnected);
        }
    }
}
