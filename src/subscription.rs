use crate::error::{LinkError, Result};
use crate::session::SessionState;
use crate::types::ServiceInfo;
use tokio::sync::{broadcast, watch};

/// Receiver for session state snapshots
///
/// Wraps a watch channel: only the latest snapshot is retained, so a slow
/// consumer observes the current state rather than a backlog.
pub struct StateReceiver {
    rx: watch::Receiver<SessionState>,
}

impl StateReceiver {
    pub(crate) fn new(rx: watch::Receiver<SessionState>) -> Self {
        Self { rx }
    }

    /// Get the current state snapshot without waiting
    pub fn current(&self) -> SessionState {
        self.rx.borrow().clone()
    }

    /// Wait for the next published state and return it
    ///
    /// Fails with [`LinkError::ConnectionClosed`] once the session that
    /// publishes the state has been closed.
    pub async fn changed(&mut self) -> Result<SessionState> {
        self.rx
            .changed()
            .await
            .map_err(|_| LinkError::ConnectionClosed)?;
        Ok(self.rx.borrow_and_update().clone())
    }
}

/// Receiver for discovered-service list updates
pub struct ServiceListReceiver {
    rx: broadcast::Receiver<Vec<ServiceInfo>>,
}

impl ServiceListReceiver {
    pub(crate) fn new(rx: broadcast::Receiver<Vec<ServiceInfo>>) -> Self {
        Self { rx }
    }

    /// Receive the next service list snapshot
    pub async fn recv(&mut self) -> Result<Vec<ServiceInfo>> {
        self.rx.recv().await.map_err(|e| match e {
            broadcast::error::RecvError::Closed => LinkError::ConnectionClosed,
            broadcast::error::RecvError::Lagged(n) => {
                LinkError::ChannelError(format!("Lagged by {} messages", n))
            }
        })
    }

    /// Try to receive a service list snapshot without blocking
    ///
    /// Returns `None` if no update is pending.
    pub fn try_recv(&mut self) -> Result<Option<Vec<ServiceInfo>>> {
        match self.rx.try_recv() {
            Ok(services) => Ok(Some(services)),
            Err(broadcast::error::TryRecvError::Empty) => Ok(None),
            Err(broadcast::error::TryRecvError::Closed) => Err(LinkError::ConnectionClosed),
            Err(broadcast::error::TryRecvError::Lagged(n)) => {
                Err(LinkError::ChannelError(format!("Lagged by {} messages", n)))
            }
        }
    }
}
