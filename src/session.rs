use crate::client::DeviceLink;
use crate::error::{LinkError, Result};
use crate::subscription::StateReceiver;
use crate::types::Rgb;
use serde::Serialize;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::{Interval, MissedTickBehavior};

const POLL_INTERVAL: Duration = Duration::from_secs(2);
const CONNECT_FAILED: &str = "could not connect";

/// Observable session state
///
/// The single source of truth a UI renders from. Snapshots are published
/// on every change through [`DeviceSession::subscribe`].
#[derive(Debug, Clone, Serialize)]
pub struct SessionState {
    /// Whether the last exchange with the device succeeded
    pub connected: bool,
    /// Last known strip color
    pub color: Rgb,
    /// Last known power state
    pub on: bool,
    /// Last error text; sticky until a new error replaces it
    pub error: Option<String>,
    /// Set whenever new error text is published, cleared only by
    /// [`DeviceSession::mark_error_as_read`]
    pub error_unread: bool,
    /// Whether any device target has ever been chosen
    pub device_selected: bool,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            connected: false,
            color: Rgb::RED,
            on: false,
            error: None,
            error_unread: true,
            device_selected: false,
        }
    }
}

enum Command {
    Connect(String),
    SetColor(Rgb),
    SetOn(bool),
    MarkErrorRead,
}

/// Stateful coordinator for one LED controller at a time
///
/// Owns the active device binding and all exchanges against it. Commands
/// are handled by a single background task, so at most one exchange is in
/// flight at any moment; user operations and the background poll never
/// interleave at the socket level.
///
/// While connected, the session refreshes power and color every 2 seconds.
/// Connecting to a new target replaces the binding outright and stops the
/// previous target's polling before the new one is installed.
///
/// # Example
///
/// ```no_run
/// use ledlink::{DeviceSession, Rgb};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let session = DeviceSession::open();
///     session.connect("192.168.1.50").await?;
///
///     let mut updates = session.subscribe();
///     let state = updates.changed().await?;
///     if state.connected {
///         session.set_color(Rgb::new(0, 128, 255)).await?;
///         session.set_on(true).await?;
///     }
///
///     session.close().await;
///     Ok(())
/// }
/// ```
pub struct DeviceSession {
    cmd_tx: mpsc::Sender<Command>,
    state_rx: watch::Receiver<SessionState>,
    task_handle: Option<tokio::task::JoinHandle<()>>,
}

impl DeviceSession {
    /// Open a session with no device selected
    ///
    /// Spawns the background task that owns the device binding; must be
    /// called within a tokio runtime. Targets are contacted on the
    /// controller default port.
    pub fn open() -> Self {
        Self::open_with_port(DeviceLink::DEFAULT_PORT)
    }

    /// Open a session whose targets listen on a non-default port
    pub fn open_with_port(port: u16) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(16);
        let (state_tx, state_rx) = watch::channel(SessionState::default());
        let task_handle = tokio::spawn(run_session(cmd_rx, state_tx, port));
        Self {
            cmd_tx,
            state_rx,
            task_handle: Some(task_handle),
        }
    }

    /// Close the session, stopping any polling
    pub async fn close(self) {
        let Self {
            cmd_tx,
            state_rx: _,
            task_handle,
        } = self;
        drop(cmd_tx);
        if let Some(handle) = task_handle {
            // Give it a moment to stop gracefully
            let _ = tokio::time::timeout(Duration::from_millis(500), handle).await;
        }
    }

    /// Get the current state snapshot
    pub fn state(&self) -> SessionState {
        self.state_rx.borrow().clone()
    }

    /// Subscribe to state snapshots
    pub fn subscribe(&self) -> StateReceiver {
        StateReceiver::new(self.state_rx.clone())
    }

    /// Select and connect to the device at `host` on the session's port
    ///
    /// On success the session refreshes color and power immediately and
    /// starts polling. On failure it publishes `connected=false` and the
    /// "could not connect" error.
    pub async fn connect(&self, host: impl Into<String>) -> Result<()> {
        self.send(Command::Connect(host.into())).await
    }

    /// Push a new color to the device, then publish it
    pub async fn set_color(&self, color: Rgb) -> Result<()> {
        self.send(Command::SetColor(color)).await
    }

    /// Push a new power state to the device, then publish it
    pub async fn set_on(&self, on: bool) -> Result<()> {
        self.send(Command::SetOn(on)).await
    }

    /// Acknowledge the current error; clears only the unread flag
    pub async fn mark_error_as_read(&self) -> Result<()> {
        self.send(Command::MarkErrorRead).await
    }

    async fn send(&self, cmd: Command) -> Result<()> {
        self.cmd_tx
            .send(cmd)
            .await
            .map_err(|_| LinkError::ChannelError("session closed".to_string()))
    }
}

async fn run_session(
    mut cmd_rx: mpsc::Receiver<Command>,
    state_tx: watch::Sender<SessionState>,
    port: u16,
) {
    let mut task = SessionTask {
        link: None,
        polling: false,
        state_tx,
        port,
    };

    let mut poll = tokio::time::interval(POLL_INTERVAL);
    poll.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => match cmd {
                Some(cmd) => task.handle(cmd, &mut poll).await,
                None => {
                    tracing::debug!("Session closed");
                    break;
                }
            },
            _ = poll.tick(), if task.polling => task.poll_once().await,
        }
    }
}

/// Session internals, owned exclusively by the background task
struct SessionTask {
    link: Option<DeviceLink>,
    polling: bool,
    state_tx: watch::Sender<SessionState>,
    port: u16,
}

impl SessionTask {
    async fn handle(&mut self, cmd: Command, poll: &mut Interval) {
        match cmd {
            Command::Connect(host) => self.connect(host, poll).await,
            Command::SetColor(color) => self.set_color(color).await,
            Command::SetOn(on) => self.set_on(on).await,
            Command::MarkErrorRead => self.apply(|s| s.error_unread = false),
        }
    }

    async fn connect(&mut self, host: String, poll: &mut Interval) {
        tracing::info!("Connecting to {}", host);

        // Total replacement: the previous binding and its polling are
        // superseded before the new target is probed
        self.polling = false;
        let link = DeviceLink::with_port(host, self.port);
        let reachable = link.test_connection().await;
        self.link = Some(link);
        self.apply(|s| s.device_selected = true);

        if reachable {
            self.refresh_color().await;
            self.refresh_on().await;
            self.polling = true;
            poll.reset();
        } else {
            tracing::warn!("Connection test failed");
            self.apply(|s| {
                s.connected = false;
                s.error = Some(CONNECT_FAILED.to_string());
                s.error_unread = true;
            });
        }
    }

    /// One poll iteration: power first, then color
    async fn poll_once(&mut self) {
        self.refresh_on().await;
        self.refresh_color().await;
    }

    async fn set_color(&mut self, color: Rgb) {
        let result = match &self.link {
            Some(link) => link.set_color(color).await,
            None => Err(LinkError::NoDeviceSelected),
        };
        match result {
            Ok(()) => self.apply(|s| {
                s.color = color;
                s.connected = true;
            }),
            Err(e) => self.fail(e),
        }
    }

    async fn set_on(&mut self, on: bool) {
        let result = match &self.link {
            Some(link) => link.set_on(on).await,
            None => Err(LinkError::NoDeviceSelected),
        };
        match result {
            Ok(()) => self.apply(|s| {
                s.on = on;
                s.connected = true;
            }),
            Err(e) => self.fail(e),
        }
    }

    async fn refresh_color(&mut self) {
        let result = match &self.link {
            Some(link) => link.get_color().await,
            None => Err(LinkError::NoDeviceSelected),
        };
        match result {
            Ok(color) => self.apply(|s| {
                s.color = color;
                s.connected = true;
            }),
            Err(e) => self.fail(e),
        }
    }

    async fn refresh_on(&mut self) {
        let result = match &self.link {
            Some(link) => link.get_on().await,
            None => Err(LinkError::NoDeviceSelected),
        };
        match result {
            Ok(on) => self.apply(|s| {
                s.on = on;
                s.connected = true;
            }),
            Err(e) => self.fail(e),
        }
    }

    /// Failure mapping for every device operation: connectivity failures
    /// flip `connected`, protocol failures surface as error text. Error
    /// text is never cleared by a later success.
    fn fail(&self, err: LinkError) {
        if err.is_connectivity() {
            tracing::debug!("Device unreachable: {}", err);
            self.apply(|s| s.connected = false);
        } else {
            tracing::warn!("Device operation failed: {}", err);
            self.apply(|s| {
                s.error = Some(err.to_string());
                s.error_unread = true;
            });
        }
    }

    fn apply<F: FnOnce(&mut SessionState)>(&self, mutate: F) {
        self.state_tx.send_modify(mutate);
    }
}
