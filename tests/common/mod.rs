//! Fake LED controller for integration tests.
//!
//! Speaks the controller line protocol: one request line per connection,
//! one response line back. Tracks connection statistics so tests can
//! assert that exchanges never overlap.

#![allow(dead_code)]

use ledlink::Rgb;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

/// Time each exchange spends "processing" between reading the request and
/// answering. Widens the window in which overlapping exchanges would be
/// observed concurrently.
const HANDLE_DELAY: Duration = Duration::from_millis(20);

struct DeviceState {
    color: Rgb,
    on: bool,
    /// When set, every SET is answered with this instead of OK
    set_response: Option<String>,
    /// When set, GET COLOR is answered with this raw line
    color_response: Option<String>,
}

#[derive(Default)]
struct Stats {
    connections: AtomicUsize,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

pub struct FakeDevice {
    addr: SocketAddr,
    state: Arc<Mutex<DeviceState>>,
    stats: Arc<Stats>,
}

impl FakeDevice {
    /// Bind to an ephemeral loopback port
    pub async fn start(color: Rgb, on: bool) -> Self {
        Self::bind("127.0.0.1:0", color, on).await
    }

    /// Bind to an explicit address
    pub async fn bind(addr: &str, color: Rgb, on: bool) -> Self {
        let listener = TcpListener::bind(addr)
            .await
            .unwrap_or_else(|e| panic!("bind {addr}: {e}"));
        let addr = listener.local_addr().expect("local_addr");

        let state = Arc::new(Mutex::new(DeviceState {
            color,
            on,
            set_response: None,
            color_response: None,
        }));
        let stats = Arc::new(Stats::default());

        let accept_state = state.clone();
        let accept_stats = stats.clone();
        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                let state = accept_state.clone();
                let stats = accept_stats.clone();
                tokio::spawn(handle_connection(stream, state, stats));
            }
        });

        Self { addr, state, stats }
    }

    pub fn host(&self) -> String {
        self.addr.ip().to_string()
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    pub fn color(&self) -> Rgb {
        self.state.lock().unwrap().color
    }

    pub fn on(&self) -> bool {
        self.state.lock().unwrap().on
    }

    pub fn set_state(&self, color: Rgb, on: bool) {
        let mut state = self.state.lock().unwrap();
        state.color = color;
        state.on = on;
    }

    /// Answer every SET with `response` instead of OK
    pub fn reject_sets(&self, response: &str) {
        self.state.lock().unwrap().set_response = Some(response.to_string());
    }

    /// Answer GET COLOR with a raw line, bypassing the stored color
    pub fn rig_color_response(&self, line: &str) {
        self.state.lock().unwrap().color_response = Some(line.to_string());
    }

    /// Total exchanges served (connections that sent a request line)
    pub fn exchanges(&self) -> usize {
        self.stats.connections.load(Ordering::SeqCst)
    }

    /// Peak number of exchanges in flight at once
    pub fn max_concurrent(&self) -> usize {
        self.stats.max_active.load(Ordering::SeqCst)
    }
}

async fn handle_connection(stream: TcpStream, state: Arc<Mutex<DeviceState>>, stats: Arc<Stats>) {
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);
    let mut line = String::new();

    // A probe connection that closes without sending anything is not an
    // exchange; only count from request received to response written.
    match reader.read_line(&mut line).await {
        Ok(0) | Err(_) => return,
        Ok(_) => {}
    }

    stats.connections.fetch_add(1, Ordering::SeqCst);
    let active = stats.active.fetch_add(1, Ordering::SeqCst) + 1;
    stats.max_active.fetch_max(active, Ordering::SeqCst);

    tokio::time::sleep(HANDLE_DELAY).await;
    let response = respond(line.trim_end(), &state);
    let _ = write_half.write_all(response.as_bytes()).await;
    let _ = write_half.write_all(b"\n").await;

    stats.active.fetch_sub(1, Ordering::SeqCst);
}

fn respond(request: &str, state: &Arc<Mutex<DeviceState>>) -> String {
    let mut state = state.lock().unwrap();

    if request == "GET COLOR" {
        return state
            .color_response
            .clone()
            .unwrap_or_else(|| state.color.to_string());
    }
    if request == "GET ENCENDIDO" {
        return state.on.to_string();
    }
    if let Some(value) = request.strip_prefix("SET COLOR ") {
        if let Some(rigged) = &state.set_response {
            return rigged.clone();
        }
        let components: Vec<u8> = value.split(", ").filter_map(|c| c.parse().ok()).collect();
        if components.len() == 3 {
            state.color = Rgb::new(components[0], components[1], components[2]);
            return "OK".to_string();
        }
        return "ERR".to_string();
    }
    if let Some(value) = request.strip_prefix("SET ENCENDIDO ") {
        if let Some(rigged) = &state.set_response {
            return rigged.clone();
        }
        state.on = value == "true";
        return "OK".to_string();
    }

    "ERR".to_string()
}

/// Wait until the session publishes a state matching `pred`, or panic
/// after `timeout`.
pub async fn wait_for_state<F>(
    rx: &mut ledlink::StateReceiver,
    timeout: Duration,
    pred: F,
) -> ledlink::SessionState
where
    F: Fn(&ledlink::SessionState) -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    let mut state = rx.current();
    while !pred(&state) {
        let now = tokio::time::Instant::now();
        if now >= deadline {
            panic!("timed out waiting for state, last seen: {state:?}");
        }
        state = tokio::time::timeout(deadline - now, rx.changed())
            .await
            .unwrap_or_else(|_| panic!("timed out waiting for state, last seen: {state:?}"))
            .expect("session closed while waiting for state");
    }
    state
}
