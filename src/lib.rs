//! Rust library for discovering and controlling ESP32 networked LED controllers
//!
//! This library provides an async API for finding LED controllers on the
//! local network and driving their color and power state. It supports:
//!
//! - Discovery via multicast DNS (`_esp32._tcp`)
//! - Control over a plain TCP line protocol (GET/SET, one connection per call)
//! - A stateful session with automatic 2 second polling while connected
//! - Real-time state and service-list subscriptions
//!
//! # Quick Start
//!
//! ```no_run
//! use ledlink::{DeviceSession, Discovery, Rgb};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Start discovery
//!     let mut discovery = Discovery::new();
//!     discovery.start("esp32", "tcp")?;
//!
//!     // Wait for controllers to be discovered
//!     tokio::time::sleep(tokio::time::Duration::from_secs(2)).await;
//!
//!     let services = discovery.services();
//!     if let Some(service) = services.first() {
//!         println!("Found controller: {}", service.name);
//!
//!         if let Some(host) = service.primary_address() {
//!             // Connect and control it
//!             let session = DeviceSession::open();
//!             session.connect(host).await?;
//!             session.set_on(true).await?;
//!             session.set_color(Rgb::new(255, 80, 0)).await?;
//!
//!             // Watch published state
//!             let mut updates = session.subscribe();
//!             let state = updates.changed().await?;
//!             println!("connected={} color={}", state.connected, state.color);
//!
//!             session.close().await;
//!         }
//!     }
//!
//!     discovery.stop().await;
//!     Ok(())
//! }
//! ```
//!
//! # Direct Connection
//!
//! If you know the address of a controller, you can skip discovery:
//!
//! ```no_run
//! use ledlink::DeviceLink;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let link = DeviceLink::new("192.168.1.50");
//!     let color = link.get_color().await?;
//!     println!("strip is {color}");
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! The library is organized into several layers:
//!
//! - **Discovery**: mDNS browse with pluggable resolver strategies
//! - **Session**: stateful coordinator publishing connectivity/color/power state
//! - **Client**: per-device protocol client (`DeviceLink`)
//! - **Connection**: low-level one-exchange-per-connection TCP transport
//! - **Protocol**: request/response line formats
//! - **Types**: domain types and data structures

mod client;
mod connection;
mod discovery;
mod error;
mod protocol;
mod session;
mod subscription;
mod types;

// Public exports
pub use client::DeviceLink;
pub use discovery::{Discovery, ResolveMode};
pub use error::{LinkError, Result};
pub use session::{DeviceSession, SessionState};
pub use subscription::{ServiceListReceiver, StateReceiver};
pub use types::{Rgb, ServiceInfo};
