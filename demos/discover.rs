//! Discover LED controllers on the local network, connect to the first
//! one found and cycle its color.
//!
//! Run with: `cargo run --example discover`

use ledlink::{DeviceSession, Discovery, Rgb};
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ledlink=info".into()),
        )
        .init();

    let mut discovery = Discovery::new();
    discovery.start("esp32", "tcp")?;
    println!("Browsing for _esp32._tcp controllers...");

    let mut updates = discovery.subscribe_updates();
    let services = tokio::select! {
        services = async {
            loop {
                if let Ok(services) = updates.recv().await {
                    if !services.is_empty() {
                        break services;
                    }
                }
            }
        } => services,
        _ = tokio::time::sleep(Duration::from_secs(10)) => {
            discovery.stop().await;
            println!("No controllers found after 10s");
            return Ok(());
        }
    };

    for service in &services {
        println!(
            "  {} ({}) port {} at {:?}",
            service.name, service.service_type, service.port, service.addresses
        );
    }
    discovery.stop().await;

    let Some(host) = services[0].primary_address().map(str::to_string) else {
        println!("First controller has no resolved address");
        return Ok(());
    };

    println!("Connecting to {host}...");
    let session = DeviceSession::open();
    let mut state_updates = session.subscribe();
    session.connect(host).await?;

    session.set_on(true).await?;
    for color in [Rgb::new(255, 0, 0), Rgb::new(0, 255, 0), Rgb::new(0, 0, 255)] {
        session.set_color(color).await?;
        let state = state_updates.changed().await?;
        println!(
            "connected={} on={} color={}",
            state.connected, state.on, state.color
        );
        tokio::time::sleep(Duration::from_secs(1)).await;
    }

    session.close().await;
    Ok(())
}
