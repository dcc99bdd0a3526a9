use crate::error::Result;
use crate::subscription::ServiceListReceiver;
use crate::types::ServiceInfo;
use mdns_sd::{ServiceDaemon, ServiceEvent};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;

/// Strategy for surfacing address resolutions to the discovery engine.
///
/// Both strategies see the same stream of found/resolved/lost events; they
/// differ in which resolutions they pass through to the service set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResolveMode {
    /// Surface every resolution, replacing the previous entry each time.
    /// Tracks address changes for as long as the service is advertised.
    #[default]
    Continuous,
    /// Surface only the first resolution per service instance; later
    /// updates are suppressed until the instance is lost and re-found.
    /// For platforms whose resolver answers a resolve request only once.
    OneShot,
}

impl ResolveMode {
    fn resolver(self) -> Box<dyn Resolver> {
        match self {
            ResolveMode::Continuous => Box::new(ContinuousResolver),
            ResolveMode::OneShot => Box::new(OneShotResolver::default()),
        }
    }
}

/// Discovery manager for LED controllers advertised over mDNS
///
/// Maintains a live, deduplicated set of resolved services and broadcasts
/// the full snapshot to subscribers whenever the set changes. The browse
/// runs on a background task which is the sole mutator of the set.
///
/// # Example
///
/// ```no_run
/// use ledlink::Discovery;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let mut discovery = Discovery::new();
///     discovery.start("esp32", "tcp")?;
///
///     // Wait a bit for discovery
///     tokio::time::sleep(tokio::time::Duration::from_secs(2)).await;
///
///     for service in discovery.services() {
///         println!("Found {} at {:?}", service.name, service.primary_address());
///     }
///
///     discovery.stop().await;
///     Ok(())
/// }
/// ```
pub struct Discovery {
    services: Arc<Mutex<ServiceSet>>,
    update_tx: Arc<broadcast::Sender<Vec<ServiceInfo>>>,
    resolve_mode: ResolveMode,
    stop_tx: Option<broadcast::Sender<()>>,
    task_handle: Option<tokio::task::JoinHandle<()>>,
}

impl Discovery {
    /// Create a new Discovery manager with continuous resolution
    pub fn new() -> Self {
        Self::with_resolver(ResolveMode::default())
    }

    /// Create a new Discovery manager with an explicit resolver strategy
    pub fn with_resolver(resolve_mode: ResolveMode) -> Self {
        let (update_tx, _) = broadcast::channel(100);
        Self {
            services: Arc::new(Mutex::new(ServiceSet::default())),
            update_tx: Arc::new(update_tx),
            resolve_mode,
            stop_tx: None,
            task_handle: None,
        }
    }

    /// Subscribe to service list updates
    ///
    /// Every change to the discovered set delivers the full current
    /// snapshot, never an incremental delta.
    pub fn subscribe_updates(&self) -> ServiceListReceiver {
        ServiceListReceiver::new(self.update_tx.subscribe())
    }

    /// Get a snapshot of currently discovered services
    pub fn services(&self) -> Vec<ServiceInfo> {
        self.services.lock().unwrap().snapshot()
    }

    /// Get the number of discovered services
    pub fn service_count(&self) -> usize {
        self.services.lock().unwrap().len()
    }

    /// Start browsing for `_<service>._<protocol>` advertisements
    ///
    /// If discovery is already running, the previous browse is stopped
    /// first. The existing service list is preserved.
    pub fn start(&mut self, service: &str, protocol: &str) -> Result<()> {
        self.abort_browse();

        let service_type = format!("_{service}._{protocol}.local.");
        tracing::info!("Starting mDNS browse for {}", service_type);

        let daemon = ServiceDaemon::new()?;
        let receiver = daemon.browse(&service_type)?;

        let (stop_tx, stop_rx) = broadcast::channel(1);
        self.stop_tx = Some(stop_tx);

        let services = self.services.clone();
        let update_tx = self.update_tx.clone();
        let resolver = self.resolve_mode.resolver();

        let handle = tokio::spawn(run_browse(
            daemon,
            service_type,
            receiver,
            resolver,
            services,
            update_tx,
            stop_rx,
        ));
        self.task_handle = Some(handle);
        Ok(())
    }

    /// Stop the browse
    ///
    /// Safe to call when not discovering. The service list is preserved
    /// and can still be read after stopping.
    pub async fn stop(&mut self) {
        self.abort_browse();
        if let Some(handle) = self.task_handle.take() {
            // Give it a moment to stop gracefully
            let _ = tokio::time::timeout(Duration::from_millis(500), handle).await;
        }
    }

    fn abort_browse(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Default for Discovery {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Discovery {
    fn drop(&mut self) {
        self.abort_browse();
    }
}

async fn run_browse(
    daemon: ServiceDaemon,
    service_type: String,
    receiver: mdns_sd::Receiver<ServiceEvent>,
    mut resolver: Box<dyn Resolver>,
    services: Arc<Mutex<ServiceSet>>,
    update_tx: Arc<broadcast::Sender<Vec<ServiceInfo>>>,
    mut stop_rx: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            _ = stop_rx.recv() => {
                tracing::info!("Discovery stopped by user");
                break;
            }
            event = receiver.recv_async() => match event {
                Ok(event) => {
                    handle_event(event, resolver.as_mut(), &services, &update_tx);
                }
                Err(e) => {
                    tracing::error!("mDNS event channel closed: {}", e);
                    break;
                }
            }
        }
    }

    // Best-effort teardown
    if let Err(e) = daemon.stop_browse(&service_type) {
        tracing::warn!("Failed to stop browse for {}: {}", service_type, e);
    }
    if let Err(e) = daemon.shutdown() {
        tracing::warn!("Failed to shutdown mDNS daemon: {}", e);
    }
}

fn handle_event(
    event: ServiceEvent,
    resolver: &mut dyn Resolver,
    services: &Arc<Mutex<ServiceSet>>,
    update_tx: &Arc<broadcast::Sender<Vec<ServiceInfo>>>,
) {
    match event {
        ServiceEvent::SearchStarted(ty) => {
            tracing::debug!("Browse started for {}", ty);
        }
        ServiceEvent::ServiceFound(_ty, fullname) => {
            // Not in the set yet; entries are only added once resolved
            tracing::debug!("Service found, awaiting resolution: {}", fullname);
            resolver.on_found(&fullname);
        }
        ServiceEvent::ServiceResolved(info) => {
            let fullname = info.get_fullname().to_string();
            let entry = convert_service_info(&info);
            if let Some(entry) = resolver.on_resolved(&fullname, entry) {
                tracing::info!(
                    "Resolved {} at {:?} port {}",
                    entry.name,
                    entry.addresses,
                    entry.port
                );
                let snapshot = {
                    let mut set = services.lock().unwrap();
                    set.upsert(entry);
                    set.snapshot()
                };
                let _ = update_tx.send(snapshot);
            }
        }
        ServiceEvent::ServiceRemoved(ty, fullname) => {
            tracing::info!("Service lost: {}", fullname);
            resolver.on_lost(&fullname);
            let name = instance_name(&fullname, &ty);
            let snapshot = {
                let mut set = services.lock().unwrap();
                if !set.remove_named(name, &ty) {
                    // Lost an identity never in the set
                    return;
                }
                set.snapshot()
            };
            let _ = update_tx.send(snapshot);
        }
        // SearchStopped and any other daemon chatter
        _ => {}
    }
}

/// Extract the instance name from a fullname like
/// `ledstrip._esp32._tcp.local.`
fn instance_name<'a>(fullname: &'a str, service_type: &str) -> &'a str {
    fullname
        .strip_suffix(service_type)
        .and_then(|s| s.strip_suffix('.'))
        .unwrap_or(fullname)
}

fn convert_service_info(info: &mdns_sd::ServiceInfo) -> ServiceInfo {
    let mut addresses: Vec<String> = info
        .get_addresses()
        .iter()
        .map(ToString::to_string)
        .collect();
    // HashSet iteration order is arbitrary; sort for a stable primary
    addresses.sort();

    ServiceInfo::new(
        instance_name(info.get_fullname(), info.get_type()),
        info.get_type(),
        info.get_port(),
        addresses,
    )
}

/// Deduplicated set of discovered services, keyed by service identity
#[derive(Default)]
struct ServiceSet {
    entries: HashSet<ServiceInfo>,
}

impl ServiceSet {
    /// Replace any entry with the same identity, then insert
    fn upsert(&mut self, entry: ServiceInfo) {
        self.entries.remove(&entry);
        self.entries.insert(entry);
    }

    /// Remove all entries matching the instance name and service type.
    /// Returns whether anything was removed.
    fn remove_named(&mut self, name: &str, service_type: &str) -> bool {
        let before = self.entries.len();
        self.entries
            .retain(|e| !(e.name == name && e.service_type == service_type));
        self.entries.len() != before
    }

    fn snapshot(&self) -> Vec<ServiceInfo> {
        let mut services: Vec<ServiceInfo> = self.entries.iter().cloned().collect();
        services.sort_by(|a, b| a.name.cmp(&b.name));
        services
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Address resolution strategy
///
/// The engine routes every browse event through the strategy; whatever the
/// strategy returns from `on_resolved` is published to the service set.
trait Resolver: Send {
    fn on_found(&mut self, fullname: &str);
    fn on_resolved(&mut self, fullname: &str, entry: ServiceInfo) -> Option<ServiceInfo>;
    fn on_lost(&mut self, fullname: &str);
}

/// Passes every resolution through, so address changes keep flowing
struct ContinuousResolver;

impl Resolver for ContinuousResolver {
    fn on_found(&mut self, _fullname: &str) {}

    fn on_resolved(&mut self, _fullname: &str, entry: ServiceInfo) -> Option<ServiceInfo> {
        Some(entry)
    }

    fn on_lost(&mut self, _fullname: &str) {}
}

/// Surfaces a single resolution per service instance
#[derive(Default)]
struct OneShotResolver {
    resolved: HashSet<String>,
}

impl Resolver for OneShotResolver {
    fn on_found(&mut self, _fullname: &str) {}

    fn on_resolved(&mut self, fullname: &str, entry: ServiceInfo) -> Option<ServiceInfo> {
        if self.resolved.insert(fullname.to_string()) {
            Some(entry)
        } else {
            tracing::debug!("Suppressing repeat resolution for {}", fullname);
            None
        }
    }

    fn on_lost(&mut self, fullname: &str) {
        // Allow the instance to resolve again if it comes back
        self.resolved.remove(fullname);
    }
}
