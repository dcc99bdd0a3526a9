use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// RGB color with 8-bit channels
///
/// `Display` renders the wire value format used by the controller
/// (`"R, G, B"` with decimal components).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const RED: Rgb = Rgb::new(255, 0, 0);

    /// Create a color from 8-bit channel values
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Create a color from normalized 0.0-1.0 channel values
    ///
    /// Each channel is scaled to 0-255 and rounded to the nearest integer.
    /// Values outside 0.0-1.0 are clamped.
    pub fn from_normalized(r: f32, g: f32, b: f32) -> Self {
        let channel = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        Self::new(channel(r), channel(g), channel(b))
    }

    /// Convert back to normalized 0.0-1.0 channel values
    pub fn to_normalized(self) -> (f32, f32, f32) {
        (
            f32::from(self.r) / 255.0,
            f32::from(self.g) / 255.0,
            f32::from(self.b) / 255.0,
        )
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}, {}", self.r, self.g, self.b)
    }
}

/// A discovered network service
///
/// Two entries describe the same service when name, type and port match;
/// resolved addresses are metadata and excluded from equality and hashing.
/// A set of `ServiceInfo` therefore dedupes by service identity, and
/// re-resolution replaces an entry instead of duplicating it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceInfo {
    /// Service instance name (e.g. `ledstrip-livingroom`)
    pub name: String,

    /// Service type (e.g. `_esp32._tcp.local.`)
    pub service_type: String,

    /// Advertised port
    pub port: u16,

    /// Resolved host addresses; the first entry is the primary
    pub addresses: Vec<String>,
}

impl ServiceInfo {
    pub fn new(
        name: impl Into<String>,
        service_type: impl Into<String>,
        port: u16,
        addresses: Vec<String>,
    ) -> Self {
        Self {
            name: name.into(),
            service_type: service_type.into(),
            port,
            addresses,
        }
    }

    /// The primary resolved address, if any
    pub fn primary_address(&self) -> Option<&str> {
        self.addresses.first().map(String::as_str)
    }
}

impl PartialEq for ServiceInfo {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.service_type == other.service_type
            && self.port == other.port
    }
}

impl Eq for ServiceInfo {}

impl Hash for ServiceInfo {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.service_type.hash(state);
        self.port.hash(state);
    }
}
