//! Serial device discovery for LED matrix panels.
//!
//! Panels are re-identified by USB topology path, not by OS device name:
//! after a replug the same physical panel can come back as a different
//! `ttyACM*` node, but its bus/port path (`1-3.2`) stays put. Discovery
//! filters enumerated ports to those advertising the panel product string
//! and orders them by the topology suffix, giving a deterministic
//! left-to-right assignment across two physically identical panels.

use thiserror::Error;

use crate::protocol::Transport;
use crate::trace::debug;

/// Product string advertised by the panel firmware.
pub const PRODUCT_STRING: &str = "LED Matrix Input Module";

/// Serial line rate for panel connections.
pub const BAUD_RATE: u32 = 115_200;

/// Discovery or connection failure.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("cannot enumerate serial ports: {0}")]
    Enumerate(#[source] serialport::Error),
    #[error("cannot open {port}: {source}")]
    Open {
        port: String,
        #[source]
        source: serialport::Error,
    },
    /// No panel found at startup. Fatal.
    #[error("no LED matrix panels found")]
    NoPanels,
}

/// Stable identity of one panel: a topology-path prefix such as `1-3.2`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PanelIdentity(String);

impl PanelIdentity {
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self(prefix.into())
    }

    /// Whether a discovered location belongs to this panel.
    #[must_use]
    pub fn matches(&self, location: &str) -> bool {
        location.starts_with(&self.0)
    }
}

impl std::fmt::Display for PanelIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One enumerated serial port that advertised the panel product string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortCandidate {
    /// OS device name, e.g. `/dev/ttyACM0`. Transient.
    pub port_name: String,
    /// USB topology path, e.g. `1-3.2`. Stable across replugs.
    pub location: String,
}

/// The candidate's sort key: the location with the common bus-port prefix
/// (`<bus>-<port>.`) stripped.
#[must_use]
pub fn topology_suffix(location: &str) -> &str {
    let bytes = location.as_bytes();
    let mut i = 0;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    if i == 0 || bytes.get(i) != Some(&b'-') {
        return location;
    }
    i += 1;
    let digits_start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    if i == digits_start || bytes.get(i) != Some(&b'.') {
        return location;
    }
    &location[i + 1..]
}

/// Enumerates candidate panels and opens connections to them.
///
/// Behind a trait so worker and pipeline tests can inject scripted fleets.
pub trait DeviceScan: Send {
    /// All ports currently advertising the panel product string.
    ///
    /// # Errors
    /// Fails only if enumeration itself fails; an empty fleet is `Ok`.
    fn scan(&self) -> Result<Vec<PortCandidate>, DiscoveryError>;

    /// Open an exclusive connection to `candidate`.
    ///
    /// # Errors
    /// Propagates the OS open failure.
    fn open(&self, candidate: &PortCandidate) -> Result<Box<dyn Transport>, DiscoveryError>;
}

/// Sort candidates into deterministic left-to-right panel order.
pub fn order_candidates(candidates: &mut [PortCandidate]) {
    candidates.sort_by(|a, b| topology_suffix(&a.location).cmp(topology_suffix(&b.location)));
}

/// Find the first candidate matching a panel identity.
///
/// # Errors
/// Enumeration failures propagate; a missing panel yields `Ok(None)`.
pub fn find_panel(
    scan: &dyn DeviceScan,
    identity: &PanelIdentity,
) -> Result<Option<PortCandidate>, DiscoveryError> {
    let mut candidates = scan.scan()?;
    order_candidates(&mut candidates);
    Ok(candidates
        .into_iter()
        .find(|candidate| identity.matches(&candidate.location)))
}

/// [`DeviceScan`] backed by the host's real serial ports.
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialScan;

impl DeviceScan for SerialScan {
    fn scan(&self) -> Result<Vec<PortCandidate>, DiscoveryError> {
        let ports = serialport::available_ports().map_err(DiscoveryError::Enumerate)?;
        let mut candidates = Vec::new();
        for port in ports {
            let serialport::SerialPortType::UsbPort(info) = &port.port_type else {
                continue;
            };
            if !info
                .product
                .as_deref()
                .is_some_and(|product| product.contains(PRODUCT_STRING))
            {
                continue;
            }
            let Some(location) = usb_location(&port.port_name) else {
                debug!(port = %port.port_name, "panel port has no topology path, skipping");
                continue;
            };
            candidates.push(PortCandidate {
                port_name: port.port_name,
                location,
            });
        }
        Ok(candidates)
    }

    fn open(&self, candidate: &PortCandidate) -> Result<Box<dyn Transport>, DiscoveryError> {
        let port = serialport::new(&candidate.port_name, BAUD_RATE)
            .timeout(std::time::Duration::from_secs(1))
            .open()
            .map_err(|source| DiscoveryError::Open {
                port: candidate.port_name.clone(),
                source,
            })?;
        Ok(Box::new(SerialTransport { port }))
    }
}

struct SerialTransport {
    port: Box<dyn serialport::SerialPort>,
}

impl Transport for SerialTransport {
    fn send(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        self.port.write_all(bytes)
    }
}

/// USB topology path for a tty device, read from sysfs.
///
/// `/sys/class/tty/ttyACM0/device` links into the USB hierarchy at a node
/// named like `1-3.2:1.0`; the part before the colon is the topology path.
#[cfg(target_os = "linux")]
fn usb_location(port_name: &str) -> Option<String> {
    let tty = std::path::Path::new(port_name).file_name()?;
    let device = std::fs::read_link(
        std::path::Path::new("/sys/class/tty")
            .join(tty)
            .join("device"),
    )
    .ok()?;
    let node = device.file_name()?.to_str()?;
    let path = node.split(':').next()?;
    if path.is_empty() {
        None
    } else {
        Some(path.to_owned())
    }
}

#[cfg(not(target_os = "linux"))]
fn usb_location(_port_name: &str) -> Option<String> {
    None
}
