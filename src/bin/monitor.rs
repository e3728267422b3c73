//! LED matrix monitor daemon.
//!
//! Discovers attached panels, spawns one worker thread per panel and runs
//! the render control loop until SIGINT/SIGTERM. Configuration is TOML,
//! resolved from the first CLI argument, then `LEDMON_CONFIG`, then
//! `~/.config/ledmon/config.toml`; when no file exists a built-in default
//! layout is used.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use ledmon::brightness::FixedBrightness;
use ledmon::config::Config;
use ledmon::control::{ControlLoop, TickError};
use ledmon::device::{self, DeviceScan, DiscoveryError, PanelIdentity, SerialScan};
use ledmon::frame::Panel;
use ledmon::hotkey::RevealHotkey;
use ledmon::metrics::SharedMetrics;
use ledmon::registry::AppRegistry;
use ledmon::worker::{self, PanelHandle};

#[cfg(feature = "tracing")]
use tracing::{error, info, warn};

#[cfg(not(feature = "tracing"))]
macro_rules! error {
    ($($arg:tt)*) => {};
}
#[cfg(not(feature = "tracing"))]
macro_rules! info {
    ($($arg:tt)*) => {};
}
#[cfg(not(feature = "tracing"))]
macro_rules! warn {
    ($($arg:tt)*) => {};
}

const RECONNECT_BACKOFF: Duration = Duration::from_secs(1);

/// Layout used when no configuration file is present.
const DEFAULT_LAYOUT: &str = r#"
[[top-left]]
app = "cpu"

[[bottom-left]]
app = "memory-battery"
animate = true

[[top-right]]
app = "disk"

[[bottom-right]]
app = "network"
"#;

#[derive(Debug, Error)]
enum MonitorError {
    #[error(transparent)]
    Config(#[from] ledmon::config::ConfigError),
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),
    #[error("cannot spawn panel worker: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("cannot install signal handler: {0}")]
    Signal(#[from] ctrlc::Error),
    #[error(transparent)]
    Tick(#[from] TickError),
}

fn main() -> ExitCode {
    ledmon::init_tracing();
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "monitor daemon failed");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), MonitorError> {
    let config = load_config()?;

    let shutdown = Arc::new(AtomicBool::new(false));
    let handler_flag = Arc::clone(&shutdown);
    ctrlc::set_handler(move || {
        handler_flag.store(true, Ordering::Relaxed);
    })?;

    let panels = discover_panels(&shutdown)?;
    let control = ControlLoop::new(
        &config,
        AppRegistry::with_builtins(),
        panels,
        Box::new(SharedMetrics::new()),
        Box::new(FixedBrightness(1.0)),
        RevealHotkey::new(Vec::new()),
        shutdown,
    );
    control.run()?;
    Ok(())
}

fn load_config() -> Result<Config, ledmon::config::ConfigError> {
    if let Some(path) = config_path() {
        if path.exists() {
            info!(path = %path.display(), "loading configuration");
            return Config::load(&path);
        }
        info!(path = %path.display(), "no configuration file, using default layout");
    }
    Config::from_toml(DEFAULT_LAYOUT)
}

fn config_path() -> Option<PathBuf> {
    if let Some(arg) = std::env::args().nth(1) {
        return Some(PathBuf::from(arg));
    }
    if let Ok(path) = std::env::var("LEDMON_CONFIG") {
        return Some(PathBuf::from(path));
    }
    std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config/ledmon/config.toml"))
}

/// Enumerate panels and spawn one worker per discovered device.
///
/// Zero panels is fatal. One panel degrades to single-panel mode: the left
/// half of the layout renders, the right half is ignored.
fn discover_panels(shutdown: &Arc<AtomicBool>) -> Result<Vec<PanelHandle>, MonitorError> {
    let scan = SerialScan;
    let mut candidates = scan.scan()?;
    device::order_candidates(&mut candidates);
    if candidates.is_empty() {
        return Err(DiscoveryError::NoPanels.into());
    }
    if candidates.len() == 1 {
        warn!("only one panel found, running in single-panel mode");
    } else if candidates.len() > 2 {
        warn!(found = candidates.len(), "more than two panels found, using the first two");
    }

    let mut handles = Vec::with_capacity(2);
    for (panel, candidate) in Panel::ALL.into_iter().zip(candidates.into_iter().take(2)) {
        info!(
            panel = %panel,
            port = %candidate.port_name,
            location = %candidate.location,
            "panel assigned"
        );
        handles.push(worker::spawn(
            panel,
            PanelIdentity::new(candidate.location),
            Box::new(SerialScan),
            Arc::clone(shutdown),
            RECONNECT_BACKOFF,
        )?);
    }
    Ok(handles)
}
