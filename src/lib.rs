//! Host-side rendering engine for serial-attached LED matrix panels.
//!
//! One or two 9x34 panels are driven over a framed serial protocol. The
//! crate splits each panel into two quadrants, rotates configured apps
//! through them on independent clocks, and ships finished frames to one
//! worker thread per panel. Metric and ambient-brightness sampling live
//! outside the crate behind the [`metrics::MetricSource`] and
//! [`brightness::BrightnessSource`] traits.

pub mod brightness;
pub mod config;
pub mod control;
pub mod device;
pub mod frame;
pub mod hotkey;
pub mod metrics;
pub mod protocol;
pub mod registry;
pub mod render;
pub mod scheduler;
pub mod sync;
pub mod worker;

mod trace;

pub use trace::init_tracing;
