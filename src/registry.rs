//! App registry: decouples "which metric" from "how to paint it".
//!
//! A capability is registered under a string name with a draw function, a
//! border function, and an optional identification letterform. Built-in
//! apps register first; external providers may add or override entries
//! through [`AppRegistry::register`] before the control loop starts.
//! Entries are never removed, and the table is read-only once the loop
//! runs, so lookups need no locking.

use std::collections::HashMap;

use crate::config::AppArgs;
use crate::frame::Frame;
use crate::metrics::MetricSnapshot;
use crate::render::draw;
use crate::render::patterns::{letter_for, Letter};

/// Everything a draw function may consult during one tick.
pub struct DrawContext<'a> {
    pub metrics: &'a MetricSnapshot,
    /// Fill intensity for this tick.
    pub foreground: u8,
    /// Wall-clock seconds, for time-domain effects (blink, glow).
    pub now_secs: f64,
    /// Slot arguments from the configuration document.
    pub args: &'a AppArgs,
}

/// Paints an app's content into a frame at a quadrant column offset.
pub type DrawFn = fn(&mut Frame, usize, &DrawContext<'_>);

/// Paints an app's separator shape at a quadrant column offset.
pub type BorderFn = fn(&mut Frame, usize, u8);

/// A registered app: how to paint it, separate it, and identify it.
#[derive(Clone, Copy)]
pub struct AppCapability {
    pub draw: DrawFn,
    pub border: BorderFn,
    /// Letterform shown by the ID-reveal overlay; `None` omits the glyph.
    pub glyph: Option<Letter>,
}

/// Name → capability table.
pub struct AppRegistry {
    apps: HashMap<String, AppCapability>,
}

impl AppRegistry {
    /// An empty registry. Most callers want [`AppRegistry::with_builtins`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            apps: HashMap::new(),
        }
    }

    /// A registry pre-loaded with the built-in apps.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("cpu", draw_cpu, draw::border_grid);
        registry.register("memory-battery", draw_memory_battery, draw::border_pair);
        registry.register("disk", draw_disk, draw::border_split);
        registry.register("network", draw_network, draw::border_split);
        registry.register("temperature", draw_temperature, draw::border_grid);
        registry.register("fan", draw_fan, draw::border_split);
        registry
    }

    /// Register (or override) an app. Additive only: entries cannot be
    /// removed once the control loop starts.
    pub fn register(&mut self, name: &str, draw: DrawFn, border: BorderFn) {
        self.register_capability(
            name,
            AppCapability {
                draw,
                border,
                glyph: letter_for(name),
            },
        );
    }

    /// Register a fully specified capability (custom glyph included).
    pub fn register_capability(&mut self, name: &str, capability: AppCapability) {
        self.apps.insert(name.to_owned(), capability);
    }

    /// Look up a capability. `None` means the configured name is unknown;
    /// the caller logs it and skips that region's content for the tick.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&AppCapability> {
        self.apps.get(name)
    }

    /// Registered app names, for diagnostics.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.apps.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Default for AppRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

fn draw_cpu(frame: &mut Frame, q: usize, ctx: &DrawContext<'_>) {
    draw::draw_spiral_cells(frame, q, &ctx.metrics.cpu, ctx.foreground);
}

fn draw_temperature(frame: &mut Frame, q: usize, ctx: &DrawContext<'_>) {
    draw::draw_spiral_cells(frame, q, &ctx.metrics.temperatures, ctx.foreground);
}

fn draw_memory_battery(frame: &mut Frame, q: usize, ctx: &DrawContext<'_>) {
    draw::draw_memory(frame, q, ctx.metrics.memory, ctx.foreground);
    let battery = ctx.metrics.battery;
    draw::draw_battery(
        frame,
        q,
        battery.ratio,
        battery.plugged,
        ctx.foreground,
        ctx.now_secs,
    );
}

// Side-by-side bar pairs grow from the quadrant's far edge when scheduled
// into a bottom quadrant, matching the battery indicator's direction.
fn draw_bar_pair(frame: &mut Frame, q: usize, first: f64, second: f64, value: u8) {
    let at_far_edge = q > 0;
    draw::draw_bar(frame, q, first, value, 1, at_far_edge);
    draw::draw_bar(frame, q, second, value, 5, at_far_edge);
}

fn draw_disk(frame: &mut Frame, q: usize, ctx: &DrawContext<'_>) {
    draw_bar_pair(
        frame,
        q,
        ctx.metrics.disk_read,
        ctx.metrics.disk_write,
        ctx.foreground,
    );
}

fn draw_network(frame: &mut Frame, q: usize, ctx: &DrawContext<'_>) {
    draw_bar_pair(
        frame,
        q,
        ctx.metrics.net_up,
        ctx.metrics.net_down,
        ctx.foreground,
    );
}

fn draw_fan(frame: &mut Frame, q: usize, ctx: &DrawContext<'_>) {
    let first = ctx.metrics.fans.first().copied().unwrap_or(0.0);
    let second = ctx.metrics.fans.get(1).copied().unwrap_or(0.0);
    draw_bar_pair(frame, q, first, second, ctx.foreground);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::BatteryReading;

    fn context<'a>(metrics: &'a MetricSnapshot, args: &'a AppArgs) -> DrawContext<'a> {
        DrawContext {
            metrics,
            foreground: 100,
            now_secs: 101.2,
            args,
        }
    }

    #[test]
    fn builtins_are_registered() {
        let registry = AppRegistry::with_builtins();
        for name in ["cpu", "memory-battery", "disk", "network", "temperature", "fan"] {
            let capability = registry.get(name).unwrap_or_else(|| panic!("{name}"));
            assert!(capability.glyph.is_some(), "{name} has no glyph");
        }
        assert!(registry.get("uptime").is_none());
    }

    #[test]
    fn registration_is_additive_and_overriding() {
        fn noop_draw(_: &mut Frame, _: usize, _: &DrawContext<'_>) {}

        let mut registry = AppRegistry::with_builtins();
        let before = registry.names().len();
        registry.register("uptime", noop_draw, draw::border_split);
        assert_eq!(registry.names().len(), before + 1);

        // Overriding an existing name replaces, never duplicates.
        registry.register("cpu", noop_draw, draw::border_split);
        assert_eq!(registry.names().len(), before + 1);
    }

    #[test]
    fn cpu_draw_paints_into_quadrant() {
        let registry = AppRegistry::with_builtins();
        let metrics = MetricSnapshot {
            cpu: vec![1.0; 8],
            ..MetricSnapshot::default()
        };
        let args = AppArgs::default();
        let mut frame = Frame::new();
        (registry.get("cpu").unwrap().draw)(&mut frame, 0, &context(&metrics, &args));
        assert_eq!(frame.lit_count(), 8 * 9);
    }

    #[test]
    fn memory_battery_draw_uses_wall_clock() {
        let registry = AppRegistry::with_builtins();
        let metrics = MetricSnapshot {
            memory: 0.5,
            battery: BatteryReading {
                ratio: 0.8,
                plugged: false,
            },
            ..MetricSnapshot::default()
        };
        let args = AppArgs::default();
        let mut frame = Frame::new();
        (registry.get("memory-battery").unwrap().draw)(&mut frame, 17, &context(&metrics, &args));
        assert!(frame.lit_count() > 0);
    }

    #[test]
    fn fan_draw_tolerates_missing_values() {
        let registry = AppRegistry::with_builtins();
        let metrics = MetricSnapshot::default();
        let args = AppArgs::default();
        let mut frame = Frame::new();
        (registry.get("fan").unwrap().draw)(&mut frame, 17, &context(&metrics, &args));
        assert_eq!(frame.lit_count(), 0);
    }
}
