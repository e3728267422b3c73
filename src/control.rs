//! The render control loop: one thread composing frames for all panels.
//!
//! Every tick (100 ms) the loop samples brightness, metrics and the reveal
//! hot-key, asks each quadrant's scheduler which app is active, paints one
//! frame per panel and queues it to that panel's worker. Content is painted
//! first and separator borders after it, so borders stay crisp where shapes
//! meet. The loop never touches a serial port; a stalled panel exerts
//! backpressure through its bounded queue instead.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use minstant::Instant;
use thiserror::Error;

use crate::brightness::{map_brightness, BrightnessSource, Intensities};
use crate::config::{Config, Scope};
use crate::frame::{Frame, Panel, Quadrant};
use crate::hotkey::{Reveal, RevealHotkey};
use crate::metrics::{MetricSnapshot, MetricSource};
use crate::registry::{AppRegistry, DrawContext};
use crate::render::draw;
use crate::scheduler::{AppSlot, QuadrantScheduler};
use crate::trace::{error, info, warn};
use crate::worker::{AnimateDirective, PanelHandle, RenderCommand, WorkerGone};

/// Render cadence.
pub const TICK_INTERVAL: Duration = Duration::from_millis(100);

/// How long the loop pauses after a failed tick before trying again.
const TICK_RETRY_DELAY: Duration = Duration::from_secs(1);

/// A tick failed. The loop drops the dead worker and carries on; losing the
/// last worker is terminal.
#[derive(Debug, Error)]
pub enum TickError {
    #[error("all panel workers are gone")]
    AllWorkersGone,
}

/// Composes frames and feeds the panel workers.
pub struct ControlLoop {
    registry: AppRegistry,
    schedulers: [Option<QuadrantScheduler>; 4],
    panels: Vec<PanelHandle>,
    metrics: Box<dyn MetricSource>,
    brightness: Box<dyn BrightnessSource>,
    hotkey: RevealHotkey,
    shutdown: Arc<AtomicBool>,
}

impl ControlLoop {
    #[must_use]
    pub fn new(
        config: &Config,
        registry: AppRegistry,
        panels: Vec<PanelHandle>,
        metrics: Box<dyn MetricSource>,
        brightness: Box<dyn BrightnessSource>,
        hotkey: RevealHotkey,
        shutdown: Arc<AtomicBool>,
    ) -> Self {
        let now = Instant::now();
        let schedulers =
            Quadrant::ALL.map(|quadrant| QuadrantScheduler::from_config(config, quadrant, now));
        Self {
            registry,
            schedulers,
            panels,
            metrics,
            brightness,
            hotkey,
            shutdown,
        }
    }

    /// Run until the shutdown flag is raised, then stop and join all panel
    /// workers (which blank their panels on the way out).
    ///
    /// A failed tick is logged and retried after a short pause; the dead
    /// worker is dropped so the surviving panel keeps rendering.
    ///
    /// # Errors
    /// Fails once every panel worker has exited underneath the loop.
    pub fn run(mut self) -> Result<(), TickError> {
        info!(panels = self.panels.len(), "control loop started");
        let result = loop {
            if self.shutdown.load(Ordering::Relaxed) {
                break Ok(());
            }
            match self.tick(Instant::now(), wall_clock_secs()) {
                Ok(()) => std::thread::sleep(TICK_INTERVAL),
                Err(gone) => {
                    // A worker that noticed shutdown first is not a failure.
                    if self.shutdown.load(Ordering::Relaxed) {
                        break Ok(());
                    }
                    error!(error = %gone, "tick failed, dropping dead worker");
                    let dead = gone.0;
                    self.panels.retain(|handle| handle.panel() != dead);
                    if self.panels.is_empty() {
                        break Err(TickError::AllWorkersGone);
                    }
                    std::thread::sleep(TICK_RETRY_DELAY);
                }
            }
        };
        info!("control loop stopping");
        for handle in self.panels.drain(..) {
            handle.join();
        }
        result
    }

    fn tick(&mut self, now: Instant, now_secs: f64) -> Result<(), WorkerGone> {
        let intensities = map_brightness(self.brightness.ambient());
        let snapshot = self.metrics.snapshot();
        let reveal = self.hotkey.poll();

        for index in 0..self.panels.len() {
            let panel = self.panels[index].panel();
            let command = self.compose(panel, now, now_secs, &snapshot, intensities, reveal);
            self.panels[index].enqueue(command)?;
        }
        Ok(())
    }

    /// Paint one panel's frame and derive its animation directive.
    fn compose(
        &mut self,
        panel: Panel,
        now: Instant,
        now_secs: f64,
        snapshot: &MetricSnapshot,
        intensities: Intensities,
        reveal: Reveal,
    ) -> RenderCommand {
        let mut frame = Frame::new();
        let mut wants_animate = false;
        let mut switched = false;

        // Resolve both quadrants first; schedulers advance even while the
        // overlay hides their content.
        let mut active: Vec<(Quadrant, AppSlot, bool)> = Vec::with_capacity(2);
        for quadrant in Quadrant::on_panel(panel) {
            let Some(scheduler) = &mut self.schedulers[quadrant_index(quadrant)] else {
                continue;
            };
            let polled = scheduler.poll(now);
            wants_animate |= polled.slot.animate;
            switched |= polled.switched;
            active.push((quadrant, polled.slot.clone(), polled.switched));
        }

        let panel_wide = active
            .iter()
            .find(|(_, slot, _)| slot.scope == Scope::Panel)
            .cloned();

        if reveal == Reveal::Active {
            self.paint_overlay(&mut frame, &active, panel_wide.as_ref(), intensities);
        } else if let Some((_, slot, _)) = &panel_wide {
            // A panel-wide slot claims both quadrants; the other quadrant's
            // content is suppressed while it is active.
            self.paint_slot(&mut frame, 0, slot, snapshot, intensities, now_secs);
        } else {
            for (quadrant, slot, _) in &active {
                self.paint_slot(
                    &mut frame,
                    quadrant.col_offset(),
                    slot,
                    snapshot,
                    intensities,
                    now_secs,
                );
            }
        }

        let mut command = RenderCommand::new(frame);
        command.brightness = Some(intensities.foreground);
        command.animate = match reveal {
            Reveal::Active => AnimateDirective::Stop,
            Reveal::Released => {
                if wants_animate {
                    AnimateDirective::Start
                } else {
                    AnimateDirective::Unchanged
                }
            }
            Reveal::Inactive => {
                if switched {
                    if wants_animate {
                        AnimateDirective::Start
                    } else {
                        AnimateDirective::Stop
                    }
                } else {
                    AnimateDirective::Unchanged
                }
            }
        };
        command
    }

    fn paint_slot(
        &self,
        frame: &mut Frame,
        q: usize,
        slot: &AppSlot,
        snapshot: &MetricSnapshot,
        intensities: Intensities,
        now_secs: f64,
    ) {
        let Some(capability) = self.registry.get(&slot.app) else {
            warn!(app = %slot.app, "unknown app in rotation, leaving region dark");
            return;
        };
        let ctx = DrawContext {
            metrics: snapshot,
            foreground: intensities.foreground,
            now_secs,
            args: &slot.args,
        };
        (capability.draw)(frame, q, &ctx);
        (capability.border)(frame, q, intensities.background);
    }

    /// ID-reveal overlay: a full-panel outline plus one identification
    /// letter per active region.
    fn paint_overlay(
        &self,
        frame: &mut Frame,
        active: &[(Quadrant, AppSlot, bool)],
        panel_wide: Option<&(Quadrant, AppSlot, bool)>,
        intensities: Intensities,
    ) {
        draw::border_outline(frame, intensities.foreground);
        if let Some((_, slot, _)) = panel_wide {
            if let Some(glyph) = self.registry.get(&slot.app).and_then(|c| c.glyph) {
                draw::draw_letter_panel(frame, glyph, intensities.foreground);
            }
            return;
        }
        for (quadrant, slot, _) in active {
            if let Some(glyph) = self.registry.get(&slot.app).and_then(|c| c.glyph) {
                draw::draw_letter(frame, quadrant.col_offset(), glyph, intensities.foreground);
            }
        }
    }
}

const fn quadrant_index(quadrant: Quadrant) -> usize {
    match quadrant {
        Quadrant::TopLeft => 0,
        Quadrant::BottomLeft => 1,
        Quadrant::TopRight => 2,
        Quadrant::BottomRight => 3,
    }
}

/// Wall-clock seconds since the Unix epoch, for time-domain draw effects.
fn wall_clock_secs() -> f64 {
    std::time::SystemTime::now()
        .duration_since(std::time::SystemTime::UNIX_EPOCH)
        .map_or(0.0, |d| d.as_secs_f64())
}
