//! Per-quadrant time-sliced app rotation.
//!
//! Each quadrant carries its own scheduler over its configured slot list.
//! The scheduler is polled once per tick with the current instant and
//! reports the active slot plus whether this poll crossed a slot boundary.
//! Advancement happens only inside [`QuadrantScheduler::poll`], so a
//! quadrant whose panel is disconnected keeps rotating on schedule and
//! shows the correct slot the moment the panel returns.

use std::time::Duration;

use minstant::Instant;

use crate::config::{AppArgs, Config, Scope, SlotConfig};
use crate::frame::Quadrant;

/// One entry of a quadrant's rotation, resolved from the configuration.
#[derive(Debug, Clone)]
pub struct AppSlot {
    pub app: String,
    pub args: AppArgs,
    duration: Option<Duration>,
    pub animate: bool,
    pub scope: Scope,
}

impl AppSlot {
    fn from_config(slot: &SlotConfig) -> Self {
        Self {
            app: slot.app.clone(),
            args: slot.args.clone(),
            duration: slot.duration.map(Duration::from_secs_f64),
            animate: slot.animate,
            scope: slot.scope,
        }
    }

    fn effective_duration(&self, default: Duration) -> Duration {
        self.duration.unwrap_or(default)
    }
}

/// The slot a poll resolved to.
pub struct Active<'a> {
    pub slot: &'a AppSlot,
    /// True when this poll advanced the rotation (including the first poll),
    /// telling the caller to reissue the slot's animation state.
    pub switched: bool,
}

/// Rotates one quadrant's slot list on wall-clock dwell times.
#[derive(Debug)]
pub struct QuadrantScheduler {
    slots: Vec<AppSlot>,
    index: usize,
    last_switch: Instant,
    first_poll: bool,
    default_duration: Duration,
}

impl QuadrantScheduler {
    /// Scheduler over `quadrant`'s configured slots. `None` when the
    /// quadrant has no slots; it then stays dark.
    #[must_use]
    pub fn from_config(config: &Config, quadrant: Quadrant, now: Instant) -> Option<Self> {
        let slots: Vec<AppSlot> = config
            .slots(quadrant)
            .iter()
            .map(AppSlot::from_config)
            .collect();
        if slots.is_empty() {
            return None;
        }
        Some(Self {
            slots,
            index: 0,
            last_switch: now,
            first_poll: true,
            default_duration: config.default_slot_duration(),
        })
    }

    /// Resolve the active slot at `now`, advancing the rotation if the
    /// current slot's dwell time has elapsed.
    pub fn poll(&mut self, now: Instant) -> Active<'_> {
        let mut switched = std::mem::take(&mut self.first_poll);
        let dwell = self.slots[self.index].effective_duration(self.default_duration);
        if self.slots.len() > 1 && now.duration_since(self.last_switch) >= dwell {
            self.index = (self.index + 1) % self.slots.len();
            self.last_switch = now;
            switched = true;
        }
        Active {
            slot: &self.slots[self.index],
            switched,
        }
    }
}
