//! ID-reveal hot-key state.
//!
//! The reveal combination (a designated modifier plus a letter key) is
//! watched by input-capture listener threads outside this crate. Each
//! listener owns a [`ComboFlags`] and flips it as the combination is held
//! or released; the control loop samples all flags once per tick. The mode
//! is active when *any* source reports the combination held; the
//! redundancy covers backend availability, not correctness.
//!
//! [`RevealHotkey`] also latches activation so the tick after release can
//! retrigger animations that were paused under the overlay.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Held/released state for one input-capture backend.
///
/// Written from the listener thread, read from the control loop.
#[derive(Debug, Default)]
pub struct ComboFlags {
    held: AtomicBool,
}

impl ComboFlags {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Called by the listener thread on key events.
    pub fn set_held(&self, held: bool) {
        self.held.store(held, Ordering::Relaxed);
    }

    #[must_use]
    pub fn is_held(&self) -> bool {
        self.held.load(Ordering::Relaxed)
    }
}

/// Per-tick reveal state, as seen by the control loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reveal {
    /// Overlay off, and it was not showing last tick.
    Inactive,
    /// Overlay on: suppress content, render identification glyphs.
    Active,
    /// Overlay just turned off: retrigger paused animations once.
    Released,
}

/// Samples the combo flags and tracks the release latch.
#[derive(Debug, Default)]
pub struct RevealHotkey {
    sources: Vec<Arc<ComboFlags>>,
    latched: bool,
}

impl RevealHotkey {
    #[must_use]
    pub fn new(sources: Vec<Arc<ComboFlags>>) -> Self {
        Self {
            sources,
            latched: false,
        }
    }

    /// Sample all sources once; called exactly once per tick.
    pub fn poll(&mut self) -> Reveal {
        let active = self.sources.iter().any(|flags| flags.is_held());
        if active {
            self.latched = true;
            Reveal::Active
        } else if self.latched {
            self.latched = false;
            Reveal::Released
        } else {
            Reveal::Inactive
        }
    }
}
