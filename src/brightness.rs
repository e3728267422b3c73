//! Ambient brightness to panel intensity mapping.
//!
//! A normalized ambient brightness is mapped linearly into two byte ranges:
//! a narrow one for separators and a wider one for metric fills. The same
//! two intensities are reused for every paint call in a tick.

/// Separator intensity range.
const BACKGROUND_MIN: f64 = 8.0;
const BACKGROUND_MAX: f64 = 20.0;
/// Fill intensity range.
const FOREGROUND_MIN: f64 = 30.0;
const FOREGROUND_MAX: f64 = 110.0;

/// The two intensities used for all paint calls in one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Intensities {
    pub background: u8,
    pub foreground: u8,
}

/// Map normalized ambient brightness into separator and fill intensities.
///
/// Inputs outside `[0, 1]` are clamped first, so the outputs always stay in
/// their configured byte ranges.
#[must_use]
pub fn map_brightness(ambient: f64) -> Intensities {
    let b = if ambient.is_finite() {
        ambient.clamp(0.0, 1.0)
    } else {
        0.0
    };
    Intensities {
        background: lerp(b, BACKGROUND_MIN, BACKGROUND_MAX),
        foreground: lerp(b, FOREGROUND_MIN, FOREGROUND_MAX),
    }
}

fn lerp(ratio: f64, min: f64, max: f64) -> u8 {
    (ratio * (max - min) + min).clamp(0.0, 255.0) as u8
}

/// Source of normalized ambient display brightness.
///
/// Sampling backends live outside this crate; the control loop only reads
/// a fraction per tick.
pub trait BrightnessSource: Send {
    fn ambient(&self) -> f64;
}

/// A constant brightness, for headless setups and tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedBrightness(pub f64);

impl BrightnessSource for FixedBrightness {
    fn ambient(&self) -> f64 {
        self.0
    }
}
