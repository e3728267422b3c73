//! Layout primitives: metric values to lit pixels, plus region separators.
//!
//! All functions paint directly into a shared [`Frame`]; last writer wins.
//! Content is painted first and borders after, so separators stay crisp when
//! a fill slightly overruns its region. Every write passes through
//! [`clamp8`], keeping wire values in `[0, 255]` even when intermediate
//! arithmetic (the charge glow pulse) overshoots.
//!
//! Geometry is expressed relative to a quadrant's column offset `q` (0 or
//! 17), so any app can be scheduled into any quadrant.

use crate::frame::{Frame, COLS, QUAD_COLS, ROWS};
use crate::render::patterns::{
    self, Letter, BOLT_COLS, BOLT_ROWS, LETTER_COLS, LETTER_ROWS, SPIRAL,
};

/// Seconds per low-battery blink interval; the indicator is suppressed
/// during the first half of each interval.
const BATTERY_BLINK_INTERVAL: f64 = 2.0;
/// Battery ratio at or below which the indicator blinks when unplugged.
const BATTERY_LOW_THRESHOLD: f64 = 0.07;
/// Seconds per radian of the charging glow pulse.
const CHARGE_PULSE_TIME: f64 = 3.0;

/// Clamp an intermediate intensity into the byte range.
#[must_use]
pub fn clamp8(value: i32) -> u8 {
    value.clamp(0, 255) as u8
}

/// Map a fill ratio in `[0, 1]` to one of the ten spiral patterns.
#[must_use]
pub fn spiral_index(fill_ratio: f64) -> usize {
    let idx = (fill_ratio * 9.999_999 - 0.5).round_ties_even() as i64;
    idx.clamp(0, 9) as usize
}

/// Paint up to eight fill-ratio values as 3x3 spiral cells.
///
/// Cells are laid out two across and four down the quadrant, filling
/// left-to-right then downward. Values beyond the eighth are ignored.
pub fn draw_spiral_cells(frame: &mut Frame, q: usize, values: &[f64], value: u8) {
    for (i, &v) in values.iter().take(8).enumerate() {
        let row0 = 1 + (i % 2) * 4;
        let col0 = q + 1 + (i / 2) * 4;
        let pattern = &SPIRAL[spiral_index(v)];
        for (pr, line) in pattern.iter().enumerate() {
            for (pc, &lit) in line.iter().enumerate() {
                frame.set(row0 + pr, col0 + pc, if lit { value } else { 0 });
            }
        }
    }
}

/// Paint a 3-wide, 16-long proportional bar.
///
/// `lit = round(48 * ratio)` pixels (ties rounding to even) are distributed
/// over the three stripes starting at `row_offset`; the first `lit % 3`
/// stripes get one extra pixel. Bars grow from the quadrant's near edge, or
/// from the far edge when `at_far_edge` is set (the usual choice for bottom
/// quadrants).
pub fn draw_bar(frame: &mut Frame, q: usize, ratio: f64, value: u8, row_offset: usize, at_far_edge: bool) {
    const BAR_WIDTH: usize = 3;
    const BAR_LENGTH: usize = 16;
    let lit = ((BAR_WIDTH * BAR_LENGTH) as f64 * ratio).round_ties_even() as usize;
    let base = lit / BAR_WIDTH;
    let remainder = lit % BAR_WIDTH;
    for i in 0..BAR_WIDTH {
        let mut count = base;
        if i < remainder {
            count += 1;
        }
        let count = count.min(BAR_LENGTH);
        let row = row_offset + i;
        if at_far_edge {
            frame.fill_row(row, q + QUAD_COLS - 1 - count..q + QUAD_COLS - 1, value);
        } else {
            frame.fill_row(row, q + 1..q + 1 + count, value);
        }
    }
}

/// Paint the two-column memory bar at the head of a quadrant.
pub fn draw_memory(frame: &mut Frame, q: usize, ratio: f64, value: u8) {
    let lit = 7.0 * 2.0 * ratio;
    let bottom = (lit / 2.0).round_ties_even() as usize;
    let top = ((lit - 0.49) / 2.0).round_ties_even() as usize;
    frame.fill_col(q, 1..1 + top.min(7), value);
    frame.fill_col(q + 1, 1..1 + bottom.min(7), value);
}

/// Paint the 7-wide battery indicator with blink and charge-glow effects.
///
/// The bar fills from the quadrant's far edge. When the ratio is at or
/// below the low threshold and the source is unplugged, the indicator is
/// suppressed on alternating half-periods of the blink interval, derived
/// from `now_secs` (wall clock), not stored toggle state. When plugged, the
/// lightning-bolt mask is subtracted with a sine glow pulse; negative
/// results are reflected to positive for a pulsing glow.
pub fn draw_battery(
    frame: &mut Frame,
    q: usize,
    ratio: f64,
    plugged: bool,
    value: u8,
    now_secs: f64,
) {
    if ratio <= BATTERY_LOW_THRESHOLD
        && !plugged
        && now_secs.rem_euclid(BATTERY_BLINK_INTERVAL) < BATTERY_BLINK_INTERVAL / 2.0
    {
        return;
    }
    let lit = (BOLT_COLS as f64 * 7.0 * ratio).round_ties_even() as usize;
    let base = lit / 7;
    let remainder = lit % 7;
    let far = q + QUAD_COLS - 1;
    for i in 0..7 {
        let mut count = base;
        if i < remainder {
            count += 1;
        }
        let count = count.min(BOLT_COLS);
        frame.fill_row(i + 1, far - count..far, value);
    }
    if plugged {
        let pulse = (now_secs / CHARGE_PULSE_TIME).sin();
        let subtract = (f64::from(value) + 10.0 * pulse).round_ties_even() as i32;
        let col0 = far - BOLT_COLS;
        for row in 0..BOLT_ROWS {
            for col in 0..BOLT_COLS {
                if patterns::bolt_covers(row, col) {
                    let mut cell = i32::from(frame.get(row + 1, col0 + col)) - subtract;
                    if cell < 0 {
                        cell = -cell;
                    }
                    frame.set(row + 1, col0 + col, clamp8(cell));
                }
            }
        }
    }
}

/// Separators for the 2x4 spiral-cell sub-grid.
pub fn border_grid(frame: &mut Frame, q: usize, value: u8) {
    frame.fill_row(4, q..q + QUAD_COLS - 1, value);
    for k in 1..=4 {
        frame.fill_col(q + 4 * k, 0..ROWS, value);
    }
}

/// Separator for side-by-side bar apps: a lengthwise split plus the
/// quadrant's far partition.
pub fn border_split(frame: &mut Frame, q: usize, value: u8) {
    frame.fill_row(4, q..q + QUAD_COLS, value);
    frame.fill_col(q + QUAD_COLS - 1, 0..ROWS, value);
}

/// Separators for paired apps (memory + battery): a partition after the
/// two-column head plus the quadrant's far partition.
pub fn border_pair(frame: &mut Frame, q: usize, value: u8) {
    frame.fill_col(q + 2, 0..ROWS, value);
    frame.fill_col(q + QUAD_COLS - 1, 0..ROWS, value);
}

/// Whole-panel outline, also used by the identification overlay.
pub fn border_outline(frame: &mut Frame, value: u8) {
    frame.fill_row(0, 0..COLS, value);
    frame.fill_row(ROWS - 1, 0..COLS, value);
    frame.fill_col(0, 0..ROWS, value);
    frame.fill_col(COLS - 1, 0..ROWS, value);
}

/// Paint a letterform centered in one quadrant.
pub fn draw_letter(frame: &mut Frame, q: usize, letter: Letter, value: u8) {
    let row0 = (ROWS - LETTER_ROWS) / 2;
    let col0 = q + (QUAD_COLS - LETTER_COLS) / 2;
    blit_letter(frame, letter, row0, col0, value);
}

/// Paint a letterform centered on the whole panel (panel-scope apps).
pub fn draw_letter_panel(frame: &mut Frame, letter: Letter, value: u8) {
    let row0 = (ROWS - LETTER_ROWS) / 2;
    let col0 = (COLS - LETTER_COLS) / 2;
    blit_letter(frame, letter, row0, col0, value);
}

fn blit_letter(frame: &mut Frame, letter: Letter, row0: usize, col0: usize, value: u8) {
    for col in 0..LETTER_COLS {
        for row in 0..LETTER_ROWS {
            if letter.covers(row, col) {
                frame.set(row0 + row, col0 + col, value);
            }
        }
    }
}
