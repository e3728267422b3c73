//! Frame grid and panel geometry.
//!
//! A panel is a 9x34 LED matrix, mounted tall: 9 physical columns across,
//! 34 rows down. The wire protocol stages one *row* at a time, where a wire
//! row is one of the 9 stripes of 34 intensity bytes. To keep drawing code
//! aligned with the wire, a [`Frame`] is indexed as `(row, col)` with
//! `row in 0..9` and `col in 0..34`.
//!
//! Each panel is split vertically into two quadrants of 9x17 cells. The four
//! quadrants across both panels are the unit of content scheduling.

/// Wire rows per panel (stripes of intensity bytes).
pub const ROWS: usize = 9;
/// Cells per wire row.
pub const COLS: usize = 34;
/// Cells per wire row belonging to one quadrant.
pub const QUAD_COLS: usize = 17;

/// One physical panel, addressed by its own serial connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Panel {
    Left,
    Right,
}

impl Panel {
    /// Both panels, in deterministic left-to-right order.
    pub const ALL: [Self; 2] = [Self::Left, Self::Right];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
        }
    }
}

impl std::fmt::Display for Panel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// One of the four logical display regions.
///
/// `Top*` quadrants cover columns `0..17`, `Bottom*` quadrants `17..34`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quadrant {
    TopLeft,
    BottomLeft,
    TopRight,
    BottomRight,
}

impl Quadrant {
    /// All quadrants, grouped by panel.
    pub const ALL: [Self; 4] = [
        Self::TopLeft,
        Self::BottomLeft,
        Self::TopRight,
        Self::BottomRight,
    ];

    /// The panel this quadrant lives on.
    #[must_use]
    pub const fn panel(self) -> Panel {
        match self {
            Self::TopLeft | Self::BottomLeft => Panel::Left,
            Self::TopRight | Self::BottomRight => Panel::Right,
        }
    }

    /// Column offset of this quadrant within its panel's frame.
    #[must_use]
    pub const fn col_offset(self) -> usize {
        match self {
            Self::TopLeft | Self::TopRight => 0,
            Self::BottomLeft | Self::BottomRight => QUAD_COLS,
        }
    }

    /// The two quadrants of `panel`, top first.
    #[must_use]
    pub const fn on_panel(panel: Panel) -> [Self; 2] {
        match panel {
            Panel::Left => [Self::TopLeft, Self::BottomLeft],
            Panel::Right => [Self::TopRight, Self::BottomRight],
        }
    }

    /// Configuration key for this quadrant.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::TopLeft => "top-left",
            Self::BottomLeft => "bottom-left",
            Self::TopRight => "top-right",
            Self::BottomRight => "bottom-right",
        }
    }
}

impl std::fmt::Display for Quadrant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Full intensity grid for one panel at one point in time.
///
/// Mutable accumulator painted in place during one tick, then moved into a
/// panel worker's queue. Ownership transfer is the only cross-thread data
/// flow for pixel data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    data: [[u8; COLS]; ROWS],
}

impl Default for Frame {
    fn default() -> Self {
        Self::new()
    }
}

impl Frame {
    /// A dark frame.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            data: [[0; COLS]; ROWS],
        }
    }

    /// Intensity at `(row, col)`.
    ///
    /// # Panics
    /// Panics if out of bounds; all callers work in fixed panel geometry.
    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> u8 {
        self.data[row][col]
    }

    /// Set the intensity at `(row, col)`.
    pub fn set(&mut self, row: usize, col: usize, value: u8) {
        self.data[row][col] = value;
    }

    /// One wire row of 34 intensity bytes.
    #[must_use]
    pub fn row(&self, row: usize) -> &[u8; COLS] {
        &self.data[row]
    }

    /// Paint a span of one wire row.
    pub fn fill_row(&mut self, row: usize, cols: std::ops::Range<usize>, value: u8) {
        for col in cols {
            self.data[row][col] = value;
        }
    }

    /// Paint a span of one column across wire rows.
    pub fn fill_col(&mut self, col: usize, rows: std::ops::Range<usize>, value: u8) {
        for row in rows {
            self.data[row][col] = value;
        }
    }

    /// Total number of lit (non-zero) cells.
    #[must_use]
    pub fn lit_count(&self) -> usize {
        self.data
            .iter()
            .flat_map(|row| row.iter())
            .filter(|&&v| v > 0)
            .count()
    }
}
