//! Hand-authored fill patterns, masks, and identification letterforms.

/// Ten 3x3 fill patterns approximating a progressively filling dial.
///
/// Pattern `k` lights `k` cells, added clockwise around the perimeter from
/// the top-left corner with the center cell last. Indexed by
/// [`crate::render::draw::spiral_index`].
pub const SPIRAL: [[[bool; 3]; 3]; 10] = [
    [
        [false, false, false],
        [false, false, false],
        [false, false, false],
    ],
    [
        [true, false, false],
        [false, false, false],
        [false, false, false],
    ],
    [
        [true, true, false],
        [false, false, false],
        [false, false, false],
    ],
    [
        [true, true, true],
        [false, false, false],
        [false, false, false],
    ],
    [
        [true, true, true],
        [false, false, true],
        [false, false, false],
    ],
    [
        [true, true, true],
        [false, false, true],
        [false, false, true],
    ],
    [
        [true, true, true],
        [false, false, true],
        [false, true, true],
    ],
    [
        [true, true, true],
        [false, false, true],
        [true, true, true],
    ],
    [
        [true, true, true],
        [true, false, true],
        [true, true, true],
    ],
    [
        [true, true, true],
        [true, true, true],
        [true, true, true],
    ],
];

/// Lightning-bolt mask for the charging indicator.
///
/// 13 lines down the battery region, 7 cells across. `#` marks a cell the
/// bolt subtracts from the painted battery bar.
const BOLT: [&str; 13] = [
    "...##..", "...##..", "..##...", "..##...", ".####..", ".#####.", "..###..", "...##..",
    "..##...", "..##...", ".##....", ".##....", "##.....",
];

/// Height of the bolt mask in panel columns.
pub const BOLT_COLS: usize = 13;
/// Width of the bolt mask in wire rows.
pub const BOLT_ROWS: usize = 7;

/// Whether the bolt mask covers `(row, col)` of the battery region.
#[must_use]
pub fn bolt_covers(row: usize, col: usize) -> bool {
    BOLT[col].as_bytes()[row] == b'#'
}

/// A 5x7 identification letterform.
///
/// Stored as 7 lines down the panel, 5 cells across.
#[derive(Debug, Clone, Copy)]
pub struct Letter {
    lines: [&'static str; 7],
}

/// Width of a letterform in wire rows.
pub const LETTER_ROWS: usize = 5;
/// Height of a letterform in panel columns.
pub const LETTER_COLS: usize = 7;

impl Letter {
    /// Whether the letterform covers `(row, col)`.
    #[must_use]
    pub fn covers(&self, row: usize, col: usize) -> bool {
        self.lines[col].as_bytes()[row] == b'#'
    }
}

macro_rules! letter {
    ($($line:literal)*) => {
        Letter { lines: [$($line),*] }
    };
}

/// The identification letterform for an app name, keyed on its first letter.
///
/// Returns `None` for names whose initial has no authored letterform; the
/// ID overlay then omits the glyph for that quadrant.
#[must_use]
pub fn letter_for(name: &str) -> Option<Letter> {
    let initial = name.chars().next()?.to_ascii_uppercase();
    let letter = match initial {
        'B' => letter! {
            "####."
            "#...#"
            "#...#"
            "####."
            "#...#"
            "#...#"
            "####."
        },
        'C' => letter! {
            ".###."
            "#...#"
            "#...."
            "#...."
            "#...."
            "#...#"
            ".###."
        },
        'D' => letter! {
            "####."
            "#...#"
            "#...#"
            "#...#"
            "#...#"
            "#...#"
            "####."
        },
        'F' => letter! {
            "#####"
            "#...."
            "#...."
            "####."
            "#...."
            "#...."
            "#...."
        },
        'M' => letter! {
            "#...#"
            "##.##"
            "#.#.#"
            "#.#.#"
            "#...#"
            "#...#"
            "#...#"
        },
        'N' => letter! {
            "#...#"
            "##..#"
            "##..#"
            "#.#.#"
            "#..##"
            "#..##"
            "#...#"
        },
        'P' => letter! {
            "####."
            "#...#"
            "#...#"
            "####."
            "#...."
            "#...."
            "#...."
        },
        'T' => letter! {
            "#####"
            "..#.."
            "..#.."
            "..#.."
            "..#.."
            "..#.."
            "..#.."
        },
        'U' => letter! {
            "#...#"
            "#...#"
            "#...#"
            "#...#"
            "#...#"
            "#...#"
            ".###."
        },
        _ => return None,
    };
    Some(letter)
}
