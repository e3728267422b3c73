//! Pre-rendered icon loading and overlay.
//!
//! Icons are produced offline by the rendering tooling and stored as JSON
//! 2-D byte arrays at `<dir>/<name>/static.json`. The library searches a
//! fixed list of directories (repo-local first, then the XDG data dir) and
//! caches loads for the lifetime of the process.

use std::collections::HashMap;
use std::path::PathBuf;

use thiserror::Error;

use crate::frame::{Frame, COLS, ROWS};

/// Icon lookup or decode failure.
#[derive(Debug, Error)]
pub enum IconError {
    /// No search directory held the icon. Lists every location attempted.
    #[error("icon '{name}' not found; searched {searched:?}")]
    NotFound { name: String, searched: Vec<PathBuf> },
    /// The icon file existed but could not be read or decoded.
    #[error("icon '{name}' at {path}: {source}")]
    Unreadable {
        name: String,
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// The decoded array was empty or ragged.
    #[error("icon '{name}' at {path} has inconsistent dimensions")]
    BadShape { name: String, path: PathBuf },
}

/// A small intensity grid overlayed onto frames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Icon {
    rows: usize,
    cols: usize,
    data: Vec<u8>,
}

impl Icon {
    /// Build an icon from a row-major 2-D byte array.
    ///
    /// Returns `None` if the array is empty or ragged.
    #[must_use]
    pub fn from_grid(grid: Vec<Vec<u8>>) -> Option<Self> {
        let rows = grid.len();
        let cols = grid.first()?.len();
        if cols == 0 || grid.iter().any(|line| line.len() != cols) {
            return None;
        }
        let data = grid.into_iter().flatten().collect();
        Some(Self { rows, cols, data })
    }

    #[must_use]
    pub const fn rows(&self) -> usize {
        self.rows
    }

    #[must_use]
    pub const fn cols(&self) -> usize {
        self.cols
    }

    fn get(&self, row: usize, col: usize) -> u8 {
        self.data[row * self.cols + col]
    }
}

/// Anchor for icon placement on a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Anchor {
    #[default]
    Center,
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

/// Overlay `icon` onto `frame` at `anchor`, scaled by `opacity`.
///
/// Opacity scaling truncates to integer before the write. If the icon is
/// larger than the frame in either dimension, the overlay is skipped
/// entirely; this never panics.
pub fn overlay_icon(frame: &mut Frame, icon: &Icon, anchor: Anchor, opacity: f64) {
    if icon.rows() > ROWS || icon.cols() > COLS {
        return;
    }
    let (row0, col0) = match anchor {
        Anchor::Center => ((ROWS - icon.rows()) / 2, (COLS - icon.cols()) / 2),
        Anchor::TopLeft => (0, 0),
        Anchor::TopRight => (0, COLS - icon.cols()),
        Anchor::BottomLeft => (ROWS - icon.rows(), 0),
        Anchor::BottomRight => (ROWS - icon.rows(), COLS - icon.cols()),
    };
    for row in 0..icon.rows() {
        for col in 0..icon.cols() {
            let scaled = (f64::from(icon.get(row, col)) * opacity) as u8;
            frame.set(row0 + row, col0 + col, scaled);
        }
    }
}

/// Loads and caches pre-rendered icons from a set of search directories.
#[derive(Debug)]
pub struct IconLibrary {
    search_dirs: Vec<PathBuf>,
    cache: HashMap<String, Icon>,
}

impl IconLibrary {
    /// Library over the default search locations: `icons/rendered` in the
    /// working directory, then `$XDG_DATA_HOME/led-matrix/icons`, then
    /// `~/.local/share/led-matrix/icons`.
    #[must_use]
    pub fn new() -> Self {
        let mut dirs = vec![PathBuf::from("icons/rendered")];
        if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
            dirs.push(PathBuf::from(xdg).join("led-matrix").join("icons"));
        }
        if let Ok(home) = std::env::var("HOME") {
            dirs.push(
                PathBuf::from(home)
                    .join(".local")
                    .join("share")
                    .join("led-matrix")
                    .join("icons"),
            );
        }
        Self::with_search_dirs(dirs)
    }

    /// Library over an explicit list of search directories.
    #[must_use]
    pub fn with_search_dirs(search_dirs: Vec<PathBuf>) -> Self {
        Self {
            search_dirs,
            cache: HashMap::new(),
        }
    }

    /// Load `name` from the first search directory that has it (cached).
    ///
    /// # Errors
    /// [`IconError::NotFound`] carries the full list of locations tried;
    /// a present-but-broken file is reported as is, not silently skipped.
    pub fn load(&mut self, name: &str) -> Result<&Icon, IconError> {
        if !self.cache.contains_key(name) {
            let icon = self.load_uncached(name)?;
            self.cache.insert(name.to_owned(), icon);
        }
        Ok(&self.cache[name])
    }

    fn load_uncached(&self, name: &str) -> Result<Icon, IconError> {
        let mut searched = Vec::with_capacity(self.search_dirs.len());
        for dir in &self.search_dirs {
            let path = dir.join(name).join("static.json");
            if !path.exists() {
                searched.push(path);
                continue;
            }
            let text = std::fs::read_to_string(&path).map_err(|e| IconError::Unreadable {
                name: name.to_owned(),
                path: path.clone(),
                source: Box::new(e),
            })?;
            let grid: Vec<Vec<u8>> =
                serde_json::from_str(&text).map_err(|e| IconError::Unreadable {
                    name: name.to_owned(),
                    path: path.clone(),
                    source: Box::new(e),
                })?;
            return Icon::from_grid(grid).ok_or(IconError::BadShape {
                name: name.to_owned(),
                path,
            });
        }
        Err(IconError::NotFound {
            name: name.to_owned(),
            searched,
        })
    }
}

impl Default for IconLibrary {
    fn default() -> Self {
        Self::new()
    }
}
