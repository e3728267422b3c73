//! Frame painting: layout primitives, fill patterns, and icon overlay.

pub mod draw;
pub mod icon;
pub mod patterns;
