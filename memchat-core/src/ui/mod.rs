//! Terminal rendering helpers shared by the binary

pub mod ansi;
pub mod spinner;

pub use ansi::{AnsiRenderer, MessageStyle, color_enabled, preview};
pub use spinner::Spinner;
