//! Terminal UI components
//!
//! Built with ratatui. Keyboard-first navigation throughout.

pub mod menu;
pub mod theme;

pub use menu::render;
pub use theme::Theme;
