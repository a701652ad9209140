//! Colour theme for the library menu
//!
//! A dark "house lights down" palette: velvet red for chrome, brass for the
//! cursor, warm white for text.

use ratatui::style::{Color, Style, Stylize};

/// Menu colour palette
pub struct Theme;

impl Theme {
    /// #120c0e, near-black with a warm cast
    pub const BACKGROUND: Color = Color::Rgb(0x12, 0x0c, 0x0e);
    /// #d94a4a, velvet red
    pub const PRIMARY: Color = Color::Rgb(0xd9, 0x4a, 0x4a);
    /// #e8b94a, brass
    pub const HIGHLIGHT: Color = Color::Rgb(0xe8, 0xb9, 0x4a);
    /// #efe6dc, warm white
    pub const TEXT: Color = Color::Rgb(0xef, 0xe6, 0xdc);
    pub const DIM: Color = Color::Rgb(0x7a, 0x6a, 0x66);
    pub const ERROR: Color = Color::Rgb(0xff, 0x5f, 0x5f);
    pub const BORDER: Color = Color::Rgb(0x5c, 0x2a, 0x2e);

    /// Whole-screen base
    pub fn text() -> Style {
        Style::new().fg(Self::TEXT).bg(Self::BACKGROUND)
    }

    pub fn title() -> Style {
        Style::new().fg(Self::PRIMARY).bold()
    }

    pub fn breadcrumb() -> Style {
        Style::new().fg(Self::TEXT)
    }

    pub fn dimmed() -> Style {
        Style::new().fg(Self::DIM)
    }

    pub fn border() -> Style {
        Style::new().fg(Self::BORDER)
    }

    pub fn list_item() -> Style {
        Self::breadcrumb()
    }

    /// Cursor row
    pub fn list_item_selected() -> Style {
        Style::new().fg(Self::BACKGROUND).bg(Self::HIGHLIGHT).bold()
    }

    pub fn keybind() -> Style {
        Style::new().fg(Self::HIGHLIGHT).bold()
    }

    pub fn status() -> Style {
        Style::new().fg(Self::TEXT).bg(Self::BORDER)
    }

    pub fn error() -> Style {
        Style::new().fg(Self::ERROR).bold()
    }
}

/// WCAG relative luminance of an RGB colour; other colour kinds have none
pub fn luminance(color: Color) -> Option<f64> {
    let Color::Rgb(r, g, b) = color else {
        return None;
    };
    let linear = |channel: u8| {
        let v = f64::from(channel) / 255.0;
        if v <= 0.03928 {
            v / 12.92
        } else {
            ((v + 0.055) / 1.055).powf(2.4)
        }
    };
    Some(0.2126 * linear(r) + 0.7152 * linear(g) + 0.0722 * linear(b))
}

/// WCAG contrast ratio of two RGB colours, between 1 and 21
pub fn contrast(a: Color, b: Color) -> Option<f64> {
    let (la, lb) = (luminance(a)?, luminance(b)?);
    Some((la.max(lb) + 0.05) / (la.min(lb) + 0.05))
}
