//! Ayu color theme and styling functions for corollary CLI output.
//!
//! Uses the Ayu Dark color palette.
//! Color source: <https://github.com/ayu-theme/ayu-colors>
//!
//! Group and module scopes get a color each; global stays uncolored.

use corollary_core::CommandScope;
use owo_colors::OwoColorize;

use crate::terminal::supports_color;

// ---------------------------------------------------------------------------
// Ayu Dark color palette (RGB values)
// ---------------------------------------------------------------------------

const PASS: (u8, u8, u8) = (0xc2, 0xd9, 0x4c); // #c2d94c - bright green
const WARN: (u8, u8, u8) = (0xff, 0xb4, 0x54); // #ffb454 - bright yellow
const MUTED: (u8, u8, u8) = (0x6c, 0x76, 0x80); // #6c7680 - muted gray
const ACCENT: (u8, u8, u8) = (0x59, 0xc2, 0xff); // #59c2ff - bright blue

// Scope colors
const SCOPE_GROUP: (u8, u8, u8) = (0xd2, 0xa6, 0xff); // #d2a6ff - purple
const SCOPE_MODULE: (u8, u8, u8) = (0x95, 0xe6, 0xcb); // #95e6cb - teal

// General icons
pub const ICON_PASS: &str = "\u{2713}"; // ✓
pub const ICON_WARN: &str = "\u{26A0}"; // ⚠

// ---------------------------------------------------------------------------
// Helper: apply truecolor only when color is supported
// ---------------------------------------------------------------------------

fn color_str(s: &str, rgb: (u8, u8, u8)) -> String {
    if supports_color() {
        s.truecolor(rgb.0, rgb.1, rgb.2).to_string()
    } else {
        s.to_string()
    }
}

fn color_bold_str(s: &str, rgb: (u8, u8, u8)) -> String {
    if supports_color() {
        s.truecolor(rgb.0, rgb.1, rgb.2).bold().to_string()
    } else {
        s.to_string()
    }
}

// ---------------------------------------------------------------------------
// Core semantic render helpers
// ---------------------------------------------------------------------------

/// Renders text with muted (gray) styling.
pub fn render_muted(s: &str) -> String {
    color_str(s, MUTED)
}

/// Renders text with accent (blue) styling.
pub fn render_accent(s: &str) -> String {
    color_str(s, ACCENT)
}

/// Renders a category header in uppercase with accent color and bold.
pub fn render_category(s: &str) -> String {
    color_bold_str(&s.to_uppercase(), ACCENT)
}

pub fn render_pass_icon() -> String {
    color_str(ICON_PASS, PASS)
}

pub fn render_warn_icon() -> String {
    color_str(ICON_WARN, WARN)
}

// ---------------------------------------------------------------------------
// Scope rendering
// ---------------------------------------------------------------------------

/// Renders `s` in the color of `scope`: global in standard text, group and
/// module colored.
pub fn render_in_scope(s: &str, scope: CommandScope) -> String {
    match scope {
        CommandScope::Global => s.to_string(),
        CommandScope::Group => color_str(s, SCOPE_GROUP),
        CommandScope::Module => color_str(s, SCOPE_MODULE),
    }
}

/// Renders a formula line number, right-aligned and muted.
pub fn render_line_number(line: usize) -> String {
    render_muted(&format!("{line:>4}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    // NO_COLOR may or may not be set; only check the text survives styling.

    #[test]
    fn scope_rendering_keeps_text() {
        for scope in CommandScope::ALL {
            assert!(render_in_scope("[ENTRY]", scope).contains("[ENTRY]"));
        }
        assert_eq!(render_in_scope("[GLOBAL]", CommandScope::Global), "[GLOBAL]");
    }

    #[test]
    fn line_numbers_are_right_aligned() {
        assert!(render_line_number(7).contains("   7"));
    }

    #[test]
    fn category_is_uppercase() {
        assert!(render_category("commands").contains("COMMANDS"));
    }
}
