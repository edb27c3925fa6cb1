//! RGB colors and console styling.

use owo_colors::{style, OwoColorize, Style};

/// Styles of the operator console.
#[derive(Debug, Clone, Copy)]
pub struct ConsoleStyles {
    /// The `>>>` in front of prompts.
    pub prompt: Style,
    /// `PASS:` marker.
    pub pass: Style,
    /// `FAIL:` marker.
    pub fail: Style,
    /// Interrupt notice.
    pub interrupt: Style,
}

impl Default for ConsoleStyles {
    fn default() -> Self {
        Self {
            prompt: style().yellow(),
            pass: style().green(),
            fail: style().bold().red(),
            interrupt: style().bright_black(),
        }
    }
}

/// Render `text` in `style`.
pub fn paint(text: &str, style: Style) -> String {
    text.style(style).to_string()
}

/// An RGB color with a display name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
    /// Name shown to the operator and used in check names.
    pub name: &'static str,
}

impl Color {
    /// White LED.
    pub const WHITE: Color = Color::named(255, 255, 255, "white");
    /// Red LED.
    pub const RED: Color = Color::named(255, 0, 0, "red");
    /// Green LED.
    pub const GREEN: Color = Color::named(0, 255, 0, "green");
    /// Blue LED.
    pub const BLUE: Color = Color::named(0, 0, 255, "blue");
    /// LED off.
    pub const OFF: Color = Color::named(0, 0, 0, "off");

    /// Unnamed color.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::named(r, g, b, "")
    }

    /// Named color.
    pub const fn named(r: u8, g: u8, b: u8, name: &'static str) -> Self {
        Self { r, g, b, name }
    }

    /// `0xRRGGBB` encoding sent to the device.
    pub fn hex(&self) -> u32 {
        u32::from(self.r) << 16 | u32::from(self.g) << 8 | u32::from(self.b)
    }

    /// Console style of the name: the primaries in their own color.
    pub fn style(&self) -> Style {
        match (self.r, self.g, self.b) {
            (255, 255, 255) => style().bold().white(),
            (255, 0, 0) => style().red(),
            (0, 255, 0) => style().green(),
            (0, 0, 255) => style().blue(),
            _ => style(),
        }
    }

    /// The name wrapped in the color's style.
    pub fn formatted_name(&self) -> String {
        paint(self.name, self.style())
    }
}
