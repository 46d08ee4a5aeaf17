// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Named colors and styles for terminal output.
//!
//! Coloring is a process-wide switch, see [`activate_colors`]. When it is
//! off, all helpers return the text unchanged.

use std::sync::atomic::{AtomicBool, Ordering};

use colored::{Color, ColoredString, Colorize};

use crate::uncolored;

#[cfg(test)]
#[path = "./colors_test.rs"]
mod colors_test;

/// Foreground (and background) color names, with their rgb value.
pub const COLORS: &[(&str, Option<(u8, u8, u8)>)] = &[
    ("black", Some((0x00, 0x00, 0x00))),
    ("blue", Some((0x00, 0x00, 0xff))),
    ("brown", Some((0x85, 0x0a, 0x0a))),
    ("gray", Some((0xbe, 0xbe, 0xbe))),
    ("green", Some((0x00, 0xff, 0x00))),
    ("orange", Some((0xef, 0x95, 0x00))),
    ("plain", None),
    ("purple", Some((0xa0, 0x20, 0xf0))),
    ("red", Some((0xff, 0x00, 0x00))),
    ("teal", Some((0x00, 0x80, 0x80))),
    ("white", Some((0xff, 0xff, 0xff))),
    ("yellow", Some((0xff, 0xff, 0x00))),
];

/// Style names.
pub const STYLES: &[&str] = &[
    "blink",
    "bold",
    "dim",
    "invert",
    "italic",
    "strikethrough",
    "underline",
];

static TRUECOLOR: AtomicBool = AtomicBool::new(false);

/// How named colors are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flavor {
    /// The basic 16 ANSI colors, closest match per name.
    Ansi16,
    /// 24-bit colors.
    TrueColor,
}

impl Flavor {
    /// Best flavor supported by the current terminal, as advertised by `COLORTERM`.
    pub fn detect() -> Self {
        match std::env::var("COLORTERM").as_deref() {
            Ok("truecolor") | Ok("24bit") => Flavor::TrueColor,
            _ => Flavor::Ansi16,
        }
    }

    fn current() -> Self {
        if TRUECOLOR.load(Ordering::Relaxed) {
            Flavor::TrueColor
        } else {
            Flavor::Ansi16
        }
    }
}

/// The color named `name`, if there is one. `plain` has no color.
pub fn cast_color(name: &str) -> Option<Color> {
    let (_, rgb) = COLORS.iter().find(|(n, _)| *n == name)?;
    let (r, g, b) = (*rgb)?;
    if Flavor::current() == Flavor::TrueColor {
        return Some(Color::TrueColor { r, g, b });
    }
    Some(match name {
        "black" => Color::Black,
        "blue" => Color::Blue,
        "brown" => Color::Red,
        "gray" => Color::White,
        "green" => Color::Green,
        "orange" => Color::Yellow,
        "purple" => Color::Magenta,
        "red" => Color::BrightRed,
        "teal" => Color::Cyan,
        "white" => Color::BrightWhite,
        _ => Color::BrightYellow,
    })
}

fn styled(text: ColoredString, style: &str) -> Option<ColoredString> {
    Some(match style {
        "blink" => text.blink(),
        "bold" => text.bold(),
        "dim" => text.dimmed(),
        "invert" => text.reversed(),
        "italic" => text.italic(),
        "strikethrough" => text.strikethrough(),
        "underline" => text.underline(),
        _ => return None,
    })
}

/// `text` rendered with color or style `name`.
///
/// Unknown names, `plain`, and coloring being off all leave `text` as-is.
pub fn colored(text: &str, name: &str) -> String {
    if text.is_empty() || !is_coloring() {
        return text.to_string();
    }
    if let Some(color) = cast_color(name) {
        return text.color(color).to_string();
    }
    styled(text.normal(), name)
        .map(|s| s.to_string())
        .unwrap_or_else(|| text.to_string())
}

/// `text` with background color `name`.
pub fn colored_bg(text: &str, name: &str) -> String {
    if text.is_empty() || !is_coloring() {
        return text.to_string();
    }
    match cast_color(name) {
        Some(color) => text.on_color(color).to_string(),
        None => text.to_string(),
    }
}

/// True if coloring is currently on.
pub fn is_coloring() -> bool {
    colored::control::SHOULD_COLORIZE.should_colorize()
}

/// Turn coloring on or off, `None` enables it when stdout is a terminal.
///
/// Returns the previous state.
pub fn activate_colors(enable: Option<bool>) -> bool {
    let previous = is_coloring();
    let enable = enable.unwrap_or_else(|| {
        crate::is_stdout_tty() && std::env::var_os("NO_COLOR").is_none()
    });
    if enable {
        TRUECOLOR.store(Flavor::detect() == Flavor::TrueColor, Ordering::Relaxed);
    }
    colored::control::set_override(enable);
    previous
}

/// Coloring forced on or off until dropped.
#[derive(Debug)]
pub struct ActivateColors {
    previous: bool,
}

impl ActivateColors {
    pub fn new(enable: bool) -> Self {
        Self {
            previous: activate_colors(Some(enable)),
        }
    }
}

impl Drop for ActivateColors {
    fn drop(&mut self) {
        colored::control::set_override(self.previous);
    }
}

/// `size` adjusted to account for the ANSI escapes in `text`, useful for padding.
pub fn adjusted_size(text: &str, size: usize) -> usize {
    size + text.chars().count() - uncolored(text).chars().count()
}

macro_rules! named_renderers {
    ($($name:ident),* $(,)?) => {
        $(
            #[doc = concat!("`text` rendered in ", stringify!($name), ".")]
            pub fn $name(text: &str) -> String {
                colored(text, stringify!($name))
            }
        )*
    };
}

named_renderers!(
    black, blue, brown, gray, green, orange, purple, red, teal, white, yellow, blink, bold, dim,
    invert, italic, strikethrough, underline,
);
