// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Plain text tables, with configurable borders and column alignment.
//!
//! ```
//! use runez::render::{PrettyBorder, PrettyTable};
//!
//! let mut table = PrettyTable::with_header(["Name", "Size"]);
//! table.border = "github".parse::<PrettyBorder>().unwrap();
//! table.add_row(["foo", "10"]);
//! assert_eq!(table.to_string(), "| Name | Size |\n-------|-------\n| foo  | 10   |");
//! ```

use std::fmt::Display;
use std::str::FromStr;

use crate::{Error, Result, colored, short_to};

#[cfg(test)]
#[path = "./render_test.rs"]
mod render_test;

/// Border definitions that can be referred to by name.
///
/// Each definition is a comma separated list of `<line>:<chars>`, where
/// `<line>` is one of `t` (top), `m` (between rows), `b` (bottom), `c` (cell),
/// `h` (under header) or `hc` (header cells), and `<chars>` gives the
/// first, mid, last and horizontal characters, in that order.
pub const NAMED_BORDERS: &[(&str, &str)] = &[
    ("ascii", "rstgrid,t:+++=,m:+++-"),
    ("compact", "c:   ,h:   -"),
    ("colon", "c: : ,h: : -"),
    ("dots", "t:....,b::::.,c::::,h:.:.."),
    ("empty", ""),
    ("framed", "t:┍┯┑━,m:┝┿┥━,b:┕┷┙━,c:│││,h:╞╪╡═"),
    ("github", "h:-|--,c:|||"),
    ("mysql", "t:+++-,b:+++-,c:|||"),
    ("reddit", "h:-|--,c: | "),
    ("rst", "t:  ==,b:  ==,c:  "),
    ("rstgrid", "mysql,h:+++="),
];

/// Horizontal alignment of cell text.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    #[default]
    Left,
    Center,
    Right,
}

impl Align {
    /// `text` padded with spaces to `width` visible chars.
    pub fn aligned(&self, text: &str, width: usize) -> String {
        let fill = width.saturating_sub(console::measure_text_width(text));
        let (left, right) = match self {
            Align::Left => (0, fill),
            Align::Center => (fill / 2, fill - fill / 2),
            Align::Right => (fill, 0),
        };
        format!("{}{text}{}", " ".repeat(left), " ".repeat(right))
    }
}

impl FromStr for Align {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "left" => Ok(Align::Left),
            "center" => Ok(Align::Center),
            "right" => Ok(Align::Right),
            _ => Err(Error::ValidationFailed(format!(
                "Invalid horizontal alignment '{s}'"
            ))),
        }
    }
}

/// Characters used to draw one line of a table.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BorderChars {
    pub first: String,
    pub mid: String,
    pub last: String,
    /// Horizontal filler, used by separator lines only
    pub h: String,
}

impl From<&str> for BorderChars {
    fn from(text: &str) -> Self {
        let mut chars = text.chars().map(String::from);
        Self {
            first: chars.next().unwrap_or_default(),
            mid: chars.next().unwrap_or_default(),
            last: chars.next().unwrap_or_default(),
            h: chars.next().unwrap_or_default(),
        }
    }
}

/// Border of a [`PrettyTable`], parsed from a named border or a
/// `<line>:<chars>` list, see [`NAMED_BORDERS`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrettyBorder {
    pub top: Option<BorderChars>,
    pub mid: Option<BorderChars>,
    pub bottom: Option<BorderChars>,
    pub cell: BorderChars,
    pub header: Option<BorderChars>,
    pub header_cell: Option<BorderChars>,
    /// Spaces on each side of cell text
    pub pad: usize,
}

impl Default for PrettyBorder {
    fn default() -> Self {
        Self {
            top: None,
            mid: None,
            bottom: None,
            cell: BorderChars::default(),
            header: None,
            header_cell: None,
            pad: 1,
        }
    }
}

impl PrettyBorder {
    fn apply(&mut self, text: &str) -> Result<()> {
        for part in text.split(',').filter(|p| !p.is_empty()) {
            if let Some((_, definition)) = NAMED_BORDERS.iter().find(|(name, _)| *name == part) {
                self.apply(definition)?;
                continue;
            }
            let Some((key, value)) = part.split_once(':') else {
                return Err(Error::ValidationFailed(format!("Invalid border '{part}'")));
            };
            let chars = Some(BorderChars::from(value));
            match key {
                "t" => self.top = chars,
                "m" => self.mid = chars,
                "b" => self.bottom = chars,
                "c" => self.cell = BorderChars::from(value),
                "h" => self.header = chars,
                "hc" => self.header_cell = chars,
                "pad" => {
                    self.pad = value.trim().parse().map_err(|_| {
                        Error::ValidationFailed(format!("Invalid border pad '{value}'"))
                    })?;
                }
                _ => {
                    return Err(Error::ValidationFailed(format!(
                        "Invalid border line '{key}'"
                    )));
                }
            }
        }
        Ok(())
    }
}

impl FromStr for PrettyBorder {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut border = PrettyBorder::default();
        border.apply(s)?;
        Ok(border)
    }
}

/// A column of a [`PrettyTable`], settings here take precedence over the table's.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrettyColumn {
    pub title: Option<String>,
    pub align: Option<Align>,
    /// Color or style name, see [`crate::colors::colored`]
    pub style: Option<String>,
    pub shown: bool,
}

impl PrettyColumn {
    pub fn new(title: Option<String>) -> Self {
        Self {
            title,
            align: None,
            style: None,
            shown: true,
        }
    }
}

/// A table, rendered as plain text via [`Display`].
#[derive(Debug, Clone)]
pub struct PrettyTable {
    pub columns: Vec<PrettyColumn>,
    pub border: PrettyBorder,
    /// Default alignment of all cells
    pub align: Align,
    /// Default style of all cells
    pub style: Option<String>,
    /// Style of header cells
    pub header_style: Option<String>,
    /// Header is shown when this is set and at least one column has a title
    pub show_header: bool,
    /// Shown for cells missing from a row
    pub missing: String,
    rows: Vec<Vec<String>>,
}

impl Default for PrettyTable {
    fn default() -> Self {
        Self {
            columns: Vec::new(),
            border: PrettyBorder::default(),
            align: Align::Left,
            style: None,
            header_style: None,
            show_header: true,
            missing: "-".to_string(),
            rows: Vec::new(),
        }
    }
}

impl PrettyTable {
    /// Table with `count` untitled columns.
    pub fn new(count: usize) -> Self {
        let mut table = Self::default();
        table.accommodate(count);
        table
    }

    /// Table with one column per title.
    pub fn with_header<I, S>(titles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: titles
                .into_iter()
                .map(|t| PrettyColumn::new(Some(t.into())))
                .collect(),
            ..Self::default()
        }
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Column with given index, added if needed.
    pub fn column_mut(&mut self, index: usize) -> &mut PrettyColumn {
        self.accommodate(index + 1);
        &mut self.columns[index]
    }

    /// Column titled `title`, if any.
    pub fn column_by_title(&mut self, title: &str) -> Option<&mut PrettyColumn> {
        self.columns
            .iter_mut()
            .find(|c| c.title.as_deref() == Some(title))
    }

    /// Ensure the table has at least `count` columns.
    pub fn accommodate(&mut self, count: usize) {
        while self.columns.len() < count {
            self.columns.push(PrettyColumn::new(None));
        }
    }

    pub fn add_row<I, S>(&mut self, values: I)
    where
        I: IntoIterator<Item = S>,
        S: Display,
    {
        let row: Vec<String> = values.into_iter().map(|v| v.to_string()).collect();
        self.accommodate(row.len());
        self.rows.push(row);
    }

    pub fn add_rows<R, I, S>(&mut self, rows: R)
    where
        R: IntoIterator<Item = I>,
        I: IntoIterator<Item = S>,
        S: Display,
    {
        for row in rows {
            self.add_row(row);
        }
    }

    /// Two columns: right-aligned names, and their value shortened to fit in `columns`.
    ///
    /// The border comes from `DIAGNOSTICS_BORDER` when not given, `colon` by default.
    pub fn two_column_diagnostics(
        rows: &[(String, String)],
        border: Option<&str>,
        columns: usize,
    ) -> Result<String> {
        let border = match border {
            Some(border) => border.to_string(),
            None => std::env::var("DIAGNOSTICS_BORDER")
                .ok()
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| "colon".to_string()),
        };
        let mut table = PrettyTable::new(2);
        table.border = border.parse()?;
        table.column_mut(0).align = Some(Align::Right);
        table.column_mut(1).style = Some("bold".to_string());
        let width = rows
            .iter()
            .map(|(k, _)| console::measure_text_width(k))
            .max()
            .unwrap_or_default();
        let size = columns.saturating_sub(width + 5).max(10);
        for (key, value) in rows {
            table.add_row([key.clone(), short_to(value, Some(size))]);
        }
        Ok(table.to_string())
    }

    fn cell_text(&self, column: &PrettyColumn, value: Option<&str>, header: bool) -> String {
        let text = value.unwrap_or(&self.missing);
        let style = if header {
            self.header_style.as_ref().or(column.style.as_ref())
        } else {
            column.style.as_ref()
        };
        match style.or(self.style.as_ref()) {
            Some(style) => colored(text, style),
            None => text.to_string(),
        }
    }

    fn render_line(
        &self,
        lines: &mut Vec<String>,
        chars: Option<&BorderChars>,
        cells: Option<&[String]>,
        widths: &[(usize, Align)],
    ) {
        let Some(chars) = chars else {
            return;
        };
        let padding = " ".repeat(self.border.pad);
        let mut line = String::new();
        for (index, (width, align)) in widths.iter().enumerate() {
            line.push_str(if index == 0 { &chars.first } else { &chars.mid });
            match cells {
                Some(cells) => {
                    line.push_str(&padding);
                    line.push_str(&align.aligned(&cells[index], *width));
                    line.push_str(&padding);
                }
                None => line.push_str(&chars.h.repeat(width + 2 * self.border.pad)),
            }
        }
        line.push_str(&chars.last);
        lines.push(line.trim_end().to_string());
    }
}

impl Display for PrettyTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let shown: Vec<(usize, &PrettyColumn)> = self
            .columns
            .iter()
            .enumerate()
            .filter(|(_, c)| c.shown)
            .collect();
        let header = (self.show_header && shown.iter().any(|(_, c)| c.title.is_some()))
            .then(|| {
                shown
                    .iter()
                    .map(|(_, c)| self.cell_text(c, c.title.as_deref(), true))
                    .collect::<Vec<String>>()
            });
        let rows: Vec<Vec<String>> = self
            .rows
            .iter()
            .map(|row| {
                shown
                    .iter()
                    .map(|(i, c)| self.cell_text(c, row.get(*i).map(String::as_str), false))
                    .collect()
            })
            .collect();

        let widths: Vec<(usize, Align)> = shown
            .iter()
            .enumerate()
            .map(|(pos, (_, c))| {
                let width = header
                    .iter()
                    .chain(rows.iter())
                    .map(|cells| console::measure_text_width(&cells[pos]))
                    .max()
                    .unwrap_or_default();
                (width, c.align.unwrap_or(self.align))
            })
            .collect();

        let border = &self.border;
        let mut lines = Vec::new();
        let mut separator = border.top.as_ref();
        if let Some(header) = &header {
            self.render_line(&mut lines, separator, None, &widths);
            separator = border.header.as_ref().or(border.top.as_ref());
            let chars = border.header_cell.as_ref().unwrap_or(&border.cell);
            self.render_line(&mut lines, Some(chars), Some(header), &widths);
        }
        for row in &rows {
            self.render_line(&mut lines, separator, None, &widths);
            separator = border.mid.as_ref();
            self.render_line(&mut lines, Some(&border.cell), Some(row), &widths);
        }
        self.render_line(&mut lines, border.bottom.as_ref(), None, &widths);
        write!(f, "{}", lines.join("\n"))
    }
}
