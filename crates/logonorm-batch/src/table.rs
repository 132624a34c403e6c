//! Plain-text progress table.

use std::borrow::Cow;
use std::io::{self, Write};
use std::path::Path;

use crate::status::Status;

const HEADERS: [&str; 7] = [
    "No",
    "File",
    "Visual %",
    "Foreground %",
    "Output",
    "Step Message",
    "Status",
];

/// Right-aligned columns: the row number and the two percentages.
const RIGHT_ALIGNED: [bool; 7] = [true, false, true, true, false, false, false];

const PATH_WIDTH: usize = 40;
const MESSAGE_WIDTH: usize = 20;

/// Shorten `text` to at most `max` characters, replacing the tail with an
/// ellipsis.
#[must_use]
pub fn truncate(text: &str, max: usize) -> Cow<'_, str> {
    if text.chars().count() <= max {
        return Cow::Borrowed(text);
    }
    let kept: String = text.chars().take(max.saturating_sub(1)).collect();
    Cow::Owned(format!("{kept}…"))
}

/// Render all rows as a table, one line per file after a header and a
/// rule. Every line ends with a newline.
#[must_use]
pub fn render(rows: &[Status]) -> String {
    let cells: Vec<[String; 7]> = rows
        .iter()
        .enumerate()
        .map(|(i, status)| {
            [
                (i + 1).to_string(),
                truncate(&file_name(&status.file), PATH_WIDTH).into_owned(),
                status.visual_percentage.clone(),
                status.foreground_percentage.clone(),
                truncate(&status.output_path, PATH_WIDTH).into_owned(),
                truncate(&status.step_message, MESSAGE_WIDTH).into_owned(),
                status.label.to_string(),
            ]
        })
        .collect();

    let mut widths = HEADERS.map(|h| h.chars().count());
    for row in &cells {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    push_line(&mut out, &HEADERS, &widths);
    let rule: Vec<String> = widths.iter().map(|&w| "-".repeat(w)).collect();
    push_line(&mut out, &rule, &widths);
    for row in &cells {
        push_line(&mut out, row, &widths);
    }
    out
}

fn push_line<S: AsRef<str>>(out: &mut String, cells: &[S], widths: &[usize; 7]) {
    let mut line = String::new();
    for (i, cell) in cells.iter().enumerate() {
        if i > 0 {
            line.push_str("  ");
        }
        let cell = cell.as_ref();
        let pad = widths[i].saturating_sub(cell.chars().count());
        if RIGHT_ALIGNED[i] {
            line.push_str(&" ".repeat(pad));
            line.push_str(cell);
        } else {
            line.push_str(cell);
            line.push_str(&" ".repeat(pad));
        }
    }
    out.push_str(line.trim_end());
    out.push('\n');
}

fn file_name(path: &str) -> Cow<'_, str> {
    Path::new(path)
        .file_name()
        .map_or(Cow::Borrowed(path), |name| name.to_string_lossy())
}

/// A table that redraws itself in place on a terminal.
///
/// On a terminal every [`update`](Self::update) moves the cursor back over
/// the previous drawing and writes the new one. Elsewhere (pipes, files)
/// updates are ignored and only [`finish`](Self::finish) prints, once.
#[derive(Debug)]
pub struct LiveTable<W> {
    out: W,
    interactive: bool,
    lines_drawn: usize,
}

impl<W: Write> LiveTable<W> {
    /// Table writing to `out`; `interactive` enables in-place redraws.
    pub const fn new(out: W, interactive: bool) -> Self {
        Self {
            out,
            interactive,
            lines_drawn: 0,
        }
    }

    /// Redraw with the latest rows (terminal only).
    ///
    /// # Errors
    ///
    /// Returns any error from writing to the output.
    pub fn update(&mut self, rows: &[Status]) -> io::Result<()> {
        if self.interactive {
            self.draw(rows)?;
        }
        Ok(())
    }

    /// Draw the final table.
    ///
    /// # Errors
    ///
    /// Returns any error from writing to the output.
    pub fn finish(&mut self, rows: &[Status]) -> io::Result<()> {
        self.draw(rows)
    }

    fn draw(&mut self, rows: &[Status]) -> io::Result<()> {
        let table = render(rows);
        if self.lines_drawn > 0 {
            // Cursor to the start of the first drawn line, then clear below.
            write!(self.out, "\x1b[{}F\x1b[J", self.lines_drawn)?;
        }
        self.out.write_all(table.as_bytes())?;
        self.out.flush()?;
        self.lines_drawn = table.lines().count();
        Ok(())
    }
}
