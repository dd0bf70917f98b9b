//! Plain-text table rendering for CLI output.

use std::borrow::Cow;
use std::fmt::Write as _;

const COLUMN_GAP: &str = "  ";
const ELLIPSIS: char = '…';

/// Rows of display strings under a header, rendered with aligned columns.
#[derive(Debug, Clone, Default)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    max_cell_width: Option<usize>,
}

impl Table {
    pub fn new<I, S>(headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
            max_cell_width: None,
        }
    }

    /// Cells wider than `width` are cut and end with an ellipsis.
    pub fn with_max_cell_width(mut self, width: usize) -> Self {
        self.max_cell_width = Some(width.max(1));
        self
    }

    pub fn push_row(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn render(&self) -> String {
        let headers = self.fitted(&self.headers);
        let rows = self
            .rows
            .iter()
            .map(|row| self.fitted(row))
            .collect::<Vec<_>>();

        let mut widths = headers.iter().map(|h| display_width(h)).collect::<Vec<_>>();
        for row in &rows {
            for (idx, cell) in row.iter().enumerate().take(widths.len()) {
                widths[idx] = widths[idx].max(display_width(cell));
            }
        }
        for width in &mut widths {
            *width = (*width).max(3);
        }

        let mut output = String::new();
        let _ = writeln!(output, "{}", format_row(&headers, &widths));
        let rule = widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>();
        let _ = writeln!(output, "{}", format_row(&rule, &widths));
        for row in &rows {
            let _ = writeln!(output, "{}", format_row(row, &widths));
        }
        output
    }

    pub fn print(&self) {
        print!("{}", self.render());
    }

    fn fitted(&self, cells: &[String]) -> Vec<String> {
        cells
            .iter()
            .map(|cell| {
                let clean = sanitize_cell(cell);
                match self.max_cell_width {
                    Some(limit) if display_width(&clean) > limit => truncate(&clean, limit),
                    _ => clean.into_owned(),
                }
            })
            .collect()
    }
}

fn format_row(values: &[String], widths: &[usize]) -> String {
    let line = values
        .iter()
        .zip(widths)
        .map(|(value, width)| {
            let padding = width.saturating_sub(display_width(value));
            format!("{value}{}", " ".repeat(padding))
        })
        .collect::<Vec<_>>()
        .join(COLUMN_GAP);
    line.trim_end().to_string()
}

fn truncate(value: &str, limit: usize) -> String {
    let mut kept = value.chars().take(limit - 1).collect::<String>();
    kept.push(ELLIPSIS);
    kept
}

fn display_width(value: &str) -> usize {
    let mut width = 0usize;
    let mut chars = value.chars();
    while let Some(ch) = chars.next() {
        if ch == '\u{1b}' {
            // ANSI escape, e.g. \x1b[31m
            for next in chars.by_ref() {
                if next == 'm' {
                    break;
                }
            }
        } else {
            width += 1;
        }
    }
    width
}

fn sanitize_cell(value: &str) -> Cow<'_, str> {
    if value.contains(['\n', '\r', '\t']) {
        Cow::Owned(value.replace(['\n', '\r', '\t'], " "))
    } else {
        Cow::Borrowed(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn columns_are_padded_to_widest_cell() {
        let mut table = Table::new(["field", "column"]);
        table.push_row(vec!["Name".into(), "0".into()]);
        table.push_row(vec!["TimeOfDay".into(), "12".into()]);
        let rendered = table.render();
        let lines = rendered.lines().collect::<Vec<_>>();
        assert_eq!(
            lines,
            vec![
                "field      column",
                "---------  ------",
                "Name       0",
                "TimeOfDay  12",
            ]
        );
    }

    #[test]
    fn long_cells_are_truncated() {
        let mut table = Table::new(["note"]).with_max_cell_width(5);
        table.push_row(vec!["line1\nline2".into()]);
        let rendered = table.render();
        assert_eq!(rendered.lines().nth(2), Some("line…"));
    }

    #[test]
    fn ansi_sequences_do_not_count_towards_width() {
        assert_eq!(display_width("\u{1b}[31mERR\u{1b}[0m"), 3);
        assert_eq!(display_width("café"), 4);
    }
}
