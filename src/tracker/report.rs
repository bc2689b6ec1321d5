// Text renderings of sessions and scores.

use classroom_seating::score::{ScoreReport, StudentScore};
use classroom_seating::session::Session;
use unicode_width::UnicodeWidthStr;

use crate::tracker::*;

const EMPTY_SEAT: &str = "·";
const AISLE: &str = "|";

/// The grid as seen from the front of the room: the back row first.
pub fn render_grid(session: &Session) -> String {
    let layout = session.layout();
    let width = session
        .roster()
        .students
        .iter()
        .map(|s| display_width(s))
        .max()
        .unwrap_or(1)
        .max(3);
    let mut lines: Vec<String> = Vec::new();
    for cells in layout.rendered_rows() {
        let mut line = String::new();
        let mut row_label = 0;
        for cell in cells.iter() {
            match cell {
                GridCell::Seat { row, col } => {
                    row_label = *row;
                    let name = session.occupant(*row, *col).unwrap_or(EMPTY_SEAT);
                    line.push_str(&pad(name, width));
                    line.push(' ');
                }
                GridCell::Aisle => {
                    line.push_str(AISLE);
                    line.push(' ');
                }
            }
        }
        lines.push(format!("{:>2}  {}", row_label, line.trim_end()));
    }
    lines.join("\n")
}

/// One line per non-empty category.
pub fn render_attendance(session: &Session) -> String {
    let record = session.attendance_record();
    let lines = record.describe(session.categories());
    if lines.is_empty() {
        "(no attendance)".to_string()
    } else {
        lines.join("\n")
    }
}

pub fn render_session(session: &Session) -> String {
    format!(
        "{} {} ({}x{})\n{}\n\n{}",
        session.class_name(),
        session.date(),
        session.layout().rows,
        session.layout().columns,
        render_grid(session),
        render_attendance(session)
    )
}

fn score_header(categories: &CategoryRegistry) -> Vec<String> {
    let mut header = vec!["#".to_string(), "name".to_string()];
    header.extend(categories.defs().iter().map(|d| d.category.clone()));
    header.extend(
        ["base", "bonus", "total", "final"]
            .iter()
            .map(|s| s.to_string()),
    );
    header
}

fn score_row(s: &StudentScore) -> Vec<String> {
    let mut row = vec![s.index.to_string(), s.name.clone()];
    row.extend(s.occurrences.iter().map(|c| c.to_string()));
    row.push(s.base_score.to_string());
    row.push(s.bonus.to_string());
    row.push(s.total_score.to_string());
    row.push(s.final_score.to_string());
    row
}

/// An aligned table, for the terminal.
pub fn render_scores(report: &ScoreReport, categories: &CategoryRegistry) -> String {
    let mut rows = vec![score_header(categories)];
    rows.extend(report.students.iter().map(score_row));
    let ncols = rows[0].len();
    let widths: Vec<usize> = (0..ncols)
        .map(|i| {
            rows.iter()
                .map(|r| r.get(i).map(|c| display_width(c)).unwrap_or(0))
                .max()
                .unwrap_or(0)
        })
        .collect();
    let mut lines: Vec<String> = rows
        .iter()
        .map(|r| {
            r.iter()
                .zip(widths.iter())
                .map(|(c, w)| pad(c, *w))
                .collect::<Vec<String>>()
                .join("  ")
                .trim_end()
                .to_string()
        })
        .collect();
    lines.push(format!(
        "benchmark: {:.2}, scale factor: {:.4}",
        report.benchmark, report.scale_factor
    ));
    lines.join("\n")
}

/// Tab-separated values with a header row, ready to paste into a spreadsheet.
pub fn render_scores_tsv(report: &ScoreReport, categories: &CategoryRegistry) -> String {
    let mut rows = vec![score_header(categories)];
    rows.extend(report.students.iter().map(score_row));
    rows.iter()
        .map(|r| {
            r.iter()
                .map(|c| tsv_cell(c))
                .collect::<Vec<String>>()
                .join("\t")
        })
        .collect::<Vec<String>>()
        .join("\n")
}

// Spreadsheets split pasted cells on these characters.
fn tsv_cell(cell: &str) -> String {
    if cell.contains(',') || cell.contains('\n') || cell.contains('"') || cell.contains('\t') {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_string()
    }
}

pub fn render_summary(student: &str, days: &[(String, u32)]) -> String {
    if days.is_empty() {
        return format!("{}: no attendance record", student);
    }
    let parts: Vec<String> = days
        .iter()
        .map(|(category, n)| format!("{} {} day(s)", category, n))
        .collect();
    format!("{}: {}", student, parts.join(", "))
}

// CJK characters take two columns in a terminal.
fn display_width(s: &str) -> usize {
    UnicodeWidthStr::width(s)
}

fn pad(s: &str, width: usize) -> String {
    let w = display_width(s);
    format!("{}{}", s, " ".repeat(width.saturating_sub(w)))
}
