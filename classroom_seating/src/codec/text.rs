//! `<class>|<date>|<rows>x<columns>|S:<seats>|A:<attendance>|R:<fingerprint>`
//!
//! Seats are `row,col:index` entries and attendance is `category:index,index`
//! entries, both separated by `;`.

use log::debug;

use super::RawExport;
use crate::config::*;
use crate::roster::RosterFingerprint;

const SEATS: &str = "S:";
const ATTENDANCE: &str = "A:";
const FINGERPRINT: &str = "R:";

pub(crate) fn render(raw: &RawExport, categories: &CategoryRegistry) -> String {
    let mut parts: Vec<String> = vec![format!(
        "{}|{}|{}x{}",
        raw.class_name, raw.date, raw.rows, raw.columns
    )];

    let seats: Vec<String> = raw
        .seats
        .iter()
        .map(|(row, col, idx)| match idx {
            Some(i) => format!("{},{}:{}", row, col, i),
            None => format!("{},{}:?", row, col),
        })
        .collect();
    parts.push(format!("{}{}", SEATS, seats.join(";")));

    let attendance: Vec<String> = raw
        .attendance
        .iter()
        .filter_map(|(ordinal, indices)| {
            let def = categories.get(*ordinal)?;
            let indices: Vec<String> = indices.iter().map(|i| i.to_string()).collect();
            Some(format!("{}:{}", def.category, indices.join(",")))
        })
        .collect();
    parts.push(format!("{}{}", ATTENDANCE, attendance.join(";")));

    if let Some(fp) = raw.fingerprint.as_ref() {
        parts.push(format!("{}{}", FINGERPRINT, fp));
    }
    parts.join("|")
}

pub(crate) fn parse(payload: &str, categories: &CategoryRegistry) -> SeatingResult<RawExport> {
    let parts: Vec<&str> = payload.split('|').collect();
    snafu::ensure!(
        parts.len() >= 3,
        FormatSnafu {
            reason: format!(
                "the text data is incomplete: {} of at least 3 sections",
                parts.len()
            ),
        }
    );
    let (rows, columns) = parse_dimensions(parts[2])?;
    let mut raw = RawExport {
        class_name: parts[0].to_string(),
        date: parts[1].to_string(),
        rows,
        columns,
        seats: Vec::new(),
        attendance: Vec::new(),
        fingerprint: None,
    };
    for part in &parts[3..] {
        if let Some(seats) = part.strip_prefix(SEATS) {
            raw.seats = parse_seats(seats);
        } else if let Some(attendance) = part.strip_prefix(ATTENDANCE) {
            raw.attendance = parse_attendance(attendance, categories);
        } else if let Some(fp) = part.strip_prefix(FINGERPRINT) {
            raw.fingerprint = Some(fp.parse::<RosterFingerprint>()?);
        } else {
            debug!("text::parse: ignoring section {:?}", part);
        }
    }
    Ok(raw)
}

fn parse_dimensions(section: &str) -> SeatingResult<(u32, u32)> {
    let parsed = section
        .split_once('x')
        .and_then(|(r, c)| Some((r.trim().parse::<u32>().ok()?, c.trim().parse::<u32>().ok()?)));
    parsed.ok_or_else(|| SeatingError::Format {
        reason: format!("invalid layout size {:?}, expected <rows>x<columns>", section),
    })
}

fn parse_seats(section: &str) -> Vec<(u32, u32, Option<usize>)> {
    let mut res = Vec::new();
    for entry in section.split(';').filter(|e| !e.is_empty()) {
        let parsed = entry.split_once(':').and_then(|(pos, idx)| {
            let (row, col) = pos.split_once(',')?;
            Some((
                row.parse::<u32>().ok()?,
                col.parse::<u32>().ok()?,
                idx.parse::<usize>().ok(),
            ))
        });
        match parsed {
            Some(seat) => res.push(seat),
            None => debug!("text::parse_seats: ignoring entry {:?}", entry),
        }
    }
    res
}

fn parse_attendance(section: &str, categories: &CategoryRegistry) -> Vec<(usize, Vec<usize>)> {
    let mut res = Vec::new();
    for entry in section.split(';').filter(|e| !e.is_empty()) {
        let (label, indices) = match entry.split_once(':') {
            Some(x) => x,
            None => {
                debug!("text::parse_attendance: ignoring entry {:?}", entry);
                continue;
            }
        };
        let ordinal = match categories.ordinal_of(label) {
            Some(o) => o,
            None => {
                debug!("text::parse_attendance: unknown category {:?}", label);
                continue;
            }
        };
        let indices: Vec<usize> = indices
            .split(',')
            .filter_map(|i| i.trim().parse::<usize>().ok())
            .collect();
        res.push((ordinal, indices));
    }
    res
}
