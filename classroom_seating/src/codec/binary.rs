//! A minimal JSON document encoded in base64:
//! `{"c": class, "d": date, "r": rows, "o": columns, "s": [[row, col, index]],
//! "a": {"<category ordinal>": [index]}, "k": fingerprint}`.

use std::collections::BTreeMap;

use log::debug;
use serde::{Deserialize, Serialize};
use snafu::ResultExt;

use super::RawExport;
use crate::config::*;
use crate::roster::RosterFingerprint;

#[derive(Debug, Serialize, Deserialize)]
struct BinaryExport {
    c: String,
    d: String,
    r: u32,
    o: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    s: Option<Vec<(u32, u32, i64)>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    a: Option<BTreeMap<String, Vec<i64>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    k: Option<String>,
}

/// The base64 payload. Seats of unknown students are left out.
pub(crate) fn render(raw: &RawExport) -> String {
    let seats: Vec<(u32, u32, i64)> = raw
        .seats
        .iter()
        .filter_map(|(row, col, idx)| idx.map(|i| (*row, *col, i as i64)))
        .collect();
    let attendance: BTreeMap<String, Vec<i64>> = raw
        .attendance
        .iter()
        .map(|(ordinal, indices)| {
            (
                ordinal.to_string(),
                indices.iter().map(|i| *i as i64).collect(),
            )
        })
        .collect();
    let doc = BinaryExport {
        c: raw.class_name.clone(),
        d: raw.date.clone(),
        r: raw.rows,
        o: raw.columns,
        s: if seats.is_empty() { None } else { Some(seats) },
        a: if attendance.is_empty() {
            None
        } else {
            Some(attendance)
        },
        k: raw.fingerprint.as_ref().map(|fp| fp.to_string()),
    };
    // Serializing this structure into a string cannot fail.
    let json = serde_json::to_string(&doc).unwrap_or_default();
    base64::encode(json)
}

/// Parses the decoded bytes of the payload.
pub(crate) fn parse(bytes: &[u8]) -> SeatingResult<RawExport> {
    let doc: BinaryExport = serde_json::from_slice(bytes).context(JsonSnafu)?;
    let seats = doc
        .s
        .unwrap_or_default()
        .into_iter()
        .map(|(row, col, idx)| (row, col, usize::try_from(idx).ok()))
        .collect();
    let mut attendance = Vec::new();
    for (key, indices) in doc.a.unwrap_or_default() {
        let ordinal = match key.parse::<usize>() {
            Ok(o) => o,
            Err(_) => {
                debug!("binary::parse: ignoring attendance key {:?}", key);
                continue;
            }
        };
        let indices = indices
            .into_iter()
            .filter_map(|i| usize::try_from(i).ok())
            .collect();
        attendance.push((ordinal, indices));
    }
    attendance.sort_by_key(|(ordinal, _)| *ordinal);
    let fingerprint = match doc.k {
        Some(k) => Some(k.parse::<RosterFingerprint>()?),
        None => None,
    };
    Ok(RawExport {
        class_name: doc.c,
        date: doc.d,
        rows: doc.r,
        columns: doc.o,
        seats,
        attendance,
        fingerprint,
    })
}
