//! The first version of the share code: base64 of the percent-encoded JSON of
//! the whole session, with student names in clear. It is read, never written.

use log::{debug, warn};
use serde::Deserialize;
use snafu::ResultExt;

use super::{DecodedExport, ExportFormat, RosterCheck};
use crate::config::*;
use crate::roster::RosterLookup;

#[derive(Debug, Deserialize)]
struct LegacyExport {
    #[serde(rename = "className")]
    class_name: String,
    #[serde(rename = "currentSeatLayout", default)]
    current_seat_layout: Option<SeatLayoutSnapshot>,
    #[serde(rename = "currentAttendance", default)]
    current_attendance: Option<AttendanceRecord>,
}

pub(crate) fn decode<R: RosterLookup + ?Sized>(
    bytes: &[u8],
    rosters: &R,
) -> SeatingResult<DecodedExport> {
    let json = percent_encoding::percent_decode(bytes)
        .decode_utf8()
        .context(PercentDecodingSnafu)?;
    let doc: LegacyExport = serde_json::from_str(&json).context(JsonSnafu)?;
    snafu::ensure!(
        !doc.class_name.is_empty(),
        FormatSnafu {
            reason: "the data has no class name",
        }
    );
    let roster = rosters
        .find_class(&doc.class_name)
        .ok_or_else(|| SeatingError::NotFound {
            what: "class",
            name: doc.class_name.clone(),
        })?;

    let seat_layout = doc.current_seat_layout.map(|mut snapshot| {
        snapshot.seats.retain(|s| {
            let known = roster.contains(&s.name);
            if !known {
                warn!("Legacy export: {} is not in class {}", s.name, roster.name);
            }
            known
        });
        snapshot
    });
    let attendance = doc.current_attendance.map(|mut record| {
        for students in record.attendance.values_mut() {
            students.retain(|s| roster.contains(s));
        }
        record.attendance.retain(|_, students| !students.is_empty());
        record
    });
    debug!(
        "legacy::decode: class {}, seats: {}, attendance: {}",
        doc.class_name,
        seat_layout.is_some(),
        attendance.is_some()
    );
    Ok(DecodedExport {
        class_name: doc.class_name,
        seat_layout,
        attendance,
        format: ExportFormat::LegacyV1,
        roster_check: RosterCheck::Unchecked,
    })
}
