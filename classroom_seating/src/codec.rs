//! Share codes: the seating and the attendance of a class in one string.
//!
//! Three versions exist, each with its own tag:
//!  - `SEAT_TXT_v1:` a readable pipe-separated text, used when it fits in the
//!    text budget of the context
//!  - `SEAT_BIN_v1:` base64 of a minimal JSON document, used otherwise
//!  - `SEAT_DATA_v1:` the first format, which is only decoded
//!
//! The text and binary versions refer to students by their position in the
//! roster, and to categories by their position in the registry (binary) or
//! their label (text). Both carry a fingerprint of the roster so that a
//! decoder can detect a roster that changed in between.

mod binary;
mod legacy;
mod text;

use log::{debug, info, warn};
use snafu::ResultExt;

use crate::config::*;
use crate::context::SessionContext;
use crate::roster::{RosterFingerprint, RosterLookup};

pub const TXT_TAG: &str = "SEAT_TXT_v1:";
pub const BIN_TAG: &str = "SEAT_BIN_v1:";
pub const LEGACY_TAG: &str = "SEAT_DATA_v1:";

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum ExportFormat {
    TxtV1,
    BinV1,
    LegacyV1,
}

impl ExportFormat {
    pub fn tag(&self) -> &'static str {
        match self {
            ExportFormat::TxtV1 => TXT_TAG,
            ExportFormat::BinV1 => BIN_TAG,
            ExportFormat::LegacyV1 => LEGACY_TAG,
        }
    }
}

/// A share code split into its version and its payload. The base64 layer of
/// the binary and legacy versions is already removed.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum WireFormat {
    TxtV1(String),
    BinV1(Vec<u8>),
    LegacyV1(Vec<u8>),
}

impl WireFormat {
    pub fn format(&self) -> ExportFormat {
        match self {
            WireFormat::TxtV1(_) => ExportFormat::TxtV1,
            WireFormat::BinV1(_) => ExportFormat::BinV1,
            WireFormat::LegacyV1(_) => ExportFormat::LegacyV1,
        }
    }
}

/// How the roster used for decoding compares with the roster of the sender.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum RosterCheck {
    Verified,
    /// The code carries no fingerprint.
    Unchecked,
    /// The students may be resolved to the wrong names.
    Mismatch {
        expected: RosterFingerprint,
        actual: RosterFingerprint,
    },
}

/// The content of a share code, with student names resolved against the local
/// roster.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct DecodedExport {
    pub class_name: String,
    pub seat_layout: Option<SeatLayoutSnapshot>,
    pub attendance: Option<AttendanceData>,
    pub format: ExportFormat,
    pub roster_check: RosterCheck,
}

/// A text or binary code before the student indices are resolved.
#[derive(Eq, PartialEq, Debug, Clone)]
pub(crate) struct RawExport {
    pub(crate) class_name: String,
    pub(crate) date: String,
    pub(crate) rows: u32,
    pub(crate) columns: u32,
    /// row, column, roster index. `None` for a student the sender could not
    /// find in its roster.
    pub(crate) seats: Vec<(u32, u32, Option<usize>)>,
    /// category ordinal, roster indices.
    pub(crate) attendance: Vec<(usize, Vec<usize>)>,
    pub(crate) fingerprint: Option<RosterFingerprint>,
}

/// Produces the share code of a session.
///
/// The text version is used when its payload fits in the text budget of the
/// context, and when the class name and the date do not contain the `|`
/// separator. Students missing from the roster cannot be referred to: they are
/// written as `?` in the text seats and are left out everywhere else.
pub fn encode(
    roster: &ClassRoster,
    seats: Option<&SeatLayoutSnapshot>,
    attendance: Option<&AttendanceData>,
    ctx: &SessionContext,
) -> String {
    let raw = to_raw(roster, seats, attendance, ctx);
    let payload = text::render(&raw, &ctx.categories);
    let length = payload.chars().count();
    let separator_free = !raw.class_name.contains('|') && !raw.date.contains('|');
    debug!(
        "encode: class {}: text payload of {} characters (budget {})",
        raw.class_name, length, ctx.text_budget
    );
    if length <= ctx.text_budget && separator_free {
        info!("Exporting class {} as text ({} characters)", raw.class_name, length);
        format!("{}{}", TXT_TAG, payload)
    } else {
        let payload = binary::render(&raw);
        info!(
            "Exporting class {} as binary ({} characters)",
            raw.class_name,
            payload.len()
        );
        format!("{}{}", BIN_TAG, payload)
    }
}

/// Recognizes the version of a share code. Surrounding whitespace is ignored.
pub fn detect_variant(code: &str) -> SeatingResult<WireFormat> {
    let code = code.trim();
    if let Some(payload) = code.strip_prefix(TXT_TAG) {
        ensure_payload(payload, ExportFormat::TxtV1)?;
        return Ok(WireFormat::TxtV1(payload.to_string()));
    }
    if let Some(payload) = code.strip_prefix(BIN_TAG) {
        ensure_payload(payload, ExportFormat::BinV1)?;
        let bytes = base64::decode(payload).context(Base64Snafu)?;
        return Ok(WireFormat::BinV1(bytes));
    }
    if let Some(payload) = code.strip_prefix(LEGACY_TAG) {
        ensure_payload(payload, ExportFormat::LegacyV1)?;
        let bytes = base64::decode(payload).context(Base64Snafu)?;
        return Ok(WireFormat::LegacyV1(bytes));
    }
    FormatSnafu {
        reason: format!(
            "unknown format, expected one of {}, {}, {}",
            TXT_TAG, BIN_TAG, LEGACY_TAG
        ),
    }
    .fail()
}

/// Decodes a share code against the local rosters.
///
/// Indices that do not resolve to a student of the local roster are dropped.
/// Fails when the code is malformed or when its class is not known locally.
pub fn decode<R: RosterLookup + ?Sized>(
    code: &str,
    ctx: &SessionContext,
    rosters: &R,
) -> SeatingResult<DecodedExport> {
    let wire = detect_variant(code)?;
    let format = wire.format();
    debug!("decode: detected {:?}", format);
    let raw = match wire {
        WireFormat::TxtV1(payload) => text::parse(&payload, &ctx.categories)?,
        WireFormat::BinV1(bytes) => binary::parse(&bytes)?,
        WireFormat::LegacyV1(bytes) => {
            return legacy::decode(&bytes, rosters);
        }
    };
    let roster = rosters
        .find_class(&raw.class_name)
        .ok_or_else(|| SeatingError::NotFound {
            what: "class",
            name: raw.class_name.clone(),
        })?;
    let roster_check = check_roster(raw.fingerprint.as_ref(), roster);
    Ok(resolve(raw, roster, &ctx.categories, format, roster_check))
}

fn ensure_payload(payload: &str, format: ExportFormat) -> SeatingResult<()> {
    snafu::ensure!(
        !payload.trim().is_empty(),
        FormatSnafu {
            reason: format!("empty payload after {}", format.tag()),
        }
    );
    Ok(())
}

fn to_raw(
    roster: &ClassRoster,
    seats: Option<&SeatLayoutSnapshot>,
    attendance: Option<&AttendanceData>,
    ctx: &SessionContext,
) -> RawExport {
    let (rows, columns) = match seats {
        Some(s) => (s.rows, s.columns),
        None => (ctx.layout.rows, ctx.layout.columns),
    };
    let date = match attendance {
        Some(a) => a.date.clone(),
        None => ctx.today.clone(),
    };
    let seat_entries = seats
        .map(|s| {
            s.seats
                .iter()
                .map(|a| (a.row, a.col, roster.index_of(&a.name)))
                .collect()
        })
        .unwrap_or_default();
    let mut attendance_entries = Vec::new();
    if let Some(record) = attendance {
        for (ordinal, def) in ctx.categories.defs().iter().enumerate() {
            let indices: Vec<usize> = record
                .students(&def.category)
                .iter()
                .filter_map(|s| roster.index_of(s))
                .collect();
            if !indices.is_empty() {
                attendance_entries.push((ordinal, indices));
            }
        }
    }
    RawExport {
        class_name: roster.name.clone(),
        date,
        rows,
        columns,
        seats: seat_entries,
        attendance: attendance_entries,
        fingerprint: Some(roster.fingerprint()),
    }
}

fn check_roster(expected: Option<&RosterFingerprint>, roster: &ClassRoster) -> RosterCheck {
    match expected {
        None => RosterCheck::Unchecked,
        Some(expected) => {
            let actual = roster.fingerprint();
            if *expected == actual {
                RosterCheck::Verified
            } else {
                warn!(
                    "Class {}: the roster of the export ({}) differs from the local one ({})",
                    roster.name, expected, actual
                );
                RosterCheck::Mismatch {
                    expected: expected.clone(),
                    actual,
                }
            }
        }
    }
}

fn resolve(
    raw: RawExport,
    roster: &ClassRoster,
    categories: &CategoryRegistry,
    format: ExportFormat,
    roster_check: RosterCheck,
) -> DecodedExport {
    let seats: Vec<SeatAssignment> = raw
        .seats
        .iter()
        .filter_map(|(row, col, idx)| {
            let name = idx.and_then(|i| roster.student(i))?;
            Some(SeatAssignment {
                name: name.to_string(),
                row: *row,
                col: *col,
            })
        })
        .collect();
    let mut record = AttendanceRecord::new(&raw.date);
    for (ordinal, indices) in raw.attendance.iter() {
        let def = match categories.get(*ordinal) {
            Some(d) => d,
            None => {
                debug!("resolve: ignoring category ordinal {}", ordinal);
                continue;
            }
        };
        let students: Vec<String> = indices
            .iter()
            .filter_map(|i| roster.student(*i))
            .map(|s| s.to_string())
            .collect();
        if !students.is_empty() {
            record
                .attendance
                .entry(def.category.clone())
                .or_default()
                .extend(students);
        }
    }
    DecodedExport {
        class_name: raw.class_name,
        seat_layout: Some(SeatLayoutSnapshot {
            rows: raw.rows,
            columns: raw.columns,
            seats,
        }),
        attendance: Some(record),
        format,
        roster_check,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(l: &[&str]) -> Vec<String> {
        l.iter().map(|s| s.to_string()).collect()
    }

    fn roster() -> ClassRoster {
        ClassRoster::new("1A", &names(&["张三", "李四", "王五"])).unwrap()
    }

    fn snapshot() -> SeatLayoutSnapshot {
        SeatLayoutSnapshot {
            rows: 6,
            columns: 8,
            seats: vec![
                SeatAssignment {
                    name: "李四".to_string(),
                    row: 6,
                    col: 1,
                },
                SeatAssignment {
                    name: "张三".to_string(),
                    row: 2,
                    col: 8,
                },
            ],
        }
    }

    fn record() -> AttendanceRecord {
        let mut r = AttendanceRecord::new("2024-05-06");
        r.attendance
            .insert("迟".to_string(), names(&["王五", "王五"]));
        r.attendance.insert("假".to_string(), names(&["张三"]));
        r.attendance.insert("旷".to_string(), vec![]);
        r
    }

    fn ctx() -> SessionContext {
        SessionContext::new("2024-05-07")
    }

    fn non_empty(record: &AttendanceRecord) -> Vec<(String, Vec<String>)> {
        record
            .attendance
            .iter()
            .filter(|(_, v)| !v.is_empty())
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    fn check_round_trip(ctx: &SessionContext, expected: ExportFormat) {
        let _ = env_logger::builder().is_test(true).try_init();
        let rosters = vec![roster()];
        let code = encode(&roster(), Some(&snapshot()), Some(&record()), ctx);
        assert!(code.starts_with(expected.tag()), "{}", code);
        let decoded = decode(&code, ctx, &rosters).unwrap();
        assert_eq!(decoded.class_name, "1A");
        assert_eq!(decoded.format, expected);
        assert_eq!(decoded.roster_check, RosterCheck::Verified);
        assert_eq!(decoded.seat_layout, Some(snapshot()));
        let attendance = decoded.attendance.unwrap();
        assert_eq!(attendance.date, "2024-05-06");
        assert_eq!(non_empty(&attendance), non_empty(&record()));
    }

    #[test]
    fn text_round_trip() {
        check_round_trip(&ctx(), ExportFormat::TxtV1);
    }

    #[test]
    fn binary_round_trip() {
        check_round_trip(&ctx().with_text_budget(10), ExportFormat::BinV1);
    }

    #[test]
    fn text_layout() {
        let code = encode(&roster(), Some(&snapshot()), Some(&record()), &ctx());
        let fp = roster().fingerprint();
        assert_eq!(
            code,
            format!(
                "SEAT_TXT_v1:1A|2024-05-06|6x8|S:6,1:1;2,8:0|A:迟:2,2;假:0|R:{}",
                fp
            )
        );
        // Defaults from the context.
        let code = encode(&roster(), None, None, &ctx());
        assert_eq!(
            code,
            format!("SEAT_TXT_v1:1A|2024-05-07|11x12|S:|A:|R:{}", fp)
        );
    }

    #[test]
    fn unknown_students_in_seats_are_question_marks() {
        let mut s = snapshot();
        s.seats.push(SeatAssignment {
            name: "陌生人".to_string(),
            row: 1,
            col: 1,
        });
        let code = encode(&roster(), Some(&s), None, &ctx());
        assert!(code.contains("S:6,1:1;2,8:0;1,1:?|"), "{}", code);
        let decoded = decode(&code, &ctx(), &vec![roster()]).unwrap();
        assert_eq!(decoded.seat_layout.unwrap().seats.len(), 2);
    }

    /// A roster and a record whose text payload reaches `target` characters.
    fn sized_input(target: usize) -> (ClassRoster, AttendanceRecord) {
        let students: Vec<String> = (0..200).map(|i| format!("s{}", i)).collect();
        let roster = ClassRoster::new("1A", &students).unwrap();
        let mut record = AttendanceRecord::new("2024-05-06");
        for i in 0..5000 {
            record
                .attendance
                .entry("迟".to_string())
                .or_default()
                .push(students[100 + i % 100].clone());
            if text_length(&roster, &record) >= target {
                return (roster, record);
            }
        }
        panic!("could not reach {} characters", target);
    }

    fn text_length(roster: &ClassRoster, record: &AttendanceRecord) -> usize {
        let ctx = ctx();
        let raw = to_raw(roster, None, Some(record), &ctx);
        text::render(&raw, &ctx.categories).chars().count()
    }

    #[test]
    fn text_budget_threshold() {
        let (roster, record) = sized_input(2000);
        let length = text_length(&roster, &record);

        let at_budget = ctx().with_text_budget(length);
        let code = encode(&roster, None, Some(&record), &at_budget);
        assert!(code.starts_with(TXT_TAG));

        let below = ctx().with_text_budget(length - 1);
        let code = encode(&roster, None, Some(&record), &below);
        assert!(code.starts_with(BIN_TAG));
        let decoded = decode(&code, &below, &vec![roster.clone()]).unwrap();
        assert_eq!(decoded.attendance, Some(record));
    }

    #[test]
    fn default_budget_is_2800_characters() {
        let (roster, mut record) = sized_input(2801);
        assert!(text_length(&roster, &record) > SessionContext::DEFAULT_TEXT_BUDGET);
        let code = encode(&roster, None, Some(&record), &ctx());
        assert!(code.starts_with(BIN_TAG));

        while text_length(&roster, &record) > 2800 {
            if let Some(late) = record.attendance.get_mut("迟") {
                late.pop();
            }
        }
        let code = encode(&roster, None, Some(&record), &ctx());
        assert!(code.starts_with(TXT_TAG));
    }

    #[test]
    fn separator_in_class_name_forces_binary() {
        let roster = ClassRoster::new("1|A", &names(&["x"])).unwrap();
        let code = encode(&roster, None, None, &ctx());
        assert!(code.starts_with(BIN_TAG));
        let decoded = decode(&code, &ctx(), &vec![roster]).unwrap();
        assert_eq!(decoded.class_name, "1|A");
    }

    #[test]
    fn unknown_tag_and_empty_payloads_fail() {
        for code in ["HELLO", "", "SEAT_TXT_v1:", "SEAT_BIN_v1:  ", "SEAT_DATA_v1:"] {
            let err = detect_variant(code).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Format, "{:?}", code);
        }
        let err = detect_variant("SEAT_BIN_v1:@@@").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format);
        assert!(matches!(
            detect_variant("  SEAT_TXT_v1:a|b|1x1 \n"),
            Ok(WireFormat::TxtV1(_))
        ));
    }

    #[test]
    fn truncated_text_fails() {
        let err = decode("SEAT_TXT_v1:1A|2024-01-01", &ctx(), &vec![roster()]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format);
        let err = decode("SEAT_TXT_v1:1A|2024-01-01|axb", &ctx(), &vec![roster()]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format);
    }

    #[test]
    fn unknown_class_is_not_found() {
        let code = encode(&roster(), None, Some(&record()), &ctx());
        let other = vec![ClassRoster::new("2B", &names(&["x"])).unwrap()];
        let err = decode(&code, &ctx(), &other).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn reordered_roster_is_reported() {
        let code = encode(&roster(), Some(&snapshot()), Some(&record()), &ctx());
        let reordered = vec![ClassRoster::new("1A", &names(&["李四", "张三", "王五"])).unwrap()];
        let decoded = decode(&code, &ctx(), &reordered).unwrap();
        match decoded.roster_check {
            RosterCheck::Mismatch { expected, actual } => {
                assert_eq!(expected, roster().fingerprint());
                assert_eq!(actual, reordered[0].fingerprint());
            }
            other => panic!("unexpected {:?}", other),
        }

        // Codes without a fingerprint decode unchecked.
        let code = "SEAT_TXT_v1:1A|2024-01-01|2x2|S:1,1:0|A:睡:1";
        let decoded = decode(code, &ctx(), &vec![roster()]).unwrap();
        assert_eq!(decoded.roster_check, RosterCheck::Unchecked);
        assert_eq!(decoded.attendance.unwrap().students("睡"), &["李四"]);
    }
}
