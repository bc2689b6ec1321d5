use log::{debug, warn};

pub use crate::config::*;
use crate::context::SessionContext;
use crate::session::Session;

/// Reconstructs a session by layering the saved data of a class on top of
/// its roster.
///
/// Entries that do not fit (unknown students, seats outside the grid, a
/// second seat for the same student) are skipped.
///
/// ```
/// use classroom_seating::builder::SessionBuilder;
/// use classroom_seating::{AttendanceRecord, ClassRoster, SeatingError, SessionContext};
///
/// let roster = ClassRoster::new("1A", &["Anna".to_string(), "Bob".to_string()])?;
/// let ctx = SessionContext::new("2024-09-02");
///
/// let mut record = AttendanceRecord::new("2024-09-01");
/// record.attendance.insert("迟".to_string(), vec!["Bob".to_string()]);
///
/// let session = SessionBuilder::new(&roster, &ctx)
///     .attendance(&record)
///     .build();
/// assert_eq!(session.date(), "2024-09-01");
/// assert_eq!(session.category_students(1), &["Bob".to_string()]);
///
/// # Ok::<(), SeatingError>(())
/// ```
pub struct SessionBuilder {
    pub(crate) _session: Session,
}

impl SessionBuilder {
    /// An empty session on today's date, using the current global layout.
    pub fn new(roster: &ClassRoster, ctx: &SessionContext) -> SessionBuilder {
        SessionBuilder {
            _session: Session::new(roster, &ctx.layout, &ctx.categories, &ctx.today),
        }
    }

    /// Applies a saved seating.
    ///
    /// The grid takes the dimensions of the snapshot when they differ from the
    /// current layout. The snapshot replaces any seating applied before.
    pub fn seat_layout(self, snapshot: &SeatLayoutSnapshot) -> SeatingResult<SessionBuilder> {
        let mut session = self._session;
        if snapshot.rows != session.layout.rows || snapshot.columns != session.layout.columns {
            debug!(
                "SessionBuilder::seat_layout: resizing the grid from {}x{} to {}x{}",
                session.layout.rows, session.layout.columns, snapshot.rows, snapshot.columns
            );
            session.layout = session.layout.resized(snapshot.rows, snapshot.columns)?;
        }
        session.seats.clear();
        for seat in snapshot.seats.iter() {
            if !session.roster.contains(&seat.name) {
                warn!(
                    "Seat {},{}: {} is not in class {}, skipping",
                    seat.row, seat.col, seat.name, session.roster.name
                );
                continue;
            }
            if !session.layout.contains(seat.row, seat.col) {
                warn!(
                    "Seat {},{} of {} is outside the grid, skipping",
                    seat.row, seat.col, seat.name
                );
                continue;
            }
            if session.seats.contains_key(&(seat.row, seat.col)) || !session.is_eligible(&seat.name)
            {
                debug!(
                    "SessionBuilder::seat_layout: {} cannot take seat {},{}",
                    seat.name, seat.row, seat.col
                );
                continue;
            }
            session
                .seats
                .insert((seat.row, seat.col), seat.name.clone());
        }
        Ok(SessionBuilder { _session: session })
    }

    /// Applies a saved or decoded attendance record, including its date.
    ///
    /// The record replaces the category lists. Students in an exclusive
    /// category lose their seat and appear only once.
    pub fn attendance(self, record: &AttendanceRecord) -> SessionBuilder {
        let mut session = self._session;
        session.date = record.date.clone();
        session.clear_attendance();
        for (label, students) in record.attendance.iter() {
            let ordinal = match session.categories.ordinal_of(label) {
                Some(o) => o,
                None => {
                    warn!(
                        "Record {}: unknown attendance category {:?}, skipping",
                        record.date, label
                    );
                    continue;
                }
            };
            let exclusive = session.categories.defs()[ordinal].is_exclusive();
            for s in students {
                if !session.roster.contains(s) {
                    warn!(
                        "Record {}: {} is not in class {}, skipping",
                        record.date, s, session.roster.name
                    );
                    continue;
                }
                if exclusive {
                    if session.attendance[ordinal].contains(s) {
                        continue;
                    }
                    if let Some(pos) = session.seat_of(s) {
                        session.seats.remove(&pos);
                    }
                }
                session.attendance[ordinal].push(s.clone());
            }
        }
        SessionBuilder { _session: session }
    }

    pub fn build(self) -> Session {
        self._session
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster() -> ClassRoster {
        ClassRoster::new(
            "1A",
            &["A", "B", "C"].iter().map(|s| s.to_string()).collect::<Vec<_>>(),
        )
        .unwrap()
    }

    fn seat(name: &str, row: u32, col: u32) -> SeatAssignment {
        SeatAssignment {
            name: name.to_string(),
            row,
            col,
        }
    }

    #[test]
    fn snapshot_dimensions_win() {
        let ctx = SessionContext::new("2024-01-01");
        let snapshot = SeatLayoutSnapshot {
            rows: 2,
            columns: 3,
            seats: vec![
                seat("A", 2, 3),
                seat("Z", 1, 1),
                seat("B", 2, 3),
                seat("A", 1, 2),
                seat("C", 5, 5),
            ],
        };
        let session = SessionBuilder::new(&roster(), &ctx)
            .seat_layout(&snapshot)
            .unwrap()
            .build();
        assert_eq!((session.layout().rows, session.layout().columns), (2, 3));
        assert_eq!(session.occupant(2, 3), Some("A"));
        assert_eq!(session.seat_of("B"), None);
        assert_eq!(session.seats.len(), 1);
    }

    #[test]
    fn invalid_snapshot_dimensions_are_rejected() {
        let ctx = SessionContext::new("2024-01-01");
        let snapshot = SeatLayoutSnapshot {
            rows: 40,
            columns: 3,
            seats: vec![],
        };
        let err = SessionBuilder::new(&roster(), &ctx)
            .seat_layout(&snapshot)
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn leave_in_record_evicts_and_deduplicates() {
        let ctx = SessionContext::new("2024-01-01");
        let snapshot = SeatLayoutSnapshot {
            rows: 11,
            columns: 12,
            seats: vec![seat("A", 1, 1), seat("B", 1, 2)],
        };
        let mut record = AttendanceRecord::new("2024-01-05");
        record
            .attendance
            .insert("假".to_string(), vec!["A".to_string(), "A".to_string()]);
        record
            .attendance
            .insert("迟".to_string(), vec!["B".to_string(), "B".to_string()]);
        record
            .attendance
            .insert("X".to_string(), vec!["C".to_string()]);
        let session = SessionBuilder::new(&roster(), &ctx)
            .seat_layout(&snapshot)
            .unwrap()
            .attendance(&record)
            .build();
        assert_eq!(session.date(), "2024-01-05");
        assert_eq!(session.category_students(2), &["A"]);
        assert_eq!(session.category_students(1).len(), 2);
        assert_eq!(session.seat_of("A"), None);
        assert_eq!(session.seat_of("B"), Some((1, 2)));
    }
}
