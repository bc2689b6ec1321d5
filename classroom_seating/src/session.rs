use std::collections::BTreeMap;

use log::{debug, info};
use rand::seq::SliceRandom;
use rand::Rng;

use crate::config::*;

/// Where a dragged student comes from.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum Location {
    /// The roster panel, which lists every student of the class.
    Roster { student: String },
    Seat { row: u32, col: u32 },
    /// An entry of a category list. `position` is the 0-based index in that list.
    Category { ordinal: usize, position: usize },
}

/// Where a dragged student is dropped.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum DropTarget {
    Seat { row: u32, col: u32 },
    Category { ordinal: usize },
    Trash,
    Roster,
}

/// What a drop changed.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum Transition {
    Seated,
    Moved,
    Swapped,
    /// Added to a category list. `evicted` is set when the student lost a seat.
    Added { evicted: bool },
    Removed,
    Unchanged,
}

/// The working state of one class on one date.
///
/// It only changes through [`Session::apply`] and the bulk operations below,
/// which maintain these invariants:
///  - a student occupies at most one seat
///  - a student appears at most once in an exclusive (leave) category
///  - a student in an exclusive category is not seated
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Session {
    pub(crate) roster: ClassRoster,
    pub(crate) layout: SeatLayoutConfig,
    pub(crate) categories: CategoryRegistry,
    pub(crate) date: String,
    pub(crate) seats: BTreeMap<(u32, u32), String>,
    /// Indexed by category ordinal.
    pub(crate) attendance: Vec<Vec<String>>,
}

impl Session {
    /// An empty session: nobody seated, all the category lists empty.
    pub fn new(
        roster: &ClassRoster,
        layout: &SeatLayoutConfig,
        categories: &CategoryRegistry,
        date: &str,
    ) -> Session {
        Session {
            roster: roster.clone(),
            layout: layout.clone(),
            categories: categories.clone(),
            date: date.to_string(),
            seats: BTreeMap::new(),
            attendance: vec![Vec::new(); categories.len()],
        }
    }

    pub fn class_name(&self) -> &str {
        &self.roster.name
    }

    pub fn roster(&self) -> &ClassRoster {
        &self.roster
    }

    pub fn layout(&self) -> &SeatLayoutConfig {
        &self.layout
    }

    pub fn categories(&self) -> &CategoryRegistry {
        &self.categories
    }

    pub fn date(&self) -> &str {
        &self.date
    }

    pub fn occupant(&self, row: u32, col: u32) -> Option<&str> {
        self.seats.get(&(row, col)).map(|s| s.as_str())
    }

    pub fn seat_of(&self, student: &str) -> Option<(u32, u32)> {
        self.seats
            .iter()
            .find(|(_, s)| s.as_str() == student)
            .map(|(pos, _)| *pos)
    }

    pub fn category_students(&self, ordinal: usize) -> &[String] {
        self.attendance
            .get(ordinal)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn is_on_leave(&self, student: &str) -> bool {
        self.categories
            .defs()
            .iter()
            .zip(self.attendance.iter())
            .any(|(def, list)| def.is_exclusive() && list.iter().any(|s| s == student))
    }

    /// A student may be seated from the roster when not seated yet and not on
    /// leave.
    pub fn is_eligible(&self, student: &str) -> bool {
        self.seat_of(student).is_none() && !self.is_on_leave(student)
    }

    /// The students that can still be dragged from the roster onto a seat, in
    /// roster order.
    pub fn eligible_students(&self) -> Vec<&str> {
        self.roster
            .students
            .iter()
            .filter(|s| self.is_eligible(s))
            .map(|s| s.as_str())
            .collect()
    }

    /// Applies one drag and drop.
    ///
    /// Fails without changing anything when the source does not hold a
    /// student or when the target is outside the grid or the registry.
    pub fn apply(&mut self, source: &Location, target: DropTarget) -> SeatingResult<Transition> {
        let student = self.resolve(source)?;
        self.check_target(target)?;
        let transition = match (source, target) {
            (Location::Roster { .. }, DropTarget::Seat { row, col }) => {
                if self.seats.contains_key(&(row, col)) || !self.is_eligible(&student) {
                    Transition::Unchanged
                } else {
                    self.seats.insert((row, col), student.clone());
                    Transition::Seated
                }
            }
            (Location::Seat { row: r0, col: c0 }, DropTarget::Seat { row, col }) => {
                let from = (*r0, *c0);
                let to = (row, col);
                if from == to {
                    Transition::Unchanged
                } else {
                    match self.seats.remove(&to) {
                        Some(other) => {
                            self.seats.insert(to, student.clone());
                            self.seats.insert(from, other);
                            Transition::Swapped
                        }
                        None => {
                            self.seats.remove(&from);
                            self.seats.insert(to, student.clone());
                            Transition::Moved
                        }
                    }
                }
            }
            (Location::Category { .. }, DropTarget::Seat { .. }) => Transition::Unchanged,
            (_, DropTarget::Category { ordinal }) => {
                let from_category = match source {
                    Location::Category { ordinal, position } => Some((*ordinal, *position)),
                    _ => None,
                };
                self.add_to_category(&student, ordinal, from_category)
            }
            (Location::Seat { row, col }, DropTarget::Trash | DropTarget::Roster) => {
                self.seats.remove(&(*row, *col));
                Transition::Removed
            }
            (Location::Category { ordinal, position }, DropTarget::Trash | DropTarget::Roster) => {
                self.attendance[*ordinal].remove(*position);
                Transition::Removed
            }
            (Location::Roster { .. }, DropTarget::Trash | DropTarget::Roster) => {
                Transition::Unchanged
            }
        };
        debug!(
            "Session::apply: {} {:?} -> {:?}: {:?}",
            student, source, target, transition
        );
        Ok(transition)
    }

    /// Adds each student to a category, as if dragged from the roster.
    ///
    /// All the names are checked before anything changes. Returns the number
    /// of entries added.
    pub fn mark(&mut self, category: &str, students: &[String]) -> SeatingResult<usize> {
        let ordinal = self.categories.require(category)?;
        for s in students {
            snafu::ensure!(
                self.roster.contains(s),
                NotFoundSnafu {
                    what: "student",
                    name: s.clone(),
                }
            );
        }
        let mut added = 0;
        for s in students {
            if let Transition::Added { .. } = self.add_to_category(s, ordinal, None) {
                added += 1;
            }
        }
        info!(
            "Marked {} of {} students as {} in class {}",
            added,
            students.len(),
            category,
            self.roster.name
        );
        Ok(added)
    }

    /// Empties every category list. Students on leave become eligible again.
    pub fn clear_attendance(&mut self) {
        for list in self.attendance.iter_mut() {
            list.clear();
        }
    }

    /// Picks a random student of the roster, skipping the students on leave.
    pub fn roll_call<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&str> {
        let present: Vec<&String> = self
            .roster
            .students
            .iter()
            .filter(|s| !self.is_on_leave(s))
            .collect();
        present.choose(rng).map(|s| s.as_str())
    }

    /// The seating, or None when nobody is seated. Seats are listed from the
    /// back row, left to right.
    pub fn seat_snapshot(&self) -> Option<SeatLayoutSnapshot> {
        if self.seats.is_empty() {
            return None;
        }
        let mut seats: Vec<SeatAssignment> = self
            .seats
            .iter()
            .map(|((row, col), name)| SeatAssignment {
                name: name.clone(),
                row: *row,
                col: *col,
            })
            .collect();
        seats.sort_by(|a, b| b.row.cmp(&a.row).then(a.col.cmp(&b.col)));
        Some(SeatLayoutSnapshot {
            rows: self.layout.rows,
            columns: self.layout.columns,
            seats,
        })
    }

    /// The attendance of the session. Every category of the registry is
    /// present, possibly with an empty list.
    pub fn attendance_record(&self) -> AttendanceRecord {
        let attendance = self
            .categories
            .defs()
            .iter()
            .zip(self.attendance.iter())
            .map(|(def, list)| (def.category.clone(), list.clone()))
            .collect();
        AttendanceRecord {
            date: self.date.clone(),
            attendance,
        }
    }

    fn add_to_category(
        &mut self,
        student: &str,
        ordinal: usize,
        from_category: Option<(usize, usize)>,
    ) -> Transition {
        let exclusive = self.categories.defs()[ordinal].is_exclusive();
        if exclusive && self.attendance[ordinal].iter().any(|s| s == student) {
            return Transition::Unchanged;
        }
        self.attendance[ordinal].push(student.to_string());
        if let Some((src_ordinal, src_position)) = from_category {
            if src_ordinal != ordinal {
                self.attendance[src_ordinal].remove(src_position);
            }
        }
        let mut evicted = false;
        if exclusive {
            if let Some(pos) = self.seat_of(student) {
                self.seats.remove(&pos);
                evicted = true;
            }
        }
        Transition::Added { evicted }
    }

    fn resolve(&self, source: &Location) -> SeatingResult<String> {
        match source {
            Location::Roster { student } => {
                snafu::ensure!(
                    self.roster.contains(student),
                    NotFoundSnafu {
                        what: "student",
                        name: student.clone(),
                    }
                );
                Ok(student.clone())
            }
            Location::Seat { row, col } => {
                self.check_seat(*row, *col)?;
                self.occupant(*row, *col)
                    .map(|s| s.to_string())
                    .ok_or_else(|| SeatingError::NotFound {
                        what: "student in seat",
                        name: format!("{},{}", row, col),
                    })
            }
            Location::Category { ordinal, position } => {
                self.check_category(*ordinal)?;
                self.attendance[*ordinal]
                    .get(*position)
                    .cloned()
                    .ok_or_else(|| SeatingError::NotFound {
                        what: "category entry",
                        name: format!("{}#{}", self.categories.defs()[*ordinal].category, position),
                    })
            }
        }
    }

    fn check_target(&self, target: DropTarget) -> SeatingResult<()> {
        match target {
            DropTarget::Seat { row, col } => self.check_seat(row, col),
            DropTarget::Category { ordinal } => self.check_category(ordinal),
            DropTarget::Trash | DropTarget::Roster => Ok(()),
        }
    }

    fn check_seat(&self, row: u32, col: u32) -> SeatingResult<()> {
        snafu::ensure!(
            self.layout.contains(row, col),
            ValidationSnafu {
                field: "seat",
                reason: format!(
                    "{},{} is outside the {}x{} grid",
                    row, col, self.layout.rows, self.layout.columns
                ),
            }
        );
        Ok(())
    }

    fn check_category(&self, ordinal: usize) -> SeatingResult<()> {
        snafu::ensure!(
            ordinal < self.categories.len(),
            NotFoundSnafu {
                what: "attendance category",
                name: format!("#{}", ordinal),
            }
        );
        Ok(())
    }
}
