use std::fmt::Display;
use std::str::FromStr;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::config::*;

impl ClassRoster {
    /// Creates a roster. The class name must not be empty, there must be at
    /// least one student, and student names must be unique.
    pub fn new(name: &str, students: &[String]) -> SeatingResult<ClassRoster> {
        let name = name.trim();
        snafu::ensure!(
            !name.is_empty(),
            ValidationSnafu {
                field: "class name",
                reason: "the class name is empty",
            }
        );
        snafu::ensure!(
            !students.is_empty(),
            ValidationSnafu {
                field: "roster",
                reason: format!("class {} has no students", name),
            }
        );
        for (idx, s) in students.iter().enumerate() {
            snafu::ensure!(
                !s.trim().is_empty(),
                ValidationSnafu {
                    field: "roster",
                    reason: format!("student #{} has an empty name", idx + 1),
                }
            );
            snafu::ensure!(
                !students[..idx].contains(s),
                ValidationSnafu {
                    field: "roster",
                    reason: format!("student {} appears more than once", s),
                }
            );
        }
        Ok(ClassRoster {
            name: name.to_string(),
            students: students.to_vec(),
        })
    }

    /// The 0-based position of a student.
    pub fn index_of(&self, student: &str) -> Option<usize> {
        self.students.iter().position(|s| s == student)
    }

    pub fn contains(&self, student: &str) -> bool {
        self.index_of(student).is_some()
    }

    pub fn student(&self, index: usize) -> Option<&str> {
        self.students.get(index).map(|s| s.as_str())
    }

    pub fn fingerprint(&self) -> RosterFingerprint {
        let digest = sha256::digest(self.students.join("\n"));
        RosterFingerprint {
            count: self.students.len(),
            hash: digest[..RosterFingerprint::HASH_LEN].to_string(),
        }
    }
}

/// A short summary of the order of a roster.
///
/// Share codes carry the fingerprint of the roster they were encoded with, so
/// that a decoder can tell when its own roster was reordered or edited since.
#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub struct RosterFingerprint {
    pub count: usize,
    pub hash: String,
}

impl RosterFingerprint {
    const HASH_LEN: usize = 8;
}

impl Display for RosterFingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.count, self.hash)
    }
}

impl FromStr for RosterFingerprint {
    type Err = SeatingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || SeatingError::Format {
            reason: format!("invalid roster fingerprint {:?}", s),
        };
        let (count, hash) = s.split_once(':').ok_or_else(bad)?;
        let count = count.parse::<usize>().map_err(|_| bad())?;
        if hash.is_empty() || !hash.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(bad());
        }
        Ok(RosterFingerprint {
            count,
            hash: hash.to_lowercase(),
        })
    }
}

/// Resolves a class by its name. Used by the decoder to turn student
/// indices back into names.
pub trait RosterLookup {
    fn find_class(&self, name: &str) -> Option<&ClassRoster>;
}

impl RosterLookup for [ClassRoster] {
    fn find_class(&self, name: &str) -> Option<&ClassRoster> {
        self.iter().find(|c| c.name == name)
    }
}

impl RosterLookup for Vec<ClassRoster> {
    fn find_class(&self, name: &str) -> Option<&ClassRoster> {
        self.as_slice().find_class(name)
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum UpsertOutcome {
    Added,
    Replaced,
}

/// All the classes, kept sorted by name.
#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RosterStore {
    classes: Vec<ClassRoster>,
}

impl RosterStore {
    pub fn new(mut classes: Vec<ClassRoster>) -> RosterStore {
        classes.sort_by(|a, b| a.name.cmp(&b.name));
        RosterStore { classes }
    }

    pub fn classes(&self) -> &[ClassRoster] {
        &self.classes
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Adds a class, or replaces the class with the same name.
    pub fn upsert(&mut self, roster: ClassRoster) -> UpsertOutcome {
        let outcome = match self.classes.iter_mut().find(|c| c.name == roster.name) {
            Some(existing) => {
                *existing = roster;
                UpsertOutcome::Replaced
            }
            None => {
                self.classes.push(roster);
                UpsertOutcome::Added
            }
        };
        self.classes.sort_by(|a, b| a.name.cmp(&b.name));
        debug!("RosterStore::upsert: {:?}", outcome);
        outcome
    }

    pub fn remove(&mut self, name: &str) -> SeatingResult<ClassRoster> {
        let idx = self
            .classes
            .iter()
            .position(|c| c.name == name)
            .ok_or_else(|| SeatingError::NotFound {
                what: "class",
                name: name.to_string(),
            })?;
        info!("Removing class {}", name);
        Ok(self.classes.remove(idx))
    }

    pub fn require(&self, name: &str) -> SeatingResult<&ClassRoster> {
        self.find_class(name).ok_or_else(|| SeatingError::NotFound {
            what: "class",
            name: name.to_string(),
        })
    }
}

impl RosterLookup for RosterStore {
    fn find_class(&self, name: &str) -> Option<&ClassRoster> {
        self.classes.find_class(name)
    }
}

/// Splits a pasted list of names. Names are separated by new lines or tabs,
/// which covers a column copied from a spreadsheet.
pub fn parse_bulk_names(input: &str) -> Vec<String> {
    input
        .split(|c| c == '\n' || c == '\t')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}
