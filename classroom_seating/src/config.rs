// ********* Data model ***********

use serde::{Deserialize, Serialize};
use snafu::Snafu;
use std::collections::BTreeMap;

/// How a category interacts with the seating grid.
///
/// Only the placement rules depend on the area type. Scoring treats all the
/// categories the same way.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum AreaType {
    /// A student may be added several times, for repeated infractions.
    Normal,
    /// A student appears at most once, and is removed from the seating grid
    /// while in this category (the leave category).
    ExclusiveLeave,
}

// Stored as the integer flag 0 / 1 for compatibility with existing data.
impl From<u8> for AreaType {
    fn from(flag: u8) -> AreaType {
        match flag {
            1 => AreaType::ExclusiveLeave,
            _ => AreaType::Normal,
        }
    }
}

impl From<AreaType> for u8 {
    fn from(area: AreaType) -> u8 {
        match area {
            AreaType::Normal => 0,
            AreaType::ExclusiveLeave => 1,
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct AttendanceCategoryDef {
    /// The label, usually a single glyph.
    pub category: String,
    /// Subtracted from the score for every occurrence. Negative values add points.
    #[serde(rename = "score")]
    pub penalty_score: i32,
    #[serde(rename = "areaType")]
    pub area_type: AreaType,
}

impl AttendanceCategoryDef {
    pub fn new(category: &str, penalty_score: i32, area_type: AreaType) -> AttendanceCategoryDef {
        AttendanceCategoryDef {
            category: category.to_string(),
            penalty_score,
            area_type,
        }
    }

    pub fn is_exclusive(&self) -> bool {
        self.area_type == AreaType::ExclusiveLeave
    }
}

/// A class and its students.
///
/// The order of the students matters: share codes refer to students by their
/// position in this list.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct ClassRoster {
    #[serde(rename = "class")]
    pub name: String,
    #[serde(rename = "name")]
    pub students: Vec<String>,
}

/// The attendance of one class on one date.
///
/// A name may appear several times in the same category. Each occurrence counts
/// separately when computing scores.
#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub date: String,
    #[serde(default)]
    pub attendance: BTreeMap<String, Vec<String>>,
}

/// The attendance data of a session, in the same shape as a stored record.
pub type AttendanceData = AttendanceRecord;

/// Manual score adjustments, per student name.
pub type BonusScores = BTreeMap<String, i64>;

/// The dimensions of the seating grid.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct SeatLayoutConfig {
    pub rows: u32,
    pub columns: u32,
    /// 1-based logical columns before which an aisle is inserted.
    #[serde(rename = "aisleColumns", default)]
    pub aisle_columns: Vec<u32>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct SeatAssignment {
    pub name: String,
    /// 1-based, counted from the back of the room.
    pub row: u32,
    /// 1-based logical column. Aisles are not counted.
    pub col: u32,
}

/// The latest seating of a class.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct SeatLayoutSnapshot {
    pub rows: u32,
    pub columns: u32,
    #[serde(default)]
    pub seats: Vec<SeatAssignment>,
}

// ******** Errors *********

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum ErrorKind {
    Validation,
    Format,
    NotFound,
}

/// Errors that prevent an operation from completing.
///
/// None of them leaves partial state behind: the operation that returns an
/// error did not modify its inputs.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum SeatingError {
    #[snafu(display("invalid {field}: {reason}"))]
    Validation { field: &'static str, reason: String },

    #[snafu(display("malformed export code: {reason}"))]
    Format { reason: String },

    #[snafu(display("export code payload is not valid base64"))]
    Base64 { source: base64::DecodeError },

    #[snafu(display("export code payload is not valid JSON"))]
    Json { source: serde_json::Error },

    #[snafu(display("legacy export code is not valid percent-encoded text"))]
    PercentDecoding { source: std::str::Utf8Error },

    #[snafu(display("no {what} named {name:?}"))]
    NotFound { what: &'static str, name: String },
}

impl SeatingError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SeatingError::Validation { .. } => ErrorKind::Validation,
            SeatingError::Format { .. }
            | SeatingError::Base64 { .. }
            | SeatingError::Json { .. }
            | SeatingError::PercentDecoding { .. } => ErrorKind::Format,
            SeatingError::NotFound { .. } => ErrorKind::NotFound,
        }
    }
}

pub type SeatingResult<T> = Result<T, SeatingError>;

// ********* Category registry **********

/// The ordered list of attendance categories.
///
/// The position of a category in the registry (its ordinal) is part of the
/// binary share code. Reordering the registry changes the meaning of codes
/// produced earlier.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryRegistry {
    categories: Vec<AttendanceCategoryDef>,
}

impl CategoryRegistry {
    /// The label of the bonus category in the reference registry.
    pub const BONUS: &'static str = "加";

    /// The registry used by all the devices sharing codes.
    pub fn reference() -> CategoryRegistry {
        CategoryRegistry {
            categories: vec![
                AttendanceCategoryDef::new("加", -1, AreaType::Normal),
                AttendanceCategoryDef::new("迟", 1, AreaType::Normal),
                AttendanceCategoryDef::new("假", 1, AreaType::ExclusiveLeave),
                AttendanceCategoryDef::new("旷", 5, AreaType::Normal),
                AttendanceCategoryDef::new("睡", 2, AreaType::Normal),
                AttendanceCategoryDef::new("玩", 2, AreaType::Normal),
            ],
        }
    }

    pub fn new(categories: Vec<AttendanceCategoryDef>) -> SeatingResult<CategoryRegistry> {
        snafu::ensure!(
            !categories.is_empty(),
            ValidationSnafu {
                field: "category registry",
                reason: "at least one category is required",
            }
        );
        for (idx, def) in categories.iter().enumerate() {
            snafu::ensure!(
                !def.category.is_empty(),
                ValidationSnafu {
                    field: "category registry",
                    reason: format!("category #{} has an empty label", idx),
                }
            );
            snafu::ensure!(
                !categories[..idx].iter().any(|d| d.category == def.category),
                ValidationSnafu {
                    field: "category registry",
                    reason: format!("duplicate category {:?}", def.category),
                }
            );
        }
        Ok(CategoryRegistry { categories })
    }

    pub fn defs(&self) -> &[AttendanceCategoryDef] {
        &self.categories
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    pub fn get(&self, ordinal: usize) -> Option<&AttendanceCategoryDef> {
        self.categories.get(ordinal)
    }

    pub fn ordinal_of(&self, label: &str) -> Option<usize> {
        self.categories.iter().position(|d| d.category == label)
    }

    pub fn find(&self, label: &str) -> Option<&AttendanceCategoryDef> {
        self.categories.iter().find(|d| d.category == label)
    }

    /// Looks up a category, failing with a NotFound error.
    pub fn require(&self, label: &str) -> SeatingResult<usize> {
        self.ordinal_of(label).ok_or_else(|| SeatingError::NotFound {
            what: "attendance category",
            name: label.to_string(),
        })
    }
}

impl Default for CategoryRegistry {
    fn default() -> Self {
        CategoryRegistry::reference()
    }
}
