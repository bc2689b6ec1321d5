mod config;
mod context;
mod layout;
mod records;
mod roster;

pub mod builder;
pub mod codec;
pub mod manual;
pub mod score;
pub mod session;

pub use crate::config::*;
pub use crate::context::SessionContext;
pub use crate::layout::{parse_aisle_columns, GridCell};
pub use crate::records::{parse_name_list, AttendanceLog, RecordChange};
pub use crate::roster::{
    parse_bulk_names, RosterFingerprint, RosterLookup, RosterStore, UpsertOutcome,
};
