use std::collections::BTreeMap;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::config::*;

impl AttendanceRecord {
    pub fn new(date: &str) -> AttendanceRecord {
        AttendanceRecord {
            date: date.to_string(),
            attendance: BTreeMap::new(),
        }
    }

    pub fn students(&self, category: &str) -> &[String] {
        self.attendance
            .get(category)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// The number of occurrences of a student in a category.
    pub fn occurrences(&self, category: &str, student: &str) -> usize {
        self.students(category)
            .iter()
            .filter(|s| *s == student)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.attendance.values().all(|v| v.is_empty())
    }

    /// Human-readable lines, one per non-empty category, in registry order.
    /// Repeated names are folded with a count: `张三x2、李四`.
    pub fn describe(&self, registry: &CategoryRegistry) -> Vec<String> {
        let mut labels: Vec<&str> = registry
            .defs()
            .iter()
            .map(|d| d.category.as_str())
            .collect();
        for label in self.attendance.keys() {
            if registry.find(label).is_none() {
                labels.push(label.as_str());
            }
        }
        let mut lines = Vec::new();
        for label in labels {
            let students = self.students(label);
            if students.is_empty() {
                continue;
            }
            let mut seen: Vec<&str> = Vec::new();
            for s in students {
                if !seen.contains(&s.as_str()) {
                    seen.push(s.as_str());
                }
            }
            let formatted: Vec<String> = seen
                .iter()
                .map(|n| match self.occurrences(label, n) {
                    1 => n.to_string(),
                    c => format!("{}x{}", n, c),
                })
                .collect();
            lines.push(format!("{}: {}", label, formatted.join("、")));
        }
        lines
    }
}

/// The dated records of one class, sorted by date.
#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttendanceLog {
    records: Vec<AttendanceRecord>,
}

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum RecordChange {
    Inserted,
    Replaced,
}

impl AttendanceLog {
    pub fn new(mut records: Vec<AttendanceRecord>) -> AttendanceLog {
        records.sort_by(|a, b| a.date.cmp(&b.date));
        AttendanceLog { records }
    }

    pub fn records(&self) -> &[AttendanceRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn find(&self, date: &str) -> Option<&AttendanceRecord> {
        self.records.iter().find(|r| r.date == date)
    }

    /// Stores the record of a date, replacing the previous one for that date.
    pub fn upsert(&mut self, record: AttendanceRecord) -> RecordChange {
        let change = match self.records.iter_mut().find(|r| r.date == record.date) {
            Some(existing) => {
                *existing = record;
                RecordChange::Replaced
            }
            None => {
                self.records.push(record);
                RecordChange::Inserted
            }
        };
        self.sort();
        change
    }

    pub fn remove(&mut self, date: &str) -> SeatingResult<AttendanceRecord> {
        let idx = self
            .records
            .iter()
            .position(|r| r.date == date)
            .ok_or_else(|| SeatingError::NotFound {
                what: "attendance record for date",
                name: date.to_string(),
            })?;
        info!("Removing attendance record {}", date);
        Ok(self.records.remove(idx))
    }

    /// Replaces the record of `from_date` with `record`, which may carry
    /// another date.
    ///
    /// Moving a record onto a date that already has one requires `overwrite`;
    /// the record previously stored at the new date is then dropped.
    pub fn edit(
        &mut self,
        from_date: &str,
        record: AttendanceRecord,
        overwrite: bool,
    ) -> SeatingResult<()> {
        snafu::ensure!(
            !record.date.trim().is_empty(),
            ValidationSnafu {
                field: "date",
                reason: "the date is empty",
            }
        );
        let from_idx = self
            .records
            .iter()
            .position(|r| r.date == from_date)
            .ok_or_else(|| SeatingError::NotFound {
                what: "attendance record for date",
                name: from_date.to_string(),
            })?;
        if record.date != from_date {
            let conflict = self.find(&record.date).is_some();
            snafu::ensure!(
                !conflict || overwrite,
                ValidationSnafu {
                    field: "date",
                    reason: format!(
                        "a record for {} already exists, overwrite it explicitly",
                        record.date
                    ),
                }
            );
            debug!(
                "AttendanceLog::edit: moving {} to {} (conflict: {})",
                from_date, record.date, conflict
            );
            self.records.remove(from_idx);
            self.records.retain(|r| r.date != record.date);
            self.records.push(record);
        } else {
            self.records[from_idx] = record;
        }
        self.sort();
        Ok(())
    }

    fn sort(&mut self) {
        self.records.sort_by(|a, b| a.date.cmp(&b.date));
    }
}

/// Splits an edited list of names. Commas, spaces and new lines separate names.
pub fn parse_name_list(input: &str) -> Vec<String> {
    input
        .split(|c| c == ',' || c == ' ' || c == '\n')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(date: &str, cat: &str, students: &[&str]) -> AttendanceRecord {
        let mut r = AttendanceRecord::new(date);
        r.attendance.insert(
            cat.to_string(),
            students.iter().map(|s| s.to_string()).collect(),
        );
        r
    }

    fn dates(log: &AttendanceLog) -> Vec<&str> {
        log.records().iter().map(|r| r.date.as_str()).collect()
    }

    #[test]
    fn upsert_keeps_dates_sorted_and_unique() {
        let mut log = AttendanceLog::default();
        assert_eq!(
            log.upsert(record("2024-03-02", "迟", &["A"])),
            RecordChange::Inserted
        );
        log.upsert(record("2024-03-01", "迟", &["B"]));
        assert_eq!(
            log.upsert(record("2024-03-02", "旷", &["C"])),
            RecordChange::Replaced
        );
        assert_eq!(dates(&log), vec!["2024-03-01", "2024-03-02"]);
        assert_eq!(log.find("2024-03-02").unwrap().students("旷"), &["C"]);
    }

    #[test]
    fn edit_to_existing_date_requires_overwrite() {
        let mut log = AttendanceLog::new(vec![
            record("2024-03-02", "迟", &["A"]),
            record("2024-03-01", "迟", &["B"]),
        ]);
        let moved = record("2024-03-02", "睡", &["B"]);
        let err = log.edit("2024-03-01", moved.clone(), false).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(log.len(), 2);

        log.edit("2024-03-01", moved, true).unwrap();
        assert_eq!(dates(&log), vec!["2024-03-02"]);
        assert_eq!(log.find("2024-03-02").unwrap().students("睡"), &["B"]);

        log.edit("2024-03-02", record("2024-02-28", "迟", &["A"]), false)
            .unwrap();
        assert_eq!(dates(&log), vec!["2024-02-28"]);
        assert_eq!(
            log.edit("2024-01-01", record("2024-01-02", "迟", &[]), false)
                .unwrap_err()
                .kind(),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn remove_missing_date_is_not_found() {
        let mut log = AttendanceLog::new(vec![record("2024-03-01", "迟", &["A"])]);
        assert!(log.remove("2024-03-01").is_ok());
        assert_eq!(
            log.remove("2024-03-01").unwrap_err().kind(),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn describe_folds_repeats() {
        let mut r = record("2024-03-01", "迟", &["A", "B", "A"]);
        r.attendance.insert("加".to_string(), vec!["C".to_string()]);
        r.attendance.insert("旷".to_string(), vec![]);
        let lines = r.describe(&CategoryRegistry::reference());
        assert_eq!(lines, vec!["加: C".to_string(), "迟: Ax2、B".to_string()]);
        assert_eq!(r.occurrences("迟", "A"), 2);
    }

    #[test]
    fn name_lists_accept_several_separators() {
        assert_eq!(
            parse_name_list("A, B\nC  D,,"),
            vec!["A", "B", "C", "D"]
                .into_iter()
                .map(String::from)
                .collect::<Vec<_>>()
        );
    }
}
