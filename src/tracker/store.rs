// Persistence of the classes and their data in a key-value store.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::tracker::*;

pub const CLASSES_KEY: &str = "classes";
pub const CATEGORIES_KEY: &str = "attendanceCategories";
pub const LAYOUT_KEY: &str = "currentLayoutConfig";

/// The records of a class are stored under the name of the class.
pub fn records_key(class: &str) -> String {
    class.to_string()
}

pub fn seat_layout_key(class: &str) -> String {
    format!("{}_seatLayout", class)
}

pub fn bonus_key(class: &str) -> String {
    format!("{}_bonus", class)
}

/// Whole-value reads and writes of JSON documents.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<&str>;
    fn set(&mut self, key: &str, value: String) -> AppResult<()>;
    fn remove(&mut self, key: &str) -> AppResult<()>;
}

#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    values: BTreeMap<String, String>,
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(|s| s.as_str())
    }

    fn set(&mut self, key: &str, value: String) -> AppResult<()> {
        self.values.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> AppResult<()> {
        self.values.remove(key);
        Ok(())
    }
}

/// All the values in one JSON file. Every change rewrites the file through a
/// temporary file in the same directory.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl JsonFileStore {
    /// Opens a store. A missing file is an empty store, created on the first change.
    pub fn open(path: &Path) -> AppResult<JsonFileStore> {
        let path_s = path.display().to_string();
        let values = if path.exists() {
            let contents = fs::read_to_string(path).context(ReadingFileSnafu {
                path: path_s.clone(),
            })?;
            serde_json::from_str(&contents).context(StoreFormatSnafu { path: path_s })?
        } else {
            info!("Store {} does not exist yet, starting empty", path_s);
            BTreeMap::new()
        };
        Ok(JsonFileStore {
            path: path.to_path_buf(),
            values,
        })
    }

    fn flush(&self) -> AppResult<()> {
        let path_s = self.path.display().to_string();
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let contents = serde_json::to_string_pretty(&self.values).context(StoreFormatSnafu {
            path: path_s.clone(),
        })?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir).context(WritingStoreSnafu {
            path: path_s.clone(),
        })?;
        tmp.write_all(contents.as_bytes())
            .context(WritingStoreSnafu {
                path: path_s.clone(),
            })?;
        tmp.persist(&self.path)
            .context(PersistingStoreSnafu { path: path_s })?;
        debug!("JsonFileStore::flush: {} keys", self.values.len());
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(|s| s.as_str())
    }

    fn set(&mut self, key: &str, value: String) -> AppResult<()> {
        self.values.insert(key.to_string(), value);
        self.flush()
    }

    fn remove(&mut self, key: &str) -> AppResult<()> {
        if self.values.remove(key).is_some() {
            self.flush()?;
        }
        Ok(())
    }
}

/// Typed access to the stored values.
pub struct Repository<S: KeyValueStore> {
    store: S,
}

impl<S: KeyValueStore> Repository<S> {
    pub fn new(store: S) -> Repository<S> {
        Repository { store }
    }

    #[cfg(test)]
    pub fn store(&self) -> &S {
        &self.store
    }

    fn read<T: DeserializeOwned>(&self, key: &str) -> AppResult<Option<T>> {
        match self.store.get(key) {
            None => Ok(None),
            Some(s) => serde_json::from_str(s)
                .map(Some)
                .context(StoredValueSnafu { key }),
        }
    }

    fn write<T: Serialize>(&mut self, key: &str, value: &T) -> AppResult<()> {
        let s = serde_json::to_string(value).context(StoredValueSnafu { key })?;
        self.store.set(key, s)
    }

    pub fn rosters(&self) -> AppResult<RosterStore> {
        let classes: Option<Vec<ClassRoster>> = self.read(CLASSES_KEY)?;
        Ok(RosterStore::new(classes.unwrap_or_default()))
    }

    pub fn save_rosters(&mut self, rosters: &RosterStore) -> AppResult<()> {
        self.write(CLASSES_KEY, rosters)
    }

    pub fn roster(&self, class: &str) -> AppResult<ClassRoster> {
        let rosters = self.rosters()?;
        let roster = rosters.require(class).context(SeatingSnafu)?;
        Ok(roster.clone())
    }

    /// The stored registry, or the reference one.
    pub fn categories(&self) -> AppResult<CategoryRegistry> {
        let defs: Option<Vec<AttendanceCategoryDef>> = self.read(CATEGORIES_KEY)?;
        match defs {
            Some(defs) => CategoryRegistry::new(defs).context(SeatingSnafu),
            None => Ok(CategoryRegistry::reference()),
        }
    }

    pub fn save_categories(&mut self, categories: &CategoryRegistry) -> AppResult<()> {
        self.write(CATEGORIES_KEY, categories)
    }

    pub fn layout(&self, default: &SeatLayoutConfig) -> AppResult<SeatLayoutConfig> {
        let layout: Option<SeatLayoutConfig> = self.read(LAYOUT_KEY)?;
        match layout {
            Some(l) => {
                l.validate().context(SeatingSnafu)?;
                Ok(l)
            }
            None => Ok(default.clone()),
        }
    }

    pub fn save_layout(&mut self, layout: &SeatLayoutConfig) -> AppResult<()> {
        self.write(LAYOUT_KEY, layout)
    }

    pub fn attendance_log(&self, class: &str) -> AppResult<AttendanceLog> {
        let records: Option<Vec<AttendanceRecord>> = self.read(&records_key(class))?;
        Ok(AttendanceLog::new(records.unwrap_or_default()))
    }

    pub fn save_attendance_log(&mut self, class: &str, log: &AttendanceLog) -> AppResult<()> {
        self.write(&records_key(class), log)
    }

    pub fn seat_snapshot(&self, class: &str) -> AppResult<Option<SeatLayoutSnapshot>> {
        self.read(&seat_layout_key(class))
    }

    pub fn save_seat_snapshot(
        &mut self,
        class: &str,
        snapshot: &SeatLayoutSnapshot,
    ) -> AppResult<()> {
        self.write(&seat_layout_key(class), snapshot)
    }

    pub fn bonuses(&self, class: &str) -> AppResult<BonusScores> {
        let bonuses: Option<BonusScores> = self.read(&bonus_key(class))?;
        Ok(bonuses.unwrap_or_default())
    }

    pub fn save_bonuses(&mut self, class: &str, bonuses: &BonusScores) -> AppResult<()> {
        self.write(&bonus_key(class), bonuses)
    }

    /// Removes a class and everything stored for it.
    pub fn remove_class(&mut self, class: &str) -> AppResult<ClassRoster> {
        let mut rosters = self.rosters()?;
        let removed = rosters.remove(class).context(SeatingSnafu)?;
        self.save_rosters(&rosters)?;
        self.store.remove(&records_key(class))?;
        self.store.remove(&seat_layout_key(class))?;
        self.store.remove(&bonus_key(class))?;
        Ok(removed)
    }
}
