// Primitives for reading lists of students from files.

use std::fs;
use std::path::Path;

use calamine::{open_workbook, DataType, Reader, Xlsx};

use crate::tracker::*;

/// Reads the names of the students from a file, depending on its extension:
/// Excel (`.xlsx`) and CSV files use their first column, other files are read
/// as text with one name per line.
pub fn read_roster_file(path: &str, worksheet_name: Option<&str>) -> AppResult<Vec<String>> {
    let extension = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase());
    let names = match extension.as_deref() {
        Some("xlsx") => read_excel_names(path, worksheet_name)?,
        Some("csv") => read_csv_names(path)?,
        _ => {
            let contents = fs::read_to_string(path).context(ReadingFileSnafu { path })?;
            parse_bulk_names(&contents)
        }
    };
    info!("Read {} names from {}", names.len(), path);
    Ok(names)
}

pub fn read_csv_names(path: &str) -> AppResult<Vec<String>> {
    let rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .context(CsvSnafu { path })?;
    let mut res: Vec<String> = Vec::new();
    for (idx, line_r) in rdr.into_records().enumerate() {
        let line = line_r.context(CsvSnafu { path })?;
        debug!("read_csv_names: {:?} {:?}", idx + 1, line);
        if let Some(name) = line.get(0).map(|s| s.trim()).filter(|s| !s.is_empty()) {
            res.push(name.to_string());
        }
    }
    Ok(res)
}

pub fn read_excel_names(path: &str, worksheet_name: Option<&str>) -> AppResult<Vec<String>> {
    let mut workbook: Xlsx<_> = open_workbook(path).context(OpeningExcelSnafu { path })?;
    let wrange = match worksheet_name {
        Some(name) => workbook
            .worksheet_range(name)
            .context(MissingWorksheetSnafu { path, name })?
            .context(OpeningExcelSnafu { path })?,
        None => workbook
            .worksheet_range_at(0)
            .context(MissingWorksheetSnafu {
                path,
                name: "#1".to_string(),
            })?
            .context(OpeningExcelSnafu { path })?,
    };
    let mut res: Vec<String> = Vec::new();
    for (idx, row) in wrange.rows().enumerate() {
        let cell = match row.first() {
            Some(c) => c,
            None => continue,
        };
        let name = match cell {
            DataType::String(s) => s.trim().to_string(),
            DataType::Int(i) => i.to_string(),
            DataType::Float(f) => f.to_string(),
            DataType::Empty => continue,
            x => {
                whatever!("Wrong data type in row {}: {:?}", idx + 1, x)
            }
        };
        if !name.is_empty() {
            res.push(name);
        }
    }
    debug!("read_excel_names: {:?}", res);
    Ok(res)
}
