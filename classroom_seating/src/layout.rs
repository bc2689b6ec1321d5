use log::debug;

use crate::config::*;

/// One position of the rendered grid.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum GridCell {
    Seat { row: u32, col: u32 },
    Aisle,
}

impl SeatLayoutConfig {
    pub const MIN_SIZE: u32 = 1;
    pub const MAX_SIZE: u32 = 15;

    pub const DEFAULT_LAYOUT: SeatLayoutConfig = SeatLayoutConfig {
        rows: 11,
        columns: 12,
        aisle_columns: Vec::new(),
    };

    /// Creates a layout, checking the dimensions.
    ///
    /// Aisle positions outside the grid are dropped, duplicates are removed.
    pub fn new(rows: u32, columns: u32, aisle_columns: &[u32]) -> SeatingResult<SeatLayoutConfig> {
        check_dimension("rows", rows)?;
        check_dimension("columns", columns)?;
        let mut aisles: Vec<u32> = Vec::new();
        for &a in aisle_columns {
            if a >= 1 && a <= columns && !aisles.contains(&a) {
                aisles.push(a);
            }
        }
        Ok(SeatLayoutConfig {
            rows,
            columns,
            aisle_columns: aisles,
        })
    }

    /// Creates a layout from the raw text of a form: `"3, 7"` for the aisles.
    pub fn from_input(rows: &str, columns: &str, aisles: &str) -> SeatingResult<SeatLayoutConfig> {
        let rows = parse_dimension("rows", rows)?;
        let columns = parse_dimension("columns", columns)?;
        let aisle_columns = parse_aisle_columns(aisles, columns);
        SeatLayoutConfig::new(rows, columns, &aisle_columns)
    }

    /// Checks the dimensions of a layout that did not go through `new`, for
    /// example one read back from storage.
    pub fn validate(&self) -> SeatingResult<()> {
        check_dimension("rows", self.rows)?;
        check_dimension("columns", self.columns)
    }

    /// The same aisles with other dimensions.
    pub fn resized(&self, rows: u32, columns: u32) -> SeatingResult<SeatLayoutConfig> {
        SeatLayoutConfig::new(rows, columns, &self.aisle_columns)
    }

    pub fn contains(&self, row: u32, col: u32) -> bool {
        row >= 1 && row <= self.rows && col >= 1 && col <= self.columns
    }

    /// The number of grid columns, aisles included.
    pub fn grid_width(&self) -> u32 {
        self.columns + self.aisle_columns.len() as u32
    }

    pub fn seat_count(&self) -> u32 {
        self.rows * self.columns
    }

    /// The cells in display order: the back row first, left to right, with an
    /// aisle before each aisle column.
    pub fn rendered_rows(&self) -> Vec<Vec<GridCell>> {
        (1..=self.rows)
            .map(|render_row| {
                let row = self.rows - render_row + 1;
                let mut cells = Vec::with_capacity(self.grid_width() as usize);
                for col in 1..=self.columns {
                    if self.aisle_columns.contains(&col) {
                        cells.push(GridCell::Aisle);
                    }
                    cells.push(GridCell::Seat { row, col });
                }
                cells
            })
            .collect()
    }
}

impl Default for SeatLayoutConfig {
    fn default() -> Self {
        SeatLayoutConfig::DEFAULT_LAYOUT
    }
}

/// Parses a comma-separated list of aisle positions.
///
/// Entries that are not numbers or fall outside `1..=columns` are ignored.
/// The first occurrence of a repeated entry is kept.
pub fn parse_aisle_columns(input: &str, columns: u32) -> Vec<u32> {
    let mut res: Vec<u32> = Vec::new();
    for part in input.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        match part.parse::<u32>() {
            Ok(a) if a >= 1 && a <= columns => {
                if !res.contains(&a) {
                    res.push(a);
                }
            }
            _ => {
                debug!("parse_aisle_columns: ignoring entry {:?}", part);
            }
        }
    }
    res
}

fn parse_dimension(field: &'static str, input: &str) -> SeatingResult<u32> {
    input.trim().parse::<u32>().map_err(|_| SeatingError::Validation {
        field,
        reason: format!("{:?} is not a number", input),
    })
}

fn check_dimension(field: &'static str, value: u32) -> SeatingResult<()> {
    snafu::ensure!(
        (SeatLayoutConfig::MIN_SIZE..=SeatLayoutConfig::MAX_SIZE).contains(&value),
        ValidationSnafu {
            field,
            reason: format!(
                "{} is outside [{}, {}]",
                value,
                SeatLayoutConfig::MIN_SIZE,
                SeatLayoutConfig::MAX_SIZE
            ),
        }
    );
    Ok(())
}
