use anyhow::{bail, Context, Result};
use std::fs::File;
use std::path::{Path, PathBuf};

/// Destination the crawl appends records to, one row per call. Row positions
/// are 1-based; inserting shifts existing rows at and below the position down.
pub trait RowSink {
    fn insert_row(&mut self, position: usize, values: &[String]) -> Result<()>;
}

/// A worksheet persisted as a CSV file. The whole sheet is held in memory and
/// rewritten after every mutation, so each call lands on disk before the next
/// record is scraped.
pub struct CsvSheet {
    path: PathBuf,
    rows: Vec<Vec<String>>,
}

impl CsvSheet {
    /// Opens an existing sheet, or starts an empty one when the file does not
    /// exist yet. Row 1 is whatever the file starts with; header semantics
    /// are up to the caller.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut rows = Vec::new();

        if path.exists() {
            let file = File::open(&path)
                .with_context(|| format!("Failed to open sheet: {}", path.display()))?;
            let mut reader = csv::ReaderBuilder::new()
                .has_headers(false)
                .flexible(true)
                .from_reader(file);
            for result in reader.records() {
                let record = result.context("Failed to read sheet row")?;
                rows.push(record.iter().map(|s| s.to_string()).collect());
            }
        }

        Ok(Self { path, rows })
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// All values of a 1-based column, top to bottom; rows too short for the
    /// column yield empty strings.
    pub fn col_values(&self, column: usize) -> Vec<String> {
        self.rows
            .iter()
            .map(|row| row.get(column.saturating_sub(1)).cloned().unwrap_or_default())
            .collect()
    }

    /// Overwrites one cell (1-based row and column), growing the sheet as
    /// needed, and persists the change.
    pub fn update_cell(&mut self, row: usize, column: usize, value: &str) -> Result<()> {
        if row == 0 || column == 0 {
            bail!("Sheet positions are 1-based");
        }

        while self.rows.len() < row {
            self.rows.push(vec![String::new()]);
        }
        let cells = &mut self.rows[row - 1];
        if cells.len() < column {
            cells.resize(column, String::new());
        }
        cells[column - 1] = value.to_string();

        self.write_out()
    }

    fn write_out(&self) -> Result<()> {
        let file = File::create(&self.path)
            .with_context(|| format!("Failed to write sheet: {}", self.path.display()))?;
        let mut writer = csv::WriterBuilder::new().flexible(true).from_writer(file);
        for row in &self.rows {
            writer.write_record(row)?;
        }
        writer.flush()?;
        Ok(())
    }
}

impl RowSink for CsvSheet {
    fn insert_row(&mut self, position: usize, values: &[String]) -> Result<()> {
        if position == 0 {
            bail!("Sheet positions are 1-based");
        }
        // A position past the end appends.
        let index = (position - 1).min(self.rows.len());
        self.rows.insert(index, values.to_vec());
        self.write_out()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn insert_shifts_rows_down() {
        let dir = tempfile::tempdir().unwrap();
        let mut sheet = CsvSheet::open(dir.path().join("sheet.csv")).unwrap();

        sheet.insert_row(1, &row(&["url", "resolution"])).unwrap();
        sheet.insert_row(2, &row(&["a", "1"])).unwrap();
        sheet.insert_row(2, &row(&["b", "2"])).unwrap();

        assert_eq!(sheet.col_values(1), vec!["url", "b", "a"]);
    }

    #[test]
    fn changes_survive_reopening() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sheet.csv");

        {
            let mut sheet = CsvSheet::open(&path).unwrap();
            sheet.insert_row(1, &row(&["title", "price"])).unwrap();
            sheet.insert_row(2, &row(&["Квартира", "30 000 $"])).unwrap();
        }

        let sheet = CsvSheet::open(&path).unwrap();
        assert_eq!(sheet.row_count(), 2);
        assert_eq!(sheet.col_values(2), vec!["price", "30 000 $"]);
    }

    #[test]
    fn update_cell_grows_the_sheet() {
        let dir = tempfile::tempdir().unwrap();
        let mut sheet = CsvSheet::open(dir.path().join("sheet.csv")).unwrap();

        sheet.update_cell(3, 2, "1920x1080").unwrap();

        assert_eq!(sheet.row_count(), 3);
        assert_eq!(sheet.col_values(2), vec!["", "", "1920x1080"]);
    }

    #[test]
    fn positions_are_one_based() {
        let dir = tempfile::tempdir().unwrap();
        let mut sheet = CsvSheet::open(dir.path().join("sheet.csv")).unwrap();

        assert!(sheet.insert_row(0, &row(&["x"])).is_err());
        assert!(sheet.update_cell(0, 1, "x").is_err());
    }
}
