use std::path::{Path, PathBuf};

use anyhow::{bail, ensure, Context};
use ndarray::Array2;
use ndarray_npy::ReadNpyError;

use crate::data::table::ColumnTable;

/// A source of named numeric columns, loaded once at startup.
///
/// Implementations preserve the on-disk row order exactly; nothing
/// downstream re-sorts rows.
pub trait DataSource {
    /// Human-readable description used in log lines and error context.
    fn describe(&self) -> String;

    /// Read the whole source into a column-major table.
    fn load(&self) -> anyhow::Result<ColumnTable>;
}

/// Comma-separated text file with a header row.
pub struct CsvSource {
    pub path: PathBuf,
    /// Drop the first column (a row index written by pandas).
    pub drop_index_column: bool,
}

impl CsvSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), drop_index_column: false }
    }

    /// Treat the first column as a row index and drop it.
    pub fn index_column(mut self) -> Self {
        self.drop_index_column = true;
        self
    }
}

impl DataSource for CsvSource {
    fn describe(&self) -> String {
        format!("CSV {}", self.path.display())
    }

    fn load(&self) -> anyhow::Result<ColumnTable> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b',')
            .has_headers(true)
            .from_path(&self.path)
            .with_context(|| format!("Cannot open {}", self.path.display()))?;

        let header: Vec<String> = reader
            .headers()
            .with_context(|| format!("Cannot read header of {}", self.path.display()))?
            .iter()
            .map(|s| s.trim().to_string())
            .collect();

        let skip = usize::from(self.drop_index_column);
        ensure!(
            header.len() > skip,
            "{} has no data columns",
            self.path.display()
        );
        let columns: Vec<String> = header[skip..].to_vec();

        // Column-major: column_data[col_idx][row_idx]
        let mut column_data: Vec<Vec<f64>> = vec![Vec::new(); columns.len()];
        for (row_idx, record) in reader.records().enumerate() {
            let record = record.with_context(|| {
                format!("Malformed record {} in {}", row_idx + 1, self.path.display())
            })?;
            ensure!(
                record.len() == header.len(),
                "Record {} in {} has {} fields, expected {}",
                row_idx + 1,
                self.path.display(),
                record.len(),
                header.len()
            );
            for (col_idx, col_data) in column_data.iter_mut().enumerate() {
                let cell = record[col_idx + skip].trim();
                let value = parse_cell(cell).with_context(|| {
                    format!(
                        "Non-numeric value {:?} at record {}, column '{}' in {}",
                        cell,
                        row_idx + 1,
                        columns[col_idx],
                        self.path.display()
                    )
                })?;
                col_data.push(value);
            }
        }

        ColumnTable::new(columns, column_data)
    }
}

/// Parse one CSV cell. Empty cells and the usual NaN spellings load as NaN.
fn parse_cell(cell: &str) -> anyhow::Result<f64> {
    if cell.is_empty() || cell.eq_ignore_ascii_case("nan") {
        return Ok(f64::NAN);
    }
    Ok(cell.parse::<f64>()?)
}

/// Two-dimensional NumPy `.npy` array with caller-supplied column names.
pub struct NpySource {
    pub path: PathBuf,
    pub columns: Vec<String>,
}

impl NpySource {
    pub fn new(path: impl Into<PathBuf>, columns: &[&str]) -> Self {
        Self {
            path: path.into(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
        }
    }
}

impl DataSource for NpySource {
    fn describe(&self) -> String {
        format!("NPY {} [{}]", self.path.display(), self.columns.join(", "))
    }

    fn load(&self) -> anyhow::Result<ColumnTable> {
        let array = read_npy_f64(&self.path)?;
        let (rows, cols) = array.dim();
        if cols != self.columns.len() {
            bail!(
                "{} has {} columns, expected {} ({})",
                self.path.display(),
                cols,
                self.columns.len(),
                self.columns.join(", ")
            );
        }

        let column_data: Vec<Vec<f64>> = array.columns().into_iter().map(|c| c.to_vec()).collect();
        tracing::debug!("Read {rows}x{cols} array from {}", self.path.display());
        ColumnTable::new(self.columns.clone(), column_data)
    }
}

/// Read a 2-D array stored as either `f8` or `f4`.
fn read_npy_f64(path: &Path) -> anyhow::Result<Array2<f64>> {
    match ndarray_npy::read_npy::<_, Array2<f64>>(path) {
        Ok(array) => Ok(array),
        Err(ReadNpyError::WrongDescriptor(_)) => {
            let narrow: Array2<f32> = ndarray_npy::read_npy(path)
                .with_context(|| format!("Cannot read {} as a 2-D float array", path.display()))?;
            Ok(narrow.mapv(f64::from))
        }
        Err(e) => Err(e).with_context(|| format!("Cannot read {}", path.display())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use std::io::Write;

    #[test]
    fn test_csv_drops_index_column() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, ",x,y,z,gc_content_percentage").unwrap();
        writeln!(file, "0,1.0,2.0,3.0,40.5").unwrap();
        writeln!(file, "1,4.0,5.0,6.0,55.0").unwrap();
        file.flush().unwrap();

        let table = CsvSource::new(file.path()).index_column().load().unwrap();
        assert_eq!(table.columns, vec!["x", "y", "z", "gc_content_percentage"]);
        assert_eq!(table.row_count, 2);
        assert_eq!(table.column("x").unwrap(), &[1.0, 4.0]);
        assert_eq!(table.column("gc_content_percentage").unwrap(), &[40.5, 55.0]);
    }

    #[test]
    fn test_csv_rejects_non_numeric_cell() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "x,y").unwrap();
        writeln!(file, "1.0,abc").unwrap();
        file.flush().unwrap();

        let err = CsvSource::new(file.path()).load().unwrap_err();
        assert!(format!("{err:#}").contains("column 'y'"));
    }

    #[test]
    fn test_csv_missing_file_is_error() {
        let source = CsvSource::new("/nonexistent/bins.csv");
        assert!(source.load().is_err());
    }

    #[test]
    fn test_npy_columns_in_row_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.npy");
        let data: Array2<f64> = array![[0.0, 1.0, 2.0], [3.0, 4.0, 5.0]];
        ndarray_npy::write_npy(&path, &data).unwrap();

        let table = NpySource::new(&path, &["x", "y", "z"]).load().unwrap();
        assert_eq!(table.column("x").unwrap(), &[0.0, 3.0]);
        assert_eq!(table.column("z").unwrap(), &[2.0, 5.0]);
    }

    #[test]
    fn test_npy_widens_f32() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("b.npy");
        let data: Array2<f32> = array![[0.5f32, 1.5], [2.5, 3.5]];
        ndarray_npy::write_npy(&path, &data).unwrap();

        let table = NpySource::new(&path, &["a", "b"]).load().unwrap();
        assert_eq!(table.column("b").unwrap(), &[1.5, 3.5]);
    }

    #[test]
    fn test_npy_column_count_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("c.npy");
        let data: Array2<f64> = array![[0.0, 1.0], [2.0, 3.0]];
        ndarray_npy::write_npy(&path, &data).unwrap();

        assert!(NpySource::new(&path, &["x", "y", "z"]).load().is_err());
    }
}
