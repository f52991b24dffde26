use anyhow::{bail, ensure};

pub const X: &str = "x";
pub const Y: &str = "y";
pub const Z: &str = "z";

/// Named numeric columns stored column-major.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnTable {
    pub columns: Vec<String>,
    /// column_data[col_idx][row_idx]
    pub data: Vec<Vec<f64>>,
    pub row_count: usize,
}

impl ColumnTable {
    /// Build a table, checking that every column has the same length.
    pub fn new(columns: Vec<String>, data: Vec<Vec<f64>>) -> anyhow::Result<Self> {
        ensure!(
            columns.len() == data.len(),
            "{} column names for {} columns",
            columns.len(),
            data.len()
        );
        let row_count = data.first().map_or(0, Vec::len);
        for (name, col) in columns.iter().zip(&data) {
            ensure!(
                col.len() == row_count,
                "Column '{}' has {} rows, expected {}",
                name,
                col.len(),
                row_count
            );
        }
        for (i, name) in columns.iter().enumerate() {
            if columns[..i].contains(name) {
                bail!("Duplicate column '{name}'");
            }
        }
        Ok(Self { columns, data, row_count })
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.column_index(name).map(|i| self.data[i].as_slice())
    }

    pub fn column_mut(&mut self, name: &str) -> Option<&mut Vec<f64>> {
        self.column_index(name).map(move |i| &mut self.data[i])
    }

    /// New table with only `names`, in the order given.
    pub fn select(&self, names: &[&str]) -> anyhow::Result<ColumnTable> {
        let mut data = Vec::with_capacity(names.len());
        for name in names {
            match self.column(name) {
                Some(col) => data.push(col.to_vec()),
                None => bail!("Column '{}' not found (have: {})", name, self.columns.join(", ")),
            }
        }
        ColumnTable::new(names.iter().map(|n| n.to_string()).collect(), data)
    }

    /// Positional horizontal concatenation. Row `i` of the result is row
    /// `i` of every input; no key matching and no re-sorting.
    pub fn hstack(tables: Vec<ColumnTable>) -> anyhow::Result<ColumnTable> {
        let Some(first) = tables.first() else {
            return ColumnTable::new(Vec::new(), Vec::new());
        };
        let rows = first.row_count;
        for (i, t) in tables.iter().enumerate() {
            ensure!(
                t.row_count == rows,
                "Row count mismatch: table {} has {} rows, table 0 has {} rows",
                i,
                t.row_count,
                rows
            );
        }

        let mut columns = Vec::new();
        let mut data = Vec::new();
        for t in tables {
            columns.extend(t.columns);
            data.extend(t.data);
        }
        // Empty-width inputs would otherwise lose the shared row count.
        let mut table = ColumnTable::new(columns, data)?;
        table.row_count = rows;
        Ok(table)
    }
}

/// One bin along the chromosome backbone.
#[derive(Debug, Clone, PartialEq)]
pub struct SpatialPoint {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub features: Vec<(String, f64)>,
}

/// Ordered bins with coordinates and scalar features. Row order is the
/// genomic backbone order and defines the line path.
#[derive(Debug, Clone)]
pub struct FeatureTable {
    table: ColumnTable,
}

impl FeatureTable {
    pub fn new(table: ColumnTable) -> anyhow::Result<Self> {
        for axis in [X, Y, Z] {
            ensure!(table.column(axis).is_some(), "Feature table lacks '{axis}' column");
        }
        Ok(Self { table })
    }

    pub fn len(&self) -> usize {
        self.table.row_count
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn x(&self) -> &[f64] {
        self.table.column(X).unwrap_or_default()
    }

    pub fn y(&self) -> &[f64] {
        self.table.column(Y).unwrap_or_default()
    }

    pub fn z(&self) -> &[f64] {
        self.table.column(Z).unwrap_or_default()
    }

    pub fn feature(&self, name: &str) -> Option<&[f64]> {
        self.table.column(name)
    }

    /// All non-coordinate columns, in table order.
    pub fn feature_names(&self) -> Vec<&str> {
        self.table
            .columns
            .iter()
            .map(String::as_str)
            .filter(|c| ![X, Y, Z].contains(c))
            .collect()
    }

    pub fn point(&self, row: usize) -> Option<SpatialPoint> {
        if row >= self.len() {
            return None;
        }
        let features = self
            .feature_names()
            .into_iter()
            .filter_map(|name| self.feature(name).map(|col| (name.to_string(), col[row])))
            .collect();
        Some(SpatialPoint {
            x: self.x()[row],
            y: self.y()[row],
            z: self.z()[row],
            features,
        })
    }

    pub(crate) fn table_mut(&mut self) -> &mut ColumnTable {
        &mut self.table
    }
}

/// Reference surface points, unrelated in count and order to the bins.
#[derive(Debug, Clone, Default)]
pub struct SurfaceCloud {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub z: Vec<f64>,
}

impl SurfaceCloud {
    pub fn from_table(table: &ColumnTable) -> anyhow::Result<Self> {
        let coords = table.select(&[X, Y, Z])?;
        let mut cols = coords.data.into_iter();
        match (cols.next(), cols.next(), cols.next()) {
            (Some(x), Some(y), Some(z)) => Ok(Self { x, y, z }),
            _ => bail!("Surface cloud needs x, y and z columns"),
        }
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(cols: &[(&str, &[f64])]) -> ColumnTable {
        ColumnTable::new(
            cols.iter().map(|(n, _)| n.to_string()).collect(),
            cols.iter().map(|(_, v)| v.to_vec()).collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_hstack_preserves_row_order() {
        let a = table(&[("x", &[3.0, 1.0, 2.0])]);
        let b = table(&[("f", &[30.0, 10.0, 20.0])]);
        let merged = ColumnTable::hstack(vec![a, b]).unwrap();
        assert_eq!(merged.columns, vec!["x", "f"]);
        assert_eq!(merged.column("x").unwrap(), &[3.0, 1.0, 2.0]);
        assert_eq!(merged.column("f").unwrap(), &[30.0, 10.0, 20.0]);
    }

    #[test]
    fn test_hstack_row_mismatch_is_error() {
        let a = table(&[("x", &[1.0, 2.0])]);
        let b = table(&[("f", &[1.0, 2.0, 3.0])]);
        let err = ColumnTable::hstack(vec![a, b]).unwrap_err();
        assert!(err.to_string().contains("Row count mismatch"));
    }

    #[test]
    fn test_duplicate_column_is_error() {
        let a = table(&[("x", &[1.0])]);
        let b = table(&[("x", &[2.0])]);
        assert!(ColumnTable::hstack(vec![a, b]).is_err());
    }

    #[test]
    fn test_select_unknown_column() {
        let a = table(&[("x", &[1.0])]);
        assert!(a.select(&["dist_com"]).is_err());
    }

    #[test]
    fn test_feature_table_point() {
        let t = table(&[
            ("x", &[0.0, 1.0]),
            ("y", &[0.0, 0.5]),
            ("z", &[0.0, 0.25]),
            ("f1", &[10.0, 20.0]),
        ]);
        let ft = FeatureTable::new(t).unwrap();
        assert_eq!(ft.feature_names(), vec!["f1"]);
        let p = ft.point(1).unwrap();
        assert_eq!((p.x, p.y, p.z), (1.0, 0.5, 0.25));
        assert_eq!(p.features, vec![("f1".to_string(), 20.0)]);
        assert!(ft.point(2).is_none());
    }

    #[test]
    fn test_feature_table_requires_coordinates() {
        let t = table(&[("x", &[0.0]), ("y", &[0.0])]);
        assert!(FeatureTable::new(t).is_err());
    }
}
