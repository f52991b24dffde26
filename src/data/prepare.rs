//! Loading, merging and scaling of the chromosome datasets.
//!
//! Four inputs feed one [`FeatureTable`] and one [`SurfaceCloud`]:
//!
//! * bins CSV: `[row_index, x, y, z, gc_content_percentage]`
//! * center-of-mass NPY: `[x, y, z, dist_com, dist_rm]`
//! * surface-distance NPY: `[x, y, z, dist_surf]`
//! * surface NPY: `[x, y, z]`, pre-scaled
//!
//! The first three are joined by row position, never by key.

use std::path::PathBuf;

use anyhow::{ensure, Context};

use crate::data::loader::{CsvSource, DataSource, NpySource};
use crate::data::table::{ColumnTable, FeatureTable, SurfaceCloud};
use crate::processing::statistics::{standardize, SeriesStats, ZeroVariancePolicy};

pub const GC_CONTENT: &str = "gc_content_percentage";
pub const DIST_COM: &str = "dist_com";
pub const DIST_RM: &str = "dist_rm";
pub const DIST_SURF: &str = "dist_surf";

/// Feature columns that are z-scored and offered in the feature selector.
pub const SCALED_COLUMNS: [&str; 4] = [GC_CONTENT, DIST_COM, DIST_RM, DIST_SURF];

/// Locations of the four input files.
#[derive(Debug, Clone)]
pub struct InputPaths {
    pub bins_csv: PathBuf,
    pub com_npy: PathBuf,
    pub surface_dist_npy: PathBuf,
    pub surface_npy: PathBuf,
}

/// Everything the figure builder needs.
#[derive(Debug, Clone)]
pub struct PreparedData {
    pub features: FeatureTable,
    pub surface: SurfaceCloud,
}

pub fn prepare(paths: &InputPaths, policy: ZeroVariancePolicy) -> anyhow::Result<PreparedData> {
    let bins = load(&CsvSource::new(&paths.bins_csv).index_column())?;
    let com = load(&NpySource::new(&paths.com_npy, &["x", "y", "z", DIST_COM, DIST_RM]))?;
    let sasa = load(&NpySource::new(&paths.surface_dist_npy, &["x", "y", "z", DIST_SURF]))?;
    let surface = load(&NpySource::new(&paths.surface_npy, &["x", "y", "z"]))?;

    let features = merge(bins, &com, &sasa)?;
    ensure!(!features.is_empty(), "{} holds no bins", paths.bins_csv.display());
    let features = scale_features(features, &SCALED_COLUMNS, policy)?;
    let surface = SurfaceCloud::from_table(&surface).context("Invalid surface cloud")?;
    if surface.is_empty() {
        tracing::warn!("{} holds no surface points", paths.surface_npy.display());
    }

    tracing::info!(
        "Prepared {} bins with features [{}] and {} surface points",
        features.len(),
        features.feature_names().join(", "),
        surface.len()
    );

    Ok(PreparedData { features, surface })
}

fn load(source: &dyn DataSource) -> anyhow::Result<ColumnTable> {
    let table = source
        .load()
        .with_context(|| format!("Failed to load {}", source.describe()))?;
    tracing::info!("Loaded {} ({} rows)", source.describe(), table.row_count);
    Ok(table)
}

/// Coordinates and GC content come from the CSV; the distance metrics are
/// appended column-wise from the two arrays.
pub fn merge(bins: ColumnTable, com: &ColumnTable, sasa: &ColumnTable) -> anyhow::Result<FeatureTable> {
    let merged = ColumnTable::hstack(vec![
        bins,
        com.select(&[DIST_COM, DIST_RM])?,
        sasa.select(&[DIST_SURF])?,
    ])
    .context("Cannot merge bin tables")?;
    FeatureTable::new(merged)
}

/// Z-score each named column independently; other columns pass through.
pub fn scale_features(
    mut features: FeatureTable,
    columns: &[&str],
    policy: ZeroVariancePolicy,
) -> anyhow::Result<FeatureTable> {
    for &name in columns {
        let values = features
            .table_mut()
            .column_mut(name)
            .with_context(|| format!("Cannot scale missing column '{name}'"))?;

        if let Some(stats) = SeriesStats::compute(values) {
            tracing::debug!("{}", stats.report(name));
        }

        let scaling = standardize(values, policy).with_context(|| format!("Cannot scale '{name}'"))?;
        if !(scaling.std_dev > 0.0) {
            tracing::warn!(
                "Column '{}' has zero variance (mean {:.3}); applied {:?} policy",
                name,
                scaling.mean,
                policy
            );
        }
    }
    Ok(features)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array2};
    use std::io::Write;

    fn table(cols: &[(&str, &[f64])]) -> ColumnTable {
        ColumnTable::new(
            cols.iter().map(|(n, _)| n.to_string()).collect(),
            cols.iter().map(|(_, v)| v.to_vec()).collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_merge_takes_coordinates_from_bins() {
        let bins = table(&[
            ("x", &[0.0, 1.0, 2.0]),
            ("y", &[0.0, 0.0, 0.0]),
            ("z", &[0.0, 0.0, 0.0]),
            (GC_CONTENT, &[40.0, 50.0, 60.0]),
        ]);
        let com = table(&[
            ("x", &[9.0, 9.0, 9.0]),
            ("y", &[9.0, 9.0, 9.0]),
            ("z", &[9.0, 9.0, 9.0]),
            (DIST_COM, &[1.0, 2.0, 3.0]),
            (DIST_RM, &[4.0, 5.0, 6.0]),
        ]);
        let sasa = table(&[
            ("x", &[9.0, 9.0, 9.0]),
            ("y", &[9.0, 9.0, 9.0]),
            ("z", &[9.0, 9.0, 9.0]),
            (DIST_SURF, &[7.0, 8.0, 9.0]),
        ]);

        let merged = merge(bins, &com, &sasa).unwrap();
        assert_eq!(merged.x(), &[0.0, 1.0, 2.0]);
        assert_eq!(
            merged.feature_names(),
            vec![GC_CONTENT, DIST_COM, DIST_RM, DIST_SURF]
        );
        assert_eq!(merged.feature(DIST_RM).unwrap(), &[4.0, 5.0, 6.0]);
        assert_eq!(merged.feature(DIST_SURF).unwrap(), &[7.0, 8.0, 9.0]);
    }

    #[test]
    fn test_merge_row_mismatch_is_fatal() {
        let bins = table(&[("x", &[0.0]), ("y", &[0.0]), ("z", &[0.0]), (GC_CONTENT, &[1.0])]);
        let com = table(&[(DIST_COM, &[1.0, 2.0]), (DIST_RM, &[1.0, 2.0])]);
        let sasa = table(&[(DIST_SURF, &[1.0])]);
        assert!(merge(bins, &com, &sasa).is_err());
    }

    #[test]
    fn test_scale_features_leaves_others_untouched() {
        let ft = FeatureTable::new(table(&[
            ("x", &[0.0, 1.0, 2.0]),
            ("y", &[0.0, 0.0, 0.0]),
            ("z", &[0.0, 0.0, 0.0]),
            ("f1", &[10.0, 20.0, 30.0]),
            ("f2", &[1.0, 2.0, 3.0]),
        ]))
        .unwrap();

        let scaled = scale_features(ft, &["f1"], ZeroVariancePolicy::Center).unwrap();
        let f1 = scaled.feature("f1").unwrap();
        let mean = f1.iter().sum::<f64>() / f1.len() as f64;
        assert!(mean.abs() < 1e-12);
        assert_eq!(scaled.feature("f2").unwrap(), &[1.0, 2.0, 3.0]);
        assert_eq!(scaled.x(), &[0.0, 1.0, 2.0]);
    }

    #[test]
    fn test_scale_missing_column_is_error() {
        let ft = FeatureTable::new(table(&[("x", &[0.0]), ("y", &[0.0]), ("z", &[0.0])])).unwrap();
        assert!(scale_features(ft, &[DIST_COM], ZeroVariancePolicy::Center).is_err());
    }

    #[test]
    fn test_prepare_from_files() {
        let dir = tempfile::tempdir().unwrap();
        let bins_csv = dir.path().join("x_y_z_bin_gc.csv");
        let mut f = std::fs::File::create(&bins_csv).unwrap();
        writeln!(f, ",x,y,z,{GC_CONTENT}").unwrap();
        writeln!(f, "0,0.0,0.0,0.0,40.0").unwrap();
        writeln!(f, "1,1.0,0.0,0.0,50.0").unwrap();
        writeln!(f, "2,2.0,0.0,0.0,66.0").unwrap();
        drop(f);

        let com: Array2<f64> = array![
            [0.0, 0.0, 0.0, 1.0, 0.5],
            [1.0, 0.0, 0.0, 2.0, 0.7],
            [2.0, 0.0, 0.0, 4.0, 0.2]
        ];
        let sasa: Array2<f64> = array![[0.0, 0.0, 0.0, 3.0], [1.0, 0.0, 0.0, 1.0], [2.0, 0.0, 0.0, 2.0]];
        let surface: Array2<f64> = array![[5.0, 5.0, 5.0], [-1.0, 0.0, 0.0]];

        let paths = InputPaths {
            bins_csv,
            com_npy: dir.path().join("com.npy"),
            surface_dist_npy: dir.path().join("sasa.npy"),
            surface_npy: dir.path().join("surface.npy"),
        };
        ndarray_npy::write_npy(&paths.com_npy, &com).unwrap();
        ndarray_npy::write_npy(&paths.surface_dist_npy, &sasa).unwrap();
        ndarray_npy::write_npy(&paths.surface_npy, &surface).unwrap();

        let prepared = prepare(&paths, ZeroVariancePolicy::Center).unwrap();
        assert_eq!(prepared.features.len(), 3);
        assert_eq!(prepared.surface.len(), 2);
        assert_eq!(prepared.surface.x, vec![5.0, -1.0]);

        for name in SCALED_COLUMNS {
            let stats = SeriesStats::compute(prepared.features.feature(name).unwrap()).unwrap();
            assert!(stats.mean.abs() < 1e-9, "{name} mean {}", stats.mean);
            assert!((stats.std_dev - 1.0).abs() < 1e-9, "{name} std {}", stats.std_dev);
        }

        // dist_com input [1, 2, 4]: ordering survives scaling
        let dc = prepared.features.feature(DIST_COM).unwrap();
        assert!(dc[0] < dc[1] && dc[1] < dc[2]);
    }

    #[test]
    fn test_prepare_without_bins_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let bins_csv = dir.path().join("bins.csv");
        std::fs::write(&bins_csv, format!(",x,y,z,{GC_CONTENT}\n")).unwrap();

        let paths = InputPaths {
            bins_csv,
            com_npy: dir.path().join("com.npy"),
            surface_dist_npy: dir.path().join("sasa.npy"),
            surface_npy: dir.path().join("surface.npy"),
        };
        ndarray_npy::write_npy(&paths.com_npy, &Array2::<f64>::zeros((0, 5))).unwrap();
        ndarray_npy::write_npy(&paths.surface_dist_npy, &Array2::<f64>::zeros((0, 4))).unwrap();
        ndarray_npy::write_npy(&paths.surface_npy, &Array2::<f64>::zeros((0, 3))).unwrap();

        let err = prepare(&paths, ZeroVariancePolicy::Center).unwrap_err();
        assert!(format!("{err:#}").contains("holds no bins"));
    }

    #[test]
    fn test_prepare_missing_file_is_fatal() {
        let paths = InputPaths {
            bins_csv: "/nonexistent/bins.csv".into(),
            com_npy: "/nonexistent/com.npy".into(),
            surface_dist_npy: "/nonexistent/sasa.npy".into(),
            surface_npy: "/nonexistent/surface.npy".into(),
        };
        let err = prepare(&paths, ZeroVariancePolicy::Center).unwrap_err();
        assert!(format!("{err:#}").contains("bins.csv"));
    }
}
