use std::path::{Path, PathBuf};

use anyhow::ensure;
use clap::Parser;

use crate::data::prepare::InputPaths;
use crate::figure::builder::FigureStyle;
use crate::processing::statistics::ZeroVariancePolicy;

/// Interactive 3D chromosome structure viewer.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about)]
pub struct Args {
    /// Bins CSV: row index, x, y, z, gc_content_percentage.
    #[arg(long, default_value = "x_y_z_bin_gc.csv")]
    pub bins_csv: PathBuf,

    /// Center-of-mass NPY: x, y, z, dist_com, dist_rm.
    #[arg(long, default_value = "x_y_z_dist_com_dist_rm.npy")]
    pub com_npy: PathBuf,

    /// Surface-distance NPY: x, y, z, dist_surf.
    #[arg(long, default_value = "x_y_z_dist_surf.npy")]
    pub surf_dist_npy: PathBuf,

    /// Pre-scaled surface cloud NPY: x, y, z.
    #[arg(long, default_value = "surface_coords_scaled.npy")]
    pub surface_npy: PathBuf,

    /// Directory that relative input paths are resolved against.
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// What to do with a feature column that has no spread.
    #[arg(long, value_enum, default_value_t = ZeroVariancePolicy::Center)]
    pub zero_variance: ZeroVariancePolicy,

    /// Write a standalone HTML dashboard to this path.
    #[arg(long)]
    pub export_html: Option<PathBuf>,

    /// Write the figure description as JSON to this path.
    #[arg(long)]
    pub export_json: Option<PathBuf>,

    /// Skip the interactive window (requires an export).
    #[arg(long, default_value_t = false)]
    pub no_viewer: bool,

    /// Figure width in pixels.
    #[arg(long, default_value_t = 1000)]
    pub width: u32,

    /// Figure height in pixels.
    #[arg(long, default_value_t = 800)]
    pub height: u32,
}

impl Args {
    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(self.width > 0 && self.height > 0, "Figure size must be positive, got {}x{}", self.width, self.height);
        ensure!(
            !self.no_viewer || self.export_html.is_some() || self.export_json.is_some(),
            "--no-viewer needs --export-html or --export-json, otherwise there is nothing to do"
        );
        Ok(())
    }

    pub fn input_paths(&self) -> InputPaths {
        let resolve = |p: &Path| match &self.data_dir {
            Some(dir) if p.is_relative() => dir.join(p),
            _ => p.to_path_buf(),
        };
        InputPaths {
            bins_csv: resolve(&self.bins_csv),
            com_npy: resolve(&self.com_npy),
            surface_dist_npy: resolve(&self.surf_dist_npy),
            surface_npy: resolve(&self.surface_npy),
        }
    }

    pub fn figure_style(&self) -> FigureStyle {
        FigureStyle {
            width: self.width,
            height: self.height,
            ..FigureStyle::default()
        }
    }
}
