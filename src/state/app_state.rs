use crate::data::table::FeatureTable;
use crate::state::figure_view::FigureView;
use crate::state::theme::Theme;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Everything the viewer holds for the lifetime of the process.
#[derive(Debug, Clone)]
pub struct AppState {
    pub view: FigureView,
    /// Source bins, for the hover read-out of every feature.
    pub features: FeatureTable,
    pub theme: Theme,
}

impl AppState {
    pub fn new(view: FigureView, features: FeatureTable) -> Self {
        Self {
            view,
            features,
            theme: Theme::default(),
        }
    }
}
