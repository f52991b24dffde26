use anyhow::{ensure, Context};

use crate::data::table::{FeatureTable, SurfaceCloud};
use crate::figure::{
    Anchor, AspectMode, ColorBar, ColorScale, Direction, Figure, Layout, Legend, LineStyle,
    Margin, MarkerStyle, MenuButton, MenuKind, Method, Mode, Rgba, Scene, SceneAxis, Title, Trace,
    TraceKind, TracePatch, UpdateArgs, UpdateMenu,
};
use crate::processing::statistics::SeriesStats;

/// Index of the backbone line in `Figure::data`.
pub const BACKBONE_TRACE: usize = 0;
/// Index of the surface cloud in `Figure::data`.
pub const SURFACE_TRACE: usize = 1;
/// Index of the feature selector in `Layout::updatemenus`.
pub const FEATURE_MENU: usize = 0;
/// Index of the surface visibility toggle in `Layout::updatemenus`.
pub const TOGGLE_MENU: usize = 1;

pub const BACKBONE_NAME: &str = "Chromosome Line";
pub const SURFACE_NAME: &str = "Surface Points";
pub const TOGGLE_LABEL: &str = "Toggle Surface Points";
pub const VIEW_REVISION: &str = "constant";

/// Visual constants of the chromosome figure.
#[derive(Debug, Clone)]
pub struct FigureStyle {
    pub line_width: f64,
    pub colorscale: ColorScale,
    pub marker_size: f64,
    pub marker_color: Rgba,
    pub marker_opacity: f64,
    pub width: u32,
    pub height: u32,
}

impl Default for FigureStyle {
    fn default() -> Self {
        Self {
            line_width: 9.0,
            colorscale: ColorScale::Turbo,
            marker_size: 2.0,
            marker_color: Rgba::SKYBLUE,
            marker_opacity: 0.1,
            width: 1000,
            height: 800,
        }
    }
}

/// `gc_content_percentage` -> `Gc Content Percentage`.
pub fn human_label(column: &str) -> String {
    let mut out = String::with_capacity(column.len());
    let mut prev_alpha = false;
    for c in column.replace('_', " ").chars() {
        if prev_alpha {
            out.extend(c.to_lowercase());
        } else {
            out.extend(c.to_uppercase());
        }
        prev_alpha = c.is_alphabetic();
    }
    out
}

/// Min/max of one axis over the union of bin and surface coordinates.
fn union_range(bins: &[f64], surface: &[f64], axis: &str) -> anyhow::Result<[f64; 2]> {
    let (lo, hi) = SeriesStats::global_range([bins, surface])
        .with_context(|| format!("No finite {axis} coordinates to bound the scene"))?;
    Ok([lo, hi])
}

fn hidden_axis(range: [f64; 2]) -> SceneAxis {
    SceneAxis { visible: false, range, autorange: false }
}

/// Build the chromosome figure: a backbone line colored by the first
/// feature, a translucent surface cloud, a feature selector and a surface
/// visibility toggle.
///
/// The color limits span all listed features so the colorbar stays put
/// when the selector switches columns.
pub fn build_chromosome_figure(
    features: &FeatureTable,
    surface: &SurfaceCloud,
    feature_cols: &[&str],
    style: &FigureStyle,
) -> anyhow::Result<Figure> {
    ensure!(!feature_cols.is_empty(), "At least one feature column is required");

    let columns: Vec<&[f64]> = feature_cols
        .iter()
        .map(|name| {
            features
                .feature(name)
                .with_context(|| format!("Feature column '{name}' not in table"))
        })
        .collect::<anyhow::Result<_>>()?;

    let x_range = union_range(features.x(), &surface.x, "x")?;
    let y_range = union_range(features.y(), &surface.y, "y")?;
    let z_range = union_range(features.z(), &surface.z, "z")?;

    let (cmin, cmax) = SeriesStats::global_range(columns.iter().copied()).unwrap_or_else(|| {
        tracing::warn!("Feature columns hold no finite values; color limits default to [0, 0]");
        (0.0, 0.0)
    });

    let backbone = Trace {
        kind: TraceKind::Scatter3d,
        name: BACKBONE_NAME.to_string(),
        mode: Mode::Lines,
        x: features.x().to_vec(),
        y: features.y().to_vec(),
        z: features.z().to_vec(),
        line: Some(LineStyle {
            width: style.line_width,
            color: columns[0].to_vec(),
            colorscale: style.colorscale,
            cmin,
            cmax,
            showscale: true,
            colorbar: ColorBar { title: Title::empty() },
        }),
        marker: None,
        visible: true,
    };

    let cloud = Trace {
        kind: TraceKind::Scatter3d,
        name: SURFACE_NAME.to_string(),
        mode: Mode::Markers,
        x: surface.x.clone(),
        y: surface.y.clone(),
        z: surface.z.clone(),
        line: None,
        marker: Some(MarkerStyle {
            size: style.marker_size,
            color: style.marker_color,
            opacity: style.marker_opacity,
        }),
        visible: true,
    };

    let feature_buttons: Vec<MenuButton> = feature_cols
        .iter()
        .zip(&columns)
        .map(|(name, values)| MenuButton {
            label: human_label(name),
            method: Method::Update,
            args: UpdateArgs::restyle(
                TracePatch {
                    line_color: Some(vec![values.to_vec()]),
                    colorbar_title: Some(String::new()),
                    visible: None,
                },
                vec![BACKBONE_TRACE],
            ),
            args2: None,
        })
        .collect();

    let visibility = |shown: bool| {
        UpdateArgs::restyle(
            TracePatch { visible: Some(vec![shown]), ..Default::default() },
            vec![SURFACE_TRACE],
        )
    };
    let toggle_button = MenuButton {
        label: TOGGLE_LABEL.to_string(),
        method: Method::Update,
        args: visibility(true),
        args2: Some(visibility(false)),
    };

    let menu = |kind, buttons, direction, y| UpdateMenu {
        kind,
        buttons,
        direction,
        showactive: true,
        active: 0,
        x: 0.02,
        xanchor: Anchor::Left,
        y,
        yanchor: Anchor::Top,
        bgcolor: Rgba::new(255, 255, 255, 0.8),
        bordercolor: Rgba::GRAY,
        borderwidth: 1.0,
    };

    let layout = Layout {
        updatemenus: vec![
            menu(MenuKind::Dropdown, feature_buttons, Direction::Down, 1.02),
            menu(MenuKind::Buttons, vec![toggle_button], Direction::Right, 0.95),
        ],
        title: Title::empty(),
        uirevision: VIEW_REVISION.to_string(),
        showlegend: true,
        legend: Legend { title: Title::empty(), visible: true },
        plot_bgcolor: Rgba::TRANSPARENT,
        paper_bgcolor: Rgba::TRANSPARENT,
        scene: Scene {
            xaxis: hidden_axis(x_range),
            yaxis: hidden_axis(y_range),
            zaxis: hidden_axis(z_range),
            aspectmode: AspectMode::Data,
            bgcolor: Rgba::TRANSPARENT,
        },
        autosize: false,
        width: Some(style.width),
        height: Some(style.height),
        margin: Margin { l: 0, r: 0, b: 0, t: 0, pad: 0 },
    };

    tracing::debug!(
        "Built figure: {} bins, {} surface points, color limits [{:.3}, {:.3}]",
        features.len(),
        surface.len(),
        cmin,
        cmax
    );

    Ok(Figure { data: vec![backbone, cloud], layout })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::prepare::scale_features;
    use crate::data::table::ColumnTable;
    use crate::processing::statistics::ZeroVariancePolicy;

    fn sample_features() -> FeatureTable {
        FeatureTable::new(
            ColumnTable::new(
                vec!["x", "y", "z", "f1", "f2"].into_iter().map(String::from).collect(),
                vec![
                    vec![0.0, 1.0, 2.0],
                    vec![0.0, 0.0, 0.0],
                    vec![0.0, 0.0, 0.0],
                    vec![10.0, 20.0, 30.0],
                    vec![1.0, 2.0, 3.0],
                ],
            )
            .unwrap(),
        )
        .unwrap()
    }

    fn sample_surface() -> SurfaceCloud {
        SurfaceCloud { x: vec![5.0], y: vec![5.0], z: vec![5.0] }
    }

    fn sample_figure() -> Figure {
        build_chromosome_figure(&sample_features(), &sample_surface(), &["f1", "f2"], &FigureStyle::default())
            .unwrap()
    }

    fn line(fig: &Figure) -> &LineStyle {
        fig.data[BACKBONE_TRACE].line.as_ref().unwrap()
    }

    #[test]
    fn test_axis_range_covers_surface() {
        let fig = sample_figure();
        assert_eq!(fig.layout.scene.xaxis.range, [0.0, 5.0]);
        assert_eq!(fig.layout.scene.yaxis.range, [0.0, 5.0]);
        assert_eq!(fig.layout.scene.zaxis.range, [0.0, 5.0]);
        assert!(!fig.layout.scene.xaxis.autorange);
        assert!(!fig.layout.scene.xaxis.visible);
    }

    #[test]
    fn test_end_to_end_scaled_feature() {
        let scaled = scale_features(sample_features(), &["f1"], ZeroVariancePolicy::Center).unwrap();
        let fig =
            build_chromosome_figure(&scaled, &sample_surface(), &["f1", "f2"], &FigureStyle::default()).unwrap();
        assert_eq!(fig.layout.scene.xaxis.range, [0.0, 5.0]);
        let colors = &line(&fig).color;
        let mean = colors.iter().sum::<f64>() / colors.len() as f64;
        assert!(mean.abs() < 1e-12);
    }

    #[test]
    fn test_color_limits_span_all_features() {
        let fig = sample_figure();
        assert_eq!((line(&fig).cmin, line(&fig).cmax), (1.0, 30.0));
        assert_eq!(line(&fig).color, vec![10.0, 20.0, 30.0]);
        assert_eq!(line(&fig).colorbar.title.text, "");
    }

    #[test]
    fn test_selecting_feature_rewrites_only_line_color() {
        let fig = sample_figure();
        let menu = &fig.layout.updatemenus[FEATURE_MENU];
        assert_eq!(menu.kind, MenuKind::Dropdown);
        assert_eq!(menu.buttons.len(), 2);

        let next = fig.apply_update(&menu.buttons[1].args);
        assert_eq!(line(&next).color, vec![1.0, 2.0, 3.0]);
        assert_eq!((line(&next).cmin, line(&next).cmax), (1.0, 30.0));
        // Geometry and every other attribute of the backbone stay put.
        let mut masked = next.data[BACKBONE_TRACE].clone();
        if let (Some(l), Some(orig)) = (masked.line.as_mut(), fig.data[BACKBONE_TRACE].line.as_ref()) {
            l.color = orig.color.clone();
        }
        assert_eq!(masked, fig.data[BACKBONE_TRACE]);
        assert_eq!(next.data[BACKBONE_TRACE].x, fig.data[BACKBONE_TRACE].x);
        assert_eq!(next.data[BACKBONE_TRACE].y, fig.data[BACKBONE_TRACE].y);
        assert_eq!(next.data[BACKBONE_TRACE].z, fig.data[BACKBONE_TRACE].z);
        assert_eq!(next.data[SURFACE_TRACE], fig.data[SURFACE_TRACE]);
        assert_eq!(next.layout, fig.layout);

        let back = next.apply_update(&menu.buttons[0].args);
        assert_eq!(back, fig);
    }

    #[test]
    fn test_toggle_changes_only_surface_visibility() {
        let fig = sample_figure();
        let button = &fig.layout.updatemenus[TOGGLE_MENU].buttons[0];
        assert_eq!(button.label, TOGGLE_LABEL);

        let hidden = fig.apply_update(button.args2.as_ref().unwrap());
        assert!(!hidden.data[SURFACE_TRACE].visible);
        assert!(hidden.data[BACKBONE_TRACE].visible);
        assert_eq!(hidden.layout, fig.layout);

        let shown = hidden.apply_update(&button.args);
        assert_eq!(shown, fig);
        let hidden_again = shown.apply_update(button.args2.as_ref().unwrap());
        assert_eq!(hidden_again, hidden);
    }

    #[test]
    fn test_labels_are_human_readable() {
        assert_eq!(human_label("gc_content_percentage"), "Gc Content Percentage");
        assert_eq!(human_label("dist_com"), "Dist Com");
        assert_eq!(human_label("DIST_rm"), "Dist Rm");
    }

    #[test]
    fn test_unknown_feature_is_error() {
        let err = build_chromosome_figure(
            &sample_features(),
            &sample_surface(),
            &["missing"],
            &FigureStyle::default(),
        );
        assert!(err.is_err());
        assert!(build_chromosome_figure(&sample_features(), &sample_surface(), &[], &FigureStyle::default()).is_err());
    }

    #[test]
    fn test_serialized_shape() {
        let fig = sample_figure();
        let json: serde_json::Value = serde_json::from_str(&fig.to_json().unwrap()).unwrap();
        assert_eq!(json["data"][0]["type"], "scatter3d");
        assert_eq!(json["data"][0]["mode"], "lines");
        assert_eq!(json["data"][0]["line"]["colorscale"], "Turbo");
        assert_eq!(json["data"][1]["marker"]["color"], "rgba(135,206,235,1)");
        assert_eq!(json["layout"]["uirevision"], "constant");
        assert_eq!(json["layout"]["paper_bgcolor"], "rgba(0,0,0,0)");
        assert_eq!(json["layout"]["width"], 1000);
        assert_eq!(json["layout"]["updatemenus"][0]["buttons"][0]["label"], "F1");
        assert_eq!(json["layout"]["updatemenus"][0]["buttons"][0]["args"][2][0], 0);
        assert!(json["layout"]["updatemenus"][0]["buttons"][0]["args"][1]
            .as_object()
            .unwrap()
            .is_empty());
        assert_eq!(json["layout"]["updatemenus"][1]["buttons"][0]["args2"][0]["visible"][0], false);

        let responsive: serde_json::Value =
            serde_json::from_str(&fig.responsive().to_json().unwrap()).unwrap();
        assert!(responsive["layout"].get("width").is_none());
        assert_eq!(responsive["layout"]["autosize"], true);
    }
}
