//! Declarative 3D figure description.
//!
//! A [`Figure`] is a plain value: a trace list plus a layout holding the
//! scene and the control bindings (`updatemenus`). It serializes to the
//! JSON shape plotly.js expects, and the native viewer renders the same
//! value directly. Controls never mutate a figure; [`Figure::apply_update`]
//! returns the re-styled copy.

pub mod builder;
pub mod colorscale;
pub mod html;

use std::fmt;

use serde::{Serialize, Serializer};

pub use colorscale::ColorScale;

/// RGBA color, serialized as a CSS `rgba(r,g,b,a)` string.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    /// Opacity in 0.0..=1.0.
    pub a: f32,
}

impl Rgba {
    pub const TRANSPARENT: Rgba = Rgba::new(0, 0, 0, 0.0);
    pub const SKYBLUE: Rgba = Rgba::new(135, 206, 235, 1.0);
    pub const GRAY: Rgba = Rgba::new(128, 128, 128, 1.0);

    pub const fn new(r: u8, g: u8, b: u8, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub fn is_transparent(&self) -> bool {
        self.a <= 0.0
    }

    pub fn to_array_f32(self) -> [f32; 4] {
        [
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
            self.a,
        ]
    }
}

impl fmt::Display for Rgba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rgba({},{},{},{})", self.r, self.g, self.b, self.a)
    }
}

impl Serialize for Rgba {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

// ---------------------------------------------------------------------------
// Traces
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TraceKind {
    #[serde(rename = "scatter3d")]
    Scatter3d,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Lines,
    Markers,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Title {
    pub text: String,
}

impl Title {
    pub fn empty() -> Self {
        Self { text: String::new() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColorBar {
    pub title: Title,
}

/// Line drawn through the points in order, colored per point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineStyle {
    pub width: f64,
    /// One value per point, mapped through `colorscale` over `[cmin, cmax]`.
    pub color: Vec<f64>,
    pub colorscale: ColorScale,
    pub cmin: f64,
    pub cmax: f64,
    pub showscale: bool,
    pub colorbar: ColorBar,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkerStyle {
    pub size: f64,
    pub color: Rgba,
    pub opacity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trace {
    #[serde(rename = "type")]
    pub kind: TraceKind,
    pub name: String,
    pub mode: Mode,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub z: Vec<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<LineStyle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marker: Option<MarkerStyle>,
    pub visible: bool,
}

// ---------------------------------------------------------------------------
// Controls
// ---------------------------------------------------------------------------

/// Trace attributes a control may rewrite. Each list is indexed in step
/// with the target trace indices, cycling when shorter.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TracePatch {
    #[serde(rename = "line.color", skip_serializing_if = "Option::is_none")]
    pub line_color: Option<Vec<Vec<f64>>>,
    #[serde(rename = "line.colorbar.title.text", skip_serializing_if = "Option::is_none")]
    pub colorbar_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visible: Option<Vec<bool>>,
}

/// Layout changes made by a control. Always empty: controls must leave
/// the camera and the rest of the scene alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LayoutPatch {}

/// Arguments of a plotly `update` call: `[trace_patch, layout_patch, trace_indices]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpdateArgs(pub TracePatch, pub LayoutPatch, pub Vec<usize>);

impl UpdateArgs {
    pub fn restyle(patch: TracePatch, traces: Vec<usize>) -> Self {
        Self(patch, LayoutPatch::default(), traces)
    }

    pub fn patch(&self) -> &TracePatch {
        &self.0
    }

    pub fn traces(&self) -> &[usize] {
        &self.2
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    Update,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MenuButton {
    pub label: String,
    pub method: Method,
    pub args: UpdateArgs,
    /// Applied when the button is pressed while active (toggle buttons).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub args2: Option<UpdateArgs>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MenuKind {
    Dropdown,
    Buttons,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Down,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Anchor {
    Left,
    Top,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpdateMenu {
    #[serde(rename = "type")]
    pub kind: MenuKind,
    pub buttons: Vec<MenuButton>,
    pub direction: Direction,
    pub showactive: bool,
    /// Index of the initially active button.
    pub active: usize,
    pub x: f64,
    pub xanchor: Anchor,
    pub y: f64,
    pub yanchor: Anchor,
    pub bgcolor: Rgba,
    pub bordercolor: Rgba,
    pub borderwidth: f64,
}

// ---------------------------------------------------------------------------
// Layout
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SceneAxis {
    pub visible: bool,
    pub range: [f64; 2],
    pub autorange: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AspectMode {
    Data,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Scene {
    pub xaxis: SceneAxis,
    pub yaxis: SceneAxis,
    pub zaxis: SceneAxis,
    pub aspectmode: AspectMode,
    pub bgcolor: Rgba,
}

impl Scene {
    pub fn ranges(&self) -> [[f64; 2]; 3] {
        [self.xaxis.range, self.yaxis.range, self.zaxis.range]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Legend {
    pub title: Title,
    pub visible: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Margin {
    pub l: u32,
    pub r: u32,
    pub b: u32,
    pub t: u32,
    pub pad: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Layout {
    pub updatemenus: Vec<UpdateMenu>,
    pub title: Title,
    /// View-state key; while it is unchanged, redraws keep the camera.
    pub uirevision: String,
    pub showlegend: bool,
    pub legend: Legend,
    pub plot_bgcolor: Rgba,
    pub paper_bgcolor: Rgba,
    pub scene: Scene,
    pub autosize: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    pub margin: Margin,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Figure {
    pub data: Vec<Trace>,
    pub layout: Layout,
}

impl Figure {
    /// Apply a control's arguments to the targeted traces, returning the
    /// new figure. Layout (camera, ranges, color limits) is untouched.
    pub fn apply_update(&self, args: &UpdateArgs) -> Figure {
        let mut next = self.clone();
        let patch = args.patch();

        for (i, &trace_idx) in args.traces().iter().enumerate() {
            let Some(trace) = next.data.get_mut(trace_idx) else {
                tracing::warn!("Control targets missing trace {trace_idx}");
                continue;
            };

            if let Some(colors) = patch.line_color.as_ref().and_then(|c| cycled(c, i)) {
                if let Some(line) = trace.line.as_mut() {
                    line.color = colors.clone();
                }
            }
            if let Some(title) = &patch.colorbar_title {
                if let Some(line) = trace.line.as_mut() {
                    line.colorbar.title.text = title.clone();
                }
            }
            if let Some(&visible) = patch.visible.as_ref().and_then(|v| cycled(v, i)) {
                trace.visible = visible;
            }
        }

        next
    }

    /// Same figure with fixed pixel sizing replaced by fluid sizing.
    pub fn responsive(&self) -> Figure {
        let mut next = self.clone();
        next.layout.autosize = true;
        next.layout.width = None;
        next.layout.height = None;
        next
    }

    pub fn to_json(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

fn cycled<T>(values: &[T], i: usize) -> Option<&T> {
    if values.is_empty() {
        None
    } else {
        values.get(i % values.len())
    }
}
