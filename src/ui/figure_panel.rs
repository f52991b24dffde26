use eframe::egui;
use glam::Vec3;

use crate::figure::builder::{human_label, BACKBONE_TRACE};
use crate::figure::{Figure, LineStyle, MenuKind, Rgba, Trace};
use crate::plot3d::renderer::create_3d_paint_callback;
use crate::render::gpu_types::{Line3DData, Scatter3DData};
use crate::state::app_state::AppState;
use crate::state::theme::Theme;

/// Hover pick radius around a projected backbone bin, in points.
const PICK_RADIUS: f32 = 10.0;
const COLORBAR_WIDTH: f32 = 16.0;
const COLORBAR_STEPS: usize = 64;
const COLORBAR_TICKS: usize = 5;

fn color32(c: Rgba) -> egui::Color32 {
    egui::Color32::from_rgba_unmultiplied(c.r, c.g, c.b, (c.a.clamp(0.0, 1.0) * 255.0).round() as u8)
}

fn toolbar_toggle_btn(ui: &mut egui::Ui, label: &str, active: bool) -> egui::Response {
    let btn = if active {
        egui::Button::new(egui::RichText::new(label).strong())
            .fill(ui.visuals().selection.bg_fill)
            .min_size(egui::vec2(0.0, 26.0))
    } else {
        egui::Button::new(label).min_size(egui::vec2(0.0, 26.0))
    };
    ui.add(btn)
}

/// Maps scene coordinates into the renderer's unit cube.
///
/// All three axes share one scale so the scene keeps the data's
/// proportions. The mapping comes from the fixed scene ranges, not from
/// the visible traces, so hiding a trace never rescales the view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneTransform {
    center: [f64; 3],
    scale: f64,
}

impl SceneTransform {
    pub fn from_ranges(ranges: [[f64; 2]; 3]) -> Self {
        let mut center = [0.0; 3];
        let mut half_extent: f64 = 0.0;
        for (axis, [lo, hi]) in ranges.into_iter().enumerate() {
            if lo.is_finite() && hi.is_finite() {
                center[axis] = (lo + hi) / 2.0;
                half_extent = half_extent.max((hi - lo).abs() / 2.0);
            }
        }
        let scale = if half_extent > 1e-12 { 1.0 / half_extent } else { 1.0 };
        Self { center, scale }
    }

    pub fn apply(&self, x: f64, y: f64, z: f64) -> [f32; 4] {
        [
            ((x - self.center[0]) * self.scale) as f32,
            ((y - self.center[1]) * self.scale) as f32,
            ((z - self.center[2]) * self.scale) as f32,
            1.0,
        ]
    }
}

fn is_finite_point(p: &[f32; 4]) -> bool {
    p[0].is_finite() && p[1].is_finite() && p[2].is_finite()
}

/// Backbone polyline, one colormapped color per bin.
fn backbone_line(trace: &Trace, line: &LineStyle, transform: &SceneTransform, ppp: f32) -> Line3DData {
    let points: Vec<[f32; 4]> = trace
        .x
        .iter()
        .zip(&trace.y)
        .zip(&trace.z)
        .map(|((&x, &y), &z)| transform.apply(x, y, z))
        .collect();

    let colors: Vec<Option<[f32; 4]>> = points
        .iter()
        .zip(&line.color)
        .map(|(p, &value)| {
            if !is_finite_point(p) {
                return None;
            }
            line.colorscale
                .map(value, line.cmin, line.cmax)
                .map(|[r, g, b]| Rgba::new(r, g, b, 1.0).to_array_f32())
        })
        .collect();

    Line3DData::from_path(&points, &colors, line.width as f32 * ppp)
}

fn surface_cloud(trace: &Trace, transform: &SceneTransform, ppp: f32) -> Option<Scatter3DData> {
    let marker = trace.marker.as_ref()?;
    let positions: Vec<[f32; 4]> = trace
        .x
        .iter()
        .zip(&trace.y)
        .zip(&trace.z)
        .map(|((&x, &y), &z)| transform.apply(x, y, z))
        .filter(is_finite_point)
        .collect();
    if positions.is_empty() {
        return None;
    }

    let color = Rgba { a: 1.0, ..marker.color }.to_array_f32();
    Some(Scatter3DData {
        colors: vec![color; positions.len()],
        positions,
        tint: [1.0, 1.0, 1.0, (marker.color.a as f64 * marker.opacity) as f32],
        // Marker size is a diameter; the renderer wants a radius.
        point_size: ((marker.size as f32) * 0.5 * ppp).max(1.0),
    })
}

/// Figure backgrounds are premultiplied for the blit.
fn clear_color(c: Rgba) -> [f32; 4] {
    if c.is_transparent() {
        return [0.0; 4];
    }
    let [r, g, b, a] = c.to_array_f32();
    [r * a, g * a, b * a, a]
}

/// Render the displayed figure with its controls and return the scene
/// rect. Control presses are forwarded to the figure view after drawing.
pub fn show_figure_panel(state: &mut AppState, ui: &mut egui::Ui) -> egui::Rect {
    let rect = ui.available_rect_before_wrap();
    if rect.width() < 10.0 || rect.height() < 10.0 {
        return rect;
    }
    ui.allocate_rect(rect, egui::Sense::hover());

    let response = ui.interact(rect, egui::Id::new("chromosome_scene"), egui::Sense::click_and_drag());
    state.view.camera.handle_input(&response);
    if response.hovered() && ui.input(|i| i.key_pressed(egui::Key::S)) {
        state.view.toggle_surface();
    }

    let painter = ui.painter_at(rect);
    let figure = state.view.figure();
    let transform = SceneTransform::from_ranges(figure.layout.scene.ranges());
    let ppp = ui.ctx().pixels_per_point();

    // Page color shows through the transparent figure background.
    painter.rect_filled(rect, 0.0, state.theme.page_bg());

    let mut line_data = Vec::new();
    let mut scatter_data = Vec::new();
    for trace in figure.data.iter().filter(|t| t.visible) {
        if let Some(line) = &trace.line {
            line_data.push(backbone_line(trace, line, &transform, ppp));
        } else if let Some(cloud) = surface_cloud(trace, &transform, ppp) {
            scatter_data.push(cloud);
        }
    }

    let aspect = rect.width() / rect.height();
    let viewport_size = [(rect.width() * ppp) as u32, (rect.height() * ppp) as u32];
    painter.add(create_3d_paint_callback(
        rect,
        scatter_data,
        line_data,
        state.view.camera.uniforms(aspect),
        clear_color(figure.layout.paper_bgcolor),
        viewport_size,
    ));

    let colorbar_left = draw_colorbar(&painter, figure, rect);
    if figure.layout.showlegend && figure.layout.legend.visible {
        draw_legend(&painter, figure, rect, colorbar_left, state.theme);
    }

    if let Some(mouse) = response.hover_pos() {
        if !response.dragged() {
            draw_hover_tooltip(&painter, state, &transform, rect, mouse);
        }
    }

    if let Some((menu, button)) = show_controls(ui, state, rect) {
        state.view.press(menu, button);
    }

    rect
}

/// Place each control menu at its paper position and report a press.
fn show_controls(ui: &mut egui::Ui, state: &AppState, rect: egui::Rect) -> Option<(usize, usize)> {
    let mut pressed = None;

    for (menu_idx, menu) in state.view.menus().iter().enumerate() {
        let pos = egui::pos2(
            rect.left() + menu.x as f32 * rect.width(),
            (rect.top() + (1.0 - menu.y as f32) * rect.height()).max(rect.top() + 4.0),
        );
        let active = state.view.active_button(menu_idx);

        egui::Area::new(egui::Id::new("figure_menu").with(menu_idx))
            .fixed_pos(pos)
            .order(egui::Order::Foreground)
            .show(ui.ctx(), |ui| {
                egui::Frame::group(ui.style())
                    .fill(ui.visuals().window_fill.gamma_multiply(menu.bgcolor.a))
                    .stroke(egui::Stroke::new(menu.borderwidth as f32, color32(menu.bordercolor)))
                    .show(ui, |ui| match menu.kind {
                        MenuKind::Dropdown => {
                            let selected = active
                                .and_then(|i| menu.buttons.get(i))
                                .map(|b| b.label.as_str())
                                .unwrap_or_default();
                            egui::ComboBox::from_id_salt(("figure_dropdown", menu_idx))
                                .selected_text(selected)
                                .show_ui(ui, |ui| {
                                    for (i, button) in menu.buttons.iter().enumerate() {
                                        let is_active = menu.showactive && active == Some(i);
                                        if ui.selectable_label(is_active, button.label.as_str()).clicked() {
                                            pressed = Some((menu_idx, i));
                                        }
                                    }
                                });
                        }
                        MenuKind::Buttons => {
                            ui.horizontal(|ui| {
                                for (i, button) in menu.buttons.iter().enumerate() {
                                    let is_active = menu.showactive && active == Some(i);
                                    if toolbar_toggle_btn(ui, &button.label, is_active).clicked() {
                                        pressed = Some((menu_idx, i));
                                    }
                                }
                            });
                        }
                    });
            });
    }

    pressed
}

/// Draw the backbone colorbar at the right edge. Returns the x coordinate
/// left of the bar so the legend can sit beside it.
fn draw_colorbar(painter: &egui::Painter, figure: &Figure, rect: egui::Rect) -> f32 {
    let Some(trace) = figure.data.get(BACKBONE_TRACE).filter(|t| t.visible) else {
        return rect.right();
    };
    let Some(line) = trace.line.as_ref().filter(|l| l.showscale) else {
        return rect.right();
    };

    let text_color = painter.ctx().style().visuals.text_color();
    let font = egui::FontId::proportional(11.0);
    let bar = egui::Rect::from_min_max(
        egui::pos2(rect.right() - 60.0, rect.top() + rect.height() * 0.15),
        egui::pos2(rect.right() - 60.0 + COLORBAR_WIDTH, rect.bottom() - rect.height() * 0.15),
    );

    let step_h = bar.height() / COLORBAR_STEPS as f32;
    for i in 0..COLORBAR_STEPS {
        let t = (i as f64 + 0.5) / COLORBAR_STEPS as f64;
        let [r, g, b] = line.colorscale.sample(t);
        // t = 0 at the bottom.
        let top = bar.bottom() - (i + 1) as f32 * step_h;
        let cell = egui::Rect::from_min_size(egui::pos2(bar.left(), top), egui::vec2(bar.width(), step_h + 0.5));
        painter.rect_filled(cell, 0.0, egui::Color32::from_rgb(r, g, b));
    }
    painter.rect_stroke(bar, 0.0, egui::Stroke::new(0.5, text_color.gamma_multiply(0.5)), egui::StrokeKind::Outside);

    for i in 0..COLORBAR_TICKS {
        let frac = i as f64 / (COLORBAR_TICKS - 1) as f64;
        let value = line.cmin + frac * (line.cmax - line.cmin);
        let y = bar.bottom() - frac as f32 * bar.height();
        painter.line_segment(
            [egui::pos2(bar.right(), y), egui::pos2(bar.right() + 4.0, y)],
            egui::Stroke::new(1.0, text_color),
        );
        painter.text(
            egui::pos2(bar.right() + 6.0, y),
            egui::Align2::LEFT_CENTER,
            format_tick_value(value),
            font.clone(),
            text_color,
        );
    }

    if !line.colorbar.title.text.is_empty() {
        painter.text(
            egui::pos2(bar.center().x, bar.top() - 8.0),
            egui::Align2::CENTER_BOTTOM,
            &line.colorbar.title.text,
            font,
            text_color,
        );
    }

    bar.left() - 12.0
}

/// Trace legend; hidden traces stay listed but dimmed.
fn draw_legend(painter: &egui::Painter, figure: &Figure, rect: egui::Rect, right: f32, theme: Theme) {
    if figure.data.is_empty() {
        return;
    }

    let text_color = painter.ctx().style().visuals.text_color();
    let bg_color = painter.ctx().style().visuals.window_fill;
    let font = egui::FontId::proportional(11.0);

    let max_width = figure
        .data
        .iter()
        .map(|t| painter.layout_no_wrap(t.name.clone(), font.clone(), text_color).rect.width())
        .fold(0.0_f32, f32::max);

    let legend_width = max_width + 24.0;
    let legend_height = figure.data.len() as f32 * 16.0 + 8.0;
    let x = right;
    let mut y = rect.top() + 8.0;

    let legend_rect = egui::Rect::from_min_size(
        egui::pos2(x - legend_width - 4.0, y - 4.0),
        egui::vec2(legend_width + 8.0, legend_height),
    );
    painter.rect_filled(legend_rect, 4.0, bg_color.gamma_multiply(0.85));
    painter.rect_stroke(
        legend_rect,
        4.0,
        egui::Stroke::new(0.5, text_color.gamma_multiply(0.3)),
        egui::StrokeKind::Outside,
    );

    for trace in &figure.data {
        let label_color = if trace.visible { text_color } else { theme.hidden_text() };
        let swatch = egui::Rect::from_min_size(egui::pos2(x - legend_width, y), egui::vec2(12.0, 12.0));

        match (&trace.line, &trace.marker) {
            (Some(line), _) => {
                // Small ramp stands in for a per-point colored line.
                let [r0, g0, b0] = line.colorscale.sample(0.2);
                let [r1, g1, b1] = line.colorscale.sample(0.8);
                let (left, right_half) = swatch.split_left_right_at_fraction(0.5);
                painter.rect_filled(left.shrink2(egui::vec2(0.0, 4.0)), 0.0, egui::Color32::from_rgb(r0, g0, b0));
                painter.rect_filled(right_half.shrink2(egui::vec2(0.0, 4.0)), 0.0, egui::Color32::from_rgb(r1, g1, b1));
            }
            (None, Some(marker)) => {
                painter.circle_filled(swatch.center(), 4.0, color32(Rgba { a: 1.0, ..marker.color }));
            }
            (None, None) => {}
        }
        if !trace.visible {
            painter.rect_filled(swatch, 0.0, bg_color.gamma_multiply(0.6));
        }

        painter.text(
            egui::pos2(x - legend_width + 16.0, y + 6.0),
            egui::Align2::LEFT_CENTER,
            &trace.name,
            font.clone(),
            label_color,
        );

        y += 16.0;
    }
}

/// Highlight the backbone bin nearest to the pointer and list its values.
fn draw_hover_tooltip(
    painter: &egui::Painter,
    state: &AppState,
    transform: &SceneTransform,
    rect: egui::Rect,
    mouse: egui::Pos2,
) {
    let figure = state.view.figure();
    let Some(trace) = figure.data.get(BACKBONE_TRACE).filter(|t| t.visible) else {
        return;
    };

    let camera = &state.view.camera;
    let mut best: Option<(usize, egui::Pos2, f32)> = None;
    for (i, ((&x, &y), &z)) in trace.x.iter().zip(&trace.y).zip(&trace.z).enumerate() {
        let [nx, ny, nz, _] = transform.apply(x, y, z);
        if !(nx.is_finite() && ny.is_finite() && nz.is_finite()) {
            continue;
        }
        let Some(screen) = camera.project(Vec3::new(nx, ny, nz), rect) else {
            continue;
        };
        let dist = screen.distance(mouse);
        if dist <= PICK_RADIUS && best.map_or(true, |(_, _, d)| dist < d) {
            best = Some((i, screen, dist));
        }
    }

    let Some((row, screen, _)) = best else {
        return;
    };
    let Some(point) = state.features.point(row) else {
        return;
    };

    let dot_color = trace
        .line
        .as_ref()
        .and_then(|l| {
            let value = l.color.get(row).copied()?;
            l.colorscale.map(value, l.cmin, l.cmax)
        })
        .map(|[r, g, b]| egui::Color32::from_rgb(r, g, b))
        .unwrap_or(egui::Color32::WHITE);

    let mut text = format!(
        "Bin {row}\nx: {:.3}  y: {:.3}  z: {:.3}",
        point.x, point.y, point.z
    );
    for (name, value) in &point.features {
        text.push_str(&format!("\n{}: {}", human_label(name), format_tick_value(*value)));
    }

    painter.circle_filled(screen, 5.0, dot_color);
    painter.circle_stroke(screen, 5.0, egui::Stroke::new(1.0, egui::Color32::WHITE));

    let font = egui::FontId::proportional(11.0);
    let text_color = painter.ctx().style().visuals.text_color();
    let galley = painter.layout_no_wrap(text, font, text_color);
    let size = galley.rect.size();

    // Flip to the other side of the pointer near the right/bottom edges.
    let mut pos = egui::pos2(screen.x + 10.0, screen.y - size.y - 8.0);
    if pos.x + size.x + 4.0 > rect.right() {
        pos.x = screen.x - size.x - 14.0;
    }
    if pos.y < rect.top() {
        pos.y = screen.y + 10.0;
    }

    let bg_rect = egui::Rect::from_min_size(pos - egui::vec2(4.0, 2.0), size + egui::vec2(8.0, 4.0));
    let bg_color = painter.ctx().style().visuals.window_fill;
    painter.rect_filled(bg_rect, 3.0, bg_color.gamma_multiply(0.9));
    painter.rect_stroke(bg_rect, 3.0, egui::Stroke::new(0.5, dot_color), egui::StrokeKind::Outside);
    painter.galley(pos, galley, text_color);
}

/// Compact tick/readout formatting: scientific notation for very large or
/// very small magnitudes, trimmed decimals otherwise.
pub fn format_tick_value(val: f64) -> String {
    if !val.is_finite() {
        "NaN".to_string()
    } else if val.abs() >= 1e6 || (val != 0.0 && val.abs() < 1e-3) {
        format!("{val:.2e}")
    } else if val == 0.0 {
        "0".to_string()
    } else {
        let s = format!("{val:.6}");
        let s = s.trim_end_matches('0');
        let s = s.trim_end_matches('.');
        s.to_string()
    }
}
