use std::sync::Arc;

use eframe::egui;

use crate::figure::html::{self, PAGE_TITLE};
use crate::plot3d::renderer as plot3d_renderer;
use crate::state::app_state::{AppState, VERSION};
use crate::ui::figure_panel;

/// The chromosome viewer window.
pub struct ChromoPlotApp {
    pub state: AppState,
    /// An error message shown in the footer until dismissed.
    pub error_message: Option<String>,
    /// Scene rect of the last frame; screenshots are cropped to it.
    last_scene_rect: Option<egui::Rect>,
    /// A screenshot was requested and has not arrived yet.
    pending_screenshot: bool,
}

impl ChromoPlotApp {
    fn report_error(&mut self, msg: String) {
        tracing::error!("{msg}");
        self.error_message = Some(msg);
    }

    pub fn new(cc: &eframe::CreationContext<'_>, state: AppState) -> Self {
        let ctx = &cc.egui_ctx;
        let mut style = (*ctx.style()).clone();
        style.text_styles.insert(egui::TextStyle::Body, egui::FontId::proportional(15.0));
        style.text_styles.insert(egui::TextStyle::Button, egui::FontId::proportional(14.5));
        style.text_styles.insert(egui::TextStyle::Heading, egui::FontId::proportional(22.0));
        style.spacing.button_padding = egui::vec2(10.0, 5.0);
        style.spacing.item_spacing = egui::vec2(8.0, 6.0);
        ctx.set_style(style);
        ctx.set_visuals(state.theme.visuals());

        if let Some(render_state) = cc.wgpu_render_state.as_ref() {
            plot3d_renderer::init_3d_resources(render_state);
        } else {
            tracing::error!("wgpu render state unavailable; the scene cannot be drawn");
        }

        Self {
            state,
            error_message: None,
            last_scene_rect: None,
            pending_screenshot: false,
        }
    }

    fn export_html(&mut self) {
        let Some(path) = rfd::FileDialog::new()
            .set_file_name("chromosome_plot.html")
            .add_filter("HTML", &["html"])
            .save_file()
        else {
            return;
        };
        if let Err(e) = html::export_dashboard(self.state.view.figure(), &path) {
            self.report_error(format!("Failed to export HTML: {e:#}"));
        }
    }

    fn export_json(&mut self) {
        let Some(path) = rfd::FileDialog::new()
            .set_file_name("chromosome_plot.json")
            .add_filter("JSON", &["json"])
            .save_file()
        else {
            return;
        };
        if let Err(e) = html::export_json(self.state.view.figure(), &path) {
            self.report_error(format!("Failed to export JSON: {e:#}"));
        }
    }

    /// Save the screenshot delivered this frame, cropped to the scene.
    fn save_screenshot(&mut self, color_image: &egui::ColorImage, ppp: f32) {
        let full_w = color_image.width();
        let full_h = color_image.height();

        let (x0, y0, x1, y1) = match self.last_scene_rect {
            Some(rect) => (
                ((rect.left() * ppp) as usize).min(full_w),
                ((rect.top() * ppp) as usize).min(full_h),
                ((rect.right() * ppp).ceil() as usize).min(full_w),
                ((rect.bottom() * ppp).ceil() as usize).min(full_h),
            ),
            None => (0, 0, full_w, full_h),
        };
        let width = x1.saturating_sub(x0);
        let height = y1.saturating_sub(y0);

        let mut rgba = Vec::with_capacity(width * height * 4);
        for row in y0..y1 {
            for col in x0..x1 {
                let c = color_image.pixels[row * full_w + col];
                rgba.extend_from_slice(&[c.r(), c.g(), c.b(), c.a()]);
            }
        }

        let Some(path) = rfd::FileDialog::new()
            .set_file_name("chromosome_plot.png")
            .add_filter("PNG Image", &["png"])
            .save_file()
        else {
            return;
        };
        let Some(img) = image::RgbaImage::from_raw(width as u32, height as u32, rgba) else {
            self.report_error("Screenshot has an unexpected size".to_string());
            return;
        };
        match img.save(&path) {
            Ok(()) => tracing::info!("Saved screenshot to {:?}", path),
            Err(e) => self.report_error(format!("Failed to save image: {e}")),
        }
    }
}

impl eframe::App for ChromoPlotApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        ctx.set_visuals(self.state.theme.visuals());

        if self.pending_screenshot {
            let mut screenshot: Option<Arc<egui::ColorImage>> = None;
            ctx.input(|i| {
                for event in &i.raw.events {
                    if let egui::Event::Screenshot { image, .. } = event {
                        screenshot = Some(image.clone());
                    }
                }
            });
            if let Some(image) = screenshot {
                self.pending_screenshot = false;
                self.save_screenshot(&image, ctx.pixels_per_point());
            }
        }

        let mut export_html = false;
        let mut export_json = false;
        egui::TopBottomPanel::top("header")
            .frame(egui::Frame::side_top_panel(&ctx.style()).inner_margin(egui::Margin::symmetric(16, 8)))
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.visuals_mut().override_text_color = Some(self.state.theme.heading_color());
                    ui.heading(PAGE_TITLE);
                    ui.visuals_mut().override_text_color = None;

                    ui.separator();

                    if ui.button("Export HTML").clicked() {
                        export_html = true;
                    }
                    if ui.button("Export JSON").clicked() {
                        export_json = true;
                    }
                    if ui.button("Save PNG").clicked() {
                        self.pending_screenshot = true;
                        ctx.send_viewport_cmd(egui::ViewportCommand::Screenshot(egui::UserData::default()));
                    }
                    if ui.button("Reset View").clicked() {
                        self.state.view.camera.reset();
                    }

                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        let theme_label = format!("{} Mode", self.state.theme.toggle().label());
                        if ui.button(theme_label).clicked() {
                            self.state.theme = self.state.theme.toggle();
                        }
                        ui.separator();
                        ui.small(format!("v{VERSION}"));
                    });
                });
            });

        if export_html {
            self.export_html();
        }
        if export_json {
            self.export_json();
        }

        egui::TopBottomPanel::bottom("footer")
            .frame(egui::Frame::side_top_panel(&ctx.style()).inner_margin(egui::Margin::symmetric(16, 6)))
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    let figure = self.state.view.figure();
                    let counts: Vec<String> =
                        figure.data.iter().map(|t| format!("{}: {} points", t.name, t.x.len())).collect();
                    ui.label(egui::RichText::new(counts.join("  |  ")).weak());
                    if let Some(feature) = self.state.view.selected_feature() {
                        ui.separator();
                        ui.label(format!("Color: {feature}"));
                    }
                    ui.label(egui::RichText::new("Drag to rotate, right-drag to pan, scroll to zoom, S toggles surface").weak());

                    if let Some(msg) = &self.error_message {
                        ui.separator();
                        ui.colored_label(egui::Color32::from_rgb(255, 80, 80), msg);
                        if ui.small_button("dismiss").clicked() {
                            self.error_message = None;
                        }
                    }
                });
            });

        egui::CentralPanel::default()
            .frame(egui::Frame::central_panel(&ctx.style()).fill(self.state.theme.page_bg()))
            .show(ctx, |ui| {
                self.last_scene_rect = Some(figure_panel::show_figure_panel(&mut self.state, ui));
            });
    }
}
