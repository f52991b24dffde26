mod app;
mod config;
mod data;
mod figure;
mod plot3d;
mod processing;
mod render;
mod state;
mod ui;

use anyhow::Context;
use clap::Parser;
use eframe::egui;
use eframe::egui_wgpu;
use tracing_subscriber::EnvFilter;

use app::ChromoPlotApp;
use config::Args;
use data::prepare::{prepare, SCALED_COLUMNS};
use figure::builder::build_chromosome_figure;
use figure::html::{export_dashboard, export_json, PAGE_TITLE};
use state::app_state::AppState;
use state::figure_view::FigureView;

/// Room for the header and footer panels around the scene.
const CHROME_HEIGHT: f32 = 90.0;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    args.validate()?;

    let prepared = prepare(&args.input_paths(), args.zero_variance)?;
    let style = args.figure_style();
    let figure = build_chromosome_figure(&prepared.features, &prepared.surface, &SCALED_COLUMNS, &style)
        .context("Cannot build the chromosome figure")?;

    if let Some(path) = &args.export_html {
        export_dashboard(&figure, path)?;
    }
    if let Some(path) = &args.export_json {
        export_json(&figure, path)?;
    }
    if args.no_viewer {
        return Ok(());
    }

    let state = AppState::new(FigureView::new(figure), prepared.features);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title(PAGE_TITLE)
            .with_inner_size([style.width as f32, style.height as f32 + CHROME_HEIGHT])
            .with_min_inner_size([640.0, 480.0]),
        wgpu_options: egui_wgpu::WgpuConfiguration {
            present_mode: eframe::wgpu::PresentMode::AutoVsync,
            wgpu_setup: egui_wgpu::WgpuSetup::CreateNew(egui_wgpu::WgpuSetupCreateNew {
                instance_descriptor: eframe::wgpu::InstanceDescriptor {
                    // Prefer DX12 on Windows; Vulkan and GL as fallbacks.
                    backends: eframe::wgpu::Backends::DX12
                        | eframe::wgpu::Backends::VULKAN
                        | eframe::wgpu::Backends::METAL
                        | eframe::wgpu::Backends::GL,
                    ..Default::default()
                },
                power_preference: eframe::wgpu::PowerPreference::HighPerformance,
                ..Default::default()
            }),
            ..Default::default()
        },
        ..Default::default()
    };

    eframe::run_native(
        "chromoplot",
        options,
        Box::new(|cc| Ok(Box::new(ChromoPlotApp::new(cc, state)))),
    )
    .map_err(|e| anyhow::anyhow!("Viewer failed: {e}"))
}
