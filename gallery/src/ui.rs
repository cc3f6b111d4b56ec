use bevy::prelude::*;
use bevy_egui::{egui, EguiContexts};
use surface_engine::{GenerationRequest, GeneratorConfig};

use crate::surface::{GalleryStatus, SurfaceData};

/// Values edited in the control panel; applied on "Generate".
#[derive(Resource, Clone)]
pub struct ControlPanel {
    pub rows: usize,
    pub columns: usize,
    pub cache_count: usize,
    pub lod_enabled: bool,
    pub file_url: String,
}

impl ControlPanel {
    pub fn from_config(config: &GeneratorConfig) -> Self {
        Self {
            rows: config.row_count,
            columns: config.column_count,
            cache_count: config.cache_count,
            lod_enabled: config.lod_enabled,
            file_url: String::new(),
        }
    }
}

pub fn control_panel_ui(
    mut contexts: EguiContexts,
    mut panel: ResMut<ControlPanel>,
    mut data: ResMut<SurfaceData>,
    status: Res<GalleryStatus>,
) {
    egui::Window::new("Surface Gallery").show(contexts.ctx_mut(), |ui| {
        ui.add(egui::Slider::new(&mut panel.rows, 2..=1000).text("Sample rows"));
        ui.add(egui::Slider::new(&mut panel.columns, 2..=1000).text("Sample columns"));
        ui.add(egui::Slider::new(&mut panel.cache_count, 1..=100).text("Cached frames"));

        if ui.checkbox(&mut panel.lod_enabled, "Level of detail").changed() {
            data.source.set_lod_enabled(panel.lod_enabled);
        }

        ui.horizontal(|ui| {
            if ui.button("Generate").clicked() {
                let bounds = data.config.bounds;
                let request = GenerationRequest::new(panel.cache_count, panel.rows, panel.columns, bounds);
                data.source.generate_data(request);
            }
            if ui.button("Clear cache").clicked() {
                data.source.clear_cache();
            }
        });

        ui.add(egui::ProgressBar::new(status.progress as f32 / 100.0).show_percentage());
        match (status.ready, status.frame_index) {
            (true, Some(index)) => ui.label(format!("Showing frame {}", index + 1)),
            (true, None) => ui.label("Data ready"),
            (false, _) => ui.label("Generating..."),
        };

        ui.separator();
        ui.label("Height map file");
        ui.text_edit_singleline(&mut panel.file_url);
        if ui.button("Check file").clicked() {
            match data.source.check_and_process_file(&panel.file_url) {
                Ok(path) => info!("Height map accepted: {}", path.display()),
                Err(e) => debug!("Height map rejected: {e}"),
            }
        }
        if let Some(message) = &status.file_message {
            ui.label(message.as_str());
        }
    });
}
