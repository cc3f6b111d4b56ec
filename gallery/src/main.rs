use bevy::prelude::*;
use bevy_egui::EguiPlugin;
use std::env;

mod surface;
mod ui;

use crate::surface::{SurfacePlugin, DEFAULT_CONFIG_PATH};

fn main() {
    // optional first argument: path to a RON config
    let config_path = env::args().nth(1).unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

    App::new()
        .insert_resource(ClearColor(Color::rgb(0.08, 0.08, 0.1)))
        .insert_resource(Msaa::Sample4)
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: "Surface Graph Gallery".into(),
                resolution: (1280.0, 720.0).into(),
                resizable: true,
                ..default()
            }),
            ..default()
        }))
        .add_plugins(EguiPlugin)
        .add_plugins(SurfacePlugin { config_path })
        .run();
}
