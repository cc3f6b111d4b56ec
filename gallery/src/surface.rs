use bevy::prelude::*;
use bevy::render::mesh::{Indices, PrimitiveTopology};
use surface_engine::{CacheStore, DataEvent, DataSource, GeneratorConfig, Point3D, SurfaceSink};

use crate::ui::{control_panel_ui, ControlPanel};

pub const DEFAULT_CONFIG_PATH: &str = "surface_gallery.ron";

/// Surface data plugin: owns the data source, feeds the mesh and the panel.
pub struct SurfacePlugin {
    pub config_path: String,
}

impl Default for SurfacePlugin {
    fn default() -> Self {
        Self { config_path: DEFAULT_CONFIG_PATH.to_string() }
    }
}

impl Plugin for SurfacePlugin {
    fn build(&self, app: &mut App) {
        let config = GeneratorConfig::load(&self.config_path).unwrap_or_else(|e| {
            warn!("Failed to load {}: {e}, using defaults", self.config_path);
            GeneratorConfig::default()
        });

        let source = match DataSource::new(&config, CacheStore::shared()) {
            Ok(source) => source,
            Err(e) => {
                error!("Failed to start data source: {e}");
                return;
            }
        };
        info!("Data source ready with {} worker threads", source.thread_count());

        let refresh = Timer::from_seconds(1.0 / config.refresh_hz.max(1.0), TimerMode::Repeating);
        app.insert_resource(ControlPanel::from_config(&config))
            .insert_resource(SurfaceData { source, config })
            .insert_resource(GalleryStatus::default())
            .insert_resource(RefreshTimer(refresh))
            .add_systems(Startup, (setup_scene, request_initial_data))
            .add_systems(Update, (poll_data_source, refresh_surface, control_panel_ui).chain());
    }
}

#[derive(Resource)]
pub struct SurfaceData {
    pub source: DataSource,
    pub config: GeneratorConfig,
}

/// What the panel shows about the current batch.
#[derive(Resource, Default)]
pub struct GalleryStatus {
    pub progress: u8,
    pub ready: bool,
    pub frame_index: Option<usize>,
    pub file_message: Option<String>,
}

#[derive(Resource)]
struct RefreshTimer(Timer);

#[derive(Resource)]
struct SurfaceMesh(Handle<Mesh>);

/// Receives the selected grid from the data source.
#[derive(Default)]
pub struct MeshSink {
    rows: Option<Vec<Vec<Point3D>>>,
}

impl SurfaceSink for MeshSink {
    fn reset_array(&mut self, rows: Vec<Vec<Point3D>>) {
        self.rows = Some(rows);
    }
}

/// Triangulates a grid; vertex colors run from blue (low) to yellow (high).
pub fn build_surface_mesh(rows: &[Vec<Point3D>]) -> Mesh {
    let row_count = rows.len();
    let column_count = rows.first().map_or(0, |r| r.len());

    let positions: Vec<[f32; 3]> = rows.iter().flatten().map(|p| [p.x, p.y, p.z]).collect();
    let (min_y, max_y) = positions
        .iter()
        .fold((f32::MAX, f32::MIN), |(lo, hi), p| (lo.min(p[1]), hi.max(p[1])));
    let span = (max_y - min_y).max(f32::EPSILON);

    let colors: Vec<[f32; 4]> = positions
        .iter()
        .map(|p| {
            let t = (p[1] - min_y) / span;
            [t, t * 0.9, 1.0 - t, 1.0]
        })
        .collect();
    let uvs: Vec<[f32; 2]> = (0..row_count)
        .flat_map(|r| (0..column_count).map(move |c| [c as f32, r as f32]))
        .collect();

    let mut indices = Vec::new();
    let mut normals = vec![Vec3::ZERO; positions.len()];
    for r in 0..row_count.saturating_sub(1) {
        for c in 0..column_count.saturating_sub(1) {
            let i0 = (r * column_count + c) as u32;
            let i1 = i0 + 1;
            let i2 = i0 + column_count as u32;
            let i3 = i2 + 1;
            for tri in [[i0, i2, i1], [i1, i2, i3]] {
                let [pa, pb, pc] = tri.map(|i| Vec3::from_array(positions[i as usize]));
                let face = (pb - pa).cross(pc - pa);
                for i in tri {
                    normals[i as usize] += face;
                }
                indices.extend_from_slice(&tri);
            }
        }
    }
    let normals: Vec<[f32; 3]> = normals
        .into_iter()
        .map(|n| n.try_normalize().unwrap_or(Vec3::Y).to_array())
        .collect();

    let mut mesh = Mesh::new(PrimitiveTopology::TriangleList);
    mesh.insert_attribute(Mesh::ATTRIBUTE_POSITION, positions);
    mesh.insert_attribute(Mesh::ATTRIBUTE_NORMAL, normals);
    mesh.insert_attribute(Mesh::ATTRIBUTE_UV_0, uvs);
    mesh.insert_attribute(Mesh::ATTRIBUTE_COLOR, colors);
    mesh.set_indices(Some(Indices::U32(indices)));
    mesh
}

fn setup_scene(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    commands.insert_resource(AmbientLight {
        color: Color::rgb(0.6, 0.6, 0.65),
        brightness: 0.4,
    });
    commands.spawn(DirectionalLightBundle {
        directional_light: DirectionalLight {
            illuminance: 12000.0,
            ..default()
        },
        transform: Transform::from_rotation(Quat::from_euler(EulerRot::XYZ, -0.8, 0.4, 0.0)),
        ..default()
    });
    commands.spawn(Camera3dBundle {
        transform: Transform::from_xyz(18.0, 14.0, 22.0).looking_at(Vec3::ZERO, Vec3::Y),
        ..default()
    });

    let mesh = meshes.add(build_surface_mesh(&[]));
    commands.spawn(PbrBundle {
        mesh: mesh.clone(),
        material: materials.add(StandardMaterial {
            base_color: Color::WHITE,
            perceptual_roughness: 0.8,
            double_sided: true,
            cull_mode: None,
            ..default()
        }),
        ..default()
    });
    commands.insert_resource(SurfaceMesh(mesh));
}

fn request_initial_data(mut data: ResMut<SurfaceData>) {
    let request = data.config.request();
    data.source.generate_data(request);
}

/// Turns finished work and file checks into panel state.
fn poll_data_source(mut data: ResMut<SurfaceData>, mut status: ResMut<GalleryStatus>) {
    data.source.poll();
    for event in data.source.events().try_iter() {
        match event {
            DataEvent::DataProgress(progress) => {
                status.progress = progress;
                if progress < 100 {
                    status.ready = false;
                }
            }
            DataEvent::DataReady => {
                status.ready = true;
                info!("Surface data ready");
            }
            DataEvent::FileAccepted(path) => status.file_message = Some(format!("Accepted {}", path.display())),
            DataEvent::FileError(message) => {
                warn!("{message}");
                status.file_message = Some(message);
            }
        }
    }
}

/// Shows the next grid of the ready batch on every timer tick.
fn refresh_surface(
    time: Res<Time>,
    mut timer: ResMut<RefreshTimer>,
    mut data: ResMut<SurfaceData>,
    mut status: ResMut<GalleryStatus>,
    surface_mesh: Option<Res<SurfaceMesh>>,
    mut meshes: ResMut<Assets<Mesh>>,
) {
    if !timer.0.tick(time.delta()).just_finished() {
        return;
    }
    let Some(surface_mesh) = surface_mesh else { return };

    let mut sink = MeshSink::default();
    status.frame_index = data.source.update(&mut sink);
    if let (Some(rows), Some(mesh)) = (sink.rows, meshes.get_mut(&surface_mesh.0)) {
        *mesh = build_surface_mesh(&rows);
    }
}
