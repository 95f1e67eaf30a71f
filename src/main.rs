use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use clap::Parser;
use hecs::World;
use tracing_subscriber::EnvFilter;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalPosition;
use winit::event::{ElementState, MouseButton, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

use holoscan::{
    Blit, Camera, CompositeOutcome, EffectConfig, GpuContext, HoloError, HolographicEffect, Mesh,
    Quat, Renderable, SceneDraw, ScenePass, Transform, Vec2, Vec3,
};

#[derive(Parser)]
#[command(name = "holoscan")]
#[command(version)]
#[command(about = "Holographic scan effect demo")]
#[command(long_about = "
Orbits a small scene and runs the holographic scan effect over it.
Press Space to scan from the origin, or click the ground to scan from there.

Example usage:
  holoscan --config scan.toml
")]
struct Args {
    /// Path to an effect config file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

/// Base colour of an entity in the scene pass.
struct Tint([f32; 4]);

/// Entities carrying this are offered to the effect each frame.
struct Holographic;

/// Slow automatic orbit around the origin.
struct Orbit {
    azimuth: f32,
    elevation: f32,
    distance: f32,
}

impl Orbit {
    fn camera(&self) -> Camera {
        let offset = Vec3::new(
            self.distance * self.elevation.cos() * self.azimuth.sin(),
            self.distance * self.elevation.sin(),
            self.distance * self.elevation.cos() * self.azimuth.cos(),
        );
        Camera::new()
            .at(offset)
            .looking_at(Vec3::ZERO)
            .with_fov(60.0)
            .with_clip(0.1, 100.0)
    }
}

struct Demo {
    window: Arc<Window>,
    gpu: GpuContext,
    scene: ScenePass,
    effect: HolographicEffect,
    fallback: Blit,
    world: World,
    orbit: Orbit,
    cursor: Option<PhysicalPosition<f64>>,
}

impl Demo {
    fn new(window: Arc<Window>, config: EffectConfig) -> Result<Self, HoloError> {
        let gpu = GpuContext::new(window.clone())?;
        let scene = ScenePass::new(&gpu);
        let effect = HolographicEffect::new(&gpu, config);
        let fallback = Blit::new(&gpu, gpu.config.format);

        let mut world = World::new();
        populate(&mut world, &gpu);

        Ok(Self {
            window,
            gpu,
            scene,
            effect,
            fallback,
            world,
            orbit: Orbit {
                azimuth: 0.0,
                elevation: 0.45,
                distance: 12.0,
            },
            cursor: None,
        })
    }

    fn update(&mut self, dt: f32) {
        self.orbit.azimuth += dt * 0.15;
        self.effect.update(dt);
    }

    /// Triggers a scan where the cursor ray meets the ground plane.
    fn trigger_at_cursor(&mut self) {
        let Some(cursor) = self.cursor else {
            return;
        };
        let ndc = Vec2::new(
            (2.0 * cursor.x as f32 / self.gpu.width() as f32) - 1.0,
            1.0 - (2.0 * cursor.y as f32 / self.gpu.height() as f32),
        );
        let (origin, direction) = self.orbit.camera().ray_through(ndc, self.gpu.aspect());
        if let Some(hit) = ground_hit(origin, direction) {
            self.trigger(hit);
        }
    }

    fn trigger(&mut self, position: Vec3) {
        if self.effect.trigger(position) {
            tracing::info!(?position, "scan triggered");
        }
    }

    fn render(&mut self, time: f32) -> Result<(), HoloError> {
        let Self {
            gpu,
            scene,
            effect,
            fallback,
            world,
            orbit,
            ..
        } = self;

        let output = match gpu.surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                gpu.resize(gpu.width(), gpu.height());
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });

        let camera = orbit.camera();

        let mut query = world.query::<(&Transform, &Arc<Mesh>, &Tint, Option<&Holographic>)>();
        let entities: Vec<_> = query.iter().map(|(_, components)| components).collect();

        let draws: Vec<SceneDraw> = entities
            .iter()
            .map(|(transform, mesh, tint, _)| SceneDraw {
                mesh,
                transform: **transform,
                color: tint.0,
            })
            .collect();
        scene.render(gpu, &mut encoder, &camera, time, &draws);

        effect.begin_frame(gpu, &mut encoder, &camera);
        for (transform, mesh, _, holographic) in &entities {
            if holographic.is_some() {
                let renderable = Renderable::new(Arc::clone(mesh), **transform);
                effect.query_overlay_candidate(Some(transform.position), &[renderable]);
            }
        }

        if effect.composite(gpu, &mut encoder, scene.inputs(), &view) == CompositeOutcome::Disabled
        {
            fallback.copy(gpu, &mut encoder, scene.inputs().color, &view);
        }

        gpu.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }
}

fn populate(world: &mut World, gpu: &GpuContext) {
    let cube = Arc::new(Mesh::cube(gpu));
    let sphere = Arc::new(Mesh::sphere(gpu, 32, 16));
    let ground = Arc::new(Mesh::plane(gpu, 30.0));

    world.spawn((
        Transform::new(),
        ground,
        Tint([0.25, 0.27, 0.3, 1.0]),
    ));

    for i in 0..8 {
        let angle = i as f32 * std::f32::consts::TAU / 8.0;
        let radius = 3.0 + (i % 3) as f32 * 1.5;
        let position = Vec3::new(angle.cos() * radius, 0.5, angle.sin() * radius);
        let (mesh, tint) = if i % 2 == 0 {
            (cube.clone(), [0.85, 0.55, 0.3, 1.0])
        } else {
            (sphere.clone(), [0.4, 0.6, 0.85, 1.0])
        };
        world.spawn((
            Transform::from_position(position).rotation(Quat::from_rotation_y(angle)),
            mesh,
            Tint(tint),
            Holographic,
        ));
    }

    // Plain crate, never revealed
    world.spawn((
        Transform::from_position(Vec3::new(0.0, 1.0, 0.0)).uniform_scale(2.0),
        cube,
        Tint([0.6, 0.6, 0.6, 1.0]),
    ));
}

/// Intersection of a ray with the `y = 0` plane in front of its origin.
fn ground_hit(origin: Vec3, direction: Vec3) -> Option<Vec3> {
    if direction.y.abs() <= f32::EPSILON {
        return None;
    }
    let t = -origin.y / direction.y;
    (t > 0.0).then(|| origin + direction * t)
}

struct App {
    config: EffectConfig,
    demo: Option<Demo>,
    start_time: Instant,
    last_frame: Instant,
}

impl App {
    fn new(config: EffectConfig) -> Self {
        Self {
            config,
            demo: None,
            start_time: Instant::now(),
            last_frame: Instant::now(),
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.demo.is_some() {
            return;
        }

        let attributes = Window::default_attributes().with_title("holoscan");
        let window = match event_loop.create_window(attributes) {
            Ok(window) => Arc::new(window),
            Err(err) => {
                tracing::error!(%err, "failed to create window");
                event_loop.exit();
                return;
            }
        };

        match Demo::new(window, self.config.clone()) {
            Ok(demo) => {
                tracing::info!(
                    enabled = demo.effect.is_enabled(),
                    "press space or click the ground to scan"
                );
                self.demo = Some(demo);
                self.last_frame = Instant::now();
            }
            Err(err) => {
                tracing::error!(%err, "failed to initialise GPU");
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let Some(demo) = &mut self.demo else {
            return;
        };

        match event {
            WindowEvent::CloseRequested => {
                demo.effect.release();
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                demo.gpu.resize(size.width, size.height);
            }
            WindowEvent::CursorMoved { position, .. } => {
                demo.cursor = Some(position);
            }
            WindowEvent::MouseInput {
                state: ElementState::Pressed,
                button: MouseButton::Left,
                ..
            } => {
                demo.trigger_at_cursor();
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if event.state == ElementState::Pressed
                    && !event.repeat
                    && event.physical_key == PhysicalKey::Code(KeyCode::Space)
                {
                    demo.trigger(Vec3::ZERO);
                }
            }
            WindowEvent::RedrawRequested => {
                let now = Instant::now();
                let dt = now.duration_since(self.last_frame).as_secs_f32();
                self.last_frame = now;

                demo.update(dt);
                if let Err(err) = demo.render(self.start_time.elapsed().as_secs_f32()) {
                    tracing::error!(%err, "frame failed");
                    event_loop.exit();
                    return;
                }
                demo.window.request_redraw();
            }
            _ => (),
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("holoscan=info")),
        )
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => EffectConfig::load(path)?,
        None => EffectConfig::default(),
    };

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(config);
    event_loop.run_app(&mut app)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_flag_is_optional() {
        let args = Args::try_parse_from(["holoscan"]).unwrap();
        assert!(args.config.is_none());

        let args = Args::try_parse_from(["holoscan", "--config", "scan.toml"]).unwrap();
        assert_eq!(args.config, Some(PathBuf::from("scan.toml")));

        let args = Args::try_parse_from(["holoscan", "-c", "scan.toml"]).unwrap();
        assert_eq!(args.config, Some(PathBuf::from("scan.toml")));
    }

    #[test]
    fn help_is_not_a_config_path() {
        let err = Args::try_parse_from(["holoscan", "--help"]).err().unwrap();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);

        let err = Args::try_parse_from(["holoscan", "--bogus"]).err().unwrap();
        assert_eq!(err.kind(), clap::error::ErrorKind::UnknownArgument);
    }

    #[test]
    fn ray_hits_ground_in_front() {
        let hit = ground_hit(Vec3::new(0.0, 5.0, 0.0), Vec3::new(0.0, -1.0, 1.0).normalize());
        let hit = hit.expect("downward ray should hit the ground");
        assert!(hit.abs_diff_eq(Vec3::new(0.0, 0.0, 5.0), 1e-4));
    }

    #[test]
    fn ray_away_from_ground_misses() {
        assert!(ground_hit(Vec3::new(0.0, 5.0, 0.0), Vec3::Y).is_none());
        assert!(ground_hit(Vec3::new(0.0, 5.0, 0.0), Vec3::X).is_none());
    }

    #[test]
    fn orbit_camera_faces_origin() {
        let orbit = Orbit {
            azimuth: 0.3,
            elevation: 0.4,
            distance: 10.0,
        };
        let camera = orbit.camera();
        assert!((camera.position.length() - 10.0).abs() < 1e-4);
        assert!(camera.forward.abs_diff_eq(-camera.position.normalize(), 1e-4));
    }
}
