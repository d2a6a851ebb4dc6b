use anyhow::{Context, Result};
use clap::Parser;
use egui::Context as EguiContext;
use glam::Vec2;
use mapview_assets::DirectoryResolver;
use mapview_common::ViewerConfig;
use mapview_input::{CameraAction, Modifiers};
use mapview_render::{MapViewer, TickReport, ViewerInputs};
use mapview_render_wgpu::{GpuStats, WgpuRenderer};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::EnvFilter;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, KeyEvent, MouseButton, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

/// Simulation ticks allowed per rendered frame before the backlog is dropped.
const MAX_TICKS_PER_FRAME: u32 = 4;
/// Keyboard pan speed in pixels per second.
const KEY_PAN_SPEED: f32 = 600.0;

#[derive(Parser)]
#[command(name = "mapview-desktop", about = "Map viewer")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Map description (JSON)
    map: PathBuf,

    /// Tileset tables (JSON)
    #[arg(long)]
    tables: Option<PathBuf>,

    /// Object attribute table (JSON)
    #[arg(long)]
    attributes: Option<PathBuf>,

    /// Über-splat table (JSON)
    #[arg(long)]
    splats: Option<PathBuf>,

    /// Extracted game data; repeat for several roots. Defaults to the map's directory
    #[arg(long = "data-dir")]
    data_dirs: Vec<PathBuf>,

    /// Viewer config (YAML)
    #[arg(long)]
    config: Option<PathBuf>,
}

impl Cli {
    fn open_viewer(&self) -> Result<MapViewer> {
        let config = match &self.config {
            Some(path) => ViewerConfig::load(path)
                .with_context(|| format!("reading config {}", path.display()))?,
            None => ViewerConfig::default(),
        };
        let inputs = ViewerInputs::load(
            &self.map,
            self.tables.as_deref(),
            self.attributes.as_deref(),
            self.splats.as_deref(),
        )
        .with_context(|| format!("loading map {}", self.map.display()))?;
        let roots = if self.data_dirs.is_empty() {
            vec![self.map.parent().map(PathBuf::from).unwrap_or_default()]
        } else {
            self.data_dirs.clone()
        };
        Ok(MapViewer::new(
            config,
            inputs,
            Box::new(DirectoryResolver::new(roots)),
        ))
    }
}

/// Application state.
struct AppState {
    viewer: MapViewer,
    show_overlay: bool,
    // Input state
    modifiers: Modifiers,
    cursor: Vec2,
    keys_held: HashSet<KeyCode>,
    last_frame: Instant,
    // Fixed timestep
    tick_accumulator: f64,
    tick_rate: f64,
    last_report: Option<TickReport>,
}

impl AppState {
    fn new(viewer: MapViewer) -> Self {
        let tick_rate = 1.0 / f64::from(viewer.config().target_fps.max(1.0));
        Self {
            viewer,
            show_overlay: true,
            modifiers: Modifiers::default(),
            cursor: Vec2::ZERO,
            keys_held: HashSet::new(),
            last_frame: Instant::now(),
            tick_accumulator: 0.0,
            tick_rate,
            last_report: None,
        }
    }

    fn update(&mut self, dt: f32) {
        let mut pan = Vec2::ZERO;
        if self.keys_held.contains(&KeyCode::KeyW) || self.keys_held.contains(&KeyCode::ArrowUp) {
            pan.y += 1.0;
        }
        if self.keys_held.contains(&KeyCode::KeyS) || self.keys_held.contains(&KeyCode::ArrowDown) {
            pan.y -= 1.0;
        }
        if self.keys_held.contains(&KeyCode::KeyA) || self.keys_held.contains(&KeyCode::ArrowLeft) {
            pan.x += 1.0;
        }
        if self.keys_held.contains(&KeyCode::KeyD) || self.keys_held.contains(&KeyCode::ArrowRight) {
            pan.x -= 1.0;
        }
        if pan != Vec2::ZERO {
            self.viewer
                .apply(CameraAction::Pan(pan * KEY_PAN_SPEED * dt));
        }

        self.tick_accumulator += f64::from(dt);
        let mut ticks = 0;
        while self.tick_accumulator >= self.tick_rate {
            if ticks == MAX_TICKS_PER_FRAME {
                self.tick_accumulator = 0.0;
                break;
            }
            self.tick_accumulator -= self.tick_rate;
            self.last_report = Some(self.viewer.tick());
            ticks += 1;
        }
    }

    fn handle_key(&mut self, key: KeyCode, pressed: bool) {
        if pressed {
            self.keys_held.insert(key);
        } else {
            self.keys_held.remove(&key);
        }

        if !pressed {
            return;
        }

        match key {
            KeyCode::F1 => {
                self.show_overlay = !self.show_overlay;
            }
            KeyCode::KeyR => {
                let selected = self.viewer.selection().selected().to_vec();
                for id in selected {
                    if let Some(sequence) = self.viewer.restart_animation(id) {
                        tracing::debug!(entity = %id.short(), sequence, "animation restarted");
                    }
                }
            }
            _ => {}
        }
    }

    fn handle_pointer_button(&mut self, pressed: bool) {
        if pressed {
            self.viewer.pointer_pressed(self.cursor, self.modifiers);
        } else {
            let outcome = self.viewer.pointer_released(self.cursor);
            tracing::debug!(
                ?outcome,
                selected = self.viewer.selection().selected().len(),
                "pointer released"
            );
        }
    }

    fn draw_ui(&mut self, ctx: &EguiContext, gpu: GpuStats) {
        if let Some((from, to)) = self.viewer.rubber_band() {
            let ppp = ctx.pixels_per_point();
            let rect = egui::Rect::from_two_pos(
                egui::pos2(from.x / ppp, from.y / ppp),
                egui::pos2(to.x / ppp, to.y / ppp),
            );
            ctx.layer_painter(egui::LayerId::new(
                egui::Order::Foreground,
                egui::Id::new("rubber_band"),
            ))
            .rect_stroke(
                rect,
                0.0,
                egui::Stroke::new(1.0, egui::Color32::GREEN),
                egui::StrokeKind::Inside,
            );
        }

        if !self.show_overlay {
            return;
        }

        let viewer = &self.viewer;
        egui::SidePanel::left("overlay")
            .default_width(280.0)
            .show(ctx, |ui| {
                ui.heading("Map Viewer");
                ui.separator();
                let map = viewer.map();
                ui.label(format!(
                    "Tileset: {}  Corners: {}x{}",
                    map.tileset,
                    map.grid.columns(),
                    map.grid.rows()
                ));
                ui.label(format!("Stage: {:?}  Frame: {}", viewer.stage(), viewer.frame()));
                if let Some(report) = self.last_report {
                    ui.label(format!(
                        "Assets: {} pending, {} loaded / {} failed last tick",
                        report.pending, report.loaded, report.failed
                    ));
                }
                ui.label(format!(
                    "Entities: {} ({} drawn)",
                    viewer.scene().len(),
                    viewer.scene().ready_count()
                ));
                let camera = viewer.camera();
                ui.label(format!(
                    "Camera: ({:.0}, {:.0}) at {:.0}",
                    camera.center.x, camera.center.y, camera.distance
                ));
                ui.label(format!(
                    "GPU: {} draws, {} instances, {} textures, {} meshes",
                    gpu.draw_calls, gpu.instances, gpu.textures, gpu.models
                ));

                ui.separator();
                ui.heading("Selection");
                let selected = viewer.selection().selected();
                if selected.is_empty() {
                    ui.label("Nothing selected");
                }
                for id in selected {
                    if let Some(entity) = viewer.scene().get(*id) {
                        ui.label(format!("{} {}", entity.placed.type_id, id.short()));
                    }
                }

                ui.separator();
                let failures: Vec<_> = viewer.diagnostics().collect();
                egui::CollapsingHeader::new(format!("Load failures ({})", failures.len()))
                    .default_open(!failures.is_empty())
                    .show(ui, |ui| {
                        for diagnostic in failures {
                            ui.label(format!("{}: {}", diagnostic.path, diagnostic.reason));
                        }
                    });
                egui::CollapsingHeader::new(format!("Warnings ({})", viewer.warnings().len()))
                    .show(ui, |ui| {
                        for warning in viewer.warnings() {
                            ui.label(warning);
                        }
                    });

                ui.separator();
                ui.small("F1: Overlay | Drag: Pan | Ctrl/Alt+Drag: Orbit");
                ui.small("Shift+Drag: Box select | Shift+Click: Toggle | R: Restart animation");
            });
    }
}

/// Everything that exists once a window does.
struct Gpu {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    renderer: WgpuRenderer,
    egui_winit: egui_winit::State,
    egui_renderer: egui_wgpu::Renderer,
}

impl Gpu {
    fn new(event_loop: &ActiveEventLoop, egui_ctx: &EguiContext) -> Result<Self> {
        let attrs = Window::default_attributes()
            .with_title("Map Viewer")
            .with_inner_size(PhysicalSize::new(1280u32, 720));
        let window = Arc::new(event_loop.create_window(attrs)?);

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance.create_surface(window.clone())?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .context("no suitable GPU adapter")?;

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("mapview_device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
            },
            None,
        ))?;

        let size = window.inner_size();
        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or(surface_caps.formats.first())
            .copied()
            .context("surface reports no formats")?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let renderer = WgpuRenderer::new(&device, &queue, surface_format, config.width, config.height);

        let egui_winit = egui_winit::State::new(
            egui_ctx.clone(),
            egui::ViewportId::ROOT,
            &window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );
        let egui_renderer = egui_wgpu::Renderer::new(&device, surface_format, None, 1, false);

        tracing::info!(
            "GPU initialized with {} backend",
            adapter.get_info().backend.to_str()
        );

        Ok(Self {
            window,
            surface,
            device,
            queue,
            config,
            renderer,
            egui_winit,
            egui_renderer,
        })
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.config.width = width.max(1);
        self.config.height = height.max(1);
        self.surface.configure(&self.device, &self.config);
        self.renderer
            .resize(&self.device, self.config.width, self.config.height);
    }

    fn paint_egui(
        &mut self,
        egui_ctx: &EguiContext,
        full_output: egui::FullOutput,
        view: &wgpu::TextureView,
    ) {
        self.egui_winit
            .handle_platform_output(&self.window, full_output.platform_output);

        let paint_jobs = egui_ctx.tessellate(full_output.shapes, full_output.pixels_per_point);
        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [self.config.width, self.config.height],
            pixels_per_point: full_output.pixels_per_point,
        };

        let (device, queue) = (&self.device, &self.queue);
        let egui_renderer = &mut self.egui_renderer;
        for (id, image_delta) in &full_output.textures_delta.set {
            egui_renderer.update_texture(device, queue, *id, image_delta);
        }
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("egui_encoder"),
        });
        egui_renderer.update_buffers(device, queue, &mut encoder, &paint_jobs, &screen_descriptor);
        {
            let mut pass = encoder
                .begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("egui_pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Load,
                            store: wgpu::StoreOp::Store,
                        },
                    })],
                    depth_stencil_attachment: None,
                    ..Default::default()
                })
                .forget_lifetime();
            egui_renderer.render(&mut pass, &paint_jobs, &screen_descriptor);
        }
        queue.submit(std::iter::once(encoder.finish()));
        for id in &full_output.textures_delta.free {
            egui_renderer.free_texture(id);
        }
    }
}

fn redraw(state: &mut AppState, gpu: &mut Gpu, egui_ctx: &EguiContext) {
    let now = Instant::now();
    let dt = (now - state.last_frame).as_secs_f32().min(0.1);
    state.last_frame = now;
    state.update(dt);

    gpu.renderer.sync(&gpu.device, &gpu.queue, &state.viewer);

    let output = match gpu.surface.get_current_texture() {
        Ok(t) => t,
        Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
            gpu.surface.configure(&gpu.device, &gpu.config);
            return;
        }
        Err(e) => {
            tracing::error!("surface error: {e}");
            return;
        }
    };

    let view = output
        .texture
        .create_view(&wgpu::TextureViewDescriptor::default());

    let plan = state.viewer.frame_plan();
    gpu.renderer
        .render(&gpu.device, &gpu.queue, &view, &state.viewer, &plan);

    let stats = gpu.renderer.stats();
    let raw_input = gpu.egui_winit.take_egui_input(&gpu.window);
    let full_output = egui_ctx.run(raw_input, |ctx| {
        state.draw_ui(ctx, stats);
    });
    gpu.paint_egui(egui_ctx, full_output, &view);

    output.present();
    gpu.window.request_redraw();
}

struct GpuApp {
    state: AppState,
    gpu: Option<Gpu>,
    egui_ctx: EguiContext,
}

impl GpuApp {
    fn new(viewer: MapViewer) -> Self {
        Self {
            state: AppState::new(viewer),
            gpu: None,
            egui_ctx: EguiContext::default(),
        }
    }
}

impl ApplicationHandler for GpuApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.gpu.is_some() {
            return;
        }
        match Gpu::new(event_loop, &self.egui_ctx) {
            Ok(gpu) => {
                self.state.viewer.resize(gpu.config.width, gpu.config.height);
                self.gpu = Some(gpu);
            }
            Err(e) => {
                tracing::error!("failed to initialize graphics: {e:#}");
                event_loop.exit();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let Some(gpu) = &mut self.gpu else {
            return;
        };
        let response = gpu.egui_winit.on_window_event(&gpu.window, &event);
        if response.consumed {
            return;
        }

        match event {
            WindowEvent::CloseRequested => {
                self.state.viewer.shutdown();
                event_loop.exit();
            }
            WindowEvent::Resized(new_size) => {
                gpu.resize(new_size.width, new_size.height);
                self.state
                    .viewer
                    .resize(gpu.config.width, gpu.config.height);
            }
            WindowEvent::ModifiersChanged(modifiers) => {
                let held = modifiers.state();
                self.state.modifiers = Modifiers {
                    shift: held.shift_key(),
                    ctrl: held.control_key(),
                    alt: held.alt_key(),
                };
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(key),
                        state: key_state,
                        ..
                    },
                ..
            } => {
                self.state
                    .handle_key(key, key_state == ElementState::Pressed);
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.state.cursor = Vec2::new(position.x as f32, position.y as f32);
                self.state.viewer.pointer_moved(self.state.cursor);
            }
            WindowEvent::MouseInput {
                button: MouseButton::Left,
                state: btn_state,
                ..
            } => {
                self.state
                    .handle_pointer_button(btn_state == ElementState::Pressed);
            }
            WindowEvent::MouseWheel { delta, .. } => {
                // Scrolling up zooms in.
                let steps = match delta {
                    MouseScrollDelta::LineDelta(_, y) => -y,
                    MouseScrollDelta::PixelDelta(p) => -(p.y as f32) / 40.0,
                };
                self.state.viewer.wheel(steps);
            }
            WindowEvent::RedrawRequested => {
                redraw(&mut self.state, gpu, &self.egui_ctx);
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(gpu) = &self.gpu {
            gpu.window.request_redraw();
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.state.viewer.shutdown();
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    tracing::info!("mapview-desktop starting");

    let viewer = cli.open_viewer()?;

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = GpuApp::new(viewer);
    event_loop.run_app(&mut app)?;

    Ok(())
}
