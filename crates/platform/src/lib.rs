//! Platform layer: window, event loop and input.
//!
//! - No busy loop: redraws are requested on resize, input and surface loss.
//! - Left click picks through the scene; Escape clears the selection.

use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use engine::{Application, DrawList};
use renderer::GpuState;
use winit::{
    application::ApplicationHandler,
    dpi::{PhysicalPosition, PhysicalSize},
    event::{ElementState, KeyEvent, MouseButton, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{Key, NamedKey},
    window::{Window, WindowId},
};

/// Window and GPU options.
#[derive(Clone, Debug)]
pub struct RunConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub backends: wgpu::Backends,
    /// Draw the status line through the text service.
    pub overlay: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            title: "Nova3D".to_owned(),
            width: 1280,
            height: 720,
            backends: wgpu::Backends::all(),
            overlay: true,
        }
    }
}

/// Run the event loop until the window closes. Returns the first fatal
/// error hit inside the loop.
pub fn run(app: Application, config: RunConfig) -> Result<()> {
    let event_loop = EventLoop::new().context("Failed to create event loop")?;
    event_loop.set_control_flow(ControlFlow::Wait);

    let mut handler = Handler::new(app, config);
    event_loop
        .run_app(&mut handler)
        .map_err(|e| anyhow!("Event loop error: {e:?}"))?;

    match handler.error.take() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

/// Status line drawn in the top-left corner.
pub fn overlay_text(app: &Application) -> String {
    let scene = app.scene();
    let selected = scene.selected();
    let mut line = format!("objects: {}", scene.len());
    if !selected.is_empty() {
        let ids: Vec<String> = selected.iter().map(|id| id.0.to_string()).collect();
        line.push_str(&format!("  selected: {}", ids.join(",")));
    }
    line
}

struct Handler {
    app: Application,
    config: RunConfig,
    window: Option<Arc<Window>>,
    gpu: Option<GpuState>,
    list: DrawList,
    cursor: Option<PhysicalPosition<f64>>,
    error: Option<anyhow::Error>,
}

impl Handler {
    fn new(app: Application, config: RunConfig) -> Self {
        Self {
            app,
            config,
            window: None,
            gpu: None,
            list: DrawList::new(),
            cursor: None,
            error: None,
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        log::error!("{err:#}");
        self.error.get_or_insert(err);
        event_loop.exit();
    }

    fn init(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attrs = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(PhysicalSize::new(self.config.width, self.config.height));
        let window = Arc::new(
            event_loop
                .create_window(attrs)
                .context("Failed to create window")?,
        );
        let size = window.inner_size();
        log::info!("Window created: {}x{}", size.width, size.height);

        let mut gpu = pollster::block_on(GpuState::new(window.clone(), self.config.backends))?;
        let compiled = gpu.prepare_shaders(self.app.shader_manager());
        log::info!("{} shader pipeline(s) ready", compiled);

        let (width, height) = gpu.size();
        self.app.set_viewport(width, height);
        window.request_redraw();
        self.window = Some(window);
        self.gpu = Some(gpu);
        Ok(())
    }

    fn request_redraw(&self) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let Some(gpu) = self.gpu.as_mut() else {
            return;
        };

        self.list.clear();
        self.app.draw_scene(&mut self.list);
        if self.config.overlay {
            let line = overlay_text(&self.app);
            self.app.draw_text(&line, 1.0, 10.0, 10.0, &mut self.list);
        }

        match gpu.render(&self.list) {
            Ok(()) => {}
            Err(err) if GpuState::is_surface_lost(&err) => {
                log::warn!("Surface {err:?}; recreating");
                gpu.recreate_surface();
                self.request_redraw();
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                self.fail(event_loop, anyhow!("GPU out of memory"));
            }
            Err(err) => log::warn!("Frame skipped: {err:?}"),
        }
    }

    fn pick(&mut self) {
        let Some(pos) = self.cursor else {
            return;
        };
        let (width, height) = self.app.viewport();
        let segment = self
            .app
            .world()
            .pick_segment(pos.x as f32, pos.y as f32, width, height);
        match self.app.scene_mut().pick(&segment) {
            Some((id, t)) => log::info!("Selected object {} (t = {:.3})", id.0, t),
            None => log::debug!("Nothing under cursor at ({:.0}, {:.0})", pos.x, pos.y),
        }
        self.request_redraw();
    }
}

impl ApplicationHandler for Handler {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(err) = self.init(event_loop) {
            self.fail(event_loop, err);
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested. Exiting event loop.");
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                log::debug!("Resized: {}x{}", size.width, size.height);
                if let Some(gpu) = self.gpu.as_mut() {
                    gpu.resize(size.width, size.height);
                }
                self.app.set_viewport(size.width, size.height);
                self.request_redraw();
            }
            WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                log::info!("Scale factor changed: {:.3}", scale_factor);
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor = Some(position);
            }
            WindowEvent::CursorLeft { .. } => {
                self.cursor = None;
            }
            WindowEvent::MouseInput {
                state: ElementState::Pressed,
                button: MouseButton::Left,
                ..
            } => self.pick(),
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        logical_key: Key::Named(NamedKey::Escape),
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            } => {
                self.app.scene_mut().clear_selection();
                self.request_redraw();
            }
            WindowEvent::RedrawRequested => self.redraw(event_loop),
            _ => {}
        }
    }
}
