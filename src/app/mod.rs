mod egui_host;
mod input;
mod timing;
mod view_state;

pub use egui_host::EguiFrameOutput;
pub use timing::FrameStats;
pub use view_state::ViewState;

use crate::config::{ViewerConfig, CONFIG_FILE_NAME};
use crate::render::{CameraController, RenderContext, RenderError};
use crate::scene::{compose_scene, BoxParams, LightRig};
use crate::ui::{self, UiModel};
use egui_host::EguiHost;
use input::{requests_exit, scroll_lines, OrbitGesture, OrbitInput};
use timing::FrameTiming;

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::error::{EventLoopError, OsError};
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowAttributes, WindowId};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("event loop error: {0}")]
    EventLoop(#[from] EventLoopError),
    #[error("failed to create window: {0}")]
    Window(#[from] OsError),
    #[error(transparent)]
    Render(#[from] RenderError),
}

pub struct App {
    config: ViewerConfig,
    window: Option<Arc<Window>>,
    render: Option<RenderContext>,
    egui: Option<EguiHost>,
    view: ViewState,
    lights: LightRig,
    box_params: BoxParams,
    camera: CameraController,
    orbit: OrbitInput,
    timing: FrameTiming,
    target_frame_duration: Duration,
    next_frame_time: Instant,
    failure: Option<AppError>,
}

impl App {
    fn new(config: ViewerConfig) -> Self {
        let mut view = ViewState::default();
        view.select_light_named(&config.initial_light);
        Self {
            window: None,
            render: None,
            egui: None,
            lights: LightRig::new(view.selected_light()),
            view,
            box_params: BoxParams::default(),
            camera: CameraController::from_config(&config.camera),
            orbit: OrbitInput::default(),
            timing: FrameTiming::new(config.window_title.clone()),
            target_frame_duration: Duration::from_millis(16),
            next_frame_time: Instant::now(),
            failure: None,
            config,
        }
    }

    fn init_window(&mut self, event_loop: &ActiveEventLoop) -> Result<(), AppError> {
        let [width, height] = self.config.window_size;
        let window_attrs = WindowAttributes::default()
            .with_title(self.config.window_title.clone())
            .with_inner_size(PhysicalSize::new(width, height))
            .with_resizable(true);
        let window = Arc::new(event_loop.create_window(window_attrs)?);

        let render = RenderContext::new(window.clone(), &self.config)?;
        self.egui = Some(EguiHost::new(&window, render.max_texture_side()));
        self.render = Some(render);
        self.update_target_frame_duration(&window);
        self.window = Some(window);
        Ok(())
    }

    /// Stops the loop; `run` hands the error back to `main`.
    fn fail(&mut self, event_loop: &ActiveEventLoop, err: AppError) {
        self.failure = Some(err);
        event_loop.exit();
    }

    fn update_target_frame_duration(&mut self, window: &Window) {
        let mut target = Duration::from_millis(16);
        if let Some(monitor) = window.current_monitor() {
            if let Some(millihz) = monitor.refresh_rate_millihertz() {
                let hz = millihz as f32 / 1000.0;
                if hz > 1.0 {
                    target = Duration::from_secs_f32(1.0 / hz);
                }
            }
        }
        self.target_frame_duration = target;
        self.next_frame_time = Instant::now() + self.target_frame_duration;
    }

    fn viewport_height(&self) -> f32 {
        self.window
            .as_ref()
            .map(|window| window.inner_size().height as f32)
            .unwrap_or(1.0)
    }

    fn pointer_captured_by_ui(&self) -> bool {
        self.egui
            .as_ref()
            .is_some_and(EguiHost::wants_pointer_input)
    }

    /// UI pass, then scene composition from the edited state, then the GPU frame.
    fn redraw(&mut self) -> Result<(), RenderError> {
        let (Some(window), Some(render), Some(egui)) =
            (self.window.clone(), self.render.as_mut(), self.egui.as_mut())
        else {
            return Ok(());
        };

        let stats = self.timing.stats();
        let ui_output = egui.run_ui(&window, |ctx| {
            ui::draw(
                ctx,
                UiModel {
                    view: &mut self.view,
                    lights: &mut self.lights,
                    box_params: &mut self.box_params,
                    stats: &stats,
                },
            )
        });

        self.lights.mount(self.view.selected_light());
        let scene = compose_scene(&self.lights, &self.box_params, &self.config.environment);
        let render_ms = render.render_frame(&scene, &self.camera, &ui_output)?;
        self.timing.set_render_ms(render_ms);
        self.timing.update(Some(&window), Instant::now());
        Ok(())
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(err) = self.init_window(event_loop) {
            self.fail(event_loop, err);
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let consumed_by_ui = match (self.window.as_ref(), self.egui.as_mut()) {
            (Some(window), Some(egui)) => egui.on_window_event(window, &event),
            _ => false,
        };

        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if requests_exit(event.state, event.physical_key, consumed_by_ui) {
                    event_loop.exit();
                }
            }
            WindowEvent::Focused(false) => {
                self.orbit.release_all();
            }
            WindowEvent::Resized(new_size) => {
                if let Some(render) = &mut self.render {
                    render.resize(new_size);
                }
                if let Some(window) = self.window.clone() {
                    self.update_target_frame_duration(&window);
                }
            }
            WindowEvent::Moved(_) => {
                if let Some(window) = self.window.clone() {
                    self.update_target_frame_duration(&window);
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                let height = self.viewport_height();
                match self.orbit.handle_cursor(position.x as f32, position.y as f32) {
                    OrbitGesture::Rotate { dx, dy } => self.camera.orbit(dx, dy, height),
                    OrbitGesture::Pan { dx, dy } => self.camera.pan(dx, dy, height),
                    OrbitGesture::None => {}
                }
            }
            WindowEvent::CursorLeft { .. } => {
                self.orbit.cursor_left();
            }
            WindowEvent::MouseInput { state, button, .. } => {
                // Presses over egui stay with egui; releases always end a drag.
                if state == ElementState::Released || !self.pointer_captured_by_ui() {
                    self.orbit.handle_button(button, state);
                }
            }
            WindowEvent::MouseWheel { delta, .. } => {
                if !self.pointer_captured_by_ui() {
                    self.camera.dolly(scroll_lines(delta));
                }
            }
            WindowEvent::RedrawRequested => {
                if let Err(err) = self.redraw() {
                    self.fail(event_loop, err.into());
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        let now = Instant::now();
        if now >= self.next_frame_time {
            if let Some(window) = &self.window {
                window.request_redraw();
            }
            self.next_frame_time = now + self.target_frame_duration;
        }
        event_loop.set_control_flow(ControlFlow::WaitUntil(self.next_frame_time));
    }
}

pub fn run() -> Result<(), AppError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    log::info!("lightbench starting");
    log::info!("   Drag to orbit, right-drag to pan, scroll to zoom, ESC to exit");

    let config = ViewerConfig::load_or_default(Path::new(CONFIG_FILE_NAME));
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Wait);

    let mut app = App::new(config);
    event_loop.run_app(&mut app)?;

    if let Some(err) = app.failure.take() {
        return Err(err);
    }
    log::info!("Goodbye");
    Ok(())
}
