use anyhow::{Context, Result};
use ouroboros::self_referencing;

use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId, WindowLevel};

use crate::coords::Viewport;
use crate::core::{App, AppControl, SetupCtx};
use crate::device::GpuInit;
use crate::input::platform::translate_window_event;
use crate::input::InputState;
use crate::render::WgpuBackend;
use crate::scene::{FrameDriver, Scene};
use crate::time::{FrameClock, DEFAULT_TIME_STEP};

/// Window flags applied at creation.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct WindowSettings {
    /// Transparent framebuffer; the surface picks a compositing alpha mode.
    pub transparent: bool,
    pub decorated: bool,
    /// Keep the window above others.
    pub topmost: bool,
    pub visible: bool,
    /// Let mouse input pass through to windows below.
    pub click_through: bool,
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            transparent: false,
            decorated: true,
            topmost: false,
            visible: true,
            click_through: false,
        }
    }
}

/// Window/runtime configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub title: String,
    pub initial_size: LogicalSize<f64>,
    pub settings: WindowSettings,
    /// Shader time added per tick.
    pub time_step: f32,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            title: "basilisk".to_string(),
            initial_size: LogicalSize::new(800.0, 600.0),
            settings: WindowSettings::default(),
            time_step: DEFAULT_TIME_STEP,
        }
    }
}

/// Entry point for the runtime.
pub struct Runtime;

impl Runtime {
    /// Opens one window, calls [`App::setup`], then drives the scene every
    /// redraw until the window closes or the app asks to exit.
    pub fn run<A>(config: RuntimeConfig, gpu_init: GpuInit, app: A) -> Result<()>
    where
        A: 'static + App,
    {
        let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
        let mut state = AppState::new(config, gpu_init, app);

        event_loop
            .run_app(&mut state)
            .context("winit event loop terminated with error")?;

        match state.fatal.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[self_referencing]
struct WindowEntry {
    input: InputState,
    driver: FrameDriver,
    scene: Scene,

    window: Window,

    #[borrows(window)]
    #[covariant]
    backend: WgpuBackend<'this>,
}

impl WindowEntry {
    /// Releases the scene's GPU resources before the backend goes away.
    fn shutdown(&mut self) {
        self.with_mut(|f| f.scene.release(&mut *f.backend));
    }
}

struct AppState<A>
where
    A: App + 'static,
{
    config: RuntimeConfig,
    gpu_init: GpuInit,
    app: A,

    window: Option<WindowEntry>,
    exit_requested: bool,
    /// First unrecoverable error; returned from [`Runtime::run`].
    fatal: Option<anyhow::Error>,
}

impl<A> AppState<A>
where
    A: App + 'static,
{
    fn new(config: RuntimeConfig, gpu_init: GpuInit, app: A) -> Self {
        Self {
            config,
            gpu_init,
            app,
            window: None,
            exit_requested: false,
            fatal: None,
        }
    }

    fn request_exit(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(mut entry) = self.window.take() {
            entry.shutdown();
        }
        self.exit_requested = true;
        event_loop.exit();
    }

    fn create_window_entry(&mut self, event_loop: &ActiveEventLoop) -> Result<WindowEntry> {
        let config = &self.config;
        let settings = config.settings;

        let mut attrs = Window::default_attributes()
            .with_title(config.title.clone())
            .with_inner_size(config.initial_size)
            .with_transparent(settings.transparent)
            .with_decorations(settings.decorated)
            .with_visible(settings.visible);
        if settings.topmost {
            attrs = attrs.with_window_level(WindowLevel::AlwaysOnTop);
        }

        let window = event_loop
            .create_window(attrs)
            .context("failed to create window")?;

        if settings.click_through {
            if let Err(e) = window.set_cursor_hittest(false) {
                log::warn!("click-through not supported: {e}");
            }
        }

        let mut gpu_init = self.gpu_init.clone();
        if settings.transparent && gpu_init.alpha_mode.is_none() {
            gpu_init.alpha_mode = Some(wgpu::CompositeAlphaMode::PreMultiplied);
        }

        let size = window.inner_size();
        let clock = FrameClock::new().with_time_step(config.time_step);

        let mut entry = WindowEntryTryBuilder {
            input: InputState::default(),
            driver: FrameDriver::new(clock),
            scene: Scene::new(Viewport::new(size.width, size.height)),
            window,
            backend_builder: |w| {
                WgpuBackend::new(w, gpu_init).context("GPU initialization failed for window")
            },
        }
        .try_build()?;

        let app = &mut self.app;
        entry
            .with_mut(|f| {
                let mut ctx = SetupCtx { gpu: &mut *f.backend, scene: &mut *f.scene };
                app.setup(&mut ctx)
            })
            .context("application setup failed")?;

        Ok(entry)
    }
}

impl<A> ApplicationHandler for AppState<A>
where
    A: App + 'static,
{
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() || self.exit_requested {
            return;
        }

        match self.create_window_entry(event_loop) {
            Ok(entry) => {
                entry.with_window(|w| w.request_redraw());
                self.window = Some(entry);
            }
            Err(e) => {
                log::error!("failed to start: {e:#}");
                self.fatal = Some(e);
                self.request_exit(event_loop);
            }
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.exit_requested {
            event_loop.exit();
            return;
        }

        event_loop.set_control_flow(ControlFlow::Wait);

        // Continuous redraw: the frame driver runs once per redraw.
        if let Some(entry) = self.window.as_ref() {
            entry.with_window(|w| w.request_redraw());
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        if self.exit_requested {
            event_loop.exit();
            return;
        }

        // Split borrows to avoid `self` capture inside `ouroboros` closures.
        let (app, window) = (&mut self.app, &mut self.window);
        let Some(entry) = window.as_mut() else {
            return;
        };

        let mut control = AppControl::Continue;
        let mut fatal = None;

        entry.with_mut(|f| {
            if let Some(ev) = translate_window_event(f.input, &event) {
                f.input.apply_event(ev);
            }

            if app.on_window_event(&event) == AppControl::Exit {
                control = AppControl::Exit;
            }

            match &event {
                WindowEvent::CloseRequested => control = AppControl::Exit,

                WindowEvent::Resized(new_size) => {
                    f.backend.resize(*new_size);
                    f.scene.set_size(Viewport::new(new_size.width, new_size.height));
                    f.window.request_redraw();
                }

                WindowEvent::ScaleFactorChanged { .. } => {
                    let new_size = f.window.inner_size();
                    f.backend.resize(new_size);
                    f.scene.set_size(Viewport::new(new_size.width, new_size.height));
                    f.window.request_redraw();
                }

                WindowEvent::RedrawRequested => {
                    if let Err(err) = f.driver.tick(&mut *f.backend, &mut *f.scene, f.input) {
                        log::error!("render loop stopped: {err}");
                        fatal = Some(anyhow::Error::new(err).context("frame failed"));
                        control = AppControl::Exit;
                    }

                    if app.update(f.input, &mut *f.scene) == AppControl::Exit {
                        control = AppControl::Exit;
                    }

                    // Per-tick key edges are consumed once the app has seen them.
                    f.input.end_tick();
                }

                _ => {}
            }
        });

        if fatal.is_some() {
            self.fatal = fatal;
        }
        if control == AppControl::Exit {
            self.request_exit(event_loop);
        }
    }
}
