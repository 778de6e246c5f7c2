//! Frame driver
//!
//! Runs the winit event loop. Each redraw advances the simulation by one
//! generation (unless paused) and presents the committed grid.
//!
//! Keys: `Escape` exits, `F` toggles the frame limiter, `R` reseeds the grid,
//! `Space` pauses and resumes the simulation.

use std::sync::Arc;
use std::time::Instant;

use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{ElementState, KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

use crate::config::AppConfig;
use crate::error::{AutomatonError, AutomatonResult};
use crate::gfx::{GpuContext, Presenter};
use crate::performance::{FpsCounter, FrameLimiter};
use crate::simulation::{ComputeBackend, GenerationScheduler, GpuBackend, SeedDistribution};

const DIAGNOSTIC_INTERVAL: u64 = 100;

/// What one redraw does
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameAction {
    /// Advance one generation, then present it
    Step,
    /// Present `current()` as it is
    PresentOnly,
}

impl FrameAction {
    /// Redraws outside the limiter's schedule (expose, resize) still present
    fn select(limiter_ready: bool, paused: bool) -> Self {
        if limiter_ready && !paused {
            FrameAction::Step
        } else {
            FrameAction::PresentOnly
        }
    }
}

/// Owns the configuration and, once the window exists, the GPU state
pub struct App {
    config: AppConfig,
    state: Option<RunState>,
    limiter: FrameLimiter,
    fps: FpsCounter,
    paused: bool,
    error: Option<AutomatonError>,
}

/// Everything that needs a live window and device
struct RunState {
    presenter: Presenter,
    scheduler: GenerationScheduler<GpuBackend>,
    surface: wgpu::Surface<'static>,
    surface_config: wgpu::SurfaceConfiguration,
    context: GpuContext,
    window: Arc<Window>,
}

impl App {
    pub fn new(config: AppConfig) -> AutomatonResult<Self> {
        config.validate()?;
        let limiter = FrameLimiter::new(
            config.frame.target_frame_time(),
            config.frame.limit_framerate,
        );
        Ok(Self {
            config,
            state: None,
            limiter,
            fps: FpsCounter::new(Instant::now()),
            paused: false,
            error: None,
        })
    }

    /// Run until the window closes or a fatal error stops the loop
    pub fn run(mut self) -> AutomatonResult<()> {
        let event_loop = EventLoop::new()?;
        event_loop.set_control_flow(ControlFlow::Poll);
        event_loop.run_app(&mut self)?;

        self.shutdown();
        match self.error.take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: AutomatonError) {
        log::error!("fatal: {error}");
        if self.error.is_none() {
            self.error = Some(error);
        }
        event_loop.exit();
    }

    fn shutdown(&mut self) {
        if let Some(mut state) = self.state.take() {
            if let Err(error) = state.scheduler.shutdown() {
                log::error!("shutdown: {error}");
                if self.error.is_none() {
                    self.error = Some(error);
                }
            }
            log::info!(
                "stopped after {} generations",
                state.scheduler.generation()
            );
        }
    }

    fn create_state(&self, event_loop: &ActiveEventLoop) -> AutomatonResult<RunState> {
        let frame = &self.config.frame;
        let window = Arc::new(
            event_loop.create_window(
                Window::default_attributes()
                    .with_title(frame.title.clone())
                    .with_inner_size(PhysicalSize::new(frame.window_width, frame.window_height)),
            )?,
        );

        let (context, surface) = pollster::block_on(GpuContext::with_window(window.clone()))?;

        let capabilities = surface.get_capabilities(context.adapter());
        let format = capabilities
            .formats
            .iter()
            .copied()
            .find(|f| !f.is_srgb())
            .or_else(|| capabilities.formats.first().copied())
            .ok_or_else(|| AutomatonError::Unsupported("surface reports no formats".into()))?;
        let size = window.inner_size();
        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoNoVsync,
            alpha_mode: capabilities
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(context.device(), &surface_config);

        let grid = &self.config.grid;
        let backend = GpuBackend::new(&context, &self.config.programs.kernel, grid.rule, grid.boundary)?;
        let mut scheduler = GenerationScheduler::new(backend, grid.width, grid.height)?;
        scheduler.seed(&grid.seed_distribution().generate(grid.width, grid.height)?)?;
        let (width, height) = scheduler.dimensions();
        log::info!("{} backend driving {}x{} grid", scheduler.backend().name(), width, height);

        let presenter = Presenter::new(
            &context,
            &self.config.programs.presentation,
            format,
            scheduler.committed()?,
            &self.config.palette,
        )?;

        Ok(RunState {
            presenter,
            scheduler,
            surface,
            surface_config,
            context,
            window,
        })
    }

    fn handle_key(&mut self, event_loop: &ActiveEventLoop, key: KeyCode) -> AutomatonResult<()> {
        match key {
            KeyCode::Escape => event_loop.exit(),
            KeyCode::KeyF => {
                let limited = self.limiter.toggle();
                log::info!("frame limiter {}", if limited { "on" } else { "off" });
            }
            KeyCode::Space => {
                self.paused = !self.paused;
                log::info!("simulation {}", if self.paused { "paused" } else { "resumed" });
            }
            KeyCode::KeyR => {
                if let Some(state) = self.state.as_mut() {
                    let grid = &self.config.grid;
                    // Fresh entropy so repeated reseeds differ
                    let distribution = SeedDistribution {
                        rng_seed: None,
                        ..grid.seed_distribution()
                    };
                    state
                        .scheduler
                        .seed(&distribution.generate(grid.width, grid.height)?)?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn redraw(&mut self) -> AutomatonResult<()> {
        let Some(state) = self.state.as_mut() else {
            return Ok(());
        };

        let now = Instant::now();
        let ready = self.limiter.ready(now);
        if ready {
            self.limiter.mark(now);
            if let Some(frames) = self.fps.tick(now) {
                log::info!(
                    "FPS: {} (limiter {})",
                    frames,
                    if self.limiter.is_limited() { "on" } else { "off" }
                );
            }
        }

        if FrameAction::select(ready, self.paused) == FrameAction::Step {
            let generation = state.scheduler.step()?;
            if generation % DIAGNOSTIC_INTERVAL == 0 {
                log::debug!(
                    "generation {} on grid {}",
                    generation,
                    state.scheduler.committed()?.front_index()
                );
            }
        }

        state.present()
    }
}

impl RunState {
    fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.surface_config.width = width;
        self.surface_config.height = height;
        self.surface.configure(self.context.device(), &self.surface_config);
    }

    fn present(&mut self) -> AutomatonResult<()> {
        let frame = match self.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::debug!("surface lost or outdated, reconfiguring");
                self.surface.configure(self.context.device(), &self.surface_config);
                return Ok(());
            }
            Err(wgpu::SurfaceError::Timeout) => {
                log::warn!("surface acquire timed out, skipping frame");
                return Ok(());
            }
            Err(error) => return Err(error.into()),
        };

        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder =
            self.context
                .device()
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("Presentation Encoder"),
                });

        self.presenter
            .encode(&mut encoder, &view, self.scheduler.committed()?);

        self.context.queue().submit(std::iter::once(encoder.finish()));
        self.window.pre_present_notify();
        frame.present();
        Ok(())
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }

        match self.create_state(event_loop) {
            Ok(state) => {
                self.fps = FpsCounter::new(Instant::now());
                self.state = Some(state);
            }
            Err(error) => self.fail(event_loop, error),
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(key_code),
                        state: ElementState::Pressed,
                        repeat: false,
                        ..
                    },
                ..
            } => {
                if let Err(error) = self.handle_key(event_loop, key_code) {
                    self.fail(event_loop, error);
                }
            }
            WindowEvent::Resized(PhysicalSize { width, height }) => {
                if let Some(state) = self.state.as_mut() {
                    state.resize(width, height);
                }
            }
            WindowEvent::RedrawRequested => {
                if let Err(error) = self.redraw() {
                    self.fail(event_loop, error);
                }
            }
            _ => (),
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        let Some(state) = self.state.as_ref() else {
            return;
        };

        match self.limiter.next_deadline() {
            Some(deadline) if deadline > Instant::now() => {
                event_loop.set_control_flow(ControlFlow::WaitUntil(deadline));
            }
            _ => {
                event_loop.set_control_flow(ControlFlow::Poll);
                state.window.request_redraw();
            }
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_action() {
        assert_eq!(FrameAction::select(true, false), FrameAction::Step);
        // Early redraws and paused frames still present the current grid
        assert_eq!(FrameAction::select(false, false), FrameAction::PresentOnly);
        assert_eq!(FrameAction::select(true, true), FrameAction::PresentOnly);
        assert_eq!(FrameAction::select(false, true), FrameAction::PresentOnly);
    }
}
