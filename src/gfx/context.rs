//! GPU execution context
//!
//! Owns the instance, adapter, device and queue the simulation runs on.
//! Validation errors raised while building programs are caught with error
//! scopes and surface as [`AutomatonError::ShaderCompile`]. Anything raised
//! later (rejected dispatches, device loss) is parked in an [`ErrorSink`] and
//! picked up by the next completion wait.

use std::sync::{Arc, Mutex};

use winit::window::Window;

use crate::config::ProgramSource;
use crate::error::{AutomatonError, AutomatonResult};

#[derive(Debug)]
enum CapturedError {
    Validation(String),
    Lost(String),
}

/// First runtime error reported by the device, kept until someone takes it
#[derive(Clone, Default)]
pub struct ErrorSink {
    slot: Arc<Mutex<Option<CapturedError>>>,
}

impl ErrorSink {
    fn record(&self, error: CapturedError) {
        let mut slot = self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if slot.is_none() {
            log::error!("GPU reported {:?}", error);
            *slot = Some(error);
        }
    }

    /// Take the pending error, if any
    pub fn take(&self) -> Option<AutomatonError> {
        let mut slot = self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        slot.take().map(|error| match error {
            CapturedError::Validation(message) => AutomatonError::Dispatch(message),
            CapturedError::Lost(message) => AutomatonError::DeviceLost(message),
        })
    }
}

/// Device, queue and the adapter they came from
pub struct GpuContext {
    _instance: wgpu::Instance,
    adapter: wgpu::Adapter,
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    errors: ErrorSink,
}

impl GpuContext {
    /// Context with no presentation surface, for compute-only runs
    pub async fn headless() -> AutomatonResult<Self> {
        let instance = Self::create_instance();
        Self::open(instance, None).await
    }

    /// Context plus a surface for `window`
    pub async fn with_window(
        window: Arc<Window>,
    ) -> AutomatonResult<(Self, wgpu::Surface<'static>)> {
        let instance = Self::create_instance();
        let surface = instance.create_surface(window)?;
        let context = Self::open(instance, Some(&surface)).await?;
        Ok((context, surface))
    }

    fn create_instance() -> wgpu::Instance {
        wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        })
    }

    async fn open(
        instance: wgpu::Instance,
        compatible_surface: Option<&wgpu::Surface<'static>>,
    ) -> AutomatonResult<Self> {
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface,
                force_fallback_adapter: false,
            })
            .await?;

        let info = adapter.get_info();
        log::info!("GPU: {} | backend: {:?}", info.name, info.backend);

        let downlevel = adapter.get_downlevel_capabilities();
        if !downlevel
            .flags
            .contains(wgpu::DownlevelFlags::COMPUTE_SHADERS)
        {
            return Err(AutomatonError::Unsupported(format!(
                "{} does not support compute shaders",
                info.name
            )));
        }

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("Automaton Device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::downlevel_defaults()
                    .using_resolution(adapter.limits()),
                memory_hints: wgpu::MemoryHints::default(),
                trace: wgpu::Trace::Off,
            })
            .await?;

        let errors = ErrorSink::default();
        let sink = errors.clone();
        device.on_uncaptured_error(Box::new(move |error: wgpu::Error| {
            sink.record(CapturedError::Validation(error.to_string()));
        }));
        let sink = errors.clone();
        device.set_device_lost_callback(move |reason, message| {
            if !matches!(reason, wgpu::DeviceLostReason::Destroyed) {
                sink.record(CapturedError::Lost(format!("{reason:?}: {message}")));
            }
        });

        Ok(Self {
            _instance: instance,
            adapter,
            device: Arc::new(device),
            queue: Arc::new(queue),
            errors,
        })
    }

    pub fn adapter(&self) -> &wgpu::Adapter {
        &self.adapter
    }

    pub fn device(&self) -> &Arc<wgpu::Device> {
        &self.device
    }

    pub fn queue(&self) -> &Arc<wgpu::Queue> {
        &self.queue
    }

    pub fn errors(&self) -> &ErrorSink {
        &self.errors
    }

    /// Run `build` inside a validation scope and fail if anything was raised
    pub fn validated<T>(
        &self,
        program: &'static str,
        build: impl FnOnce(&wgpu::Device) -> T,
    ) -> AutomatonResult<T> {
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let value = build(&self.device);
        match pollster::block_on(self.device.pop_error_scope()) {
            Some(error) => Err(AutomatonError::ShaderCompile {
                program,
                message: error.to_string(),
            }),
            None => Ok(value),
        }
    }

    /// Compile WGSL into a module, reporting compile errors instead of panicking
    pub fn compile_program(
        &self,
        program: &'static str,
        source: &ProgramSource,
    ) -> AutomatonResult<wgpu::ShaderModule> {
        let module = self.validated(program, |device| {
            device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(&source.label),
                source: wgpu::ShaderSource::Wgsl(source.wgsl.clone()),
            })
        })?;
        log::debug!("compiled {} program from {}", program, source.label);
        Ok(module)
    }
}
