//! # Error Types
//!
//! Every failure the automaton can report. There is no recoverable class:
//! initialisation errors abort startup, runtime errors stop the frame loop.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for automaton operations
#[derive(Error, Debug)]
pub enum AutomatonError {
    /// Configuration rejected before any resource was created
    #[error("Configuration error: {0}")]
    Config(String),

    /// Program source could not be read from disk
    #[error("Failed to read shader source {path}: {source}")]
    ShaderLoad {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Program failed to compile or link against the backend
    #[error("Failed to build {program} program: {message}")]
    ShaderCompile {
        program: &'static str,
        message: String,
    },

    /// No adapter matched the request
    #[error("GPU adapter error: {0}")]
    Adapter(#[from] wgpu::RequestAdapterError),

    /// Adapter lacks a capability the simulation needs
    #[error("Unsupported adapter: {0}")]
    Unsupported(String),

    /// Adapter refused to open a device
    #[error("GPU device error: {0}")]
    Device(#[from] wgpu::RequestDeviceError),

    /// Window surface could not be created
    #[error("Surface creation error: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),

    /// Surface texture could not be acquired for presentation
    #[error("Presentation error: {0}")]
    Present(#[from] wgpu::SurfaceError),

    /// Grid storage could not be allocated
    #[error("Allocation error: {0}")]
    Allocation(String),

    /// Backend rejected or failed a dispatch
    #[error("Dispatch error: {0}")]
    Dispatch(String),

    /// Execution context disappeared underneath the simulation
    #[error("GPU device lost: {0}")]
    DeviceLost(String),

    /// Operation not allowed in the scheduler's current state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Event loop failure
    #[error("Event loop error: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),

    /// Window creation failure
    #[error("Window error: {0}")]
    Window(#[from] winit::error::OsError),
}

/// Result type for automaton operations
pub type AutomatonResult<T> = Result<T, AutomatonError>;

impl AutomatonError {
    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a dispatch error
    pub fn dispatch(msg: impl Into<String>) -> Self {
        Self::Dispatch(msg.into())
    }

    /// Create an allocation error
    pub fn allocation(msg: impl Into<String>) -> Self {
        Self::Allocation(msg.into())
    }

    /// Create an invalid state error
    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }
}
