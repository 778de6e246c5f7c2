//! Application configuration
//!
//! Everything here is fixed once the frame driver is constructed. The only
//! runtime-mutable knobs (frame limiter, pause) live on the driver itself.

use std::borrow::Cow;
use std::path::Path;
use std::time::Duration;

use crate::error::{AutomatonError, AutomatonResult};
use crate::simulation::boundary::BoundaryPolicy;
use crate::simulation::rule::LifeRule;
use crate::simulation::seed::{SeedDistribution, SeedPattern};

/// Grid shape, rule and initial distribution
#[derive(Debug, Clone)]
pub struct GridConfig {
    pub width: u32,
    pub height: u32,
    pub alive_probability: f64,
    pub pattern: SeedPattern,
    /// Fixed RNG seed; `None` seeds from OS entropy
    pub rng_seed: Option<u64>,
    pub boundary: BoundaryPolicy,
    pub rule: LifeRule,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            width: 1024,
            height: 1024,
            alive_probability: 0.3,
            pattern: SeedPattern::Random,
            rng_seed: None,
            boundary: BoundaryPolicy::Wrap,
            rule: LifeRule::CONWAY,
        }
    }
}

impl GridConfig {
    pub fn seed_distribution(&self) -> SeedDistribution {
        SeedDistribution {
            pattern: self.pattern,
            alive_probability: self.alive_probability,
            rng_seed: self.rng_seed,
        }
    }
}

/// Window and frame pacing
#[derive(Debug, Clone)]
pub struct FrameConfig {
    pub title: String,
    pub window_width: u32,
    pub window_height: u32,
    pub target_fps: f64,
    /// Initial state of the frame limiter
    pub limit_framerate: bool,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            title: "Cellular Automata".to_string(),
            window_width: 1024,
            window_height: 1024,
            target_fps: 30.0,
            limit_framerate: true,
        }
    }
}

impl FrameConfig {
    pub fn target_frame_time(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.target_fps)
    }
}

/// Colors the presentation stage maps cell state to (linear RGBA)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Palette {
    pub alive: [f32; 4],
    /// Blended over `background`; transparent by default
    pub dead: [f32; 4],
    pub background: [f32; 4],
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            alive: [1.0, 1.0, 1.0, 1.0],
            dead: [0.0, 0.0, 0.0, 0.0],
            background: [0.0, 0.0, 0.0, 1.0],
        }
    }
}

/// WGSL source text for one program
#[derive(Debug, Clone)]
pub struct ProgramSource {
    pub label: String,
    pub wgsl: Cow<'static, str>,
}

impl ProgramSource {
    /// Life-like transition kernel shipped with the crate
    pub fn builtin_kernel() -> Self {
        Self {
            label: "transition.wgsl".to_string(),
            wgsl: Cow::Borrowed(include_str!("shaders/transition.wgsl")),
        }
    }

    /// Full-surface cell presentation program shipped with the crate
    pub fn builtin_presentation() -> Self {
        Self {
            label: "present.wgsl".to_string(),
            wgsl: Cow::Borrowed(include_str!("shaders/present.wgsl")),
        }
    }

    pub fn from_wgsl(label: impl Into<String>, wgsl: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            wgsl: Cow::Owned(wgsl.into()),
        }
    }

    /// Load program text from disk
    pub fn from_file(path: impl AsRef<Path>) -> AutomatonResult<Self> {
        let path = path.as_ref();
        let wgsl = std::fs::read_to_string(path).map_err(|source| AutomatonError::ShaderLoad {
            path: path.to_path_buf(),
            source,
        })?;
        if wgsl.trim().is_empty() {
            return Err(AutomatonError::ShaderCompile {
                program: "external",
                message: format!("{} is empty", path.display()),
            });
        }
        Ok(Self::from_wgsl(path.display().to_string(), wgsl))
    }
}

/// The compute and render programs the core consumes
#[derive(Debug, Clone)]
pub struct ProgramSources {
    pub kernel: ProgramSource,
    pub presentation: ProgramSource,
}

impl Default for ProgramSources {
    fn default() -> Self {
        Self {
            kernel: ProgramSource::builtin_kernel(),
            presentation: ProgramSource::builtin_presentation(),
        }
    }
}

/// Complete configuration handed to the frame driver
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub grid: GridConfig,
    pub frame: FrameConfig,
    pub palette: Palette,
    pub programs: ProgramSources,
}

impl AppConfig {
    pub fn validate(&self) -> AutomatonResult<()> {
        let grid = &self.grid;
        if grid.width == 0 || grid.height == 0 {
            return Err(AutomatonError::config(format!(
                "grid must be non-empty, got {}x{}",
                grid.width, grid.height
            )));
        }
        if !(0.0..=1.0).contains(&grid.alive_probability) {
            return Err(AutomatonError::config(format!(
                "alive probability {} outside [0, 1]",
                grid.alive_probability
            )));
        }

        let frame = &self.frame;
        if frame.window_width == 0 || frame.window_height == 0 {
            return Err(AutomatonError::config("window must be non-empty"));
        }
        if !frame.target_fps.is_finite() || frame.target_fps <= 0.0 {
            return Err(AutomatonError::config(format!(
                "target fps must be positive, got {}",
                frame.target_fps
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!((config.grid.width, config.grid.height), (1024, 1024));
        assert_eq!(config.grid.alive_probability, 0.3);
        assert_eq!(config.grid.boundary, BoundaryPolicy::Wrap);
        assert!(config.frame.limit_framerate);
        assert_eq!(config.frame.target_frame_time(), Duration::from_secs_f64(1.0 / 30.0));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = AppConfig::default();
        config.grid.width = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.grid.alive_probability = 1.2;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.frame.target_fps = 0.0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.frame.target_fps = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_builtin_programs_have_entry_points() {
        let programs = ProgramSources::default();
        assert!(programs.kernel.wgsl.contains("@compute"));
        assert!(programs.presentation.wgsl.contains("fn vs_main"));
        assert!(programs.presentation.wgsl.contains("fn fs_main"));
    }

    #[test]
    fn test_missing_program_file() {
        let err = ProgramSource::from_file("/definitely/not/here.wgsl").unwrap_err();
        assert!(matches!(err, AutomatonError::ShaderLoad { .. }));
    }
}
