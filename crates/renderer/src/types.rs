use std::path::PathBuf;
use std::time::Duration;

/// Adapter power preference forwarded to wgpu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GpuPowerPreference {
    #[default]
    Low,
    High,
}

impl std::fmt::Display for GpuPowerPreference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GpuPowerPreference::Low => f.write_str("low"),
            GpuPowerPreference::High => f.write_str("high"),
        }
    }
}

/// Polling configuration for the shader file watcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchOptions {
    pub interval: Duration,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(250),
        }
    }
}

/// Immutable configuration passed to the renderer at start-up.
///
/// Mirrors the merged config file and CLI flags.
#[derive(Debug, Clone, PartialEq)]
pub struct RendererConfig {
    /// Window size in physical pixels. Fixed for the lifetime of the window.
    pub surface_size: (u32, u32),
    pub title: String,
    /// Fragment shader file edited by the user. Created with the built-in
    /// program when missing.
    pub shader_path: PathBuf,
    /// Recompile automatically when the shader file changes on disk.
    pub watch: Option<WatchOptions>,
    /// Evaluate every frame at this timestamp instead of wall-clock time.
    pub freeze_time: Option<f32>,
    pub gpu_power: GpuPowerPreference,
    pub vsync: bool,
    /// Write the wrapped fragment source here before each compile.
    pub dump_wrapped: Option<PathBuf>,
}

impl Default for RendererConfig {
    /// Provides an 800x600 window editing `shader.frag` in the working directory.
    fn default() -> Self {
        Self {
            surface_size: (800, 600),
            title: "shadeloop".to_string(),
            shader_path: PathBuf::from("shader.frag"),
            watch: None,
            freeze_time: None,
            gpu_power: GpuPowerPreference::default(),
            vsync: true,
            dump_wrapped: None,
        }
    }
}
