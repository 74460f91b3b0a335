use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use renderer::GpuPowerPreference;

#[derive(Parser, Debug)]
#[command(
    name = "shadeloop",
    author,
    version,
    about = "Live GLSL fragment shader sandbox",
    arg_required_else_help = false
)]
pub struct Cli {
    #[command(flatten)]
    pub run: RunArgs,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Parser, Debug, Default)]
pub struct RunArgs {
    /// Fragment shader to edit; created with the built-in program when missing.
    #[arg(value_name = "SHADER")]
    pub shader: Option<PathBuf>,

    /// Configuration file to load instead of the one in the config directory.
    #[arg(long, value_name = "PATH", env = "SHADELOOP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Window size in physical pixels (e.g. `1280x720`).
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_surface_size)]
    pub size: Option<(u32, u32)>,

    /// Window title.
    #[arg(long, value_name = "TITLE")]
    pub title: Option<String>,

    /// Recompile automatically whenever the shader file changes on disk.
    #[arg(long)]
    pub watch: bool,

    /// How often the watcher polls the shader file (e.g. `250ms`, `1s`).
    #[arg(long, value_name = "DURATION", value_parser = loopconfig::parse_duration)]
    pub watch_interval: Option<Duration>,

    /// Render every frame at this timestamp instead of wall-clock time.
    #[arg(long, value_name = "SECONDS", value_parser = parse_freeze_time)]
    pub freeze_time: Option<f32>,

    /// GPU adapter preference: `low` or `high`.
    #[arg(long, value_name = "POWER", value_parser = parse_power)]
    pub power: Option<GpuPowerPreference>,

    /// Present without waiting for vertical sync.
    #[arg(long)]
    pub no_vsync: bool,

    /// Write the wrapped fragment source to this path before every compile.
    #[arg(long, value_name = "PATH")]
    pub dump_wrapped: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compile and link-check a fragment shader without opening a window.
    Check(CheckArgs),
    /// Print the built-in fragment shader.
    DefaultShader,
}

#[derive(Parser, Debug)]
pub struct CheckArgs {
    #[arg(value_name = "SHADER")]
    pub shader: PathBuf,

    /// Also print the wrapped source handed to the compiler.
    #[arg(long)]
    pub wrapped: bool,
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_surface_size(value: &str) -> Result<(u32, u32), String> {
    let trimmed = value.trim();
    let (width, height) = trimmed
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("invalid size '{trimmed}'; expected WIDTHxHEIGHT"))?;
    let width: u32 = width
        .trim()
        .parse()
        .map_err(|_| format!("invalid width in '{trimmed}'"))?;
    let height: u32 = height
        .trim()
        .parse()
        .map_err(|_| format!("invalid height in '{trimmed}'"))?;
    if width == 0 || height == 0 {
        return Err("size must be non-zero".to_string());
    }
    if width > loopconfig::MAX_WINDOW_EDGE || height > loopconfig::MAX_WINDOW_EDGE {
        return Err(format!(
            "size {width}x{height} exceeds {} pixels per edge",
            loopconfig::MAX_WINDOW_EDGE
        ));
    }
    Ok((width, height))
}

pub fn parse_power(value: &str) -> Result<GpuPowerPreference, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "low" | "low-power" | "integrated" => Ok(GpuPowerPreference::Low),
        "high" | "high-performance" | "discrete" => Ok(GpuPowerPreference::High),
        other => Err(format!("unknown power preference '{other}' (expected low or high)")),
    }
}

pub fn parse_freeze_time(value: &str) -> Result<f32, String> {
    let trimmed = value.trim();
    let seconds: f32 = trimmed
        .parse()
        .map_err(|_| format!("invalid timestamp '{trimmed}'"))?;
    if !seconds.is_finite() || seconds < 0.0 {
        return Err("timestamp must be a non-negative number of seconds".to_string());
    }
    Ok(seconds)
}
