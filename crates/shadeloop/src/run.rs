use anyhow::Result;
use loopconfig::{PowerSetting, SandboxConfig};
use renderer::{GpuPowerPreference, Renderer, RendererConfig, WatchOptions};
use tracing_subscriber::EnvFilter;

use crate::cli::RunArgs;
use crate::paths;

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

pub fn run(args: RunArgs) -> Result<()> {
    let config = paths::load_config(args.config.as_deref())?;
    let renderer_config = merge_config(&args, &config);
    tracing::debug!(?renderer_config, "resolved sandbox configuration");

    let mut renderer = Renderer::new(renderer_config);
    renderer.run()
}

/// Applies CLI overrides on top of the loaded config file.
pub fn merge_config(args: &RunArgs, config: &SandboxConfig) -> RendererConfig {
    let defaults = RendererConfig::default();

    let surface_size = args
        .size
        .unwrap_or((config.window.width, config.window.height));
    let title = args
        .title
        .clone()
        .unwrap_or_else(|| config.window.title.clone());
    let shader_path = args
        .shader
        .clone()
        .or_else(|| config.shader.path.clone())
        .unwrap_or(defaults.shader_path);

    let watch_enabled = args.watch || config.shader.watch || args.watch_interval.is_some();
    let watch = watch_enabled.then(|| WatchOptions {
        interval: args.watch_interval.unwrap_or(config.shader.watch_interval),
    });

    let gpu_power = args.power.unwrap_or(match config.gpu.power {
        PowerSetting::Low => GpuPowerPreference::Low,
        PowerSetting::High => GpuPowerPreference::High,
    });

    RendererConfig {
        surface_size,
        title,
        shader_path,
        watch,
        freeze_time: args.freeze_time,
        gpu_power,
        vsync: config.gpu.vsync && !args.no_vsync,
        dump_wrapped: args
            .dump_wrapped
            .clone()
            .or_else(|| config.shader.dump_wrapped.clone()),
    }
}
