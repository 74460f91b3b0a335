use std::sync::Arc;

use anyhow::{anyhow, Result};
use winit::dpi::{PhysicalPosition, PhysicalSize};
use winit::event::{ElementState, Event, KeyEvent, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoopBuilder, EventLoopProxy};
use winit::keyboard::{Key, ModifiersState, NamedKey};
use winit::window::{Window, WindowBuilder};

use crate::compile::DEFAULT_FRAGMENT_SHADER;
use crate::geometry::Viewport;
use crate::gpu::{FrameError, GpuState, ShaderProgram};
use crate::program::ProgramManager;
use crate::render_loop::{RenderLoop, SandboxContext};
use crate::runtime::{time_source, FrameClock};
use crate::source::{ShaderFile, TextSource};
use crate::types::RendererConfig;
use crate::watch::ShaderWatcher;

/// Requests delivered to the event loop from other threads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SandboxCommand {
    Recompile,
}

/// F5, Ctrl+Enter and Ctrl+S all trigger a recompile.
pub fn is_recompile_shortcut(key: &Key, modifiers: ModifiersState) -> bool {
    match key {
        Key::Named(NamedKey::F5) => true,
        Key::Named(NamedKey::Enter) => modifiers.control_key(),
        Key::Character(value) => modifiers.control_key() && value.eq_ignore_ascii_case("s"),
        _ => false,
    }
}

/// Everything the event loop closure owns. `gpu` is declared before `window`
/// so the surface is dropped while its window still exists.
struct SandboxWindow {
    gpu: GpuState,
    window: Arc<Window>,
    ctx: SandboxContext<ShaderProgram>,
    render_loop: RenderLoop,
    source: ShaderFile,
    modifiers: ModifiersState,
    title: String,
}

impl SandboxWindow {
    fn new(window: Arc<Window>, config: &RendererConfig, source: ShaderFile) -> Result<Self> {
        let viewport = Viewport::new(config.surface_size.0, config.surface_size.1);
        let gpu = GpuState::new(window.as_ref(), &viewport, config.gpu_power, config.vsync)?;

        let ctx = SandboxContext::new(
            viewport,
            FrameClock::new(time_source(config.freeze_time)),
            ProgramManager::new().with_dump_path(config.dump_wrapped.clone()),
        );

        Ok(Self {
            gpu,
            window,
            ctx,
            render_loop: RenderLoop::new(),
            source,
            modifiers: ModifiersState::empty(),
            title: config.title.clone(),
        })
    }

    fn start(&mut self) {
        self.render_loop.start(&mut self.ctx, self.window.as_ref());
    }

    fn window(&self) -> &Window {
        self.window.as_ref()
    }

    /// Installs the built-in program, then the file's program when it differs.
    fn compile_initial(&mut self) {
        self.compile_text(DEFAULT_FRAGMENT_SHADER);
        match self.source.current_text() {
            Ok(text) if text == DEFAULT_FRAGMENT_SHADER => {}
            Ok(text) => self.compile_text(&text),
            Err(err) => {
                tracing::error!("{err:#}");
                self.show_status(Some("source unreadable"));
            }
        }
    }

    fn recompile(&mut self) {
        match self.source.current_text() {
            Ok(text) => self.compile_text(&text),
            Err(err) => {
                tracing::error!("{err:#}");
                self.show_status(Some("source unreadable"));
            }
        }
    }

    fn compile_text(&mut self, text: &str) {
        match self.ctx.programs.compile(&mut self.gpu, text) {
            Ok(_) => self.show_status(None),
            Err(err) => {
                tracing::error!(path = %self.source.path().display(), "{err}");
                let status = if err.is_link_error() {
                    "link failed"
                } else {
                    "compile failed"
                };
                self.show_status(Some(status));
            }
        }
    }

    fn show_status(&self, failure: Option<&str>) {
        let title = match failure {
            Some(failure) => format!("{} [{failure}]", self.title),
            None => self.title.clone(),
        };
        self.window().set_title(&title);
    }

    fn handle_cursor_moved(&mut self, position: PhysicalPosition<f64>) {
        self.ctx.pointer.record_pointer(position.x, position.y);
    }

    fn handle_key(&mut self, event: &KeyEvent) {
        if event.state != ElementState::Pressed || event.repeat {
            return;
        }
        if is_recompile_shortcut(&event.logical_key, self.modifiers) {
            tracing::debug!("recompile requested from keyboard");
            self.recompile();
        }
    }

    /// Returns false when the frame error is fatal.
    fn render_frame(&mut self) -> bool {
        let result = self
            .render_loop
            .tick(&mut self.gpu, &mut self.ctx, self.window.as_ref());
        match result {
            Ok(_) => true,
            Err(FrameError::Surface(err)) => match err {
                wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated => {
                    self.gpu.reconfigure();
                    true
                }
                wgpu::SurfaceError::OutOfMemory => {
                    tracing::error!("surface out of memory; closing sandbox");
                    false
                }
                wgpu::SurfaceError::Timeout => {
                    tracing::warn!("surface timeout; retrying next frame");
                    true
                }
                other => {
                    tracing::warn!("surface error: {other:?}; retrying next frame");
                    true
                }
            },
        }
    }
}

/// Opens the sandbox window and runs the event loop until it is closed.
pub(crate) fn run(config: RendererConfig) -> Result<()> {
    let source = ShaderFile::open_or_create(&config.shader_path)?;

    let event_loop = EventLoopBuilder::<SandboxCommand>::with_user_event()
        .build()
        .map_err(|err| anyhow!("failed to create event loop: {err}"))?;
    let proxy = event_loop.create_proxy();

    let window = WindowBuilder::new()
        .with_title(config.title.as_str())
        .with_inner_size(PhysicalSize::new(config.surface_size.0, config.surface_size.1))
        .with_resizable(false)
        .build(&event_loop)
        .map_err(|err| anyhow!("failed to create sandbox window: {err}"))?;

    let mut state = SandboxWindow::new(Arc::new(window), &config, source.clone())?;
    state.compile_initial();

    let mut watcher = match config.watch {
        Some(options) => Some(spawn_watcher(source, options.interval, proxy.clone())?),
        None => None,
    };

    state.start();
    tracing::info!(
        path = %config.shader_path.display(),
        width = config.surface_size.0,
        height = config.surface_size.1,
        "sandbox running; press F5 or Ctrl+S to recompile"
    );

    let run_result = event_loop.run(move |event, elwt| {
        elwt.set_control_flow(ControlFlow::Wait);
        match event {
            Event::UserEvent(SandboxCommand::Recompile) => {
                tracing::debug!("recompile requested by watcher");
                state.recompile();
            }
            Event::WindowEvent { window_id, event } if window_id == state.window().id() => {
                match event {
                    WindowEvent::CloseRequested | WindowEvent::Destroyed => elwt.exit(),
                    WindowEvent::ModifiersChanged(modifiers) => {
                        state.modifiers = modifiers.state();
                    }
                    WindowEvent::KeyboardInput { event, .. } => state.handle_key(&event),
                    WindowEvent::CursorMoved { position, .. } => {
                        state.handle_cursor_moved(position);
                    }
                    WindowEvent::Resized(new_size) => state.gpu.resize(new_size),
                    WindowEvent::ScaleFactorChanged {
                        mut inner_size_writer,
                        ..
                    } => {
                        let _ = inner_size_writer.request_inner_size(state.gpu.size());
                    }
                    WindowEvent::RedrawRequested => {
                        if !state.render_frame() {
                            elwt.exit();
                        }
                    }
                    _ => {}
                }
            }
            Event::LoopExiting => {
                if let Some(watcher) = watcher.take() {
                    watcher.stop();
                }
            }
            _ => {}
        }
    });

    run_result.map_err(|err| anyhow!("sandbox event loop error: {err}"))
}

fn spawn_watcher(
    source: ShaderFile,
    interval: std::time::Duration,
    proxy: EventLoopProxy<SandboxCommand>,
) -> Result<ShaderWatcher> {
    ShaderWatcher::spawn(source, interval, move || {
        proxy.send_event(SandboxCommand::Recompile).is_ok()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use winit::keyboard::SmolStr;

    #[test]
    fn recompile_shortcuts() {
        let none = ModifiersState::empty();
        let ctrl = ModifiersState::CONTROL;

        assert!(is_recompile_shortcut(&Key::Named(NamedKey::F5), none));
        assert!(is_recompile_shortcut(&Key::Named(NamedKey::Enter), ctrl));
        assert!(!is_recompile_shortcut(&Key::Named(NamedKey::Enter), none));
        assert!(is_recompile_shortcut(&Key::Character(SmolStr::new("s")), ctrl));
        assert!(is_recompile_shortcut(&Key::Character(SmolStr::new("S")), ctrl));
        assert!(!is_recompile_shortcut(&Key::Character(SmolStr::new("s")), none));
        assert!(!is_recompile_shortcut(&Key::Named(NamedKey::Escape), ctrl));
    }
}
