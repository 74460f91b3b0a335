//! Renderer crate for shadeloop, a live GLSL fragment shader sandbox.
//!
//! A full-viewport quad is drawn every frame through a user-editable fragment
//! program. Edits are picked up on request (F5, Ctrl+Enter, Ctrl+S) or by the
//! optional file watcher, compiled, and swapped in without interrupting the
//! render loop. The flow is:
//!
//! ```text
//!   shadeloop CLI
//!          │ RendererConfig
//!          ▼
//!   Renderer::run ──▶ winit event loop ──▶ RenderLoop::tick ──▶ GpuBackend::render
//!          ▲                   │
//!          │                   └─▶ Recompile ──▶ ProgramManager::compile
//!   ShaderWatcher ── proxy ────┘
//! ```
//!
//! Shader sources are WebGL2-style GLSL. They are wrapped into Vulkan GLSL,
//! compiled and validated with naga, checked against the fixed vertex stage,
//! and reflected to find which of the four sandbox uniforms (`uTime`,
//! `uResolution`, `uMouse`, `projection`) they read.

mod backend;
mod compile;
mod error;
mod geometry;
mod gpu;
mod program;
mod reflect;
mod render_loop;
mod runtime;
mod source;
mod types;
mod watch;
mod window;

use anyhow::Result;

pub use backend::{ClearColor, DrawCall, FrameUniforms, GpuBackend, CLEAR_COLOR};
pub use compile::{
    compile_stage, compile_stages, header_line_count, wrap_fragment, CompiledStages,
    DEFAULT_FRAGMENT_SHADER, VERTEX_SHADER_GLSL,
};
pub use error::{CompileError, ContextUnavailable, StageKind};
pub use geometry::{orthographic_projection, quad_vertices, Vertex, Viewport, QUAD_VERTEX_COUNT};
pub use gpu::{FrameError, ShaderProgram};
pub use program::{ActiveProgram, ProgramId, ProgramManager};
pub use reflect::{check_interface, resolve_bindings, UniformBinding, UniformBindings, UniformName};
pub use render_loop::{FrameScheduler, LoopState, RenderLoop, SandboxContext, TickReport};
pub use runtime::{
    time_source, BoxedTimeSource, FixedTimeSource, FrameClock, PointerTracker, SystemTimeSource,
    TimeSample, TimeSource,
};
pub use source::{ShaderFile, TextSource};
pub use types::{GpuPowerPreference, RendererConfig, WatchOptions};
pub use watch::ShaderWatcher;
pub use window::{is_recompile_shortcut, SandboxCommand};

/// Entry point that owns the sandbox configuration.
pub struct Renderer {
    config: RendererConfig,
}

impl Renderer {
    pub fn new(config: RendererConfig) -> Self {
        Self { config }
    }

    /// Opens the sandbox window and blocks until it is closed.
    ///
    /// Fails with [`ContextUnavailable`] when no GPU surface or device can be
    /// created.
    pub fn run(&mut self) -> Result<()> {
        window::run(self.config.clone())
    }
}
