use std::time::{Duration, Instant};

use crate::backend::{DrawCall, FrameUniforms, GpuBackend, CLEAR_COLOR};
use crate::geometry::Viewport;
use crate::program::{ProgramId, ProgramManager};
use crate::runtime::{FrameClock, PointerTracker};

const STATS_INTERVAL: Duration = Duration::from_secs(1);

/// All mutable sandbox state, owned by the event-loop thread.
pub struct SandboxContext<P> {
    pub programs: ProgramManager<P>,
    pub clock: FrameClock,
    pub pointer: PointerTracker,
    pub viewport: Viewport,
}

impl<P> SandboxContext<P> {
    /// The pointer starts at the origin and flips around the viewport height.
    pub fn new(viewport: Viewport, clock: FrameClock, programs: ProgramManager<P>) -> Self {
        Self {
            programs,
            clock,
            pointer: PointerTracker::new(viewport.height()),
            viewport,
        }
    }

    fn frame_uniforms(&self, time: f32) -> FrameUniforms {
        FrameUniforms {
            time,
            mouse: self.pointer.position(),
            resolution: self.viewport.resolution(),
            projection: self.viewport.projection().to_cols_array_2d(),
        }
    }
}

/// Re-arms the next tick. The window implementation requests a redraw.
pub trait FrameScheduler {
    fn schedule_next_frame(&self);
}

impl FrameScheduler for winit::window::Window {
    fn schedule_next_frame(&self) {
        self.request_redraw();
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Running,
}

/// What one tick did.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TickReport {
    pub time: f32,
    /// Program drawn this frame, `None` when the frame was only cleared.
    pub program: Option<ProgramId>,
}

/// Drives one frame per tick: sample time, clear, draw the current program
/// with its resolved uniforms, and schedule the next tick.
#[derive(Debug)]
pub struct RenderLoop {
    state: LoopState,
    frames: u64,
    stats_started: Instant,
    stats_frames: u32,
}

impl Default for RenderLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderLoop {
    /// Creates an idle loop.
    pub fn new() -> Self {
        Self {
            state: LoopState::Idle,
            frames: 0,
            stats_started: Instant::now(),
            stats_frames: 0,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Frames rendered successfully since start.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Moves Idle to Running and schedules the first tick. Returns false when
    /// the loop was already running.
    pub fn start<P>(&mut self, ctx: &mut SandboxContext<P>, scheduler: &dyn FrameScheduler) -> bool {
        if self.state == LoopState::Running {
            return false;
        }
        self.state = LoopState::Running;
        ctx.clock.restart();
        self.stats_started = Instant::now();
        tracing::debug!("render loop started");
        scheduler.schedule_next_frame();
        true
    }

    /// Renders one frame. The next tick is scheduled even when the backend
    /// reports a frame error.
    pub fn tick<B>(
        &mut self,
        backend: &mut B,
        ctx: &mut SandboxContext<B::Program>,
        scheduler: &dyn FrameScheduler,
    ) -> Result<Option<TickReport>, B::FrameError>
    where
        B: GpuBackend,
    {
        if self.state != LoopState::Running {
            tracing::trace!("tick ignored while idle");
            return Ok(None);
        }

        let time = ctx.clock.elapsed_seconds();
        let uniforms = ctx.frame_uniforms(time);
        let active = ctx.programs.current();
        let draw = active.map(|active| DrawCall {
            program: &active.program,
            bindings: &active.bindings,
            uniforms,
        });
        let program = active.map(|active| active.id);

        let result = backend.render(CLEAR_COLOR, draw);
        scheduler.schedule_next_frame();
        result?;

        self.frames += 1;
        self.record_stats(time, program);
        Ok(Some(TickReport { time, program }))
    }

    fn record_stats(&mut self, time: f32, program: Option<ProgramId>) {
        self.stats_frames += 1;
        let elapsed = self.stats_started.elapsed();
        if elapsed < STATS_INTERVAL {
            return;
        }
        let fps = self.stats_frames as f32 / elapsed.as_secs_f32();
        tracing::debug!(
            fps = format_args!("{fps:.1}"),
            frames = self.frames,
            time = format_args!("{time:.2}"),
            generation = program.map(ProgramId::generation),
            "render stats"
        );
        self.stats_started = Instant::now();
        self.stats_frames = 0;
    }
}
