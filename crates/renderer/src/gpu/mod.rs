//! wgpu backend for the sandbox.
//!
//! - `context` owns the instance, surface and device, and reconfigures the
//!   swapchain when the window asks for it.
//! - `pipeline` holds the shared layouts and builds one render pipeline per
//!   linked program inside a validation error scope.
//! - `uniforms` mirrors the std140 uniform block and writes only the members
//!   the current program reads.
//! - `state` glues them together as the `GpuBackend` used by `window`.

mod context;
mod pipeline;
mod state;
mod uniforms;

pub use pipeline::ShaderProgram;
pub use state::FrameError;
pub(crate) use state::GpuState;
