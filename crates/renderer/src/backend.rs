//! Seam between the render loop and the GPU.
//!
//! [`GpuBackend`] is everything the program manager and the render loop need
//! from a device: turn compiled stages into a drawable program, and clear plus
//! optionally draw one frame. `GpuState` implements it on top of wgpu; tests
//! use a recording fake.

use std::fmt;

use crate::compile::CompiledStages;
use crate::reflect::UniformBindings;

/// Opaque black, the color every frame is cleared to.
pub const CLEAR_COLOR: ClearColor = ClearColor {
    r: 0.0,
    g: 0.0,
    b: 0.0,
    a: 1.0,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClearColor {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    pub a: f64,
}

/// Values pushed to the sandbox uniforms for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameUniforms {
    pub time: f32,
    /// Pointer position in pixels, bottom-left origin.
    pub mouse: [f32; 2],
    pub resolution: [f32; 2],
    /// Column-major projection matrix.
    pub projection: [[f32; 4]; 4],
}

/// A draw of the current program over the quad.
pub struct DrawCall<'a, P> {
    pub program: &'a P,
    /// Only these uniforms are written; the rest are skipped.
    pub bindings: &'a UniformBindings,
    pub uniforms: FrameUniforms,
}

impl<P> fmt::Debug for DrawCall<'_, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DrawCall")
            .field("bindings", self.bindings)
            .field("uniforms", &self.uniforms)
            .finish_non_exhaustive()
    }
}

pub trait GpuBackend {
    /// Linked program resources. Dropping one releases its GPU objects.
    type Program;
    /// Per-frame failure, for example a lost surface.
    type FrameError: fmt::Debug + fmt::Display;

    /// Builds a drawable program from validated stages. The error string holds
    /// the device's link diagnostics.
    fn build_program(&mut self, stages: &CompiledStages) -> Result<Self::Program, String>;

    /// Clears the target and, when a draw is given, renders the quad with it.
    fn render(
        &mut self,
        clear: ClearColor,
        draw: Option<DrawCall<'_, Self::Program>>,
    ) -> Result<(), Self::FrameError>;
}

#[cfg(test)]
pub(crate) mod testing {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;
    use crate::reflect::UniformName;

    /// One frame as observed by [`FakeBackend`].
    #[derive(Debug, Clone, PartialEq)]
    pub(crate) struct RecordedFrame {
        pub clear: ClearColor,
        /// Program label and the uniform values actually written.
        pub draw: Option<(String, Vec<(UniformName, Vec<f32>)>)>,
    }

    pub(crate) struct FakeProgram {
        pub label: String,
        live: Rc<Cell<usize>>,
    }

    impl Drop for FakeProgram {
        fn drop(&mut self) {
            self.live.set(self.live.get() - 1);
        }
    }

    #[derive(Default)]
    pub(crate) struct FakeBackend {
        pub frames: Vec<RecordedFrame>,
        pub fail_next_link: Option<String>,
        pub fail_next_frame: bool,
        pub built: usize,
        pub labels: Vec<String>,
        live: Rc<Cell<usize>>,
    }

    impl FakeBackend {
        /// Programs currently alive (built and not yet dropped).
        pub fn live_programs(&self) -> usize {
            self.live.get()
        }

        pub fn last_frame(&self) -> Option<&RecordedFrame> {
            self.frames.last()
        }
    }

    fn pushed_values(uniforms: &FrameUniforms, name: UniformName) -> Vec<f32> {
        match name {
            UniformName::Time => vec![uniforms.time],
            UniformName::Mouse => uniforms.mouse.to_vec(),
            UniformName::Resolution => uniforms.resolution.to_vec(),
            UniformName::Projection => uniforms.projection.iter().flatten().copied().collect(),
        }
    }

    impl GpuBackend for FakeBackend {
        type Program = FakeProgram;
        type FrameError = String;

        fn build_program(&mut self, _stages: &CompiledStages) -> Result<FakeProgram, String> {
            if let Some(diagnostics) = self.fail_next_link.take() {
                return Err(diagnostics);
            }
            self.built += 1;
            self.live.set(self.live.get() + 1);
            let label = format!("program-{}", self.built);
            self.labels.push(label.clone());
            Ok(FakeProgram {
                label,
                live: Rc::clone(&self.live),
            })
        }

        fn render(
            &mut self,
            clear: ClearColor,
            draw: Option<DrawCall<'_, FakeProgram>>,
        ) -> Result<(), String> {
            let draw = draw.map(|call| {
                let pushed = call
                    .bindings
                    .resolved()
                    .map(|(name, _)| (name, pushed_values(&call.uniforms, name)))
                    .collect();
                (call.program.label.clone(), pushed)
            });
            self.frames.push(RecordedFrame { clear, draw });
            if std::mem::take(&mut self.fail_next_frame) {
                return Err("surface lost".to_string());
            }
            Ok(())
        }
    }
}
