use std::fmt;
use std::path::PathBuf;

use crate::backend::GpuBackend;
use crate::compile::{compile_stages, wrap_fragment};
use crate::error::CompileError;
use crate::reflect::UniformBindings;

/// Generation number of an installed program. Starts at 1 and increases with
/// every successful compile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProgramId(u64);

impl ProgramId {
    pub fn generation(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ProgramId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The program the render loop draws with.
pub struct ActiveProgram<P> {
    pub id: ProgramId,
    pub program: P,
    /// User source the program was built from, before wrapping.
    pub source: String,
    pub bindings: UniformBindings,
}

impl<P> fmt::Debug for ActiveProgram<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActiveProgram")
            .field("id", &self.id)
            .field("bindings", &self.bindings)
            .finish_non_exhaustive()
    }
}

/// Owns the current program and swaps it atomically on recompiles.
///
/// A failed compile or link leaves the current program in place. A successful
/// one installs the new program and drops the previous one, releasing its GPU
/// resources.
pub struct ProgramManager<P> {
    current: Option<ActiveProgram<P>>,
    next_generation: u64,
    dump_path: Option<PathBuf>,
}

impl<P> Default for ProgramManager<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> ProgramManager<P> {
    /// Creates a manager with no program installed.
    pub fn new() -> Self {
        Self {
            current: None,
            next_generation: 1,
            dump_path: None,
        }
    }

    /// Writes the wrapped fragment source to `path` before every compile.
    pub fn with_dump_path(mut self, path: Option<PathBuf>) -> Self {
        self.dump_path = path;
        self
    }

    /// Program the render loop draws with, if one ever compiled.
    pub fn current(&self) -> Option<&ActiveProgram<P>> {
        self.current.as_ref()
    }

    /// Generation of the current program.
    pub fn current_id(&self) -> Option<ProgramId> {
        self.current.as_ref().map(|active| active.id)
    }

    /// Compiles `source` and, on success, makes it the current program.
    pub fn compile<B>(&mut self, backend: &mut B, source: &str) -> Result<ProgramId, CompileError>
    where
        B: GpuBackend<Program = P>,
    {
        self.dump_wrapped(source);

        let stages = compile_stages(source)?;
        let program = backend
            .build_program(&stages)
            .map_err(|diagnostics| CompileError::Link { diagnostics })?;

        let id = ProgramId(self.next_generation);
        self.next_generation += 1;

        for uniform in stages.bindings.unresolved() {
            tracing::debug!(
                generation = id.generation(),
                %uniform,
                "uniform not referenced by program; pushes will be skipped"
            );
        }

        let previous = self.current.replace(ActiveProgram {
            id,
            program,
            source: source.to_string(),
            bindings: stages.bindings,
        });
        if let Some(previous) = previous {
            tracing::debug!(
                generation = previous.id.generation(),
                "released previous program"
            );
        }

        tracing::info!(generation = id.generation(), "shader program installed");
        Ok(id)
    }

    fn dump_wrapped(&self, source: &str) {
        let Some(path) = &self.dump_path else {
            return;
        };
        if let Err(err) = std::fs::write(path, wrap_fragment(source)) {
            tracing::warn!(path = %path.display(), error = %err, "failed to dump wrapped shader");
        } else {
            tracing::debug!(path = %path.display(), "wrote wrapped shader");
        }
    }
}

impl<P> fmt::Debug for ProgramManager<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgramManager")
            .field("current", &self.current)
            .field("next_generation", &self.next_generation)
            .field("dump_path", &self.dump_path)
            .finish()
    }
}
