use std::fmt;

/// Programmable stage a diagnostic belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StageKind {
    Vertex,
    Fragment,
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageKind::Vertex => f.write_str("vertex"),
            StageKind::Fragment => f.write_str("fragment"),
        }
    }
}

/// Failure to turn shader source into a running program.
///
/// Neither variant ever replaces the program that is currently drawing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompileError {
    #[error("{stage} stage failed to compile:\n{diagnostics}")]
    Stage {
        stage: StageKind,
        diagnostics: String,
    },
    #[error("program failed to link:\n{diagnostics}")]
    Link { diagnostics: String },
}

impl CompileError {
    /// Compiler output without the summary line.
    pub fn diagnostics(&self) -> &str {
        match self {
            CompileError::Stage { diagnostics, .. } | CompileError::Link { diagnostics } => {
                diagnostics
            }
        }
    }

    pub fn is_link_error(&self) -> bool {
        matches!(self, CompileError::Link { .. })
    }
}

/// The GPU context could not be created. There is no rendering path without one.
#[derive(Debug, thiserror::Error)]
#[error("GPU context unavailable: {reason}")]
pub struct ContextUnavailable {
    reason: String,
}

impl ContextUnavailable {
    pub(crate) fn new(reason: anyhow::Error) -> Self {
        Self {
            reason: format!("{reason:#}"),
        }
    }
}
