use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::{Context, Result};

use crate::compile::DEFAULT_FRAGMENT_SHADER;

/// Where recompiles read their fragment source from.
pub trait TextSource {
    fn current_text(&self) -> Result<String>;
}

/// Fragment shader stored on disk and edited in the user's editor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderFile {
    path: PathBuf,
}

impl ShaderFile {
    /// Opens `path`, writing the built-in program there first when the file
    /// does not exist yet.
    pub fn open_or_create(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.exists() {
            if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
                fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
            fs::write(&path, DEFAULT_FRAGMENT_SHADER)
                .with_context(|| format!("failed to write default shader to {}", path.display()))?;
            tracing::info!(path = %path.display(), "created shader file with the default program");
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Last modification time, used by the watcher to detect edits.
    pub fn modified(&self) -> io::Result<SystemTime> {
        fs::metadata(&self.path)?.modified()
    }
}

impl TextSource for ShaderFile {
    fn current_text(&self) -> Result<String> {
        fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read shader at {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_created_with_default_program() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("shader.frag");
        let file = ShaderFile::open_or_create(&path).expect("created");
        assert_eq!(file.current_text().expect("read"), DEFAULT_FRAGMENT_SHADER);
    }

    #[test]
    fn existing_file_is_left_alone() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("shader.frag");
        fs::write(&path, "void main() {}\n").expect("write");
        let file = ShaderFile::open_or_create(&path).expect("opened");
        assert_eq!(file.current_text().expect("read"), "void main() {}\n");
    }

    #[test]
    fn read_failure_reports_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("shader.frag");
        let file = ShaderFile::open_or_create(&path).expect("created");
        fs::remove_file(&path).expect("remove");
        let err = file.current_text().unwrap_err();
        assert!(format!("{err:#}").contains("shader.frag"));
    }
}
