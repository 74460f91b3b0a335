use std::thread::{self, JoinHandle};
use std::time::{Duration, SystemTime};

use anyhow::{Context, Result};
use crossbeam_channel::{bounded, RecvTimeoutError, Sender};

use crate::source::ShaderFile;

/// Polls a shader file's modification time on a background thread and calls
/// `notify` after each change. The recompile itself happens wherever `notify`
/// routes the request.
pub struct ShaderWatcher {
    stop_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl ShaderWatcher {
    /// `notify` returns false once nobody is listening, which ends the thread.
    pub fn spawn<F>(file: ShaderFile, interval: Duration, mut notify: F) -> Result<Self>
    where
        F: FnMut() -> bool + Send + 'static,
    {
        let (stop_tx, stop_rx) = bounded::<()>(1);
        let interval = interval.max(Duration::from_millis(10));
        // Read before the thread starts; an edit after spawn must differ from it.
        let mut last_seen = file.modified().ok();
        let handle = thread::Builder::new()
            .name("shader-watch".into())
            .spawn(move || {
                tracing::debug!(path = %file.path().display(), ?interval, "watching shader file");
                loop {
                    match stop_rx.recv_timeout(interval) {
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                        Err(RecvTimeoutError::Timeout) => {}
                    }
                    let current = file.modified().ok();
                    if !changed(last_seen, current) {
                        continue;
                    }
                    last_seen = current;
                    tracing::debug!(path = %file.path().display(), "shader file changed");
                    if !notify() {
                        break;
                    }
                }
                tracing::debug!("shader watcher stopped");
            })
            .context("failed to spawn shader watcher thread")?;

        Ok(Self {
            stop_tx: Some(stop_tx),
            handle: Some(handle),
        })
    }

    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.try_send(());
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::warn!("shader watcher thread panicked");
            }
        }
    }
}

impl Drop for ShaderWatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// A file that disappears is not a change; it is picked up again once it
/// reappears with a new timestamp.
fn changed(last_seen: Option<SystemTime>, current: Option<SystemTime>) -> bool {
    match (last_seen, current) {
        (_, None) => false,
        (None, Some(_)) => true,
        (Some(previous), Some(current)) => previous != current,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn change_detection_ignores_missing_files() {
        let now = SystemTime::now();
        let later = now + Duration::from_secs(1);
        assert!(!changed(Some(now), Some(now)));
        assert!(changed(Some(now), Some(later)));
        assert!(!changed(Some(now), None));
        assert!(changed(None, Some(now)));
    }

    #[test]
    fn notifies_after_edit_and_stops_cleanly() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("shader.frag");
        let file = ShaderFile::open_or_create(&path).expect("created");

        let (tx, rx) = crossbeam_channel::unbounded();
        let watcher = ShaderWatcher::spawn(file, Duration::from_millis(10), move || {
            tx.send(()).is_ok()
        })
        .expect("spawned");

        // Push the mtime forward explicitly so coarse filesystem clocks still
        // register a change.
        let handle = fs::OpenOptions::new()
            .write(true)
            .open(&path)
            .expect("open");
        handle
            .set_modified(SystemTime::now() + Duration::from_secs(5))
            .expect("set mtime");

        rx.recv_timeout(Duration::from_secs(5))
            .expect("watcher noticed the edit");
        watcher.stop();
    }

    #[test]
    fn edit_immediately_after_spawn_is_not_lost() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("shader.frag");
        let file = ShaderFile::open_or_create(&path).expect("created");

        let (tx, rx) = crossbeam_channel::unbounded();
        let watcher = ShaderWatcher::spawn(file, Duration::from_millis(200), move || {
            tx.send(()).is_ok()
        })
        .expect("spawned");

        fs::write(&path, "void main() {}\n").expect("rewrite");
        fs::OpenOptions::new()
            .write(true)
            .open(&path)
            .expect("open")
            .set_modified(SystemTime::now() + Duration::from_secs(10))
            .expect("set mtime");

        rx.recv_timeout(Duration::from_secs(5))
            .expect("edit made before the first poll is reported");
        watcher.stop();
    }
}
