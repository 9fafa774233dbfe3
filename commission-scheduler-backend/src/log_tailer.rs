//! Follows an append-only log file and hands every new line to observers.
//!
//! The tailer starts at the file's length when subscribing, wakes up on
//! filesystem notifications for the file and reads from its last offset to
//! the end. Lines are delivered once they are complete; a trailing partial
//! line is held back until [`TailSubscription::stop`] flushes it. A file
//! that shrank below the offset was truncated and is read again from the
//! start.

use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::TailError;

pub trait LogObserver: Send {
    fn on_lines(&mut self, lines: &[String]);
}

impl LogObserver for mpsc::UnboundedSender<String> {
    fn on_lines(&mut self, lines: &[String]) {
        for line in lines {
            // a dropped receiver just stops listening
            let _ = self.send(line.clone());
        }
    }
}

/// Re-emits solver output as tracing events under the `solver` target.
pub struct TracingObserver {
    job_id: Uuid,
}

impl TracingObserver {
    #[must_use]
    pub const fn new(job_id: Uuid) -> Self {
        Self { job_id }
    }
}

impl LogObserver for TracingObserver {
    fn on_lines(&mut self, lines: &[String]) {
        for line in lines {
            info!(target: "solver", job_id = %self.job_id, "{line}");
        }
    }
}

/// Collects every line; clones share the buffer.
#[derive(Clone, Default)]
pub struct LogCapture {
    lines: Arc<Mutex<Vec<String>>>,
}

impl LogCapture {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The captured lines, newline terminated.
    #[must_use]
    pub fn text(&self) -> String {
        self.lines()
            .into_iter()
            .map(|line| line + "\n")
            .collect()
    }
}

impl LogObserver for LogCapture {
    fn on_lines(&mut self, lines: &[String]) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(lines);
    }
}

struct TailState {
    path: PathBuf,
    offset: u64,
    partial: Vec<u8>,
    observers: Vec<Box<dyn LogObserver>>,
}

impl TailState {
    async fn read_appended(&mut self) -> std::io::Result<Vec<u8>> {
        let mut file = match tokio::fs::File::open(&self.path).await {
            Ok(file) => file,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(error) => return Err(error),
        };
        let length = file.metadata().await?.len();
        if length < self.offset {
            debug!(path = %self.path.display(), "log truncated, starting over");
            self.offset = 0;
            self.partial.clear();
        }
        file.seek(SeekFrom::Start(self.offset)).await?;
        let mut appended = Vec::new();
        file.read_to_end(&mut appended).await?;
        Ok(appended)
    }

    async fn drain(&mut self, flush: bool) {
        match self.read_appended().await {
            Ok(appended) => {
                self.offset += appended.len() as u64;
                self.partial.extend_from_slice(&appended);
            }
            Err(error) => {
                warn!(path = %self.path.display(), %error, "failed to read log");
                if !flush {
                    return;
                }
            }
        }

        let mut lines = Vec::new();
        while let Some(end) = self.partial.iter().position(|byte| *byte == b'\n') {
            let line: Vec<u8> = self.partial.drain(..=end).collect();
            lines.push(decode(&line[..end]));
        }
        if flush && !self.partial.is_empty() {
            lines.push(decode(&self.partial));
            self.partial.clear();
        }
        if lines.is_empty() {
            return;
        }
        for observer in &mut self.observers {
            observer.on_lines(&lines);
        }
    }
}

fn decode(line: &[u8]) -> String {
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    String::from_utf8_lossy(line).into_owned()
}

/// A running tail. Dropping it stops the tailing as well, but without a way
/// to wait for the final drain.
pub struct TailSubscription {
    stop: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
    _watcher: RecommendedWatcher,
}

impl TailSubscription {
    /// Reads what is left, flushes a trailing partial line and waits until
    /// the observers have seen it.
    pub async fn stop(mut self) -> Result<(), TailError> {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        (&mut self.task).await?;
        Ok(())
    }
}

pub struct LogTailer;

impl LogTailer {
    /// Must be called from within a tokio runtime.
    pub fn watch(
        path: &Path,
        observers: Vec<Box<dyn LogObserver>>,
    ) -> Result<TailSubscription, TailError> {
        let parent = path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let file_name = path
            .file_name()
            .ok_or_else(|| TailError::NotAFile(path.to_owned()))?
            .to_owned();
        let offset = match std::fs::metadata(path) {
            Ok(metadata) => metadata.len(),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => 0,
            Err(error) => return Err(error.into()),
        };

        let (changed, mut changes) = mpsc::unbounded_channel::<()>();
        let mut watcher = notify::recommended_watcher(move |event: notify::Result<notify::Event>| {
            match event {
                Ok(event) => {
                    if event.paths.is_empty()
                        || event
                            .paths
                            .iter()
                            .any(|changed| changed.file_name() == Some(file_name.as_os_str()))
                    {
                        let _ = changed.send(());
                    }
                }
                Err(error) => warn!(%error, "log watcher error"),
            }
        })
        .map_err(|source| TailError::Watch {
            path: path.to_owned(),
            source,
        })?;
        watcher
            .watch(parent, RecursiveMode::NonRecursive)
            .map_err(|source| TailError::Watch {
                path: path.to_owned(),
                source,
            })?;

        let mut state = TailState {
            path: path.to_owned(),
            offset,
            partial: Vec::new(),
            observers,
        };
        let (stop, mut stopped) = oneshot::channel();
        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    change = changes.recv() => {
                        if change.is_none() {
                            break;
                        }
                        state.drain(false).await;
                    }
                    _ = &mut stopped => break,
                }
            }
            state.drain(true).await;
        });

        debug!(path = %path.display(), offset, "tailing log");
        Ok(TailSubscription {
            stop: Some(stop),
            task,
            _watcher: watcher,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use super::*;

    fn append(path: &Path, text: &str) {
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .unwrap();
        file.write_all(text.as_bytes()).unwrap();
    }

    #[tokio::test]
    async fn starts_at_the_current_end() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("job.log");
        append(&path, "before\n");

        let capture = LogCapture::new();
        let subscription = LogTailer::watch(&path, vec![Box::new(capture.clone())]).unwrap();
        append(&path, "first\nsecond\n");
        subscription.stop().await.unwrap();

        assert_eq!(capture.lines(), ["first", "second"]);
    }

    #[tokio::test]
    async fn flushes_a_partial_line_on_stop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("job.log");

        let capture = LogCapture::new();
        let subscription = LogTailer::watch(&path, vec![Box::new(capture.clone())]).unwrap();
        append(&path, "done\r\nno newline");
        subscription.stop().await.unwrap();

        assert_eq!(capture.text(), "done\nno newline\n");
    }

    #[tokio::test]
    async fn restarts_after_truncation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("job.log");
        append(&path, "a rather long first line\n");

        let (sender, mut receiver) = mpsc::unbounded_channel();
        let subscription = LogTailer::watch(&path, vec![Box::new(sender)]).unwrap();
        std::fs::write(&path, "new\n").unwrap();
        subscription.stop().await.unwrap();

        assert_eq!(receiver.recv().await.as_deref(), Some("new"));
    }

    #[tokio::test]
    async fn delivers_while_running() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("job.log");
        std::fs::write(&path, "").unwrap();

        let (sender, mut receiver) = mpsc::unbounded_channel();
        let subscription = LogTailer::watch(&path, vec![Box::new(sender)]).unwrap();
        append(&path, "progress\n");
        let line = tokio::time::timeout(core::time::Duration::from_secs(10), receiver.recv())
            .await
            .unwrap();
        assert_eq!(line.as_deref(), Some("progress"));
        subscription.stop().await.unwrap();
    }
}
