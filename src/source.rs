use std::process::Stdio;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Per-line callback attached to a log source. Invoked sequentially from
/// the source's own background context, at most one call in flight.
pub type LineListener = Arc<dyn Fn(&str) + Send + Sync>;

/// Boundary to the external line producer. The engine drives its lifecycle
/// and never inspects the process or transport behind it.
pub trait LogSource: Send {
    /// Attach the callback invoked once per raw line
    fn set_listener(&mut self, listener: LineListener);

    /// Begin producing lines
    fn start(&mut self);

    /// Stop producing lines
    fn stop_reading(&mut self);

    /// Forcibly interrupt a blocked read
    fn interrupt(&mut self);

    /// New instance with the same configuration and fresh internal state
    fn duplicate(&self) -> Box<dyn LogSource>;
}

/// Log source that tails the stdout of a spawned child process
/// (e.g. `adb logcat -v time`).
pub struct CommandSource {
    argv: Vec<String>,
    listener: Option<LineListener>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl CommandSource {
    pub fn new(argv: Vec<String>) -> Self {
        Self {
            argv,
            listener: None,
            cancel: CancellationToken::new(),
            task: None,
        }
    }
}

impl LogSource for CommandSource {
    fn set_listener(&mut self, listener: LineListener) {
        self.listener = Some(listener);
    }

    fn start(&mut self) {
        let Some(listener) = self.listener.clone() else {
            warn!("command source started without a listener");
            return;
        };
        let argv = self.argv.clone();
        let cancel = self.cancel.clone();

        let task = tokio::spawn(async move {
            let Some((program, args)) = argv.split_first() else {
                warn!("command source has an empty command line");
                return;
            };

            let mut child = match Command::new(program)
                .args(args)
                .stdout(Stdio::piped())
                .stderr(Stdio::null())
                .kill_on_drop(true)
                .spawn()
            {
                Ok(child) => child,
                Err(err) => {
                    warn!(%err, command = %program, "failed to spawn log source process");
                    return;
                }
            };

            let Some(stdout) = child.stdout.take() else {
                warn!(command = %program, "log source process has no stdout");
                return;
            };
            let mut lines = BufReader::new(stdout).lines();

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,

                    result = lines.next_line() => {
                        match result {
                            Ok(Some(line)) => listener(&line),
                            Ok(None) => {
                                debug!(command = %program, "log source stream ended");
                                break;
                            }
                            Err(err) => {
                                warn!(%err, command = %program, "error reading log source stream");
                                break;
                            }
                        }
                    }
                }
            }

            let _ = child.kill().await;
        });

        self.task = Some(task);
    }

    fn stop_reading(&mut self) {
        self.cancel.cancel();
        // Fresh token so a later start is not born cancelled
        self.cancel = CancellationToken::new();
    }

    fn interrupt(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    fn duplicate(&self) -> Box<dyn LogSource> {
        Box::new(CommandSource::new(self.argv.clone()))
    }
}

impl Drop for CommandSource {
    fn drop(&mut self) {
        self.stop_reading();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn test_streams_child_stdout_line_by_line() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut source = CommandSource::new(vec![
            "sh".to_string(),
            "-c".to_string(),
            "echo one; echo two".to_string(),
        ]);
        source.set_listener(Arc::new(move |line: &str| {
            let _ = tx.send(line.to_string());
        }));
        source.start();

        assert_eq!(rx.recv().await.as_deref(), Some("one"));
        assert_eq!(rx.recv().await.as_deref(), Some("two"));

        // Source keeps a listener clone; drop it so the channel closes once
        // the reader task finishes.
        drop(source);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_stop_interrupts_a_blocked_read() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        // sleeps forever after one line, so only cancellation ends the read
        let mut source = CommandSource::new(vec![
            "sh".to_string(),
            "-c".to_string(),
            "echo first; sleep 600".to_string(),
        ]);
        source.set_listener(Arc::new(move |line: &str| {
            let _ = tx.send(line.to_string());
        }));
        source.start();

        assert_eq!(rx.recv().await.as_deref(), Some("first"));
        source.stop_reading();
        drop(source);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_duplicate_has_same_command_fresh_state() {
        let source = CommandSource::new(vec!["sh".to_string(), "-c".to_string(), "true".to_string()]);
        let mut clone = source.duplicate();
        // A duplicate starts with no listener attached; starting it is a
        // no-op rather than a panic.
        clone.start();
    }
}
