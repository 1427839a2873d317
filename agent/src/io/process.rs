//! Helpers for running child processes with timeouts and bounded output.

use std::io::{self, Read};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::{Arc, Mutex, mpsc};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};
use tracing::{debug, error, instrument, warn};
use wait_timeout::ChildExt;

/// Captured child process output.
#[derive(Debug)]
pub struct CommandOutput {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub stdout_truncated: usize,
    pub stderr_truncated: usize,
    pub timed_out: bool,
}

impl CommandOutput {
    /// Stdout decoded permissively, trimmed, with a notice if bytes were dropped.
    pub fn stdout_text(&self) -> String {
        render_stream(&self.stdout, self.stdout_truncated, "stdout")
    }

    /// Stderr decoded permissively, trimmed, with a notice if bytes were dropped.
    pub fn stderr_text(&self) -> String {
        render_stream(&self.stderr, self.stderr_truncated, "stderr")
    }
}

fn render_stream(bytes: &[u8], truncated: usize, label: &str) -> String {
    let text = String::from_utf8_lossy(bytes).trim().to_string();
    if truncated > 0 {
        format!("{text}\n[{label} truncated {truncated} bytes]")
    } else {
        text
    }
}

/// How long to keep draining pipes after the process group has been killed.
const KILL_GRACE: Duration = Duration::from_secs(2);

/// Run `cmd` to completion or until `timeout`, capturing stdout and stderr.
///
/// Both pipes are drained on their own threads while the child runs, so a
/// chatty child cannot block on a full pipe. At most `capture_limit` bytes are
/// kept per stream; the rest is counted and discarded.
///
/// On Unix the child leads its own process group. When the deadline passes,
/// either because the child is still running or because something it started
/// still holds the output pipes, the whole group is killed and the child is
/// reaped. Output read up to that point is returned with `timed_out` set.
#[instrument(skip_all, fields(timeout_ms = timeout.as_millis() as u64, capture_limit))]
pub fn run_command_with_timeout(
    mut cmd: Command,
    timeout: Duration,
    capture_limit: usize,
) -> Result<CommandOutput> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    #[cfg(unix)]
    std::os::unix::process::CommandExt::process_group(&mut cmd, 0);

    let deadline = Instant::now() + timeout;
    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(err) => {
            error!(%err, "failed to spawn command");
            return Err(err).context("spawn command");
        }
    };
    debug!(pid = child.id(), "spawned child process");

    let mut stdout = Capture::spawn(child.stdout.take(), capture_limit, "stdout")?;
    let mut stderr = Capture::spawn(child.stderr.take(), capture_limit, "stderr")?;

    let (status, mut timed_out) = match child.wait_timeout(timeout).context("wait for command")? {
        Some(status) => (status, false),
        None => {
            warn!(timeout_ms = timeout.as_millis() as u64, "command timed out, killing");
            kill_group(&mut child)?;
            (child.wait().context("reap command after kill")?, true)
        }
    };

    let drained = if timed_out {
        Instant::now() + KILL_GRACE
    } else {
        deadline
    };
    if !(stdout.wait_until(drained)? && stderr.wait_until(drained)?) && !timed_out {
        warn!(
            timeout_ms = timeout.as_millis() as u64,
            "output pipes still held after command exited, killing process group"
        );
        kill_group(&mut child)?;
        timed_out = true;
        let grace = Instant::now() + KILL_GRACE;
        stdout.wait_until(grace)?;
        stderr.wait_until(grace)?;
    }

    let (stdout, stdout_truncated) = stdout.take().context("collect stdout")?;
    let (stderr, stderr_truncated) = stderr.take().context("collect stderr")?;
    if stdout_truncated > 0 || stderr_truncated > 0 {
        warn!(stdout_truncated, stderr_truncated, "command output exceeded capture limit");
    }

    debug!(exit_code = ?status.code(), timed_out, "command finished");
    Ok(CommandOutput {
        status,
        stdout,
        stderr,
        stdout_truncated,
        stderr_truncated,
        timed_out,
    })
}

/// SIGKILL the child's process group, falling back to the child alone.
#[cfg(unix)]
fn kill_group(child: &mut Child) -> Result<()> {
    use nix::errno::Errno;
    use nix::sys::signal::{Signal, killpg};
    use nix::unistd::Pid;

    let pgid = i32::try_from(child.id()).context("process id out of range")?;
    match killpg(Pid::from_raw(pgid), Signal::SIGKILL) {
        Ok(()) | Err(Errno::ESRCH) => Ok(()),
        Err(err) => {
            warn!(%err, pgid, "killpg failed, killing child only");
            kill_child(child)
        }
    }
}

#[cfg(not(unix))]
fn kill_group(child: &mut Child) -> Result<()> {
    kill_child(child)
}

fn kill_child(child: &mut Child) -> Result<()> {
    match child.kill() {
        Ok(()) => Ok(()),
        // Already exited and reaped.
        Err(err) if err.kind() == io::ErrorKind::InvalidInput => Ok(()),
        Err(err) => Err(err).context("kill command"),
    }
}

#[derive(Default)]
struct Captured {
    kept: Vec<u8>,
    dropped: usize,
}

/// One output pipe drained on a background thread into a shared buffer.
///
/// The buffer is shared so a caller that stops waiting still gets whatever
/// was read before it gave up.
struct Capture {
    buf: Arc<Mutex<Captured>>,
    done: mpsc::Receiver<io::Result<()>>,
    finished: bool,
    failure: Option<io::Error>,
}

impl Capture {
    fn spawn<R>(pipe: Option<R>, limit: usize, label: &str) -> Result<Self>
    where
        R: Read + Send + 'static,
    {
        let pipe = pipe.ok_or_else(|| anyhow!("{label} was not piped"))?;
        let buf = Arc::new(Mutex::new(Captured::default()));
        let (tx, done) = mpsc::channel();
        let shared = Arc::clone(&buf);
        thread::spawn(move || {
            let _ = tx.send(read_bounded(pipe, limit, &shared));
        });
        Ok(Self {
            buf,
            done,
            finished: false,
            failure: None,
        })
    }

    /// Wait for EOF until `deadline`. Returns whether the pipe was fully drained.
    fn wait_until(&mut self, deadline: Instant) -> Result<bool> {
        if self.finished {
            return Ok(true);
        }
        let remaining = deadline.saturating_duration_since(Instant::now());
        match self.done.recv_timeout(remaining) {
            Ok(result) => {
                self.finished = true;
                self.failure = result.err();
                Ok(true)
            }
            Err(mpsc::RecvTimeoutError::Timeout) => Ok(false),
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                Err(anyhow!("output reader thread panicked"))
            }
        }
    }

    fn take(self) -> Result<(Vec<u8>, usize)> {
        if let Some(err) = self.failure {
            return Err(err).context("read output");
        }
        if !self.finished {
            warn!("output pipe still open; returning partial capture");
        }
        let mut guard = self
            .buf
            .lock()
            .map_err(|_| anyhow!("output buffer poisoned"))?;
        let captured = std::mem::take(&mut *guard);
        Ok((captured.kept, captured.dropped))
    }
}

/// Read `reader` to EOF, keeping the first `limit` bytes and counting the rest.
fn read_bounded<R: Read>(mut reader: R, limit: usize, buf: &Mutex<Captured>) -> io::Result<()> {
    let mut chunk = [0u8; 8192];
    loop {
        let n = reader.read(&mut chunk)?;
        if n == 0 {
            return Ok(());
        }
        let Ok(mut captured) = buf.lock() else {
            return Ok(());
        };
        let room = limit.saturating_sub(captured.kept.len()).min(n);
        captured.kept.extend_from_slice(&chunk[..room]);
        captured.dropped += n - room;
    }
}
