//! Lifecycle of one external-program run: launch, warm-up, scan merged
//! output for the metric line, then tear the process down.

use std::io::{BufRead, BufReader, Read};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::errors::SweepError;
use crate::extract::parse_invocations;
use crate::types::RunInvocation;

/// Timing constants for a single run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunTiming {
    /// Pause after launch before output is read.
    pub warm_up: Duration,
    /// How long a graceful termination request is given before a forced kill.
    pub termination_wait: Duration,
    /// Granularity of liveness checks while no output line is available.
    pub poll_interval: Duration,
    /// Optional deadline for the whole read loop.
    pub run_timeout: Option<Duration>,
}

impl Default for RunTiming {
    fn default() -> Self {
        Self {
            warm_up: Duration::from_secs(2),
            termination_wait: Duration::from_secs(1),
            poll_interval: Duration::from_millis(50),
            run_timeout: None,
        }
    }
}

/// Something that turns one invocation into an optional metric.
///
/// `Ok(None)` is a normal miss (the program ended or the read loop stopped
/// without a matching line). `Err` is a run-level failure the sweep logs and
/// skips.
pub trait Probe {
    fn measure(&mut self, invocation: &RunInvocation) -> Result<Option<u64>, SweepError>;
}

/// Optional side channel poked once per run after the warm-up wait, e.g. to
/// send a keystroke to the target program's window. Failures are logged and
/// otherwise ignored.
pub trait Stimulus {
    fn after_launch(&self, pid: u32) -> std::io::Result<()>;
}

/// Stimulus that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoStimulus;

impl Stimulus for NoStimulus {
    fn after_launch(&self, _pid: u32) -> std::io::Result<()> {
        Ok(())
    }
}

/// Stimulus that runs a helper command (for example `xdotool key Tab`) and
/// waits for it to finish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandStimulus {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl CommandStimulus {
    /// Splits a whitespace-separated command line into program and arguments.
    /// Returns `None` for a blank line.
    pub fn from_command_line(line: &str) -> Option<Self> {
        let mut parts = line.split_whitespace();
        let program = PathBuf::from(parts.next()?);
        Some(Self {
            program,
            args: parts.map(str::to_string).collect(),
        })
    }
}

impl Stimulus for CommandStimulus {
    fn after_launch(&self, _pid: u32) -> std::io::Result<()> {
        let status = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()?;
        if status.success() {
            Ok(())
        } else {
            Err(std::io::Error::other(format!(
                "{} exited with {status}",
                self.program.display()
            )))
        }
    }
}

/// Outcome of waiting for the next output line.
#[derive(Debug, PartialEq, Eq)]
pub enum LineEvent {
    Line(String),
    /// Nothing arrived within the wait.
    Idle,
    /// Both output streams reached end of file.
    Closed,
}

/// A live external program with stdout and stderr merged into one line
/// stream. Dropping it kills the process if it was not torn down already.
pub struct RunProcess {
    child: Child,
    lines: Receiver<String>,
    reaped: bool,
}

impl RunProcess {
    pub fn spawn(invocation: &RunInvocation) -> Result<Self, SweepError> {
        let mut command = invocation.to_command();
        // Own process group, so teardown also reaches anything the program forks.
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }
        let mut child = command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| SweepError::Launch {
                program: invocation.program.clone(),
                source,
            })?;

        let (tx, rx) = mpsc::channel();
        if let Some(stdout) = child.stdout.take() {
            forward_lines(stdout, tx.clone(), "stdout");
        }
        if let Some(stderr) = child.stderr.take() {
            forward_lines(stderr, tx, "stderr");
        }

        Ok(Self {
            child,
            lines: rx,
            reaped: false,
        })
    }

    pub fn id(&self) -> u32 {
        self.child.id()
    }

    pub fn has_exited(&mut self) -> Result<bool, SweepError> {
        if self.reaped {
            return Ok(true);
        }
        match self.child.try_wait() {
            Ok(Some(status)) => {
                debug!(pid = self.child.id(), %status, "process exited");
                self.reaped = true;
                Ok(true)
            }
            Ok(None) => Ok(false),
            Err(source) => Err(SweepError::Read { source }),
        }
    }

    pub fn next_line(&self, wait: Duration) -> LineEvent {
        match self.lines.recv_timeout(wait) {
            Ok(line) => LineEvent::Line(line),
            Err(RecvTimeoutError::Timeout) => LineEvent::Idle,
            Err(RecvTimeoutError::Disconnected) => LineEvent::Closed,
        }
    }

    /// Ask the process group to stop, wait up to `wait`, then kill it.
    /// Descendants still holding the group are killed even when the
    /// program itself already exited.
    pub fn terminate(&mut self, wait: Duration) {
        let pid = self.child.id();
        if self.reaped {
            kill_group(pid);
            return;
        }
        if let Err(err) = request_stop(&mut self.child) {
            debug!(pid, error = %err, "termination request failed");
        }

        let deadline = Instant::now() + wait;
        loop {
            match self.child.try_wait() {
                Ok(Some(_)) => {
                    self.reaped = true;
                    kill_group(pid);
                    return;
                }
                Ok(None) if Instant::now() >= deadline => break,
                Ok(None) => thread::sleep(Duration::from_millis(10)),
                Err(_) => break,
            }
        }

        debug!(pid, "process ignored termination request; killing");
        self.kill();
    }

    pub fn kill(&mut self) {
        if self.reaped {
            return;
        }
        kill_group(self.child.id());
        let _ = self.child.kill();
        let _ = self.child.wait();
        self.reaped = true;
    }
}

impl Drop for RunProcess {
    fn drop(&mut self) {
        self.kill();
    }
}

#[cfg(unix)]
fn group_of(child_pid: u32) -> std::io::Result<nix::unistd::Pid> {
    let pid = i32::try_from(child_pid).map_err(std::io::Error::other)?;
    Ok(nix::unistd::Pid::from_raw(pid))
}

#[cfg(unix)]
fn request_stop(child: &mut Child) -> std::io::Result<()> {
    use nix::sys::signal::{Signal, killpg};

    killpg(group_of(child.id())?, Signal::SIGTERM).map_err(std::io::Error::from)
}

#[cfg(not(unix))]
fn request_stop(child: &mut Child) -> std::io::Result<()> {
    child.kill()
}

/// SIGKILL whatever is left in the run's process group. An empty group is fine.
#[cfg(unix)]
fn kill_group(child_pid: u32) {
    use nix::sys::signal::{Signal, killpg};

    if let Ok(pgid) = group_of(child_pid) {
        let _ = killpg(pgid, Signal::SIGKILL);
    }
}

#[cfg(not(unix))]
fn kill_group(_child_pid: u32) {}

fn forward_lines<R: Read + Send + 'static>(stream: R, tx: Sender<String>, name: &'static str) {
    thread::spawn(move || {
        let mut reader = BufReader::new(stream);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) => break,
                Ok(_) => {
                    let line = String::from_utf8_lossy(&buf).into_owned();
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Err(err) => {
                    debug!(stream = name, error = %err, "output stream read failed");
                    break;
                }
            }
        }
    });
}

/// [`Probe`] backed by a real child process.
pub struct ProcessProbe {
    timing: RunTiming,
    stimulus: Box<dyn Stimulus>,
}

impl ProcessProbe {
    pub fn new(timing: RunTiming) -> Self {
        Self {
            timing,
            stimulus: Box::new(NoStimulus),
        }
    }

    pub fn with_stimulus(mut self, stimulus: Box<dyn Stimulus>) -> Self {
        self.stimulus = stimulus;
        self
    }

    fn read_metric(&self, process: &mut RunProcess) -> Result<Option<u64>, SweepError> {
        let deadline = self.timing.run_timeout.map(|t| Instant::now() + t);

        loop {
            if process.has_exited()? {
                return Ok(self.drain_after_exit(process, deadline));
            }

            if past(deadline) {
                info!("no metric line before the run timeout");
                return Ok(None);
            }

            match process.next_line(self.timing.poll_interval) {
                LineEvent::Line(line) => {
                    if let Some(value) = scan_line(&line) {
                        return Ok(Some(value));
                    }
                }
                LineEvent::Idle => {}
                // Output closed but the process is still up; keep polling liveness.
                LineEvent::Closed => thread::sleep(self.timing.poll_interval),
            }
        }
    }

    /// Scan lines the process wrote before it exited. Bounded by one poll
    /// interval (and the run deadline), since a forked child can keep the
    /// pipes open and writing long after the program itself is gone.
    fn drain_after_exit(&self, process: &RunProcess, deadline: Option<Instant>) -> Option<u64> {
        let mut until = Instant::now() + self.timing.poll_interval;
        if let Some(d) = deadline {
            until = until.min(d);
        }

        loop {
            let remaining = until.saturating_duration_since(Instant::now());
            match process.next_line(remaining) {
                LineEvent::Line(line) => {
                    if let Some(value) = scan_line(&line) {
                        return Some(value);
                    }
                    if remaining.is_zero() {
                        debug!("stopped draining output of exited process");
                        return None;
                    }
                }
                LineEvent::Idle | LineEvent::Closed => return None,
            }
        }
    }
}

fn past(deadline: Option<Instant>) -> bool {
    deadline.is_some_and(|d| Instant::now() >= d)
}

impl Probe for ProcessProbe {
    fn measure(&mut self, invocation: &RunInvocation) -> Result<Option<u64>, SweepError> {
        info!("Running command: {}", invocation.command_line());
        let mut process = RunProcess::spawn(invocation)?;
        let pid = process.id();
        info!(pid, "process started");

        thread::sleep(self.timing.warm_up);

        if let Err(err) = self.stimulus.after_launch(pid) {
            warn!(pid, error = %err, "stimulus failed");
        }

        let outcome = self.read_metric(&mut process);
        process.terminate(self.timing.termination_wait);
        outcome
    }
}

fn scan_line(line: &str) -> Option<u64> {
    debug!(output = line.trim_end(), "program output");
    parse_invocations(line)
}
