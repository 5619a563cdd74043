//! # Driver Invocation
//!
//! Launches the external verifier driver as a child process:
//!
//! ```text
//! <driver> -L <toolchain-lib-dir> --extern <name>=<rlib> <input> [extra-args]
//! ```
//!
//! The composed environment is overlaid on the inherited one. By default the
//! child's streams are inherited so diagnostics appear live; the only thing
//! observed is the exit status. A non-zero exit is a normal outcome and is
//! never retried.

use crate::config::{HarnessConfig, StreamMode};
use crate::environment::ComposedEnvironment;
use crate::{Error, Result};
use regex::Regex;
use std::ffi::OsString;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Poll interval while waiting on a child with a deadline
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// How long captured output may keep arriving after a timed-out child is killed
const DRAIN_GRACE: Duration = Duration::from_millis(200);

/// Pre-built crate handed to the driver with `--extern`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternArtifact {
    /// Crate name as seen by the verified program
    pub name: String,
    /// Resolved `.rlib`
    pub path: PathBuf,
}

impl ExternArtifact {
    /// `<name>=<path>`
    pub fn to_arg(&self) -> OsString {
        let mut arg = OsString::from(format!("{}=", self.name));
        arg.push(&self.path);
        arg
    }
}

/// Find the single `lib<crate_name>-<hash>.rlib` in `deps_dir`
pub fn resolve_extra_linkable(deps_dir: &Path, crate_name: &str) -> Result<ExternArtifact> {
    let what = format!("lib{}-*.rlib", crate_name);
    let pattern = Regex::new(&format!(
        r"^lib{}-[A-Za-z0-9]+\.rlib$",
        regex::escape(crate_name)
    ))
    .map_err(|e| Error::InvalidConfig(format!("bad extern crate name {crate_name:?}: {e}")))?;

    let entries = match std::fs::read_dir(deps_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(Error::DependencyNotFound {
                what,
                searched: deps_dir.to_path_buf(),
            });
        }
        Err(e) => return Err(Error::io(format!("reading {}", deps_dir.display()), e)),
    };

    let mut matches = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| Error::io(format!("reading {}", deps_dir.display()), e))?;
        if entry
            .file_name()
            .to_str()
            .is_some_and(|name| pattern.is_match(name))
        {
            matches.push(entry.path());
        }
    }
    matches.sort();

    match matches.len() {
        0 => Err(Error::DependencyNotFound {
            what,
            searched: deps_dir.to_path_buf(),
        }),
        1 => Ok(ExternArtifact {
            name: crate_name.to_string(),
            path: matches.remove(0),
        }),
        _ => Err(Error::AmbiguousDependency { what, matches }),
    }
}

/// Outcome of one driver run
#[derive(Debug, Clone)]
pub struct RunResult {
    /// Exit status of the child
    pub status: ExitStatus,
    /// Killed after exceeding the configured timeout
    pub timed_out: bool,
    /// Captured stdout (empty when streams are inherited)
    pub stdout: Vec<u8>,
    /// Captured stderr (empty when streams are inherited)
    pub stderr: Vec<u8>,
}

impl RunResult {
    pub fn success(&self) -> bool {
        self.status.success() && !self.timed_out
    }

    /// Human-readable status
    pub fn describe(&self) -> String {
        if self.timed_out {
            format!("timed out ({})", self.status)
        } else {
            self.status.to_string()
        }
    }
}

/// Something that can verify one input file
pub trait Driver {
    /// Run the verifier on `input` to completion
    fn run(&self, input: &Path) -> Result<RunResult>;
}

/// Launches the real driver executable
#[derive(Debug, Clone)]
pub struct DriverInvoker {
    program: PathBuf,
    working_dir: PathBuf,
    toolchain_lib_dir: PathBuf,
    extern_artifact: Option<ExternArtifact>,
    env: Vec<(String, OsString)>,
    extra_args: Vec<OsString>,
    timeout: Option<Duration>,
    stream_mode: StreamMode,
}

impl DriverInvoker {
    /// Build an invoker for the active profile's driver
    pub fn new(
        config: &HarnessConfig,
        composed: &ComposedEnvironment,
        extern_artifact: Option<ExternArtifact>,
    ) -> Self {
        Self {
            program: config.driver_path(),
            working_dir: config.project_root.clone(),
            toolchain_lib_dir: composed.toolchain_lib_dir.clone(),
            extern_artifact,
            env: composed
                .env
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_os_string()))
                .collect(),
            extra_args: config.extra_args.iter().map(OsString::from).collect(),
            timeout: config.timeout,
            stream_mode: config.stream_mode,
        }
    }

    /// Use a different executable (e.g. a wrapper script)
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Argument vector, excluding the program itself
    pub fn args(&self, input: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["-L".into(), self.toolchain_lib_dir.clone().into()];
        if let Some(artifact) = &self.extern_artifact {
            args.push("--extern".into());
            args.push(artifact.to_arg());
        }
        args.push(input.as_os_str().to_os_string());
        args.extend(self.extra_args.iter().cloned());
        args
    }

    /// Fully configured command for `input`
    pub fn command(&self, input: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(self.args(input))
            .current_dir(&self.working_dir)
            .envs(self.env.iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::inherit());
        match self.stream_mode {
            StreamMode::Inherit => {
                cmd.stdout(Stdio::inherit()).stderr(Stdio::inherit());
            }
            StreamMode::Capture => {
                cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
            }
        }
        // A deadline needs the whole process tree killable at once. Without
        // one the child stays in our group and receives terminal signals.
        #[cfg(unix)]
        if self.timeout.is_some() {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }
        cmd
    }

    /// Run `input` and return its result, whatever the exit status
    pub fn invoke(&self, input: &Path) -> Result<RunResult> {
        debug!("Launching {} on {}", self.program.display(), input.display());
        let mut child = self
            .command(input)
            .spawn()
            .map_err(|e| Error::io(format!("launching {}", self.program.display()), e))?;

        let stdout = child.stdout.take().map(spawn_reader);
        let stderr = child.stderr.take().map(spawn_reader);

        let (status, timed_out) = wait_with_timeout(&mut child, self.timeout)?;
        if timed_out {
            warn!(
                "{} exceeded {:?} on {}; killed",
                self.program.display(),
                self.timeout.unwrap_or_default(),
                input.display()
            );
        }

        let drain_until = timed_out.then(|| Instant::now() + DRAIN_GRACE);
        Ok(RunResult {
            status,
            timed_out,
            stdout: collect_output(stdout, drain_until),
            stderr: collect_output(stderr, drain_until),
        })
    }

    /// Run `input`, turning an unsuccessful exit into an error
    pub fn invoke_checked(&self, input: &Path) -> Result<RunResult> {
        let result = self.invoke(input)?;
        self.check(input, result)
    }

    /// Map a timed-out or non-zero result for `input` to an error
    pub fn check(&self, input: &Path, result: RunResult) -> Result<RunResult> {
        if result.timed_out {
            return Err(Error::Timeout {
                input: input.to_path_buf(),
                after: self.timeout.unwrap_or_default(),
            });
        }
        if !result.status.success() {
            return Err(Error::ExternalProcessFailure {
                program: self.program.clone(),
                input: input.to_path_buf(),
                status: result.describe(),
            });
        }
        Ok(result)
    }
}

impl Driver for DriverInvoker {
    fn run(&self, input: &Path) -> Result<RunResult> {
        self.invoke(input)
    }
}

/// Forward chunks of `reader` until EOF; the channel closes when it ends
fn spawn_reader<R: Read + Send + 'static>(mut reader: R) -> Receiver<Vec<u8>> {
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        let mut buf = [0u8; 8192];
        loop {
            match reader.read(&mut buf) {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    if tx.send(buf[..n].to_vec()).is_err() {
                        break;
                    }
                }
            }
        }
    });
    rx
}

/// Gather captured output until EOF, or until `deadline` if one is given
///
/// A descendant that escaped the kill can hold the pipe open indefinitely;
/// whatever arrives after the deadline is dropped.
fn collect_output(rx: Option<Receiver<Vec<u8>>>, deadline: Option<Instant>) -> Vec<u8> {
    let Some(rx) = rx else {
        return Vec::new();
    };
    let mut out = Vec::new();
    match deadline {
        None => rx.iter().for_each(|chunk| out.extend(chunk)),
        Some(deadline) => loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match rx.recv_timeout(remaining) {
                Ok(chunk) => out.extend(chunk),
                Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => break,
            }
        },
    }
    out
}

/// Kill the child and, on unix, the process group it leads
#[cfg(unix)]
fn kill_tree(child: &mut Child) {
    if let Ok(pid) = libc::pid_t::try_from(child.id()) {
        // SAFETY: signalling a process group has no memory-safety preconditions.
        unsafe {
            libc::kill(-pid, libc::SIGKILL);
        }
    }
    let _ = child.kill();
}

#[cfg(not(unix))]
fn kill_tree(child: &mut Child) {
    let _ = child.kill();
}

/// Wait for `child`, killing it once `timeout` elapses
fn wait_with_timeout(child: &mut Child, timeout: Option<Duration>) -> Result<(ExitStatus, bool)> {
    let Some(limit) = timeout else {
        let status = child
            .wait()
            .map_err(|e| Error::io("waiting for driver", e))?;
        return Ok((status, false));
    };

    let deadline = Instant::now().checked_add(limit);
    loop {
        if let Some(status) = child
            .try_wait()
            .map_err(|e| Error::io("polling driver", e))?
        {
            return Ok((status, false));
        }
        if deadline.is_some_and(|d| Instant::now() >= d) {
            kill_tree(child);
            let status = child
                .wait()
                .map_err(|e| Error::io("waiting for killed driver", e))?;
            return Ok((status, true));
        }
        std::thread::sleep(POLL_INTERVAL);
    }
}
