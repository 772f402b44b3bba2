// pipeline.rs

use std::ffi::{CStr, CString};
use std::ptr;
use std::fmt;
use std::fs::{File, OpenOptions};
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;
use nix::errno::Errno;
#[cfg(any(target_os = "linux", target_os = "android"))]
use nix::fcntl::OFlag;
use nix::sys::signal::Signal;
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::{dup2, fork, ForkResult, Pid};
use crate::error::{Result, ShellError};
use crate::parser::{CommandNode, OutputMode, Pipeline};
use crate::signals::ActiveProcess;
use crate::util::report;

const REDIRECT_FILE_MODE: u32 = 0o666;
const EXIT_NOT_EXECUTABLE: i32 = 127;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ExitStatus {
    Exited(i32),
    Signaled(Signal),
}

impl ExitStatus {
    pub fn success(&self) -> bool {
        matches!(self, ExitStatus::Exited(0))
    }
}

impl fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitStatus::Exited(code) => write!(f, "exit status {}", code),
            ExitStatus::Signaled(signal) => write!(f, "terminated by {}", signal.as_str()),
        }
    }
}

/// Interior stages still running after their pipeline's terminal stage
/// exited. They are polled without blocking and dropped once reaped.
#[derive(Debug, Default)]
pub struct Reaper {
    pending: Vec<Pid>,
}

impl Reaper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn track(&mut self, pid: Pid) {
        self.pending.push(pid);
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Collects every tracked stage that has exited; returns how many did.
    pub fn reap(&mut self) -> usize {
        let before = self.pending.len();
        self.pending.retain(|&pid| match waitpid(pid, Some(WaitPidFlag::WNOHANG)) {
            Ok(WaitStatus::StillAlive) => true,
            Ok(status) => {
                log::debug!("stage {} reaped: {:?}", pid, status);
                !matches!(status, WaitStatus::Exited(..) | WaitStatus::Signaled(..))
            }
            Err(Errno::EINTR) => true,
            Err(err) => {
                log::warn!("failed to reap stage {}: {}", pid, err);
                false
            }
        });
        before - self.pending.len()
    }
}

/// Runs `pipeline` until its terminal stage exits.
///
/// Returns the status of the terminal stage, or `None` when that stage has
/// no command. Only the terminal process is registered with `active` and
/// waited on; the other stages are handed to `reaper` and collected
/// without blocking.
pub fn execute(pipeline: &Pipeline, active: &ActiveProcess, reaper: &mut Reaper) -> Result<Option<ExitStatus>> {
    let mut spawned = Vec::with_capacity(pipeline.len());
    let status = match launch(pipeline, &mut spawned) {
        Ok(Some(terminal)) => {
            active.set(terminal);
            let status = wait_for(terminal);
            active.clear(terminal);
            spawned.retain(|pid| *pid != terminal);
            status.map(Some)
        }
        Ok(None) => Ok(None),
        Err(err) => Err(err),
    };
    for pid in spawned {
        reaper.track(pid);
    }
    reaper.reap();
    status
}

fn launch(pipeline: &Pipeline, spawned: &mut Vec<Pid>) -> Result<Option<Pid>> {
    // None keeps the shell's own stdin.
    let mut input: Option<OwnedFd> = None;
    if let Some(path) = pipeline.input_redirect() {
        match open_input(path) {
            Ok(file) => input = Some(file.into()),
            Err(err) => report(&err),
        }
    }

    let Some((last, interior)) = pipeline.nodes().split_last() else {
        return Ok(None);
    };
    for node in interior {
        if node.is_empty() {
            log::debug!("empty stage, input carries forward");
            continue;
        }
        let (read, write) = open_pipe()?;
        spawned.push(spawn(node, input.as_ref(), Some(&write))?);
        drop(write);
        input = Some(read);
    }

    let mut output: Option<OwnedFd> = None;
    if let Some((path, mode)) = pipeline.output_redirect() {
        match open_output(path, mode) {
            Ok(file) => output = Some(file.into()),
            Err(err) => report(&err),
        }
    }
    if last.is_empty() {
        return Ok(None);
    }
    let terminal = spawn(last, input.as_ref(), output.as_ref())?;
    spawned.push(terminal);
    Ok(Some(terminal))
}

fn open_input(path: &Path) -> Result<File> {
    File::open(path).map_err(|source| ShellError::RedirectOpen { path: path.to_path_buf(), source })
}

fn open_output(path: &Path, mode: OutputMode) -> Result<File> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).mode(REDIRECT_FILE_MODE);
    match mode {
        OutputMode::Truncate => options.truncate(true),
        OutputMode::Append => options.append(true),
    };
    options
        .open(path)
        .map_err(|source| ShellError::RedirectOpen { path: path.to_path_buf(), source })
}

/// Both ends are close-on-exec; a child only keeps what it dup2s onto 0 and 1.
#[cfg(any(target_os = "linux", target_os = "android"))]
fn open_pipe() -> Result<(OwnedFd, OwnedFd)> {
    let (read, write) = nix::unistd::pipe2(OFlag::O_CLOEXEC)?;
    // SAFETY: pipe2() just returned these descriptors and nothing else owns them.
    Ok(unsafe { (OwnedFd::from_raw_fd(read), OwnedFd::from_raw_fd(write)) })
}

#[cfg(not(any(target_os = "linux", target_os = "android")))]
fn open_pipe() -> Result<(OwnedFd, OwnedFd)> {
    use nix::fcntl::{fcntl, FcntlArg, FdFlag};
    let (read, write) = nix::unistd::pipe()?;
    // SAFETY: pipe() just returned these descriptors and nothing else owns them.
    let (read, write) = unsafe { (OwnedFd::from_raw_fd(read), OwnedFd::from_raw_fd(write)) };
    for fd in [&read, &write] {
        fcntl(fd.as_raw_fd(), FcntlArg::F_SETFD(FdFlag::FD_CLOEXEC))?;
    }
    Ok((read, write))
}

fn spawn(node: &CommandNode, stdin: Option<&OwnedFd>, stdout: Option<&OwnedFd>) -> Result<Pid> {
    let program = node.program().unwrap_or_default();
    let args = node
        .argv
        .iter()
        .map(|arg| CString::new(arg.as_bytes()))
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|_| ShellError::Spawn {
            program: program.to_string(),
            reason: "argument contains a NUL byte".into(),
        })?;
    // Everything the child needs is allocated before forking.
    let mut argv: Vec<*const libc::c_char> = args.iter().map(|arg| arg.as_ptr()).collect();
    argv.push(ptr::null());
    let failure_prefix = format!("{}: ", program);
    let stdin = stdin.map(AsRawFd::as_raw_fd);
    let stdout = stdout.map(AsRawFd::as_raw_fd);

    // SAFETY: the child only calls dup2, execvp, write and _exit, none of
    // which allocate.
    match unsafe { fork() }? {
        ForkResult::Child => exec_child(&args[0], &argv, stdin, stdout, failure_prefix.as_bytes()),
        ForkResult::Parent { child } => {
            log::debug!("spawned {} as pid {}", node, child);
            Ok(child)
        }
    }
}

/// `argv` is null-terminated and borrows from `CString`s the parent keeps alive.
fn exec_child(
    program: &CStr,
    argv: &[*const libc::c_char],
    stdin: Option<RawFd>,
    stdout: Option<RawFd>,
    failure_prefix: &[u8],
) -> ! {
    for (fd, target) in [(stdin, libc::STDIN_FILENO), (stdout, libc::STDOUT_FILENO)] {
        if let Some(fd) = fd {
            if let Err(errno) = dup2(fd, target) {
                child_fail(failure_prefix, errno.desc());
            }
        }
    }
    // SAFETY: program and argv are valid NUL-terminated strings and argv ends in null.
    unsafe { libc::execvp(program.as_ptr(), argv.as_ptr()) };
    let errno = Errno::last();
    let reason = if errno == Errno::ENOENT { "command not found" } else { errno.desc() };
    child_fail(failure_prefix, reason)
}

fn child_fail(prefix: &[u8], reason: &str) -> ! {
    for chunk in [prefix, reason.as_bytes(), &b"\n"[..]] {
        // SAFETY: plain write(2) of a valid buffer; async-signal-safe.
        unsafe { libc::write(libc::STDERR_FILENO, chunk.as_ptr().cast(), chunk.len()) };
    }
    unsafe { libc::_exit(EXIT_NOT_EXECUTABLE) }
}

fn wait_for(pid: Pid) -> Result<ExitStatus> {
    loop {
        match waitpid(pid, None) {
            Ok(WaitStatus::Exited(_, code)) => return Ok(ExitStatus::Exited(code)),
            Ok(WaitStatus::Signaled(_, signal, _)) => return Ok(ExitStatus::Signaled(signal)),
            Ok(other) => log::debug!("pid {} changed state: {:?}", pid, other),
            Err(Errno::EINTR) => continue,
            Err(err) => return Err(err.into()),
        }
    }
}
