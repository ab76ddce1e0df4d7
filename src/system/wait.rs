use std::{fmt, io};

use libc::{
    c_int, WEXITSTATUS, WIFEXITED, WIFSIGNALED, WIFSTOPPED, WNOHANG, WSTOPSIG, WTERMSIG,
    WUNTRACED,
};

use crate::cutils::cerr;
use crate::system::{
    interface::ProcessId,
    signal::{signal_name, SignalNumber},
};

pub(crate) trait Wait {
    /// Wait for a child to change state.
    ///
    /// Use [`ProcessId::ANY`] to wait for any child. Which changes count, and whether to block,
    /// is set by [`WaitOptions`].
    fn wait(self, options: WaitOptions) -> Result<(ProcessId, WaitStatus), WaitError>;
}

impl Wait for ProcessId {
    fn wait(self, options: WaitOptions) -> Result<(ProcessId, WaitStatus), WaitError> {
        let mut status: c_int = 0;

        let pid = cerr(unsafe { libc::waitpid(self.get(), &mut status, options.flags) })
            .map_err(WaitError::Io)?;

        if pid == 0 && options.flags & WNOHANG != 0 {
            return Err(WaitError::NotReady);
        }

        Ok((ProcessId::new(pid), WaitStatus { status }))
    }
}

#[derive(Debug)]
pub enum WaitError {
    /// Every child is still running. Only with [`WaitOptions::no_hang`].
    NotReady,
    Io(io::Error),
}

impl WaitError {
    /// Returns `true` if there are no children left to wait for.
    pub fn is_no_children(&self) -> bool {
        matches!(self, WaitError::Io(err) if err.raw_os_error() == Some(libc::ECHILD))
    }
}

pub struct WaitOptions {
    flags: c_int,
}

impl WaitOptions {
    /// Block until a child terminates.
    pub const fn new() -> Self {
        Self { flags: 0 }
    }

    pub const fn no_hang(mut self) -> Self {
        self.flags |= WNOHANG;
        self
    }

    /// Report stopped children too.
    pub const fn untraced(mut self) -> Self {
        self.flags |= WUNTRACED;
        self
    }
}

/// How a waited-for child changed.
pub struct WaitStatus {
    status: c_int,
}

impl fmt::Debug for WaitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = |signal| signal_name(signal).unwrap_or("?");
        if let Some(code) = self.exit_status() {
            write!(f, "exited with {code}")
        } else if let Some(signal) = self.term_signal() {
            write!(f, "killed by {}", name(signal))
        } else if let Some(signal) = self.stop_signal() {
            write!(f, "stopped by {}", name(signal))
        } else {
            write!(f, "status {:#x}", self.status)
        }
    }
}

impl WaitStatus {
    #[cfg(test)]
    pub(crate) const fn from_raw(status: c_int) -> Self {
        Self { status }
    }

    pub const fn exit_status(&self) -> Option<c_int> {
        if WIFEXITED(self.status) {
            Some(WEXITSTATUS(self.status))
        } else {
            None
        }
    }

    pub const fn term_signal(&self) -> Option<SignalNumber> {
        if WIFSIGNALED(self.status) {
            Some(WTERMSIG(self.status))
        } else {
            None
        }
    }

    pub const fn stop_signal(&self) -> Option<SignalNumber> {
        if WIFSTOPPED(self.status) {
            Some(WSTOPSIG(self.status))
        } else {
            None
        }
    }
}
