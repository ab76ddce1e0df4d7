//! Starting jobs and keeping the job table in sync with what happens to them.
#![deny(unsafe_code)]

pub(crate) mod event;
mod host;
pub(crate) mod relay;
mod spawn;
#[cfg(test)]
pub(crate) mod testing;

use std::{io, path::Path};

use crate::{
    common::Error,
    jobs::{JobId, JobState, JobTable, TableError},
    log::{dev_info, verbose},
    system::{interface::ProcessId, signal::SignalNumber},
};

pub(crate) use host::SystemHost;
pub(crate) use relay::Notification;

/// Everything needed to start one job.
#[derive(Debug, Clone, Copy)]
pub(crate) struct LaunchRequest<'a> {
    /// `argv[0]` is the program, either a path or a name looked up in `PATH`.
    pub argv: &'a [String],
    pub input: Option<&'a Path>,
    pub output: Option<&'a Path>,
    pub background: bool,
    /// The line the job was typed as, kept for `jobs` and status reports.
    pub command_line: &'a str,
}

impl LaunchRequest<'_> {
    pub(crate) fn program(&self) -> &str {
        self.argv.first().map(String::as_str).unwrap_or_default()
    }
}

/// What the shell should do after handling a command or a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Flow {
    Continue,
    Exit(i32),
}

/// The operating system as seen by the job-control engine.
///
/// Every interaction with processes and signals goes through this trait so the engine can be
/// driven by a scripted host in tests.
pub(crate) trait Host {
    /// Keeps job-related notifications from being observed while it is alive.
    type Deferral;

    /// Hold back child-status and keyboard notifications until the returned guard is dropped.
    fn defer_signals(&mut self) -> io::Result<Self::Deferral>;

    /// Start a new process for `request` in its own process group and return its pid.
    ///
    /// The caller holds a [`Host::Deferral`] while calling this.
    fn spawn(&mut self, request: &LaunchRequest) -> io::Result<ProcessId>;

    /// Send `signal` to every process in the group `pgid`.
    fn signal_group(&mut self, pgid: ProcessId, signal: SignalNumber) -> io::Result<()>;

    /// Block until at least one notification is available and return what has been observed.
    fn notifications(&mut self) -> Result<Vec<Notification>, Error>;

    /// Return every notification observed so far without blocking. The batch may be empty.
    fn pending_notifications(&mut self) -> Result<Vec<Notification>, Error>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Launched {
    pub id: JobId,
    pub pid: ProcessId,
}

/// Start the job described by `request` and register it in `table`.
///
/// Notifications stay deferred from before the process exists until it is registered, so a job
/// cannot be reported as finished before the table knows about it.
pub(crate) fn launch<H: Host>(
    host: &mut H,
    table: &mut JobTable,
    request: &LaunchRequest,
) -> Result<Launched, Error> {
    // A full table rejects the command before any process is created.
    if table.is_full() {
        return Err(TableError::Full.into());
    }

    let deferral = host
        .defer_signals()
        .map_err(|err| Error::fatal("sigprocmask error", err))?;

    let pid = host
        .spawn(request)
        .map_err(|err| Error::fatal("fork error", err))?;

    let state = if request.background {
        JobState::Background
    } else {
        JobState::Foreground
    };
    let id = table.add(pid, state, request.command_line)?;

    // every job leads its own process group
    verbose!("Added job [{id}] {pid} {pid} {}", request.command_line);
    dev_info!("started {} as job {id} with pid {pid}", request.program());

    drop(deferral);

    Ok(Launched { id, pid })
}
