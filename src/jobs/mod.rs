//! The registry of jobs launched by the shell.
//!
//! The table is a fixed number of slots. A job takes the lowest free slot and the next job id;
//! job ids stay in `1..=capacity` and are never shared by two live jobs.
#![forbid(unsafe_code)]

use std::{fmt, io};

use crate::{common::MAX_JOBS, system::interface::ProcessId};


/// The small number users refer to a job by, as in `fg %2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct JobId(u32);

impl JobId {
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    pub const fn get(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Job states and the transitions between them:
///
/// ```text
/// Foreground -> Stopped      ctrl-z
/// Stopped    -> Foreground   fg
/// Stopped    -> Background   bg
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Foreground,
    Background,
    Stopped,
}

impl JobState {
    /// The word `jobs` prints for this state.
    pub fn label(&self) -> &'static str {
        match self {
            JobState::Foreground => "Foreground",
            JobState::Background => "Running",
            JobState::Stopped => "Stopped",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pid: ProcessId,
    id: JobId,
    state: JobState,
    command_line: String,
}

impl Job {
    pub fn pid(&self) -> ProcessId {
        self.pid
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    pub fn command_line(&self) -> &str {
        &self.command_line
    }
}

/// `[<job_id>] (<pid>) <command_line>`, the way a job is announced when it goes to the
/// background.
impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] ({}) {}", self.id, self.pid, self.command_line)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableError {
    InvalidPid(ProcessId),
    Full,
    NotFound(ProcessId),
    /// Another job already owns the foreground.
    ForegroundBusy(ProcessId),
}

impl fmt::Display for TableError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableError::InvalidPid(pid) => write!(f, "invalid process id {pid}"),
            TableError::Full => f.write_str("Tried to create too many jobs"),
            TableError::NotFound(pid) => write!(f, "no job for process {pid}"),
            TableError::ForegroundBusy(pid) => {
                write!(f, "process {pid} already runs in the foreground")
            }
        }
    }
}

pub struct JobTable {
    slots: Vec<Option<Job>>,
    next_id: u32,
}

impl Default for JobTable {
    fn default() -> Self {
        Self::new()
    }
}

impl JobTable {
    pub fn new() -> Self {
        Self::with_capacity(MAX_JOBS)
    }

    /// # Panics
    ///
    /// If `capacity` is zero.
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity > 0, "a job table needs at least one slot");
        Self {
            slots: vec![None; capacity],
            next_id: 1,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    pub fn is_full(&self) -> bool {
        self.slots.iter().all(Option::is_some)
    }

    /// Drop every job and start numbering from 1 again.
    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|slot| *slot = None);
        self.next_id = 1;
    }

    /// Register a freshly created process and return the job id it was given.
    pub fn add(
        &mut self,
        pid: ProcessId,
        state: JobState,
        command_line: &str,
    ) -> Result<JobId, TableError> {
        if !pid.is_valid() {
            return Err(TableError::InvalidPid(pid));
        }

        if state == JobState::Foreground {
            if let Some(owner) = self.foreground_pid() {
                return Err(TableError::ForegroundBusy(owner));
            }
        }

        let index = self
            .slots
            .iter()
            .position(Option::is_none)
            .ok_or(TableError::Full)?;

        let id = self.allocate_id();
        self.slots[index] = Some(Job {
            pid,
            id,
            state,
            command_line: command_line.to_string(),
        });

        Ok(id)
    }

    /// Clear the slot of the job for `pid` and hand the job back, or `None` if there is no such
    /// job.
    pub fn remove(&mut self, pid: ProcessId) -> Option<Job> {
        if !pid.is_valid() {
            return None;
        }

        let slot = self
            .slots
            .iter_mut()
            .find(|slot| matches!(slot, Some(job) if job.pid == pid))?;
        let job = slot.take();

        let max_id = self.iter().map(|job| job.id.get()).max().unwrap_or(0);
        self.next_id = self.wrap(max_id + 1);

        job
    }

    pub fn find_by_pid(&self, pid: ProcessId) -> Option<&Job> {
        if !pid.is_valid() {
            return None;
        }
        self.iter().find(|job| job.pid == pid)
    }

    pub fn find_by_job_id(&self, id: JobId) -> Option<&Job> {
        if id.get() < 1 {
            return None;
        }
        self.iter().find(|job| job.id == id)
    }

    /// Move the job for `pid` to `state`, refusing to create a second foreground job.
    pub fn set_state(&mut self, pid: ProcessId, state: JobState) -> Result<(), TableError> {
        if state == JobState::Foreground {
            if let Some(owner) = self.foreground_pid().filter(|&owner| owner != pid) {
                return Err(TableError::ForegroundBusy(owner));
            }
        }

        let job = self
            .slots
            .iter_mut()
            .flatten()
            .find(|job| job.pid == pid)
            .ok_or(TableError::NotFound(pid))?;
        job.state = state;

        Ok(())
    }

    /// The process of the foreground job, if there is one.
    pub fn foreground_pid(&self) -> Option<ProcessId> {
        self.iter()
            .find(|job| job.state == JobState::Foreground)
            .map(|job| job.pid)
    }

    /// Live jobs in slot order.
    pub fn iter(&self) -> impl Iterator<Item = &Job> {
        self.slots.iter().flatten()
    }

    /// Write one `[<job_id>] (<pid>) <state> <command_line>` line per live job.
    pub fn list<W: io::Write + ?Sized>(&self, sink: &mut W) -> io::Result<()> {
        for job in self.iter() {
            writeln!(
                sink,
                "[{}] ({}) {:<11}{}",
                job.id,
                job.pid,
                job.state.label(),
                job.command_line
            )?;
        }
        sink.flush()
    }

    fn allocate_id(&mut self) -> JobId {
        let mut candidate = self.next_id;
        // There is a free slot, so at most `capacity - 1` ids are taken and this terminates.
        while self.find_by_job_id(JobId(candidate)).is_some() {
            candidate = self.wrap(candidate + 1);
        }
        self.next_id = self.wrap(candidate + 1);
        JobId(candidate)
    }

    fn wrap(&self, id: u32) -> u32 {
        if id as usize > self.capacity() {
            1
        } else {
            id
        }
    }
}
