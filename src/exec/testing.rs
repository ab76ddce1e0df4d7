//! A scripted [`Host`] for driving the engine without real processes.
use std::{cell::Cell, collections::VecDeque, io, rc::Rc};

use super::{Host, LaunchRequest, Notification};
use crate::{
    common::Error,
    system::{interface::ProcessId, signal::SignalNumber},
};

pub(crate) struct FakeHost {
    next_pid: i32,
    deferring: Rc<Cell<bool>>,
    spawned: Vec<(String, bool)>,
    spawn_error: Option<i32>,
    signals: Vec<(ProcessId, SignalNumber)>,
    signal_error: Option<i32>,
    script: VecDeque<Vec<Notification>>,
    pending: VecDeque<Vec<Notification>>,
}

pub(crate) struct FakeDeferral(Rc<Cell<bool>>);

impl Drop for FakeDeferral {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

impl FakeHost {
    pub(crate) const FIRST_PID: i32 = 1000;

    pub(crate) fn new() -> Self {
        Self {
            next_pid: Self::FIRST_PID,
            deferring: Rc::new(Cell::new(false)),
            spawned: Vec::new(),
            spawn_error: None,
            signals: Vec::new(),
            signal_error: None,
            script: VecDeque::new(),
            pending: VecDeque::new(),
        }
    }

    /// The pid the next spawned job will get.
    pub(crate) fn next_pid(&self) -> ProcessId {
        ProcessId::new(self.next_pid)
    }

    /// Command lines spawned so far, each with whether notifications were deferred at the time.
    pub(crate) fn spawned(&self) -> &[(String, bool)] {
        &self.spawned
    }

    pub(crate) fn signals(&self) -> &[(ProcessId, SignalNumber)] {
        &self.signals
    }

    pub(crate) fn is_deferring(&self) -> bool {
        self.deferring.get()
    }

    pub(crate) fn fail_next_spawn(&mut self, errno: i32) {
        self.spawn_error = Some(errno);
    }

    pub(crate) fn fail_signals(&mut self, errno: i32) {
        self.signal_error = Some(errno);
    }

    /// Queue a batch for a later [`Host::pending_notifications`] call. Each call hands out one
    /// batch, and an empty one once they are used up.
    pub(crate) fn script_pending(&mut self, batch: impl IntoIterator<Item = Notification>) {
        self.pending.push_back(batch.into_iter().collect());
    }

    /// Queue a batch of notifications for a later [`Host::notifications`] call.
    pub(crate) fn script(&mut self, batch: impl IntoIterator<Item = Notification>) {
        self.script.push_back(batch.into_iter().collect());
    }
}

impl Host for FakeHost {
    type Deferral = FakeDeferral;

    fn defer_signals(&mut self) -> io::Result<FakeDeferral> {
        assert!(!self.deferring.get(), "notifications deferred twice");
        self.deferring.set(true);
        Ok(FakeDeferral(self.deferring.clone()))
    }

    fn spawn(&mut self, request: &LaunchRequest) -> io::Result<ProcessId> {
        if let Some(errno) = self.spawn_error.take() {
            return Err(io::Error::from_raw_os_error(errno));
        }
        self.spawned
            .push((request.command_line.to_string(), self.deferring.get()));
        let pid = self.next_pid();
        self.next_pid += 1;
        Ok(pid)
    }

    fn signal_group(&mut self, pgid: ProcessId, signal: SignalNumber) -> io::Result<()> {
        if let Some(errno) = self.signal_error {
            return Err(io::Error::from_raw_os_error(errno));
        }
        self.signals.push((pgid, signal));
        Ok(())
    }

    fn notifications(&mut self) -> Result<Vec<Notification>, Error> {
        // A real host would block forever here.
        Ok(self
            .script
            .pop_front()
            .unwrap_or_else(|| panic!("the engine waited but nothing else will happen")))
    }

    fn pending_notifications(&mut self) -> Result<Vec<Notification>, Error> {
        Ok(self.pending.pop_front().unwrap_or_default())
    }
}
