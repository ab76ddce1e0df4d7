//! Turning signals into notifications, and notifications into job table updates.
//!
//! Signal handlers only record that a signal arrived. Everything in this module runs on the
//! control thread, which is the only place the job table is ever touched.
use std::ffi::c_int;

use super::{Flow, Host};
use crate::{
    common::{Console, Error},
    cutils::was_interrupted,
    jobs::{JobState, JobTable},
    log::{dev_info, dev_warn, verbose},
    system::{
        interface::ProcessId,
        signal::{consts::*, signal_name, SignalNumber},
        wait::{Wait, WaitError, WaitOptions, WaitStatus},
    },
};

/// How a child changed state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ChildChange {
    Exited(c_int),
    Signaled(SignalNumber),
    Stopped(SignalNumber),
}

impl ChildChange {
    pub(crate) fn from_status(status: &WaitStatus) -> Option<Self> {
        if let Some(code) = status.exit_status() {
            Some(Self::Exited(code))
        } else if let Some(signal) = status.term_signal() {
            Some(Self::Signaled(signal))
        } else {
            status.stop_signal().map(Self::Stopped)
        }
    }
}

/// Something the job-control engine has to react to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Notification {
    /// A child exited, was killed or was stopped.
    Child { pid: ProcessId, change: ChildChange },
    /// The user pressed ctrl-c or ctrl-z.
    Keyboard(SignalNumber),
    /// The shell was asked to quit.
    Quit,
}

/// Map a received signal to the notifications it stands for.
pub(crate) fn translate(signal: SignalNumber) -> Result<Vec<Notification>, Error> {
    match signal {
        SIGCHLD => reap_children(),
        SIGINT | SIGTSTP => Ok(vec![Notification::Keyboard(signal)]),
        SIGQUIT => Ok(vec![Notification::Quit]),
        _ => {
            dev_warn!("unexpected signal {signal} in the stream");
            Ok(Vec::new())
        }
    }
}

/// Collect every child status change that is pending, without blocking.
///
/// A single `SIGCHLD` may stand for several children, so this keeps going until nothing is left.
pub(crate) fn reap_children() -> Result<Vec<Notification>, Error> {
    let mut reaped = Vec::new();

    loop {
        match ProcessId::ANY.wait(WaitOptions::new().untraced().no_hang()) {
            Ok((pid, status)) => {
                dev_info!("{pid} changed state: {status:?}");
                if let Some(change) = ChildChange::from_status(&status) {
                    reaped.push(Notification::Child { pid, change });
                }
            }
            Err(WaitError::NotReady) => break,
            Err(err) if err.is_no_children() => break,
            Err(WaitError::Io(err)) if was_interrupted(&err) => {}
            Err(WaitError::Io(err)) => return Err(Error::fatal("waitpid error", err)),
        }
    }

    Ok(reaped)
}

/// Apply one notification to the job table.
pub(crate) fn reconcile<H: Host>(
    table: &mut JobTable,
    host: &mut H,
    console: &mut Console,
    notification: Notification,
) -> Result<Flow, Error> {
    match notification {
        Notification::Child { pid, change } => {
            on_child_change(table, console, pid, change);
            Ok(Flow::Continue)
        }
        Notification::Keyboard(signal) => {
            // Without a foreground job the keystroke is meant for nobody.
            if let Some(pgid) = table.foreground_pid() {
                dev_info!(
                    "forwarding {} to group {pgid}",
                    signal_name(signal).unwrap_or("?")
                );
                host.signal_group(pgid, signal).map_err(|err| {
                    let context = if signal == SIGINT {
                        "sigint error"
                    } else {
                        "sigtstp error"
                    };
                    Error::fatal(context, err)
                })?;
            }
            Ok(Flow::Continue)
        }
        Notification::Quit => {
            console.say(format_args!("Terminating after receipt of SIGQUIT signal"));
            Ok(Flow::Exit(1))
        }
    }
}

fn on_child_change(
    table: &mut JobTable,
    console: &mut Console,
    pid: ProcessId,
    change: ChildChange,
) {
    let Some(job) = table.find_by_pid(pid) else {
        console.complain(format_args!("tsh: no job for reaped process {pid}"));
        return;
    };

    match change {
        ChildChange::Exited(_) => {
            verbose!("{job} deleted");
            table.remove(pid);
        }
        ChildChange::Signaled(signal) => {
            console.say(format_args!(
                "Job [{}] ({pid}) terminated by signal {signal}",
                job.id()
            ));
            table.remove(pid);
        }
        ChildChange::Stopped(signal) => {
            console.say(format_args!(
                "Job [{}] ({pid}) stopped by signal {signal}",
                job.id()
            ));
            if let Err(err) = table.set_state(pid, JobState::Stopped) {
                dev_warn!("cannot mark {pid} as stopped: {err}");
            }
        }
    }
}
