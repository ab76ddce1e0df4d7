use std::io;

use super::{
    relay::{self, Notification},
    spawn::spawn_job,
    Host, LaunchRequest,
};
use crate::{
    common::Error,
    cutils::was_interrupted,
    log::{dev_info, dev_warn},
    system::{
        interface::ProcessId,
        killpg,
        signal::{
            consts::*, register_handlers, signal_name, SignalHandler, SignalHandlerBehavior,
            SignalNumber, SignalSet, SignalStream,
        },
    },
};

/// Signals held back while a job is being started.
pub(super) const DEFERRED_SIGNALS: [SignalNumber; 3] = [SIGCHLD, SIGINT, SIGTSTP];

const STREAMED_SIGNALS: [SignalNumber; 4] = [SIGCHLD, SIGINT, SIGTSTP, SIGQUIT];

/// The real operating system.
///
/// Signals handled by the shell are written into a [`SignalStream`] by their handlers and turned
/// into [`Notification`]s on the control thread.
pub(crate) struct SystemHost {
    signal_stream: &'static SignalStream,
    _signal_handlers: [SignalHandler; 4],
}

impl SystemHost {
    /// Install the shell's signal handling.
    ///
    /// # Panics
    ///
    /// If called more than once.
    pub(crate) fn install() -> Result<Self, Error> {
        // A background job touching the terminal must not stop the shell.
        for signal in [SIGTTIN, SIGTTOU] {
            SignalHandler::register(signal, SignalHandlerBehavior::Ignore)
                .map_err(|err| Error::fatal("signal error", err))?
                .forget();
        }

        let signal_stream =
            SignalStream::init().map_err(|err| Error::fatal("signal error", err))?;
        let signal_handlers = register_handlers(STREAMED_SIGNALS)
            .map_err(|err| Error::fatal("signal error", err))?;

        Ok(Self {
            signal_stream,
            _signal_handlers: signal_handlers,
        })
    }

    pub(crate) fn signal_stream(&self) -> &'static SignalStream {
        self.signal_stream
    }
}

/// Restores the signal mask that was in place before [`Host::defer_signals`] when dropped.
pub(crate) struct MaskGuard {
    original: SignalSet,
}

impl Drop for MaskGuard {
    fn drop(&mut self) {
        if let Err(err) = self.original.set_mask() {
            dev_warn!("cannot restore signal mask: {err}");
        }
    }
}

impl Host for SystemHost {
    type Deferral = MaskGuard;

    fn defer_signals(&mut self) -> io::Result<MaskGuard> {
        let original = SignalSet::of(&DEFERRED_SIGNALS)?.block()?;
        Ok(MaskGuard { original })
    }

    fn spawn(&mut self, request: &LaunchRequest) -> io::Result<ProcessId> {
        spawn_job(request)
    }

    fn signal_group(&mut self, pgid: ProcessId, signal: SignalNumber) -> io::Result<()> {
        killpg(pgid, signal)
    }

    fn notifications(&mut self) -> Result<Vec<Notification>, Error> {
        loop {
            match self.signal_stream.recv() {
                Ok(info) => {
                    dev_info!(
                        "received {} from {}",
                        signal_name(info.signal()).unwrap_or("?"),
                        info.sender()
                    );
                    return relay::translate(info.signal());
                }
                Err(err) if was_interrupted(&err) => {}
                Err(err) => return Err(Error::fatal("signal stream error", err)),
            }
        }
    }

    fn pending_notifications(&mut self) -> Result<Vec<Notification>, Error> {
        let mut pending = Vec::new();
        loop {
            match self.signal_stream.try_recv() {
                Ok(Some(info)) => pending.extend(relay::translate(info.signal())?),
                Ok(None) => return Ok(pending),
                Err(err) if was_interrupted(&err) => {}
                Err(err) => return Err(Error::fatal("signal stream error", err)),
            }
        }
    }
}
