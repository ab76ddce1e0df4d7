use std::{
    fs::{File, OpenOptions},
    io,
    os::unix::{fs::OpenOptionsExt, process::CommandExt},
    path::Path,
    process::{Command, Stdio},
};

use super::{host::DEFERRED_SIGNALS, LaunchRequest};
use crate::{
    log::{dev_info, dev_warn},
    system::{
        _exit, fork,
        interface::ProcessId,
        setpgid,
        signal::{consts::*, SignalHandler, SignalHandlerBehavior, SignalNumber, SignalSet},
        ForkResult,
    },
};

/// Signals whose disposition the shell changes and a job must get back to the default.
const RESET_SIGNALS: [SignalNumber; 6] = [SIGINT, SIGTSTP, SIGCHLD, SIGQUIT, SIGTTIN, SIGTTOU];

/// Fork a process that runs `request` as the leader of a new process group.
pub(crate) fn spawn_job(request: &LaunchRequest) -> io::Result<ProcessId> {
    let ForkResult::Parent(pid) = fork().map_err(|err| {
        dev_warn!("unable to fork job process: {err}");
        err
    })?
    else {
        exec_job(request)
    };

    // Both sides set the group so that it exists no matter who runs first. The child may already
    // have exec'd, which makes this fail harmlessly.
    if let Err(err) = setpgid(pid, pid) {
        dev_info!("cannot set process group of {pid} from the shell: {err}");
    }

    Ok(pid)
}

fn exec_job(request: &LaunchRequest) -> ! {
    // A new process group keeps keyboard signals aimed at the shell away from this job.
    if let Err(err) = setpgid(ProcessId::new(0), ProcessId::new(0)) {
        dev_warn!("cannot create process group: {err}");
    }

    for signal in RESET_SIGNALS {
        match SignalHandler::register(signal, SignalHandlerBehavior::Default) {
            Ok(handler) => handler.forget(),
            Err(err) => dev_warn!("cannot reset signal {signal}: {err}"),
        }
    }

    if let Err(err) = SignalSet::of(&DEFERRED_SIGNALS).and_then(|set| set.unblock()) {
        dev_warn!("cannot restore signal mask: {err}");
    }

    let program = request.program();
    let mut command = Command::new(program);
    command.args(request.argv.iter().skip(1));

    if let Some(path) = request.input {
        command.stdin(open_or_exit(path, open_input));
    }
    if let Some(path) = request.output {
        command.stdout(open_or_exit(path, open_output));
    }

    let err = command.exec();
    dev_warn!("failed to execute {program}: {err}");
    eprintln_ignore_io_error!("{program}: Command not found.");
    _exit(1)
}

fn open_input(path: &Path) -> io::Result<File> {
    File::open(path)
}

fn open_output(path: &Path) -> io::Result<File> {
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o660)
        .open(path)
}

fn open_or_exit(path: &Path, open: fn(&Path) -> io::Result<File>) -> Stdio {
    match open(path) {
        Ok(file) => file.into(),
        Err(err) => {
            eprintln_ignore_io_error!("{}: {err}", path.display());
            _exit(1)
        }
    }
}
