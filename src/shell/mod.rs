//! The interactive part of the shell: evaluating command lines and running built-ins.
mod cli;
mod parse;
mod read_loop;

use std::{
    fs::OpenOptions,
    os::unix::fs::OpenOptionsExt,
    path::Path,
    process::exit,
};

use crate::{
    common::{Console, Error},
    exec::{launch, relay, Flow, Host, LaunchRequest, Notification, SystemHost},
    jobs::{JobId, JobState, JobTable},
    log::{dev_info, verbose, ShellLogger},
    system::{interface::ProcessId, signal::consts::SIGCONT},
};

use self::{
    cli::{ShellAction, ShellOptions, USAGE_MSG},
    parse::{parse_line, Builtin, ParsedCommand},
};

/// The job a `bg` or `fg` argument points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JobRef {
    /// `%<job_id>`
    Job(JobId),
    /// a bare process id
    Process(ProcessId),
}

impl JobRef {
    fn parse(arg: &str) -> Option<Self> {
        if let Some(id) = arg.strip_prefix('%') {
            id.parse().ok().map(|id| JobRef::Job(JobId::new(id)))
        } else {
            arg.parse().ok().map(JobRef::Process)
        }
    }
}

/// The command dispatcher. Owns the job table and is the only thing that changes it.
pub(crate) struct Shell<H: Host> {
    jobs: JobTable,
    host: H,
    console: Console,
}

impl<H: Host> Shell<H> {
    pub(crate) fn new(host: H, console: Console) -> Self {
        Self {
            jobs: JobTable::new(),
            host,
            console,
        }
    }

    #[cfg(test)]
    pub(crate) fn jobs(&self) -> &JobTable {
        &self.jobs
    }

    #[cfg(test)]
    pub(crate) fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub(crate) fn console(&mut self) -> &mut Console {
        &mut self.console
    }

    /// Evaluate one command line, without its trailing newline.
    ///
    /// Returns only once no job is in the foreground.
    pub(crate) fn eval(&mut self, line: &str) -> Result<Flow, Error> {
        let command = match parse_line(line) {
            Ok(Some(command)) => command,
            Ok(None) => return Ok(Flow::Continue),
            Err(err) => {
                self.console.complain(format_args!("{err}"));
                return Ok(Flow::Continue);
            }
        };

        match command.builtin {
            None => self.run_external(&command, line),
            Some(Builtin::Quit) => {
                verbose!("quit with {} jobs left", self.jobs.len());
                Ok(Flow::Exit(0))
            }
            Some(Builtin::Jobs) => {
                self.list_jobs(command.output.as_deref());
                Ok(Flow::Continue)
            }
            Some(builtin @ (Builtin::Bg | Builtin::Fg)) => self.resume(&command, builtin),
        }
    }

    /// Apply every notification observed so far, without waiting for more.
    ///
    /// This runs before each command line, so a keystroke that arrived while no job was in the
    /// foreground is matched against the table as it was then.
    pub(crate) fn drain_notifications(&mut self) -> Result<Flow, Error> {
        let pending = self.host.pending_notifications()?;
        self.apply_notifications(pending)
    }

    /// Wait for the next batch of notifications and apply it.
    fn await_notifications(&mut self) -> Result<Flow, Error> {
        let batch = self.host.notifications()?;
        self.apply_notifications(batch)
    }

    fn apply_notifications(&mut self, batch: Vec<Notification>) -> Result<Flow, Error> {
        for notification in batch {
            let flow =
                relay::reconcile(&mut self.jobs, &mut self.host, &mut self.console, notification)?;
            if let Flow::Exit(_) = flow {
                return Ok(flow);
            }
        }
        Ok(Flow::Continue)
    }

    fn run_external(&mut self, command: &ParsedCommand, line: &str) -> Result<Flow, Error> {
        let request = LaunchRequest {
            argv: &command.argv,
            input: command.input.as_deref().map(Path::new),
            output: command.output.as_deref().map(Path::new),
            background: command.background,
            command_line: line,
        };

        let launched = match launch(&mut self.host, &mut self.jobs, &request) {
            Ok(launched) => launched,
            Err(Error::Table(err)) => {
                self.console.complain(format_args!("{err}"));
                return Ok(Flow::Continue);
            }
            Err(err) => return Err(err),
        };

        if command.background {
            self.console
                .say(format_args!("[{}] ({}) {line}", launched.id, launched.pid));
            Ok(Flow::Continue)
        } else {
            self.wait_foreground()
        }
    }

    /// Block until no job is in the foreground.
    ///
    /// The table only changes by applying notifications, so this sleeps in the host until one
    /// arrives instead of polling.
    fn wait_foreground(&mut self) -> Result<Flow, Error> {
        while let Some(pid) = self.jobs.foreground_pid() {
            dev_info!("waiting for foreground job {pid}");
            if let Flow::Exit(code) = self.await_notifications()? {
                return Ok(Flow::Exit(code));
            }
        }
        Ok(Flow::Continue)
    }

    fn resume(&mut self, command: &ParsedCommand, builtin: Builtin) -> Result<Flow, Error> {
        let name = builtin.name();

        let [_, arg] = command.argv.as_slice() else {
            self.console
                .complain(format_args!("{name} command requires PID or %jobid argument"));
            return Ok(Flow::Continue);
        };

        let Some(target) = JobRef::parse(arg) else {
            self.console
                .complain(format_args!("{name}: argument must be a PID or %jobid"));
            return Ok(Flow::Continue);
        };

        let job = match target {
            JobRef::Job(id) => self.jobs.find_by_job_id(id),
            JobRef::Process(pid) => self.jobs.find_by_pid(pid),
        };
        let Some(job) = job else {
            self.console.complain(format_args!("No such job"));
            return Ok(Flow::Continue);
        };

        let pid = job.pid();
        if job.state() != JobState::Stopped {
            self.console
                .complain(format_args!("[{}] {pid} is running now", job.id()));
            return Ok(Flow::Continue);
        }

        if builtin == Builtin::Bg {
            self.console.say(format_args!("{job}"));
        }

        if let Err(err) = self.host.signal_group(pid, SIGCONT) {
            self.console.complain(format_args!("{name}: {err}"));
            return Ok(Flow::Continue);
        }

        if builtin == Builtin::Bg {
            self.jobs.set_state(pid, JobState::Background)?;
            Ok(Flow::Continue)
        } else {
            self.jobs.set_state(pid, JobState::Foreground)?;
            self.wait_foreground()
        }
    }

    fn list_jobs(&mut self, output: Option<&str>) {
        let result = match output {
            Some(path) => OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .mode(0o660)
                .open(path)
                .and_then(|mut file| self.jobs.list(&mut file))
                .map_err(|err| format!("{path}: {err}")),
            None => self
                .jobs
                .list(self.console.out())
                .map_err(|err| format!("jobs: {err}")),
        };

        if let Err(message) = result {
            self.console.complain(format_args!("{message}"));
        }
    }
}

pub fn main() {
    let options = match ShellOptions::from_env() {
        Ok(options) => options,
        Err(error) => {
            eprintln_ignore_io_error!("tsh: {error}");
            println_ignore_io_error!("{USAGE_MSG}");
            exit(1);
        }
    };

    if options.action == ShellAction::Help {
        println_ignore_io_error!("{USAGE_MSG}");
        exit(1);
    }

    ShellLogger::new(options.verbose).into_global_logger();

    match run(&options) {
        Ok(code) => exit(code),
        Err(error) => {
            eprintln_ignore_io_error!("tsh: {error}");
            exit(1);
        }
    }
}

fn run(options: &ShellOptions) -> Result<i32, Error> {
    let host = SystemHost::install()?;
    let signals = host.signal_stream();
    let shell = Shell::new(host, Console::stdio());

    read_loop::run(shell, std::io::stdin(), signals, options.emit_prompt)
}

#[cfg(test)]
mod tests;
