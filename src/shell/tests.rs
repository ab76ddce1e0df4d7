use std::fs;

use pretty_assertions::assert_eq;

use super::{JobRef, Shell};
use crate::{
    common::console::capture::{self, Captured},
    exec::{relay::ChildChange, testing::FakeHost, Flow, Notification},
    jobs::{JobId, JobState},
    system::{
        interface::ProcessId,
        signal::consts::{SIGCONT, SIGINT, SIGTSTP},
    },
};

struct Fixture {
    shell: Shell<FakeHost>,
    out: Captured,
    err: Captured,
}

fn fixture() -> Fixture {
    let (console, out, err) = capture::console();
    Fixture {
        shell: Shell::new(FakeHost::new(), console),
        out,
        err,
    }
}

fn child(pid: ProcessId, change: ChildChange) -> Notification {
    Notification::Child { pid, change }
}

impl Fixture {
    fn eval(&mut self, line: &str) -> Flow {
        self.shell.eval(line).unwrap()
    }

    fn next_pid(&mut self) -> ProcessId {
        self.shell.host_mut().next_pid()
    }

    fn script(&mut self, batch: impl IntoIterator<Item = Notification>) {
        self.shell.host_mut().script(batch);
    }

    /// Start a foreground job that gets stopped with ctrl-z right away.
    fn stopped_job(&mut self, line: &str) -> ProcessId {
        let pid = self.next_pid();
        self.script([child(pid, ChildChange::Stopped(SIGTSTP))]);
        assert_eq!(self.eval(line), Flow::Continue);
        pid
    }

    fn state_of(&self, pid: ProcessId) -> Option<JobState> {
        self.shell.jobs().find_by_pid(pid).map(|job| job.state())
    }
}

#[test]
fn background_job_then_exit() {
    let mut f = fixture();
    let pid = f.next_pid();

    assert_eq!(f.eval("/bin/sleep 1 &"), Flow::Continue);
    assert_eq!(f.out.text(), format!("[1] ({pid}) /bin/sleep 1 &\n"));
    assert_eq!(f.shell.jobs().len(), 1);
    let job = f.shell.jobs().find_by_job_id(JobId::new(1)).unwrap();
    assert_eq!(job.pid(), pid);
    assert_eq!(job.state(), JobState::Background);

    f.shell
        .host_mut()
        .script_pending([child(pid, ChildChange::Exited(0))]);
    assert_eq!(f.shell.drain_notifications().unwrap(), Flow::Continue);
    assert!(f.shell.jobs().is_empty());
    assert_eq!(f.shell.jobs().foreground_pid(), None);
}

#[test]
fn foreground_job_is_waited_for() {
    let mut f = fixture();
    let pid = f.next_pid();
    f.script([child(pid, ChildChange::Exited(0))]);

    assert_eq!(f.eval("/bin/echo hello"), Flow::Continue);
    assert!(f.shell.jobs().is_empty());
    assert_eq!(f.out.text(), "");
}

#[test]
fn wait_ignores_other_jobs() {
    let mut f = fixture();
    let background = f.next_pid();
    f.eval("/bin/sleep 5 &");

    let foreground = f.next_pid();
    f.script([child(background, ChildChange::Exited(0))]);
    f.script([child(foreground, ChildChange::Exited(0))]);

    f.eval("/bin/cat");
    assert!(f.shell.jobs().is_empty());
}

#[test]
fn stopped_foreground_job_unblocks_the_wait() {
    let mut f = fixture();
    let pid = f.stopped_job("/bin/vi notes");

    assert_eq!(f.state_of(pid), Some(JobState::Stopped));
    assert_eq!(f.shell.jobs().foreground_pid(), None);
    assert_eq!(
        f.out.text(),
        format!("Job [1] ({pid}) stopped by signal {SIGTSTP}\n")
    );
}

#[test]
fn ctrl_c_reaches_the_foreground_job() {
    let mut f = fixture();
    let pid = f.next_pid();
    f.script([Notification::Keyboard(SIGINT)]);
    f.script([child(pid, ChildChange::Signaled(SIGINT))]);

    f.eval("/bin/sleep 100");
    assert_eq!(f.shell.host_mut().signals(), &[(pid, SIGINT)]);
    assert!(f.shell.jobs().is_empty());
    assert_eq!(
        f.out.text(),
        format!("Job [1] ({pid}) terminated by signal {SIGINT}\n")
    );
}

#[test]
fn bg_resumes_a_stopped_job() {
    let mut f = fixture();
    let pid = f.stopped_job("/bin/sleep 10");

    assert_eq!(f.eval("bg %1"), Flow::Continue);
    assert_eq!(f.shell.host_mut().signals(), &[(pid, SIGCONT)]);
    assert_eq!(f.state_of(pid), Some(JobState::Background));
    assert!(f.out.text().ends_with(&format!("[1] ({pid}) /bin/sleep 10\n")));

    // it is running now, so a second `bg` does nothing
    assert_eq!(f.eval(&format!("bg {pid}")), Flow::Continue);
    assert_eq!(f.err.text(), format!("[1] {pid} is running now\n"));
    assert_eq!(f.shell.host_mut().signals().len(), 1);
    assert_eq!(f.state_of(pid), Some(JobState::Background));
}

#[test]
fn fg_waits_for_the_resumed_job() {
    let mut f = fixture();
    let pid = f.stopped_job("/bin/sleep 10");

    f.script([child(pid, ChildChange::Exited(0))]);
    assert_eq!(f.eval(&format!("fg {pid}")), Flow::Continue);
    assert_eq!(f.shell.host_mut().signals(), &[(pid, SIGCONT)]);
    assert!(f.shell.jobs().is_empty());
}

#[test]
fn fg_on_a_job_that_stops_again() {
    let mut f = fixture();
    let pid = f.stopped_job("/bin/sleep 10");

    f.script([child(pid, ChildChange::Stopped(SIGTSTP))]);
    f.eval("fg %1");
    assert_eq!(f.state_of(pid), Some(JobState::Stopped));
}

#[test]
fn fg_on_a_missing_job() {
    let mut f = fixture();
    let pid = f.next_pid();
    f.eval("/bin/sleep 10 &");
    let before = f.out.text();

    assert_eq!(f.eval("fg %5"), Flow::Continue);
    assert_eq!(f.eval("fg 77777"), Flow::Continue);
    assert_eq!(f.err.text(), "No such job\nNo such job\n");
    assert_eq!(f.out.text(), before);
    assert_eq!(f.state_of(pid), Some(JobState::Background));
    assert_eq!(f.shell.jobs().len(), 1);
    assert!(f.shell.host_mut().signals().is_empty());
}

#[test]
fn bg_fg_argument_errors() {
    let mut f = fixture();
    f.eval("fg");
    f.eval("bg %1 %2");
    f.eval("bg %x");
    f.eval("fg one");
    assert_eq!(
        f.err.text(),
        "fg command requires PID or %jobid argument\n\
         bg command requires PID or %jobid argument\n\
         bg: argument must be a PID or %jobid\n\
         fg: argument must be a PID or %jobid\n"
    );
}

#[test]
fn jobs_lists_every_live_job() {
    let mut f = fixture();
    let first = f.next_pid();
    f.eval("/bin/sleep 10 &");
    let second = f.stopped_job("/bin/cat");

    let before = f.out.text();
    f.eval("jobs");
    let listing = f.out.text()[before.len()..].to_string();
    assert_eq!(
        listing,
        format!(
            "[1] ({first}) Running    /bin/sleep 10 &\n\
             [2] ({second}) Stopped    /bin/cat\n"
        )
    );
}

#[test]
fn jobs_into_a_file() {
    let path = std::env::temp_dir().join(format!("tsh-jobs-{}", std::process::id()));
    let mut f = fixture();
    let pid = f.next_pid();
    f.eval("/bin/sleep 10 &");
    let before = f.out.text();

    f.eval(&format!("jobs > {}", path.display()));
    assert_eq!(f.out.text(), before);
    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        format!("[1] ({pid}) Running    /bin/sleep 10 &\n")
    );
    fs::remove_file(&path).unwrap();
}

#[test]
fn jobs_into_an_unwritable_file() {
    let mut f = fixture();
    f.eval("jobs > /nonexistent-dir/jobs.txt");
    assert!(f.err.text().starts_with("/nonexistent-dir/jobs.txt: "));
}

#[test]
fn full_table_rejects_new_jobs() {
    let mut f = fixture();
    for _ in 0..crate::common::MAX_JOBS {
        f.eval("/bin/sleep 10 &");
    }
    let before = f.shell.jobs().iter().cloned().collect::<Vec<_>>();

    assert_eq!(f.eval("/bin/sleep 10 &"), Flow::Continue);
    assert_eq!(f.err.text(), "Tried to create too many jobs\n");
    assert_eq!(f.shell.host_mut().spawned().len(), crate::common::MAX_JOBS);
    assert_eq!(f.shell.jobs().iter().cloned().collect::<Vec<_>>(), before);
}

#[test]
fn parse_errors_are_reported_and_ignored() {
    let mut f = fixture();
    assert_eq!(f.eval("/bin/echo 'oops"), Flow::Continue);
    assert_eq!(f.eval("/bin/cat >"), Flow::Continue);
    assert_eq!(f.eval(""), Flow::Continue);
    assert_eq!(
        f.err.text(),
        "Error: unmatched '.\nError: must provide file name for redirection\n"
    );
    assert!(f.shell.host_mut().spawned().is_empty());
}

#[test]
fn quit_and_sigquit() {
    // The built-in is a clean exit; only the signal reports itself.
    let mut f = fixture();
    f.stopped_job("/bin/sleep 100");
    let listed = f.out.text();
    assert_eq!(f.eval("quit"), Flow::Exit(0));
    assert_eq!(f.out.text(), listed);
    assert_eq!(f.err.text(), "");

    let mut f = fixture();
    f.script([Notification::Quit]);
    assert_eq!(f.eval("/bin/sleep 100"), Flow::Exit(1));
    assert_eq!(f.out.text(), "Terminating after receipt of SIGQUIT signal\n");
}

#[test]
fn fatal_spawn_failure_propagates() {
    let mut f = fixture();
    f.shell.host_mut().fail_next_spawn(libc::EAGAIN);
    let err = f.shell.eval("/bin/echo").unwrap_err();
    assert!(err.is_fatal());
    assert!(f.shell.jobs().is_empty());
}

#[test]
fn job_references() {
    assert_eq!(JobRef::parse("%3"), Some(JobRef::Job(JobId::new(3))));
    assert_eq!(
        JobRef::parse("1234"),
        Some(JobRef::Process(ProcessId::new(1234)))
    );
    assert_eq!(JobRef::parse("%"), None);
    assert_eq!(JobRef::parse("%-1"), None);
    assert_eq!(JobRef::parse("12ab"), None);
}

#[test]
fn idle_ctrl_c_is_absorbed() {
    let mut f = fixture();
    f.shell
        .host_mut()
        .script_pending([Notification::Keyboard(SIGINT)]);
    assert_eq!(f.shell.drain_notifications().unwrap(), Flow::Continue);

    let pid = f.next_pid();
    f.script([child(pid, ChildChange::Exited(0))]);
    f.eval("/bin/sleep 1");

    assert!(f.shell.host_mut().signals().is_empty());
    assert_eq!(f.out.text(), "");
}

#[test]
fn nothing_pending_is_not_an_error() {
    let mut f = fixture();
    assert_eq!(f.shell.drain_notifications().unwrap(), Flow::Continue);
    assert_eq!(f.out.text(), "");
}
