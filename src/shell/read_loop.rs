use std::os::fd::AsRawFd;

use super::Shell;
use crate::{
    common::{Error, MAX_LINE},
    cutils::was_interrupted,
    exec::{
        event::{EventRegistry, Process, StopReason},
        Flow, Host,
    },
    system::read_raw,
};

const PROMPT: &str = "tsh> ";

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum ReadEvent {
    Input,
    Signal,
}

struct ReadLoop<H: Host, I: AsRawFd> {
    shell: Shell<H>,
    input: I,
    pending: Vec<u8>,
    emit_prompt: bool,
}

/// Read and evaluate command lines from `input` until it ends or the shell is asked to exit.
///
/// While waiting for input, notifications readable from `signals` are applied as they arrive.
pub(crate) fn run<H: Host, I: AsRawFd, S: AsRawFd>(
    shell: Shell<H>,
    input: I,
    signals: &S,
    emit_prompt: bool,
) -> Result<i32, Error> {
    // Signals go first so a poll reporting both sees them before any line is evaluated.
    let mut registry = EventRegistry::new();
    registry.register_read_event(signals, ReadEvent::Signal);
    registry.register_read_event(&input, ReadEvent::Input);

    let mut read_loop = ReadLoop {
        shell,
        input,
        pending: Vec::new(),
        emit_prompt,
    };
    read_loop.prompt();

    match registry.event_loop(&mut read_loop) {
        StopReason::Exit(code) => Ok(code),
        StopReason::Break(err) => Err(err),
    }
}

impl<H: Host, I: AsRawFd> ReadLoop<H, I> {
    fn prompt(&mut self) {
        if self.emit_prompt {
            self.shell.console().prompt(PROMPT);
        }
    }

    fn apply(&mut self, result: Result<Flow, Error>, registry: &mut EventRegistry<Self>) {
        match result {
            Ok(Flow::Continue) => {}
            Ok(Flow::Exit(code)) => registry.set_exit(code),
            Err(err) if err.is_fatal() => registry.set_break(err),
            Err(err) => self.shell.console().complain(format_args!("tsh: {err}")),
        }
    }

    /// Apply what happened since the last line, then evaluate `line`.
    fn evaluate(&mut self, line: &str, registry: &mut EventRegistry<Self>) {
        let drained = self.shell.drain_notifications();
        self.apply(drained, registry);
        if registry.is_stopping() {
            return;
        }

        let result = self.shell.eval(line);
        self.apply(result, registry);
    }

    fn on_input(&mut self, registry: &mut EventRegistry<Self>) {
        let mut chunk = [0u8; MAX_LINE];
        let read = match read_raw(&self.input, &mut chunk) {
            Ok(read) => read,
            Err(err) if was_interrupted(&err) => return,
            Err(err) => {
                registry.set_break(Error::fatal("read error", err));
                return;
            }
        };

        if read == 0 {
            // A last line without a newline still gets evaluated.
            if !self.pending.is_empty() {
                let line = String::from_utf8_lossy(&self.pending).into_owned();
                self.pending.clear();
                self.evaluate(&line, registry);
                if registry.is_stopping() {
                    return;
                }
            }
            self.shell.console().say(format_args!(""));
            registry.set_exit(0);
            return;
        }

        self.pending.extend_from_slice(&chunk[..read]);
        while let Some(newline) = self.pending.iter().position(|&byte| byte == b'\n') {
            let raw: Vec<u8> = self.pending.drain(..=newline).collect();
            let line = String::from_utf8_lossy(&raw[..newline]).into_owned();

            self.evaluate(&line, registry);
            if registry.is_stopping() {
                return;
            }
            self.prompt();
        }
    }
}

impl<H: Host, I: AsRawFd> Process for ReadLoop<H, I> {
    type Event = ReadEvent;
    type Break = Error;
    type Exit = i32;

    fn on_event(&mut self, event: Self::Event, registry: &mut EventRegistry<Self>) {
        match event {
            ReadEvent::Input => self.on_input(registry),
            ReadEvent::Signal => {
                // A foreground wait may have consumed these records already.
                let result = self.shell.drain_notifications();
                self.apply(result, registry);
            }
        }
    }
}
