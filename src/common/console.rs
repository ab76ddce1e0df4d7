use std::{
    fmt,
    io::{self, Write},
};

/// Where the shell talks to the user.
///
/// Failing to write a message is not an error the shell can do anything about, so write errors
/// are dropped here.
pub struct Console {
    out: Box<dyn Write>,
    err: Box<dyn Write>,
}

impl Console {
    pub fn new(out: impl Write + 'static, err: impl Write + 'static) -> Self {
        Self {
            out: Box::new(out),
            err: Box::new(err),
        }
    }

    pub fn stdio() -> Self {
        Self::new(io::stdout(), io::stderr())
    }

    pub fn out(&mut self) -> &mut dyn Write {
        &mut *self.out
    }

    /// Write one line to standard output.
    pub fn say(&mut self, args: fmt::Arguments) {
        let _ = writeln!(self.out, "{args}");
        let _ = self.out.flush();
    }

    /// Write one line to standard error.
    pub fn complain(&mut self, args: fmt::Arguments) {
        let _ = writeln!(self.err, "{args}");
        let _ = self.err.flush();
    }

    /// Write `text` to standard output as is, without a trailing newline.
    pub fn prompt(&mut self, text: &str) {
        let _ = self.out.write_all(text.as_bytes());
        let _ = self.out.flush();
    }
}
