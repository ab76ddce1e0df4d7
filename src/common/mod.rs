#![forbid(unsafe_code)]
pub use console::Console;
pub use error::Error;

pub mod console;
pub mod error;

/// Maximum number of jobs alive at the same time.
pub const MAX_JOBS: usize = 16;
/// Maximum length of a command line, in bytes. Longer lines are truncated.
pub const MAX_LINE: usize = 1024;
/// Maximum number of arguments on a command line.
pub const MAX_ARGS: usize = 128;
