use std::{fmt, io};

use crate::jobs::TableError;

#[derive(Debug)]
pub enum Error {
    /// The execution environment is broken; the shell cannot go on.
    Fatal {
        context: &'static str,
        source: io::Error,
    },
    /// The job table refused an operation.
    Table(TableError),
    Io(io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Fatal { context, source } => write!(f, "{context}: {source}"),
            Error::Table(e) => write!(f, "{e}"),
            Error::Io(e) => write!(f, "IO error: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Fatal { source, .. } => Some(source),
            Error::Table(_) => None,
            Error::Io(e) => Some(e),
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<TableError> for Error {
    fn from(err: TableError) -> Self {
        Error::Table(err)
    }
}

impl Error {
    pub fn fatal(context: &'static str, source: io::Error) -> Self {
        Self::Fatal { context, source }
    }

    /// Returns `true` if the error must bring the whole shell down.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal { .. })
    }
}
