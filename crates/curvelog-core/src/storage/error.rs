use std::{io, path::PathBuf};

use snafu::{Backtrace, prelude::*};

/// Filesystem failures, classified by what the commit protocol needs to
/// tell apart: a missing file means "version 0", a taken file means another
/// writer got there first.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum StorageError {
    /// The file does not exist.
    #[snafu(display("{} does not exist", path.display()))]
    NotFound {
        /// Absolute path that was read.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
        /// Failure site.
        backtrace: Backtrace,
    },

    /// A create-new write found the file already there.
    #[snafu(display("{} already exists", path.display()))]
    AlreadyExists {
        /// Absolute path that was created.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
        /// Failure site.
        backtrace: Backtrace,
    },

    /// Any other filesystem failure.
    #[snafu(display("I/O error at {}: {}", path.display(), source))]
    Io {
        /// Absolute path being accessed.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
        /// Failure site.
        backtrace: Backtrace,
    },
}
