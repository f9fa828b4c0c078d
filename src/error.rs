use std::io;

use thiserror::Error;

/// Errors produced while computing an fs-verity measurement.
///
/// All failures surface to the caller as-is; nothing is retried internally and no partial
/// digest is ever returned. Buffers and hash contexts are dropped on every exit path.
#[derive(Debug, Error)]
pub enum Error {
    /// Parameter validation failed, the hash algorithm id is unknown, or an internal
    /// tree-sizing invariant did not hold. The message names the offending field and value.
    #[error("{0}")]
    InvalidArgument(String),

    /// An allocation for a block buffer, padded salt, or digest failed.
    #[error("out of memory")]
    OutOfMemory,

    /// The data source returned an error, or ended before `file_size` bytes were produced.
    #[error("error reading file")]
    Io(#[source] io::Error),
}

impl Error {
    /// Builds an [`Error::InvalidArgument`], mirroring the diagnostic onto the `log` error
    /// channel the way `libfsverity` reports through its error callback.
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        let msg = msg.into();
        log::error!("{msg}");
        Error::InvalidArgument(msg)
    }

    /// The conventional negative errno value for this error, for callers bridging into
    /// errno-style interfaces.
    ///
    /// [`InvalidArgument`](Error::InvalidArgument) maps to `-EINVAL`,
    /// [`OutOfMemory`](Error::OutOfMemory) to `-ENOMEM`, and [`Io`](Error::Io) to the
    /// negated OS error of the underlying failure (`-EIO` when there is none, e.g. for a
    /// source that ended early).
    pub fn errno(&self) -> i32 {
        match self {
            Error::InvalidArgument(_) => -22, // EINVAL
            Error::OutOfMemory => -12,        // ENOMEM
            Error::Io(err) => err.raw_os_error().map(|e| -e).unwrap_or(-5), // EIO
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errno_mapping() {
        assert_eq!(Error::invalid("nope").errno(), -22);
        assert_eq!(Error::OutOfMemory.errno(), -12);
        assert_eq!(Error::Io(io::Error::from_raw_os_error(13)).errno(), -13);
        let eof = io::Error::new(io::ErrorKind::UnexpectedEof, "early end");
        assert_eq!(Error::Io(eof).errno(), -5);
    }

    #[test]
    fn io_display_is_fixed() {
        let err = Error::Io(io::Error::from_raw_os_error(5));
        assert_eq!(err.to_string(), "error reading file");
    }
}
