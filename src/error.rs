use std::{error::Error as StdError, fmt, io, process::ExitStatus};

use thiserror::Error;

use crate::cert::Cert;

pub type Result<T> = std::result::Result<T, Error>;

/// mkcert invocation error
#[derive(Debug, Error)]
pub enum Error {
    /// No domains were requested. mkcert is not invoked.
    #[error("mkcert: no domains specified")]
    NoDomains,
    #[error("mkcert: failed to run {program}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("mkcert: {}: {}", .status, .stderr.trim_end())]
    Process { status: ExitStatus, stderr: String },
    /// mkcert succeeded and the files are usable, but its CA is missing from
    /// the trust stores and trust was required.
    #[error("mkcert: CA at {} not trusted, run mkcert -install", .cert.ca_root)]
    Untrusted { cert: Box<Cert> },
}

impl Error {
    /// The certificate that was still generated, if this error is the
    /// degraded-success case.
    pub fn cert(&self) -> Option<&Cert> {
        match self {
            Error::Untrusted { cert } => Some(&**cert),
            _ => None,
        }
    }

    pub fn into_cert(self) -> Option<Cert> {
        match self {
            Error::Untrusted { cert } => Some(*cert),
            _ => None,
        }
    }

    /// Captured stderr of a failed mkcert run.
    pub fn stderr(&self) -> Option<&str> {
        match self {
            Error::Process { stderr, .. } => Some(stderr),
            _ => None,
        }
    }
}

/// Renders an error followed by its whole chain of causes on one line.
pub struct PrettyErr<'a>(&'a (dyn StdError + 'static));

impl<'a> fmt::Display for PrettyErr<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)?;
        let mut x: &dyn StdError = self.0;
        while let Some(cause) = x.source() {
            f.write_str(": ")?;
            fmt::Display::fmt(&cause, f)?;
            x = cause;
        }
        Ok(())
    }
}

pub trait ErrorExt {
    fn pretty(&self) -> PrettyErr<'_>;
}

impl ErrorExt for Error {
    fn pretty(&self) -> PrettyErr<'_> {
        PrettyErr(self)
    }
}

impl ErrorExt for anyhow::Error {
    fn pretty(&self) -> PrettyErr<'_> {
        PrettyErr(&**self)
    }
}
