use std::{
    env,
    path::{Path, PathBuf},
};

use directories::BaseDirs;

use crate::{cert::Cert, error::Result, invoker};

/// Overrides the directory mkcert keeps its CA in. Passed through to mkcert
/// untouched.
pub const CAROOT_ENV: &str = "CAROOT";
/// Restricts which trust stores mkcert inspects and updates ("system", "nss",
/// "java"). Passed through to mkcert untouched.
pub const TRUST_STORES_ENV: &str = "TRUST_STORES";

/// What to ask mkcert for.
///
/// ```no_run
/// let cert = mkcert::Config::new(["localhost", "::1", "127.0.0.1"])
///     .require_trust(true)
///     .exec()?;
/// # Ok::<(), mkcert::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub(crate) program: PathBuf,
    pub(crate) domains: Vec<String>,
    pub(crate) directory: Option<PathBuf>,
    pub(crate) cert_file: Option<PathBuf>,
    pub(crate) key_file: Option<PathBuf>,
    pub(crate) require_trust: bool,
}

impl Config {
    pub fn new<I, S>(domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Config {
            program: PathBuf::from("mkcert"),
            domains: domains.into_iter().map(Into::into).collect(),
            directory: None,
            cert_file: None,
            key_file: None,
            require_trust: false,
        }
    }

    /// Working directory of mkcert. Relative `cert_file`/`key_file` overrides
    /// and the paths mkcert reports are relative to it. Defaults to the
    /// current directory.
    pub fn directory(mut self, path: impl Into<PathBuf>) -> Self {
        self.directory = Some(path.into());
        self
    }

    /// Overrides the location of the generated certificate.
    pub fn cert_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.cert_file = Some(path.into());
        self
    }

    /// Overrides the location of the generated private key.
    pub fn key_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.key_file = Some(path.into());
        self
    }

    /// Makes [`exec`](Config::exec) return [`Error::Untrusted`](crate::Error::Untrusted)
    /// when the CA isn't in the trust stores.
    pub fn require_trust(mut self, req: bool) -> Self {
        self.require_trust = req;
        self
    }

    /// The mkcert executable. Defaults to `mkcert` looked up on `PATH`.
    pub fn program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    pub fn domains(&self) -> &[String] {
        &self.domains
    }

    pub fn working_dir(&self) -> Option<&Path> {
        self.directory.as_deref()
    }

    pub fn exec(&self) -> Result<Cert> {
        invoker::exec(self)
    }
}

/// Where mkcert keeps its CA when nothing else says otherwise: `$CAROOT`, or
/// `mkcert` under the platform data directory.
pub fn default_ca_root() -> Option<PathBuf> {
    match env::var_os(CAROOT_ENV) {
        Some(dir) if !dir.is_empty() => Some(PathBuf::from(dir)),
        _ => BaseDirs::new().map(|dirs| dirs.data_dir().join("mkcert")),
    }
}
