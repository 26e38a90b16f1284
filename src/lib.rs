//! Wraps the mkcert CLI (<https://github.com/FiloSottile/mkcert>) to obtain
//! locally-trusted certificates for local services. mkcert's output is parsed
//! to find the certificate file locations and whether its CA is trusted.
//!
//! The CA used and the trust stores considered are controlled with the
//! `CAROOT` and `TRUST_STORES` environment variables, which are passed through
//! to mkcert as-is. See `mkcert -help`.
//!
//! ```no_run
//! use mkcert::{Config, Error};
//!
//! match Config::new(["localhost"]).require_trust(true).exec() {
//!     Ok(cert) => println!("{}", cert.file().display()),
//!     Err(Error::Untrusted { cert }) => {
//!         eprintln!("usable, but run mkcert -install: {}", cert.file().display())
//!     }
//!     Err(e) => eprintln!("{}", e),
//! }
//! ```

mod cert;
mod config;
mod error;
mod invoker;
pub mod parser;

pub use cert::Cert;
pub use config::{default_ca_root, Config, CAROOT_ENV, TRUST_STORES_ENV};
pub use error::{Error, ErrorExt, PrettyErr, Result};
pub use invoker::{exec, exec_with};
