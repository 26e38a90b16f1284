use std::{
    ffi::OsString,
    path::PathBuf,
    process::{Command, Output},
};

use tracing::{debug, warn};

use crate::{
    cert::Cert,
    config::Config,
    error::{Error, Result},
    parser::{MkcertOutput, OutputParser},
};

/// Runs mkcert as described by `config` and parses what it printed.
///
/// Blocks until mkcert exits. On [`Error::Untrusted`] the certificate was
/// still written and is available from the error.
pub fn exec(config: &Config) -> Result<Cert> {
    exec_with(config, &MkcertOutput)
}

/// Like [`exec`], with a different strategy for reading mkcert's output.
pub fn exec_with<P: OutputParser + ?Sized>(config: &Config, parser: &P) -> Result<Cert> {
    if config.domains.is_empty() {
        return Err(Error::NoDomains);
    }

    let out = run(config)?;
    let parsed = parser.parse(&out);
    let mut cert = Cert {
        ca_root: parsed.ca_root,
        trusted: parsed.trusted,
        domains: config.domains.clone(),
        file: PathBuf::from(parsed.cert_file),
        key_file: PathBuf::from(parsed.key_file),
    };
    if let Some(dir) = &config.directory {
        cert = cert.relative_to(dir);
    }

    if !cert.trusted {
        warn!(ca_root = %cert.ca_root, "mkcert CA is not installed in the trust stores");
        if config.require_trust {
            return Err(Error::Untrusted {
                cert: Box::new(cert),
            });
        }
    }
    Ok(cert)
}

/// The arguments mkcert is given, after the program name.
pub(crate) fn args(config: &Config) -> Vec<OsString> {
    let mut args = Vec::with_capacity(config.domains.len() + 4);
    if let Some(path) = &config.cert_file {
        args.push("-cert-file".into());
        args.push(path.into());
    }
    if let Some(path) = &config.key_file {
        args.push("-key-file".into());
        args.push(path.into());
    }
    args.extend(config.domains.iter().map(OsString::from));
    args
}

/// Runs mkcert to completion and returns stdout followed by stderr.
fn run(config: &Config) -> Result<Vec<u8>> {
    let args = args(config);
    let mut cmd = Command::new(&config.program);
    cmd.args(&args);
    if let Some(dir) = &config.directory {
        cmd.current_dir(dir);
    }
    debug!(program = %config.program.display(), ?args, dir = ?config.directory, "running mkcert");

    let Output {
        status,
        stdout,
        stderr,
    } = cmd.output().map_err(|source| Error::Spawn {
        program: config.program.display().to_string(),
        source,
    })?;
    if !status.success() {
        return Err(Error::Process {
            status,
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
        });
    }

    let mut combined = stdout;
    combined.extend_from_slice(&stderr);
    debug!(len = combined.len(), "mkcert finished");
    Ok(combined)
}
