use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use structopt::StructOpt;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use mkcert::{Config, ErrorExt};

mod files;
mod server;

/// Exit status when mkcert's CA is missing from the trust stores.
const EXIT_UNTRUSTED: i32 = 2;

#[derive(StructOpt, Debug)]
#[structopt(name = "httpsdir", about = "Serve a directory over HTTPS with an mkcert certificate")]
struct Opt {
    /// Address to listen on
    #[structopt(short = "b", long = "bind", default_value = "localhost:12345")]
    bind: String,
    /// Directory to serve
    #[structopt(parse(from_os_str), short = "r", long = "root", default_value = ".")]
    root: PathBuf,
    /// Domains the certificate is generated for
    #[structopt(
        short = "d",
        long = "domain",
        default_value = "localhost",
        number_of_values = 1
    )]
    domains: Vec<String>,
    /// Where mkcert writes the certificate, relative to its temp directory
    #[structopt(parse(from_os_str), long = "cert-file")]
    cert_file: Option<PathBuf>,
    /// Where mkcert writes the private key, relative to its temp directory
    #[structopt(parse(from_os_str), long = "key-file")]
    key_file: Option<PathBuf>,
    /// Serve even if mkcert's CA is not installed in the trust stores
    #[structopt(long = "allow-untrusted")]
    allow_untrusted: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let opt = Opt::from_args();
    let code = match run(opt) {
        Ok(()) => 0,
        Err(e) => {
            error!("{}", e.pretty());
            exit_code(&e)
        }
    };
    ::std::process::exit(code);
}

/// mkcert's stderr is already part of a process error's message.
fn exit_code(e: &anyhow::Error) -> i32 {
    match e.downcast_ref::<mkcert::Error>() {
        Some(mkcert::Error::Untrusted { .. }) => EXIT_UNTRUSTED,
        _ => 1,
    }
}

fn run(options: Opt) -> Result<()> {
    if !options.root.is_dir() {
        bail!("{} is not a directory", options.root.display());
    }

    // Removed, along with the certificate, when we return.
    let dir = tempfile::Builder::new()
        .prefix("mkcert")
        .tempdir()
        .context("failed to create certificate directory")?;

    let mut config = Config::new(options.domains)
        .directory(dir.path())
        .require_trust(!options.allow_untrusted);
    if let Some(path) = options.cert_file {
        config = config.cert_file(path);
    }
    if let Some(path) = options.key_file {
        config = config.key_file(path);
    }
    let cert = config.exec().context("failed to obtain certificate")?;

    if !cert.trusted() {
        warn!("browsers will not trust this certificate, run mkcert -install");
    }
    if cert.ca_root().is_empty() {
        if let Some(ca_root) = mkcert::default_ca_root() {
            debug!(ca_root = %ca_root.display(), "mkcert did not report its CA, expecting the default");
        }
    }
    info!(?cert, "using certificate");
    info!("✨ https://{}/ ✨", options.bind);

    let tls = server::load_tls(cert.file(), cert.key_file())?;
    server::serve(files::StaticDir::new(options.root), tls, &options.bind)
}
