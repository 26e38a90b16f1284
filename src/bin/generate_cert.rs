use std::fs;

use anyhow::{Context, Result};
use tracing::warn;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    fs::create_dir_all("certs").context("failed to create certificate directory")?;
    let cert = mkcert::Config::new(["localhost", "127.0.0.1", "::1"])
        .directory("certs")
        .exec()
        .context("failed to generate certificate")?;
    if !cert.trusted() {
        warn!(ca_root = %cert.ca_root(), "CA is not trusted, run mkcert -install");
    }
    println!("certificate: {}", cert.file().display());
    println!("private key: {}", cert.key_file().display());
    Ok(())
}
