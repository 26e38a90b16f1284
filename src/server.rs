use std::{convert::Infallible, fs, path::Path, sync::Arc};

use anyhow::{Context, Result};
use futures::TryFutureExt;
use http::{Request, Response, StatusCode};
use hyper::{server::conn::Http, service::service_fn, Body};
use rustls::{
    pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer},
    ServerConfig,
};
use tokio::{net::TcpListener, runtime::Builder};
use tokio_rustls::TlsAcceptor;
use tracing::{debug, error, info, info_span};
use tracing_futures::Instrument as _;

use crate::files::Handler;
use mkcert::ErrorExt;

/// Loads the certificate chain and key mkcert wrote. PEM unless the file has
/// a `.der` extension.
pub(crate) fn load_tls(cert_path: &Path, key_path: &Path) -> Result<ServerConfig> {
    let key = fs::read(key_path).context("failed to read private key")?;
    let key = if key_path.extension().map_or(false, |x| x == "der") {
        PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(key))
    } else {
        rustls_pemfile::private_key(&mut &*key)
            .context("malformed private key")?
            .context("no private key found")?
    };
    let cert_chain = fs::read(cert_path).context("failed to read certificate chain")?;
    let cert_chain = if cert_path.extension().map_or(false, |x| x == "der") {
        vec![CertificateDer::from(cert_chain)]
    } else {
        rustls_pemfile::certs(&mut &*cert_chain)
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("malformed certificate chain")?
    };

    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let mut config = ServerConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()?
        .with_no_client_auth()
        .with_single_cert(cert_chain, key)
        .context("invalid certificate or key")?;
    config.alpn_protocols = vec![b"http/1.1".to_vec()];
    Ok(config)
}

pub(crate) fn serve<H>(handler: H, tls: ServerConfig, listen: &str) -> Result<()>
where
    H: Handler + Send + Sync + 'static,
{
    let runtime = Builder::new_multi_thread().enable_all().build()?;
    let acceptor = TlsAcceptor::from(Arc::new(tls));
    runtime.block_on(accept_loop(Arc::new(handler), acceptor, listen))
}

async fn accept_loop<H>(handler: Arc<H>, acceptor: TlsAcceptor, listen: &str) -> Result<()>
where
    H: Handler + Send + Sync + 'static,
{
    let listener = TcpListener::bind(listen)
        .await
        .with_context(|| format!("failed to bind {}", listen))?;
    info!("listening on {}", listener.local_addr()?);

    loop {
        let (stream, remote) = match listener.accept().await {
            Ok(conn) => conn,
            Err(e) => {
                error!("accept failed: {reason}", reason = e.to_string());
                continue;
            }
        };
        let span = info_span!("connection", remote = %remote);
        tokio::spawn(
            handle_connection(handler.clone(), acceptor.clone(), stream)
                .unwrap_or_else(move |e| error!("connection failed: {reason}", reason = e.pretty()))
                .instrument(span),
        );
    }
}

async fn handle_connection<H>(
    handler: Arc<H>,
    acceptor: TlsAcceptor,
    stream: tokio::net::TcpStream,
) -> Result<()>
where
    H: Handler + Send + Sync + 'static,
{
    let tls = acceptor.accept(stream).await.context("TLS handshake failed")?;
    debug!("established");

    let service = service_fn(move |req| {
        let handler = handler.clone();
        async move { Ok::<_, Infallible>(respond(&*handler, req).await) }
    });
    Http::new()
        .http1_only(true)
        .serve_connection(tls, service)
        .await?;
    debug!("connection closed");
    Ok(())
}

async fn respond<H>(handler: &H, req: Request<Body>) -> Response<Body>
where
    H: Handler + ?Sized,
{
    let method = req.method().clone();
    let path = req.uri().path().to_owned();
    match handler.handle(req).await {
        Ok(resp) => {
            info!(%method, %path, status = resp.status().as_u16(), "request");
            resp
        }
        Err(e) => {
            error!(%method, %path, "failed: {reason}", reason = e.pretty());
            let mut resp = Response::new(Body::from("500 internal server error\n"));
            *resp.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
            resp
        }
    }
}
