use bytes::Bytes;
use http_body_util::Full;
use hyper_rustls::HttpsConnectorBuilder;
use hyper_util::client::legacy::{Client, connect::HttpConnector};
use hyper_util::rt::TokioExecutor;

/// Type alias for the Hyper client shared by every request a [`WebDavClient`](crate::WebDavClient) makes.
///
/// The legacy hyper-util client never follows redirects on its own; the dispatcher
/// relies on that to enforce its redirect bound and origin check.
pub type HyperClient = Client<hyper_rustls::HttpsConnector<HttpConnector>, Full<Bytes>>;

/// Build a Hyper client with HTTP/1.1 + HTTP/2, connection pooling, and a TLS connector
/// that prefers native roots but falls back to the bundled WebPKI store.
pub fn build_hyper_client() -> HyperClient {
    let https_builder = HttpsConnectorBuilder::new()
        .with_native_roots()
        .unwrap_or_else(|err| {
            tracing::debug!(error = %err, "native roots unavailable, using webpki roots");
            HttpsConnectorBuilder::new().with_webpki_roots()
        });

    let https = https_builder
        .https_or_http()
        .enable_http1()
        .enable_http2()
        .build();

    Client::builder(TokioExecutor::new())
        .pool_max_idle_per_host(32)
        .build::<_, Full<Bytes>>(https)
}
