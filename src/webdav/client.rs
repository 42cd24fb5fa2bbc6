use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as B64;
use bytes::Bytes;
use hyper::body::Incoming;
use hyper::{HeaderMap, Method, Response, header};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt};
use tokio::time::Duration;
use tracing::{debug, instrument};

use crate::common::compression::{decode_stream, detect_encodings};
use crate::common::error::DavError;
use crate::common::http::build_hyper_client;
use crate::webdav::dispatch::{DavRequest, Dispatcher};
use crate::webdav::entry::DirectoryEntry;
use crate::webdav::path::{Endpoint, PathContext};
use crate::webdav::retry::RetryPolicy;
use crate::webdav::streaming::parse_multistatus;
use crate::webdav::types::{Depth, expect};

const PROPFIND_BODY: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<D:propfind xmlns:D="DAV:">
  <D:prop>
    <D:creationdate/>
    <D:displayname/>
    <D:getcontentlength/>
    <D:getcontenttype/>
    <D:getetag/>
    <D:getlastmodified/>
    <D:resourcetype/>
  </D:prop>
</D:propfind>"#;

/// Client settings. `Default` matches what [`WebDavClient::new`] uses.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Per-request timeout, applied to every attempt and redirect hop.
    pub timeout: Duration,
    pub retry: RetryPolicy,
    /// Entries skipped at the front of a depth-1 listing (the collection itself).
    pub list_skip: usize,
    pub user_agent: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(20),
            retry: RetryPolicy::default(),
            list_skip: 1,
            user_agent: Some(concat!("fast-webdav-rs/", env!("CARGO_PKG_VERSION")).to_string()),
        }
    }
}

/// WebDAV client with a client-side working directory.
///
/// Relative paths resolve against [`pwd`](Self::pwd). Operations that change the
/// working directory take `&mut self`, so they cannot race with requests that read it;
/// clone the client (clones share the connection pool) to traverse concurrently.
#[derive(Clone)]
pub struct WebDavClient {
    dispatcher: Dispatcher,
    context: PathContext,
    list_skip: usize,
}

impl WebDavClient {
    /// Create a new client from a **base URL** and optional **Basic** credentials.
    ///
    /// The base may be `https://` **or** `http://`.
    pub fn new(
        base_url: &str,
        basic_user: Option<&str>,
        basic_pass: Option<&str>,
    ) -> Result<Self, DavError> {
        Self::with_config(base_url, basic_user, basic_pass, ClientConfig::default())
    }

    pub fn with_config(
        base_url: &str,
        basic_user: Option<&str>,
        basic_pass: Option<&str>,
        config: ClientConfig,
    ) -> Result<Self, DavError> {
        let endpoint = Endpoint::parse(base_url)?;

        let auth_header = match (basic_user, basic_pass) {
            (Some(u), Some(p)) => {
                let token = B64.encode(format!("{u}:{p}"));
                Some(header_value(&format!("Basic {token}"))?)
            }
            _ => None,
        };
        let user_agent = config
            .user_agent
            .as_deref()
            .map(header_value)
            .transpose()?;

        let dispatcher = Dispatcher::new(
            build_hyper_client(),
            endpoint,
            auth_header,
            user_agent,
            config.timeout,
            config.retry,
        );

        Ok(Self {
            dispatcher,
            context: PathContext::root(),
            list_skip: config.list_skip,
        })
    }

    pub fn endpoint(&self) -> &Endpoint {
        self.dispatcher.endpoint()
    }

    pub fn context(&self) -> &PathContext {
        &self.context
    }

    /// Current working directory, always ending in `/`.
    pub fn pwd(&self) -> &str {
        self.context.cwd()
    }

    /// Change the working directory. The target is not checked on the server.
    pub fn cd(&mut self, path: &str) {
        self.context = self.context.change_directory(path);
        debug!(cwd = self.context.cwd(), "changed directory");
    }

    /// Resolve `path` to the absolute URL a request would use.
    pub fn resolve(&self, path: &str) -> Result<hyper::Uri, DavError> {
        self.endpoint().resolve(&self.context, path)
    }

    /// Generic **aggregated send**: any verb, validated against `expected`.
    pub async fn send(&self, req: DavRequest<'_>) -> Result<Response<Bytes>, DavError> {
        self.dispatcher.execute(&self.context, &req).await
    }

    // ----------- Collections -----------

    /// `MKCOL`. With `exist_ok`, a `405` (already mapped) counts as success.
    #[instrument(skip(self), fields(cwd = self.context.cwd()))]
    pub async fn mkdir(&self, path: &str, exist_ok: bool) -> Result<(), DavError> {
        let expected = if exist_ok {
            expect::MKCOL_EXIST_OK
        } else {
            expect::MKCOL
        };
        self.send(DavRequest::new(mkcol()?, path, expected)).await?;
        Ok(())
    }

    /// Create every collection along `path`.
    ///
    /// Each segment is attempted whether or not the previous one succeeded, and
    /// per-segment failures are not reported: an existing collection and a real
    /// error look the same here. The working directory is not changed.
    #[instrument(skip(self), fields(cwd = self.context.cwd()))]
    pub async fn mkdirs(&self, path: &str) {
        let mut walk = if path.trim().starts_with('/') {
            PathContext::root()
        } else {
            self.context.clone()
        };

        for segment in path.split('/').map(str::trim).filter(|s| !s.is_empty()) {
            let req = match mkcol() {
                Ok(method) => DavRequest::new(method, segment, expect::MKCOL_EXIST_OK),
                Err(_) => return,
            };
            if let Err(err) = self.dispatcher.execute(&walk, &req).await {
                debug!(segment, cwd = walk.cwd(), error = %err, "ignoring mkdirs segment failure");
            }
            walk = walk.change_directory(segment);
        }
    }

    /// `DELETE` on a collection. With `missing_ok`, a `404` counts as success.
    #[instrument(skip(self), fields(cwd = self.context.cwd()))]
    pub async fn rmdir(&self, path: &str, missing_ok: bool) -> Result<(), DavError> {
        let expected = if missing_ok {
            expect::RMDIR_MISSING_OK
        } else {
            expect::RMDIR
        };
        self.send(DavRequest::new(Method::DELETE, path, expected))
            .await?;
        Ok(())
    }

    /// `DELETE` on any resource.
    #[instrument(skip(self), fields(cwd = self.context.cwd()))]
    pub async fn delete(&self, path: &str) -> Result<(), DavError> {
        self.send(DavRequest::new(Method::DELETE, path, expect::DELETE))
            .await?;
        Ok(())
    }

    // ----------- Listings -----------

    /// `PROPFIND` with the given depth.
    ///
    /// Depth 0 yields at most the resource itself. Depth 1 yields every parsed entry
    /// after the first `skip`, which is applied client-side.
    #[instrument(skip(self), fields(cwd = self.context.cwd()))]
    pub async fn list_with(
        &self,
        path: &str,
        depth: Depth,
        skip: usize,
    ) -> Result<Vec<DirectoryEntry>, DavError> {
        let req = DavRequest::new(propfind()?, path, expect::PROPFIND)
            .header("Depth", header::HeaderValue::from_static(depth.as_str()))
            .header(
                "Content-Type",
                header::HeaderValue::from_static("application/xml; charset=utf-8"),
            )
            .body(Bytes::from_static(PROPFIND_BODY.as_bytes()));
        let resp = self.send(req).await?;

        // Parse the whole body first so a malformed tail is never hidden by the skip.
        let entries = parse_multistatus(resp.body(), self.endpoint().base_path())
            .collect::<Result<Vec<_>, _>>()?;
        let out: Vec<_> = match depth {
            Depth::Zero => entries.into_iter().take(1).collect(),
            Depth::One => entries.into_iter().skip(skip).collect(),
        };
        debug!(count = out.len(), "listed entries");
        Ok(out)
    }

    /// Children of the collection at `path`.
    pub async fn list(&self, path: &str) -> Result<Vec<DirectoryEntry>, DavError> {
        self.list_with(path, Depth::One, self.list_skip).await
    }

    /// The resource at `path` itself, if the server reported it.
    pub async fn stat(&self, path: &str) -> Result<Option<DirectoryEntry>, DavError> {
        Ok(self
            .list_with(path, Depth::Zero, 0)
            .await?
            .into_iter()
            .next())
    }

    // ----------- Content -----------

    /// `PUT` `body` to `path`.
    #[instrument(skip(self, body), fields(cwd = self.context.cwd(), len = body.len()))]
    pub async fn upload(&self, path: &str, body: Bytes) -> Result<(), DavError> {
        self.send(DavRequest::new(Method::PUT, path, expect::PUT).body(body))
            .await?;
        Ok(())
    }

    /// `PUT` the contents of the local file `local` to `remote`.
    pub async fn upload_file(&self, local: impl AsRef<Path>, remote: &str) -> Result<(), DavError> {
        let local = local.as_ref();
        let data = tokio::fs::read(local).await.map_err(|source| DavError::Io {
            path: local.display().to_string(),
            source,
        })?;
        self.upload(remote, Bytes::from(data)).await
    }

    /// `GET` `path` and return the decoded body.
    #[instrument(skip(self), fields(cwd = self.context.cwd()))]
    pub async fn download(&self, path: &str) -> Result<Bytes, DavError> {
        let resp = self
            .send(DavRequest::new(Method::GET, path, expect::GET))
            .await?;
        Ok(resp.into_body())
    }

    /// `GET` `remote` and stream the decoded body into the local file `local`.
    ///
    /// Returns the number of bytes written. A body that fails mid-stream is retried
    /// like any other transport failure; the partial file is removed before the
    /// next attempt and after the last one.
    #[instrument(skip(self, local), fields(cwd = self.context.cwd()))]
    pub async fn download_to_file(
        &self,
        remote: &str,
        local: impl AsRef<Path>,
    ) -> Result<u64, DavError> {
        let local = local.as_ref();
        let req = DavRequest::new(Method::GET, remote, expect::GET);
        let written = self
            .dispatcher
            .execute_with(&self.context, &req, |resp| async move {
                let result = write_body(resp, local).await;
                if result.is_err()
                    && let Err(err) = tokio::fs::remove_file(local).await
                    && err.kind() != std::io::ErrorKind::NotFound
                {
                    debug!(path = %local.display(), error = %err, "could not remove partial download");
                }
                result
            })
            .await?;
        debug!(written, path = %local.display(), "download complete");
        Ok(written)
    }

    /// Extract the `ETag` from a response header map, if present.
    pub fn etag_from_headers(headers: &HeaderMap) -> Option<String> {
        headers
            .get(header::ETAG)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string())
    }
}

/// Copy a decoded response body into a new file at `local`.
///
/// Body read failures surface as [`DavError::Body`], local failures as [`DavError::Io`].
async fn write_body(resp: Response<Incoming>, local: &Path) -> Result<u64, DavError> {
    let io_err = |source| DavError::Io {
        path: local.display().to_string(),
        source,
    };

    let encodings = detect_encodings(resp.headers());
    let mut reader = decode_stream(resp.into_body(), &encodings);
    let mut file = tokio::fs::File::create(local).await.map_err(io_err)?;

    let mut written = 0u64;
    loop {
        let chunk = reader.fill_buf().await.map_err(DavError::Body)?;
        if chunk.is_empty() {
            break;
        }
        let len = chunk.len();
        file.write_all(chunk).await.map_err(io_err)?;
        reader.consume(len);
        written += len as u64;
    }
    file.flush().await.map_err(io_err)?;
    Ok(written)
}

fn header_value(value: &str) -> Result<header::HeaderValue, DavError> {
    header::HeaderValue::from_str(value).map_err(|e| DavError::Request(e.into()))
}

fn mkcol() -> Result<Method, DavError> {
    Method::from_bytes(b"MKCOL").map_err(|e| DavError::Request(e.into()))
}

fn propfind() -> Result<Method, DavError> {
    Method::from_bytes(b"PROPFIND").map_err(|e| DavError::Request(e.into()))
}
