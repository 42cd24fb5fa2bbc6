//! Fast WebDAV client library for Rust.
//!
//! This library provides an asynchronous WebDAV client built on hyper 1.x, rustls and
//! tokio. Requests resolve against a client-side working directory, follow same-origin
//! redirects up to a bound, retry transient failures with backoff, and check every
//! response against the status codes its operation expects.
//!
//! # Features
//!
//! - HTTP/2 and connection pooling
//! - Automatic response decompression (br/zstd/gzip)
//! - Virtual working directory (`cd` / `pwd`) with relative and absolute paths
//! - Bounded redirects that never leave the endpoint origin
//! - Whole-operation retries with exponential backoff
//! - Lazy, namespace-agnostic multistatus parsing into [`DirectoryEntry`] values
//! - Strict `getlastmodified` date parsing with weekday validation
//!
//! # Examples
//!
//! ## Listing a collection
//!
//! ```no_run
//! use fast_webdav_rs::WebDavClient;
//! use anyhow::Result;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let mut client = WebDavClient::new(
//!         "https://dav.example.com/remote.php/webdav",
//!         Some("username"),
//!         Some("password"),
//!     )?;
//!
//!     client.cd("Documents/reports");
//!     for entry in client.list("").await? {
//!         println!(
//!             "{:>10} {} {}",
//!             entry.bytes(),
//!             entry.modified(),
//!             entry.name()
//!         );
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Uploading, downloading and cleaning up
//!
//! ```no_run
//! use fast_webdav_rs::WebDavClient;
//! use bytes::Bytes;
//! use anyhow::Result;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let client = WebDavClient::new("https://dav.example.com/files", None, None)?;
//!
//!     client.mkdirs("/backups/2024/01").await;
//!     client
//!         .upload("/backups/2024/01/notes.txt", Bytes::from_static(b"hello"))
//!         .await?;
//!
//!     let body = client.download("/backups/2024/01/notes.txt").await?;
//!     assert_eq!(&body[..], b"hello");
//!
//!     client.delete("/backups/2024/01/notes.txt").await?;
//!     client.rmdir("/backups/2024/01/", true).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Tuning retries and redirects
//!
//! ```no_run
//! use std::time::Duration;
//! use fast_webdav_rs::{ClientConfig, RetryPolicy, WebDavClient};
//!
//! # fn main() -> Result<(), fast_webdav_rs::DavError> {
//! let config = ClientConfig {
//!     timeout: Duration::from_secs(10),
//!     retry: RetryPolicy::new(3, 2)
//!         .with_delays(Duration::from_millis(100), Duration::from_secs(2))
//!         .with_jitter(Duration::from_millis(50)),
//!     ..ClientConfig::default()
//! };
//! let client = WebDavClient::with_config("https://dav.example.com/", None, None, config)?;
//! # let _ = client;
//! # Ok(())
//! # }
//! ```
//!
//! ## Handling failures
//!
//! Every operation returns [`DavError`]. Status problems carry an
//! [`OperationFailure`] with the verb, the caller's path and the expected codes:
//!
//! ```no_run
//! use fast_webdav_rs::{DavError, FailureCause, WebDavClient};
//!
//! # async fn run(client: WebDavClient) {
//! match client.delete("missing.txt").await {
//!     Ok(()) => {}
//!     Err(DavError::Operation(failure)) if failure.cause == FailureCause::RedirectOriginChange => {
//!         eprintln!("server tried to send us elsewhere: {failure}");
//!     }
//!     Err(err) => eprintln!("delete failed with status {:?}: {err}", err.status()),
//! }
//! # }
//! ```
//!
//! ## Parsing a multistatus body directly
//!
//! ```
//! use fast_webdav_rs::parse_multistatus_bytes;
//!
//! let xml = br#"<?xml version="1.0"?>
//! <d:multistatus xmlns:d="DAV:">
//!   <d:response>
//!     <d:href>/files/a%20b.txt</d:href>
//!     <d:propstat>
//!       <d:prop><d:getcontentlength>12</d:getcontentlength></d:prop>
//!       <d:status>HTTP/1.1 200 OK</d:status>
//!     </d:propstat>
//!   </d:response>
//! </d:multistatus>"#;
//!
//! let entries = parse_multistatus_bytes(xml, "/files").unwrap();
//! assert_eq!(entries[0].href(), "/a b.txt");
//! assert_eq!(entries[0].bytes(), 12);
//! ```

pub mod common;
pub mod webdav;

pub use common::compression::ContentEncoding;
pub use common::error::{DavError, FailureCause, OperationFailure};
pub use webdav::{
    AttemptOutcome, ClientConfig, DateParseError, DavRequest, Depth, DirectoryEntry, Endpoint,
    EntryProps, MultistatusEntries, Origin, PathContext, REDIRECT_CODES, RetryPolicy,
    UNIX_DIRECTORY, WebDavClient, is_redirect, parse_http_date, parse_http_date_opt, parse_multistatus,
    parse_multistatus_bytes, parse_multistatus_bytes_visit, validate_status,
};
