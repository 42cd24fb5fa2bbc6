//! Response body decoding for HTTP content encoding.
//!
//! Every request advertises `br, zstd, gzip`; bodies that come back encoded are
//! decoded before they reach the validator or the multistatus parser.

use async_compression::tokio::bufread::{BrotliDecoder, GzipDecoder, ZstdDecoder};
use bytes::Bytes;
use futures_util::TryStreamExt;
use http_body_util::BodyStream;
use hyper::body::Incoming;
use hyper::{HeaderMap, header};
use tokio::io::{AsyncBufRead, AsyncReadExt, BufReader};
use tokio_util::io::StreamReader;

/// Encodings the client can undo on a response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentEncoding {
    Identity,
    Br,
    Gzip,
    Zstd,
}

impl ContentEncoding {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentEncoding::Identity => "identity",
            ContentEncoding::Br => "br",
            ContentEncoding::Gzip => "gzip",
            ContentEncoding::Zstd => "zstd",
        }
    }
}

/// Read the `Content-Encoding` chain in the order the encodings were applied. Empty means identity.
pub fn detect_encodings(headers: &HeaderMap) -> Vec<ContentEncoding> {
    let Some(raw) = headers
        .get(header::CONTENT_ENCODING)
        .and_then(|v| v.to_str().ok())
    else {
        return Vec::new();
    };

    raw.split(',')
        .filter_map(|token| match token.trim().to_ascii_lowercase().as_str() {
            "br" => Some(ContentEncoding::Br),
            "gzip" | "x-gzip" => Some(ContentEncoding::Gzip),
            "zstd" | "zst" => Some(ContentEncoding::Zstd),
            _ => None,
        })
        .collect()
}

/// Insert `Accept-Encoding: br, zstd, gzip` unless the caller already chose one.
pub fn add_accept_encoding(headers: &mut HeaderMap) {
    if !headers.contains_key(header::ACCEPT_ENCODING) {
        headers.insert(
            header::ACCEPT_ENCODING,
            header::HeaderValue::from_static("br, zstd, gzip"),
        );
    }
}

/// Wrap a streaming body in the decoders for `encodings`, undoing the last-applied one first.
pub fn decode_stream(
    body: Incoming,
    encodings: &[ContentEncoding],
) -> Box<dyn AsyncBufRead + Unpin + Send> {
    let stream = BodyStream::new(body)
        .map_ok(|frame| frame.into_data().unwrap_or_default())
        .map_err(std::io::Error::other);
    let mut reader: Box<dyn AsyncBufRead + Unpin + Send> =
        Box::new(BufReader::new(StreamReader::new(stream)));

    for encoding in encodings.iter().rev() {
        reader = match encoding {
            ContentEncoding::Identity => reader,
            ContentEncoding::Br => Box::new(BufReader::new(BrotliDecoder::new(reader))),
            ContentEncoding::Gzip => Box::new(BufReader::new(GzipDecoder::new(reader))),
            ContentEncoding::Zstd => Box::new(BufReader::new(ZstdDecoder::new(reader))),
        };
    }
    reader
}

/// Aggregate and decode a response body.
pub async fn decode_body(body: Incoming, encodings: &[ContentEncoding]) -> std::io::Result<Bytes> {
    let mut reader = decode_stream(body, encodings);
    let mut out = Vec::with_capacity(16 * 1024);
    reader.read_to_end(&mut out).await?;
    Ok(Bytes::from(out))
}

/// Drop `Content-Encoding` and fix `Content-Length` once a body has been decoded.
pub fn normalize_decoded_headers(
    headers: &mut HeaderMap,
    encodings: &[ContentEncoding],
    body_len: usize,
) {
    if encodings.is_empty() {
        return;
    }

    headers.remove(header::CONTENT_ENCODING);
    match header::HeaderValue::from_str(&body_len.to_string()) {
        Ok(value) => {
            headers.insert(header::CONTENT_LENGTH, value);
        }
        Err(_) => {
            headers.remove(header::CONTENT_LENGTH);
        }
    }
}
