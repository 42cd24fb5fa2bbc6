use fast_webdav_rs::ContentEncoding;
use fast_webdav_rs::common::compression::{
    add_accept_encoding, detect_encodings, normalize_decoded_headers,
};
use hyper::HeaderMap;
use hyper::header::{ACCEPT_ENCODING, CONTENT_ENCODING, CONTENT_LENGTH, HeaderValue};

#[test]
fn content_encoding_as_str() {
    assert_eq!(ContentEncoding::Identity.as_str(), "identity");
    assert_eq!(ContentEncoding::Br.as_str(), "br");
    assert_eq!(ContentEncoding::Gzip.as_str(), "gzip");
    assert_eq!(ContentEncoding::Zstd.as_str(), "zstd");
}

#[test]
fn no_header_means_identity() {
    assert!(detect_encodings(&HeaderMap::new()).is_empty());
}

#[test]
fn detects_chained_encodings_in_order() {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_ENCODING, HeaderValue::from_static("GZIP, zst, deflate, br"));
    assert_eq!(
        detect_encodings(&headers),
        vec![
            ContentEncoding::Gzip,
            ContentEncoding::Zstd,
            ContentEncoding::Br
        ]
    );
}

#[test]
fn accept_encoding_is_added_once() {
    let mut headers = HeaderMap::new();
    add_accept_encoding(&mut headers);
    assert_eq!(headers[ACCEPT_ENCODING], "br, zstd, gzip");

    let mut custom = HeaderMap::new();
    custom.insert(ACCEPT_ENCODING, HeaderValue::from_static("identity"));
    add_accept_encoding(&mut custom);
    assert_eq!(custom[ACCEPT_ENCODING], "identity");
}

#[test]
fn normalize_rewrites_length_after_decoding() {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_ENCODING, HeaderValue::from_static("gzip"));
    headers.insert(CONTENT_LENGTH, HeaderValue::from_static("31"));

    normalize_decoded_headers(&mut headers, &[ContentEncoding::Gzip], 120);
    assert!(headers.get(CONTENT_ENCODING).is_none());
    assert_eq!(headers[CONTENT_LENGTH], "120");
}

#[test]
fn normalize_leaves_identity_responses_alone() {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_LENGTH, HeaderValue::from_static("31"));
    normalize_decoded_headers(&mut headers, &[], 120);
    assert_eq!(headers[CONTENT_LENGTH], "31");
}
