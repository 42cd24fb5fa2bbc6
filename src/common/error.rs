//! Error types shared by every WebDAV operation.
//!
//! [`DavError`] is what public operations return. Status-related failures carry an
//! [`OperationFailure`] with enough request context (verb, path, expected codes) to be
//! logged or matched on by callers.

use std::collections::BTreeSet;
use std::fmt;

use hyper::Method;
use thiserror::Error;

use crate::webdav::date::DateParseError;

/// Why an operation was rejected after a response came back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureCause {
    /// The final status code was not in the expected set.
    OperationFailed,
    /// A redirect response carried no usable `Location` header.
    RedirectWithoutLocation,
    /// A redirect pointed at a different scheme, host or port.
    RedirectOriginChange,
}

impl FailureCause {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureCause::OperationFailed => "operation failed",
            FailureCause::RedirectWithoutLocation => "redirect with no location",
            FailureCause::RedirectOriginChange => "redirect origin change",
        }
    }
}

impl fmt::Display for FailureCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A response that did not satisfy the operation's status contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationFailure {
    pub cause: FailureCause,
    pub status: u16,
    pub method: Method,
    pub path: String,
    pub expected: BTreeSet<u16>,
}

impl OperationFailure {
    pub fn new(
        cause: FailureCause,
        status: u16,
        method: Method,
        path: impl Into<String>,
        expected: &[u16],
    ) -> Self {
        Self {
            cause,
            status,
            method,
            path: path.into(),
            expected: expected.iter().copied().collect(),
        }
    }

    /// True when the status that triggered this failure is a redirect code.
    pub fn is_redirect(&self) -> bool {
        crate::webdav::types::is_redirect(self.status)
    }
}

impl fmt::Display for OperationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} {} returned {} (expected one of {:?})",
            self.cause, self.method, self.path, self.status, self.expected
        )
    }
}

impl std::error::Error for OperationFailure {}

/// Errors returned by [`WebDavClient`](crate::WebDavClient) operations.
#[derive(Debug, Error)]
pub enum DavError {
    #[error(transparent)]
    Operation(#[from] OperationFailure),

    #[error("transport error on {method} {url}: {source}")]
    Transport {
        method: Method,
        url: String,
        #[source]
        source: hyper_util::client::legacy::Error,
    },

    #[error("{method} {url} timed out")]
    Timeout { method: Method, url: String },

    #[error("invalid request URI {uri}: {reason}")]
    InvalidUri { uri: String, reason: String },

    #[error("failed to build request: {0}")]
    Request(#[from] hyper::http::Error),

    #[error("failed to read response body: {0}")]
    Body(#[source] std::io::Error),

    #[error("malformed multistatus body: {0}")]
    Xml(String),

    #[error("local storage error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Date(#[from] DateParseError),
}

impl DavError {
    /// The structured status failure, if this error carries one.
    pub fn operation(&self) -> Option<&OperationFailure> {
        match self {
            DavError::Operation(failure) => Some(failure),
            _ => None,
        }
    }

    /// Status code of the response that caused the failure, if any.
    pub fn status(&self) -> Option<u16> {
        self.operation().map(|f| f.status)
    }

    /// Whether the outer attempt loop may repeat the operation after this error.
    ///
    /// Redirect failures already exhausted their own bound, and request-construction
    /// problems will not change on a second try.
    pub fn is_retryable(&self) -> bool {
        match self {
            DavError::Operation(failure) => !failure.is_redirect(),
            DavError::Transport { .. } | DavError::Timeout { .. } | DavError::Body(_) => true,
            DavError::InvalidUri { .. }
            | DavError::Request(_)
            | DavError::Xml(_)
            | DavError::Io { .. }
            | DavError::Date(_) => false,
        }
    }
}
