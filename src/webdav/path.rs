//! Virtual working directory and request URL resolution.
//!
//! [`PathContext`] is an immutable value: changing directory returns a new context.
//! [`Endpoint`] combines the base URL, a context and a caller path into the absolute
//! request URI. Neither normalizes `.` or `..`; those reach the server as literal
//! segments.

use std::fmt;

use hyper::Uri;

use crate::common::error::DavError;

const SEP: char = '/';

/// The client-side current directory. Always starts and ends with `/` and never
/// contains empty segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathContext {
    cwd: String,
}

impl Default for PathContext {
    fn default() -> Self {
        Self::root()
    }
}

impl PathContext {
    pub fn root() -> Self {
        Self {
            cwd: SEP.to_string(),
        }
    }

    pub fn cwd(&self) -> &str {
        &self.cwd
    }

    pub fn is_root(&self) -> bool {
        self.cwd.len() == 1
    }

    /// Return the context reached by changing into `path`.
    ///
    /// Whitespace is trimmed and empty input leaves the context unchanged. Absolute
    /// input replaces the working directory, relative input is appended to it. No
    /// existence check is made against the server.
    pub fn change_directory(&self, path: &str) -> PathContext {
        let trimmed = path.trim();
        if trimmed.is_empty() {
            return self.clone();
        }

        let normalized = normalize_dir(trimmed);
        if normalized.len() == 1 {
            return Self::root();
        }

        if trimmed.starts_with(SEP) {
            Self { cwd: normalized }
        } else {
            Self {
                cwd: format!("{}{}", self.cwd, &normalized[1..]),
            }
        }
    }
}

impl fmt::Display for PathContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.cwd)
    }
}

/// Split on `/`, drop empty segments and rejoin as `/a/b/`.
fn normalize_dir(path: &str) -> String {
    let mut out = String::with_capacity(path.len() + 2);
    out.push(SEP);
    for segment in path.split(SEP).filter(|s| !s.is_empty()) {
        out.push_str(segment);
        out.push(SEP);
    }
    out
}

/// Scheme, host and port of a URL. Redirects may not cross it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    scheme: String,
    host: String,
    port: u16,
}

impl Origin {
    /// Origin of `uri`, or `None` when it carries no scheme or host.
    pub fn of(uri: &Uri) -> Option<Origin> {
        let scheme = uri.scheme_str()?.to_ascii_lowercase();
        let host = uri.host()?.to_ascii_lowercase();
        let port = uri.port_u16().unwrap_or(match scheme.as_str() {
            "https" => 443,
            _ => 80,
        });
        Some(Origin { scheme, host, port })
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}:{}", self.scheme, self.host, self.port)
    }
}

/// The server base URL every request path is resolved against.
#[derive(Debug, Clone)]
pub struct Endpoint {
    scheme: String,
    authority: String,
    base_path: String,
    origin: Origin,
}

impl Endpoint {
    pub fn parse(base_url: &str) -> Result<Self, DavError> {
        let invalid = |reason: &str| DavError::InvalidUri {
            uri: base_url.to_string(),
            reason: reason.to_string(),
        };

        let uri: Uri = base_url
            .parse()
            .map_err(|e: hyper::http::uri::InvalidUri| invalid(&e.to_string()))?;
        let scheme = uri
            .scheme_str()
            .ok_or_else(|| invalid("missing scheme"))?
            .to_ascii_lowercase();
        if scheme != "http" && scheme != "https" {
            return Err(invalid("scheme must be http or https"));
        }
        let authority = uri
            .authority()
            .ok_or_else(|| invalid("missing host"))?
            .to_string();
        let origin = Origin::of(&uri).ok_or_else(|| invalid("missing host"))?;
        let base_path = uri.path().trim_end_matches(SEP).to_string();

        Ok(Self {
            scheme,
            authority,
            base_path,
            origin,
        })
    }

    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    /// Path of the base URL without a trailing `/`; empty when the base is the server root.
    ///
    /// Listings strip this prefix from hrefs.
    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// Absolute request URI for `path` under `ctx`.
    ///
    /// A leading `/` makes `path` relative to the endpoint root; otherwise it is
    /// appended verbatim to the working directory.
    pub fn resolve(&self, ctx: &PathContext, path: &str) -> Result<Uri, DavError> {
        let virtual_path = if path.starts_with(SEP) {
            path.to_string()
        } else {
            format!("{}{}", ctx.cwd(), path)
        };
        self.build(&virtual_path)
    }

    /// Request URI for a same-origin redirect target.
    ///
    /// `location_path` is the (percent-encoded) path of the `Location` header. When it
    /// already lies under the base path it addresses that resource directly; otherwise
    /// it is treated like any caller-supplied path.
    pub fn resolve_location(&self, ctx: &PathContext, location_path: &str) -> Result<Uri, DavError> {
        let decoded = urlencoding::decode(location_path)
            .map(|c| c.into_owned())
            .unwrap_or_else(|_| location_path.to_string());

        if !self.base_path.is_empty()
            && let Some(rest) = decoded.strip_prefix(&self.base_path)
            && (rest.is_empty() || rest.starts_with(SEP))
        {
            let rest = if rest.is_empty() { "/" } else { rest };
            return self.build(rest);
        }
        self.resolve(ctx, &decoded)
    }

    fn build(&self, virtual_path: &str) -> Result<Uri, DavError> {
        let full = format!(
            "{}://{}{}{}",
            self.scheme,
            self.authority,
            self.base_path,
            encode_path(virtual_path)
        );
        full.parse().map_err(|e: hyper::http::uri::InvalidUri| DavError::InvalidUri {
            uri: full.clone(),
            reason: e.to_string(),
        })
    }
}

/// Percent-encode each segment, keeping the `/` separators.
fn encode_path(path: &str) -> String {
    path.split(SEP)
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}
