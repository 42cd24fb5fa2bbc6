//! Directory entries built from multistatus responses.
//!
//! Raw property strings are kept exactly as the server sent them. Everything a caller
//! usually wants (kind, size, timestamps, name parts) is derived once at construction
//! and never re-validated afterwards.

use std::hash::{Hash, Hasher};

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::webdav::date::parse_http_date_opt;

/// Content type some servers report for collections instead of a `resourcetype`.
pub const UNIX_DIRECTORY: &str = "httpd/unix-directory";

/// Property strings of one resource, as received.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct EntryProps {
    /// Percent-decoded href.
    pub href: String,
    pub content_type: String,
    pub display_name: Option<String>,
    pub etag: Option<String>,
    pub is_collection: bool,
    pub content_length: String,
    pub creation_date: String,
    pub last_modified: String,
}

/// One WebDAV resource (file or collection).
///
/// Two entries are equal when both carry the same etag, or otherwise when all of
/// their raw properties match. The root path never takes part in equality.
#[derive(Debug, Clone)]
pub struct DirectoryEntry {
    props: EntryProps,
    root_path: String,
    href: String,
    is_dir: bool,
    bytes: u64,
    dirname: String,
    basename: String,
    ext: String,
    name_without_ext: String,
    created: DateTime<Utc>,
    modified: DateTime<Utc>,
}

impl DirectoryEntry {
    pub fn new(mut props: EntryProps, root_path: impl Into<String>) -> Self {
        let root_path = root_path.into();
        props.etag = props.etag.filter(|e| !e.is_empty());

        let href = strip_root(&props.href, &root_path);
        let is_dir = props.is_collection
            || href.ends_with('/')
            || props.content_type.eq_ignore_ascii_case(UNIX_DIRECTORY);
        let bytes = if is_dir {
            0
        } else {
            props.content_length.trim().parse().unwrap_or(0)
        };

        let (dirname, basename) = split_name(&href);
        let (stem, ext) = split_ext(&basename);
        let (name_without_ext, ext) = (stem.to_string(), ext.to_string());

        let created =
            parse_timestamp(&props.creation_date).unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
        let modified = parse_http_date_opt(props.last_modified.trim()).unwrap_or(created);

        Self {
            root_path,
            href,
            is_dir,
            bytes,
            name_without_ext,
            ext,
            dirname,
            basename,
            created,
            modified,
            props,
        }
    }

    pub fn props(&self) -> &EntryProps {
        &self.props
    }

    /// The decoded href exactly as the server reported it.
    pub fn raw_href(&self) -> &str {
        &self.props.href
    }

    pub fn root_path(&self) -> &str {
        &self.root_path
    }

    /// Href with the root path stripped.
    pub fn href(&self) -> &str {
        &self.href
    }

    pub fn is_dir(&self) -> bool {
        self.is_dir
    }

    /// Size in bytes; zero for collections and unparseable lengths.
    pub fn bytes(&self) -> u64 {
        self.bytes
    }

    pub fn dirname(&self) -> &str {
        &self.dirname
    }

    pub fn basename(&self) -> &str {
        &self.basename
    }

    /// Extension including the dot, or empty.
    pub fn ext(&self) -> &str {
        &self.ext
    }

    pub fn name_without_ext(&self) -> &str {
        &self.name_without_ext
    }

    /// Display name when the server sent a non-empty one, otherwise the basename.
    pub fn name(&self) -> &str {
        match self.props.display_name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => &self.basename,
        }
    }

    pub fn display_name(&self) -> Option<&str> {
        self.props.display_name.as_deref()
    }

    pub fn content_type(&self) -> &str {
        &self.props.content_type
    }

    pub fn etag(&self) -> Option<&str> {
        self.props.etag.as_deref()
    }

    pub fn has_etag(&self) -> bool {
        self.props.etag.is_some()
    }

    /// Creation time, or the Unix epoch when absent or unparseable.
    pub fn created(&self) -> DateTime<Utc> {
        self.created
    }

    /// Last modification time, falling back to [`created`](Self::created).
    pub fn modified(&self) -> DateTime<Utc> {
        self.modified
    }
}

impl PartialEq for DirectoryEntry {
    fn eq(&self, other: &Self) -> bool {
        match (self.etag(), other.etag()) {
            (Some(a), Some(b)) => a == b,
            _ => self.props == other.props,
        }
    }
}

impl Eq for DirectoryEntry {}

impl Hash for DirectoryEntry {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self.etag() {
            Some(etag) => etag.hash(state),
            None => self.props.hash(state),
        }
    }
}

fn strip_root(raw: &str, root: &str) -> String {
    let root = root.trim_end_matches('/');
    if root.is_empty() {
        return raw.to_string();
    }
    match raw.strip_prefix(root) {
        Some("") => "/".to_string(),
        Some(rest) if rest.starts_with('/') => rest.to_string(),
        _ => raw.to_string(),
    }
}

/// POSIX-style `(dirname, basename)`, ignoring a trailing separator.
fn split_name(href: &str) -> (String, String) {
    let trimmed = href.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(0) => ("/".to_string(), trimmed[1..].to_string()),
        Some(idx) => (trimmed[..idx].to_string(), trimmed[idx + 1..].to_string()),
        None if href.starts_with('/') => ("/".to_string(), String::new()),
        None => (String::new(), trimmed.to_string()),
    }
}

/// `("archive.tar", ".gz")` for `archive.tar.gz`; leading dots never start an extension.
fn split_ext(basename: &str) -> (&str, &str) {
    let leading_dots = basename.len() - basename.trim_start_matches('.').len();
    match basename.rfind('.') {
        Some(idx) if idx > 0 && idx >= leading_dots => (&basename[..idx], &basename[idx..]),
        _ => (basename, ""),
    }
}

/// Lenient timestamp parsing for `creationdate` (RFC 3339 / ISO 8601, RFC 2822).
fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    DateTime::parse_from_rfc3339(text)
        .or_else(|_| DateTime::parse_from_rfc2822(text))
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|naive| naive.and_utc())
        })
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
                .map(|naive| naive.and_utc())
        })
}
