pub mod client;
pub mod date;
pub mod dispatch;
pub mod entry;
pub mod path;
pub mod retry;
pub mod streaming;
pub mod types;

pub use client::{ClientConfig, WebDavClient};
pub use date::{DateParseError, parse_http_date, parse_http_date_opt};
pub use dispatch::{AttemptOutcome, DavRequest, Dispatcher, validate_status};
pub use entry::{DirectoryEntry, EntryProps, UNIX_DIRECTORY};
pub use path::{Endpoint, Origin, PathContext};
pub use retry::RetryPolicy;
pub use streaming::{
    MultistatusEntries, parse_multistatus, parse_multistatus_bytes, parse_multistatus_bytes_visit,
};
pub use types::{Depth, REDIRECT_CODES, is_redirect};
