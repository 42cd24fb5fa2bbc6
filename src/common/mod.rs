//! Transport-level concerns shared by the WebDAV layer.

pub mod compression;
pub mod error;
pub mod http;
