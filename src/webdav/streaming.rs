//! Multistatus (`207`) parsing into [`DirectoryEntry`] values.
//!
//! Parsing is event driven and lazy: [`parse_multistatus`] returns an iterator that
//! pulls XML events only as far as needed for the next entry. Calling it again on the
//! same body starts over. Tag names are matched on their local part, case-insensitively,
//! so any namespace prefix works.

use std::collections::HashSet;

use quick_xml::Reader;
use quick_xml::escape::{resolve_predefined_entity, unescape};
use quick_xml::events::Event;
use tracing::debug;

use crate::common::error::DavError;
use crate::webdav::entry::{DirectoryEntry, EntryProps};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ElementName {
    Multistatus,
    Response,
    Propstat,
    Prop,
    Href,
    Status,
    Creationdate,
    Displayname,
    Getcontentlength,
    Getcontenttype,
    Getetag,
    Getlastmodified,
    Resourcetype,
    Collection,
    Other,
}

pub(crate) fn element_from_bytes(raw: &[u8]) -> ElementName {
    let local = match raw.iter().position(|b| *b == b':') {
        Some(idx) => &raw[idx + 1..],
        None => raw,
    };

    if local.eq_ignore_ascii_case(b"multistatus") {
        ElementName::Multistatus
    } else if local.eq_ignore_ascii_case(b"response") {
        ElementName::Response
    } else if local.eq_ignore_ascii_case(b"propstat") {
        ElementName::Propstat
    } else if local.eq_ignore_ascii_case(b"prop") {
        ElementName::Prop
    } else if local.eq_ignore_ascii_case(b"href") {
        ElementName::Href
    } else if local.eq_ignore_ascii_case(b"status") {
        ElementName::Status
    } else if local.eq_ignore_ascii_case(b"creationdate") {
        ElementName::Creationdate
    } else if local.eq_ignore_ascii_case(b"displayname") {
        ElementName::Displayname
    } else if local.eq_ignore_ascii_case(b"getcontentlength") {
        ElementName::Getcontentlength
    } else if local.eq_ignore_ascii_case(b"getcontenttype") {
        ElementName::Getcontenttype
    } else if local.eq_ignore_ascii_case(b"getetag") {
        ElementName::Getetag
    } else if local.eq_ignore_ascii_case(b"getlastmodified") {
        ElementName::Getlastmodified
    } else if local.eq_ignore_ascii_case(b"resourcetype") {
        ElementName::Resourcetype
    } else if local.eq_ignore_ascii_case(b"collection") {
        ElementName::Collection
    } else {
        ElementName::Other
    }
}

pub(crate) fn path_ends_with<T: PartialEq>(stack: &[T], needle: &[T]) -> bool {
    stack.len() >= needle.len() && stack[stack.len() - needle.len()..] == needle[..]
}

/// True when `status` contains `200` as a whole word.
pub(crate) fn status_is_ok(status: &str) -> bool {
    status
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .any(|token| token == "200")
}

/// Per-`response` state machine fed with XML events.
#[derive(Default)]
struct ResponseParser {
    stack: Vec<ElementName>,
    text: String,
    saw_root: bool,
    href: String,
    status: String,
    candidate: EntryProps,
    selected: Option<EntryProps>,
}

impl ResponseParser {
    fn on_start(&mut self, raw: &[u8]) {
        let element = element_from_bytes(raw);
        self.stack.push(element);
        self.saw_root = true;
        self.text.clear();

        match element {
            ElementName::Response if self.stack.len() <= 2 => {
                self.href.clear();
                self.selected = None;
            }
            ElementName::Propstat => {
                self.status.clear();
                self.candidate = EntryProps::default();
            }
            ElementName::Collection => {
                if self.path_ends_with(&[
                    ElementName::Response,
                    ElementName::Propstat,
                    ElementName::Prop,
                    ElementName::Resourcetype,
                    ElementName::Collection,
                ]) {
                    self.candidate.is_collection = true;
                }
            }
            _ => {}
        }
    }

    fn on_text(&mut self, text: &str) {
        self.text.push_str(text);
    }

    /// Returns `(href, props)` when a `response` element closes with a usable href and
    /// a `200` propstat.
    fn on_end(&mut self, raw: &[u8]) -> Option<(String, EntryProps)> {
        let element = element_from_bytes(raw);
        let text = std::mem::take(&mut self.text);
        let value = text.trim();
        let mut finished = None;

        if self.path_ends_with(&[ElementName::Response, ElementName::Href]) {
            self.href = value.to_string();
        } else if self.path_ends_with(&[
            ElementName::Response,
            ElementName::Propstat,
            ElementName::Status,
        ]) {
            self.status = value.to_string();
        } else if self.path_ends_with(&[ElementName::Response, ElementName::Propstat]) {
            if self.selected.is_none() && status_is_ok(&self.status) {
                self.selected = Some(std::mem::take(&mut self.candidate));
            }
        } else if self.path_ends_with(&[ElementName::Response])
            && element == ElementName::Response
        {
            let href = std::mem::take(&mut self.href);
            if let Some(props) = self.selected.take()
                && !href.is_empty()
            {
                finished = Some((href, props));
            }
        } else if self.prop_value_ends_with(ElementName::Creationdate) {
            self.candidate.creation_date = value.to_string();
        } else if self.prop_value_ends_with(ElementName::Displayname) {
            self.candidate.display_name = Some(value.to_string());
        } else if self.prop_value_ends_with(ElementName::Getcontentlength) {
            self.candidate.content_length = value.to_string();
        } else if self.prop_value_ends_with(ElementName::Getcontenttype) {
            self.candidate.content_type = value.to_string();
        } else if self.prop_value_ends_with(ElementName::Getetag) {
            self.candidate.etag = Some(value.to_string());
        } else if self.prop_value_ends_with(ElementName::Getlastmodified) {
            self.candidate.last_modified = value.to_string();
        }

        self.stack.pop();
        finished
    }

    fn prop_value_ends_with(&self, element: ElementName) -> bool {
        self.path_ends_with(&[
            ElementName::Response,
            ElementName::Propstat,
            ElementName::Prop,
            element,
        ])
    }

    fn path_ends_with(&self, needle: &[ElementName]) -> bool {
        path_ends_with(&self.stack, needle)
    }
}

/// Lazy iterator over the entries of one multistatus body.
///
/// Entries come out in document order. A second `response` with an href already
/// produced by this iterator is dropped. After an XML error the iterator yields that
/// error once and then ends.
pub struct MultistatusEntries<'a> {
    reader: Reader<&'a [u8]>,
    parser: ResponseParser,
    root_path: String,
    seen: HashSet<String>,
    finished: bool,
}

impl<'a> MultistatusEntries<'a> {
    fn new(body: &'a [u8], root_path: &str) -> Self {
        let mut reader = Reader::from_reader(body);
        reader.config_mut().trim_text(false);
        Self {
            reader,
            parser: ResponseParser::default(),
            root_path: root_path.to_string(),
            seen: HashSet::new(),
            finished: false,
        }
    }

    fn fail(&mut self, message: String) -> Option<Result<DirectoryEntry, DavError>> {
        self.finished = true;
        Some(Err(DavError::Xml(message)))
    }

    fn accept(&mut self, href: String, props: EntryProps) -> Option<DirectoryEntry> {
        let decoded = decode_href(&href);
        if !self.seen.insert(decoded.clone()) {
            debug!(href = %decoded, "dropping duplicate multistatus response");
            return None;
        }
        Some(DirectoryEntry::new(
            EntryProps {
                href: decoded,
                ..props
            },
            self.root_path.clone(),
        ))
    }
}

impl Iterator for MultistatusEntries<'_> {
    type Item = Result<DirectoryEntry, DavError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        loop {
            let event = match self.reader.read_event() {
                Ok(event) => event,
                Err(e) => {
                    let position = self.reader.buffer_position();
                    return self.fail(format!("{e} at byte {position}"));
                }
            };

            let finished = match event {
                Event::Start(e) => {
                    self.parser.on_start(e.name().as_ref());
                    None
                }
                Event::Empty(e) => {
                    self.parser.on_start(e.name().as_ref());
                    self.parser.on_end(e.name().as_ref())
                }
                Event::Text(e) => match decode_text(e.as_ref()) {
                    Ok(text) => {
                        self.parser.on_text(&text);
                        None
                    }
                    Err(message) => return self.fail(message),
                },
                Event::CData(e) => {
                    self.parser.on_text(&String::from_utf8_lossy(e.as_ref()));
                    None
                }
                Event::GeneralRef(e) => {
                    let name = String::from_utf8_lossy(&e).into_owned();
                    match resolve_reference(&name) {
                        Some(resolved) => {
                            self.parser.on_text(&resolved);
                            None
                        }
                        None => return self.fail(format!("unknown entity reference &{name};")),
                    }
                }
                Event::End(e) => self.parser.on_end(e.name().as_ref()),
                Event::Eof => {
                    self.finished = true;
                    if !self.parser.saw_root {
                        return self.fail("document has no root element".to_string());
                    }
                    if !self.parser.stack.is_empty() {
                        return self.fail("unexpected end of document".to_string());
                    }
                    return None;
                }
                _ => None,
            };

            if let Some((href, props)) = finished
                && let Some(entry) = self.accept(href, props)
            {
                return Some(Ok(entry));
            }
        }
    }
}

/// Parse a multistatus body lazily. `root_path` is stripped from every href.
pub fn parse_multistatus<'a>(body: &'a [u8], root_path: &str) -> MultistatusEntries<'a> {
    MultistatusEntries::new(body, root_path)
}

/// Parse a whole multistatus body, failing on the first XML error.
pub fn parse_multistatus_bytes(
    body: &[u8],
    root_path: &str,
) -> Result<Vec<DirectoryEntry>, DavError> {
    parse_multistatus(body, root_path).collect()
}

/// Parse a multistatus body and hand each entry to `on_entry`.
pub fn parse_multistatus_bytes_visit<F>(
    body: &[u8],
    root_path: &str,
    mut on_entry: F,
) -> Result<(), DavError>
where
    F: FnMut(DirectoryEntry) -> Result<(), DavError>,
{
    for entry in parse_multistatus(body, root_path) {
        on_entry(entry?)?;
    }
    Ok(())
}

pub fn decode_text(raw: &[u8]) -> Result<String, String> {
    match std::str::from_utf8(raw) {
        Ok(s) => Ok(unescape(s)
            .map_err(|err| format!("XML decode error: {err}"))?
            .into_owned()),
        Err(_) => Ok(String::from_utf8_lossy(raw).into_owned()),
    }
}

fn resolve_reference(name: &str) -> Option<String> {
    if let Some(code) = name.strip_prefix('#') {
        let value = match code.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => code.parse().ok()?,
        };
        return char::from_u32(value).map(String::from);
    }
    resolve_predefined_entity(name).map(str::to_string)
}

fn decode_href(href: &str) -> String {
    match urlencoding::decode(href) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => String::from_utf8_lossy(&urlencoding::decode_binary(href.as_bytes())).into_owned(),
    }
}
