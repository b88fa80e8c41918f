//! XML response bodies as a nested value tree
//!
//! Conversion rules:
//! - the root element's own name is dropped, its content is the value
//! - an element holding only text becomes `Text`, whitespace included
//! - an element with child elements becomes `Map`; text mixed in with
//!   children is dropped
//! - sibling elements sharing a name collapse into a `List`
//! - an empty element becomes an empty `Map`
//! - attributes (including `xmlns`) are ignored, CDATA counts as text

use quick_xml::events::Event;
use quick_xml::Reader;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::oss::error::{OssError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum XmlValue {
    Text(String),
    Map(BTreeMap<String, XmlValue>),
    List(Vec<XmlValue>),
}

impl Default for XmlValue {
    fn default() -> Self {
        XmlValue::Map(BTreeMap::new())
    }
}

impl XmlValue {
    /// Child value by element name
    pub fn get(&self, key: &str) -> Option<&XmlValue> {
        match self {
            XmlValue::Map(map) => map.get(key),
            _ => None,
        }
    }

    /// Text of a child element
    pub fn text(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(XmlValue::as_str)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            XmlValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, XmlValue>> {
        match self {
            XmlValue::Map(map) => Some(map),
            _ => None,
        }
    }

    /// View as a list; a single value is a one-element list
    pub fn as_list(&self) -> &[XmlValue] {
        match self {
            XmlValue::List(items) => items,
            other => std::slice::from_ref(other),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            XmlValue::Text(s) => s.is_empty(),
            XmlValue::Map(map) => map.is_empty(),
            XmlValue::List(items) => items.is_empty(),
        }
    }
}

/// Element being read: collected children and text so far
struct Frame {
    name: String,
    children: Vec<(String, XmlValue)>,
    text: String,
}

impl Frame {
    fn new(name: String) -> Self {
        Self {
            name,
            children: Vec::new(),
            text: String::new(),
        }
    }

    fn into_value(self) -> (String, XmlValue) {
        if self.children.is_empty() {
            let value = if self.text.is_empty() {
                XmlValue::default()
            } else {
                XmlValue::Text(self.text)
            };
            return (self.name, value);
        }

        let mut map: BTreeMap<String, XmlValue> = BTreeMap::new();
        for (name, value) in self.children {
            match map.remove(&name) {
                None => {
                    map.insert(name, value);
                }
                Some(XmlValue::List(mut items)) => {
                    items.push(value);
                    map.insert(name, XmlValue::List(items));
                }
                Some(existing) => {
                    map.insert(name, XmlValue::List(vec![existing, value]));
                }
            }
        }
        (self.name, XmlValue::Map(map))
    }
}

/// Parse an XML document into an [`XmlValue`].
///
/// Empty (or whitespace-only) input is an empty `Map`, not an error.
pub fn parse(xml_data: &[u8]) -> Result<XmlValue> {
    // Leaf text is kept verbatim: object keys may begin or end with spaces.
    let mut reader = Reader::from_reader(xml_data);

    let mut stack: Vec<Frame> = Vec::with_capacity(8);
    let mut root: Option<XmlValue> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                stack.push(Frame::new(name));
            }
            Ok(Event::Empty(e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                match stack.last_mut() {
                    Some(parent) => parent.children.push((name, XmlValue::default())),
                    None => root = Some(XmlValue::default()),
                }
            }
            Ok(Event::Text(e)) => {
                if let Some(frame) = stack.last_mut() {
                    frame.text.push_str(&e.unescape()?);
                }
            }
            Ok(Event::CData(e)) => {
                if let Some(frame) = stack.last_mut() {
                    frame.text.push_str(&String::from_utf8_lossy(&e.into_inner()));
                }
            }
            Ok(Event::End(_)) => {
                let frame = stack
                    .pop()
                    .ok_or_else(|| OssError::XmlParse("unexpected closing tag".to_string()))?;
                let (name, value) = frame.into_value();
                match stack.last_mut() {
                    Some(parent) => parent.children.push((name, value)),
                    None => root = Some(value),
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(OssError::XmlParse(format!(
                    "error at position {}: {}",
                    reader.buffer_position(),
                    e
                )));
            }
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(OssError::XmlParse("unexpected end of document".to_string()));
    }

    Ok(root.unwrap_or_default())
}

/// Escape XML special characters into an existing buffer (no intermediate allocation)
pub fn escape_into(buf: &mut String, s: &str) {
    for ch in s.chars() {
        match ch {
            '&' => buf.push_str("&amp;"),
            '<' => buf.push_str("&lt;"),
            '>' => buf.push_str("&gt;"),
            '"' => buf.push_str("&quot;"),
            '\'' => buf.push_str("&apos;"),
            _ => buf.push(ch),
        }
    }
}
