//! Response wrapper with memoized body decoding

use bytes::Bytes;
use std::sync::OnceLock;

use crate::oss::error::Result;
use crate::oss::transport::HttpResponse;
use crate::oss::xml::{self, XmlValue};

/// How an operation's response body is meant to be read.
///
/// A static property of each operation, never sniffed from the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyFormat {
    /// Bytes as received (object contents, empty acknowledgements)
    Raw,
    /// XML document decoded into an [`XmlValue`]
    Xml,
}

/// Decoded body, borrowed from the [`Response`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Body<'a> {
    Raw(&'a [u8]),
    Xml(&'a XmlValue),
}

impl<'a> Body<'a> {
    pub fn as_raw(&self) -> Option<&'a [u8]> {
        match *self {
            Body::Raw(bytes) => Some(bytes),
            Body::Xml(_) => None,
        }
    }

    pub fn as_xml(&self) -> Option<&'a XmlValue> {
        match *self {
            Body::Xml(value) => Some(value),
            Body::Raw(_) => None,
        }
    }
}

/// Result of one operation
#[derive(Debug)]
pub struct Response {
    format: BodyFormat,
    inner: HttpResponse,
    parsed: OnceLock<XmlValue>,
}

impl Response {
    pub fn new(format: BodyFormat, inner: HttpResponse) -> Self {
        Self {
            format,
            inner,
            parsed: OnceLock::new(),
        }
    }

    pub fn format(&self) -> BodyFormat {
        self.format
    }

    pub fn status_code(&self) -> u16 {
        self.inner.status
    }

    pub fn headers(&self) -> &[(String, Vec<String>)] {
        &self.inner.headers
    }

    /// First value of a header, case-insensitive
    pub fn header(&self, name: &str) -> Option<&str> {
        self.inner.header(name)
    }

    /// The exact bytes received
    pub fn raw_body(&self) -> &Bytes {
        &self.inner.body
    }

    /// Body in the operation's declared format.
    ///
    /// XML is parsed on first use and reused afterwards.
    pub fn body(&self) -> Result<Body<'_>> {
        match self.format {
            BodyFormat::Raw => Ok(Body::Raw(&self.inner.body)),
            BodyFormat::Xml => self.xml().map(Body::Xml),
        }
    }

    /// Body parsed as XML regardless of the declared format (memoized)
    pub fn xml(&self) -> Result<&XmlValue> {
        if let Some(value) = self.parsed.get() {
            return Ok(value);
        }
        let value = xml::parse(&self.inner.body)?;
        Ok(self.parsed.get_or_init(|| value))
    }

    pub fn into_inner(self) -> HttpResponse {
        self.inner
    }
}
