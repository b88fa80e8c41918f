//! OSS client module with header-based request signing
//!
//! This module provides:
//! - Canonicalization and HMAC-SHA1 signing of requests
//! - A request builder that materializes the signed headers
//! - Dispatch over an injected, async [`Transport`]
//! - Responses exposing raw bytes or a parsed XML tree
//! - Service, bucket and object facades on [`OssClient`]

pub mod clock;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod headers;
pub mod request;
pub mod resource;
pub mod response;
pub mod signer;
pub mod transport;
pub mod types;
pub mod xml;

// Re-export main types for convenience
pub use clock::{Clock, FixedClock, SystemClock};
pub use context::OssContext;
pub use dispatch::Dispatcher;
pub use error::{OssError, RequestError, Result};
pub use headers::Headers;
pub use request::{PendingRequest, RequestOptions, SignedRequest, Verb};
pub use resource::{
    BucketResource, ObjectResource, OssClient, ResourceKind, ResourceRef, ServiceResource,
};
pub use response::{Body, BodyFormat, Response};
pub use signer::OssSigner;
pub use transport::{
    HttpRequest, HttpResponse, HyperTransport, Transport, TransportError, TransportOptions,
};
pub use types::{
    AccessControlPolicy, BucketSummary, CopyObjectResult, DeleteResult, ListBucketsResult,
    ListObjectsResult, ObjectSummary, Owner,
};
pub use xml::XmlValue;
