//! Request assembly: path, query, headers, body, then signing
//!
//! A [`PendingRequest`] is filled in by setter calls and consumed by
//! [`PendingRequest::finalize`], which materializes `Content-Length`,
//! `Content-MD5`, `Content-Type`, `Date` and `Authorization` in that order.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tracing::debug;

use crate::oss::clock::http_date;
use crate::oss::context::OssContext;
use crate::oss::headers::Headers;
use crate::oss::signer::{self, OssSigner};
use crate::oss::transport::HttpRequest;

pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

pub const CONTENT_TYPE: &str = "Content-Type";
pub const CONTENT_LENGTH: &str = "Content-Length";
pub const CONTENT_MD5: &str = "Content-MD5";
pub const DATE: &str = "Date";
pub const AUTHORIZATION: &str = "Authorization";

/// HTTP verbs the service API uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    Get,
    Put,
    Post,
    Delete,
    Head,
}

impl Verb {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::Get => "GET",
            Verb::Put => "PUT",
            Verb::Post => "POST",
            Verb::Delete => "DELETE",
            Verb::Head => "HEAD",
        }
    }
}

impl std::fmt::Display for Verb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Extra headers and query parameters supplied with a facade call
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub headers: Headers,
    pub queries: BTreeMap<String, String>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.queries.insert(key.into(), value.into());
        self
    }
}

/// One outgoing request under construction
#[derive(Debug, Clone)]
pub struct PendingRequest {
    verb: Verb,
    context: OssContext,
    with_bucket: bool,
    path: String,
    sub_resource: Option<String>,
    queries: BTreeMap<String, String>,
    headers: Headers,
    body: Bytes,
}

impl PendingRequest {
    /// Start a bucket-scoped request; `context` is a snapshot for this request only
    pub fn new(verb: Verb, context: OssContext) -> Self {
        Self {
            verb,
            context,
            with_bucket: true,
            path: "/".to_string(),
            sub_resource: None,
            queries: BTreeMap::new(),
            headers: Headers::new(),
            body: Bytes::new(),
        }
    }

    /// Address the bare endpoint instead of `bucket.endpoint` (service-level calls)
    pub fn without_bucket(&mut self) -> &mut Self {
        self.with_bucket = false;
        self
    }

    /// Store `"/" + path` with every leading slash of `path` removed
    pub fn set_path(&mut self, path: &str) -> &mut Self {
        self.path = format!("/{}", path.trim_start_matches('/'));
        self
    }

    pub fn set_sub_resource(&mut self, sub_resource: impl Into<String>) -> &mut Self {
        self.sub_resource = Some(sub_resource.into());
        self
    }

    pub fn set_query(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.queries.insert(key.into(), value.into());
        self
    }

    pub fn set_queries<K, V>(&mut self, queries: impl IntoIterator<Item = (K, V)>) -> &mut Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        for (key, value) in queries {
            self.queries.insert(key.into(), value.into());
        }
        self
    }

    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.headers.insert(name, value);
        self
    }

    pub fn set_headers<K, V>(&mut self, headers: impl IntoIterator<Item = (K, V)>) -> &mut Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.headers.extend(headers);
        self
    }

    pub fn set_body(&mut self, body: impl Into<Bytes>) -> &mut Self {
        self.body = body.into();
        self
    }

    /// Merge caller options: headers first, then queries; later writes win
    pub fn apply(&mut self, options: RequestOptions) -> &mut Self {
        self.set_headers(options.headers.into_vec());
        self.set_queries(options.queries);
        self
    }

    pub fn verb(&self) -> Verb {
        self.verb
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn sub_resource(&self) -> Option<&str> {
        self.sub_resource.as_deref()
    }

    pub fn queries(&self) -> &BTreeMap<String, String> {
        &self.queries
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn context(&self) -> &OssContext {
        &self.context
    }

    /// Query string as sent on the wire.
    ///
    /// The raw sub-resource comes first, followed by every query parameter
    /// percent-encoded and sorted as `key=value` strings.
    pub fn query_string(&self) -> String {
        let sub_resource = self.sub_resource.as_deref().filter(|s| !s.is_empty());

        let mut parts: Vec<String> = self
            .queries
            .iter()
            .filter(|(key, _)| Some(key.as_str()) != sub_resource)
            .map(|(key, value)| {
                format!("{}={}", urlencoding::encode(key), urlencoding::encode(value))
            })
            .collect();
        parts.sort_unstable();

        if let Some(sub) = sub_resource {
            parts.insert(0, urlencoding::encode(sub).into_owned());
        }

        parts.join("&")
    }

    /// Whether the bucket goes into the host and the signed resource.
    ///
    /// A context without a bucket can only address the endpoint itself.
    fn addresses_bucket(&self) -> bool {
        self.with_bucket && !self.context.bucket().is_empty()
    }

    /// `scheme://domain/path[?query]`
    pub fn url(&self) -> String {
        let domain = self.context.domain(self.addresses_bucket());
        let path = signer::uri_encode(&self.path, false);
        let query = self.query_string();

        let mut url = String::with_capacity(domain.len() + path.len() + query.len() + 10);
        url.push_str(self.context.scheme());
        url.push_str("://");
        url.push_str(&domain);
        url.push_str(&path);
        if !query.is_empty() {
            url.push('?');
            url.push_str(&query);
        }
        url
    }

    /// Resource string that goes into the signature
    pub fn canonicalized_resource(&self) -> String {
        let bucket = self.addresses_bucket().then(|| self.context.bucket());
        signer::canonicalized_resource(
            bucket,
            &self.path,
            self.sub_resource.as_deref(),
            &self.queries,
        )
    }

    /// Materialize the signed headers and produce the wire request.
    ///
    /// Each call to `finalize` yields a fresh `Date`/`Authorization` pair for
    /// `now`, so a request is finalized exactly once per dispatch.
    pub fn finalize(self, now: DateTime<Utc>) -> SignedRequest {
        let url = self.url();
        let resource = self.canonicalized_resource();

        let PendingRequest {
            verb,
            context,
            mut headers,
            body,
            ..
        } = self;

        if body.is_empty() {
            headers.remove(CONTENT_LENGTH);
            headers.remove(CONTENT_MD5);
        } else {
            let digest = md5::compute(&body);
            headers.insert(CONTENT_LENGTH, body.len().to_string());
            headers.insert(CONTENT_MD5, BASE64.encode(&digest[..]));
            if !headers.contains(CONTENT_TYPE) {
                headers.insert(CONTENT_TYPE, DEFAULT_CONTENT_TYPE);
            }
        }

        let date = http_date(now);
        headers.insert(DATE, date.clone());

        let string_to_sign = signer::string_to_sign(
            verb.as_str(),
            headers.get(CONTENT_MD5).unwrap_or(""),
            headers.get(CONTENT_TYPE).unwrap_or(""),
            &date,
            &signer::canonicalized_oss_headers(&headers),
            &resource,
        );

        debug!(string_to_sign = ?string_to_sign, "Built OSS string to sign");

        let signer = OssSigner::new(context.access_key_id(), context.access_key_secret());
        headers.insert(AUTHORIZATION, signer.authorization(&string_to_sign));

        SignedRequest {
            verb,
            url,
            headers,
            body,
            string_to_sign,
        }
    }
}

/// A request with its final headers, ready for the transport
#[derive(Debug, Clone)]
pub struct SignedRequest {
    pub verb: Verb,
    pub url: String,
    pub headers: Headers,
    pub body: Bytes,
    /// Input that produced the `Authorization` signature
    pub string_to_sign: String,
}

impl SignedRequest {
    pub fn into_http_request(self) -> HttpRequest {
        HttpRequest {
            method: self.verb.as_str().to_string(),
            url: self.url,
            headers: self.headers.into_vec(),
            body: self.body,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn context() -> OssContext {
        OssContext::new("b", "oss-cn-hangzhou.aliyuncs.com", "access_key_id", "access_key_secret")
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_set_path_normalizes_leading_slashes() {
        let mut request = PendingRequest::new(Verb::Get, context());
        assert_eq!(request.path(), "/");
        request.set_path("test.txt");
        assert_eq!(request.path(), "/test.txt");
        request.set_path("///a/b.txt");
        assert_eq!(request.path(), "/a/b.txt");
        request.set_path("");
        assert_eq!(request.path(), "/");
    }

    #[test]
    fn test_last_write_wins() {
        let mut request = PendingRequest::new(Verb::Get, context());
        request
            .set_query("prefix", "a")
            .set_queries([("prefix", "b"), ("max-keys", "10")])
            .set_header("Content-Type", "text/plain")
            .set_header("content-type", "text/html");

        assert_eq!(request.queries().get("prefix").map(String::as_str), Some("b"));
        assert_eq!(request.queries().len(), 2);
        assert_eq!(request.headers().len(), 1);
        assert_eq!(request.headers().get("Content-Type"), Some("text/html"));
    }

    #[test]
    fn test_url_with_bucket_and_queries() {
        let mut request = PendingRequest::new(Verb::Get, context());
        request
            .set_query("prefix", "fun/movie")
            .set_query("max-keys", "100");
        assert_eq!(
            request.url(),
            "https://b.oss-cn-hangzhou.aliyuncs.com/?max-keys=100&prefix=fun%2Fmovie"
        );
    }

    #[test]
    fn test_url_sub_resource_comes_first() {
        let mut request = PendingRequest::new(Verb::Post, context());
        request
            .set_path("test.txt")
            .set_sub_resource("append")
            .set_query("position", "0");
        assert_eq!(
            request.url(),
            "https://b.oss-cn-hangzhou.aliyuncs.com/test.txt?append&position=0"
        );
        assert_eq!(request.canonicalized_resource(), "/b/test.txt?append&position=0");
    }

    #[test]
    fn test_url_without_bucket_and_plain_http() {
        let mut request = PendingRequest::new(Verb::Get, context().with_secure(false));
        request.without_bucket();
        assert_eq!(request.url(), "http://oss-cn-hangzhou.aliyuncs.com/");
        assert_eq!(request.canonicalized_resource(), "/");
    }

    #[test]
    fn test_empty_bucket_addresses_endpoint() {
        let context = OssContext::new("", "oss-cn-hangzhou.aliyuncs.com", "id", "secret");
        let mut request = PendingRequest::new(Verb::Get, context);
        request.set_path("a.txt");
        assert_eq!(request.url(), "https://oss-cn-hangzhou.aliyuncs.com/a.txt");
        assert_eq!(request.canonicalized_resource(), "/a.txt");
    }

    #[test]
    fn test_url_encodes_path_but_keeps_slashes() {
        let mut request = PendingRequest::new(Verb::Get, context());
        request.set_path("dir/my file.txt");
        assert_eq!(
            request.url(),
            "https://b.oss-cn-hangzhou.aliyuncs.com/dir/my%20file.txt"
        );
        assert_eq!(request.canonicalized_resource(), "/b/dir/my file.txt");
    }

    #[test]
    fn test_finalize_empty_body_omits_length_and_md5() {
        let mut request = PendingRequest::new(Verb::Get, context());
        request.set_header("Content-Length", "0");
        let signed = request.finalize(now());

        assert!(!signed.headers.contains(CONTENT_LENGTH));
        assert!(!signed.headers.contains(CONTENT_MD5));
        assert!(!signed.headers.contains(CONTENT_TYPE));
        assert_eq!(signed.headers.get(DATE), Some("Fri, 01 Mar 2024 12:00:00 GMT"));
        assert_eq!(
            signed.string_to_sign,
            "GET\n\n\nFri, 01 Mar 2024 12:00:00 GMT\n/b/"
        );
    }

    #[test]
    fn test_finalize_with_body() {
        let mut request = PendingRequest::new(Verb::Put, context());
        request.set_path("/test.txt").set_body("test-contents");
        let signed = request.finalize(now());

        let expected_md5 = BASE64.encode(&md5::compute(b"test-contents")[..]);
        assert_eq!(signed.headers.get(CONTENT_LENGTH), Some("13"));
        assert_eq!(signed.headers.get(CONTENT_MD5), Some(expected_md5.as_str()));
        assert_eq!(signed.headers.get(CONTENT_TYPE), Some(DEFAULT_CONTENT_TYPE));
        assert_eq!(
            signed.string_to_sign,
            format!(
                "PUT\n{}\napplication/octet-stream\nFri, 01 Mar 2024 12:00:00 GMT\n/b/test.txt",
                expected_md5
            )
        );
    }

    #[test]
    fn test_finalize_keeps_caller_content_type() {
        let mut request = PendingRequest::new(Verb::Post, context());
        request
            .set_header("content-type", "application/xml")
            .set_body("<Delete/>");
        let signed = request.finalize(now());
        assert_eq!(signed.headers.get(CONTENT_TYPE), Some("application/xml"));
        assert_eq!(
            signed.headers.iter().filter(|(k, _)| k.eq_ignore_ascii_case(CONTENT_TYPE)).count(),
            1
        );
    }

    #[test]
    fn test_finalize_signs_oss_headers() {
        let mut request = PendingRequest::new(Verb::Put, context());
        request
            .set_path("new.txt")
            .set_header("x-oss-copy-source", "/b/old.txt");
        let signed = request.finalize(now());
        assert_eq!(
            signed.string_to_sign,
            "PUT\n\n\nFri, 01 Mar 2024 12:00:00 GMT\nx-oss-copy-source:/b/old.txt\n/b/new.txt"
        );
    }

    #[test]
    fn test_authorization_matches_signer() {
        let request = PendingRequest::new(Verb::Get, context());
        let signed = request.finalize(now());

        let signer = OssSigner::new("access_key_id", "access_key_secret");
        let expected = signer.authorization("GET\n\n\nFri, 01 Mar 2024 12:00:00 GMT\n/b/");
        assert_eq!(signed.headers.get(AUTHORIZATION), Some(expected.as_str()));
    }

    #[test]
    fn test_finalize_is_deterministic_for_fixed_time() {
        let build = || {
            let mut request = PendingRequest::new(Verb::Get, context());
            request.set_query("prefix", "a").set_query("acl", "");
            request.finalize(now())
        };
        assert_eq!(
            build().headers.get(AUTHORIZATION),
            build().headers.get(AUTHORIZATION)
        );
    }

    #[test]
    fn test_apply_options() {
        let options = RequestOptions::new()
            .header("x-oss-meta-author", "me")
            .query("prefix", "p/");
        let mut request = PendingRequest::new(Verb::Get, context());
        request.apply(options);
        assert_eq!(request.headers().get("X-OSS-META-AUTHOR"), Some("me"));
        assert_eq!(request.queries().get("prefix").map(String::as_str), Some("p/"));
    }

    #[test]
    fn test_into_http_request() {
        let mut request = PendingRequest::new(Verb::Head, context());
        request.set_path("a.txt");
        let http = request.finalize(now()).into_http_request();
        assert_eq!(http.method, "HEAD");
        assert_eq!(http.url, "https://b.oss-cn-hangzhou.aliyuncs.com/a.txt");
        assert!(http.headers.iter().any(|(k, _)| k == AUTHORIZATION));
        assert!(http.body.is_empty());
    }
}
