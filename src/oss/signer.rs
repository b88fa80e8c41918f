//! OSS header signing (HMAC-SHA1)
//!
//! ```text
//! StringToSign = VERB + "\n" +
//!                Content-MD5 + "\n" +
//!                Content-Type + "\n" +
//!                Date + "\n" +
//!                CanonicalizedOSSHeaders +
//!                CanonicalizedResource
//!
//! Signature     = Base64(HMAC-SHA1(AccessKeySecret, StringToSign))
//! Authorization = "OSS " + AccessKeyId + ":" + Signature
//! ```
//!
//! Everything here is pure: the same inputs always give the same signature.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha1::Sha1;
use std::collections::BTreeMap;

use crate::oss::headers::Headers;

type HmacSha1 = Hmac<Sha1>;

/// Hex lookup table for zero-allocation percent encoding
static HEX_UPPER: &[u8; 16] = b"0123456789ABCDEF";

/// Vendor header prefix; matching headers take part in signing
pub const OSS_HEADER_PREFIX: &str = "x-oss-";

/// Query parameters that belong to the signed resource.
///
/// Anything else is sent on the wire but left out of the signature.
/// Kept sorted for binary search.
const SIGNABLE_PARAMS: &[&str] = &[
    "acl",
    "append",
    "bucketInfo",
    "cname",
    "comp",
    "continuation-token",
    "cors",
    "delete",
    "encryption",
    "endTime",
    "img",
    "inventory",
    "inventoryId",
    "lifecycle",
    "live",
    "location",
    "logging",
    "objectMeta",
    "partNumber",
    "policy",
    "position",
    "qos",
    "referer",
    "replication",
    "replicationLocation",
    "replicationProgress",
    "requestPayment",
    "response-cache-control",
    "response-content-disposition",
    "response-content-encoding",
    "response-content-language",
    "response-content-type",
    "response-expires",
    "restore",
    "security-token",
    "startTime",
    "status",
    "style",
    "styleName",
    "symlink",
    "tagging",
    "torrent",
    "uploadId",
    "uploads",
    "versionId",
    "versioning",
    "versions",
    "vod",
    "website",
    "worm",
    "wormExtend",
    "wormId",
    "x-oss-process",
    "x-oss-traffic-limit",
];

/// Whether a query parameter participates in the signed resource
pub fn is_signable(name: &str) -> bool {
    SIGNABLE_PARAMS.binary_search(&name).is_ok()
}

/// Signs requests with an access key pair
#[derive(Clone)]
pub struct OssSigner {
    access_key_id: String,
    access_key_secret: String,
}

impl std::fmt::Debug for OssSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OssSigner")
            .field("access_key_id", &self.access_key_id)
            .field("access_key_secret", &"<redacted>")
            .finish()
    }
}

impl OssSigner {
    pub fn new(access_key_id: impl Into<String>, access_key_secret: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            access_key_secret: access_key_secret.into(),
        }
    }

    pub fn access_key_id(&self) -> &str {
        &self.access_key_id
    }

    /// Base64(HMAC-SHA1(secret, string_to_sign))
    pub fn sign(&self, string_to_sign: &str) -> String {
        let mut mac = HmacSha1::new_from_slice(self.access_key_secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(string_to_sign.as_bytes());
        BASE64.encode(mac.finalize().into_bytes())
    }

    /// Full `Authorization` header value for a string to sign
    pub fn authorization(&self, string_to_sign: &str) -> String {
        authorization(&self.access_key_id, &self.sign(string_to_sign))
    }
}

/// `OSS <AccessKeyId>:<Signature>`
pub fn authorization(access_key_id: &str, signature: &str) -> String {
    format!("OSS {}:{}", access_key_id, signature)
}

/// Assemble the string to sign from its already canonicalized parts
pub fn string_to_sign(
    method: &str,
    content_md5: &str,
    content_type: &str,
    date: &str,
    canonicalized_headers: &str,
    canonicalized_resource: &str,
) -> String {
    let mut result = String::with_capacity(
        method.len()
            + content_md5.len()
            + content_type.len()
            + date.len()
            + canonicalized_headers.len()
            + canonicalized_resource.len()
            + 4,
    );
    result.push_str(method);
    result.push('\n');
    result.push_str(content_md5);
    result.push('\n');
    result.push_str(content_type);
    result.push('\n');
    result.push_str(date);
    result.push('\n');
    result.push_str(canonicalized_headers);
    result.push_str(canonicalized_resource);
    result
}

/// Build the CanonicalizedOSSHeaders block.
///
/// Every `x-oss-*` header (prefix matched case-insensitively) becomes a
/// lower-cased `key:value` line. Lines are sorted as whole strings and each
/// one ends with `\n`. Empty when no such header exists.
pub fn canonicalized_oss_headers(headers: &Headers) -> String {
    let mut lines: Vec<String> = headers
        .iter()
        .filter_map(|(name, value)| {
            let name = name.to_ascii_lowercase();
            name.starts_with(OSS_HEADER_PREFIX)
                .then(|| format!("{}:{}", name, value))
        })
        .collect();

    if lines.is_empty() {
        return String::new();
    }

    lines.sort_unstable();

    let mut result = String::with_capacity(lines.iter().map(|l| l.len() + 1).sum());
    for line in &lines {
        result.push_str(line);
        result.push('\n');
    }
    result
}

/// Build the CanonicalizedResource.
///
/// `/bucket/path` (or just `path` for bucket-less service requests), followed
/// by `?` and the sub-resource plus the signable query parameters sorted by
/// key. Keys and values are strictly percent-encoded; an empty value renders
/// as the bare key.
pub fn canonicalized_resource(
    bucket: Option<&str>,
    path: &str,
    sub_resource: Option<&str>,
    queries: &BTreeMap<String, String>,
) -> String {
    let mut resource = String::with_capacity(path.len() + 64);
    if let Some(bucket) = bucket {
        resource.push('/');
        resource.push_str(bucket);
    }
    resource.push_str(path);

    let sub_resource = sub_resource.filter(|s| !s.is_empty());

    let mut parts: Vec<String> = Vec::new();
    if let Some(sub) = sub_resource {
        parts.push(sub.to_string());
    }

    // BTreeMap iteration is already ascending by key
    for (key, value) in queries {
        if !is_signable(key) || Some(key.as_str()) == sub_resource {
            continue;
        }
        if value.is_empty() {
            parts.push(uri_encode(key, true));
        } else {
            parts.push(format!("{}={}", uri_encode(key, true), uri_encode(value, true)));
        }
    }

    if !parts.is_empty() {
        resource.push('?');
        resource.push_str(&parts.join("&"));
    }

    resource
}

/// URI encode a string (RFC 3986) using hex lookup table.
///
/// Unreserved characters pass through, space becomes `%20`. With
/// `encode_slash == false` the `/` separator of object paths is kept.
pub fn uri_encode(s: &str, encode_slash: bool) -> String {
    let mut result = String::with_capacity(s.len() + 16);
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                result.push(byte as char);
            }
            b'/' if !encode_slash => {
                result.push('/');
            }
            _ => {
                result.push('%');
                result.push(HEX_UPPER[(byte >> 4) as usize] as char);
                result.push(HEX_UPPER[(byte & 0xf) as usize] as char);
            }
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn queries(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_signable_params_are_sorted() {
        let mut sorted = SIGNABLE_PARAMS.to_vec();
        sorted.sort_unstable();
        assert_eq!(sorted, SIGNABLE_PARAMS);
        assert!(is_signable("position"));
        assert!(is_signable("response-content-type"));
        assert!(!is_signable("prefix"));
        assert!(!is_signable("max-keys"));
    }

    #[test]
    fn test_uri_encode() {
        assert_eq!(uri_encode("hello world", true), "hello%20world");
        assert_eq!(uri_encode("hello/world", true), "hello%2Fworld");
        assert_eq!(uri_encode("hello/world", false), "hello/world");
        assert_eq!(uri_encode("a+b=c&d", true), "a%2Bb%3Dc%26d");
        assert_eq!(uri_encode("-_.~", true), "-_.~");
        assert_eq!(uri_encode("日", true), "%E6%97%A5");
    }

    #[test]
    fn test_canonicalized_oss_headers_filters_and_sorts() {
        let mut headers = Headers::new();
        headers.insert("X-OSS-Meta-Zeta", "z");
        headers.insert("Content-Type", "text/plain");
        headers.insert("x-oss-copy-source", "/b/a.txt");
        headers.insert("x-oss-meta-alpha", "a");

        assert_eq!(
            canonicalized_oss_headers(&headers),
            "x-oss-copy-source:/b/a.txt\nx-oss-meta-alpha:a\nx-oss-meta-zeta:z\n"
        );
    }

    #[test]
    fn test_canonicalized_oss_headers_empty() {
        let mut headers = Headers::new();
        headers.insert("Content-Type", "text/plain");
        headers.insert("x-amz-date", "now");
        assert_eq!(canonicalized_oss_headers(&headers), "");
    }

    #[test]
    fn test_canonicalized_oss_headers_sorts_full_lines() {
        // "x-oss-a:2" vs "x-oss-a-b:1": ':' (0x3a) sorts after '-' (0x2d)
        let mut headers = Headers::new();
        headers.insert("x-oss-a", "2");
        headers.insert("x-oss-a-b", "1");
        assert_eq!(canonicalized_oss_headers(&headers), "x-oss-a-b:1\nx-oss-a:2\n");
    }

    #[test]
    fn test_canonicalized_resource_plain() {
        assert_eq!(canonicalized_resource(Some("b"), "/", None, &BTreeMap::new()), "/b/");
        assert_eq!(
            canonicalized_resource(Some("b"), "/dir/file.txt", None, &BTreeMap::new()),
            "/b/dir/file.txt"
        );
        assert_eq!(canonicalized_resource(None, "/", None, &BTreeMap::new()), "/");
    }

    #[test]
    fn test_canonicalized_resource_skips_unsigned_params() {
        let q = queries(&[("prefix", "fun/"), ("max-keys", "100")]);
        assert_eq!(canonicalized_resource(Some("b"), "/", None, &q), "/b/");
    }

    #[test]
    fn test_canonicalized_resource_with_sub_resource_and_params() {
        let q = queries(&[("position", "0"), ("prefix", "x")]);
        assert_eq!(
            canonicalized_resource(Some("b"), "/test.txt", Some("append"), &q),
            "/b/test.txt?append&position=0"
        );

        let q = queries(&[
            ("response-content-type", "text/plain; charset=utf-8"),
            ("response-cache-control", "no-cache"),
        ]);
        assert_eq!(
            canonicalized_resource(Some("b"), "/o", None, &q),
            "/b/o?response-cache-control=no-cache&response-content-type=text%2Fplain%3B%20charset%3Dutf-8"
        );
    }

    #[test]
    fn test_canonicalized_resource_empty_value_is_bare_key() {
        let q = queries(&[("uploads", "")]);
        assert_eq!(canonicalized_resource(Some("b"), "/o", None, &q), "/b/o?uploads");
    }

    #[test]
    fn test_canonicalized_resource_ignores_insertion_order() {
        let mut a = BTreeMap::new();
        a.insert("uploadId".to_string(), "u1".to_string());
        a.insert("partNumber".to_string(), "2".to_string());
        a.insert("foo".to_string(), "bar".to_string());

        let mut b = BTreeMap::new();
        b.insert("foo".to_string(), "bar".to_string());
        b.insert("partNumber".to_string(), "2".to_string());
        b.insert("uploadId".to_string(), "u1".to_string());

        let ra = canonicalized_resource(Some("b"), "/o", None, &a);
        let rb = canonicalized_resource(Some("b"), "/o", None, &b);
        assert_eq!(ra, rb);
        assert_eq!(ra, "/b/o?partNumber=2&uploadId=u1");
    }

    #[test]
    fn test_string_to_sign_layout() {
        let s = string_to_sign(
            "PUT",
            "md5",
            "text/plain",
            "Thu, 17 Nov 2005 18:49:58 GMT",
            "x-oss-meta-a:1\n",
            "/b/o",
        );
        assert_eq!(
            s,
            "PUT\nmd5\ntext/plain\nThu, 17 Nov 2005 18:49:58 GMT\nx-oss-meta-a:1\n/b/o"
        );
    }

    #[test]
    fn test_known_signature() {
        // HMAC-SHA1 test vector from RFC 2202 (test case 2)
        let signer = OssSigner::new("id", "Jefe");
        assert_eq!(
            signer.sign("what do ya want for nothing?"),
            BASE64.encode([
                0xef, 0xfc, 0xdf, 0x6a, 0xe5, 0xeb, 0x2f, 0xa2, 0xd2, 0x74, 0x16, 0xd5, 0xf1,
                0x84, 0xdf, 0x9c, 0x25, 0x9a, 0x7c, 0x79
            ])
        );
    }

    #[test]
    fn test_authorization_format() {
        let signer = OssSigner::new("access_key_id", "secret");
        let auth = signer.authorization("GET\n\n\nDate\n/b/");
        assert!(auth.starts_with("OSS access_key_id:"));
        assert_eq!(auth, signer.authorization("GET\n\n\nDate\n/b/"));
        assert_eq!(authorization("id", "sig"), "OSS id:sig");
    }

    #[test]
    fn test_debug_redacts_secret() {
        let signer = OssSigner::new("id", "very-secret");
        let debug = format!("{:?}", signer);
        assert!(!debug.contains("very-secret"));
    }
}
