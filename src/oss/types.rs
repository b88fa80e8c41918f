//! Typed views over the common XML responses

use serde::Serialize;

use crate::oss::xml::XmlValue;

fn text(value: &XmlValue, key: &str) -> String {
    value.text(key).unwrap_or_default().to_string()
}

fn opt_text(value: &XmlValue, key: &str) -> Option<String> {
    value.text(key).filter(|s| !s.is_empty()).map(str::to_string)
}

fn list<'a>(value: &'a XmlValue, key: &str) -> &'a [XmlValue] {
    value.get(key).map(XmlValue::as_list).unwrap_or(&[])
}

/// ETag without the surrounding quotes
pub fn trim_etag(etag: &str) -> String {
    etag.trim_matches('"').to_string()
}

/// One entry of a bucket listing
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ObjectSummary {
    pub key: String,
    pub size: u64,
    pub last_modified: Option<String>,
    pub etag: Option<String>,
    /// `Normal`, `Appendable` or `Symlink`
    pub object_type: Option<String>,
    pub storage_class: Option<String>,
}

impl ObjectSummary {
    fn from_xml(value: &XmlValue) -> Self {
        Self {
            key: text(value, "Key"),
            size: value.text("Size").and_then(|s| s.parse().ok()).unwrap_or(0),
            last_modified: opt_text(value, "LastModified"),
            etag: value.text("ETag").map(trim_etag),
            object_type: opt_text(value, "Type"),
            storage_class: opt_text(value, "StorageClass"),
        }
    }
}

/// Parsed `ListBucketResult`
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ListObjectsResult {
    pub name: String,
    pub prefix: Option<String>,
    pub marker: Option<String>,
    pub next_marker: Option<String>,
    pub max_keys: Option<u32>,
    pub is_truncated: bool,
    pub contents: Vec<ObjectSummary>,
    pub common_prefixes: Vec<String>,
}

impl ListObjectsResult {
    pub fn from_xml(value: &XmlValue) -> Self {
        Self {
            name: text(value, "Name"),
            prefix: opt_text(value, "Prefix"),
            marker: opt_text(value, "Marker"),
            next_marker: opt_text(value, "NextMarker"),
            max_keys: value.text("MaxKeys").and_then(|s| s.parse().ok()),
            is_truncated: value.text("IsTruncated") == Some("true"),
            contents: list(value, "Contents")
                .iter()
                .map(ObjectSummary::from_xml)
                .collect(),
            common_prefixes: list(value, "CommonPrefixes")
                .iter()
                .filter_map(|p| p.text("Prefix"))
                .map(str::to_string)
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Owner {
    pub id: String,
    pub display_name: String,
}

impl Owner {
    fn from_xml(value: &XmlValue) -> Self {
        Self {
            id: text(value, "ID"),
            display_name: text(value, "DisplayName"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BucketSummary {
    pub name: String,
    pub location: Option<String>,
    pub creation_date: Option<String>,
    pub storage_class: Option<String>,
}

/// Parsed `ListAllMyBucketsResult`
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ListBucketsResult {
    pub owner: Owner,
    pub buckets: Vec<BucketSummary>,
}

impl ListBucketsResult {
    pub fn from_xml(value: &XmlValue) -> Self {
        let buckets = value
            .get("Buckets")
            .map(|b| list(b, "Bucket"))
            .unwrap_or(&[])
            .iter()
            .map(|b| BucketSummary {
                name: text(b, "Name"),
                location: opt_text(b, "Location"),
                creation_date: opt_text(b, "CreationDate"),
                storage_class: opt_text(b, "StorageClass"),
            })
            .collect();

        Self {
            owner: value.get("Owner").map(Owner::from_xml).unwrap_or_default(),
            buckets,
        }
    }
}

/// Parsed `CopyObjectResult`
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CopyObjectResult {
    pub last_modified: String,
    pub etag: String,
}

impl CopyObjectResult {
    pub fn from_xml(value: &XmlValue) -> Self {
        Self {
            last_modified: text(value, "LastModified"),
            etag: trim_etag(value.text("ETag").unwrap_or_default()),
        }
    }
}

/// Parsed `AccessControlPolicy`; `grant` is `private`, `public-read`, etc.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AccessControlPolicy {
    pub owner_id: String,
    pub grant: String,
}

impl AccessControlPolicy {
    pub fn from_xml(value: &XmlValue) -> Self {
        Self {
            owner_id: value
                .get("Owner")
                .and_then(|o| o.text("ID"))
                .unwrap_or_default()
                .to_string(),
            grant: value
                .get("AccessControlList")
                .and_then(|acl| acl.text("Grant"))
                .unwrap_or_default()
                .to_string(),
        }
    }
}

/// Parsed `DeleteResult` (empty in quiet mode)
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DeleteResult {
    pub deleted: Vec<String>,
}

impl DeleteResult {
    pub fn from_xml(value: &XmlValue) -> Self {
        Self {
            deleted: list(value, "Deleted")
                .iter()
                .filter_map(|d| d.text("Key"))
                .map(str::to_string)
                .collect(),
        }
    }
}
