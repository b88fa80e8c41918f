use anyhow::{Context, Result};
use serde_json::json;
use std::fmt::Write as FmtWrite;
use std::io::Write;

use crate::cli::args::OutputFormat;
use crate::oss::types::trim_etag;
use crate::oss::{
    AccessControlPolicy, CopyObjectResult, DeleteResult, ListBucketsResult, ListObjectsResult,
    OssClient, RequestOptions, Response, Transport,
};

/// Query parameters of a bucket listing
#[derive(Debug, Clone, Default)]
pub struct ListParams {
    pub prefix: Option<String>,
    pub marker: Option<String>,
    pub max_keys: Option<u32>,
    pub delimiter: Option<String>,
}

impl ListParams {
    pub fn to_options(&self) -> RequestOptions {
        let mut options = RequestOptions::new();
        if let Some(prefix) = &self.prefix {
            options = options.query("prefix", prefix.as_str());
        }
        if let Some(marker) = &self.marker {
            options = options.query("marker", marker.as_str());
        }
        if let Some(max_keys) = self.max_keys {
            options = options.query("max-keys", max_keys.to_string());
        }
        if let Some(delimiter) = &self.delimiter {
            options = options.query("delimiter", delimiter.as_str());
        }
        options
    }
}

fn write_json(out: &mut impl Write, value: &impl serde::Serialize) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}

fn object_url<T: Transport>(client: &OssClient<T>, key: &str) -> String {
    format!("oss://{}/{}", client.bucket_name(), key.trim_start_matches('/'))
}

pub async fn cmd_buckets<T: Transport>(
    client: &OssClient<T>,
    format: OutputFormat,
    out: &mut impl Write,
) -> Result<()> {
    let response = client.service().list_buckets(RequestOptions::new()).await?;
    let result = ListBucketsResult::from_xml(response.xml()?);

    match format {
        OutputFormat::Text => {
            for bucket in &result.buckets {
                writeln!(
                    out,
                    "[{}] {:<20} {}/",
                    format_oss_date(bucket.creation_date.as_deref()),
                    bucket.location.as_deref().unwrap_or(""),
                    bucket.name
                )?;
            }
        }
        OutputFormat::Json => write_json(out, &result)?,
    }
    Ok(())
}

pub async fn cmd_ls<T: Transport>(
    client: &OssClient<T>,
    params: &ListParams,
    format: OutputFormat,
    out: &mut impl Write,
) -> Result<()> {
    let response = client.bucket().list_objects(params.to_options()).await?;
    let result = ListObjectsResult::from_xml(response.xml()?);

    match format {
        OutputFormat::Text => {
            let mut line = String::with_capacity(128);
            for prefix in &result.common_prefixes {
                line.clear();
                let _ = write!(line, "[{}] {:>7} {}", format_oss_date(None), "PRE", prefix);
                writeln!(out, "{}", line)?;
            }
            for object in &result.contents {
                line.clear();
                let _ = write!(
                    line,
                    "[{}] {:>7} {}",
                    format_oss_date(object.last_modified.as_deref()),
                    format_bytes_compact(object.size),
                    object.key
                );
                writeln!(out, "{}", line)?;
            }
            if result.is_truncated {
                if let Some(next) = &result.next_marker {
                    writeln!(out, "(truncated, continue with --marker {})", next)?;
                }
            }
        }
        OutputFormat::Json => write_json(out, &result)?,
    }
    Ok(())
}

pub async fn cmd_put<T: Transport>(
    client: &OssClient<T>,
    file: &str,
    key: &str,
    content_type: Option<&str>,
    format: OutputFormat,
    out: &mut impl Write,
) -> Result<()> {
    let contents = tokio::fs::read(file)
        .await
        .with_context(|| format!("Failed to read file: {}", file))?;
    let size = contents.len() as u64;

    let mut options = RequestOptions::new();
    if let Some(content_type) = content_type {
        options = options.header("Content-Type", content_type);
    }

    let response = client.object().put_object(key, contents, options).await?;
    let etag = response.header("ETag").map(trim_etag).unwrap_or_default();

    match format {
        OutputFormat::Text => writeln!(
            out,
            "Uploaded: {} ({})",
            object_url(client, key),
            format_bytes(size)
        )?,
        OutputFormat::Json => write_json(out, &json!({ "key": key, "size": size, "etag": etag }))?,
    }
    Ok(())
}

pub async fn cmd_get<T: Transport>(
    client: &OssClient<T>,
    key: &str,
    dest: Option<&str>,
    out: &mut impl Write,
) -> Result<()> {
    let response = client.object().get_object(key, RequestOptions::new()).await?;
    let body = response.raw_body();

    match dest {
        Some(path) => {
            tokio::fs::write(path, body)
                .await
                .with_context(|| format!("Failed to write file: {}", path))?;
            writeln!(out, "Downloaded: {} ({})", path, format_bytes(body.len() as u64))?;
        }
        None => out.write_all(body)?,
    }
    Ok(())
}

pub async fn cmd_append<T: Transport>(
    client: &OssClient<T>,
    file: &str,
    key: &str,
    position: u64,
    format: OutputFormat,
    out: &mut impl Write,
) -> Result<()> {
    let contents = tokio::fs::read(file)
        .await
        .with_context(|| format!("Failed to read file: {}", file))?;

    let response = client
        .object()
        .append_object(key, contents, position, RequestOptions::new())
        .await?;
    let next = response.header("x-oss-next-append-position").unwrap_or("");

    match format {
        OutputFormat::Text => writeln!(
            out,
            "Appended: {} (next position {})",
            object_url(client, key),
            next
        )?,
        OutputFormat::Json => {
            write_json(out, &json!({ "key": key, "next_append_position": next }))?
        }
    }
    Ok(())
}

pub async fn cmd_cp<T: Transport>(
    client: &OssClient<T>,
    from: &str,
    to: &str,
    from_bucket: Option<&str>,
    format: OutputFormat,
    out: &mut impl Write,
) -> Result<()> {
    let response = client
        .object()
        .copy_object(from, to, from_bucket, RequestOptions::new())
        .await?;
    let result = CopyObjectResult::from_xml(response.xml()?);

    match format {
        OutputFormat::Text => {
            let source_bucket = from_bucket.map(str::to_string).unwrap_or_else(|| client.bucket_name());
            writeln!(
                out,
                "Copied: oss://{}/{} -> {} ({})",
                source_bucket.trim_matches('/'),
                from.trim_matches('/'),
                object_url(client, to),
                result.etag
            )?
        }
        OutputFormat::Json => write_json(out, &result)?,
    }
    Ok(())
}

pub async fn cmd_rm<T: Transport>(
    client: &OssClient<T>,
    keys: &[String],
    quiet: bool,
    format: OutputFormat,
    out: &mut impl Write,
) -> Result<()> {
    if let [key] = keys {
        client.object().delete_object(key, RequestOptions::new()).await?;
        match format {
            OutputFormat::Text => writeln!(out, "Deleted: {}", object_url(client, key))?,
            OutputFormat::Json => write_json(out, &DeleteResult { deleted: vec![key.clone()] })?,
        }
        return Ok(());
    }

    let response = client
        .object()
        .delete_multiple_objects(keys, quiet, RequestOptions::new())
        .await?;
    let result = DeleteResult::from_xml(response.xml()?);

    match format {
        OutputFormat::Text => {
            for key in &result.deleted {
                writeln!(out, "Deleted: {}", object_url(client, key))?;
            }
            writeln!(out, "Deleted {} objects", if quiet { keys.len() } else { result.deleted.len() })?;
        }
        OutputFormat::Json => write_json(out, &result)?,
    }
    Ok(())
}

/// Metadata reported by `stat`, taken from the HEAD response headers
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct ObjectStat {
    pub key: String,
    pub size: Option<u64>,
    pub content_type: Option<String>,
    pub etag: Option<String>,
    pub last_modified: Option<String>,
    pub object_type: Option<String>,
    pub storage_class: Option<String>,
    pub metadata: Vec<(String, String)>,
}

impl ObjectStat {
    pub fn from_response(key: &str, response: &Response) -> Self {
        let header = |name: &str| response.header(name).map(str::to_string);
        let metadata = response
            .headers()
            .iter()
            .filter_map(|(name, values)| {
                let lower = name.to_ascii_lowercase();
                let meta = lower.strip_prefix("x-oss-meta-")?.to_string();
                Some((meta, values.join(",")))
            })
            .collect();

        Self {
            key: key.to_string(),
            size: response.header("Content-Length").and_then(|s| s.parse().ok()),
            content_type: header("Content-Type"),
            etag: response.header("ETag").map(trim_etag),
            last_modified: header("Last-Modified"),
            object_type: header("x-oss-object-type"),
            storage_class: header("x-oss-storage-class"),
            metadata,
        }
    }
}

pub async fn cmd_stat<T: Transport>(
    client: &OssClient<T>,
    key: &str,
    format: OutputFormat,
    out: &mut impl Write,
) -> Result<()> {
    let response = client.object().head_object(key, RequestOptions::new()).await?;
    let stat = ObjectStat::from_response(key, &response);

    match format {
        OutputFormat::Text => {
            writeln!(out, "Object: {}", object_url(client, key))?;
            if let Some(size) = stat.size {
                writeln!(out, "Size: {} ({})", format_bytes(size), size)?;
            }
            if let Some(modified) = &stat.last_modified {
                writeln!(out, "Last Modified: {}", modified)?;
            }
            if let Some(etag) = &stat.etag {
                writeln!(out, "ETag: {}", etag)?;
            }
            if let Some(ct) = &stat.content_type {
                writeln!(out, "Content-Type: {}", ct)?;
            }
            if let Some(t) = &stat.object_type {
                writeln!(out, "Type: {}", t)?;
            }
            if let Some(sc) = &stat.storage_class {
                writeln!(out, "Storage Class: {}", sc)?;
            }
            if !stat.metadata.is_empty() {
                writeln!(out, "\nMetadata:")?;
                for (key, value) in &stat.metadata {
                    writeln!(out, "  {}: {}", key, value)?;
                }
            }
        }
        OutputFormat::Json => write_json(out, &stat)?,
    }
    Ok(())
}

pub async fn cmd_acl_get<T: Transport>(
    client: &OssClient<T>,
    key: &str,
    format: OutputFormat,
    out: &mut impl Write,
) -> Result<()> {
    let response = client.object().get_object_acl(key, RequestOptions::new()).await?;
    let policy = AccessControlPolicy::from_xml(response.xml()?);

    match format {
        OutputFormat::Text => writeln!(out, "{}: {}", object_url(client, key), policy.grant)?,
        OutputFormat::Json => write_json(out, &policy)?,
    }
    Ok(())
}

pub async fn cmd_acl_set<T: Transport>(
    client: &OssClient<T>,
    key: &str,
    permission: &str,
    format: OutputFormat,
    out: &mut impl Write,
) -> Result<()> {
    client
        .object()
        .put_object_acl(key, permission, RequestOptions::new())
        .await?;

    match format {
        OutputFormat::Text => writeln!(out, "ACL of {} set to {}", object_url(client, key), permission)?,
        OutputFormat::Json => write_json(out, &json!({ "key": key, "grant": permission }))?,
    }
    Ok(())
}

pub async fn cmd_symlink_create<T: Transport>(
    client: &OssClient<T>,
    key: &str,
    target: &str,
    format: OutputFormat,
    out: &mut impl Write,
) -> Result<()> {
    client
        .object()
        .put_symlink(key, target, RequestOptions::new())
        .await?;

    match format {
        OutputFormat::Text => writeln!(out, "Linked: {} -> {}", object_url(client, key), target)?,
        OutputFormat::Json => write_json(out, &json!({ "key": key, "target": target }))?,
    }
    Ok(())
}

pub async fn cmd_symlink_get<T: Transport>(
    client: &OssClient<T>,
    key: &str,
    format: OutputFormat,
    out: &mut impl Write,
) -> Result<()> {
    let response = client.object().get_symlink(key, RequestOptions::new()).await?;
    let target = response
        .header("x-oss-symlink-target")
        .context("Response has no x-oss-symlink-target header")?;

    match format {
        OutputFormat::Text => writeln!(out, "{}", target)?,
        OutputFormat::Json => write_json(out, &json!({ "key": key, "target": target }))?,
    }
    Ok(())
}

pub async fn cmd_restore<T: Transport>(
    client: &OssClient<T>,
    key: &str,
    format: OutputFormat,
    out: &mut impl Write,
) -> Result<()> {
    let response = client.object().restore_object(key, RequestOptions::new()).await?;

    match format {
        OutputFormat::Text => writeln!(
            out,
            "Restore requested: {} (HTTP {})",
            object_url(client, key),
            response.status_code()
        )?,
        OutputFormat::Json => write_json(
            out,
            &json!({ "key": key, "status": response.status_code() }),
        )?,
    }
    Ok(())
}

// ============================================================================
// Utility functions
// ============================================================================

/// Format bytes in human-readable form (B, KB, MB, GB, TB)
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB", "PB"];

    if bytes == 0 {
        return "0 B".to_string();
    }

    let bytes_f64 = bytes as f64;
    let exponent = (bytes_f64.ln() / 1024_f64.ln()).floor() as usize;
    let exponent = exponent.min(UNITS.len() - 1);

    let value = bytes_f64 / 1024_f64.powi(exponent as i32);

    if exponent == 0 {
        format!("{} {}", bytes, UNITS[exponent])
    } else {
        format!("{:.2} {}", value, UNITS[exponent])
    }
}

/// Compact size for listings (0B, 1.0KiB, 10MiB)
pub fn format_bytes_compact(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KiB", "MiB", "GiB", "TiB", "PiB"];

    if bytes == 0 {
        return "0B".to_string();
    }

    let bytes_f64 = bytes as f64;
    let exponent = (bytes_f64.ln() / 1024_f64.ln()).floor() as usize;
    let exponent = exponent.min(UNITS.len() - 1);

    let value = bytes_f64 / 1024_f64.powi(exponent as i32);

    if exponent == 0 {
        format!("{}B", bytes)
    } else if value >= 10.0 {
        format!("{:.0}{}", value, UNITS[exponent])
    } else {
        format!("{:.1}{}", value, UNITS[exponent])
    }
}

/// `2012-02-24T08:43:07.000Z` as `2012-02-24 08:43:07 UTC`; blank padding when absent
pub fn format_oss_date(date_str: Option<&str>) -> String {
    match date_str {
        Some(s) => match s.split_once('T') {
            Some((date, rest)) => {
                let time = rest.get(..8).unwrap_or_else(|| rest.trim_end_matches('Z'));
                format!("{} {} UTC", date, time)
            }
            None => s.to_string(),
        },
        None => " ".repeat(23),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(1024), "1.00 KB");
        assert_eq!(format_bytes(1536), "1.50 KB");
        assert_eq!(format_bytes(1048576), "1.00 MB");
    }

    #[test]
    fn test_format_bytes_compact() {
        assert_eq!(format_bytes_compact(0), "0B");
        assert_eq!(format_bytes_compact(13), "13B");
        assert_eq!(format_bytes_compact(1536), "1.5KiB");
        assert_eq!(format_bytes_compact(20 * 1024 * 1024), "20MiB");
    }

    #[test]
    fn test_format_oss_date() {
        assert_eq!(
            format_oss_date(Some("2012-02-24T08:43:07.000Z")),
            "2012-02-24 08:43:07 UTC"
        );
        assert_eq!(format_oss_date(Some("yesterday")), "yesterday");
        assert_eq!(format_oss_date(None).len(), 23);
    }

    #[test]
    fn test_list_params_to_options() {
        let params = ListParams {
            prefix: Some("logs/".to_string()),
            max_keys: Some(50),
            ..Default::default()
        };
        let options = params.to_options();
        assert_eq!(options.queries.get("prefix").map(String::as_str), Some("logs/"));
        assert_eq!(options.queries.get("max-keys").map(String::as_str), Some("50"));
        assert!(!options.queries.contains_key("marker"));
    }
}
