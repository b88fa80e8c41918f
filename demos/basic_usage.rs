//! Basic usage example for osskit
//!
//! Reads credentials from the environment (`OSS_ENDPOINT`, `OSS_BUCKET`,
//! `OSS_ACCESS_KEY_ID`, `OSS_ACCESS_KEY_SECRET`) and runs a few object
//! operations against the configured bucket.
//!
//! Run with:
//! ```
//! cargo run --example basic_usage
//! ```

use anyhow::{Context, Result};
use osskit::oss::{
    HyperTransport, ListObjectsResult, OssClient, RequestOptions, TransportOptions,
};

#[tokio::main]
async fn main() -> Result<()> {
    let config = osskit::config::load_from_env()?;
    let profile = config.get_profile(None).context("No profile configured")?;

    let transport = HyperTransport::new(TransportOptions::default())?;
    let client = OssClient::new(profile.to_context(), transport);

    println!("osskit - Basic Usage Example");
    println!("============================\n");

    // Example 1: Put object
    println!("1. Uploading object...");
    let response = client
        .object()
        .put_object("demo/example.txt", "Hello, OSS!", RequestOptions::new())
        .await?;
    println!("   Uploaded with ETag: {}\n", response.header("ETag").unwrap_or("-"));

    // Example 2: Get object
    println!("2. Downloading object...");
    let response = client
        .object()
        .get_object("demo/example.txt", RequestOptions::new())
        .await?;
    println!("   Content: {}\n", String::from_utf8_lossy(response.raw_body()));

    // Example 3: Append to an appendable object
    println!("3. Appending...");
    let response = client
        .object()
        .append_object("demo/append.log", "first line\n", 0, RequestOptions::new())
        .await?;
    println!(
        "   Next append position: {}\n",
        response.header("x-oss-next-append-position").unwrap_or("-")
    );

    // Example 4: List objects
    println!("4. Listing objects with prefix 'demo/'...");
    let response = client
        .bucket()
        .list_objects(RequestOptions::new().query("prefix", "demo/").query("max-keys", "10"))
        .await?;
    let listing = ListObjectsResult::from_xml(response.xml()?);
    for object in &listing.contents {
        println!("   - {} ({} bytes)", object.key, object.size);
    }
    println!();

    // Example 5: Delete both objects in one request
    println!("5. Deleting objects...");
    client
        .object()
        .delete_multiple_objects(&["demo/example.txt", "demo/append.log"], true, RequestOptions::new())
        .await?;
    println!("   Deleted\n");

    // Errors keep the service response for inspection
    match client.object().head_object("demo/example.txt", RequestOptions::new()).await {
        Ok(_) => println!("Object still exists"),
        Err(e) => match e.as_request_error() {
            Some(err) if err.has_response() => println!("HEAD after delete: HTTP {:?}", err.status()),
            _ => println!("HEAD failed: {}", e),
        },
    }

    Ok(())
}
