//! Client entry point and the service/bucket/object facades
//!
//! Facades are created lazily, once per client, and share the client's
//! context, dispatcher and clock. Every facade method builds one
//! [`PendingRequest`], awaits one transport exchange and wraps the result
//! in a [`Response`] with the operation's fixed [`BodyFormat`].

use bytes::Bytes;
use std::str::FromStr;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use crate::oss::clock::{Clock, SystemClock};
use crate::oss::context::OssContext;
use crate::oss::dispatch::Dispatcher;
use crate::oss::error::{OssError, Result};
use crate::oss::request::{PendingRequest, RequestOptions, Verb, CONTENT_LENGTH};
use crate::oss::response::{BodyFormat, Response};
use crate::oss::transport::Transport;
use crate::oss::xml;

pub const COPY_SOURCE_HEADER: &str = "x-oss-copy-source";
pub const OBJECT_ACL_HEADER: &str = "x-oss-object-acl";
pub const SYMLINK_TARGET_HEADER: &str = "x-oss-symlink-target";

/// State shared by the client and every facade it hands out
struct ClientInner<T> {
    context: RwLock<OssContext>,
    dispatcher: Dispatcher<T>,
    clock: Arc<dyn Clock>,
}

impl<T: Transport> ClientInner<T> {
    fn context(&self) -> OssContext {
        self.context
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn update(&self, f: impl FnOnce(&mut OssContext)) {
        let mut context = self.context.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut context);
    }

    /// New request against a snapshot of the current context
    fn request(&self, verb: Verb, options: RequestOptions) -> PendingRequest {
        let mut request = PendingRequest::new(verb, self.context());
        request.apply(options);
        request
    }

    async fn execute(&self, request: PendingRequest, format: BodyFormat) -> Result<Response> {
        let signed = request.finalize(self.clock.now());
        let response = self.dispatcher.send(signed).await?;
        Ok(Response::new(format, response))
    }
}

/// Object storage client
///
/// ```no_run
/// # async fn demo() -> osskit::oss::Result<()> {
/// use osskit::oss::{HyperTransport, OssClient, OssContext, RequestOptions, TransportOptions};
///
/// let context = OssContext::new("bucket", "oss-cn-hangzhou.aliyuncs.com", "id", "secret");
/// let transport = HyperTransport::new(TransportOptions::default())
///     .map_err(osskit::oss::RequestError::from)?;
/// let client = OssClient::new(context, transport);
///
/// let listing = client.bucket().list_objects(RequestOptions::new().query("prefix", "logs/")).await?;
/// println!("{:?}", listing.xml()?);
/// # Ok(())
/// # }
/// ```
pub struct OssClient<T> {
    inner: Arc<ClientInner<T>>,
    service: OnceLock<ServiceResource<T>>,
    bucket: OnceLock<BucketResource<T>>,
    object: OnceLock<ObjectResource<T>>,
}

impl<T> std::fmt::Debug for OssClient<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let context = self
            .inner
            .context
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("OssClient")
            .field("context", &*context)
            .finish_non_exhaustive()
    }
}

impl<T: Transport> OssClient<T> {
    pub fn new(context: OssContext, transport: T) -> Self {
        Self::with_clock(context, transport, SystemClock)
    }

    /// Client whose `Date` headers come from `clock`
    pub fn with_clock(context: OssContext, transport: T, clock: impl Clock + 'static) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                context: RwLock::new(context),
                dispatcher: Dispatcher::new(transport),
                clock: Arc::new(clock),
            }),
            service: OnceLock::new(),
            bucket: OnceLock::new(),
            object: OnceLock::new(),
        }
    }

    /// Snapshot of the current context
    pub fn context(&self) -> OssContext {
        self.inner.context()
    }

    pub fn transport(&self) -> &T {
        self.inner.dispatcher.transport()
    }

    pub fn bucket_name(&self) -> String {
        self.context().bucket().to_string()
    }

    pub fn set_bucket(&self, bucket: impl Into<String>) -> &Self {
        let bucket = bucket.into();
        self.inner.update(|c| c.set_bucket(bucket));
        self
    }

    pub fn endpoint(&self) -> String {
        self.context().endpoint().to_string()
    }

    pub fn set_endpoint(&self, endpoint: impl Into<String>) -> &Self {
        let endpoint = endpoint.into();
        self.inner.update(|c| c.set_endpoint(endpoint));
        self
    }

    pub fn access_key_id(&self) -> String {
        self.context().access_key_id().to_string()
    }

    pub fn set_access_key_id(&self, access_key_id: impl Into<String>) -> &Self {
        let access_key_id = access_key_id.into();
        self.inner.update(|c| c.set_access_key_id(access_key_id));
        self
    }

    pub fn set_access_key_secret(&self, access_key_secret: impl Into<String>) -> &Self {
        let access_key_secret = access_key_secret.into();
        self.inner.update(|c| c.set_access_key_secret(access_key_secret));
        self
    }

    pub fn is_secure(&self) -> bool {
        self.context().is_secure()
    }

    pub fn set_secure(&self, secure: bool) -> &Self {
        self.inner.update(|c| c.set_secure(secure));
        self
    }

    pub fn service(&self) -> &ServiceResource<T> {
        self.service.get_or_init(|| ServiceResource {
            inner: Arc::clone(&self.inner),
        })
    }

    pub fn bucket(&self) -> &BucketResource<T> {
        self.bucket.get_or_init(|| BucketResource {
            inner: Arc::clone(&self.inner),
        })
    }

    pub fn object(&self) -> &ObjectResource<T> {
        self.object.get_or_init(|| ObjectResource {
            inner: Arc::clone(&self.inner),
        })
    }

    /// Look a facade up by name (`service`, `bucket` or `object`)
    pub fn resource(&self, name: &str) -> Result<ResourceRef<'_, T>> {
        let resource = match name.parse::<ResourceKind>()? {
            ResourceKind::Service => ResourceRef::Service(self.service()),
            ResourceKind::Bucket => ResourceRef::Bucket(self.bucket()),
            ResourceKind::Object => ResourceRef::Object(self.object()),
        };
        Ok(resource)
    }
}

/// Names accepted by [`OssClient::resource`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Service,
    Bucket,
    Object,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Service => "service",
            ResourceKind::Bucket => "bucket",
            ResourceKind::Object => "object",
        }
    }
}

impl FromStr for ResourceKind {
    type Err = OssError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "service" => Ok(ResourceKind::Service),
            "bucket" => Ok(ResourceKind::Bucket),
            "object" => Ok(ResourceKind::Object),
            other => Err(OssError::ResourceNotFound(other.to_string())),
        }
    }
}

/// A facade borrowed from the client's registry
pub enum ResourceRef<'a, T> {
    Service(&'a ServiceResource<T>),
    Bucket(&'a BucketResource<T>),
    Object(&'a ObjectResource<T>),
}

impl<'a, T> ResourceRef<'a, T> {
    pub fn kind(&self) -> ResourceKind {
        match self {
            ResourceRef::Service(_) => ResourceKind::Service,
            ResourceRef::Bucket(_) => ResourceKind::Bucket,
            ResourceRef::Object(_) => ResourceKind::Object,
        }
    }

    pub fn as_service(&self) -> Option<&'a ServiceResource<T>> {
        match *self {
            ResourceRef::Service(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bucket(&self) -> Option<&'a BucketResource<T>> {
        match *self {
            ResourceRef::Bucket(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&'a ObjectResource<T>> {
        match *self {
            ResourceRef::Object(o) => Some(o),
            _ => None,
        }
    }
}

/// Account-level operations, sent to the bare endpoint
pub struct ServiceResource<T> {
    inner: Arc<ClientInner<T>>,
}

impl<T: Transport> ServiceResource<T> {
    /// List the account's buckets (`GET /` on the endpoint host)
    pub async fn get_service(&self, options: RequestOptions) -> Result<Response> {
        let mut request = self.inner.request(Verb::Get, options);
        request.without_bucket();
        self.inner.execute(request, BodyFormat::Xml).await
    }

    pub async fn list_buckets(&self, options: RequestOptions) -> Result<Response> {
        self.get_service(options).await
    }
}

/// Bucket-level operations
pub struct BucketResource<T> {
    inner: Arc<ClientInner<T>>,
}

impl<T: Transport> BucketResource<T> {
    /// List objects; `prefix`, `marker`, `max-keys` and `delimiter` go in `options`
    pub async fn get_bucket(&self, options: RequestOptions) -> Result<Response> {
        let request = self.inner.request(Verb::Get, options);
        self.inner.execute(request, BodyFormat::Xml).await
    }

    pub async fn list_objects(&self, options: RequestOptions) -> Result<Response> {
        self.get_bucket(options).await
    }
}

/// Object-level operations
pub struct ObjectResource<T> {
    inner: Arc<ClientInner<T>>,
}

impl<T: Transport> ObjectResource<T> {
    pub async fn put_object(
        &self,
        path: &str,
        contents: impl Into<Bytes>,
        options: RequestOptions,
    ) -> Result<Response> {
        let contents = contents.into();
        let mut request = self.inner.request(Verb::Put, options);
        request
            .set_path(path)
            .set_header(CONTENT_LENGTH, contents.len().to_string())
            .set_body(contents);
        self.inner.execute(request, BodyFormat::Raw).await
    }

    /// Server-side copy of `from_path` to `new_path`.
    ///
    /// The source bucket defaults to the client's bucket.
    pub async fn copy_object(
        &self,
        from_path: &str,
        new_path: &str,
        from_bucket: Option<&str>,
        options: RequestOptions,
    ) -> Result<Response> {
        let mut request = self.inner.request(Verb::Put, options);
        let source = match from_bucket {
            Some(bucket) => copy_source(bucket, from_path),
            None => copy_source(request.context().bucket(), from_path),
        };
        request
            .set_path(new_path)
            .set_header(COPY_SOURCE_HEADER, source);
        self.inner.execute(request, BodyFormat::Xml).await
    }

    pub async fn get_object(&self, path: &str, options: RequestOptions) -> Result<Response> {
        let mut request = self.inner.request(Verb::Get, options);
        request.set_path(path);
        self.inner.execute(request, BodyFormat::Raw).await
    }

    /// Append `contents` to an appendable object at byte offset `position`
    pub async fn append_object(
        &self,
        path: &str,
        contents: impl Into<Bytes>,
        position: u64,
        options: RequestOptions,
    ) -> Result<Response> {
        let mut request = self.inner.request(Verb::Post, options);
        request
            .set_path(path)
            .set_sub_resource("append")
            .set_query("position", position.to_string())
            .set_body(contents);
        self.inner.execute(request, BodyFormat::Raw).await
    }

    pub async fn delete_object(&self, path: &str, options: RequestOptions) -> Result<Response> {
        let mut request = self.inner.request(Verb::Delete, options);
        request.set_path(path);
        self.inner.execute(request, BodyFormat::Raw).await
    }

    /// Delete several objects in one request.
    ///
    /// `quiet` is written verbatim into `<Quiet>`: in quiet mode the service
    /// only reports keys it failed to delete.
    pub async fn delete_multiple_objects<S: AsRef<str>>(
        &self,
        paths: &[S],
        quiet: bool,
        options: RequestOptions,
    ) -> Result<Response> {
        let mut request = self.inner.request(Verb::Post, options);
        request
            .set_sub_resource("delete")
            .set_body(delete_body(paths, quiet));
        self.inner.execute(request, BodyFormat::Xml).await
    }

    /// Object metadata in the response headers
    pub async fn head_object(&self, path: &str, options: RequestOptions) -> Result<Response> {
        let mut request = self.inner.request(Verb::Head, options);
        request.set_path(path);
        self.inner.execute(request, BodyFormat::Raw).await
    }

    pub async fn get_object_meta(&self, path: &str, options: RequestOptions) -> Result<Response> {
        self.head_object(path, options).await
    }

    /// Set the object ACL (`private`, `public-read`, `public-read-write` or `default`)
    pub async fn put_object_acl(
        &self,
        path: &str,
        permission: &str,
        options: RequestOptions,
    ) -> Result<Response> {
        let mut request = self.inner.request(Verb::Put, options);
        request
            .set_path(path)
            .set_sub_resource("acl")
            .set_header(OBJECT_ACL_HEADER, permission);
        self.inner.execute(request, BodyFormat::Raw).await
    }

    pub async fn get_object_acl(&self, path: &str, options: RequestOptions) -> Result<Response> {
        let mut request = self.inner.request(Verb::Get, options);
        request.set_path(path).set_sub_resource("acl");
        self.inner.execute(request, BodyFormat::Xml).await
    }

    pub async fn put_symlink(
        &self,
        path: &str,
        target: &str,
        options: RequestOptions,
    ) -> Result<Response> {
        let mut request = self.inner.request(Verb::Put, options);
        request
            .set_path(path)
            .set_sub_resource("symlink")
            .set_header(SYMLINK_TARGET_HEADER, target);
        self.inner.execute(request, BodyFormat::Raw).await
    }

    /// The target comes back in the `x-oss-symlink-target` response header
    pub async fn get_symlink(&self, path: &str, options: RequestOptions) -> Result<Response> {
        let mut request = self.inner.request(Verb::Get, options);
        request.set_path(path).set_sub_resource("symlink");
        self.inner.execute(request, BodyFormat::Raw).await
    }

    /// Start restoring an archived object
    pub async fn restore_object(&self, path: &str, options: RequestOptions) -> Result<Response> {
        let mut request = self.inner.request(Verb::Post, options);
        request.set_path(path).set_sub_resource("restore");
        self.inner.execute(request, BodyFormat::Raw).await
    }

    /// Browser form uploads are not supported
    pub fn post_object(&self, _path: &str, _options: RequestOptions) -> Result<Response> {
        Err(OssError::UnsupportedOperation("PostObject".to_string()))
    }

    pub fn callback(&self) -> Result<Response> {
        Err(OssError::UnsupportedOperation("Callback".to_string()))
    }

    pub fn select_object(&self) -> Result<Response> {
        Err(OssError::UnsupportedOperation("Select".to_string()))
    }
}

/// `/bucket/path` with surrounding slashes trimmed from both parts
fn copy_source(bucket: &str, path: &str) -> String {
    format!("/{}/{}", bucket.trim_matches('/'), path.trim_matches('/'))
}

fn delete_body<S: AsRef<str>>(paths: &[S], quiet: bool) -> String {
    let mut body = String::with_capacity(96 + paths.len() * 48);
    body.push_str(r#"<?xml version="1.0" encoding="UTF-8"?><Delete><Quiet>"#);
    body.push_str(if quiet { "true" } else { "false" });
    body.push_str("</Quiet>");
    for path in paths {
        body.push_str("<Object><Key>");
        xml::escape_into(&mut body, path.as_ref());
        body.push_str("</Key></Object>");
    }
    body.push_str("</Delete>");
    body
}
