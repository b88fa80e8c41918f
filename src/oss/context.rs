//! Bucket, endpoint and credentials for a client

/// Everything needed to address and sign a request.
///
/// The endpoint is kept as a bare host (`oss-cn-hangzhou.aliyuncs.com`);
/// the scheme comes from `secure`. The endpoint must not be empty. An empty
/// bucket is allowed for service-level use: requests built against it
/// address the endpoint directly.
#[derive(Clone, PartialEq, Eq)]
pub struct OssContext {
    bucket: String,
    endpoint: String,
    access_key_id: String,
    access_key_secret: String,
    secure: bool,
}

impl std::fmt::Debug for OssContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OssContext")
            .field("bucket", &self.bucket)
            .field("endpoint", &self.endpoint)
            .field("access_key_id", &self.access_key_id)
            .field("access_key_secret", &"<redacted>")
            .field("secure", &self.secure)
            .finish()
    }
}

impl OssContext {
    pub fn new(
        bucket: impl Into<String>,
        endpoint: impl Into<String>,
        access_key_id: impl Into<String>,
        access_key_secret: impl Into<String>,
    ) -> Self {
        let mut context = Self {
            bucket: bucket.into(),
            endpoint: String::new(),
            access_key_id: access_key_id.into(),
            access_key_secret: access_key_secret.into(),
            secure: true,
        };
        context.set_endpoint(endpoint);
        context
    }

    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn set_bucket(&mut self, bucket: impl Into<String>) {
        self.bucket = bucket.into();
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Store the endpoint host.
    ///
    /// A leading `http://` or `https://` is stripped and decides `secure`;
    /// trailing slashes are dropped.
    pub fn set_endpoint(&mut self, endpoint: impl Into<String>) {
        let endpoint = endpoint.into();
        let host = if let Some(rest) = endpoint.strip_prefix("https://") {
            self.secure = true;
            rest
        } else if let Some(rest) = endpoint.strip_prefix("http://") {
            self.secure = false;
            rest
        } else {
            endpoint.as_str()
        };
        self.endpoint = host.trim_end_matches('/').to_string();
    }

    pub fn access_key_id(&self) -> &str {
        &self.access_key_id
    }

    pub fn set_access_key_id(&mut self, access_key_id: impl Into<String>) {
        self.access_key_id = access_key_id.into();
    }

    pub fn access_key_secret(&self) -> &str {
        &self.access_key_secret
    }

    pub fn set_access_key_secret(&mut self, access_key_secret: impl Into<String>) {
        self.access_key_secret = access_key_secret.into();
    }

    pub fn is_secure(&self) -> bool {
        self.secure
    }

    pub fn set_secure(&mut self, secure: bool) {
        self.secure = secure;
    }

    pub fn scheme(&self) -> &'static str {
        if self.secure {
            "https"
        } else {
            "http"
        }
    }

    /// `bucket.endpoint`, or the bare endpoint for service-level requests
    pub fn domain(&self, with_bucket: bool) -> String {
        if with_bucket {
            format!("{}.{}", self.bucket, self.endpoint)
        } else {
            self.endpoint.clone()
        }
    }
}
