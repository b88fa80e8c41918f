use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use crate::oss::{OssContext, TransportOptions};

/// Name of the single profile built from `OSS_*` variables
pub const ENV_PROFILE: &str = "default";

/// OSS profile: endpoint, credentials and an optional default bucket
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    /// Endpoint host, e.g. `oss-cn-hangzhou.aliyuncs.com` (a scheme prefix is allowed)
    pub endpoint: String,

    /// Optional bucket name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bucket: Option<String>,

    /// Access key ID
    pub access_key_id: String,

    /// Access key secret
    pub access_key_secret: String,

    /// Use HTTPS (default: true)
    #[serde(default = "default_secure")]
    pub secure: bool,
}

fn default_secure() -> bool {
    true
}

impl Profile {
    /// Client context for this profile; an explicit scheme in `endpoint` wins over `secure`
    pub fn to_context(&self) -> OssContext {
        let mut context = OssContext::new(
            self.bucket.clone().unwrap_or_default(),
            "",
            self.access_key_id.clone(),
            self.access_key_secret.clone(),
        )
        .with_secure(self.secure);
        context.set_endpoint(self.endpoint.clone());
        context
    }
}

/// HTTP transport settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,

    /// Connect timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u64,

    /// Skip TLS certificate verification
    #[serde(default)]
    pub insecure_tls: bool,
}

fn default_request_timeout() -> u64 {
    60
}

fn default_connect_timeout() -> u64 {
    10
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout: default_request_timeout(),
            connect_timeout: default_connect_timeout(),
            insecure_tls: false,
        }
    }
}

impl HttpConfig {
    pub fn transport_options(&self) -> TransportOptions {
        TransportOptions {
            request_timeout: Duration::from_secs(self.request_timeout),
            connect_timeout: Duration::from_secs(self.connect_timeout),
            insecure_tls: self.insecure_tls,
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Named profiles for different accounts or regions
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,

    /// Profile used when none is requested
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_profile: Option<String>,

    /// HTTP settings
    #[serde(default)]
    pub http: HttpConfig,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a profile by name, or the default profile if not specified
    pub fn get_profile(&self, name: Option<&str>) -> Option<&Profile> {
        if let Some(name) = name {
            self.profiles.get(name)
        } else if let Some(default) = &self.default_profile {
            self.profiles.get(default)
        } else {
            self.profiles.values().next()
        }
    }
}

/// Load configuration from a YAML file
pub fn load_from_yaml<P: AsRef<Path>>(path: P) -> Result<Config> {
    let content = std::fs::read_to_string(path.as_ref())
        .context(format!("Failed to read config file: {:?}", path.as_ref()))?;

    let config: Config =
        serde_yaml::from_str(&content).context("Failed to parse YAML configuration")?;

    Ok(config)
}

fn env_flag(name: &str) -> Option<bool> {
    std::env::var(name)
        .ok()
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
}

/// Load configuration from environment variables
///
/// - OSS_ENDPOINT (required)
/// - OSS_ACCESS_KEY_ID (required)
/// - OSS_ACCESS_KEY_SECRET (required)
/// - OSS_BUCKET (optional)
/// - OSS_SECURE (optional, defaults to true)
/// - OSS_REQUEST_TIMEOUT / OSS_CONNECT_TIMEOUT (optional, seconds)
/// - OSS_INSECURE_TLS (optional)
pub fn load_from_env() -> Result<Config> {
    // Try to load .env file if it exists (don't fail if it doesn't)
    let _ = dotenvy::dotenv();

    let endpoint = std::env::var("OSS_ENDPOINT")
        .context("OSS_ENDPOINT environment variable not set")?;
    if endpoint.trim().is_empty() {
        anyhow::bail!("OSS_ENDPOINT is empty");
    }

    let access_key_id = std::env::var("OSS_ACCESS_KEY_ID")
        .context("OSS_ACCESS_KEY_ID environment variable not set")?;

    let access_key_secret = std::env::var("OSS_ACCESS_KEY_SECRET")
        .context("OSS_ACCESS_KEY_SECRET environment variable not set")?;

    let profile = Profile {
        endpoint: endpoint.trim().to_string(),
        bucket: std::env::var("OSS_BUCKET").ok().filter(|b| !b.is_empty()),
        access_key_id,
        access_key_secret,
        secure: env_flag("OSS_SECURE").unwrap_or(true),
    };

    let mut config = Config::new();
    config.profiles.insert(ENV_PROFILE.to_string(), profile);
    config.default_profile = Some(ENV_PROFILE.to_string());

    if let Ok(timeout) = std::env::var("OSS_REQUEST_TIMEOUT") {
        if let Ok(val) = timeout.parse() {
            config.http.request_timeout = val;
        }
    }

    if let Ok(timeout) = std::env::var("OSS_CONNECT_TIMEOUT") {
        if let Ok(val) = timeout.parse() {
            config.http.connect_timeout = val;
        }
    }

    if let Some(insecure) = env_flag("OSS_INSECURE_TLS") {
        config.http.insecure_tls = insecure;
    }

    Ok(config)
}

/// Load configuration from file or environment
///
/// With a path the YAML file is used, and `profile_name` (if any) must
/// exist in it and becomes the default. Without a path the environment
/// is used.
pub fn load_config(config_path: Option<&str>, profile_name: Option<&str>) -> Result<Config> {
    if let Some(path) = config_path {
        let mut config = load_from_yaml(path)?;

        if let Some(name) = profile_name {
            if !config.profiles.contains_key(name) {
                anyhow::bail!("Profile '{}' not found in config file", name);
            }
            config.default_profile = Some(name.to_string());
        }

        Ok(config)
    } else {
        // The environment only ever yields the `default` profile
        if let Some(name) = profile_name.filter(|name| *name != ENV_PROFILE) {
            anyhow::bail!(
                "Profile '{}' requires a config file (--config); the environment only provides '{}'",
                name,
                ENV_PROFILE
            );
        }
        load_from_env()
    }
}
