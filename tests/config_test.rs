use std::env;
use std::fs;
use tempfile::TempDir;

const ENV_VARS: &[&str] = &[
    "OSS_ENDPOINT",
    "OSS_ACCESS_KEY_ID",
    "OSS_ACCESS_KEY_SECRET",
    "OSS_BUCKET",
    "OSS_SECURE",
    "OSS_REQUEST_TIMEOUT",
    "OSS_CONNECT_TIMEOUT",
    "OSS_INSECURE_TLS",
];

fn write_config(yaml: &str) -> (TempDir, std::path::PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, yaml).unwrap();
    (temp_dir, config_path)
}

/// Test loading configuration from YAML file
#[test]
fn test_load_yaml_config() {
    let yaml = r#"
profiles:
  test:
    endpoint: https://oss-cn-shanghai.aliyuncs.com
    bucket: test-bucket
    access_key_id: LTAITEST
    access_key_secret: secrettest

default_profile: test

http:
  request_timeout: 120
  connect_timeout: 3
  insecure_tls: true
"#;

    let (_dir, config_path) = write_config(yaml);
    let config = osskit::config::load_from_yaml(&config_path).unwrap();

    assert_eq!(config.profiles.len(), 1);
    let profile = config.profiles.get("test").unwrap();
    assert_eq!(profile.endpoint, "https://oss-cn-shanghai.aliyuncs.com");
    assert_eq!(profile.access_key_id, "LTAITEST");
    assert_eq!(profile.access_key_secret, "secrettest");
    assert_eq!(profile.bucket, Some("test-bucket".to_string()));
    assert!(profile.secure);

    assert_eq!(config.default_profile, Some("test".to_string()));
    assert_eq!(config.http.request_timeout, 120);
    assert_eq!(config.http.connect_timeout, 3);
    assert!(config.http.insecure_tls);

    let context = profile.to_context();
    assert_eq!(context.endpoint(), "oss-cn-shanghai.aliyuncs.com");
    assert_eq!(context.domain(true), "test-bucket.oss-cn-shanghai.aliyuncs.com");
}

/// Test loading configuration from environment variables
///
/// All environment cases live in one test: the process environment is shared
/// between test threads.
#[test]
fn test_load_env_config() {
    let saved: Vec<(&str, Option<String>)> =
        ENV_VARS.iter().map(|name| (*name, env::var(name).ok())).collect();
    for name in ENV_VARS {
        env::remove_var(name);
    }

    // Required variables missing
    env::set_var("OSS_ENDPOINT", "oss-cn-hangzhou.aliyuncs.com");
    let err = osskit::config::load_from_env().unwrap_err();
    assert!(err.to_string().contains("OSS_ACCESS_KEY_ID"));

    // Minimal set
    env::set_var("OSS_ACCESS_KEY_ID", "env_id");
    env::set_var("OSS_ACCESS_KEY_SECRET", "env_secret");
    let config = osskit::config::load_from_env().unwrap();

    assert_eq!(config.profiles.len(), 1);
    assert_eq!(config.default_profile, Some("default".to_string()));
    let profile = config.get_profile(None).unwrap();
    assert_eq!(profile.endpoint, "oss-cn-hangzhou.aliyuncs.com");
    assert_eq!(profile.access_key_id, "env_id");
    assert_eq!(profile.access_key_secret, "env_secret");
    assert_eq!(profile.bucket, None);
    assert!(profile.secure);
    assert_eq!(config.http.request_timeout, 60);

    // Optional overrides
    env::set_var("OSS_BUCKET", "env-bucket");
    env::set_var("OSS_SECURE", "false");
    env::set_var("OSS_REQUEST_TIMEOUT", "15");
    env::set_var("OSS_CONNECT_TIMEOUT", "not-a-number");
    env::set_var("OSS_INSECURE_TLS", "true");
    let config = osskit::config::load_from_env().unwrap();

    let profile = config.get_profile(Some("default")).unwrap();
    assert_eq!(profile.bucket, Some("env-bucket".to_string()));
    assert!(!profile.secure);
    assert_eq!(profile.to_context().scheme(), "http");
    assert_eq!(config.http.request_timeout, 15);
    assert_eq!(config.http.connect_timeout, 10);
    assert!(config.http.insecure_tls);

    // load_config without a path falls back to the environment
    let config = osskit::config::load_config(None, None).unwrap();
    assert!(config.profiles.contains_key("default"));

    for (name, value) in saved {
        cleanup_env(name, value);
    }
}

/// Test default values
#[test]
fn test_default_values() {
    let yaml = r#"
profiles:
  minimal:
    endpoint: oss-cn-beijing.aliyuncs.com
    access_key_id: id
    access_key_secret: secret
"#;

    let (_dir, config_path) = write_config(yaml);
    let config = osskit::config::load_from_yaml(&config_path).unwrap();

    let profile = config.profiles.get("minimal").unwrap();
    assert_eq!(profile.bucket, None);
    assert!(profile.secure);

    assert_eq!(config.default_profile, None);
    assert_eq!(config.http.request_timeout, 60);
    assert_eq!(config.http.connect_timeout, 10);
    assert!(!config.http.insecure_tls);
}

/// Test get_profile method
#[test]
fn test_get_profile() {
    let yaml = r#"
profiles:
  prod:
    endpoint: oss-cn-hangzhou.aliyuncs.com
    access_key_id: prod_id
    access_key_secret: prod_secret
  dev:
    endpoint: http://localhost:9000
    access_key_id: dev_id
    access_key_secret: dev_secret
default_profile: dev
"#;

    let (_dir, config_path) = write_config(yaml);
    let config = osskit::config::load_from_yaml(&config_path).unwrap();

    assert_eq!(config.get_profile(None).unwrap().access_key_id, "dev_id");
    assert_eq!(config.get_profile(Some("prod")).unwrap().access_key_id, "prod_id");
    assert!(config.get_profile(Some("staging")).is_none());
}

/// Test load_config with a profile selection
#[test]
fn test_load_config_with_profile() {
    let yaml = r#"
profiles:
  a:
    endpoint: oss-cn-hangzhou.aliyuncs.com
    access_key_id: a_id
    access_key_secret: a_secret
  b:
    endpoint: oss-cn-beijing.aliyuncs.com
    access_key_id: b_id
    access_key_secret: b_secret
"#;

    let (_dir, config_path) = write_config(yaml);
    let path = config_path.to_str().unwrap();

    let config = osskit::config::load_config(Some(path), Some("b")).unwrap();
    assert_eq!(config.default_profile, Some("b".to_string()));
    assert_eq!(config.get_profile(None).unwrap().access_key_id, "b_id");

    let err = osskit::config::load_config(Some(path), Some("missing")).unwrap_err();
    assert!(err.to_string().contains("Profile 'missing' not found"));
}

/// Test error handling for missing or malformed files
#[test]
fn test_invalid_config_files() {
    assert!(osskit::config::load_from_yaml("/nonexistent/osskit.yaml").is_err());

    let (_dir, config_path) = write_config("profiles: [not, a, map");
    assert!(osskit::config::load_from_yaml(&config_path).is_err());
}

fn cleanup_env(key: &str, original: Option<String>) {
    match original {
        Some(val) => env::set_var(key, val),
        None => env::remove_var(key),
    }
}
