//! osskit - async client for OSS object storage with header-signed requests

pub mod cli;
pub mod config;
pub mod oss;

pub use config::Config;
pub use oss::{OssClient, OssContext, OssError};
