//! CLI module for osskit
//!
//! Thin command-line front end over [`crate::oss::OssClient`]. Each
//! subcommand maps to one facade operation.
//!
//! # Usage
//!
//! ```bash
//! # List buckets
//! osskit buckets
//!
//! # List objects under a prefix
//! osskit ls --prefix logs/ --max-keys 100
//!
//! # Upload and download
//! osskit put ./report.pdf reports/2024.pdf
//! osskit get reports/2024.pdf ./copy.pdf
//!
//! # Delete several objects in one request
//! osskit rm a.txt b.txt --quiet
//! ```

pub mod args;
pub mod commands;

use anyhow::{Context, Result};
use std::io::Write;
use tracing::{debug, info};

use crate::config;
use crate::oss::{HyperTransport, OssClient, Transport};
use args::{AclAction, Cli, Commands, SymlinkAction};
use commands::*;

/// Run the CLI application against a configured client
pub async fn run(cli: Cli) -> Result<()> {
    debug!("CLI arguments: {:?}", cli);

    let mut config = config::load_config(cli.config.as_deref(), cli.profile.as_deref())?;
    if cli.insecure {
        config.http.insecure_tls = true;
    }

    let profile = config
        .get_profile(cli.profile.as_deref())
        .context("No profile configured")?;

    let mut context = profile.to_context();
    if let Some(bucket) = &cli.bucket {
        context.set_bucket(bucket.as_str());
    }

    let transport = HyperTransport::new(config.http.transport_options())
        .context("Failed to create HTTP transport")?;
    let client = OssClient::new(context, transport);

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    execute(&client, cli, &mut out).await?;
    out.flush()?;

    info!("Command completed successfully");
    Ok(())
}

/// Dispatch one parsed command
pub async fn execute<T: Transport>(
    client: &OssClient<T>,
    cli: Cli,
    out: &mut impl Write,
) -> Result<()> {
    let format = cli.format;

    if !matches!(cli.command, Commands::Buckets) && client.bucket_name().is_empty() {
        anyhow::bail!("No bucket configured: set one in the profile, OSS_BUCKET or --bucket");
    }

    match cli.command {
        Commands::Buckets => cmd_buckets(client, format, out).await?,

        Commands::Ls {
            prefix,
            marker,
            max_keys,
            delimiter,
        } => {
            let params = ListParams {
                prefix,
                marker,
                max_keys,
                delimiter,
            };
            cmd_ls(client, &params, format, out).await?;
        }

        Commands::Put {
            file,
            key,
            content_type,
        } => cmd_put(client, &file, &key, content_type.as_deref(), format, out).await?,

        Commands::Get { key, dest } => cmd_get(client, &key, dest.as_deref(), out).await?,

        Commands::Append {
            file,
            key,
            position,
        } => cmd_append(client, &file, &key, position, format, out).await?,

        Commands::Cp {
            from,
            to,
            from_bucket,
        } => cmd_cp(client, &from, &to, from_bucket.as_deref(), format, out).await?,

        Commands::Rm { keys, quiet } => cmd_rm(client, &keys, quiet, format, out).await?,

        Commands::Stat { key } => cmd_stat(client, &key, format, out).await?,

        Commands::Acl { action } => match action {
            AclAction::Get { key } => cmd_acl_get(client, &key, format, out).await?,
            AclAction::Set { key, permission } => {
                cmd_acl_set(client, &key, &permission, format, out).await?
            }
        },

        Commands::Symlink { action } => match action {
            SymlinkAction::Create { key, target } => {
                cmd_symlink_create(client, &key, &target, format, out).await?
            }
            SymlinkAction::Get { key } => cmd_symlink_get(client, &key, format, out).await?,
        },

        Commands::Restore { key } => cmd_restore(client, &key, format, out).await?,
    }

    Ok(())
}
