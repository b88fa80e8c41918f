use clap::{Parser, Subcommand};

/// osskit - OSS object storage client
#[derive(Parser, Debug)]
#[command(name = "osskit")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file path (YAML); environment variables are used when omitted
    #[arg(long, global = true, env = "OSSKIT_CONFIG")]
    pub config: Option<String>,

    /// Profile to use from config
    #[arg(long, global = true, env = "OSSKIT_PROFILE")]
    pub profile: Option<String>,

    /// Bucket to use instead of the profile's bucket
    #[arg(long, short, global = true)]
    pub bucket: Option<String>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    /// Disable SSL certificate verification
    #[arg(long, global = true)]
    pub insecure: bool,

    /// Output format (text, json)
    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List buckets owned by the account
    Buckets,

    /// List objects in the bucket
    Ls {
        /// Only keys starting with this prefix
        #[arg(long)]
        prefix: Option<String>,

        /// Start listing after this key
        #[arg(long)]
        marker: Option<String>,

        /// Maximum number of keys to return
        #[arg(long)]
        max_keys: Option<u32>,

        /// Group keys sharing a prefix up to this delimiter
        #[arg(long)]
        delimiter: Option<String>,
    },

    /// Upload a local file
    Put {
        /// Local file path
        #[arg(value_name = "FILE")]
        file: String,

        /// Object key
        #[arg(value_name = "KEY")]
        key: String,

        /// Content type
        #[arg(long)]
        content_type: Option<String>,
    },

    /// Download an object (to stdout when DEST is omitted)
    Get {
        /// Object key
        #[arg(value_name = "KEY")]
        key: String,

        /// Local destination path
        #[arg(value_name = "DEST")]
        dest: Option<String>,
    },

    /// Append a local file to an appendable object
    Append {
        /// Local file path
        #[arg(value_name = "FILE")]
        file: String,

        /// Object key
        #[arg(value_name = "KEY")]
        key: String,

        /// Byte offset to append at (current object length)
        #[arg(long, default_value = "0")]
        position: u64,
    },

    /// Copy an object inside the service
    Cp {
        /// Source key
        #[arg(value_name = "FROM")]
        from: String,

        /// Destination key
        #[arg(value_name = "TO")]
        to: String,

        /// Source bucket (defaults to the current bucket)
        #[arg(long)]
        from_bucket: Option<String>,
    },

    /// Delete one or more objects
    Rm {
        /// Object keys
        #[arg(value_name = "KEY", required = true)]
        keys: Vec<String>,

        /// Only report failures when deleting several keys
        #[arg(long)]
        quiet: bool,
    },

    /// Show object metadata
    Stat {
        /// Object key
        #[arg(value_name = "KEY")]
        key: String,
    },

    /// Read or change an object ACL
    Acl {
        #[command(subcommand)]
        action: AclAction,
    },

    /// Create or read a symlink
    Symlink {
        #[command(subcommand)]
        action: SymlinkAction,
    },

    /// Restore an archived object
    Restore {
        /// Object key
        #[arg(value_name = "KEY")]
        key: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum AclAction {
    /// Show the object ACL
    Get {
        #[arg(value_name = "KEY")]
        key: String,
    },

    /// Set the object ACL
    Set {
        #[arg(value_name = "KEY")]
        key: String,

        /// private, public-read, public-read-write or default
        #[arg(value_name = "PERMISSION", value_parser = ["private", "public-read", "public-read-write", "default"])]
        permission: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum SymlinkAction {
    /// Point KEY at TARGET
    Create {
        #[arg(value_name = "KEY")]
        key: String,

        #[arg(value_name = "TARGET")]
        target: String,
    },

    /// Show the target of KEY
    Get {
        #[arg(value_name = "KEY")]
        key: String,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
