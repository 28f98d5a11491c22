pub mod provision;

use std::path::PathBuf;
use std::time::Duration;

use addrbatch_common::config::{ConfigError, ConfigParts, ManagerConfig};
use addrbatch_core::input::DEFAULT_COUNT;
use clap::Parser;
use clap::builder::BoolishValueParser;

/// Every connection option falls back to its environment variable; a `.env`
/// file in the working directory is loaded first.
#[derive(Parser, Debug)]
#[command(name = "addrbatch", version)]
#[command(about = "Bulk-create firewall address objects inside a locked, committed domain.")]
pub struct CommandLine {
    /// CSV file with a `subnet` column (optional `name`, `comment`, `color`).
    /// Random addresses are generated when omitted.
    pub csv_file: Option<PathBuf>,

    /// Number of random addresses to generate
    #[arg(short = 'n', long, default_value_t = DEFAULT_COUNT)]
    pub count: usize,

    /// Manager address, with an optional port or scheme
    #[arg(long, env = "FMG_IP")]
    pub host: Option<String>,

    #[arg(short, long, env = "FMG_USERNAME")]
    pub username: Option<String>,

    #[arg(short, long, env = "FMG_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Configuration domain (ADOM) to lock and commit
    #[arg(short, long, env = "FMG_ADOM")]
    pub domain: Option<String>,

    /// API token; takes precedence over username and password
    #[arg(long, env = "FMG_API_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Reject self-signed certificates
    #[arg(long, env = "FMG_VERIFY_SSL", value_parser = BoolishValueParser::new())]
    pub verify_tls: bool,

    /// Timeout for each remote call, in seconds
    #[arg(long, env = "FMG_TIMEOUT", default_value_t = 30)]
    pub timeout: u64,

    /// Normalize and print the payloads without contacting the manager
    #[arg(long)]
    pub dry_run: bool,

    /// Log request and response bodies of create calls
    #[arg(short, long)]
    pub verbose: bool,
}

impl CommandLine {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    pub fn manager_config(&self) -> Result<ManagerConfig, ConfigError> {
        ManagerConfig::from_parts(ConfigParts {
            host: self.host.clone(),
            username: self.username.clone(),
            password: self.password.clone(),
            domain: self.domain.clone(),
            token: self.token.clone(),
            verify_tls: self.verify_tls,
            timeout: Some(Duration::from_secs(self.timeout)),
        })
    }
}
