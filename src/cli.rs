//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// subpartners - click statistics for your referred sub-partners
///
/// Lists the users referred by a partner code together with their direct
/// clicks and the bonus clicks the partner earns from them (20%).
///
/// Examples:
///   subpartners --partner P123 --url https://abc.supabase.co --api-key KEY
///   subpartners --partner P123 --limit 10 --format markdown
///   subpartners --partner P123 --fixture demo.json --format json
///   subpartners --partner P123 --watch 30
///   subpartners --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Partner code whose sub-partners are listed
    #[arg(
        short,
        long,
        value_name = "CODE",
        env = "SUBPARTNERS_PARTNER",
        required_unless_present = "init_config"
    )]
    pub partner: Option<String>,

    /// Maximum number of sub-partners to show (newest first)
    ///
    /// Default: from config or 5.
    #[arg(short, long, value_name = "COUNT")]
    pub limit: Option<usize>,

    /// Base URL of the data service (e.g. https://abc.supabase.co)
    #[arg(long, value_name = "URL", env = "SUBPARTNERS_URL")]
    pub url: Option<String>,

    /// API key sent as `apikey` header and bearer token
    #[arg(long, value_name = "KEY", env = "SUBPARTNERS_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Read users and clicks from a JSON fixture instead of the data service
    #[arg(long, value_name = "FILE")]
    pub fixture: Option<PathBuf>,

    /// Output format (table, markdown, json)
    #[arg(short, long, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// Write the output to a file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Re-fetch and re-render every SECS seconds until interrupted
    #[arg(short, long, value_name = "SECS")]
    pub watch: Option<u64>,

    /// Request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .subpartners.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (no spinner, errors only)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .subpartners.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the rendered table.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Aligned plain-text table (default)
    #[default]
    Table,
    /// Markdown table
    Markdown,
    /// JSON document
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Get the partner code, empty if not set (should be validated first).
    pub fn partner_code(&self) -> &str {
        self.partner.as_deref().unwrap_or("")
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        if self.partner_code().trim().is_empty() {
            return Err("Partner code must not be empty".to_string());
        }

        if self.limit == Some(0) {
            return Err("Limit must be at least 1".to_string());
        }

        if let Some(ref url) = self.url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err("Data service URL must start with 'http://' or 'https://'".to_string());
            }
        }

        if let Some(ref fixture) = self.fixture {
            if !fixture.is_file() {
                return Err(format!("Fixture file does not exist: {}", fixture.display()));
            }
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if self.timeout == Some(0) {
            return Err("Timeout must be at least 1 second".to_string());
        }

        if self.watch == Some(0) {
            return Err("Watch interval must be at least 1 second".to_string());
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
