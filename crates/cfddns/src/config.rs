// # Command Line and Config File
//
// Settings come from three layers, lowest precedence first:
//
// 1. TOML file (`--config`, `DDNS_CONFIG`, or the default path if present)
// 2. Environment variables (`DDNS_*`)
// 3. Command line arguments
//
// clap folds layers 2 and 3 into `Args`; `resolve` lays them over the file.

use anyhow::{Context, Result};
use cfddns_core::config::{CacheConfig, DEFAULT_CACHE_DIR, DdnsConfig, HttpConfig, IpVersion};
use clap::{Parser, ValueEnum};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::Level;

/// Config file read when `--config` is not given
pub const DEFAULT_CONFIG_PATH: &str = "/etc/cloudflare-ddns/config.toml";

/// Point a Cloudflare A/AAAA record at this host's public address
#[derive(Debug, Parser)]
#[command(name = "cloudflare-ddns", version, long_about = None)]
pub struct Args {
    /// Cloudflare API token (40 characters)
    pub api_token: Option<String>,

    /// Record to update (e.g. home.example.com)
    pub record_name: Option<String>,

    /// API token (-t/--token flag, DDNS_API_TOKEN)
    #[arg(short = 't', long = "token", env = "DDNS_API_TOKEN", hide_env_values = true)]
    pub token_flag: Option<String>,

    /// Record name (-r/--record flag, DDNS_RECORD_NAME)
    #[arg(short = 'r', long = "record", env = "DDNS_RECORD_NAME")]
    pub record_flag: Option<String>,

    /// TOML config file
    #[arg(short, long, env = "DDNS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Address families to update (v4, v6, both)
    #[arg(long, env = "DDNS_IP_VERSION")]
    pub ip_version: Option<IpVersion>,

    /// Directory of the zone ID cache
    #[arg(long, env = "DDNS_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Keep zone IDs in memory only
    #[arg(long)]
    pub memory_cache: bool,

    /// Fetch everything but do not change any record
    #[arg(long)]
    pub dry_run: bool,

    /// Run mode
    #[arg(long, env = "DDNS_MODE", value_enum)]
    pub mode: Option<RunMode>,

    /// HTTP timeout in seconds
    #[arg(long = "timeout", env = "DDNS_HTTP_TIMEOUT")]
    pub timeout_secs: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "DDNS_LOG_LEVEL")]
    pub log_level: Option<Level>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RunMode {
    /// Change records that differ
    Update,
    /// Only report what would change
    DryRun,
}

/// Contents of the TOML config file; every key is optional
#[derive(Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub api_token: Option<String>,
    pub record_name: Option<String>,
    pub ip_version: Option<IpVersion>,
    pub dry_run: Option<bool>,
    pub log_level: Option<String>,
    pub cache: Option<CacheConfig>,
    pub http: Option<HttpConfig>,
}

impl FileConfig {
    /// Parse the file at `path`
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("Invalid config file {}", path.display()))
    }

    /// Load the explicitly given file, or the default one if it exists
    ///
    /// A missing file is only an error when it was asked for.
    pub fn locate(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::load(path),
            None => {
                let path = Path::new(DEFAULT_CONFIG_PATH);
                if path.exists() {
                    Self::load(path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }
}

/// Everything the binary needs to run
pub struct Settings {
    pub ddns: DdnsConfig,
    pub log_level: Level,
}

/// Lay the command line and environment over the config file
pub fn resolve(args: Args, file: FileConfig) -> Result<Settings> {
    let Some(api_token) = args.api_token.or(args.token_flag).or(file.api_token) else {
        anyhow::bail!(
            "API token is required. Pass it as the first argument, \
            set DDNS_API_TOKEN, or add api_token to the config file"
        );
    };
    let Some(record_name) = args.record_name.or(args.record_flag).or(file.record_name) else {
        anyhow::bail!(
            "Record name is required. Pass it as the second argument, \
            set DDNS_RECORD_NAME, or add record_name to the config file"
        );
    };

    let mut ddns = DdnsConfig::new(api_token, record_name);

    if let Some(ip_version) = args.ip_version.or(file.ip_version) {
        ddns.ip_version = ip_version;
    }

    ddns.cache = if args.memory_cache {
        CacheConfig::Memory
    } else if let Some(dir) = args.cache_dir {
        CacheConfig::File { dir }
    } else {
        file.cache.unwrap_or_else(|| CacheConfig::File {
            dir: PathBuf::from(DEFAULT_CACHE_DIR),
        })
    };

    ddns.dry_run = match (args.dry_run, args.mode) {
        (true, _) => true,
        (false, Some(mode)) => mode == RunMode::DryRun,
        (false, None) => file.dry_run.unwrap_or(false),
    };

    ddns.http = file.http.unwrap_or_default();
    if let Some(timeout_secs) = args.timeout_secs {
        ddns.http.timeout_secs = timeout_secs;
    }

    let log_level = match (args.log_level, file.log_level) {
        (Some(level), _) => level,
        (None, Some(name)) => name.parse().map_err(|_| {
            anyhow::anyhow!(
                "log_level '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                name
            )
        })?,
        (None, None) => Level::INFO,
    };

    Ok(Settings { ddns, log_level })
}

/// Validate the merged configuration
///
/// On top of the length checks done by the core this rejects placeholder
/// tokens and host names that cannot exist in DNS.
pub fn validate(config: &DdnsConfig) -> Result<()> {
    let token_lower = config.api_token.to_lowercase();
    if token_lower.contains("your_token")
        || token_lower.contains("replace_me")
        || token_lower.contains("example")
    {
        anyhow::bail!(
            "API token appears to be a placeholder. \
            Create a token with Zone:Read and DNS:Edit permissions in the Cloudflare dashboard."
        );
    }

    config.validate().context("Invalid configuration")?;
    validate_hostname(&config.record_name)
}

/// Check `name` label by label
fn validate_hostname(name: &str) -> Result<()> {
    let name = name.strip_suffix('.').unwrap_or(name);

    if !name.contains('.') {
        anyhow::bail!(
            "Record name must be fully qualified (e.g. home.example.com). Got: {}",
            name
        );
    }

    for label in name.split('.') {
        if label.is_empty() {
            anyhow::bail!("Record name has empty label: '{}'", name);
        }

        if label.len() > 63 {
            anyhow::bail!(
                "Record name label too long: {} bytes (max 63). Label: '{}'",
                label.len(),
                label
            );
        }

        // Underscores appear in service names such as _acme-challenge
        if !label
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
        {
            anyhow::bail!(
                "Record name label contains invalid characters. Label: '{}'. \
                Valid: ASCII letters, digits, hyphen and underscore.",
                label
            );
        }

        if label.starts_with('-') || label.ends_with('-') {
            anyhow::bail!(
                "Record name label cannot start or end with hyphen. Label: '{}'",
                label
            );
        }
    }

    Ok(())
}
