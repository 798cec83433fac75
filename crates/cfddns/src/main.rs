// # cloudflare-ddns
//
// Single-pass updater: point the A and/or AAAA record of one name at this
// host's public address, then exit.
//
// The binary only wires things together:
// 1. Read configuration (config file, environment, command line)
// 2. Initialize logging and the runtime
// 3. Build the HTTP transports and the zone ID cache
// 4. Run `cfddns_core::Updater` once and report per family
//
// ## Configuration
//
// - `DDNS_API_TOKEN` / first argument / `-t`: API token with Zone:Read and
//   DNS:Edit permissions
// - `DDNS_RECORD_NAME` / second argument / `-r`: record to update
// - `DDNS_CONFIG` / `-c`: TOML config file
//   (default `/etc/cloudflare-ddns/config.toml`, if present)
// - `DDNS_IP_VERSION` / `--ip-version`: `v4`, `v6` or `both`
// - `DDNS_CACHE_DIR` / `--cache-dir`, `--memory-cache`: zone ID cache
// - `DDNS_MODE=dry-run` / `--dry-run`: report without changing anything
// - `DDNS_HTTP_TIMEOUT` / `--timeout`: seconds per request
// - `DDNS_LOG_LEVEL` / `--log-level`
//
// ## Example
//
// ```bash
// export DDNS_API_TOKEN=your_token
// cloudflare-ddns --record home.example.com --ip-version both
// ```

mod config;

use anyhow::Result;
use cfddns_core::cache::open_cache;
use cfddns_core::{
    DdnsConfig, FamilyStatus, IpFamily, MemoryZoneCache, RunReport, Updater, ZoneCache,
};
use cfddns_http::{ClientOptions, ReqwestClient};
use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::FmtSubscriber;

use crate::config::{Args, FileConfig};

/// Exit codes for different termination scenarios
///
/// - 0: At least one address family discovered its local address
/// - 1: Configuration or startup error
/// - 2: The run failed
#[derive(Debug, Clone, Copy)]
enum DdnsExitCode {
    /// At least one family discovered its local address
    Success = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Discovery failed for every family, or the lookup failed
    RunFailed = 2,
}

impl From<DdnsExitCode> for ExitCode {
    fn from(code: DdnsExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    let file = match FileConfig::locate(args.config.as_deref()) {
        Ok(file) => file,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return DdnsExitCode::ConfigError.into();
        }
    };

    let settings = match config::resolve(args, file) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return DdnsExitCode::ConfigError.into();
        }
    };

    if let Err(e) = config::validate(&settings.ddns) {
        eprintln!("Configuration validation error: {:#}", e);
        return DdnsExitCode::ConfigError.into();
    }

    let subscriber = FmtSubscriber::builder()
        .with_max_level(settings.log_level)
        .with_writer(std::io::stderr)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return DdnsExitCode::ConfigError.into();
    }

    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DdnsExitCode::ConfigError.into();
        }
    };

    rt.block_on(run(settings.ddns)).into()
}

async fn run(config: DdnsConfig) -> DdnsExitCode {
    let updater = match build_updater(&config).await {
        Ok(updater) => updater,
        Err(e) => {
            eprintln!("Startup error: {:#}", e);
            return DdnsExitCode::ConfigError;
        }
    };

    match updater.run().await {
        Ok(report) => {
            print_report(&report);
            if report.is_success() {
                DdnsExitCode::Success
            } else {
                eprintln!(
                    "{}: public address discovery failed for every family",
                    report.record_name
                );
                DdnsExitCode::RunFailed
            }
        }
        Err(e) => {
            eprintln!("{}: {}", updater.record_name(), e);
            DdnsExitCode::RunFailed
        }
    }
}

/// Wire transports and cache into an `Updater`
async fn build_updater(config: &DdnsConfig) -> Result<Updater> {
    let timeout = config.http.timeout();
    let api_client = ReqwestClient::new(ClientOptions::default().timeout(timeout))?;
    let v4 = ReqwestClient::for_family(IpFamily::V4, timeout)?;
    let v6 = ReqwestClient::for_family(IpFamily::V6, timeout)?;

    let cache: Arc<dyn ZoneCache> = match open_cache(&config.cache).await {
        Ok(cache) => cache,
        Err(e) => {
            warn!("Zone cache unavailable ({}), using an in-memory cache", e);
            Arc::new(MemoryZoneCache::new())
        }
    };

    info!("Configuration loaded: {:?}", config);

    Ok(Updater::from_config(
        config,
        Arc::new(api_client),
        Arc::new(v4),
        Arc::new(v6),
        cache,
    )?)
}

/// One line per family on stdout, failures on stderr
fn print_report(report: &RunReport) {
    for family in &report.families {
        let record_type = family.family.record_type();
        match &family.status {
            FamilyStatus::UpToDate(ip) => {
                println!("{} {}: up to date ({})", record_type, report.record_name, ip)
            }
            FamilyStatus::Updated { previous, current } => println!(
                "{} {}: updated {} -> {}",
                record_type, report.record_name, previous, current
            ),
            FamilyStatus::WouldUpdate { current, desired } => println!(
                "{} {}: would update {} -> {} (dry run)",
                record_type, report.record_name, current, desired
            ),
            FamilyStatus::NoRecord { local_ip: Some(ip) } => println!(
                "{} {}: no record, skipped (local address {})",
                record_type, report.record_name, ip
            ),
            FamilyStatus::NoRecord { local_ip: None } => {
                println!("{} {}: no record, skipped", record_type, report.record_name)
            }
            FamilyStatus::Failed(e) => {
                eprintln!("{} {}: {}", record_type, report.record_name, e)
            }
        }
    }

    // Discovery failures were already printed with their family
    for warning in report.standalone_warnings() {
        eprintln!("warning: {}", warning);
    }
}
