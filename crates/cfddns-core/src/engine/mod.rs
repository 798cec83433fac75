//! Update orchestrator
//!
//! The [`Updater`] runs one reconciliation pass for a record name:
//!
//! ```text
//! ┌─────────────────────┐      ┌─────────────────────┐
//! │ resolve_zone_id     │      │ IpDiscovery         │
//! │   (cache / search)  │      │   v4 ─┐             │
//! │         ▼           │      │   v6 ─┴─ join!      │
//! │ fetch_records       │      │                     │
//! └──────────┬──────────┘      └──────────┬──────────┘
//!            └─────────── tokio::join! ───┘
//!                          ▼
//!          Reconciler::reconcile (per family)
//!                          ▼
//!                      RunReport
//! ```
//!
//! ## Failure policy
//!
//! - Zone resolution and record fetch failures are fatal for the run and
//!   come back as a [`StageError`]
//! - A cached zone ID that fails the record fetch with a stale-zone
//!   symptom is invalidated and searched again, once
//! - Discovery and update failures only affect their family
//! - The run succeeds when at least one family discovered its local
//!   address, whether or not a record was changed

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::api::CloudflareApi;
use crate::config::{DdnsConfig, IpVersion};
use crate::error::{Error, Result, Stage, StageError};
use crate::ip::IpDiscovery;
use crate::reconcile::{Outcome, Reconciler};
use crate::records::{RecordSet, fetch_records};
use crate::traits::{HttpClient, ZoneCache};
use crate::types::{
    ApiToken, IpAddress, IpFamily, ZoneId, normalize_record_name, validate_record_name,
};
use crate::zone::{ResolvedZone, ZoneSource, refresh_zone_id, resolve_zone_id};

/// Non-fatal anomaly noticed during a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// More A/AAAA records than expected; the first of each type was used
    TooManyRecords { count: usize },

    /// The public address of a family could not be discovered
    DiscoveryFailed { family: IpFamily, message: String },

    /// The cached zone ID did not work and was replaced by a fresh search
    StaleCachedZone { zone_id: ZoneId },
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Warning::TooManyRecords { count } => write!(
                f,
                "{} A/AAAA records returned, used the first of each type",
                count
            ),
            Warning::DiscoveryFailed { family, message } => {
                write!(f, "{} discovery failed: {}", family, message)
            }
            Warning::StaleCachedZone { zone_id } => {
                write!(f, "cached zone ID {} was stale and has been replaced", zone_id)
            }
        }
    }
}

/// What happened to one address family
#[derive(Debug)]
pub enum FamilyStatus {
    /// The record already held the local address
    UpToDate(IpAddress),

    /// The record was changed
    Updated {
        previous: IpAddress,
        current: IpAddress,
    },

    /// Dry run: the record would have been changed
    WouldUpdate {
        current: IpAddress,
        desired: IpAddress,
    },

    /// No record of this family exists for the name; `local_ip` is the
    /// discovered address, if discovery succeeded
    NoRecord { local_ip: Option<IpAddress> },

    /// Discovery or update failed for this family
    Failed(StageError),
}

impl FamilyStatus {
    /// Whether the local address of this family was discovered
    ///
    /// This is what makes a family count towards a successful run, with or
    /// without an update. A failed update implies discovery succeeded.
    pub fn has_local_ip(&self) -> bool {
        match self {
            FamilyStatus::UpToDate(_)
            | FamilyStatus::Updated { .. }
            | FamilyStatus::WouldUpdate { .. } => true,
            FamilyStatus::NoRecord { local_ip } => local_ip.is_some(),
            FamilyStatus::Failed(e) => e.stage != Stage::IpDiscovery,
        }
    }
}

#[derive(Debug)]
pub struct FamilyReport {
    pub family: IpFamily,
    pub status: FamilyStatus,
}

/// Result of one [`Updater::run`]
#[derive(Debug)]
pub struct RunReport {
    pub record_name: String,
    pub zone: ResolvedZone,
    pub families: Vec<FamilyReport>,
    pub warnings: Vec<Warning>,
}

impl RunReport {
    /// At least one family discovered its local address
    pub fn is_success(&self) -> bool {
        self.families.iter().any(|f| f.status.has_local_ip())
    }

    pub fn status(&self, family: IpFamily) -> Option<&FamilyStatus> {
        self.families
            .iter()
            .find(|f| f.family == family)
            .map(|f| &f.status)
    }

    /// Warnings not already carried by a failed family status
    pub fn standalone_warnings(&self) -> impl Iterator<Item = &Warning> {
        self.warnings.iter().filter(|warning| match warning {
            Warning::DiscoveryFailed { family, .. } => !matches!(
                self.status(*family),
                Some(FamilyStatus::Failed(e)) if e.stage == Stage::IpDiscovery
            ),
            _ => true,
        })
    }

    /// Per-family failures, in family order
    pub fn failures(&self) -> impl Iterator<Item = (IpFamily, &StageError)> {
        self.families.iter().filter_map(|f| match &f.status {
            FamilyStatus::Failed(e) => Some((f.family, e)),
            _ => None,
        })
    }
}

/// Zone and records found by the lookup half of a run
struct Lookup {
    zone: ResolvedZone,
    records: RecordSet,
    warnings: Vec<Warning>,
}

/// Single-pass Cloudflare DDNS updater
pub struct Updater {
    api: CloudflareApi,
    discovery: IpDiscovery,
    cache: Arc<dyn ZoneCache>,
    record_name: String,
    ip_version: IpVersion,
    dry_run: bool,
}

impl Updater {
    /// Create an updater reconciling both families, for real
    ///
    /// A trailing root label on `record_name` is dropped.
    pub fn new(
        api: CloudflareApi,
        discovery: IpDiscovery,
        cache: Arc<dyn ZoneCache>,
        record_name: impl Into<String>,
    ) -> Self {
        let record_name: String = record_name.into();
        Self {
            api,
            discovery,
            cache,
            record_name: normalize_record_name(&record_name).to_string(),
            ip_version: IpVersion::default(),
            dry_run: false,
        }
    }

    /// Build an updater from a validated configuration
    ///
    /// # Parameters
    ///
    /// - `api_client`: transport for Cloudflare API calls
    /// - `v4` / `v6`: transports pinned to each family, for discovery
    /// - `cache`: zone ID cache
    pub fn from_config(
        config: &DdnsConfig,
        api_client: Arc<dyn HttpClient>,
        v4: Arc<dyn HttpClient>,
        v6: Arc<dyn HttpClient>,
        cache: Arc<dyn ZoneCache>,
    ) -> Result<Self> {
        config.validate()?;

        let token = ApiToken::new(config.api_token.as_str())?;
        let api = CloudflareApi::with_base_url(api_client, token, config.http.api_base_url.as_str());
        let discovery = IpDiscovery::with_trace_url(config.http.trace_url.as_str(), v4, v6);

        Ok(Self::new(api, discovery, cache, config.record_name.as_str())
            .ip_version(config.ip_version)
            .dry_run(config.dry_run))
    }

    pub fn ip_version(mut self, ip_version: IpVersion) -> Self {
        self.ip_version = ip_version;
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn record_name(&self) -> &str {
        &self.record_name
    }

    /// Run one reconciliation pass
    ///
    /// # Returns
    ///
    /// - `Ok(report)`: the records were fetched; check
    ///   [`RunReport::is_success`] for the per-family verdict
    /// - `Err(StageError)`: zone resolution or record fetch failed
    pub async fn run(&self) -> std::result::Result<RunReport, StageError> {
        validate_record_name(&self.record_name)
            .map_err(|e| StageError::new(Stage::ZoneResolution, e))?;

        info!(
            "Reconciling {} ({:?}{})",
            self.record_name,
            self.ip_version,
            if self.dry_run { ", dry run" } else { "" }
        );

        // Discovery has no data dependency on the lookup
        let (lookup, discovered) =
            tokio::join!(self.lookup(), self.discovery.discover(self.ip_version));
        let Lookup {
            zone,
            records,
            mut warnings,
        } = lookup?;

        let reconciler = Reconciler::new(self.api.clone(), zone.zone_id.clone()).dry_run(self.dry_run);
        let mut families = Vec::with_capacity(discovered.len());

        for (family, local_ip) in discovered {
            let status = match (records.get(family), local_ip) {
                (None, Ok(local_ip)) => {
                    debug!("No {} record for {}, skipped", family.record_type(), self.record_name);
                    FamilyStatus::NoRecord {
                        local_ip: Some(local_ip),
                    }
                }
                (None, Err(e)) => {
                    debug!("{} discovery failed, but there is no record: {}", family, e);
                    FamilyStatus::NoRecord { local_ip: None }
                }
                (Some(_), Err(e)) => {
                    warn!("{} discovery failed: {}", family, e);
                    warnings.push(Warning::DiscoveryFailed {
                        family,
                        message: e.to_string(),
                    });
                    FamilyStatus::Failed(StageError::new(Stage::IpDiscovery, e))
                }
                (Some(record), Ok(local_ip)) => {
                    match reconciler.reconcile(family, &local_ip, Some(record)).await {
                        Ok(Outcome::UpToDate) => FamilyStatus::UpToDate(local_ip),
                        Ok(Outcome::Updated(stored)) => FamilyStatus::Updated {
                            previous: record.content.clone(),
                            current: stored,
                        },
                        Ok(Outcome::WouldUpdate(desired)) => FamilyStatus::WouldUpdate {
                            current: record.content.clone(),
                            desired,
                        },
                        Ok(Outcome::Skipped) => FamilyStatus::NoRecord {
                            local_ip: Some(local_ip),
                        },
                        Err(e) => {
                            error!("{} update failed: {}", family, e);
                            FamilyStatus::Failed(StageError::new(Stage::Update, e))
                        }
                    }
                }
            };
            families.push(FamilyReport { family, status });
        }

        Ok(RunReport {
            record_name: self.record_name.clone(),
            zone,
            families,
            warnings,
        })
    }

    /// Resolve the zone and fetch the records, retrying once with a fresh
    /// search when a cached zone ID turns out to be stale
    async fn lookup(&self) -> std::result::Result<Lookup, StageError> {
        let mut warnings = Vec::new();

        let zone = resolve_zone_id(&self.api, &self.record_name, self.cache.as_ref())
            .await
            .map_err(|e| StageError::new(Stage::ZoneResolution, e))?;

        let (zone, records) = match fetch_records(&self.api, &zone.zone_id, &self.record_name).await {
            Ok(records) => (zone, records),
            Err(e) if zone.source == ZoneSource::Cache && is_stale_zone_symptom(&e) => {
                warn!(
                    "Cached zone ID {} for {} looks stale ({}), searching again",
                    zone.zone_id, self.record_name, e
                );
                warnings.push(Warning::StaleCachedZone {
                    zone_id: zone.zone_id.clone(),
                });

                let fresh = refresh_zone_id(&self.api, &self.record_name, self.cache.as_ref())
                    .await
                    .map_err(|e| StageError::new(Stage::ZoneResolution, e))?;
                let records = fetch_records(&self.api, &fresh.zone_id, &self.record_name)
                    .await
                    .map_err(|e| StageError::new(Stage::RecordFetch, e))?;
                (fresh, records)
            }
            Err(e) => return Err(StageError::new(Stage::RecordFetch, e)),
        };

        if records.has_excess() {
            warnings.push(Warning::TooManyRecords {
                count: records.returned,
            });
        }

        Ok(Lookup {
            zone,
            records,
            warnings,
        })
    }
}

/// Record fetch errors that point at a zone ID no longer owning the record
fn is_stale_zone_symptom(error: &Error) -> bool {
    match error {
        Error::Api { status, .. } => matches!(status, 400 | 403 | 404),
        Error::Authentication { status, .. } => *status == 403,
        Error::NoMatchingRecord(_) => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stale_zone_symptoms() {
        assert!(is_stale_zone_symptom(&Error::Api {
            status: 404,
            message: "not found".into()
        }));
        assert!(is_stale_zone_symptom(&Error::Authentication {
            status: 403,
            message: "forbidden".into()
        }));
        assert!(is_stale_zone_symptom(&Error::NoMatchingRecord("a.example.com".into())));

        assert!(!is_stale_zone_symptom(&Error::Authentication {
            status: 401,
            message: "bad token".into()
        }));
        assert!(!is_stale_zone_symptom(&Error::network("reset")));
        assert!(!is_stale_zone_symptom(&Error::Api {
            status: 500,
            message: "oops".into()
        }));
    }

    #[test]
    fn test_report_success_rule() {
        let zone = ResolvedZone {
            zone_id: ZoneId::parse("023e105f4ecef8ad9ca31a8372d0c353").unwrap(),
            source: ZoneSource::Cache,
        };
        let mut report = RunReport {
            record_name: "home.example.com".into(),
            zone,
            families: vec![
                FamilyReport {
                    family: IpFamily::V4,
                    status: FamilyStatus::NoRecord { local_ip: None },
                },
                FamilyReport {
                    family: IpFamily::V6,
                    status: FamilyStatus::Failed(StageError::new(
                        Stage::IpDiscovery,
                        Error::network("unreachable"),
                    )),
                },
            ],
            warnings: Vec::new(),
        };
        assert!(!report.is_success());
        assert_eq!(report.failures().count(), 1);

        report.families[0].status = FamilyStatus::NoRecord {
            local_ip: Some(IpAddress::new("203.0.113.7").unwrap()),
        };
        assert!(report.is_success());

        report.families[0].status =
            FamilyStatus::UpToDate(IpAddress::new("203.0.113.7").unwrap());
        assert!(report.is_success());
        assert!(matches!(
            report.status(IpFamily::V4),
            Some(FamilyStatus::UpToDate(_))
        ));

        report.families[0].status = FamilyStatus::Failed(StageError::new(
            Stage::Update,
            Error::network("reset"),
        ));
        assert!(report.is_success(), "the address was discovered before the update failed");
    }

    #[test]
    fn test_standalone_warnings_skip_family_failures() {
        let zone_id = ZoneId::parse("023e105f4ecef8ad9ca31a8372d0c353").unwrap();
        let report = RunReport {
            record_name: "home.example.com".into(),
            zone: ResolvedZone {
                zone_id: zone_id.clone(),
                source: ZoneSource::Search,
            },
            families: vec![FamilyReport {
                family: IpFamily::V6,
                status: FamilyStatus::Failed(StageError::new(
                    Stage::IpDiscovery,
                    Error::network("unreachable"),
                )),
            }],
            warnings: vec![
                Warning::DiscoveryFailed {
                    family: IpFamily::V6,
                    message: "unreachable".into(),
                },
                Warning::StaleCachedZone { zone_id },
            ],
        };

        let standalone: Vec<_> = report.standalone_warnings().collect();
        assert_eq!(standalone.len(), 1);
        assert!(matches!(standalone[0], Warning::StaleCachedZone { .. }));
    }
}
