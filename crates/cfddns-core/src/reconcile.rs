// # Update Decision & Apply
//
// Compares the discovered address of one family with the published record
// and PATCHes the record when they differ.
//
// Addresses are compared as opaque strings. Cloudflare echoes the canonical
// textual form, so `"2001:db8::1"` and `"2001:0db8::1"` count as different
// and trigger an update.

use crate::api::CloudflareApi;
use crate::types::{DnsRecord, IpAddress, IpFamily, ZoneId};
use crate::{Error, Result};

/// Result of reconciling one family
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The record already holds the local address
    UpToDate,
    /// The record was updated; holds the value the server stored
    Updated(IpAddress),
    /// Dry run: the record would have been set to this address
    WouldUpdate(IpAddress),
    /// No record of this family exists; nothing to reconcile
    Skipped,
}

/// Applies update decisions within one zone
#[derive(Debug, Clone)]
pub struct Reconciler {
    api: CloudflareApi,
    zone_id: ZoneId,
    dry_run: bool,
}

impl Reconciler {
    pub fn new(api: CloudflareApi, zone_id: ZoneId) -> Self {
        Self {
            api,
            zone_id,
            dry_run: false,
        }
    }

    /// Log intended updates instead of sending them
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Bring the `family` record in line with `local_ip`
    ///
    /// # Errors
    ///
    /// - `Usage` if `record` is not a record of `family`
    /// - `UpdateFailed` if the PATCH or its response fails
    pub async fn reconcile(
        &self,
        family: IpFamily,
        local_ip: &IpAddress,
        record: Option<&DnsRecord>,
    ) -> Result<Outcome> {
        let Some(record) = record else {
            tracing::debug!("No {} record, skipping {}", family.record_type(), family);
            return Ok(Outcome::Skipped);
        };

        if record.kind.family() != family {
            return Err(Error::usage(format!(
                "Cannot reconcile {} with a {} record",
                family, record.kind
            )));
        }

        if record.content == *local_ip {
            tracing::info!("{} record is up to date ({})", record.kind, local_ip);
            return Ok(Outcome::UpToDate);
        }

        if self.dry_run {
            tracing::info!(
                "[dry-run] Would PATCH {} with {} (currently {})",
                self.api.record_url(&self.zone_id, &record.id),
                local_ip,
                record.content
            );
            return Ok(Outcome::WouldUpdate(local_ip.clone()));
        }

        let stored = self
            .apply(record, local_ip)
            .await
            .map_err(|e| Error::update_failed(record.id.as_str(), e))?;

        if stored != *local_ip {
            tracing::warn!(
                "Cloudflare stored {} for {} record, requested {}",
                stored,
                record.kind,
                local_ip
            );
        }
        tracing::info!(
            "{} record updated: {} -> {}",
            record.kind,
            record.content,
            stored
        );

        Ok(Outcome::Updated(stored))
    }

    async fn apply(&self, record: &DnsRecord, local_ip: &IpAddress) -> Result<IpAddress> {
        let entry = self
            .api
            .patch_record_content(&self.zone_id, &record.id, local_ip)
            .await?;
        IpAddress::new(entry.content)
    }
}
