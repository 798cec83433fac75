// # Record Fetcher
//
// Reads the current A/AAAA records for one name. Record IDs are fetched
// fresh every run and never cached.

use crate::api::{CloudflareApi, RecordEntry};
use crate::types::{DnsRecord, IpAddress, IpFamily, RecordId, RecordType, ZoneId};
use crate::{Error, Result};

/// Records returned by the API beyond which the answer is anomalous
pub const EXPECTED_MAX_RECORDS: usize = 2;

/// The A and AAAA records published for a name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordSet {
    pub a: Option<DnsRecord>,
    pub aaaa: Option<DnsRecord>,
    /// Number of A/AAAA records the API returned
    pub returned: usize,
}

impl RecordSet {
    /// The record publishing `family`, if any
    pub fn get(&self, family: IpFamily) -> Option<&DnsRecord> {
        match family {
            IpFamily::V4 => self.a.as_ref(),
            IpFamily::V6 => self.aaaa.as_ref(),
        }
    }

    /// More records came back than one A and one AAAA
    pub fn has_excess(&self) -> bool {
        self.returned > EXPECTED_MAX_RECORDS
    }

    /// Build the set from a `dns_records` result array
    ///
    /// The first A and the first AAAA win; other record types are ignored.
    fn from_entries(entries: Vec<RecordEntry>) -> Result<Self> {
        let mut set = RecordSet::default();

        for entry in entries {
            let Some(kind) = RecordType::from_api(&entry.kind) else {
                tracing::trace!("Ignoring {} record {}", entry.kind, entry.id);
                continue;
            };
            set.returned += 1;

            let slot = match kind {
                RecordType::A => &mut set.a,
                RecordType::Aaaa => &mut set.aaaa,
            };
            if slot.is_some() {
                continue;
            }

            let id = RecordId::parse(entry.id)
                .map_err(|e| Error::parse(format!("Invalid record in response: {}", e)))?;
            let content = IpAddress::new(entry.content)?;
            *slot = Some(DnsRecord { id, kind, content });
        }

        Ok(set)
    }
}

/// Fetch the A/AAAA records named `record_name` in `zone_id`
///
/// # Errors
///
/// - `Usage` if the name is empty or longer than 255 bytes (no request is
///   made)
/// - `NoMatchingRecord` if the zone has no A or AAAA record with that name
/// - `BufferTooSmall` if a record's content exceeds the address capacity
pub async fn fetch_records(
    api: &CloudflareApi,
    zone_id: &ZoneId,
    record_name: &str,
) -> Result<RecordSet> {
    let entries = api.list_address_records(zone_id, record_name).await?;
    let set = RecordSet::from_entries(entries)?;

    if set.a.is_none() && set.aaaa.is_none() {
        return Err(Error::NoMatchingRecord(record_name.to_string()));
    }

    if set.has_excess() {
        tracing::warn!(
            "{} A/AAAA records returned for {}, using the first of each type",
            set.returned,
            record_name
        );
    }

    Ok(set)
}
