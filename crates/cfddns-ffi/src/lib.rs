// # cfddns-ffi
//
// Flat C ABI over `cfddns-core`, declared in `include/cfddns.h`.
//
// ## Conventions
//
// - Every function returns a `ddns_error`: `DDNS_ERROR_OK`,
//   `DDNS_ERROR_GENERIC` or `DDNS_ERROR_USAGE`
// - Strings are NUL-terminated UTF-8; outputs are written into caller
//   buffers of the given size, terminator included
// - Null pointers, invalid UTF-8, bad lengths and output buffers that are
//   too small are usage errors; nothing is sent over the network for them
// - Each call blocks on its own current-thread tokio runtime
//
// Output buffers are left untouched unless the call succeeds.

use cfddns_core::config::{
    DEFAULT_HTTP_TIMEOUT, IP_ADDRESS_MAX_LENGTH, RECORD_ID_LENGTH, ZONE_ID_LENGTH,
};
use cfddns_core::types::Credentials;
use cfddns_core::{
    ApiToken, CloudflareApi, Error, HttpClient, IpAddress, IpDiscovery, IpFamily, RecordId,
    Result, ZoneId, fetch_records, search_zone_id,
};
use cfddns_http::{ClientOptions, ReqwestClient};
use std::ffi::{CStr, c_char};
use std::future::Future;
use std::sync::Arc;

/// Status returned by every exported function
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DdnsError {
    Ok = 0,
    Generic = 1,
    Usage = 2,
}

impl From<&Error> for DdnsError {
    fn from(error: &Error) -> Self {
        if error.is_usage_class() {
            DdnsError::Usage
        } else {
            DdnsError::Generic
        }
    }
}

/// Run `task` to completion and map its result
fn complete<F>(task: F) -> DdnsError
where
    F: Future<Output = Result<()>>,
{
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!("Failed to create tokio runtime: {}", e);
            return DdnsError::Generic;
        }
    };

    match runtime.block_on(task) {
        Ok(()) => DdnsError::Ok,
        Err(e) => {
            tracing::debug!("cfddns call failed: {}", e);
            DdnsError::from(&e)
        }
    }
}

/// Borrow a C string argument
///
/// # Safety
///
/// `ptr` must be null or point to a NUL-terminated string that outlives `'a`.
unsafe fn read_str<'a>(ptr: *const c_char, what: &str) -> Result<&'a str> {
    if ptr.is_null() {
        return Err(Error::usage(format!("{what} is null")));
    }
    // SAFETY: non-null and NUL-terminated per the caller contract
    let text = unsafe { CStr::from_ptr(ptr) };
    text.to_str()
        .map_err(|_| Error::usage(format!("{what} is not valid UTF-8")))
}

/// Fail early when `size` cannot hold `len` bytes plus the terminator
fn ensure_capacity(len: usize, size: usize) -> Result<()> {
    if len >= size {
        return Err(Error::BufferTooSmall {
            required: len + 1,
            capacity: size,
        });
    }
    Ok(())
}

/// Address outputs must fit any address, since the length is only known
/// after the request
fn ensure_ip_capacity(size: usize) -> Result<()> {
    ensure_capacity(IP_ADDRESS_MAX_LENGTH - 1, size)
}

/// Copy `text` and a terminator into `out`
///
/// # Safety
///
/// `out` must be null or valid for `size` bytes of writes.
unsafe fn write_str(text: &str, size: usize, out: *mut c_char) -> Result<()> {
    if out.is_null() {
        return Err(Error::usage("output buffer is null"));
    }
    ensure_capacity(text.len(), size)?;
    // SAFETY: `out` holds `size > text.len()` bytes per the caller contract
    unsafe {
        std::ptr::copy_nonoverlapping(text.as_ptr(), out.cast::<u8>(), text.len());
        *out.add(text.len()) = 0;
    }
    Ok(())
}

fn api_client() -> Result<Arc<dyn HttpClient>> {
    Ok(Arc::new(ReqwestClient::new(ClientOptions::default())?))
}

/// Discover the public address of one family
///
/// # Safety
///
/// `ip` must be valid for `ip_size` bytes of writes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn ddns_get_local_ip(ipv6: bool, ip_size: usize, ip: *mut c_char) -> DdnsError {
    let family = if ipv6 { IpFamily::V6 } else { IpFamily::V4 };

    complete(async move {
        if ip.is_null() {
            return Err(Error::usage("output buffer is null"));
        }
        ensure_ip_capacity(ip_size)?;

        let client: Arc<dyn HttpClient> = Arc::new(ReqwestClient::for_family(family, DEFAULT_HTTP_TIMEOUT)?);
        let discovery = IpDiscovery::new(client.clone(), client);
        let local_ip = discovery.discover_local_ip(family).await?;

        // SAFETY: forwarded caller contract
        unsafe { write_str(local_ip.as_str(), ip_size, ip) }
    })
}

/// Find the zone owning `record_name` by iterative suffix search
///
/// # Safety
///
/// `api_token` and `record_name` must be NUL-terminated strings;
/// `zone_id` must be valid for `zone_id_size` bytes of writes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn ddns_search_zone_id(
    api_token: *const c_char,
    record_name: *const c_char,
    zone_id_size: usize,
    zone_id: *mut c_char,
) -> DdnsError {
    complete(async move {
        // SAFETY: forwarded caller contract
        let (api_token, record_name) =
            unsafe { (read_str(api_token, "api_token")?, read_str(record_name, "record_name")?) };
        let credentials = Credentials::new(api_token, record_name)?;
        if zone_id.is_null() {
            return Err(Error::usage("output buffer is null"));
        }
        ensure_capacity(ZONE_ID_LENGTH, zone_id_size)?;

        let api = CloudflareApi::new(api_client()?, credentials.api_token);
        let found = search_zone_id(&api, &credentials.record_name).await?;

        // SAFETY: forwarded caller contract
        unsafe { write_str(found.as_str(), zone_id_size, zone_id) }
    })
}

/// Fetch the A record of `record_name`, or its AAAA record if there is no A
///
/// `*aaaa` tells which one was returned.
///
/// # Safety
///
/// String arguments must be NUL-terminated; `record_ip` and `record_id` must
/// be valid for their sizes; `aaaa` must be valid for one write.
#[unsafe(no_mangle)]
#[allow(clippy::too_many_arguments)]
pub unsafe extern "C" fn ddns_get_record(
    api_token: *const c_char,
    zone_id: *const c_char,
    record_name: *const c_char,
    record_ip_size: usize,
    record_ip: *mut c_char,
    record_id_size: usize,
    record_id: *mut c_char,
    aaaa: *mut bool,
) -> DdnsError {
    complete(async move {
        // SAFETY: forwarded caller contract
        let (api_token, zone_id, record_name) = unsafe {
            (
                read_str(api_token, "api_token")?,
                read_str(zone_id, "zone_id")?,
                read_str(record_name, "record_name")?,
            )
        };
        let credentials = Credentials::new(api_token, record_name)?;
        let zone_id = ZoneId::parse(zone_id)?;
        if record_ip.is_null() || record_id.is_null() || aaaa.is_null() {
            return Err(Error::usage("output buffer is null"));
        }
        ensure_capacity(RECORD_ID_LENGTH, record_id_size)?;
        ensure_ip_capacity(record_ip_size)?;

        let api = CloudflareApi::new(api_client()?, credentials.api_token);
        let records = fetch_records(&api, &zone_id, &credentials.record_name).await?;
        let record = records
            .a
            .or(records.aaaa)
            .ok_or_else(|| Error::NoMatchingRecord(credentials.record_name.clone()))?;

        // SAFETY: forwarded caller contract
        unsafe {
            write_str(record.content.as_str(), record_ip_size, record_ip)?;
            write_str(record.id.as_str(), record_id_size, record_id)?;
            *aaaa = record.kind.family() == IpFamily::V6;
        }
        Ok(())
    })
}

/// Set the content of a record and return what the server stored
///
/// # Safety
///
/// String arguments must be NUL-terminated; `record_ip` must be valid for
/// `record_ip_size` bytes of writes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn ddns_update_record(
    api_token: *const c_char,
    zone_id: *const c_char,
    record_id: *const c_char,
    new_ip: *const c_char,
    record_ip_size: usize,
    record_ip: *mut c_char,
) -> DdnsError {
    complete(async move {
        // SAFETY: forwarded caller contract
        let (api_token, zone_id, record_id, new_ip) = unsafe {
            (
                read_str(api_token, "api_token")?,
                read_str(zone_id, "zone_id")?,
                read_str(record_id, "record_id")?,
                read_str(new_ip, "new_ip")?,
            )
        };
        let token = ApiToken::new(api_token)?;
        let zone_id = ZoneId::parse(zone_id)?;
        let record_id = RecordId::parse(record_id)?;
        let new_ip = IpAddress::new(new_ip)?;
        if record_ip.is_null() {
            return Err(Error::usage("output buffer is null"));
        }
        // The server may store a longer spelling than `new_ip`
        ensure_ip_capacity(record_ip_size)?;

        let api = CloudflareApi::new(api_client()?, token);
        let stored = api
            .patch_record_content(&zone_id, &record_id, &new_ip)
            .await
            .map_err(|e| Error::update_failed(record_id.as_str(), e))?;

        // SAFETY: forwarded caller contract
        unsafe { write_str(&stored.content, record_ip_size, record_ip) }
    })
}
