//! FFI bridge for the mobile host
//!
//! Exposes the matcher to the native BLE scan callbacks (Kotlin via JNI glue,
//! Swift via a C header). Records and results cross the boundary as JSON
//! strings.
//!
//! The bridge is the only place that keeps a process-wide registry: it is
//! populated once by `blematch_init()` and never mutated afterwards, so scan
//! callbacks on any thread read it without locking. The library API itself
//! takes the registry by reference.

use std::ffi::{CStr, CString};
use std::os::raw::c_char;

use once_cell::sync::OnceCell;

use crate::catalog::Registry;
use crate::matcher::Matcher;
use crate::record::DiscoveredPeripheralRecord;

static REGISTRY: OnceCell<Registry> = OnceCell::new();

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Read a `*const c_char` into a `&str`. Returns `None` if null or invalid UTF-8.
unsafe fn cstr_to_str<'a>(ptr: *const c_char) -> Option<&'a str> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok()
}

/// Allocate a C string from a Rust `String`. Caller must free via `blematch_free_string`.
fn to_c_string(s: String) -> *mut c_char {
    CString::new(s).unwrap_or_default().into_raw()
}

fn load_registry(catalog_json: Option<&str>) -> Result<Registry, String> {
    match catalog_json {
        Some(json) => Registry::from_json(json),
        None => Registry::builtin(),
    }
    .map_err(|e| e.to_string())
}

/// Parse a record and run `view` over the shared decision.
///
/// # Safety
/// `record_json` must be null or a valid NUL-terminated string.
unsafe fn with_match<F>(record_json: *const c_char, view: F) -> *mut c_char
where
    F: FnOnce(Matcher<'_>, &DiscoveredPeripheralRecord) -> Option<String>,
{
    let Some(registry) = REGISTRY.get() else {
        log::warn!("blematch used before blematch_init");
        return std::ptr::null_mut();
    };
    let Some(json) = cstr_to_str(record_json) else {
        return std::ptr::null_mut();
    };
    let record = match DiscoveredPeripheralRecord::from_json(json) {
        Ok(record) => record,
        Err(e) => {
            log::warn!("Rejected scan record: {}", e);
            return std::ptr::null_mut();
        }
    };

    match view(Matcher::new(registry), &record) {
        Some(out) => to_c_string(out),
        None => std::ptr::null_mut(),
    }
}

// ---------------------------------------------------------------------------
// FFI functions
// ---------------------------------------------------------------------------

/// Initialize the bridge registry.
///
/// `catalog_json`: catalog in the embedded JSON format, or null for the
/// built-in catalog.
///
/// Returns 0 on success (including when already initialized), -1 on error.
///
/// # Safety
/// `catalog_json` must be null or a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn blematch_init(catalog_json: *const c_char) -> i32 {
    let catalog = if catalog_json.is_null() {
        None
    } else {
        match cstr_to_str(catalog_json) {
            Some(s) => Some(s),
            None => {
                log::error!("blematch_init: catalog is not valid UTF-8");
                return -1;
            }
        }
    };

    match REGISTRY.get_or_try_init(|| load_registry(catalog)) {
        Ok(_) => 0,
        Err(e) => {
            log::error!("blematch_init: {}", e);
            -1
        }
    }
}

/// Match a scan record (JSON) and return the descriptor as JSON, or null
/// when nothing matches.
///
/// # Safety
/// `record_json` must be null or a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn blematch_match(record_json: *const c_char) -> *mut c_char {
    with_match(record_json, |matcher, record| {
        matcher
            .match_record(record)
            .and_then(|d| serde_json::to_string(d).ok())
    })
}

/// Match a scan record (JSON) and return the info map as JSON, or null.
///
/// # Safety
/// `record_json` must be null or a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn blematch_match_info(record_json: *const c_char) -> *mut c_char {
    with_match(record_json, |matcher, record| {
        matcher
            .match_info(record)
            .and_then(|info| serde_json::to_string(info).ok())
    })
}

/// Free a string returned by this bridge.
///
/// # Safety
/// `ptr` must be null or a pointer previously returned by this bridge.
#[no_mangle]
pub unsafe extern "C" fn blematch_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}
