//! C API for the dbxcore engine
//!
//! This module provides a stable C ABI for use from C and C++ programs,
//! following the classic shim calling convention: the caller hands over
//! a request block, a command code, and a context index, and receives a
//! malloc'd NUL-terminated result string.
//!
//! One engine instance serves the whole process. It is created lazily on
//! first use and lives until exit.

use crate::boundary::Engine;
use crate::mem::MemDriver;
use crate::session::Handle;
use crate::wire::{ItemHead, Kind, ITEM_HEAD_LEN};
use once_cell::sync::Lazy;
use std::ffi::CStr;
use std::os::raw::{c_char, c_int, c_uchar, c_void};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use zerocopy::IntoBytes;

/// Crate version with a trailing NUL so it can be handed out as a C string.
const VERSION_C: &str = concat!(env!("CARGO_PKG_VERSION"), "\0");

static ENGINE: Lazy<Engine> = Lazy::new(|| Engine::new(Arc::new(MemDriver::new())));

fn engine() -> &'static Engine {
    &ENGINE
}

/// Copy a payload into a malloc'd NUL-terminated buffer.
///
/// The caller owns the returned pointer and must release it with
/// `dbx_free_result`. Returns NULL only when malloc itself fails.
unsafe fn copy_to_c(payload: &[u8]) -> *mut c_char {
    let buf = libc::malloc(payload.len() + 1) as *mut u8;
    if buf.is_null() {
        return std::ptr::null_mut();
    }
    std::ptr::copy_nonoverlapping(payload.as_ptr(), buf, payload.len());
    *buf.add(payload.len()) = 0;
    buf as *mut c_char
}

/// Initialize the engine
///
/// Creates the process-wide engine on first call. Subsequent calls are
/// no-ops. Safe to call from multiple threads.
///
/// # Returns
/// * 0 on success
///
/// # Example
/// ```c
/// if (dbx_init() != 0) {
///     fprintf(stderr, "engine failed to start\n");
///     return 1;
/// }
/// ```
#[no_mangle]
pub extern "C" fn dbx_init() -> c_int {
    // Panics must not cross the FFI boundary
    panic::catch_unwind(AssertUnwindSafe(|| engine().init())).unwrap_or(0)
}

/// Get the engine version string
///
/// # Returns
/// * Static NUL-terminated version string, e.g. "1.0.2"
/// * The pointer is owned by the library and must NOT be freed
///
/// # Example
/// ```c
/// printf("dbxcore %s\n", dbx_version());
/// ```
#[no_mangle]
pub extern "C" fn dbx_version() -> *const c_char {
    VERSION_C.as_ptr() as *const c_char
}

/// Get the database banner reported by the active driver
///
/// # Returns
/// * Malloc'd NUL-terminated banner string
/// * Empty string when the driver cannot be reached
/// * NULL only on allocation failure
///
/// # Safety
/// * The result must be released with `dbx_free_result`
///
/// # Example
/// ```c
/// char* banner = dbx_dbversion();
/// printf("%s\n", banner);
/// dbx_free_result(banner);
/// ```
#[no_mangle]
pub unsafe extern "C" fn dbx_dbversion() -> *mut c_char {
    let produced = panic::catch_unwind(AssertUnwindSafe(|| {
        let banner = engine().dbversion();
        copy_to_c(banner.as_bytes())
    }));
    match produced {
        Ok(ptr) => ptr,
        Err(_) => copy_to_c(b""),
    }
}

/// Execute one database command
///
/// `buffer` holds a request block: the 5-byte head, the command byte at
/// offset 4, two size items, the arguments, and a closing end-of-data
/// item. The command code and context index passed here take precedence
/// over the copies embedded in the block.
///
/// On return the first five bytes of `buffer` are overwritten with the
/// status header of the reply, preserving the classic in-place
/// convention. The reply payload itself is returned as a separate
/// malloc'd NUL-terminated string so it can outlive the request buffer.
///
/// # Parameters
/// * `buffer` - Request block, at least `len` bytes, writable
/// * `len` - Number of valid bytes in `buffer`
/// * `cmnd` - Command code, 0..=255
/// * `context` - Session handle the command runs against
///
/// # Returns
/// * Malloc'd NUL-terminated reply payload
/// * Empty string when the arguments are invalid or the request is malformed
/// * NULL only on allocation failure
///
/// # Safety
/// * `buffer` must be valid for reads and writes of `len` bytes
/// * The result must be released with `dbx_free_result`
///
/// # Example
/// ```c
/// unsigned char buffer[512];
/// int len = build_get_request(buffer, sizeof buffer);
/// char* value = dbx_command(buffer, len, 12, session);
/// printf("value: %s\n", value);
/// dbx_free_result(value);
/// ```
#[no_mangle]
pub unsafe extern "C" fn dbx_command(
    buffer: *mut c_uchar,
    len: c_int,
    cmnd: c_int,
    context: c_int,
) -> *mut c_char {
    // Validate input
    if buffer.is_null() || len < 0 || !(0..=255).contains(&cmnd) || context < 0 {
        return copy_to_c(b"");
    }
    let produced = panic::catch_unwind(AssertUnwindSafe(|| {
        let input = std::slice::from_raw_parts(buffer as *const u8, len as usize);
        let reply = engine().command(input, cmnd as u8, context as Handle);

        // Write the status header back over the head of the request
        if len as usize >= ITEM_HEAD_LEN {
            let kind = Kind {
                sort: reply.sort,
                dtype: reply.dtype,
            };
            let head = ItemHead::new(reply.payload.len() as u32, kind.to_u8());
            std::ptr::copy_nonoverlapping(head.as_bytes().as_ptr(), buffer, ITEM_HEAD_LEN);
        }
        copy_to_c(&reply.payload)
    }));
    match produced {
        Ok(ptr) => ptr,
        Err(_) => copy_to_c(b""),
    }
}

/// Round-trip a fixed payload through the boundary
///
/// Used by callers to verify that argument passing, allocation, and
/// release all work before any real traffic flows.
///
/// # Parameters
/// * `input` - NUL-terminated probe string; its content is ignored
///
/// # Returns
/// * Malloc'd NUL-terminated fixed payload
/// * Empty string when `input` is NULL
/// * NULL only on allocation failure
///
/// # Safety
/// * `input` must be NUL-terminated when non-NULL
/// * The result must be released with `dbx_free_result`
///
/// # Example
/// ```c
/// char* echo = dbx_benchmark((const unsigned char*)"probe");
/// assert(strcmp(echo, "output string") == 0);
/// dbx_free_result(echo);
/// ```
#[no_mangle]
pub unsafe extern "C" fn dbx_benchmark(input: *const c_uchar) -> *mut c_char {
    if input.is_null() {
        return copy_to_c(b"");
    }
    let produced = panic::catch_unwind(AssertUnwindSafe(|| {
        let probe = CStr::from_ptr(input as *const c_char);
        let echoed = engine().benchmark(probe.to_bytes());
        copy_to_c(&echoed)
    }));
    match produced {
        Ok(ptr) => ptr,
        Err(_) => copy_to_c(b""),
    }
}

/// Release a result string returned by this library
///
/// Accepts NULL and does nothing. Must only be given pointers obtained
/// from `dbx_dbversion`, `dbx_command`, or `dbx_benchmark`.
///
/// # Safety
/// * `result` must be NULL or a pointer returned by this library that
///   has not been freed already
///
/// # Example
/// ```c
/// char* result = dbx_command(buffer, len, 12, 1);
/// // ... use result ...
/// dbx_free_result(result);
/// ```
#[no_mangle]
pub unsafe extern "C" fn dbx_free_result(result: *mut c_char) {
    if result.is_null() {
        return;
    }
    libc::free(result as *mut c_void);
}
