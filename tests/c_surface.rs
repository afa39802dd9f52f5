//! C boundary contract tests
//!
//! These drive the exported FFI functions the way a foreign host would:
//! raw pointers in, malloc'd strings out. The C surface owns one
//! process-wide engine, so every test here works on its own session
//! handle and its own globals.

use dbxcore::c_api::{
    dbx_benchmark, dbx_command, dbx_dbversion, dbx_free_result, dbx_init, dbx_version,
};
use dbxcore::wire::ItemHead;
use dbxcore::MessageWriter;
use std::ffi::{CStr, CString};

/// Run one command through the C surface, returning the result string and
/// the status header written back into the request buffer.
fn c_command(mut request: Vec<u8>, code: u8, session: u32) -> (Vec<u8>, ItemHead) {
    let len = request.len() as i32;
    let result = unsafe { dbx_command(request.as_mut_ptr(), len, code as i32, session as i32) };
    assert!(!result.is_null(), "allocation failed");
    let payload = unsafe { CStr::from_ptr(result) }.to_bytes().to_vec();
    unsafe { dbx_free_result(result) };
    let header = ItemHead::read(&request).expect("request shorter than a head");
    (payload, header)
}

#[test]
fn test_init_is_idempotent() {
    assert_eq!(dbx_init(), 0);
    assert_eq!(dbx_init(), 0, "repeated init must stay successful");
}

#[test]
fn test_version_is_static() {
    let first = dbx_version();
    let second = dbx_version();
    assert_eq!(first, second, "version pointer must be stable");

    let text = unsafe { CStr::from_ptr(first) }.to_str().unwrap();
    assert_eq!(text, dbxcore::VERSION);
}

#[test]
fn test_dbversion_reports_banner() {
    let banner = unsafe { dbx_dbversion() };
    assert!(!banner.is_null());
    let text = unsafe { CStr::from_ptr(banner) }.to_str().unwrap().to_string();
    unsafe { dbx_free_result(banner) };
    assert!(
        text.contains("in-memory database"),
        "unexpected banner: {text}"
    );
}

#[test]
fn test_command_writes_status_header_in_place() {
    dbx_init();
    let session = 9001u32;

    let open = MessageWriter::request(4096, session).finish(1);
    let (banner, header) = c_command(open, 1, session);
    assert!(!banner.is_empty(), "open should reply with the banner");
    assert_eq!(header.len(), banner.len(), "header must declare the payload");

    let mut writer = MessageWriter::request(4096, session);
    writer.add_global(b"csurface");
    writer.add_data(b"k");
    writer.add_data(b"v1");
    c_command(writer.finish(11), 11, session);

    let mut writer = MessageWriter::request(4096, session);
    writer.add_global(b"csurface");
    writer.add_data(b"k");
    let (value, header) = c_command(writer.finish(12), 12, session);
    assert_eq!(value, b"v1");
    assert_eq!(header.len(), 2);
    // sort DATA (1) * 20 + type STR (1)
    assert_eq!(header.kind, 21);
}

#[test]
fn test_invalid_arguments_degrade_to_empty() {
    dbx_init();

    let null_buffer = unsafe { dbx_command(std::ptr::null_mut(), 16, 12, 1) };
    assert_eq!(unsafe { CStr::from_ptr(null_buffer) }.to_bytes(), b"");
    unsafe { dbx_free_result(null_buffer) };

    let mut buffer = vec![0u8; 16];
    let negative_len = unsafe { dbx_command(buffer.as_mut_ptr(), -1, 12, 1) };
    assert_eq!(unsafe { CStr::from_ptr(negative_len) }.to_bytes(), b"");
    unsafe { dbx_free_result(negative_len) };

    let wild_code = unsafe { dbx_command(buffer.as_mut_ptr(), 16, 300, 1) };
    assert_eq!(unsafe { CStr::from_ptr(wild_code) }.to_bytes(), b"");
    unsafe { dbx_free_result(wild_code) };

    let negative_context = unsafe { dbx_command(buffer.as_mut_ptr(), 16, 12, -5) };
    assert_eq!(unsafe { CStr::from_ptr(negative_context) }.to_bytes(), b"");
    unsafe { dbx_free_result(negative_context) };
}

#[test]
fn test_malformed_block_yields_blank_header() {
    dbx_init();
    let session = 9002u32;

    // Nine bytes of noise: too short to be a message, long enough for a head
    let garbage = vec![0x7fu8; 9];
    let (payload, header) = c_command(garbage, 12, session);
    assert!(payload.is_empty());
    assert_eq!(header.len(), 0, "blank reply declares no payload");
    assert_eq!(header.kind, 0);
}

#[test]
fn test_benchmark_round_trip() {
    let probe = CString::new("probe").unwrap();
    let echoed = unsafe { dbx_benchmark(probe.as_ptr() as *const u8) };
    assert_eq!(
        unsafe { CStr::from_ptr(echoed) }.to_bytes(),
        b"output string"
    );
    unsafe { dbx_free_result(echoed) };

    let empty = unsafe { dbx_benchmark(std::ptr::null()) };
    assert_eq!(unsafe { CStr::from_ptr(empty) }.to_bytes(), b"");
    unsafe { dbx_free_result(empty) };
}

#[test]
fn test_free_accepts_null() {
    unsafe { dbx_free_result(std::ptr::null_mut()) };
}
