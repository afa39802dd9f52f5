//! End-to-end command tests over the embeddable engine
//!
//! Every test drives the public surface the way a host process would:
//! pack a request block, hand it to `Engine::command` with a command code
//! and a session handle, and read the sealed reply. Each test owns its
//! engine so no state leaks between tests.

use dbxcore::wire::{NodeReply, OrderDataReply};
use dbxcore::{DType, Engine, EngineConfig, MemDriver, MessageWriter, Reply, Sort};
use std::sync::Arc;

const CAPACITY: u32 = 8192;

fn engine() -> Engine {
    // `try_init` so parallel tests racing to install a subscriber do not panic
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    Engine::new(Arc::new(MemDriver::new()))
}

fn connect(engine: &Engine) -> u32 {
    let session = engine.allocate_session();
    let open = MessageWriter::request(CAPACITY, session).finish(1);
    let reply = engine.command(&open, 1, session);
    assert!(!reply.is_error(), "open should succeed: {}", reply.text());
    session
}

/// Run a global-shaped command: GLOBAL item first, DATA items after.
fn run_global(engine: &Engine, session: u32, code: u8, global: &[u8], args: &[&[u8]]) -> Reply {
    let mut writer = MessageWriter::request(CAPACITY, session);
    writer.add_global(global);
    for arg in args {
        writer.add_data(arg);
    }
    engine.command(&writer.finish(code), code, session)
}

/// Run a command whose arguments are all DATA items.
fn run_data(engine: &Engine, session: u32, code: u8, args: &[&[u8]]) -> Reply {
    let mut writer = MessageWriter::request(CAPACITY, session);
    for arg in args {
        writer.add_data(arg);
    }
    engine.command(&writer.finish(code), code, session)
}

#[test]
fn test_open_reports_banner() {
    let engine = engine();
    let session = engine.allocate_session();
    let open = MessageWriter::request(CAPACITY, session).finish(1);
    let reply = engine.command(&open, 1, session);

    assert_eq!(
        reply.payload,
        engine.dbversion().as_bytes(),
        "open should reply with the driver banner"
    );
    assert_eq!(reply.sort, Sort::Data);
}

#[test]
fn test_second_open_is_rejected() {
    let engine = engine();
    let session = connect(&engine);
    let open = MessageWriter::request(CAPACITY, session).finish(1);
    let reply = engine.command(&open, 1, session);

    assert!(reply.is_error(), "reconnecting an open session should fail");
}

#[test]
fn test_set_get_roundtrip() {
    let engine = engine();
    let session = connect(&engine);

    let set = run_global(&engine, session, 11, b"stock", &[b"widget", b"170"]);
    assert!(!set.is_error(), "set failed: {}", set.text());

    let get = run_global(&engine, session, 12, b"stock", &[b"widget"]);
    assert_eq!(get.payload, b"170");
    assert_eq!(get.sort, Sort::Data);
    assert_eq!(get.dtype, DType::Str);

    // Reading a node that was never set yields the empty string
    let missing = run_global(&engine, session, 12, b"stock", &[b"gadget"]);
    assert!(!missing.is_error());
    assert!(missing.payload.is_empty(), "unset node should read empty");
}

#[test]
fn test_defined_delete_defined() {
    let engine = engine();
    let session = connect(&engine);

    run_global(&engine, session, 11, b"area", &[b"uk", b"751"]);
    run_global(&engine, session, 11, b"area", &[b"uk", b"london", b"211"]);

    // Value and descendants
    let both = run_global(&engine, session, 16, b"area", &[b"uk"]);
    assert_eq!(both.payload, b"11");
    // Value only
    let leaf = run_global(&engine, session, 16, b"area", &[b"uk", b"london"]);
    assert_eq!(leaf.payload, b"1");
    // Neither
    let none = run_global(&engine, session, 16, b"area", &[b"fr"]);
    assert_eq!(none.payload, b"0");

    // Kill the subtree and probe again
    let kill = run_global(&engine, session, 15, b"area", &[b"uk"]);
    assert!(!kill.is_error());
    let gone = run_global(&engine, session, 16, b"area", &[b"uk"]);
    assert_eq!(gone.payload, b"0");
}

#[test]
fn test_increment_coerces_numeric_prefix() {
    let engine = engine();
    let session = connect(&engine);

    run_global(&engine, session, 11, b"counter", &[b"hits", b"7 apples"]);
    let bumped = run_global(&engine, session, 17, b"counter", &[b"hits", b"3"]);
    assert_eq!(
        bumped.payload, b"10",
        "increment should use the numeric prefix of the stored value"
    );

    // Missing delta defaults to one
    let again = run_global(&engine, session, 17, b"counter", &[b"hits"]);
    assert_eq!(again.payload, b"11");
}

#[test]
fn test_order_walks_siblings_both_ways() {
    let engine = engine();
    let session = connect(&engine);
    for name in [&b"alpha"[..], b"bravo", b"charlie"] {
        run_global(&engine, session, 11, b"list", &[name, b"x"]);
    }

    // Forward from the empty seed
    let mut seed: Vec<u8> = Vec::new();
    let mut seen = Vec::new();
    loop {
        let next = run_global(&engine, session, 13, b"list", &[&seed]);
        if next.payload.is_empty() {
            break;
        }
        seen.push(next.payload.clone());
        seed = next.payload;
    }
    assert_eq!(seen, vec![b"alpha".to_vec(), b"bravo".to_vec(), b"charlie".to_vec()]);

    // Backward from the empty seed starts at the last sibling
    let last = run_global(&engine, session, 14, b"list", &[&b""[..]]);
    assert_eq!(last.payload, b"charlie");
    let before = run_global(&engine, session, 14, b"list", &[&b"bravo"[..]]);
    assert_eq!(before.payload, b"alpha");
}

#[test]
fn test_order_data_carries_value_and_key() {
    let engine = engine();
    let session = connect(&engine);
    run_global(&engine, session, 11, b"fleet", &[b"van", b"9"]);

    let reply = run_global(&engine, session, 131, b"fleet", &[&b""[..]]);
    let pair = OrderDataReply::parse(&reply.payload).expect("order-data reply should parse");
    assert_eq!(pair.key, b"van");
    assert_eq!(pair.data, b"9");

    // Exhausted traversal replies with two empty items
    let done = run_global(&engine, session, 131, b"fleet", &[&b"van"[..]]);
    let pair = OrderDataReply::parse(&done.payload).expect("exhausted reply should parse");
    assert!(pair.key.is_empty());
    assert!(pair.data.is_empty());
}

#[test]
fn test_node_traversal_visits_whole_subtree() {
    let engine = engine();
    let session = connect(&engine);
    run_global(&engine, session, 11, b"tree", &[b"a", b"1"]);
    run_global(&engine, session, 11, b"tree", &[b"a", b"aa", b"2"]);
    run_global(&engine, session, 11, b"tree", &[b"b", b"3"]);

    let mut path: Vec<Vec<u8>> = Vec::new();
    let mut visited = Vec::new();
    loop {
        let mut writer = MessageWriter::request(CAPACITY, session);
        writer.add_global(b"tree");
        for key in &path {
            writer.add_data(key);
        }
        let reply = engine.command(&writer.finish(211), 211, session);
        let node = NodeReply::parse(&reply.payload).expect("node reply should parse");
        if node.done {
            break;
        }
        visited.push((node.key.clone(), node.data.clone()));
        path = node.key;
    }

    let expected: Vec<(Vec<Vec<u8>>, Vec<u8>)> = vec![
        (vec![b"a".to_vec()], b"1".to_vec()),
        (vec![b"a".to_vec(), b"aa".to_vec()], b"2".to_vec()),
        (vec![b"b".to_vec()], b"3".to_vec()),
    ];
    assert_eq!(visited, expected, "depth-first byte order over the subtree");
}

#[test]
fn test_merge_copies_subtree() {
    let engine = engine();
    let session = connect(&engine);
    run_global(&engine, session, 11, b"source", &[b"x", b"1"]);
    run_global(&engine, session, 11, b"source", &[b"x", b"deep", b"2"]);

    // Destination keys, then the source global marked by its sort
    let mut writer = MessageWriter::request(CAPACITY, session);
    writer.add_global(b"dest");
    writer.add_data(b"copy");
    writer.add_global(b"source");
    let reply = engine.command(&writer.finish(20), 20, session);
    assert_eq!(reply.payload, b"1", "merge acknowledges with \"1\"");

    let got = run_global(&engine, session, 12, b"dest", &[b"copy", b"x"]);
    assert_eq!(got.payload, b"1");
    let deep = run_global(&engine, session, 12, b"dest", &[b"copy", b"x", b"deep"]);
    assert_eq!(deep.payload, b"2");
}

#[test]
fn test_global_directory_walk() {
    let engine = engine();
    let session = connect(&engine);
    run_global(&engine, session, 11, b"accounts", &[b"1"]);
    run_global(&engine, session, 11, b"orders", &[b"1"]);

    let first = run_data(&engine, session, 51, &[b""]);
    assert_eq!(first.payload, b"accounts");
    let second = run_data(&engine, session, 51, &[&first.payload]);
    assert_eq!(second.payload, b"orders");
    let done = run_data(&engine, session, 51, &[&second.payload]);
    assert!(done.payload.is_empty(), "directory walk ends on empty");

    let back = run_data(&engine, session, 52, &[b""]);
    assert_eq!(back.payload, b"orders");
}

#[test]
fn test_namespace_switch_isolates_data() {
    let engine = engine();
    let session = connect(&engine);

    run_global(&engine, session, 11, b"town", &[b"zeehan"]);
    let installed = run_data(&engine, session, 4, &[b"USER"]);
    assert_eq!(installed.payload, b"USER", "nsset echoes the installed name");
    let current = run_data(&engine, session, 3, &[]);
    assert_eq!(current.payload, b"USER");

    // The global written before the switch lives in the old namespace
    let other = run_global(&engine, session, 12, b"town", &[]);
    assert!(other.payload.is_empty());
}

#[test]
fn test_utility_commands_echo_settings() {
    let engine = engine();
    let session = connect(&engine);

    let timeout = run_data(&engine, session, 101, &[b"30"]);
    assert_eq!(timeout.payload, b"30");

    let charset = run_data(&engine, session, 102, &[b"ISO-8859-1"]);
    assert_eq!(charset.payload, b"latin-1", "charset replies canonical name");

    let level = run_data(&engine, session, 103, &[b"debug"]);
    assert_eq!(level.payload, b"debug");

    let logged = run_data(&engine, session, 104, &[b"engine started", b"audit"]);
    assert!(!logged.is_error());
}

#[test]
fn test_unknown_command_degrades_without_driver_state() {
    let engine = engine();
    let session = connect(&engine);

    let reply = run_data(&engine, session, 99, &[b"anything"]);
    assert_eq!(reply.sort, Sort::Invalid, "unknown code reads as invalid");
    assert!(reply.payload.is_empty());

    // The engine is still healthy afterwards
    let set = run_global(&engine, session, 11, b"still", &[b"alive"]);
    assert!(!set.is_error());
}

#[test]
fn test_malformed_block_degrades_to_empty() {
    let engine = engine();
    let session = connect(&engine);

    let garbage = vec![0x7fu8; 9];
    let before = garbage.clone();
    let reply = engine.command(&garbage, 12, session);
    assert_eq!(reply, Reply::empty());
    assert_eq!(garbage, before, "input must not be mutated");
}

#[test]
fn test_disconnected_session_is_refused() {
    let engine = engine();
    let session = engine.allocate_session();

    let reply = run_global(&engine, session, 12, b"stock", &[b"widget"]);
    assert!(reply.is_error(), "data commands need a connection");
    assert!(
        reply.text().contains("not connected"),
        "unexpected error: {}",
        reply.text()
    );
}

#[test]
fn test_close_is_idempotent() {
    let engine = engine();
    let session = connect(&engine);

    let close = MessageWriter::request(CAPACITY, session).finish(2);
    let first = engine.command(&close, 2, session);
    assert!(!first.is_error());

    let close = MessageWriter::request(CAPACITY, session).finish(2);
    let second = engine.command(&close, 2, session);
    assert!(!second.is_error(), "closing twice is not an error");
}

#[test]
fn test_object_lifecycle_over_the_wire() {
    let driver = Arc::new(MemDriver::new());
    driver.register_class("Sample");
    driver.register_method(
        "Sample",
        "Tag",
        Arc::new(|instance, args| {
            let suffix = args.first().map(|a| a.to_vec()).unwrap_or_default();
            let mut tagged = instance.property("label");
            tagged.extend_from_slice(&suffix);
            Ok(dbxcore::CallValue::Bytes(tagged))
        }),
    );
    let engine = Engine::new(driver);
    let session = connect(&engine);

    // %New returns an object reference
    let oref = run_data(&engine, session, 41, &[b"Sample", b"%New"]);
    assert_eq!(oref.dtype, DType::Oref);
    let handle = oref.payload.clone();

    let mut writer = MessageWriter::request(CAPACITY, session);
    writer.add_oref(String::from_utf8_lossy(&handle).parse().unwrap());
    writer.add_data(b"label");
    writer.add_data(b"crate-");
    let set = engine.command(&writer.finish(43), 43, session);
    assert!(!set.is_error(), "setproperty failed: {}", set.text());

    let mut writer = MessageWriter::request(CAPACITY, session);
    writer.add_oref(String::from_utf8_lossy(&handle).parse().unwrap());
    writer.add_data(b"Tag");
    writer.add_data(b"42");
    let tagged = engine.command(&writer.finish(44), 44, session);
    assert_eq!(tagged.payload, b"crate-42");

    let mut writer = MessageWriter::request(CAPACITY, session);
    writer.add_oref(String::from_utf8_lossy(&handle).parse().unwrap());
    let closed = engine.command(&writer.finish(45), 45, session);
    assert!(!closed.is_error());

    // The reference is dead after closeinstance
    let mut writer = MessageWriter::request(CAPACITY, session);
    writer.add_oref(String::from_utf8_lossy(&handle).parse().unwrap());
    writer.add_data(b"label");
    let dead = engine.command(&writer.finish(42), 42, session);
    assert!(dead.is_error(), "closed reference should be refused");
}

#[test]
fn test_function_call_over_the_wire() {
    let driver = Arc::new(MemDriver::new());
    driver.register_function(
        "Greet^util",
        Arc::new(|args| {
            let name = args.first().map(|a| a.to_vec()).unwrap_or_default();
            let mut out = b"hello ".to_vec();
            out.extend_from_slice(&name);
            Ok(dbxcore::CallValue::Bytes(out))
        }),
    );
    let engine = Engine::new(driver);
    let session = connect(&engine);

    let reply = run_data(&engine, session, 31, &[b"Greet^util", b"rust"]);
    assert_eq!(reply.payload, b"hello rust");

    let missing = run_data(&engine, session, 31, &[b"Absent^util"]);
    assert!(missing.is_error(), "unknown routine should be an error");
}

#[test]
fn test_version_parity_between_surfaces() {
    let engine = engine();
    assert_eq!(engine.version(), dbxcore::VERSION);
    let parts: Vec<&str> = engine.version().split('.').collect();
    assert_eq!(parts.len(), 3, "version is a dotted triple");
    for part in parts {
        part.parse::<u32>().expect("numeric version component");
    }
}

#[test]
fn test_config_file_roundtrip() {
    use std::io::Write;

    let config = EngineConfig {
        log_level: "debug".to_string(),
        pool_size: 4,
    };
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    file.write_all(config.to_json().unwrap().as_bytes()).unwrap();

    let text = std::fs::read_to_string(file.path()).unwrap();
    let restored = EngineConfig::from_json(&text).unwrap();
    assert_eq!(restored, config);

    let engine = Engine::with_config(Arc::new(MemDriver::new()), &restored)
        .expect("config should build an engine");
    let session = connect(&engine);
    let get = run_global(&engine, session, 12, b"anything", &[]);
    assert!(!get.is_error());
}
