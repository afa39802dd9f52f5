//! Command handlers
//!
//! One handler per wire command, each a plain function from parsed
//! arguments to a [`ReplyBody`], unit-testable without the boundary.
//! [`handler_for`] is the dispatch lookup keyed by [`Command`].

pub mod connection;
pub mod global;
pub mod locking;
pub mod object;
pub mod transaction;
pub mod utility;

use crate::command::Command;
use crate::driver::{CallValue, Driver};
use crate::error::{DbxError, Result};
use crate::session::{Handle, Session};
use crate::wire::reader::Arg;
use crate::wire::{DType, Kind, Sort};
use std::sync::atomic::{AtomicU8, Ordering};

/// Everything a handler may touch
pub struct Ctx<'a> {
    /// Storage backend
    pub driver: &'a dyn Driver,
    /// The session addressed by the request
    pub session: &'a mut Session,
    /// Engine-wide diagnostic gate
    pub log: &'a LogControl,
}

impl Ctx<'_> {
    fn handle(&self) -> Handle {
        self.session.handle()
    }
}

/// What a handler hands back for packing into the output block
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyBody {
    /// Single payload carried in the status header
    Item { bytes: Vec<u8>, kind: Kind },
    /// Sibling-with-value reply: value item then subscript item
    OrderData { value: Vec<u8>, key: Vec<u8> },
    /// Node traversal reply: value item, one item per subscript, then EOD;
    /// a bare EOD when `done`
    Node {
        value: Vec<u8>,
        keys: Vec<Vec<u8>>,
        done: bool,
    },
}

impl ReplyBody {
    /// Empty DATA payload
    pub fn empty() -> Self {
        ReplyBody::Item {
            bytes: Vec::new(),
            kind: Kind::DATA_STR,
        }
    }

    /// Literal DATA payload
    pub fn text(text: &str) -> Self {
        ReplyBody::Item {
            bytes: text.as_bytes().to_vec(),
            kind: Kind::DATA_STR,
        }
    }

    /// Owned DATA payload
    pub fn bytes(bytes: Vec<u8>) -> Self {
        ReplyBody::Item {
            bytes,
            kind: Kind::DATA_STR,
        }
    }

    /// Call result: plain bytes, or a decimal object reference
    pub fn call(value: CallValue) -> Self {
        match value {
            CallValue::Bytes(bytes) => ReplyBody::bytes(bytes),
            CallValue::Oref(oref) => ReplyBody::Item {
                bytes: oref.to_string().into_bytes(),
                kind: Kind {
                    sort: Sort::Data,
                    dtype: DType::Oref,
                },
            },
        }
    }
}

/// Handler signature shared by every command
pub type Handler = fn(&mut Ctx<'_>, &[Arg<'_>]) -> Result<ReplyBody>;

/// Dispatch lookup
pub fn handler_for(command: Command) -> Handler {
    match command {
        Command::Open => connection::open,
        Command::Close => connection::close,
        Command::NsGet => connection::ns_get,
        Command::NsSet => connection::ns_set,
        Command::GSet => global::set,
        Command::GGet => global::get,
        Command::GNext => global::next,
        Command::GPrevious => global::previous,
        Command::GDelete => global::delete,
        Command::GDefined => global::defined,
        Command::GIncrement => global::increment,
        Command::GLock => locking::lock,
        Command::GUnlock => locking::unlock,
        Command::GMerge => global::merge,
        Command::GNextNode => global::next_node,
        Command::GPreviousNode => global::previous_node,
        Command::Function => object::function,
        Command::ClassMethod => object::classmethod,
        Command::GetProperty => object::get_property,
        Command::SetProperty => object::set_property,
        Command::Method => object::method,
        Command::CloseInstance => object::close_instance,
        Command::GNameNext => global::name_next,
        Command::GNamePrevious => global::name_previous,
        Command::TStart => transaction::start,
        Command::TLevel => transaction::level,
        Command::TCommit => transaction::commit,
        Command::TRollback => transaction::rollback,
        Command::Timeout => utility::timeout,
        Command::Charset => utility::charset,
        Command::LogLevel => utility::log_level,
        Command::LogMessage => utility::log_message,
        Command::GNextData => global::next_data,
        Command::GPreviousData => global::previous_data,
        Command::GNextNodeData => global::next_node_data,
        Command::GPreviousNodeData => global::previous_node_data,
    }
}

/// Engine-wide diagnostic gate set by the `loglevel` command
#[derive(Debug)]
pub struct LogControl {
    level: AtomicU8,
}

/// Diagnostic levels accepted by `loglevel`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd)]
#[repr(u8)]
pub enum LogLevelChoice {
    /// Nothing is emitted
    Off = 0,
    /// Errors only
    Error = 1,
    /// Warnings and errors
    Warn = 2,
    /// Routine lifecycle events
    Info = 3,
    /// Per-command detail
    Debug = 4,
    /// Everything
    Trace = 5,
}

impl LogLevelChoice {
    /// Parse a level name; case-insensitive, `None` for unknown names
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "off" | "none" => Some(LogLevelChoice::Off),
            "error" => Some(LogLevelChoice::Error),
            "warn" | "warning" => Some(LogLevelChoice::Warn),
            "info" => Some(LogLevelChoice::Info),
            "debug" => Some(LogLevelChoice::Debug),
            "trace" => Some(LogLevelChoice::Trace),
            _ => None,
        }
    }

    /// Canonical level name
    pub fn name(self) -> &'static str {
        match self {
            LogLevelChoice::Off => "off",
            LogLevelChoice::Error => "error",
            LogLevelChoice::Warn => "warn",
            LogLevelChoice::Info => "info",
            LogLevelChoice::Debug => "debug",
            LogLevelChoice::Trace => "trace",
        }
    }

    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => LogLevelChoice::Error,
            2 => LogLevelChoice::Warn,
            3 => LogLevelChoice::Info,
            4 => LogLevelChoice::Debug,
            5 => LogLevelChoice::Trace,
            _ => LogLevelChoice::Off,
        }
    }
}

impl Default for LogControl {
    fn default() -> Self {
        LogControl {
            level: AtomicU8::new(LogLevelChoice::Info as u8),
        }
    }
}

impl LogControl {
    /// Gate starting at `Info`
    pub fn new() -> Self {
        LogControl::default()
    }

    /// Move the gate
    pub fn set(&self, level: LogLevelChoice) {
        self.level.store(level as u8, Ordering::Relaxed);
    }

    /// Current gate
    pub fn get(&self) -> LogLevelChoice {
        LogLevelChoice::from_u8(self.level.load(Ordering::Relaxed))
    }

    /// True when events at `level` should be emitted
    pub fn enabled(&self, level: LogLevelChoice) -> bool {
        level != LogLevelChoice::Off && level <= self.get()
    }
}

/// Split off the leading GLOBAL-sort name item
fn require_global<'a>(args: &'a [Arg<'a>]) -> Result<(&'a [u8], &'a [Arg<'a>])> {
    match args.first() {
        Some(first) if first.kind.sort == Sort::Global => Ok((first.bytes, &args[1..])),
        _ => Err(DbxError::Global(
            "global name must lead the argument list".to_string(),
        )),
    }
}

/// Borrow the payloads of a run of key arguments
fn key_slices<'a>(args: &[Arg<'a>]) -> Vec<&'a [u8]> {
    args.iter().map(|a| a.bytes).collect()
}

/// Parse a decimal object reference argument
fn parse_oref(arg: &Arg<'_>) -> Result<u32> {
    std::str::from_utf8(arg.bytes)
        .ok()
        .and_then(|s| s.trim().parse::<u32>().ok())
        .ok_or_else(|| {
            DbxError::Object(format!(
                "invalid object reference {:?}",
                String::from_utf8_lossy(arg.bytes)
            ))
        })
}
