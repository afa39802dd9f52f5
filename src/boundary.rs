//! Boundary adapter
//!
//! The five synchronous entry points the embedding runtime calls: `init`,
//! `version`, `dbversion`, `command`, and `benchmark`. `command` returns an
//! explicit [`Reply`] instead of writing a status header back into the
//! caller's buffer; the C rim in [`crate::c_api`] reconstructs that
//! convention where it is needed.

use crate::dispatch::Dispatcher;
use crate::driver::Driver;
use crate::error::Result;
use crate::ops::LogLevelChoice;
use crate::pool::{BlockPool, DEFAULT_POOL_SIZE};
use crate::session::Handle;
use crate::wire::{BlockBuf, DType, Sort};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// Fixed diagnostic payload of `benchmark`
const BENCHMARK_REPLY: &[u8] = b"output string";

/// Engine tunables, also loadable from JSON for embedders
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Initial diagnostic gate: "off", "error", "warn", "info", "debug",
    /// or "trace"
    pub log_level: String,
    /// Reply blocks kept for reuse between commands
    pub pool_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            log_level: "info".to_string(),
            pool_size: DEFAULT_POOL_SIZE,
        }
    }
}

impl EngineConfig {
    /// Parse a config from its JSON form; absent fields take defaults
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// One command result: payload plus the sort and type it was sealed with
///
/// An unknown command or malformed request degrades to the empty reply,
/// which reads as sort `Invalid`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Result bytes, without the status header or terminator
    pub payload: Vec<u8>,
    /// Sort the block was sealed with
    pub sort: Sort,
    /// Type the block was sealed with
    pub dtype: DType,
}

impl Reply {
    /// The degraded empty reply
    pub fn empty() -> Self {
        Reply {
            payload: Vec::new(),
            sort: Sort::Invalid,
            dtype: DType::None,
        }
    }

    fn from_block(block: &BlockBuf) -> Self {
        match block.kind() {
            Some(kind) => Reply {
                payload: block.payload().to_vec(),
                sort: kind.sort,
                dtype: kind.dtype,
            },
            None => Reply::empty(),
        }
    }

    /// True for ERROR-sort replies
    pub fn is_error(&self) -> bool {
        self.sort == Sort::Error
    }

    /// Payload as UTF-8, lossy
    pub fn text(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.payload)
    }
}

/// The embeddable engine
pub struct Engine {
    dispatcher: Dispatcher,
}

impl Engine {
    /// Engine over a driver with default tunables
    pub fn new(driver: Arc<dyn Driver>) -> Self {
        Engine {
            dispatcher: Dispatcher::new(driver),
        }
    }

    /// Engine with explicit tunables
    pub fn with_config(driver: Arc<dyn Driver>, config: &EngineConfig) -> Result<Self> {
        let level = LogLevelChoice::parse(&config.log_level).ok_or_else(|| {
            crate::error::DbxError::Config(format!(
                "unsupported log level {:?}",
                config.log_level
            ))
        })?;
        let dispatcher = Dispatcher::with_pool(driver, BlockPool::new(config.pool_size));
        dispatcher.log().set(level);
        Ok(Engine { dispatcher })
    }

    /// One-time setup; idempotent, always status 0
    pub fn init(&self) -> i32 {
        info!(version = crate::VERSION, "engine initialized");
        0
    }

    /// The crate's semantic version
    pub fn version(&self) -> &'static str {
        crate::VERSION
    }

    /// The backend's version banner, through the driver seam
    pub fn dbversion(&self) -> String {
        self.dispatcher.driver().version()
    }

    /// Dispatch one request with out-of-band command code and handle
    ///
    /// Never panics across the boundary and never mutates `input`;
    /// malformed input yields the empty reply.
    pub fn command(&self, input: &[u8], command_code: u8, handle: Handle) -> Reply {
        let block = self.dispatcher.dispatch(input, command_code, handle);
        let reply = Reply::from_block(&block);
        self.dispatcher.release(block);
        reply
    }

    /// Dispatch one request using the envelope's embedded code and context
    pub fn command_message(&self, input: &[u8]) -> Reply {
        let block = self.dispatcher.dispatch_message(input);
        let reply = Reply::from_block(&block);
        self.dispatcher.release(block);
        reply
    }

    /// Diagnostic echo: always the fixed payload, whatever the input
    pub fn benchmark(&self, _input: &[u8]) -> Vec<u8> {
        BENCHMARK_REPLY.to_vec()
    }

    /// Issue a fresh session handle for a Rust embedder
    pub fn allocate_session(&self) -> Handle {
        self.dispatcher.allocate_session()
    }

    /// The driver behind this engine
    pub fn driver(&self) -> &Arc<dyn Driver> {
        self.dispatcher.driver()
    }
}
