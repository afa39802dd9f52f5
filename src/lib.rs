//! Dbxcore - Embeddable Command Engine for Hierarchical Data
//!
//! Dbxcore speaks the classic database shim protocol: requests and replies
//! travel as self-describing binary blocks of length-prefixed items, and a
//! single integer-coded `command` entry point covers the whole surface, from
//! global get/set through traversal, locking, transactions, and object
//! calls. The engine ships with an in-memory storage driver and exposes both
//! a Rust API and a stable C ABI.
//!
//! # Quick Start
//!
//! ```rust
//! use dbxcore::{Engine, MemDriver, MessageWriter};
//! use std::sync::Arc;
//!
//! let engine = Engine::new(Arc::new(MemDriver::new()));
//! let session = engine.allocate_session();
//!
//! // Connect the session (empty profile selects driver defaults)
//! let open = MessageWriter::request(4096, session).finish(1);
//! let reply = engine.command(&open, 1, session);
//! assert!(!reply.is_error());
//!
//! // Set ^inventory("widget") = "17"
//! let mut writer = MessageWriter::request(4096, session);
//! writer.add_global(b"inventory");
//! writer.add_data(b"widget");
//! writer.add_data(b"17");
//! engine.command(&writer.finish(11), 11, session);
//!
//! // Read it back
//! let mut writer = MessageWriter::request(4096, session);
//! writer.add_global(b"inventory");
//! writer.add_data(b"widget");
//! let reply = engine.command(&writer.finish(12), 12, session);
//! assert_eq!(reply.payload, b"17");
//! ```
//!
//! # Key Features
//!
//! - **One Entry Point**: ~36 integer-coded commands behind a single call
//! - **Self-Describing Blocks**: length, sort, and type ride with every item
//! - **Session Isolation**: concurrent sessions never see each other's state
//! - **Nested Transactions**: undo-journal commit and rollback per session
//! - **Hierarchical Locks**: prefix-conflict locks with timeouts
//! - **Pluggable Storage**: the `Driver` trait seats any backend
//! - **C/C++ API**: stable FFI for any language
//!
//! # Architecture
//!
//! Every request flows through the same pipeline:
//!
//! ```text
//! ┌──────────────────────────────────────┐
//! │  Request Block                       │
//! │  head │ cmnd │ sizes │ args │ eod    │
//! └──────────────────────────────────────┘
//!          ↓ Engine::command(code, handle)
//! ┌──────────────────────────────────────┐
//! │  Dispatcher                          │
//! │  1. Parse and validate the envelope  │
//! │  2. Lock the session for the handle  │
//! │  3. Run the handler on the driver    │
//! │  4. Seal the reply block             │
//! └──────────────────────────────────────┘
//!          ↓
//! ┌──────────────────────────────────────┐
//! │  Reply Block                         │
//! │  status header │ payload │ NUL       │
//! └──────────────────────────────────────┘
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

// Module declarations
/// Embeddable engine facade
pub mod boundary;
/// Command codes and their dispatch metadata
pub mod command;
/// Request dispatch against the session registry
pub mod dispatch;
/// Storage driver trait
pub mod driver;
/// Error types for engine operations
pub mod error;
/// In-memory reference driver
pub mod mem;
/// Per-command handlers
pub mod ops;
pub mod pool;
/// Session state and connection profiles
pub mod session;
pub mod wire;

// Public C API
pub mod c_api;

// Re-exports for Rust consumers

/// The embeddable engine
///
/// This is the primary API for hosting the command surface in-process. An
/// engine owns a dispatcher, a session registry, and a storage driver; every
/// interaction goes through [`Engine::command`] with a request block, a
/// command code, and a session handle.
///
/// # Example
/// ```rust
/// use dbxcore::{Engine, MemDriver, MessageWriter};
/// use std::sync::Arc;
///
/// let engine = Engine::new(Arc::new(MemDriver::new()));
/// let session = engine.allocate_session();
///
/// let open = MessageWriter::request(4096, session).finish(1);
/// let reply = engine.command(&open, 1, session);
/// assert_eq!(reply.payload, engine.dbversion().as_bytes());
/// ```
pub use crate::boundary::Engine;

pub use crate::boundary::{EngineConfig, Reply};
pub use crate::command::Command;
pub use crate::dispatch::Dispatcher;
pub use crate::driver::{CallValue, Direction, Driver, NodeStatus, NodeStep};
pub use crate::error::{DbxError, Result};
pub use crate::mem::MemDriver;
pub use crate::pool::BlockPool;
pub use crate::session::{CharsetChoice, Handle, OpenProfile, Session, SessionRegistry};
pub use crate::wire::{BlockBuf, DType, Envelope, Kind, MessageWriter, ReplyReader, Sort};

// Version information
/// Library version string
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library major version
pub const VERSION_MAJOR: u32 = 1;

/// Library minor version
pub const VERSION_MINOR: u32 = 0;

/// Library patch version
pub const VERSION_PATCH: u32 = 2;
