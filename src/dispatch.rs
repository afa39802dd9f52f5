//! Request dispatch
//!
//! One total function from request block to reply block. The envelope is
//! validated first; the command is a table lookup; handlers run with the
//! session locked and the driver shared. Domain failures become ERROR-sort
//! blocks, unknown codes become the blank minimal reply, and neither
//! crosses this layer as a panic.

use crate::command::Command;
use crate::driver::Driver;
use crate::ops::{self, Ctx, LogControl, ReplyBody};
use crate::pool::BlockPool;
use crate::session::{Handle, SessionRegistry};
use crate::wire::reader::Envelope;
use crate::wire::{BlockBuf, Kind};
use std::sync::{Arc, Mutex};
use tracing::{debug, trace};

/// Turns request blocks into reply blocks
pub struct Dispatcher {
    driver: Arc<dyn Driver>,
    sessions: Mutex<SessionRegistry>,
    pool: BlockPool,
    log: LogControl,
}

impl Dispatcher {
    /// Dispatcher over a driver, with a default block pool
    pub fn new(driver: Arc<dyn Driver>) -> Self {
        Dispatcher::with_pool(driver, BlockPool::default())
    }

    /// Dispatcher over a caller-sized reply pool
    pub fn with_pool(driver: Arc<dyn Driver>, pool: BlockPool) -> Self {
        Dispatcher {
            driver,
            sessions: Mutex::new(SessionRegistry::new()),
            pool,
            log: LogControl::new(),
        }
    }

    /// The backend behind this dispatcher
    pub fn driver(&self) -> &Arc<dyn Driver> {
        &self.driver
    }

    /// The diagnostic gate the `loglevel` command adjusts
    pub fn log(&self) -> &LogControl {
        &self.log
    }

    /// Issue a fresh session handle for a Rust embedder
    pub fn allocate_session(&self) -> Handle {
        self.sessions.lock().unwrap().allocate()
    }

    /// Dispatch with the command code and handle the boundary received
    ///
    /// The out-of-band values win over the envelope's own copies; callers
    /// pass both separately and the embedded copies are informational.
    pub fn dispatch(&self, input: &[u8], command_code: u8, handle: Handle) -> BlockBuf {
        match Envelope::parse(input) {
            Ok(envelope) => self.run(&envelope, command_code, handle),
            Err(err) => self.discard(err),
        }
    }

    /// Dispatch trusting the envelope's embedded command byte and context
    pub fn dispatch_message(&self, input: &[u8]) -> BlockBuf {
        match Envelope::parse(input) {
            Ok(envelope) => {
                let code = envelope.command_code();
                let handle = envelope.context_index();
                self.run(&envelope, code, handle)
            }
            Err(err) => self.discard(err),
        }
    }

    /// Return a reply block to the pool once its bytes are copied out
    pub fn release(&self, block: BlockBuf) {
        self.pool.release(block);
    }

    fn discard(&self, err: crate::error::DbxError) -> BlockBuf {
        debug!(%err, "discarding malformed request");
        let mut block = self.pool.acquire(0);
        block.seal_blank();
        block
    }

    fn run(&self, envelope: &Envelope<'_>, command_code: u8, handle: Handle) -> BlockBuf {
        let mut block = self.pool.acquire(envelope.capacity() as usize);

        let Some(command) = Command::from_code(command_code) else {
            debug!(code = command_code, "unknown command code");
            block.seal_blank();
            return block;
        };
        trace!(%command, handle, args = envelope.args().len(), "dispatching");

        let session = self.sessions.lock().unwrap().ensure(handle);
        let mut session = session.lock().unwrap();

        if command.requires_connection() && !session.state().is_connected() {
            block.seal_error(&format!("session {} is not connected", handle));
            return block;
        }

        let mut ctx = Ctx {
            driver: self.driver.as_ref(),
            session: &mut session,
            log: &self.log,
        };
        match ops::handler_for(command)(&mut ctx, envelope.args()) {
            Ok(body) => pack(&mut block, body),
            Err(err) => {
                debug!(%command, handle, %err, "command failed");
                block.seal_error(&err.to_string());
            }
        }
        block
    }
}

/// Write a handler's reply into the block and seal it
///
/// A reply that cannot fit the declared capacity turns into an ERROR block
/// reporting the overflow.
fn pack(block: &mut BlockBuf, body: ReplyBody) {
    let sealed = match body {
        ReplyBody::Item { bytes, kind } => {
            block.push_bytes(&bytes);
            block.seal(kind)
        }
        ReplyBody::OrderData { value, key } => {
            block.push_item(Kind::DATA_STR, &value);
            block.push_item(Kind::DATA_STR, &key);
            block.seal(Kind::DATA_STR)
        }
        ReplyBody::Node { value, keys, done } => {
            if !done {
                block.push_item(Kind::DATA_STR, &value);
                for key in &keys {
                    block.push_item(Kind::DATA_STR, key);
                }
            }
            block.push_eod();
            block.seal(Kind::DATA_STR)
        }
    };
    if let Err(err) = sealed {
        block.seal_error(&err.to_string());
    }
}
