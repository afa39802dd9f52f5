//! Output block construction
//!
//! Replies leave the dispatcher as a status header, a payload and one NUL
//! terminator. `BlockBuf` owns the backing buffer, keeps the
//! `len_used <= len_alloc` invariant, and writes the terminator on the one
//! code path shared by error and non-error replies.

use crate::error::{DbxError, Result};
use crate::wire::{DType, ItemHead, Kind, Sort, ITEM_HEAD_LEN, MAX_PAYLOAD};
use zerocopy::IntoBytes;

/// Growable reply block
///
/// The first five bytes are the status header, patched by [`seal`]. Content
/// appended in between becomes the payload. `len_alloc` mirrors the capacity
/// the remote caller declared for its receive buffer; zero means unbounded
/// (no cap was declared).
///
/// [`seal`]: BlockBuf::seal
#[derive(Debug)]
pub struct BlockBuf {
    buf: Vec<u8>,
    len_alloc: usize,
    len_used: usize,
    sealed: bool,
}

impl BlockBuf {
    /// New unbounded block
    pub fn new() -> Self {
        BlockBuf::with_limit(0)
    }

    /// New block that refuses to seal beyond `len_alloc` total bytes
    ///
    /// The limit covers the header, the payload and the terminator, which is
    /// exactly what the remote receive buffer has to hold.
    pub fn with_limit(len_alloc: usize) -> Self {
        let mut buf = Vec::with_capacity(ITEM_HEAD_LEN + 64);
        buf.resize(ITEM_HEAD_LEN, 0);
        BlockBuf {
            buf,
            len_alloc,
            len_used: 0,
            sealed: false,
        }
    }

    /// Clear content for reuse, keeping the allocation
    ///
    /// The capacity cap is re-armed per call by the pool.
    pub fn recycle(&mut self, len_alloc: usize) {
        self.buf.clear();
        self.buf.resize(ITEM_HEAD_LEN, 0);
        self.len_alloc = len_alloc;
        self.len_used = 0;
        self.sealed = false;
    }

    /// Append raw payload bytes
    pub fn push_bytes(&mut self, bytes: &[u8]) {
        debug_assert!(!self.sealed);
        self.buf.extend_from_slice(bytes);
    }

    /// Append one self-describing item (head + payload)
    pub fn push_item(&mut self, kind: Kind, payload: &[u8]) {
        debug_assert!(!self.sealed);
        let head = ItemHead::new(payload.len() as u32, kind.to_u8());
        self.buf.extend_from_slice(head.as_bytes());
        self.buf.extend_from_slice(payload);
    }

    /// Append the end-of-data item closing a multi-item reply
    pub fn push_eod(&mut self) {
        self.push_item(Kind::EOD, &[]);
    }

    /// Patch the status header and write the terminator
    ///
    /// Fails with `DbxError::Capacity` when the finished block would not fit
    /// the declared receive buffer. The terminator is written identically
    /// for error and non-error sorts.
    pub fn seal(&mut self, kind: Kind) -> Result<()> {
        let len = self.buf.len() - ITEM_HEAD_LEN;
        if len > MAX_PAYLOAD {
            return Err(DbxError::Capacity(format!(
                "reply payload of {} bytes exceeds the long-string ceiling {}",
                len, MAX_PAYLOAD
            )));
        }
        if self.len_alloc != 0 && self.buf.len() + 1 > self.len_alloc {
            return Err(DbxError::Capacity(format!(
                "reply needs {} bytes but the caller declared {}",
                self.buf.len() + 1,
                self.len_alloc
            )));
        }
        let head = ItemHead::new(len as u32, kind.to_u8());
        self.buf[..ITEM_HEAD_LEN].copy_from_slice(head.as_bytes());
        self.buf.push(0);
        self.len_used = len;
        self.sealed = true;
        Ok(())
    }

    /// Replace any partial content with an error report and seal
    ///
    /// Error blocks bypass the capacity cap so that the overflow itself can
    /// be reported; callers receive at least the leading bytes of the
    /// message even on a tiny declared buffer.
    pub fn seal_error(&mut self, message: &str) {
        self.buf.truncate(ITEM_HEAD_LEN);
        let mut bytes = message.as_bytes();
        if self.len_alloc != 0 {
            let room = self.len_alloc.saturating_sub(ITEM_HEAD_LEN + 1);
            if bytes.len() > room {
                bytes = &bytes[..room];
            }
        }
        self.buf.extend_from_slice(bytes);
        let head = ItemHead::new(
            bytes.len() as u32,
            Kind {
                sort: Sort::Error,
                dtype: DType::Str,
            }
            .to_u8(),
        );
        self.buf[..ITEM_HEAD_LEN].copy_from_slice(head.as_bytes());
        self.buf.push(0);
        self.len_used = bytes.len();
        self.sealed = true;
    }

    /// Seal as the minimal empty result (blank header, no payload)
    ///
    /// This is the defined fallback for unknown command codes.
    pub fn seal_blank(&mut self) {
        self.buf.truncate(ITEM_HEAD_LEN);
        for b in &mut self.buf[..ITEM_HEAD_LEN] {
            *b = 0;
        }
        self.buf.push(0);
        self.len_used = 0;
        self.sealed = true;
    }

    /// The five status-header bytes
    pub fn header(&self) -> &[u8] {
        &self.buf[..ITEM_HEAD_LEN]
    }

    /// Payload bytes (between header and terminator)
    pub fn payload(&self) -> &[u8] {
        &self.buf[ITEM_HEAD_LEN..ITEM_HEAD_LEN + self.len_used]
    }

    /// Entire block including header and, once sealed, the terminator
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Logical payload length
    pub fn len_used(&self) -> usize {
        self.len_used
    }

    /// Declared capacity cap (0 = unbounded)
    pub fn len_alloc(&self) -> usize {
        self.len_alloc
    }

    /// Kind recorded in the status header
    ///
    /// `None` for a blank header (the unknown-command fallback).
    pub fn kind(&self) -> Option<Kind> {
        Kind::from_u8(self.buf[4]).filter(|k| k.sort != Sort::Invalid || self.len_used > 0)
    }
}

impl Default for BlockBuf {
    fn default() -> Self {
        BlockBuf::new()
    }
}
