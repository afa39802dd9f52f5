//! Request envelope parsing and reply readers
//!
//! The dispatcher sees a request as a borrowed byte region; `Envelope`
//! validates the framing described in the module docs and exposes the
//! arguments without copying. Parse failures carry the offending offset so
//! a misbehaving client can be diagnosed from the error text alone.
//!
//! `OrderDataReply` and `NodeReply` decode the multi-item reply layouts of
//! the traversal commands for Rust-side consumers and tests.

use crate::error::{DbxError, Result};
use crate::wire::{ItemHead, Kind, Sort, ITEM_HEAD_LEN, MAX_PAYLOAD};

/// Smallest valid message: head, two size items, end-of-data
pub const MIN_MESSAGE_LEN: usize = 4 * ITEM_HEAD_LEN;

/// One parsed argument, borrowing the request bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arg<'a> {
    /// Sort and type from the item's kind byte
    pub kind: Kind,
    /// Payload bytes
    pub bytes: &'a [u8],
}

impl<'a> Arg<'a> {
    /// Payload as UTF-8, lossy
    pub fn text(&self) -> std::borrow::Cow<'a, str> {
        String::from_utf8_lossy(self.bytes)
    }
}

/// A parsed request envelope
///
/// Borrows the caller's buffer; nothing here owns or mutates request bytes.
#[derive(Debug)]
pub struct Envelope<'a> {
    command_code: u8,
    capacity: u32,
    context_index: u32,
    args: Vec<Arg<'a>>,
}

impl<'a> Envelope<'a> {
    /// Parse and validate one request message
    pub fn parse(bytes: &'a [u8]) -> Result<Self> {
        let head = ItemHead::read(bytes)
            .ok_or_else(|| DbxError::Wire("message shorter than a head".into()))?;
        let total = head.len();
        if total < MIN_MESSAGE_LEN {
            return Err(DbxError::Wire(format!(
                "head declares {} bytes, minimum message is {}",
                total, MIN_MESSAGE_LEN
            )));
        }
        if total > bytes.len() {
            return Err(DbxError::Wire(format!(
                "head declares {} bytes but only {} are available",
                total,
                bytes.len()
            )));
        }
        let message = &bytes[..total];

        let capacity = read_size_item(message, ITEM_HEAD_LEN, 1)?;
        let context_index = read_size_item(message, 2 * ITEM_HEAD_LEN, 2)?;

        let mut args = Vec::new();
        let mut offset = 3 * ITEM_HEAD_LEN;
        loop {
            let item = ItemHead::read(&message[offset..]).ok_or_else(|| {
                DbxError::Wire(format!("message ends mid-item at offset {}", offset))
            })?;
            let kind = Kind::from_u8(item.kind).ok_or_else(|| {
                DbxError::Wire(format!(
                    "undecodable kind byte {} at offset {}",
                    item.kind, offset
                ))
            })?;
            let start = offset + ITEM_HEAD_LEN;
            let end = start + item.len();
            if end > message.len() {
                return Err(DbxError::Wire(format!(
                    "item at offset {} overruns the message ({} > {})",
                    offset,
                    end,
                    message.len()
                )));
            }
            if item.len() > MAX_PAYLOAD {
                return Err(DbxError::Wire(format!(
                    "item at offset {} declares {} bytes, the long-string ceiling is {}",
                    offset,
                    item.len(),
                    MAX_PAYLOAD
                )));
            }
            if kind.sort == Sort::Eod {
                if !item.is_empty() {
                    return Err(DbxError::Wire(format!(
                        "end-of-data item at offset {} carries a payload",
                        offset
                    )));
                }
                if end != message.len() {
                    return Err(DbxError::Wire(format!(
                        "{} trailing bytes after end-of-data",
                        message.len() - end
                    )));
                }
                break;
            }
            args.push(Arg {
                kind,
                bytes: &message[start..end],
            });
            offset = end;
        }

        Ok(Envelope {
            command_code: head.kind,
            capacity,
            context_index,
            args,
        })
    }

    /// Command code from the head
    pub fn command_code(&self) -> u8 {
        self.command_code
    }

    /// Receive-buffer capacity the caller declared (0 = none declared)
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Client-side context index from envelope slot 2
    pub fn context_index(&self) -> u32 {
        self.context_index
    }

    /// All arguments in wire order
    pub fn args(&self) -> &[Arg<'a>] {
        &self.args
    }

    /// The global name, when the first argument carries sort GLOBAL
    pub fn global_name(&self) -> Option<&'a [u8]> {
        match self.args.first() {
            Some(arg) if arg.kind.sort == Sort::Global => Some(arg.bytes),
            _ => None,
        }
    }
}

fn read_size_item(message: &[u8], offset: usize, slot: usize) -> Result<u32> {
    let item = ItemHead::read(&message[offset..])
        .ok_or_else(|| DbxError::Wire(format!("envelope slot {} missing", slot)))?;
    let kind = Kind::from_u8(item.kind).ok_or_else(|| {
        DbxError::Wire(format!("envelope slot {} kind byte {} invalid", slot, item.kind))
    })?;
    if kind.sort != Sort::Data {
        return Err(DbxError::Wire(format!(
            "envelope slot {} must be a data-sort size item, found {}",
            slot, kind
        )));
    }
    Ok(item.len.get())
}

/// Iterator over the items of a multi-item reply payload
#[derive(Debug)]
pub struct ReplyReader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> ReplyReader<'a> {
    /// Read items from a reply payload (the bytes after the status header)
    pub fn new(payload: &'a [u8]) -> Self {
        ReplyReader {
            bytes: payload,
            offset: 0,
        }
    }

    /// Next item, or `None` past the end of the payload
    pub fn next_item(&mut self) -> Result<Option<Arg<'a>>> {
        if self.offset >= self.bytes.len() {
            return Ok(None);
        }
        let item = ItemHead::read(&self.bytes[self.offset..]).ok_or_else(|| {
            DbxError::Wire(format!("reply ends mid-item at offset {}", self.offset))
        })?;
        let kind = Kind::from_u8(item.kind).ok_or_else(|| {
            DbxError::Wire(format!(
                "undecodable reply kind byte {} at offset {}",
                item.kind, self.offset
            ))
        })?;
        let start = self.offset + ITEM_HEAD_LEN;
        let end = start + item.len();
        if end > self.bytes.len() {
            return Err(DbxError::Wire(format!(
                "reply item at offset {} overruns the payload",
                self.offset
            )));
        }
        self.offset = end;
        Ok(Some(Arg {
            kind,
            bytes: &self.bytes[start..end],
        }))
    }
}

/// Decoded reply of the order-with-data commands: the neighbour's value
/// followed by its subscript
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderDataReply {
    /// Value stored at the neighbouring node
    pub data: Vec<u8>,
    /// The neighbouring subscript ("" when traversal is exhausted)
    pub key: Vec<u8>,
}

impl OrderDataReply {
    /// Parse from a reply payload
    pub fn parse(payload: &[u8]) -> Result<Self> {
        let mut reader = ReplyReader::new(payload);
        let data = reader
            .next_item()?
            .ok_or_else(|| DbxError::Wire("order reply missing the data item".into()))?;
        let key = reader
            .next_item()?
            .ok_or_else(|| DbxError::Wire("order reply missing the key item".into()))?;
        Ok(OrderDataReply {
            data: data.bytes.to_vec(),
            key: key.bytes.to_vec(),
        })
    }
}

/// Decoded reply of the node-traversal commands
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeReply {
    /// Value at the node (empty for the non-data command forms)
    pub data: Vec<u8>,
    /// Full subscript path of the node
    pub key: Vec<Vec<u8>>,
    /// True when traversal is exhausted (bare end-of-data reply)
    pub done: bool,
}

impl NodeReply {
    /// Parse from a reply payload
    pub fn parse(payload: &[u8]) -> Result<Self> {
        let mut reader = ReplyReader::new(payload);
        let first = reader
            .next_item()?
            .ok_or_else(|| DbxError::Wire("node reply is empty".into()))?;
        if first.kind.sort == Sort::Eod {
            return Ok(NodeReply {
                data: Vec::new(),
                key: Vec::new(),
                done: true,
            });
        }
        let mut key = Vec::new();
        loop {
            let item = reader
                .next_item()?
                .ok_or_else(|| DbxError::Wire("node reply missing end-of-data".into()))?;
            if item.kind.sort == Sort::Eod {
                break;
            }
            key.push(item.bytes.to_vec());
        }
        Ok(NodeReply {
            data: first.bytes.to_vec(),
            key,
            done: false,
        })
    }
}
