//! DBXSTR wire block format
//!
//! This module defines the self-describing binary block format used to pass
//! typed, variable-length arguments and results across the shim boundary.
//! Every item on the wire carries its own length and a one-byte kind code,
//! so a reader never needs out-of-band framing.
//!
//! # Item Layout
//!
//! ```text
//! offset 0..4   u32 little-endian   payload length in bytes
//! offset 4      u8                  kind = sort * 20 + type
//! offset 5..    payload             `length` bytes, uninterpreted
//! ```
//!
//! # Request Envelope
//!
//! A complete request message is a sequence of items:
//!
//! ```text
//! head        total message length (u32 LE) + command code byte
//! size item   declared client buffer capacity (length field only, no payload)
//! size item   client-side context index       (length field only, no payload)
//! arguments   first argument of a global-class command has sort GLOBAL,
//!             the rest sort DATA; object calls insert a DATA/OREF item first
//! end         zero-length item with sort EOD
//! ```
//!
//! The head occupies the same five bytes as an item head, with the command
//! code where an item would carry its kind byte. Its length field is patched
//! last, after all items have been appended.
//!
//! # Output Block
//!
//! A reply is a 5-byte status header (payload length + kind), the payload,
//! and a single NUL terminator at index `len + 5`. Multi-item replies append
//! further items after the first payload and close with an EOD item; the
//! header's length field covers everything after the header.

use std::fmt;

use zerocopy::little_endian::U32;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

pub mod block;
pub mod reader;
pub mod writer;

pub use block::BlockBuf;
pub use reader::{Envelope, NodeReply, OrderDataReply, ReplyReader};
pub use writer::MessageWriter;

/// Size of an item head (and of the status header) in bytes
pub const ITEM_HEAD_LEN: usize = 5;

/// Offset of the command code byte within the request head
pub const CMND_OFFSET: usize = 4;

/// Default client buffer capacity when a caller does not declare one
pub const DEFAULT_BUFFER_SIZE: usize = 32768;

/// Largest payload a single block may carry (long-string ceiling)
pub const MAX_PAYLOAD: usize = 3_641_144;

/// Radix combining sort and type into the kind byte
const SORT_RADIX: u8 = 20;

/// Sort code: what role an item plays in a message
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sort {
    /// Unset/invalid
    Invalid = 0,
    /// Plain data argument or result payload
    Data = 1,
    /// Subscript within a key
    Subscript = 2,
    /// Global name (first argument of a global-class command)
    Global = 3,
    /// End-of-data marker closing an item sequence
    Eod = 9,
    /// Status report
    Status = 10,
    /// Error report; payload carries a human-readable message
    Error = 11,
}

impl Sort {
    /// Convert from raw wire value
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Sort::Invalid),
            1 => Some(Sort::Data),
            2 => Some(Sort::Subscript),
            3 => Some(Sort::Global),
            9 => Some(Sort::Eod),
            10 => Some(Sort::Status),
            11 => Some(Sort::Error),
            _ => None,
        }
    }
}

impl fmt::Display for Sort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Sort::Invalid => "invalid",
            Sort::Data => "data",
            Sort::Subscript => "subscript",
            Sort::Global => "global",
            Sort::Eod => "eod",
            Sort::Status => "status",
            Sort::Error => "error",
        };
        f.write_str(name)
    }
}

/// Type code: how an item's payload should be interpreted
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DType {
    /// No payload interpretation
    None = 0,
    /// String in the session charset
    Str = 1,
    /// 8-bit string
    Str8 = 2,
    /// 16-bit string
    Str16 = 3,
    /// Integer rendered as decimal text
    Int = 4,
    /// 64-bit integer rendered as decimal text
    Int64 = 5,
    /// Floating point rendered as decimal text
    Double = 6,
    /// Object reference (numeric handle to a server-side instance)
    Oref = 7,
    /// Explicit null
    Null = 10,
}

impl DType {
    /// Convert from raw wire value
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(DType::None),
            1 => Some(DType::Str),
            2 => Some(DType::Str8),
            3 => Some(DType::Str16),
            4 => Some(DType::Int),
            5 => Some(DType::Int64),
            6 => Some(DType::Double),
            7 => Some(DType::Oref),
            10 => Some(DType::Null),
            _ => None,
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DType::None => "none",
            DType::Str => "str",
            DType::Str8 => "str8",
            DType::Str16 => "str16",
            DType::Int => "int",
            DType::Int64 => "int64",
            DType::Double => "double",
            DType::Oref => "oref",
            DType::Null => "null",
        };
        f.write_str(name)
    }
}

/// Decoded kind byte: sort and type of one item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Kind {
    /// Role of the item in the message
    pub sort: Sort,
    /// Payload interpretation
    pub dtype: DType,
}

impl Kind {
    /// Kind for a plain string data item
    pub const DATA_STR: Kind = Kind {
        sort: Sort::Data,
        dtype: DType::Str,
    };

    /// Kind carried by an end-of-data item
    pub const EOD: Kind = Kind {
        sort: Sort::Eod,
        dtype: DType::Str,
    };

    /// Pack into the single wire byte
    #[inline]
    pub const fn to_u8(self) -> u8 {
        (self.sort as u8) * SORT_RADIX + (self.dtype as u8)
    }

    /// Decode from the wire byte; `None` when either half is out of range
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        let sort = match Sort::from_u8(value / SORT_RADIX) {
            Some(s) => s,
            None => return None,
        };
        let dtype = match DType::from_u8(value % SORT_RADIX) {
            Some(t) => t,
            None => return None,
        };
        Some(Kind { sort, dtype })
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.sort, self.dtype)
    }
}

/// Wire layout of an item head: length then kind, unaligned
///
/// The same five bytes head a request message, with the command code in
/// place of the kind byte.
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct ItemHead {
    /// Payload length in bytes (message length for a request head)
    pub len: U32,
    /// Kind byte (command code for a request head)
    pub kind: u8,
}

impl ItemHead {
    /// Build a head for an item of the given payload length and kind
    #[inline]
    pub fn new(len: u32, kind: u8) -> Self {
        ItemHead {
            len: U32::new(len),
            kind,
        }
    }

    /// Read a head from the start of `bytes`
    ///
    /// Returns `None` when fewer than five bytes are available.
    #[inline]
    pub fn read(bytes: &[u8]) -> Option<Self> {
        let head = bytes.get(..ITEM_HEAD_LEN)?;
        ItemHead::read_from_bytes(head).ok()
    }

    /// Payload length as usize
    #[inline]
    pub fn len(&self) -> usize {
        self.len.get() as usize
    }

    /// True when the payload length is zero
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len.get() == 0
    }
}

// Static assertion: the head must be exactly five wire bytes
const _: () = {
    assert!(std::mem::size_of::<ItemHead>() == ITEM_HEAD_LEN);
};
