//! Request message packing
//!
//! `MessageWriter` builds the request envelope a caller hands to
//! [`command`](crate::boundary::Engine::command): placeholder head, the two
//! size items (declared buffer capacity, client context index), the packed
//! arguments and the closing end-of-data item. The head's length field is
//! patched last, when the message is finished with the command code.

use crate::wire::{DType, ItemHead, Kind, Sort, ITEM_HEAD_LEN};
use zerocopy::IntoBytes;

/// Builder for one request message
#[derive(Debug)]
pub struct MessageWriter {
    buf: Vec<u8>,
}

impl MessageWriter {
    /// Start a request declaring the caller's receive-buffer capacity and
    /// its context index
    ///
    /// Both ride as size items: the value lives in the length field and the
    /// item has no payload.
    pub fn request(capacity: u32, context_index: u32) -> Self {
        let mut writer = MessageWriter {
            buf: Vec::with_capacity(128),
        };
        // placeholder head, patched by finish()
        writer.buf.extend_from_slice(ItemHead::new(0, 0).as_bytes());
        writer.add_size(capacity, DType::Int);
        writer.add_size(context_index, DType::Int);
        writer
    }

    /// Append a size item (length field carries the value, no payload)
    pub fn add_size(&mut self, value: u32, dtype: DType) -> &mut Self {
        let kind = Kind {
            sort: Sort::Data,
            dtype,
        };
        self.buf
            .extend_from_slice(ItemHead::new(value, kind.to_u8()).as_bytes());
        self
    }

    /// Append an argument with an explicit sort and type
    pub fn add_arg(&mut self, payload: &[u8], sort: Sort, dtype: DType) -> &mut Self {
        let kind = Kind { sort, dtype };
        self.buf
            .extend_from_slice(ItemHead::new(payload.len() as u32, kind.to_u8()).as_bytes());
        self.buf.extend_from_slice(payload);
        self
    }

    /// Append a global name (sort GLOBAL, the first argument of a
    /// global-class command)
    pub fn add_global(&mut self, name: &[u8]) -> &mut Self {
        self.add_arg(name, Sort::Global, DType::Str)
    }

    /// Append a plain string argument
    pub fn add_data(&mut self, payload: &[u8]) -> &mut Self {
        self.add_arg(payload, Sort::Data, DType::Str)
    }

    /// Append an object reference argument (decimal payload, type OREF)
    pub fn add_oref(&mut self, oref: u32) -> &mut Self {
        let text = oref.to_string();
        self.add_arg(text.as_bytes(), Sort::Data, DType::Oref)
    }

    /// Close with the end-of-data item and patch the head
    ///
    /// The head's length field covers the entire message, itself included.
    pub fn finish(mut self, command_code: u8) -> Vec<u8> {
        self.add_arg(&[], Sort::Eod, DType::Str);
        let total = self.buf.len() as u32;
        let head = ItemHead::new(total, command_code);
        self.buf[..ITEM_HEAD_LEN].copy_from_slice(head.as_bytes());
        self.buf
    }
}
