//! Command codes
//!
//! Every request head carries one integer command code. The codes are fixed
//! by the wire protocol and grouped the way the dispatcher treats them.
//! Unknown codes are not an error: they decode to `None` and the dispatcher
//! answers with the defined minimal empty reply.

use std::fmt;

/// One dispatchable operation
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Open a session against the backend
    Open = 1,
    /// Close a session, releasing its locks, transactions and objects
    Close = 2,
    /// Read the session namespace
    NsGet = 3,
    /// Replace the session namespace
    NsSet = 4,
    /// Set a global node to a value
    GSet = 11,
    /// Read a global node ("" when undefined)
    GGet = 12,
    /// Next sibling subscript at the addressed level
    GNext = 13,
    /// Previous sibling subscript at the addressed level
    GPrevious = 14,
    /// Delete a node and its whole subtree
    GDelete = 15,
    /// Existence/kind probe: "0", "1", "10" or "11"
    GDefined = 16,
    /// Numeric increment; replies the stored result
    GIncrement = 17,
    /// Acquire an advisory lock (last argument = timeout seconds)
    GLock = 18,
    /// Release one nesting level of an advisory lock
    GUnlock = 19,
    /// Copy a source subtree over a target node
    GMerge = 20,
    /// Depth-first next node; reply carries the full subscript path
    GNextNode = 21,
    /// Depth-first previous node
    GPreviousNode = 22,
    /// Call a registered function
    Function = 31,
    /// Call a class method (constructors reply an object reference)
    ClassMethod = 41,
    /// Read an instance property
    GetProperty = 42,
    /// Write an instance property
    SetProperty = 43,
    /// Call an instance method
    Method = 44,
    /// Release an object reference
    CloseInstance = 45,
    /// Next global name in the directory
    GNameNext = 51,
    /// Previous global name in the directory
    GNamePrevious = 52,
    /// Push one transaction nesting level
    TStart = 61,
    /// Report the transaction nesting depth
    TLevel = 62,
    /// Publish the innermost level and pop it
    TCommit = 63,
    /// Discard the innermost level and pop it
    TRollback = 64,
    /// Set the session's default timeout in seconds
    Timeout = 101,
    /// Select the session charset
    Charset = 102,
    /// Set the engine's diagnostic level
    LogLevel = 103,
    /// Emit a message through the engine's log
    LogMessage = 104,
    /// Next sibling plus its value in one reply
    GNextData = 131,
    /// Previous sibling plus its value in one reply
    GPreviousData = 141,
    /// Depth-first next node including its value
    GNextNodeData = 211,
    /// Depth-first previous node including its value
    GPreviousNodeData = 221,
}

/// Dispatch groups, mirroring how the operations behave
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandGroup {
    /// Session open/close
    Connection,
    /// Namespace get/set
    Namespace,
    /// Global key-value operations and traversal
    Global,
    /// Advisory locks
    Locking,
    /// Transaction nesting
    Transaction,
    /// Function and object calls
    Call,
    /// Timeout, charset and logging controls
    Utility,
}

impl Command {
    /// All commands, in wire-code order
    pub const ALL: [Command; 36] = [
        Command::Open,
        Command::Close,
        Command::NsGet,
        Command::NsSet,
        Command::GSet,
        Command::GGet,
        Command::GNext,
        Command::GPrevious,
        Command::GDelete,
        Command::GDefined,
        Command::GIncrement,
        Command::GLock,
        Command::GUnlock,
        Command::GMerge,
        Command::GNextNode,
        Command::GPreviousNode,
        Command::Function,
        Command::ClassMethod,
        Command::GetProperty,
        Command::SetProperty,
        Command::Method,
        Command::CloseInstance,
        Command::GNameNext,
        Command::GNamePrevious,
        Command::TStart,
        Command::TLevel,
        Command::TCommit,
        Command::TRollback,
        Command::Timeout,
        Command::Charset,
        Command::LogLevel,
        Command::LogMessage,
        Command::GNextData,
        Command::GPreviousData,
        Command::GNextNodeData,
        Command::GPreviousNodeData,
    ];

    /// Decode a wire code; `None` for anything unassigned
    pub const fn from_code(code: u8) -> Option<Command> {
        match code {
            1 => Some(Command::Open),
            2 => Some(Command::Close),
            3 => Some(Command::NsGet),
            4 => Some(Command::NsSet),
            11 => Some(Command::GSet),
            12 => Some(Command::GGet),
            13 => Some(Command::GNext),
            14 => Some(Command::GPrevious),
            15 => Some(Command::GDelete),
            16 => Some(Command::GDefined),
            17 => Some(Command::GIncrement),
            18 => Some(Command::GLock),
            19 => Some(Command::GUnlock),
            20 => Some(Command::GMerge),
            21 => Some(Command::GNextNode),
            22 => Some(Command::GPreviousNode),
            31 => Some(Command::Function),
            41 => Some(Command::ClassMethod),
            42 => Some(Command::GetProperty),
            43 => Some(Command::SetProperty),
            44 => Some(Command::Method),
            45 => Some(Command::CloseInstance),
            51 => Some(Command::GNameNext),
            52 => Some(Command::GNamePrevious),
            61 => Some(Command::TStart),
            62 => Some(Command::TLevel),
            63 => Some(Command::TCommit),
            64 => Some(Command::TRollback),
            101 => Some(Command::Timeout),
            102 => Some(Command::Charset),
            103 => Some(Command::LogLevel),
            104 => Some(Command::LogMessage),
            131 => Some(Command::GNextData),
            141 => Some(Command::GPreviousData),
            211 => Some(Command::GNextNodeData),
            221 => Some(Command::GPreviousNodeData),
            _ => None,
        }
    }

    /// The wire code
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Protocol-level name, for logs and error text
    pub const fn name(self) -> &'static str {
        match self {
            Command::Open => "open",
            Command::Close => "close",
            Command::NsGet => "nsget",
            Command::NsSet => "nsset",
            Command::GSet => "gset",
            Command::GGet => "gget",
            Command::GNext => "gnext",
            Command::GPrevious => "gprevious",
            Command::GDelete => "gdelete",
            Command::GDefined => "gdefined",
            Command::GIncrement => "gincrement",
            Command::GLock => "glock",
            Command::GUnlock => "gunlock",
            Command::GMerge => "gmerge",
            Command::GNextNode => "gnextnode",
            Command::GPreviousNode => "gpreviousnode",
            Command::Function => "function",
            Command::ClassMethod => "classmethod",
            Command::GetProperty => "getproperty",
            Command::SetProperty => "setproperty",
            Command::Method => "method",
            Command::CloseInstance => "closeinstance",
            Command::GNameNext => "gnamenext",
            Command::GNamePrevious => "gnameprevious",
            Command::TStart => "tstart",
            Command::TLevel => "tlevel",
            Command::TCommit => "tcommit",
            Command::TRollback => "trollback",
            Command::Timeout => "timeout",
            Command::Charset => "charset",
            Command::LogLevel => "loglevel",
            Command::LogMessage => "logmessage",
            Command::GNextData => "gnextdata",
            Command::GPreviousData => "gpreviousdata",
            Command::GNextNodeData => "gnextnodedata",
            Command::GPreviousNodeData => "gpreviousnodedata",
        }
    }

    /// Dispatch group
    pub const fn group(self) -> CommandGroup {
        match self {
            Command::Open | Command::Close => CommandGroup::Connection,
            Command::NsGet | Command::NsSet => CommandGroup::Namespace,
            Command::GSet
            | Command::GGet
            | Command::GNext
            | Command::GPrevious
            | Command::GDelete
            | Command::GDefined
            | Command::GIncrement
            | Command::GMerge
            | Command::GNextNode
            | Command::GPreviousNode
            | Command::GNameNext
            | Command::GNamePrevious
            | Command::GNextData
            | Command::GPreviousData
            | Command::GNextNodeData
            | Command::GPreviousNodeData => CommandGroup::Global,
            Command::GLock | Command::GUnlock => CommandGroup::Locking,
            Command::TStart | Command::TLevel | Command::TCommit | Command::TRollback => {
                CommandGroup::Transaction
            }
            Command::Function
            | Command::ClassMethod
            | Command::GetProperty
            | Command::SetProperty
            | Command::Method
            | Command::CloseInstance => CommandGroup::Call,
            Command::Timeout | Command::Charset | Command::LogLevel | Command::LogMessage => {
                CommandGroup::Utility
            }
        }
    }

    /// Whether the session must be connected before this command runs
    ///
    /// `Open` starts a connection; `Close` and `TLevel` are harmless in any
    /// state; the logging controls are pure diagnostics.
    pub const fn requires_connection(self) -> bool {
        !matches!(
            self,
            Command::Open
                | Command::Close
                | Command::TLevel
                | Command::LogLevel
                | Command::LogMessage
        )
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.code())
    }
}
