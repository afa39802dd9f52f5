//! Sessions and the session registry
//!
//! Every request addresses its session by a numeric handle, and the handle
//! keys an explicit [`Session`] with a checked state machine. Wire callers
//! bring their own handles (a single-connection client just sends 0), so
//! the registry creates sessions on first use;
//! [`SessionRegistry::allocate`] additionally issues fresh handles for Rust
//! embedders and never hands out 0.

use crate::error::{DbxError, Result};
use crate::wire::reader::Arg;
use memchr::memchr;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Numeric session handle
pub type Handle = u32;

/// Default per-session operation timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u32 = 60;

/// Connection lifecycle of one session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No backend connection
    Disconnected,
    /// Connected, no transaction open
    Connected,
    /// Connected with this many open transaction levels (always >= 1)
    InTransaction(u32),
}

impl SessionState {
    /// True in `Connected` and `InTransaction`
    pub fn is_connected(self) -> bool {
        !matches!(self, SessionState::Disconnected)
    }

    /// Transaction nesting depth (0 outside a transaction)
    pub fn tx_depth(self) -> u32 {
        match self {
            SessionState::InTransaction(depth) => depth,
            _ => 0,
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Disconnected => write!(f, "disconnected"),
            SessionState::Connected => write!(f, "connected"),
            SessionState::InTransaction(depth) => write!(f, "in-transaction({})", depth),
        }
    }
}

/// Session charset selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CharsetChoice {
    /// UTF-8 (the default)
    #[default]
    Utf8,
    /// 7-bit ASCII
    Ascii,
    /// Latin-1
    Latin1,
}

impl CharsetChoice {
    /// Parse a caller-supplied name, case-insensitively
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "utf-8" | "utf8" => Some(CharsetChoice::Utf8),
            "ascii" => Some(CharsetChoice::Ascii),
            "latin-1" | "latin1" | "iso-8859-1" => Some(CharsetChoice::Latin1),
            _ => None,
        }
    }

    /// Canonical lowercase name
    pub fn name(self) -> &'static str {
        match self {
            CharsetChoice::Utf8 => "utf-8",
            CharsetChoice::Ascii => "ascii",
            CharsetChoice::Latin1 => "latin-1",
        }
    }
}

/// Connection profile, the fourteen positional items of `open`
///
/// Also round-trips as JSON so embedders can load it from configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenProfile {
    /// Backend type tag ("IRIS", "Cache", "YottaDB", ...)
    #[serde(rename = "type")]
    pub db_type: String,
    /// Installation path for API-mode connections
    pub path: String,
    /// Host for network-mode connections
    pub host: String,
    /// TCP port for network-mode connections
    pub tcp_port: u32,
    /// Username
    pub username: String,
    /// Password
    pub password: String,
    /// Initial namespace
    pub namespace: String,
    /// Debug flag, uninterpreted here
    pub debug: String,
    /// Environment block: NAME=value lines, blank line terminated
    pub env_vars: String,
    /// Server profile name
    pub server: String,
    /// Server software tag
    pub server_software: String,
    /// Operation timeout in seconds
    pub timeout: u32,
}

impl Default for OpenProfile {
    fn default() -> Self {
        OpenProfile {
            db_type: String::new(),
            path: String::new(),
            host: String::new(),
            tcp_port: 0,
            username: String::new(),
            password: String::new(),
            namespace: String::new(),
            debug: String::new(),
            env_vars: String::new(),
            server: String::new(),
            server_software: String::new(),
            timeout: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl OpenProfile {
    /// Number of positional wire items (including the two reserved slots)
    pub const WIRE_FIELDS: usize = 14;

    /// Build from the positional items of an `open` request
    ///
    /// Trailing items may be omitted; anything beyond the fourteen defined
    /// slots is rejected.
    pub fn from_args(args: &[Arg<'_>]) -> Result<Self> {
        if args.len() > Self::WIRE_FIELDS {
            return Err(DbxError::Config(format!(
                "open expects at most {} items, received {}",
                Self::WIRE_FIELDS,
                args.len()
            )));
        }
        let mut profile = OpenProfile::default();
        let text = |i: usize| -> String {
            args.get(i)
                .map(|a| String::from_utf8_lossy(a.bytes).into_owned())
                .unwrap_or_default()
        };
        profile.db_type = text(0);
        profile.path = text(1);
        profile.host = text(2);
        if let Some(arg) = args.get(3) {
            profile.tcp_port = parse_number_field("tcp_port", arg.bytes)?;
        }
        profile.username = text(4);
        profile.password = text(5);
        profile.namespace = text(6);
        // slots 7 and 8 are reserved
        profile.debug = text(9);
        profile.env_vars = text(10);
        profile.server = text(11);
        profile.server_software = text(12);
        if let Some(arg) = args.get(13) {
            profile.timeout = parse_number_field("timeout", arg.bytes)?;
        }
        Ok(profile)
    }

    /// The fourteen positional payloads, for packing an `open` request
    pub fn to_args(&self) -> Vec<Vec<u8>> {
        vec![
            self.db_type.clone().into_bytes(),
            self.path.clone().into_bytes(),
            self.host.clone().into_bytes(),
            self.tcp_port.to_string().into_bytes(),
            self.username.clone().into_bytes(),
            self.password.clone().into_bytes(),
            self.namespace.clone().into_bytes(),
            Vec::new(),
            Vec::new(),
            self.debug.clone().into_bytes(),
            self.env_vars.clone().into_bytes(),
            self.server.clone().into_bytes(),
            self.server_software.clone().into_bytes(),
            self.timeout.to_string().into_bytes(),
        ]
    }

    /// Parse from the JSON form
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize to the JSON form
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode the env block into NAME=value pairs
    ///
    /// Lines are newline-separated; a blank line ends the block.
    pub fn env_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        let mut rest = self.env_vars.as_bytes();
        while !rest.is_empty() {
            let line_end = memchr(b'\n', rest).unwrap_or(rest.len());
            let line = &rest[..line_end];
            if line.is_empty() {
                break;
            }
            if let Some(eq) = memchr(b'=', line) {
                pairs.push((
                    String::from_utf8_lossy(&line[..eq]).into_owned(),
                    String::from_utf8_lossy(&line[eq + 1..]).into_owned(),
                ));
            }
            if line_end == rest.len() {
                break;
            }
            rest = &rest[line_end + 1..];
        }
        pairs
    }
}

fn parse_number_field(field: &str, bytes: &[u8]) -> Result<u32> {
    if bytes.is_empty() {
        return Ok(0);
    }
    std::str::from_utf8(bytes)
        .ok()
        .and_then(|s| s.trim().parse::<u32>().ok())
        .ok_or_else(|| {
            DbxError::Config(format!(
                "{} must be a decimal number, received {:?}",
                field,
                String::from_utf8_lossy(bytes)
            ))
        })
}

/// One logical connection/transaction cursor
#[derive(Debug)]
pub struct Session {
    handle: Handle,
    state: SessionState,
    namespace: String,
    timeout: Duration,
    charset: CharsetChoice,
    profile: Option<OpenProfile>,
}

impl Session {
    /// New disconnected session
    pub fn new(handle: Handle) -> Self {
        Session {
            handle,
            state: SessionState::Disconnected,
            namespace: String::new(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS as u64),
            charset: CharsetChoice::default(),
            profile: None,
        }
    }

    /// The registry handle
    pub fn handle(&self) -> Handle {
        self.handle
    }

    /// Current lifecycle state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Current namespace
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Replace the namespace
    pub fn set_namespace(&mut self, namespace: &str) {
        self.namespace = namespace.to_string();
    }

    /// Session default timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Replace the default timeout
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    /// Session charset
    pub fn charset(&self) -> CharsetChoice {
        self.charset
    }

    /// Replace the charset
    pub fn set_charset(&mut self, charset: CharsetChoice) {
        self.charset = charset;
    }

    /// Profile supplied at `open`, when connected
    pub fn profile(&self) -> Option<&OpenProfile> {
        self.profile.as_ref()
    }

    /// Transition Disconnected -> Connected, installing the profile
    pub fn connect(&mut self, profile: OpenProfile) -> Result<()> {
        if self.state.is_connected() {
            return Err(DbxError::Session(format!(
                "session {} is already connected",
                self.handle
            )));
        }
        self.namespace = profile.namespace.clone();
        self.timeout = Duration::from_secs(profile.timeout as u64);
        self.state = SessionState::Connected;
        self.profile = Some(profile);
        Ok(())
    }

    /// Transition to Disconnected from any state
    ///
    /// Resource cleanup (locks, journals, objects) is the driver's side of
    /// close and happens before this is called.
    pub fn disconnect(&mut self) {
        self.state = SessionState::Disconnected;
        self.profile = None;
    }

    /// Push one transaction level; returns the new depth
    pub fn begin_transaction(&mut self) -> Result<u32> {
        match self.state {
            SessionState::Connected => {
                self.state = SessionState::InTransaction(1);
                Ok(1)
            }
            SessionState::InTransaction(depth) => {
                self.state = SessionState::InTransaction(depth + 1);
                Ok(depth + 1)
            }
            SessionState::Disconnected => Err(DbxError::Session(format!(
                "session {} is not connected",
                self.handle
            ))),
        }
    }

    /// Pop one transaction level; returns the new depth
    ///
    /// Shared by commit and rollback; both require depth >= 1.
    pub fn end_transaction_level(&mut self) -> Result<u32> {
        match self.state {
            SessionState::InTransaction(1) => {
                self.state = SessionState::Connected;
                Ok(0)
            }
            SessionState::InTransaction(depth) => {
                self.state = SessionState::InTransaction(depth - 1);
                Ok(depth - 1)
            }
            _ => Err(DbxError::Transaction(format!(
                "session {} has no open transaction",
                self.handle
            ))),
        }
    }
}

/// Owner of all sessions, keyed by handle
///
/// Sessions hand out as `Arc<Mutex<Session>>` so dispatch holds only the
/// one session it is serving; a blocked lock wait on one handle never
/// stalls commands on another.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: FxHashMap<Handle, Arc<Mutex<Session>>>,
    next_handle: Handle,
}

impl SessionRegistry {
    /// Empty registry
    pub fn new() -> Self {
        SessionRegistry {
            sessions: FxHashMap::default(),
            next_handle: 1,
        }
    }

    /// Issue a fresh handle with a new disconnected session
    ///
    /// Never issues 0, which stays available as the conventional default
    /// handle of wire callers.
    pub fn allocate(&mut self) -> Handle {
        let mut handle = self.next_handle.max(1);
        while self.sessions.contains_key(&handle) || handle == 0 {
            handle = handle.wrapping_add(1).max(1);
        }
        self.next_handle = handle.wrapping_add(1);
        self.sessions
            .insert(handle, Arc::new(Mutex::new(Session::new(handle))));
        handle
    }

    /// Fetch a session, creating it on first use
    pub fn ensure(&mut self, handle: Handle) -> Arc<Mutex<Session>> {
        Arc::clone(
            self.sessions
                .entry(handle)
                .or_insert_with(|| Arc::new(Mutex::new(Session::new(handle)))),
        )
    }

    /// Fetch an existing session
    pub fn get(&self, handle: Handle) -> Option<Arc<Mutex<Session>>> {
        self.sessions.get(&handle).map(Arc::clone)
    }

    /// Drop a session entirely
    pub fn remove(&mut self, handle: Handle) -> Option<Arc<Mutex<Session>>> {
        self.sessions.remove(&handle)
    }

    /// Number of live sessions
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// True when no session exists
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
