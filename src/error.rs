//! Error taxonomy for the execution core.
//!
//! ```text
//!  Error
//!  ├── Argument        invalid builder state / out-of-range scalar (pre-flight)
//!  ├── Capability      command unsupported in the active topology (pre-flight)
//!  ├── CrossSlot       multi-key command spans hash slots (pre-flight, cluster)
//!  ├── Connection      could not establish a connection (nothing was written)
//!  ├── Transport       I/O failure after the request was written
//!  ├── Timeout         deadline elapsed while awaiting a reply
//!  ├── Topology        no slot owner / refresh failed / redirect budget spent
//!  ├── Decode          reply shape does not match the command's schema
//!  ├── Protocol        malformed RESP from the wire
//!  ├── NumericRange    overflow or narrowing failure
//!  └── Redis           server error reply, kind parsed from its prefix
//! ```

use crate::router::Mode;
use std::io;
use thiserror::Error;

/// Structured server error kinds for programmatic matching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerErrorKind {
    /// Generic ERR
    Err,
    /// WRONGTYPE Operation against a key holding the wrong kind of value
    WrongType,
    /// MOVED slot host:port
    Moved { slot: u16, addr: String },
    /// ASK slot host:port
    Ask { slot: u16, addr: String },
    /// CLUSTERDOWN
    ClusterDown,
    /// CROSSSLOT, reported by the server itself
    CrossSlot,
    /// LOADING Redis is loading the dataset in memory
    Loading,
    /// READONLY You can't write against a read only replica
    ReadOnly,
    /// NOSCRIPT No matching script
    NoScript,
    /// BUSY Redis is busy running a script
    Busy,
    /// TRYAGAIN
    TryAgain,
    /// NOAUTH / WRONGPASS / NOPERM
    Auth,
    /// Any other prefix
    Other(String),
}

impl ServerErrorKind {
    /// Classify a server error line such as `"WRONGTYPE Operation against…"`.
    pub fn parse(msg: &str) -> Self {
        let (prefix, rest) = msg.split_once(' ').unwrap_or((msg, ""));
        match prefix {
            "MOVED" | "ASK" => match parse_redirect_target(rest) {
                Some((slot, addr)) if prefix == "MOVED" => Self::Moved { slot, addr },
                Some((slot, addr)) => Self::Ask { slot, addr },
                None => Self::Other(prefix.to_string()),
            },
            "ERR" => Self::Err,
            "WRONGTYPE" => Self::WrongType,
            "CLUSTERDOWN" => Self::ClusterDown,
            "CROSSSLOT" => Self::CrossSlot,
            "LOADING" => Self::Loading,
            "READONLY" => Self::ReadOnly,
            "NOSCRIPT" => Self::NoScript,
            "BUSY" => Self::Busy,
            "TRYAGAIN" => Self::TryAgain,
            "NOAUTH" | "WRONGPASS" | "NOPERM" => Self::Auth,
            "" => Self::Other("UNKNOWN".to_string()),
            other => Self::Other(other.to_string()),
        }
    }
}

/// `"3999 127.0.0.1:6381"` → `(3999, "127.0.0.1:6381")`
fn parse_redirect_target(rest: &str) -> Option<(u16, String)> {
    let (slot, addr) = rest.split_once(' ')?;
    let slot = slot.parse::<u16>().ok()?;
    if addr.is_empty() {
        return None;
    }
    Some((slot, addr.trim().to_string()))
}

/// All failures surfaced by the crate.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid argument: {0}")]
    Argument(String),

    #[error("{command} is not supported in {mode} mode")]
    Capability { command: String, mode: Mode },

    #[error("CROSSSLOT keys in {command} hash to different slots ({first} != {second})")]
    CrossSlot {
        command: &'static str,
        first: u16,
        second: u16,
    },

    #[error("connection error: {0}")]
    Connection(io::Error),

    #[error("transport error: {0}")]
    Transport(#[from] io::Error),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("topology error: {0}")]
    Topology(String),

    #[error("decode error: {0}")]
    Decode(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    /// RESP parser needs more bytes. Control flow inside the transport only.
    #[error("incomplete RESP frame")]
    Incomplete,

    #[error("numeric range error: {0}")]
    NumericRange(String),

    #[error("redis error: {message}")]
    Redis {
        kind: ServerErrorKind,
        message: String,
    },
}

impl Error {
    /// Build the error for a server error reply.
    ///
    /// Overflow and range failures reported by the server become
    /// [`Error::NumericRange`] so they cannot be mistaken for a wrapped value.
    pub fn server(msg: impl Into<String>) -> Self {
        let message = msg.into();
        let kind = ServerErrorKind::parse(&message);
        if kind == ServerErrorKind::Err && is_range_message(&message) {
            return Self::NumericRange(message);
        }
        Self::Redis { kind, message }
    }

    pub(crate) fn decode(expected: &str, got: &crate::resp::RawReply) -> Self {
        Self::Decode(format!("expected {expected}, got {}", got.type_name()))
    }

    /// Transport-level failure of any phase.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Connection(_) | Self::Transport(_) | Self::Timeout(_)
        )
    }

    /// The failure happened before any byte of the request reached the wire.
    pub fn is_unsent(&self) -> bool {
        matches!(self, Self::Connection(_))
    }

    /// Rejected locally without any network round trip.
    pub fn is_preflight(&self) -> bool {
        matches!(
            self,
            Self::Argument(_) | Self::Capability { .. } | Self::CrossSlot { .. }
        )
    }

    pub fn server_kind(&self) -> Option<&ServerErrorKind> {
        match self {
            Self::Redis { kind, .. } => Some(kind),
            _ => None,
        }
    }
}

fn is_range_message(msg: &str) -> bool {
    msg.contains("would overflow") || msg.contains("out of range")
}

pub type Result<T> = std::result::Result<T, Error>;
