//! Redis command execution core.
//!
//! Commands are encoded once into binary-safe [`CommandArgs`], checked
//! against the active topology, routed (by hash slot in cluster mode) and
//! their replies decoded into the type the caller asks for.

pub mod args;
pub mod blocking;
pub mod client;
pub mod command;
mod commands;
pub mod config;
pub mod connection;
pub mod crc16;
pub mod dispatch;
pub mod error;
pub mod reply;
pub mod resp;
pub mod router;
pub mod runtime;

pub use args::*;
pub use blocking::BlockingClient;
pub use client::{Client, Pipeline};
pub use command::{Command, CommandFlags, CommandInfo, Group};
pub use config::{ClientConfig, Topology};
pub use connection::{NodeRole, Transport};
pub use dispatch::{CallOptions, RetryPolicy};
pub use error::{Error, Result, ServerErrorKind};
pub use reply::{
    FromReply, GeoCoordinate, GeoSearchResult, PendingEntry, PendingSummary, ScanResult, Status,
    StreamEntry, StreamId, StreamReadReply, Tuple,
};
pub use resp::RawReply;
pub use router::Mode;
