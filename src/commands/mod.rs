//! Typed command surface.
//!
//! Each family adds methods to [`Client`](crate::Client). Methods take any
//! [`ToArg`](crate::ToArg) input, so text and binary keys produce identical
//! tokens, and decode through [`FromReply`](crate::FromReply) or a
//! command-specific shape from [`reply::decode`](crate::reply::decode).

mod acl;
mod bitmaps;
mod cluster;
mod connection;
mod geo;
mod hashes;
mod hyperloglog;
mod keys;
mod lists;
mod pubsub;
mod scripting;
mod server;
mod sets;
mod sorted_sets;
mod streams;
mod strings;
