//! Transport seam and connection pooling.
//!
//! The execution core never touches sockets directly. It talks to a
//! [`Transport`], which owns RESP framing and the connection handshake, and
//! keeps one [`ConnectionPool`] per node on top of it.

pub mod pool;
pub mod tcp;

pub use pool::{ConnectionPool, PoolConfig, PoolGuard};
pub use tcp::{RedisConnection, TcpTransport};

use crate::args::CommandArgs;
use crate::error::Result;
use crate::resp::RawReply;
use std::future::Future;

/// What a connection is opened for. Sentinels skip database selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRole {
    Data,
    Sentinel,
}

/// Wire-level collaborator: opens connections and exchanges one frame per
/// command.
///
/// `connect` failures must be reported as [`Error::Connection`] since no
/// request bytes have been written at that point; failures after a request
/// was written are [`Error::Transport`].
///
/// [`Error::Connection`]: crate::Error::Connection
/// [`Error::Transport`]: crate::Error::Transport
pub trait Transport: Send + Sync + 'static {
    type Connection: Send + 'static;

    /// Open and initialise a connection to `addr` (`host:port`).
    fn connect(
        &self,
        addr: &str,
        role: NodeRole,
    ) -> impl Future<Output = Result<Self::Connection>> + Send;

    /// Write one command and read its reply.
    ///
    /// Server error replies come back as `Ok(RawReply::Error(..))`.
    fn send(
        &self,
        conn: &mut Self::Connection,
        args: &CommandArgs,
    ) -> impl Future<Output = Result<RawReply>> + Send;

    /// Send a batch on one connection and collect replies in order.
    fn send_batch(
        &self,
        conn: &mut Self::Connection,
        batch: &[CommandArgs],
    ) -> impl Future<Output = Result<Vec<RawReply>>> + Send {
        async move {
            let mut replies = Vec::with_capacity(batch.len());
            for args in batch {
                replies.push(self.send(conn, args).await?);
            }
            Ok(replies)
        }
    }

    /// Dispose of a connection that will not be reused.
    fn close(&self, conn: Self::Connection) {
        drop(conn);
    }
}
