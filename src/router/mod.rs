pub mod cluster;
pub mod sentinel;
pub mod standalone;

pub use cluster::{ClusterRouter, SlotMap};
pub use sentinel::SentinelRouter;
pub use standalone::StandaloneRouter;

use crate::args::CommandArgs;
use crate::dispatch::CallOptions;
use crate::error::Result;
use crate::resp::RawReply;
use std::fmt;
use std::future::Future;

/// Deployment topology of a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    Standalone,
    Sentinel,
    Cluster,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Standalone => "standalone",
            Self::Sentinel => "sentinel",
            Self::Cluster => "cluster",
        })
    }
}

/// Common interface for all Redis topology routers.
///
/// Implementations take already gated [`CommandArgs`] and handle the details
/// of single-server, cluster, or sentinel-managed deployments behind a
/// uniform API.
pub trait Router: Send + Sync {
    fn mode(&self) -> Mode;

    /// Execute one command and return its raw reply.
    fn execute(
        &self,
        args: &CommandArgs,
        opts: &CallOptions,
    ) -> impl Future<Output = Result<RawReply>> + Send;

    /// Execute a batch on one connection, replies in order.
    fn pipeline(
        &self,
        batch: &[CommandArgs],
        opts: &CallOptions,
    ) -> impl Future<Output = Result<Vec<RawReply>>> + Send;

    /// Number of idle connections across pools.
    fn pool_idle_count(&self) -> usize;

    /// Number of available connection slots across pools.
    fn pool_available(&self) -> usize;
}
