//! Standalone topology router.
//!
//! Routes all commands to a single Redis server through a connection pool.

use crate::args::CommandArgs;
use crate::connection::{ConnectionPool, PoolConfig, Transport};
use crate::dispatch::{CallOptions, CallState, Dispatcher};
use crate::error::Result;
use crate::resp::RawReply;
use crate::router::{Mode, Router};
use std::sync::Arc;

/// Router for standalone (single-server) Redis topology.
pub struct StandaloneRouter<T: Transport> {
    pool: ConnectionPool<T>,
    dispatcher: Dispatcher,
}

impl<T: Transport> StandaloneRouter<T> {
    pub fn new(addr: impl Into<String>, transport: Arc<T>, pool: PoolConfig, dispatcher: Dispatcher) -> Self {
        Self {
            pool: ConnectionPool::new(addr, transport, pool),
            dispatcher,
        }
    }

    pub fn addr(&self) -> &str {
        self.pool.addr()
    }
}

impl<T: Transport> Router for StandaloneRouter<T> {
    fn mode(&self) -> Mode {
        Mode::Standalone
    }

    async fn execute(&self, args: &CommandArgs, opts: &CallOptions) -> Result<RawReply> {
        let reply = self
            .dispatcher
            .retry(args, opts, |_| self.dispatcher.round_trip(&self.pool, args, opts))
            .await?;
        crate::dispatch::trace_state(args, CallState::Replied);
        Ok(reply)
    }

    async fn pipeline(&self, batch: &[CommandArgs], opts: &CallOptions) -> Result<Vec<RawReply>> {
        self.dispatcher
            .retry_batch(|_| self.dispatcher.round_trip_batch(&self.pool, batch, opts))
            .await
    }

    fn pool_idle_count(&self) -> usize {
        self.pool.idle_count()
    }

    fn pool_available(&self) -> usize {
        self.pool.available()
    }
}

// ── Tests ──────────────────────────────────────────────────────────
