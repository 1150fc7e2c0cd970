//! Redis Sentinel topology router.
//!
//! Resolves the current master via Sentinel, maintains a connection pool to it,
//! and re-resolves when the master becomes unreachable or turns read-only.

use crate::args::CommandArgs;
use crate::command::Command;
use crate::connection::{ConnectionPool, NodeRole, PoolConfig, Transport};
use crate::dispatch::{trace_state, CallOptions, CallState, Dispatcher};
use crate::error::{Error, Result, ServerErrorKind};
use crate::resp::RawReply;
use crate::router::{Mode, Router};

use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{info, warn};

/// Router for Redis Sentinel topology.
///
/// On a connection failure or `READONLY` reply the master is re-resolved
/// and the call retried, bounded by the dispatcher's retry policy.
pub struct SentinelRouter<T: Transport> {
    transport: Arc<T>,
    pool_config: PoolConfig,
    dispatcher: Dispatcher,
    master_pool: RwLock<Arc<ConnectionPool<T>>>,
    sentinels: Vec<String>,
    master_name: String,
}

impl<T: Transport> SentinelRouter<T> {
    /// Resolve the current master from the first sentinel that knows it.
    pub async fn new(
        sentinels: Vec<String>,
        master_name: impl Into<String>,
        transport: Arc<T>,
        pool_config: PoolConfig,
        dispatcher: Dispatcher,
    ) -> Result<Self> {
        if sentinels.is_empty() {
            return Err(Error::Topology("at least one sentinel is required".into()));
        }
        let master_name = master_name.into();
        let addr = resolve_master(&*transport, &sentinels, &master_name, &pool_config).await?;
        info!(master = %master_name, addr = %addr, "master resolved");

        Ok(Self {
            master_pool: RwLock::new(Arc::new(ConnectionPool::new(addr, transport.clone(), pool_config))),
            transport,
            pool_config,
            dispatcher,
            sentinels,
            master_name,
        })
    }

    pub fn master_addr(&self) -> String {
        self.current_pool().addr().to_string()
    }

    fn current_pool(&self) -> Arc<ConnectionPool<T>> {
        self.master_pool.read().clone()
    }

    /// Re-resolve the master and swap the pool if it moved.
    pub async fn failover(&self) -> Result<()> {
        let addr = resolve_master(&*self.transport, &self.sentinels, &self.master_name, &self.pool_config).await?;
        let current = self.current_pool();
        if current.addr() != addr {
            info!(master = %self.master_name, from = %current.addr(), to = %addr, "master changed");
            *self.master_pool.write() = Arc::new(ConnectionPool::new(addr, self.transport.clone(), self.pool_config));
        }
        Ok(())
    }

    /// Attempt loop with failover between attempts.
    async fn execute_with_failover(&self, args: &CommandArgs, opts: &CallOptions) -> Result<RawReply> {
        let policy = self.dispatcher.retry;
        let mut attempt = 1;

        loop {
            let pool = self.current_pool();
            let err = match self.dispatcher.round_trip(&pool, args, opts).await {
                Ok(RawReply::Error(msg)) if ServerErrorKind::parse(&msg) == ServerErrorKind::ReadOnly => {
                    Error::server(msg)
                }
                Ok(reply) => return Ok(reply),
                Err(e) => e,
            };

            let failover = matches!(err, Error::Connection(_) | Error::Redis { kind: ServerErrorKind::ReadOnly, .. });
            let retryable = failover || self.dispatcher.should_retry(&err, args, opts);
            if !retryable || attempt >= policy.max_attempts {
                trace_state(args, CallState::Failed);
                return Err(err);
            }

            let delay = policy.backoff(attempt);
            warn!(command = args.name(), attempt, ?delay, error = %err, "retrying against sentinel master");
            tokio::time::sleep(delay).await;
            if failover {
                if let Err(e) = self.failover().await {
                    warn!(error = %e, "master re-resolution failed");
                }
            }
            attempt += 1;
        }
    }
}

impl<T: Transport> Router for SentinelRouter<T> {
    fn mode(&self) -> Mode {
        Mode::Sentinel
    }

    async fn execute(&self, args: &CommandArgs, opts: &CallOptions) -> Result<RawReply> {
        let reply = self.execute_with_failover(args, opts).await?;
        trace_state(args, CallState::Replied);
        Ok(reply)
    }

    /// Batches go to the current master; only unsent batches are retried,
    /// after re-resolving.
    async fn pipeline(&self, batch: &[CommandArgs], opts: &CallOptions) -> Result<Vec<RawReply>> {
        self.dispatcher
            .retry_batch(|attempt| async move {
                if attempt > 1 {
                    if let Err(e) = self.failover().await {
                        warn!(error = %e, "master re-resolution failed");
                    }
                }
                let pool = self.current_pool();
                self.dispatcher.round_trip_batch(&pool, batch, opts).await
            })
            .await
    }

    fn pool_idle_count(&self) -> usize {
        self.current_pool().idle_count()
    }

    fn pool_available(&self) -> usize {
        self.current_pool().available()
    }
}

// ── Helpers ────────────────────────────────────────────────────────

/// Ask each sentinel in turn for the master address.
async fn resolve_master<T: Transport>(
    transport: &T,
    sentinels: &[String],
    master_name: &str,
    pool_config: &PoolConfig,
) -> Result<String> {
    let query = CommandArgs::with_sub(Command::Sentinel, "GET-MASTER-ADDR-BY-NAME")?.arg(master_name);
    let mut last_err = None;

    for addr in sentinels {
        let connect = transport.connect(addr, NodeRole::Sentinel);
        let mut conn = match tokio::time::timeout(pool_config.connect_timeout, connect).await {
            Ok(Ok(conn)) => conn,
            Ok(Err(e)) => {
                last_err = Some(e);
                continue;
            }
            Err(_) => {
                last_err = Some(Error::Topology(format!("sentinel {addr} connect timed out")));
                continue;
            }
        };

        let reply = transport.send(&mut conn, &query).await;
        transport.close(conn);
        match reply.and_then(|r| master_from_reply(r, master_name, addr)) {
            Ok(master) => return Ok(master),
            Err(e) => last_err = Some(e),
        }
    }

    Err(Error::Topology(match last_err {
        Some(e) => format!("no sentinel resolved master '{master_name}': {e}"),
        None => format!("no sentinel resolved master '{master_name}'"),
    }))
}

fn master_from_reply(reply: RawReply, master_name: &str, sentinel: &str) -> Result<String> {
    match reply {
        RawReply::Array(items) if items.len() >= 2 => {
            let host = items[0]
                .as_str()
                .ok_or_else(|| Error::Topology("invalid master host".into()))?;
            let port = items[1]
                .as_str()
                .map(str::to_string)
                .or_else(|| items[1].as_int().map(|p| p.to_string()))
                .ok_or_else(|| Error::Topology("invalid master port".into()))?;
            if host.contains(':') {
                Ok(format!("[{host}]:{port}"))
            } else {
                Ok(format!("{host}:{port}"))
            }
        }
        RawReply::Null => Err(Error::Topology(format!(
            "master '{master_name}' not known to sentinel at {sentinel}"
        ))),
        RawReply::Error(msg) => Err(Error::server(msg)),
        other => Err(Error::Topology(format!(
            "unexpected sentinel reply: {}",
            other.type_name()
        ))),
    }
}

// ── Tests ──────────────────────────────────────────────────────────
