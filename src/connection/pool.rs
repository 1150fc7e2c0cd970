//! Async connection pool, one per node.
//!
//! A semaphore bounds the number of checked-out connections and a deque holds
//! idle ones for reuse. The idle queue uses `parking_lot::Mutex` (sync, held
//! very briefly) so connections can be returned in `Drop` without async.

use crate::connection::{NodeRole, Transport};
use crate::error::{Error, Result};

use parking_lot::Mutex as SyncMutex;
use std::collections::VecDeque;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Semaphore, SemaphorePermit};
use tokio::time::Instant;
use tracing::{debug, trace};

/// Sizing and timeouts shared by every pool of a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    /// Maximum checked-out connections per node.
    pub max_size: usize,
    /// Idle connections older than this are dropped instead of reused.
    pub idle_timeout: Duration,
    /// Deadline for `Transport::connect`, handshake included.
    pub connect_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_size: 8,
            idle_timeout: Duration::from_secs(300),
            connect_timeout: Duration::from_secs(5),
        }
    }
}

struct Idle<C> {
    conn: C,
    since: Instant,
}

/// Pool of connections to a single node.
pub struct ConnectionPool<T: Transport> {
    addr: String,
    transport: Arc<T>,
    idle: SyncMutex<VecDeque<Idle<T::Connection>>>,
    semaphore: Semaphore,
    config: PoolConfig,
}

impl<T: Transport> ConnectionPool<T> {
    pub fn new(addr: impl Into<String>, transport: Arc<T>, config: PoolConfig) -> Self {
        Self {
            addr: addr.into(),
            transport,
            idle: SyncMutex::new(VecDeque::with_capacity(config.max_size)),
            semaphore: Semaphore::new(config.max_size),
            config,
        }
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Check out a connection, opening a new one when none is idle.
    ///
    /// The returned [`PoolGuard`] gives the connection back on drop.
    pub async fn get(&self) -> Result<PoolGuard<'_, T>> {
        let permit = self.semaphore.acquire().await.map_err(|_| {
            Error::Connection(io::Error::new(io::ErrorKind::Other, "pool semaphore closed"))
        })?;

        let reused = {
            let mut idle = self.idle.lock();
            self.take_healthy(&mut idle)
        };

        let conn = match reused {
            Some(conn) => conn,
            None => self.open().await?,
        };

        Ok(PoolGuard {
            conn: Some(conn),
            pool: self,
            _permit: permit,
        })
    }

    /// Give back a connection that was detached for a blocking call.
    pub fn reattach(&self, conn: T::Connection) {
        self.return_connection(conn);
    }

    pub fn idle_count(&self) -> usize {
        self.idle.lock().len()
    }

    pub fn max_size(&self) -> usize {
        self.config.max_size
    }

    /// Free checkout slots (roughly `max_size` minus checked out).
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    async fn open(&self) -> Result<T::Connection> {
        let timeout = self.config.connect_timeout;
        match tokio::time::timeout(timeout, self.transport.connect(&self.addr, NodeRole::Data)).await {
            Ok(Ok(conn)) => {
                debug!(addr = %self.addr, "opened connection");
                Ok(conn)
            }
            Ok(Err(e)) => Err(e),
            Err(_) => Err(Error::Connection(io::Error::new(
                io::ErrorKind::TimedOut,
                format!("connect to {} timed out after {timeout:?}", self.addr),
            ))),
        }
    }

    /// LIFO so the most recently used connection is reused first.
    fn take_healthy(&self, idle: &mut VecDeque<Idle<T::Connection>>) -> Option<T::Connection> {
        while let Some(entry) = idle.pop_back() {
            if entry.since.elapsed() > self.config.idle_timeout {
                trace!(addr = %self.addr, "dropping stale idle connection");
                self.transport.close(entry.conn);
                continue;
            }
            return Some(entry.conn);
        }
        None
    }

    fn return_connection(&self, conn: T::Connection) {
        let mut idle = self.idle.lock();
        if idle.len() < self.config.max_size {
            idle.push_back(Idle {
                conn,
                since: Instant::now(),
            });
        } else {
            drop(idle);
            self.transport.close(conn);
        }
    }
}

/// RAII guard that returns the connection to the pool on drop.
pub struct PoolGuard<'a, T: Transport> {
    conn: Option<T::Connection>,
    pool: &'a ConnectionPool<T>,
    _permit: SemaphorePermit<'a>,
}

impl<'a, T: Transport> PoolGuard<'a, T> {
    pub fn conn(&mut self) -> Result<&mut T::Connection> {
        self.conn.as_mut().ok_or_else(released)
    }

    /// Drop the connection instead of returning it (broken or timed out).
    pub fn discard(mut self) {
        if let Some(conn) = self.conn.take() {
            debug!(addr = %self.pool.addr, "discarding connection");
            self.pool.transport.close(conn);
        }
    }

    /// Take the connection out of the pool's accounting. The checkout slot
    /// is released immediately; hand the connection back with
    /// [`ConnectionPool::reattach`].
    pub fn detach(mut self) -> Result<T::Connection> {
        self.conn.take().ok_or_else(released)
    }
}

fn released() -> Error {
    Error::Connection(io::Error::new(io::ErrorKind::NotConnected, "connection already released"))
}

impl<T: Transport> Drop for PoolGuard<'_, T> {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            self.pool.return_connection(conn);
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::CommandArgs;
    use crate::resp::RawReply;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Hands out numbered connections; `fail` makes every connect fail.
    #[derive(Default)]
    struct Counting {
        opened: AtomicUsize,
        closed: AtomicUsize,
        fail: bool,
    }

    impl Transport for Counting {
        type Connection = usize;

        async fn connect(&self, _addr: &str, _role: NodeRole) -> Result<usize> {
            if self.fail {
                return Err(Error::Connection(io::Error::new(io::ErrorKind::ConnectionRefused, "refused")));
            }
            Ok(self.opened.fetch_add(1, Ordering::SeqCst))
        }

        async fn send(&self, _conn: &mut usize, _args: &CommandArgs) -> Result<RawReply> {
            Ok(RawReply::SimpleString("OK".into()))
        }

        fn close(&self, _conn: usize) {
            self.closed.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn pool(transport: Counting, max_size: usize) -> ConnectionPool<Counting> {
        ConnectionPool::new(
            "node:6379",
            Arc::new(transport),
            PoolConfig {
                max_size,
                idle_timeout: Duration::from_secs(60),
                connect_timeout: Duration::from_secs(1),
            },
        )
    }

    #[tokio::test]
    async fn pool_create_and_get() {
        let pool = pool(Counting::default(), 3);
        assert_eq!(pool.max_size(), 3);
        assert_eq!(pool.available(), 3);

        let guard = pool.get().await.unwrap();
        assert_eq!(pool.available(), 2);
        drop(guard);
        assert_eq!(pool.available(), 3);
        assert_eq!(pool.idle_count(), 1);
    }

    #[tokio::test]
    async fn pool_reuses_connections() {
        let pool = pool(Counting::default(), 3);
        {
            let mut guard = pool.get().await.unwrap();
            assert_eq!(*guard.conn().unwrap(), 0);
        }
        {
            let mut guard = pool.get().await.unwrap();
            assert_eq!(*guard.conn().unwrap(), 0);
            assert_eq!(pool.idle_count(), 0);
        }
        assert_eq!(pool.transport().opened.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn pool_limits_connections() {
        let pool = pool(Counting::default(), 2);
        let g1 = pool.get().await.unwrap();
        let _g2 = pool.get().await.unwrap();
        assert_eq!(pool.available(), 0);

        let blocked = tokio::time::timeout(Duration::from_millis(20), pool.get()).await;
        assert!(blocked.is_err());

        drop(g1);
        assert!(pool.get().await.is_ok());
    }

    #[tokio::test]
    async fn discard_closes_instead_of_returning() {
        let pool = pool(Counting::default(), 2);
        pool.get().await.unwrap().discard();
        assert_eq!(pool.idle_count(), 0);
        assert_eq!(pool.available(), 2);
        assert_eq!(pool.transport().closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn detach_releases_slot_until_reattached() {
        let pool = pool(Counting::default(), 1);
        let conn = pool.get().await.unwrap().detach().unwrap();
        assert_eq!(pool.available(), 1);
        assert_eq!(pool.idle_count(), 0);

        let mut other = pool.get().await.unwrap();
        assert_eq!(*other.conn().unwrap(), 1);
        drop(other);

        pool.reattach(conn);
        assert_eq!(pool.idle_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn pool_idle_timeout() {
        let pool = pool(Counting::default(), 2);
        drop(pool.get().await.unwrap());
        assert_eq!(pool.idle_count(), 1);

        tokio::time::advance(Duration::from_secs(61)).await;

        let mut guard = pool.get().await.unwrap();
        assert_eq!(*guard.conn().unwrap(), 1);
        assert_eq!(pool.transport().closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn pool_connect_failure_is_connection_error() {
        let pool = pool(
            Counting {
                fail: true,
                ..Counting::default()
            },
            1,
        );
        let err = pool.get().await.err().unwrap();
        assert!(err.is_unsent());
        assert_eq!(pool.available(), 1);
    }
}
