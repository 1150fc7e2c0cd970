//! Synchronous facade over [`Client`].
//!
//! Every call is driven to completion on the shared runtime from
//! [`runtime`](crate::runtime). Typed family methods are reached through
//! [`BlockingClient::run`]:
//!
//! ```no_run
//! # fn demo() -> rsedis::Result<()> {
//! use rsedis::BlockingClient;
//!
//! let client = BlockingClient::from_url("redis://127.0.0.1:6379")?;
//! let n: i64 = client.run(|c| async move { c.incr("hits").await })?;
//! # Ok(())
//! # }
//! ```

use crate::args::CommandArgs;
use crate::client::Client;
use crate::config::ClientConfig;
use crate::connection::{TcpTransport, Transport};
use crate::dispatch::CallOptions;
use crate::error::Result;
use crate::reply::FromReply;
use crate::resp::RawReply;
use crate::router::Mode;
use crate::runtime::block_on;
use std::future::Future;

/// Blocking client. Cheap to clone; clones share pools and topology.
pub struct BlockingClient<T: Transport = TcpTransport> {
    inner: Client<T>,
}

impl<T: Transport> Clone for BlockingClient<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl BlockingClient<TcpTransport> {
    pub fn connect(config: ClientConfig) -> Result<Self> {
        let inner = block_on(Client::connect(config))??;
        Ok(Self { inner })
    }

    pub fn from_url(url: &str) -> Result<Self> {
        Self::connect(ClientConfig::from_url(url)?)
    }
}

impl<T: Transport> BlockingClient<T> {
    pub fn with_transport(config: ClientConfig, transport: T) -> Result<Self> {
        let inner = block_on(Client::with_transport(config, transport))??;
        Ok(Self { inner })
    }

    /// Wrap an existing async client.
    pub fn from_client(inner: Client<T>) -> Self {
        Self { inner }
    }

    /// The async client underneath.
    pub fn client(&self) -> &Client<T> {
        &self.inner
    }

    pub fn mode(&self) -> Mode {
        self.inner.mode()
    }

    /// Run an async closure against a clone of the client and wait for it.
    pub fn run<F, Fut, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(Client<T>) -> Fut,
        Fut: Future<Output = Result<R>>,
    {
        block_on(f(self.inner.clone()))?
    }

    pub fn execute<R: FromReply>(&self, args: CommandArgs) -> Result<R> {
        block_on(self.inner.execute(args))?
    }

    pub fn execute_with<R: FromReply>(&self, args: CommandArgs, opts: CallOptions) -> Result<R> {
        block_on(self.inner.execute_with(args, opts))?
    }

    /// Send `commands` as one pipeline; one raw reply per command.
    pub fn pipeline(&self, commands: impl IntoIterator<Item = CommandArgs>) -> Result<Vec<RawReply>> {
        let mut pipe = self.inner.pipeline();
        for args in commands {
            pipe.add(args);
        }
        block_on(pipe.query_raw())?
    }

    /// `MULTI`/`EXEC` around `commands`; the `EXEC` array decoded as `R`.
    pub fn transaction<R: FromReply>(&self, commands: impl IntoIterator<Item = CommandArgs>) -> Result<R> {
        let mut pipe = self.inner.pipeline();
        for args in commands {
            pipe.add(args);
        }
        block_on(pipe.transaction())?
    }

    pub fn pool_idle_count(&self) -> usize {
        self.inner.pool_idle_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::cmd;
    use crate::command::Command;
    use crate::error::Error;

    #[test]
    fn gate_applies_synchronously() {
        let client = BlockingClient::from_url("redis://127.0.0.1:1").unwrap();
        let err = client
            .execute::<RawReply>(CommandArgs::with_sub(Command::Cluster, "INFO").unwrap())
            .unwrap_err();
        assert!(matches!(err, Error::Capability { .. }));
    }

    #[test]
    fn empty_pipeline() {
        let client = BlockingClient::from_url("redis://127.0.0.1:1").unwrap();
        assert!(client.pipeline(Vec::new()).unwrap().is_empty());
    }

    #[test]
    fn unreachable_server_is_connection_error() {
        let client = BlockingClient::from_url("redis://127.0.0.1:1").unwrap();
        let err = client.execute::<RawReply>(cmd(Command::Ping)).unwrap_err();
        assert!(err.is_transport(), "{err:?}");
    }
}
