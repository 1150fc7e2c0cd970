//! Async client and pipelines.
//!
//! A [`Client`] owns the router for its topology. Every call goes through
//! the same path: gate the encoded [`CommandArgs`] against the mode, route
//! it, then decode the reply into the type the caller asked for.

use crate::args::{cmd, CommandArgs};
use crate::command::Command;
use crate::config::{join_addr, ClientConfig, Topology};
use crate::connection::{TcpTransport, Transport};
use crate::dispatch::{gate, gate_batched, trace_state, CallOptions, CallState};
use crate::error::{Error, Result};
use crate::reply::FromReply;
use crate::resp::RawReply;
use crate::router::{ClusterRouter, Mode, Router, SentinelRouter, StandaloneRouter};

use std::sync::Arc;
use tracing::{debug, info};

/// The router for whichever topology the client was configured with.
enum AnyRouter<T: Transport> {
    Standalone(StandaloneRouter<T>),
    Sentinel(SentinelRouter<T>),
    Cluster(Arc<ClusterRouter<T>>),
}

impl<T: Transport> Router for AnyRouter<T> {
    fn mode(&self) -> Mode {
        match self {
            Self::Standalone(r) => r.mode(),
            Self::Sentinel(r) => r.mode(),
            Self::Cluster(r) => r.mode(),
        }
    }

    async fn execute(&self, args: &CommandArgs, opts: &CallOptions) -> Result<RawReply> {
        match self {
            Self::Standalone(r) => r.execute(args, opts).await,
            Self::Sentinel(r) => r.execute(args, opts).await,
            Self::Cluster(r) => r.execute(args, opts).await,
        }
    }

    async fn pipeline(&self, batch: &[CommandArgs], opts: &CallOptions) -> Result<Vec<RawReply>> {
        match self {
            Self::Standalone(r) => r.pipeline(batch, opts).await,
            Self::Sentinel(r) => r.pipeline(batch, opts).await,
            Self::Cluster(r) => r.pipeline(batch, opts).await,
        }
    }

    fn pool_idle_count(&self) -> usize {
        match self {
            Self::Standalone(r) => r.pool_idle_count(),
            Self::Sentinel(r) => r.pool_idle_count(),
            Self::Cluster(r) => r.pool_idle_count(),
        }
    }

    fn pool_available(&self) -> usize {
        match self {
            Self::Standalone(r) => r.pool_available(),
            Self::Sentinel(r) => r.pool_available(),
            Self::Cluster(r) => r.pool_available(),
        }
    }
}

/// Async Redis client. Cheap to clone; clones share pools and topology.
///
/// ```no_run
/// # async fn demo() -> rsedis::Result<()> {
/// use rsedis::{Client, SetArgs, Status};
///
/// let client = Client::from_url("redis://127.0.0.1:6379").await?;
/// let _: Status = client.set_with("greeting", "hello", &SetArgs::new().ex(10)).await?;
/// let value: Option<String> = client.get("greeting").await?;
/// # Ok(())
/// # }
/// ```
pub struct Client<T: Transport = TcpTransport> {
    router: Arc<AnyRouter<T>>,
}

impl<T: Transport> Clone for Client<T> {
    fn clone(&self) -> Self {
        Self {
            router: self.router.clone(),
        }
    }
}

impl Client<TcpTransport> {
    /// Connect over TCP using `config`.
    pub async fn connect(config: ClientConfig) -> Result<Self> {
        if config.tls {
            return Err(Error::Argument("TLS connections are not supported".into()));
        }
        let transport = TcpTransport::new(config.tcp_settings());
        Self::with_transport(config, transport).await
    }

    /// Parse a Redis URL and connect.
    pub async fn from_url(url: &str) -> Result<Self> {
        Self::connect(ClientConfig::from_url(url)?).await
    }
}

impl<T: Transport> Client<T> {
    /// Build a client on a custom transport.
    ///
    /// Sentinel and cluster topologies are discovered here; standalone
    /// connections open lazily on first use.
    pub async fn with_transport(config: ClientConfig, transport: T) -> Result<Self> {
        config.validate()?;
        let transport = Arc::new(transport);
        let pool = config.pool_config();
        let dispatcher = config.dispatcher();

        let router = match &config.topology {
            Topology::Standalone => {
                AnyRouter::Standalone(StandaloneRouter::new(config.primary_addr(), transport, pool, dispatcher))
            }
            Topology::Sentinel {
                master_name,
                sentinels,
            } => {
                let sentinels = sentinels.iter().map(|(h, p)| join_addr(h, *p)).collect();
                AnyRouter::Sentinel(
                    SentinelRouter::new(sentinels, master_name.clone(), transport, pool, dispatcher).await?,
                )
            }
            Topology::Cluster { nodes } => {
                let seeds = nodes.iter().map(|(h, p)| join_addr(h, *p)).collect();
                AnyRouter::Cluster(
                    ClusterRouter::new(seeds, transport, pool, dispatcher, config.cluster_settings()).await?,
                )
            }
        };
        info!(mode = %router.mode(), "client ready");

        Ok(Self {
            router: Arc::new(router),
        })
    }

    pub fn mode(&self) -> Mode {
        self.router.mode()
    }

    /// The cluster router, when running against a cluster.
    pub fn cluster(&self) -> Option<&Arc<ClusterRouter<T>>> {
        match &*self.router {
            AnyRouter::Cluster(r) => Some(r),
            _ => None,
        }
    }

    /// Run any command and decode its reply as `R`.
    pub async fn execute<R: FromReply>(&self, args: CommandArgs) -> Result<R> {
        self.execute_with(args, CallOptions::default()).await
    }

    /// [`execute`](Self::execute) with per-call options.
    pub async fn execute_with<R: FromReply>(&self, args: CommandArgs, opts: CallOptions) -> Result<R> {
        R::from_reply(self.raw(&args, &opts).await?)
    }

    /// Gate and route one command; server errors come back as
    /// `RawReply::Error` for the caller to inspect.
    pub async fn raw(&self, args: &CommandArgs, opts: &CallOptions) -> Result<RawReply> {
        trace_state(args, CallState::Encoded);
        gate(args, self.mode())?;
        self.router.execute(args, opts).await
    }

    /// Raw reply with default options; typed methods decode it themselves.
    pub(crate) async fn call(&self, args: CommandArgs) -> Result<RawReply> {
        self.raw(&args, &CallOptions::default()).await
    }

    pub fn pipeline(&self) -> Pipeline<'_, T> {
        Pipeline {
            client: self,
            commands: Vec::new(),
            opts: CallOptions::default(),
        }
    }

    pub fn pool_idle_count(&self) -> usize {
        self.router.pool_idle_count()
    }

    pub fn pool_available(&self) -> usize {
        self.router.pool_available()
    }
}

// ── Pipeline ───────────────────────────────────────────────────────

/// Commands queued for one round trip on one connection.
///
/// In cluster mode every key in the batch must hash to the same slot.
pub struct Pipeline<'a, T: Transport = TcpTransport> {
    client: &'a Client<T>,
    commands: Vec<CommandArgs>,
    opts: CallOptions,
}

impl<'a, T: Transport> Pipeline<'a, T> {
    pub fn add(&mut self, args: CommandArgs) -> &mut Self {
        self.commands.push(args);
        self
    }

    pub fn options(&mut self, opts: CallOptions) -> &mut Self {
        self.opts = opts;
        self
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }

    /// Send the queue and return one raw reply per command. Server errors
    /// stay in place as `RawReply::Error`. The queue is emptied.
    pub async fn query_raw(&mut self) -> Result<Vec<RawReply>> {
        let batch = std::mem::take(&mut self.commands);
        if batch.is_empty() {
            return Ok(Vec::new());
        }
        let mode = self.client.mode();
        for args in &batch {
            gate_batched(args, mode)?;
        }
        debug!(commands = batch.len(), "sending pipeline");
        self.client.router.pipeline(&batch, &self.opts).await
    }

    /// Send the queue and decode every reply as `R`; the first server error
    /// fails the whole call.
    pub async fn query<R: FromReply>(&mut self) -> Result<Vec<R>> {
        self.query_raw().await?.into_iter().map(R::from_reply).collect()
    }

    /// Wrap the queue in `MULTI`/`EXEC` and decode the `EXEC` array as `R`.
    ///
    /// A queueing error aborts the transaction and is returned as the error.
    /// A `WATCH` abort yields nil, which decodes through `Option<R>`.
    pub async fn transaction<R: FromReply>(&mut self) -> Result<R> {
        let queued = std::mem::take(&mut self.commands);
        let count = queued.len();
        self.commands.reserve(count + 2);
        self.commands.push(cmd(Command::Multi));
        self.commands.extend(queued);
        self.commands.push(cmd(Command::Exec));

        let replies = self.query_raw().await?;
        let queue_error = replies
            .iter()
            .take(count + 1)
            .find_map(|r| r.as_error_msg().map(str::to_string));
        let exec = replies
            .into_iter()
            .last()
            .ok_or_else(|| Error::Protocol("missing EXEC reply".into()))?;

        match (exec, queue_error) {
            (RawReply::Error(_), Some(first)) => Err(Error::server(first)),
            (exec, _) => R::from_reply(exec),
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────────
