//! Command dispatch: the per-call state machine.
//!
//! ```text
//! ENCODED ──gate──▶ GATED ──acquire+write──▶ SENT ──▶ REPLIED
//!    │                 │                       ├────▶ REDIRECTED ──▶ SENT
//!    └──▶ FAILED ◀─────┘                       └────▶ FAILED
//! ```
//!
//! Encoding happens once; redirects and retries resend the same
//! [`CommandArgs`]. Routers drive a [`Dispatcher`] for each attempt.

use crate::args::{cmd, CommandArgs};
use crate::command::{Command, CommandFlags};
use crate::connection::{ConnectionPool, Transport};
use crate::error::{Error, Result};
use crate::resp::RawReply;
use crate::router::Mode;

use std::fmt;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, trace, warn};

/// Lifecycle of one call, for tracing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallState {
    Encoded,
    Gated,
    Sent,
    Replied,
    Redirected,
    Failed,
}

impl fmt::Display for CallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Encoded => "encoded",
            Self::Gated => "gated",
            Self::Sent => "sent",
            Self::Replied => "replied",
            Self::Redirected => "redirected",
            Self::Failed => "failed",
        })
    }
}

pub(crate) fn trace_state(args: &CommandArgs, state: CallState) {
    trace!(command = args.name(), %state, "call state");
}

/// Per-call overrides.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallOptions {
    /// Reply deadline; `None` uses the client default (blocking commands
    /// have no default deadline).
    pub timeout: Option<Duration>,
    /// Allow resending a write after a transport failure. The caller asserts
    /// the command is idempotent.
    pub retry_writes: bool,
}

impl CallOptions {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn retry_writes(mut self) -> Self {
        self.retry_writes = true;
        self
    }
}

/// Bounded attempts with capped exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first; 1 disables retries.
    pub max_attempts: u32,
    pub base_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_backoff: Duration::from_millis(50),
            max_backoff: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Delay before attempt `attempt + 1` (`attempt` starts at 1).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
        self.base_backoff
            .checked_mul(factor)
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff)
    }
}

/// Reject calls the active topology cannot serve, before any I/O.
pub fn gate(args: &CommandArgs, mode: Mode) -> Result<()> {
    let flags = args.flags();
    let info = args.command().info();
    if !info.subcommands.is_empty() {
        match args.subcommand() {
            Some(sub) if info.has_subcommand(sub) => {}
            Some(sub) => {
                return Err(Error::Argument(format!(
                    "unknown {} sub-command '{}'",
                    info.name,
                    String::from_utf8_lossy(sub)
                )))
            }
            None if args.command() == Command::CommandCmd => {}
            None => return Err(Error::Argument(format!("{} requires a sub-command", info.name))),
        }
    }
    let unsupported = match mode {
        Mode::Cluster => flags.contains(CommandFlags::NO_CLUSTER),
        Mode::Standalone | Mode::Sentinel => flags.contains(CommandFlags::CLUSTER_ONLY),
    };
    if unsupported {
        return Err(Error::Capability {
            command: args.display_name(),
            mode,
        });
    }
    if flags.contains(CommandFlags::TRANSACTION) {
        return Err(Error::Argument(format!(
            "{} changes connection state and cannot run on a pooled connection; use Pipeline::transaction",
            args.name()
        )));
    }
    trace_state(args, CallState::Gated);
    Ok(())
}

/// Gate for pipelined commands: `MULTI`/`EXEC` may appear since the whole
/// batch shares one connection.
pub(crate) fn gate_batched(args: &CommandArgs, mode: Mode) -> Result<()> {
    if args.flags().contains(CommandFlags::TRANSACTION) {
        return Ok(());
    }
    gate(args, mode)
}

/// Attempt execution shared by all routers.
#[derive(Debug, Clone, Copy)]
pub struct Dispatcher {
    /// Default reply deadline for non-blocking commands.
    pub response_timeout: Option<Duration>,
    pub retry: RetryPolicy,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self {
            response_timeout: Some(Duration::from_secs(30)),
            retry: RetryPolicy::default(),
        }
    }
}

impl Dispatcher {
    fn deadline(&self, args: &CommandArgs, opts: &CallOptions) -> Option<Duration> {
        match opts.timeout {
            Some(t) => Some(t),
            None if args.is_blocking() => None,
            None => self.response_timeout,
        }
    }

    /// One write/read on a connection from `pool`.
    ///
    /// Any failure after checkout discards the connection; a blocking call
    /// runs on a detached connection so it does not hold a pool slot.
    pub async fn round_trip<T: Transport>(
        &self,
        pool: &ConnectionPool<T>,
        args: &CommandArgs,
        opts: &CallOptions,
    ) -> Result<RawReply> {
        let deadline = self.deadline(args, opts);
        let guard = pool.get().await?;
        trace_state(args, CallState::Sent);

        if args.is_blocking() {
            let mut conn = guard.detach()?;
            let result = within(deadline, args, pool.transport().send(&mut conn, args)).await;
            match result {
                Ok(reply) => {
                    pool.reattach(conn);
                    Ok(reply)
                }
                Err(e) => {
                    pool.transport().close(conn);
                    Err(e)
                }
            }
        } else {
            let mut guard = guard;
            let result = within(deadline, args, pool.transport().send(guard.conn()?, args)).await;
            if result.is_err() {
                guard.discard();
            }
            result
        }
    }

    /// Send a batch on one connection; the deadline covers the whole batch.
    pub async fn round_trip_batch<T: Transport>(
        &self,
        pool: &ConnectionPool<T>,
        batch: &[CommandArgs],
        opts: &CallOptions,
    ) -> Result<Vec<RawReply>> {
        let Some(first) = batch.first() else {
            return Ok(Vec::new());
        };
        let deadline = match opts.timeout {
            Some(t) => Some(t),
            None if batch.iter().any(CommandArgs::is_blocking) => None,
            None => self.response_timeout,
        };
        let mut guard = pool.get().await?;
        let result = within(deadline, first, pool.transport().send_batch(guard.conn()?, batch)).await;
        match result {
            Ok(replies) if replies.len() == batch.len() => Ok(replies),
            Ok(replies) => {
                guard.discard();
                Err(Error::Protocol(format!(
                    "expected {} replies, transport returned {}",
                    batch.len(),
                    replies.len()
                )))
            }
            Err(e) => {
                guard.discard();
                Err(e)
            }
        }
    }

    /// `ASKING` followed by the command on one connection.
    pub async fn round_trip_asking<T: Transport>(
        &self,
        pool: &ConnectionPool<T>,
        args: &CommandArgs,
        opts: &CallOptions,
    ) -> Result<RawReply> {
        let batch = [cmd(Command::Asking), args.clone()];
        let mut replies = self.round_trip_batch(pool, &batch, opts).await?.into_iter();
        match (replies.next(), replies.next()) {
            (Some(RawReply::Error(msg)), _) => Err(Error::server(msg)),
            (Some(_), Some(reply)) => Ok(reply),
            _ => Err(Error::Protocol("missing reply after ASKING".into())),
        }
    }

    /// Whether `err` may be retried for this call.
    ///
    /// Connection failures happen before any byte is written and are always
    /// retryable. Failures after the write only for reads, or when the
    /// caller opted in.
    pub fn should_retry(&self, err: &Error, args: &CommandArgs, opts: &CallOptions) -> bool {
        match err {
            Error::Connection(_) => true,
            Error::Timeout(_) if args.is_blocking() => false,
            Error::Transport(_) | Error::Timeout(_) => {
                args.flags().contains(CommandFlags::READ) || opts.retry_writes
            }
            _ => false,
        }
    }

    /// Run `attempt` under the retry policy.
    pub async fn retry<F, Fut>(&self, args: &CommandArgs, opts: &CallOptions, mut attempt: F) -> Result<RawReply>
    where
        F: FnMut(u32) -> Fut + Send,
        Fut: Future<Output = Result<RawReply>> + Send,
    {
        let mut n = 1;
        loop {
            match attempt(n).await {
                Ok(reply) => return Ok(reply),
                Err(e) if n < self.retry.max_attempts && self.should_retry(&e, args, opts) => {
                    let delay = self.retry.backoff(n);
                    warn!(command = args.name(), attempt = n, ?delay, error = %e, "retrying");
                    tokio::time::sleep(delay).await;
                    n += 1;
                }
                Err(e) => {
                    debug!(command = args.name(), error = %e, "call failed");
                    trace_state(args, CallState::Failed);
                    return Err(e);
                }
            }
        }
    }
}

impl Dispatcher {
    /// Retry a batch only when nothing was written; a partially applied
    /// batch is never resent.
    pub async fn retry_batch<F, Fut>(&self, mut attempt: F) -> Result<Vec<RawReply>>
    where
        F: FnMut(u32) -> Fut + Send,
        Fut: Future<Output = Result<Vec<RawReply>>> + Send,
    {
        let mut n = 1;
        loop {
            match attempt(n).await {
                Err(e) if e.is_unsent() && n < self.retry.max_attempts => {
                    let delay = self.retry.backoff(n);
                    warn!(attempt = n, ?delay, error = %e, "retrying batch");
                    tokio::time::sleep(delay).await;
                    n += 1;
                }
                other => return other,
            }
        }
    }
}

async fn within<F, R>(deadline: Option<Duration>, args: &CommandArgs, fut: F) -> Result<R>
where
    F: Future<Output = Result<R>>,
{
    match deadline {
        Some(limit) => match tokio::time::timeout(limit, fut).await {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout(format!("{} after {limit:?}", args.display_name()))),
        },
        None => fut.await,
    }
}

// ── Tests ──────────────────────────────────────────────────────────
