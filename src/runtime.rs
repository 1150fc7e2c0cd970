//! Process-wide tokio runtime for the blocking facade.
//!
//! Async callers never touch this; they bring their own runtime. The
//! runtime is built on first use and lives for the rest of the process.

use crate::error::{Error, Result};
use std::future::Future;
use std::sync::OnceLock;
use tokio::runtime::{Builder, Handle, Runtime};
use tracing::debug;

/// Worker thread override; unset or `0` uses tokio's default.
pub const THREADS_ENV: &str = "RSEDIS_RUNTIME_THREADS";

static RUNTIME: OnceLock<Runtime> = OnceLock::new();

fn worker_threads() -> Option<usize> {
    std::env::var(THREADS_ENV)
        .ok()
        .and_then(|v| v.trim().parse::<usize>().ok())
        .filter(|&n| n > 0)
}

fn build() -> Result<Runtime> {
    let mut builder = Builder::new_multi_thread();
    builder.enable_all().thread_name("rsedis-rt");
    if let Some(n) = worker_threads() {
        builder.worker_threads(n);
    }
    let rt = builder.build().map_err(Error::Connection)?;
    debug!(threads = ?worker_threads(), "runtime started");
    Ok(rt)
}

/// The shared runtime, built on first call.
pub fn runtime() -> Result<&'static Runtime> {
    if let Some(rt) = RUNTIME.get() {
        return Ok(rt);
    }
    let rt = build()?;
    // A concurrent first call may have won; the spare runtime is dropped.
    Ok(RUNTIME.get_or_init(|| rt))
}

/// Drive `future` to completion on the shared runtime.
///
/// Fails instead of panicking when called from inside an async context.
pub fn block_on<F: Future>(future: F) -> Result<F::Output> {
    if Handle::try_current().is_ok() {
        return Err(Error::Argument(
            "blocking call made from inside an async runtime; use the async Client".into(),
        ));
    }
    Ok(runtime()?.block_on(future))
}
