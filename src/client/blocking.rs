//! Bridge from blocking entry points to the async implementation.
//!
//! Every `*_blocking` method in this crate runs the same future its async
//! counterpart does, on one lazily built runtime shared by the whole process.
//! The runtime keeps a worker thread so connection tasks spawned by the HTTP
//! client survive between calls.

use crate::error::{QueryError, Result};
use std::future::Future;
use std::sync::OnceLock;
use tokio::runtime::{Builder, Handle, Runtime};

static RUNTIME: OnceLock<Runtime> = OnceLock::new();

fn runtime() -> Result<&'static Runtime> {
    if let Some(rt) = RUNTIME.get() {
        return Ok(rt);
    }
    let rt = Builder::new_multi_thread()
        .worker_threads(1)
        .thread_name("entity-graph-blocking")
        .enable_all()
        .build()
        .map_err(|e| QueryError::Runtime(e.to_string()))?;
    // A concurrent initializer may have won; ours is dropped in that case.
    Ok(RUNTIME.get_or_init(|| rt))
}

/// Drive `future` to completion on the current thread.
///
/// Fails instead of panicking when called from inside an async runtime,
/// where blocking the thread would stall the executor.
pub(crate) fn block_on<F: Future>(future: F) -> Result<F::Output> {
    if Handle::try_current().is_ok() {
        return Err(QueryError::Runtime(
            "blocking call made from inside an async runtime; use the async variant".into(),
        ));
    }
    Ok(runtime()?.block_on(future))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_on_outside_runtime() {
        assert_eq!(block_on(async { 40 + 2 }).unwrap(), 42);
    }

    #[tokio::test]
    async fn test_block_on_inside_runtime_fails() {
        let result = block_on(async { 1 });
        assert!(matches!(result, Err(QueryError::Runtime(_))));
    }
}
