//! Blocking bridge for the sqlx-backed stores.
//!
//! Worker threads are plain OS threads, so each network store owns a small
//! tokio runtime and every operation enters it with `block_on`. A
//! multi-thread runtime accepts concurrent `block_on` calls from any number of
//! threads.

use crate::error::StoreError;
use crate::store::StoreKind;
use std::future::Future;

/// Worker threads driving connection I/O for one store.
const IO_THREADS: usize = 2;

pub(super) struct BlockingRuntime {
    runtime: tokio::runtime::Runtime,
}

impl BlockingRuntime {
    pub(super) fn new(kind: StoreKind) -> Result<Self, StoreError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(IO_THREADS)
            .thread_name(format!("{kind}-io"))
            .enable_all()
            .build()
            .map_err(|source| StoreError::Runtime { kind, source })?;
        Ok(Self { runtime })
    }

    pub(super) fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }
}

/// Strip the password from a connection URL before it reaches logs or errors.
pub(super) fn redact_url(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_string();
    };
    let Some((userinfo, location)) = rest.rsplit_once('@') else {
        return url.to_string();
    };
    match userinfo.split_once(':') {
        Some((user, _)) => format!("{scheme}://{user}:***@{location}"),
        None => url.to_string(),
    }
}
