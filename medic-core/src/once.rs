//! Single-flight cached initialization
//!
//! A `SingleFlight` moves from unresolved to in flight on the first call,
//! then settles on either a value or an error. Callers that arrive while
//! the fetch is in flight wait on it and observe the same outcome. The
//! outcome is never refreshed, errors included.
//!
//! If the in-flight future is dropped before it completes (its task was
//! aborted), nothing is recorded and the next caller runs the fetch.
//! Deadline expiry inside the fetch is an ordinary error and is cached.

use crate::error::Result;
use std::future::Future;
use tokio::sync::OnceCell;

pub struct SingleFlight<T> {
    cell: OnceCell<Result<T>>,
}

impl<T> SingleFlight<T> {
    pub const fn new() -> Self {
        Self {
            cell: OnceCell::const_new(),
        }
    }

    /// Return the cached outcome, running `fetch` if nothing is cached yet
    pub async fn get_or_fetch<F, Fut>(&self, fetch: F) -> Result<&T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        match self.cell.get_or_init(fetch).await {
            Ok(value) => Ok(value),
            Err(err) => Err(err.clone()),
        }
    }

    /// Cached outcome, if the fetch has completed
    pub fn get(&self) -> Option<&Result<T>> {
        self.cell.get()
    }

    pub fn is_settled(&self) -> bool {
        self.cell.initialized()
    }
}

impl<T> Default for SingleFlight<T> {
    fn default() -> Self {
        Self::new()
    }
}
