//! Write Barrier Module
//!
//! Joins independently spawned write tasks, delivering the first failure.

use std::future::Future;
use std::io;

use tokio::task::{JoinError, JoinSet};

use crate::error::{CacheError, Result};

// == Write Barrier ==
/// Completion barrier over concurrent write tasks.
///
/// [`WriteBarrier::wait`] resolves once every task has finished, with the
/// first error any task reported; later errors are discarded. Finished tasks
/// leave nothing running, so callers can inspect what each task did before
/// deciding how to recover. Dropping the barrier detaches its tasks.
pub struct WriteBarrier {
    tasks: JoinSet<Result<()>>,
}

impl Default for WriteBarrier {
    fn default() -> Self {
        Self::new()
    }
}

impl WriteBarrier {
    pub fn new() -> Self {
        Self {
            tasks: JoinSet::new(),
        }
    }

    /// Spawns a write task onto the runtime.
    pub fn spawn<F>(&mut self, task: F)
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        self.tasks.spawn(task);
    }

    /// Number of tasks not yet observed.
    pub fn pending(&self) -> usize {
        self.tasks.len()
    }

    /// Waits for all tasks, returning the first error exactly once.
    pub async fn wait(mut self) -> Result<()> {
        let mut first_error = None;
        while let Some(joined) = self.tasks.join_next().await {
            if let Err(error) = joined.unwrap_or_else(join_failure) {
                first_error.get_or_insert(error);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

impl Drop for WriteBarrier {
    fn drop(&mut self) {
        self.tasks.detach_all();
    }
}

fn join_failure(join_error: JoinError) -> Result<()> {
    Err(CacheError::Io {
        path: "<write task>".to_string(),
        source: io::Error::new(io::ErrorKind::Other, join_error),
    })
}
