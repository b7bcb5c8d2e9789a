//! Guard against running blocking transfers on async executor threads.

use std::cell::Cell;

use crate::error::DownloadError;

thread_local! {
    static BLOCKING_WORKER: Cell<bool> = const { Cell::new(false) };
}

/// Marks the current thread as allowed to block until dropped.
///
/// The scheduler enters one inside every `spawn_blocking` closure. Callers
/// that run [`TransferExecutor::download_blocking`](super::TransferExecutor::download_blocking)
/// from their own `spawn_blocking` do the same.
#[must_use = "the thread is only marked while the guard lives"]
pub struct BlockingWorker {
    prev: bool,
}

impl BlockingWorker {
    pub fn enter() -> Self {
        let prev = BLOCKING_WORKER.with(|f| f.replace(true));
        Self { prev }
    }
}

impl Drop for BlockingWorker {
    fn drop(&mut self) {
        BLOCKING_WORKER.with(|f| f.set(self.prev));
    }
}

/// Err if the current thread belongs to a tokio runtime and was not
/// marked with [`BlockingWorker`].
pub fn ensure_blocking_allowed() -> Result<(), DownloadError> {
    if BLOCKING_WORKER.with(Cell::get) {
        return Ok(());
    }
    if tokio::runtime::Handle::try_current().is_ok() {
        return Err(DownloadError::WrongExecutionContext);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_thread_may_block() {
        assert!(ensure_blocking_allowed().is_ok());
    }

    #[tokio::test]
    async fn runtime_thread_may_not() {
        assert!(matches!(
            ensure_blocking_allowed(),
            Err(DownloadError::WrongExecutionContext)
        ));
        let _g = BlockingWorker::enter();
        assert!(ensure_blocking_allowed().is_ok());
    }

    #[tokio::test]
    async fn guard_restores_on_drop() {
        {
            let _g = BlockingWorker::enter();
        }
        assert!(ensure_blocking_allowed().is_err());
    }
}
