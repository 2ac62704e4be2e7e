//! View-lifetime scope for background work.
//!
//! A view spawns its fetches through a [`ViewScope`] and binds the state
//! cells it reads. Closing or dropping the scope aborts the tasks still
//! running and detaches the bound cells, so a response that lands after
//! the view is gone changes nothing.

use kate_core::state::StateCell;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::task::{AbortHandle, JoinHandle};
use tracing::debug;

type Detach = Box<dyn Fn() + Send + Sync>;

#[derive(Default)]
pub struct ViewScope {
    tasks: Mutex<Vec<AbortHandle>>,
    cells: Mutex<Vec<Detach>>,
    closed: AtomicBool,
}

impl ViewScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tie a cell to this scope. Binding to a closed scope detaches the
    /// cell immediately.
    pub fn bind<T: Send + Sync + 'static>(&self, cell: &Arc<StateCell<T>>) {
        let cell = Arc::downgrade(cell);
        let detach: Detach = Box::new(move || {
            if let Some(cell) = cell.upgrade() {
                cell.detach();
            }
        });
        if self.is_closed() {
            detach();
            return;
        }
        self.cells.lock().unwrap_or_else(PoisonError::into_inner).push(detach);
    }

    /// Run `fut` on the runtime until it completes or the scope closes.
    /// Returns `None` when the scope is already closed.
    pub fn spawn<F>(&self, fut: F) -> Option<JoinHandle<()>>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if self.is_closed() {
            return None;
        }
        let handle = tokio::spawn(fut);
        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        tasks.retain(|t| !t.is_finished());
        tasks.push(handle.abort_handle());
        Some(handle)
    }

    pub fn active_tasks(&self) -> usize {
        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        tasks.retain(|t| !t.is_finished());
        tasks.len()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Abort running tasks and detach bound cells. Idempotent.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let tasks = std::mem::take(&mut *self.tasks.lock().unwrap_or_else(PoisonError::into_inner));
        let cells = std::mem::take(&mut *self.cells.lock().unwrap_or_else(PoisonError::into_inner));
        debug!(tasks = tasks.len(), cells = cells.len(), "view scope closed");
        for task in tasks {
            task.abort();
        }
        for detach in cells {
            detach();
        }
    }
}

impl Drop for ViewScope {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn close_detaches_bound_cells() {
        let cell = Arc::new(StateCell::new(0u32));
        let scope = ViewScope::new();
        scope.bind(&cell);
        assert!(cell.emit(1));

        scope.close();
        assert!(!cell.emit(2));
        assert_eq!(*cell.snapshot(), 1);
    }

    #[tokio::test]
    async fn closed_scope_refuses_new_work() {
        let scope = ViewScope::new();
        scope.close();
        assert!(scope.spawn(async {}).is_none());

        let cell = Arc::new(StateCell::new(0u32));
        scope.bind(&cell);
        assert!(!cell.is_live());
    }

    #[tokio::test]
    async fn drop_aborts_pending_tasks() {
        let scope = ViewScope::new();
        let handle = scope
            .spawn(std::future::pending::<()>())
            .unwrap();
        assert_eq!(scope.active_tasks(), 1);

        drop(scope);
        assert!(handle.await.unwrap_err().is_cancelled());
    }
}
