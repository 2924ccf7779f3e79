use std::future::Future;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

/// Task group owning every task spawned for one expression.
///
/// Nothing cancels a scope on its own: evaluation runs to completion unless
/// [`EvaluationScope::cancel`] is called explicitly.
#[derive(Debug, Clone, Default)]
pub struct EvaluationScope {
    tracker: TaskTracker,
    token: CancellationToken,
}

impl EvaluationScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop every pending simulated wait in this scope. Folds that have not
    /// finished fail with [`crate::CalcError::Cancelled`].
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub(crate) async fn cancelled(&self) {
        self.token.cancelled().await
    }

    pub(crate) fn spawn<F>(&self, task: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.tracker.spawn(task)
    }

    /// Number of sub-level tasks still running
    pub fn running(&self) -> usize {
        self.tracker.len()
    }

    /// Wait until every task spawned in this scope has finished.
    pub async fn wait(&self) {
        self.tracker.close();
        self.tracker.wait().await;
    }
}
