use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;

use crate::errors::CalcError;
use crate::evaluator::EvaluationScope;
use crate::types::{ExpressionSnapshot, ExpressionStatus};

/// Result cell of an expression. Starts out `Pending` and is written once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Pending,
    Computed(i64),
    Failed(CalcError),
}

impl Outcome {
    pub fn status(&self) -> ExpressionStatus {
        match self {
            Outcome::Pending => ExpressionStatus::Pending,
            Outcome::Computed(_) => ExpressionStatus::Computed,
            Outcome::Failed(_) => ExpressionStatus::Failed,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Outcome::Pending)
    }
}

impl From<Result<i64, CalcError>> for Outcome {
    fn from(result: Result<i64, CalcError>) -> Self {
        match result {
            Ok(value) => Outcome::Computed(value),
            Err(e) => Outcome::Failed(e),
        }
    }
}

/// A submitted expression and the state of its evaluation
#[derive(Debug)]
pub struct Expression {
    id: String,
    source: String,
    created_at: DateTime<Utc>,
    estimated: Duration,
    outcome: watch::Receiver<Outcome>,
    scope: EvaluationScope,
}

impl Expression {
    /// Create a pending expression. The returned sender is the only way to
    /// complete it, and it can do so once.
    pub fn pending(
        id: impl Into<String>,
        source: impl Into<String>,
        estimated: Duration,
    ) -> (Self, OutcomeSender) {
        let (tx, rx) = watch::channel(Outcome::Pending);

        let expression = Self {
            id: id.into(),
            source: source.into(),
            created_at: Utc::now(),
            estimated,
            outcome: rx,
            scope: EvaluationScope::new(),
        };

        (expression, OutcomeSender { tx: Some(tx) })
    }

    /// An expression whose value is already known; it is never evaluated.
    pub fn computed(
        id: impl Into<String>,
        source: impl Into<String>,
        created_at: DateTime<Utc>,
        value: i64,
        estimated: Duration,
    ) -> Self {
        // The receiver keeps the last value after the sender is gone
        let (_, rx) = watch::channel(Outcome::Computed(value));

        Self {
            id: id.into(),
            source: source.into(),
            created_at,
            estimated,
            outcome: rx,
            scope: EvaluationScope::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn estimated(&self) -> Duration {
        self.estimated
    }

    pub fn outcome(&self) -> Outcome {
        self.outcome.borrow().clone()
    }

    pub fn status(&self) -> ExpressionStatus {
        self.outcome.borrow().status()
    }

    /// Non-blocking read: `Ok(None)` while the expression is still pending.
    pub fn poll(&self) -> Result<Option<i64>, CalcError> {
        match &*self.outcome.borrow() {
            Outcome::Pending => Ok(None),
            Outcome::Computed(value) => Ok(Some(*value)),
            Outcome::Failed(e) => Err(e.clone()),
        }
    }

    /// Wait until the expression leaves `Pending`.
    pub async fn wait(&self) -> Result<i64, CalcError> {
        let mut rx = self.outcome.clone();
        let received = rx
            .wait_for(|outcome| !outcome.is_pending())
            .await
            .map(|outcome| outcome.clone());

        // Sender gone without a final value; it always sends one on drop
        let outcome = received.unwrap_or_else(|_| rx.borrow().clone());

        match outcome {
            Outcome::Computed(value) => Ok(value),
            Outcome::Failed(e) => Err(e),
            Outcome::Pending => Err(CalcError::TaskFailed(
                "evaluation ended without a result".to_string(),
            )),
        }
    }

    /// Opt-in teardown of this expression's evaluation. It fails with
    /// [`CalcError::Cancelled`] unless it already finished.
    pub fn cancel(&self) {
        self.scope.cancel();
    }

    pub fn scope(&self) -> &EvaluationScope {
        &self.scope
    }

    pub fn snapshot(&self) -> ExpressionSnapshot {
        let (value, error) = match self.outcome() {
            Outcome::Pending => (None, None),
            Outcome::Computed(value) => (Some(value), None),
            Outcome::Failed(e) => (None, Some(e.to_string())),
        };

        ExpressionSnapshot {
            id: self.id.clone(),
            expression: self.source.clone(),
            status: self.status(),
            value,
            error,
            created_at: self.created_at,
            estimated_ms: self.estimated.as_millis() as u64,
        }
    }
}

/// Write side of an expression's result cell.
///
/// Dropping it without calling [`OutcomeSender::resolve`] fails the
/// expression, so no entity stays pending after its task is gone.
#[derive(Debug)]
pub struct OutcomeSender {
    tx: Option<watch::Sender<Outcome>>,
}

impl OutcomeSender {
    pub fn resolve(mut self, result: Result<i64, CalcError>) {
        if let Some(tx) = self.tx.take() {
            tx.send_replace(result.into());
        }
    }
}

impl Drop for OutcomeSender {
    fn drop(&mut self) {
        if let Some(tx) = self.tx.take() {
            tx.send_replace(Outcome::Failed(CalcError::TaskFailed(
                "evaluation ended without a result".to_string(),
            )));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn test_pending_until_resolved() {
        let (expression, sender) = Expression::pending("a", "2+2", Duration::from_millis(500));
        assert_eq!(expression.status(), ExpressionStatus::Pending);
        assert_eq!(expression.poll(), Ok(None));

        sender.resolve(Ok(4));
        assert_eq!(expression.status(), ExpressionStatus::Computed);
        assert_eq!(expression.poll(), Ok(Some(4)));

        // Cached: polling again returns the same value
        assert_eq!(expression.poll(), Ok(Some(4)));
    }

    #[test]
    fn test_failed_outcome_is_repeatable() {
        let (expression, sender) = Expression::pending("a", "1/0", Duration::ZERO);
        sender.resolve(Err(CalcError::DivisionByZero));

        assert_eq!(expression.poll(), Err(CalcError::DivisionByZero));
        assert_eq!(expression.poll(), Err(CalcError::DivisionByZero));
        assert_eq!(expression.status(), ExpressionStatus::Failed);
    }

    #[test]
    fn test_dropped_sender_fails_expression() {
        let (expression, sender) = Expression::pending("a", "1+1", Duration::ZERO);
        drop(sender);

        assert!(matches!(expression.poll(), Err(CalcError::TaskFailed(_))));
    }

    #[tokio::test]
    async fn test_wait_resolves_on_completion() {
        let (expression, sender) = Expression::pending("a", "2*3", Duration::ZERO);

        let handle = tokio::spawn(async move {
            tokio::task::yield_now().await;
            sender.resolve(Ok(6));
        });

        assert_eq!(assert_ok!(expression.wait().await), 6);
        handle.await.unwrap();

        // Waiting on a finished expression returns immediately
        assert_eq!(expression.wait().await, Ok(6));
    }

    #[tokio::test]
    async fn test_wait_reports_failure() {
        let (expression, sender) = Expression::pending("a", "1/0", Duration::ZERO);
        sender.resolve(Err(CalcError::DivisionByZero));

        assert_eq!(assert_err!(expression.wait().await), CalcError::DivisionByZero);
    }

    #[tokio::test]
    async fn test_restored_expression_is_computed() {
        let created_at = Utc::now();
        let expression = Expression::computed("r", "6*7", created_at, 42, Duration::from_millis(1000));

        assert_eq!(expression.poll(), Ok(Some(42)));
        assert_eq!(expression.wait().await, Ok(42));

        let snapshot = expression.snapshot();
        assert_eq!(snapshot.status, ExpressionStatus::Computed);
        assert_eq!(snapshot.value, Some(42));
        assert_eq!(snapshot.created_at, created_at);
        assert_eq!(snapshot.estimated_ms, 1000);
    }

    #[test]
    fn test_snapshot_of_failed_expression() {
        let (expression, sender) = Expression::pending("f", "1/0", Duration::from_millis(1500));
        sender.resolve(Err(CalcError::DivisionByZero));

        let snapshot = expression.snapshot();
        assert_eq!(snapshot.id, "f");
        assert_eq!(snapshot.expression, "1/0");
        assert_eq!(snapshot.value, None);
        assert_eq!(snapshot.error, Some(CalcError::DivisionByZero.to_string()));
    }

    #[test]
    fn test_cancel_marks_scope() {
        let (expression, _sender) = Expression::pending("c", "1+1", Duration::ZERO);
        expression.cancel();
        assert!(expression.scope().is_cancelled());
    }
}
