use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::errors::CalcError;
use crate::evaluator::Evaluator;
use crate::expressions::Expression;
use crate::parser::{self, prepare_expression, tokenize};
use crate::types::ExpressionSnapshot;

/// Service owning a collection of expressions and their evaluation tasks
#[derive(Debug, Clone)]
pub struct ExpressionService {
    expressions: Arc<RwLock<HashMap<String, Arc<Expression>>>>,
    evaluator: Evaluator,
    tracker: TaskTracker,
}

impl ExpressionService {
    pub fn new(evaluator: Evaluator) -> Self {
        Self {
            expressions: Arc::new(RwLock::new(HashMap::new())),
            evaluator,
            tracker: TaskTracker::new(),
        }
    }

    /// Validate `raw` and start evaluating it under `id`
    ///
    /// Every validation error, including a duplicate id, is returned here and
    /// nothing is stored or spawned. Evaluation errors are only visible
    /// through the returned entity.
    pub async fn submit(
        &self,
        id: impl Into<String>,
        raw: &str,
    ) -> Result<Arc<Expression>, CalcError> {
        let id = id.into();

        if self.expressions.read().await.contains_key(&id) {
            warn!(id = %id, "Rejected duplicate expression id");
            return Err(CalcError::DuplicateId(id));
        }

        let parsed = parser::parse(raw).inspect_err(|e| {
            warn!(id = %id, error = %e, "Rejected invalid expression");
        })?;

        let estimated = self.evaluator.timings().estimate(parsed.tokens.operators());
        let (expression, sender) = Expression::pending(id.clone(), parsed.normalized, estimated);
        let expression = Arc::new(expression);

        {
            let mut expressions = self.expressions.write().await;
            if expressions.contains_key(&id) {
                warn!(id = %id, "Rejected duplicate expression id");
                return Err(CalcError::DuplicateId(id));
            }
            expressions.insert(id.clone(), expression.clone());
        }

        info!(
            id = %id,
            expression = expression.source(),
            estimated_ms = estimated.as_millis() as u64,
            "Expression submitted"
        );

        let evaluator = self.evaluator.clone();
        let graph = Arc::new(parsed.graph);
        let scope = expression.scope().clone();

        self.tracker.spawn(
            async move {
                let result = evaluator.evaluate(graph, &scope).await;
                match &result {
                    Ok(value) => info!(value, "Expression computed"),
                    Err(e) => warn!(error = %e, "Expression failed"),
                }
                sender.resolve(result);
            }
            .instrument(info_span!("expression", id = %id)),
        );

        Ok(expression)
    }

    /// Insert an expression whose value is already known
    pub async fn restore(
        &self,
        id: impl Into<String>,
        source: &str,
        created_at: DateTime<Utc>,
        value: i64,
    ) -> Result<Arc<Expression>, CalcError> {
        let id = id.into();

        // Source text from older records may no longer validate
        let estimated = prepare_expression(source)
            .and_then(|normalized| tokenize(&normalized))
            .map(|tokens| self.evaluator.timings().estimate(tokens.operators()))
            .unwrap_or_default();

        let expression = Arc::new(Expression::computed(
            id.clone(),
            source,
            created_at,
            value,
            estimated,
        ));

        let mut expressions = self.expressions.write().await;
        if expressions.contains_key(&id) {
            return Err(CalcError::DuplicateId(id));
        }
        expressions.insert(id.clone(), expression.clone());
        debug!(id = %id, value, "Expression restored");

        Ok(expression)
    }

    pub async fn get(&self, id: &str) -> Result<Arc<Expression>, CalcError> {
        self.expressions
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| CalcError::NotFound(id.to_string()))
    }

    /// Current result of `id`: `Ok(None)` while still pending
    pub async fn poll(&self, id: &str) -> Result<Option<i64>, CalcError> {
        self.get(id).await?.poll()
    }

    /// Wait until `id` is computed or failed
    pub async fn wait(&self, id: &str) -> Result<i64, CalcError> {
        let expression = self.get(id).await?;
        expression.wait().await
    }

    /// Stop the evaluation of `id`. A finished expression is unaffected.
    pub async fn cancel(&self, id: &str) -> Result<(), CalcError> {
        let expression = self.get(id).await?;
        if expression.outcome().is_pending() {
            info!(id, "Cancelling expression");
            expression.cancel();
        }
        Ok(())
    }

    /// Snapshots of every stored expression, oldest first
    pub async fn list(&self) -> Vec<ExpressionSnapshot> {
        let mut snapshots: Vec<ExpressionSnapshot> = self
            .expressions
            .read()
            .await
            .values()
            .map(|expression| expression.snapshot())
            .collect();

        snapshots.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        snapshots
    }

    /// Remove the given expressions; unknown ids are skipped.
    ///
    /// Running evaluations are not stopped; their results are discarded.
    pub async fn delete<S: AsRef<str>>(&self, ids: &[S]) -> usize {
        let mut expressions = self.expressions.write().await;
        let removed = ids
            .iter()
            .filter(|id| {
                let id: &str = (*id).as_ref();
                expressions.remove(id).is_some()
            })
            .count();

        debug!(requested = ids.len(), removed, "Deleted expressions");
        removed
    }

    pub async fn len(&self) -> usize {
        self.expressions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Number of expressions still being evaluated
    pub fn running(&self) -> usize {
        self.tracker.len()
    }

    /// Wait for every evaluation started so far. New submissions are accepted
    /// again afterwards.
    pub async fn wait_idle(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }
}
