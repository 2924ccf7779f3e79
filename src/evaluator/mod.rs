//! # Concurrent Evaluator
//!
//! Walks a [`DependencyGraph`] level by level. Each level folds its operators
//! in precedence order; whenever an operand refers to another level, that
//! level is evaluated in its own spawned task and only the current fold waits
//! for it. Both operands of a fold are resolved concurrently, so independent
//! parenthesized groups run side by side.
//!
//! Every fold waits out the operator's simulated duration before combining
//! its operands. The duration is read from [`OperatorTimings`] at that moment,
//! not when the expression was submitted.

pub mod in_flight;
pub mod precedence;
pub mod scope;
pub mod timings;


pub use in_flight::{InFlightGuard, InFlightRegistry};
pub use precedence::fold_order;
pub use scope::EvaluationScope;
pub use timings::{parse_millis, OperatorTimings};

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tracing::{debug, debug_span, Instrument};

use crate::errors::CalcError;
use crate::parser::{DependencyGraph, Operand};
use crate::types::Operator;

type LevelFuture = Pin<Box<dyn Future<Output = Result<i64, CalcError>> + Send>>;

#[derive(Debug, Clone, Default)]
pub struct Evaluator {
    timings: OperatorTimings,
    in_flight: InFlightRegistry,
}

impl Evaluator {
    pub fn new(timings: OperatorTimings, in_flight: InFlightRegistry) -> Self {
        Self { timings, in_flight }
    }

    pub fn timings(&self) -> &OperatorTimings {
        &self.timings
    }

    pub fn in_flight(&self) -> &InFlightRegistry {
        &self.in_flight
    }

    /// Evaluate the whole graph, starting from level 0.
    pub async fn evaluate(
        &self,
        graph: Arc<DependencyGraph>,
        scope: &EvaluationScope,
    ) -> Result<i64, CalcError> {
        if scope.is_cancelled() {
            return Err(CalcError::Cancelled);
        }

        self.clone().evaluate_level(graph, 0, scope.clone()).await
    }

    /// Uses `Box::pin` for async recursion through spawned sub-levels.
    fn evaluate_level(
        self,
        graph: Arc<DependencyGraph>,
        index: usize,
        scope: EvaluationScope,
    ) -> LevelFuture {
        Box::pin(async move {
            let level = graph.level(index).ok_or(CalcError::IncorrectExpression)?;
            let order = fold_order(&level.operators);

            // Intermediate results; a slot is filled once any fold touching it ran
            let mut calculated: Vec<Option<i64>> = vec![None; level.operands.len()];
            let mut folded = vec![false; level.operators.len()];

            for &i in &order {
                let left = calculated[i].map_or(level.operands[i], Operand::Literal);
                let right = calculated[i + 1].map_or(level.operands[i + 1], Operand::Literal);

                let (left, right) = tokio::join!(
                    self.resolve(&graph, left, &scope),
                    self.resolve(&graph, right, &scope),
                );

                let value = self.fold(level.operators[i], left?, right?, &scope).await?;

                folded[i] = true;
                let (start, end) = merged_run(&folded, i);
                calculated[start..=end].fill(Some(value));
            }

            let last = order.last().ok_or(CalcError::TooFewArguments)?;
            calculated[*last].ok_or(CalcError::IncorrectExpression)
        })
    }

    async fn resolve(
        &self,
        graph: &Arc<DependencyGraph>,
        operand: Operand,
        scope: &EvaluationScope,
    ) -> Result<i64, CalcError> {
        match operand {
            Operand::Literal(value) => Ok(value),
            Operand::Reference(level) => {
                debug!(level, "Spawning sub-level evaluation");

                let task = self
                    .clone()
                    .evaluate_level(graph.clone(), level, scope.clone())
                    .instrument(debug_span!("level", level));

                scope
                    .spawn(task)
                    .await
                    .map_err(|e| CalcError::TaskFailed(e.to_string()))?
            }
        }
    }

    async fn fold(
        &self,
        operator: Operator,
        lhs: i64,
        rhs: i64,
        scope: &EvaluationScope,
    ) -> Result<i64, CalcError> {
        let delay = self.timings.get(operator);
        let _guard = self.in_flight.enter(operator);

        debug!(%operator, lhs, rhs, delay_ms = delay.as_millis() as u64, "Folding");

        tokio::select! {
            _ = scope.cancelled() => return Err(CalcError::Cancelled),
            _ = tokio::time::sleep(delay) => {}
        }

        operator.apply(lhs, rhs)
    }
}

/// Slots joined to operator `i` through already-folded neighbours. Operator
/// `j` joins slots `j` and `j + 1`, so the run is contiguous.
fn merged_run(folded: &[bool], i: usize) -> (usize, usize) {
    let mut start = i;
    while start > 0 && folded[start - 1] {
        start -= 1;
    }

    let mut end = i + 1;
    while end < folded.len() && folded[end] {
        end += 1;
    }

    (start, end)
}
