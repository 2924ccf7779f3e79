//! Operator timing table
//!
//! Shared, mutable map from operator to simulated execution time. The
//! evaluator reads it at the moment each fold runs, so a reconfiguration
//! takes effect for every operation that has not started waiting yet.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use tracing::info;

use crate::errors::CalcError;
use crate::types::Operator;

#[derive(Debug, Clone, Default)]
pub struct OperatorTimings {
    durations: Arc<RwLock<HashMap<Operator, Duration>>>,
}

impl OperatorTimings {
    /// Operators missing from `durations` cost nothing.
    pub fn new(durations: impl IntoIterator<Item = (Operator, Duration)>) -> Self {
        Self {
            durations: Arc::new(RwLock::new(durations.into_iter().collect())),
        }
    }

    pub fn get(&self, operator: Operator) -> Duration {
        self.durations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&operator)
            .copied()
            .unwrap_or_default()
    }

    /// All four operators in a fixed order
    pub fn snapshot(&self) -> Vec<(Operator, Duration)> {
        let durations = self.durations.read().unwrap_or_else(PoisonError::into_inner);
        Operator::ALL
            .into_iter()
            .map(|op| (op, durations.get(&op).copied().unwrap_or_default()))
            .collect()
    }

    /// Overwrite the given entries, leaving the others unchanged.
    pub fn reconfigure(&self, updates: impl IntoIterator<Item = (Operator, Duration)>) {
        let mut durations = self
            .durations
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        for (operator, duration) in updates {
            info!(%operator, ms = duration.as_millis() as u64, "Operator duration updated");
            durations.insert(operator, duration);
        }
    }

    /// Sum of the configured durations of `operators`
    pub fn estimate(&self, operators: impl IntoIterator<Item = Operator>) -> Duration {
        let durations = self.durations.read().unwrap_or_else(PoisonError::into_inner);
        operators
            .into_iter()
            .map(|op| durations.get(&op).copied().unwrap_or_default())
            .sum()
    }
}

/// Parse a millisecond count given as text. Minus signs are ignored, so
/// `"-250"` means 250ms.
pub fn parse_millis(operator: Operator, text: &str) -> Result<Duration, CalcError> {
    let cleaned: String = text.trim().chars().filter(|c| *c != '-').collect();

    cleaned
        .parse::<u64>()
        .map(Duration::from_millis)
        .map_err(|_| CalcError::InvalidDuration {
            operator,
            value: text.to_string(),
        })
}
