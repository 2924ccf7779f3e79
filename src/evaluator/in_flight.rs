//! Advisory registry of operations currently waiting out their simulated
//! duration. Observability only: nothing reads it to make decisions.

use std::sync::{Arc, Mutex, PoisonError};

use crate::types::Operator;

#[derive(Debug, Clone, Default)]
pub struct InFlightRegistry {
    operators: Arc<Mutex<Vec<Operator>>>,
}

impl InFlightRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `operator` as in flight until the returned guard is dropped
    pub fn enter(&self, operator: Operator) -> InFlightGuard {
        self.operators
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(operator);

        InFlightGuard {
            registry: self.clone(),
            operator,
        }
    }

    pub fn snapshot(&self) -> Vec<Operator> {
        self.operators
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.operators
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn leave(&self, operator: Operator) {
        let mut operators = self.operators.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(position) = operators.iter().position(|op| *op == operator) {
            operators.remove(position);
        }
    }
}

pub struct InFlightGuard {
    registry: InFlightRegistry,
    operator: Operator,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.registry.leave(self.operator);
    }
}
