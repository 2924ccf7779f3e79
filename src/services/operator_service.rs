use std::time::Duration;

use crate::errors::CalcError;
use crate::evaluator::{parse_millis, InFlightRegistry, OperatorTimings};
use crate::parser::{prepare_expression, tokenize};
use crate::types::Operator;

/// Service for the operator timing table and the in-flight registry
#[derive(Debug, Clone)]
pub struct OperatorService {
    timings: OperatorTimings,
    in_flight: InFlightRegistry,
}

impl OperatorService {
    pub fn new(timings: OperatorTimings, in_flight: InFlightRegistry) -> Self {
        Self { timings, in_flight }
    }

    /// Configured duration of each operator
    pub fn durations(&self) -> Vec<(Operator, Duration)> {
        self.timings.snapshot()
    }

    pub fn duration(&self, operator: Operator) -> Duration {
        self.timings.get(operator)
    }

    pub fn reconfigure(&self, updates: impl IntoIterator<Item = (Operator, Duration)>) {
        self.timings.reconfigure(updates)
    }

    /// Reconfigure from textual `(operator, milliseconds)` pairs
    ///
    /// All pairs are parsed before anything is applied, so a bad pair leaves
    /// the table untouched.
    pub fn reconfigure_millis<O, V>(&self, updates: &[(O, V)]) -> Result<(), CalcError>
    where
        O: AsRef<str>,
        V: AsRef<str>,
    {
        let parsed = updates
            .iter()
            .map(|(operator, millis)| {
                let operator = Operator::parse(operator.as_ref())?;
                Ok((operator, parse_millis(operator, millis.as_ref())?))
            })
            .collect::<Result<Vec<_>, CalcError>>()?;

        self.timings.reconfigure(parsed);
        Ok(())
    }

    /// Sum of the current durations of every operator in `raw`
    pub fn estimate(&self, raw: &str) -> Result<Duration, CalcError> {
        let tokens = tokenize(&prepare_expression(raw)?)?;
        Ok(self.timings.estimate(tokens.operators()))
    }

    /// Operators currently waiting out their simulated duration
    pub fn in_flight(&self) -> Vec<Operator> {
        self.in_flight.snapshot()
    }
}
