//! Error types for expression submission and evaluation

use thiserror::Error;

use crate::types::Operator;

/// Which part of an expression's lifecycle produced an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Rejected before any evaluation task was spawned
    Validation,
    /// Raised while folding operators; surfaces as a failed expression
    Evaluation,
    /// Lookup or bookkeeping failure in a collection
    Resource,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CalcError {
    #[error("Extra closed parenthesis at position {position}")]
    ExtraClosingParenthesis { position: usize },

    #[error("Extra open parenthesis")]
    ExtraOpeningParenthesis,

    #[error("Foreign character detected: {0}")]
    ForeignCharacter(char),

    #[error("Incorrect expression: {0}")]
    AdjacentOperators(String),

    #[error("Incorrect expression")]
    IncorrectExpression,

    #[error("Too few arguments")]
    TooFewArguments,

    #[error("Extraneous characters found in expression: {0}")]
    ExtraneousCharacters(String),

    #[error("Operand out of range: {0}")]
    OperandOutOfRange(String),

    #[error("Unknown operator: {0}")]
    UnknownOperator(String),

    #[error("Invalid duration for {operator}: {value}")]
    InvalidDuration { operator: Operator, value: String },

    #[error("An expression with ID {0} already exists")]
    DuplicateId(String),

    #[error("There is no such expression: {0}")]
    NotFound(String),

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Integer overflow in {lhs} {operator} {rhs}")]
    Overflow { lhs: i64, operator: Operator, rhs: i64 },

    #[error("Evaluation cancelled")]
    Cancelled,

    #[error("Evaluation task failed: {0}")]
    TaskFailed(String),
}

impl CalcError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CalcError::ExtraClosingParenthesis { .. }
            | CalcError::ExtraOpeningParenthesis
            | CalcError::ForeignCharacter(_)
            | CalcError::AdjacentOperators(_)
            | CalcError::IncorrectExpression
            | CalcError::TooFewArguments
            | CalcError::ExtraneousCharacters(_)
            | CalcError::OperandOutOfRange(_)
            | CalcError::UnknownOperator(_)
            | CalcError::InvalidDuration { .. }
            | CalcError::DuplicateId(_) => ErrorKind::Validation,

            CalcError::DivisionByZero
            | CalcError::Overflow { .. }
            | CalcError::Cancelled
            | CalcError::TaskFailed(_) => ErrorKind::Evaluation,

            CalcError::NotFound(_) => ErrorKind::Resource,
        }
    }

    pub fn is_validation(&self) -> bool {
        self.kind() == ErrorKind::Validation
    }
}
