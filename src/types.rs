use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::CalcError;

/// A binary arithmetic operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = "+")]
    Add,
    #[serde(rename = "-")]
    Sub,
    #[serde(rename = "*")]
    Mul,
    #[serde(rename = "/")]
    Div,
}

impl Operator {
    pub const ALL: [Operator; 4] = [Operator::Add, Operator::Sub, Operator::Mul, Operator::Div];

    pub fn symbol(self) -> char {
        match self {
            Operator::Add => '+',
            Operator::Sub => '-',
            Operator::Mul => '*',
            Operator::Div => '/',
        }
    }

    pub fn from_symbol(c: char) -> Option<Operator> {
        match c {
            '+' => Some(Operator::Add),
            '-' => Some(Operator::Sub),
            '*' => Some(Operator::Mul),
            '/' => Some(Operator::Div),
            _ => None,
        }
    }

    /// Long name, as used in configuration keys
    pub fn name(self) -> &'static str {
        match self {
            Operator::Add => "addition",
            Operator::Sub => "subtraction",
            Operator::Mul => "multiplication",
            Operator::Div => "division",
        }
    }

    /// Accepts either the symbol (`+`) or the long name (`addition`)
    pub fn parse(text: &str) -> Result<Operator, CalcError> {
        let text = text.trim();
        let mut chars = text.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            if let Some(op) = Operator::from_symbol(c) {
                return Ok(op);
            }
        }

        Operator::ALL
            .into_iter()
            .find(|op| op.name().eq_ignore_ascii_case(text))
            .ok_or_else(|| CalcError::UnknownOperator(text.to_string()))
    }

    /// Multiplication and division fold before addition and subtraction
    pub fn is_multiplicative(self) -> bool {
        matches!(self, Operator::Mul | Operator::Div)
    }

    /// Apply the operator with integer semantics (division truncates toward zero)
    pub fn apply(self, lhs: i64, rhs: i64) -> Result<i64, CalcError> {
        let result = match self {
            Operator::Add => lhs.checked_add(rhs),
            Operator::Sub => lhs.checked_sub(rhs),
            Operator::Mul => lhs.checked_mul(rhs),
            Operator::Div => {
                if rhs == 0 {
                    return Err(CalcError::DivisionByZero);
                }
                lhs.checked_div(rhs)
            }
        };

        result.ok_or(CalcError::Overflow {
            lhs,
            operator: self,
            rhs,
        })
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExpressionStatus {
    Pending,
    Computed,
    Failed,
}

impl ExpressionStatus {
    pub fn label(self) -> &'static str {
        match self {
            ExpressionStatus::Pending => "pending",
            ExpressionStatus::Computed => "computed",
            ExpressionStatus::Failed => "failed",
        }
    }
}

/// Point-in-time view of an expression, for hosts that list or display them
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpressionSnapshot {
    pub id: String,
    pub expression: String,
    pub status: ExpressionStatus,
    pub value: Option<i64>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub estimated_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_parse_by_symbol_and_name() {
        assert_eq!(Operator::parse("+").unwrap(), Operator::Add);
        assert_eq!(Operator::parse("Division").unwrap(), Operator::Div);
        assert_eq!(Operator::parse(" * ").unwrap(), Operator::Mul);
        assert_eq!(
            Operator::parse("%"),
            Err(CalcError::UnknownOperator("%".to_string()))
        );
    }

    #[test]
    fn test_apply_integer_semantics() {
        assert_eq!(Operator::Div.apply(7, 2), Ok(3));
        assert_eq!(Operator::Div.apply(-7, 2), Ok(-3));
        assert_eq!(Operator::Sub.apply(2, 5), Ok(-3));
        assert_eq!(Operator::Div.apply(1, 0), Err(CalcError::DivisionByZero));
        assert!(matches!(
            Operator::Mul.apply(i64::MAX, 2),
            Err(CalcError::Overflow { .. })
        ));
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&ExpressionStatus::Computed).unwrap();
        assert_eq!(json, "\"computed\"");
        assert_eq!(serde_json::to_string(&Operator::Mul).unwrap(), "\"*\"");
    }
}
