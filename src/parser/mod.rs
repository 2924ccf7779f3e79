//! Expression parsing
//!
//! Raw text goes through three stages, each of which can reject the input:
//!
//! 1. [`prepare::prepare_expression`] - normalize and validate the text
//! 2. [`tokens::tokenize`] - split it into operators and integer operands
//! 3. [`graph::DependencyGraph::build`] - group operands by parenthesis level
//!
//! ```ignore
//! let parsed = calcflow_core::parser::parse("(2+3)*4")?;
//! assert_eq!(parsed.graph.len(), 2);
//! ```

pub mod graph;
pub mod prepare;
pub mod tokens;


pub use graph::{DependencyGraph, Level, Operand};
pub use prepare::prepare_expression;
pub use tokens::{tokenize, Token, TokenStream};

use crate::errors::CalcError;

/// An expression that passed every validation stage
#[derive(Debug, Clone)]
pub struct ParsedExpression {
    /// Normalized text, as produced by [`prepare_expression`]
    pub normalized: String,
    pub tokens: TokenStream,
    pub graph: DependencyGraph,
}

pub fn parse(raw: &str) -> Result<ParsedExpression, CalcError> {
    let normalized = prepare_expression(raw)?;
    let tokens = tokenize(&normalized)?;
    let graph = DependencyGraph::build(&tokens)?;

    Ok(ParsedExpression {
        normalized,
        tokens,
        graph,
    })
}
