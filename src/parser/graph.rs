//! Decomposition of a token stream into a dependency graph of levels
//!
//! Level 0 is the top-level expression; every parenthesized group gets its
//! own level, numbered in the order its `(` was opened. A level holds its
//! operators and operands; an operand is either a literal or a reference to
//! another level whose result has to be computed first.
//!
//! Operands are assigned as the scan goes: whenever a level has just been
//! closed, the next operand slot takes that level's result by reference,
//! otherwise it takes the next unconsumed literal. This is what lets literals
//! and nested results interleave inside one operand list.

use serde::Serialize;

use crate::errors::CalcError;
use crate::parser::tokens::{Token, TokenStream};
use crate::types::Operator;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "t", content = "v")]
pub enum Operand {
    Literal(i64),
    /// Result of the level with this index
    Reference(usize),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Level {
    pub operators: Vec<Operator>,
    pub operands: Vec<Operand>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyGraph {
    levels: Vec<Level>,
}

impl DependencyGraph {
    /// Build the graph and check every level's arity.
    pub fn build(tokens: &TokenStream) -> Result<Self, CalcError> {
        let graph = GraphBuilder::new(&tokens.values).run(&tokens.queue)?;
        graph.validate()?;
        Ok(graph)
    }

    pub fn levels(&self) -> &[Level] {
        &self.levels
    }

    pub fn level(&self, index: usize) -> Option<&Level> {
        self.levels.get(index)
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Every level needs one more operand than operators, and at least one
    /// operator. References must name another, nested level.
    pub fn validate(&self) -> Result<(), CalcError> {
        for (index, level) in self.levels.iter().enumerate() {
            if level.operators.len() + 1 != level.operands.len() {
                return Err(CalcError::IncorrectExpression);
            }
            if level.operators.is_empty() || level.operands.len() < 2 {
                return Err(CalcError::TooFewArguments);
            }

            let bad_reference = level.operands.iter().any(|operand| match operand {
                Operand::Reference(target) => {
                    *target == 0 || *target == index || *target >= self.levels.len()
                }
                Operand::Literal(_) => false,
            });
            if bad_reference {
                return Err(CalcError::IncorrectExpression);
            }
        }

        Ok(())
    }
}

struct GraphBuilder<'a> {
    levels: Vec<Level>,
    /// Indices of the levels currently open, innermost last
    stack: Vec<usize>,
    values: std::slice::Iter<'a, i64>,
    /// A level that closed and has not yet been consumed as an operand
    pending: Option<usize>,
}

impl<'a> GraphBuilder<'a> {
    fn new(values: &'a [i64]) -> Self {
        Self {
            levels: vec![Level::default()],
            stack: vec![0],
            values: values.iter(),
            pending: None,
        }
    }

    fn run(mut self, queue: &[Token]) -> Result<DependencyGraph, CalcError> {
        // Level touched by the most recent operator or closing parenthesis
        let mut current = 0;

        for (i, token) in queue.iter().enumerate() {
            match token {
                Token::Open => {
                    self.stack.push(self.levels.len());
                    self.levels.push(Level::default());
                }

                Token::Close => {
                    if self.stack.len() < 2 {
                        return Err(CalcError::IncorrectExpression);
                    }
                    current = self.top();

                    let operand = self.take_operand()?;
                    self.levels[current].operands.push(operand);

                    self.pending = Some(current);
                    self.stack.pop();

                    if i == queue.len() - 1 {
                        let parent = self.top();
                        self.levels[parent].operands.push(Operand::Reference(current));
                    }
                }

                Token::Op(op) => {
                    current = self.top();

                    let operand = self.take_operand()?;
                    let level = &mut self.levels[current];
                    level.operands.push(operand);
                    level.operators.push(*op);
                }
            }
        }

        if current == 0 {
            let operand = self.take_operand()?;
            self.levels[0].operands.push(operand);
        }

        if self.values.next().is_some() {
            return Err(CalcError::IncorrectExpression);
        }

        Ok(DependencyGraph {
            levels: self.levels,
        })
    }

    fn top(&self) -> usize {
        self.stack.last().copied().unwrap_or(0)
    }

    fn take_operand(&mut self) -> Result<Operand, CalcError> {
        if let Some(level) = self.pending.take() {
            return Ok(Operand::Reference(level));
        }

        self.values
            .next()
            .copied()
            .map(Operand::Literal)
            .ok_or(CalcError::TooFewArguments)
    }
}
