//! Left-to-right scan of a normalized expression into operators and operands

use crate::errors::CalcError;
use crate::types::Operator;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    Open,
    Close,
    Op(Operator),
}

impl Token {
    fn from_char(c: char) -> Option<Token> {
        match c {
            '(' => Some(Token::Open),
            ')' => Some(Token::Close),
            _ => Operator::from_symbol(c).map(Token::Op),
        }
    }
}

/// Operators and parentheses in encounter order, paired with the integer
/// operands found between them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenStream {
    pub queue: Vec<Token>,
    pub values: Vec<i64>,
}

impl TokenStream {
    /// Arithmetic operators only, parentheses skipped
    pub fn operators(&self) -> impl Iterator<Item = Operator> + '_ {
        self.queue.iter().filter_map(|token| match token {
            Token::Op(op) => Some(*op),
            _ => None,
        })
    }
}

pub fn tokenize(expr: &str) -> Result<TokenStream, CalcError> {
    let mut stream = TokenStream::default();
    let mut operand = String::new();

    for c in expr.chars() {
        match Token::from_char(c) {
            Some(token) => {
                flush_operand(&mut operand, &mut stream.values)?;
                stream.queue.push(token);
            }
            None => operand.push(c),
        }
    }

    flush_operand(&mut operand, &mut stream.values)?;

    Ok(stream)
}

fn flush_operand(operand: &mut String, values: &mut Vec<i64>) -> Result<(), CalcError> {
    if operand.is_empty() {
        return Ok(());
    }

    let value = operand.parse::<i64>().map_err(|_| {
        if operand.chars().all(|c| c.is_ascii_digit()) {
            CalcError::OperandOutOfRange(operand.clone())
        } else {
            CalcError::ExtraneousCharacters(operand.clone())
        }
    })?;

    values.push(value);
    operand.clear();
    Ok(())
}
