//! Normalization and validation of raw expression text
//!
//! Turns user input into the canonical form consumed by the tokenizer:
//! whitespace removed, parentheses balanced, dangling operators trimmed and
//! redundant sign pairs collapsed. Anything that still looks malformed after
//! that is rejected here, before any evaluation work is scheduled.

use crate::errors::CalcError;
use crate::types::Operator;

/// Sign pairs and their replacements, applied until none remain
const SIGN_RULES: [(&str, &str); 3] = [("+-", "-"), ("--", "+"), ("++", "+")];

fn is_operator(c: char) -> bool {
    Operator::from_symbol(c).is_some()
}

fn is_allowed(c: char) -> bool {
    c.is_ascii_digit() || c == '(' || c == ')' || is_operator(c)
}

/// Validate and normalize raw expression text.
///
/// A leading or trailing operator is dropped rather than rejected, so
/// `"-5+3"` is read as `"5+3"`.
pub fn prepare_expression(raw: &str) -> Result<String, CalcError> {
    let stripped: String = raw.chars().filter(|c| !c.is_whitespace()).collect();

    check_parentheses(&stripped)?;

    let trimmed = stripped.trim_matches(is_operator);
    let collapsed = collapse_signs(trimmed);

    check_characters(&collapsed)?;

    Ok(collapsed)
}

fn check_parentheses(expr: &str) -> Result<(), CalcError> {
    let mut depth: i64 = 0;

    for (position, c) in expr.chars().enumerate() {
        match c {
            '(' => depth += 1,
            ')' => depth -= 1,
            _ => {}
        }

        if depth < 0 {
            return Err(CalcError::ExtraClosingParenthesis { position });
        }
    }

    if depth != 0 {
        return Err(CalcError::ExtraOpeningParenthesis);
    }

    Ok(())
}

/// Rewrite sign pairs to a fixed point. The rules are confluent, so the
/// order in which they fire does not change the result.
fn collapse_signs(expr: &str) -> String {
    let mut expr = expr.to_string();

    loop {
        let mut changed = false;
        for (pattern, replacement) in SIGN_RULES {
            if expr.contains(pattern) {
                expr = expr.replace(pattern, replacement);
                changed = true;
            }
        }

        if !changed {
            return expr;
        }
    }
}

fn check_characters(expr: &str) -> Result<(), CalcError> {
    let chars: Vec<char> = expr.chars().collect();

    for (i, &c) in chars.iter().enumerate() {
        if !is_allowed(c) {
            return Err(CalcError::ForeignCharacter(c));
        }

        if !is_operator(c) {
            continue;
        }

        let prev = i.checked_sub(1).and_then(|j| chars.get(j)).copied();
        let next = chars.get(i + 1).copied();

        if prev.is_some_and(is_operator) || next.is_some_and(is_operator) {
            let start = i.saturating_sub(1);
            let end = (i + 2).min(chars.len());
            return Err(CalcError::AdjacentOperators(
                chars[start..end].iter().collect(),
            ));
        }
    }

    Ok(())
}
