use crate::types::Operator;

/// Order in which a level's operators are folded: every `*` and `/` left to
/// right, then every `+` and `-` left to right.
pub fn fold_order(operators: &[Operator]) -> Vec<usize> {
    let (strong, weak): (Vec<usize>, Vec<usize>) =
        (0..operators.len()).partition(|&i| operators[i].is_multiplicative());

    strong.into_iter().chain(weak).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Operator::*;

    #[test]
    fn test_multiplicative_first() {
        assert_eq!(fold_order(&[Add, Mul]), vec![1, 0]);
        assert_eq!(fold_order(&[Sub, Add, Mul, Div]), vec![2, 3, 0, 1]);
    }

    #[test]
    fn test_stable_within_bucket() {
        assert_eq!(fold_order(&[Div, Sub, Mul, Add]), vec![0, 2, 1, 3]);
        assert_eq!(fold_order(&[Add, Sub, Add]), vec![0, 1, 2]);
    }

    #[test]
    fn test_empty_level() {
        assert!(fold_order(&[]).is_empty());
    }
}
