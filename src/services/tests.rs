//! Tests for the expression and operator services

use std::collections::HashMap;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use maplit::hashmap;
use tokio::time::Instant;
use tokio_test::{assert_err, assert_ok};

use super::*;
use crate::errors::CalcError;
use crate::evaluator::{Evaluator, InFlightRegistry, OperatorTimings};
use crate::types::{ExpressionStatus, Operator};

// ============================================================================
// Helper Functions
// ============================================================================

fn services(durations: HashMap<Operator, Duration>) -> (ExpressionService, OperatorService) {
    let timings = OperatorTimings::new(durations);
    let in_flight = InFlightRegistry::new();

    (
        ExpressionService::new(Evaluator::new(timings.clone(), in_flight.clone())),
        OperatorService::new(timings, in_flight),
    )
}

fn default_durations() -> HashMap<Operator, Duration> {
    hashmap! {
        Operator::Add => Duration::from_millis(500),
        Operator::Sub => Duration::from_millis(750),
        Operator::Mul => Duration::from_millis(1000),
        Operator::Div => Duration::from_millis(1500),
    }
}

// ============================================================================
// Submission
// ============================================================================

#[tokio::test]
async fn test_submit_and_wait() {
    let (expressions, _) = services(HashMap::new());

    let expression = assert_ok!(expressions.submit("a", " 2 + 2 * 2 ").await);
    assert_eq!(expression.source(), "2+2*2");

    assert_eq!(expressions.wait("a").await, Ok(6));
    assert_eq!(expressions.poll("a").await, Ok(Some(6)));
    assert_eq!(expression.status(), ExpressionStatus::Computed);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_duplicate_id_rejected_exactly_once() {
    let (expressions, _) = services(HashMap::new());

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let expressions = expressions.clone();
            tokio::spawn(async move { expressions.submit("same", "1+1").await })
        })
        .collect();

    let mut accepted = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => accepted += 1,
            Err(e) => assert_eq!(e, CalcError::DuplicateId("same".to_string())),
        }
    }

    assert_eq!(accepted, 1);
    assert_eq!(expressions.len().await, 1);
}

#[tokio::test]
async fn test_duplicate_of_finished_expression_is_rejected() {
    let (expressions, _) = services(HashMap::new());

    assert_ok!(expressions.submit("a", "1+1").await);
    expressions.wait_idle().await;

    let err = assert_err!(expressions.submit("a", "2+2").await);
    assert_eq!(err, CalcError::DuplicateId("a".to_string()));
    assert_eq!(expressions.poll("a").await, Ok(Some(2)));
}

#[tokio::test(start_paused = true)]
async fn test_distinct_expressions_evaluate_concurrently() {
    let (expressions, _) = services(hashmap! {
        Operator::Add => Duration::from_millis(100),
    });

    let start = Instant::now();
    for i in 1..=10 {
        assert_ok!(expressions.submit(format!("expr-{i}"), &format!("{i}+{i}")).await);
    }
    assert_eq!(expressions.running(), 10);

    expressions.wait_idle().await;

    let elapsed = start.elapsed();
    assert!(elapsed < Duration::from_millis(200), "took {elapsed:?}");

    for i in 1..=10 {
        assert_eq!(expressions.poll(&format!("expr-{i}")).await, Ok(Some(2 * i)));
    }
    assert_eq!(expressions.running(), 0);
}

#[tokio::test]
async fn test_validation_errors_never_enter_the_collection() {
    let (expressions, _) = services(HashMap::new());

    let cases = [
        ("2+", CalcError::TooFewArguments),
        ("+", CalcError::TooFewArguments),
        ("()", CalcError::TooFewArguments),
        ("(2+3", CalcError::ExtraOpeningParenthesis),
        ("2+3)", CalcError::ExtraClosingParenthesis { position: 3 }),
        ("2+a", CalcError::ForeignCharacter('a')),
    ];

    for (raw, expected) in cases {
        let err = assert_err!(expressions.submit(raw, raw).await);
        assert_eq!(err, expected, "input {raw:?}");
        assert!(err.is_validation());
    }

    assert!(expressions.is_empty().await);
    assert_eq!(expressions.running(), 0);
}

// ============================================================================
// Lifecycle
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_poll_is_pending_until_computed() {
    let (expressions, _) = services(hashmap! {
        Operator::Mul => Duration::from_millis(1000),
    });

    assert_ok!(expressions.submit("m", "6*7").await);
    assert_eq!(expressions.poll("m").await, Ok(None));

    tokio::time::sleep(Duration::from_millis(1100)).await;
    assert_eq!(expressions.poll("m").await, Ok(Some(42)));
}

#[tokio::test]
async fn test_unknown_id_is_not_found() {
    let (expressions, _) = services(HashMap::new());

    let err = assert_err!(expressions.poll("missing").await);
    assert_eq!(err, CalcError::NotFound("missing".to_string()));
    assert!(!err.is_validation());
    assert!(expressions.cancel("missing").await.is_err());
}

#[tokio::test]
async fn test_failure_is_local_to_one_expression() {
    let (expressions, _) = services(HashMap::new());

    assert_ok!(expressions.submit("bad", "10/(5-5)").await);
    assert_ok!(expressions.submit("good", "10/(5+5)").await);
    expressions.wait_idle().await;

    assert_eq!(expressions.poll("bad").await, Err(CalcError::DivisionByZero));
    assert_eq!(expressions.poll("good").await, Ok(Some(1)));

    let bad = assert_ok!(expressions.get("bad").await);
    assert_eq!(bad.status(), ExpressionStatus::Failed);
}

#[tokio::test(start_paused = true)]
async fn test_delete_does_not_stop_evaluation() {
    let (expressions, _) = services(hashmap! {
        Operator::Add => Duration::from_millis(500),
    });

    let expression = assert_ok!(expressions.submit("d", "1+2").await);
    assert_eq!(expressions.delete(&["d", "unknown"]).await, 1);
    assert!(expressions.get("d").await.is_err());

    expressions.wait_idle().await;
    assert_eq!(expression.poll(), Ok(Some(3)));
}

#[tokio::test(start_paused = true)]
async fn test_cancel_fails_the_expression() {
    let (expressions, operators) = services(hashmap! {
        Operator::Add => Duration::from_secs(60),
    });

    assert_ok!(expressions.submit("c", "(1+2)*(3+4)").await);
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(operators.in_flight(), vec![Operator::Add, Operator::Add]);

    assert_ok!(expressions.cancel("c").await);
    assert_eq!(expressions.wait("c").await, Err(CalcError::Cancelled));
    assert!(operators.in_flight().is_empty());
}

#[tokio::test]
async fn test_cancel_after_completion_keeps_result() {
    let (expressions, _) = services(HashMap::new());

    assert_ok!(expressions.submit("x", "3*3").await);
    assert_eq!(expressions.wait("x").await, Ok(9));

    assert_ok!(expressions.cancel("x").await);
    assert_eq!(expressions.poll("x").await, Ok(Some(9)));
}

#[tokio::test]
async fn test_restore_and_list() {
    let (expressions, _) = services(default_durations());

    let earlier = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
    assert_ok!(expressions.restore("old", "2+3*4", earlier, 14).await);
    assert_ok!(expressions.submit("new", "1+1").await);
    expressions.wait_idle().await;

    let list = expressions.list().await;
    let ids: Vec<&str> = list.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["old", "new"]);

    assert_eq!(list[0].status, ExpressionStatus::Computed);
    assert_eq!(list[0].value, Some(14));
    assert_eq!(list[0].estimated_ms, 1500);
    assert_eq!(list[1].value, Some(2));

    let err = assert_err!(expressions.restore("old", "1", earlier, 1).await);
    assert_eq!(err, CalcError::DuplicateId("old".to_string()));
}

#[tokio::test]
async fn test_list_serializes_for_hosts() {
    let (expressions, _) = services(HashMap::new());
    assert_ok!(expressions.submit("s", "5-7").await);
    expressions.wait_idle().await;

    let json = serde_json::to_value(expressions.list().await).unwrap();
    assert_eq!(json[0]["id"], "s");
    assert_eq!(json[0]["status"], "computed");
    assert_eq!(json[0]["value"], -2);
}

// ============================================================================
// Operators
// ============================================================================

#[tokio::test]
async fn test_estimate_uses_current_durations() {
    let (expressions, operators) = services(default_durations());

    assert_eq!(operators.estimate("2+3*4"), Ok(Duration::from_millis(1500)));

    let expression = assert_ok!(expressions.submit("e", "2+3*4").await);
    assert_eq!(expression.estimated(), Duration::from_millis(1500));

    operators.reconfigure([(Operator::Mul, Duration::from_millis(10))]);
    assert_eq!(operators.estimate("2+3*4"), Ok(Duration::from_millis(510)));
    assert!(operators.estimate("2+(3").is_err());
}

#[test]
fn test_reconfigure_from_text() {
    let (_, operators) = services(default_durations());

    assert_ok!(operators.reconfigure_millis(&[("+", "-250"), ("division", "10")]));
    assert_eq!(operators.duration(Operator::Add), Duration::from_millis(250));
    assert_eq!(operators.duration(Operator::Div), Duration::from_millis(10));
    assert_eq!(operators.duration(Operator::Sub), Duration::from_millis(750));
}

#[test]
fn test_bad_reconfiguration_changes_nothing() {
    let (_, operators) = services(default_durations());

    let err = assert_err!(operators.reconfigure_millis(&[("*", "5"), ("-", "soon")]));
    assert!(matches!(err, CalcError::InvalidDuration { operator: Operator::Sub, .. }));

    let err = assert_err!(operators.reconfigure_millis(&[("modulo", "5")]));
    assert_eq!(err, CalcError::UnknownOperator("modulo".to_string()));

    assert_eq!(operators.durations(), {
        let mut expected: Vec<_> = default_durations().into_iter().collect();
        expected.sort_by_key(|(op, _)| Operator::ALL.iter().position(|o| o == op));
        expected
    });
}
