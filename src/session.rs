//! Line-oriented interactive session
//!
//! Reads one command per line and writes one or more response lines. Errors
//! are reported as `error: ...` lines and never end the session.

use std::time::Duration;

use anyhow::Result;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::application::Application;
use crate::errors::CalcError;
use crate::types::{ExpressionSnapshot, ExpressionStatus, Operator};

pub const HELP: &str = "\
commands:
  submit <id> <expr>    start evaluating an expression
  get <id>              current status without waiting
  wait <id>             wait for the result
  list                  every stored expression
  delete <id>...        forget expressions (evaluation keeps running)
  cancel <id>           stop an evaluation
  set <op> <ms>         change an operator's duration
  ops                   show operator durations
  estimate <expr>       estimated evaluation time
  inflight              operators currently being evaluated
  help                  show this text
  quit                  end the session";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    Submit { id: String, expression: String },
    Get(String),
    Wait(String),
    List,
    Delete(Vec<String>),
    Cancel(String),
    Set { operator: String, millis: String },
    Ops,
    Estimate(String),
    InFlight,
    Help,
    Quit,
}

impl SessionCommand {
    /// Parse one input line; `Ok(None)` for a blank line
    pub fn parse(line: &str) -> Result<Option<Self>, String> {
        let mut words = line.split_whitespace();
        let Some(command) = words.next() else {
            return Ok(None);
        };
        let args: Vec<&str> = words.collect();

        let one = |usage: &str| match args.as_slice() {
            [arg] => Ok(arg.to_string()),
            _ => Err(format!("usage: {usage}")),
        };

        let command = match command.to_ascii_lowercase().as_str() {
            "submit" => match args.split_first() {
                Some((id, rest)) if !rest.is_empty() => SessionCommand::Submit {
                    id: id.to_string(),
                    expression: rest.concat(),
                },
                _ => return Err("usage: submit <id> <expr>".to_string()),
            },
            "get" => SessionCommand::Get(one("get <id>")?),
            "wait" => SessionCommand::Wait(one("wait <id>")?),
            "list" => SessionCommand::List,
            "delete" if !args.is_empty() => {
                SessionCommand::Delete(args.iter().map(|s| s.to_string()).collect())
            }
            "delete" => return Err("usage: delete <id>...".to_string()),
            "cancel" => SessionCommand::Cancel(one("cancel <id>")?),
            "set" => match args.as_slice() {
                [operator, millis] => SessionCommand::Set {
                    operator: operator.to_string(),
                    millis: millis.to_string(),
                },
                _ => return Err("usage: set <op> <ms>".to_string()),
            },
            "ops" => SessionCommand::Ops,
            "estimate" if !args.is_empty() => SessionCommand::Estimate(args.concat()),
            "estimate" => return Err("usage: estimate <expr>".to_string()),
            "inflight" => SessionCommand::InFlight,
            "help" | "?" => SessionCommand::Help,
            "quit" | "exit" => SessionCommand::Quit,
            other => return Err(format!("unknown command: {other}")),
        };

        Ok(Some(command))
    }
}

/// Run a session until `quit` or end of input
pub async fn run_session<R, W>(app: &Application, input: R, output: &mut W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();

    while let Some(line) = lines.next_line().await? {
        let command = match SessionCommand::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(message) => {
                output.write_all(format!("error: {message}\n").as_bytes()).await?;
                output.flush().await?;
                continue;
            }
        };

        if command == SessionCommand::Quit {
            break;
        }

        let response = match execute(app, command).await {
            Ok(response) => response,
            Err(e) => format!("error: {e}"),
        };
        output.write_all(response.as_bytes()).await?;
        output.write_all(b"\n").await?;
        output.flush().await?;
    }

    Ok(())
}

async fn execute(app: &Application, command: SessionCommand) -> Result<String, CalcError> {
    let expressions = &app.expression_service;
    let operators = &app.operator_service;

    let response = match command {
        SessionCommand::Submit { id, expression } => {
            let submitted = expressions.submit(id.as_str(), &expression).await?;
            format!(
                "accepted {} {} (estimated {})",
                id,
                submitted.source(),
                format_millis(submitted.estimated())
            )
        }
        SessionCommand::Get(id) => format_snapshot(&expressions.get(&id).await?.snapshot()),
        SessionCommand::Wait(id) => {
            let expression = expressions.get(&id).await?;
            // The outcome is reported through the snapshot
            let _ = expression.wait().await;
            format_snapshot(&expression.snapshot())
        }
        SessionCommand::List => {
            let snapshots = expressions.list().await;
            if snapshots.is_empty() {
                "(no expressions)".to_string()
            } else {
                snapshots
                    .iter()
                    .map(format_snapshot)
                    .collect::<Vec<_>>()
                    .join("\n")
            }
        }
        SessionCommand::Delete(ids) => format!("deleted {}", expressions.delete(&ids[..]).await),
        SessionCommand::Cancel(id) => {
            expressions.cancel(&id).await?;
            format!("cancel requested for {id}")
        }
        SessionCommand::Set { operator, millis } => {
            operators.reconfigure_millis(&[(operator, millis)])?;
            format_durations(&operators.durations())
        }
        SessionCommand::Ops => format_durations(&operators.durations()),
        SessionCommand::Estimate(expression) => format_millis(operators.estimate(&expression)?),
        SessionCommand::InFlight => {
            let in_flight = operators.in_flight();
            if in_flight.is_empty() {
                "(idle)".to_string()
            } else {
                format_operators(&in_flight)
            }
        }
        SessionCommand::Help => HELP.to_string(),
        SessionCommand::Quit => String::new(),
    };

    Ok(response)
}

pub fn format_millis(duration: Duration) -> String {
    format!("{}ms", duration.as_millis())
}

pub fn format_operators(operators: &[Operator]) -> String {
    operators
        .iter()
        .map(|op| op.symbol().to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn format_durations(durations: &[(Operator, Duration)]) -> String {
    durations
        .iter()
        .map(|(op, duration)| format!("{} {:<14} {}", op, op.name(), format_millis(*duration)))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_snapshot(snapshot: &ExpressionSnapshot) -> String {
    let outcome = match snapshot.status {
        ExpressionStatus::Pending => format!("(estimated {}ms)", snapshot.estimated_ms),
        ExpressionStatus::Computed => match snapshot.value {
            Some(value) => format!("= {value}"),
            None => String::new(),
        },
        ExpressionStatus::Failed => snapshot.error.clone().unwrap_or_default(),
    };

    format!(
        "{} {} {} {}",
        snapshot.id,
        snapshot.status.label(),
        snapshot.expression,
        outcome
    )
}
