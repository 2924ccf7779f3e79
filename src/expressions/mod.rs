//! Expression entities: the lifecycle object callers poll for a result

pub mod entity;

pub use entity::{Expression, Outcome, OutcomeSender};
