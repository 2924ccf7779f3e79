//! Calcflow: concurrent evaluation of arithmetic expressions
//!
//! Expressions are validated and decomposed into a graph of parenthesis
//! levels, then evaluated with every operator application waiting out a
//! configurable simulated duration. Independent levels run concurrently.

pub mod application;
pub mod cli;
pub mod config;
pub mod errors;
pub mod evaluator;
pub mod expressions;
pub mod parser;
pub mod services;
pub mod session;
pub mod types;

// Re-export main types
pub use errors::{CalcError, ErrorKind};
pub use types::*;

// Re-export init API for convenience
pub use application::{initialize, Application, InitBuilder, InitOptions};
