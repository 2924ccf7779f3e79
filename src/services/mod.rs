pub mod expression_service;
pub mod operator_service;

#[cfg(test)]
mod tests;

pub use expression_service::ExpressionService;
pub use operator_service::OperatorService;
