//! Stateless initialization for calcflow
//!
//! Builds an [`Application`] from configuration: the shared operator timing
//! table, the in-flight registry and the services wired around them.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::debug;

use crate::config::Config;
use crate::evaluator::{Evaluator, InFlightRegistry, OperatorTimings};
use crate::services::{ExpressionService, OperatorService};
use crate::types::Operator;

/// The calcflow application instance with all services
pub struct Application {
    pub config: Config,
    pub expression_service: ExpressionService,
    pub operator_service: OperatorService,
}

impl Application {
    /// Create a new Application instance (pure instantiation, no I/O)
    pub fn new(config: Config) -> Self {
        let timings = OperatorTimings::new(config.operators.durations());
        let in_flight = InFlightRegistry::new();
        let evaluator = Evaluator::new(timings.clone(), in_flight.clone());

        Self {
            config,
            expression_service: ExpressionService::new(evaluator),
            operator_service: OperatorService::new(timings, in_flight),
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }
}

/// Options for initializing calcflow
#[derive(Debug, Clone, Default)]
pub struct InitOptions {
    /// Config file path (overrides default search)
    pub config_path: Option<String>,

    /// Operator durations (override config file and env vars)
    pub durations: Vec<(Operator, Duration)>,
}

/// Builder for constructing InitOptions
pub struct InitBuilder {
    options: InitOptions,
}

impl InitBuilder {
    /// Create a new builder with default options
    pub fn new() -> Self {
        Self {
            options: InitOptions::default(),
        }
    }

    /// Set the config file path
    pub fn config_path(mut self, path: impl Into<String>) -> Self {
        self.options.config_path = Some(path.into());
        self
    }

    /// Override the simulated duration of one operator
    pub fn duration(mut self, operator: Operator, duration: Duration) -> Self {
        self.options.durations.push((operator, duration));
        self
    }

    /// Initialize calcflow with the configured options
    pub fn init(self) -> Result<Application> {
        initialize(self.options)
    }
}

impl Default for InitBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Load configuration and return an Application instance
pub fn initialize(options: InitOptions) -> Result<Application> {
    let config = Config::builder()
        .config_path(options.config_path.map(PathBuf::from))
        .durations(options.durations)
        .build()
        .context("Failed to load configuration")?;

    debug!(?config, "Configuration loaded");

    Ok(Application::new(config))
}
