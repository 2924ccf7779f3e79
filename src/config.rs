//! Configuration loading
//!
//! Sources, later ones winning:
//!
//! 1. Built-in defaults
//! 2. A TOML file: the explicit path, else `CALCFLOW_CONFIG_PATH`, else
//!    `calcflow.toml` in the working directory if it exists
//! 3. Environment variables such as `CALCFLOW_OPERATORS__DIVISION_MS=10`
//! 4. Overrides given to [`ConfigBuilder`]
//!
//! A `.env` file is loaded first, so its variables count as environment.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use config::{Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

use crate::types::Operator;

const ENV_PREFIX: &str = "CALCFLOW";
const CONFIG_PATH_VAR: &str = "CALCFLOW_CONFIG_PATH";
const DEFAULT_CONFIG_FILE: &str = "calcflow.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub operators: OperatorsConfig,
    pub logging: LoggingConfig,
    pub evaluation: EvaluationConfig,
}

/// Simulated duration of each operator, in milliseconds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OperatorsConfig {
    pub addition_ms: u64,
    pub subtraction_ms: u64,
    pub multiplication_ms: u64,
    pub division_ms: u64,
}

impl Default for OperatorsConfig {
    fn default() -> Self {
        Self {
            addition_ms: 500,
            subtraction_ms: 750,
            multiplication_ms: 1000,
            division_ms: 1500,
        }
    }
}

impl OperatorsConfig {
    pub fn get(&self, operator: Operator) -> Duration {
        let ms = match operator {
            Operator::Add => self.addition_ms,
            Operator::Sub => self.subtraction_ms,
            Operator::Mul => self.multiplication_ms,
            Operator::Div => self.division_ms,
        };
        Duration::from_millis(ms)
    }

    pub fn set(&mut self, operator: Operator, duration: Duration) {
        let ms = duration.as_millis() as u64;
        match operator {
            Operator::Add => self.addition_ms = ms,
            Operator::Sub => self.subtraction_ms = ms,
            Operator::Mul => self.multiplication_ms = ms,
            Operator::Div => self.division_ms = ms,
        }
    }

    pub fn durations(&self) -> Vec<(Operator, Duration)> {
        Operator::ALL.into_iter().map(|op| (op, self.get(op))).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default tracing filter directive; `RUST_LOG` takes precedence
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    /// How often the CLI polls pending expressions
    pub poll_interval_ms: u64,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 250,
        }
    }
}

impl EvaluationConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Config {
    /// Load configuration with the default file search
    pub fn load() -> Result<Self> {
        Self::builder().build()
    }

    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Render as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to render configuration")
    }

    fn validate(&self) -> Result<()> {
        if self.logging.level.trim().is_empty() {
            bail!("logging.level must not be empty");
        }
        if self.evaluation.poll_interval_ms == 0 {
            bail!("evaluation.poll_interval_ms must be greater than zero");
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config_path: Option<PathBuf>,
    durations: Vec<(Operator, Duration)>,
    log_level: Option<String>,
}

impl ConfigBuilder {
    /// Set the config file path; the file must exist
    pub fn config_path(mut self, path: Option<PathBuf>) -> Self {
        self.config_path = path;
        self
    }

    /// Override one operator's duration
    pub fn duration(mut self, operator: Operator, duration: Duration) -> Self {
        self.durations.push((operator, duration));
        self
    }

    pub fn durations(mut self, durations: impl IntoIterator<Item = (Operator, Duration)>) -> Self {
        self.durations.extend(durations);
        self
    }

    pub fn log_level(mut self, level: Option<String>) -> Self {
        self.log_level = level;
        self
    }

    pub fn build(self) -> Result<Config> {
        dotenvy::dotenv().ok();

        let defaults = config::Config::try_from(&Config::default())
            .context("Failed to build default configuration")?;
        let mut builder = config::Config::builder().add_source(defaults);

        if let Some(path) = self.resolve_path()? {
            builder = builder.add_source(File::from(path.as_path()).format(FileFormat::Toml));
        }

        let mut config: Config = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to load configuration")?
            .try_deserialize()
            .context("Invalid configuration")?;

        for (operator, duration) in self.durations {
            config.operators.set(operator, duration);
        }
        if let Some(level) = self.log_level {
            config.logging.level = level;
        }

        config.validate()?;
        Ok(config)
    }

    fn resolve_path(&self) -> Result<Option<PathBuf>> {
        let explicit = self
            .config_path
            .clone()
            .or_else(|| std::env::var_os(CONFIG_PATH_VAR).map(PathBuf::from));

        match explicit {
            Some(path) if !path.exists() => {
                bail!("Config file not found: {}", path.display())
            }
            Some(path) => Ok(Some(path)),
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                Ok(default.exists().then(|| default.to_path_buf()))
            }
        }
    }
}
