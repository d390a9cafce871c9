//! # Typed Queue CLI
//!
//! Command-line interface for sending text values to an AWS SQS queue.
//!
//! This module provides CLI commands for:
//! - Sending a single value
//! - Sending the lines of a file, or standard input, in batches
//! - Resolving a queue name to its URL
//! - Showing the resolved configuration
//!
//! ## Configuration
//!
//! Sources, applied in order with later sources overriding earlier ones:
//! 1. Built-in defaults
//! 2. The file given by `--config` or `TYPED_QUEUE_CONFIG` (format taken from
//!    the file extension)
//! 3. Environment variables prefixed `TYPED_QUEUE__`, with `__` separating
//!    nested keys, e.g. `TYPED_QUEUE__SQS__REGION=eu-west-1`

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use typed_queue::{
    ConfigurationError, EntryOutcome, HttpSqsClient, OutputQueue, OutputQueueConfig,
    QueueEndpoint, QueueError, SqsClientConfig, SqsOutputQueue, TextCodec,
};

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;

/// Prefix of environment variables read as configuration
pub const ENV_PREFIX: &str = "TYPED_QUEUE";

const REDACTED: &str = "<redacted>";

// ============================================================================
// CLI Structure
// ============================================================================

/// Typed Queue CLI - send values to AWS SQS
#[derive(Parser, Debug)]
#[command(name = "typed-queue")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Send values to an AWS SQS queue")]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "TYPED_QUEUE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Queue URL, overriding `queue.url` from the configuration
    #[arg(short, long)]
    pub queue_url: Option<String>,

    /// Logging level or filter directive, overriding `logging.level`
    #[arg(short, long)]
    pub log_level: Option<String>,

    /// Enable JSON logging
    #[arg(long)]
    pub json_logs: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Send one value and print its message ID
    Send {
        /// Value to send, verbatim
        value: String,
    },

    /// Send every non-blank line of the input as one value, in batches
    SendMany {
        /// File to read values from; standard input when omitted
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Print the URL of a queue
    Resolve {
        /// Name of the queue
        queue_name: String,
    },

    /// Show the resolved configuration with secrets redacted
    Config {
        /// Output format
        #[arg(short = 'f', long, default_value = "yaml")]
        format: ConfigFormat,
    },
}

/// Configuration format options
#[derive(Clone, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum ConfigFormat {
    /// YAML format
    Yaml,
    /// JSON format
    Json,
    /// TOML format
    Toml,
}

// ============================================================================
// CLI Error Types
// ============================================================================

/// CLI-specific errors
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("{failed} of {total} values were not sent")]
    PartialFailure { failed: usize, total: usize },

    #[error("Invalid argument: {arg} - {message}")]
    InvalidArgument { arg: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Configuration(_) => 1,
            Self::Queue(QueueError::Configuration(_)) => 1,
            Self::Queue(_) => 2,
            Self::PartialFailure { .. } => 2,
            Self::InvalidArgument { .. } => 3,
            Self::Io(_) => 4,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(#[from] ConfigurationError),

    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Missing required configuration: {key}")]
    MissingRequired { key: String },

    #[error("Failed to render configuration: {message}")]
    Render { message: String },
}

// ============================================================================
// Configuration Types
// ============================================================================

/// CLI configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CliConfig {
    /// Target queue
    pub queue: QueueSettings,

    /// SQS network client
    pub sqs: SqsClientConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Target queue settings
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct QueueSettings {
    pub url: Option<String>,
    pub batch_limit: Option<usize>,
    pub max_item_size: Option<usize>,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

/// Log format options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
pub enum LogFormat {
    #[default]
    #[serde(rename = "text")]
    Text,
    #[serde(rename = "json")]
    Json,
}

impl CliConfig {
    /// Copy of the configuration that is safe to print
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        if let Some(secret) = config.sqs.secret_access_key.as_mut() {
            *secret = REDACTED.to_string();
        }
        if let Some(token) = config.sqs.session_token.as_mut() {
            *token = REDACTED.to_string();
        }
        config
    }

    /// Build the output queue configuration, preferring an explicit queue URL
    pub fn resolve_queue_config(
        &self,
        queue_url_override: Option<&str>,
    ) -> Result<OutputQueueConfig, CliError> {
        let endpoint = match queue_url_override {
            Some(url) => QueueEndpoint::new(url).map_err(|e| CliError::InvalidArgument {
                arg: "--queue-url".to_string(),
                message: e.to_string(),
            })?,
            None => {
                let url = self
                    .queue
                    .url
                    .as_deref()
                    .ok_or_else(|| ConfigError::MissingRequired {
                        key: "queue.url".to_string(),
                    })?;
                QueueEndpoint::new(url).map_err(|e| ConfigError::InvalidValue {
                    key: "queue.url".to_string(),
                    message: e.to_string(),
                })?
            }
        };

        let mut queue_config = OutputQueueConfig::new(endpoint);
        queue_config.batch_limit = self.queue.batch_limit;
        queue_config.max_item_size = self.queue.max_item_size;
        Ok(queue_config)
    }
}

/// Load configuration from an optional file and the environment
pub fn load_configuration(config_path: Option<&Path>) -> Result<CliConfig, ConfigError> {
    let mut builder = config::Config::builder();

    if let Some(path) = config_path {
        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        builder = builder.add_source(config::File::from(path).required(true));
    }

    let settings = builder
        .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
        .build()?;

    let config: CliConfig = settings.try_deserialize()?;
    config.sqs.validate()?;

    Ok(config)
}

/// Render configuration in the requested format
pub fn render_config(config: &CliConfig, format: &ConfigFormat) -> Result<String, ConfigError> {
    let render_error = |message: String| ConfigError::Render { message };

    match format {
        ConfigFormat::Yaml => serde_yaml::to_string(config).map_err(|e| render_error(e.to_string())),
        ConfigFormat::Json => {
            serde_json::to_string_pretty(config).map_err(|e| render_error(e.to_string()))
        }
        ConfigFormat::Toml => toml::to_string_pretty(config).map_err(|e| render_error(e.to_string())),
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

/// Run a parsed command line
pub async fn run_cli(cli: Cli) -> Result<(), CliError> {
    let config = load_configuration(cli.config.as_deref())?;

    initialize_logging(cli.log_level.as_deref(), cli.json_logs, &config.logging)?;
    debug!(config_file = ?cli.config, "Configuration loaded");

    let queue_url = cli.queue_url.as_deref();
    match cli.command {
        Commands::Send { value } => execute_send_command(&config, queue_url, value).await,
        Commands::SendMany { file } => {
            execute_send_many_command(&config, queue_url, file.as_deref()).await
        }
        Commands::Resolve { queue_name } => execute_resolve_command(&config, &queue_name).await,
        Commands::Config { format } => execute_config_command(&config, &format),
    }
}

fn initialize_logging(
    level_override: Option<&str>,
    json_logs: bool,
    logging: &LoggingConfig,
) -> Result<(), CliError> {
    let level = level_override.unwrap_or(&logging.level);
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(level).map_err(|e| CliError::InvalidArgument {
            arg: "--log-level".to_string(),
            message: e.to_string(),
        })?,
    };

    // Logs go to stderr so that command output on stdout stays scriptable
    let registry = tracing_subscriber::registry().with(filter);
    let result = if json_logs || logging.format == LogFormat::Json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .try_init()
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init()
    };

    if result.is_err() {
        debug!("A global subscriber is already installed");
    }

    Ok(())
}

// ============================================================================
// Command Implementations
// ============================================================================

type CliOutputQueue = SqsOutputQueue<String, HttpSqsClient, TextCodec>;

fn build_client(config: &CliConfig) -> Result<Arc<HttpSqsClient>, CliError> {
    let client = HttpSqsClient::new(config.sqs.clone()).map_err(ConfigError::from)?;
    Ok(Arc::new(client))
}

fn build_queue(config: &CliConfig, queue_url: Option<&str>) -> Result<CliOutputQueue, CliError> {
    let queue_config = config.resolve_queue_config(queue_url)?;
    let client = build_client(config)?;
    Ok(SqsOutputQueue::with_codec(client, queue_config, TextCodec)?)
}

async fn execute_send_command(
    config: &CliConfig,
    queue_url: Option<&str>,
    value: String,
) -> Result<(), CliError> {
    if value.is_empty() {
        return Err(CliError::InvalidArgument {
            arg: "VALUE".to_string(),
            message: "value must not be empty".to_string(),
        });
    }

    let queue = build_queue(config, queue_url)?;
    info!(queue = %queue.endpoint(), "Sending value");

    let message = queue.send(value).await?;
    if let Some(message_id) = message.message_id() {
        println!("{}", message_id);
    }

    Ok(())
}

async fn execute_send_many_command(
    config: &CliConfig,
    queue_url: Option<&str>,
    file: Option<&Path>,
) -> Result<(), CliError> {
    let queue = build_queue(config, queue_url)?;
    let values = read_values(file)?;
    info!(queue = %queue.endpoint(), values = values.len(), "Sending values");

    let outcomes = queue.send_many_with_outcomes(values).await?;

    let mut failed = 0usize;
    for (index, outcome) in outcomes.iter().enumerate() {
        if let EntryOutcome::Failed { code, message, .. } = outcome {
            failed += 1;
            warn!(value = index + 1, code = %code, "Value was not sent");
            eprintln!("value {}: {} - {}", index + 1, code, message);
        }
    }

    println!("sent {}, failed {}", outcomes.len() - failed, failed);

    if failed > 0 {
        return Err(CliError::PartialFailure {
            failed,
            total: outcomes.len(),
        });
    }

    Ok(())
}

/// Read non-blank lines from a file or standard input
fn read_values(file: Option<&Path>) -> Result<Vec<String>, CliError> {
    let lines = match file {
        Some(path) => BufReader::new(std::fs::File::open(path)?)
            .lines()
            .collect::<Result<Vec<_>, _>>()?,
        None => std::io::stdin()
            .lock()
            .lines()
            .collect::<Result<Vec<_>, _>>()?,
    };

    Ok(lines
        .into_iter()
        .filter(|line| !line.trim().is_empty())
        .collect())
}

async fn execute_resolve_command(config: &CliConfig, queue_name: &str) -> Result<(), CliError> {
    let client = build_client(config)?;
    let endpoint = client
        .get_queue_url(queue_name)
        .await
        .map_err(QueueError::from)?;

    println!("{}", endpoint);
    Ok(())
}

fn execute_config_command(config: &CliConfig, format: &ConfigFormat) -> Result<(), CliError> {
    let rendered = render_config(&config.redacted(), format)?;
    println!("{}", rendered.trim_end());
    Ok(())
}
