//! # MQ Client CLI
//!
//! Command-line interface for named message queues.
//!
//! This module provides CLI commands for:
//! - Creating and deleting queues
//! - Sending text messages with label, correlation id, priority, and transaction mode
//! - Receiving and peeking with a timeout
//! - Showing the resolved configuration and a queue's direct format name
//!
//! Queues live in a directory on the local machine (see [`CliConfig::root`]),
//! so separate `mqc` invocations and other processes using the file-system
//! transport see the same queues.

use clap::{CommandFactory, Parser, Subcommand};
use mq_client::{
    ClientConfig, CorrelationId, FileSystemConfig, Message, MessageReceiver, MessageSender,
    Priority, QueueAdmin, QueueError, ReceiveAction, ReceiveOnly, ReceiveTimeout, SendOnly,
    SendOptions, TransactionMode, TransportConfig,
};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;

// ============================================================================
// CLI Structure
// ============================================================================

/// mqc - create, feed, and drain named message queues
#[derive(Parser)]
#[command(name = "mqc")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Create, feed, and drain named message queues")]
pub struct Cli {
    /// Configuration file path (TOML)
    #[arg(short, long, env = "MQC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory holding the queues, overrides the configured root
    #[arg(short, long)]
    pub root: Option<PathBuf>,

    /// Logging level, overrides the configured level
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
#[derive(Subcommand)]
pub enum Commands {
    /// Create a queue
    Create {
        /// Queue path, e.g. .\private$\orders
        path: String,

        /// Descriptive queue label
        #[arg(short, long, default_value = "")]
        label: String,

        /// Create a transactional queue
        #[arg(short, long)]
        transactional: bool,
    },

    /// Delete a queue
    Delete {
        /// Queue path
        path: String,
    },

    /// Send a text message
    Send {
        /// Queue path or direct format name
        queue: String,

        /// Message body
        text: String,

        /// Message label
        #[arg(short, long, default_value = "")]
        label: String,

        /// Correlation id, at most 20 bytes
        #[arg(short, long)]
        correlation_id: Option<String>,

        /// Send with high priority
        #[arg(long)]
        high_priority: bool,

        /// Transaction mode for the send
        #[arg(short, long, default_value = "none")]
        transaction: TransactionArg,
    },

    /// Remove and print the next message
    Receive {
        /// Queue path or direct format name
        queue: String,

        /// Milliseconds to wait for a message; 0 waits forever
        #[arg(short, long)]
        timeout_ms: Option<u64>,

        /// Output format
        #[arg(short, long)]
        format: Option<OutputFormat>,
    },

    /// Print the next message without removing it
    Peek {
        /// Queue path or direct format name
        queue: String,

        /// Milliseconds to wait for a message; 0 waits forever
        #[arg(short, long)]
        timeout_ms: Option<u64>,

        /// Output format
        #[arg(short, long)]
        format: Option<OutputFormat>,
    },

    /// Print the direct format name for a queue path
    FormatName {
        /// Queue path
        path: String,
    },

    /// Show resolved configuration
    Config {
        /// Output format for configuration
        #[arg(short = 'f', long, default_value = "toml")]
        format: ConfigFormat,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// Transaction modes selectable from the command line
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum TransactionArg {
    /// Send outside any transaction
    None,
    /// Wrap the send in its own transaction
    Single,
}

impl From<TransactionArg> for TransactionMode {
    fn from(arg: TransactionArg) -> Self {
        match arg {
            TransactionArg::None => TransactionMode::None,
            TransactionArg::Single => TransactionMode::Single,
        }
    }
}

/// Output format options
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Message body only
    Text,
    /// Message body and properties as JSON
    Json,
}

/// Configuration format options
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum ConfigFormat {
    /// TOML format
    Toml,
    /// JSON format
    Json,
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

    #[error("Invalid argument: {arg} - {message}")]
    InvalidArgument { arg: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Process exit code for the error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Configuration(_) => 1,
            Self::Queue(QueueError::ConfigurationError(_)) => 1,
            Self::Queue(QueueError::ValidationError(_)) => 3,
            Self::Queue(_) => 2,
            Self::InvalidArgument { .. } => 3,
            Self::Io(_) => 4,
        }
    }
}

/// Configuration-related errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Invalid configuration: {0}")]
    Invalid(#[from] config::ConfigError),

    #[error("Cannot render configuration: {message}")]
    Render { message: String },
}

// ============================================================================
// Configuration Types
// ============================================================================

/// CLI configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CliConfig {
    /// Directory holding one subdirectory per queue
    pub root: PathBuf,

    /// How often a waiting receive rescans its queue
    pub poll_interval_ms: u64,

    /// Receive and peek timeout when none is given; 0 waits forever
    pub receive_timeout_ms: u64,

    /// Default logging configuration
    pub logging: LoggingConfig,

    /// Output formatting preferences
    pub output: OutputConfig,
}

impl CliConfig {
    /// Client configuration for the file-system transport under [`Self::root`]
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            transport: TransportConfig::FileSystem(FileSystemConfig {
                root: self.root.clone(),
                poll_interval_ms: self.poll_interval_ms,
            }),
            default_receive_timeout_ms: self.receive_timeout_ms,
        }
    }
}

impl Default for CliConfig {
    fn default() -> Self {
        let defaults = FileSystemConfig::new(default_root());
        Self {
            root: defaults.root,
            poll_interval_ms: defaults.poll_interval_ms,
            receive_timeout_ms: ClientConfig::default().default_receive_timeout_ms,
            logging: LoggingConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

fn default_root() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mqc")
        .join("queues")
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: LogFormat::Text,
        }
    }
}

/// Log format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum LogFormat {
    #[serde(rename = "text")]
    Text,
    #[serde(rename = "json")]
    Json,
}

/// Output formatting preferences
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OutputConfig {
    pub default_format: OutputFormat,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            default_format: OutputFormat::Text,
        }
    }
}

/// Received message as printed in JSON output
#[derive(Debug, Serialize)]
struct MessageView {
    body: String,
    label: String,
    correlation_id: Option<String>,
    priority: Priority,
    arrived_at: Option<String>,
}

impl From<&Message> for MessageView {
    fn from(message: &Message) -> Self {
        Self {
            body: String::from_utf8_lossy(&message.body).into_owned(),
            label: message.label.clone(),
            correlation_id: message
                .correlation_id
                .as_ref()
                .and_then(|id| id.to_text())
                .map(str::to_string),
            priority: message.priority,
            arrived_at: message
                .arrived_at
                .as_ref()
                .map(|at| at.as_datetime().to_rfc3339()),
        }
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

/// Main CLI entry point
pub async fn run_cli() -> Result<(), CliError> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = load_configuration(cli.config.as_deref())?;
    if let Some(root) = cli.root {
        config.root = root;
    }

    // Initialize logging
    let level = cli.log_level.unwrap_or_else(|| config.logging.level.clone());
    let json = cli.json_logs || config.logging.format == LogFormat::Json;
    initialize_logging(&level, json)?;

    // Execute command
    let mut out = std::io::stdout();
    execute_command(cli.command, &config, &mut out).await
}

/// Initialize logging to stderr, so stdout carries only command output.
///
/// `RUST_LOG` takes precedence over `level`.
pub fn initialize_logging(level: &str, json: bool) -> Result<(), CliError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .map_err(|e| CliError::InvalidArgument {
            arg: "log-level".to_string(),
            message: e.to_string(),
        })?;

    let registry = tracing_subscriber::registry().with(filter);
    let result = if json {
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

    result.map_err(|e| CliError::InvalidArgument {
        arg: "log-level".to_string(),
        message: e.to_string(),
    })
}

/// Load configuration.
///
/// Sources, later ones overriding earlier ones:
///  1. Built-in defaults
///  2. The TOML file at `config_path`, if given
///  3. Environment variables prefixed `MQC__`, e.g. `MQC__LOGGING__LEVEL=debug`
pub fn load_configuration(config_path: Option<&Path>) -> Result<CliConfig, ConfigError> {
    let mut builder = config::Config::builder();

    if let Some(path) = config_path {
        if !path.is_file() {
            return Err(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        builder = builder.add_source(
            config::File::from(path)
                .required(true)
                .format(config::FileFormat::Toml),
        );
    }

    let config = builder
        .add_source(
            config::Environment::with_prefix("MQC")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    Ok(config.try_deserialize()?)
}

// ============================================================================
// Command Implementations
// ============================================================================

/// Execute one command, writing its output to `out`
pub async fn execute_command<W: Write>(
    command: Commands,
    config: &CliConfig,
    out: &mut W,
) -> Result<(), CliError> {
    match command {
        Commands::Create {
            path,
            label,
            transactional,
        } => execute_create_command(&path, &label, transactional, config, out).await,
        Commands::Delete { path } => execute_delete_command(&path, config, out).await,
        Commands::Send {
            queue,
            text,
            label,
            correlation_id,
            high_priority,
            transaction,
        } => {
            let correlation_id = correlation_id
                .as_deref()
                .map(CorrelationId::from_text)
                .transpose()
                .map_err(|e| CliError::InvalidArgument {
                    arg: "correlation-id".to_string(),
                    message: e.to_string(),
                })?;
            let mut message = Message::from_text(&text).with_label(label);
            if let Some(correlation_id) = correlation_id {
                message = message.with_correlation_id(correlation_id);
            }
            let options = SendOptions::new()
                .with_high_priority(high_priority)
                .with_transaction(transaction.into());
            execute_send_command(&queue, &message, options, config, out).await
        }
        Commands::Receive {
            queue,
            timeout_ms,
            format,
        } => {
            execute_fetch_command(&queue, ReceiveAction::Receive, timeout_ms, format, config, out)
                .await
        }
        Commands::Peek {
            queue,
            timeout_ms,
            format,
        } => {
            execute_fetch_command(
                &queue,
                ReceiveAction::PeekCurrent,
                timeout_ms,
                format,
                config,
                out,
            )
            .await
        }
        Commands::FormatName { path } => {
            let format_name = QueueAdmin::format_name(&path).map_err(QueueError::from)?;
            writeln!(out, "{}", format_name)?;
            Ok(())
        }
        Commands::Config { format } => execute_config_command(format, config, out),
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "mqc", out);
            Ok(())
        }
    }
}

async fn connect(config: &CliConfig) -> Result<QueueAdmin, CliError> {
    debug!(root = %config.root.display(), "Opening queue store");
    Ok(QueueAdmin::from_config(&config.client_config()).await?)
}

/// Execute create command
async fn execute_create_command<W: Write>(
    path: &str,
    label: &str,
    transactional: bool,
    config: &CliConfig,
    out: &mut W,
) -> Result<(), CliError> {
    let admin = connect(config).await?;
    let handle = admin.create(path, label, transactional).await?;
    handle.close().await?;

    info!(queue = %path, "Queue created");
    writeln!(out, "{}", QueueAdmin::format_name(path).map_err(QueueError::from)?)?;
    Ok(())
}

/// Execute delete command
async fn execute_delete_command<W: Write>(
    path: &str,
    config: &CliConfig,
    out: &mut W,
) -> Result<(), CliError> {
    let admin = connect(config).await?;
    admin.delete(path).await?;

    info!(queue = %path, "Queue deleted");
    writeln!(out, "deleted {}", path)?;
    Ok(())
}

/// Execute send command
async fn execute_send_command<W: Write>(
    queue: &str,
    message: &Message,
    options: SendOptions,
    config: &CliConfig,
    out: &mut W,
) -> Result<(), CliError> {
    let admin = connect(config).await?;
    let handle = admin.open::<SendOnly>(queue).await?;

    let sent = handle.send_with_options(message, options).await;
    let closed = handle.close().await;
    sent?;
    closed?;

    writeln!(out, "sent {} bytes to {}", message.body.len(), queue)?;
    Ok(())
}

/// Execute receive and peek commands
async fn execute_fetch_command<W: Write>(
    queue: &str,
    action: ReceiveAction,
    timeout_ms: Option<u64>,
    format: Option<OutputFormat>,
    config: &CliConfig,
    out: &mut W,
) -> Result<(), CliError> {
    let client_config = config.client_config();
    let timeout = timeout_ms
        .map(ReceiveTimeout::from_millis)
        .unwrap_or_else(|| client_config.default_receive_timeout());

    let admin = connect(config).await?;
    let handle = admin.open::<ReceiveOnly>(queue).await?;

    let fetched = handle.fetch(timeout, action).await;
    let closed = handle.close().await;
    let message = fetched?;
    closed?;

    match format.unwrap_or(config.output.default_format) {
        OutputFormat::Text => {
            writeln!(out, "{}", String::from_utf8_lossy(&message.body))?;
        }
        OutputFormat::Json => {
            let json = serde_json::to_string(&MessageView::from(&message))
                .map_err(std::io::Error::from)?;
            writeln!(out, "{}", json)?;
        }
    }
    Ok(())
}

/// Execute config command
fn execute_config_command<W: Write>(
    format: ConfigFormat,
    config: &CliConfig,
    out: &mut W,
) -> Result<(), CliError> {
    let rendered = match format {
        ConfigFormat::Toml => toml::to_string_pretty(config).map_err(|e| ConfigError::Render {
            message: e.to_string(),
        })?,
        ConfigFormat::Json => {
            serde_json::to_string_pretty(config).map_err(|e| ConfigError::Render {
                message: e.to_string(),
            })?
        }
    };

    writeln!(out, "{}", rendered.trim_end())?;
    Ok(())
}
