//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use gatewatch_config::ConfigError;
use gatewatch_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const CONFIG: i32 = 3;
    pub const INPUT: i32 = 4;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Entities ─────────────────────────────────────────────────────

    #[error("No entities to attach")]
    #[diagnostic(
        code(gatewatch::no_entities),
        help(
            "Pass --zigbee, --ble, --action, --gateway or --scanner,\n\
             or declare [[entities]] in {path}"
        )
    )]
    NoEntities { path: String },

    #[error("Invalid device identifier {identifier:?}")]
    #[diagnostic(code(gatewatch::invalid_device), help("{reason}"))]
    InvalidDevice { identifier: String, reason: String },

    #[error("Could not start entity: {message}")]
    #[diagnostic(code(gatewatch::runtime))]
    Runtime { message: String },

    // ── Input ────────────────────────────────────────────────────────

    #[error("Could not open capture {path}")]
    #[diagnostic(code(gatewatch::open_input))]
    OpenInput {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed capture line {line}: {reason}")]
    #[diagnostic(
        code(gatewatch::malformed_line),
        help("Each line must be a JSON object {{\"key\": \"<device key>\", \"frame\": {{...}}}}.\n\
              Drop --strict to skip malformed lines.")
    )]
    MalformedLine { line: usize, reason: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error(transparent)]
    #[diagnostic(
        code(gatewatch::config),
        help("Check the configuration file and GATEWATCH_* environment variables.")
    )]
    Config(#[from] ConfigError),

    // ── IO / Serialization ────────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Could not render JSON: {0}")]
    #[diagnostic(code(gatewatch::json))]
    Json(#[from] serde_json::Error),

    #[error("Could not render YAML: {0}")]
    #[diagnostic(code(gatewatch::yaml))]
    Yaml(#[from] serde_yaml::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::NoEntities { .. } | Self::InvalidDevice { .. } => exit_code::USAGE,
            Self::Config(_) => exit_code::CONFIG,
            Self::OpenInput { .. } | Self::MalformedLine { .. } => exit_code::INPUT,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidIdentifier { identifier, reason } => {
                CliError::InvalidDevice { identifier, reason }
            }
            err @ CoreError::NoRuntime { .. } => CliError::Runtime {
                message: err.to_string(),
            },
        }
    }
}
