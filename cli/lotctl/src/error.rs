//! Error handling and display for the CLI.

use colored::Colorize;
use lotline_codec::DecodeError;
use thiserror::Error;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("API error: {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
        retryable: bool,
    },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl CliError {
    /// Create an API error from response details.
    pub fn api(
        status: u16,
        code: impl Into<String>,
        message: impl Into<String>,
        retryable: bool,
    ) -> Self {
        Self::Api {
            status,
            code: code.into(),
            message: message.into(),
            retryable,
        }
    }
}

/// Print an error in a user-friendly format.
pub fn print_error(err: &anyhow::Error) {
    eprintln!("{} {}", "Error:".red().bold(), err);

    let Some(cli_err) = err.downcast_ref::<CliError>() else {
        return;
    };
    match cli_err {
        CliError::Api { retryable: true, .. } => {
            eprintln!("\n{}", "Hint: This failure is transient; retry shortly.".yellow());
        }
        CliError::Api { code, .. } if code == "unknown_model" => {
            eprintln!(
                "\n{}",
                "Hint: Model names must match the service's model table exactly.".yellow()
            );
        }
        CliError::Api { code, .. } if code == "sequence_exhausted" => {
            eprintln!(
                "\n{}",
                "Hint: All 999 sequences in this scope are used.".yellow()
            );
        }
        CliError::Network(_) => {
            eprintln!(
                "\n{}",
                "Hint: Check that lotline is running and --api-url is correct.".yellow()
            );
        }
        CliError::Decode(DecodeError::Ambiguous { .. }) => {
            eprintln!(
                "\n{}",
                "Hint: Pass --format-version, or use `lotctl lookup` to apply the stored tag."
                    .yellow()
            );
        }
        _ => {}
    }
}
