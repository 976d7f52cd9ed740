//! Rich diagnostic error types for the hn-tabular handlers.
//!
//! Each stage of a handler run (argument validation, the upstream search
//! API, output writing) defines its own error type with miette
//! `#[diagnostic]` derives, so the CLI can print an error code and a hint
//! next to the message.

use miette::Diagnostic;
use thiserror::Error;

use crate::config::ConfigError;

/// Top-level error type for a handler run.
#[derive(Debug, Error, Diagnostic)]
pub enum HnError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Upstream(#[from] UpstreamError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Output(#[from] OutputError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error("unknown handler: \"{name}\"")]
    #[diagnostic(
        code(hn::handler::unknown),
        help("List the available handlers with `hn-tabular list`.")
    )]
    UnknownHandler { name: String },

    #[error("handler \"{handler}\" failed")]
    #[diagnostic(
        code(hn::handler::failed),
        help("The upstream search request failed. Run with RUST_LOG=error to see the cause.")
    )]
    HandlerFailed { handler: String },
}

impl HnError {
    /// True for errors raised before any upstream request was made.
    pub fn is_validation(&self) -> bool {
        matches!(self, HnError::Validation(_))
    }
}

pub type HnResult<T> = std::result::Result<T, HnError>;

// ---------------------------------------------------------------------------
// Validation errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ValidationError {
    #[error("input is not valid JSON: {message}")]
    #[diagnostic(
        code(hn::validation::json),
        help("Pass the handler arguments as a JSON array, e.g. '[\"title,url\", \"rust\"]'.")
    )]
    InvalidJson { message: String },

    #[error("input must be a JSON array of positional arguments")]
    #[diagnostic(
        code(hn::validation::not_array),
        help("Wrap the arguments in a JSON array, e.g. '[\"rust\"]' instead of '\"rust\"'.")
    )]
    NotAnArray,

    #[error("missing required parameter: {field}")]
    #[diagnostic(
        code(hn::validation::missing),
        help("Run `hn-tabular describe <handler>` to see the parameter order.")
    )]
    MissingField { field: String },

    #[error("parameter \"{field}\" must be {expected}")]
    #[diagnostic(
        code(hn::validation::type_mismatch),
        help("Check the value at this parameter's position in the argument array.")
    )]
    WrongType {
        field: String,
        expected: &'static str,
    },

    #[error("invalid properties: {message}")]
    #[diagnostic(
        code(hn::validation::properties),
        help(
            "Properties are a string (\"title,url\"), a list of strings \
             ([\"title\", \"url\"]), or \"*\" for every property."
        )
    )]
    InvalidProperties { message: String },

    #[error("invalid config value for \"{key}\": \"{value}\"")]
    #[diagnostic(
        code(hn::validation::config),
        help("The config string uses query syntax, e.g. \"limit=250&headers=false\".")
    )]
    InvalidConfig { key: String, value: String },
}

// ---------------------------------------------------------------------------
// Upstream errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum UpstreamError {
    #[error("request to {url} failed: {message}")]
    #[diagnostic(
        code(hn::upstream::transport),
        help("Check your network connection and that the search API base URL is correct.")
    )]
    Transport { url: String, message: String },

    #[error("search API returned HTTP {status} for {url}")]
    #[diagnostic(
        code(hn::upstream::status),
        help("The search API rejected the request. This status is not retried.")
    )]
    Status { url: String, status: u16 },

    #[error("request to {url} still failing after {attempts} attempts: {message}")]
    #[diagnostic(
        code(hn::upstream::retries_exhausted),
        help(
            "The search API kept returning transient errors. Try again later, or raise \
             `retry.max_retries` in the config file."
        )
    )]
    RetriesExhausted {
        url: String,
        attempts: u32,
        message: String,
    },

    #[error("unexpected response body from {url}: {message}")]
    #[diagnostic(
        code(hn::upstream::decode),
        help("The search API returned a body that is not the expected JSON page.")
    )]
    Decode { url: String, message: String },
}

// ---------------------------------------------------------------------------
// Output errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum OutputError {
    #[error("failed to write output: {source}")]
    #[diagnostic(
        code(hn::output::io),
        help("The output stream was closed or is not writable.")
    )]
    Io {
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode row as JSON: {message}")]
    #[diagnostic(code(hn::output::encode))]
    Encode { message: String },
}

impl From<std::io::Error> for OutputError {
    fn from(source: std::io::Error) -> Self {
        OutputError::Io { source }
    }
}

impl From<serde_json::Error> for OutputError {
    fn from(e: serde_json::Error) -> Self {
        if e.is_io() {
            OutputError::Io {
                source: std::io::Error::other(e.to_string()),
            }
        } else {
            OutputError::Encode {
                message: e.to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_are_flagged() {
        let err: HnError = ValidationError::MissingField {
            field: "search".into(),
        }
        .into();
        assert!(err.is_validation());
        assert_eq!(err.to_string(), "missing required parameter: search");

        let err: HnError = UpstreamError::Status {
            url: "http://x".into(),
            status: 404,
        }
        .into();
        assert!(!err.is_validation());
    }

    #[test]
    fn diagnostic_codes_survive_wrapping() {
        let err: HnError = ValidationError::NotAnArray.into();
        let code = err.code().map(|c| c.to_string());
        assert_eq!(code.as_deref(), Some("hn::validation::not_array"));
    }
}
