//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use airbridge_config::ConfigError;
use airbridge_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const CONFIG: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const CONNECTION: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(airbridge::auth_failed),
        help(
            "Check app_key / app_secret against the developer portal.\n\
             The secret is read from app_secret_env, the keyring entry \
             'airbridge/app-secret', or app_secret in the config file."
        )
    )]
    AuthFailed { message: String },

    // ── Connection ───────────────────────────────────────────────────
    #[error("Device listing failed: {message}")]
    #[diagnostic(
        code(airbridge::fetch_failed),
        help("Check network access to the cloud API and the api_url setting.")
    )]
    FetchFailed { message: String },

    #[error("The device listing was malformed: {reason}")]
    #[diagnostic(
        code(airbridge::malformed_response),
        help("The cloud service returned an unexpected payload. Try again shortly.")
    )]
    MalformedResponse { reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Missing required setting '{field}'")]
    #[diagnostic(
        code(airbridge::missing_setting),
        help(
            "Set it in {path}\n\
             or via the AIRBRIDGE_{env} environment variable."
        )
    )]
    MissingSetting {
        field: String,
        env: String,
        path: String,
    },

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(airbridge::validation))]
    Validation { field: String, reason: String },

    #[error(transparent)]
    #[diagnostic(code(airbridge::config))]
    Config(ConfigError),

    // ── Local state ──────────────────────────────────────────────────
    #[error("Accessory cache error: {message}")]
    #[diagnostic(
        code(airbridge::cache),
        help("Delete the cache file to start from an empty accessory set.")
    )]
    Cache { message: String },

    #[error("{message}")]
    #[diagnostic(code(airbridge::internal))]
    Internal { message: String },

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to render JSON: {0}")]
    #[diagnostic(code(airbridge::json))]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::AuthFailed { .. } => exit_code::AUTH,
            Self::FetchFailed { .. } | Self::MalformedResponse { .. } => exit_code::CONNECTION,
            Self::MissingSetting { .. } | Self::Validation { .. } | Self::Config(_) => {
                exit_code::CONFIG
            }
            _ => exit_code::GENERAL,
        }
    }
}

// ── Conversions ──────────────────────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Auth { message } => CliError::AuthFailed { message },
            CoreError::Fetch {
                message, status, ..
            } => CliError::FetchFailed {
                message: match status {
                    Some(code) => format!("HTTP {code}: {message}"),
                    None => message,
                },
            },
            CoreError::MalformedResponse { reason } => CliError::MalformedResponse { reason },
            CoreError::Cache { message } => CliError::Cache { message },
            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },
            other => CliError::Internal {
                message: other.to_string(),
            },
        }
    }
}

impl From<airbridge_api::Error> for CliError {
    fn from(err: airbridge_api::Error) -> Self {
        CoreError::from(err).into()
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::MissingField { field } => CliError::MissingSetting {
                env: field.to_uppercase(),
                path: airbridge_config::config_path().display().to_string(),
                field,
            },
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            other => CliError::Config(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_error_class() {
        let auth: CliError = CoreError::Auth {
            message: "nope".into(),
        }
        .into();
        assert_eq!(auth.exit_code(), exit_code::AUTH);

        let fetch: CliError = CoreError::Fetch {
            message: "refused".into(),
            status: None,
            transient: true,
        }
        .into();
        assert_eq!(fetch.exit_code(), exit_code::CONNECTION);

        let missing: CliError = ConfigError::MissingField {
            field: "app_key".into(),
        }
        .into();
        assert_eq!(missing.exit_code(), exit_code::CONFIG);
        assert!(matches!(missing, CliError::MissingSetting { ref env, .. } if env == "APP_KEY"));
    }
}
