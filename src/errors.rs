use std::fmt;

use thiserror::Error;

use crate::schema::ValidationError;
use crate::waiter::WaitError;

/// Error code the control plane uses for a missing virtual cluster.
pub const RESOURCE_NOT_FOUND_CODE: &str = "ResourceNotFoundException";

/// Errors returned by the remote control-plane client.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("ResourceNotFoundException: {message}")]
    NotFound { message: String },
    #[error("{code}: {message} (HTTP {status})")]
    Service {
        code: String,
        message: String,
        status: u16,
    },
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("invalid response from control plane: {0}")]
    InvalidResponse(String),
    #[error("invalid control plane endpoint: {0}")]
    InvalidEndpoint(String),
}

impl ApiError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound { .. })
    }

    /// Error code as reported by the service, if there is one.
    pub fn code(&self) -> Option<&str> {
        match self {
            ApiError::NotFound { .. } => Some(RESOURCE_NOT_FOUND_CODE),
            ApiError::Service { code, .. } => Some(code),
            ApiError::Transport(_) | ApiError::InvalidResponse(_) | ApiError::InvalidEndpoint(_) => None,
        }
    }
}

/// Which lifecycle wait failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitAction {
    Creation,
    Deletion,
}

impl fmt::Display for WaitAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WaitAction::Creation => f.write_str("creation"),
            WaitAction::Deletion => f.write_str("deletion"),
        }
    }
}

/// Errors surfaced by the virtual cluster resource operations.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("creating virtual cluster: {0}")]
    Create(#[source] ApiError),
    #[error("reading virtual cluster ({id}): {source}")]
    Read {
        id: String,
        #[source]
        source: ApiError,
    },
    #[error("deleting virtual cluster ({id}): {source}")]
    Delete {
        id: String,
        #[source]
        source: ApiError,
    },
    #[error("waiting for virtual cluster ({id}) {action}: {source}")]
    Wait {
        id: String,
        action: WaitAction,
        #[source]
        source: WaitError<ApiError>,
    },
    #[error("invalid configuration: {}", join_errors(.errors))]
    InvalidConfig { errors: Vec<ValidationError> },
    #[error("attribute {0} is missing or not a string")]
    MissingAttribute(&'static str),
}

impl ProviderError {
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            ProviderError::Wait {
                source: WaitError::Timeout { .. },
                ..
            }
        )
    }

    pub fn is_unexpected_state(&self) -> bool {
        matches!(
            self,
            ProviderError::Wait {
                source: WaitError::UnexpectedState { .. },
                ..
            }
        )
    }
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
