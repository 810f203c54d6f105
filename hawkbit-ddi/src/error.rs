use thiserror::Error;

use crate::config::ConfigError;
use crate::decode::DecodeError;
use crate::util::http::{ClientError, InvalidUriError, StatusCode};

/// Errors returned by controller API operations
#[derive(Debug, Error)]
pub enum Error {
    /// No response was received, e.g. connection refused or timeout
    #[error("request failed: {0}")]
    Transport(#[from] ClientError),

    /// The server replied with a non-2xx status
    #[error("server replied: {0}")]
    Status(StatusCode),

    /// The response body could not be decoded
    #[error("malformed response: {0}")]
    MalformedResponse(#[from] DecodeError),

    /// The artifact has no link for the requested relation
    #[error("artifact has no '{0}' link")]
    MissingLink(String),

    /// The download request was answered with a non-2xx status
    #[error("download failed with status: {0}")]
    Download(StatusCode),

    /// A server supplied href could not be used as a request URI
    #[error("invalid uri: {0}")]
    InvalidUri(#[from] InvalidUriError),

    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// A request body could not be encoded
    #[error("failed to encode request body: {0}")]
    Encode(#[source] serde_json::Error),
}

impl Error {
    /// Whether repeating the whole operation later may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Transport(_) => true,
            Error::Status(status) | Error::Download(status) => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
            _ => false,
        }
    }
}
