//! Shared error types for the services crate.

use thiserror::Error;

/// Errors from the remote practice collector endpoints.
///
/// These never cross the engine boundary; fire-and-forget callers log them
/// and the mistake recorder turns them into queued retries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RemoteError {
    #[error("remote api is not configured")]
    Disabled,
    #[error("remote api request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}
