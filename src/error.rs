// ABOUTME: Application-wide error types for the remora CLI.
// ABOUTME: Uses thiserror for ergonomic error handling.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("SSH error: {0}")]
    Ssh(#[from] crate::ssh::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
