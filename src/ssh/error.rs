// ABOUTME: SSH-specific error types.
// ABOUTME: Covers connect, command execution, file transfer, and teardown failures.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to load key from {path}: {reason}")]
    KeyLoad { path: PathBuf, reason: String },

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("authentication failed: server rejected the key")]
    AuthenticationFailed,

    #[error("failed to open SFTP subsystem: {0}")]
    SftpInit(String),

    #[error("failed to open command channel: {0}")]
    SessionInit(String),

    #[error("command failed to start: {0}")]
    CommandFailed(String),

    #[error("command timed out after {0:?}")]
    CommandTimeout(std::time::Duration),

    #[error("channel closed unexpectedly without exit status")]
    ChannelClosed,

    #[error("failed to open remote file {path}: {reason}")]
    RemoteOpen { path: String, reason: String },

    #[error("failed to create local file {path}: {reason}")]
    LocalCreate { path: PathBuf, reason: String },

    #[error("file transfer failed: {0}")]
    Copy(#[source] std::io::Error),

    #[error("session teardown failed: {}", .0.join("; "))]
    Teardown(Vec<String>),

    #[error("SSH protocol error: {0}")]
    Protocol(#[from] russh::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
