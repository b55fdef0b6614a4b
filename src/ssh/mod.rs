// ABOUTME: SSH client module for remote command execution and file retrieval.
// ABOUTME: Key-based authentication with an explicit host key verification policy.

mod client;
mod error;
mod transcript;
mod transfer;

pub use client::{CommandOutput, HostKeyPolicy, Session, SessionConfig};
pub use error::{Error, Result};
pub use transcript::{Entry, StepStatus, Transcript};
