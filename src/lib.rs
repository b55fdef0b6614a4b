// ABOUTME: Library root for remora - exposes public types for testing.
// ABOUTME: The main binary is in main.rs.

pub mod error;
pub mod output;
pub mod ssh;
