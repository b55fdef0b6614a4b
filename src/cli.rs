// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines the run/fetch subcommands and shared connection arguments.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "remora")]
#[command(about = "Remote command execution and file retrieval over SSH/SFTP")]
#[command(version)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Minimal output (only final results)
    #[arg(short, long, global = true, conflicts_with = "json")]
    pub quiet: bool,

    /// Emit JSON lines instead of human-readable output
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Connection arguments shared by all subcommands.
#[derive(Args)]
pub struct ConnectionArgs {
    /// Remote host to connect to
    #[arg(long)]
    pub host: String,

    /// SSH port
    #[arg(long, default_value_t = 22)]
    pub port: u16,

    /// Username for authentication
    #[arg(long)]
    pub user: String,

    /// Path to the private key file
    #[arg(long)]
    pub key: PathBuf,

    /// Verify the host key against an explicit known_hosts file
    #[arg(long, value_name = "FILE", conflicts_with_all = ["tofu", "insecure_accept_any"])]
    pub known_hosts: Option<PathBuf>,

    /// Accept and record unknown host keys on first contact
    #[arg(long, conflicts_with = "insecure_accept_any")]
    pub tofu: bool,

    /// Skip host key verification entirely (unsafe)
    #[arg(long)]
    pub insecure_accept_any: bool,

    /// Command timeout in seconds
    #[arg(long, default_value_t = 300)]
    pub timeout: u64,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Execute a command on the remote host
    Run {
        #[command(flatten)]
        connection: ConnectionArgs,

        /// Command to execute remotely
        command: String,
    },

    /// Download a file from the remote host
    Fetch {
        #[command(flatten)]
        connection: ConnectionArgs,

        /// Remote directory containing the file
        #[arg(long)]
        remote_dir: String,

        /// Local directory to place the file in
        #[arg(long)]
        local_dir: PathBuf,

        /// File name to download
        file: String,
    },
}
