// ABOUTME: Entry point for the remora CLI application.
// ABOUTME: Parses arguments and dispatches to the run/fetch command handlers.

mod cli;

use clap::Parser;
use cli::{Cli, Commands, ConnectionArgs};
use remora::error::Result;
use remora::output::{Output, OutputMode};
use remora::ssh::{HostKeyPolicy, Session, SessionConfig};
use std::io::Write;
use std::path::Path;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing subscriber based on verbose flag
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    let mode = if cli.json {
        OutputMode::Json
    } else if cli.quiet {
        OutputMode::Quiet
    } else {
        OutputMode::Normal
    };
    let output = Output::new(mode);

    match run(cli, &output).await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            output.error(&e.to_string());
            std::process::exit(1);
        }
    }
}

async fn run(cli: Cli, output: &Output) -> Result<i32> {
    match cli.command {
        Commands::Run {
            connection,
            command,
        } => run_command(&connection, &command, output).await,
        Commands::Fetch {
            connection,
            remote_dir,
            local_dir,
            file,
        } => {
            fetch_file(&connection, &remote_dir, &local_dir, &file, output).await?;
            Ok(0)
        }
    }
}

/// Map CLI flags to a session configuration.
fn session_config(args: &ConnectionArgs) -> SessionConfig {
    let policy = if args.insecure_accept_any {
        HostKeyPolicy::AcceptAny
    } else if args.tofu {
        HostKeyPolicy::TrustOnFirstUse
    } else if let Some(path) = &args.known_hosts {
        HostKeyPolicy::KnownHostsFile(path.clone())
    } else {
        HostKeyPolicy::DefaultKnownHosts
    };

    SessionConfig::new(&args.host, &args.user, &args.key, policy)
        .port(args.port)
        .command_timeout(Duration::from_secs(args.timeout))
}

/// Connect and show the step trail, whether or not the attempt succeeded.
async fn connect(args: &ConnectionArgs, output: &Output) -> Result<Session> {
    output.progress(&format!("Connecting to {}:{}...", args.host, args.port));

    let (transcript, result) = Session::connect(session_config(args)).await;
    output.transcript(&transcript);

    Ok(result?)
}

/// Execute a single command on the remote host.
async fn run_command(args: &ConnectionArgs, command: &str, output: &Output) -> Result<i32> {
    let session = connect(args, output).await?;

    let result = session.exec(command).await;

    let cmd_output = match result {
        Ok(cmd_output) => cmd_output,
        Err(e) => {
            disconnect_or_warn(session, output).await;
            return Err(e.into());
        }
    };

    // Relay remote output verbatim
    if !cmd_output.stdout.is_empty() {
        print!("{}", cmd_output.stdout);
        let _ = std::io::stdout().flush();
    }
    if !cmd_output.stderr.is_empty() {
        eprint!("{}", cmd_output.stderr);
        let _ = std::io::stderr().flush();
    }

    disconnect_or_warn(session, output).await;

    // The remote exit code becomes our own
    Ok(cmd_output.exit_code as i32)
}

/// Download a single file from the remote host.
async fn fetch_file(
    args: &ConnectionArgs,
    remote_dir: &str,
    local_dir: &Path,
    file: &str,
    output: &Output,
) -> Result<()> {
    let session = connect(args, output).await?;

    output.progress(&format!("Fetching {file} from {remote_dir}..."));
    let result = session.download(remote_dir, local_dir, file).await;

    let bytes = match result {
        Ok(bytes) => bytes,
        Err(e) => {
            disconnect_or_warn(session, output).await;
            return Err(e.into());
        }
    };

    disconnect_or_warn(session, output).await;

    output.success(&format!("Fetched {file} ({bytes} bytes)"));
    Ok(())
}

/// Disconnect the session; teardown failures are non-fatal warnings.
async fn disconnect_or_warn(session: Session, output: &Output) {
    if let Err(e) = session.disconnect().await {
        output.warning(&format!("disconnect failed: {e}"));
    }
}
