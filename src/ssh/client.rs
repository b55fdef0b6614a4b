// ABOUTME: SSH session management using russh.
// ABOUTME: Handles connection, authentication, command execution, and teardown.

use super::error::{Error, Result};
use super::transcript::Transcript;
use super::transfer;
use parking_lot::Mutex;
use russh::client::{self, Config, Handle};
use russh::keys::known_hosts::{check_known_hosts, check_known_hosts_path, learn_known_hosts};
use russh::keys::{PrivateKeyWithHashAlg, load_secret_key, ssh_key};
use russh::{ChannelMsg, Disconnect};
use russh_sftp::client::SftpSession;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// How the server's host key is verified during the handshake.
///
/// There is no default: callers must pick a policy when building a
/// [`SessionConfig`], so skipping verification is always an explicit choice.
#[derive(Debug, Clone)]
pub enum HostKeyPolicy {
    /// Verify against the default known_hosts file; unknown hosts are rejected.
    DefaultKnownHosts,
    /// Verify against an explicit known_hosts file; unknown hosts are rejected.
    KnownHostsFile(PathBuf),
    /// Accept unknown hosts and record them in the default known_hosts file.
    /// A changed key for a known host is still rejected.
    TrustOnFirstUse,
    /// Accept any host key without verification. For test rigs only.
    AcceptAny,
}

/// Configuration for establishing an SSH session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Remote host to connect to.
    pub host: String,
    /// SSH port (default: 22).
    pub port: u16,
    /// Username for authentication.
    pub user: String,
    /// Path to the private key file used for publickey authentication.
    pub key_path: PathBuf,
    /// Host key verification policy.
    pub host_key_policy: HostKeyPolicy,
    /// Timeout for command execution (default: 5 minutes).
    pub command_timeout: Duration,
}

impl SessionConfig {
    pub fn new(
        host: impl Into<String>,
        user: impl Into<String>,
        key_path: impl Into<PathBuf>,
        host_key_policy: HostKeyPolicy,
    ) -> Self {
        Self {
            host: host.into(),
            port: 22,
            user: user.into(),
            key_path: key_path.into(),
            host_key_policy,
            command_timeout: Duration::from_secs(300), // 5 minutes
        }
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }
}

/// Output from a remote command execution.
///
/// A non-zero exit code is a normal outcome and carried here; only commands
/// that fail to start (or whose channel dies without reporting a status)
/// surface as errors.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Exit code of the command.
    pub exit_code: u32,
    /// Standard output.
    pub stdout: String,
    /// Standard error.
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// SSH client handler for russh.
pub(crate) struct ClientHandler {
    host: String,
    port: u16,
    policy: HostKeyPolicy,
}

impl ClientHandler {
    fn new(host: String, port: u16, policy: HostKeyPolicy) -> Self {
        Self { host, port, policy }
    }
}

impl client::Handler for ClientHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &ssh_key::PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        match &self.policy {
            HostKeyPolicy::AcceptAny => Ok(true),
            HostKeyPolicy::DefaultKnownHosts => {
                Ok(check_known_hosts(&self.host, self.port, server_public_key).unwrap_or(false))
            }
            HostKeyPolicy::KnownHostsFile(path) => Ok(check_known_hosts_path(
                &self.host,
                self.port,
                server_public_key,
                path,
            )
            .unwrap_or(false)),
            HostKeyPolicy::TrustOnFirstUse => {
                match check_known_hosts(&self.host, self.port, server_public_key) {
                    Ok(true) => Ok(true),
                    Ok(false) => {
                        tracing::warn!(
                            "Trust-On-First-Use: accepting unknown host key for {}:{}",
                            self.host,
                            self.port
                        );
                        if let Err(e) =
                            learn_known_hosts(&self.host, self.port, server_public_key)
                        {
                            tracing::warn!("Failed to save host key to known_hosts: {}", e);
                        }
                        Ok(true)
                    }
                    Err(russh::keys::Error::KeyChanged { .. }) => Ok(false),
                    // Unreadable or missing known_hosts counts as an unknown host
                    Err(_) => {
                        if let Err(e) =
                            learn_known_hosts(&self.host, self.port, server_public_key)
                        {
                            tracing::warn!("Failed to save host key to known_hosts: {}", e);
                        }
                        Ok(true)
                    }
                }
            }
        }
    }
}

/// An established SSH session.
///
/// Owns one transport connection and one SFTP subsystem session, both opened
/// during [`Session::connect`]. Command channels are opened fresh for every
/// [`Session::exec`] call, so any number of commands may run per session.
pub struct Session {
    config: SessionConfig,
    handle: Handle<ClientHandler>,
    sftp: SftpSession,
    transcript: Mutex<Transcript>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .field("handle", &"<russh::Handle>")
            .finish()
    }
}

impl Session {
    /// Connect to the remote host.
    ///
    /// Steps run in order with no retries: load the key, build the client
    /// configuration, dial and authenticate, open the SFTP subsystem, and
    /// verify that the server grants command channels. The first failure
    /// aborts the rest. The returned [`Transcript`] records every step taken
    /// up to and including the failing one, so callers can show the trail
    /// even when the result is an error.
    pub async fn connect(config: SessionConfig) -> (Transcript, Result<Self>) {
        let mut transcript = Transcript::new();
        match Self::connect_inner(&config, &mut transcript).await {
            Ok((handle, sftp)) => {
                let session = Self {
                    config,
                    handle,
                    sftp,
                    transcript: Mutex::new(transcript.clone()),
                };
                (transcript, Ok(session))
            }
            Err(e) => (transcript, Err(e)),
        }
    }

    async fn connect_inner(
        config: &SessionConfig,
        transcript: &mut Transcript,
    ) -> Result<(Handle<ClientHandler>, SftpSession)> {
        // Step 1: load the private key. Nothing is dialed if this fails.
        let key = match load_secret_key(&config.key_path, None) {
            Ok(key) => key,
            Err(e) => {
                transcript.push_failed("Loading SSH private key");
                return Err(Error::KeyLoad {
                    path: config.key_path.clone(),
                    reason: e.to_string(),
                });
            }
        };
        transcript.push_ok("Loading SSH private key");

        // Step 2: client configuration, publickey auth only.
        let russh_config = Config {
            inactivity_timeout: Some(Duration::from_secs(30)),
            ..Default::default()
        };
        let handler = ClientHandler::new(
            config.host.clone(),
            config.port,
            config.host_key_policy.clone(),
        );
        transcript.push_ok("Building client configuration");

        // Step 3: dial and authenticate, one transcript entry for both.
        let connecting = format!("Connecting to {}:{} as {}", config.host, config.port, config.user);
        let mut handle = match client::connect(
            Arc::new(russh_config),
            (config.host.as_str(), config.port),
            handler,
        )
        .await
        {
            Ok(handle) => handle,
            Err(e) => {
                transcript.push_failed(connecting);
                return Err(Error::Connection(e.to_string()));
            }
        };

        match Self::authenticate(&mut handle, config, Arc::new(key)).await {
            Ok(true) => transcript.push_ok(connecting),
            Ok(false) => {
                transcript.push_failed(connecting);
                return Err(Error::AuthenticationFailed);
            }
            Err(e) => {
                transcript.push_failed(connecting);
                return Err(e);
            }
        }

        // Step 4: SFTP subsystem over the established transport.
        let sftp = match Self::open_sftp(&handle).await {
            Ok(sftp) => sftp,
            Err(e) => {
                transcript.push_failed("Opening SFTP subsystem");
                return Err(e);
            }
        };
        transcript.push_ok("Opening SFTP subsystem");

        // Step 5: verify the server grants session channels, then release the
        // probe channel. Channels for actual commands are opened per-exec.
        match handle.channel_open_session().await {
            Ok(channel) => drop(channel),
            Err(e) => {
                transcript.push_failed("Opening command channel");
                return Err(Error::SessionInit(e.to_string()));
            }
        }
        transcript.push_ok("Opening command channel");

        Ok((handle, sftp))
    }

    async fn authenticate(
        handle: &mut Handle<ClientHandler>,
        config: &SessionConfig,
        key: Arc<ssh_key::PrivateKey>,
    ) -> Result<bool> {
        let hash_alg = handle
            .best_supported_rsa_hash()
            .await
            .map_err(Error::Protocol)?
            .flatten();

        let result = handle
            .authenticate_publickey(&config.user, PrivateKeyWithHashAlg::new(key, hash_alg))
            .await
            .map_err(Error::Protocol)?;

        Ok(result.success())
    }

    async fn open_sftp(handle: &Handle<ClientHandler>) -> Result<SftpSession> {
        let channel = handle
            .channel_open_session()
            .await
            .map_err(|e| Error::SftpInit(e.to_string()))?;
        channel
            .request_subsystem(true, "sftp")
            .await
            .map_err(|e| Error::SftpInit(e.to_string()))?;
        SftpSession::new(channel.into_stream())
            .await
            .map_err(|e| Error::SftpInit(e.to_string()))
    }

    /// Execute a command on the remote host.
    pub async fn exec(&self, command: &str) -> Result<CommandOutput> {
        self.exec_with_timeout(command, self.config.command_timeout)
            .await
    }

    /// Execute a command with a custom timeout.
    pub async fn exec_with_timeout(
        &self,
        command: &str,
        timeout: Duration,
    ) -> Result<CommandOutput> {
        match tokio::time::timeout(timeout, self.exec_inner(command)).await {
            Ok(result) => result,
            Err(_) => {
                self.transcript
                    .lock()
                    .push_failed(format!("Command timed out after {timeout:?}"));
                Err(Error::CommandTimeout(timeout))
            }
        }
    }

    async fn exec_inner(&self, command: &str) -> Result<CommandOutput> {
        self.transcript
            .lock()
            .push_ok(format!("Executing command: {command}"));

        let result = self.run_on_fresh_channel(command).await;
        match &result {
            Ok(output) => self
                .transcript
                .lock()
                .push_ok(format!("Command completed with exit code {}", output.exit_code)),
            Err(e) => self
                .transcript
                .lock()
                .push_failed(format!("Command execution failed: {e}")),
        }
        result
    }

    async fn run_on_fresh_channel(&self, command: &str) -> Result<CommandOutput> {
        let mut channel = self
            .handle
            .channel_open_session()
            .await
            .map_err(|e| Error::CommandFailed(format!("failed to open channel: {}", e)))?;

        channel
            .exec(true, command)
            .await
            .map_err(|e| Error::CommandFailed(format!("failed to exec command: {}", e)))?;

        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let mut exit_code = 0u32;

        let mut got_exit_status = false;
        let mut got_eof = false;

        loop {
            match channel.wait().await {
                Some(ChannelMsg::Data { data }) => {
                    stdout.extend_from_slice(&data);
                }
                Some(ChannelMsg::ExtendedData { data, ext }) => {
                    if ext == 1 {
                        // stderr
                        stderr.extend_from_slice(&data);
                    }
                }
                Some(ChannelMsg::ExitStatus { exit_status }) => {
                    exit_code = exit_status;
                    got_exit_status = true;
                    // If we already got EOF, we can exit now
                    if got_eof {
                        break;
                    }
                }
                Some(ChannelMsg::Eof) => {
                    got_eof = true;
                    // If we already got exit status, we can exit now
                    if got_exit_status {
                        break;
                    }
                }
                Some(ChannelMsg::Close) => {
                    break;
                }
                Some(_) => {}
                None => break,
            }
        }

        // A channel that closed without an exit status died abnormally; this
        // is a failure to run, not a non-zero exit.
        if !got_exit_status {
            return Err(Error::ChannelClosed);
        }

        Ok(CommandOutput {
            exit_code,
            stdout: String::from_utf8_lossy(&stdout).to_string(),
            stderr: String::from_utf8_lossy(&stderr).to_string(),
        })
    }

    /// Download `filename` from `remote_dir` on the remote host into
    /// `local_dir`, returning the number of bytes copied.
    ///
    /// The local file is only created once the remote file has been opened,
    /// so a missing remote path leaves nothing behind locally.
    pub async fn download(
        &self,
        remote_dir: &str,
        local_dir: impl AsRef<Path>,
        filename: &str,
    ) -> Result<u64> {
        let remote_path = transfer::remote_join(remote_dir, filename);
        let local_path = local_dir.as_ref().join(filename);
        tracing::debug!(
            remote = %remote_path,
            local = %local_path.display(),
            "starting download"
        );
        transfer::fetch_file(&self.sftp, &remote_path, &local_path).await
    }

    /// Snapshot of the session's step trail so far (connect and exec entries).
    pub fn transcript(&self) -> Transcript {
        self.transcript.lock().clone()
    }

    /// Disconnect the session, releasing resources in reverse-acquisition
    /// order: the SFTP subsystem first, then the transport. Every release is
    /// attempted even if an earlier one fails; failures are aggregated.
    pub async fn disconnect(self) -> Result<()> {
        let mut failures = Vec::new();

        if let Err(e) = self.sftp.close().await {
            failures.push(format!("SFTP close: {e}"));
        }

        if let Err(e) = self
            .handle
            .disconnect(Disconnect::ByApplication, "", "en")
            .await
        {
            failures.push(format!("transport disconnect: {e}"));
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(Error::Teardown(failures))
        }
    }
}
