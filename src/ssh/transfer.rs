// ABOUTME: SFTP file retrieval over an established session.
// ABOUTME: Streams a single remote file into a local destination.

use super::error::{Error, Result};
use russh_sftp::client::SftpSession;
use russh_sftp::protocol::OpenFlags;
use std::path::Path;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};

/// Join a bare file name onto a remote directory path.
///
/// Remote paths are SFTP strings, not local `Path`s, so separators are
/// forward slashes regardless of platform.
pub(crate) fn remote_join(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", dir.trim_end_matches('/'), name)
    }
}

/// Copy one remote file to a local path, returning the bytes copied.
///
/// The remote file is opened before the local one is created, so nothing is
/// left behind locally when the remote path does not exist. Both handles are
/// released on every exit path.
pub(crate) async fn fetch_file(
    sftp: &SftpSession,
    remote_path: &str,
    local_path: &Path,
) -> Result<u64> {
    let mut remote = sftp
        .open_with_flags(remote_path, OpenFlags::READ)
        .await
        .map_err(|e| Error::RemoteOpen {
            path: remote_path.to_string(),
            reason: e.to_string(),
        })?;

    copy_then_close(&mut remote, local_path).await
}

/// Stream `remote` into a freshly created local file, then close the remote
/// handle regardless of how the copy went.
///
/// Dropping an SFTP file does not send the close request for the remote
/// handle; the shutdown does, so it must run on failure paths too. A close
/// failure never masks an earlier copy error.
async fn copy_then_close<R>(remote: &mut R, local_path: &Path) -> Result<u64>
where
    R: AsyncRead + AsyncWrite + Unpin,
{
    let result = copy_to_local(remote, local_path).await;

    match remote.shutdown().await {
        Ok(()) => result,
        Err(e) => result.and(Err(Error::Copy(e))),
    }
}

async fn copy_to_local<R>(remote: &mut R, local_path: &Path) -> Result<u64>
where
    R: AsyncRead + Unpin,
{
    let mut local = tokio::fs::File::create(local_path)
        .await
        .map_err(|e| Error::LocalCreate {
            path: local_path.to_path_buf(),
            reason: e.to_string(),
        })?;

    let copied = tokio::io::copy(remote, &mut local)
        .await
        .map_err(Error::Copy)?;

    local.flush().await.map_err(Error::Copy)?;
    Ok(copied)
}
