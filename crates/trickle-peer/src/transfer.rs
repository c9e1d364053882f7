//! File transfer — the TCP listener every authenticated peer runs, and
//! the client that downloads from a resolved publisher.
//!
//! The protocol is one connection per download: the client sends a
//! single `DOWNLOAD <filename>` line, the server streams the file's
//! bytes and closes. End of stream is end of file — no length prefix,
//! no checksum, no resume. Any transport error aborts the download and
//! the caller reports failure.

use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use bytes::BytesMut;
use socket2::{Domain, Protocol, Socket, Type};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

use trickle_core::wire::{download_request, parse_download};

/// Pending-connection backlog for the transfer listener.
const LISTEN_BACKLOG: i32 = 5;

/// Read/write granularity for streaming file bytes.
const STREAM_CHUNK: usize = 1024;

#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("transfer timed out")]
    Timeout,
    #[error("peer closed the connection without sending {0:?}")]
    Empty(String),
    #[error("filename may not contain path separators: {0:?}")]
    InvalidFilename(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Filenames travel bare on the wire; anything that would escape the
/// share directory is refused on both sides.
fn valid_filename(filename: &str) -> bool {
    !filename.is_empty()
        && !filename.contains('/')
        && !filename.contains('\\')
        && filename != ".."
}

// ── Serving side ──────────────────────────────────────────────────────────────

/// Bind the transfer listener with a bounded pending-connection backlog.
/// Must be called from within a tokio runtime.
pub fn bind_listener(port: u16) -> Result<TcpListener, TransferError> {
    let socket = Socket::new(Domain::IPV4, Type::STREAM, Some(Protocol::TCP))?;
    socket.set_reuse_address(true)?;
    socket.set_nonblocking(true)?;
    let addr: SocketAddr = SocketAddr::from(([0, 0, 0, 0], port));
    socket.bind(&addr.into())?;
    socket.listen(LISTEN_BACKLOG)?;
    Ok(TcpListener::from_std(socket.into())?)
}

/// Accept download connections forever, one task per connection.
/// Cancel by dropping the task handle.
pub async fn serve_loop(listener: TcpListener, share_dir: PathBuf) -> Result<()> {
    let local = listener.local_addr().context("transfer listener has no local address")?;
    tracing::info!(addr = %local, dir = %share_dir.display(), "transfer listener serving");

    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(conn) => conn,
            Err(e) => {
                tracing::warn!(error = %e, "accept failed");
                continue;
            }
        };
        let share_dir = share_dir.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, &share_dir).await {
                tracing::warn!(%peer, error = %e, "download connection failed");
            }
        });
    }
}

/// Serve one download: read the request line, stream the file, close.
/// A bad request line or an unopenable file closes the connection with
/// no payload — the downloader sees an empty stream and reports failure.
async fn handle_connection(stream: TcpStream, share_dir: &Path) -> Result<()> {
    let (read_half, mut write_half) = stream.into_split();

    let mut line = String::new();
    BufReader::new(read_half)
        .read_line(&mut line)
        .await
        .context("failed to read request line")?;

    let Some(filename) = parse_download(&line) else {
        tracing::warn!(line = %line.trim_end(), "unrecognized transfer request");
        return Ok(());
    };
    if !valid_filename(filename) {
        tracing::warn!(file = %filename, "refused transfer request");
        return Ok(());
    }

    let path = share_dir.join(filename);
    let mut file = match tokio::fs::File::open(&path).await {
        Ok(file) => file,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "requested file unavailable");
            return Ok(());
        }
    };

    let sent = tokio::io::copy(&mut file, &mut write_half)
        .await
        .context("failed to stream file")?;
    write_half.shutdown().await.ok();
    tracing::info!(file = %filename, bytes = sent, "file served");
    Ok(())
}

// ── Downloading side ──────────────────────────────────────────────────────────

/// Download `filename` from a resolved peer into `dest_dir`.
///
/// Every network step — connect, request write, each read — is bounded
/// by `timeout`. On any failure the partial file is removed; on an empty
/// stream no file is created at all. Returns the written path.
pub async fn download(
    host: IpAddr,
    port: u16,
    filename: &str,
    dest_dir: &Path,
    timeout: Duration,
) -> Result<PathBuf, TransferError> {
    if !valid_filename(filename) {
        return Err(TransferError::InvalidFilename(filename.to_string()));
    }
    let dest = dest_dir.join(filename);

    let result = download_to(host, port, filename, &dest, timeout).await;
    match result {
        Ok(received) if received > 0 => {
            tracing::info!(file = %filename, bytes = received, "download complete");
            Ok(dest)
        }
        Ok(_) => {
            let _ = tokio::fs::remove_file(&dest).await;
            Err(TransferError::Empty(filename.to_string()))
        }
        Err(e) => {
            let _ = tokio::fs::remove_file(&dest).await;
            Err(e)
        }
    }
}

async fn download_to(
    host: IpAddr,
    port: u16,
    filename: &str,
    dest: &Path,
    timeout: Duration,
) -> Result<u64, TransferError> {
    let connect = TcpStream::connect((host, port));
    let mut stream = tokio::time::timeout(timeout, connect)
        .await
        .map_err(|_| TransferError::Timeout)??;

    let request = download_request(filename);
    tokio::time::timeout(timeout, stream.write_all(request.as_bytes()))
        .await
        .map_err(|_| TransferError::Timeout)??;

    let mut file = tokio::fs::File::create(dest).await?;
    let mut buf = BytesMut::zeroed(STREAM_CHUNK);
    let mut received: u64 = 0;
    loop {
        let n = tokio::time::timeout(timeout, stream.read(&mut buf))
            .await
            .map_err(|_| TransferError::Timeout)??;
        if n == 0 {
            break;
        }
        file.write_all(&buf[..n]).await?;
        received += n as u64;
    }
    file.flush().await?;
    Ok(received)
}
