//! Streaming downloader with progress reporting and atomic publish.
//!
//! The response body is written to a temporary file created next to the
//! destination, then renamed into place. The destination is therefore either
//! absent, a stale previous file, or a complete download; never a partial one.

use std::path::Path;
use std::pin::pin;

use futures::{Stream, StreamExt};
use tempfile::TempPath;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::error::FetchError;
use crate::progress::{Progress, ProgressSink};

type FetchResult<T> = std::result::Result<T, FetchError>;

/// Downloads `url` to `dest`, reporting byte progress to `sink`.
///
/// Returns the number of bytes written.
///
/// # Errors
///
/// Returns a [`FetchError`] if the request fails, the server answers with a
/// non-success status, or the body cannot be read or written. No file is
/// created for a failed request, and the temporary file is removed on every
/// failure after that.
pub async fn fetch(
    client: &reqwest::Client,
    url: &str,
    dest: &Path,
    label: &str,
    sink: &dyn ProgressSink,
) -> FetchResult<u64> {
    info!("Downloading {} to {}", url, dest.display());

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|source| FetchError::Request {
            url: url.to_string(),
            source,
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    let total_bytes = response.content_length();
    debug!("Content-Length: {:?}", total_bytes);

    let body = response.bytes_stream();
    let written = write_stream(body, total_bytes, url, dest, label, sink).await?;

    info!(
        "Download complete: {} bytes written to {}",
        written,
        dest.display()
    );
    Ok(written)
}

/// Writes a byte stream to `dest` through a temporary file in the same directory.
///
/// `total` is the expected size if known. On success the temporary file is
/// renamed over `dest`; on any error it is deleted.
///
/// Each chunk is written and reported as the stream yields it, without
/// re-chunking into a fixed size. For a reqwest body that is whatever the
/// connection delivers, usually a few KiB up to tens of KiB, so progress
/// granularity follows the transport.
pub async fn write_stream<S, B, E>(
    body: S,
    total: Option<u64>,
    url: &str,
    dest: &Path,
    label: &str,
    sink: &dyn ProgressSink,
) -> FetchResult<u64>
where
    S: Stream<Item = std::result::Result<B, E>>,
    B: AsRef<[u8]>,
    E: std::error::Error + Send + Sync + 'static,
{
    let dir = match dest.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let (file, temp_path) = tempfile::Builder::new()
        .prefix(".download-")
        .tempfile_in(dir)
        .map_err(|e| FetchError::io(dir, e))?
        .into_parts();

    // TempPath deletes the file when dropped, which covers every early return.
    let mut file = tokio::fs::File::from_std(file);
    let mut written: u64 = 0;
    let mut body = pin!(body);

    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(|e| FetchError::Body {
            url: url.to_string(),
            source: Box::new(e),
        })?;
        let bytes = chunk.as_ref();

        file.write_all(bytes)
            .await
            .map_err(|e| FetchError::io(&*temp_path, e))?;

        written += bytes.len() as u64;
        sink.update(&Progress::new(label, written, total, bytes.len() as u64));
    }

    file.flush()
        .await
        .map_err(|e| FetchError::io(&*temp_path, e))?;
    file.sync_all()
        .await
        .map_err(|e| FetchError::io(&*temp_path, e))?;
    drop(file);

    publish(temp_path, dest)?;
    Ok(written)
}

/// Atomically moves the finished temporary file over `dest`.
fn publish(temp_path: TempPath, dest: &Path) -> FetchResult<()> {
    temp_path
        .persist(dest)
        .map_err(|e| FetchError::io(dest, e.error))?;
    debug!("Published {}", dest.display());
    Ok(())
}
