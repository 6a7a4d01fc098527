use std::fs::File;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use pushkit_core::DownloadProgress;
use pushkit_security::Sha256Stream;
use reqwest::blocking::Client;

const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(300);
const CHUNK_SIZE: usize = 64 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum BundleLocation {
    File(PathBuf),
    Http(String),
}

impl BundleLocation {
    /// Accepts `file://` URLs, `http(s)://` URLs and plain filesystem paths.
    pub(crate) fn parse(download_url: &str) -> Result<Self> {
        let url = download_url.trim();
        if url.is_empty() {
            anyhow::bail!("download url is empty");
        }
        if let Some(path) = url.strip_prefix("file://") {
            return Ok(Self::File(PathBuf::from(path)));
        }
        if url.starts_with("http://") || url.starts_with("https://") {
            return Ok(Self::Http(url.to_string()));
        }
        if url.contains("://") {
            anyhow::bail!("unsupported download url scheme: {url}");
        }
        Ok(Self::File(PathBuf::from(url)))
    }
}

#[derive(Debug)]
pub(crate) struct FetchedBundle {
    pub(crate) bytes: u64,
    pub(crate) sha256: String,
}

/// Streams the bundle at `download_url` into `destination`, hashing as it
/// goes.
pub(crate) fn fetch_bundle(
    download_url: &str,
    destination: &Path,
    on_progress: &mut dyn FnMut(DownloadProgress),
) -> Result<FetchedBundle> {
    let (reader, total_bytes): (Box<dyn Read>, Option<u64>) =
        match BundleLocation::parse(download_url)? {
            BundleLocation::File(path) => {
                let file = File::open(&path)
                    .with_context(|| format!("failed to open bundle: {}", path.display()))?;
                let total = file.metadata().ok().map(|metadata| metadata.len());
                (Box::new(file), total)
            }
            BundleLocation::Http(url) => {
                let client = Client::builder()
                    .timeout(DOWNLOAD_TIMEOUT)
                    .build()
                    .context("failed to build HTTP client")?;
                let response = client
                    .get(&url)
                    .send()
                    .with_context(|| format!("bundle request failed: {url}"))?
                    .error_for_status()
                    .with_context(|| format!("bundle request rejected: {url}"))?;
                let total = response.content_length();
                (Box::new(response), total)
            }
        };

    copy_with_progress(reader, total_bytes, destination, on_progress)
}

fn copy_with_progress(
    mut reader: Box<dyn Read>,
    total_bytes: Option<u64>,
    destination: &Path,
    on_progress: &mut dyn FnMut(DownloadProgress),
) -> Result<FetchedBundle> {
    let mut file = File::create(destination)
        .with_context(|| format!("failed to create {}", destination.display()))?;
    let mut digest = Sha256Stream::new();
    let mut buffer = vec![0u8; CHUNK_SIZE];
    let mut received_bytes = 0u64;

    loop {
        let read = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(read) => read,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err).context("failed reading bundle"),
        };
        file.write_all(&buffer[..read])
            .with_context(|| format!("failed writing {}", destination.display()))?;
        digest.update(&buffer[..read]);
        received_bytes += read as u64;
        on_progress(DownloadProgress {
            received_bytes,
            total_bytes,
        });
    }
    if received_bytes == 0 {
        on_progress(DownloadProgress {
            received_bytes,
            total_bytes,
        });
    }

    file.flush()
        .with_context(|| format!("failed to flush {}", destination.display()))?;
    Ok(FetchedBundle {
        bytes: received_bytes,
        sha256: digest.finish_hex(),
    })
}
