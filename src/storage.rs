//! Content-addressed document store.
//!
//! Every stored file `<name>` has a sidecar `<name>.sha256` holding the
//! lowercase hex SHA-256 of its bytes. A file whose sidecar matches a fresh
//! digest is trusted and never downloaded again.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{debug, info, warn};
use url::Url;

use crate::scrapers::HttpClient;

/// Extension of the digest sidecar written next to each stored file.
pub const DIGEST_SIDECAR_EXTENSION: &str = "sha256";

const PARTIAL_EXTENSION: &str = "part";
const READ_BUFFER_SIZE: usize = 64 * 1024;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("transfer of {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} answered HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("cannot write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("no usable filename in {0:?}")]
    InvalidFilename(String),
}

/// Outcome of a successful fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub local_filename: String,
    pub content_digest: String,
    /// True when the file was already present and verified; no transfer happened.
    pub cached: bool,
}

/// Cache state of one stored name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheCheck {
    /// File and sidecar agree on this digest.
    Valid(String),
    /// File exists but the sidecar is missing, unreadable, or disagrees.
    Mismatch,
    /// Nothing stored under this name.
    Absent,
}

/// Lowercase hex SHA-256 of a byte slice.
pub fn compute_digest(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    hex::encode(hasher.finalize())
}

/// Reduce a desired name to a safe local filename.
///
/// Only the basename is kept, and any character outside ASCII alphanumerics,
/// `.`, `_` and `-` becomes `_`. Returns `None` when nothing usable is left.
pub fn sanitize_filename(name: &str) -> Option<String> {
    let basename = name.rsplit(['/', '\\']).next().unwrap_or(name).trim();
    let sanitized: String = basename
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if sanitized.is_empty() || sanitized.chars().all(|c| c == '.') {
        None
    } else {
        Some(sanitized)
    }
}

/// Path of the digest sidecar for a stored file.
pub fn sidecar_path(file: &Path) -> PathBuf {
    let mut name = file.as_os_str().to_owned();
    name.push(".");
    name.push(DIGEST_SIDECAR_EXTENSION);
    PathBuf::from(name)
}

/// SHA-256 of a file on disk, read in chunks.
pub async fn digest_file(path: &Path) -> std::io::Result<String> {
    let mut file = fs::File::open(path).await?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; READ_BUFFER_SIZE];
    loop {
        let read = file.read(&mut buffer).await?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Directory of downloaded documents keyed by filename, verified by digest.
pub struct ContentStore {
    root: PathBuf,
    client: HttpClient,
}

impl ContentStore {
    pub fn new(root: impl Into<PathBuf>, client: HttpClient) -> Self {
        Self {
            root: root.into(),
            client,
        }
    }

    /// Where a sanitized filename lives in the store.
    pub fn path_for(&self, local_filename: &str) -> PathBuf {
        self.root.join(local_filename)
    }

    /// Compare a stored file against its sidecar.
    pub async fn check(&self, local_filename: &str) -> CacheCheck {
        let path = self.path_for(local_filename);
        if !fs::try_exists(&path).await.unwrap_or(false) {
            return CacheCheck::Absent;
        }

        let recorded = match fs::read_to_string(sidecar_path(&path)).await {
            Ok(recorded) => recorded.trim().to_ascii_lowercase(),
            Err(e) => {
                debug!("No digest sidecar for {}: {}", path.display(), e);
                return CacheCheck::Mismatch;
            }
        };

        match digest_file(&path).await {
            Ok(actual) if actual == recorded => CacheCheck::Valid(actual),
            Ok(_) => CacheCheck::Mismatch,
            Err(e) => {
                debug!("Cannot hash {}: {}", path.display(), e);
                CacheCheck::Mismatch
            }
        }
    }

    /// Make `url` available locally as `desired_filename`.
    ///
    /// A verified copy is returned without touching the network. Otherwise
    /// the body is streamed to a `.part` file while hashing, then moved into
    /// place and its sidecar written.
    pub async fn fetch(&self, url: &Url, desired_filename: &str) -> Result<StoredFile, FetchError> {
        let local_filename = sanitize_filename(desired_filename)
            .ok_or_else(|| FetchError::InvalidFilename(desired_filename.to_string()))?;

        match self.check(&local_filename).await {
            CacheCheck::Valid(content_digest) => {
                debug!("Cache hit for {} ({})", local_filename, &content_digest[..12]);
                return Ok(StoredFile {
                    local_filename,
                    content_digest,
                    cached: true,
                });
            }
            CacheCheck::Mismatch => {
                warn!(
                    "Digest mismatch for {}, downloading again from {}",
                    local_filename, url
                );
            }
            CacheCheck::Absent => {}
        }

        fs::create_dir_all(&self.root)
            .await
            .map_err(|source| FetchError::Write {
                path: self.root.clone(),
                source,
            })?;

        let target = self.path_for(&local_filename);
        let partial = self.path_for(&format!("{}.{}", local_filename, PARTIAL_EXTENSION));

        let content_digest = match self.stream_to(url, &partial).await {
            Ok(digest) => digest,
            Err(e) => {
                let _ = fs::remove_file(&partial).await;
                return Err(e);
            }
        };

        if let Err(source) = fs::rename(&partial, &target).await {
            let _ = fs::remove_file(&partial).await;
            return Err(FetchError::Write {
                path: target,
                source,
            });
        }

        let sidecar = sidecar_path(&target);
        fs::write(&sidecar, &content_digest)
            .await
            .map_err(|source| FetchError::Write {
                path: sidecar,
                source,
            })?;

        info!("Stored {} ({})", local_filename, &content_digest[..12]);

        Ok(StoredFile {
            local_filename,
            content_digest,
            cached: false,
        })
    }

    async fn stream_to(&self, url: &Url, partial: &Path) -> Result<String, FetchError> {
        let transport = |source| FetchError::Transport {
            url: url.to_string(),
            source,
        };
        let write = |source| FetchError::Write {
            path: partial.to_path_buf(),
            source,
        };

        let mut response = self.client.get(url).await.map_err(transport)?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let mut file = fs::File::create(partial).await.map_err(write)?;
        let mut hasher = Sha256::new();
        let mut received = 0usize;

        while let Some(chunk) = response.chunk().await.map_err(transport)? {
            hasher.update(&chunk);
            file.write_all(&chunk).await.map_err(write)?;
            received += chunk.len();
        }
        file.flush().await.map_err(write)?;

        debug!("Received {} bytes from {}", received, url);
        Ok(hex::encode(hasher.finalize()))
    }
}
