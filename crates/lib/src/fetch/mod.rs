//! Artifact fetching and integrity verification.
//!
//! Artifacts are downloaded over HTTPS into a temporary directory owned by the
//! [`Fetcher`], hashed before they touch the disk, and only marked verified
//! when the hash matches. Without a published digest a weaker length and
//! content-shape check applies, unless the settings demand a digest.

pub mod digest;
pub mod transport;

use std::path::{Path, PathBuf};

use reqwest::Url;
use serde::Serialize;
use tempfile::TempDir;
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

pub use digest::ExpectedDigest;
pub use transport::{HttpTransport, Transport};

use crate::consts::{APP_NAME, MIN_ARTIFACT_BYTES};

/// Transport-level failures. Safe to retry: nothing has been executed.
#[derive(Debug, Error)]
pub enum FetchError {
  #[error("refusing non-https URL: {url}")]
  InsecureUrl { url: String },

  #[error("invalid URL '{url}': {message}")]
  InvalidUrl { url: String, message: String },

  #[error("request to {url} timed out")]
  Timeout { url: String },

  #[error("request to {url} failed: {message}")]
  Request { url: String, message: String },

  #[error("{url} returned HTTP {status}")]
  Status { url: String, status: u16 },

  #[error("failed to build HTTP client: {message}")]
  Client { message: String },

  #[error("failed to store download: {0}")]
  Io(#[from] std::io::Error),
}

impl FetchError {
  /// Whether trying the same request again could succeed.
  pub fn is_retryable(&self) -> bool {
    !matches!(self, Self::InsecureUrl { .. } | Self::InvalidUrl { .. } | Self::Client { .. })
  }
}

/// The artifact could not be trusted. Never retried, never bypassed.
#[derive(Debug, Error)]
pub enum IntegrityError {
  #[error("{algorithm} mismatch for {url}: expected {expected}, got {actual}")]
  DigestMismatch {
    url: String,
    algorithm: &'static str,
    expected: String,
    actual: String,
  },

  #[error("sanity check failed for {url}: {reason}")]
  SanityCheckFailed { url: String, reason: String },

  #[error("no digest is published for {url} and a digest is required")]
  DigestRequired { url: String },

  #[error("checksum list {sums_url} has no entry for {file_name}")]
  MissingDigest { sums_url: String, file_name: String },

  #[error("malformed digest '{value}'")]
  MalformedDigest { value: String },

  #[error("artifact {} has not been verified", path.display())]
  NotVerified { path: PathBuf },

  #[error("artifact {} changed on disk since verification", path.display())]
  ChangedOnDisk { path: PathBuf },

  #[error("failed to re-read artifact {}: {source}", path.display())]
  Reread {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
}

#[derive(Debug, Error)]
pub enum ArtifactError {
  #[error(transparent)]
  Fetch(#[from] FetchError),

  #[error(transparent)]
  Integrity(#[from] IntegrityError),
}

/// Where the known-good digest for an artifact comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DigestSource {
  Pinned(ExpectedDigest),
  /// A `sha*sum`-style list published next to the artifact.
  Published { sums_url: String },
  Unpublished,
}

/// Content shape, used by the fallback check when no digest exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArtifactKind {
  ShellScript,
  ComposeManifest,
}

impl ArtifactKind {
  fn check_shape(self, data: &[u8]) -> Result<(), String> {
    if data.len() < MIN_ARTIFACT_BYTES {
      return Err(format!("{} bytes is below the {} byte minimum", data.len(), MIN_ARTIFACT_BYTES));
    }
    match self {
      Self::ShellScript => {
        if data.starts_with(b"#!") {
          Ok(())
        } else {
          Err("shell script does not start with a shebang".to_string())
        }
      }
      Self::ComposeManifest => {
        let value: serde_yaml::Value =
          serde_yaml::from_slice(data).map_err(|e| format!("compose manifest is not YAML: {e}"))?;
        if value.get("services").is_some_and(serde_yaml::Value::is_mapping) {
          Ok(())
        } else {
          Err("compose manifest has no services mapping".to_string())
        }
      }
    }
  }
}

/// A downloaded installation artifact.
///
/// Only [`Fetcher::fetch`] produces a verified artifact. Anything built with
/// [`Artifact::unverified`] must pass through verification before use.
#[derive(Debug, Clone, Serialize)]
pub struct Artifact {
  source_url: String,
  local_path: PathBuf,
  kind: ArtifactKind,
  expected_digest: Option<ExpectedDigest>,
  verified: bool,
}

impl Artifact {
  /// An artifact of unknown provenance, e.g. one read back from a cache.
  pub fn unverified(
    source_url: impl Into<String>,
    local_path: impl Into<PathBuf>,
    kind: ArtifactKind,
    expected_digest: Option<ExpectedDigest>,
  ) -> Self {
    Self {
      source_url: source_url.into(),
      local_path: local_path.into(),
      kind,
      expected_digest,
      verified: false,
    }
  }

  pub fn source_url(&self) -> &str {
    &self.source_url
  }

  pub fn local_path(&self) -> &Path {
    &self.local_path
  }

  pub fn kind(&self) -> ArtifactKind {
    self.kind
  }

  pub fn expected_digest(&self) -> Option<&ExpectedDigest> {
    self.expected_digest.as_ref()
  }

  pub fn is_verified(&self) -> bool {
    self.verified
  }

  /// Re-read the file and check it again.
  ///
  /// Fails for an unverified artifact without touching the disk.
  pub fn reverify(&self) -> Result<(), IntegrityError> {
    if !self.verified {
      return Err(IntegrityError::NotVerified {
        path: self.local_path.clone(),
      });
    }

    let data = std::fs::read(&self.local_path).map_err(|source| IntegrityError::Reread {
      path: self.local_path.clone(),
      source,
    })?;

    let intact = match &self.expected_digest {
      Some(digest) => digest.check(&data).is_ok(),
      None => self.kind.check_shape(&data).is_ok(),
    };
    if intact {
      Ok(())
    } else {
      Err(IntegrityError::ChangedOnDisk {
        path: self.local_path.clone(),
      })
    }
  }
}

/// Downloads artifacts into a private temporary directory.
///
/// The directory and everything in it is removed when the fetcher drops.
pub struct Fetcher<T> {
  transport: T,
  dir: TempDir,
  require_digest: bool,
}

impl<T: Transport> Fetcher<T> {
  pub fn new(transport: T, require_digest: bool) -> Result<Self, FetchError> {
    let dir = tempfile::Builder::new().prefix(&format!("{APP_NAME}-")).tempdir()?;
    debug!(dir = %dir.path().display(), "created download directory");
    Ok(Self {
      transport,
      dir,
      require_digest,
    })
  }

  /// The private download directory.
  pub fn dir(&self) -> &Path {
    self.dir.path()
  }

  /// Download `url` and verify it against `source`.
  pub async fn fetch(&self, url: &str, source: &DigestSource, kind: ArtifactKind) -> Result<Artifact, ArtifactError> {
    let parsed = require_https(url)?;
    let file_name = url_to_filename(&parsed);

    let expected = match source {
      DigestSource::Pinned(digest) => Some(digest.clone()),
      DigestSource::Published { sums_url } => {
        let sums_url = require_https(sums_url)?;
        let body = self.transport.get(&sums_url).await?;
        let content = String::from_utf8_lossy(&body);
        Some(digest::lookup_sums(&content, &file_name, sums_url.as_str())?)
      }
      DigestSource::Unpublished if self.require_digest => {
        return Err(IntegrityError::DigestRequired { url: url.to_string() }.into());
      }
      DigestSource::Unpublished => None,
    };

    info!(url = %url, "fetching artifact");
    let bytes = self.transport.get(&parsed).await?;

    // Verify before anything is written.
    match &expected {
      Some(digest) => {
        debug!(url = %url, expected = %digest, "checking digest");
        if let Err(actual) = digest.check(&bytes) {
          return Err(
            IntegrityError::DigestMismatch {
              url: url.to_string(),
              algorithm: digest.algorithm(),
              expected: digest.hex().to_string(),
              actual,
            }
            .into(),
          );
        }
      }
      None => {
        warn!(url = %url, "no digest published, falling back to length and shape check");
        kind
          .check_shape(&bytes)
          .map_err(|reason| IntegrityError::SanityCheckFailed {
            url: url.to_string(),
            reason,
          })?;
      }
    }

    let dest_path = self.dir.path().join(&file_name);
    let mut file = fs::File::create(&dest_path).await.map_err(FetchError::Io)?;
    file.write_all(&bytes).await.map_err(FetchError::Io)?;
    file.flush().await.map_err(FetchError::Io)?;

    info!(path = %dest_path.display(), size = bytes.len(), "artifact verified");

    Ok(Artifact {
      source_url: url.to_string(),
      local_path: dest_path,
      kind,
      expected_digest: expected,
      verified: true,
    })
  }
}

fn require_https(url: &str) -> Result<Url, FetchError> {
  let parsed = Url::parse(url).map_err(|e| FetchError::InvalidUrl {
    url: url.to_string(),
    message: e.to_string(),
  })?;
  if parsed.scheme() != "https" {
    return Err(FetchError::InsecureUrl { url: url.to_string() });
  }
  Ok(parsed)
}

/// Convert a URL to a safe filename.
///
/// Takes the last path component and sanitizes it. Falls back to a hash of
/// the URL if no suitable filename can be extracted.
fn url_to_filename(url: &Url) -> String {
  if let Some(filename) = url.path_segments().and_then(|mut segments| segments.next_back()) {
    let sanitized: String = filename
      .chars()
      .map(|c| {
        if c.is_alphanumeric() || c == '-' || c == '_' || c == '.' {
          c
        } else {
          '_'
        }
      })
      .collect();

    if !sanitized.is_empty() && sanitized != "." && sanitized != ".." {
      return sanitized;
    }
  }

  format!("download_{}", &digest::sha256_hex(url.as_str().as_bytes())[..16])
}
