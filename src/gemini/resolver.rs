//! Maps a validated request path to file contents under the content root.
//!
//! The only traversal defense is [`check_traversal`]: a path is rejected
//! unless lexically cleaning it leaves it unchanged. Files are always
//! opened relative to the root, never as absolute paths.

use std::path::{Component, Path, PathBuf};

use bytes::Bytes;
use tokio::fs::File;
use tokio::io::AsyncReadExt;
use tokio::time::{Instant, timeout_at};

use crate::gemini::error::{ConnectionError, RequestError, ResourceError, TransportError};

/// File served for requests that name a directory.
pub const DEFAULT_DOCUMENT: &str = "index.gmi";

/// A file read fully into memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    /// Canonical request path, e.g. `/sub/index.gmi`.
    pub path: String,
    pub body: Bytes,
}

/// Ensures a leading `/` and appends the default document to directory
/// paths.
pub fn normalize(path: &str) -> String {
    let mut normalized = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    };
    if normalized.ends_with('/') {
        normalized.push_str(DEFAULT_DOCUMENT);
    }
    normalized
}

/// Lexically simplifies a slash-separated path: collapses repeated
/// separators, drops `.` segments, resolves `..` against the preceding
/// segment and removes any trailing separator. `..` never climbs above
/// the root of a rooted path.
pub fn clean_path(path: &str) -> String {
    let rooted = path.starts_with('/');
    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => match segments.last() {
                Some(&last) if last != ".." => {
                    segments.pop();
                }
                _ if rooted => {}
                _ => segments.push(".."),
            },
            other => segments.push(other),
        }
    }

    let joined = segments.join("/");
    match (rooted, joined.is_empty()) {
        (true, _) => format!("/{joined}"),
        (false, true) => ".".to_string(),
        (false, false) => joined,
    }
}

/// Returns the cleaned path if cleaning does not change it.
pub fn check_traversal(normalized: &str) -> Result<String, RequestError> {
    let cleaned = clean_path(normalized);
    if cleaned != normalized {
        return Err(RequestError::BadPath {
            original: normalized.to_string(),
            cleaned,
        });
    }
    Ok(cleaned)
}

#[derive(Debug, Clone)]
pub struct Resolver {
    root: PathBuf,
}

impl Resolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Normalizes, checks and loads `path`. File I/O is bounded by
    /// `deadline`.
    pub async fn resolve(&self, path: &str, deadline: Instant) -> Result<Resource, ConnectionError> {
        let canonical = check_traversal(&normalize(path))?;
        tracing::debug!(path = %canonical, "Attempting to open file");

        match timeout_at(deadline, self.load(&canonical)).await {
            Ok(body) => Ok(Resource {
                path: canonical,
                body: body?,
            }),
            Err(_) => Err(TransportError::Timeout.into()),
        }
    }

    async fn load(&self, canonical: &str) -> Result<Bytes, ResourceError> {
        let not_found = |source| ResourceError::NotFound {
            path: canonical.to_string(),
            source,
        };

        let full = self.join(canonical).ok_or_else(|| {
            not_found(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "path segment is not a plain file name",
            ))
        })?;

        let mut file = File::open(&full).await.map_err(not_found)?;
        let metadata = file.metadata().await.map_err(not_found)?;
        if metadata.is_dir() {
            return Err(not_found(std::io::Error::new(
                std::io::ErrorKind::IsADirectory,
                "is a directory",
            )));
        }

        let mut body = Vec::with_capacity(metadata.len() as usize);
        file.read_to_end(&mut body)
            .await
            .map_err(|source| ResourceError::Read {
                path: canonical.to_string(),
                source,
            })?;

        Ok(Bytes::from(body))
    }

    /// Joins a canonical request path onto the root one segment at a time.
    /// Any segment the platform would read as more than a plain name (a
    /// native separator, a drive prefix) makes the path unresolvable.
    fn join(&self, canonical: &str) -> Option<PathBuf> {
        let mut full = self.root.clone();
        for segment in canonical.split('/').filter(|s| !s.is_empty()) {
            let mut components = Path::new(segment).components();
            match (components.next(), components.next()) {
                (Some(Component::Normal(part)), None) => full.push(part),
                _ => return None,
            }
        }
        Some(full)
    }
}
