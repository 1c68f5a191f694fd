//! Shared session state: the working directory and environment snapshot
//! consulted by every execution.
//!
//! The record lives behind a single `RwLock`. Directory-dependent operations
//! snapshot-read it once at dispatch and never re-read mid-execution, so a
//! command always runs against the directory that was current when it was
//! dispatched. Only a successful directory change takes the write lock.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::error::{GatewayError, Result};

#[derive(Debug, Clone)]
pub struct SessionState {
    cwd: PathBuf,
    env: HashMap<String, String>,
}

/// Cheap-to-clone handle to the single session record.
#[derive(Clone)]
pub struct SessionHandle {
    inner: Arc<RwLock<SessionState>>,
}

impl SessionHandle {
    /// Initialize from the process working directory and environment.
    pub fn from_process() -> Self {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("/"));
        Self::new(cwd, std::env::vars().collect())
    }

    pub fn new(cwd: PathBuf, env: HashMap<String, String>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(SessionState { cwd, env })),
        }
    }

    pub async fn current_dir(&self) -> PathBuf {
        self.inner.read().await.cwd.clone()
    }

    /// Snapshot the working directory and environment in one read.
    pub async fn snapshot(&self) -> (PathBuf, HashMap<String, String>) {
        let state = self.inner.read().await;
        (state.cwd.clone(), state.env.clone())
    }

    /// Replace the working directory after validating the target exists,
    /// is a directory, and is readable. The swap is atomic under the write
    /// lock; concurrent readers never observe partial state.
    pub async fn set_dir(&self, path: &Path) -> Result<PathBuf> {
        let resolved = validate_dir(path)?;
        let mut state = self.inner.write().await;
        state.cwd = resolved.clone();
        Ok(resolved)
    }
}

/// Check that `path` is an existing, readable directory and canonicalize it.
pub fn validate_dir(path: &Path) -> Result<PathBuf> {
    let display = path.display().to_string();
    let resolved = std::fs::canonicalize(path)
        .map_err(|_| GatewayError::NotADirectory(display.clone()))?;
    if !resolved.is_dir() {
        return Err(GatewayError::NotADirectory(display));
    }
    std::fs::read_dir(&resolved).map_err(|_| GatewayError::NotReadable(display))?;
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle() -> SessionHandle {
        SessionHandle::new(std::env::temp_dir(), HashMap::new())
    }

    #[tokio::test]
    async fn set_dir_replaces_cwd() {
        let session = handle();
        let target = tempfile::tempdir().unwrap();
        let resolved = session.set_dir(target.path()).await.unwrap();
        assert_eq!(session.current_dir().await, resolved);
    }

    #[tokio::test]
    async fn set_dir_rejects_missing_target() {
        let session = handle();
        let before = session.current_dir().await;
        let err = session
            .set_dir(Path::new("/definitely/not/a/dir"))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::NotADirectory(_)));
        assert_eq!(session.current_dir().await, before);
    }

    #[tokio::test]
    async fn set_dir_rejects_file_target() {
        let session = handle();
        let file = tempfile::NamedTempFile::new().unwrap();
        let err = session.set_dir(file.path()).await.unwrap_err();
        assert!(matches!(err, GatewayError::NotADirectory(_)));
    }

    #[tokio::test]
    async fn snapshot_returns_both_fields() {
        let mut env = HashMap::new();
        env.insert("MARKER".to_string(), "1".to_string());
        let session = SessionHandle::new(std::env::temp_dir(), env);
        let (cwd, env) = session.snapshot().await;
        assert_eq!(cwd, std::env::temp_dir());
        assert_eq!(env.get("MARKER").map(String::as_str), Some("1"));
    }
}
