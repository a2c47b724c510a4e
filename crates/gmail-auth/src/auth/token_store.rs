//! File-backed credential storage
//!
//! The credential lives in a single JSON file readable and writable by the
//! owning user only. Writes go to a sibling temporary file that is renamed
//! over the target, so readers never observe a partially written document.

use super::types::{AuthError, AuthResult, Credential};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

/// Persists a [`Credential`] at a fixed path
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
    writes: Arc<AtomicUsize>,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            writes: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Successful saves through this store and its clones
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Load the stored credential.
    ///
    /// Returns [`AuthError::NotFound`] when there is no file and
    /// [`AuthError::Corrupt`] when it cannot be read or decoded.
    pub async fn load(&self) -> AuthResult<Credential> {
        debug!("Loading credential from {}", self.path.display());

        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(AuthError::NotFound(self.path.clone()));
            }
            Err(e) => return Err(self.corrupt(e.to_string())),
        };

        let credential: Credential =
            serde_json::from_str(&content).map_err(|e| self.corrupt(e.to_string()))?;
        if credential.access_token.is_empty() {
            return Err(self.corrupt("access_token is empty".to_string()));
        }

        self.warn_if_exposed().await;
        Ok(credential)
    }

    /// Replace the stored credential.
    ///
    /// The file is created with mode `0600`; any previous content is
    /// replaced atomically.
    pub async fn save(&self, credential: &Credential) -> AuthResult<()> {
        info!("Saving credential file to {}", self.path.display());

        let json = serde_json::to_vec_pretty(credential)
            .map_err(|e| self.persist_error(io::Error::new(io::ErrorKind::InvalidData, e)))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| self.persist_error(e))?;
        }

        let tmp_path = self.temp_path();
        if let Err(e) = write_private_file(&tmp_path, &json).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(self.persist_error(e));
        }

        if let Err(e) = tokio::fs::rename(&tmp_path, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(self.persist_error(e));
        }

        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    /// Delete the stored credential. Returns `false` if there was none.
    pub async fn clear(&self) -> AuthResult<bool> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {
                info!("Removed credential file {}", self.path.display());
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(self.persist_error(e)),
        }
    }

    fn temp_path(&self) -> PathBuf {
        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "credential".to_string());
        self.path
            .with_file_name(format!(".{}.{}.tmp", file_name, std::process::id()))
    }

    fn corrupt(&self, reason: String) -> AuthError {
        AuthError::Corrupt {
            path: self.path.clone(),
            reason,
        }
    }

    fn persist_error(&self, source: io::Error) -> AuthError {
        AuthError::PersistError {
            path: self.path.clone(),
            source,
        }
    }

    #[cfg(unix)]
    async fn warn_if_exposed(&self) {
        use std::os::unix::fs::PermissionsExt;

        if let Ok(metadata) = tokio::fs::metadata(&self.path).await {
            let mode = metadata.permissions().mode();
            if mode & 0o077 != 0 {
                warn!(
                    "Credential file {} is accessible by other users (mode {:o})",
                    self.path.display(),
                    mode & 0o777
                );
            }
        }
    }

    #[cfg(not(unix))]
    async fn warn_if_exposed(&self) {}
}

async fn write_private_file(path: &Path, contents: &[u8]) -> io::Result<()> {
    let mut options = tokio::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    options.mode(0o600);

    let mut file = options.open(path).await?;

    // mode() only applies on creation; tighten a leftover temp file too
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(std::fs::Permissions::from_mode(0o600))
            .await?;
    }

    file.write_all(contents).await?;
    file.write_all(b"\n").await?;
    file.sync_all().await?;
    Ok(())
}
