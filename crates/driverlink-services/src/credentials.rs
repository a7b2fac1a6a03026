//! Credential storage: durable key-value store for session tokens.
//!
//! The session only ever touches two keys, [`ACCESS_TOKEN_KEY`] and
//! [`REFRESH_TOKEN_KEY`]. Whatever logged the driver in writes both;
//! the token lifecycle manager reads them, replaces the access token after
//! a refresh, and removes both on forced logout.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;

pub const ACCESS_TOKEN_KEY: &str = "access_token";
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";

#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("failed to read {0}: {1}")]
    Read(PathBuf, std::io::Error),
    #[error("failed to parse {0}: {1}")]
    Parse(PathBuf, serde_json::Error),
    #[error("failed to write {0}: {1}")]
    Write(PathBuf, std::io::Error),
    #[error("failed to serialize credentials: {0}")]
    Serialize(serde_json::Error),
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CredentialError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), CredentialError>;

    /// Remove every listed key. Missing keys are not an error.
    async fn remove_many(&self, keys: &[&str]) -> Result<(), CredentialError>;
}

// ── In-memory ────────────────────────────────────────────────────────────────

/// Non-durable store. Clones share the same entries.
#[derive(Clone, Default)]
pub struct MemoryCredentialStore {
    entries: Arc<DashMap<String, String>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with an access token and optional refresh token.
    pub fn with_tokens(access: Option<&str>, refresh: Option<&str>) -> Self {
        let store = Self::new();
        if let Some(a) = access {
            store.entries.insert(ACCESS_TOKEN_KEY.to_string(), a.to_string());
        }
        if let Some(r) = refresh {
            store.entries.insert(REFRESH_TOKEN_KEY.to_string(), r.to_string());
        }
        store
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CredentialError> {
        Ok(self.entries.get(key).map(|v| v.value().clone()))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), CredentialError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove_many(&self, keys: &[&str]) -> Result<(), CredentialError> {
        for key in keys {
            self.entries.remove(*key);
        }
        Ok(())
    }
}

// ── File-backed ──────────────────────────────────────────────────────────────

/// JSON file store. Every mutation rewrites the file; the in-memory map is
/// authoritative for reads.
pub struct FileCredentialStore {
    path: PathBuf,
    entries: DashMap<String, String>,
    write_lock: tokio::sync::Mutex<()>,
}

impl FileCredentialStore {
    /// Open the store at `path`, loading existing entries if the file exists.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, CredentialError> {
        let path = path.into();
        let entries = DashMap::new();

        match tokio::fs::read_to_string(&path).await {
            Ok(text) => {
                let map: BTreeMap<String, String> = serde_json::from_str(&text)
                    .map_err(|e| CredentialError::Parse(path.clone(), e))?;
                tracing::debug!(count = map.len(), path = %path.display(), "loaded stored credentials");
                for (k, v) in map {
                    entries.insert(k, v);
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(CredentialError::Read(path, e)),
        }

        Ok(Self {
            path,
            entries,
            write_lock: tokio::sync::Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self) -> Result<(), CredentialError> {
        let _guard = self.write_lock.lock().await;

        let snapshot: BTreeMap<String, String> = self
            .entries
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();
        let json = serde_json::to_string_pretty(&snapshot).map_err(CredentialError::Serialize)?;

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| CredentialError::Write(self.path.clone(), e))?;
        }

        // Write-then-rename so a crash never leaves a truncated file.
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| CredentialError::Write(tmp.clone(), e))?;
        restrict_permissions(&tmp).await?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| CredentialError::Write(self.path.clone(), e))
    }
}

#[cfg(unix)]
async fn restrict_permissions(path: &Path) -> Result<(), CredentialError> {
    use std::os::unix::fs::PermissionsExt;
    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .await
        .map_err(|e| CredentialError::Write(path.to_path_buf(), e))
}

#[cfg(not(unix))]
async fn restrict_permissions(_path: &Path) -> Result<(), CredentialError> {
    Ok(())
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CredentialError> {
        Ok(self.entries.get(key).map(|v| v.value().clone()))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), CredentialError> {
        self.entries.insert(key.to_string(), value.to_string());
        self.persist().await
    }

    async fn remove_many(&self, keys: &[&str]) -> Result<(), CredentialError> {
        for key in keys {
            self.entries.remove(*key);
        }
        self.persist().await
    }
}
