//! File-backed credential store.
//!
//! The store is a whole JSON document shared with the rest of the
//! application config. Only the `oauth` section belongs to us: every write
//! loads the full document, replaces that section and writes the document
//! back through a temp file + rename, so other sections are preserved and a
//! concurrent reader sees either the old or the new file, never a mix.

use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde_json::{Map, Value};

use crate::credential::{Credential, TokenPair};
use crate::error::{AuthError, Result};

/// Key of the credential section within the document.
pub const OAUTH_SECTION: &str = "oauth";

/// Persisted credential record.
#[derive(Debug)]
pub struct TokenStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the current credential.
    ///
    /// A document without an `oauth` section yields an empty credential.
    pub fn load(&self) -> Result<Credential> {
        let document = self.read_document()?;
        section_from(&document, &self.path)
    }

    /// Atomic read-modify-write of the credential section.
    ///
    /// Writers are serialized; the closure sees the freshest on-disk state.
    pub fn update<F>(&self, mutate: F) -> Result<Credential>
    where
        F: FnOnce(&mut Credential),
    {
        let _guard = self.write_lock.lock();

        let mut document = match self.read_document() {
            Ok(document) => document,
            Err(_) if !self.path.exists() => Map::new(),
            Err(e) => return Err(e),
        };
        let mut credential = section_from(&document, &self.path)?;
        mutate(&mut credential);

        let section = serde_json::to_value(&credential)
            .map_err(|e| AuthError::store(&self.path, format!("serialize: {e}")))?;
        document.insert(OAUTH_SECTION.to_string(), section);

        let bytes = serde_json::to_vec_pretty(&Value::Object(document))
            .map_err(|e| AuthError::store(&self.path, format!("serialize: {e}")))?;
        write_atomic(&self.path, &bytes)?;

        tracing::debug!(path = %self.path.display(), "Credential store rewritten");
        Ok(credential)
    }

    /// Persist a freshly issued token pair.
    pub fn store_tokens(&self, tokens: &TokenPair) -> Result<Credential> {
        self.update(|credential| credential.apply(tokens))
    }

    fn read_document(&self) -> Result<Map<String, Value>> {
        let content = std::fs::read_to_string(&self.path)
            .map_err(|e| AuthError::store(&self.path, format!("read: {e}")))?;
        match serde_json::from_str(&content) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(AuthError::store(
                &self.path,
                "document root is not a JSON object",
            )),
            Err(e) => Err(AuthError::store(&self.path, format!("parse: {e}"))),
        }
    }
}

fn section_from(document: &Map<String, Value>, path: &Path) -> Result<Credential> {
    match document.get(OAUTH_SECTION) {
        Some(section) => serde_json::from_value(section.clone())
            .map_err(|e| AuthError::store(path, format!("invalid oauth section: {e}"))),
        None => Ok(Credential::default()),
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .map_err(|e| AuthError::store(path, format!("create dir: {e}")))?;
    }

    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("credentials");
    let tmp_path = path.with_file_name(format!(".{file_name}.tmp"));

    std::fs::write(&tmp_path, bytes)
        .map_err(|e| AuthError::store(path, format!("write temp file: {e}")))?;

    // The record holds client secrets and tokens.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&tmp_path, std::fs::Permissions::from_mode(0o600))
            .map_err(|e| AuthError::store(path, format!("set permissions: {e}")))?;
    }

    std::fs::rename(&tmp_path, path).map_err(|e| {
        let _ = std::fs::remove_file(&tmp_path);
        AuthError::store(path, format!("replace: {e}"))
    })
}
