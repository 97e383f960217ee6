//! Object store for idea attachments.
//!
//! Objects are addressed by `{idea_id}/{filename}` keys. The store only
//! holds bytes; the list of attachment URLs lives on the idea row, and the
//! two are updated one after the other without a compensating step.
//!
//! ## Example
//!
//! ```rust,ignore
//! use ideaboard_db::{object_key, FilesystemObjectStore, ObjectStore};
//!
//! let store = FilesystemObjectStore::new("/var/ideaboard/files", "http://localhost:3000/files");
//! let key = object_key(7, "sketch.png")?;
//! store.put(&key, &bytes, "image/png").await?;
//! assert_eq!(store.public_url(&key), "http://localhost:3000/files/7/sketch.png");
//! ```

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use ideaboard_core::{Error, Result};

/// Bytes read back from the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub data: Vec<u8>,
    /// Content type recorded at upload, when the backend keeps one.
    pub content_type: Option<String>,
}

/// Key-addressed blob storage.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Write an object, replacing any existing object under the same key.
    async fn put(&self, key: &str, data: &[u8], content_type: &str) -> Result<()>;

    /// Read an object. `None` when the key holds nothing.
    async fn get(&self, key: &str) -> Result<Option<StoredObject>>;

    /// Delete an object. Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Public URL of a key. Does not check that the object exists.
    fn public_url(&self, key: &str) -> String;
}

/// Reduce a client-supplied file name to a single path component.
///
/// Directory prefixes (either separator) are dropped; names that are empty
/// or refer to a directory (`.`, `..`) are rejected.
pub fn sanitize_filename(name: &str) -> Result<String> {
    let base = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();
    if base.is_empty() || base == "." || base == ".." || base.chars().any(char::is_control) {
        return Err(Error::InvalidInput(format!(
            "'{}' is not a usable file name",
            name
        )));
    }
    Ok(base.to_string())
}

/// Object key for a file attached to an idea.
pub fn object_key(idea_id: i64, filename: &str) -> Result<String> {
    Ok(format!("{}/{}", idea_id, sanitize_filename(filename)?))
}

/// Build `{base}/{key}` with every key segment percent-encoded.
fn join_url(base: &str, key: &str) -> String {
    let encoded: Vec<String> = key
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect();
    format!("{}/{}", base.trim_end_matches('/'), encoded.join("/"))
}

/// Filesystem object store.
///
/// Objects live at `{base_path}/{key}`; writes go to a temp file first and
/// are renamed into place.
pub struct FilesystemObjectStore {
    base_path: PathBuf,
    public_base_url: String,
}

impl FilesystemObjectStore {
    pub fn new(base_path: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            base_path: base_path.into(),
            public_base_url: public_base_url.into(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Resolve a key under the base directory, refusing anything that could
    /// escape it.
    fn full_path(&self, key: &str) -> Result<PathBuf> {
        let relative = Path::new(key);
        let all_normal = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if key.is_empty() || !all_normal {
            return Err(Error::InvalidInput(format!("invalid object key '{}'", key)));
        }
        Ok(self.base_path.join(relative))
    }

    /// Create the base directory and confirm it is writable.
    pub async fn validate(&self) -> Result<()> {
        fs::create_dir_all(&self.base_path).await.map_err(|e| {
            Error::Storage(format!(
                "create_dir_all({}): {}",
                self.base_path.display(),
                e
            ))
        })?;
        let probe = self.base_path.join(".health-check");
        fs::write(&probe, b"ok")
            .await
            .map_err(|e| Error::Storage(format!("write({}): {}", probe.display(), e)))?;
        let _ = fs::remove_file(&probe).await;
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for FilesystemObjectStore {
    async fn put(&self, key: &str, data: &[u8], content_type: &str) -> Result<()> {
        let full_path = self.full_path(key)?;
        debug!(
            subsystem = "object_store",
            component = "filesystem",
            op = "put",
            object_key = %key,
            content_type = %content_type,
            size = data.len(),
            "Writing object"
        );

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                warn!(parent = %parent.display(), error = %e, "object_store: create_dir_all failed");
                e
            })?;
        }

        let mut temp_name = full_path.as_os_str().to_owned();
        temp_name.push(".tmp");
        let temp_path = PathBuf::from(temp_name);

        let mut file = fs::File::create(&temp_path).await.map_err(|e| {
            warn!(temp_path = %temp_path.display(), error = %e, "object_store: File::create failed");
            e
        })?;
        file.write_all(data).await?;
        file.sync_all().await?;
        drop(file);

        fs::rename(&temp_path, &full_path).await.map_err(|e| {
            warn!(from = %temp_path.display(), to = %full_path.display(), error = %e, "object_store: rename failed");
            e
        })?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<StoredObject>> {
        let full_path = self.full_path(key)?;
        match fs::read(&full_path).await {
            Ok(data) => Ok(Some(StoredObject {
                data,
                content_type: None,
            })),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let full_path = self.full_path(key)?;
        match fs::remove_file(&full_path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(object_key = %key, "object_store: delete of missing object");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    fn public_url(&self, key: &str) -> String {
        join_url(&self.public_base_url, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(dir: &tempfile::TempDir) -> FilesystemObjectStore {
        FilesystemObjectStore::new(dir.path(), "http://localhost:3000/files/")
    }

    #[test]
    fn test_sanitize_filename_strips_directories() {
        assert_eq!(sanitize_filename("notes.txt").unwrap(), "notes.txt");
        assert_eq!(sanitize_filename("a/b/notes.txt").unwrap(), "notes.txt");
        assert_eq!(sanitize_filename("C:\\Users\\x\\notes.txt").unwrap(), "notes.txt");
    }

    #[test]
    fn test_sanitize_filename_rejects_directory_names() {
        for name in ["", "  ", ".", "..", "dir/", "../..", "bad\u{0}name"] {
            assert!(
                matches!(sanitize_filename(name), Err(Error::InvalidInput(_))),
                "{:?} should be rejected",
                name
            );
        }
    }

    #[test]
    fn test_object_key_format() {
        assert_eq!(object_key(42, "plan.pdf").unwrap(), "42/plan.pdf");
        assert_eq!(object_key(42, "../../etc/passwd").unwrap(), "42/passwd");
    }

    #[test]
    fn test_public_url_is_deterministic_and_encoded() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        assert_eq!(
            store.public_url("7/sketch.png"),
            "http://localhost:3000/files/7/sketch.png"
        );
        assert_eq!(
            store.public_url("7/my sketch.png"),
            "http://localhost:3000/files/7/my%20sketch.png"
        );
    }

    #[tokio::test]
    async fn test_put_get_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);

        store.put("1/a.txt", b"hello", "text/plain").await.unwrap();
        assert!(dir.path().join("1/a.txt").exists());
        assert!(!dir.path().join("1/a.txt.tmp").exists());

        let object = store.get("1/a.txt").await.unwrap().unwrap();
        assert_eq!(object.data, b"hello");

        store.delete("1/a.txt").await.unwrap();
        assert!(store.get("1/a.txt").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_overwrites_existing_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);

        store.put("1/a.txt", b"first", "text/plain").await.unwrap();
        store.put("1/a.txt", b"second", "text/plain").await.unwrap();

        let object = store.get("1/a.txt").await.unwrap().unwrap();
        assert_eq!(object.data, b"second");
    }

    #[tokio::test]
    async fn test_delete_missing_object_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        store(&dir).delete("9/none.bin").await.unwrap();
    }

    #[tokio::test]
    async fn test_keys_cannot_escape_base() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        for key in ["../x", "/etc/passwd", "1/../../x", ""] {
            assert!(
                matches!(store.put(key, b"x", "text/plain").await, Err(Error::InvalidInput(_))),
                "{:?} should be rejected",
                key
            );
        }
    }

    #[tokio::test]
    async fn test_validate_creates_base_dir() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a/b");
        let store = FilesystemObjectStore::new(&nested, "http://x");
        store.validate().await.unwrap();
        assert!(nested.is_dir());
    }
}
