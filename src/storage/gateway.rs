//! Storage Gateway
//!
//! The single place where user-supplied names become filesystem paths.
//! Every path handed to the filesystem goes through [`path::resolve`]
//! first; the gateway keeps no index or cache, the directory is the state.

use std::path::{Path, PathBuf};

use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncRead, AsyncWriteExt};
use uuid::Uuid;

use super::path;
use crate::config::StorageConfig;
use crate::error::{Error, Result};

/// Directory inside the root holding in-flight uploads; never listed
const PARTIAL_DIR: &str = ".wolfdrop-partial";

/// A stored file located by [`StorageGateway::retrieve`]
#[derive(Debug, Clone)]
pub struct StoredFile {
    /// Safe name the file was requested by
    pub name: String,
    /// Resolved path inside the storage root
    pub path: PathBuf,
    /// Size in bytes at lookup time
    pub size: u64,
}

impl StoredFile {
    /// Open the file for streaming back to a client
    pub async fn open(&self) -> Result<File> {
        File::open(&self.path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::NotFound(self.name.clone()),
            _ => Error::Io(e),
        })
    }
}

/// Maps safe names to contained paths and performs file I/O under one root
#[derive(Debug)]
pub struct StorageGateway {
    /// Canonical storage root
    root: PathBuf,
    /// Sync uploads to disk before renaming them into place
    fsync: bool,
}

impl StorageGateway {
    /// Create the gateway, creating the root directory (and parents) if needed
    pub fn new(config: &StorageConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.root)?;

        let root = std::fs::canonicalize(&config.root)?;
        if !root.is_dir() {
            return Err(Error::Config(format!(
                "storage root {} is not a directory",
                root.display()
            )));
        }

        std::fs::create_dir_all(root.join(PARTIAL_DIR))?;

        tracing::debug!(root = %root.display(), "Storage root ready");

        Ok(Self {
            root,
            fsync: config.fsync,
        })
    }

    /// Get the canonical storage root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Strip path separators from a user-supplied name
    pub fn sanitize(raw: &str) -> String {
        path::sanitize(raw)
    }

    /// Resolve a safe name to a path strictly inside the root
    pub fn resolve(&self, safe_name: &str) -> Result<PathBuf> {
        path::resolve(&self.root, safe_name)
    }

    /// Names of the regular files directly inside the root, sorted
    pub async fn list(&self) -> Result<Vec<String>> {
        let mut entries = fs::read_dir(&self.root).await?;
        let mut names = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let name = match entry.file_name().into_string() {
                Ok(name) => name,
                Err(raw) => {
                    tracing::debug!(name = ?raw, "Skipping non UTF-8 file name");
                    continue;
                }
            };

            // Follows symlinks, like a download would
            match fs::metadata(entry.path()).await {
                Ok(meta) if meta.is_file() => names.push(name),
                Ok(_) => {}
                Err(e) => tracing::debug!(name = %name, error = %e, "Skipping unreadable entry"),
            }
        }

        names.sort();
        Ok(names)
    }

    /// Write `reader` to `safe_name`, replacing any existing file.
    ///
    /// Content goes to a temporary file under the root's partial-upload
    /// directory first and is renamed over the target once complete, so
    /// readers see either the old or the new file. Returns the number of
    /// bytes written.
    pub async fn store<R>(&self, safe_name: &str, mut reader: R) -> Result<u64>
    where
        R: AsyncRead + Unpin,
    {
        // Reserved for in-flight uploads, can never hold a stored file
        if safe_name == PARTIAL_DIR {
            return Err(Error::InvalidPath(safe_name.to_string()));
        }

        let target = self.resolve(safe_name)?;
        let partial_dir = self.resolve(PARTIAL_DIR)?;
        fs::create_dir_all(&partial_dir).await?;
        let temp = path::resolve(&partial_dir, &format!("{}.part", Uuid::new_v4()))?;

        let written = match self.write_temp(&temp, &mut reader).await {
            Ok(written) => written,
            Err(e) => {
                discard(&temp).await;
                return Err(e);
            }
        };

        if let Err(e) = fs::rename(&temp, &target).await {
            discard(&temp).await;
            return Err(e.into());
        }

        tracing::info!(name = %safe_name, bytes = written, "Stored file");
        Ok(written)
    }

    /// Locate `safe_name` for download
    pub async fn retrieve(&self, safe_name: &str) -> Result<StoredFile> {
        let path = self.resolve(safe_name)?;

        match fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Ok(StoredFile {
                name: safe_name.to_string(),
                path,
                size: meta.len(),
            }),
            Ok(_) => Err(Error::NotFound(safe_name.to_string())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(Error::NotFound(safe_name.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn write_temp<R>(&self, temp: &Path, reader: &mut R) -> Result<u64>
    where
        R: AsyncRead + Unpin,
    {
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(temp)
            .await?;

        let written = tokio::io::copy(reader, &mut file).await?;
        file.flush().await?;

        if self.fsync {
            file.sync_all().await?;
        }

        Ok(written)
    }
}

async fn discard(temp: &Path) {
    if let Err(e) = fs::remove_file(temp).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(path = %temp.display(), error = %e, "Failed to remove partial upload");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use tokio::io::AsyncReadExt;

    fn test_config(root: PathBuf) -> StorageConfig {
        StorageConfig { root, fsync: false }
    }

    async fn read_back(gateway: &StorageGateway, name: &str) -> Vec<u8> {
        let stored = gateway.retrieve(name).await.unwrap();
        let mut file = stored.open().await.unwrap();
        let mut content = Vec::new();
        file.read_to_end(&mut content).await.unwrap();
        content
    }

    #[tokio::test]
    async fn test_new_creates_missing_root() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("nested").join("store");

        let gateway = StorageGateway::new(&test_config(root.clone())).unwrap();
        assert!(root.is_dir());
        assert_eq!(gateway.root(), std::fs::canonicalize(&root).unwrap());
    }

    #[tokio::test]
    async fn test_new_fails_when_root_is_a_file() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("occupied");
        std::fs::write(&root, b"not a directory").unwrap();

        assert!(StorageGateway::new(&test_config(root)).is_err());
    }

    #[tokio::test]
    async fn test_store_list_retrieve() {
        let dir = tempdir().unwrap();
        let gateway = StorageGateway::new(&test_config(dir.path().to_path_buf())).unwrap();

        assert!(gateway.list().await.unwrap().is_empty());

        let written = gateway.store("a.txt", &b"hello"[..]).await.unwrap();
        assert_eq!(written, 5);
        assert_eq!(gateway.list().await.unwrap(), vec!["a.txt".to_string()]);

        let stored = gateway.retrieve("a.txt").await.unwrap();
        assert_eq!(stored.size, 5);
        assert_eq!(read_back(&gateway, "a.txt").await, b"hello");
    }

    #[tokio::test]
    async fn test_store_overwrites_without_duplicates() {
        let dir = tempdir().unwrap();
        let gateway = StorageGateway::new(&test_config(dir.path().to_path_buf())).unwrap();

        gateway.store("report.bin", &b"first version"[..]).await.unwrap();
        gateway.store("report.bin", &b"second"[..]).await.unwrap();
        gateway.store("report.bin", &b"second"[..]).await.unwrap();

        assert_eq!(gateway.list().await.unwrap(), vec!["report.bin".to_string()]);
        assert_eq!(read_back(&gateway, "report.bin").await, b"second");
    }

    #[tokio::test]
    async fn test_binary_round_trip() {
        let dir = tempdir().unwrap();
        let gateway = StorageGateway { root: std::fs::canonicalize(dir.path()).unwrap(), fsync: true };

        let content: Vec<u8> = (0..=255u8).cycle().take(200_000).collect();
        gateway.store("blob", content.as_slice()).await.unwrap();

        assert_eq!(read_back(&gateway, "blob").await, content);
    }

    fn partial_entries(gateway: &StorageGateway) -> Vec<std::ffi::OsString> {
        std::fs::read_dir(gateway.root().join(PARTIAL_DIR))
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect()
    }

    #[tokio::test]
    async fn test_list_skips_directories() {
        let dir = tempdir().unwrap();
        let gateway = StorageGateway::new(&test_config(dir.path().to_path_buf())).unwrap();

        std::fs::create_dir(gateway.root().join("subdir")).unwrap();
        std::fs::write(gateway.root().join(PARTIAL_DIR).join("1234.part"), b"partial").unwrap();
        gateway.store("b.txt", &b"b"[..]).await.unwrap();
        gateway.store("a.txt", &b"a"[..]).await.unwrap();

        assert_eq!(
            gateway.list().await.unwrap(),
            vec!["a.txt".to_string(), "b.txt".to_string()]
        );
    }

    #[tokio::test]
    async fn test_store_leaves_no_temp_files() {
        let dir = tempdir().unwrap();
        let gateway = StorageGateway::new(&test_config(dir.path().to_path_buf())).unwrap();

        gateway.store("a.txt", &b"hello"[..]).await.unwrap();

        assert!(partial_entries(&gateway).is_empty());
        assert_eq!(gateway.list().await.unwrap(), vec!["a.txt".to_string()]);
    }

    #[tokio::test]
    async fn test_names_shaped_like_uploads_in_flight_are_listed() {
        let dir = tempdir().unwrap();
        let gateway = StorageGateway::new(&test_config(dir.path().to_path_buf())).unwrap();

        gateway.store(".wolfdrop-notes.part", &b"mine"[..]).await.unwrap();
        gateway.store(".wolfdrop-1234", &b"also mine"[..]).await.unwrap();

        assert_eq!(
            gateway.list().await.unwrap(),
            vec![".wolfdrop-1234".to_string(), ".wolfdrop-notes.part".to_string()]
        );
        assert_eq!(read_back(&gateway, ".wolfdrop-notes.part").await, b"mine");
    }

    #[tokio::test]
    async fn test_store_rejects_partial_directory_name() {
        let dir = tempdir().unwrap();
        let gateway = StorageGateway::new(&test_config(dir.path().to_path_buf())).unwrap();

        let result = gateway.store(PARTIAL_DIR, &b"data"[..]).await;
        assert!(matches!(result, Err(Error::InvalidPath(_))));
        assert!(gateway.root().join(PARTIAL_DIR).is_dir());
        assert!(matches!(gateway.retrieve(PARTIAL_DIR).await, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_store_rejects_escaping_names() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("store");
        let gateway = StorageGateway::new(&test_config(root)).unwrap();

        for name in ["..", ".", ""] {
            let result = gateway.store(name, &b"evil"[..]).await;
            assert!(matches!(result, Err(Error::InvalidPath(_))), "{:?}", name);
        }

        assert!(gateway.list().await.unwrap().is_empty());
        let siblings: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(siblings.len(), 1);
    }

    #[tokio::test]
    async fn test_traversal_name_is_stored_inside_root() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("store");
        let gateway = StorageGateway::new(&test_config(root)).unwrap();

        let safe = StorageGateway::sanitize("../../etc/passwd");
        gateway.store(&safe, &b"root:x:0:0"[..]).await.unwrap();

        assert_eq!(gateway.list().await.unwrap(), vec!["....etcpasswd".to_string()]);
        assert!(gateway.root().join("....etcpasswd").is_file());
        assert!(!dir.path().join("etc").exists());
    }

    #[tokio::test]
    async fn test_retrieve_missing_and_directories() {
        let dir = tempdir().unwrap();
        let gateway = StorageGateway::new(&test_config(dir.path().to_path_buf())).unwrap();
        std::fs::create_dir(gateway.root().join("subdir")).unwrap();

        let safe = StorageGateway::sanitize("../secret");
        assert_eq!(safe, "..secret");
        assert!(matches!(gateway.retrieve(&safe).await, Err(Error::NotFound(_))));
        assert!(matches!(gateway.retrieve("subdir").await, Err(Error::NotFound(_))));
        assert!(matches!(gateway.retrieve("..").await, Err(Error::InvalidPath(_))));
        assert!(matches!(gateway.retrieve("").await, Err(Error::InvalidPath(_))));
    }

    #[tokio::test]
    async fn test_failed_store_cleans_up() {
        let dir = tempdir().unwrap();
        let gateway = StorageGateway::new(&test_config(dir.path().to_path_buf())).unwrap();

        // Renaming a file over a non-empty directory fails
        std::fs::create_dir(gateway.root().join("taken")).unwrap();
        std::fs::write(gateway.root().join("taken").join("inner"), b"x").unwrap();

        let result = gateway.store("taken", &b"data"[..]).await;
        assert!(matches!(result, Err(Error::Io(_))));

        assert!(partial_entries(&gateway).is_empty());
    }
}
