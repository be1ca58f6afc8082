//! Byte sources for the static provider.

use std::path::{Path, PathBuf};

use depot_core::alloc::HashMap;

use crate::error::{AssetError, AssetResult};

/// A source of raw asset bytes addressed by `/`-separated locations.
pub trait BytesReader: Send + Sync {
    /// Read all bytes stored at `location`.
    fn read_bytes(&self, location: &str) -> AssetResult<Vec<u8>>;

    /// Check if `location` names a file.
    fn exists(&self, location: &str) -> bool;

    /// Locations of the files directly inside `dir`, sorted.
    ///
    /// Empty if `dir` is not a directory of this reader.
    fn list(&self, dir: &str) -> Vec<String>;
}

/// Reads files below a root directory.
pub struct FileReader {
    /// Base path for relative locations.
    base_path: PathBuf,
}

impl FileReader {
    /// Create a new file reader with a base path.
    pub fn new(base_path: impl AsRef<Path>) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Resolve a location relative to the base path.
    fn resolve_path(&self, location: &str) -> PathBuf {
        let path = Path::new(location);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_path.join(path)
        }
    }
}

impl BytesReader for FileReader {
    fn read_bytes(&self, location: &str) -> AssetResult<Vec<u8>> {
        let full_path = self.resolve_path(location);
        std::fs::read(&full_path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AssetError::NotFound {
                    path: location.to_string(),
                }
            } else {
                AssetError::IoError {
                    path: full_path.clone(),
                    source: e,
                }
            }
        })
    }

    fn exists(&self, location: &str) -> bool {
        self.resolve_path(location).is_file()
    }

    fn list(&self, dir: &str) -> Vec<String> {
        let Ok(entries) = std::fs::read_dir(self.resolve_path(dir)) else {
            return Vec::new();
        };
        let prefix = dir.trim_end_matches('/');
        let mut files: Vec<String> = entries
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_ok_and(|t| t.is_file()))
            .filter_map(|entry| entry.file_name().into_string().ok())
            .map(|name| {
                if prefix.is_empty() {
                    name
                } else {
                    format!("{}/{}", prefix, name)
                }
            })
            .collect();
        files.sort();
        files
    }
}

/// In-memory bytes reader for testing or embedded assets.
#[derive(Default)]
pub struct MemoryReader {
    /// Stored bytes keyed by location.
    files: HashMap<String, Vec<u8>>,
}

impl MemoryReader {
    /// Create a new empty memory reader.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add bytes for a location.
    pub fn insert(&mut self, location: impl AsRef<str>, bytes: Vec<u8>) {
        self.files.insert(location.as_ref().to_string(), bytes);
    }

    /// Add bytes from static data.
    pub fn insert_static(&mut self, location: impl AsRef<str>, bytes: &'static [u8]) {
        self.files.insert(location.as_ref().to_string(), bytes.to_vec());
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with(mut self, location: impl AsRef<str>, bytes: impl Into<Vec<u8>>) -> Self {
        self.insert(location, bytes.into());
        self
    }

    /// Remove bytes for a location.
    pub fn remove(&mut self, location: impl AsRef<str>) -> Option<Vec<u8>> {
        self.files.remove(location.as_ref())
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl BytesReader for MemoryReader {
    fn read_bytes(&self, location: &str) -> AssetResult<Vec<u8>> {
        self.files
            .get(location)
            .cloned()
            .ok_or_else(|| AssetError::NotFound {
                path: location.to_string(),
            })
    }

    fn exists(&self, location: &str) -> bool {
        self.files.contains_key(location)
    }

    fn list(&self, dir: &str) -> Vec<String> {
        let prefix = match dir.trim_end_matches('/') {
            "" => String::new(),
            dir => format!("{}/", dir),
        };
        let mut files: Vec<String> = self
            .files
            .keys()
            .filter(|key| {
                key.strip_prefix(prefix.as_str())
                    .is_some_and(|rest| !rest.is_empty() && !rest.contains('/'))
            })
            .cloned()
            .collect();
        files.sort();
        files
    }
}
