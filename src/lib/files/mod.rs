//! Directory listing, confined to a configurable root.

use std::{
    fs::DirEntry,
    io,
    path::{Component, Path, PathBuf},
    time::SystemTime,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::*;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    pub name: String,
    pub is_dir: bool,
    /// Bytes, meaningless for directories
    pub size: i64,
    pub mod_time: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum FilesError {
    #[error("Failed to read directory {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Path {0:?} is outside of the browsable root")]
    OutsideRoot(PathBuf),
}

#[derive(Clone, Debug)]
pub struct FileBrowser {
    root: PathBuf,
}

impl Default for FileBrowser {
    fn default() -> Self {
        Self::new("/")
    }
}

impl FileBrowser {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// List the immediate children of `path`, relative to the browsable root.
    ///
    /// An empty path lists the root itself.
    #[instrument(level = "debug", skip(self))]
    pub fn list_directory(&self, path: &str) -> Result<Vec<DirectoryEntry>, FilesError> {
        let directory = self.resolve(path)?;

        let entries = std::fs::read_dir(&directory).map_err(|source| FilesError::Read {
            path: directory.clone(),
            source,
        })?;

        let entries = entries
            .map(|entry| {
                entry
                    .map(directory_entry)
                    .map_err(|source| FilesError::Read {
                        path: directory.clone(),
                        source,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        debug!("Listed {} entries in {directory:?}", entries.len());

        Ok(entries)
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, FilesError> {
        let requested = if path.is_empty() { "/" } else { path };

        // Requested paths are always taken as relative to the root
        let relative: PathBuf = Path::new(requested)
            .components()
            .filter(|component| !matches!(component, Component::RootDir | Component::Prefix(_)))
            .collect();

        let root = canonicalize(&self.root)?;
        let resolved = canonicalize(&root.join(relative))?;

        if !resolved.starts_with(&root) {
            warn!("Refusing to list {resolved:?}, outside of {root:?}");
            return Err(FilesError::OutsideRoot(PathBuf::from(requested)));
        }

        Ok(resolved)
    }
}

fn canonicalize(path: &Path) -> Result<PathBuf, FilesError> {
    path.canonicalize().map_err(|source| FilesError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn directory_entry(entry: DirEntry) -> DirectoryEntry {
    let name = entry.file_name().to_string_lossy().into_owned();

    // Entries may vanish between the listing and the stat
    let metadata = match entry.metadata() {
        Ok(metadata) => Some(metadata),
        Err(error) => {
            trace!("Failed to stat {name:?}: {error}");
            None
        }
    };

    let is_dir = match &metadata {
        Some(metadata) => metadata.is_dir(),
        None => entry
            .file_type()
            .map(|file_type| file_type.is_dir())
            .unwrap_or_default(),
    };

    let size = metadata
        .as_ref()
        .map(|metadata| i64::try_from(metadata.len()).unwrap_or(i64::MAX))
        .unwrap_or_default();

    let mod_time = metadata
        .and_then(|metadata| metadata.modified().ok())
        .unwrap_or(SystemTime::UNIX_EPOCH);

    DirectoryEntry {
        name,
        is_dir,
        size,
        mod_time: mod_time.into(),
    }
}
