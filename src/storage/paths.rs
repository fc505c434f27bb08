// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Path constants and utilities for the on-disk data layout.

use std::path::{Path, PathBuf};

/// Default base directory for all persistent data.
pub const DATA_ROOT: &str = "./data";

/// Storage path utilities.
#[derive(Debug, Clone)]
pub struct StoragePaths {
    root: PathBuf,
}

impl Default for StoragePaths {
    fn default() -> Self {
        Self::new(DATA_ROOT)
    }
}

impl StoragePaths {
    /// Create a new StoragePaths with a custom root (useful for testing).
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Root directory for all data.
    pub fn root(&self) -> &Path {
        &self.root
    }

    // ========== Database ==========

    /// Path to the embedded registry database.
    pub fn database_file(&self) -> PathBuf {
        self.root.join("registry.redb")
    }

    // ========== Content-Addressed Blobs ==========

    /// Directory containing all blobs.
    pub fn blobs_dir(&self) -> PathBuf {
        self.root.join("blobs")
    }

    /// Path to the blob with the given content hash.
    ///
    /// Blobs are fanned out by the first two hex characters of the hash.
    pub fn blob(&self, cid: &str) -> PathBuf {
        let shard = cid.get(..2).unwrap_or("00");
        self.blobs_dir().join(shard).join(cid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_paths_use_data_root() {
        let paths = StoragePaths::default();
        assert_eq!(paths.root(), Path::new("./data"));
        assert_eq!(paths.database_file(), PathBuf::from("./data/registry.redb"));
    }

    #[test]
    fn blob_paths_are_sharded() {
        let paths = StoragePaths::new("/tmp/flair");
        assert_eq!(paths.blobs_dir(), PathBuf::from("/tmp/flair/blobs"));
        assert_eq!(
            paths.blob("ab12cd"),
            PathBuf::from("/tmp/flair/blobs/ab/ab12cd")
        );
        assert_eq!(paths.blob("a"), PathBuf::from("/tmp/flair/blobs/00/a"));
    }
}
