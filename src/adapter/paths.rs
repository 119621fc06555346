//! adapter::paths
//!
//! Path routing for a file store directory.
//!
//! # Storage Layout
//!
//! Everything a file store owns lives under one directory:
//! - `store.json` - The store document
//! - `store.json.tmp` - Scratch file for atomic writes
//! - `lock` - Exclusive lock file
//!
//! No code outside this module should join these names onto a store
//! directory.
//!
//! # Example
//!
//! ```
//! use schemata::adapter::StorePaths;
//! use std::path::PathBuf;
//!
//! let paths = StorePaths::new(PathBuf::from("/data/schema"));
//!
//! assert_eq!(
//!     paths.document_path(),
//!     PathBuf::from("/data/schema/store.json")
//! );
//! ```

use std::path::{Path, PathBuf};

/// Path routing for one file store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorePaths {
    root: PathBuf,
}

impl StorePaths {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// The store directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The store document, `<root>/store.json`.
    pub fn document_path(&self) -> PathBuf {
        self.root.join("store.json")
    }

    /// Scratch file renamed over the document on write.
    pub fn temp_document_path(&self) -> PathBuf {
        self.root.join("store.json.tmp")
    }

    /// The lock file, `<root>/lock`.
    pub fn lock_path(&self) -> PathBuf {
        self.root.join("lock")
    }

    /// Create the store directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an IO error if directory creation fails.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.root)
    }
}
