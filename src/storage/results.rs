//! Storage result types
//!
//! Defines the metadata structures returned by storage operations.

use std::time::SystemTime;

/// Metadata of a single file or directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    pub size: u64,
    pub is_directory: bool,
    pub modified: SystemTime,
}

/// One entry of a directory listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub metadata: Metadata,
}

impl DirEntry {
    pub fn size(&self) -> u64 {
        self.metadata.size
    }

    pub fn is_directory(&self) -> bool {
        self.metadata.is_directory
    }

    pub fn modified(&self) -> SystemTime {
        self.metadata.modified
    }
}
