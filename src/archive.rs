//! ZIP bundling of the storage area
//!
//! The archive is built in memory from every eligible file currently in the
//! storage area. Reading is not coordinated with a run that may still be
//! writing, so an archive taken mid-run can hold a partial set of files.

use crate::error::{Error, Result};
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Extension of files eligible for the archive
const ELIGIBLE_EXTENSION: &str = "json";

/// Highest deflate level
const COMPRESSION_LEVEL: i32 = 9;

/// Eligible files in `directory`, sorted by name
///
/// Only regular files with a `.json` extension qualify. A missing directory
/// yields an empty list.
pub fn eligible_files(directory: &Path) -> Result<Vec<PathBuf>> {
    let entries = match std::fs::read_dir(directory) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(Error::storage(directory, e)),
    };

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| Error::storage(directory, e))?;
        let path = entry.path();

        if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
            continue;
        }

        if path.extension().and_then(|e| e.to_str()) == Some(ELIGIBLE_EXTENSION) {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}

/// Builds a compressed archive of one directory
pub struct ArchiveBuilder {
    directory: PathBuf,
}

impl ArchiveBuilder {
    /// Builder for `directory`
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    /// Build the archive bytes
    ///
    /// Returns [`Error::ArchiveUnavailable`] when the directory does not exist or
    /// holds no eligible files.
    pub fn build(&self) -> Result<Vec<u8>> {
        if !self.directory.is_dir() {
            return Err(Error::ArchiveUnavailable("No files found to zip".to_string()));
        }

        let files = eligible_files(&self.directory)?;
        if files.is_empty() {
            return Err(Error::ArchiveUnavailable(
                "No JSON files found to zip".to_string(),
            ));
        }

        debug!(directory = ?self.directory, count = files.len(), "building archive");

        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = zip::write::FileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated)
            .compression_level(Some(COMPRESSION_LEVEL));

        for path in &files {
            let name = match path.file_name().and_then(|n| n.to_str()) {
                Some(name) => name,
                None => continue,
            };
            let content = std::fs::read(path).map_err(|e| Error::storage(path, e))?;
            writer.start_file(name, options)?;
            writer.write_all(&content)?;
        }

        let bytes = writer.finish()?.into_inner();
        info!(
            directory = ?self.directory,
            count = files.len(),
            bytes = bytes.len(),
            "archive built"
        );
        Ok(bytes)
    }

    /// Build the archive on the blocking thread pool
    pub async fn build_async(self) -> Result<Vec<u8>> {
        tokio::task::spawn_blocking(move || self.build())
            .await
            .map_err(|e| Error::Other(format!("archive task failed: {}", e)))?
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::TempDir;

    fn read_archive(bytes: Vec<u8>) -> Vec<(String, Vec<u8>)> {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        (0..archive.len())
            .map(|i| {
                let mut file = archive.by_index(i).unwrap();
                let mut content = Vec::new();
                file.read_to_end(&mut content).unwrap();
                (file.name().to_string(), content)
            })
            .collect()
    }

    #[test]
    fn test_build_missing_directory_is_unavailable() {
        let temp_dir = TempDir::new().unwrap();
        let result = ArchiveBuilder::new(temp_dir.path().join("absent")).build();

        match result {
            Err(Error::ArchiveUnavailable(msg)) => assert_eq!(msg, "No files found to zip"),
            other => panic!("expected ArchiveUnavailable, got {:?}", other.map(|b| b.len())),
        }
    }

    #[test]
    fn test_build_empty_directory_is_unavailable() {
        let temp_dir = TempDir::new().unwrap();
        let result = ArchiveBuilder::new(temp_dir.path()).build();

        assert!(matches!(result, Err(Error::ArchiveUnavailable(_))));
    }

    #[test]
    fn test_build_ignores_ineligible_entries() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("notes.txt"), "skip me").unwrap();
        std::fs::create_dir(temp_dir.path().join("nested.json")).unwrap();

        let result = ArchiveBuilder::new(temp_dir.path()).build();
        assert!(matches!(result, Err(Error::ArchiveUnavailable(_))));
    }

    #[test]
    fn test_build_contains_exactly_eligible_files() {
        let temp_dir = TempDir::new().unwrap();
        let files: [(&str, &[u8]); 3] = [
            ("0.json", br#"{"id":0}"#),
            ("1.json", br#"{"id":1,"name":"x"}"#),
            ("10.json", b"not actually json"),
        ];
        for (name, content) in files {
            std::fs::write(temp_dir.path().join(name), content).unwrap();
        }
        std::fs::write(temp_dir.path().join("readme.md"), "ignored").unwrap();

        let bytes = ArchiveBuilder::new(temp_dir.path()).build().unwrap();
        let entries = read_archive(bytes);

        assert_eq!(entries.len(), 3);
        for ((name, content), (expected_name, expected_content)) in entries.iter().zip(files) {
            assert_eq!(name, expected_name);
            assert_eq!(content.as_slice(), expected_content);
        }
    }

    #[test]
    fn test_eligible_files_sorted_and_filtered() {
        let temp_dir = TempDir::new().unwrap();
        for name in ["b.json", "a.json", "c.JSONX", "d.json.tmp"] {
            std::fs::write(temp_dir.path().join(name), "{}").unwrap();
        }

        let files = eligible_files(temp_dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();

        assert_eq!(names, vec!["a.json", "b.json"]);
    }

    #[test]
    fn test_eligible_files_missing_directory_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        assert!(
            eligible_files(&temp_dir.path().join("nope"))
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn test_build_async_matches_build() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("5.json"), "{}").unwrap();

        let bytes = ArchiveBuilder::new(temp_dir.path())
            .build_async()
            .await
            .unwrap();
        let entries = read_archive(bytes);

        assert_eq!(entries, vec![("5.json".to_string(), b"{}".to_vec())]);
    }
}
