use super::{DirEntry, FileSystem, FileType};
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

pub struct RealFileSystem;

impl RealFileSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RealFileSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl FileSystem for RealFileSystem {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn read_to_string(&self, path: &Path) -> Result<String> {
        fs::read_to_string(path).context(format!("Failed to read file {:?}", path))
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<DirEntry>> {
        let entries = fs::read_dir(path).context(format!("Failed to read directory {:?}", path))?;

        let mut result = Vec::new();
        for entry in entries {
            let entry = entry.context("Failed to read directory entry")?;
            let path = entry.path();
            let name = entry.file_name().to_string_lossy().to_string();
            let file_type = if path.is_file() {
                FileType::File
            } else if path.is_dir() {
                FileType::Directory
            } else {
                FileType::Symlink
            };

            result.push(DirEntry {
                path,
                name,
                file_type,
            });
        }

        // Listing order from the OS is unspecified; scripts must be reproducible.
        result.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(result)
    }

    fn canonicalize(&self, path: &Path) -> Result<PathBuf> {
        path.canonicalize()
            .context(format!("Failed to canonicalize path {:?}", path))
    }

    #[cfg(unix)]
    fn set_executable(&self, path: &Path) -> Result<()> {
        let meta = fs::metadata(path).context(format!("Failed to get metadata for {:?}", path))?;
        let mut perms = meta.permissions();
        perms.set_mode(perms.mode() | 0o111);
        fs::set_permissions(path, perms)
            .context(format!("Failed to set permissions on {:?}", path))
    }

    #[cfg(not(unix))]
    fn set_executable(&self, path: &Path) -> Result<()> {
        fs::metadata(path).context(format!("Failed to get metadata for {:?}", path))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn create_app_dir() -> TempDir {
        let dir = TempDir::new().unwrap();
        let base = dir.path();

        fs::create_dir(base.join("bin")).unwrap();
        fs::File::create(base.join("server.js"))
            .unwrap()
            .write_all(b"require('http')")
            .unwrap();
        fs::File::create(base.join("bin/www"))
            .unwrap()
            .write_all(b"#!/usr/bin/env node")
            .unwrap();
        fs::File::create(base.join("app.js")).unwrap();

        dir
    }

    #[test]
    fn test_exists_and_kinds() {
        let temp = create_app_dir();
        let fs = RealFileSystem::new();

        assert!(fs.exists(temp.path()));
        assert!(fs.is_dir(&temp.path().join("bin")));
        assert!(fs.is_file(&temp.path().join("server.js")));
        assert!(!fs.is_file(&temp.path().join("bin")));
        assert!(!fs.exists(&temp.path().join("missing.js")));
    }

    #[test]
    fn test_read_to_string() {
        let temp = create_app_dir();
        let fs = RealFileSystem::new();

        let content = fs.read_to_string(&temp.path().join("server.js")).unwrap();
        assert_eq!(content, "require('http')");
        assert!(fs.read_to_string(&temp.path().join("nope")).is_err());
    }

    #[test]
    fn test_read_dir_is_sorted() {
        let temp = create_app_dir();
        let fs = RealFileSystem::new();

        let entries = fs.read_dir(temp.path()).unwrap();
        let names: Vec<&str> = entries.iter().map(|e| e.file_name()).collect();

        assert_eq!(names, vec!["app.js", "bin", "server.js"]);
        assert!(entries[1].is_dir());
    }

    #[test]
    fn test_canonicalize() {
        let temp = create_app_dir();
        let fs = RealFileSystem::new();

        let canonical = fs.canonicalize(temp.path()).unwrap();
        assert!(canonical.is_absolute());
    }

    #[cfg(unix)]
    #[test]
    fn test_set_executable() {
        let temp = create_app_dir();
        let fs = RealFileSystem::new();
        let script = temp.path().join("bin/www");

        fs.set_executable(&script).unwrap();

        let mode = std::fs::metadata(&script).unwrap().permissions().mode();
        assert_eq!(mode & 0o111, 0o111);
    }

    #[test]
    fn test_set_executable_missing_file() {
        let temp = create_app_dir();
        let fs = RealFileSystem::new();

        assert!(fs.set_executable(&temp.path().join("missing.sh")).is_err());
    }
}
