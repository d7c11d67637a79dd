use super::{DirEntry, FileSystem, FileType};
use anyhow::{anyhow, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

#[derive(Debug, Clone)]
pub struct MockEntry {
    pub content: Option<String>,
    pub file_type: FileType,
    pub executable: bool,
}

/// In-memory filesystem for detector tests.
pub struct MockFileSystem {
    files: RwLock<BTreeMap<PathBuf, MockEntry>>,
    root: PathBuf,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::with_root(PathBuf::from("/mock"))
    }

    pub fn with_root(root: PathBuf) -> Self {
        let fs = Self {
            files: RwLock::new(BTreeMap::new()),
            root: root.clone(),
        };
        fs.add_dir(root);
        fs
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn add_file(&self, path: impl AsRef<Path>, content: &str) {
        let path = self.normalize_path(path.as_ref());
        let mut files = self.files.write().unwrap();

        if let Some(parent) = path.parent() {
            Self::ensure_parents(&mut files, parent);
        }

        files.insert(
            path,
            MockEntry {
                content: Some(content.to_string()),
                file_type: FileType::File,
                executable: false,
            },
        );
    }

    pub fn add_dir(&self, path: impl AsRef<Path>) {
        let path = self.normalize_path(path.as_ref());
        let mut files = self.files.write().unwrap();
        Self::ensure_parents(&mut files, &path);
    }

    pub fn is_executable(&self, path: impl AsRef<Path>) -> bool {
        let path = self.normalize_path(path.as_ref());
        self.files
            .read()
            .unwrap()
            .get(&path)
            .map(|e| e.executable)
            .unwrap_or(false)
    }

    fn normalize_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    fn ensure_parents(files: &mut BTreeMap<PathBuf, MockEntry>, path: &Path) {
        let mut current = PathBuf::new();
        for component in path.components() {
            current.push(component);
            files.entry(current.clone()).or_insert(MockEntry {
                content: None,
                file_type: FileType::Directory,
                executable: false,
            });
        }
    }

    fn kind_of(&self, path: &Path) -> Option<FileType> {
        let path = self.normalize_path(path);
        self.files.read().unwrap().get(&path).map(|e| e.file_type)
    }
}

impl Default for MockFileSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl FileSystem for MockFileSystem {
    fn exists(&self, path: &Path) -> bool {
        self.kind_of(path).is_some()
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.kind_of(path) == Some(FileType::Directory)
    }

    fn is_file(&self, path: &Path) -> bool {
        self.kind_of(path) == Some(FileType::File)
    }

    fn read_to_string(&self, path: &Path) -> Result<String> {
        let path = self.normalize_path(path);
        let files = self.files.read().unwrap();
        let entry = files
            .get(&path)
            .ok_or_else(|| anyhow!("File not found: {:?}", path))?;

        entry
            .content
            .clone()
            .ok_or_else(|| anyhow!("Not a file: {:?}", path))
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<DirEntry>> {
        let path = self.normalize_path(path);
        let files = self.files.read().unwrap();

        match files.get(&path) {
            Some(entry) if entry.file_type == FileType::Directory => {}
            _ => return Err(anyhow!("Directory not found: {:?}", path)),
        }

        let entries = files
            .iter()
            .filter(|(file_path, _)| file_path.parent() == Some(path.as_path()))
            .map(|(file_path, entry)| DirEntry {
                path: file_path.clone(),
                name: file_path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or("")
                    .to_string(),
                file_type: entry.file_type,
            })
            .collect();

        Ok(entries)
    }

    fn canonicalize(&self, path: &Path) -> Result<PathBuf> {
        let normalized = self.normalize_path(path);
        if self.files.read().unwrap().contains_key(&normalized) {
            Ok(normalized)
        } else {
            Err(anyhow!("Path not found: {:?}", path))
        }
    }

    fn set_executable(&self, path: &Path) -> Result<()> {
        let normalized = self.normalize_path(path);
        let mut files = self.files.write().unwrap();
        match files.get_mut(&normalized) {
            Some(entry) if entry.file_type == FileType::File => {
                entry.executable = true;
                Ok(())
            }
            _ => Err(anyhow!("File not found: {:?}", path)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_file() {
        let fs = MockFileSystem::new();
        fs.add_file("app.py", "import flask");

        assert!(fs.exists(Path::new("/mock/app.py")));
        assert!(fs.is_file(Path::new("/mock/app.py")));
        assert!(fs.is_dir(Path::new("/mock")));
    }

    #[test]
    fn test_add_dir() {
        let fs = MockFileSystem::new();
        fs.add_dir("antenv");

        assert!(fs.is_dir(Path::new("/mock/antenv")));
        assert!(!fs.is_file(Path::new("/mock/antenv")));
    }

    #[test]
    fn test_read_to_string() {
        let fs = MockFileSystem::new();
        fs.add_file("package.json", "{}");

        let content = fs.read_to_string(Path::new("/mock/package.json")).unwrap();
        assert_eq!(content, "{}");
        assert!(fs.read_to_string(Path::new("/mock")).is_err());
    }

    #[test]
    fn test_read_dir_lists_direct_children_sorted() {
        let fs = MockFileSystem::new();
        fs.add_file("zeta.py", "");
        fs.add_file("mysite/wsgi.py", "");
        fs.add_file("alpha.py", "");

        let entries = fs.read_dir(Path::new("/mock")).unwrap();
        let names: Vec<&str> = entries.iter().map(|e| e.file_name()).collect();

        assert_eq!(names, vec!["alpha.py", "mysite", "zeta.py"]);
        assert!(entries[1].is_dir());
    }

    #[test]
    fn test_read_dir_on_file_fails() {
        let fs = MockFileSystem::new();
        fs.add_file("app.py", "");

        assert!(fs.read_dir(Path::new("/mock/app.py")).is_err());
        assert!(fs.read_dir(Path::new("/mock/missing")).is_err());
    }

    #[test]
    fn test_set_executable() {
        let fs = MockFileSystem::new();
        fs.add_file("startup.sh", "echo hi");

        assert!(!fs.is_executable("startup.sh"));
        fs.set_executable(Path::new("/mock/startup.sh")).unwrap();
        assert!(fs.is_executable("startup.sh"));
        assert!(fs.set_executable(Path::new("/mock/none.sh")).is_err());
    }

    #[test]
    fn test_with_root() {
        let fs = MockFileSystem::with_root(PathBuf::from("/home/site/wwwroot"));
        fs.add_file("server.js", "");

        assert!(fs.exists(Path::new("/home/site/wwwroot/server.js")));
        assert_eq!(fs.root(), Path::new("/home/site/wwwroot"));
        assert_eq!(
            fs.canonicalize(Path::new("server.js")).unwrap(),
            PathBuf::from("/home/site/wwwroot/server.js")
        );
    }
}
