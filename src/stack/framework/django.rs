//! Django: a top-level package containing `wsgi.py`

use super::Framework;
use crate::fs::FileSystem;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DjangoFramework {
    app_path: PathBuf,
    wsgi_module: String,
}

impl DjangoFramework {
    /// Scans the app's subdirectories in name order for `wsgi.py`, skipping
    /// the virtual environment.
    pub fn detect(fs: &dyn FileSystem, app_path: &Path, venv_name: Option<&str>) -> Option<Self> {
        let entries = match fs.read_dir(app_path) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(error = %e, "Could not list app directory");
                return None;
            }
        };

        entries
            .iter()
            .filter(|entry| entry.is_dir() && Some(entry.file_name()) != venv_name)
            .find(|entry| fs.is_file(&entry.path().join("wsgi.py")))
            .map(|entry| {
                debug!("Found wsgi.py in {}", entry.file_name());
                Self {
                    app_path: app_path.to_path_buf(),
                    wsgi_module: format!("{}.wsgi", entry.file_name()),
                }
            })
    }
}

impl Framework for DjangoFramework {
    fn name(&self) -> &'static str {
        "Django"
    }

    fn gunicorn_module(&self) -> String {
        self.wsgi_module.clone()
    }

    fn debuggable_command(&self, fs: &dyn FileSystem) -> String {
        if !fs.is_file(&self.app_path.join("manage.py")) {
            warn!("No 'manage.py' file found in app's root directory");
        }
        "manage.py runserver 0.0.0.0:$PORT".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MockFileSystem;

    fn app() -> MockFileSystem {
        MockFileSystem::with_root(PathBuf::from("/app"))
    }

    #[test]
    fn test_detect_wsgi_module() {
        let fs = app();
        fs.add_file("manage.py", "");
        fs.add_file("mysite/wsgi.py", "");
        fs.add_file("mysite/settings.py", "");

        let django = DjangoFramework::detect(&fs, Path::new("/app"), None).unwrap();
        assert_eq!(django.gunicorn_module(), "mysite.wsgi");
        assert_eq!(
            django.debuggable_command(&fs),
            "manage.py runserver 0.0.0.0:$PORT"
        );
    }

    #[test]
    fn test_first_directory_in_name_order() {
        let fs = app();
        fs.add_file("zeta/wsgi.py", "");
        fs.add_file("alpha/wsgi.py", "");

        let django = DjangoFramework::detect(&fs, Path::new("/app"), None).unwrap();
        assert_eq!(django.gunicorn_module(), "alpha.wsgi");
    }

    #[test]
    fn test_virtual_env_is_skipped() {
        let fs = app();
        fs.add_file("antenv/wsgi.py", "");

        assert!(DjangoFramework::detect(&fs, Path::new("/app"), Some("antenv")).is_none());
        assert!(DjangoFramework::detect(&fs, Path::new("/app"), None).is_some());
    }

    #[test]
    fn test_root_wsgi_is_not_django() {
        let fs = app();
        fs.add_file("wsgi.py", "");
        fs.add_dir("static");

        assert!(DjangoFramework::detect(&fs, Path::new("/app"), None).is_none());
    }

    #[test]
    fn test_unreadable_app_dir() {
        let fs = app();
        assert!(DjangoFramework::detect(&fs, Path::new("/missing"), None).is_none());
    }
}
