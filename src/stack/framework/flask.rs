//! Flask and other single-file WSGI apps

use super::Framework;
use crate::fs::FileSystem;
use std::path::Path;
use tracing::info;

const MAIN_FILE_CANDIDATES: &[&str] = &["application.py", "app.py", "index.py", "server.py"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlaskFramework {
    main_file: String,
}

impl FlaskFramework {
    pub fn detect(fs: &dyn FileSystem, app_path: &Path) -> Option<Self> {
        let main_file = MAIN_FILE_CANDIDATES
            .iter()
            .find(|file| fs.is_file(&app_path.join(file)))?;
        info!("Found main file '{}'", main_file);
        Some(Self {
            main_file: main_file.to_string(),
        })
    }
}

impl Framework for FlaskFramework {
    fn name(&self) -> &'static str {
        "Flask"
    }

    fn gunicorn_module(&self) -> String {
        let module = self.main_file.strip_suffix(".py").unwrap_or(&self.main_file);
        format!("{}:app", module)
    }

    fn debuggable_command(&self, _fs: &dyn FileSystem) -> String {
        self.main_file.clone()
    }
}
