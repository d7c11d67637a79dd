//! Python web framework detection
//!
//! Frameworks are probed in a fixed order and the first one found wins; a
//! repository that looks like both Django and Flask is treated as Django.

use crate::fs::FileSystem;
use std::path::Path;

pub mod django;
pub mod flask;

pub use django::DjangoFramework;
pub use flask::FlaskFramework;

pub trait Framework: std::fmt::Debug {
    fn name(&self) -> &'static str;

    /// WSGI application argument for gunicorn, e.g. `mysite.wsgi`.
    fn gunicorn_module(&self) -> String;

    /// Arguments that run the app under a debugger, relative to the app dir.
    fn debuggable_command(&self, fs: &dyn FileSystem) -> String;
}

/// Finds the framework of the app at `app_path`. `venv_name` is excluded
/// from the Django scan.
pub fn detect_framework(
    fs: &dyn FileSystem,
    app_path: &Path,
    venv_name: Option<&str>,
) -> Option<Box<dyn Framework>> {
    if let Some(django) = DjangoFramework::detect(fs, app_path, venv_name) {
        return Some(Box::new(django));
    }
    FlaskFramework::detect(fs, app_path).map(|flask| Box::new(flask) as Box<dyn Framework>)
}
