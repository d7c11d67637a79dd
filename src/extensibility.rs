//! Optional per-app YAML files that extend the generated script.
//!
//! `extensibility.yaml` may carry an `env:` list of `{name, value}` pairs that
//! are exported before the app starts. `appsvc.yaml` may carry a `run:` entry
//! that is appended after the primary script has been written. Neither file is
//! required, and a malformed file only produces a warning.

use crate::fs::FileSystem;
use regex::Regex;
use serde::Deserialize;
use std::path::Path;
use std::sync::OnceLock;
use tracing::{debug, warn};

pub const EXTENSIBLE_CONFIG_FILE_NAME: &str = "extensibility.yaml";
pub const APPSVC_FILE_NAME: &str = "appsvc.yaml";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExtensibleConfig {
    #[serde(default)]
    pub env: Vec<EnvEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EnvEntry {
    pub name: String,
    #[serde(default)]
    pub value: serde_yaml::Value,
}

#[derive(Debug, Default, Deserialize)]
struct AppSvcConfig {
    #[serde(default)]
    run: Option<String>,
}

fn env_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap())
}

/// Quotes a value so the shell takes it literally.
pub fn single_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

fn scalar_to_string(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::Null => Some(String::new()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::String(s) => Some(s.clone()),
        _ => None,
    }
}

impl ExtensibleConfig {
    pub fn parse(content: &str) -> Result<Self, serde_yaml::Error> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
    }

    pub fn load(fs: &dyn FileSystem, app_path: &Path) -> Self {
        let path = app_path.join(EXTENSIBLE_CONFIG_FILE_NAME);
        if !fs.is_file(&path) {
            return Self::default();
        }

        let parsed = fs
            .read_to_string(&path)
            .map_err(|e| e.to_string())
            .and_then(|content| Self::parse(&content).map_err(|e| e.to_string()));

        match parsed {
            Ok(config) => {
                debug!("Found extensible configuration with {} entries", config.env.len());
                config
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring malformed extensible configuration");
                Self::default()
            }
        }
    }

    /// `export NAME='VALUE'` for each valid entry, in file order.
    pub fn export_lines(&self) -> Vec<String> {
        self.env
            .iter()
            .filter_map(|entry| {
                let name = entry.name.trim();
                if !env_name_pattern().is_match(name) {
                    warn!("Skipping invalid environment variable name '{}'", name);
                    return None;
                }
                let Some(value) = scalar_to_string(&entry.value) else {
                    warn!("Skipping non-scalar value for '{}'", name);
                    return None;
                };
                Some(format!("export {}={}", name, single_quote(&value)))
            })
            .collect()
    }
}

/// The `run:` command from `appsvc.yaml`, if any.
pub fn load_user_run_command(fs: &dyn FileSystem, app_path: &Path) -> Option<String> {
    let path = app_path.join(APPSVC_FILE_NAME);
    if !fs.is_file(&path) {
        return None;
    }

    let content = match fs.read_to_string(&path) {
        Ok(content) => content,
        Err(e) => {
            warn!(error = %e, "Could not read {}", APPSVC_FILE_NAME);
            return None;
        }
    };

    match serde_yaml::from_str::<AppSvcConfig>(&content) {
        Ok(config) => config
            .run
            .map(|run| run.trim().to_string())
            .filter(|run| !run.is_empty()),
        Err(e) => {
            warn!(error = %e, "Ignoring malformed {}", APPSVC_FILE_NAME);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MockFileSystem;
    use std::path::PathBuf;

    fn app_fs() -> MockFileSystem {
        MockFileSystem::with_root(PathBuf::from("/app"))
    }

    #[test]
    fn test_single_env_value() {
        let config = ExtensibleConfig::parse("env:\n  - name: FOO\n    value: BAR").unwrap();
        assert_eq!(config.export_lines(), vec!["export FOO='BAR'"]);
    }

    #[test]
    fn test_multiple_env_values_keep_order() {
        let config = ExtensibleConfig::parse(
            "env:\n  - name: FOO\n    value: BAR\n  - name: HELLO\n    value: WORLD",
        )
        .unwrap();
        assert_eq!(
            config.export_lines(),
            vec!["export FOO='BAR'", "export HELLO='WORLD'"]
        );
    }

    #[test]
    fn test_no_env_section() {
        let config = ExtensibleConfig::parse("other: value").unwrap();
        assert!(config.export_lines().is_empty());
    }

    #[test]
    fn test_value_quoting_and_scalars() {
        let config = ExtensibleConfig::parse(
            "env:\n  - name: GREETING\n    value: \"it's here\"\n  - name: WORKERS\n    value: 4\n  - name: EMPTY",
        )
        .unwrap();
        assert_eq!(
            config.export_lines(),
            vec![
                r"export GREETING='it'\''s here'",
                "export WORKERS='4'",
                "export EMPTY=''",
            ]
        );
    }

    #[test]
    fn test_invalid_names_skipped() {
        let config = ExtensibleConfig::parse(
            "env:\n  - name: \"1BAD\"\n    value: x\n  - name: \"rm -rf\"\n    value: y\n  - name: GOOD\n    value: z",
        )
        .unwrap();
        assert_eq!(config.export_lines(), vec!["export GOOD='z'"]);
    }

    #[test]
    fn test_load_missing_file() {
        let fs = app_fs();
        assert!(ExtensibleConfig::load(&fs, Path::new("/app")).env.is_empty());
    }

    #[test]
    fn test_load_malformed_file() {
        let fs = app_fs();
        fs.add_file(EXTENSIBLE_CONFIG_FILE_NAME, "env: [unclosed");
        assert!(ExtensibleConfig::load(&fs, Path::new("/app")).env.is_empty());
    }

    #[test]
    fn test_load_from_app_dir() {
        let fs = app_fs();
        fs.add_file(EXTENSIBLE_CONFIG_FILE_NAME, "env:\n  - name: A\n    value: b\n");
        let config = ExtensibleConfig::load(&fs, Path::new("/app"));
        assert_eq!(config.export_lines(), vec!["export A='b'"]);
    }

    #[test]
    fn test_user_run_command() {
        let fs = app_fs();
        fs.add_file(APPSVC_FILE_NAME, "run: |\n  echo hello\n  echo world\n");
        assert_eq!(
            load_user_run_command(&fs, Path::new("/app")).as_deref(),
            Some("echo hello\necho world")
        );
    }

    #[test]
    fn test_user_run_command_absent_or_malformed() {
        let fs = app_fs();
        assert_eq!(load_user_run_command(&fs, Path::new("/app")), None);

        fs.add_file(APPSVC_FILE_NAME, "run: [oops");
        assert_eq!(load_user_run_command(&fs, Path::new("/app")), None);

        fs.add_file(APPSVC_FILE_NAME, "build: make\n");
        assert_eq!(load_user_run_command(&fs, Path::new("/app")), None);
    }
}
