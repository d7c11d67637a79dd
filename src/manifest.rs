//! Build manifest written by the build phase.
//!
//! The manifest is a flat TOML document of string values. It is read once per
//! run and passed by value to whoever needs it; a missing or unreadable file
//! is never fatal and yields an empty manifest.

use crate::fs::FileSystem;
use crate::stack::PlatformId;
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, warn};

pub const MANIFEST_FILE_NAME: &str = "oryx-manifest.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BuildManifest {
    #[serde(rename = "operationId")]
    pub operation_id: Option<String>,
    #[serde(rename = "platformName")]
    pub platform_name: Option<String>,

    #[serde(rename = "nodeVersion")]
    pub node_version: Option<String>,
    #[serde(rename = "compressedNodeModulesFile")]
    pub compressed_node_modules_file: Option<String>,

    #[serde(rename = "pythonVersion")]
    pub python_version: Option<String>,
    #[serde(rename = "virtualEnvName")]
    pub virtual_env_name: Option<String>,
    #[serde(rename = "compressedVirtualEnvFile")]
    pub compressed_virtual_env_file: Option<String>,
    #[serde(rename = "packagedir")]
    pub package_dir: Option<String>,

    #[serde(rename = "dotnetCoreSdkVersion")]
    pub dotnet_sdk_version: Option<String>,
    #[serde(rename = "dotnetCoreRuntimeVersion")]
    pub dotnet_runtime_version: Option<String>,
    #[serde(rename = "StartupDllFileName")]
    pub startup_dll_file_name: Option<String>,

    #[serde(rename = "startupFileName")]
    pub startup_file_name: Option<String>,
    #[serde(rename = "zipAllOutput")]
    pub zip_all_output: Option<String>,

    #[serde(rename = "phpVersion")]
    pub php_version: Option<String>,
    #[serde(rename = "rubyVersion")]
    pub ruby_version: Option<String>,
    #[serde(rename = "golangVersion")]
    pub golang_version: Option<String>,
    #[serde(rename = "hugoVersion")]
    pub hugo_version: Option<String>,
}

/// Treats empty and whitespace-only values as absent.
pub fn non_empty(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

impl BuildManifest {
    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Loads the manifest from `manifest_dir`, or from the app directory when
    /// no manifest directory was given.
    pub fn load(fs: &dyn FileSystem, manifest_dir: Option<&Path>, app_path: &Path) -> Self {
        let dir = manifest_dir.unwrap_or(app_path);
        let path = dir.join(MANIFEST_FILE_NAME);

        if !fs.is_file(&path) {
            debug!("No build manifest found at {}", path.display());
            return Self::default();
        }

        let content = match fs.read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                warn!(error = %e, "Could not read build manifest, continuing without it");
                return Self::default();
            }
        };

        match Self::parse(&content) {
            Ok(manifest) => {
                debug!("Loaded build manifest from {}", path.display());
                manifest
            }
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "Malformed build manifest, continuing without it"
                );
                Self::default()
            }
        }
    }

    /// Operation id recorded by the build, or a fresh one for this run.
    pub fn operation_id(&self) -> String {
        non_empty(&self.operation_id)
            .map(str::to_string)
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
    }

    pub fn zips_all_output(&self) -> bool {
        non_empty(&self.zip_all_output)
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    }

    /// Version of the platform's SDK or runtime recorded at build time.
    pub fn version_for(&self, platform: &PlatformId) -> Option<&str> {
        let field = match platform {
            PlatformId::DotNet => &self.dotnet_sdk_version,
            PlatformId::Node => &self.node_version,
            PlatformId::Php => &self.php_version,
            PlatformId::Python => &self.python_version,
            PlatformId::Ruby => &self.ruby_version,
            PlatformId::Golang => &self.golang_version,
            PlatformId::Hugo => &self.hugo_version,
            PlatformId::Custom(_) => return None,
        };
        non_empty(field)
    }
}
