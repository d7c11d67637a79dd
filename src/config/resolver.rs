//! Layered resolution of script settings.
//!
//! Precedence is explicit value, then environment variable, then build
//! manifest, then built-in default. Empty strings are treated as absent at
//! every layer.

use super::{EnvSource, ProcessEnv};
use crate::manifest::BuildManifest;
use std::fmt;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueSource {
    Explicit,
    Environment,
    Manifest,
    Default,
}

impl fmt::Display for ValueSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ValueSource::Explicit => "explicit",
            ValueSource::Environment => "environment",
            ValueSource::Manifest => "manifest",
            ValueSource::Default => "default",
        };
        write!(f, "{}", s)
    }
}

/// Outcome of resolving one named setting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub name: String,
    pub value: String,
    pub source: ValueSource,
    /// Manifest value, or the default. This is what a script falls back to
    /// when the variable is unset at run time.
    pub fallback: String,
}

impl Resolved {
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Shell statement that makes the setting visible to the started app.
    ///
    /// An explicit value is exported unconditionally. In every other case the
    /// fallback is exported only if the variable is unset when the script
    /// runs, so an environment value always survives.
    pub fn export_statement(&self) -> Option<String> {
        match self.source {
            ValueSource::Explicit => Some(format!("export {}={}", self.name, self.value)),
            _ if self.fallback.is_empty() => None,
            _ => Some(format!(
                "if [ -z \"${name}\" ]; then export {name}={value}; fi",
                name = self.name,
                value = self.fallback
            )),
        }
    }
}

fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Resolves settings against the environment and an injected manifest.
pub struct ConfigResolver {
    env: Box<dyn EnvSource>,
    manifest: BuildManifest,
}

impl ConfigResolver {
    pub fn new(env: Box<dyn EnvSource>, manifest: BuildManifest) -> Self {
        Self { env, manifest }
    }

    pub fn from_process_env(manifest: BuildManifest) -> Self {
        Self::new(Box::new(ProcessEnv), manifest)
    }

    pub fn manifest(&self) -> &BuildManifest {
        &self.manifest
    }

    pub fn resolve(
        &self,
        explicit: Option<&str>,
        env_var: &str,
        manifest_value: Option<&str>,
        default: &str,
    ) -> Resolved {
        let manifest_value = present(manifest_value);
        let fallback = manifest_value.unwrap_or(default).to_string();
        let from_env = self.env.var(env_var);

        let (value, source) = if let Some(v) = present(explicit) {
            (v.to_string(), ValueSource::Explicit)
        } else if let Some(v) = present(from_env.as_deref()) {
            (v.to_string(), ValueSource::Environment)
        } else if let Some(v) = manifest_value {
            (v.to_string(), ValueSource::Manifest)
        } else {
            (default.to_string(), ValueSource::Default)
        };

        debug!(name = env_var, source = %source, "Resolved setting");

        Resolved {
            name: env_var.to_string(),
            value,
            source,
            fallback,
        }
    }
}
