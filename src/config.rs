//! Runtime settings and environment access.

pub mod resolver;

pub use resolver::{ConfigResolver, Resolved, ValueSource};

use std::collections::HashMap;
use std::env;

pub const PRE_RUN_COMMAND_VAR: &str = "PRE_RUN_COMMAND";
pub const ENABLE_DYNAMIC_INSTALL_VAR: &str = "ENABLE_DYNAMIC_INSTALL";
pub const PROJECT_VAR: &str = "PROJECT";

const DEFAULT_ENABLE_DYNAMIC_INSTALL: bool = false;

/// Source of environment variables, read at call time.
pub trait EnvSource: Send + Sync {
    fn var(&self, name: &str) -> Option<String>;
}

/// The environment of the current process.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, name: &str) -> Option<String> {
        env::var(name).ok()
    }
}

/// Fixed set of variables, for tests and dry runs.
#[derive(Debug, Clone, Default)]
pub struct MapEnv {
    vars: HashMap<String, String>,
}

impl MapEnv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: &str) -> Self {
        self.vars.insert(name.to_string(), value.to_string());
        self
    }
}

impl EnvSource for MapEnv {
    fn var(&self, name: &str) -> Option<String> {
        self.vars.get(name).cloned()
    }
}

/// Settings taken from the environment the generator runs in, as opposed to
/// the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeSettings {
    /// Shell command run before the application starts.
    pub pre_run_command: Option<String>,
    /// Install the platform on first start when it is missing from the image.
    pub enable_dynamic_install: bool,
    /// .NET project file, relative to the app directory.
    pub project: Option<String>,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self::from_env(&ProcessEnv)
    }
}

impl RuntimeSettings {
    pub fn from_env(env: &dyn EnvSource) -> Self {
        let non_empty = |name: &str| env.var(name).filter(|v| !v.trim().is_empty());

        let pre_run_command = non_empty(PRE_RUN_COMMAND_VAR);

        let enable_dynamic_install = non_empty(ENABLE_DYNAMIC_INSTALL_VAR)
            .and_then(|v| v.trim().to_lowercase().parse::<bool>().ok())
            .unwrap_or(DEFAULT_ENABLE_DYNAMIC_INSTALL);

        let project = non_empty(PROJECT_VAR).map(|v| v.trim().to_string());

        Self {
            pre_run_command,
            enable_dynamic_install,
            project,
        }
    }
}
