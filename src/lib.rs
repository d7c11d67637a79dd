//! startupgen - startup script generator for application containers
//!
//! Given a built application directory, startupgen works out how the app is
//! started and writes the POSIX shell script a container entrypoint runs.
//!
//! # Core Concepts
//!
//! - **Build manifest**: metadata left behind by the build (compressed
//!   artifacts, startup file, platform versions)
//! - **Configuration resolver**: merges explicit flags, environment variables
//!   and manifest values with fixed precedence
//! - **Runtime**: per-platform detector that picks the startup command from
//!   an ordered list of strategies
//! - **Script builder**: assembles the script with the startup command last
//!
//! # Example Usage
//!
//! ```no_run
//! use startupgen::config::{ConfigResolver, RuntimeSettings};
//! use startupgen::fs::RealFileSystem;
//! use startupgen::manifest::BuildManifest;
//! use startupgen::script::write_script;
//! use startupgen::stack::runtime::{AppOptions, GenerationContext, PythonRuntime, Runtime};
//! use std::path::Path;
//!
//! # fn main() -> anyhow::Result<()> {
//! let fs = RealFileSystem;
//! let app = AppOptions::new("/home/site/wwwroot");
//! let resolver = ConfigResolver::from_process_env(BuildManifest::load(&fs, None, &app.app_path));
//! let settings = RuntimeSettings::default();
//! let ctx = GenerationContext { fs: &fs, resolver: &resolver, settings: &settings, app: &app };
//!
//! let script = PythonRuntime::default().generate(&ctx)?;
//! write_script(Path::new("/run.sh"), &script)?;
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod extensibility;
pub mod fs;
pub mod manifest;
pub mod script;
pub mod setup_env;
pub mod stack;
pub mod util;

pub use config::{ConfigResolver, Resolved, RuntimeSettings, ValueSource};
pub use error::{ScriptError, FAILURE_EXIT_CODE};
pub use fs::{FileSystem, MockFileSystem, RealFileSystem};
pub use manifest::BuildManifest;
pub use script::{ScriptBuilder, StartupCommand};
pub use stack::runtime::{AppOptions, GenerationContext, Runtime};
pub use stack::PlatformId;
pub use util::{init_from_env, init_logging, LoggingConfig};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
