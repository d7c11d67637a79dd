//! Platforms and the detectors that find out how to start an app on them.
//!
//! Each platform has a [`runtime::Runtime`] that turns the app directory and
//! resolved configuration into a startup script. Detection inside a runtime
//! is an ordered [`strategy::Strategy`] list; the first strategy that yields
//! a command wins.
//!
//! # Example
//!
//! ```no_run
//! use startupgen::config::{ConfigResolver, RuntimeSettings};
//! use startupgen::fs::RealFileSystem;
//! use startupgen::manifest::BuildManifest;
//! use startupgen::stack::runtime::{AppOptions, GenerationContext, NodeRuntime, Runtime};
//!
//! # fn main() -> anyhow::Result<()> {
//! let fs = RealFileSystem;
//! let app = AppOptions::new("/home/site/wwwroot");
//! let manifest = BuildManifest::load(&fs, None, &app.app_path);
//! let resolver = ConfigResolver::from_process_env(manifest);
//! let settings = RuntimeSettings::default();
//!
//! let ctx = GenerationContext { fs: &fs, resolver: &resolver, settings: &settings, app: &app };
//! let script = NodeRuntime::default().generate(&ctx)?;
//! print!("{}", script);
//! # Ok(())
//! # }
//! ```

#[macro_use]
pub mod id_enum_macro;

pub mod framework;
pub mod platform_id;
pub mod runtime;
pub mod strategy;

pub use framework::{detect_framework, Framework};
pub use platform_id::PlatformId;
pub use runtime::{AppOptions, GenerationContext, Runtime};
pub use strategy::{first_match, Strategy};
