//! Installs the platform version an app was built with.
//!
//! The script only wires the installer up; downloading and verifying the
//! SDK is the installer's job.

use crate::error::ScriptError;
use crate::manifest::{non_empty, BuildManifest};
use crate::script::builder::SH;
use crate::script::{ScriptBuilder, StartupCommand};
use crate::stack::PlatformId;
use std::process::Command;
use tracing::{debug, info};

pub const DEFAULT_INSTALLER: &str = "/opt/startupgen/install-platform.sh";
pub const INSTALLATION_ROOT: &str = "/opt";
const NODE_INSTALLATION_ROOT: &str = "/usr/local";
const NODE_DEPENDENCY_INSTALLER: &str = "/opt/node/installDependencies.sh";
const RUBY_DEPENDENCY_INSTALLER: &str = "/opt/ruby/installDependencies.sh";
const PYTHON_LD_CONF: &str = "/etc/ld.so.conf.d/python.conf";
const PYTHON_TOOLS: [&str; 3] = ["pip install --upgrade pip", "pip install gunicorn", "pip install debugpy"];
const DONE: &str = "echo Done installing dependencies.";

/// Platform to set up: the explicit one, else the one the build recorded.
pub fn resolve_platform(
    explicit: Option<&str>,
    manifest: &BuildManifest,
) -> Result<PlatformId, ScriptError> {
    let name = explicit
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .or_else(|| non_empty(&manifest.platform_name))
        .ok_or_else(|| ScriptError::UnknownPlatform(String::new()))?;

    PlatformId::from_name(name).ok_or_else(|| ScriptError::UnknownPlatform(name.to_string()))
}

/// Script that installs `platform` at the version recorded in `manifest`.
pub fn build_setup_script(
    platform: &PlatformId,
    manifest: &BuildManifest,
    installer: &str,
) -> Result<String, ScriptError> {
    let version = manifest
        .version_for(platform)
        .ok_or_else(|| ScriptError::MissingPlatformVersion {
            platform: platform.canonical_name().to_string(),
        })?;
    let name = platform.canonical_name();
    let root = installation_root(platform, version);

    let mut builder = ScriptBuilder::with_errexit(SH);
    builder
        .echo(&format!(
            "\"Setting up the environment with '{}' version '{}'...\"",
            platform.name(),
            version
        ))
        .line(format!("{} {} {} \"{}\"", installer, name, version, root))
        .export("PATH", &format!("\"{}/bin:$PATH\"", root));

    let last = match platform {
        PlatformId::Node => {
            builder
                .echo("Installing dependencies...")
                .line(NODE_DEPENDENCY_INSTALLER);
            DONE.to_string()
        }
        PlatformId::Ruby => {
            builder.echo("Installing dependencies...");
            RUBY_DEPENDENCY_INSTALLER.to_string()
        }
        PlatformId::Python => {
            builder.echo("Installing dependencies...");
            python_dependencies(&mut builder, version, &root);
            DONE.to_string()
        }
        _ => format!("echo Installed {} {} to {}", name, version, root),
    };
    Ok(builder.finish(StartupCommand::new("SetupEnv", last)))
}

/// Node installs into the system prefix; everything else gets a versioned
/// directory.
fn installation_root(platform: &PlatformId, version: &str) -> String {
    match platform {
        PlatformId::Node => NODE_INSTALLATION_ROOT.to_string(),
        _ => format!("{}/{}/{}", INSTALLATION_ROOT, platform.canonical_name(), version),
    }
}

/// Shared libraries, unversioned tool names and the packages the generated
/// startup commands rely on (gunicorn, debugpy).
fn python_dependencies(builder: &mut ScriptBuilder, version: &str, root: &str) {
    builder
        .line(format!("echo \"{}/lib\" > {}", root, PYTHON_LD_CONF))
        .line("ldconfig");

    // 3.11 images already ship the unversioned links
    if version.starts_with("3.") && !version.starts_with("3.11") {
        builder.line(format!("cd \"{}/bin\"", root)).lines([
            "rm -f python",
            "ln -s python3 python",
            "ln -s idle3 idle",
            "ln -s pydoc3 pydoc",
            "ln -s python3-config python-config",
        ]);
    }
    builder.lines(PYTHON_TOOLS);
}

pub fn run_setup_script(script: &str) -> Result<(), ScriptError> {
    debug!("Running setup script:\n{}", script);
    let status = Command::new("sh")
        .arg("-c")
        .arg(script)
        .status()
        .map_err(|e| ScriptError::SetupFailed(e.to_string()))?;

    if status.success() {
        info!("Environment setup finished");
        Ok(())
    } else {
        Err(ScriptError::SetupFailed(format!(
            "setup script exited with {}",
            status
        )))
    }
}
