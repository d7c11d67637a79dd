use super::commands::{CreateScriptArgs, SetupEnvArgs};
use crate::config::{ConfigResolver, RuntimeSettings};
use crate::error::{ScriptError, FAILURE_EXIT_CODE};
use crate::extensibility::load_user_run_command;
use crate::fs::{FileSystem, RealFileSystem};
use crate::manifest::BuildManifest;
use crate::script::{append_script, write_script};
use crate::setup_env::{build_setup_script, resolve_platform, run_setup_script};
use crate::stack::runtime::GenerationContext;
use crate::{NAME, VERSION};
use std::path::{Path, PathBuf};
use tracing::{error, info, info_span, warn};

pub fn handle_create_script(args: &CreateScriptArgs) -> i32 {
    match create_script(args, &RealFileSystem) {
        Ok(output) => {
            info!("Startup script written to {}", output.display());
            0
        }
        Err(e) => {
            error!("{}", e);
            FAILURE_EXIT_CODE
        }
    }
}

pub fn handle_setup_env(args: &SetupEnvArgs) -> i32 {
    match setup_env(args, &RealFileSystem) {
        Ok(()) => 0,
        Err(e) => {
            error!("{}", e);
            FAILURE_EXIT_CODE
        }
    }
}

pub fn handle_version() -> i32 {
    match option_env!("STARTUPGEN_COMMIT") {
        Some(commit) => println!("{} {} (commit {})", NAME, VERSION, commit),
        None => println!("{} {}", NAME, VERSION),
    }
    0
}

fn validated_path(
    fs: &dyn FileSystem,
    path: &Path,
    invalid: fn(PathBuf) -> ScriptError,
) -> Result<PathBuf, ScriptError> {
    if !fs.exists(path) {
        return Err(invalid(path.to_path_buf()));
    }
    fs.canonicalize(path).map_err(|e| {
        warn!(error = %e, "Could not resolve {}", path.display());
        invalid(path.to_path_buf())
    })
}

/// Output paths may not exist yet, so they are made absolute without
/// touching the filesystem.
fn absolute_output(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    match std::env::current_dir() {
        Ok(cwd) => cwd.join(path),
        Err(e) => {
            warn!(error = %e, "Could not read the working directory");
            path.to_path_buf()
        }
    }
}

/// Generates and writes the startup script. Returns the script's path.
pub fn create_script(args: &CreateScriptArgs, fs: &dyn FileSystem) -> Result<PathBuf, ScriptError> {
    let platform = args.platform.platform();
    let common = args.platform.common();

    let app_path = validated_path(fs, &common.app_path, ScriptError::InvalidAppPath)?;
    let default_app = common
        .default_app
        .as_deref()
        .filter(|p| !p.as_os_str().is_empty())
        .map(|p| validated_path(fs, p, ScriptError::InvalidDefaultApp))
        .transpose()?;

    let manifest = BuildManifest::load(fs, common.manifest_dir.as_deref(), &app_path);
    let operation_id = manifest.operation_id();
    let span = info_span!(
        "create_script",
        operation_id = %operation_id,
        platform = %platform.canonical_name()
    );
    let _enter = span.enter();

    let resolver = ConfigResolver::from_process_env(manifest);
    let settings = RuntimeSettings::default();
    let app = common.app_options(app_path.clone(), default_app);
    let ctx = GenerationContext {
        fs,
        resolver: &resolver,
        settings: &settings,
        app: &app,
    };

    let script = args.platform.runtime().generate(&ctx)?;

    let output = absolute_output(&common.output);
    write_script(&output, &script)?;

    if let Some(run) = load_user_run_command(fs, &app_path) {
        info!("Appending run command from app configuration");
        if let Err(e) = append_script(&output, &run) {
            warn!(error = %e, "Could not append run command to {}", output.display());
        }
    }

    Ok(output)
}

pub fn setup_env(args: &SetupEnvArgs, fs: &dyn FileSystem) -> Result<(), ScriptError> {
    let app_path = validated_path(fs, &args.app_path, ScriptError::InvalidAppPath)?;
    let manifest = BuildManifest::load(fs, args.manifest_dir.as_deref(), &app_path);
    let _enter = info_span!("setup_env", operation_id = %manifest.operation_id()).entered();

    let platform = resolve_platform(args.platform.as_deref(), &manifest)?;
    let script = build_setup_script(&platform, &manifest, &args.installer)?;

    if args.dry_run {
        print!("{}", script);
        return Ok(());
    }
    info!("Setting up {}", platform.name());
    run_setup_script(&script)
}
