use super::{enter_app_dir, extensible_exports, prologue, GenerationContext, Runtime};
use crate::error::ScriptError;
use crate::fs::FileSystem;
use crate::manifest::non_empty;
use crate::script::builder::SH;
use crate::script::command::user_command;
use crate::script::{ScriptBuilder, StartupCommand};
use crate::stack::strategy::{first_match, Strategy};
use crate::stack::PlatformId;
use std::path::Path;
use tracing::{info, warn};

/// Go: runs the executable the build recorded in the manifest.
#[derive(Debug, Clone, Copy, Default)]
pub struct GolangRuntime;

struct GolangDetection<'a> {
    fs: &'a dyn FileSystem,
    app_path: &'a Path,
    user_command: Option<&'a str>,
    default_app: Option<&'a Path>,
    startup_file: Option<&'a str>,
}

fn explicit_command(d: &GolangDetection) -> Option<StartupCommand> {
    Some(user_command(d.fs, d.user_command?, d.app_path, ""))
}

fn manifest_startup_file(d: &GolangDetection) -> Option<StartupCommand> {
    let name = d.startup_file?;
    if !d.fs.is_file(&d.app_path.join(name)) {
        warn!("Startup file {} from the build manifest does not exist", name);
        return None;
    }
    Some(StartupCommand::new("", format!("./{}", name)))
}

fn default_app(d: &GolangDetection) -> Option<StartupCommand> {
    Some(StartupCommand::new("", d.default_app?.display().to_string()))
}

fn strategies<'a>() -> Vec<Strategy<GolangDetection<'a>>> {
    vec![
        Strategy::new("User", explicit_command),
        Strategy::new("ManifestStartupFile", manifest_startup_file),
        Strategy::new("DefaultApp", default_app),
    ]
}

impl Runtime for GolangRuntime {
    fn platform(&self) -> PlatformId {
        PlatformId::Golang
    }

    fn binary(&self) -> &'static str {
        "go"
    }

    fn generate(&self, ctx: &GenerationContext) -> Result<String, ScriptError> {
        let app_path = ctx.app_path();
        info!("Generating Go startup script for {}", app_path.display());

        let mut builder = ScriptBuilder::new(SH);
        prologue(&mut builder, self, ctx);
        enter_app_dir(&mut builder, app_path);
        builder.export_resolved(&ctx.port(&PlatformId::Golang));
        extensible_exports(&mut builder, ctx);

        let detection = GolangDetection {
            fs: ctx.fs,
            app_path,
            user_command: ctx.app.user_command(),
            default_app: ctx.app.default_app.as_deref(),
            startup_file: non_empty(&ctx.resolver.manifest().startup_file_name),
        };
        let command = first_match(&strategies(), &detection)
            .ok_or_else(|| ctx.no_command(&PlatformId::Golang))?;
        Ok(builder.finish(command))
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::super::AppOptions;
    use super::*;
    use crate::manifest::BuildManifest;
    use std::path::PathBuf;

    fn manifest(startup: &str) -> BuildManifest {
        BuildManifest {
            startup_file_name: Some(startup.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_manifest_startup_file() {
        let fs = app_fs();
        fs.add_file("server", "");

        let script = generate(&GolangRuntime, &fs, manifest("server"), &AppOptions::new(APP)).unwrap();
        assert_eq!(last_line(&script), "./server");
    }

    #[test]
    fn test_missing_startup_file_falls_back_to_default_app() {
        let fs = app_fs();
        let app = AppOptions {
            default_app: Some(PathBuf::from("/opt/default/hello")),
            ..AppOptions::new(APP)
        };

        let script = generate(&GolangRuntime, &fs, manifest("server"), &app).unwrap();
        assert_eq!(last_line(&script), "/opt/default/hello");
    }

    #[test]
    fn test_nothing_to_run_is_fatal() {
        let fs = app_fs();
        let err = generate(&GolangRuntime, &fs, BuildManifest::default(), &AppOptions::new(APP)).unwrap_err();
        assert!(matches!(err, ScriptError::NoStartupCommand { .. }));
    }
}
