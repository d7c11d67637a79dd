use crate::config::{ConfigResolver, Resolved, RuntimeSettings};
use crate::error::ScriptError;
use crate::extensibility::ExtensibleConfig;
use crate::fs::FileSystem;
use crate::script::ScriptBuilder;
use crate::stack::PlatformId;
use std::path::{Path, PathBuf};
use tracing::info;

pub mod dotnet;
pub mod golang;
pub mod hugo;
pub mod node;
pub mod php;
pub mod python;
pub mod ruby;

pub use dotnet::DotNetRuntime;
pub use golang::GolangRuntime;
pub use hugo::HugoRuntime;
pub use node::NodeRuntime;
pub use php::PhpRuntime;
pub use python::PythonRuntime;
pub use ruby::RubyRuntime;

/// Options every platform accepts.
#[derive(Debug, Clone, Default)]
pub struct AppOptions {
    /// Absolute path of the application directory.
    pub app_path: PathBuf,
    pub user_startup_command: Option<String>,
    /// App to run when nothing can be detected.
    pub default_app: Option<PathBuf>,
    pub bind_port: Option<String>,
}

impl AppOptions {
    pub fn new(app_path: impl Into<PathBuf>) -> Self {
        Self {
            app_path: app_path.into(),
            ..Default::default()
        }
    }

    pub fn user_command(&self) -> Option<&str> {
        self.user_startup_command
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }

    pub fn bind_port(&self) -> Option<&str> {
        self.bind_port
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
    }
}

/// Everything a runtime needs to generate its script.
pub struct GenerationContext<'a> {
    pub fs: &'a dyn FileSystem,
    pub resolver: &'a ConfigResolver,
    pub settings: &'a RuntimeSettings,
    pub app: &'a AppOptions,
}

impl<'a> GenerationContext<'a> {
    pub fn app_path(&self) -> &'a Path {
        &self.app.app_path
    }

    /// `PORT`, resolved against the bind port option and the platform default.
    pub fn port(&self, platform: &PlatformId) -> Resolved {
        self.resolver.resolve(
            self.app.bind_port(),
            "PORT",
            None,
            platform.default_bind_port(),
        )
    }

    /// The user's startup command, taken as-is.
    pub fn no_command(&self, platform: &PlatformId) -> ScriptError {
        ScriptError::NoStartupCommand {
            platform: platform.canonical_name().to_string(),
        }
    }
}

/// A platform that knows how to start applications built for it.
pub trait Runtime {
    fn platform(&self) -> PlatformId;

    /// Program whose absence means the platform is not installed.
    fn binary(&self) -> &'static str;

    fn generate(&self, ctx: &GenerationContext) -> Result<String, ScriptError>;
}

/// Installs the platform on first start when the image does not carry it.
pub(crate) fn dynamic_install(
    builder: &mut ScriptBuilder,
    runtime: &dyn Runtime,
    ctx: &GenerationContext,
) {
    if !ctx.settings.enable_dynamic_install {
        return;
    }

    builder.line(format!(
        "if ! command -v {} >/dev/null 2>&1; then",
        runtime.binary()
    ));
    builder.line(format!(
        "    startupgen setup-env --platform {} --appPath \"{}\"",
        runtime.platform().canonical_name(),
        ctx.app_path().display()
    ));
    builder.line("fi");
}

/// Steps shared by all platforms before platform-specific setup.
pub(crate) fn prologue(builder: &mut ScriptBuilder, runtime: &dyn Runtime, ctx: &GenerationContext) {
    dynamic_install(builder, runtime, ctx);
    builder.pre_run(ctx.app_path(), ctx.settings.pre_run_command.as_deref());
}

pub(crate) fn enter_app_dir(builder: &mut ScriptBuilder, app_path: &Path) {
    builder
        .blank()
        .comment("Enter the source directory to make sure the script runs where the user expects")
        .cd(app_path)
        .blank();
}

/// Exports from the app's extensible configuration.
pub(crate) fn extensible_exports(builder: &mut ScriptBuilder, ctx: &GenerationContext) {
    let lines = ExtensibleConfig::load(ctx.fs, ctx.app_path()).export_lines();
    if !lines.is_empty() {
        info!("Adding {} variables from extensible configuration", lines.len());
        builder.lines(lines);
    }
}

/// Path of `path` relative to `base`, or `path` itself when it is not
/// under `base`.
pub(crate) fn relative_to(base: &Path, path: &Path) -> PathBuf {
    path.strip_prefix(base)
        .map(Path::to_path_buf)
        .unwrap_or_else(|_| path.to_path_buf())
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn test_app_options_trim_blank_values() {
        let app = AppOptions {
            user_startup_command: Some("   ".to_string()),
            bind_port: Some(" 3000 ".to_string()),
            ..AppOptions::new(APP)
        };
        assert_eq!(app.user_command(), None);
        assert_eq!(app.bind_port(), Some("3000"));
    }

    #[test]
    fn test_relative_to() {
        assert_eq!(
            relative_to(Path::new("/app"), Path::new("/app/src/server")),
            PathBuf::from("src/server")
        );
        assert_eq!(
            relative_to(Path::new("/app"), Path::new("/elsewhere")),
            PathBuf::from("/elsewhere")
        );
    }

    #[test]
    fn test_dynamic_install_line() {
        let fs = app_fs();
        fs.add_file("server.js", "");
        let settings = RuntimeSettings {
            enable_dynamic_install: true,
            ..settings()
        };

        let script = generate_with(
            &NodeRuntime::default(),
            &fs,
            Default::default(),
            &settings,
            &AppOptions::new(APP),
        )
        .unwrap();

        assert!(script.contains("if ! command -v node >/dev/null 2>&1; then\n"));
        assert!(script.contains("startupgen setup-env --platform node --appPath \"/app\"\n"));
    }

    #[test]
    fn test_pre_run_command_runs_in_app_dir() {
        let fs = app_fs();
        fs.add_file("app.rb", "");
        let settings = RuntimeSettings {
            pre_run_command: Some("./prepare.sh".to_string()),
            ..settings()
        };
        let app = AppOptions {
            default_app: Some(PathBuf::from("/app/app.rb")),
            ..AppOptions::new(APP)
        };

        let script =
            generate_with(&RubyRuntime, &fs, Default::default(), &settings, &app).unwrap();

        let hook = script.find("./prepare.sh").unwrap();
        let cd = script.find("cd \"/app\"").unwrap();
        assert!(cd < hook);
    }
}
