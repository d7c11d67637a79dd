use super::{enter_app_dir, extensible_exports, prologue, GenerationContext, Runtime};
use crate::error::ScriptError;
use crate::fs::FileSystem;
use crate::manifest::non_empty;
use crate::script::command::user_command;
use crate::script::{ArchiveKind, ScriptBuilder, StartupCommand};
use crate::stack::framework::{detect_framework, Framework};
use crate::stack::strategy::{first_match, Strategy};
use crate::stack::PlatformId;
use std::path::Path;
use tracing::{error, info, warn};

pub const SUPPORTED_DEBUG_ADAPTER: &str = "debugpy";
pub const DEFAULT_APP_MODULE: &str = "application:app";
pub const DEFAULT_APP_DEBUG_MODULE: &str = "application.py";
pub const DEFAULT_DEBUG_PORT: &str = "5678";
const DEFAULT_HOST: &str = "0.0.0.0";
const FALLBACK_PACKAGE_DIR: &str = "__oryx_packages__";

/// Python WSGI apps served by gunicorn.
#[derive(Debug, Clone)]
pub struct PythonRuntime {
    pub virtual_env_name: Option<String>,
    pub package_dir: Option<String>,
    pub default_app_module: String,
    pub default_app_debug_module: String,
    pub debug_adapter: Option<String>,
    pub debug_port: String,
    /// Hold the app until a debugger attaches.
    pub debug_wait: bool,
    pub skip_virtual_env_extraction: bool,
    /// Gunicorn workers; `None` means `2 * cpus + 1`.
    pub workers: Option<usize>,
}

impl Default for PythonRuntime {
    fn default() -> Self {
        Self {
            virtual_env_name: None,
            package_dir: None,
            default_app_module: DEFAULT_APP_MODULE.to_string(),
            default_app_debug_module: DEFAULT_APP_DEBUG_MODULE.to_string(),
            debug_adapter: None,
            debug_port: DEFAULT_DEBUG_PORT.to_string(),
            debug_wait: false,
            skip_virtual_env_extraction: false,
            workers: None,
        }
    }
}

fn default_worker_count() -> usize {
    let cpus = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    2 * cpus + 1
}

fn explicit(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

struct PythonDetection<'a> {
    runtime: &'a PythonRuntime,
    fs: &'a dyn FileSystem,
    app_path: &'a Path,
    user_command: Option<&'a str>,
    default_app: Option<&'a Path>,
    venv_name: Option<&'a str>,
    explicit_port: Option<&'a str>,
}

impl<'a> PythonDetection<'a> {
    fn should_debug(&self) -> bool {
        match explicit(&self.runtime.debug_adapter) {
            None => false,
            Some(SUPPORTED_DEBUG_ADAPTER) => true,
            Some(other) => {
                error!("Unsupported debug adapter '{}'", other);
                false
            }
        }
    }

    fn gunicorn_command(&self, module: &str, app_dir: Option<&Path>) -> String {
        let workers = self.runtime.workers.unwrap_or_else(default_worker_count);
        let mut args = vec![
            "--timeout 600".to_string(),
            "--access-logfile '-'".to_string(),
            "--error-logfile '-'".to_string(),
            format!("--workers={}", workers),
        ];
        if let Some(port) = self.explicit_port {
            args.push(format!("--bind={}:{}", DEFAULT_HOST, port));
        }
        if let Some(dir) = app_dir {
            args.push(format!("--chdir='{}'", dir.display()));
        }
        format!("GUNICORN_CMD_ARGS=\"{}\" gunicorn {}", args.join(" "), module)
    }

    fn debug_command(&self, debuggable: &str, app_dir: Option<&Path>) -> String {
        let wait = if self.runtime.debug_wait {
            " --wait-for-client"
        } else {
            ""
        };
        let python = format!(
            "python -m {} --listen {}:{}{} {}",
            SUPPORTED_DEBUG_ADAPTER, DEFAULT_HOST, self.runtime.debug_port, wait, debuggable
        );
        match app_dir {
            Some(dir) => format!("cd \"{}\" && {}", dir.display(), python),
            None => python,
        }
    }

    fn framework_command(&self, framework: &dyn Framework) -> StartupCommand {
        info!("Detected {} app", framework.name());
        let command = if self.should_debug() {
            self.debug_command(&framework.debuggable_command(self.fs), Some(self.app_path))
        } else {
            self.gunicorn_command(&framework.gunicorn_module(), Some(self.app_path))
        };
        StartupCommand::new("", command)
    }
}

fn explicit_command(d: &PythonDetection) -> Option<StartupCommand> {
    Some(user_command(d.fs, d.user_command?, d.app_path, ""))
}

fn detected_framework(d: &PythonDetection) -> Option<StartupCommand> {
    let framework = detect_framework(d.fs, d.app_path, d.venv_name)?;
    Some(d.framework_command(framework.as_ref()))
}

fn default_app(d: &PythonDetection) -> Option<StartupCommand> {
    info!(
        "Using default app module '{}'",
        d.runtime.default_app_module
    );
    let command = if d.should_debug() {
        d.debug_command(&d.runtime.default_app_debug_module, d.default_app)
    } else {
        d.gunicorn_command(&d.runtime.default_app_module, d.default_app)
    };
    Some(StartupCommand::new("", command))
}

fn strategies<'a>() -> Vec<Strategy<PythonDetection<'a>>> {
    vec![
        Strategy::new("User", explicit_command),
        Strategy::new("Framework", detected_framework),
        Strategy::new("DefaultApp", default_app),
    ]
}

impl PythonRuntime {
    fn virtual_env_name<'a>(&'a self, ctx: &'a GenerationContext) -> Option<&'a str> {
        explicit(&self.virtual_env_name)
            .or_else(|| non_empty(&ctx.resolver.manifest().virtual_env_name))
    }

    fn virtual_env_exports(builder: &mut ScriptBuilder, name: &str, dir: &str) {
        builder
            .line("PYTHON_VERSION=$(python -c \"import sys; print(str(sys.version_info.major) + '.' + str(sys.version_info.minor))\")")
            .echo(&format!(
                "Using packages from virtual environment '{}' located at '{}'.",
                name, dir
            ))
            .line(format!(
                "export PYTHONPATH=$PYTHONPATH:\"{}/lib/python$PYTHON_VERSION/site-packages\"",
                dir
            ))
            .echo("\"Updated PYTHONPATH to '$PYTHONPATH'\"");
    }

    fn package_setup(
        &self,
        builder: &mut ScriptBuilder,
        ctx: &GenerationContext,
    ) -> Result<(), ScriptError> {
        let app_path = ctx.app_path();
        let manifest = ctx.resolver.manifest();
        let mut package_dir = explicit(&self.package_dir)
            .or_else(|| non_empty(&manifest.package_dir))
            .map(str::to_string);

        if let Some(venv) = self.virtual_env_name(ctx) {
            let archive = non_empty(&manifest.compressed_virtual_env_file)
                .filter(|_| !self.skip_virtual_env_extraction);

            match archive {
                None => {
                    let venv_dir = app_path.join(venv);
                    if ctx.fs.is_dir(&venv_dir) {
                        Self::virtual_env_exports(builder, venv, &venv_dir.display().to_string());
                    } else {
                        warn!("Virtual environment directory {} not found", venv_dir.display());
                        package_dir = Some(FALLBACK_PACKAGE_DIR.to_string());
                        builder.line(format!(
                            "  echo WARNING: Could not find virtual environment directory '{}'.",
                            venv_dir.display()
                        ));
                    }
                }
                Some(archive) => {
                    let kind = ArchiveKind::from_file_name(archive)?;
                    let venv_dir = format!("/{}", venv);
                    builder
                        .echo(&format!("Found virtual environment .{} archive.", kind.label()))
                        .line(format!(
                            "extractionCommand=\"{}\"",
                            kind.extraction_command(archive, &venv_dir)
                        ))
                        .echo(&format!(
                            "Removing existing virtual environment directory '{}'...",
                            venv_dir
                        ))
                        .line(format!("rm -fr {}", venv_dir))
                        .line(format!("mkdir -p {}", venv_dir))
                        .echo(&format!("Extracting to directory '{}'...", venv_dir))
                        .line("$extractionCommand");
                    Self::virtual_env_exports(builder, venv, &venv_dir);
                }
            }
        }

        if let Some(name) = package_dir {
            let dir = app_path.join(&name);
            if ctx.fs.is_dir(&dir) {
                let dir = dir.display();
                builder
                    .echo(&format!("Using package directory '{}'", dir))
                    .line("SITE_PACKAGE_PYTHON_VERSION=$(python -c \"import sys; print(str(sys.version_info.major) + '.' + str(sys.version_info.minor))\")")
                    .line("SITE_PACKAGES_PATH=$HOME\"/.local/lib/python\"$SITE_PACKAGE_PYTHON_VERSION\"/site-packages\"")
                    .line("mkdir -p $SITE_PACKAGES_PATH")
                    .line(format!("echo \"{}\" > $SITE_PACKAGES_PATH\"/oryx.pth\"", dir))
                    .line(format!("PATH=\"{}/bin:$PATH\"", dir))
                    .echo("\"Updated PATH to '$PATH'\"");
            } else {
                builder.line(format!(
                    "  echo WARNING: Could not find package directory '{}'.",
                    dir.display()
                ));
            }
        }

        Ok(())
    }
}

impl Runtime for PythonRuntime {
    fn platform(&self) -> PlatformId {
        PlatformId::Python
    }

    fn binary(&self) -> &'static str {
        "python"
    }

    fn generate(&self, ctx: &GenerationContext) -> Result<String, ScriptError> {
        let app_path = ctx.app_path();
        info!("Generating Python startup script for {}", app_path.display());

        let mut builder = ScriptBuilder::new(crate::script::builder::SH);
        prologue(&mut builder, self, ctx);
        enter_app_dir(&mut builder, app_path);

        builder.export_resolved(&ctx.port(&PlatformId::Python));
        self.package_setup(&mut builder, ctx)?;
        extensible_exports(&mut builder, ctx);

        let detection = PythonDetection {
            runtime: self,
            fs: ctx.fs,
            app_path,
            user_command: ctx.app.user_command(),
            default_app: ctx.app.default_app.as_deref(),
            venv_name: self.virtual_env_name(ctx),
            explicit_port: ctx.app.bind_port(),
        };

        let command = first_match(&strategies(), &detection)
            .ok_or_else(|| ctx.no_command(&PlatformId::Python))?;
        Ok(builder.finish(command))
    }
}
