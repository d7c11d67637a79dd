//! .NET: runs the published startup assembly with `dotnet`.
//!
//! The assembly is taken, in order, from the user command, the build
//! manifest, a lone `*.runtimeconfig.json`, the project file and finally the
//! default app.

use super::{extensible_exports, prologue, GenerationContext, Runtime};
use crate::error::ScriptError;
use crate::fs::FileSystem;
use crate::manifest::non_empty;
use crate::script::builder::SH;
use crate::script::command::user_command;
use crate::script::{ArchiveKind, ScriptBuilder, StartupCommand};
use crate::stack::strategy::{first_match, Strategy};
use crate::stack::PlatformId;
use roxmltree::Document;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const RUNTIME_CONFIG_SUFFIX: &str = ".runtimeconfig.json";
const PROJECT_FILE_EXTENSION: &str = "csproj";
const WEB_SDK: &str = "Microsoft.NET.Sdk.Web";
const ASPNETCORE_PACKAGE_PREFIX: &str = "Microsoft.AspNetCore";
const OUTPUT_ARCHIVE: &str = "output.tar.gz";
const MAX_PROJECT_SEARCH_DEPTH: usize = 5;
const SKIPPED_DIRS: &[&str] = &["bin", "obj", "node_modules"];

#[derive(Debug, Clone, Default)]
pub struct DotNetRuntime {
    /// Copy the app here and run it from there.
    pub run_from_path: Option<PathBuf>,
    /// Second port, served over HTTP/2.
    pub bind_port2: Option<String>,
}

/// What the project file says about the assembly it builds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectInfo {
    pub assembly_name: Option<String>,
    pub is_web: bool,
}

impl ProjectInfo {
    pub fn parse(content: &str) -> Option<Self> {
        let doc = match Document::parse(content) {
            Ok(doc) => doc,
            Err(e) => {
                warn!(error = %e, "Could not parse project file");
                return None;
            }
        };
        let root = doc.root_element();

        let assembly_name = root
            .descendants()
            .filter(|n| n.has_tag_name("AssemblyName"))
            .filter(|n| n.parent().is_some_and(|p| p.has_tag_name("PropertyGroup")))
            .find_map(|n| n.text())
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string);

        let web_sdk = root.attribute("Sdk") == Some(WEB_SDK);
        let aspnet_reference = root
            .descendants()
            .filter(|n| n.has_tag_name("PackageReference"))
            .filter_map(|n| n.attribute("Include"))
            .any(|include| include.starts_with(ASPNETCORE_PACKAGE_PREFIX));

        Some(Self {
            assembly_name,
            is_web: web_sdk || aspnet_reference,
        })
    }
}

struct DotNetDetection<'a> {
    fs: &'a dyn FileSystem,
    app_path: &'a Path,
    /// Directory the app runs from; the copy target when one was given.
    run_dir: &'a Path,
    user_command: Option<&'a str>,
    default_app: Option<&'a Path>,
    startup_dll: Option<&'a str>,
    project: Option<&'a str>,
}

impl<'a> DotNetDetection<'a> {
    fn run_dll(&self, dll: &str) -> StartupCommand {
        let command = format!("dotnet \"{}\"", dll);
        StartupCommand::new("", command.clone())
            .with_preamble([format!("echo 'Running the command: {}'", command)])
            .in_dir(self.run_dir)
    }

    fn dll_exists(&self, dll: &str) -> bool {
        let exists = self.fs.is_file(&self.app_path.join(dll));
        if !exists {
            debug!("Startup assembly {} not found", dll);
        }
        exists
    }

    fn files_with_suffix(&self, dir: &Path, suffix: &str) -> Vec<PathBuf> {
        match self.fs.read_dir(dir) {
            Ok(entries) => entries
                .into_iter()
                .filter(|e| e.is_file() && e.file_name().ends_with(suffix))
                .map(|e| e.path().to_path_buf())
                .collect(),
            Err(e) => {
                warn!(error = %e, "Could not list {}", dir.display());
                Vec::new()
            }
        }
    }

    fn project_info(&self, path: &Path) -> Option<ProjectInfo> {
        let content = self.fs.read_to_string(path).ok()?;
        ProjectInfo::parse(&content)
    }

    /// Project named by the `PROJECT` setting, else the only project file at
    /// the root, else the first ASP.NET Core project found below the root.
    fn find_project_file(&self) -> Option<PathBuf> {
        if let Some(project) = self.project {
            let path = self.app_path.join(project);
            if self.fs.is_file(&path) {
                info!("Using project file {} from settings", path.display());
                return Some(path);
            }
            warn!("Project file {} does not exist", path.display());
        }

        let root_projects = self.files_with_suffix(self.app_path, &format!(".{}", PROJECT_FILE_EXTENSION));
        if root_projects.len() == 1 {
            return root_projects.into_iter().next();
        }
        if root_projects.len() > 1 {
            debug!("{} project files at the app root", root_projects.len());
        }

        self.find_web_project(self.app_path, 0)
    }

    fn find_web_project(&self, dir: &Path, depth: usize) -> Option<PathBuf> {
        if depth > MAX_PROJECT_SEARCH_DEPTH {
            return None;
        }
        let entries = self.fs.read_dir(dir).ok()?;

        let project = entries
            .iter()
            .filter(|e| e.is_file())
            .filter(|e| e.path().extension().is_some_and(|ext| ext == PROJECT_FILE_EXTENSION))
            .find(|e| self.project_info(e.path()).is_some_and(|info| info.is_web));
        if let Some(project) = project {
            return Some(project.path().to_path_buf());
        }

        entries
            .iter()
            .filter(|e| e.is_dir())
            .filter(|e| !e.file_name().starts_with('.') && !SKIPPED_DIRS.contains(&e.file_name()))
            .find_map(|e| self.find_web_project(e.path(), depth + 1))
    }
}

fn explicit_command(d: &DotNetDetection) -> Option<StartupCommand> {
    let command = user_command(d.fs, d.user_command?, d.app_path, "");
    Some(
        command
            .with_preamble(["echo Running user provided startup command..."])
            .in_dir(d.run_dir),
    )
}

fn manifest_dll(d: &DotNetDetection) -> Option<StartupCommand> {
    let dll = d.startup_dll?;
    let command = d.run_dll(dll);
    let mut preamble = vec!["echo Found startup DLL name from manifest file".to_string()];
    preamble.extend(command.preamble);
    Some(StartupCommand {
        preamble,
        ..command
    })
}

fn runtime_config(d: &DotNetDetection) -> Option<StartupCommand> {
    let configs = d.files_with_suffix(d.app_path, RUNTIME_CONFIG_SUFFIX);
    if configs.len() != 1 {
        debug!("Found {} runtime config files", configs.len());
        return None;
    }

    let file_name = configs[0].file_name()?.to_str()?;
    let dll = format!("{}.dll", file_name.strip_suffix(RUNTIME_CONFIG_SUFFIX)?);
    d.dll_exists(&dll).then(|| d.run_dll(&dll))
}

fn project_file(d: &DotNetDetection) -> Option<StartupCommand> {
    let path = d.find_project_file()?;
    let info = d.project_info(&path);

    let assembly = info
        .and_then(|info| info.assembly_name)
        .or_else(|| path.file_stem().map(|s| s.to_string_lossy().into_owned()))?;
    info!("Assembly name from {} is {}", path.display(), assembly);

    let dll = format!("{}.dll", assembly);
    d.dll_exists(&dll).then(|| d.run_dll(&dll))
}

fn default_app(d: &DotNetDetection) -> Option<StartupCommand> {
    let app = d.default_app?;
    let command = format!("dotnet \"{}\"", app.display());
    let mut startup = StartupCommand::new("", command.clone())
        .with_preamble([format!("echo 'Running the default app using command: {}'", command)]);
    if let Some(dir) = app.parent() {
        startup = startup.in_dir(dir);
    }
    Some(startup)
}

fn strategies<'a>() -> Vec<Strategy<DotNetDetection<'a>>> {
    vec![
        Strategy::new("User", explicit_command),
        Strategy::new("ManifestStartupDll", manifest_dll),
        Strategy::new("RuntimeConfig", runtime_config),
        Strategy::new("ProjectFile", project_file),
        Strategy::new("DefaultApp", default_app),
    ]
}

impl DotNetRuntime {
    fn run_from_path(&self) -> Option<&Path> {
        self.run_from_path
            .as_deref()
            .filter(|p| !p.as_os_str().is_empty())
    }

    fn copy_output(&self, builder: &mut ScriptBuilder, ctx: &GenerationContext, run_dir: &Path) {
        let app_path = ctx.app_path();

        if run_dir != app_path {
            builder
                .echo(&format!("Copying content to '{}'...", run_dir.display()))
                .line(format!("mkdir -p \"{}\"", run_dir.display()))
                .line(format!(
                    "cp -rf \"{}\"/. \"{}\"",
                    app_path.display(),
                    run_dir.display()
                ))
                .blank();
        }

        if ctx.resolver.manifest().zips_all_output() {
            let archive = app_path.join(OUTPUT_ARCHIVE).display().to_string();
            let target = run_dir.display().to_string();
            builder
                .echo(&format!("Extracting '{}' to '{}'...", archive, target))
                .line(format!("mkdir -p \"{}\"", target))
                .line(ArchiveKind::TarGz.extraction_command(&archive, &target))
                .blank();
        }
    }

    fn kestrel_endpoints(builder: &mut ScriptBuilder) {
        builder
            .line("if [ ! -z \"$PORT2\" ]; then")
            .line("    export Kestrel__Endpoints__Http2__Url=http://*:$PORT2")
            .line("    export Kestrel__Endpoints__Http2__Protocols=Http2")
            .line("    export Kestrel__Endpoints__Http1__Url=http://*:$PORT")
            .line("    export Kestrel__Endpoints__Http1__Protocols=Http1")
            .line("fi");
    }
}

impl Runtime for DotNetRuntime {
    fn platform(&self) -> PlatformId {
        PlatformId::DotNet
    }

    fn binary(&self) -> &'static str {
        "dotnet"
    }

    fn generate(&self, ctx: &GenerationContext) -> Result<String, ScriptError> {
        let app_path = ctx.app_path();
        let run_dir = self.run_from_path().unwrap_or(app_path);
        info!("Generating .NET startup script for {}", app_path.display());

        let mut builder = ScriptBuilder::with_errexit(SH);
        self.copy_output(&mut builder, ctx, run_dir);
        prologue(&mut builder, self, ctx);

        builder.export_resolved(&ctx.port(&PlatformId::DotNet));
        let port2 = ctx.resolver.resolve(
            self.bind_port2.as_deref().map(str::trim).filter(|p| !p.is_empty()),
            "PORT2",
            None,
            "",
        );
        builder.export_resolved(&port2);
        builder.export("ASPNETCORE_URLS", "http://*:$PORT");
        Self::kestrel_endpoints(&mut builder);
        builder.blank();

        extensible_exports(&mut builder, ctx);

        let detection = DotNetDetection {
            fs: ctx.fs,
            app_path,
            run_dir,
            user_command: ctx.app.user_command(),
            default_app: ctx.app.default_app.as_deref(),
            startup_dll: non_empty(&ctx.resolver.manifest().startup_dll_file_name),
            project: ctx.settings.project.as_deref(),
        };

        let command = first_match(&strategies(), &detection)
            .ok_or_else(|| ctx.no_command(&PlatformId::DotNet))?;
        Ok(builder.finish(command))
    }
}
