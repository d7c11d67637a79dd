use super::{enter_app_dir, extensible_exports, prologue, relative_to, GenerationContext, Runtime};
use crate::error::ScriptError;
use crate::fs::FileSystem;
use crate::manifest::non_empty;
use crate::script::command::user_command;
use crate::script::{ArchiveKind, ScriptBuilder, StartupCommand};
use crate::stack::strategy::{first_match, Strategy};
use crate::stack::PlatformId;
use regex::Regex;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, info, warn};

const GLOBAL_NODE_MODULES: &str = "/usr/local/lib/node_modules";
const EXTRACTED_NODE_MODULES: &str = "/node_modules";
const NODE_WRAPPER_PATH: &str = "/opt/node-wrapper/";
const INSPECT_PARAM_VAR: &str = "NODE_INSPECT_PARAM";
const CANDIDATE_FILES: &[&str] = &["bin/www", "server.js", "app.js", "index.js", "hostingstart.js"];

/// Node.js: npm/yarn scripts, `main`, pm2 configs and well-known entry files.
#[derive(Debug, Clone, Default)]
pub struct NodeRuntime {
    pub use_pm2: bool,
    pub remote_debug: bool,
    /// Break before the first line of user code.
    pub remote_debug_brk: bool,
    pub debug_host: Option<String>,
    pub debug_port: Option<String>,
    pub skip_node_modules_extraction: bool,
}

#[derive(Debug, Default, Deserialize)]
struct PackageJson {
    #[serde(default)]
    main: Option<String>,
    #[serde(default)]
    scripts: Option<PackageScripts>,
}

#[derive(Debug, Default, Deserialize)]
struct PackageScripts {
    #[serde(default)]
    start: Option<String>,
}

fn version_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^v?(\d+)\.(\d+)").unwrap())
}

/// Node releases before 7.7 only understand `--debug`.
pub fn uses_legacy_debugger(version: Option<&str>) -> bool {
    let Some(caps) = version.and_then(|v| version_pattern().captures(v.trim())) else {
        return false;
    };
    let major: u64 = caps[1].parse().unwrap_or(u64::MAX);
    let minor: u64 = caps[2].parse().unwrap_or(u64::MAX);
    major < 7 || (major == 7 && minor < 7)
}

/// Inspector flag, e.g. `--inspect-brk=0.0.0.0:9229`. The address suffix is
/// only added when a host is given.
pub fn debug_flag(legacy: bool, brk: bool, host: Option<&str>, port: Option<&str>) -> String {
    let mut flag = String::from(if legacy { "--debug" } else { "--inspect" });
    if brk {
        flag.push_str("-brk");
    }
    if let Some(host) = host.filter(|h| !h.is_empty()) {
        flag.push('=');
        flag.push_str(host);
        if let Some(port) = port.filter(|p| !p.is_empty()) {
            flag.push(':');
            flag.push_str(port);
        }
    }
    flag
}

fn pm2_start(file: Option<&str>) -> String {
    match file {
        Some(file) => format!("pm2 start {} --no-daemon", file),
        None => "pm2 start --no-daemon".to_string(),
    }
}

struct NodeDetection<'a> {
    runtime: &'a NodeRuntime,
    fs: &'a dyn FileSystem,
    app_path: &'a Path,
    user_command: Option<&'a str>,
    /// Set when the user command names a file in the app directory.
    user_file: Option<PathBuf>,
    default_app: Option<&'a Path>,
    package_json: Option<(PackageJson, PathBuf)>,
    legacy_debugger: bool,
}

impl<'a> NodeDetection<'a> {
    fn is_debugging(&self) -> bool {
        self.runtime.remote_debug || self.runtime.remote_debug_brk
    }

    fn debug_flag(&self) -> String {
        debug_flag(
            self.legacy_debugger,
            self.runtime.remote_debug_brk,
            self.runtime.debug_host.as_deref(),
            self.runtime.debug_port.as_deref(),
        )
    }

    /// Routes `node` through the wrapper so npm and pm2 children get the
    /// inspector flag.
    fn debug_wrapper(&self) -> Vec<String> {
        if !self.is_debugging() {
            return Vec::new();
        }
        vec![
            format!("export PATH={}:$PATH", NODE_WRAPPER_PATH),
            format!("export {}=\"{}\"", INSPECT_PARAM_VAR, self.debug_flag()),
        ]
    }

    fn js_file_command(&self, file: &str) -> String {
        if self.is_debugging() {
            info!("Remote debugging on");
            format!("node {} {}", self.debug_flag(), file)
        } else if self.runtime.use_pm2 {
            format!("{} {}", pm2_start(None), file)
        } else {
            format!("node {}", file)
        }
    }

    /// Directory of package.json relative to the app root, or `None` at root.
    fn package_subdir(&self, package_json_path: &Path) -> Option<PathBuf> {
        let dir = package_json_path.parent()?;
        if dir == self.app_path {
            None
        } else {
            Some(relative_to(self.app_path, dir))
        }
    }

    /// A pm2 config: the user's file when it has `suffix`, else the default.
    fn pm2_config(&self, suffix: &str, default_name: Option<&str>) -> Option<PathBuf> {
        let candidate = match (&self.user_file, default_name) {
            (Some(user_file), _) => user_file
                .to_string_lossy()
                .ends_with(suffix)
                .then(|| user_file.clone()),
            (None, Some(name)) => Some(self.app_path.join(name)),
            (None, None) => None,
        }?;
        self.fs.is_file(&candidate).then_some(candidate)
    }

    fn pm2_config_command(&self, config: &Path) -> StartupCommand {
        StartupCommand::new("", pm2_start(Some(&config.display().to_string())))
    }

    fn load_package_json(fs: &dyn FileSystem, path: PathBuf) -> Option<(PackageJson, PathBuf)> {
        if !fs.is_file(&path) {
            return None;
        }
        let content = fs.read_to_string(&path).ok()?;
        match serde_json::from_str::<PackageJson>(&content) {
            Ok(package) => Some((package, path)),
            Err(e) => {
                warn!(error = %e, "Could not parse {}", path.display());
                None
            }
        }
    }
}

fn explicit_command(d: &NodeDetection) -> Option<StartupCommand> {
    let command = d.user_command?;
    if d.user_file.is_some() {
        return None;
    }
    Some(user_command(d.fs, command, d.app_path, ""))
}

fn package_json_start(d: &NodeDetection) -> Option<StartupCommand> {
    let (package, path) = d.package_json.as_ref()?;
    package
        .scripts
        .as_ref()?
        .start
        .as_deref()
        .filter(|s| !s.trim().is_empty())?;

    // npm and yarn get the package directory as an absolute path
    let package_dir = d
        .package_subdir(path)
        .and_then(|_| path.parent())
        .map(|dir| dir.display().to_string());
    let command = if d.fs.is_file(&d.app_path.join("yarn.lock")) {
        match &package_dir {
            Some(dir) => format!("yarn --cwd=\"{}\" run start", dir),
            None => "yarn run start".to_string(),
        }
    } else {
        let mut npm = match &package_dir {
            Some(dir) => format!("npm --prefix=\"{}\" start", dir),
            None => "npm start".to_string(),
        };
        if d.is_debugging() {
            npm.push_str(" --scripts-prepend-node-path false");
        }
        npm
    };

    Some(StartupCommand::new("", command).with_preamble(d.debug_wrapper()))
}

fn package_json_main(d: &NodeDetection) -> Option<StartupCommand> {
    let (package, path) = d.package_json.as_ref()?;
    let main = package.main.as_deref().map(str::trim).filter(|m| !m.is_empty())?;
    debug!("Using startup command from package.json main field");

    let file = match d.package_subdir(path) {
        Some(dir) => dir.join(main).display().to_string(),
        None => main.to_string(),
    };
    Some(StartupCommand::new("", d.js_file_command(&file)))
}

fn process_json(d: &NodeDetection) -> Option<StartupCommand> {
    if !d.runtime.use_pm2 {
        return None;
    }
    let config = d.pm2_config(".json", Some("process.json"))?;
    Some(d.pm2_config_command(&config).with_preamble(d.debug_wrapper()))
}

fn ecosystem_config_js(d: &NodeDetection) -> Option<StartupCommand> {
    if !d.runtime.use_pm2 {
        return None;
    }
    let config = d.pm2_config(".config.js", Some("ecosystem.config.js"))?;
    Some(d.pm2_config_command(&config))
}

fn ecosystem_config_yaml(d: &NodeDetection) -> Option<StartupCommand> {
    if !d.runtime.use_pm2 {
        return None;
    }
    let config = d
        .pm2_config(".yml", None)
        .or_else(|| d.pm2_config(".yaml", None))?;
    Some(d.pm2_config_command(&config))
}

fn user_js_file(d: &NodeDetection) -> Option<StartupCommand> {
    let file = d.user_file.as_ref()?;
    if !file.to_string_lossy().ends_with(".js") {
        return None;
    }
    let relative = relative_to(d.app_path, file);
    Some(StartupCommand::new(
        "",
        d.js_file_command(&relative.display().to_string()),
    ))
}

fn user_script(d: &NodeDetection) -> Option<StartupCommand> {
    d.user_file.as_ref()?;
    Some(user_command(d.fs, d.user_command?, d.app_path, ""))
}

fn candidate_file(d: &NodeDetection) -> Option<StartupCommand> {
    let file = CANDIDATE_FILES
        .iter()
        .find(|f| d.fs.is_file(&d.app_path.join(f)))?;
    info!("Found startup candidate {}", file);
    Some(StartupCommand::new("", d.js_file_command(file)))
}

fn default_app(d: &NodeDetection) -> Option<StartupCommand> {
    let app = d.default_app?;
    warn!("Resorting to default startup command");
    Some(StartupCommand::new(
        "",
        d.js_file_command(&app.display().to_string()),
    ))
}

fn strategies<'a>() -> Vec<Strategy<NodeDetection<'a>>> {
    vec![
        Strategy::new("User", explicit_command),
        Strategy::new("PackageJsonStart", package_json_start),
        Strategy::new("PackageJsonMain", package_json_main),
        Strategy::new("ProcessJson", process_json),
        Strategy::new("ConfigJs", ecosystem_config_js),
        Strategy::new("ConfigYaml", ecosystem_config_yaml),
        Strategy::new("UserJsFilePath", user_js_file),
        Strategy::new("UserScript", user_script),
        Strategy::new("CandidateFile", candidate_file),
        Strategy::new("DefaultApp", default_app),
    ]
}

impl NodeRuntime {
    fn node_modules_extraction(
        &self,
        builder: &mut ScriptBuilder,
        archive: &str,
    ) -> Result<(), ScriptError> {
        let kind = ArchiveKind::from_file_name(archive)?;
        let target = EXTRACTED_NODE_MODULES;

        builder
            .echo(&format!("Found {} based node_modules.", kind.label()))
            .line(format!(
                "extractionCommand=\"{}\"",
                kind.extraction_command(archive, target)
            ))
            .echo("\"Removing existing modules directory from root...\"")
            .line(format!("rm -fr {}", target))
            .line(format!("mkdir -p {}", target))
            .echo("Extracting modules...")
            .line("$extractionCommand")
            .line(format!("export NODE_PATH=\"{}\":$NODE_PATH", target))
            .line(format!("export PATH={}/.bin:$PATH", target))
            .line("if [ -d node_modules ]; then")
            .line("    mv -f node_modules _del_node_modules || true")
            .line("fi")
            .blank()
            .line(format!("if [ -d {} ]; then", target))
            .line(format!("    ln -sfn {} ./node_modules", target))
            .line("fi")
            .blank()
            .echo("\"Done.\"");
        Ok(())
    }
}

impl Runtime for NodeRuntime {
    fn platform(&self) -> PlatformId {
        PlatformId::Node
    }

    fn binary(&self) -> &'static str {
        "node"
    }

    fn generate(&self, ctx: &GenerationContext) -> Result<String, ScriptError> {
        let app_path = ctx.app_path();
        info!("Generating Node.js startup script for {}", app_path.display());

        let mut builder = ScriptBuilder::new(crate::script::builder::SH);
        prologue(&mut builder, self, ctx);
        enter_app_dir(&mut builder, app_path);

        builder.export("NODE_PATH", &format!("{}:$NODE_PATH", GLOBAL_NODE_MODULES));
        builder.export_resolved(&ctx.port(&PlatformId::Node));

        let manifest = ctx.resolver.manifest();
        if let Some(archive) = non_empty(&manifest.compressed_node_modules_file) {
            if self.skip_node_modules_extraction {
                debug!("Skipping extraction of {}", archive);
            } else {
                self.node_modules_extraction(&mut builder, archive)?;
            }
        }

        extensible_exports(&mut builder, ctx);

        let node_version = ctx.resolver.resolve(
            None,
            "NODE_VERSION",
            manifest.node_version.as_deref(),
            "",
        );
        let legacy_debugger = uses_legacy_debugger(Some(node_version.value()));

        let user_command = ctx.app.user_command();
        let user_file = user_command
            .map(|cmd| app_path.join(cmd))
            .filter(|path| ctx.fs.is_file(path));

        let package_json_path = match &user_file {
            Some(path) if path.to_string_lossy().ends_with("package.json") => Some(path.clone()),
            Some(_) => None,
            None => Some(app_path.join("package.json")),
        };

        let detection = NodeDetection {
            runtime: self,
            fs: ctx.fs,
            app_path,
            user_command,
            user_file,
            default_app: ctx.app.default_app.as_deref(),
            package_json: package_json_path
                .and_then(|path| NodeDetection::load_package_json(ctx.fs, path)),
            legacy_debugger,
        };

        let command = first_match(&strategies(), &detection)
            .ok_or_else(|| ctx.no_command(&PlatformId::Node))?;
        Ok(builder.finish(command))
    }
}
