use crate::setup_env::DEFAULT_INSTALLER;
use crate::stack::runtime::{
    AppOptions, DotNetRuntime, GolangRuntime, HugoRuntime, NodeRuntime, PhpRuntime,
    PythonRuntime, RubyRuntime, Runtime,
};
use crate::stack::PlatformId;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Generates the startup script of a deployed application
#[derive(Parser, Debug)]
#[command(
    name = "startupgen",
    about = "Generates the startup script of a deployed application",
    version,
    author,
    long_about = "startupgen inspects a built application directory and writes the shell script \
                  a container entrypoint runs to start it. Supported platforms: .NET, Node.js, \
                  PHP, Python, Ruby, Go and static sites."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, value_name = "LEVEL", help = "Set logging level")]
    pub log_level: Option<String>,

    #[arg(short = 'v', long, global = true, help = "Enable debug logging")]
    pub verbose: bool,

    #[arg(
        short = 'q',
        long,
        global = true,
        conflicts_with = "verbose",
        help = "Quiet mode - only log errors"
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(
        about = "Create the startup script for an app",
        long_about = "Detects how to start the app and writes the startup script.\n\n\
                      Examples:\n  \
                      startupgen create-script node --appPath /home/site/wwwroot\n  \
                      startupgen create-script python --appPath . --virtualEnvName antenv\n  \
                      startupgen create-script dotnet --defaultApp /defaultapp/app.dll --output /run.sh"
    )]
    CreateScript(CreateScriptArgs),

    #[command(
        name = "setup-env",
        alias = "setupEnv",
        about = "Install the platform version recorded in the build manifest"
    )]
    SetupEnv(SetupEnvArgs),

    #[command(about = "Print version information")]
    Version,
}

#[derive(Args, Debug, Clone)]
pub struct CreateScriptArgs {
    #[command(subcommand)]
    pub platform: PlatformCommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum PlatformCommand {
    #[command(name = "dotnet", alias = "dotnetcore", about = ".NET apps")]
    DotNet(DotNetArgs),

    #[command(alias = "nodejs", about = "Node.js apps")]
    Node(NodeArgs),

    #[command(about = "PHP apps")]
    Php(PhpArgs),

    #[command(about = "Python apps")]
    Python(PythonArgs),

    #[command(about = "Ruby apps")]
    Ruby(CommonArgs),

    #[command(alias = "go", about = "Go apps")]
    Golang(CommonArgs),

    #[command(alias = "static", about = "Static sites")]
    Hugo(CommonArgs),
}

/// Flags every platform accepts.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct CommonArgs {
    #[arg(
        long = "appPath",
        alias = "app-path",
        value_name = "DIR",
        default_value = ".",
        help = "The path to the application folder, e.g. '/home/site/wwwroot/'"
    )]
    pub app_path: PathBuf,

    #[arg(
        long = "manifestDir",
        alias = "manifest-dir",
        value_name = "DIR",
        help = "Directory of the build manifest (defaults to the app path)"
    )]
    pub manifest_dir: Option<PathBuf>,

    #[arg(
        long = "userStartupCommand",
        alias = "user-startup-command",
        value_name = "COMMAND",
        help = "Command that starts the app"
    )]
    pub user_startup_command: Option<String>,

    #[arg(
        long = "defaultApp",
        alias = "default-app",
        value_name = "PATH",
        help = "App to run when no startup command can be found"
    )]
    pub default_app: Option<PathBuf>,

    #[arg(
        long = "bindPort",
        alias = "bind-port",
        value_name = "PORT",
        help = "Port the app binds to"
    )]
    pub bind_port: Option<String>,

    #[arg(
        long,
        value_name = "FILE",
        default_value = "run.sh",
        help = "Path of the script to generate"
    )]
    pub output: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct DotNetArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    #[arg(
        long = "runFromPath",
        alias = "run-from-path",
        value_name = "DIR",
        help = "Copy the app to this directory and run it from there"
    )]
    pub run_from_path: Option<PathBuf>,

    #[arg(
        long = "bindPort2",
        alias = "bind-port2",
        value_name = "PORT",
        help = "Second port, served over HTTP/2"
    )]
    pub bind_port2: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct NodeArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    #[arg(long = "usePM2", alias = "use-pm2", help = "Start the app with pm2")]
    pub use_pm2: bool,

    #[arg(long = "remoteDebug", alias = "remote-debug", help = "Run with the inspector enabled")]
    pub remote_debug: bool,

    #[arg(
        long = "remoteDebugBrk",
        alias = "remote-debug-brk",
        help = "Run with the inspector enabled and break before user code"
    )]
    pub remote_debug_brk: bool,

    #[arg(
        long = "debugHost",
        alias = "debug-host",
        value_name = "HOST",
        default_value = "0.0.0.0",
        help = "Host the inspector listens on"
    )]
    pub debug_host: String,

    #[arg(
        long = "debugPort",
        alias = "debug-port",
        value_name = "PORT",
        help = "Port the inspector listens on"
    )]
    pub debug_port: Option<String>,

    #[arg(
        long = "skipNodeModulesExtraction",
        alias = "skip-node-modules-extraction",
        help = "Do not extract the compressed node_modules"
    )]
    pub skip_node_modules_extraction: bool,
}

#[derive(Args, Debug, Clone)]
pub struct PhpArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    #[arg(long, help = "Serve with php-fpm behind nginx instead of apache")]
    pub fpm: bool,
}

#[derive(Args, Debug, Clone)]
pub struct PythonArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    #[arg(
        long = "virtualEnvName",
        alias = "virtual-env-name",
        value_name = "NAME",
        help = "Name of the virtual environment directory"
    )]
    pub virtual_env_name: Option<String>,

    #[arg(
        long = "packagedir",
        alias = "package-dir",
        value_name = "DIR",
        help = "Directory the packages were installed to"
    )]
    pub package_dir: Option<String>,

    #[arg(
        long = "defaultAppModule",
        alias = "default-app-module",
        value_name = "MODULE",
        default_value = crate::stack::runtime::python::DEFAULT_APP_MODULE,
        help = "Gunicorn module of the default app"
    )]
    pub default_app_module: String,

    #[arg(
        long = "defaultAppDebugModule",
        alias = "default-app-debug-module",
        value_name = "FILE",
        default_value = crate::stack::runtime::python::DEFAULT_APP_DEBUG_MODULE,
        help = "File the debugger runs for the default app"
    )]
    pub default_app_debug_module: String,

    #[arg(
        long = "debugAdapter",
        alias = "debug-adapter",
        value_name = "ADAPTER",
        help = "Debug adapter to run the app under (debugpy)"
    )]
    pub debug_adapter: Option<String>,

    #[arg(
        long = "debugPort",
        alias = "debug-port",
        value_name = "PORT",
        default_value = crate::stack::runtime::python::DEFAULT_DEBUG_PORT,
        help = "Port the debug adapter listens on"
    )]
    pub debug_port: String,

    #[arg(
        long = "debugWait",
        alias = "debug-wait",
        help = "Wait for the debugger to attach before starting"
    )]
    pub debug_wait: bool,

    #[arg(
        long = "skipVirtualEnvExtraction",
        alias = "skip-virtual-env-extraction",
        help = "Do not extract the compressed virtual environment"
    )]
    pub skip_virtual_env_extraction: bool,
}

#[derive(Args, Debug, Clone)]
pub struct SetupEnvArgs {
    #[arg(
        long,
        value_name = "PLATFORM",
        help = "Platform to install (defaults to the one in the build manifest)"
    )]
    pub platform: Option<String>,

    #[arg(long = "appPath", alias = "app-path", value_name = "DIR", default_value = ".")]
    pub app_path: PathBuf,

    #[arg(long = "manifestDir", alias = "manifest-dir", value_name = "DIR")]
    pub manifest_dir: Option<PathBuf>,

    #[arg(
        long,
        value_name = "COMMAND",
        default_value = DEFAULT_INSTALLER,
        help = "Program that downloads and installs a platform version"
    )]
    pub installer: String,

    #[arg(long, help = "Print the setup script instead of running it")]
    pub dry_run: bool,
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl PlatformCommand {
    pub fn platform(&self) -> PlatformId {
        match self {
            PlatformCommand::DotNet(_) => PlatformId::DotNet,
            PlatformCommand::Node(_) => PlatformId::Node,
            PlatformCommand::Php(_) => PlatformId::Php,
            PlatformCommand::Python(_) => PlatformId::Python,
            PlatformCommand::Ruby(_) => PlatformId::Ruby,
            PlatformCommand::Golang(_) => PlatformId::Golang,
            PlatformCommand::Hugo(_) => PlatformId::Hugo,
        }
    }

    pub fn common(&self) -> &CommonArgs {
        match self {
            PlatformCommand::DotNet(args) => &args.common,
            PlatformCommand::Node(args) => &args.common,
            PlatformCommand::Php(args) => &args.common,
            PlatformCommand::Python(args) => &args.common,
            PlatformCommand::Ruby(common)
            | PlatformCommand::Golang(common)
            | PlatformCommand::Hugo(common) => common,
        }
    }

    /// The platform's runtime, configured from its flags.
    pub fn runtime(&self) -> Box<dyn Runtime> {
        match self {
            PlatformCommand::DotNet(args) => Box::new(DotNetRuntime {
                run_from_path: args.run_from_path.clone(),
                bind_port2: non_empty(&args.bind_port2),
            }),
            PlatformCommand::Node(args) => Box::new(NodeRuntime {
                use_pm2: args.use_pm2,
                remote_debug: args.remote_debug,
                remote_debug_brk: args.remote_debug_brk,
                debug_host: non_empty(&Some(args.debug_host.clone())),
                debug_port: non_empty(&args.debug_port),
                skip_node_modules_extraction: args.skip_node_modules_extraction,
            }),
            PlatformCommand::Php(args) => Box::new(PhpRuntime { fpm: args.fpm }),
            PlatformCommand::Python(args) => Box::new(PythonRuntime {
                virtual_env_name: non_empty(&args.virtual_env_name),
                package_dir: non_empty(&args.package_dir),
                default_app_module: args.default_app_module.clone(),
                default_app_debug_module: args.default_app_debug_module.clone(),
                debug_adapter: non_empty(&args.debug_adapter),
                debug_port: args.debug_port.clone(),
                debug_wait: args.debug_wait,
                skip_virtual_env_extraction: args.skip_virtual_env_extraction,
                workers: None,
            }),
            PlatformCommand::Ruby(_) => Box::new(RubyRuntime),
            PlatformCommand::Golang(_) => Box::new(GolangRuntime),
            PlatformCommand::Hugo(_) => Box::new(HugoRuntime),
        }
    }
}

impl CommonArgs {
    /// App options with paths already validated and made absolute.
    pub fn app_options(&self, app_path: PathBuf, default_app: Option<PathBuf>) -> AppOptions {
        AppOptions {
            app_path,
            user_startup_command: non_empty(&self.user_startup_command),
            default_app,
            bind_port: non_empty(&self.bind_port),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_args_verify() {
        CliArgs::command().debug_assert();
    }

    fn create_script(args: &[&str]) -> PlatformCommand {
        let mut argv = vec!["startupgen", "create-script"];
        argv.extend_from_slice(args);
        match CliArgs::parse_from(argv).command {
            Commands::CreateScript(args) => args.platform,
            other => panic!("Expected CreateScript command, got {:?}", other),
        }
    }

    #[test]
    fn test_common_defaults() {
        let platform = create_script(&["ruby"]);
        let common = platform.common();
        assert_eq!(common.app_path, PathBuf::from("."));
        assert_eq!(common.output, PathBuf::from("run.sh"));
        assert!(common.manifest_dir.is_none());
        assert!(common.bind_port.is_none());
        assert_eq!(platform.platform(), PlatformId::Ruby);
    }

    #[test]
    fn test_camel_case_and_kebab_case_flags() {
        let camel = create_script(&["golang", "--appPath", "/app", "--bindPort", "3000"]);
        let kebab = create_script(&["golang", "--app-path", "/app", "--bind-port", "3000"]);
        assert_eq!(camel.common(), kebab.common());
        assert_eq!(camel.common().bind_port.as_deref(), Some("3000"));
    }

    #[test]
    fn test_node_flags() {
        let platform = create_script(&["node", "--usePM2", "--remoteDebugBrk", "--debugPort", "9229"]);
        match platform {
            PlatformCommand::Node(args) => {
                assert!(args.use_pm2);
                assert!(args.remote_debug_brk);
                assert!(!args.remote_debug);
                assert_eq!(args.debug_host, "0.0.0.0");
                assert_eq!(args.debug_port.as_deref(), Some("9229"));
            }
            other => panic!("Expected node, got {:?}", other),
        }
    }

    #[test]
    fn test_python_defaults() {
        match create_script(&["python", "--virtualEnvName", "antenv"]) {
            PlatformCommand::Python(args) => {
                assert_eq!(args.virtual_env_name.as_deref(), Some("antenv"));
                assert_eq!(args.default_app_module, "application:app");
                assert_eq!(args.default_app_debug_module, "application.py");
                assert_eq!(args.debug_port, "5678");
                assert!(!args.debug_wait);
            }
            other => panic!("Expected python, got {:?}", other),
        }
    }

    #[test]
    fn test_platform_aliases() {
        assert_eq!(create_script(&["dotnetcore"]).platform(), PlatformId::DotNet);
        assert_eq!(create_script(&["go"]).platform(), PlatformId::Golang);
        assert_eq!(create_script(&["static"]).platform(), PlatformId::Hugo);
    }

    #[test]
    fn test_runtime_matches_platform() {
        for name in ["dotnet", "node", "php", "python", "ruby", "golang", "hugo"] {
            let platform = create_script(&[name]);
            assert_eq!(platform.runtime().platform(), platform.platform());
        }
    }

    #[test]
    fn test_setup_env_args() {
        let args = CliArgs::parse_from(["startupgen", "setupEnv", "--platform", "ruby", "--dry-run"]);
        match args.command {
            Commands::SetupEnv(args) => {
                assert_eq!(args.platform.as_deref(), Some("ruby"));
                assert_eq!(args.installer, DEFAULT_INSTALLER);
                assert!(args.dry_run);
            }
            other => panic!("Expected SetupEnv command, got {:?}", other),
        }
    }

    #[test]
    fn test_verbose_conflicts_with_quiet() {
        assert!(CliArgs::try_parse_from(["startupgen", "-v", "-q", "version"]).is_err());
    }

    #[test]
    fn test_unknown_platform_is_usage_error() {
        assert!(CliArgs::try_parse_from(["startupgen", "create-script", "cobol"]).is_err());
    }
}
