pub mod commands;
pub mod handlers;

pub use commands::{CliArgs, Commands, CommonArgs, CreateScriptArgs, PlatformCommand, SetupEnvArgs};
pub use handlers::{handle_create_script, handle_setup_env, handle_version};
