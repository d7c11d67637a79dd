use startupgen::cli::commands::{CliArgs, Commands};
use startupgen::cli::handlers::{handle_create_script, handle_setup_env, handle_version};
use startupgen::util::logging;
use startupgen::VERSION;

use clap::Parser;
use tracing::debug;

fn main() {
    let args = CliArgs::parse();
    logging::init_from_args(args.log_level.as_deref(), args.verbose, args.quiet);

    debug!("startupgen v{} starting", VERSION);
    debug!("Arguments: {:?}", args);

    let exit_code = match &args.command {
        Commands::CreateScript(create_args) => handle_create_script(create_args),
        Commands::SetupEnv(setup_args) => handle_setup_env(setup_args),
        Commands::Version => handle_version(),
    };

    std::process::exit(exit_code);
}
