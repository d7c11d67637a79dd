use std::path::PathBuf;
use thiserror::Error;

/// Exit code used for every fatal failure of a run.
pub const FAILURE_EXIT_CODE: i32 = 1;

/// Fatal errors. Anything that surfaces as a `ScriptError` aborts the run
/// without writing a script.
#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("Provided app path '{0}' is not valid or does not exist")]
    InvalidAppPath(PathBuf),

    #[error("Provided default app path '{0}' is not valid or does not exist")]
    InvalidDefaultApp(PathBuf),

    #[error(
        "Unrecognizable file '{0}'. Expected a file with an extension '.zip' or '.tar.gz'"
    )]
    UnsupportedArchive(String),

    #[error("Unable to determine a startup command for {platform} and no default app was provided")]
    NoStartupCommand { platform: String },

    #[error("Unknown platform '{0}'")]
    UnknownPlatform(String),

    #[error("No {platform} version recorded in the build manifest")]
    MissingPlatformVersion { platform: String },

    #[error("Failed to write script to {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Environment setup failed: {0}")]
    SetupFailed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_archive_message() {
        let err = ScriptError::UnsupportedArchive("node_modules.rar".to_string());
        assert_eq!(
            err.to_string(),
            "Unrecognizable file 'node_modules.rar'. Expected a file with an extension '.zip' or '.tar.gz'"
        );
    }

    #[test]
    fn test_no_startup_command_names_platform() {
        let err = ScriptError::NoStartupCommand {
            platform: "dotnet".to_string(),
        };
        assert!(err.to_string().contains("dotnet"));
    }

    #[test]
    fn test_write_failed_keeps_source() {
        use std::error::Error;

        let err = ScriptError::WriteFailed {
            path: PathBuf::from("/readonly/run.sh"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(err.source().is_some());
        assert!(err.to_string().contains("/readonly/run.sh"));
    }
}
