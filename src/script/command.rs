use crate::fs::FileSystem;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// The command that launches the application, plus anything that has to run
/// immediately before it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartupCommand {
    /// Statements emitted right before the command, e.g. debugger exports.
    pub preamble: Vec<String>,
    /// Directory to enter before running the command.
    pub working_dir: Option<PathBuf>,
    pub command: String,
    /// Name of the detection strategy that produced the command.
    pub source: String,
}

impl StartupCommand {
    pub fn new(source: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            preamble: Vec::new(),
            working_dir: None,
            command: command.into(),
            source: source.into(),
        }
    }

    pub fn with_preamble<I, S>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.preamble.extend(lines.into_iter().map(Into::into));
        self
    }

    pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }
}

/// First whitespace-separated token of a shell command.
pub fn first_token(command: &str) -> Option<&str> {
    command.split_whitespace().next()
}

/// Marks the program named by the first token executable when it is a file
/// inside the app directory. Returns whether the bit was set.
pub fn add_execute_permission(fs: &dyn FileSystem, command: &str, app_path: &Path) -> bool {
    let Some(program) = first_token(command) else {
        return false;
    };

    let candidate = app_path.join(program);
    if !fs.is_file(&candidate) {
        debug!("'{}' is not a file in the app directory", program);
        return false;
    }

    match fs.set_executable(&candidate) {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, "Could not mark {} as executable", candidate.display());
            false
        }
    }
}

/// Lets the command refer to programs in the app directory without a path.
pub fn extend_path_for_command(command: &str, app_path: &Path) -> String {
    format!("PATH=\"$PATH:{}\" {}", app_path.display(), command.trim())
}

/// Startup command for a user-supplied command line.
pub fn user_command(
    fs: &dyn FileSystem,
    command: &str,
    app_path: &Path,
    source: &str,
) -> StartupCommand {
    let permission_added = add_execute_permission(fs, command, app_path);
    debug!(permission_added, "Using user-supplied startup command");
    StartupCommand::new(source, extend_path_for_command(command, app_path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MockFileSystem;

    #[test]
    fn test_first_token() {
        assert_eq!(first_token("  ./start.sh --prod"), Some("./start.sh"));
        assert_eq!(first_token("   "), None);
    }

    #[test]
    fn test_extend_path_for_command() {
        assert_eq!(
            extend_path_for_command(" startup.sh arg ", Path::new("/home/site/wwwroot")),
            "PATH=\"$PATH:/home/site/wwwroot\" startup.sh arg"
        );
    }

    #[test]
    fn test_add_execute_permission_for_app_file() {
        let fs = MockFileSystem::with_root(PathBuf::from("/app"));
        fs.add_file("startup.sh", "#!/bin/sh");

        assert!(add_execute_permission(&fs, "startup.sh --flag", Path::new("/app")));
        assert!(fs.is_executable("startup.sh"));
    }

    #[test]
    fn test_add_execute_permission_ignores_non_files() {
        let fs = MockFileSystem::with_root(PathBuf::from("/app"));
        fs.add_dir("scripts");

        assert!(!add_execute_permission(&fs, "gunicorn app:app", Path::new("/app")));
        assert!(!add_execute_permission(&fs, "scripts", Path::new("/app")));
        assert!(!add_execute_permission(&fs, "", Path::new("/app")));
    }

    #[test]
    fn test_user_command() {
        let fs = MockFileSystem::with_root(PathBuf::from("/app"));
        fs.add_file("run.sh", "");

        let cmd = user_command(&fs, "run.sh", Path::new("/app"), "User");

        assert_eq!(cmd.command, "PATH=\"$PATH:/app\" run.sh");
        assert_eq!(cmd.source, "User");
        assert!(cmd.preamble.is_empty());
        assert!(fs.is_executable("run.sh"));
    }

    #[test]
    fn test_builder_methods() {
        let cmd = StartupCommand::new("DefaultApp", "dotnet \"app.dll\"")
            .with_preamble(["echo one", "echo two"])
            .in_dir("/defaultapp");

        assert_eq!(cmd.preamble, vec!["echo one", "echo two"]);
        assert_eq!(cmd.working_dir, Some(PathBuf::from("/defaultapp")));
    }
}
