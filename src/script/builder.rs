//! Assembly of the generated shell script.
//!
//! Statements are appended in the order the caller adds them. The startup
//! command is handed to [`ScriptBuilder::finish`], which consumes the builder,
//! so the command is always the last statement of the script.

use super::StartupCommand;
use crate::config::Resolved;
use std::path::Path;

pub const SH: &str = "#!/bin/sh";
pub const BASH: &str = "#!/bin/bash";

#[derive(Debug, Clone)]
pub struct ScriptBuilder {
    shebang: &'static str,
    errexit: bool,
    statements: Vec<String>,
}

impl ScriptBuilder {
    pub fn new(shebang: &'static str) -> Self {
        Self {
            shebang,
            errexit: false,
            statements: Vec::new(),
        }
    }

    /// Starts a script that stops at the first failing statement.
    pub fn with_errexit(shebang: &'static str) -> Self {
        let mut builder = Self::new(shebang);
        builder.errexit = true;
        builder.statements.push("set -e".to_string());
        builder.blank();
        builder
    }

    pub fn line(&mut self, statement: impl Into<String>) -> &mut Self {
        self.statements.push(statement.into());
        self
    }

    pub fn lines<I, S>(&mut self, statements: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.statements
            .extend(statements.into_iter().map(Into::into));
        self
    }

    pub fn blank(&mut self) -> &mut Self {
        self.statements.push(String::new());
        self
    }

    pub fn comment(&mut self, text: &str) -> &mut Self {
        self.statements.push(format!("# {}", text));
        self
    }

    pub fn echo(&mut self, message: &str) -> &mut Self {
        self.statements.push(format!("echo {}", message));
        self
    }

    pub fn cd(&mut self, dir: &Path) -> &mut Self {
        self.statements.push(format!("cd \"{}\"", dir.display()));
        self
    }

    pub fn export(&mut self, name: &str, value: &str) -> &mut Self {
        self.statements.push(format!("export {}={}", name, value));
        self
    }

    pub fn export_resolved(&mut self, resolved: &Resolved) -> &mut Self {
        if let Some(statement) = resolved.export_statement() {
            self.statements.push(statement);
        }
        self
    }

    /// Runs the operator's pre-run command. A failure of the hook does not
    /// stop the script, even when it runs with `set -e`.
    pub fn pre_run(&mut self, app_path: &Path, command: Option<&str>) -> &mut Self {
        let Some(command) = command.map(str::trim).filter(|c| !c.is_empty()) else {
            return self;
        };

        self.blank();
        self.comment("Run the pre-run command supplied by the operator");
        self.cd(app_path);
        if self.errexit {
            self.line("set +e");
        }
        self.echo("Executing pre-run command...");
        self.line(command);
        if self.errexit {
            self.line("set -e");
        }
        self.blank()
    }

    /// Appends the startup command and returns the finished script text.
    pub fn finish(mut self, command: StartupCommand) -> String {
        self.statements.extend(command.preamble);
        if let Some(dir) = &command.working_dir {
            self.statements.push(format!("cd \"{}\"", dir.display()));
        }
        self.statements.push(command.command.trim_end().to_string());

        let mut script = String::with_capacity(
            self.shebang.len() + self.statements.iter().map(|s| s.len() + 1).sum::<usize>() + 1,
        );
        script.push_str(self.shebang);
        script.push('\n');
        for statement in &self.statements {
            script.push_str(statement);
            script.push('\n');
        }
        script
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ValueSource;
    use std::path::PathBuf;

    #[test]
    fn test_command_is_last_line() {
        let mut builder = ScriptBuilder::new(SH);
        builder.cd(Path::new("/app")).export("NODE_PATH", "/usr/local/lib/node_modules");

        let script = builder.finish(StartupCommand::new("CandidateFile", "node server.js"));

        assert_eq!(
            script,
            "#!/bin/sh\ncd \"/app\"\nexport NODE_PATH=/usr/local/lib/node_modules\nnode server.js\n"
        );
    }

    #[test]
    fn test_preamble_and_working_dir_precede_command() {
        let builder = ScriptBuilder::new(SH);
        let command = StartupCommand::new("DefaultApp", "dotnet \"/defaultapp/app.dll\"")
            .with_preamble(["echo 'Running the default app'"])
            .in_dir(PathBuf::from("/defaultapp"));

        let script = builder.finish(command);
        let lines: Vec<&str> = script.lines().collect();

        assert_eq!(lines[1], "echo 'Running the default app'");
        assert_eq!(lines[2], "cd \"/defaultapp\"");
        assert_eq!(lines[3], "dotnet \"/defaultapp/app.dll\"");
    }

    #[test]
    fn test_errexit_header() {
        let builder = ScriptBuilder::with_errexit(BASH);
        let script = builder.finish(StartupCommand::new("User", "true"));
        assert!(script.starts_with("#!/bin/bash\nset -e\n\n"));
    }

    #[test]
    fn test_pre_run_is_not_fatal_under_errexit() {
        let mut builder = ScriptBuilder::with_errexit(SH);
        builder.pre_run(Path::new("/app"), Some("./warmup.sh"));
        let script = builder.finish(StartupCommand::new("User", "true"));

        let set_plus = script.find("set +e").unwrap();
        let hook = script.find("./warmup.sh").unwrap();
        let set_minus = script.rfind("set -e").unwrap();
        assert!(set_plus < hook && hook < set_minus);
    }

    #[test]
    fn test_pre_run_skipped_when_absent() {
        let mut builder = ScriptBuilder::new(SH);
        builder.pre_run(Path::new("/app"), None).pre_run(Path::new("/app"), Some("  "));
        let script = builder.finish(StartupCommand::new("User", "true"));
        assert_eq!(script, "#!/bin/sh\ntrue\n");
    }

    #[test]
    fn test_export_resolved() {
        let resolved = Resolved {
            name: "PORT".to_string(),
            value: "9000".to_string(),
            source: ValueSource::Explicit,
            fallback: "8080".to_string(),
        };
        let mut builder = ScriptBuilder::new(SH);
        builder.export_resolved(&resolved);
        let script = builder.finish(StartupCommand::new("User", "true"));
        assert!(script.contains("export PORT=9000\n"));
    }
}
