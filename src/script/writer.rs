use crate::error::ScriptError;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use tracing::{debug, info};

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

#[cfg(unix)]
const SCRIPT_MODE: u32 = 0o755;

/// Writes the script, creating parent directories, and makes it executable.
pub fn write_script(path: &Path, content: &str) -> Result<(), ScriptError> {
    let wrap = |source: io::Error| ScriptError::WriteFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(wrap)?;
    }

    fs::write(path, content).map_err(wrap)?;

    #[cfg(unix)]
    fs::set_permissions(path, fs::Permissions::from_mode(SCRIPT_MODE)).map_err(wrap)?;

    info!("Script written to {}", path.display());
    Ok(())
}

/// Appends a newline-delimited block to an existing script. Empty content is
/// a no-op.
pub fn append_script(path: &Path, content: &str) -> io::Result<()> {
    if content.is_empty() {
        return Ok(());
    }

    let mut file = OpenOptions::new().append(true).open(path)?;
    write!(file, "\n{}\n", content)?;

    debug!("Appended {} bytes to {}", content.len(), path.display());
    Ok(())
}
