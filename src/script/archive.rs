use crate::error::ScriptError;

/// Compression format of an artifact produced at build time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    Zip,
    TarGz,
}

impl ArchiveKind {
    /// Picks the format from the file extension. Anything other than `.zip`
    /// or `.tar.gz` is a configuration error.
    pub fn from_file_name(name: &str) -> Result<Self, ScriptError> {
        if name.ends_with(".zip") {
            Ok(ArchiveKind::Zip)
        } else if name.ends_with(".tar.gz") {
            Ok(ArchiveKind::TarGz)
        } else {
            Err(ScriptError::UnsupportedArchive(name.to_string()))
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ArchiveKind::Zip => "zip",
            ArchiveKind::TarGz => "tar.gz",
        }
    }

    /// Shell command that unpacks `archive` into the existing `target` dir.
    pub fn extraction_command(&self, archive: &str, target: &str) -> String {
        match self {
            ArchiveKind::Zip => format!("unzip -q {} -d {}", archive, target),
            ArchiveKind::TarGz => format!("tar -xzf {} -C {}", archive, target),
        }
    }
}
