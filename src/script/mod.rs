pub mod archive;
pub mod builder;
pub mod command;
pub mod writer;

pub use archive::ArchiveKind;
pub use builder::ScriptBuilder;
pub use command::StartupCommand;
pub use writer::{append_script, write_script};
