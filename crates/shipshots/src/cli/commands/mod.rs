//! CLI commands

mod classify;
mod devices;
mod discover;
mod init;
mod upload;

pub use classify::ClassifyCommand;
pub use devices::DevicesCommand;
pub use discover::DiscoverCommand;
pub use init::InitCommand;
pub use upload::UploadCommand;
