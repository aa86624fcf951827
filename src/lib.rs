//! Volstrap library - interactive Debian/Ubuntu installer with LVM layouts

pub mod config;
pub mod disk;
pub mod install;
pub mod provision;
pub mod utils;

pub use config::InstallConfig;
pub use utils::error::VolstrapError;
