//! Error types for volstrap

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VolstrapError {
    #[error("Must be run as root")]
    NotRoot,

    #[error("Unsupported architecture: {0} (only x86_64 is supported)")]
    UnsupportedArch(String),

    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("Device is not a block device: {0}")]
    NotBlockDevice(String),

    #[error("Invalid size '{0}': expected a number followed by M or G")]
    InvalidSizeFormat(String),

    #[error("Partition error: {0}")]
    PartitionError(String),

    #[error("Filesystem error: {0}")]
    FilesystemError(String),

    #[error("Mount error: {0}")]
    MountError(String),

    #[error("LVM error: {0}")]
    LvmError(String),

    #[error("Encryption error: {0}")]
    EncryptionError(String),

    #[error("{0} already exists. stopping so we don't ruin anything")]
    TargetExists(PathBuf),

    #[error("Mirror list error: {0}")]
    MirrorError(String),

    #[error("Bootstrap error: {0}")]
    BootstrapError(String),

    #[error("Command failed: {command}\n{stderr}")]
    CommandFailed { command: String, stderr: String },

    #[error("Command not found: {0}")]
    CommandNotFound(String),

    #[error("User cancelled operation")]
    UserCancelled,

    #[error("Interrupted by signal")]
    Interrupted,

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, VolstrapError>;
