//! Filesystem creation and UUID lookup

use crate::disk::partition::Filesystem;
use crate::utils::command::CommandRunner;
use crate::utils::error::{Result, VolstrapError};
use tracing::info;

/// mkfs program and force flags for each supported filesystem.
fn mkfs_invocation(fs: Filesystem) -> (&'static str, &'static [&'static str]) {
    match fs {
        Filesystem::Ext4 => ("mkfs.ext4", &["-F", "-q"]),
        Filesystem::Ext3 => ("mkfs.ext3", &["-F", "-q"]),
        Filesystem::Ext2 => ("mkfs.ext2", &["-F", "-q"]),
        Filesystem::Fat32 => ("mkfs.fat", &["-F32"]),
        Filesystem::Xfs => ("mkfs.xfs", &["-f"]),
        Filesystem::Btrfs => ("mkfs.btrfs", &["-f"]),
        Filesystem::Ntfs => ("mkfs.ntfs", &["-F", "-Q"]),
        Filesystem::Hfs => ("mkfs.hfsplus", &[]),
    }
}

/// Create a filesystem on a device
pub fn make_filesystem(cmd: &CommandRunner, device: &str, fs: Filesystem) -> Result<()> {
    info!("making filesystem {} on {}", fs, device);

    let (program, flags) = mkfs_invocation(fs);
    let mut args: Vec<&str> = flags.to_vec();
    args.push(device);

    cmd.run(program, &args).map(|_| ()).map_err(|e| {
        VolstrapError::FilesystemError(format!("failed to format {}: {}", device, e))
    })
}

/// Get the UUID of a formatted block device
pub fn partition_uuid(cmd: &CommandRunner, device: &str) -> Result<String> {
    let uuid = cmd
        .run_output("blkid", &["-s", "UUID", "-o", "value", device])?
        .unwrap_or_default();

    if uuid.is_empty() && !cmd.is_dry_run() {
        return Err(VolstrapError::FilesystemError(format!(
            "no UUID for {}",
            device
        )));
    }
    Ok(uuid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fat32_uses_mkfs_fat_with_size_flag() {
        let (program, flags) = mkfs_invocation(Filesystem::Fat32);
        assert_eq!(program, "mkfs.fat");
        assert_eq!(flags, &["-F32"]);
    }

    #[test]
    fn every_filesystem_maps_to_an_mkfs_program() {
        for fs in crate::disk::partition::FILESYSTEMS {
            let (program, _) = mkfs_invocation(fs);
            assert!(program.starts_with("mkfs."));
        }
    }
}
