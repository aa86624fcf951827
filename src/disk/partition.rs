//! The partition model: one planned partition or logical volume.

use std::path::{Path, PathBuf};

/// Filesystems the installer knows how to create.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filesystem {
    Ext4,
    Ext2,
    Ext3,
    Fat32,
    Xfs,
    Btrfs,
    Ntfs,
    Hfs,
}

/// Order shown to the user when asked to pick a filesystem.
pub const FILESYSTEMS: [Filesystem; 8] = [
    Filesystem::Ext4,
    Filesystem::Ext2,
    Filesystem::Ext3,
    Filesystem::Fat32,
    Filesystem::Xfs,
    Filesystem::Btrfs,
    Filesystem::Ntfs,
    Filesystem::Hfs,
];

impl Filesystem {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ext4 => "ext4",
            Self::Ext2 => "ext2",
            Self::Ext3 => "ext3",
            Self::Fat32 => "fat32",
            Self::Xfs => "xfs",
            Self::Btrfs => "btrfs",
            Self::Ntfs => "ntfs",
            Self::Hfs => "hfs",
        }
    }
}

impl std::fmt::Display for Filesystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Requested size of a partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartSize {
    /// Exact byte count.
    Fixed(u64),
    /// Consume all space left on the disk after every fixed entry.
    /// Valid at most once per layout and always sequenced last so LVM can
    /// allocate it from the remaining free extents.
    Remaining,
}

impl PartSize {
    pub fn is_remaining(&self) -> bool {
        matches!(self, Self::Remaining)
    }

    pub fn fixed_bytes(&self) -> Option<u64> {
        match self {
            Self::Fixed(b) => Some(*b),
            Self::Remaining => None,
        }
    }
}

/// Derive a logical volume name from a mount path.
///
/// `/` gets the canonical name `root`; `/root` would collide with it under
/// the naive rule, so it maps to `roothome`. Every other path is the path
/// with the leading slash stripped and the remaining slashes replaced by
/// underscores. `boot` and `boot_efi` are identification names only; those
/// two entries are never LVM-backed.
pub fn volume_name_for(path: &Path) -> String {
    let s = path.to_string_lossy();
    match s.as_ref() {
        "/" => "root".to_string(),
        "/root" => "roothome".to_string(),
        other => other.trim_start_matches('/').replace('/', "_"),
    }
}

/// One planned partition or logical volume.
///
/// Created by the planner, immutable once appended to the layout, and only
/// read by the provisioning sequencer and the fstab generator.
#[derive(Debug, Clone)]
pub struct Partition {
    /// Absolute mount path, unique within a layout.
    pub mount_path: PathBuf,
    pub size: PartSize,
    pub filesystem: Filesystem,
    /// Derived from `mount_path`, see [`volume_name_for`].
    pub volume_name: String,
    /// Concrete block device for the two non-LVM entries (the EFI system
    /// partition on index 1 and boot on index 2). `None` for LVM volumes.
    pub fixed_device: Option<String>,
}

impl Partition {
    pub fn new(
        mount_path: PathBuf,
        size: PartSize,
        filesystem: Filesystem,
        fixed_device: Option<String>,
    ) -> Self {
        let volume_name = volume_name_for(&mount_path);
        Self {
            mount_path,
            size,
            filesystem,
            volume_name,
            fixed_device,
        }
    }

    /// True for the EFI and boot entries, which live on raw partitions.
    pub fn is_fixed_device(&self) -> bool {
        self.fixed_device.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn volume_names_are_deterministic() {
        assert_eq!(volume_name_for(Path::new("/")), "root");
        assert_eq!(volume_name_for(Path::new("/boot")), "boot");
        assert_eq!(volume_name_for(Path::new("/boot/efi")), "boot_efi");
        assert_eq!(volume_name_for(Path::new("/srv/data")), "srv_data");
        assert_eq!(volume_name_for(Path::new("/home")), "home");
    }

    #[test]
    fn root_home_does_not_collide_with_root() {
        assert_ne!(
            volume_name_for(Path::new("/root")),
            volume_name_for(Path::new("/"))
        );
        assert_eq!(volume_name_for(Path::new("/root")), "roothome");
    }

    #[test]
    fn partition_derives_its_volume_name() {
        let part = Partition::new(
            PathBuf::from("/srv/data"),
            PartSize::Fixed(1024),
            Filesystem::Ext4,
            None,
        );
        assert_eq!(part.volume_name, "srv_data");
        assert!(!part.is_fixed_device());
        assert_eq!(part.size.fixed_bytes(), Some(1024));
    }
}
