//! Disk detection and enumeration

use crate::utils::error::{Result, VolstrapError};
use std::fs;
use std::os::unix::fs::FileTypeExt;
use std::path::Path;

/// Information about a candidate installation disk
#[derive(Debug, Clone)]
pub struct BlockDevice {
    /// Device path (e.g., /dev/sda)
    pub path: String,
    /// Device name (e.g., sda)
    pub name: String,
    /// Size in bytes
    pub size_bytes: u64,
    /// Device model (if available)
    pub model: Option<String>,
}

impl BlockDevice {
    /// Get human-readable size
    pub fn size_human(&self) -> String {
        const KIB: u64 = 1024;
        const MIB: u64 = KIB * 1024;
        const GIB: u64 = MIB * 1024;
        const TIB: u64 = GIB * 1024;

        if self.size_bytes >= TIB {
            format!("{:.1}T", self.size_bytes as f64 / TIB as f64)
        } else if self.size_bytes >= GIB {
            format!("{:.1}G", self.size_bytes as f64 / GIB as f64)
        } else if self.size_bytes >= MIB {
            format!("{:.1}M", self.size_bytes as f64 / MIB as f64)
        } else {
            format!("{}B", self.size_bytes)
        }
    }
}

/// Read a sysfs attribute, returning None if not available
fn read_sysfs_attr(device: &str, attr: &str) -> Option<String> {
    let path = format!("/sys/block/{}/{}", device, attr);
    fs::read_to_string(&path).ok().map(|s| s.trim().to_string())
}

fn read_sysfs_u64(device: &str, attr: &str) -> Option<u64> {
    read_sysfs_attr(device, attr).and_then(|s| s.parse().ok())
}

/// Total size of a disk in bytes.
///
/// The sysfs `size` attribute is always in 512-byte sectors regardless of
/// the device's logical block size.
pub fn disk_size_bytes(name: &str) -> Result<u64> {
    read_sysfs_u64(name, "size")
        .map(|sectors| sectors * 512)
        .ok_or_else(|| VolstrapError::DeviceNotFound(format!("/dev/{}", name)))
}

/// List whole-disk block devices suitable as installation targets.
pub fn list_block_devices() -> Result<Vec<BlockDevice>> {
    let mut devices = Vec::new();

    for entry in fs::read_dir("/sys/block")? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().to_string();

        if name.starts_with("loop") || name.starts_with("ram") {
            continue;
        }

        let size_sectors = read_sysfs_u64(&name, "size").unwrap_or(0);
        if size_sectors == 0 {
            continue;
        }

        let model = read_sysfs_attr(&name, "device/model")
            .or_else(|| read_sysfs_attr(&name, "device/name"));

        devices.push(BlockDevice {
            path: format!("/dev/{}", name),
            name,
            size_bytes: size_sectors * 512,
            model,
        });
    }

    devices.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(devices)
}

/// Check that a path exists and names a block device.
pub fn validate_block_device(path: &str) -> Result<()> {
    let p = Path::new(path);
    if !p.exists() {
        return Err(VolstrapError::DeviceNotFound(path.to_string()));
    }
    let metadata = fs::metadata(p)?;
    if !metadata.file_type().is_block_device() {
        return Err(VolstrapError::NotBlockDevice(path.to_string()));
    }
    Ok(())
}

/// Get the partition naming prefix for a device
/// e.g., /dev/sda -> /dev/sda, /dev/nvme0n1 -> /dev/nvme0n1p
fn partition_prefix(device: &str) -> String {
    if device.contains("nvme") || device.contains("mmcblk") || device.contains("loop") {
        format!("{}p", device)
    } else {
        device.to_string()
    }
}

/// Get partition path for a device and partition number
pub fn partition_path(device: &str, partition_num: u32) -> String {
    format!("{}{}", partition_prefix(device), partition_num)
}
