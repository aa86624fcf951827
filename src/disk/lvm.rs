//! LVM physical volume, volume group, and logical volume operations.

use crate::disk::partition::PartSize;
use crate::utils::command::CommandRunner;
use crate::utils::error::{Result, VolstrapError};
use tracing::info;

/// Create a physical volume on a device
pub fn create_pv(cmd: &CommandRunner, device: &str) -> Result<()> {
    info!("creating LVM physical volume on {}", device);

    cmd.run("pvcreate", &["-ff", "-y", device])
        .map(|_| ())
        .map_err(|e| VolstrapError::LvmError(format!("pvcreate {} failed: {}", device, e)))
}

/// Create a volume group
pub fn create_vg(cmd: &CommandRunner, vg_name: &str, pv_device: &str) -> Result<()> {
    info!("creating volume group '{}' on {}", vg_name, pv_device);

    cmd.run("vgcreate", &[vg_name, pv_device])
        .map(|_| ())
        .map_err(|e| VolstrapError::LvmError(format!("vgcreate {} failed: {}", vg_name, e)))
}

/// Create one logical volume.
///
/// Fixed entries request their exact byte count; the remaining-space entry
/// takes all free extents and therefore must be created after every fixed
/// volume in the group.
pub fn create_lv(cmd: &CommandRunner, vg_name: &str, lv_name: &str, size: PartSize) -> Result<()> {
    let result = match size {
        PartSize::Fixed(bytes) => {
            info!("creating logical volume {} ({} bytes)", lv_name, bytes);
            let size_arg = format!("{}b", bytes);
            cmd.run("lvcreate", &["-n", lv_name, "-L", &size_arg, "--yes", vg_name])
        }
        PartSize::Remaining => {
            info!("creating logical volume {} (all remaining extents)", lv_name);
            cmd.run("lvcreate", &["-n", lv_name, "-l", "100%FREE", "--yes", vg_name])
        }
    };

    result
        .map(|_| ())
        .map_err(|e| VolstrapError::LvmError(format!("lvcreate {} failed: {}", lv_name, e)))
}

/// Device node for a logical volume.
pub fn lv_path(vg_name: &str, lv_name: &str) -> String {
    format!("/dev/{}/{}", vg_name, lv_name)
}

/// Canonical device-mapper path, used in fstab so the entry survives device
/// renumbering.
pub fn lv_mapper_path(vg_name: &str, lv_name: &str) -> String {
    format!("/dev/mapper/{}-{}", vg_name, lv_name)
}
