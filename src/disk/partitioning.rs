//! GPT partition table creation via sfdisk.
//!
//! Every layout maps to the same three physical partitions: the EFI system
//! partition, the boot partition, and one LVM partition spanning the rest
//! of the disk. The sfdisk input is line-oriented `start,size,type` with
//! empty fields meaning "default/remaining".

use crate::disk::partition::Partition;
use crate::disk::planner::LayoutPlan;
use crate::utils::command::CommandRunner;
use crate::utils::error::{Result, VolstrapError};
use crate::utils::units::byte_to_sector;
use tracing::info;

/// GPT partition type GUIDs
pub mod partition_types {
    pub const EFI_SYSTEM: &str = "C12A7328-F81F-11D2-BA4B-00A0C93EC93B";
    pub const LINUX_BOOT: &str = "BC13C2FF-59E6-4262-A352-B275FD6F7172";
    pub const LINUX_LVM: &str = "E6D6D379-F507-44C2-A23C-238F2A3DF928";
}

fn fixed_sectors(plan: &LayoutPlan, volume_name: &str) -> Result<u64> {
    let part: &Partition = plan
        .partitions
        .iter()
        .find(|p| p.volume_name == volume_name)
        .ok_or_else(|| {
            VolstrapError::PartitionError(format!("layout has no '{}' entry", volume_name))
        })?;

    let bytes = part.size.fixed_bytes().ok_or_else(|| {
        VolstrapError::PartitionError(format!("'{}' must have a fixed size", volume_name))
    })?;

    Ok(byte_to_sector(bytes))
}

/// Render the sfdisk stdin script for a finalized plan.
///
/// EFI and boot sizes come from the planned entries converted to 512-byte
/// sectors; the LVM partition's empty size field takes the rest of the disk.
pub fn sfdisk_input(plan: &LayoutPlan) -> Result<String> {
    let esp_sectors = fixed_sectors(plan, "boot_efi")?;
    let boot_sectors = fixed_sectors(plan, "boot")?;

    Ok(format!(
        ",{},{}\n,{},{}\n,,{}\n",
        esp_sectors,
        partition_types::EFI_SYSTEM,
        boot_sectors,
        partition_types::LINUX_BOOT,
        partition_types::LINUX_LVM,
    ))
}

/// Write the GPT label and the three fixed partitions in one sfdisk call.
pub fn apply_partitions(cmd: &CommandRunner, plan: &LayoutPlan) -> Result<()> {
    let script = sfdisk_input(plan)?;

    info!("writing GPT partition table to {}", plan.disk.path);
    if cmd.is_dry_run() {
        println!("  [dry-run] sfdisk script for {}:", plan.disk.path);
        for line in script.lines() {
            println!("    {}", line);
        }
        return Ok(());
    }

    cmd.run_with_input(
        "sfdisk",
        &["--quiet", "--label", "gpt", &plan.disk.path],
        &script,
    )?;

    // Let the kernel pick up the new partition nodes before we touch them.
    let _ = cmd.run("partprobe", &[&plan.disk.path]);
    let _ = cmd.run("udevadm", &["settle"]);

    info!("partitioning of {} complete", plan.disk.path);
    Ok(())
}
