//! fstab generation for the provisioned layout.
//!
//! Rows come out in a fixed order regardless of how the layout was entered:
//! root, boot, the EFI partition, every custom volume, and a tmpfs /tmp
//! line at the end. Root and custom volumes are referenced through their
//! device-mapper paths; boot and EFI by filesystem UUID.

use crate::disk::lvm::lv_mapper_path;
use crate::disk::partition::{Filesystem, Partition};
use crate::utils::error::Result;
use std::fs;
use std::path::Path;

const FSTAB_HEADER: &str = "\
# /etc/fstab: static file system information.
#
# Use 'blkid' to print the universally unique identifier for a device;
# this may be used with UUID= as a more robust way to name devices that
# works even if disks are added and removed. See fstab(5).
#
";

/// mount(8) type name, which differs from the mkfs-facing name for a few
/// filesystems.
fn fstab_type(fs: Filesystem) -> &'static str {
    match fs {
        Filesystem::Fat32 => "vfat",
        Filesystem::Hfs => "hfsplus",
        other => other.as_str(),
    }
}

fn align(rows: &[[String; 6]]) -> String {
    let mut widths = [0usize; 6];
    for row in rows {
        for (w, field) in widths.iter_mut().zip(row.iter()) {
            *w = (*w).max(field.len() + 1);
        }
    }

    let mut out = String::new();
    for row in rows {
        let mut line = String::new();
        for (field, width) in row.iter().zip(widths.iter()) {
            line.push_str(&format!("{:<w$}", field, w = width));
        }
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}

/// Render the complete fstab for a provisioned layout.
///
/// `partitions` is the accepted plan's list; entry order within it does not
/// affect the output order.
pub fn render_fstab(
    vg_name: &str,
    partitions: &[Partition],
    boot_uuid: &str,
    efi_uuid: &str,
) -> String {
    let mut rows: Vec<[String; 6]> = vec![[
        "# <file system>".to_string(),
        "<mount point>".to_string(),
        "<type>".to_string(),
        "<options>".to_string(),
        "<dump>".to_string(),
        "<pass>".to_string(),
    ]];

    let find = |path: &str| partitions.iter().find(|p| p.mount_path == Path::new(path));

    if let Some(root) = find("/") {
        rows.push([
            lv_mapper_path(vg_name, &root.volume_name),
            "/".to_string(),
            fstab_type(root.filesystem).to_string(),
            "errors=remount-ro".to_string(),
            "0".to_string(),
            "1".to_string(),
        ]);
    }

    if let Some(boot) = find("/boot") {
        rows.push([
            format!("UUID={}", boot_uuid),
            "/boot".to_string(),
            fstab_type(boot.filesystem).to_string(),
            "defaults".to_string(),
            "0".to_string(),
            "2".to_string(),
        ]);
    }

    if find("/boot/efi").is_some() {
        rows.push([
            format!("UUID={}", efi_uuid),
            "/boot/efi".to_string(),
            "vfat".to_string(),
            "umask=0077".to_string(),
            "0".to_string(),
            "1".to_string(),
        ]);
    }

    for part in partitions
        .iter()
        .filter(|p| !p.is_fixed_device() && p.mount_path != Path::new("/"))
    {
        rows.push([
            lv_mapper_path(vg_name, &part.volume_name),
            part.mount_path.to_string_lossy().into_owned(),
            fstab_type(part.filesystem).to_string(),
            "defaults".to_string(),
            "0".to_string(),
            "2".to_string(),
        ]);
    }

    rows.push([
        "tmpfs".to_string(),
        "/tmp".to_string(),
        "tmpfs".to_string(),
        "mode=1777,nosuid,nodev".to_string(),
        "0".to_string(),
        "0".to_string(),
    ]);

    format!("{}{}", FSTAB_HEADER, align(&rows))
}

/// Write the rendered fstab into the target system.
pub fn write_fstab(target_root: &Path, content: &str) -> Result<()> {
    let path = target_root.join("etc/fstab");
    fs::write(path, content)?;
    Ok(())
}
