//! The provisioning sequencer.
//!
//! Executes an accepted layout in a fixed phase order: partition the disk,
//! optionally wrap the third partition in LUKS, bring up LVM, create and
//! format every logical volume, then mount everything under the target
//! root. Mounts go root first, custom volumes next, then boot, then the
//! EFI partition, so each mount point's parent directory already exists.

use crate::disk::encryption;
use crate::disk::formatting::make_filesystem;
use crate::disk::lvm;
use crate::disk::partition::Partition;
use crate::disk::partitioning::apply_partitions;
use crate::disk::planner::LayoutPlan;
use crate::utils::command::CommandRunner;
use crate::utils::error::{Result, VolstrapError};
use crate::utils::prompt::Prompt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Where the new system is assembled.
pub const TARGET_ROOT: &str = "/target";

/// Create a mount point directory.
///
/// Refuses to reuse a directory that already exists: a populated `/target`
/// means a previous run's system is still mounted there, and formatting or
/// mounting over it could destroy it.
pub fn create_mount_dir(path: &Path) -> Result<()> {
    match fs::create_dir(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
            Err(VolstrapError::TargetExists(path.to_path_buf()))
        }
        Err(e) => Err(e.into()),
    }
}

/// Drives the phase sequence for one accepted layout.
pub struct Provisioner<'a> {
    cmd: &'a CommandRunner,
    target_root: PathBuf,
}

impl<'a> Provisioner<'a> {
    pub fn new(cmd: &'a CommandRunner) -> Self {
        Self {
            cmd,
            target_root: PathBuf::from(TARGET_ROOT),
        }
    }

    #[cfg(test)]
    fn with_target_root(cmd: &'a CommandRunner, target_root: PathBuf) -> Self {
        Self { cmd, target_root }
    }

    /// Mount point under the target root for an absolute mount path.
    fn target_path(&self, mount_path: &Path) -> PathBuf {
        let rel = mount_path.strip_prefix("/").unwrap_or(mount_path);
        self.target_root.join(rel)
    }

    fn mount(&self, device: &str, target: &Path) -> Result<()> {
        let target_str = target.to_string_lossy();
        self.cmd
            .run("mount", &[device, &target_str])
            .map(|_| ())
            .map_err(|e| {
                VolstrapError::MountError(format!("mounting {} at {}: {}", device, target_str, e))
            })
    }

    fn make_mount_point(&self, path: &Path) -> Result<()> {
        if self.cmd.is_dry_run() {
            println!("  [dry-run] mkdir {}", path.display());
            return Ok(());
        }
        create_mount_dir(path)
    }

    fn find<'p>(&self, plan: &'p LayoutPlan, mount_path: &str) -> Result<&'p Partition> {
        plan.partitions
            .iter()
            .find(|p| p.mount_path == Path::new(mount_path))
            .ok_or_else(|| {
                VolstrapError::PartitionError(format!("layout has no '{}' entry", mount_path))
            })
    }

    /// Execute the full sequence for an accepted plan.
    ///
    /// `pv_partition` is the disk's third partition. With `encrypt` set it
    /// becomes a LUKS container first and LVM sits on the mapped device.
    pub fn provision(
        &self,
        prompt: &mut dyn Prompt,
        plan: &LayoutPlan,
        vg_name: &str,
        pv_partition: &str,
        encrypt: bool,
    ) -> Result<()> {
        apply_partitions(self.cmd, plan)?;

        let pv_device = if encrypt {
            encryption::format_and_open(self.cmd, prompt, pv_partition)?
        } else {
            pv_partition.to_string()
        };

        lvm::create_pv(self.cmd, &pv_device)?;
        lvm::create_vg(self.cmd, vg_name, &pv_device)?;

        // Plan order already has the remaining-space entry last, which is
        // what lvcreate needs to resolve 100%FREE correctly.
        let volumes: Vec<&Partition> = plan
            .partitions
            .iter()
            .filter(|p| !p.is_fixed_device())
            .collect();

        for part in &volumes {
            lvm::create_lv(self.cmd, vg_name, &part.volume_name, part.size)?;
        }

        let root = self.find(plan, "/")?;
        let root_device = lvm::lv_path(vg_name, &root.volume_name);
        make_filesystem(self.cmd, &root_device, root.filesystem)?;
        self.make_mount_point(&self.target_root)?;
        self.mount(&root_device, &self.target_root)?;
        info!("root volume mounted at {}", self.target_root.display());

        for part in volumes.iter().filter(|p| p.volume_name != "root") {
            let device = lvm::lv_path(vg_name, &part.volume_name);
            make_filesystem(self.cmd, &device, part.filesystem)?;
            let mount_point = self.target_path(&part.mount_path);
            self.make_mount_point(&mount_point)?;
            self.mount(&device, &mount_point)?;
        }

        // Boot before EFI: /boot/efi lives inside the boot filesystem.
        for mount_path in ["/boot", "/boot/efi"] {
            let part = self.find(plan, mount_path)?;
            let device = part.fixed_device.as_deref().ok_or_else(|| {
                VolstrapError::PartitionError(format!("'{}' has no device", mount_path))
            })?;
            make_filesystem(self.cmd, device, part.filesystem)?;
            let mount_point = self.target_path(&part.mount_path);
            self.make_mount_point(&mount_point)?;
            self.mount(device, &mount_point)?;
        }

        info!("provisioning complete, system root at {}", self.target_root.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mount_dir_refuses_existing_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let target = tmp.path().join("target");

        create_mount_dir(&target).unwrap();
        assert!(target.is_dir());

        match create_mount_dir(&target) {
            Err(VolstrapError::TargetExists(path)) => assert_eq!(path, target),
            other => panic!("expected TargetExists, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn target_paths_nest_under_the_target_root() {
        let cmd = CommandRunner::new(true);
        let prov = Provisioner::with_target_root(&cmd, PathBuf::from("/target"));

        assert_eq!(prov.target_path(Path::new("/")), Path::new("/target"));
        assert_eq!(prov.target_path(Path::new("/home")), Path::new("/target/home"));
        assert_eq!(
            prov.target_path(Path::new("/boot/efi")),
            Path::new("/target/boot/efi")
        );
    }
}
