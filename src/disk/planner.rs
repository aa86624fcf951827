//! Interactive partition layout planner.
//!
//! A planning session walks `ChoosingDisk -> DefiningMandatory(efi, boot,
//! root) -> DefiningOptional -> ReviewingLayout` while negotiating a
//! shrinking free-space budget. Invariant violations (duplicate mount path,
//! a second "remaining space" entry) throw the whole session away and start
//! over from disk selection; bad input at a single prompt only retries that
//! prompt. The two granularities are kept distinct on purpose.

use crate::disk::detection::{self, partition_path};
use crate::disk::partition::{Filesystem, PartSize, Partition, FILESYSTEMS};
use crate::utils::error::{Result, VolstrapError};
use crate::utils::prompt::{self, Prompt};
use crate::utils::units;
use crate::utils::signal;
use std::path::{Path, PathBuf};
use tracing::debug;

/// The disk a layout is being planned against.
#[derive(Debug, Clone)]
pub struct ChosenDisk {
    /// Device path, e.g. `/dev/sda`.
    pub path: String,
    /// Kernel name, e.g. `sda`.
    pub name: String,
    /// Total size in bytes (512-byte sysfs sectors), read once per session.
    pub size_bytes: u64,
}

/// Why a planning session was thrown away.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestartReason {
    DuplicateMountPath(PathBuf),
    DuplicateRemaining,
    LayoutRejected,
    Interrupted,
}

impl std::fmt::Display for RestartReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateMountPath(path) => {
                write!(f, "you can't define '{}' more than once", path.display())
            }
            Self::DuplicateRemaining => write!(f, "you can't have 'free' defined twice"),
            Self::LayoutRejected => write!(f, "layout rejected"),
            Self::Interrupted => write!(f, "interrupted"),
        }
    }
}

/// Outcome of an accepted planning session.
#[derive(Debug, Clone)]
pub struct LayoutPlan {
    pub disk: ChosenDisk,
    /// Finalized ordered list; the single `Remaining` entry, if any, sits
    /// at the last index so LVM creates it after every fixed-size volume.
    pub partitions: Vec<Partition>,
    /// Disk size minus every fixed-size entry. When a `Remaining` entry
    /// exists this is exactly the space it will absorb.
    pub remaining: u64,
}

/// How far a failed session needs to rewind.
enum SessionEnd {
    Restart(RestartReason),
    Fatal(VolstrapError),
}

impl From<VolstrapError> for SessionEnd {
    fn from(e: VolstrapError) -> Self {
        match e {
            VolstrapError::Interrupted => SessionEnd::Restart(RestartReason::Interrupted),
            other => SessionEnd::Fatal(other),
        }
    }
}

type SessionResult<T> = std::result::Result<T, SessionEnd>;

/// Run the planner until the user accepts a layout.
///
/// Restarts (duplicate paths, duplicate `free`, rejection at review,
/// interrupt outside a size prompt) loop back to disk selection; only real
/// failures propagate.
pub fn plan_layout(prompt: &mut dyn Prompt) -> Result<LayoutPlan> {
    plan_layout_with(prompt, &mut choose_disk)
}

fn plan_layout_with(
    prompt: &mut dyn Prompt,
    choose: &mut dyn FnMut(&mut dyn Prompt) -> Result<ChosenDisk>,
) -> Result<LayoutPlan> {
    loop {
        let disk = match choose(prompt) {
            Ok(disk) => disk,
            Err(VolstrapError::Interrupted) => {
                announce_restart(&RestartReason::Interrupted);
                continue;
            }
            Err(e) => return Err(e),
        };

        match plan_session(prompt, disk) {
            Ok(plan) => return Ok(plan),
            Err(SessionEnd::Restart(reason)) => {
                announce_restart(&reason);
                continue;
            }
            Err(SessionEnd::Fatal(e)) => return Err(e),
        }
    }
}

fn announce_restart(reason: &RestartReason) {
    signal::clear_interrupted();
    if *reason != RestartReason::LayoutRejected {
        prompt::error(&reason.to_string());
    }
    eprintln!("restarting partitioner..\n");
    // Brief pause so the message is seen before the screen fills again.
    #[cfg(not(test))]
    std::thread::sleep(std::time::Duration::from_secs(2));
}

/// List candidate disks and ask until the user names a real block device.
pub fn choose_disk(prompt: &mut dyn Prompt) -> Result<ChosenDisk> {
    let devices = detection::list_block_devices()?;
    println!("{:<15} {:>10} {}", "DEVICE", "SIZE", "MODEL");
    for dev in &devices {
        println!(
            "{:<15} {:>10} {}",
            dev.path,
            dev.size_human(),
            dev.model.as_deref().unwrap_or("-")
        );
    }

    loop {
        let answer = prompt.ask_text("Which disk would you like to use? /dev/")?;
        let name = answer.trim().trim_start_matches("/dev/").to_string();
        let path = format!("/dev/{}", name);

        if let Err(e) = detection::validate_block_device(&path) {
            prompt::error(&e.to_string());
            continue;
        }

        let size_bytes = detection::disk_size_bytes(&name)?;
        debug!("chose disk {} ({} bytes)", path, size_bytes);
        return Ok(ChosenDisk {
            path,
            name,
            size_bytes,
        });
    }
}

/// One full planning pass against a chosen disk.
fn plan_session(prompt: &mut dyn Prompt, disk: ChosenDisk) -> SessionResult<LayoutPlan> {
    let mut budget = disk.size_bytes;

    // EFI and boot come first: they consume small fixed budgets before root
    // and must land on partition indexes 1 and 2.
    let (efi, left) = define_partition(
        prompt,
        PathBuf::from("/boot/efi"),
        budget,
        Some(partition_path(&disk.path, 1)),
        Some(Filesystem::Fat32),
        false,
    )?;
    budget = left;

    let (boot, left) = define_partition(
        prompt,
        PathBuf::from("/boot"),
        budget,
        Some(partition_path(&disk.path, 2)),
        None,
        false,
    )?;
    budget = left;

    let (root, left) = define_partition(prompt, PathBuf::from("/"), budget, None, None, true)?;
    budget = left;

    let mut partitions = vec![root, boot, efi];
    let mut freshly_printed = false;

    if prompt.ask_yes_no("Do you want to configure any custom partitions?")? {
        loop {
            let raw = prompt.ask_text("enter the path you'd like to configure: /")?;
            let path = PathBuf::from(format!("/{}", raw.trim().trim_matches('/')));

            if partitions.iter().any(|p| p.mount_path == path) {
                return Err(SessionEnd::Restart(RestartReason::DuplicateMountPath(path)));
            }

            let (part, left) = define_partition(prompt, path, budget, None, None, true)?;
            budget = left;
            partitions.push(part);

            if partitions.iter().filter(|p| p.size.is_remaining()).count() > 1 {
                return Err(SessionEnd::Restart(RestartReason::DuplicateRemaining));
            }

            println!("{}", format_layout_table(&partitions, budget));
            freshly_printed = true;

            if !prompt.ask_yes_no("would you like to configure additional partitions?")? {
                break;
            }
        }
    }

    if !freshly_printed {
        println!("{}", format_layout_table(&partitions, budget));
    }

    if !prompt.ask_yes_no("Is this layout okay?")? {
        return Err(SessionEnd::Restart(RestartReason::LayoutRejected));
    }

    Ok(finalize(disk, partitions, budget))
}

/// Move the single `Remaining` entry (if any) to the last index.
fn finalize(disk: ChosenDisk, mut partitions: Vec<Partition>, remaining: u64) -> LayoutPlan {
    if let Some(idx) = partitions.iter().position(|p| p.size.is_remaining()) {
        let free = partitions.remove(idx);
        partitions.push(free);
    }
    LayoutPlan {
        disk,
        partitions,
        remaining,
    }
}

/// Ask for one partition's size and filesystem against the current budget.
///
/// Returns the partition plus the budget left after it. A `free` answer
/// returns [`PartSize::Remaining`] and leaves the budget untouched; the
/// space is only charged once, at finalization.
fn define_partition(
    prompt: &mut dyn Prompt,
    mount_path: PathBuf,
    budget: u64,
    fixed_device: Option<String>,
    forced_fs: Option<Filesystem>,
    allow_remaining: bool,
) -> Result<(Partition, u64)> {
    let (size, left) = ask_part_size(prompt, &mount_path, budget, allow_remaining)?;

    let filesystem = match forced_fs {
        Some(fs) => fs,
        None => ask_filesystem(prompt)?,
    };

    Ok((
        Partition::new(mount_path, size, filesystem, fixed_device),
        left,
    ))
}

/// Size prompt with indefinite retry.
///
/// Rejects unparseable answers and anything above the budget without
/// consuming the caller's position; an interrupt retries the same prompt.
fn ask_part_size(
    prompt: &mut dyn Prompt,
    mount_path: &Path,
    budget: u64,
    allow_remaining: bool,
) -> Result<(PartSize, u64)> {
    loop {
        let question = format!(
            "{} GB of disk space remains\nHow much space would you like to allocate to {} ? [512M, 10G, free]",
            units::byte_to_gig_trunc(budget),
            mount_path.display()
        );

        let answer = match prompt.ask_text(&question) {
            Ok(answer) => answer,
            Err(VolstrapError::Interrupted) => {
                signal::clear_interrupted();
                eprintln!("\nrestarting prompt..");
                continue;
            }
            Err(e) => return Err(e),
        };
        let answer = answer.trim();

        if answer == "free" || answer == "Free" {
            if !allow_remaining {
                prompt::error(&format!(
                    "{} is not LVM-backed and needs a fixed size",
                    mount_path.display()
                ));
                continue;
            }
            return Ok((PartSize::Remaining, budget));
        }

        let size = match units::parse_size_input(answer) {
            Ok(size) => size,
            Err(e) => {
                prompt::error(&e.to_string());
                continue;
            }
        };

        if size > budget {
            prompt::error(&format!("{} is more than you have left.. try again", answer));
            continue;
        }

        return Ok((PartSize::Fixed(size), budget - size));
    }
}

fn ask_filesystem(prompt: &mut dyn Prompt) -> Result<Filesystem> {
    let items: Vec<&str> = FILESYSTEMS.iter().map(|fs| fs.as_str()).collect();
    loop {
        match prompt.ask_choice("filesystem", &items) {
            Ok(idx) => return Ok(FILESYSTEMS[idx]),
            Err(VolstrapError::Interrupted) => {
                signal::clear_interrupted();
                continue;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Render the running layout as the table shown between prompts.
///
/// `Remaining` entries display the current computed remainder rather than a
/// sentinel. One column width for the whole table, longest field plus one.
pub fn format_layout_table(partitions: &[Partition], space_left: u64) -> String {
    let size_display = |part: &Partition| {
        let bytes = part.size.fixed_bytes().unwrap_or(space_left);
        format!("{} GB", units::byte_to_gig_trunc(bytes))
    };

    let mut width = 0usize;
    for header in ["Mount:", "Filesystem:", "Size:"] {
        width = width.max(header.len());
    }
    for part in partitions {
        width = width.max(part.mount_path.display().to_string().len());
        width = width.max(part.filesystem.as_str().len());
        width = width.max(size_display(part).len());
    }
    let width = width + 1;

    let mut out = String::new();
    out.push_str(
        format!(
            "{:<w$} {:<w$} {:<w$}",
            "Mount:",
            "Filesystem:",
            "Size:",
            w = width
        )
        .trim_end(),
    );
    out.push('\n');
    for part in partitions {
        out.push_str(
            format!(
                "{:<w$} {:<w$} {:<w$}",
                part.mount_path.display().to_string(),
                part.filesystem.as_str(),
                size_display(part),
                w = width
            )
            .trim_end(),
        );
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::prompt::ScriptedPrompt;

    const DISK_BYTES: u64 = 21_474_836_480; // 20 GiB
    const EFI_BYTES: u64 = 536_870_912; // 512M
    const BOOT_BYTES: u64 = 1_610_612_736; // 1.5G

    fn test_disk() -> ChosenDisk {
        ChosenDisk {
            path: "/dev/sda".to_string(),
            name: "sda".to_string(),
            size_bytes: DISK_BYTES,
        }
    }

    fn plan(script: &mut ScriptedPrompt) -> (LayoutPlan, usize) {
        let mut picks = 0usize;
        let plan = plan_layout_with(script, &mut |_| {
            picks += 1;
            Ok(test_disk())
        })
        .unwrap();
        (plan, picks)
    }

    /// EFI 512M, boot 1.5G (ext2), root free (ext4), no custom parts.
    fn mandatory_script() -> ScriptedPrompt {
        let mut script = ScriptedPrompt::new();
        script
            .push_text("512M")
            .push_text("1.5G")
            .push_text("free")
            .push_choice(1) // boot: ext2
            .push_choice(0) // root: ext4
            .push_yes_no(false) // no custom partitions
            .push_yes_no(true); // layout okay
        script
    }

    #[test]
    fn mandatory_only_layout() {
        let (plan, picks) = plan(&mut mandatory_script());

        assert_eq!(picks, 1);
        assert_eq!(plan.partitions.len(), 3);
        assert_eq!(plan.remaining, DISK_BYTES - EFI_BYTES - BOOT_BYTES);
        assert_eq!(plan.remaining, 19_327_352_832);

        // Remaining entry (root) reordered to the end.
        let last = plan.partitions.last().unwrap();
        assert_eq!(last.volume_name, "root");
        assert_eq!(last.size, PartSize::Remaining);
        assert_eq!(last.filesystem, Filesystem::Ext4);

        let efi = plan
            .partitions
            .iter()
            .find(|p| p.volume_name == "boot_efi")
            .unwrap();
        assert_eq!(efi.filesystem, Filesystem::Fat32);
        assert_eq!(efi.fixed_device.as_deref(), Some("/dev/sda1"));
        assert_eq!(efi.size, PartSize::Fixed(EFI_BYTES));

        let boot = plan
            .partitions
            .iter()
            .find(|p| p.volume_name == "boot")
            .unwrap();
        assert_eq!(boot.fixed_device.as_deref(), Some("/dev/sda2"));
        assert_eq!(boot.filesystem, Filesystem::Ext2);
    }

    #[test]
    fn custom_partition_shrinks_budget_and_sorts_remaining_last() {
        let mut script = ScriptedPrompt::new();
        script
            .push_text("512M")
            .push_text("1.5G")
            .push_text("free") // root takes the remainder
            .push_choice(1) // boot: ext2
            .push_choice(0) // root: ext4
            .push_yes_no(true) // configure custom partitions
            .push_text("srv/data")
            .push_text("2G")
            .push_choice(4) // srv_data: xfs
            .push_yes_no(false) // no more partitions
            .push_yes_no(true); // layout okay

        let (plan, _) = plan(&mut script);

        assert_eq!(plan.partitions.len(), 4);
        assert_eq!(
            plan.remaining,
            DISK_BYTES - EFI_BYTES - BOOT_BYTES - 2 * 1024 * 1024 * 1024
        );

        let srv = plan
            .partitions
            .iter()
            .find(|p| p.volume_name == "srv_data")
            .unwrap();
        assert_eq!(srv.mount_path, PathBuf::from("/srv/data"));
        assert_eq!(srv.filesystem, Filesystem::Xfs);
        assert!(!srv.is_fixed_device());

        // Root is the Remaining entry; it must have been moved past srv_data.
        assert_eq!(plan.partitions.last().unwrap().volume_name, "root");

        // Budget conservation: fixed sizes plus remainder cover the disk.
        let fixed: u64 = plan
            .partitions
            .iter()
            .filter_map(|p| p.size.fixed_bytes())
            .sum();
        assert_eq!(fixed + plan.remaining, DISK_BYTES);
    }

    #[test]
    fn duplicate_mount_path_restarts_whole_session() {
        let mut script = ScriptedPrompt::new();
        // First session: duplicate "/boot" in the custom loop.
        script
            .push_text("512M")
            .push_text("1.5G")
            .push_text("free")
            .push_choice(1)
            .push_choice(0)
            .push_yes_no(true) // configure custom partitions
            .push_text("boot"); // duplicates the mandatory /boot
        // Second session: clean run.
        script
            .push_text("512M")
            .push_text("1.5G")
            .push_text("free")
            .push_choice(1)
            .push_choice(0)
            .push_yes_no(false)
            .push_yes_no(true);

        let (plan, picks) = plan(&mut script);

        // Disk selection ran again and the first session's state is gone.
        assert_eq!(picks, 2);
        assert_eq!(plan.partitions.len(), 3);
    }

    #[test]
    fn second_remaining_entry_restarts_whole_session() {
        let mut script = ScriptedPrompt::new();
        // First session: root free, then /home free as well.
        script
            .push_text("512M")
            .push_text("1.5G")
            .push_text("free")
            .push_choice(1)
            .push_choice(0)
            .push_yes_no(true)
            .push_text("home")
            .push_text("free")
            .push_choice(0);
        // Second session: clean run.
        script
            .push_text("512M")
            .push_text("1.5G")
            .push_text("free")
            .push_choice(1)
            .push_choice(0)
            .push_yes_no(false)
            .push_yes_no(true);

        let (plan, picks) = plan(&mut script);

        assert_eq!(picks, 2);
        assert_eq!(
            plan.partitions
                .iter()
                .filter(|p| p.size.is_remaining())
                .count(),
            1
        );
    }

    #[test]
    fn oversized_answer_reprompts_without_aborting() {
        let mut script = ScriptedPrompt::new();
        script
            .push_text("512M")
            .push_text("1.5G")
            .push_text("30G") // more than the 20 GiB disk has left
            .push_text("10G") // retry accepted
            .push_choice(1)
            .push_choice(0)
            .push_yes_no(false)
            .push_yes_no(true);

        let (plan, picks) = plan(&mut script);

        assert_eq!(picks, 1, "over-budget input must not restart the session");
        let root = plan
            .partitions
            .iter()
            .find(|p| p.volume_name == "root")
            .unwrap();
        assert_eq!(root.size, PartSize::Fixed(10 * 1024 * 1024 * 1024));
        assert_eq!(plan.remaining, DISK_BYTES - EFI_BYTES - BOOT_BYTES - 10_737_418_240);
    }

    #[test]
    fn invalid_size_string_reprompts() {
        let mut script = ScriptedPrompt::new();
        script
            .push_text("512X") // bad suffix
            .push_text("512M")
            .push_text("1.5G")
            .push_text("free")
            .push_choice(1)
            .push_choice(0)
            .push_yes_no(false)
            .push_yes_no(true);

        let (plan, picks) = plan(&mut script);
        assert_eq!(picks, 1);
        assert_eq!(plan.partitions.len(), 3);
    }

    #[test]
    fn free_is_rejected_for_efi_and_boot() {
        let mut script = ScriptedPrompt::new();
        script
            .push_text("free") // EFI can't take the remainder
            .push_text("512M")
            .push_text("1.5G")
            .push_text("free")
            .push_choice(1)
            .push_choice(0)
            .push_yes_no(false)
            .push_yes_no(true);

        let (plan, _) = plan(&mut script);
        let efi = plan
            .partitions
            .iter()
            .find(|p| p.volume_name == "boot_efi")
            .unwrap();
        assert_eq!(efi.size, PartSize::Fixed(EFI_BYTES));
    }

    #[test]
    fn declined_review_restarts_session() {
        let mut script = ScriptedPrompt::new();
        script
            .push_text("512M")
            .push_text("1.5G")
            .push_text("free")
            .push_choice(1)
            .push_choice(0)
            .push_yes_no(false)
            .push_yes_no(false); // layout NOT okay
        script
            .push_text("512M")
            .push_text("1.5G")
            .push_text("10G")
            .push_choice(1)
            .push_choice(0)
            .push_yes_no(false)
            .push_yes_no(true);

        let (plan, picks) = plan(&mut script);
        assert_eq!(picks, 2);
        let root = plan
            .partitions
            .iter()
            .find(|p| p.volume_name == "root")
            .unwrap();
        assert_eq!(root.size, PartSize::Fixed(10_737_418_240));
    }

    #[test]
    fn layout_table_displays_remainder_for_free_entries() {
        let (plan, _) = plan(&mut mandatory_script());
        let table = format_layout_table(&plan.partitions, plan.remaining);

        assert!(table.starts_with("Mount:"));
        // 19_327_352_832 bytes -> exactly 18.0 GB truncated
        assert!(table.contains("18 GB"), "table was:\n{}", table);
        assert!(table.contains("/boot/efi"));
        assert!(table.contains("fat32"));
    }
}
