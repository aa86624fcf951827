//! Base configuration of the bootstrapped system: locale, hostname, hosts.

use crate::utils::command::CommandRunner;
use crate::utils::error::{Result, VolstrapError};
use std::fs;
use std::path::Path;
use tracing::info;

/// Uncomment the matching locale line in locale.gen content.
pub fn enable_locale(content: &str, locale: &str) -> String {
    content
        .lines()
        .map(|line| {
            let uncommented = line.trim_start_matches('#').trim_start();
            if uncommented.starts_with(locale) {
                uncommented.to_string()
            } else {
                line.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
        + "\n"
}

/// Enable a locale in the target and generate it in a chroot.
pub fn configure_locale(cmd: &CommandRunner, target_root: &Path, locale: &str) -> Result<()> {
    info!("enabling locale {}", locale);

    if !cmd.is_dry_run() {
        let locale_gen = target_root.join("etc/locale.gen");
        let content = fs::read_to_string(&locale_gen).map_err(|e| {
            VolstrapError::BootstrapError(format!("reading {}: {}", locale_gen.display(), e))
        })?;
        fs::write(&locale_gen, enable_locale(&content, locale))?;
    }

    let target = target_root.to_string_lossy();
    cmd.run("chroot", &[&target, "locale-gen"]).map(|_| ())
}

pub fn write_hostname(target_root: &Path, hostname: &str) -> Result<()> {
    fs::write(target_root.join("etc/hostname"), format!("{}\n", hostname))?;
    Ok(())
}

/// Render /etc/hosts with the machine's name on the loopback alias line.
pub fn hosts_file(hostname: &str) -> String {
    format!(
        "127.0.0.1\tlocalhost\n\
         127.0.1.1\t{hostname}\n\
         \n\
         # The following lines are desirable for IPv6 capable hosts\n\
         ::1     localhost ip6-localhost ip6-loopback\n\
         ff02::1 ip6-allnodes\n\
         ff02::2 ip6-allrouters\n"
    )
}

pub fn write_hosts(target_root: &Path, hostname: &str) -> Result<()> {
    fs::write(target_root.join("etc/hosts"), hosts_file(hostname))?;
    Ok(())
}
