//! debootstrap invocation and apt sources generation.

use crate::config::{Distro, InstallConfig};
use crate::utils::command::CommandRunner;
use crate::utils::error::{Result, VolstrapError};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Where debootstrap's output is kept for inspection.
pub const BOOTSTRAP_LOG: &str = "/tmp/volstrap-debootstrap.log";

/// Render `/etc/apt/sources.list` for the new system.
///
/// Debian's sid has no security or updates suites, so an unstable install
/// gets only the main archive lines.
pub fn sources_list(distro: Distro, release: &str, mirror_url: &str) -> String {
    match distro {
        Distro::Debian => {
            let mut out = format!(
                "deb {mirror} {release} main contrib non-free\n\
                 deb-src {mirror} {release} main contrib non-free\n",
                mirror = mirror_url,
                release = release,
            );

            if release != "sid" && release != "unstable" {
                out.push_str(&format!(
                    "\ndeb http://security.debian.org/debian-security {release}-security main contrib non-free\n\
                     deb-src http://security.debian.org/debian-security {release}-security main contrib non-free\n\
                     \ndeb {mirror} {release}-updates main contrib non-free\n\
                     deb-src {mirror} {release}-updates main contrib non-free\n",
                    mirror = mirror_url,
                    release = release,
                ));
            }
            out
        }
        Distro::Ubuntu => {
            let components = "main restricted universe multiverse";
            format!(
                "deb {mirror} {release} {components}\n\
                 deb-src {mirror} {release} {components}\n\
                 \ndeb {mirror} {release}-updates {components}\n\
                 deb-src {mirror} {release}-updates {components}\n\
                 \ndeb {mirror} {release}-backports {components}\n\
                 deb-src {mirror} {release}-backports {components}\n\
                 \ndeb {mirror} {release}-security {components}\n\
                 deb-src {mirror} {release}-security {components}\n",
                mirror = mirror_url,
                release = release,
                components = components,
            )
        }
    }
}

/// Run debootstrap against the mounted target.
///
/// debootstrap is quiet and slow, so a spinner runs while it works; its
/// full output lands in [`BOOTSTRAP_LOG`].
pub fn run_debootstrap(cmd: &CommandRunner, config: &InstallConfig, target_root: &str) -> Result<()> {
    let mut args: Vec<&str> = Vec::new();
    if config.minimal {
        args.push("--variant=minbase");
    }
    args.push(&config.release);
    args.push(target_root);
    args.push(&config.mirror_url);

    info!(
        "bootstrapping {} {} into {}",
        config.distro, config.release, target_root
    );

    if cmd.is_dry_run() {
        return cmd.run("debootstrap", &args).map(|_| ());
    }

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(format!("Installing {} base system..", config.distro));
    spinner.enable_steady_tick(Duration::from_millis(120));

    let result = cmd.run("debootstrap", &args);

    match result {
        Ok(Some(output)) => {
            spinner.finish_with_message("Base system installed");
            let _ = fs::write(BOOTSTRAP_LOG, &output.stdout);
            info!("debootstrap output written to {}", BOOTSTRAP_LOG);
            Ok(())
        }
        Ok(None) => {
            spinner.finish_and_clear();
            Ok(())
        }
        Err(e) => {
            spinner.finish_with_message("Base system installation failed");
            if let VolstrapError::CommandFailed { ref stderr, .. } = e {
                let _ = fs::write(BOOTSTRAP_LOG, stderr);
            }
            Err(VolstrapError::BootstrapError(format!(
                "debootstrap failed, see {}: {}",
                BOOTSTRAP_LOG, e
            )))
        }
    }
}

/// Install the rendered sources.list into the target.
pub fn write_sources_list(target_root: &Path, content: &str) -> Result<()> {
    let path = target_root.join("etc/apt/sources.list");
    fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stable_debian_gets_security_and_updates_suites() {
        let list = sources_list(Distro::Debian, "bullseye", "http://deb.debian.org/debian");
        assert!(list.contains("deb http://deb.debian.org/debian bullseye main contrib non-free"));
        assert!(list.contains("bullseye-security"));
        assert!(list.contains("bullseye-updates"));
        assert!(list.contains("deb-src"));
    }

    #[test]
    fn sid_gets_only_the_main_archive() {
        for release in ["sid", "unstable"] {
            let list = sources_list(Distro::Debian, release, "http://deb.debian.org/debian");
            assert!(!list.contains("-security"));
            assert!(!list.contains("-updates"));
            assert_eq!(list.lines().filter(|l| l.starts_with("deb")).count(), 2);
        }
    }

    #[test]
    fn ubuntu_enables_all_four_components() {
        let list = sources_list(
            Distro::Ubuntu,
            "focal",
            "http://us.archive.ubuntu.com/ubuntu",
        );
        assert!(list.contains("focal main restricted universe multiverse"));
        assert!(list.contains("focal-updates"));
        assert!(list.contains("focal-backports"));
        assert!(list.contains("focal-security"));
    }
}
