//! volstrap - interactive Debian/Ubuntu installer with LVM layouts.

use clap::Parser;
use nix::unistd::Uid;
use std::path::Path;
use std::process;
use tracing_subscriber::EnvFilter;
use volstrap::config::{Distro, InstallConfig};
use volstrap::disk::{detection, formatting, planner};
use volstrap::install::{bootstrap, mirror, netcfg, system};
use volstrap::provision::{fstab, Provisioner, TARGET_ROOT};
use volstrap::utils::command::CommandRunner;
use volstrap::utils::error::{Result, VolstrapError};
use volstrap::utils::prompt::{self, ConsolePrompt, Prompt};
use volstrap::utils::signal;

const LICENSE_NOTICE: &str = "\
volstrap - interactive Debian/Ubuntu installer

This program is free software: you can redistribute it and/or modify
it under the terms of the GNU General Public License as published by
the Free Software Foundation, either version 3 of the License, or
(at your option) any later version.

This program is distributed in the hope that it will be useful,
but WITHOUT ANY WARRANTY; without even the implied warranty of
MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
GNU General Public License for more details.";

#[derive(Parser)]
#[command(
    name = "volstrap",
    version,
    about = "Interactive Debian and Ubuntu installer with LVM layouts"
)]
struct Cli {
    /// Distribution to install
    #[arg(value_enum, required_unless_present = "license")]
    distro: Option<Distro>,

    /// Target release (defaults to stable for debian, hirsute for ubuntu)
    #[arg(short, long)]
    release: Option<String>,

    /// Install a minimal base system (debootstrap --variant=minbase)
    #[arg(short, long)]
    minimal: bool,

    /// List known release names for the chosen distro and exit
    #[arg(long)]
    release_options: bool,

    /// Print license information and exit
    #[arg(long)]
    license: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Print external commands instead of running them
    #[arg(long)]
    dry_run: bool,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "volstrap=debug" } else { "volstrap=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() {
    // Usage errors exit 1, not clap's default 2.
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            process::exit(if e.exit_code() == 0 { 0 } else { 1 });
        }
    };
    init_logging(cli.verbose);

    if cli.license {
        println!("{}", LICENSE_NOTICE);
        return;
    }

    if std::env::consts::ARCH != "x86_64" {
        prompt::error(
            &VolstrapError::UnsupportedArch(std::env::consts::ARCH.to_string()).to_string(),
        );
        process::exit(1);
    }

    let Some(distro) = cli.distro else {
        // clap's required_unless_present already rejected this.
        process::exit(1);
    };

    if cli.release_options {
        println!("{}", distro.release_options());
        return;
    }

    match run(distro, &cli) {
        Ok(()) => {}
        Err(VolstrapError::UserCancelled) => {
            println!("aborted, nothing was changed");
        }
        Err(VolstrapError::Interrupted) => {
            process::exit(130);
        }
        Err(e) => {
            prompt::error(&e.to_string());
            process::exit(1);
        }
    }
}

fn run(distro: Distro, cli: &Cli) -> Result<()> {
    if !cli.dry_run && !Uid::effective().is_root() {
        return Err(VolstrapError::NotRoot);
    }

    signal::install_signal_handlers();

    let mut console = ConsolePrompt::new();
    let prompt: &mut dyn Prompt = &mut console;

    let warning = format!(
        "This will erase the selected disk and install {} on it.",
        distro
    );
    if !prompt::warn_confirm(prompt, &warning)? {
        return Err(VolstrapError::UserCancelled);
    }

    let mut config = InstallConfig::new(distro, cli.release.clone(), cli.minimal);
    let cmd = CommandRunner::new(cli.dry_run);

    // The network comes up first so debootstrap can download; the rest of
    // the interactive phase happens before provisioning starts, leaving the
    // LUKS passphrase as the only question after the disk is touched.
    let network = netcfg::configure_network(prompt, &cmd)?;
    let plan = planner::plan_layout(prompt)?;
    let encrypt = prompt.ask_yes_no("Encrypt the LVM physical volume?")?;
    config.mirror_url = mirror::choose_mirror(prompt, distro)?;
    let hostname = prompt.ask_text("Hostname for the new system")?;

    let vg = distro.volume_group();
    let pv_partition = detection::partition_path(&plan.disk.path, 3);

    Provisioner::new(&cmd).provision(prompt, &plan, vg, &pv_partition, encrypt)?;

    bootstrap::run_debootstrap(&cmd, &config, TARGET_ROOT)?;

    let target = Path::new(TARGET_ROOT);
    let sources = bootstrap::sources_list(distro, &config.release, &config.mirror_url);

    let efi_uuid = formatting::partition_uuid(&cmd, &detection::partition_path(&plan.disk.path, 1))?;
    let boot_uuid = formatting::partition_uuid(&cmd, &detection::partition_path(&plan.disk.path, 2))?;
    let fstab_content = fstab::render_fstab(vg, &plan.partitions, &boot_uuid, &efi_uuid);

    if cmd.is_dry_run() {
        println!("  [dry-run] sources.list:\n{}", sources);
        println!("  [dry-run] fstab:\n{}", fstab_content);
        println!(
            "  [dry-run] interfaces:\n{}",
            netcfg::render_interfaces(&network)
        );
    } else {
        bootstrap::write_sources_list(target, &sources)?;
        fstab::write_fstab(target, &fstab_content)?;
        system::write_hostname(target, &hostname)?;
        system::write_hosts(target, &hostname)?;
        netcfg::write_interfaces(target, &network)?;
        netcfg::copy_resolv_conf(target)?;
    }

    system::configure_locale(&cmd, target, "en_US.UTF-8")?;

    println!(
        "\n{} {} installed to {}. chroot in to finish configuration.",
        distro, config.release, TARGET_ROOT
    );
    Ok(())
}
