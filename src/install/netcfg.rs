//! Network configuration for the installer environment and the target.
//!
//! Only wired ethernet is handled. The chosen configuration is applied to
//! the live installer first (debootstrap needs a working network) and later
//! rendered into the target's /etc/network/interfaces. A configuration that
//! fails the connectivity check is rolled back and asked for again.

use crate::utils::command::CommandRunner;
use crate::utils::error::{Result, VolstrapError};
use crate::utils::prompt::{self, Prompt};
use crate::utils::signal;
use std::fs;
use std::net::Ipv4Addr;
use std::path::Path;
use tracing::{info, warn};

pub const RESOLV_CONF: &str = "/etc/resolv.conf";
pub const DEFAULT_NAMESERVER: Ipv4Addr = Ipv4Addr::new(8, 8, 8, 8);

const INTERFACES_HEADER: &str = "\
# This file describes the network interfaces available on your system
# and how to activate them. For more information, see interfaces(5).

source /etc/network/interfaces.d/*

auto lo
iface lo inet loopback
";

/// A validated static IPv4 configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticConfig {
    pub address: Ipv4Addr,
    pub prefix: u8,
    pub gateway: Ipv4Addr,
    pub nameserver: Ipv4Addr,
    pub domain: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddressMode {
    Dhcp,
    Static(StaticConfig),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkConfig {
    pub interface: String,
    pub mode: AddressMode,
}

/// Wired interfaces under /sys/class/net, by kernel naming convention.
pub fn ethernet_interfaces() -> Result<Vec<String>> {
    let mut interfaces = Vec::new();
    for entry in fs::read_dir("/sys/class/net")? {
        let name = entry?.file_name().to_string_lossy().to_string();
        if name.starts_with('e') {
            interfaces.push(name);
        }
    }
    interfaces.sort();
    Ok(interfaces)
}

/// Parse a subnet mask in either notation into a prefix length.
///
/// Accepts `/8` through `/30` and the equivalent dotted masks; a dotted
/// mask must have contiguous ones.
pub fn subnet_prefix(input: &str) -> Option<u8> {
    let input = input.trim();

    let prefix = if let Some(num) = input.strip_prefix('/') {
        num.parse::<u8>().ok()?
    } else {
        let mask: Ipv4Addr = input.parse().ok()?;
        let bits = u32::from(mask);
        if bits.count_ones() + bits.trailing_zeros() != 32 {
            return None;
        }
        bits.count_ones() as u8
    };

    (8..=30).contains(&prefix).then_some(prefix)
}

/// True when both addresses fall in the same prefix-length network.
pub fn in_same_network(a: Ipv4Addr, b: Ipv4Addr, prefix: u8) -> bool {
    let mask = u32::MAX << (32 - u32::from(prefix));
    (u32::from(a) & mask) == (u32::from(b) & mask)
}

/// DNS-label check: dot-separated labels of letters, digits, and hyphens,
/// each at most 63 characters.
pub fn valid_domain(domain: &str) -> bool {
    !domain.is_empty()
        && domain.split('.').all(|label| {
            !label.is_empty()
                && label.len() <= 63
                && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        })
}

/// Render /etc/network/interfaces for the configured interface.
pub fn render_interfaces(config: &NetworkConfig) -> String {
    let mut out = String::from(INTERFACES_HEADER);
    out.push_str(&format!("\nauto {}\n", config.interface));

    match &config.mode {
        AddressMode::Dhcp => {
            out.push_str(&format!("iface {} inet dhcp\n", config.interface));
        }
        AddressMode::Static(s) => {
            out.push_str(&format!("iface {} inet static\n", config.interface));
            out.push_str(&format!("    address {}/{}\n", s.address, s.prefix));
            out.push_str(&format!("    gateway {}\n", s.gateway));
            out.push_str(&format!("    dns-nameservers {}\n", s.nameserver));
            if let Some(search) = &s.search {
                out.push_str(&format!("    dns-search {}\n", search));
            }
        }
    }
    out
}

/// Render resolv.conf for a static configuration.
pub fn render_resolv_conf(config: &StaticConfig) -> String {
    let mut out = format!("nameserver {}\n", config.nameserver);
    if let Some(domain) = &config.domain {
        out.push_str(&format!("domain {}\n", domain));
    }
    if let Some(search) = &config.search {
        out.push_str(&format!("search {}\n", search));
    }
    out
}

pub fn write_interfaces(target_root: &Path, config: &NetworkConfig) -> Result<()> {
    let path = target_root.join("etc/network/interfaces");
    fs::write(path, render_interfaces(config))?;
    Ok(())
}

/// Carry the installer's resolv.conf into the target so name resolution
/// works inside the chroot.
pub fn copy_resolv_conf(target_root: &Path) -> Result<()> {
    fs::copy(RESOLV_CONF, target_root.join("etc/resolv.conf"))?;
    Ok(())
}

/// Interactive network setup, looping until a configuration passes the
/// connectivity check.
pub fn configure_network(prompt: &mut dyn Prompt, cmd: &CommandRunner) -> Result<NetworkConfig> {
    println!("\nonly wired ethernet is supported at the moment");
    println!("this configuration is used by the installer and the final system");
    if !prompt.ask_yes_no("Is this okay?")? {
        return Err(VolstrapError::UserCancelled);
    }

    let interfaces = ethernet_interfaces()?;
    let interface = match interfaces.len() {
        0 => {
            return Err(VolstrapError::NetworkError(
                "no ethernet interfaces found; a wired connection is required".to_string(),
            ))
        }
        1 => {
            println!("using the only ethernet interface, {}", interfaces[0]);
            interfaces[0].clone()
        }
        _ => {
            let items: Vec<&str> = interfaces.iter().map(String::as_str).collect();
            let idx = prompt.ask_choice("Which interface should be configured?", &items)?;
            interfaces[idx].clone()
        }
    };

    loop {
        let config = match build_config(prompt, &interface) {
            Ok(config) => config,
            Err(VolstrapError::Interrupted) => {
                signal::clear_interrupted();
                eprintln!("\nyou must have a configured network to continue");
                continue;
            }
            Err(e) => return Err(e),
        };

        apply_network(cmd, &config)?;

        if check_connectivity(cmd) {
            info!("network configured on {}", config.interface);
            return Ok(config);
        }

        prompt::error("could not reach the mirror with that configuration.. try again");
        revert_network(cmd, &config);
    }
}

fn build_config(prompt: &mut dyn Prompt, interface: &str) -> Result<NetworkConfig> {
    let mode = if prompt.ask_yes_no("Configure the network with DHCP?")? {
        AddressMode::Dhcp
    } else {
        AddressMode::Static(ask_static(prompt)?)
    };

    Ok(NetworkConfig {
        interface: interface.to_string(),
        mode,
    })
}

/// Prompt for a full static configuration, re-asking each field until it
/// validates and offering a review before accepting the set.
fn ask_static(prompt: &mut dyn Prompt) -> Result<StaticConfig> {
    loop {
        let address = ask_ipv4(prompt, "IP address")?;

        let prefix = loop {
            let answer = prompt.ask_text("Subnet mask (dotted or /slash notation)")?;
            match subnet_prefix(&answer) {
                Some(prefix) => break prefix,
                None => prompt::error("subnet mask not valid.. try again"),
            }
        };

        let gateway = loop {
            let gateway = ask_ipv4(prompt, "Gateway address")?;
            if gateway == address {
                prompt::error("gateway can't be the same as the ip address.. try again");
            } else if !in_same_network(address, gateway, prefix) {
                prompt::error("gateway not in network.. try again");
            } else {
                break gateway;
            }
        };

        let domain = ask_optional_domain(prompt, "Would you like to enter a domain?", "Domain name")?;
        let search =
            ask_optional_domain(prompt, "Would you like to define a search domain?", "Search domain")?;

        let nameserver = if prompt.ask_yes_no("Define a DNS server? (default is 8.8.8.8)")? {
            ask_ipv4(prompt, "DNS server")?
        } else {
            DEFAULT_NAMESERVER
        };

        println!("\nstatic configuration:\n");
        println!("ip address: {}/{}", address, prefix);
        println!("gateway: {}", gateway);
        println!("nameserver: {}", nameserver);
        println!("domain: {}", domain.as_deref().unwrap_or("-"));
        println!("search: {}", search.as_deref().unwrap_or("-"));

        if prompt.ask_yes_no("Are these settings correct?")? {
            return Ok(StaticConfig {
                address,
                prefix,
                gateway,
                nameserver,
                domain,
                search,
            });
        }
        eprintln!("restarting static configuration..");
    }
}

fn ask_ipv4(prompt: &mut dyn Prompt, what: &str) -> Result<Ipv4Addr> {
    loop {
        let answer = prompt.ask_text(what)?;
        match answer.trim().parse() {
            Ok(addr) => return Ok(addr),
            Err(_) => prompt::error(&format!("{} not valid.. try again", what)),
        }
    }
}

fn ask_optional_domain(
    prompt: &mut dyn Prompt,
    question: &str,
    what: &str,
) -> Result<Option<String>> {
    if !prompt.ask_yes_no(question)? {
        return Ok(None);
    }
    loop {
        let answer = prompt.ask_text(what)?;
        let answer = answer.trim();
        if valid_domain(answer) {
            return Ok(Some(answer.to_string()));
        }
        prompt::error("domain isn't valid.. try again (example: debian.org)");
    }
}

/// Bring the configuration up on the live installer.
fn apply_network(cmd: &CommandRunner, config: &NetworkConfig) -> Result<()> {
    match &config.mode {
        AddressMode::Dhcp => {
            cmd.run("dhclient", &["-1", &config.interface]).map(|_| ()).map_err(|e| {
                VolstrapError::NetworkError(format!("dhcp on {} failed: {}", config.interface, e))
            })
        }
        AddressMode::Static(s) => {
            let cidr = format!("{}/{}", s.address, s.prefix);
            let gateway = s.gateway.to_string();
            cmd.run("ip", &["addr", "add", &cidr, "dev", &config.interface])?;
            cmd.run("ip", &["link", "set", &config.interface, "up"])?;
            cmd.run("ip", &["route", "add", "default", "via", &gateway, "dev", &config.interface])?;
            if !cmd.is_dry_run() {
                fs::write(RESOLV_CONF, render_resolv_conf(s))?;
            }
            Ok(())
        }
    }
}

/// Best-effort teardown of a configuration that failed the check.
fn revert_network(cmd: &CommandRunner, config: &NetworkConfig) {
    if let AddressMode::Static(s) = &config.mode {
        let cidr = format!("{}/{}", s.address, s.prefix);
        if cmd.run("ip", &["route", "del", "default", "dev", &config.interface]).is_err() {
            warn!("failed to remove default route on {}", config.interface);
        }
        if cmd.run("ip", &["addr", "del", &cidr, "dev", &config.interface]).is_err() {
            warn!("failed to remove {} from {}", cidr, config.interface);
        }
    }
    if cmd.run("ip", &["link", "set", &config.interface, "down"]).is_err() {
        warn!("failed to shut down {}", config.interface);
    }
}

fn check_connectivity(cmd: &CommandRunner) -> bool {
    cmd.run("ping", &["-c", "1", "-W", "5", "deb.debian.org"]).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::prompt::ScriptedPrompt;

    #[test]
    fn subnet_prefix_accepts_both_notations() {
        assert_eq!(subnet_prefix("/24"), Some(24));
        assert_eq!(subnet_prefix("255.255.255.0"), Some(24));
        assert_eq!(subnet_prefix("255.255.0.0"), Some(16));
        assert_eq!(subnet_prefix("/8"), Some(8));
        assert_eq!(subnet_prefix("/30"), Some(30));
    }

    #[test]
    fn subnet_prefix_rejects_invalid_masks() {
        // non-contiguous ones
        assert_eq!(subnet_prefix("255.0.255.0"), None);
        // outside the accepted range
        assert_eq!(subnet_prefix("/7"), None);
        assert_eq!(subnet_prefix("/31"), None);
        assert_eq!(subnet_prefix("not a mask"), None);
    }

    #[test]
    fn gateway_network_membership() {
        let ip: Ipv4Addr = "192.168.1.10".parse().unwrap();
        assert!(in_same_network(ip, "192.168.1.1".parse().unwrap(), 24));
        assert!(!in_same_network(ip, "192.168.2.1".parse().unwrap(), 24));
        assert!(in_same_network(ip, "192.168.2.1".parse().unwrap(), 16));
    }

    #[test]
    fn domain_validation() {
        assert!(valid_domain("debian.org"));
        assert!(valid_domain("a-b.example"));
        assert!(!valid_domain(""));
        assert!(!valid_domain("no..good"));
        assert!(!valid_domain("under_score.org"));
    }

    #[test]
    fn dhcp_interfaces_file() {
        let config = NetworkConfig {
            interface: "eth0".to_string(),
            mode: AddressMode::Dhcp,
        };
        let rendered = render_interfaces(&config);

        assert!(rendered.contains("source /etc/network/interfaces.d/*"));
        assert!(rendered.contains("auto lo\niface lo inet loopback"));
        assert!(rendered.contains("auto eth0\niface eth0 inet dhcp"));
    }

    #[test]
    fn static_interfaces_file_carries_the_full_configuration() {
        let config = NetworkConfig {
            interface: "enp3s0".to_string(),
            mode: AddressMode::Static(StaticConfig {
                address: "192.168.1.10".parse().unwrap(),
                prefix: 24,
                gateway: "192.168.1.1".parse().unwrap(),
                nameserver: DEFAULT_NAMESERVER,
                domain: None,
                search: Some("example.org".to_string()),
            }),
        };
        let rendered = render_interfaces(&config);

        assert!(rendered.contains("iface enp3s0 inet static"));
        assert!(rendered.contains("    address 192.168.1.10/24"));
        assert!(rendered.contains("    gateway 192.168.1.1"));
        assert!(rendered.contains("    dns-nameservers 8.8.8.8"));
        assert!(rendered.contains("    dns-search example.org"));
    }

    #[test]
    fn resolv_conf_includes_optional_lines_only_when_set() {
        let mut config = StaticConfig {
            address: "10.0.0.2".parse().unwrap(),
            prefix: 8,
            gateway: "10.0.0.1".parse().unwrap(),
            nameserver: "1.1.1.1".parse().unwrap(),
            domain: None,
            search: None,
        };
        assert_eq!(render_resolv_conf(&config), "nameserver 1.1.1.1\n");

        config.domain = Some("example.org".to_string());
        config.search = Some("example.org".to_string());
        assert_eq!(
            render_resolv_conf(&config),
            "nameserver 1.1.1.1\ndomain example.org\nsearch example.org\n"
        );
    }

    #[test]
    fn static_prompt_flow_retries_bad_fields_and_reviews() {
        let mut script = ScriptedPrompt::new();
        script
            .push_text("999.1.1.1") // not an address, re-asked
            .push_text("192.168.1.10")
            .push_text("255.255.255.0")
            .push_text("192.168.1.10") // gateway == address, re-asked
            .push_text("192.168.2.1") // not in the /24, re-asked
            .push_text("192.168.1.1")
            .push_yes_no(false) // no domain
            .push_yes_no(false) // no search domain
            .push_yes_no(false) // keep default dns
            .push_yes_no(true); // settings correct

        let config = ask_static(&mut script).unwrap();

        assert_eq!(config.address, "192.168.1.10".parse::<Ipv4Addr>().unwrap());
        assert_eq!(config.prefix, 24);
        assert_eq!(config.gateway, "192.168.1.1".parse::<Ipv4Addr>().unwrap());
        assert_eq!(config.nameserver, DEFAULT_NAMESERVER);
        assert_eq!(config.domain, None);
        assert_eq!(config.search, None);
    }

    #[test]
    fn declined_review_restarts_the_static_questions() {
        let mut script = ScriptedPrompt::new();
        // First pass, declined at review.
        script
            .push_text("192.168.1.10")
            .push_text("/24")
            .push_text("192.168.1.1")
            .push_yes_no(false)
            .push_yes_no(false)
            .push_yes_no(false)
            .push_yes_no(false); // settings NOT correct
        // Second pass, accepted.
        script
            .push_text("10.0.0.2")
            .push_text("/8")
            .push_text("10.0.0.1")
            .push_yes_no(false)
            .push_yes_no(false)
            .push_yes_no(false)
            .push_yes_no(true);

        let config = ask_static(&mut script).unwrap();
        assert_eq!(config.address, "10.0.0.2".parse::<Ipv4Addr>().unwrap());
        assert_eq!(config.prefix, 8);
    }

    #[test]
    fn written_interfaces_file_lands_in_target_etc() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("etc/network")).unwrap();

        let config = NetworkConfig {
            interface: "eth0".to_string(),
            mode: AddressMode::Dhcp,
        };
        write_interfaces(tmp.path(), &config).unwrap();

        let read = fs::read_to_string(tmp.path().join("etc/network/interfaces")).unwrap();
        assert!(read.contains("iface eth0 inet dhcp"));
    }
}
