//! Installation configuration

use clap::ValueEnum;

/// Supported target distributions
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Distro {
    Debian,
    Ubuntu,
}

impl Distro {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Debian => "debian",
            Self::Ubuntu => "ubuntu",
        }
    }

    /// Release used when the user does not pass `--release`.
    pub fn default_release(&self) -> &'static str {
        match self {
            Self::Debian => "stable",
            Self::Ubuntu => "hirsute",
        }
    }

    pub fn default_mirror(&self) -> &'static str {
        match self {
            Self::Debian => "deb.debian.org",
            Self::Ubuntu => "us.archive.ubuntu.com",
        }
    }

    /// The volume group carries the distro name, so the root device ends up
    /// as e.g. `/dev/mapper/debian-root`.
    pub fn volume_group(&self) -> &'static str {
        self.name()
    }

    pub fn release_options(&self) -> &'static str {
        match self {
            Self::Ubuntu => {
                "ubuntu:\n\
                 \x20   impish = 22.04 release\n\
                 \x20   hirsute = 21.04 release\n\
                 \x20   focal = 20.04 release"
            }
            Self::Debian => {
                "debian:\n\
                 \x20   sid = unstable branch\n\
                 \x20   testing = testing branch\n\
                 \x20   bullseye = stable branch\n\
                 you may also use the alternate names such as unstable and stable"
            }
        }
    }
}

impl std::fmt::Display for Distro {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Everything the installer needs beyond the planned disk layout.
#[derive(Debug, Clone)]
pub struct InstallConfig {
    pub distro: Distro,
    pub release: String,
    pub mirror_url: String,
    /// Pass `--variant=minbase` to debootstrap.
    pub minimal: bool,
}

impl InstallConfig {
    pub fn new(distro: Distro, release: Option<String>, minimal: bool) -> Self {
        let release = release.unwrap_or_else(|| {
            println!(
                "{} release not selected. defaulting to {}",
                distro.name(),
                distro.default_release()
            );
            distro.default_release().to_string()
        });

        Self {
            distro,
            release,
            mirror_url: distro.default_mirror().to_string(),
            minimal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_per_distro() {
        let debian = InstallConfig::new(Distro::Debian, None, false);
        assert_eq!(debian.release, "stable");
        assert_eq!(debian.mirror_url, "deb.debian.org");
        assert_eq!(debian.distro.volume_group(), "debian");

        let ubuntu = InstallConfig::new(Distro::Ubuntu, Some("focal".into()), true);
        assert_eq!(ubuntu.release, "focal");
        assert!(ubuntu.minimal);
    }
}
