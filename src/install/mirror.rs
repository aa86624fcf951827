//! Debian mirror selection from a Mirrors.masterlist file.
//!
//! The masterlist is a sequence of blank-line separated stanzas of
//! `Key: value` lines. Only stanzas carrying an HTTP archive path are
//! usable as apt mirrors.

use crate::config::Distro;
use crate::utils::error::{Result, VolstrapError};
use crate::utils::prompt::Prompt;
use std::fs;
use std::path::Path;
use tracing::warn;

/// Where the bundled masterlist is installed.
pub const MASTERLIST_PATH: &str = "/usr/share/volstrap/Mirrors.masterlist";

/// One mirror stanza from the masterlist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mirror {
    /// Hostname, e.g. `ftp.us.debian.org`.
    pub site: String,
    /// Country name with the leading two-letter code stripped.
    pub country: String,
    /// Archive path on the host, e.g. `/debian/`.
    pub archive_http: String,
    /// Architectures the mirror carries; empty means unspecified.
    pub architectures: Vec<String>,
}

impl Mirror {
    pub fn url(&self) -> String {
        format!("http://{}{}", self.site, self.archive_http)
    }

    pub fn carries(&self, arch: &str) -> bool {
        self.architectures.is_empty() || self.architectures.iter().any(|a| a == arch)
    }
}

/// Parse masterlist content into usable mirrors.
///
/// Stanzas without both a `Site:` and an `Archive-http:` field are skipped.
pub fn parse_masterlist(content: &str) -> Vec<Mirror> {
    let mut mirrors = Vec::new();

    for stanza in content.split("\n\n") {
        let mut site = None;
        let mut country = None;
        let mut archive_http = None;
        let mut architectures = Vec::new();

        for line in stanza.lines() {
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let value = value.trim();
            match key {
                "Site" => site = Some(value.to_string()),
                // "US United States" -> "United States"
                "Country" => {
                    country = Some(
                        value
                            .split_once(' ')
                            .map(|(_, name)| name.to_string())
                            .unwrap_or_else(|| value.to_string()),
                    )
                }
                "Archive-http" => archive_http = Some(value.to_string()),
                "Archive-architecture" => {
                    architectures = value.split_whitespace().map(str::to_string).collect()
                }
                _ => {}
            }
        }

        if let (Some(site), Some(archive_http)) = (site, archive_http) {
            mirrors.push(Mirror {
                site,
                country: country.unwrap_or_else(|| "unknown".to_string()),
                archive_http,
                architectures,
            });
        }
    }

    mirrors
}

/// Sorted, deduplicated country names present in the list.
pub fn country_list(mirrors: &[Mirror]) -> Vec<String> {
    let mut countries: Vec<String> = mirrors.iter().map(|m| m.country.clone()).collect();
    countries.sort();
    countries.dedup();
    countries
}

/// Mirror URLs available in one country.
pub fn url_list(mirrors: &[Mirror], country: &str) -> Vec<String> {
    mirrors
        .iter()
        .filter(|m| m.country == country)
        .map(Mirror::url)
        .collect()
}

fn default_url(distro: Distro) -> String {
    format!("http://{}/{}", distro.default_mirror(), distro.name())
}

/// Pick the apt mirror URL for the installation.
///
/// The default per-distro mirror is offered first; declining it walks the
/// masterlist by country and site. Ubuntu has no masterlist, so its default
/// is always used. A missing or empty masterlist falls back to the default
/// with a warning rather than failing the install.
pub fn choose_mirror(prompt: &mut dyn Prompt, distro: Distro) -> Result<String> {
    let default = default_url(distro);

    if distro == Distro::Ubuntu {
        return Ok(default);
    }

    let question = format!("Use the default mirror ({})?", default);
    if prompt.ask_yes_no(&question)? {
        return Ok(default);
    }

    let mirrors = match load_masterlist(Path::new(MASTERLIST_PATH)) {
        Ok(mirrors) if !mirrors.is_empty() => mirrors,
        Ok(_) | Err(_) => {
            warn!("no usable mirror list at {}, using default", MASTERLIST_PATH);
            return Ok(default);
        }
    };

    let countries = country_list(&mirrors);
    let country_refs: Vec<&str> = countries.iter().map(String::as_str).collect();
    let country_idx = prompt.ask_choice("Mirror country", &country_refs)?;

    let urls = url_list(&mirrors, &countries[country_idx]);
    let url_refs: Vec<&str> = urls.iter().map(String::as_str).collect();
    let url_idx = prompt.ask_choice("Mirror", &url_refs)?;

    Ok(urls[url_idx].clone())
}

fn load_masterlist(path: &Path) -> Result<Vec<Mirror>> {
    let content = fs::read_to_string(path)
        .map_err(|e| VolstrapError::MirrorError(format!("reading {}: {}", path.display(), e)))?;
    Ok(parse_masterlist(&content)
        .into_iter()
        .filter(|m| m.carries("amd64"))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
Site: ftp.us.debian.org
Country: US United States
Archive-architecture: amd64 arm64 i386
Archive-http: /debian/

Site: ftp.de.debian.org
Country: DE Germany
Archive-architecture: amd64 i386
Archive-http: /debian/

Site: mirror.example.org
Country: DE Germany
Archive-http: /pub/debian/

Site: no-archive.example.net
Country: FR France
";

    #[test]
    fn stanzas_without_archive_path_are_skipped() {
        let mirrors = parse_masterlist(SAMPLE);
        assert_eq!(mirrors.len(), 3);
        assert!(mirrors.iter().all(|m| !m.archive_http.is_empty()));
    }

    #[test]
    fn country_code_is_stripped_and_list_deduplicated() {
        let mirrors = parse_masterlist(SAMPLE);
        assert_eq!(country_list(&mirrors), vec!["Germany", "United States"]);
    }

    #[test]
    fn urls_join_site_and_archive_path() {
        let mirrors = parse_masterlist(SAMPLE);
        assert_eq!(
            url_list(&mirrors, "Germany"),
            vec![
                "http://ftp.de.debian.org/debian/",
                "http://mirror.example.org/pub/debian/"
            ]
        );
    }

    #[test]
    fn architecture_filter_keeps_unspecified_mirrors() {
        let mirrors = parse_masterlist(SAMPLE);
        let amd64: Vec<&Mirror> = mirrors.iter().filter(|m| m.carries("amd64")).collect();
        // mirror.example.org lists no architectures and is kept.
        assert_eq!(amd64.len(), 3);
    }

    #[test]
    fn accepting_the_default_skips_the_masterlist() {
        use crate::utils::prompt::ScriptedPrompt;
        let mut prompt = ScriptedPrompt::new();
        prompt.push_yes_no(true);

        let url = choose_mirror(&mut prompt, Distro::Debian).unwrap();
        assert_eq!(url, "http://deb.debian.org/debian");
    }

    #[test]
    fn ubuntu_always_uses_its_default_mirror() {
        let mut prompt = crate::utils::prompt::ScriptedPrompt::new();
        let url = choose_mirror(&mut prompt, Distro::Ubuntu).unwrap();
        assert_eq!(url, "http://us.archive.ubuntu.com/ubuntu");
    }
}
