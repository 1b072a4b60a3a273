//! SSRF protection and URL admission for oracle fetches.

use crate::interfaces::UrlValidator;
use crate::settings::OracleServiceSettings;
use std::net::IpAddr;
use thiserror::Error;
use url::{Host, Url};

/// Raised when a host, or a redirect target, must not be contacted.
#[derive(Debug, Clone, Error)]
#[error("host refused: {0}")]
pub struct HostRefused(pub String);

/// Ports of common internal services.
const BLOCKED_PORTS: [u16; 14] = [
    22, 23, 25, 53, 110, 143, 993, 995, 3306, 5432, 6379, 27017, 9200, 9300,
];

/// Check if a hostname is a localhost variant.
pub(crate) fn is_localhost_name(host: &str) -> bool {
    let host = host.trim_end_matches('.').to_ascii_lowercase();
    matches!(
        host.as_str(),
        "localhost" | "localhost.localdomain" | "ip6-localhost" | "ip6-loopback"
    ) || host.ends_with(".localhost")
        || host.ends_with(".local")
        || host.ends_with(".internal")
}

/// Check if an IP address is internal, private or reserved.
pub fn is_internal_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(ip) => {
            if ip.is_loopback() || ip.is_broadcast() || ip.is_unspecified() {
                return true;
            }
            let octets = ip.octets();
            match octets[0] {
                0 | 10 | 127 => true,
                100 if (64..128).contains(&octets[1]) => true, // 100.64.0.0/10 (shared)
                169 if octets[1] == 254 => true,               // link-local
                172 if (16..32).contains(&octets[1]) => true,
                192 => match octets[1] {
                    0 if octets[2] == 0 || octets[2] == 2 => true,
                    88 if octets[2] == 99 => true,
                    168 => true,
                    _ => false,
                },
                198 if octets[1] == 18 || octets[1] == 19 => true, // benchmark
                198 if octets[1] == 51 && octets[2] == 100 => true,
                203 if octets[1] == 0 && octets[2] == 113 => true,
                224..=255 => true, // multicast and reserved
                _ => false,
            }
        }
        IpAddr::V6(ip) => {
            let first = ip.segments()[0];
            if ip.is_loopback()
                || ip.is_unspecified()
                || ip.is_multicast()
                || (first & 0xfe00) == 0xfc00 // unique local
                || (first & 0xffc0) == 0xfe80
            // link-local
            {
                return true;
            }
            if let Some(ipv4) = ip.to_ipv4_mapped() {
                return is_internal_ip(IpAddr::V4(ipv4));
            }
            false
        }
    }
}

/// Rejects URL shapes commonly used to smuggle requests to internal services.
///
/// The scheme is not checked here; unsupported schemes are answered by the
/// fetch policy once admission has passed.
pub fn validate_url_for_ssrf(url: &Url) -> Result<(), String> {
    if !url.username().is_empty() || url.password().is_some() {
        return Err("URLs with credentials are not allowed".to_string());
    }

    if let Some(port) = url.port() {
        if port == 0 || BLOCKED_PORTS.contains(&port) {
            return Err("Port not allowed for security reasons".to_string());
        }
    }

    let Some(host) = url.host_str() else {
        return Err("URL has no host".to_string());
    };
    if host.starts_with("[::ffff:") || host.starts_with("[0:0:0:0:0:ffff:") {
        return Err("IPv4-mapped IPv6 addresses are not allowed".to_string());
    }
    if host.contains('%') {
        return Err("URL-encoded hosts are not allowed".to_string());
    }
    if host.split('.').any(|part| {
        part.len() > 1 && part.starts_with('0') && part.chars().all(|c| c.is_ascii_digit())
    }) {
        return Err("IP addresses with octal notation are not allowed".to_string());
    }

    Ok(())
}

/// Admission combining the configured black/white lists with SSRF rules.
#[derive(Debug, Clone, Default)]
pub struct DefaultUrlValidator {
    pub allow_private_host: bool,
    pub url_whitelist: Vec<String>,
    pub url_blacklist: Vec<String>,
}

impl DefaultUrlValidator {
    pub fn from_settings(settings: &OracleServiceSettings) -> Self {
        Self {
            allow_private_host: settings.allow_private_host,
            url_whitelist: settings.url_whitelist.clone(),
            url_blacklist: settings.url_blacklist.clone(),
        }
    }

    fn is_listed_allowed(&self, url: &str) -> bool {
        if self.url_blacklist.iter().any(|blocked| url.contains(blocked)) {
            return false;
        }
        self.url_whitelist.is_empty() || self.url_whitelist.iter().any(|allowed| url.contains(allowed))
    }
}

impl UrlValidator for DefaultUrlValidator {
    fn validate(&self, url: &Url) -> Result<(), String> {
        if !self.is_listed_allowed(url.as_str()) {
            return Err("URL blocked by url policy".to_string());
        }
        validate_url_for_ssrf(url)?;
        if self.allow_private_host {
            return Ok(());
        }
        match url.host() {
            Some(Host::Domain(name)) if is_localhost_name(name) => {
                Err(format!("local host name `{name}` is not allowed"))
            }
            Some(Host::Ipv4(ip)) if is_internal_ip(IpAddr::V4(ip)) => {
                Err(format!("private address {ip} is not allowed"))
            }
            Some(Host::Ipv6(ip)) if is_internal_ip(IpAddr::V6(ip)) => {
                Err(format!("private address {ip} is not allowed"))
            }
            _ => Ok(()),
        }
    }
}
