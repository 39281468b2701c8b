//! SSRF protection for the crawler adapter.
//!
//! Blocks private IP ranges, loopback, link-local, and cloud metadata
//! endpoints before a URL is fetched on the crawler's behalf.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, ToSocketAddrs};

use url::Url;

/// SSRF protection configuration.
#[derive(Debug, Clone)]
pub struct SsrfConfig {
    /// Allow requests to private IP ranges (default: false).
    pub allow_private_ips: bool,
    /// Allow requests to localhost (default: false).
    pub allow_localhost: bool,
    /// Allow requests to non-standard ports (default: false).
    pub allow_non_standard_ports: bool,
    /// Additional blocked IP addresses.
    pub blocked_ips: Vec<IpAddr>,
}

impl Default for SsrfConfig {
    fn default() -> Self {
        Self {
            allow_private_ips: false,
            allow_localhost: false,
            allow_non_standard_ports: false,
            blocked_ips: Vec::new(),
        }
    }
}

impl SsrfConfig {
    fn is_private_ip(ip: &IpAddr) -> bool {
        match ip {
            IpAddr::V4(ipv4) => {
                ipv4.is_private()
                    || ipv4.is_loopback()
                    || ipv4.is_link_local()
                    || ipv4.is_multicast()
                    || ipv4.is_unspecified()
                    || ipv4.is_broadcast()
                    || Self::is_shared_address_space(ipv4)
                    || Self::is_cloud_metadata_ipv4(ipv4)
            }
            IpAddr::V6(ipv6) => {
                ipv6.is_loopback()
                    || ipv6.is_unspecified()
                    || ipv6.is_multicast()
                    || Self::is_link_local_ipv6(ipv6)
                    || Self::is_unique_local_ipv6(ipv6)
                    || ipv6
                        .to_ipv4_mapped()
                        .is_some_and(|ipv4| Self::is_private_ip(&IpAddr::V4(ipv4)))
            }
        }
    }

    fn is_shared_address_space(ip: &Ipv4Addr) -> bool {
        let octets = ip.octets();
        octets[0] == 100 && (octets[1] & 0xC0) == 64
    }

    fn is_cloud_metadata_ipv4(ip: &Ipv4Addr) -> bool {
        let octets = ip.octets();
        octets[0] == 169 && octets[1] == 254 && octets[2] == 169 && octets[3] == 254
    }

    fn is_link_local_ipv6(ip: &Ipv6Addr) -> bool {
        (ip.segments()[0] & 0xffc0) == 0xfe80
    }

    fn is_unique_local_ipv6(ip: &Ipv6Addr) -> bool {
        (ip.segments()[0] & 0xfe00) == 0xfc00
    }

    fn validate_pre_resolve<'a>(&self, url: &'a Url) -> Result<(url::Host<&'a str>, u16, &'a str), String> {
        match url.scheme() {
            "http" | "https" => {}
            scheme => return Err(format!("scheme '{scheme}' not allowed (only http/https)")),
        }

        let port = url.port_or_known_default().unwrap_or(80);
        if !self.allow_non_standard_ports && port != 80 && port != 443 {
            return Err(format!("port {port} not allowed (only 80/443)"));
        }

        let host_str = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| "URL has no host".to_string())?;
        let host = url.host().ok_or_else(|| "URL has no host".to_string())?;

        Ok((host, port, host_str))
    }

    fn resolve(host: url::Host<&str>, host_str: &str, port: u16) -> Result<Vec<IpAddr>, String> {
        match host {
            url::Host::Ipv4(ip) => Ok(vec![IpAddr::V4(ip)]),
            url::Host::Ipv6(ip) => Ok(vec![IpAddr::V6(ip)]),
            url::Host::Domain(domain) => format!("{domain}:{port}")
                .to_socket_addrs()
                .map(|addrs| addrs.map(|a| a.ip()).collect())
                .map_err(|e| format!("failed to resolve '{host_str}': {e}")),
        }
    }

    fn validate_resolved(&self, ips: &[IpAddr]) -> Result<(), String> {
        for ip in ips {
            if self.blocked_ips.contains(ip) {
                return Err(format!("IP {ip} is explicitly blocked"));
            }
            if !self.allow_private_ips && Self::is_private_ip(ip) {
                return Err(format!("IP {ip} is a private/internal address"));
            }
            if !self.allow_localhost && ip.is_loopback() {
                return Err(format!("localhost/loopback addresses not allowed ({ip})"));
            }
        }
        Ok(())
    }

    /// Validate a URL for SSRF protection. Returns `Ok(())` if safe to fetch.
    pub fn validate_url(&self, url: &Url) -> Result<(), String> {
        let (host, port, host_str) = self.validate_pre_resolve(url)?;
        let ips = Self::resolve(host, host_str, port)?;
        if ips.is_empty() {
            return Err(format!("hostname '{host_str}' did not resolve to any IP"));
        }
        self.validate_resolved(&ips)
    }
}
