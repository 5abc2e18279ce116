use crate::error::{Error, Result};
use std::net::{IpAddr, Ipv4Addr};

/// Echo service queried when no other service is configured
pub const DEFAULT_IP_SERVICE: &str = "https://api.ipify.org";

/// Anything that can tell us our current public IPv4 address
pub trait IpSource {
    fn current_ip(&self) -> Result<Ipv4Addr>;
}

/// IP detection method
#[derive(Debug, Clone, PartialEq)]
pub enum IpDetectionMethod {
    /// Manual IP address
    Manual(String),
    /// Web echo service, with request timeout in seconds
    Web { url: String, timeout: u64 },
}

impl Default for IpDetectionMethod {
    fn default() -> Self {
        Self::Web {
            url: DEFAULT_IP_SERVICE.to_string(),
            timeout: crate::config::DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl IpSource for IpDetectionMethod {
    fn current_ip(&self) -> Result<Ipv4Addr> {
        match self {
            IpDetectionMethod::Manual(ip_str) => parse_ipv4(ip_str),
            IpDetectionMethod::Web { url, timeout } => get_external_ip(url, *timeout),
        }
    }
}

/// Ask a single echo service for our external address. One attempt, no fallback.
pub fn get_external_ip(url: &str, timeout: u64) -> Result<Ipv4Addr> {
    log::debug!("Querying {} for external IP", url);

    let resp = minreq::get(url)
        .with_header("User-Agent", crate::USER_AGENT)
        .with_timeout(timeout)
        .send()?;

    if !(200..300).contains(&resp.status_code) {
        return Err(Error::Network(format!(
            "{} answered with status {} {}",
            url, resp.status_code, resp.reason_phrase
        )));
    }

    let body = resp
        .as_str()
        .map_err(|e| Error::Network(format!("unreadable answer from {}: {}", url, e)))?;

    parse_ipv4(body.trim())
        .map_err(|e| Error::Network(format!("{} did not return an IPv4 address: {}", url, e)))
}

/// Parse and validate an IPv4 address string
pub fn parse_ipv4(ip_str: &str) -> Result<Ipv4Addr> {
    match ip_str.parse::<IpAddr>() {
        Ok(IpAddr::V4(ip)) => Ok(ip),
        Ok(IpAddr::V6(_)) => Err(Error::Config(format!(
            "'{}' is an IPv6 address, only IPv4 is supported",
            ip_str
        ))),
        Err(e) => Err(Error::Config(format!("'{}' is an invalid IP address: {}", ip_str, e))),
    }
}
