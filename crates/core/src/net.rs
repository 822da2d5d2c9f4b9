//! Minimal CIDR matching for customer IP ranges.

use std::net::IpAddr;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Error returned for malformed CIDR strings.
#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid CIDR: {0:?}")]
pub struct ParseCidrError(pub String);

/// An IP network in CIDR notation. A bare address is treated as a host
/// route (`/32` or `/128`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct IpRange {
    network: IpAddr,
    prefix_len: u8,
}

impl IpRange {
    /// Whether `addr` falls inside this range. Address families never
    /// match across each other.
    #[must_use]
    pub fn contains(&self, addr: IpAddr) -> bool {
        match (self.network, addr) {
            (IpAddr::V4(net), IpAddr::V4(ip)) => {
                let mask = if self.prefix_len == 0 {
                    0
                } else {
                    u32::MAX << (32 - u32::from(self.prefix_len))
                };
                (u32::from(net) & mask) == (u32::from(ip) & mask)
            }
            (IpAddr::V6(net), IpAddr::V6(ip)) => {
                let mask = if self.prefix_len == 0 {
                    0
                } else {
                    u128::MAX << (128 - u32::from(self.prefix_len))
                };
                (u128::from(net) & mask) == (u128::from(ip) & mask)
            }
            _ => false,
        }
    }
}

impl FromStr for IpRange {
    type Err = ParseCidrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (addr_part, prefix_part) = match s.split_once('/') {
            Some((a, p)) => (a, Some(p)),
            None => (s, None),
        };
        let network: IpAddr = addr_part
            .parse()
            .map_err(|_| ParseCidrError(s.to_owned()))?;
        let max_prefix = if network.is_ipv4() { 32 } else { 128 };
        let prefix_len = match prefix_part {
            Some(p) => {
                let n: u8 = p.parse().map_err(|_| ParseCidrError(s.to_owned()))?;
                if n > max_prefix {
                    return Err(ParseCidrError(s.to_owned()));
                }
                n
            }
            None => max_prefix,
        };
        Ok(Self {
            network,
            prefix_len,
        })
    }
}

impl TryFrom<String> for IpRange {
    type Error = ParseCidrError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<IpRange> for String {
    fn from(range: IpRange) -> Self {
        format!("{}/{}", range.network, range.prefix_len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn v4_containment() {
        let range: IpRange = "10.1.0.0/16".parse().unwrap();
        assert!(range.contains("10.1.200.5".parse().unwrap()));
        assert!(!range.contains("10.2.0.1".parse().unwrap()));
        assert!(!range.contains("::1".parse().unwrap()));
    }

    #[test]
    fn v6_containment() {
        let range: IpRange = "2001:db8::/32".parse().unwrap();
        assert!(range.contains("2001:db8::beef".parse().unwrap()));
        assert!(!range.contains("2001:db9::1".parse().unwrap()));
    }

    #[test]
    fn bare_address_is_host_route() {
        let range: IpRange = "192.0.2.7".parse().unwrap();
        assert!(range.contains("192.0.2.7".parse().unwrap()));
        assert!(!range.contains("192.0.2.8".parse().unwrap()));
    }

    #[test]
    fn zero_prefix_matches_family() {
        let range: IpRange = "0.0.0.0/0".parse().unwrap();
        assert!(range.contains("203.0.113.9".parse().unwrap()));
        assert!(!range.contains("2001:db8::1".parse().unwrap()));
    }

    #[test]
    fn malformed_inputs_rejected() {
        assert!("10.1.0.0/33".parse::<IpRange>().is_err());
        assert!("not-an-ip/8".parse::<IpRange>().is_err());
        assert!("10.1.0.0/abc".parse::<IpRange>().is_err());
    }
}
