//! Decides whether a discovered gateway belongs to a trusted network.

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use std::fmt;
use std::net::IpAddr;

use crate::error::ToggleError;

/// The configured set of trusted gateways.
///
/// `ExactIp` backs the `wgtunnel` entry point, where every `--gateway` is
/// parsed as an address. `GlobPattern` backs `wgtoggle update`, where each
/// `--gateway` is a shell-style pattern matched against the gateway's
/// textual form.
#[derive(Debug, Clone)]
pub enum GatewayMatcher {
    ExactIp(Vec<IpAddr>),
    GlobPattern { patterns: Vec<String>, set: GlobSet },
}

impl GatewayMatcher {
    pub fn exact(addrs: impl IntoIterator<Item = IpAddr>) -> Self {
        GatewayMatcher::ExactIp(addrs.into_iter().collect())
    }

    pub fn patterns<I, S>(patterns: I) -> Result<Self, ToggleError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let patterns: Vec<String> = patterns.into_iter().map(Into::into).collect();
        let mut builder = GlobSetBuilder::new();
        for pattern in &patterns {
            let glob = GlobBuilder::new(pattern)
                .case_insensitive(true)
                .build()
                .map_err(|source| ToggleError::InvalidPattern {
                    pattern: pattern.clone(),
                    source,
                })?;
            builder.add(glob);
        }
        let set = builder
            .build()
            .map_err(|source| ToggleError::InvalidPattern {
                pattern: patterns.join(","),
                source,
            })?;
        Ok(GatewayMatcher::GlobPattern { patterns, set })
    }

    pub fn matches(&self, gateway: IpAddr) -> bool {
        match self {
            GatewayMatcher::ExactIp(addrs) => {
                let gateway = gateway.to_canonical();
                addrs.iter().any(|addr| addr.to_canonical() == gateway)
            }
            GatewayMatcher::GlobPattern { set, .. } => set.is_match(gateway.to_string()),
        }
    }
}

impl fmt::Display for GatewayMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rules: Vec<String> = match self {
            GatewayMatcher::ExactIp(addrs) => addrs.iter().map(ToString::to_string).collect(),
            GatewayMatcher::GlobPattern { patterns, .. } => patterns.clone(),
        };
        write!(f, "[{}]", rules.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[test]
    fn exact_requires_full_address() {
        let matcher = GatewayMatcher::exact([ip("192.168.1.1"), ip("10.20.0.1")]);
        assert!(matcher.matches(ip("192.168.1.1")));
        assert!(matcher.matches(ip("10.20.0.1")));
        assert!(!matcher.matches(ip("192.168.1.10")));
        assert!(!matcher.matches(ip("192.168.1.0")));
    }

    #[test]
    fn exact_treats_mapped_ipv4_as_ipv4() {
        let matcher = GatewayMatcher::exact([ip("192.168.1.1")]);
        assert!(matcher.matches(ip("::ffff:192.168.1.1")));

        let matcher = GatewayMatcher::exact([ip("::ffff:10.0.0.1")]);
        assert!(matcher.matches(ip("10.0.0.1")));
    }

    #[test]
    fn exact_ipv6() {
        let matcher = GatewayMatcher::exact([ip("fe80::1")]);
        assert!(matcher.matches(ip("FE80:0:0:0:0:0:0:1")));
        assert!(!matcher.matches(ip("fe80::2")));
    }

    #[test]
    fn empty_exact_list_never_matches() {
        let matcher = GatewayMatcher::exact([]);
        assert!(!matcher.matches(ip("192.168.1.1")));
    }

    #[test]
    fn pattern_wildcard_matches_subnet() {
        let matcher = GatewayMatcher::patterns(["192.168.1.*"]).unwrap();
        assert!(matcher.matches(ip("192.168.1.1")));
        assert!(matcher.matches(ip("192.168.1.254")));
        assert!(!matcher.matches(ip("10.0.0.1")));
        assert!(!matcher.matches(ip("192.168.10.1")));
    }

    #[test]
    fn pattern_literal_and_single_char() {
        let matcher = GatewayMatcher::patterns(["10.0.0.1", "172.16.0.?"]).unwrap();
        assert!(matcher.matches(ip("10.0.0.1")));
        assert!(matcher.matches(ip("172.16.0.9")));
        assert!(!matcher.matches(ip("172.16.0.10")));
        assert!(!matcher.matches(ip("10.0.0.10")));
    }

    #[test]
    fn pattern_character_class() {
        let matcher = GatewayMatcher::patterns(["192.168.[12].1"]).unwrap();
        assert!(matcher.matches(ip("192.168.1.1")));
        assert!(matcher.matches(ip("192.168.2.1")));
        assert!(!matcher.matches(ip("192.168.3.1")));
    }

    #[test]
    fn pattern_ipv6_ignores_case() {
        let matcher = GatewayMatcher::patterns(["FE80::*"]).unwrap();
        assert!(matcher.matches(ip("fe80::1")));
        assert!(!matcher.matches(ip("2001:db8::1")));
    }

    #[test]
    fn invalid_pattern_is_rejected() {
        let err = GatewayMatcher::patterns(["192.168.[1.1"]).unwrap_err();
        assert_eq!(err.exit_code(), 1);
        assert!(err.to_string().contains("192.168.[1.1"));
    }

    #[test]
    fn display_lists_rules() {
        let matcher = GatewayMatcher::patterns(["192.168.1.*", "10.0.0.1"]).unwrap();
        assert_eq!(matcher.to_string(), "[192.168.1.*, 10.0.0.1]");
    }
}
