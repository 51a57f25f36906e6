use std::collections::HashSet;
use std::net::IpAddr;

use ipnet::IpNet;

use crate::cidr;
use crate::claims::Claims;

/// Per-token authorization rule set (design §4.2). Built once from a
/// verified token's [`Claims`] and memoized by the [`AclCache`](crate::AclCache)
/// so subsequent requests on the same token skip re-verification.
#[derive(Debug, Clone)]
pub struct ServerAcl {
    allowed_hosts: HashSet<String>,
    allowed_ips: HashSet<IpAddr>,
    ip_ranges: Vec<IpNet>,
    allow_all: bool,
}

impl ServerAcl {
    /// A claim set with no hosts, IPs, or ranges at all grants every peer —
    /// it means the token carries no restriction, not that nothing is
    /// reachable.
    pub fn from_claims(claims: &Claims) -> Self {
        let allow_all =
            claims.allowed_hosts.is_empty() && claims.allowed_ips.is_empty() && claims.allowed_cidrs.is_empty();
        Self {
            allowed_hosts: claims.allowed_hosts.iter().map(|h| h.to_lowercase()).collect(),
            allowed_ips: claims.allowed_ips.clone(),
            ip_ranges: cidr::parse_ranges(&claims.allowed_cidrs),
            allow_all,
        }
    }

    /// `true` iff `peer` is permitted under exact IP membership, CIDR
    /// containment, or (as a last resort, when hosts were configured)
    /// reverse-resolved hostname match.
    pub fn is_valid(&self, peer: IpAddr, peer_hostname: Option<&str>) -> bool {
        if self.allow_all {
            return true;
        }
        if self.allowed_ips.contains(&peer) {
            return true;
        }
        if cidr::contains(&self.ip_ranges, peer) {
            return true;
        }
        if !self.allowed_hosts.is_empty() {
            if let Some(hostname) = peer_hostname {
                return self.allowed_hosts.contains(&hostname.to_lowercase());
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims_with(hosts: &[&str], ips: &[&str], cidrs: &[&str]) -> Claims {
        Claims {
            sub: "user".into(),
            allowed_hosts: hosts.iter().map(|s| s.to_string()).collect(),
            allowed_ips: ips.iter().map(|s| s.parse().unwrap()).collect(),
            allowed_cidrs: cidrs.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn empty_claims_allow_all_peers() {
        let acl = ServerAcl::from_claims(&claims_with(&[], &[], &[]));
        assert!(acl.is_valid("1.2.3.4".parse().unwrap(), None));
    }

    #[test]
    fn exact_ip_match_is_allowed() {
        let acl = ServerAcl::from_claims(&claims_with(&[], &["10.0.0.5"], &[]));
        assert!(acl.is_valid("10.0.0.5".parse().unwrap(), None));
        assert!(!acl.is_valid("10.0.0.6".parse().unwrap(), None));
    }

    #[test]
    fn cidr_match_is_allowed() {
        let acl = ServerAcl::from_claims(&claims_with(&[], &[], &["10.0.0.0/8"]));
        assert!(acl.is_valid("10.9.9.9".parse().unwrap(), None));
        assert!(!acl.is_valid("192.168.0.1".parse().unwrap(), None));
    }

    #[test]
    fn hostname_fallback_only_when_hosts_configured() {
        let acl = ServerAcl::from_claims(&claims_with(&["db.internal"], &[], &[]));
        assert!(acl.is_valid("1.2.3.4".parse().unwrap(), Some("DB.Internal")));
        assert!(!acl.is_valid("1.2.3.4".parse().unwrap(), Some("other.host")));
        assert!(!acl.is_valid("1.2.3.4".parse().unwrap(), None));
    }
}
