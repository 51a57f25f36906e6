use std::net::IpAddr;

use ipnet::IpNet;

/// Parse the claim's CIDR strings into [`IpNet`] ranges, dropping anything
/// malformed rather than failing the whole ACL build — a bad range in one
/// claim shouldn't lock every token holder out.
pub fn parse_ranges(raw: &[String]) -> Vec<IpNet> {
    raw.iter()
        .filter_map(|s| match s.parse::<IpNet>() {
            Ok(net) => Some(net),
            Err(e) => {
                tracing::warn!(range = %s, error = %e, "ignoring malformed CIDR range in ACL claims");
                None
            }
        })
        .collect()
}

/// `peer ∈ range` iff `start ≤ peer.bytes ≤ end` byte-wise (design §8),
/// with a family mismatch between peer and range treated as "not
/// contained" rather than an error.
pub fn contains(ranges: &[IpNet], peer: IpAddr) -> bool {
    ranges.iter().any(|range| match (range, peer) {
        (IpNet::V4(net), IpAddr::V4(ip)) => net.contains(&ip),
        (IpNet::V6(net), IpAddr::V6(ip)) => net.contains(&ip),
        _ => false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peer_inside_range_matches() {
        let ranges = parse_ranges(&["10.0.0.0/8".to_string()]);
        assert!(contains(&ranges, "10.1.2.3".parse().unwrap()));
        assert!(!contains(&ranges, "192.168.1.5".parse().unwrap()));
    }

    #[test]
    fn family_mismatch_never_matches() {
        let ranges = parse_ranges(&["10.0.0.0/8".to_string()]);
        assert!(!contains(&ranges, "::1".parse().unwrap()));
    }

    #[test]
    fn malformed_range_is_skipped_not_fatal() {
        let ranges = parse_ranges(&["not-a-cidr".to_string(), "10.0.0.0/8".to_string()]);
        assert_eq!(ranges.len(), 1);
    }
}
