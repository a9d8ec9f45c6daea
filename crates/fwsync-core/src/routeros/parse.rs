//! RouterOS output parsing
//!
//! Device output is noisy and not under our control: anything that does not
//! look like a data row or a DNS answer entry is dropped without error.

use super::command::DNS_PACKET_TOPIC;
use std::collections::{BTreeSet, HashMap};
use std::net::Ipv4Addr;

/// Header lines printed before the first row of an address-list `print`
const HEADER_LINES: usize = 2;

/// Marker of comment rows in tabular output
const COMMENT_MARKER: &str = ";;;";

/// Extract the addresses of `list` from address-list `print` output
pub fn parse_address_list(output: &str, list: &str) -> Vec<String> {
    output
        .lines()
        .skip(HEADER_LINES)
        .map(str::trim)
        .filter(|line| !line.contains(COMMENT_MARKER))
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            match (fields.next(), fields.next()) {
                (Some(name), Some(address)) if name == list => Some(host_address(address)),
                _ => None,
            }
        })
        .collect()
}

/// Drop the host-length prefix the IPv6 menu prints on single addresses
fn host_address(address: &str) -> String {
    address.strip_suffix("/128").unwrap_or(address).to_string()
}

/// Collect A answers from DNS packet log output, per domain
pub fn parse_dns_log(output: &str) -> HashMap<String, BTreeSet<String>> {
    let mut found: HashMap<String, BTreeSet<String>> = HashMap::new();

    for line in output.lines().filter(|l| l.contains(DNS_PACKET_TOPIC)) {
        if let Some((domain, address)) = parse_answer_entry(line) {
            found.entry(domain).or_default().insert(address);
        }
    }

    found
}

/// Parse the `<name:TYPE:...>` entry of one log line
///
/// Fields after the type are either bare values or `key=value` pairs; the
/// first one holding an IPv4 address is taken. Only `A` entries are kept.
fn parse_answer_entry(line: &str) -> Option<(String, String)> {
    let start = line.find('<')?;
    let len = line[start + 1..].find('>')?;
    let entry = &line[start + 1..start + 1 + len];

    let mut parts = entry.split(':');
    let name = parts.next().filter(|n| !n.is_empty())?;
    let kind = parts.next()?;
    if kind != "A" {
        return None;
    }

    let address = parts
        .map(|field| field.split_once('=').map_or(field, |(_, value)| value))
        .find_map(|value| value.parse::<Ipv4Addr>().ok())?;

    Some((name.to_string(), address.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_list_rows() {
        let output = "Flags: X - disabled, D - dynamic\n\
                      #   LIST       ADDRESS\n\
                      ;;; example.com\n\
                      watchlist 203.0.113.5\n";
        assert_eq!(parse_address_list(output, "watchlist"), vec!["203.0.113.5"]);
    }

    #[test]
    fn test_address_list_skips_other_lists_and_short_rows() {
        let output = "h1\nh2\n  other 192.0.2.1\nwatchlist\n\n  watchlist   192.0.2.2  \n";
        assert_eq!(parse_address_list(output, "watchlist"), vec!["192.0.2.2"]);
    }

    #[test]
    fn test_address_list_too_short_output() {
        assert!(parse_address_list("watchlist 192.0.2.1\n", "watchlist").is_empty());
        assert!(parse_address_list("", "watchlist").is_empty());
    }

    #[test]
    fn test_dns_log_collects_a_answers() {
        let output = "\
12:00:01 dns,packet --- got answer from 8.8.8.8:53:
12:00:01 dns,packet question: example.com:A:IN
12:00:01 dns,packet <example.com:A:ttl=300:93.184.216.34>
12:00:01 dns,packet <example.com:A:ttl=300:93.184.216.35>
12:00:02 dns,packet <example.com:A:ttl=299:93.184.216.34>
12:00:02 dns,packet <cdn.example.net:A:data=198.51.100.9>
12:00:02 dns,packet <example.com:AAAA:ttl=300:2606:2800:220:1:248:1893:25c8:1946>
12:00:02 dns,packet <www.example.com:CNAME:ttl=300:example.com>
12:00:03 system,info <fake.example:A:192.0.2.1>
";
        let found = parse_dns_log(output);

        assert_eq!(found.len(), 2);
        assert_eq!(
            found["example.com"],
            BTreeSet::from(["93.184.216.34".to_string(), "93.184.216.35".to_string()])
        );
        assert_eq!(found["cdn.example.net"], BTreeSet::from(["198.51.100.9".to_string()]));
    }

    #[test]
    fn test_dns_log_skips_malformed_entries() {
        let output = "\
dns,packet <broken
dns,packet <:A:192.0.2.1>
dns,packet <x.test:A:ttl=300>
dns,packet <x.test:A:not-an-ip>
dns,packet <x.test>
dns,packet no brackets at all
";
        assert!(parse_dns_log(output).is_empty());
    }

    #[test]
    fn test_ipv6_rows_lose_host_prefix() {
        let output = "Flags: X - disabled, D - dynamic\n\
                      #   LIST       ADDRESS\n\
                      watchlist 2001:db8::7/128\n\
                      watchlist 2001:db8::/32\n";
        assert_eq!(
            parse_address_list(output, "watchlist"),
            vec!["2001:db8::7", "2001:db8::/32"]
        );
    }
}
