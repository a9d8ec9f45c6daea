//! RouterOS command composition
//!
//! Values are embedded literally. Comments are user-influenced (they carry
//! the observed domain), so they are always double-quoted with the
//! characters the RouterOS console interprets inside quotes escaped.

use std::fmt::Write as _;
use std::net::Ipv6Addr;
use std::time::Duration;

/// Log topic carrying DNS packet dumps
pub const DNS_PACKET_TOPIC: &str = "dns,packet";

/// Quote `value` as a single RouterOS string token
pub fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '$' => out.push_str("\\$"),
            '?' => out.push_str("\\?"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {
                // RouterOS accepts \XX hex escapes for single bytes
                let mut buf = [0u8; 4];
                for b in c.encode_utf8(&mut buf).bytes() {
                    let _ = write!(out, "\\{:02X}", b);
                }
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Address family, which selects the console menu holding the list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    V4,
    V6,
}

impl Family {
    /// Both families, IPv4 first
    pub const ALL: [Family; 2] = [Family::V4, Family::V6];

    /// Family of an address literal; anything that is not IPv6 goes to IPv4
    pub fn of(address: &str) -> Self {
        if address.parse::<Ipv6Addr>().is_ok() {
            Self::V6
        } else {
            Self::V4
        }
    }

    fn menu(self) -> &'static str {
        match self {
            Self::V4 => "/ip firewall address-list",
            Self::V6 => "/ipv6 firewall address-list",
        }
    }
}

/// `print` of every entry of `list` in the `family` menu
pub fn print_address_list(family: Family, list: &str) -> String {
    format!("{} print where list={}", family.menu(), list)
}

/// `add` of one address to `list`, commented with `comment`
pub fn add_address(address: &str, list: &str, comment: &str) -> String {
    format!(
        "{} add address={} list={} comment={}",
        Family::of(address).menu(),
        address,
        list,
        quote(comment)
    )
}

/// `print` of DNS packet log lines newer than `lookback`
pub fn print_dns_log(lookback: Duration) -> String {
    format!(
        "/log print where topics~\"dns\" and topics~\"packet\" and time>([/system clock get time] - {})",
        format_window(lookback)
    )
}

/// Render a duration as RouterOS `HH:MM:SS`, rounding sub-second windows up
fn format_window(window: Duration) -> String {
    let mut secs = window.as_secs();
    if window.subsec_nanos() > 0 {
        secs += 1;
    }
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs / 60) % 60, secs % 60)
}
