//! Dotted-quad <-> u32 address codec.

use std::net::Ipv4Addr;

/// Parse a dotted-quad IPv4 address into its integer form.
pub fn ip4_to_int(text: &str) -> Option<u32> {
    text.trim().parse::<Ipv4Addr>().ok().map(u32::from)
}

/// Format an integer address as dotted-quad text.
pub fn int_to_ip4(value: u32) -> String {
    Ipv4Addr::from(value).to_string()
}

/// Describe `[start, start + length)` as `[first - last]`, last inclusive.
pub fn describe_range(start: u32, length: u32) -> String {
    let last = (start as u64 + length as u64).saturating_sub(1).min(u32::MAX as u64) as u32;
    format!("[{} - {}]", int_to_ip4(start), int_to_ip4(last))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ip4_to_int() {
        assert_eq!(ip4_to_int("0.0.0.1"), Some(1));
        assert_eq!(ip4_to_int("10.0.0.0"), Some(0x0A00_0000));
        assert_eq!(ip4_to_int(" 192.168.1.1 "), Some(0xC0A8_0101));
        assert_eq!(ip4_to_int("255.255.255.255"), Some(u32::MAX));
    }

    #[test]
    fn test_ip4_to_int_rejects_malformed() {
        assert_eq!(ip4_to_int("not-an-ip"), None);
        assert_eq!(ip4_to_int("5"), None);
        assert_eq!(ip4_to_int("1.2.3"), None);
        assert_eq!(ip4_to_int("256.0.0.1"), None);
    }

    #[test]
    fn test_int_to_ip4() {
        assert_eq!(int_to_ip4(0xC0A8_0101), "192.168.1.1");
        assert_eq!(int_to_ip4(0), "0.0.0.0");
    }

    #[test]
    fn test_describe_range() {
        assert_eq!(describe_range(0x0A00_0000, 256), "[10.0.0.0 - 10.0.0.255]");
        assert_eq!(describe_range(u32::MAX, 1), "[255.255.255.255 - 255.255.255.255]");
    }
}
