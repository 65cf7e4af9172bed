//! Address helpers

/// Whether `s` is a dotted-quad IPv4 literal
///
/// Exactly four parts, each made only of ASCII digits and no larger than 255.
/// Leading zeros are accepted (`010.0.0.1`), unlike [`std::net::Ipv4Addr`].
pub fn is_ip(s: &str) -> bool {
    let parts: Vec<&str> = s.split('.').collect();
    if parts.len() != 4 {
        return false;
    }

    parts.iter().all(|part| {
        !part.is_empty()
            && part.bytes().all(|b| b.is_ascii_digit())
            && part.parse::<u32>().map_or(false, |n| n <= 255)
    })
}
