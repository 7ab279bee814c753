use std::net::IpAddr;

/// First address in command output that lists one gateway per line.
///
/// IPv6 next hops may carry a `%zone` suffix, which is dropped.
pub fn parse_gateway_output(output: &str) -> Option<IpAddr> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .find_map(|line| {
            let addr = line.split('%').next().unwrap_or(line);
            addr.parse::<IpAddr>().ok()
        })
        .filter(|ip| !ip.is_unspecified())
}
