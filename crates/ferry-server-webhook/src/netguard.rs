// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Outbound request guard against server-side request forgery.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use tokio::net::lookup_host;
use tracing::debug;

/// Whether a delivery to `host` must be refused.
///
/// Hosts on the allowlist (or any host when it contains `*`) pass without a
/// lookup. Otherwise the host is resolved and blocked when any address is
/// local; a failed lookup also blocks.
pub async fn is_blocked_local_hostname(host: &str, allowlist: &[String]) -> bool {
	let host = host.trim_start_matches('[').trim_end_matches(']');

	if allowlist
		.iter()
		.any(|entry| entry == "*" || entry.eq_ignore_ascii_case(host))
	{
		return false;
	}

	if let Ok(ip) = host.parse::<IpAddr>() {
		return is_local_address(&ip);
	}

	match lookup_host((host, 0)).await {
		Ok(addrs) => {
			let mut any = false;
			for addr in addrs {
				any = true;
				if is_local_address(&addr.ip()) {
					debug!(host, ip = %addr.ip(), "host resolves to a local address");
					return true;
				}
			}
			!any
		}
		Err(e) => {
			debug!(host, error = %e, "failed to resolve webhook host");
			true
		}
	}
}

pub fn is_local_address(ip: &IpAddr) -> bool {
	match ip {
		IpAddr::V4(ipv4) => is_local_v4(ipv4),
		IpAddr::V6(ipv6) => is_local_v6(ipv6),
	}
}

fn is_local_v4(ipv4: &Ipv4Addr) -> bool {
	let [a, b, ..] = ipv4.octets();
	ipv4.is_loopback()              // 127.0.0.0/8
		|| ipv4.is_private()            // 10/8, 172.16/12, 192.168/16
		|| ipv4.is_link_local()         // 169.254.0.0/16, cloud metadata
		|| ipv4.is_broadcast()          // 255.255.255.255
		|| ipv4.is_unspecified()        // 0.0.0.0
		|| (a == 100 && (b & 0xc0) == 64) // 100.64.0.0/10 carrier-grade NAT
}

fn is_local_v6(ipv6: &Ipv6Addr) -> bool {
	if let Some(mapped) = ipv6.to_ipv4_mapped() {
		return is_local_v4(&mapped);
	}
	ipv6.is_loopback()              // ::1
		|| ipv6.is_unspecified()        // ::
		|| ipv6.segments()[0] & 0xffc0 == 0xfe80 // link-local fe80::/10
		|| ipv6.segments()[0] & 0xfe00 == 0xfc00 // unique local fc00::/7
}

#[cfg(test)]
mod tests {
	use super::*;

	fn allow(entries: &[&str]) -> Vec<String> {
		entries.iter().map(|s| s.to_string()).collect()
	}

	#[test]
	fn test_ssrf_protection_ipv4_ranges() {
		for blocked in [
			"127.0.0.1",
			"10.1.2.3",
			"172.16.0.1",
			"192.168.1.1",
			"169.254.169.254",
			"255.255.255.255",
			"0.0.0.0",
			"100.64.0.1",
			"100.127.255.254",
		] {
			let ip: IpAddr = blocked.parse().unwrap();
			assert!(is_local_address(&ip), "{blocked} should be local");
		}
		for allowed in ["8.8.8.8", "93.184.216.34", "100.128.0.1", "172.32.0.1"] {
			let ip: IpAddr = allowed.parse().unwrap();
			assert!(!is_local_address(&ip), "{allowed} should be public");
		}
	}

	#[test]
	fn test_ssrf_protection_ipv6_ranges() {
		for blocked in ["::1", "::", "fe80::1", "febf::1", "fc00::1", "fd12:3456::1", "::ffff:10.0.0.1"] {
			let ip: IpAddr = blocked.parse().unwrap();
			assert!(is_local_address(&ip), "{blocked} should be local");
		}
		for allowed in ["2001:4860:4860::8888", "::ffff:8.8.8.8"] {
			let ip: IpAddr = allowed.parse().unwrap();
			assert!(!is_local_address(&ip), "{allowed} should be public");
		}
	}

	#[tokio::test]
	async fn test_ssrf_protection_blocks_literal_addresses() {
		assert!(is_blocked_local_hostname("127.0.0.1", &[]).await);
		assert!(is_blocked_local_hostname("[::1]", &[]).await);
		assert!(!is_blocked_local_hostname("8.8.8.8", &[]).await);
	}

	#[tokio::test]
	async fn test_ssrf_protection_allowlist_bypass() {
		assert!(!is_blocked_local_hostname("127.0.0.1", &allow(&["127.0.0.1"])).await);
		assert!(!is_blocked_local_hostname("Internal.Example.COM", &allow(&["internal.example.com"])).await);
		assert!(!is_blocked_local_hostname("10.0.0.5", &allow(&["*"])).await);
		assert!(is_blocked_local_hostname("10.0.0.5", &allow(&["10.0.0.6"])).await);
	}

	#[tokio::test]
	async fn test_ssrf_protection_unresolvable_host_is_blocked() {
		assert!(is_blocked_local_hostname("no-such-host.invalid", &[]).await);
	}
}
