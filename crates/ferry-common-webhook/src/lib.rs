// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Webhook payload signing.
//!
//! Outbound deliveries carry `hex(HMAC-SHA256(secret, json_payload))` in both
//! the native `X-Gogs-Signature` header and, for receivers written against
//! GitHub, alongside the GitHub-compatible delivery and event headers.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

pub mod headers {
	pub const GITHUB_DELIVERY: &str = "X-Github-Delivery";
	pub const GITHUB_EVENT: &str = "X-Github-Event";
	pub const GOGS_DELIVERY: &str = "X-Gogs-Delivery";
	pub const GOGS_SIGNATURE: &str = "X-Gogs-Signature";
	pub const GOGS_EVENT: &str = "X-Gogs-Event";
}

/// Compute an HMAC-SHA256 signature for a payload.
///
/// Returns the hex-encoded signature without any prefix.
pub fn compute_hmac_sha256(secret: &[u8], payload: &[u8]) -> String {
	let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC can take key of any size");
	mac.update(payload);
	hex::encode(mac.finalize().into_bytes())
}

/// Sign a delivery payload with the webhook secret.
///
/// An empty secret means the webhook is unsigned and yields an empty string.
pub fn sign_payload(secret: &str, payload: &[u8]) -> String {
	if secret.is_empty() {
		return String::new();
	}
	compute_hmac_sha256(secret.as_bytes(), payload)
}

/// Verify an HMAC-SHA256 signature for a payload.
///
/// The `signature` should be the raw hex-encoded signature (no prefix).
pub fn verify_hmac_sha256(secret: &[u8], payload: &[u8], signature: &str) -> bool {
	let Ok(expected) = hex::decode(signature) else {
		return false;
	};

	let Ok(mut mac) = HmacSha256::new_from_slice(secret) else {
		return false;
	};

	mac.update(payload);
	mac.verify_slice(&expected).is_ok()
}
