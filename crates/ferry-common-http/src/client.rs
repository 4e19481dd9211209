// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Shared HTTP client with consistent User-Agent header.

use reqwest::{Client, ClientBuilder};
use std::time::Duration;
use tracing::warn;

/// Creates a new HTTP client builder with the standard Ferry User-Agent header.
///
/// # Example
/// ```ignore
/// let client = ferry_common_http::builder()
///     .timeout(Duration::from_secs(30))
///     .build()?;
/// ```
pub fn builder() -> ClientBuilder {
	Client::builder().user_agent(user_agent())
}

/// Builds the client used for webhook deliveries.
///
/// Redirects are not followed; a 3xx answer is recorded as a failed delivery.
pub fn delivery_client(timeout: Duration, skip_tls_verify: bool) -> reqwest::Result<Client> {
	if skip_tls_verify {
		warn!("building webhook client with TLS certificate verification disabled");
	}

	builder()
		.timeout(timeout)
		.redirect(reqwest::redirect::Policy::none())
		.danger_accept_invalid_certs(skip_tls_verify)
		.build()
}

/// Returns the standard Ferry User-Agent string.
///
/// Format: `ferry/{version}`
pub fn user_agent() -> String {
	format!("ferry/{}", env!("CARGO_PKG_VERSION"))
}
