// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Shared HTTP utilities for Ferry.
//!
//! Every outbound request carries the same `ferry/<version>` User-Agent so
//! webhook receivers can recognise the sender.

mod client;

pub use client::{builder, delivery_client, user_agent};
