// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Webhooks: selecting subscribers for an event, rendering and signing the
//! payload, persisting delivery tasks, and delivering them.

pub mod deliver;
pub mod dispatch;
pub mod error;
pub mod netguard;
pub mod payload;
pub mod transform;
pub mod types;

pub use deliver::{
	init_deliver_hooks, DeliveryConfig, DeliveryRequest, DeliveryResponse, HookDeliverer,
	HookRequestInfo, HookResponseInfo, HookTransport, ReqwestTransport, TransportError,
	BLOCKED_LOCAL_NETWORK,
};
pub use dispatch::WebhookDispatcher;
pub use error::{Result, WebhookError};
pub use netguard::{is_blocked_local_hostname, is_local_address};
pub use payload::{
	ref_end_name, ApiCommit, ApiPayloadUser, ApiRepository, ApiUser, CreatePayload,
	DeletePayload, Payload, PushPayload,
};
pub use transform::{PayloadTransformer, SlackMeta, TransformerSet};
pub use types::{
	HookContentType, HookEvent, HookEventType, HookEvents, HookStatus, HookTaskType, Webhook,
};
