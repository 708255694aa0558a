// SPDX-FileCopyrightText: 2026 Contactdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Agent-side message delivery for contactdesk.
//!
//! [`DeliveryClient`] keeps the message list of the conversation an agent is
//! looking at, combining the REST history, optimistic sends and realtime
//! inserts into one ordered, duplicate-free view.

pub mod backend;
pub mod client;
pub mod display;
pub mod log;
pub mod realtime;

pub use backend::{ApiClient, MessageBackend};
pub use client::{ClientError, DeliveryClient};
pub use display::DisplayMessage;
pub use log::{LogEntry, MessageLog, RemoteOutcome};
pub use realtime::{RealtimeSource, Subscription, WsRealtime};
