// SPDX-FileCopyrightText: 2026 Contactdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query modules for the contactdesk SQLite tables.

pub mod channel_state;
pub mod conversations;
pub mod customers;
pub mod messages;
