// SPDX-FileCopyrightText: 2026 Contactdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for contactdesk integration tests.
//!
//! [`TestHarness`] runs the real gateway on an ephemeral port against a
//! temporary SQLite database, so client code can be exercised end to end
//! without external services.

pub mod fixtures;
pub mod harness;

pub use harness::{TestHarness, TestHarnessBuilder};
