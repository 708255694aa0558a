// SPDX-FileCopyrightText: 2026 Contactdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Request validation that runs before any write.

use crate::error::DeskError;
use crate::types::{NewConversation, SendMessageRequest, SenderType};

impl SendMessageRequest {
    /// Check the sender combination and content of a send request.
    ///
    /// A customer message carries only `sender_customer_id` and is never
    /// internal. An agent message carries only `sender_agent_id` and may be
    /// internal.
    pub fn validate(&self) -> Result<(), DeskError> {
        if self.conversation_id.trim().is_empty() {
            return Err(DeskError::Validation(
                "conversation_id must not be empty".to_string(),
            ));
        }
        if self.content.is_empty() {
            return Err(DeskError::Validation(
                "content must be at least 1 character".to_string(),
            ));
        }

        match self.sender_type {
            SenderType::Customer => {
                if !has_value(&self.sender_customer_id) || self.sender_agent_id.is_some() {
                    return Err(DeskError::Validation(
                        "customer message requires sender_customer_id only".to_string(),
                    ));
                }
                if self.is_internal {
                    return Err(DeskError::Validation(
                        "customers cannot send internal messages".to_string(),
                    ));
                }
            }
            SenderType::Agent => {
                if !has_value(&self.sender_agent_id) || self.sender_customer_id.is_some() {
                    return Err(DeskError::Validation(
                        "agent message requires sender_agent_id only".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }
}

impl NewConversation {
    pub fn validate(&self) -> Result<(), DeskError> {
        if self.customer_id.trim().is_empty() {
            return Err(DeskError::Validation(
                "customer_id must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

fn has_value(field: &Option<String>) -> bool {
    field.as_deref().is_some_and(|v| !v.is_empty())
}
