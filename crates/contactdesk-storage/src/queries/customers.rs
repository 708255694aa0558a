// SPDX-FileCopyrightText: 2026 Contactdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Customer lookup and creation.

use contactdesk_core::DeskError;
use contactdesk_core::types::{Channel, Customer, format_timestamp, now_timestamp};
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, map_tr_err};
use crate::models::{CUSTOMER_COLUMNS, customer_from_row};

/// Resolve a customer by address, creating one on first contact.
///
/// Email contacts are keyed by lowercased address, every other channel by
/// phone number. A missing display name is filled in when one becomes known.
pub async fn find_or_create_customer(
    db: &Database,
    channel: Channel,
    address: &str,
    display_name: Option<&str>,
) -> Result<Customer, DeskError> {
    let address = address.trim();
    if address.is_empty() {
        return Err(DeskError::Validation(
            "customer address must not be empty".to_string(),
        ));
    }

    let column = match channel {
        Channel::Email => "email",
        _ => "phone",
    };
    let address = if channel == Channel::Email {
        address.to_lowercase()
    } else {
        address.to_string()
    };
    let display_name = display_name
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string);

    db.connection()
        .call(move |conn| -> Result<Customer, rusqlite::Error> {
            let tx = conn.transaction()?;
            let select = format!("SELECT {CUSTOMER_COLUMNS} FROM customers WHERE {column} = ?1");
            let existing = tx
                .query_row(&select, params![address], customer_from_row)
                .optional()?;

            let customer = match existing {
                Some(mut customer) => {
                    if customer.display_name.is_none() && display_name.is_some() {
                        tx.execute(
                            "UPDATE customers SET display_name = ?1 WHERE id = ?2",
                            params![display_name, customer.id],
                        )?;
                        customer.display_name = display_name;
                    }
                    customer
                }
                None => {
                    let created_at = now_timestamp();
                    let customer = Customer {
                        id: uuid::Uuid::new_v4().to_string(),
                        display_name,
                        phone: (column == "phone").then(|| address.clone()),
                        email: (column == "email").then(|| address.clone()),
                        created_at,
                    };
                    tx.execute(
                        "INSERT INTO customers (id, display_name, phone, email, created_at)
                         VALUES (?1, ?2, ?3, ?4, ?5)",
                        params![
                            customer.id,
                            customer.display_name,
                            customer.phone,
                            customer.email,
                            format_timestamp(&created_at),
                        ],
                    )?;
                    customer
                }
            };
            tx.commit()?;
            Ok(customer)
        })
        .await
        .map_err(map_tr_err)
}
