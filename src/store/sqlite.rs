// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use super::{AuthEvent, Credentials, DeleteFilter, Listeners, RemoteStore, TransactionFilter};
use crate::db::init_schema;
use crate::error::StoreError;
use crate::models::{NewTransaction, Principal, Transaction, TxKind};
use chrono::{DateTime, Local, NaiveDate, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use rust_decimal::Decimal;
use std::path::Path;
use std::sync::mpsc::Receiver;
use uuid::Uuid;

/// Local stand-in for the hosted backend.
///
/// Sign-in is by email only: the first sign-in for an address creates the
/// user. Row access follows the hosted service's owner policy, so reads and
/// deletes only ever touch the signed-in user's rows and inserts for any other
/// owner are rejected.
pub struct SqliteStore {
    conn: Connection,
    listeners: Listeners,
}

impl SqliteStore {
    pub fn new(conn: Connection) -> Result<Self, StoreError> {
        init_schema(&conn)?;
        Ok(SqliteStore {
            conn,
            listeners: Listeners::default(),
        })
    }

    pub fn open(path: &Path) -> Result<Self, StoreError> {
        SqliteStore::new(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        SqliteStore::new(Connection::open_in_memory()?)
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    fn session_principal(&self) -> Result<Option<Principal>, StoreError> {
        let p = self
            .conn
            .query_row(
                "SELECT u.id, u.email FROM session s JOIN users u ON s.user_id=u.id WHERE s.slot=1",
                [],
                |r| {
                    Ok(Principal {
                        id: r.get(0)?,
                        email: r.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(p)
    }

    fn signed_in(&self) -> Result<Principal, StoreError> {
        self.session_principal()?.ok_or(StoreError::NotSignedIn)
    }

    fn user_id(&self, email: &str) -> Result<Option<String>, StoreError> {
        let id = self
            .conn
            .query_row("SELECT id FROM users WHERE email=?1", params![email], |r| {
                r.get(0)
            })
            .optional()?;
        Ok(id)
    }

    fn create_user(&self, email: &str) -> Result<String, StoreError> {
        let id = Uuid::new_v4().to_string();
        self.conn.execute(
            "INSERT INTO users(id, email) VALUES (?1, ?2)",
            params![id, email],
        )?;
        tracing::info!(%email, "created local user");
        Ok(id)
    }

    fn start_session(&self, id: String, email: String) -> Result<Principal, StoreError> {
        self.conn.execute(
            "INSERT INTO session(slot, user_id) VALUES (1, ?1)
             ON CONFLICT(slot) DO UPDATE SET user_id=excluded.user_id",
            params![id],
        )?;
        let principal = Principal { id, email };
        self.listeners.notify(&Some(principal.clone()));
        Ok(principal)
    }
}

fn normalize_email(credentials: &Credentials) -> Result<String, StoreError> {
    let email = credentials.email.trim().to_lowercase();
    if email.is_empty() {
        return Err(StoreError::Rejected {
            status: 400,
            message: "email is required".into(),
        });
    }
    Ok(email)
}

impl RemoteStore for SqliteStore {
    fn current_principal(&self) -> Option<Principal> {
        match self.session_principal() {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(error = %e, "could not read local session");
                None
            }
        }
    }

    fn subscribe(&self) -> Receiver<AuthEvent> {
        self.listeners.subscribe()
    }

    fn sign_up(&self, credentials: &Credentials) -> Result<Option<Principal>, StoreError> {
        let email = normalize_email(credentials)?;
        if self.user_id(&email)?.is_some() {
            return Err(StoreError::Rejected {
                status: 422,
                message: "User already registered".into(),
            });
        }
        let id = self.create_user(&email)?;
        self.start_session(id, email).map(Some)
    }

    fn sign_in(&self, credentials: &Credentials) -> Result<Principal, StoreError> {
        let email = normalize_email(credentials)?;
        let id = match self.user_id(&email)? {
            Some(id) => id,
            None => self.create_user(&email)?,
        };
        self.start_session(id, email)
    }

    fn sign_out(&self) -> Result<(), StoreError> {
        self.conn.execute("DELETE FROM session WHERE slot=1", [])?;
        self.listeners.notify(&None);
        Ok(())
    }

    fn query(&self, filter: &TransactionFilter) -> Result<Vec<Transaction>, StoreError> {
        let me = self.signed_in()?;
        if me.id != filter.owner {
            return Ok(Vec::new());
        }
        let mut stmt = self.conn.prepare(
            "SELECT id, amount, description, category, type, date, user_id, created_at
             FROM transactions
             WHERE user_id=?1 AND date>=?2 AND date<=?3
             ORDER BY date DESC, seq DESC",
        )?;
        let rows = stmt.query_map(
            params![filter.owner, filter.start.to_string(), filter.end.to_string()],
            |r| {
                Ok((
                    r.get::<_, String>(0)?,
                    r.get::<_, String>(1)?,
                    r.get::<_, String>(2)?,
                    r.get::<_, Option<String>>(3)?,
                    r.get::<_, String>(4)?,
                    r.get::<_, NaiveDate>(5)?,
                    r.get::<_, String>(6)?,
                    r.get::<_, DateTime<Utc>>(7)?,
                ))
            },
        )?;

        let mut out = Vec::new();
        for row in rows {
            let (id, amount, description, category, kind, date, owner, created_at) = row?;
            let amount = amount
                .parse::<Decimal>()
                .map_err(|e| StoreError::Decode(format!("amount '{}' on {}: {}", amount, id, e)))?;
            let kind = kind.parse::<TxKind>().map_err(StoreError::Decode)?;
            out.push(Transaction {
                id,
                amount,
                description,
                category,
                r#type: kind,
                date,
                owner,
                created_at: Some(created_at),
            });
        }
        Ok(out)
    }

    fn insert(&self, record: &NewTransaction) -> Result<(), StoreError> {
        let me = self.signed_in()?;
        if me.id != record.owner {
            return Err(StoreError::Rejected {
                status: 403,
                message: "new row violates owner policy for table \"transactions\"".into(),
            });
        }
        let id = Uuid::new_v4().to_string();
        let date = record.date.unwrap_or_else(|| Local::now().date_naive());
        self.conn.execute(
            "INSERT INTO transactions(id, amount, description, category, type, date, user_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                id,
                record.amount.to_string(),
                record.description,
                record.category,
                record.r#type.as_str(),
                date.to_string(),
                record.owner,
                Utc::now(),
            ],
        )?;
        tracing::debug!(%id, %date, "inserted transaction");
        Ok(())
    }

    fn delete(&self, filter: &DeleteFilter) -> Result<usize, StoreError> {
        let me = self.signed_in()?;
        if me.id != filter.owner {
            return Ok(0);
        }
        let n = self.conn.execute(
            "DELETE FROM transactions WHERE id=?1 AND user_id=?2",
            params![filter.id, filter.owner],
        )?;
        Ok(n)
    }
}
