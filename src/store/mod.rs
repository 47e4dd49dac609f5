// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Backend access: authentication plus the `transactions` table.
//!
//! Two implementations ship with the crate. [`SqliteStore`] keeps everything in
//! a local database and is what the CLI uses unless a hosted backend is
//! configured; [`RestStore`] talks to a Supabase-compatible service over HTTP.

pub mod rest;
pub mod sqlite;

use crate::error::StoreError;
use crate::models::{NewTransaction, Principal, Transaction, YearMonth};
use chrono::NaiveDate;
use std::cell::RefCell;
use std::sync::mpsc::{Receiver, Sender, channel};

pub use rest::RestStore;
pub use sqlite::SqliteStore;

/// Pushed to subscribers whenever the signed-in principal changes.
pub type AuthEvent = Option<Principal>;

#[derive(Debug, Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// Rows owned by `owner` dated within `[start, end]`, both ends inclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionFilter {
    pub owner: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl TransactionFilter {
    pub fn for_month(owner: &str, month: YearMonth) -> Self {
        TransactionFilter {
            owner: owner.to_string(),
            start: month.first_day(),
            end: month.last_day(),
        }
    }
}

/// Deletes match on both id and owner, never on id alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteFilter {
    pub id: String,
    pub owner: String,
}

pub trait RemoteStore {
    fn current_principal(&self) -> Option<Principal>;

    /// Registers a listener for sign-in/sign-out changes.
    fn subscribe(&self) -> Receiver<AuthEvent>;

    /// Creates an account. Returns the new principal when the backend signs
    /// it in right away, `None` when the address has to be confirmed first.
    fn sign_up(&self, credentials: &Credentials) -> Result<Option<Principal>, StoreError>;

    fn sign_in(&self, credentials: &Credentials) -> Result<Principal, StoreError>;

    fn sign_out(&self) -> Result<(), StoreError>;

    /// Returns matching rows newest date first; rows sharing a date come back
    /// newest insertion first.
    fn query(&self, filter: &TransactionFilter) -> Result<Vec<Transaction>, StoreError>;

    fn insert(&self, record: &NewTransaction) -> Result<(), StoreError>;

    /// Returns the number of rows removed.
    fn delete(&self, filter: &DeleteFilter) -> Result<usize, StoreError>;
}

/// Fan-out of auth events to every live subscriber.
#[derive(Debug, Default)]
pub(crate) struct Listeners {
    senders: RefCell<Vec<Sender<AuthEvent>>>,
}

impl Listeners {
    pub(crate) fn subscribe(&self) -> Receiver<AuthEvent> {
        let (tx, rx) = channel();
        self.senders.borrow_mut().push(tx);
        rx
    }

    pub(crate) fn notify(&self, event: &AuthEvent) {
        // drop senders whose receiver is gone
        self.senders
            .borrow_mut()
            .retain(|tx| tx.send(event.clone()).is_ok());
    }
}
