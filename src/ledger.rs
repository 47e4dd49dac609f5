// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Client-side view of one month of transactions.
//!
//! The ledger never edits its cached rows in place. Every successful add or
//! delete is followed by a full reload of the selected month, and a reload
//! replaces the cache wholesale. Each load is tagged with a generation number;
//! only the most recently issued load may write the cache, so a slow response
//! for an earlier month can't overwrite a newer one.

use crate::aggregate::{self, Aggregates};
use crate::error::{LedgerError, StoreError};
use crate::models::{NewTransaction, Principal, Transaction, TxKind, YearMonth};
use crate::notify::{Notice, Notifier};
use crate::store::{DeleteFilter, RemoteStore, TransactionFilter};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadState {
    Uninitialized,
    Loading,
    Ready,
    Error,
}

/// Handle for one outstanding load; pass it back to [`Ledger::finish_load`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTicket {
    generation: u64,
    month: YearMonth,
    filter: TransactionFilter,
}

impl LoadTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn month(&self) -> YearMonth {
        self.month
    }

    pub fn filter(&self) -> &TransactionFilter {
        &self.filter
    }
}

/// Input of the add form. `amount` may carry either sign; `kind` decides.
#[derive(Debug, Clone)]
pub struct AddTransaction {
    pub amount: Decimal,
    pub description: String,
    pub category: String,
    pub kind: TxKind,
    pub date: Option<NaiveDate>,
}

#[derive(Debug)]
pub struct Ledger {
    month: YearMonth,
    transactions: Vec<Transaction>,
    loaded_month: Option<YearMonth>,
    state: LoadState,
    issued: u64,
    notices: Notifier,
}

impl Ledger {
    pub fn new(month: YearMonth) -> Self {
        Ledger {
            month,
            transactions: Vec::new(),
            loaded_month: None,
            state: LoadState::Uninitialized,
            issued: 0,
            notices: Notifier::default(),
        }
    }

    /// The month selected by the user.
    pub fn month(&self) -> YearMonth {
        self.month
    }

    /// The month the cached rows belong to, if anything has loaded yet.
    pub fn loaded_month(&self) -> Option<YearMonth> {
        self.loaded_month
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn state(&self) -> LoadState {
        self.state
    }

    pub fn is_loading(&self) -> bool {
        self.state == LoadState::Loading
    }

    pub fn notices(&self) -> &[Notice] {
        self.notices.pending()
    }

    pub fn notifier_mut(&mut self) -> &mut Notifier {
        &mut self.notices
    }

    pub fn drain_notices(&mut self) -> Vec<Notice> {
        self.notices.drain()
    }

    /// Recomputed on every call; the cache is one month of rows.
    pub fn aggregates(&self) -> Aggregates {
        aggregate::derive(&self.transactions)
    }

    /// Drops the cache and invalidates any outstanding load.
    pub fn clear(&mut self) {
        self.issued += 1;
        self.transactions.clear();
        self.loaded_month = None;
        self.state = LoadState::Uninitialized;
    }

    fn principal<S: RemoteStore + ?Sized>(
        &mut self,
        store: &S,
        failure: &str,
    ) -> Result<Principal, LedgerError> {
        match store.current_principal() {
            Some(p) => Ok(p),
            None => {
                tracing::error!("{}: not authenticated", failure);
                self.notices.error(failure);
                Err(LedgerError::Unauthenticated)
            }
        }
    }

    /// Starts a load of `month`. Fails without touching the cache when nobody
    /// is signed in.
    pub fn begin_load<S: RemoteStore + ?Sized>(
        &mut self,
        store: &S,
        month: YearMonth,
    ) -> Result<LoadTicket, LedgerError> {
        let me = self.principal(store, "Failed to load transactions")?;
        self.issued += 1;
        self.state = LoadState::Loading;
        tracing::debug!(generation = self.issued, %month, "load started");
        Ok(LoadTicket {
            generation: self.issued,
            month,
            filter: TransactionFilter::for_month(&me.id, month),
        })
    }

    /// Applies the outcome of a load. Completions for anything but the most
    /// recently issued ticket are dropped.
    pub fn finish_load(
        &mut self,
        ticket: LoadTicket,
        result: Result<Vec<Transaction>, StoreError>,
    ) -> Result<(), LedgerError> {
        if ticket.generation != self.issued {
            match &result {
                Ok(rows) => tracing::debug!(
                    generation = ticket.generation,
                    latest = self.issued,
                    rows = rows.len(),
                    "discarding stale load"
                ),
                Err(e) => tracing::warn!(
                    generation = ticket.generation,
                    error = %e,
                    "stale load failed"
                ),
            }
            return Ok(());
        }
        match result {
            Ok(rows) => {
                tracing::debug!(month = %ticket.month, rows = rows.len(), "load finished");
                self.transactions = rows;
                self.loaded_month = Some(ticket.month);
                self.state = LoadState::Ready;
                Ok(())
            }
            Err(e) => {
                tracing::error!(month = %ticket.month, error = %e, "Error fetching transactions");
                self.notices.error("Failed to load transactions");
                self.state = LoadState::Error;
                Err(LedgerError::RemoteFailure(e))
            }
        }
    }

    pub fn load<S: RemoteStore + ?Sized>(
        &mut self,
        store: &S,
        month: YearMonth,
    ) -> Result<(), LedgerError> {
        let ticket = self.begin_load(store, month)?;
        let result = store.query(ticket.filter());
        self.finish_load(ticket, result)
    }

    /// Loads the selected month again.
    pub fn reload<S: RemoteStore + ?Sized>(&mut self, store: &S) -> Result<(), LedgerError> {
        self.load(store, self.month)
    }

    pub fn select_month<S: RemoteStore + ?Sized>(
        &mut self,
        store: &S,
        month: YearMonth,
    ) -> Result<(), LedgerError> {
        self.month = month;
        self.load(store, month)
    }

    pub fn add<S: RemoteStore + ?Sized>(
        &mut self,
        store: &S,
        input: AddTransaction,
    ) -> Result<(), LedgerError> {
        if let Err(e) = validate(&input) {
            tracing::error!(error = %e, "Error adding transaction");
            self.notices.error(e.to_string());
            return Err(e);
        }
        let me = self.principal(store, "Failed to add transaction")?;

        let record = NewTransaction {
            amount: input.kind.signed(input.amount),
            description: input.description.trim().to_string(),
            category: input.category.trim().to_string(),
            r#type: input.kind,
            owner: me.id,
            date: input.date,
        };
        if let Err(e) = store.insert(&record) {
            tracing::error!(error = %e, "Error adding transaction");
            self.notices.error("Failed to add transaction");
            return Err(e.into());
        }
        tracing::info!(amount = %record.amount, category = %record.category, "transaction added");
        self.notices.success("Transaction added successfully");
        self.refresh_after_mutation(store);
        Ok(())
    }

    /// Returns whether a row was removed. A miss leaves the cache as is.
    pub fn delete<S: RemoteStore + ?Sized>(
        &mut self,
        store: &S,
        id: &str,
    ) -> Result<bool, LedgerError> {
        let me = self.principal(store, "Failed to delete transaction")?;
        let filter = DeleteFilter {
            id: id.to_string(),
            owner: me.id,
        };
        match store.delete(&filter) {
            Ok(0) => {
                tracing::warn!(%id, "no owned transaction matched");
                self.notices.error("Transaction not found");
                Ok(false)
            }
            Ok(_) => {
                tracing::info!(%id, "transaction deleted");
                self.notices.success("Transaction deleted");
                self.refresh_after_mutation(store);
                Ok(true)
            }
            Err(e) => {
                tracing::error!(%id, error = %e, "Error deleting transaction");
                self.notices.error("Failed to delete transaction");
                Err(e.into())
            }
        }
    }

    fn refresh_after_mutation<S: RemoteStore + ?Sized>(&mut self, store: &S) {
        // a failed reload has already been reported through the notifier
        if let Err(e) = self.reload(store) {
            tracing::debug!(error = %e, "reload after mutation failed");
        }
    }
}

/// Largest magnitude accepted for a single transaction.
pub fn max_amount() -> Decimal {
    Decimal::new(999_999_999_999_99, 2)
}

fn validate(input: &AddTransaction) -> Result<(), LedgerError> {
    if input.amount.abs() > max_amount() {
        return Err(LedgerError::ValidationFailure(format!(
            "amount must not exceed {}",
            max_amount()
        )));
    }
    if input.description.trim().is_empty() {
        return Err(LedgerError::ValidationFailure("description is required".into()));
    }
    if input.category.trim().is_empty() {
        return Err(LedgerError::ValidationFailure("category is required".into()));
    }
    Ok(())
}
