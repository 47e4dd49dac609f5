// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::error::LedgerError;
use crate::ledger::{AddTransaction, Ledger};
use crate::models::{Principal, YearMonth};
use crate::session::SessionHolder;
use crate::store::{Credentials, RemoteStore};

/// Owns the store, the session and the ledger, and is the only way to change
/// any of them. Presentation code reads through the accessors and calls the
/// operations below.
pub struct App<S: RemoteStore> {
    store: S,
    session: SessionHolder,
    ledger: Ledger,
}

impl<S: RemoteStore> App<S> {
    /// Subscribes to auth changes and, if someone is already signed in, loads
    /// `month`.
    pub fn start(store: S, month: YearMonth) -> Self {
        let session = SessionHolder::attach(&store);
        let mut app = App {
            store,
            session,
            ledger: Ledger::new(month),
        };
        if app.session.is_signed_in() {
            // failures surface as notices
            let _ = app.ledger.reload(&app.store);
        }
        app
    }

    pub fn session(&self) -> &SessionHolder {
        &self.session
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut Ledger {
        &mut self.ledger
    }

    /// Applies pending auth changes: a sign-in reloads the selected month,
    /// a sign-out empties the ledger.
    pub fn sync_session(&mut self) {
        while let Some(event) = self.session.poll() {
            match event {
                Some(_) => {
                    let _ = self.ledger.reload(&self.store);
                }
                None => self.ledger.clear(),
            }
        }
    }

    /// Registers a new account. A backend that signs the account in right
    /// away triggers the same reload as [`App::sign_in`].
    pub fn sign_up(
        &mut self,
        credentials: &Credentials,
    ) -> Result<Option<Principal>, LedgerError> {
        let out = match self.store.sign_up(credentials) {
            Ok(p) => {
                tracing::info!(email = %credentials.email.trim(), "account created");
                self.ledger.notifier_mut().success("Account created successfully");
                Ok(p)
            }
            Err(e) => {
                tracing::error!(error = %e, "Error creating account");
                self.ledger.notifier_mut().error("Failed to create account");
                Err(LedgerError::RemoteFailure(e))
            }
        };
        self.sync_session();
        out
    }

    pub fn sign_in(&mut self, credentials: &Credentials) -> Result<Principal, LedgerError> {
        let out = match self.store.sign_in(credentials) {
            Ok(p) => {
                tracing::info!(email = %p.email, "signed in");
                self.ledger.notifier_mut().success("Signed in successfully");
                Ok(p)
            }
            Err(e) => {
                tracing::error!(error = %e, "Error signing in");
                self.ledger.notifier_mut().error("Failed to sign in");
                Err(LedgerError::RemoteFailure(e))
            }
        };
        self.sync_session();
        out
    }

    pub fn sign_out(&mut self) -> Result<(), LedgerError> {
        let out = match self.store.sign_out() {
            Ok(()) => {
                self.ledger.notifier_mut().success("Signed out successfully");
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, "Error signing out");
                self.ledger.notifier_mut().error("Failed to sign out");
                Err(LedgerError::RemoteFailure(e))
            }
        };
        self.sync_session();
        out
    }

    pub fn select_month(&mut self, month: YearMonth) -> Result<(), LedgerError> {
        self.ledger.select_month(&self.store, month)
    }

    pub fn reload(&mut self) -> Result<(), LedgerError> {
        self.ledger.reload(&self.store)
    }

    pub fn add(&mut self, input: AddTransaction) -> Result<(), LedgerError> {
        self.ledger.add(&self.store, input)
    }

    pub fn delete(&mut self, id: &str) -> Result<bool, LedgerError> {
        self.ledger.delete(&self.store, id)
    }
}
