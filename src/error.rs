// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use thiserror::Error;

/// Failures raised by a [`crate::store::RemoteStore`] implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("store rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("could not decode store data: {0}")]
    Decode(String),
    #[error("session file error: {0}")]
    Io(#[from] std::io::Error),
    #[error("not signed in")]
    NotSignedIn,
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Decode(e.to_string())
    }
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Not authenticated")]
    Unauthenticated,
    #[error(transparent)]
    RemoteFailure(#[from] StoreError),
    #[error("Invalid transaction: {0}")]
    ValidationFailure(String),
}
