// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use super::{AuthEvent, Credentials, DeleteFilter, Listeners, RemoteStore, TransactionFilter};
use crate::error::StoreError;
use crate::models::{NewTransaction, Principal, Transaction};
use crate::utils::http_client;
use reqwest::blocking::{Client, Request, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::fs;
use std::path::PathBuf;
use std::sync::mpsc::Receiver;

const TABLE: &str = "transactions";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredSession {
    access_token: String,
    user: Principal,
}

#[derive(Debug, Deserialize)]
struct AuthUser {
    id: String,
    #[serde(default)]
    email: Option<String>,
}

impl From<AuthUser> for Principal {
    fn from(u: AuthUser) -> Self {
        Principal {
            id: u.id,
            email: u.email.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    user: AuthUser,
}

/// `/signup` answers with a session when the project auto-confirms new users
/// and with the bare user when a confirmation mail went out.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SignUpResponse {
    Session(TokenResponse),
    Pending(AuthUser),
}

/// Client for a Supabase-compatible backend (GoTrue auth + PostgREST tables).
pub struct RestStore {
    client: Client,
    base_url: String,
    anon_key: String,
    session_file: Option<PathBuf>,
    session: RefCell<Option<StoredSession>>,
    listeners: Listeners,
}

impl RestStore {
    /// Builds the client and restores a persisted session from `session_file`,
    /// if one exists. No network traffic happens here.
    pub fn new(
        base_url: &str,
        anon_key: &str,
        session_file: Option<PathBuf>,
    ) -> Result<Self, StoreError> {
        let session = match &session_file {
            Some(path) if path.exists() => {
                let raw = fs::read_to_string(path)?;
                match serde_json::from_str::<StoredSession>(&raw) {
                    Ok(s) => Some(s),
                    Err(e) => {
                        tracing::warn!(error = %e, path = %path.display(), "ignoring unreadable session file");
                        None
                    }
                }
            }
            _ => None,
        };
        Ok(RestStore {
            client: http_client()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
            session_file,
            session: RefCell::new(session),
            listeners: Listeners::default(),
        })
    }

    /// Re-checks the persisted token with the auth service. A rejected token
    /// clears the session; transport errors leave it untouched.
    pub fn verify_session(&self) -> Result<Option<Principal>, StoreError> {
        let Some(token) = self.token() else {
            return Ok(None);
        };
        let req = self
            .authed(self.client.get(self.auth_url("user")), &token)
            .build()?;
        let resp = self.client.execute(req)?;
        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            tracing::info!("stored session was rejected; signing out locally");
            self.set_session(None)?;
            self.listeners.notify(&None);
            return Ok(None);
        }
        let user: AuthUser = check(resp)?.json()?;
        Ok(Some(user.into()))
    }

    fn token(&self) -> Option<String> {
        self.session.borrow().as_ref().map(|s| s.access_token.clone())
    }

    fn require_token(&self) -> Result<String, StoreError> {
        self.token().ok_or(StoreError::NotSignedIn)
    }

    fn set_session(&self, session: Option<StoredSession>) -> Result<(), StoreError> {
        if let Some(path) = &self.session_file {
            match &session {
                Some(s) => {
                    if let Some(dir) = path.parent() {
                        fs::create_dir_all(dir)?;
                    }
                    fs::write(path, serde_json::to_string_pretty(s)?)?;
                }
                None => {
                    if path.exists() {
                        fs::remove_file(path)?;
                    }
                }
            }
        }
        *self.session.borrow_mut() = session;
        Ok(())
    }

    fn start_session(&self, token: TokenResponse) -> Result<Principal, StoreError> {
        let principal: Principal = token.user.into();
        self.set_session(Some(StoredSession {
            access_token: token.access_token,
            user: principal.clone(),
        }))?;
        self.listeners.notify(&Some(principal.clone()));
        Ok(principal)
    }

    fn revoke(&self, token: &str) -> Result<(), StoreError> {
        let req = self
            .authed(self.client.post(self.auth_url("logout")), token)
            .build()?;
        check(self.client.execute(req)?)?;
        Ok(())
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path)
    }

    fn table_url(&self) -> String {
        format!("{}/rest/v1/{}", self.base_url, TABLE)
    }

    fn authed(&self, rb: RequestBuilder, token: &str) -> RequestBuilder {
        rb.header("apikey", &self.anon_key).bearer_auth(token)
    }

    fn credentials_request(
        &self,
        rb: RequestBuilder,
        credentials: &Credentials,
    ) -> Result<Request, StoreError> {
        let req = rb
            .header("apikey", &self.anon_key)
            .json(&serde_json::json!({
                "email": credentials.email.trim(),
                "password": credentials.password,
            }))
            .build()?;
        Ok(req)
    }

    pub(crate) fn sign_up_request(&self, credentials: &Credentials) -> Result<Request, StoreError> {
        self.credentials_request(self.client.post(self.auth_url("signup")), credentials)
    }

    pub(crate) fn sign_in_request(&self, credentials: &Credentials) -> Result<Request, StoreError> {
        let rb = self
            .client
            .post(self.auth_url("token"))
            .query(&[("grant_type", "password")]);
        self.credentials_request(rb, credentials)
    }

    pub(crate) fn query_request(
        &self,
        filter: &TransactionFilter,
        token: &str,
    ) -> Result<Request, StoreError> {
        let req = self
            .authed(self.client.get(self.table_url()), token)
            .query(&[
                ("select", "*".to_string()),
                ("user_id", format!("eq.{}", filter.owner)),
                ("date", format!("gte.{}", filter.start)),
                ("date", format!("lte.{}", filter.end)),
                ("order", "date.desc,created_at.desc".to_string()),
            ])
            .build()?;
        Ok(req)
    }

    pub(crate) fn delete_request(
        &self,
        filter: &DeleteFilter,
        token: &str,
    ) -> Result<Request, StoreError> {
        let req = self
            .authed(self.client.delete(self.table_url()), token)
            .header("Prefer", "return=representation")
            .query(&[
                ("id", format!("eq.{}", filter.id)),
                ("user_id", format!("eq.{}", filter.owner)),
            ])
            .build()?;
        Ok(req)
    }
}

/// Turns a non-2xx response into [`StoreError::Rejected`], pulling the
/// message out of the JSON error body when there is one.
fn check(resp: Response) -> Result<Response, StoreError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().unwrap_or_default();
    Err(StoreError::Rejected {
        status: status.as_u16(),
        message: error_message(&body),
    })
}

fn error_message(body: &str) -> String {
    let parsed: Option<serde_json::Value> = serde_json::from_str(body).ok();
    parsed
        .as_ref()
        .and_then(|v| {
            ["message", "msg", "error_description", "error"]
                .iter()
                .find_map(|k| v.get(*k).and_then(|m| m.as_str()))
        })
        .map(str::to_string)
        .unwrap_or_else(|| body.trim().to_string())
}

impl RemoteStore for RestStore {
    fn current_principal(&self) -> Option<Principal> {
        self.session.borrow().as_ref().map(|s| s.user.clone())
    }

    fn subscribe(&self) -> Receiver<AuthEvent> {
        self.listeners.subscribe()
    }

    fn sign_up(&self, credentials: &Credentials) -> Result<Option<Principal>, StoreError> {
        let req = self.sign_up_request(credentials)?;
        let resp: SignUpResponse = check(self.client.execute(req)?)?.json()?;
        match resp {
            SignUpResponse::Session(token) => self.start_session(token).map(Some),
            SignUpResponse::Pending(user) => {
                tracing::info!(id = %user.id, "account created; awaiting email confirmation");
                Ok(None)
            }
        }
    }

    fn sign_in(&self, credentials: &Credentials) -> Result<Principal, StoreError> {
        let req = self.sign_in_request(credentials)?;
        let token: TokenResponse = check(self.client.execute(req)?)?.json()?;
        self.start_session(token)
    }

    fn sign_out(&self) -> Result<(), StoreError> {
        let remote = match self.token() {
            Some(token) => self.revoke(&token),
            None => Ok(()),
        };
        // the local session is dropped even if the server call failed
        self.set_session(None)?;
        self.listeners.notify(&None);
        remote
    }

    fn query(&self, filter: &TransactionFilter) -> Result<Vec<Transaction>, StoreError> {
        let token = self.require_token()?;
        let req = self.query_request(filter, &token)?;
        let rows: Vec<Transaction> = check(self.client.execute(req)?)?.json()?;
        Ok(rows)
    }

    fn insert(&self, record: &NewTransaction) -> Result<(), StoreError> {
        let token = self.require_token()?;
        let req = self
            .authed(self.client.post(self.table_url()), &token)
            .header("Prefer", "return=minimal")
            .json(&[record])
            .build()?;
        check(self.client.execute(req)?)?;
        Ok(())
    }

    fn delete(&self, filter: &DeleteFilter) -> Result<usize, StoreError> {
        let token = self.require_token()?;
        let req = self.delete_request(filter, &token)?;
        let removed: Vec<serde_json::Value> = check(self.client.execute(req)?)?.json()?;
        Ok(removed.len())
    }
}
