// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::models::Principal;
use crate::store::{AuthEvent, RemoteStore};
use std::sync::mpsc::{Receiver, TryRecvError};

/// Tracks who is signed in, following the store's change notifications.
///
/// The subscription is made once, in [`SessionHolder::attach`], and is never
/// renewed. If the store drops its end the holder keeps the last principal it
/// saw.
#[derive(Debug)]
pub struct SessionHolder {
    principal: Option<Principal>,
    events: Receiver<AuthEvent>,
    disconnected: bool,
}

impl SessionHolder {
    pub fn attach<S: RemoteStore + ?Sized>(store: &S) -> Self {
        let events = store.subscribe();
        SessionHolder {
            principal: store.current_principal(),
            events,
            disconnected: false,
        }
    }

    pub fn current(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }

    pub fn is_signed_in(&self) -> bool {
        self.principal.is_some()
    }

    /// Takes the next pending change, if any, and applies it.
    pub fn poll(&mut self) -> Option<AuthEvent> {
        if self.disconnected {
            return None;
        }
        match self.events.try_recv() {
            Ok(event) => {
                tracing::debug!(signed_in = event.is_some(), "auth state changed");
                self.principal = event.clone();
                Some(event)
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                tracing::warn!("auth change channel closed; keeping last known session");
                self.disconnected = true;
                None
            }
        }
    }
}
