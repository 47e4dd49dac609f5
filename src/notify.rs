// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Success,
    Error,
}

/// A short, user-facing message shown once and then discarded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: Level,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct Notifier {
    pending: Vec<Notice>,
}

impl Notifier {
    pub fn success(&mut self, message: impl Into<String>) {
        self.pending.push(Notice {
            level: Level::Success,
            message: message.into(),
        });
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.pending.push(Notice {
            level: Level::Error,
            message: message.into(),
        });
    }

    pub fn pending(&self) -> &[Notice] {
        &self.pending
    }

    pub fn drain(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.pending)
    }
}
