// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Client-side sign-in session.
//!
//! Holds the token from the most recent sign-in. A new sign-in replaces the
//! previous one; sign-out clears it.

use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};

use crate::clock::SharedClock;

/// Token issued by a successful sign-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionToken {
    pub wallet: String,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Shared, explicitly owned session. Clones see the same token.
#[derive(Clone)]
pub struct TokenSession {
    current: Arc<RwLock<Option<SessionToken>>>,
    clock: SharedClock,
}

impl std::fmt::Debug for TokenSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSession")
            .field("wallet", &self.snapshot().map(|s| s.wallet))
            .finish_non_exhaustive()
    }
}

impl TokenSession {
    pub fn new(clock: SharedClock) -> Self {
        Self {
            current: Arc::new(RwLock::new(None)),
            clock,
        }
    }

    /// Replace whatever is stored with a new sign-in.
    pub fn store(&self, token: SessionToken) {
        match self.current.write() {
            Ok(mut guard) => *guard = Some(token),
            Err(poisoned) => *poisoned.into_inner() = Some(token),
        }
    }

    /// Sign out.
    pub fn clear(&self) {
        match self.current.write() {
            Ok(mut guard) => *guard = None,
            Err(poisoned) => *poisoned.into_inner() = None,
        }
    }

    /// Stored token, expired or not.
    pub fn snapshot(&self) -> Option<SessionToken> {
        match self.current.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// True when there is no token or its expiry has passed.
    pub fn is_expired(&self) -> bool {
        self.snapshot()
            .is_none_or(|session| self.clock.now() > session.expires_at)
    }

    /// The stored token if it is still valid.
    pub fn active(&self) -> Option<SessionToken> {
        let session = self.snapshot()?;
        (self.clock.now() <= session.expires_at).then_some(session)
    }
}
