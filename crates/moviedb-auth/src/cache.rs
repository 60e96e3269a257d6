//! Single-slot token cache with in-flight de-duplication.
//!
//! The slot moves between three states:
//!
//! ```text
//! Empty ──fetch──▶ Pending ──ok──▶ Ready
//!   ▲                 │
//!   └──────err────────┘
//! ```
//!
//! Callers arriving while a fetch is pending await the same shared future
//! instead of starting their own exchange. The slot lock is never held across
//! an await point.

use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::Utc;
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use tracing::debug;

use crate::credentials::DatabaseAuthToken;
use crate::error::{AuthError, AuthResult};

/// Default margin before expiry at which a token is refreshed.
pub const DEFAULT_REFRESH_SKEW: Duration = Duration::from_secs(60);

/// When a cached token is considered stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RefreshPolicy {
    /// Reuse the cached token for the lifetime of the cache.
    #[default]
    Never,
    /// Fetch a new token once the cached one is within `skew` of expiry.
    BeforeExpiry { skew: Duration },
}

impl RefreshPolicy {
    fn is_stale(&self, token: &DatabaseAuthToken) -> bool {
        match self {
            RefreshPolicy::Never => false,
            RefreshPolicy::BeforeExpiry { skew } => {
                let skew = chrono::Duration::from_std(*skew).unwrap_or_else(|_| chrono::Duration::zero());
                token.expires_within(Utc::now(), skew)
            }
        }
    }
}

impl FromStr for RefreshPolicy {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "never" => Ok(RefreshPolicy::Never),
            "expiry" => Ok(RefreshPolicy::BeforeExpiry {
                skew: DEFAULT_REFRESH_SKEW,
            }),
            other => Err(AuthError::Config(format!(
                "unknown token refresh policy: {other} (expected \"never\" or \"expiry\")"
            ))),
        }
    }
}

type TokenFuture = Shared<BoxFuture<'static, AuthResult<DatabaseAuthToken>>>;

enum Slot {
    Empty,
    Pending { id: u64, future: TokenFuture },
    Ready(DatabaseAuthToken),
}

/// Holds at most one database auth token, or one fetch producing it.
pub struct TokenCache {
    slot: Mutex<Slot>,
    policy: RefreshPolicy,
    next_id: AtomicU64,
}

impl TokenCache {
    /// Create an empty cache.
    pub fn new(policy: RefreshPolicy) -> Self {
        Self {
            slot: Mutex::new(Slot::Empty),
            policy,
            next_id: AtomicU64::new(0),
        }
    }

    /// The refresh policy in use.
    pub fn policy(&self) -> RefreshPolicy {
        self.policy
    }

    /// The cached token, if one is ready.
    pub fn peek(&self) -> Option<DatabaseAuthToken> {
        match &*self.slot.lock() {
            Slot::Ready(token) => Some(token.clone()),
            _ => None,
        }
    }

    /// Return the cached token, or run `fetch` to produce one.
    ///
    /// `fetch` is only invoked when the slot is empty (or stale); concurrent
    /// callers share its result. A failed fetch leaves the slot empty.
    pub async fn get_or_fetch<F>(&self, fetch: F) -> AuthResult<DatabaseAuthToken>
    where
        F: FnOnce() -> BoxFuture<'static, AuthResult<DatabaseAuthToken>>,
    {
        let (id, future) = {
            let mut slot = self.slot.lock();
            let pending = match &*slot {
                Slot::Ready(token) if !self.policy.is_stale(token) => return Ok(token.clone()),
                Slot::Pending { id, future } => Some((*id, future.clone())),
                _ => None,
            };
            match pending {
                Some(pending) => pending,
                None => {
                    let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                    let future = fetch().shared();
                    debug!(fetch_id = id, "Token cache miss, starting fetch");
                    *slot = Slot::Pending {
                        id,
                        future: future.clone(),
                    };
                    (id, future)
                }
            }
        };

        let result = future.await;
        self.settle(id, &result);
        result
    }

    fn settle(&self, id: u64, result: &AuthResult<DatabaseAuthToken>) {
        let mut slot = self.slot.lock();
        let owns_slot = matches!(&*slot, Slot::Pending { id: pending, .. } if *pending == id);
        if !owns_slot {
            return;
        }
        *slot = match result {
            Ok(token) => Slot::Ready(token.clone()),
            Err(_) => Slot::Empty,
        };
    }
}

impl Default for TokenCache {
    fn default() -> Self {
        Self::new(RefreshPolicy::Never)
    }
}
