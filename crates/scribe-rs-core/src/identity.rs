//! Active account lookup gating ledger writes.

use crate::error::StoreError;
use log::info;
use parking_lot::RwLock;
use scribe_rs_protocol::AccountId;

/// Source of the account that signs ledger writes. Reads need no identity.
pub trait IdentityProvider: Send + Sync {
    /// The connected account, if any.
    fn active_account(&self) -> Option<AccountId>;
}

/// Resolve the signing account or fail before any write is attempted.
pub fn require_account(identity: &dyn IdentityProvider) -> Result<AccountId, StoreError> {
    identity
        .active_account()
        .filter(|account| !account.trim().is_empty())
        .ok_or(StoreError::IdentityRequired)
}

/// In-process session holding the connected account.
#[derive(Debug, Default)]
pub struct SessionIdentity {
    account: RwLock<Option<AccountId>>,
}

impl SessionIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    /// Session that starts connected as `account`.
    pub fn connected(account: impl Into<AccountId>) -> Self {
        Self {
            account: RwLock::new(Some(account.into())),
        }
    }

    pub fn connect(&self, account: impl Into<AccountId>) {
        let account = account.into();
        info!("account connected (account={})", account);
        *self.account.write() = Some(account);
    }

    pub fn disconnect(&self) {
        if let Some(account) = self.account.write().take() {
            info!("account disconnected (account={})", account);
        }
    }
}

impl IdentityProvider for SessionIdentity {
    fn active_account(&self) -> Option<AccountId> {
        self.account.read().clone()
    }
}
