use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use scribe_rs_core::{CipherError, Clock, EncryptionContext, IdentityProvider, PayloadCipher};
use scribe_rs_protocol::{AccountId, OperationEvent, OperationSink, OperationState};

/// Identity that always reports the same account (or none).
#[derive(Debug, Clone, Default)]
pub struct StaticIdentity {
    account: Option<AccountId>,
}

impl StaticIdentity {
    pub fn connected(account: impl Into<AccountId>) -> Self {
        Self {
            account: Some(account.into()),
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }
}

impl IdentityProvider for StaticIdentity {
    fn active_account(&self) -> Option<AccountId> {
        self.account.clone()
    }
}

/// Cipher returning `<prefix><plaintext length>`; deterministic for assertions.
#[derive(Debug, Clone)]
pub struct FixedCipher {
    prefix: String,
}

impl FixedCipher {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl Default for FixedCipher {
    fn default() -> Self {
        Self::new("FHE-WRITING-")
    }
}

impl PayloadCipher for FixedCipher {
    fn encrypt(&self, plaintext: &str, _context: &EncryptionContext) -> Result<String, CipherError> {
        Ok(format!("{}{}", self.prefix, plaintext.len()))
    }
}

#[derive(Debug, Clone, Default)]
pub struct FailingCipher;

impl PayloadCipher for FailingCipher {
    fn encrypt(&self, _plaintext: &str, _context: &EncryptionContext) -> Result<String, CipherError> {
        Err(CipherError::Failed("scripted cipher failure".to_string()))
    }
}

/// Clock that hands out the queued instants in order, repeating the last.
pub struct SteppingClock {
    seconds: Mutex<Vec<i64>>,
}

impl SteppingClock {
    /// Each entry is seconds since the epoch.
    pub fn new(seconds: impl IntoIterator<Item = i64>) -> Self {
        let mut seconds: Vec<i64> = seconds.into_iter().collect();
        seconds.reverse();
        Self {
            seconds: Mutex::new(seconds),
        }
    }
}

impl Clock for SteppingClock {
    fn now(&self) -> DateTime<Utc> {
        let mut queue = self.seconds.lock();
        let secs = if queue.len() > 1 {
            queue.pop().unwrap_or_default()
        } else {
            queue.last().copied().unwrap_or_default()
        };
        Utc.timestamp_opt(secs, 0).single().unwrap_or_default()
    }
}

/// Sink that keeps every emitted state.
#[derive(Default)]
pub struct RecordingSink {
    states: Mutex<Vec<OperationState>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn states(&self) -> Vec<OperationState> {
        self.states.lock().clone()
    }
}

impl OperationSink for RecordingSink {
    fn emit(&self, event: OperationEvent) {
        self.states.lock().push(event.state);
    }
}
