//! The boundary between the action contract and the token contract.
//!
//! The token contract owns the authoritative `Operators` ledger. The action
//! contract reads it and pushes payoffs back through an
//! [`InterContractInvoker`]; [`TokenContractEndpoint`] is the in-process
//! implementation of the token contract's side of that call.

use std::sync::Arc;

use ocl_store::{InterContractInvoker, InvokeError, LedgerStore, LedgerTxn};

use crate::codec::{self, CollectionKey, ABSENT};
use crate::error::GovernanceError;
use crate::ledger::TokenLedger;

pub const GET: &str = "get";
pub const GET_VERSIONED: &str = "getVersioned";
pub const UPDATE_LEDGER: &str = "updateLedger";
const UPDATE_LEDGER_LEGACY: &str = "updateOCLtoken";

const VERSION_LEN: usize = 8;

/// Validate a balances payload and commit it as the new `Operators` collection.
///
/// With `seen`, the write only lands if `Operators` is still at that version;
/// otherwise it fails with a store conflict.
pub(crate) fn replace_ledger(
    store: &dyn LedgerStore,
    payload: &[u8],
    seen: Option<u64>,
) -> Result<TokenLedger, GovernanceError> {
    let ledger = codec::decode_ledger(Some(payload))?;
    let mut txn = LedgerTxn::begin(store);
    if let Some(version) = seen {
        txn.expect_version(CollectionKey::Operators.as_str(), version);
    }
    codec::save_ledger(&mut txn, &ledger)?;
    txn.commit()?;
    Ok(ledger)
}

// `getVersioned` replies with the big-endian version followed by the raw value.
fn encode_versioned(version: u64, value: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(VERSION_LEN + value.len());
    out.extend_from_slice(&version.to_be_bytes());
    out.extend_from_slice(value);
    out
}

fn decode_versioned(bytes: &[u8]) -> Option<(u64, &[u8])> {
    if bytes.len() < VERSION_LEN {
        return None;
    }
    let (version, value) = bytes.split_at(VERSION_LEN);
    Some((u64::from_be_bytes(version.try_into().ok()?), value))
}

/// Serves `get`, `getVersioned` and `updateLedger` for a token contract namespace.
pub struct TokenContractEndpoint {
    store: Arc<dyn LedgerStore>,
    contract: String,
    channel: String,
}

impl TokenContractEndpoint {
    pub fn new(store: Arc<dyn LedgerStore>, contract: impl Into<String>, channel: impl Into<String>) -> Self {
        Self {
            store,
            contract: contract.into(),
            channel: channel.into(),
        }
    }

    fn rejected(&self, operation: &str, reason: impl ToString) -> InvokeError {
        InvokeError::Rejected {
            target: self.contract.clone(),
            operation: operation.to_string(),
            reason: reason.to_string(),
        }
    }

    fn failed(&self, operation: &str, error: GovernanceError) -> InvokeError {
        match error {
            GovernanceError::Store(source) => InvokeError::Store {
                target: self.contract.clone(),
                operation: operation.to_string(),
                source,
            },
            other => self.rejected(operation, other),
        }
    }

    fn first_arg<'a>(&self, operation: &str, args: &'a [Vec<u8>]) -> Result<&'a [u8], InvokeError> {
        args.first()
            .map(Vec::as_slice)
            .ok_or_else(|| self.rejected(operation, "missing argument"))
    }

    fn key_arg<'a>(&self, operation: &str, args: &'a [Vec<u8>]) -> Result<&'a str, InvokeError> {
        std::str::from_utf8(self.first_arg(operation, args)?).map_err(|e| self.rejected(operation, e))
    }

    fn version_arg(&self, operation: &str, args: &[Vec<u8>]) -> Result<Option<u64>, InvokeError> {
        let Some(raw) = args.get(1) else {
            return Ok(None);
        };
        std::str::from_utf8(raw)
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Some)
            .ok_or_else(|| self.rejected(operation, "malformed expected version"))
    }
}

impl InterContractInvoker for TokenContractEndpoint {
    fn invoke(
        &self,
        target: &str,
        channel: &str,
        operation: &str,
        args: &[Vec<u8>],
    ) -> Result<Vec<u8>, InvokeError> {
        if target != self.contract || channel != self.channel {
            return Err(InvokeError::UnknownContract {
                target: target.to_string(),
                channel: channel.to_string(),
            });
        }
        match operation {
            GET => {
                let key = self.key_arg(operation, args)?;
                let value = self
                    .store
                    .get_value(key)
                    .map_err(|e| self.failed(operation, e.into()))?;
                Ok(value.unwrap_or_else(|| ABSENT.to_vec()))
            }
            GET_VERSIONED => {
                let key = self.key_arg(operation, args)?;
                let found = self
                    .store
                    .get(key)
                    .map_err(|e| self.failed(operation, e.into()))?;
                Ok(match found {
                    Some(v) => encode_versioned(v.version, &v.value),
                    None => encode_versioned(0, ABSENT),
                })
            }
            UPDATE_LEDGER | UPDATE_LEDGER_LEGACY => {
                let payload = self.first_arg(operation, args)?;
                let seen = self.version_arg(operation, args)?;
                let ledger = replace_ledger(self.store.as_ref(), payload, seen)
                    .map_err(|e| self.failed(operation, e))?;
                tracing::debug!(organisations = ledger.registered_count(), "token ledger synchronised");
                Ok(b"true".to_vec())
            }
            other => Err(InvokeError::UnknownOperation {
                target: self.contract.clone(),
                operation: other.to_string(),
            }),
        }
    }
}

/// Balances read from the token contract and the version they were read at.
#[derive(Clone, Debug, PartialEq)]
pub struct LedgerSnapshot {
    pub ledger: TokenLedger,
    pub version: u64,
}

/// The action contract's view of the remote token ledger.
pub struct LinkedLedger<'a> {
    invoker: &'a dyn InterContractInvoker,
    contract: &'a str,
    channel: &'a str,
}

impl<'a> LinkedLedger<'a> {
    pub fn new(invoker: &'a dyn InterContractInvoker, contract: &'a str, channel: &'a str) -> Self {
        Self {
            invoker,
            contract,
            channel,
        }
    }

    /// Read the current balances from the token contract.
    pub fn fetch(&self) -> Result<LedgerSnapshot, GovernanceError> {
        let key = CollectionKey::Operators.as_str().as_bytes().to_vec();
        let bytes = self
            .invoker
            .invoke(self.contract, self.channel, GET_VERSIONED, &[key])?;
        let (version, value) = decode_versioned(&bytes).ok_or_else(|| {
            InvokeError::Transport(format!("truncated {GET_VERSIONED} reply from {}", self.contract))
        })?;
        let ledger = if value == ABSENT {
            TokenLedger::new()
        } else {
            codec::decode_ledger(Some(value))?
        };
        Ok(LedgerSnapshot { ledger, version })
    }

    /// Replace the token contract's balances with `ledger`, provided they
    /// are still at the `seen` version.
    pub fn publish(&self, ledger: &TokenLedger, seen: u64) -> Result<(), GovernanceError> {
        let payload = codec::encode_ledger(ledger)?;
        let seen = seen.to_string().into_bytes();
        self.invoker
            .invoke(self.contract, self.channel, UPDATE_LEDGER, &[payload, seen])?;
        Ok(())
    }
}
