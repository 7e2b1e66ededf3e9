//! Typed load/store of the ledger collections.
//!
//! Every collection is a JSON array stored whole under a fixed key. Loading
//! validates both the shape and the collection invariants, so corrupt blobs
//! fail with a [`CodecError`] instead of turning into default values. An
//! absent key is an empty collection.

use std::fmt;

use ocl_store::LedgerTxn;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::action::{ActionBook, ActionProposal, ListedAction};
use crate::error::{CodecError, GovernanceError};
use crate::ledger::{TokenBalance, TokenLedger};
use crate::voting::{Vote, VoteBook};

/// The ledger keys owned by the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CollectionKey {
    Operators,
    Votes,
    ActionProposal,
    ListAction,
}

impl CollectionKey {
    pub const ALL: [Self; 4] = [
        Self::Operators,
        Self::Votes,
        Self::ActionProposal,
        Self::ListAction,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Operators => "Operators",
            Self::Votes => "Votes",
            Self::ActionProposal => "ActionProposal",
            Self::ListAction => "ListAction",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == s)
    }
}

impl fmt::Display for CollectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Next-id lower bounds; not cleared by `reset`.
pub const PROPOSAL_SEQ_KEY: &str = "ActionProposalSeq";
pub const LISTING_SEQ_KEY: &str = "ListActionSeq";

/// Returned by `get` for a key that has never been written.
pub const ABSENT: &[u8] = b"-1";

pub const EMPTY_COLLECTION: &[u8] = b"[]";

fn malformed(key: &str, reason: impl fmt::Display) -> CodecError {
    CodecError::Malformed {
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

fn invalid(key: &str, reason: impl Into<String>) -> CodecError {
    CodecError::Invalid {
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn decode_list<T: DeserializeOwned>(key: &str, bytes: Option<&[u8]>) -> Result<Vec<T>, CodecError> {
    match bytes {
        None => Ok(Vec::new()),
        Some(bytes) => serde_json::from_slice(bytes).map_err(|e| malformed(key, e)),
    }
}

pub fn encode<T: Serialize + ?Sized>(key: &str, value: &T) -> Result<Vec<u8>, CodecError> {
    serde_json::to_vec(value).map_err(|e| CodecError::Encode {
        key: key.to_string(),
        reason: e.to_string(),
    })
}

pub fn decode_ledger(bytes: Option<&[u8]>) -> Result<TokenLedger, CodecError> {
    let key = CollectionKey::Operators.as_str();
    let records: Vec<TokenBalance> = decode_list(key, bytes)?;
    if let Some(bad) = records.iter().find(|r| !r.balance.is_finite()) {
        return Err(invalid(key, format!("non-finite balance for {}", bad.organisation_id)));
    }
    TokenLedger::from_records(records)
        .map_err(|dup| invalid(key, format!("duplicate organisation {dup}")))
}

pub fn encode_ledger(ledger: &TokenLedger) -> Result<Vec<u8>, CodecError> {
    encode(CollectionKey::Operators.as_str(), ledger.records())
}

pub fn decode_votes(bytes: Option<&[u8]>) -> Result<VoteBook, CodecError> {
    let key = CollectionKey::Votes.as_str();
    let votes: Vec<Vote> = decode_list(key, bytes)?;
    for (position, vote) in votes.iter().enumerate() {
        if vote.id != position as u64 {
            return Err(invalid(
                key,
                format!("vote at position {position} has id {}", vote.id),
            ));
        }
        if vote.yes.iter().chain(vote.no.iter()).any(|b| !b.weight.is_finite()) {
            return Err(invalid(key, format!("vote {} has a non-finite ballot weight", vote.id)));
        }
    }
    Ok(VoteBook::new(votes))
}

fn check_increasing<'a>(key: &str, ids: impl Iterator<Item = &'a u64>) -> Result<(), CodecError> {
    let mut last: Option<u64> = None;
    for &id in ids {
        if last.is_some_and(|l| id <= l) {
            return Err(invalid(key, format!("id {id} is not greater than its predecessor")));
        }
        last = Some(id);
    }
    Ok(())
}

pub fn decode_proposals(bytes: Option<&[u8]>) -> Result<Vec<ActionProposal>, CodecError> {
    let key = CollectionKey::ActionProposal.as_str();
    let proposals: Vec<ActionProposal> = decode_list(key, bytes)?;
    check_increasing(key, proposals.iter().map(|p| &p.id))?;
    Ok(proposals)
}

pub fn decode_listings(bytes: Option<&[u8]>) -> Result<Vec<ListedAction>, CodecError> {
    let key = CollectionKey::ListAction.as_str();
    let listings: Vec<ListedAction> = decode_list(key, bytes)?;
    check_increasing(key, listings.iter().map(|l| &l.id))?;
    Ok(listings)
}

fn decode_seq(key: &str, bytes: Option<&[u8]>) -> Result<u64, CodecError> {
    match bytes {
        None => Ok(0),
        Some(bytes) => serde_json::from_slice(bytes).map_err(|e| malformed(key, e)),
    }
}

// ── Transaction helpers ─────────────────────────────────────────────────

pub fn load_ledger(txn: &mut LedgerTxn<'_>) -> Result<TokenLedger, GovernanceError> {
    let bytes = txn.get(CollectionKey::Operators.as_str())?;
    Ok(decode_ledger(bytes.as_deref())?)
}

pub fn save_ledger(txn: &mut LedgerTxn<'_>, ledger: &TokenLedger) -> Result<(), GovernanceError> {
    txn.put(CollectionKey::Operators.as_str(), encode_ledger(ledger)?);
    Ok(())
}

pub fn load_votes(txn: &mut LedgerTxn<'_>) -> Result<VoteBook, GovernanceError> {
    let bytes = txn.get(CollectionKey::Votes.as_str())?;
    Ok(decode_votes(bytes.as_deref())?)
}

pub fn save_votes(txn: &mut LedgerTxn<'_>, book: &VoteBook) -> Result<(), GovernanceError> {
    let key = CollectionKey::Votes.as_str();
    txn.put(key, encode(key, &book.votes)?);
    Ok(())
}

pub fn load_book(txn: &mut LedgerTxn<'_>) -> Result<ActionBook, GovernanceError> {
    let proposals = txn.get(CollectionKey::ActionProposal.as_str())?;
    let listings = txn.get(CollectionKey::ListAction.as_str())?;
    let proposal_seq = txn.get(PROPOSAL_SEQ_KEY)?;
    let listing_seq = txn.get(LISTING_SEQ_KEY)?;
    Ok(ActionBook {
        proposals: decode_proposals(proposals.as_deref())?,
        listings: decode_listings(listings.as_deref())?,
        proposal_seq: decode_seq(PROPOSAL_SEQ_KEY, proposal_seq.as_deref())?,
        listing_seq: decode_seq(LISTING_SEQ_KEY, listing_seq.as_deref())?,
    })
}

/// Read only the id sequences (used when the collections themselves are unreadable).
pub fn load_sequences(txn: &mut LedgerTxn<'_>) -> Result<(u64, u64), GovernanceError> {
    let proposal_seq = txn.get(PROPOSAL_SEQ_KEY)?;
    let listing_seq = txn.get(LISTING_SEQ_KEY)?;
    Ok((
        decode_seq(PROPOSAL_SEQ_KEY, proposal_seq.as_deref())?,
        decode_seq(LISTING_SEQ_KEY, listing_seq.as_deref())?,
    ))
}

/// Stage both collections and both sequences.
pub fn save_book(txn: &mut LedgerTxn<'_>, book: &ActionBook) -> Result<(), GovernanceError> {
    let proposals = CollectionKey::ActionProposal.as_str();
    let listings = CollectionKey::ListAction.as_str();
    txn.put(proposals, encode(proposals, &book.proposals)?);
    txn.put(listings, encode(listings, &book.listings)?);
    txn.put(PROPOSAL_SEQ_KEY, encode(PROPOSAL_SEQ_KEY, &book.proposal_seq)?);
    txn.put(LISTING_SEQ_KEY, encode(LISTING_SEQ_KEY, &book.listing_seq)?);
    Ok(())
}
