//! Governance and incentives for a consortium of organisations.
//!
//! Two cooperating contracts share one token ledger:
//!
//! - the **voting contract** registers organisations, runs token-weighted
//!   votes and redistributes tokens when a vote passes;
//! - the **action contract** handles bilateral action proposals and
//!   listings, settling each interaction through the payoff matrix in
//!   [`incentive`] against the token contract's ledger.
//!
//! [`GovernanceService`] is the entry point; everything below it is pure
//! state transitions over typed collections.

pub mod action;
pub mod bridge;
pub mod codec;
pub mod error;
pub mod incentive;
pub mod ledger;
pub mod operation;
pub mod params;
pub mod service;
pub mod voting;

pub use action::{ActionBook, ActionProposal, Decision, ExecuteReply, ExecuteRequest, ListedAction, ListingReply};
pub use bridge::{LedgerSnapshot, LinkedLedger, TokenContractEndpoint};
pub use codec::CollectionKey;
pub use error::{ArgumentError, CodecError, GovernanceError};
pub use incentive::{IncentiveEngine, Interaction, Outcome, Payoff, Stage};
pub use ledger::{RegisterOutcome, TokenBalance, TokenLedger};
pub use operation::{Operation, Route};
pub use params::GovernanceParams;
pub use service::{GovernanceService, Response, Status};
pub use voting::{Ballot, Choice, CloseReply, Vote, VoteBook, VoteOutcome};
