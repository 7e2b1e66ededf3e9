//! Bilateral action proposals between a proposing and an acting organisation.
//!
//! Lifecycle of an [`ActionProposal`]:
//!
//! ```text
//! Proposed ──reject──▶ (stays unresolved, rejection payoff applied)
//!    │
//!    ├──accept, manual──────▶ ManuallyApproved (resolved, new ListedAction)
//!    └──accept, automatic───▶ Executed (resolved)
//!
//! SelfProposed ──────────────▶ AutoExecuted (resolved, counterpart-less payoff)
//! ```
//!
//! Transitions are pure: they mutate the in-memory [`ActionBook`] and hand
//! back the [`Interaction`] to be paid, leaving persistence and ledger updates
//! to the caller.

use std::fmt;
use std::str::FromStr;

use ocl_types::OrganisationId;
use serde::{Deserialize, Serialize};

use crate::incentive::{Interaction, Outcome, Stage};
use crate::params::GovernanceParams;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ActionProposal {
    pub id: u64,
    pub proposer: OrganisationId,
    pub acting: OrganisationId,
    pub action_name: String,
    pub description: String,
    pub requires_manual_execution: bool,
    pub resolved: bool,
}

/// An action listed by one organisation for another to acknowledge.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ListedAction {
    pub id: u64,
    pub listed_by: OrganisationId,
    pub action_name: String,
    pub description: String,
    pub acknowledged: bool,
}

/// Reply of the acting organisation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decision {
    Accept,
    Reject,
}

impl Decision {
    pub fn outcome(self) -> Outcome {
        match self {
            Self::Accept => Outcome::Agree,
            Self::Reject => Outcome::Disagree,
        }
    }
}

impl FromStr for Decision {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1" | "accept" | "agree" | "yes" => Ok(Self::Accept),
            "0" | "reject" | "disagree" | "no" => Ok(Self::Reject),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Accept => f.write_str("Agree"),
            Self::Reject => f.write_str("Disagree"),
        }
    }
}

/// What `executeAction` was asked to do.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExecuteRequest {
    /// Reply to an existing proposal addressed to the caller.
    Respond { index: usize, decision: Decision },
    /// Propose and execute an action on oneself.
    SelfProposed { action_name: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExecuteReply {
    NotFound { index: usize },
    AlreadyResolved { id: u64 },
    NotAuthorized { id: u64 },
    Rejected { id: u64 },
    ManuallyApproved { id: u64, listing_id: u64 },
    Executed { id: u64, action_name: String },
    /// Accepted, but nothing knows how to run this action; left open.
    NoAutomaticHandler { id: u64, action_name: String },
    SelfExecuted { id: u64, action_name: String },
    /// Self-proposed action without an automatic handler; recorded, left open.
    SelfRecorded { id: u64, action_name: String },
}

impl ExecuteReply {
    /// Whether the reply changed the book.
    pub fn mutated(&self) -> bool {
        !matches!(
            self,
            Self::NotFound { .. } | Self::AlreadyResolved { .. } | Self::NotAuthorized { .. }
        )
    }
}

impl fmt::Display for ExecuteReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { index } => write!(f, "Action proposal {index} not found."),
            Self::AlreadyResolved { .. } => f.write_str("Already replied to this request."),
            Self::NotAuthorized { .. } => f.write_str("Not allowed to take this action."),
            Self::Rejected { id } => write!(f, "Action proposal {id} rejected."),
            Self::ManuallyApproved { id, .. } => {
                write!(f, "Action proposal {id} approved for manual execution.")
            }
            Self::Executed { action_name, .. } => write!(f, "Action {action_name} executed."),
            Self::NoAutomaticHandler { id, action_name } => write!(
                f,
                "Action proposal {id} accepted; no automatic handler for {action_name}."
            ),
            Self::SelfExecuted { action_name, .. } => {
                write!(f, "Self-proposed action {action_name} executed.")
            }
            Self::SelfRecorded { action_name, .. } => write!(
                f,
                "Self-proposed action {action_name} recorded; no automatic handler."
            ),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ListingReply {
    NotFound { index: usize },
    AlreadyReplied { id: u64 },
    SelfApproval { id: u64 },
    Replied { id: u64, decision: Decision },
}

impl ListingReply {
    pub fn mutated(&self) -> bool {
        matches!(self, Self::Replied { .. })
    }
}

impl fmt::Display for ListingReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { index } => write!(f, "Listed action {index} not found."),
            Self::AlreadyReplied { .. } => f.write_str("Already replied on this proposal."),
            Self::SelfApproval { .. } => {
                f.write_str("Proposal has to be approved by other organisation.")
            }
            Self::Replied { decision, .. } => write!(f, "Replied on proposal: {decision}"),
        }
    }
}

/// Outcome of a transition: the reply plus the interaction to pay, if any.
#[derive(Clone, Debug, PartialEq)]
pub struct Transition<R> {
    pub reply: R,
    pub interaction: Option<Interaction>,
}

impl<R> Transition<R> {
    fn quiet(reply: R) -> Self {
        Self {
            reply,
            interaction: None,
        }
    }

    fn paid(reply: R, interaction: Interaction) -> Self {
        Self {
            reply,
            interaction: Some(interaction),
        }
    }
}

/// The `ActionProposal` and `ListAction` collections plus their id sequences.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ActionBook {
    pub proposals: Vec<ActionProposal>,
    pub listings: Vec<ListedAction>,
    /// Lower bound for the next proposal id; survives `reset`.
    pub proposal_seq: u64,
    /// Lower bound for the next listing id; survives `reset`.
    pub listing_seq: u64,
}

impl ActionBook {
    pub fn next_proposal_id(&self) -> u64 {
        let after_last = self.proposals.last().map_or(0, |p| p.id + 1);
        after_last.max(self.proposal_seq)
    }

    pub fn next_listing_id(&self) -> u64 {
        let after_last = self.listings.last().map_or(0, |l| l.id + 1);
        after_last.max(self.listing_seq)
    }

    /// Append a new proposal addressed to `acting`.
    pub fn propose(
        &mut self,
        proposer: &OrganisationId,
        acting: &OrganisationId,
        action_name: &str,
        description: &str,
        requires_manual_execution: bool,
    ) -> u64 {
        self.push_proposal(ActionProposal {
            id: self.next_proposal_id(),
            proposer: proposer.clone(),
            acting: acting.clone(),
            action_name: action_name.to_string(),
            description: description.to_string(),
            requires_manual_execution,
            resolved: false,
        })
    }

    /// Append a listing for other organisations to acknowledge.
    ///
    /// The stored description is the action name; the deployed contract has
    /// always done this and existing readers rely on it.
    pub fn list(&mut self, listed_by: &OrganisationId, action_name: &str, description: &str) -> u64 {
        if description != action_name {
            tracing::warn!(
                org = %listed_by,
                action = action_name,
                "listing description replaced by action name"
            );
        }
        self.push_listing(listed_by, action_name, action_name)
    }

    pub fn execute(
        &mut self,
        caller: &OrganisationId,
        request: ExecuteRequest,
        params: &GovernanceParams,
    ) -> Transition<ExecuteReply> {
        match request {
            ExecuteRequest::SelfProposed { action_name } => {
                self.execute_self_proposed(caller, action_name, params)
            }
            ExecuteRequest::Respond { index, decision } => {
                self.respond(caller, index, decision, params)
            }
        }
    }

    fn execute_self_proposed(
        &mut self,
        caller: &OrganisationId,
        action_name: String,
        params: &GovernanceParams,
    ) -> Transition<ExecuteReply> {
        let automatic = params.is_automatic(&action_name);
        let id = self.push_proposal(ActionProposal {
            id: self.next_proposal_id(),
            proposer: caller.clone(),
            acting: caller.clone(),
            action_name: action_name.clone(),
            description: String::new(),
            requires_manual_execution: false,
            resolved: automatic,
        });
        // Paid once here; the automatic dispatch below never pays self-proposals.
        let interaction = Interaction {
            stage: Stage::Proposal,
            outcome: Outcome::Agree,
            initiator: caller.clone(),
            counterpart: None,
            manual: false,
        };
        let reply = if automatic {
            tracing::info!(org = %caller, proposal_id = id, action = %action_name, "self-proposed action executed");
            ExecuteReply::SelfExecuted { id, action_name }
        } else {
            ExecuteReply::SelfRecorded { id, action_name }
        };
        Transition::paid(reply, interaction)
    }

    fn respond(
        &mut self,
        caller: &OrganisationId,
        index: usize,
        decision: Decision,
        params: &GovernanceParams,
    ) -> Transition<ExecuteReply> {
        let next_listing_id = self.next_listing_id();
        let Some(proposal) = self.proposals.get_mut(index) else {
            return Transition::quiet(ExecuteReply::NotFound { index });
        };
        let id = proposal.id;
        if proposal.resolved {
            return Transition::quiet(ExecuteReply::AlreadyResolved { id });
        }
        if &proposal.acting != caller {
            return Transition::quiet(ExecuteReply::NotAuthorized { id });
        }

        let (acting, proposer) = (proposal.acting.clone(), proposal.proposer.clone());
        let paid = |outcome: Outcome, manual: bool| Interaction {
            stage: Stage::Proposal,
            outcome,
            initiator: acting.clone(),
            counterpart: Some(proposer.clone()),
            manual,
        };

        if decision == Decision::Reject {
            // The proposal stays open, so it can be rejected (and paid) again.
            tracing::warn!(org = %caller, proposal_id = id, "proposal rejected and left unresolved");
            let interaction = paid(Outcome::Disagree, false);
            return Transition::paid(ExecuteReply::Rejected { id }, interaction);
        }

        if proposal.requires_manual_execution {
            let interaction = paid(Outcome::Agree, true);
            proposal.resolved = true;
            let listing = ListedAction {
                id: next_listing_id,
                listed_by: acting.clone(),
                action_name: proposal.action_name.clone(),
                description: proposal.description.clone(),
                acknowledged: false,
            };
            self.listings.push(listing);
            self.listing_seq = next_listing_id + 1;
            return Transition::paid(
                ExecuteReply::ManuallyApproved {
                    id,
                    listing_id: next_listing_id,
                },
                interaction,
            );
        }

        let action_name = proposal.action_name.clone();
        if !params.is_automatic(&action_name) {
            return Transition::quiet(ExecuteReply::NoAutomaticHandler { id, action_name });
        }
        let interaction = paid(Outcome::Agree, false);
        proposal.resolved = true;
        tracing::info!(org = %caller, proposal_id = id, action = %action_name, "automatic action executed");
        Transition::paid(ExecuteReply::Executed { id, action_name }, interaction)
    }

    /// Acknowledge a listing made by another organisation.
    pub fn reply_to_listing(
        &mut self,
        caller: &OrganisationId,
        index: usize,
        decision: Decision,
    ) -> Transition<ListingReply> {
        let Some(listing) = self.listings.get_mut(index) else {
            return Transition::quiet(ListingReply::NotFound { index });
        };
        let id = listing.id;
        if listing.acknowledged {
            return Transition::quiet(ListingReply::AlreadyReplied { id });
        }
        if &listing.listed_by == caller {
            return Transition::quiet(ListingReply::SelfApproval { id });
        }
        listing.acknowledged = true;
        let interaction = Interaction {
            stage: Stage::Proposal,
            outcome: decision.outcome(),
            initiator: listing.listed_by.clone(),
            counterpart: Some(caller.clone()),
            manual: false,
        };
        Transition::paid(ListingReply::Replied { id, decision }, interaction)
    }

    /// Empty both collections, keeping the id sequences.
    pub fn clear(&mut self) {
        self.proposal_seq = self.next_proposal_id();
        self.listing_seq = self.next_listing_id();
        self.proposals.clear();
        self.listings.clear();
    }

    fn push_proposal(&mut self, proposal: ActionProposal) -> u64 {
        let id = proposal.id;
        self.proposals.push(proposal);
        self.proposal_seq = id + 1;
        id
    }

    fn push_listing(&mut self, listed_by: &OrganisationId, action_name: &str, description: &str) -> u64 {
        let id = self.next_listing_id();
        self.listings.push(ListedAction {
            id,
            listed_by: listed_by.clone(),
            action_name: action_name.to_string(),
            description: description.to_string(),
            acknowledged: false,
        });
        self.listing_seq = id + 1;
        id
    }
}
