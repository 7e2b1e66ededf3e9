//! Token-weighted governance votes.
//!
//! A vote stays `Open` until `close` is called after its duration has
//! elapsed, at least `quorum_percent` of registered organisations have
//! replied, and the weighted margin has been evaluated. Ballot weights are
//! the voter's balance at the moment the ballot was cast.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use ocl_types::{OrganisationId, Timestamp};
use serde::{Deserialize, Serialize};

use crate::ledger::TokenLedger;
use crate::params::GovernanceParams;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Choice {
    Yes,
    No,
}

impl FromStr for Choice {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "yes" => Ok(Self::Yes),
            "no" => Ok(Self::No),
            _ => Err(()),
        }
    }
}

/// A ballot: the voter and its token balance when it voted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Ballot {
    pub organisation_id: OrganisationId,
    pub weight: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum VoteOutcome {
    Open,
    Passed,
    NotPassed,
}

impl fmt::Display for VoteOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => f.write_str("Open"),
            Self::Passed => f.write_str("Passed"),
            Self::NotPassed => f.write_str("Not Passed"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Vote {
    pub id: u64,
    pub creator: OrganisationId,
    pub title: String,
    pub created_at: Timestamp,
    pub duration_minutes: u64,
    pub description: String,
    pub yes: Vec<Ballot>,
    pub no: Vec<Ballot>,
    pub outcome: VoteOutcome,
}

/// Weighted totals of a vote.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tally {
    pub yes_weight: f64,
    pub no_weight: f64,
}

impl Tally {
    pub fn total_weight(&self) -> f64 {
        self.yes_weight + self.no_weight
    }

    /// `(yes - no) / total * 100`, or `None` when no weight was cast.
    pub fn margin(&self) -> Option<f64> {
        let total = self.total_weight();
        (total != 0.0).then(|| (self.yes_weight - self.no_weight) / total * 100.0)
    }
}

impl Vote {
    pub fn reply_count(&self) -> usize {
        self.yes.len() + self.no.len()
    }

    pub fn tally(&self) -> Tally {
        Tally {
            yes_weight: self.yes.iter().map(|b| b.weight).sum(),
            no_weight: self.no.iter().map(|b| b.weight).sum(),
        }
    }

    /// Every organisation that cast at least one ballot.
    pub fn voters(&self) -> BTreeSet<&OrganisationId> {
        self.yes
            .iter()
            .chain(self.no.iter())
            .map(|b| &b.organisation_id)
            .collect()
    }

    fn has_voted(&self, org: &OrganisationId) -> bool {
        self.yes
            .iter()
            .chain(self.no.iter())
            .any(|b| &b.organisation_id == org)
    }

    fn closes_after_secs(&self) -> u64 {
        self.duration_minutes.saturating_mul(60)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum BallotReply {
    NotFound { vote_id: u64 },
    AlreadyClosed { vote_id: u64 },
    Cast { title: String, weight: f64 },
}

impl BallotReply {
    pub fn mutated(&self) -> bool {
        matches!(self, Self::Cast { .. })
    }
}

impl fmt::Display for BallotReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { vote_id } => write!(f, "Vote {vote_id} not found."),
            Self::AlreadyClosed { vote_id } => write!(f, "Vote {vote_id} is already closed."),
            Self::Cast { title, .. } => write!(f, "Replied on vote: {title}"),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum CloseReply {
    NotFound { vote_id: u64 },
    AlreadyClosed { vote_id: u64, outcome: VoteOutcome },
    TooEarly { remaining_secs: u64 },
    InsufficientReplies { reply_percent: u64 },
    Closed { title: String, outcome: VoteOutcome },
}

/// Countdown in its two largest units.
struct Remaining(u64);

impl fmt::Display for Remaining {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const MINUTE: u64 = 60;
        const HOUR: u64 = 60 * MINUTE;
        const DAY: u64 = 24 * HOUR;
        let secs = self.0;
        match secs {
            s if s < MINUTE => write!(f, "{s}s"),
            s if s < HOUR => write!(f, "{}m {}s", s / MINUTE, s % MINUTE),
            s if s < DAY => write!(f, "{}h {}m", s / HOUR, s % HOUR / MINUTE),
            s => write!(f, "{}d {}h", s / DAY, s % DAY / HOUR),
        }
    }
}

impl CloseReply {
    pub fn mutated(&self) -> bool {
        matches!(self, Self::Closed { .. })
    }
}

impl fmt::Display for CloseReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { vote_id } => write!(f, "Vote {vote_id} not found."),
            Self::AlreadyClosed { vote_id, outcome } => {
                write!(f, "Vote {vote_id} is already closed: {outcome}.")
            }
            Self::TooEarly { remaining_secs } => write!(
                f,
                "Close not possible, reply time not passed ({} remaining).",
                Remaining(*remaining_secs)
            ),
            Self::InsufficientReplies { reply_percent } => write!(
                f,
                "Cannot close, not enough replies ({reply_percent}% replied)."
            ),
            Self::Closed { title, outcome } => write!(f, "Vote closed {title}: {outcome}"),
        }
    }
}

/// The `Votes` collection.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VoteBook {
    pub votes: Vec<Vote>,
}

impl VoteBook {
    pub fn new(votes: Vec<Vote>) -> Self {
        Self { votes }
    }

    /// Open a new vote; its id is its position in the collection.
    pub fn create(
        &mut self,
        creator: &OrganisationId,
        title: &str,
        duration_minutes: u64,
        description: &str,
        now: Timestamp,
    ) -> u64 {
        let id = self.votes.len() as u64;
        self.votes.push(Vote {
            id,
            creator: creator.clone(),
            title: title.to_string(),
            created_at: now,
            duration_minutes,
            description: description.to_string(),
            yes: Vec::new(),
            no: Vec::new(),
            outcome: VoteOutcome::Open,
        });
        id
    }

    /// Record a ballot weighted by the voter's current balance.
    pub fn cast(
        &mut self,
        ledger: &TokenLedger,
        voter: &OrganisationId,
        vote_id: u64,
        choice: Choice,
    ) -> BallotReply {
        let Some(vote) = self.get_mut(vote_id) else {
            return BallotReply::NotFound { vote_id };
        };
        if vote.outcome != VoteOutcome::Open {
            return BallotReply::AlreadyClosed { vote_id };
        }
        if vote.has_voted(voter) {
            tracing::warn!(org = %voter, vote_id, "organisation cast another ballot on the same vote");
        }
        let ballot = Ballot {
            organisation_id: voter.clone(),
            weight: ledger.balance(voter),
        };
        let weight = ballot.weight;
        match choice {
            Choice::Yes => vote.yes.push(ballot),
            Choice::No => vote.no.push(ballot),
        }
        BallotReply::Cast {
            title: vote.title.clone(),
            weight,
        }
    }

    /// Try to close a vote, redistributing tokens if it passes.
    pub fn close(
        &mut self,
        ledger: &mut TokenLedger,
        vote_id: u64,
        now: Timestamp,
        params: &GovernanceParams,
    ) -> CloseReply {
        let Some(vote) = self.get_mut(vote_id) else {
            return CloseReply::NotFound { vote_id };
        };
        if vote.outcome != VoteOutcome::Open {
            return CloseReply::AlreadyClosed {
                vote_id,
                outcome: vote.outcome,
            };
        }
        let window = vote.closes_after_secs();
        if !vote.created_at.has_elapsed(window, now) {
            let remaining_secs = window
                .saturating_add(1)
                .saturating_sub(vote.created_at.elapsed_since(now));
            return CloseReply::TooEarly { remaining_secs };
        }

        let reply_percent = reply_percent(vote.reply_count(), ledger.registered_count());
        if ledger.registered_count() == 0 || reply_percent < params.quorum_percent {
            return CloseReply::InsufficientReplies { reply_percent };
        }

        let tally = vote.tally();
        let passed = tally.margin().is_some_and(|m| m > params.pass_threshold);
        vote.outcome = if passed {
            VoteOutcome::Passed
        } else {
            VoteOutcome::NotPassed
        };

        if passed {
            let voters = vote.voters();
            let deltas: Vec<(OrganisationId, f64)> = ledger
                .organisations()
                .map(|org| {
                    let delta = if voters.contains(org) {
                        params.participation_reward
                    } else {
                        -params.abstention_penalty
                    };
                    (org.clone(), delta)
                })
                .collect();
            ledger.bulk_apply(deltas.iter().map(|(org, delta)| (org, *delta)));
        }

        tracing::info!(
            vote_id,
            outcome = %vote.outcome,
            yes_weight = tally.yes_weight,
            no_weight = tally.no_weight,
            reply_percent,
            "vote closed"
        );
        CloseReply::Closed {
            title: vote.title.clone(),
            outcome: vote.outcome,
        }
    }

    /// Empty the collection. Vote ids restart at 0.
    pub fn clear(&mut self) {
        self.votes.clear();
    }

    fn get_mut(&mut self, vote_id: u64) -> Option<&mut Vote> {
        usize::try_from(vote_id)
            .ok()
            .and_then(|i| self.votes.get_mut(i))
    }
}

/// `floor(replies / registered * 100)`, 0 when nobody is registered.
fn reply_percent(replies: usize, registered: usize) -> u64 {
    if registered == 0 {
        return 0;
    }
    (replies as u64 * 100) / registered as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn org(name: &str) -> OrganisationId {
        OrganisationId::new(name).unwrap()
    }

    fn ledger_with(balances: &[(&str, f64)]) -> TokenLedger {
        let mut ledger = TokenLedger::new();
        for (name, balance) in balances {
            ledger.register(&org(name), *balance);
        }
        ledger
    }

    const START: u64 = 1_700_000_000;

    fn book_with_vote(duration_minutes: u64) -> VoteBook {
        let mut book = VoteBook::default();
        book.create(&org("Org1MSP"), "upgrade", duration_minutes, "v2", Timestamp::new(START));
        book
    }

    fn after(minutes: u64, extra_secs: u64) -> Timestamp {
        Timestamp::new(START + minutes * 60 + extra_secs)
    }

    #[test]
    fn choice_parsing() {
        assert_eq!("YES".parse(), Ok(Choice::Yes));
        assert_eq!("no".parse(), Ok(Choice::No));
        assert!("abstain".parse::<Choice>().is_err());
    }

    #[test]
    fn ids_follow_collection_length() {
        let mut book = VoteBook::default();
        let a = org("Org1MSP");
        assert_eq!(book.create(&a, "a", 1, "", Timestamp::new(START)), 0);
        assert_eq!(book.create(&a, "b", 1, "", Timestamp::new(START)), 1);
        assert_eq!(book.votes[1].outcome, VoteOutcome::Open);
    }

    #[test]
    fn ballot_weight_is_a_snapshot() {
        let mut ledger = ledger_with(&[("Org1MSP", 200.0)]);
        let mut book = book_with_vote(10);
        let a = org("Org1MSP");
        let reply = book.cast(&ledger, &a, 0, Choice::Yes);
        assert_eq!(
            reply,
            BallotReply::Cast {
                title: "upgrade".into(),
                weight: 200.0
            }
        );
        ledger.apply_delta(&a, 50.0);
        assert_eq!(book.votes[0].yes[0].weight, 200.0);
    }

    #[test]
    fn unregistered_voter_weighs_zero() {
        let ledger = ledger_with(&[("Org1MSP", 200.0)]);
        let mut book = book_with_vote(10);
        book.cast(&ledger, &org("Org9MSP"), 0, Choice::No);
        assert_eq!(book.votes[0].no[0].weight, 0.0);
    }

    #[test]
    fn repeat_ballots_are_recorded() {
        let ledger = ledger_with(&[("Org1MSP", 200.0)]);
        let mut book = book_with_vote(10);
        let a = org("Org1MSP");
        book.cast(&ledger, &a, 0, Choice::Yes);
        book.cast(&ledger, &a, 0, Choice::Yes);
        assert_eq!(book.votes[0].yes.len(), 2);
        assert_eq!(book.votes[0].voters().len(), 1);
    }

    #[test]
    fn closing_before_duration_is_a_no_op() {
        let mut ledger = ledger_with(&[("Org1MSP", 200.0)]);
        let mut book = book_with_vote(5);
        book.cast(&ledger.clone(), &org("Org1MSP"), 0, Choice::Yes);
        let before = ledger.clone();

        // Exactly at the deadline is still too early.
        let reply = book.close(&mut ledger, 0, after(5, 0), &GovernanceParams::default());
        assert_eq!(reply, CloseReply::TooEarly { remaining_secs: 1 });
        assert_eq!(book.votes[0].outcome, VoteOutcome::Open);
        assert_eq!(ledger, before);

        let reply = book.close(&mut ledger, 0, after(5, 1), &GovernanceParams::default());
        assert!(reply.mutated());
    }

    #[test]
    fn unbounded_duration_never_closes() {
        let mut ledger = ledger_with(&[("Org1MSP", 200.0)]);
        let mut book = book_with_vote(u64::MAX);
        let reply = book.close(&mut ledger, 0, Timestamp::new(u64::MAX), &GovernanceParams::default());
        let CloseReply::TooEarly { remaining_secs } = reply else {
            panic!("expected too early, got {reply:?}");
        };
        assert_eq!(remaining_secs, START);
        assert_eq!(book.votes[0].outcome, VoteOutcome::Open);
    }

    #[test]
    fn remaining_time_uses_two_largest_units() {
        let message = |remaining_secs| CloseReply::TooEarly { remaining_secs }.to_string();
        assert!(message(59).contains("(59s remaining)"));
        assert!(message(601).contains("(10m 1s remaining)"));
        assert!(message(86_399).contains("(23h 59m remaining)"));
        assert!(message(90_000).contains("(1d 1h remaining)"));
    }

    #[test]
    fn quorum_not_met_is_retryable() {
        let mut ledger = ledger_with(&[("A", 200.0), ("B", 200.0), ("C", 200.0)]);
        let mut book = book_with_vote(1);
        book.cast(&ledger.clone(), &org("A"), 0, Choice::Yes);
        let params = GovernanceParams::default();

        // 1 of 3 = 33%.
        let reply = book.close(&mut ledger, 0, after(1, 1), &params);
        assert_eq!(reply, CloseReply::InsufficientReplies { reply_percent: 33 });
        assert_eq!(book.votes[0].outcome, VoteOutcome::Open);

        // 2 of 3 = 66% ≥ 60.
        book.cast(&ledger.clone(), &org("B"), 0, Choice::Yes);
        let reply = book.close(&mut ledger, 0, after(2, 0), &params);
        assert!(matches!(reply, CloseReply::Closed { outcome: VoteOutcome::Passed, .. }));
    }

    #[test]
    fn clear_majority_passes_and_redistributes() {
        // yes = 10, no = 2 → margin 66.7.
        let mut ledger = ledger_with(&[("A", 10.0), ("B", 2.0), ("C", 0.0)]);
        let mut book = book_with_vote(1);
        let snapshot = ledger.clone();
        book.cast(&snapshot, &org("A"), 0, Choice::Yes);
        book.cast(&snapshot, &org("B"), 0, Choice::No);

        let tally = book.votes[0].tally();
        assert_eq!(tally.total_weight(), 12.0);
        assert!((tally.margin().unwrap() - 66.666).abs() < 0.01);

        let reply = book.close(&mut ledger, 0, after(1, 1), &GovernanceParams::default());
        assert_eq!(
            reply,
            CloseReply::Closed {
                title: "upgrade".into(),
                outcome: VoteOutcome::Passed
            }
        );
        assert_eq!(ledger.balance(&org("A")), 12.0);
        assert_eq!(ledger.balance(&org("B")), 4.0);
        assert_eq!(ledger.balance(&org("C")), -2.0);
    }

    #[test]
    fn tight_margin_still_passes() {
        // yes = 6, no = 5.5 → margin ≈ 4.35 > 1.2.
        let mut ledger = ledger_with(&[("A", 6.0), ("B", 5.5)]);
        let mut book = book_with_vote(1);
        let snapshot = ledger.clone();
        book.cast(&snapshot, &org("A"), 0, Choice::Yes);
        book.cast(&snapshot, &org("B"), 0, Choice::No);
        let reply = book.close(&mut ledger, 0, after(1, 1), &GovernanceParams::default());
        assert!(matches!(reply, CloseReply::Closed { outcome: VoteOutcome::Passed, .. }));
    }

    #[test]
    fn margin_below_threshold_does_not_pass() {
        let mut ledger = ledger_with(&[("A", 50.6), ("B", 49.4)]);
        let mut book = book_with_vote(1);
        let snapshot = ledger.clone();
        book.cast(&snapshot, &org("A"), 0, Choice::Yes);
        book.cast(&snapshot, &org("B"), 0, Choice::No);
        let params = GovernanceParams {
            pass_threshold: 1.3,
            ..Default::default()
        };
        let reply = book.close(&mut ledger, 0, after(1, 1), &params);
        assert!(matches!(reply, CloseReply::Closed { outcome: VoteOutcome::NotPassed, .. }));
        assert_eq!(ledger, snapshot);
    }

    #[test]
    fn zero_total_weight_is_not_passed() {
        let mut ledger = ledger_with(&[("A", 0.0), ("B", 0.0)]);
        let mut book = book_with_vote(1);
        let snapshot = ledger.clone();
        book.cast(&snapshot, &org("A"), 0, Choice::Yes);
        book.cast(&snapshot, &org("B"), 0, Choice::Yes);
        let reply = book.close(&mut ledger, 0, after(1, 1), &GovernanceParams::default());
        assert!(matches!(reply, CloseReply::Closed { outcome: VoteOutcome::NotPassed, .. }));
        assert_eq!(ledger, snapshot);
    }

    #[test]
    fn no_registered_organisations_fails_quorum() {
        let mut ledger = TokenLedger::new();
        let mut book = book_with_vote(0);
        let reply = book.close(&mut ledger, 0, after(0, 1), &GovernanceParams::default());
        assert_eq!(reply, CloseReply::InsufficientReplies { reply_percent: 0 });
    }

    #[test]
    fn closed_vote_is_final() {
        let mut ledger = ledger_with(&[("A", 10.0)]);
        let mut book = book_with_vote(1);
        book.cast(&ledger.clone(), &org("A"), 0, Choice::Yes);
        let params = GovernanceParams::default();
        book.close(&mut ledger, 0, after(1, 1), &params);
        let settled = ledger.clone();

        let reply = book.close(&mut ledger, 0, after(9, 0), &params);
        assert_eq!(
            reply,
            CloseReply::AlreadyClosed {
                vote_id: 0,
                outcome: VoteOutcome::Passed
            }
        );
        assert_eq!(ledger, settled);
        assert_eq!(
            book.cast(&ledger, &org("A"), 0, Choice::No),
            BallotReply::AlreadyClosed { vote_id: 0 }
        );
    }

    #[test]
    fn unknown_vote() {
        let mut ledger = TokenLedger::new();
        let mut book = VoteBook::default();
        assert_eq!(
            book.close(&mut ledger, 4, Timestamp::new(START), &GovernanceParams::default()),
            CloseReply::NotFound { vote_id: 4 }
        );
    }
}
