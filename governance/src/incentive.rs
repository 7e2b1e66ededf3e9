//! Payoff matrix for bilateral interactions.
//!
//! | stage     | outcome  | initiator | counterpart |
//! |-----------|----------|----------:|------------:|
//! | proposal  | agree    |        +2 |          +1 |
//! | proposal  | disagree |        −1 |        +0.5 |
//! | performed | agree    |        +2 |          +1 |
//! | performed | disagree |        +0 |        +0.5 |
//!
//! Manual interactions never reward the initiator, and counterpart-less
//! (self-proposed) interactions only pay the initiator.

use ocl_types::OrganisationId;
use serde::{Deserialize, Serialize};

use crate::ledger::TokenLedger;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stage {
    Proposal,
    Performed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Agree,
    Disagree,
}

/// Token deltas for the two parties of an interaction.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Payoff {
    pub initiator: f64,
    pub counterpart: f64,
}

impl Payoff {
    /// Raw table lookup.
    pub const fn table(stage: Stage, outcome: Outcome) -> Self {
        match (stage, outcome) {
            (Stage::Proposal, Outcome::Agree) => Self {
                initiator: 2.0,
                counterpart: 1.0,
            },
            (Stage::Proposal, Outcome::Disagree) => Self {
                initiator: -1.0,
                counterpart: 0.5,
            },
            (Stage::Performed, Outcome::Agree) => Self {
                initiator: 2.0,
                counterpart: 1.0,
            },
            (Stage::Performed, Outcome::Disagree) => Self {
                initiator: 0.0,
                counterpart: 0.5,
            },
        }
    }
}

/// An interaction outcome that earns tokens.
#[derive(Clone, Debug, PartialEq)]
pub struct Interaction {
    pub stage: Stage,
    pub outcome: Outcome,
    pub initiator: OrganisationId,
    /// `None` for self-proposed actions.
    pub counterpart: Option<OrganisationId>,
    pub manual: bool,
}

impl Interaction {
    /// The payoff after the manual and counterpart-less overrides.
    pub fn payoff(&self) -> Payoff {
        let mut payoff = Payoff::table(self.stage, self.outcome);
        if self.manual {
            payoff.initiator = 0.0;
        }
        if self.counterpart.is_none() {
            payoff.counterpart = 0.0;
        }
        payoff
    }
}

pub struct IncentiveEngine;

impl IncentiveEngine {
    /// Apply `interaction` to `ledger` and return the payoff actually applied.
    ///
    /// Only registered organisations are paid. A party without a balance
    /// record gets nothing, so a later `register` still grants it the
    /// initial balance.
    pub fn apply(ledger: &mut TokenLedger, interaction: &Interaction) -> Payoff {
        let mut payoff = interaction.payoff();
        if !ledger.is_registered(&interaction.initiator) {
            tracing::warn!(org = %interaction.initiator, "initiator not registered; payoff discarded");
            payoff.initiator = 0.0;
        }
        let mut deltas = vec![(&interaction.initiator, payoff.initiator)];
        if let Some(counterpart) = &interaction.counterpart {
            if !ledger.is_registered(counterpart) {
                tracing::warn!(org = %counterpart, "counterpart not registered; payoff discarded");
                payoff.counterpart = 0.0;
            }
            deltas.push((counterpart, payoff.counterpart));
        }
        deltas.retain(|(org, _)| ledger.is_registered(org));
        ledger.bulk_apply(deltas);
        tracing::debug!(
            initiator = %interaction.initiator,
            counterpart = interaction.counterpart.as_ref().map(|c| c.as_str()).unwrap_or(""),
            stage = ?interaction.stage,
            outcome = ?interaction.outcome,
            initiator_delta = payoff.initiator,
            counterpart_delta = payoff.counterpart,
            "payoff applied"
        );
        payoff
    }

    /// Look up, override and apply a payoff in one call.
    pub fn apply_payoff(
        ledger: &mut TokenLedger,
        stage: Stage,
        outcome: Outcome,
        initiator: &OrganisationId,
        counterpart: Option<&OrganisationId>,
        manual: bool,
    ) -> Payoff {
        let interaction = Interaction {
            stage,
            outcome,
            initiator: initiator.clone(),
            counterpart: counterpart.cloned(),
            manual,
        };
        Self::apply(ledger, &interaction)
    }
}
