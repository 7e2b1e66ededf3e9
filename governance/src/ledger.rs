//! Per-organisation token balances.
//!
//! The ledger is a snapshot of the `Operators` collection: it is loaded,
//! mutated in memory and written back whole at the end of an invocation.

use ocl_types::OrganisationId;
use serde::{Deserialize, Serialize};

/// Balance record of one organisation. At most one per organisation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TokenBalance {
    pub organisation_id: OrganisationId,
    pub balance: f64,
}

/// Result of a registration request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegisterOutcome {
    Registered,
    AlreadyRegistered,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TokenLedger {
    // Kept in registration order.
    balances: Vec<TokenBalance>,
}

impl TokenLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a ledger from stored records.
    ///
    /// Returns the first organisation that appears twice.
    pub fn from_records(records: Vec<TokenBalance>) -> Result<Self, OrganisationId> {
        let mut ledger = Self::new();
        for record in records {
            if ledger.is_registered(&record.organisation_id) {
                return Err(record.organisation_id);
            }
            ledger.balances.push(record);
        }
        Ok(ledger)
    }

    pub fn records(&self) -> &[TokenBalance] {
        &self.balances
    }

    pub fn organisations(&self) -> impl Iterator<Item = &OrganisationId> {
        self.balances.iter().map(|b| &b.organisation_id)
    }

    /// Balance of `org`, or 0 if it has no record.
    pub fn balance(&self, org: &OrganisationId) -> f64 {
        self.find(org).map_or(0.0, |b| b.balance)
    }

    pub fn is_registered(&self, org: &OrganisationId) -> bool {
        self.find(org).is_some()
    }

    pub fn registered_count(&self) -> usize {
        self.balances.len()
    }

    /// Register `org` with `initial_balance`. A second registration is a no-op.
    pub fn register(&mut self, org: &OrganisationId, initial_balance: f64) -> RegisterOutcome {
        if self.is_registered(org) {
            return RegisterOutcome::AlreadyRegistered;
        }
        self.balances.push(TokenBalance {
            organisation_id: org.clone(),
            balance: initial_balance,
        });
        RegisterOutcome::Registered
    }

    /// Add `delta` to the balance of `org`, creating the record if needed.
    pub fn apply_delta(&mut self, org: &OrganisationId, delta: f64) {
        match self.balances.iter_mut().find(|b| &b.organisation_id == org) {
            Some(record) => record.balance += delta,
            None => self.balances.push(TokenBalance {
                organisation_id: org.clone(),
                balance: delta,
            }),
        }
    }

    /// Apply a set of deltas as one unit.
    pub fn bulk_apply<'a, I>(&mut self, deltas: I)
    where
        I: IntoIterator<Item = (&'a OrganisationId, f64)>,
    {
        for (org, delta) in deltas {
            self.apply_delta(org, delta);
        }
    }

    fn find(&self, org: &OrganisationId) -> Option<&TokenBalance> {
        self.balances.iter().find(|b| &b.organisation_id == org)
    }
}
