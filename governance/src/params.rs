//! Tunable constants of the governance engine.
//!
//! Defaults reproduce the deployed network; every field can be overridden from
//! the `[governance]` table of the daemon configuration.

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GovernanceParams {
    /// Tokens credited to an organisation when it registers.
    pub initial_balance: f64,
    /// Minimum percentage (floored) of registered organisations that must have
    /// replied before a vote can close.
    pub quorum_percent: u64,
    /// A vote passes when `(yes - no) / total * 100` is strictly above this.
    pub pass_threshold: f64,
    /// Tokens gained by every voter when a vote passes.
    pub participation_reward: f64,
    /// Tokens lost by every registered non-voter when a vote passes.
    pub abstention_penalty: f64,
    /// Action names executed automatically once accepted (matched case-insensitively).
    pub automatic_actions: Vec<String>,
    /// Register the caller at the start of every voting-contract operation.
    pub auto_register: bool,
    /// Name of the contract owning the authoritative token ledger.
    pub token_contract: String,
    /// Channel on which the token contract is invoked.
    pub channel: String,
}

impl Default for GovernanceParams {
    fn default() -> Self {
        Self {
            initial_balance: 200.0,
            quorum_percent: 60,
            pass_threshold: 1.2,
            participation_reward: 2.0,
            abstention_penalty: 2.0,
            automatic_actions: vec!["scaleVm".to_string()],
            auto_register: false,
            token_contract: "token".to_string(),
            channel: "airlinechannel".to_string(),
        }
    }
}

impl GovernanceParams {
    /// Whether `action` is dispatched automatically on acceptance.
    pub fn is_automatic(&self, action: &str) -> bool {
        self.automatic_actions
            .iter()
            .any(|a| a.eq_ignore_ascii_case(action))
    }

    /// Check internal consistency, returning a description of the first problem.
    pub fn validate(&self) -> Result<(), String> {
        if self.quorum_percent > 100 {
            return Err(format!("quorum_percent {} exceeds 100", self.quorum_percent));
        }
        for (name, value) in [
            ("initial_balance", self.initial_balance),
            ("pass_threshold", self.pass_threshold),
            ("participation_reward", self.participation_reward),
            ("abstention_penalty", self.abstention_penalty),
        ] {
            if !value.is_finite() {
                return Err(format!("{name} must be finite"));
            }
        }
        if self.token_contract.is_empty() || self.channel.is_empty() {
            return Err("token_contract and channel must be non-empty".to_string());
        }
        Ok(())
    }
}
