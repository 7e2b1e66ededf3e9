//! Typed operations and their parsing from `(name, args)` invocations.
//!
//! Operations are served by one of two contracts: the voting contract, which
//! owns the authoritative token ledger, and the action contract. A routed
//! invocation names the contract first, the way the public proxy exposes
//! them (`vote …` / `action …`).

use std::fmt;
use std::str::FromStr;

use ocl_types::OrganisationId;

use crate::action::{Decision, ExecuteRequest};
use crate::error::ArgumentError;
use crate::voting::Choice;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Route {
    /// The voting contract (registration, votes, token ledger).
    Vote,
    /// The action contract (bilateral proposals and listings).
    Action,
}

impl Route {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Vote => "vote",
            Self::Action => "action",
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Route {
    type Err = ArgumentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "vote" => Ok(Self::Vote),
            "action" => Ok(Self::Action),
            other => Err(ArgumentError::UnknownRoute(other.to_string())),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProposeActionArgs {
    pub acting: OrganisationId,
    pub action_name: String,
    pub description: String,
    pub manual: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListActionArgs {
    pub action_name: String,
    pub description: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReplyToListingArgs {
    pub index: usize,
    pub decision: Decision,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreateVoteArgs {
    pub title: String,
    pub duration_minutes: u64,
    pub description: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CastBallotArgs {
    pub vote_id: u64,
    pub choice: Choice,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GetArgs {
    pub key: String,
    /// Which contract's namespace to read; `None` picks by key.
    pub route: Option<Route>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Operation {
    Register,
    ProposeAction(ProposeActionArgs),
    ListAction(ListActionArgs),
    ExecuteAction(ExecuteRequest),
    ReplyToListing(ReplyToListingArgs),
    CreateVote(CreateVoteArgs),
    CastBallot(CastBallotArgs),
    CloseVote { vote_id: u64 },
    /// Replace the token ledger wholesale (cross-contract sync).
    UpdateLedger { balances: Vec<u8> },
    Get(GetArgs),
    /// Re-initialise collections; `None` resets both contracts.
    Reset { route: Option<Route> },
}

fn require(operation: &'static str, args: &[String], expected: usize) -> Result<(), ArgumentError> {
    if args.len() < expected {
        return Err(ArgumentError::Missing {
            operation,
            expected,
            got: args.len(),
        });
    }
    Ok(())
}

fn parse_arg<T: FromStr>(
    operation: &'static str,
    argument: &'static str,
    value: &str,
) -> Result<T, ArgumentError> {
    value.trim().parse().map_err(|_| ArgumentError::Malformed {
        operation,
        argument,
        value: value.to_string(),
    })
}

fn parse_flag(operation: &'static str, argument: &'static str, value: &str) -> Result<bool, ArgumentError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" => Ok(true),
        "0" | "false" => Ok(false),
        _ => Err(ArgumentError::Malformed {
            operation,
            argument,
            value: value.to_string(),
        }),
    }
}

impl Operation {
    /// Parse an operation name (or one of its legacy aliases) and its arguments.
    ///
    /// Argument count is checked before anything else is read.
    pub fn parse(name: &str, args: &[String]) -> Result<Self, ArgumentError> {
        match name {
            "register" => Ok(Self::Register),
            "proposeAction" | "actionProposal" => {
                const OP: &str = "proposeAction";
                require(OP, args, 4)?;
                Ok(Self::ProposeAction(ProposeActionArgs {
                    acting: parse_arg(OP, "actingOrg", &args[0])?,
                    action_name: args[1].clone(),
                    description: args[2].clone(),
                    manual: parse_flag(OP, "manualFlag", &args[3])?,
                }))
            }
            "listAction" => {
                require("listAction", args, 2)?;
                Ok(Self::ListAction(ListActionArgs {
                    action_name: args[0].clone(),
                    description: args[1].clone(),
                }))
            }
            "executeAction" => {
                const OP: &str = "executeAction";
                match args {
                    [] => Err(ArgumentError::Missing {
                        operation: OP,
                        expected: 1,
                        got: 0,
                    }),
                    [action_name] => {
                        if action_name.trim().is_empty() {
                            return Err(ArgumentError::Malformed {
                                operation: OP,
                                argument: "selfProposedActionName",
                                value: action_name.clone(),
                            });
                        }
                        Ok(Self::ExecuteAction(ExecuteRequest::SelfProposed {
                            action_name: action_name.clone(),
                        }))
                    }
                    [index, decision, ..] => Ok(Self::ExecuteAction(ExecuteRequest::Respond {
                        index: parse_arg(OP, "index", index)?,
                        decision: parse_arg(OP, "decision", decision)?,
                    })),
                }
            }
            "replyToListing" | "replyProposal" => {
                const OP: &str = "replyToListing";
                require(OP, args, 2)?;
                Ok(Self::ReplyToListing(ReplyToListingArgs {
                    index: parse_arg(OP, "index", &args[0])?,
                    decision: parse_arg(OP, "decision", &args[1])?,
                }))
            }
            "createVote" => {
                const OP: &str = "createVote";
                require(OP, args, 3)?;
                Ok(Self::CreateVote(CreateVoteArgs {
                    title: args[0].clone(),
                    duration_minutes: parse_arg(OP, "durationMinutes", &args[1])?,
                    description: args[2].clone(),
                }))
            }
            "castBallot" | "replyVote" => {
                const OP: &str = "castBallot";
                require(OP, args, 2)?;
                Ok(Self::CastBallot(CastBallotArgs {
                    vote_id: parse_arg(OP, "voteId", &args[0])?,
                    choice: parse_arg(OP, "choice", &args[1])?,
                }))
            }
            "closeVote" | "closeVotes" => {
                const OP: &str = "closeVote";
                require(OP, args, 1)?;
                Ok(Self::CloseVote {
                    vote_id: parse_arg(OP, "voteId", &args[0])?,
                })
            }
            "updateLedger" | "updateOCLtoken" => {
                require("updateLedger", args, 1)?;
                Ok(Self::UpdateLedger {
                    balances: args[0].clone().into_bytes(),
                })
            }
            "get" => {
                require("get", args, 1)?;
                Ok(Self::Get(GetArgs {
                    key: args[0].clone(),
                    route: None,
                }))
            }
            "reset" => Ok(Self::Reset { route: None }),
            other => Err(ArgumentError::UnknownOperation(other.to_string())),
        }
    }

    /// Parse an operation addressed to a specific contract.
    pub fn parse_routed(route: Route, name: &str, args: &[String]) -> Result<Self, ArgumentError> {
        let op = Self::parse(name, args)?;
        if !op.served_by(route) {
            return Err(ArgumentError::WrongRoute {
                operation: op.name(),
                route: route.as_str(),
            });
        }
        Ok(match op {
            Self::Get(args) => Self::Get(GetArgs {
                route: Some(route),
                ..args
            }),
            Self::Reset { .. } => Self::Reset { route: Some(route) },
            other => other,
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Register => "register",
            Self::ProposeAction(_) => "proposeAction",
            Self::ListAction(_) => "listAction",
            Self::ExecuteAction(_) => "executeAction",
            Self::ReplyToListing(_) => "replyToListing",
            Self::CreateVote(_) => "createVote",
            Self::CastBallot(_) => "castBallot",
            Self::CloseVote { .. } => "closeVote",
            Self::UpdateLedger { .. } => "updateLedger",
            Self::Get(_) => "get",
            Self::Reset { .. } => "reset",
        }
    }

    /// Whether the contract behind `route` serves this operation.
    pub fn served_by(&self, route: Route) -> bool {
        match self {
            Self::Get(_) | Self::Reset { .. } => true,
            Self::Register
            | Self::CreateVote(_)
            | Self::CastBallot(_)
            | Self::CloseVote { .. }
            | Self::UpdateLedger { .. } => route == Route::Vote,
            Self::ProposeAction(_)
            | Self::ListAction(_)
            | Self::ExecuteAction(_)
            | Self::ReplyToListing(_) => route == Route::Action,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn missing_arguments_are_reported() {
        let err = Operation::parse("createVote", &args(&["title", "5"])).unwrap_err();
        assert_eq!(
            err,
            ArgumentError::Missing {
                operation: "createVote",
                expected: 3,
                got: 2
            }
        );
        assert_eq!(err.to_string(), "Need more args for createVote: expected 3, got 2.");
        assert!(Operation::parse("closeVote", &[]).is_err());
        assert!(Operation::parse("executeAction", &[]).is_err());
    }

    #[test]
    fn malformed_arguments_are_reported() {
        let err = Operation::parse("createVote", &args(&["t", "soon", "d"])).unwrap_err();
        assert!(matches!(err, ArgumentError::Malformed { argument: "durationMinutes", .. }));
        assert!(Operation::parse("castBallot", &args(&["0", "maybe"])).is_err());
        assert!(Operation::parse("proposeAction", &args(&["", "scaleVm", "d", "0"])).is_err());
        assert!(Operation::parse("proposeAction", &args(&["Org2MSP", "scaleVm", "d", "2"])).is_err());
    }

    #[test]
    fn execute_action_forms() {
        assert_eq!(
            Operation::parse("executeAction", &args(&["scaleVm"])).unwrap(),
            Operation::ExecuteAction(ExecuteRequest::SelfProposed {
                action_name: "scaleVm".into()
            })
        );
        assert_eq!(
            Operation::parse("executeAction", &args(&["3", "0"])).unwrap(),
            Operation::ExecuteAction(ExecuteRequest::Respond {
                index: 3,
                decision: Decision::Reject
            })
        );
        assert!(Operation::parse("executeAction", &args(&[" "])).is_err());
    }

    #[test]
    fn legacy_aliases() {
        let op = Operation::parse("actionProposal", &args(&["Org2MSP", "scaleVm", "d", "1"])).unwrap();
        assert_eq!(op.name(), "proposeAction");
        assert_eq!(Operation::parse("replyVote", &args(&["0", "yes"])).unwrap().name(), "castBallot");
        assert_eq!(Operation::parse("closeVotes", &args(&["0"])).unwrap().name(), "closeVote");
        assert_eq!(Operation::parse("updateOCLtoken", &args(&["[]"])).unwrap().name(), "updateLedger");
        assert_eq!(Operation::parse("replyProposal", &args(&["0", "1"])).unwrap().name(), "replyToListing");
    }

    #[test]
    fn unknown_operation() {
        assert_eq!(
            Operation::parse("mint", &[]).unwrap_err(),
            ArgumentError::UnknownOperation("mint".into())
        );
    }

    #[test]
    fn routing() {
        assert_eq!("vote".parse::<Route>().unwrap(), Route::Vote);
        assert!("token".parse::<Route>().is_err());

        let err = Operation::parse_routed(Route::Action, "createVote", &args(&["t", "1", "d"])).unwrap_err();
        assert_eq!(
            err,
            ArgumentError::WrongRoute {
                operation: "createVote",
                route: "action"
            }
        );
        let get = Operation::parse_routed(Route::Action, "get", &args(&["Operators"])).unwrap();
        assert_eq!(
            get,
            Operation::Get(GetArgs {
                key: "Operators".into(),
                route: Some(Route::Action)
            })
        );
        assert_eq!(
            Operation::parse_routed(Route::Vote, "reset", &[]).unwrap(),
            Operation::Reset {
                route: Some(Route::Vote)
            }
        );
    }
}
