//! Organisation identifier asserted by the platform per invocation.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid organisation identifier: {0:?}")]
pub struct InvalidOrganisation(pub String);

/// An opaque, stable organisation identifier (e.g. an MSP id such as `Org1MSP`).
///
/// Identifiers are never empty and carry no surrounding whitespace. The empty
/// string is reserved on the wire to mean "no counterpart".
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OrganisationId(String);

impl OrganisationId {
    /// Create an identifier, rejecting empty or padded strings.
    pub fn new(raw: impl Into<String>) -> Result<Self, InvalidOrganisation> {
        let s = raw.into();
        if s.is_empty() || s.trim() != s {
            return Err(InvalidOrganisation(s));
        }
        Ok(Self(s))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrganisationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for OrganisationId {
    type Error = InvalidOrganisation;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<OrganisationId> for String {
    fn from(id: OrganisationId) -> Self {
        id.0
    }
}

impl std::str::FromStr for OrganisationId {
    type Err = InvalidOrganisation;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}
