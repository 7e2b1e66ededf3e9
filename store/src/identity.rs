//! Caller identity resolution.

use ocl_types::OrganisationId;

use crate::IdentityError;

/// Maps the calling party of the current invocation to its organisation.
pub trait IdentityProvider: Send + Sync {
    fn current_organisation(&self) -> Result<OrganisationId, IdentityError>;
}

/// An identity fixed at construction time (one process acts for one organisation).
#[derive(Clone, Debug)]
pub struct StaticIdentity(Option<OrganisationId>);

impl StaticIdentity {
    pub fn new(org: OrganisationId) -> Self {
        Self(Some(org))
    }

    /// No configured organisation: operations that need a caller fail.
    pub fn anonymous() -> Self {
        Self(None)
    }
}

impl IdentityProvider for StaticIdentity {
    fn current_organisation(&self) -> Result<OrganisationId, IdentityError> {
        self.0.clone().ok_or(IdentityError::Unavailable)
    }
}
