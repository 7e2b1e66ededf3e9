//! Nullable identity: the test decides who is calling.

use ocl_store::{IdentityError, IdentityProvider};
use ocl_types::OrganisationId;
use std::sync::Mutex;

pub struct NullIdentity {
    current: Mutex<Option<OrganisationId>>,
}

impl NullIdentity {
    /// An identity provider with no caller set.
    pub fn new() -> Self {
        Self {
            current: Mutex::new(None),
        }
    }

    /// An identity provider acting as `org`.
    ///
    /// # Panics
    /// Panics if `org` is not a valid organisation identifier.
    pub fn acting_as(org: &str) -> Self {
        let identity = Self::new();
        identity.act_as(org);
        identity
    }

    /// Switch the calling organisation.
    ///
    /// # Panics
    /// Panics if `org` is not a valid organisation identifier.
    pub fn act_as(&self, org: &str) {
        let org = OrganisationId::new(org).expect("test organisation id");
        *self.current.lock().unwrap() = Some(org);
    }

    /// Remove the caller so that identity resolution fails.
    pub fn clear(&self) {
        *self.current.lock().unwrap() = None;
    }
}

impl Default for NullIdentity {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentityProvider for NullIdentity {
    fn current_organisation(&self) -> Result<OrganisationId, IdentityError> {
        self.current
            .lock()
            .unwrap()
            .clone()
            .ok_or(IdentityError::Unavailable)
    }
}
