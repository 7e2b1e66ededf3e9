//! Fundamental types for the OCL governance engine.
//!
//! This crate defines the types shared across every other crate in the workspace:
//! organisation identifiers, timestamps and the clock abstraction.

pub mod organisation;
pub mod time;

pub use organisation::{InvalidOrganisation, OrganisationId};
pub use time::{Clock, SystemClock, Timestamp};
