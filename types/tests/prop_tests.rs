use proptest::prelude::*;

use ocl_types::{OrganisationId, Timestamp};

proptest! {
    /// Timestamp ordering: new(a) <= new(b) iff a <= b.
    #[test]
    fn timestamp_ordering(a in 0u64..u64::MAX, b in 0u64..u64::MAX) {
        let ta = Timestamp::new(a);
        let tb = Timestamp::new(b);
        prop_assert_eq!(ta <= tb, a <= b);
        prop_assert_eq!(ta == tb, a == b);
    }

    /// has_elapsed agrees with plain subtraction whenever now >= created.
    #[test]
    fn has_elapsed_matches_subtraction(created in 0u64..1_000_000, delta in 0u64..1_000_000, duration in 0u64..1_000_000) {
        let start = Timestamp::new(created);
        let now = Timestamp::new(created + delta);
        prop_assert_eq!(start.has_elapsed(duration, now), delta > duration);
    }

    /// Any non-empty identifier without surrounding whitespace is accepted verbatim.
    #[test]
    fn organisation_id_accepts_trimmed(raw in "[A-Za-z0-9][A-Za-z0-9._-]{0,30}") {
        let org = OrganisationId::new(raw.clone()).unwrap();
        prop_assert_eq!(org.as_str(), raw.as_str());
    }

    /// JSON roundtrip preserves the identifier.
    #[test]
    fn organisation_id_json_roundtrip(raw in "[A-Za-z][A-Za-z0-9]{0,20}MSP") {
        let org = OrganisationId::new(raw).unwrap();
        let json = serde_json::to_string(&org).unwrap();
        let back: OrganisationId = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(back, org);
    }
}
