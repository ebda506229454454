use proptest::prelude::*;

use tokengate_types::{RoleId, Signature, SubjectId, Timestamp, TokenAmount};

proptest! {
    /// Timestamp ordering: new(a) <= new(b) iff a <= b.
    #[test]
    fn timestamp_ordering(a in 0u64..u64::MAX, b in 0u64..u64::MAX) {
        let ta = Timestamp::new(a);
        let tb = Timestamp::new(b);
        prop_assert_eq!(ta <= tb, a <= b);
        prop_assert_eq!(ta == tb, a == b);
    }

    /// A deadline `ttl` seconds out is reached exactly when `ttl` seconds elapse.
    #[test]
    fn deadline_reached_after_ttl(start in 0u64..1_000_000_000, ttl in 0u64..100_000, dt in 0u64..200_000) {
        let created = Timestamp::new(start);
        let deadline = created.plus_secs(ttl);
        prop_assert_eq!(deadline.is_reached(created.plus_secs(dt)), dt >= ttl);
    }

    /// Role ids survive a Display/FromStr trip, which is how they travel over JSON.
    #[test]
    fn role_id_display_parse(raw in any::<u64>()) {
        let id = RoleId::new(raw);
        prop_assert_eq!(id.to_string().parse::<RoleId>().unwrap(), id);
    }

    /// Adding raw units never decreases the normalized balance.
    #[test]
    fn normalized_is_monotone(raw in 0u128..u64::MAX as u128, extra in 0u128..1_000_000, decimals in 0u8..12) {
        let lo = TokenAmount::new(raw, decimals).normalized();
        let hi = TokenAmount::new(raw + extra, decimals).normalized();
        prop_assert!(hi >= lo);
    }

    /// Only 64-byte slices convert into signatures.
    #[test]
    fn signature_length_gate(bytes in prop::collection::vec(any::<u8>(), 0..130)) {
        prop_assert_eq!(Signature::try_from(bytes.as_slice()).is_ok(), bytes.len() == 64);
    }

    /// Subject ids round-trip through bincode.
    #[test]
    fn subject_id_bincode_roundtrip(raw in "[0-9]{1,20}") {
        let id = SubjectId::new(raw).unwrap();
        let encoded = bincode::serialize(&id).unwrap();
        let decoded: SubjectId = bincode::deserialize(&encoded).unwrap();
        prop_assert_eq!(decoded, id);
    }
}
