//! Property tests for the metadata and file digests: determinism and
//! single-field / single-byte sensitivity.

use lic_core::{
    file_digest, BusinessStatus, CaseId, LicenseMetadata, Timestamp,
};
use proptest::prelude::*;

fn status() -> impl Strategy<Value = BusinessStatus> {
    prop_oneof![
        Just(BusinessStatus::Active),
        Just(BusinessStatus::ExpiringSoon),
        Just(BusinessStatus::Expired),
        Just(BusinessStatus::Revoked),
    ]
}

fn metadata() -> impl Strategy<Value = LicenseMetadata> {
    (
        "[a-z-]{1,16}",
        "[A-Z]{2}-[0-9]{4}-[0-9]{4}",
        0i64..2_000_000_000,
        0i64..200_000_000,
        status(),
    )
        .prop_map(|(license_type, license_number, from, span, business_status)| {
            let from_dt = chrono::DateTime::from_timestamp(from, 0).unwrap();
            let until_dt = chrono::DateTime::from_timestamp(from + span, 0).unwrap();
            LicenseMetadata {
                license_type,
                license_number,
                effective_from: Timestamp::from_utc(from_dt),
                effective_until: Timestamp::from_utc(until_dt),
                business_status,
            }
        })
}

proptest! {
    #[test]
    fn h1_is_deterministic(m in metadata()) {
        let case_id = CaseId::new();
        prop_assert_eq!(m.digest(&case_id), m.clone().digest(&case_id));
    }

    #[test]
    fn h1_changes_with_license_number(m in metadata(), suffix in "[0-9]{1,3}") {
        let case_id = CaseId::new();
        let mut changed = m.clone();
        changed.license_number.push_str(&suffix);
        prop_assert_ne!(m.digest(&case_id), changed.digest(&case_id));
    }

    #[test]
    fn h1_changes_with_effective_until(m in metadata(), bump in 1i64..1_000_000) {
        let case_id = CaseId::new();
        let mut changed = m.clone();
        let later = *changed.effective_until.as_datetime() + chrono::Duration::seconds(bump);
        changed.effective_until = Timestamp::from_utc(later);
        prop_assert_ne!(m.digest(&case_id), changed.digest(&case_id));
    }

    #[test]
    fn h1_changes_with_license_type(m in metadata(), suffix in "[a-z]{1,4}") {
        let case_id = CaseId::new();
        let mut changed = m.clone();
        changed.license_type.push_str(&suffix);
        prop_assert_ne!(m.digest(&case_id), changed.digest(&case_id));
    }

    #[test]
    fn h1_changes_with_effective_from(m in metadata(), shift in 1i64..1_000_000) {
        let case_id = CaseId::new();
        let mut changed = m.clone();
        let earlier = *changed.effective_from.as_datetime() - chrono::Duration::seconds(shift);
        changed.effective_from = Timestamp::from_utc(earlier);
        prop_assert_ne!(m.digest(&case_id), changed.digest(&case_id));
    }

    #[test]
    fn h1_changes_with_case(m in metadata()) {
        prop_assert_ne!(m.digest(&CaseId::new()), m.digest(&CaseId::new()));
    }

    #[test]
    fn h2_is_deterministic(bytes in proptest::collection::vec(any::<u8>(), 0..4096)) {
        let a = file_digest(&bytes[..]).unwrap();
        let b = file_digest(&bytes[..]).unwrap();
        prop_assert_eq!(a, b);
    }

    #[test]
    fn h2_changes_with_any_byte(
        bytes in proptest::collection::vec(any::<u8>(), 1..4096),
        idx in any::<proptest::sample::Index>(),
        flip in 1u8..=255,
    ) {
        let mut changed = bytes.clone();
        let i = idx.index(changed.len());
        changed[i] ^= flip;
        prop_assert_ne!(file_digest(&bytes[..]).unwrap(), file_digest(&changed[..]).unwrap());
    }
}

#[test]
fn h1_changes_with_status() {
    let m = LicenseMetadata {
        license_type: "retail".into(),
        license_number: "RT-0001-0001".into(),
        effective_from: Timestamp::parse("2026-01-01T00:00:00Z").unwrap(),
        effective_until: Timestamp::parse("2027-01-01T00:00:00Z").unwrap(),
        business_status: BusinessStatus::Active,
    };
    let case_id = CaseId::new();
    let mut revoked = m.clone();
    revoked.business_status = BusinessStatus::Revoked;
    assert_ne!(m.digest(&case_id), revoked.digest(&case_id));
}
