// Copyright (c) 2025 - Cowboy AI, Inc.
//! Properties of purpose version selection

use authz_state_projector::derivation::{
    platform_purpose_entry, purpose_fields, purpose_item_state, winning_purpose_version,
};
use authz_state_projector::domain::{Purpose, PurposeVersion, PurposeVersionState};
use authz_state_projector::model::PurposeFields;
use authz_state_projector::ItemState;
use proptest::prelude::*;
use uuid::Uuid;

use crate::fixtures::{at_minute, consumer_id, eservice_id, fixed_timestamp, purpose_id};

fn version_state() -> impl Strategy<Value = PurposeVersionState> {
    prop_oneof![
        Just(PurposeVersionState::Draft),
        Just(PurposeVersionState::Active),
        Just(PurposeVersionState::Suspended),
        Just(PurposeVersionState::Archived),
        Just(PurposeVersionState::WaitingForApproval),
        Just(PurposeVersionState::Rejected),
    ]
}

/// Purposes with up to six versions; creation minutes may collide
fn purpose() -> impl Strategy<Value = Purpose> {
    prop::collection::vec((version_state(), 0i64..5), 0..6).prop_map(|versions| Purpose {
        id: purpose_id(),
        eservice_id: eservice_id(),
        consumer_id: consumer_id(),
        title: String::new(),
        versions: versions
            .into_iter()
            .enumerate()
            .map(|(n, (state, minute))| PurposeVersion {
                id: Uuid::from_u128(0x4100 + n as u128),
                state,
                created_at: at_minute(minute),
                daily_calls: 0,
            })
            .collect(),
    })
}

fn is_candidate(state: PurposeVersionState) -> bool {
    matches!(
        state,
        PurposeVersionState::Active | PurposeVersionState::Suspended | PurposeVersionState::Archived
    )
}

proptest! {
    /// No candidate version is newer than the winner
    #[test]
    fn prop_winner_is_newest_candidate(purpose in purpose()) {
        let winner = winning_purpose_version(&purpose);
        let candidates: Vec<_> = purpose.versions.iter().filter(|v| is_candidate(v.state)).collect();

        match winner {
            None => prop_assert!(candidates.is_empty()),
            Some(w) => {
                prop_assert!(is_candidate(w.state));
                for c in candidates {
                    prop_assert!((c.created_at, c.id) <= (w.created_at, w.id));
                }
            }
        }
    }

    /// Version order in the snapshot does not affect the winner
    #[test]
    fn prop_winner_ignores_snapshot_order(purpose in purpose()) {
        let mut reversed = purpose.clone();
        reversed.versions.reverse();

        prop_assert_eq!(
            winning_purpose_version(&purpose).map(|v| v.id),
            winning_purpose_version(&reversed).map(|v| v.id)
        );
    }

    /// Fan-out fields rebuilt from the platform row equal those derived from the snapshot
    #[test]
    fn prop_platform_row_carries_fanout_fields(purpose in purpose()) {
        let entry = platform_purpose_entry(&purpose, 1, fixed_timestamp());
        let fields = purpose_fields(&purpose);

        prop_assert_eq!(entry.is_some(), fields.is_some());
        if let (Some(entry), Some(fields)) = (entry, fields) {
            prop_assert_eq!(PurposeFields::from(&entry), fields);
        }
    }

    /// A purpose is active exactly when one of its versions is
    #[test]
    fn prop_item_state_follows_active_version(purpose in purpose()) {
        let any_active = purpose.versions.iter().any(|v| v.state == PurposeVersionState::Active);
        prop_assert_eq!(purpose_item_state(&purpose) == ItemState::Active, any_active);
    }
}
