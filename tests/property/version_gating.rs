// Copyright (c) 2025 - Cowboy AI, Inc.
//! Properties of version-gated writes

use authz_state_projector::{AggregateKind, ItemState};
use proptest::prelude::*;

use super::block_on;
use crate::fixtures::{descriptor_event, descriptor_id, eservice_id, projector};

/// Stream versions 1..=n in a random delivery order, each with a state
fn deliveries() -> impl Strategy<Value = Vec<(u64, bool)>> {
    (1u64..12)
        .prop_flat_map(|n| {
            (
                Just((1..=n).collect::<Vec<u64>>()).prop_shuffle(),
                prop::collection::vec(any::<bool>(), n as usize),
            )
        })
        .prop_map(|(order, published)| {
            order
                .into_iter()
                .map(|version| (version, published[(version - 1) as usize]))
                .collect()
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// The stored row always reflects the highest stream version delivered
    #[test]
    fn prop_stored_version_is_max_delivered(deliveries in deliveries()) {
        let max = deliveries.iter().map(|(v, _)| *v).max().unwrap_or(0);
        let expected_state = deliveries
            .iter()
            .find(|(v, _)| *v == max)
            .map(|(_, published)| if *published { ItemState::Active } else { ItemState::Inactive });

        let stored = block_on(async {
            let projector = projector(4);
            for (version, published) in &deliveries {
                let envelope = if *published {
                    descriptor_event("EServiceDescriptorPublished", *version, "published")
                } else {
                    descriptor_event("EServiceDescriptorSuspended", *version, "suspended")
                };
                projector.dispatch(AggregateKind::Catalog, &envelope).await.unwrap();
            }
            projector
                .platform()
                .read_catalog(eservice_id(), descriptor_id())
                .await
                .unwrap()
        });

        let stored = stored.expect("descriptor row");
        prop_assert_eq!(stored.version, max);
        prop_assert_eq!(Some(stored.state), expected_state);
    }
}
