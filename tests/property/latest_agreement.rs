// Copyright (c) 2025 - Cowboy AI, Inc.
//! Properties of latest-agreement selection

use authz_state_projector::AggregateKind;
use proptest::prelude::*;
use uuid::Uuid;

use super::block_on;
use crate::fixtures::{agreement_event, projector, purpose_rows, rows_for_purpose, PURPOSE_VERSION_1};

fn agreement_id(n: usize) -> Uuid {
    Uuid::from_u128(0x5100 + n as u128)
}

/// Indices of 2..5 agreements in a random delivery order
fn delivery_order() -> impl Strategy<Value = Vec<usize>> {
    (2usize..5).prop_flat_map(|n| Just((0..n).collect::<Vec<usize>>()).prop_shuffle())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Agreement n is activated at minute 10 * n, so the last index is latest
    /// whatever order the activations arrive in
    #[test]
    fn prop_fanout_converges_on_latest_agreement(order in delivery_order()) {
        let latest = agreement_id(order.len() - 1);

        let rows = block_on(async {
            let projector = projector(3);
            projector
                .tokens()
                .put_rows(purpose_rows(4, PURPOSE_VERSION_1, false))
                .await
                .unwrap();

            for n in &order {
                let id = agreement_id(*n).to_string();
                let envelope = agreement_event("AgreementActivated", 1, &id, "active", 10 * *n as i64);
                projector.dispatch(AggregateKind::Agreement, &envelope).await.unwrap();
            }
            rows_for_purpose(&projector).await
        });

        prop_assert_eq!(rows.len(), 4);
        for row in rows {
            prop_assert_eq!(row.agreement_id, Some(latest));
        }
    }
}
