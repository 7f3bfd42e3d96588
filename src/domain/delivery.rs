//! Coffee delivery record, one-to-one with a settlement.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::rates::FIAT_SCALE;

/// `weight * price` rounded to 2 decimals (banker's rounding, matching the
/// platform's historical `round()` behavior).
pub fn compute_total_mxn(weight_kg: Decimal, price_per_kg: Decimal) -> Decimal {
    (weight_kg * price_per_kg).round_dp(FIAT_SCALE)
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Delivery {
    pub id: Uuid,
    pub settlement_id: Uuid,
    #[schema(value_type = String)]
    pub weight_kg: Decimal,
    #[schema(value_type = String)]
    pub price_per_kg: Decimal,
    #[schema(value_type = String)]
    pub total_mxn: Decimal,
    pub delivered_at: DateTime<Utc>,
    pub notes: Option<String>,
}

impl Delivery {
    /// Builds a delivery for a settlement; `total_mxn` is always derived,
    /// never supplied.
    pub fn new(
        settlement_id: Uuid,
        weight_kg: Decimal,
        price_per_kg: Decimal,
        notes: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            settlement_id,
            weight_kg,
            price_per_kg,
            total_mxn: compute_total_mxn(weight_kg, price_per_kg),
            delivered_at: Utc::now(),
            notes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::str::FromStr;

    #[test]
    fn test_total_is_rounded_product() {
        let total = compute_total_mxn(
            Decimal::from_str("10.0").unwrap(),
            Decimal::from_str("50.0").unwrap(),
        );
        assert_eq!(total, Decimal::from_str("500.00").unwrap());
    }

    #[test]
    fn test_total_rounds_to_two_decimals() {
        let total = compute_total_mxn(
            Decimal::from_str("3.333").unwrap(),
            Decimal::from_str("7.77").unwrap(),
        );
        // 3.333 * 7.77 = 25.89741
        assert_eq!(total, Decimal::from_str("25.90").unwrap());
    }

    #[test]
    fn test_delivery_new_derives_total() {
        let delivery = Delivery::new(
            Uuid::new_v4(),
            Decimal::from_str("12.5").unwrap(),
            Decimal::from_str("48.80").unwrap(),
            None,
        );
        assert_eq!(delivery.total_mxn, Decimal::from_str("610.00").unwrap());
    }

    proptest! {
        #[test]
        fn prop_total_stable_and_two_dp(w in 1u32..100_000, p in 1u32..100_000) {
            // weights/prices with 2 decimal places, strictly positive
            let weight = Decimal::new(i64::from(w), 2);
            let price = Decimal::new(i64::from(p), 2);
            let total = compute_total_mxn(weight, price);
            prop_assert!(total.scale() <= 2);
            prop_assert_eq!(total, compute_total_mxn(weight, price));
        }
    }
}
