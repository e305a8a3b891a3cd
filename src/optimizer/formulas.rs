//! Provider-independent cost formulas. Each one takes generic pricing
//! parameters and returns a monthly cost in USD; no formula here knows
//! which cloud or service it is pricing.

use serde::Deserialize;

/// CM: message-based cost, `price_per_message * num_messages`. Used by
/// IoT Core (AWS) and IoT Hub (Azure).
pub fn message_based_cost(price_per_message: f64, num_messages: f64) -> f64 {
    price_per_message * num_messages
}

/// CE: execution-based cost for serverless compute — a free tier is
/// subtracted from both the request count and the compute-unit total
/// before pricing kicks in. Used by Lambda, Azure Functions, Cloud Functions.
#[allow(clippy::too_many_arguments)]
pub fn execution_based_cost(
    price_per_execution: f64,
    num_executions: f64,
    free_executions: f64,
    price_per_compute_unit: f64,
    total_compute_units: f64,
    free_compute_units: f64,
) -> f64 {
    let request_cost = price_per_execution * (num_executions - free_executions).max(0.0);
    let compute_cost = price_per_compute_unit * (total_compute_units - free_compute_units).max(0.0);
    request_cost + compute_cost
}

/// CA: action-based cost, `price_per_action * num_actions`. Used by
/// DynamoDB reads/writes, Step Functions transitions, EventBridge events,
/// Logic Apps actions, Event Grid operations, Cloud Workflows steps.
pub fn action_based_cost(price_per_action: f64, num_actions: f64) -> f64 {
    price_per_action * num_actions
}

/// CS: storage-based cost, `price_per_gb_month * volume_gb * duration_months`.
pub fn storage_based_cost(price_per_gb_month: f64, volume_gb: f64, duration_months: f64) -> f64 {
    price_per_gb_month * volume_gb * duration_months
}

/// CU: user/seat-based cost for licensed services, plus an optional
/// hourly term for self-hosted VMs.
pub fn user_based_cost(
    price_per_editor: f64,
    num_editors: u32,
    price_per_viewer: f64,
    num_viewers: u32,
    price_per_hour: f64,
    total_hours: f64,
) -> f64 {
    let seat_cost = price_per_editor * num_editors as f64 + price_per_viewer * num_viewers as f64;
    let time_cost = price_per_hour * total_hours;
    seat_cost + time_cost
}

/// CTransfer: data transfer/egress cost, `price_per_gb * gb_transferred`.
pub fn transfer_cost(price_per_gb: f64, gb_transferred: f64) -> f64 {
    price_per_gb * gb_transferred
}

/// One tier of a tiered pricing schedule. `limit` is the cumulative
/// volume at which this tier ends; `f64::INFINITY` (the deserialized
/// form of a JSON `"Infinity"` string) closes out the final tier.
#[derive(Debug, Clone, Deserialize)]
pub struct PricingTier {
    #[serde(deserialize_with = "deserialize_limit")]
    pub limit: f64,
    pub price: f64,
}

fn deserialize_limit<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum LimitValue {
        Number(f64),
        Text(String),
    }
    match LimitValue::deserialize(deserializer)? {
        LimitValue::Number(n) => Ok(n),
        LimitValue::Text(s) if s.eq_ignore_ascii_case("infinity") => Ok(f64::INFINITY),
        LimitValue::Text(s) => s.parse().map_err(serde::de::Error::custom),
    }
}

/// Walks `tiers` (assumed sorted ascending by `limit`) consuming
/// `volume` against each tier's capacity until it is exhausted.
fn tiered_cost(volume: f64, tiers: &[PricingTier]) -> f64 {
    let mut total = 0.0;
    let mut remaining = volume;
    let mut previous_limit = 0.0;

    for tier in tiers {
        let capacity = tier.limit - previous_limit;
        let in_tier = remaining.min(capacity);
        total += in_tier * tier.price;
        remaining -= in_tier;
        previous_limit = tier.limit;
        if remaining <= 0.0 {
            break;
        }
    }
    total
}

/// Tiered pricing for message-based services like IoT Core, where the
/// price per message decreases as monthly volume increases.
pub fn tiered_message_cost(num_messages: f64, tiers: &[PricingTier]) -> f64 {
    tiered_cost(num_messages, tiers)
}

/// Tiered pricing for data transfer/egress.
pub fn tiered_transfer_cost(gb_transferred: f64, tiers: &[PricingTier]) -> f64 {
    tiered_cost(gb_transferred, tiers)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn execution_cost_applies_free_tier_to_both_terms() {
        let cost = execution_based_cost(0.0000002, 500_000.0, 1_000_000.0, 0.0000166667, 100.0, 400_000.0);
        assert_eq!(cost, 0.0);
    }

    #[test]
    fn execution_cost_charges_past_free_tier() {
        let cost = execution_based_cost(0.0000002, 2_000_000.0, 1_000_000.0, 0.0000166667, 500_000.0, 400_000.0);
        let expected = 0.0000002 * 1_000_000.0 + 0.0000166667 * 100_000.0;
        assert!((cost - expected).abs() < 1e-9);
    }

    #[test]
    fn tiered_message_cost_splits_across_tiers() {
        let tiers = vec![
            PricingTier { limit: 1_000_000.0, price: 1.0 },
            PricingTier { limit: 4_000_000.0, price: 0.8 },
            PricingTier { limit: f64::INFINITY, price: 0.7 },
        ];
        let cost = tiered_message_cost(1_500_000.0, &tiers);
        let expected = 1_000_000.0 * 1.0 + 500_000.0 * 0.8;
        assert!((cost - expected).abs() < 1e-9);
    }

    #[test]
    fn tiered_message_cost_matches_spec_example() {
        let tiers = vec![
            PricingTier { limit: 1_000_000_000.0, price: 1.0 },
            PricingTier { limit: f64::INFINITY, price: 0.5 },
        ];
        let cost = tiered_message_cost(2_000_000_000.0, &tiers);
        assert!((cost - 1_500_000_000.0).abs() < 1e-3);
    }

    #[test]
    fn infinity_limit_deserializes_from_json_string() {
        let tier: PricingTier = serde_json::from_str(r#"{"limit": "Infinity", "price": 0.05}"#).unwrap();
        assert_eq!(tier.limit, f64::INFINITY);
    }

    #[test]
    fn storage_cost_scales_with_duration() {
        assert_eq!(storage_based_cost(0.023, 100.0, 3.0), 6.9);
    }
}
