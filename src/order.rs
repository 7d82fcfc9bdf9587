//! Synthetic order payloads and the rules used to randomize them.
//!
//! Every order in a batch shares the same instrument, type and quantity. Two
//! things vary per order: the side, which alternates with the index so a batch
//! of any size puts balanced pressure on both sides of the book, and the price,
//! which is the base price plus uniform jitter drawn independently per order.
use rand::Rng;
use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::config::BenchConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// Even indices buy, odd indices sell.
    pub fn for_index(index: usize) -> Self {
        if index % 2 == 0 { Side::Buy } else { Side::Sell }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    #[default]
    Limit,
}

/// The JSON body posted to `{base_url}/orders`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub client_id: String,
    pub instrument: String,
    pub side: Side,
    #[serde(rename = "type")]
    pub order_type: OrderType,
    pub price: f64,
    pub quantity: f64,
}

/// Builds the orders of a run.
///
/// The factory holds what is fixed for the whole run; the label, index and jitter
/// bound are supplied per order so a single factory serves every stage.
#[derive(Debug, Clone, TypedBuilder)]
pub struct OrderFactory {
    #[builder(default = String::from("BTC-USD"), setter(into))]
    pub instrument: String,
    #[builder(default = 70_000.0)]
    pub base_price: f64,
    #[builder(default = 0.01)]
    pub quantity: f64,
}

impl OrderFactory {
    pub fn from_config(config: &BenchConfig) -> Self {
        Self {
            instrument: config.instrument.clone(),
            base_price: config.base_price,
            quantity: config.quantity,
        }
    }

    /// Build the order at `index` of the batch identified by `label`.
    ///
    /// `client_id` is `"{label}-{index}"`, so it is unique within a run as long as
    /// each batch gets its own label.
    pub fn build_order(&self, label: &str, index: usize, jitter_bound: f64) -> Order {
        self.build_order_with(&mut rand::thread_rng(), label, index, jitter_bound)
    }

    /// Same as [`OrderFactory::build_order`] with a caller supplied RNG.
    pub fn build_order_with<R: Rng>(
        &self,
        rng: &mut R,
        label: &str,
        index: usize,
        jitter_bound: f64,
    ) -> Order {
        let bound = jitter_bound.abs();
        // the sampled range must have a finite width
        let jitter = if bound > 0.0 && (bound * 2.0).is_finite() {
            rng.gen_range(-bound..=bound)
        } else {
            0.0
        };
        // price must stay positive even if the bound exceeds the base price
        let price = (self.base_price + jitter).max(f64::EPSILON);

        Order {
            client_id: format!("{label}-{index}"),
            instrument: self.instrument.clone(),
            side: Side::for_index(index),
            order_type: OrderType::Limit,
            price,
            quantity: self.quantity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{SeedableRng, rngs::StdRng};

    #[test]
    fn sides_alternate_by_index_parity() {
        let factory = OrderFactory::builder().build();
        for index in 0..101 {
            let order = factory.build_order("run", index, 100.0);
            let expected = if index % 2 == 0 { Side::Buy } else { Side::Sell };
            assert_eq!(order.side, expected, "index {index}");
        }
    }

    #[test]
    fn price_stays_within_jitter_bound() {
        let factory = OrderFactory::builder().base_price(70_000.0).build();
        let mut rng = StdRng::seed_from_u64(7);
        for index in 0..1_000 {
            let order = factory.build_order_with(&mut rng, "run", index, 50.0);
            assert!(order.price >= 69_950.0 && order.price <= 70_050.0);
        }
    }

    #[test]
    fn zero_jitter_keeps_base_price() {
        let factory = OrderFactory::builder().base_price(123.5).build();
        let order = factory.build_order("run", 3, 0.0);
        assert_eq!(order.price, 123.5);
    }

    #[test]
    fn price_is_positive_when_bound_exceeds_base() {
        let factory = OrderFactory::builder().base_price(1.0).build();
        let mut rng = StdRng::seed_from_u64(42);
        for index in 0..500 {
            let order = factory.build_order_with(&mut rng, "run", index, 10.0);
            assert!(order.price > 0.0);
        }
    }

    #[test]
    fn unsampleable_bound_falls_back_to_base_price() {
        let factory = OrderFactory::builder().build();
        for bound in [f64::INFINITY, f64::NAN, f64::MAX] {
            let order = factory.build_order("run", 0, bound);
            assert_eq!(order.price, 70_000.0, "{bound}");
        }
    }

    #[test]
    fn client_ids_are_unique_per_label_and_index() {
        let factory = OrderFactory::builder().build();
        let a = factory.build_order("abc-s1", 0, 50.0);
        let b = factory.build_order("abc-s1", 1, 50.0);
        let c = factory.build_order("abc-s2", 0, 50.0);
        assert_eq!(a.client_id, "abc-s1-0");
        assert_ne!(a.client_id, b.client_id);
        assert_ne!(a.client_id, c.client_id);
    }

    #[test]
    fn serializes_to_wire_shape() {
        let factory = OrderFactory::builder().build();
        let order = factory.build_order("seq", 1, 0.0);
        let json = serde_json::to_value(&order).unwrap();

        assert_eq!(json["client_id"], "seq-1");
        assert_eq!(json["instrument"], "BTC-USD");
        assert_eq!(json["side"], "sell");
        assert_eq!(json["type"], "limit");
        assert_eq!(json["price"], 70_000.0);
        assert_eq!(json["quantity"], 0.01);
        assert!(json.get("order_type").is_none());
    }
}
