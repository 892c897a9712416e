//! Cart pricing.
//!
//! Everything here is a pure function of its inputs, so a total can be recomputed at any later date from the order's
//! line items and the shipping policy that was in force.
use serde::{Deserialize, Serialize};

use crate::{cart::CartEntry, db_types::Money};

pub const DEFAULT_SHIPPING_COST: Money = Money::new(50_000);
pub const DEFAULT_FREE_SHIPPING_THRESHOLD: Money = Money::new(5_000_000);

/// Flat-rate shipping that becomes free once the subtotal reaches a threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingPolicy {
    pub free_shipping_threshold: Money,
    pub flat_shipping_cost: Money,
}

impl Default for ShippingPolicy {
    fn default() -> Self {
        Self { free_shipping_threshold: DEFAULT_FREE_SHIPPING_THRESHOLD, flat_shipping_cost: DEFAULT_SHIPPING_COST }
    }
}

impl ShippingPolicy {
    pub fn new(free_shipping_threshold: Money, flat_shipping_cost: Money) -> Self {
        Self { free_shipping_threshold, flat_shipping_cost }
    }

    pub fn shipping_for(&self, sub_total: Money) -> Money {
        if sub_total >= self.free_shipping_threshold {
            Money::zero()
        } else {
            self.flat_shipping_cost
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartTotals {
    pub sub_total: Money,
    pub shipping_cost: Money,
    /// Always zero at checkout. Promotions are not applied.
    pub discount: Money,
    /// Always zero at checkout.
    pub tax: Money,
    pub total: Money,
}

/// `total = sub_total + shipping_cost + tax - discount`, where shipping is free iff `sub_total >= threshold`.
pub fn compute_totals(entries: &[CartEntry], policy: &ShippingPolicy) -> CartTotals {
    let sub_total = entries.iter().map(CartEntry::line_total).sum::<Money>();
    let shipping_cost = policy.shipping_for(sub_total);
    let discount = Money::zero();
    let tax = Money::zero();
    let total = sub_total + shipping_cost + tax - discount;
    CartTotals { sub_total, shipping_cost, discount, tax, total }
}
