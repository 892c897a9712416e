//! Human-readable order numbers.
//!
//! An order number looks like `ORD-20240315143012-4821`: a prefix, the UTC timestamp to the second, and a random four
//! digit suffix. This is not collision free on its own. Uniqueness is enforced by the unique index on
//! `orders.order_number`, and the checkout pipeline draws a fresh number whenever an insert reports a conflict.
use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

use chrono::{DateTime, Utc};
use rand::Rng;

use crate::db_types::OrderNumber;

pub const DEFAULT_ORDER_PREFIX: &str = "ORD";

#[derive(Debug, Clone)]
pub struct OrderNumberGenerator {
    prefix: String,
    scripted: Arc<Mutex<VecDeque<OrderNumber>>>,
}

impl Default for OrderNumberGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_ORDER_PREFIX)
    }
}

impl OrderNumberGenerator {
    pub fn new<S: Into<String>>(prefix: S) -> Self {
        Self { prefix: prefix.into(), scripted: Arc::new(Mutex::new(VecDeque::new())) }
    }

    /// A generator that hands out `numbers` in order before falling back to random numbers.
    pub fn scripted<I: IntoIterator<Item = OrderNumber>>(numbers: I) -> Self {
        let gen = Self::default();
        if let Ok(mut queue) = gen.scripted.lock() {
            queue.extend(numbers);
        }
        gen
    }

    pub fn next_number(&self) -> OrderNumber {
        let scripted = self.scripted.lock().ok().and_then(|mut q| q.pop_front());
        scripted.unwrap_or_else(|| {
            let suffix = rand::thread_rng().gen_range(1000..=9999);
            self.number_at(Utc::now(), suffix)
        })
    }

    pub fn number_at(&self, at: DateTime<Utc>, suffix: u16) -> OrderNumber {
        OrderNumber::from(format!("{}-{}-{suffix:04}", self.prefix, at.format("%Y%m%d%H%M%S")))
    }
}
