use std::collections::HashMap;

use cucumber::World;
use storefront_engine::{
    db_types::{OrderNumber, Product},
    CheckoutError,
};

use crate::support::fixtures::TestStore;

#[derive(Default, Debug, World)]
pub struct StorefrontWorld {
    pub system: Option<TestStore>,
    pub products: HashMap<String, Product>,
    pub last_order: Option<OrderNumber>,
    pub last_error: Option<CheckoutError>,
}

impl StorefrontWorld {
    pub fn store(&self) -> &TestStore {
        self.system.as_ref().expect("The store has not been set up")
    }

    pub fn product(&self, name: &str) -> &Product {
        self.products.get(name).unwrap_or_else(|| panic!("No product called {name}"))
    }

    pub fn last_order(&self) -> &OrderNumber {
        self.last_order.as_ref().expect("No order has been placed")
    }

    /// Records the outcome of a checkout, including the order number of a failed payment.
    pub fn record_checkout<T>(&mut self, result: Result<T, CheckoutError>, number: impl Fn(&T) -> OrderNumber) {
        match result {
            Ok(value) => {
                self.last_order = Some(number(&value));
                self.last_error = None;
            },
            Err(e) => {
                match &e {
                    CheckoutError::PaymentDeclined { order_number, .. } |
                    CheckoutError::PaymentTimeout { order_number } => self.last_order = Some(order_number.clone()),
                    _ => {},
                }
                self.last_error = Some(e);
            },
        }
    }
}
