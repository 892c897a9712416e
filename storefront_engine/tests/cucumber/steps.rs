use std::time::Duration;

use cucumber::{then, when};
use storefront_engine::{
    db_types::{Money, OrderStatusType},
    traits::{InventoryManagement, OrderManagement},
    CheckoutError,
    ReviewApi,
};

use crate::{
    cucumber::StorefrontWorld,
    support::fixtures::{cart_of, request},
};

#[when(expr = "customer {word} checks out {int} of {string}")]
async fn checkout(world: &mut StorefrontWorld, user: String, quantity: i64, name: String) {
    let cart = cart_of(&[(world.product(&name), quantity)]);
    let result = world.store().checkout.checkout(&cart, request(&user)).await;
    world.record_checkout(result, |paid| paid.order.order_number.clone());
}

#[when(expr = "customer {word} retries payment for the last order")]
async fn retry_payment(world: &mut StorefrontWorld, user: String) {
    let number = world.last_order().clone();
    let result = world.store().checkout.retry_payment(&number, &format!("{user}@example.com")).await;
    world.record_checkout(result, |paid| paid.order.order_number.clone());
}

#[when("the captured payment for the last order is confirmed")]
async fn confirm_payment(world: &mut StorefrontWorld) {
    let number = world.last_order().clone();
    let txid = world.store().gateway.transaction_for(&number).expect("The gateway has no payment for this order");
    let result = world.store().checkout.confirm_payment(&number, &txid).await;
    world.record_checkout(result, |paid| paid.order.order_number.clone());
}

#[when(expr = "the last order moves to {word}")]
async fn move_order(world: &mut StorefrontWorld, status: String) {
    let status = status.parse::<OrderStatusType>().expect("Not an order status");
    let number = world.last_order().clone();
    world.store().orders.modify_status_for_order(&number, status).await.expect("Error changing order status");
}

#[when(expr = "I pause for {int}ms")]
async fn pause(_world: &mut StorefrontWorld, ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

#[then(expr = "the last order is {word} with a total of {int}")]
async fn check_last_order(world: &mut StorefrontWorld, status: String, total: i64) {
    let number = world.last_order().clone();
    let order = world.store().db.fetch_order_by_number(&number).await.unwrap().expect("Order does not exist");
    assert_eq!(order.status.to_string(), status);
    assert_eq!(order.total_amount, Money::from(total));
}

#[then(expr = "the checkout fails with {word}")]
async fn check_failure(world: &mut StorefrontWorld, kind: String) {
    let err = world.last_error.as_ref().expect("The last checkout succeeded");
    let matched = match kind.as_str() {
        "PaymentDeclined" => matches!(err, CheckoutError::PaymentDeclined { .. }),
        "PaymentTimeout" => matches!(err, CheckoutError::PaymentTimeout { .. }),
        "InsufficientStock" => matches!(err, CheckoutError::InsufficientStock { .. }),
        "EmptyCart" => matches!(err, CheckoutError::EmptyCart),
        other => panic!("Unknown failure kind: {other}"),
    };
    assert!(matched, "Expected {kind}, got {err:?}");
}

#[then(expr = "{string} has {int} in stock")]
async fn check_stock(world: &mut StorefrontWorld, name: String, expected: i64) {
    let id = world.product(&name).id;
    assert_eq!(world.store().stock_of(id).await, expected);
}

#[then(expr = "{string} has {int} stock log entries")]
async fn check_stock_logs(world: &mut StorefrontWorld, name: String, expected: usize) {
    let id = world.product(&name).id;
    let logs = world.store().db.fetch_stock_logs(id).await.unwrap();
    assert_eq!(logs.len(), expected);
}

#[then(expr = "customer {word} has {int} orders")]
async fn check_order_count(world: &mut StorefrontWorld, user: String, expected: usize) {
    let orders = world.store().db.fetch_orders_for_user(&user).await.unwrap();
    assert_eq!(orders.len(), expected);
}

#[then(expr = "customer {word} {word} review {string}")]
async fn check_review_eligibility(world: &mut StorefrontWorld, user: String, verb: String, name: String) {
    let id = world.product(&name).id;
    let reviews = ReviewApi::new(world.store().db.clone());
    let can_review = reviews.can_review(&user, id).await.unwrap();
    match verb.as_str() {
        "can" => assert!(can_review, "{user} should be able to review {name}"),
        "cannot" => assert!(!can_review, "{user} should not be able to review {name}"),
        other => panic!("Unknown verb: {other}"),
    }
}
