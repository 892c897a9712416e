use std::time::Duration;

use actix_web::{http::StatusCode, test, test::TestRequest, web, App};
use chrono::Utc;
use serde_json::{json, Value};
use sf_common::Money;
use storefront_engine::{
    db_types::{NewProduct, OrderNumber},
    events::EventProducers,
    traits::{CatalogManagement, StorefrontDatabase},
    CartApi,
    CheckoutApi,
    CheckoutConfig,
    MemorySessionStore,
    OrderFlowApi,
    SimulatedGateway,
    SimulatedOutcome,
    SqliteDatabase,
};

use super::helpers::{as_customer, in_session};
use crate::routes::{AddToCartRoute, CheckoutRoute, ConfirmPaymentRoute, MyCartRoute, MyOrdersRoute, RetryPaymentRoute};

struct TempDatabase {
    db: SqliteDatabase,
    path: String,
}

impl TempDatabase {
    async fn new() -> Self {
        let path = std::env::temp_dir()
            .join(format!("sf_server_{}_{}.db", std::process::id(), Utc::now().timestamp_nanos_opt().unwrap_or_default()))
            .display()
            .to_string();
        let db = SqliteDatabase::new_with_url(&format!("sqlite://{path}"), 5).await.expect("Could not open database");
        db.migrate().await.expect("Migrations failed");
        Self { db, path }
    }

    async fn finish(self) {
        let Self { mut db, path } = self;
        db.close().await.expect("Could not close database");
        for suffix in ["", "-wal", "-shm"] {
            let _ = std::fs::remove_file(format!("{path}{suffix}"));
        }
    }
}

macro_rules! storefront_app {
    ($db:expr, $gateway:expr) => {{
        let config = CheckoutConfig { payment_timeout: Duration::from_millis(200), max_attempts: 3 };
        let checkout = CheckoutApi::new($db.clone(), $gateway.clone(), EventProducers::default()).with_config(config);
        test::init_service(
            App::new()
                .service(MyCartRoute::<MemorySessionStore, SqliteDatabase>::new())
                .service(AddToCartRoute::<MemorySessionStore, SqliteDatabase>::new())
                .service(CheckoutRoute::<SqliteDatabase, SimulatedGateway, MemorySessionStore>::new())
                .service(MyOrdersRoute::<SqliteDatabase>::new())
                .service(RetryPaymentRoute::<SqliteDatabase, SimulatedGateway>::new())
                .service(ConfirmPaymentRoute::<SqliteDatabase, SimulatedGateway>::new())
                .app_data(web::Data::new(CartApi::new(MemorySessionStore::new(), $db.clone())))
                .app_data(web::Data::new(checkout))
                .app_data(web::Data::new(OrderFlowApi::new($db.clone(), EventProducers::default()))),
        )
        .await
    }};
}

macro_rules! send {
    ($app:expr, $user:expr, $req:expr) => {{
        let req = as_customer(in_session($req, &format!("{}-session", $user)), $user);
        let res = test::call_service(&$app, req.to_request()).await;
        let status = res.status();
        let body = test::read_body(res).await;
        (status, serde_json::from_slice::<Value>(&body).unwrap_or(Value::Null))
    }};
}

fn checkout_body(user: &str) -> Value {
    json!({
        "customer_email": format!("{user}@example.com"),
        "shipping": {"address": " 12 Valiasr St ", "city": "Tehran", "postal_code": "1136915", "phone": "09120000000"}
    })
}

#[actix_web::test]
async fn a_session_cart_is_checked_out() {
    let _ = env_logger::try_init();
    let temp = TempDatabase::new().await;
    let lock = temp
        .db
        .insert_product(NewProduct::new("Smart Door Lock", "LOCK-1", Money::from(1_500_000), 5))
        .await
        .unwrap();
    let gateway = SimulatedGateway::new(SimulatedOutcome::Approve);
    let app = storefront_app!(temp.db, gateway);

    let add = TestRequest::post().uri("/cart/items").set_json(json!({"product_id": lock.id, "quantity": 2}));
    let (status, _) = send!(app, "alice", add);
    assert_eq!(status, StatusCode::OK);

    let (status, paid) = send!(app, "alice", TestRequest::post().uri("/checkout").set_json(checkout_body("alice")));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(paid["order"]["status"], "Paid");
    assert_eq!(paid["order"]["total_amount"], 3_050_000);
    assert_eq!(paid["order"]["shipping_address"], "12 Valiasr St");
    assert_eq!(paid["items"][0]["quantity"], 2);
    assert_eq!(temp.db.fetch_product(lock.id).await.unwrap().unwrap().stock_quantity, 3);

    let (_, cart) = send!(app, "alice", TestRequest::get().uri("/cart"));
    assert_eq!(cart["item_count"], 0, "The cart is emptied once the order is stored");

    // Confirming a payment that already went through changes nothing
    let order_number = OrderNumber::from(paid["order"]["order_number"].as_str().unwrap());
    let txid = gateway.transaction_for(&order_number).unwrap();
    let confirm = TestRequest::post()
        .uri(&format!("/orders/{order_number}/confirm_payment"))
        .set_json(json!({"transaction_id": txid}));
    let (status, confirmed) = send!(app, "alice", confirm);
    assert_eq!(status, StatusCode::OK);
    assert_eq!(confirmed["order"], paid["order"]);
    assert_eq!(temp.db.fetch_product(lock.id).await.unwrap().unwrap().stock_quantity, 3);
    temp.finish().await;
}

#[actix_web::test]
async fn declined_payments_can_be_retried_by_their_owner() {
    let _ = env_logger::try_init();
    let temp = TempDatabase::new().await;
    let hub = temp.db.insert_product(NewProduct::new("Smart Hub", "HUB-1", Money::from(900_000), 4)).await.unwrap();
    let gateway = SimulatedGateway::new(SimulatedOutcome::Decline);
    let app = storefront_app!(temp.db, gateway);

    let add = TestRequest::post().uri("/cart/items").set_json(json!({"product_id": hub.id, "quantity": 1}));
    send!(app, "alice", add);
    let (status, body) = send!(app, "alice", TestRequest::post().uri("/checkout").set_json(checkout_body("alice")));
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    assert!(body["error"].as_str().unwrap().contains("was declined"));
    assert_eq!(temp.db.fetch_product(hub.id).await.unwrap().unwrap().stock_quantity, 4);

    let (status, orders) = send!(app, "alice", TestRequest::get().uri("/orders"));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(orders[0]["status"], "Pending");
    let order_number = orders[0]["order_number"].as_str().unwrap().to_string();
    let retry = || {
        TestRequest::post()
            .uri(&format!("/orders/{order_number}/retry_payment"))
            .set_json(json!({"customer_email": "alice@example.com"}))
    };

    gateway.set_outcome(SimulatedOutcome::Approve);
    let (status, _) = send!(app, "mallory", retry());
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, paid) = send!(app, "alice", retry());
    assert_eq!(status, StatusCode::OK);
    assert_eq!(paid["order"]["status"], "Paid");
    assert_eq!(temp.db.fetch_product(hub.id).await.unwrap().unwrap().stock_quantity, 3);

    let (status, _) = send!(app, "alice", retry());
    assert_eq!(status, StatusCode::CONFLICT, "A paid order cannot be paid again");
    temp.finish().await;
}

#[actix_web::test]
async fn empty_carts_and_bad_forms_are_rejected() {
    let temp = TempDatabase::new().await;
    let gateway = SimulatedGateway::new(SimulatedOutcome::Approve);
    let app = storefront_app!(temp.db, gateway);

    let (status, body) = send!(app, "bob", TestRequest::post().uri("/checkout").set_json(checkout_body("bob")));
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Could not read request body: The cart is empty");

    let (status, _) = send!(app, "bob", TestRequest::post().uri("/checkout").set_json(json!({"shipping": {}})));
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let anonymous = TestRequest::post().uri("/checkout").set_json(checkout_body("bob")).to_request();
    let res = test::call_service(&app, anonymous).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(gateway.captured_total(), Money::from(0));
    temp.finish().await;
}

#[actix_web::test]
async fn lost_payments_are_confirmed_against_their_own_order() {
    let _ = env_logger::try_init();
    let temp = TempDatabase::new().await;
    let hub = temp.db.insert_product(NewProduct::new("Smart Hub", "HUB-1", Money::from(900_000), 4)).await.unwrap();
    let gateway = SimulatedGateway::new(SimulatedOutcome::Timeout).with_hang_time(Duration::from_secs(5));
    let app = storefront_app!(temp.db, gateway);

    macro_rules! unpaid_order {
        ($user:expr, $expected:expr) => {{
            let add = TestRequest::post().uri("/cart/items").set_json(json!({"product_id": hub.id, "quantity": 1}));
            send!(app, $user, add);
            let (status, _) = send!(app, $user, TestRequest::post().uri("/checkout").set_json(checkout_body($user)));
            assert_eq!(status, $expected);
            let (_, orders) = send!(app, $user, TestRequest::get().uri("/orders"));
            OrderNumber::from(orders[0]["order_number"].as_str().unwrap())
        }};
    }
    let alice_order = unpaid_order!("alice", StatusCode::GATEWAY_TIMEOUT);
    gateway.set_outcome(SimulatedOutcome::Decline);
    let bob_order = unpaid_order!("bob", StatusCode::PAYMENT_REQUIRED);
    let confirm = |order_number: &OrderNumber, body: Value| {
        TestRequest::post().uri(&format!("/orders/{order_number}/confirm_payment")).set_json(body)
    };

    // Alice's capture cannot settle Bob's order
    let alice_txid = gateway.transaction_for(&alice_order).unwrap();
    let (status, body) = send!(app, "bob", confirm(&bob_order, json!({"transaction_id": alice_txid})));
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    assert!(body["error"].as_str().unwrap().contains("was not captured for order"));
    let (status, _) = send!(app, "bob", confirm(&bob_order, json!({})));
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    assert_eq!(temp.db.fetch_product(hub.id).await.unwrap().unwrap().stock_quantity, 4);

    let (status, paid) = send!(app, "alice", confirm(&alice_order, json!({})));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(paid["order"]["status"], "Paid");
    assert_eq!(paid["order"]["transaction_id"], alice_txid.as_str());
    assert_eq!(temp.db.fetch_product(hub.id).await.unwrap().unwrap().stock_quantity, 3);
    temp.finish().await;
}
