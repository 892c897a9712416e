use actix_web::{http::StatusCode, test, test::TestRequest, web, App};
use serde_json::{json, Value};
use storefront_engine::{
    traits::{FREE_SHIPPING_THRESHOLD_KEY, SHIPPING_COST_KEY},
    CartApi,
    MemorySessionStore,
};

use super::{
    helpers::{call, in_session, product},
    mocks::MockCatalog,
};
use crate::routes::{AddToCartRoute, ClearCartRoute, MyCartRoute, RemoveCartItemRoute, UpdateCartItemRoute};

fn catalog() -> MockCatalog {
    let mut catalog = MockCatalog::new();
    catalog.expect_fetch_product().returning(|id| {
        Ok(match id {
            1 => Some(product(1, 1_500_000, 3)),
            2 => Some(product(2, 900_000, 10)),
            3 => Some(storefront_engine::db_types::Product { is_active: false, ..product(3, 100_000, 10) }),
            _ => None,
        })
    });
    catalog.expect_fetch_setting().returning(|key| {
        Ok(match key {
            SHIPPING_COST_KEY => Some("60000".to_string()),
            FREE_SHIPPING_THRESHOLD_KEY => Some("5000000".to_string()),
            _ => None,
        })
    });
    catalog
}

macro_rules! cart_app {
    ($sessions:expr) => {
        test::init_service(
            App::new()
                .service(MyCartRoute::<MemorySessionStore, MockCatalog>::new())
                .service(ClearCartRoute::<MemorySessionStore, MockCatalog>::new())
                .service(AddToCartRoute::<MemorySessionStore, MockCatalog>::new())
                .service(UpdateCartItemRoute::<MemorySessionStore, MockCatalog>::new())
                .service(RemoveCartItemRoute::<MemorySessionStore, MockCatalog>::new())
                .app_data(web::Data::new(CartApi::new($sessions, catalog()))),
        )
        .await
    };
}

macro_rules! send {
    ($app:expr, $req:expr) => {{
        let res = test::call_service(&$app, in_session($req, "session-1").to_request()).await;
        let status = res.status();
        let body = test::read_body(res).await;
        (status, serde_json::from_slice::<Value>(&body).unwrap_or(Value::Null))
    }};
}

#[actix_web::test]
async fn carts_need_a_session() {
    let sessions = MemorySessionStore::new();
    let (status, body) = call(TestRequest::get().uri("/cart"), move |cfg| {
        cfg.service(MyCartRoute::<MemorySessionStore, MockCatalog>::new())
            .app_data(web::Data::new(CartApi::new(sessions, catalog())));
    })
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, r#"{"error":"The request does not carry a cart session id"}"#);
}

#[actix_web::test]
async fn a_cart_is_filled_and_priced() {
    let _ = env_logger::try_init();
    let app = cart_app!(MemorySessionStore::new());

    let (status, cart) = send!(app, TestRequest::get().uri("/cart"));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cart["item_count"], 0);

    let (status, cart) =
        send!(app, TestRequest::post().uri("/cart/items").set_json(json!({"product_id": 1, "quantity": 2})));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cart["entries"][0]["product_name"], "Product 1");
    assert_eq!(cart["totals"]["sub_total"], 3_000_000);
    assert_eq!(cart["totals"]["shipping_cost"], 60_000);
    assert_eq!(cart["totals"]["total"], 3_060_000);

    let (_, cart) = send!(app, TestRequest::post().uri("/cart/items").set_json(json!({"product_id": 2})));
    assert_eq!(cart["item_count"], 3);
    let (_, cart) = send!(app, TestRequest::patch().uri("/cart/items/2").set_json(json!({"delta": 2})));
    assert_eq!(cart["item_count"], 5);
    assert_eq!(cart["totals"]["sub_total"], 5_700_000);
    assert_eq!(cart["totals"]["shipping_cost"], 0, "Free shipping above the threshold");

    let (_, cart) = send!(app, TestRequest::delete().uri("/cart/items/1"));
    assert_eq!(cart["entries"].as_array().unwrap().len(), 1);
    assert_eq!(cart["entries"][0]["product_id"], 2);

    let (status, body) = send!(app, TestRequest::delete().uri("/cart"));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    let (_, cart) = send!(app, TestRequest::get().uri("/cart"));
    assert_eq!(cart["item_count"], 0);
}

#[actix_web::test]
async fn the_cart_respects_the_catalog() {
    let app = cart_app!(MemorySessionStore::new());
    let add = |product_id: i64, quantity: i64| {
        TestRequest::post().uri("/cart/items").set_json(json!({"product_id": product_id, "quantity": quantity}))
    };

    let (status, _) = send!(app, add(1, 3));
    assert_eq!(status, StatusCode::OK);
    let (status, body) = send!(app, add(1, 1));
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(
        body["error"],
        "The request conflicts with the current state. Product 1 has 3 units in stock, but 4 were requested"
    );

    let (status, _) = send!(app, add(3, 1));
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send!(app, add(99, 1));
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, body) = send!(app, add(2, 0));
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Could not read request body: Quantity must be at least 1, but was 0");

    let patch = |delta: i64| TestRequest::patch().uri("/cart/items/1").set_json(json!({ "delta": delta }));
    let (status, body) = send!(app, patch(i64::MAX));
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["error"],
        "Could not read request body: Changing the quantity of product 1 by 9223372036854775807 is out of range"
    );
    let (status, _) = send!(app, patch(1));
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, cart) = send!(app, TestRequest::get().uri("/cart"));
    assert_eq!(cart["item_count"], 3);
}
