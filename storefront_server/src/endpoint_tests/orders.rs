use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use mockall::predicate::eq;
use serde_json::Value;
use storefront_engine::{
    db_types::{OrderNumber, OrderStatusType},
    events::EventProducers,
    traits::StoreError,
    OrderFlowApi,
};

use super::{
    helpers::{as_customer, call, order},
    mocks::MockOrderManager,
};
use crate::routes::{MyOrderRoute, MyOrdersRoute, SearchOrdersRoute, UpdateOrderStatusRoute};

const ALICE_ORDER: &str = "ORD-20240315-000001";
const BOB_ORDER: &str = "ORD-20240315-000002";

fn configure(mut orders: MockOrderManager) -> impl FnOnce(&mut ServiceConfig) {
    orders.expect_fetch_order_by_number().returning(|n| {
        Ok(match n.as_str() {
            ALICE_ORDER => Some(order(1, ALICE_ORDER, "alice", OrderStatusType::Paid)),
            BOB_ORDER => Some(order(2, BOB_ORDER, "bob", OrderStatusType::Paid)),
            _ => None,
        })
    });
    orders.expect_fetch_order_items().returning(|_| Ok(vec![]));
    move |cfg| {
        let api = OrderFlowApi::new(orders, EventProducers::default());
        cfg.service(MyOrdersRoute::<MockOrderManager>::new())
            .service(MyOrderRoute::<MockOrderManager>::new())
            .service(
                web::scope("/admin")
                    .service(UpdateOrderStatusRoute::<MockOrderManager>::new())
                    .service(SearchOrdersRoute::<MockOrderManager>::new()),
            )
            .app_data(web::Data::new(api));
    }
}

#[actix_web::test]
async fn orders_need_an_identity() {
    let (status, body) = call(TestRequest::get().uri("/orders"), configure(MockOrderManager::new())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, r#"{"error":"The request does not identify a customer"}"#);
}

#[actix_web::test]
async fn my_orders_are_listed() {
    let mut orders = MockOrderManager::new();
    orders
        .expect_fetch_orders_for_user()
        .with(eq("alice"))
        .times(1)
        .returning(|_| Ok(vec![order(1, ALICE_ORDER, "alice", OrderStatusType::Paid)]));
    let req = as_customer(TestRequest::get().uri("/orders"), "alice");
    let (status, body) = call(req, configure(orders)).await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json[0]["order_number"], ALICE_ORDER);
    assert_eq!(json[0]["total_amount"], 3_050_000);
    assert_eq!(json[0]["status"], "Paid");
}

#[actix_web::test]
async fn customers_only_see_their_own_orders() {
    let req = as_customer(TestRequest::get().uri(&format!("/orders/{ALICE_ORDER}")), "alice");
    let (status, body) = call(req, configure(MockOrderManager::new())).await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["order"]["user_id"], "alice");
    assert!(json["items"].as_array().unwrap().is_empty());

    // Someone else's order looks exactly like a missing one
    let req = as_customer(TestRequest::get().uri(&format!("/orders/{BOB_ORDER}")), "alice");
    let (status, body) = call(req, configure(MockOrderManager::new())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, format!(r#"{{"error":"The data was not found. Order {BOB_ORDER} does not exist"}}"#));

    let req = as_customer(TestRequest::get().uri("/orders/ORD-20240315-999999"), "alice");
    let (status, body) = call(req, configure(MockOrderManager::new())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, r#"{"error":"The data was not found. Order ORD-20240315-999999 does not exist"}"#);
}

#[actix_web::test]
async fn admins_move_orders_along() {
    let mut orders = MockOrderManager::new();
    orders
        .expect_update_order_status()
        .with(eq(OrderNumber::from(ALICE_ORDER)), eq(OrderStatusType::Paid), eq(OrderStatusType::Processing))
        .times(1)
        .returning(|n, _, to| Ok(order(1, n.as_str(), "alice", to)));
    let req = TestRequest::patch()
        .uri(&format!("/admin/orders/{ALICE_ORDER}/status"))
        .set_json(serde_json::json!({"status": "Processing"}));
    let (status, body) = call(req, configure(orders)).await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["status"], "Processing");
}

#[actix_web::test]
async fn forbidden_transitions_conflict() {
    let mut orders = MockOrderManager::new();
    orders.expect_update_order_status().never();
    let req = TestRequest::patch()
        .uri(&format!("/admin/orders/{ALICE_ORDER}/status"))
        .set_json(serde_json::json!({"status": "Delivered"}));
    let (status, body) = call(req, configure(orders)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(
        body,
        r#"{"error":"The request conflicts with the current state. Order cannot move from Paid to Delivered."}"#
    );

    let req = TestRequest::patch()
        .uri(&format!("/admin/orders/{ALICE_ORDER}/status"))
        .set_json(serde_json::json!({"status": "Lost"}));
    let (status, _) = call(req, configure(MockOrderManager::new())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn admins_search_orders() {
    let mut orders = MockOrderManager::new();
    orders
        .expect_search_orders()
        .withf(|q| {
            q.user_id.as_deref() == Some("bob") &&
                q.status == Some(vec![OrderStatusType::Paid, OrderStatusType::Shipped])
        })
        .times(1)
        .returning(|_| Ok(vec![order(2, BOB_ORDER, "bob", OrderStatusType::Paid)]));
    let req = TestRequest::get().uri("/admin/orders?user_id=bob&status=Paid,Shipped");
    let (status, body) = call(req, configure(orders)).await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json.as_array().unwrap().len(), 1);

    let req = TestRequest::get().uri("/admin/orders?status=Misplaced");
    let (status, body) = call(req, configure(MockOrderManager::new())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("Invalid order status: Misplaced"));
}

#[actix_web::test]
async fn backend_failures_are_500s() {
    let mut orders = MockOrderManager::new();
    orders
        .expect_fetch_orders_for_user()
        .returning(|_| Err(StoreError::DatabaseError("disk I/O error".into())));
    let req = as_customer(TestRequest::get().uri("/orders"), "alice");
    let (status, body) = call(req, configure(orders)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.contains("disk I/O error"));
}
