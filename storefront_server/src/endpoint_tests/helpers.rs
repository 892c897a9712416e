use actix_web::{
    http::StatusCode,
    test,
    test::TestRequest,
    web::{self, ServiceConfig},
    App,
};
use chrono::{TimeZone, Utc};
use log::debug;
use sf_common::Money;
use storefront_engine::db_types::{Order, OrderNumber, OrderStatusType, Product, ProductReview};

use crate::{
    errors::ServerError,
    identity::{SESSION_ID_HEADER, USER_ID_HEADER, USER_NAME_HEADER},
};

/// Sends `req` to an app configured by `configure`, returning the status and the body.
pub async fn call<F>(req: TestRequest, configure: F) -> (StatusCode, String)
where F: FnOnce(&mut ServiceConfig) {
    let _ = env_logger::try_init();
    let json_config =
        web::JsonConfig::default().error_handler(|err, _req| ServerError::InvalidRequestBody(err.to_string()).into());
    let app = App::new().app_data(json_config).configure(configure);
    let service = test::init_service(app).await;
    let req = req.to_request();
    debug!("Making request to {}", req.path());
    let res = test::call_service(&service, req).await;
    let status = res.status();
    let body = test::read_body(res).await;
    (status, String::from_utf8_lossy(&body).into_owned())
}

pub fn as_customer(req: TestRequest, user_id: &str) -> TestRequest {
    req.insert_header((USER_ID_HEADER, user_id)).insert_header((USER_NAME_HEADER, format!("{user_id} name")))
}

pub fn in_session(req: TestRequest, session_id: &str) -> TestRequest {
    req.insert_header((SESSION_ID_HEADER, session_id))
}

pub fn order(id: i64, number: &str, user_id: &str, status: OrderStatusType) -> Order {
    let created = Utc.with_ymd_and_hms(2024, 3, 15, 18, 30, 0).unwrap();
    Order {
        id,
        order_number: OrderNumber::from(number),
        user_id: user_id.to_string(),
        status,
        sub_total: Money::from(3_000_000),
        shipping_cost: Money::from(50_000),
        discount: Money::default(),
        tax: Money::default(),
        total_amount: Money::from(3_050_000),
        shipping_address: "12 Valiasr St".into(),
        shipping_city: "Tehran".into(),
        shipping_postal_code: "1136915".into(),
        shipping_phone: "09120000000".into(),
        notes: None,
        paid_at: (status != OrderStatusType::Pending).then_some(created),
        payment_method: Some("Online".into()),
        transaction_id: (status != OrderStatusType::Pending).then(|| format!("sim-{number}")),
        created_at: created,
        updated_at: None,
    }
}

pub fn product(id: i64, price: i64, stock: i64) -> Product {
    Product {
        id,
        name: format!("Product {id}"),
        slug: format!("product-{id}"),
        sku: format!("SKU-{id}"),
        price: Money::from(price),
        discount_price: None,
        stock_quantity: stock,
        main_image: None,
        is_active: true,
        created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        updated_at: None,
    }
}

pub fn review(id: i64, product_id: i64, user_id: &str, rating: i64, approved: bool) -> ProductReview {
    ProductReview {
        id,
        product_id,
        user_id: user_id.to_string(),
        user_name: format!("{user_id} name"),
        rating,
        title: None,
        comment: "Works as advertised".into(),
        is_approved: approved,
        created_at: Utc.with_ymd_and_hms(2024, 4, 1, 9, 0, 0).unwrap(),
        updated_at: None,
    }
}
