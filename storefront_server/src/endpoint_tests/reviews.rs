use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use mockall::predicate::eq;
use serde_json::{json, Value};
use storefront_engine::{traits::StoreError, ReviewApi};

use super::{
    helpers::{as_customer, call, review},
    mocks::MockReviewManager,
};
use crate::routes::{ModerateReviewRoute, ProductReviewsRoute, ReviewEligibilityRoute, SubmitReviewRoute};

fn configure(reviews: MockReviewManager) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        cfg.service(ProductReviewsRoute::<MockReviewManager>::new())
            .service(ReviewEligibilityRoute::<MockReviewManager>::new())
            .service(SubmitReviewRoute::<MockReviewManager>::new())
            .service(web::scope("/admin").service(ModerateReviewRoute::<MockReviewManager>::new()))
            .app_data(web::Data::new(ReviewApi::new(reviews)));
    }
}

#[actix_web::test]
async fn approved_reviews_are_summarised() {
    let mut reviews = MockReviewManager::new();
    reviews
        .expect_fetch_approved_reviews()
        .with(eq(7))
        .returning(|_| Ok(vec![review(1, 7, "alice", 5, true), review(2, 7, "bob", 4, true)]));
    let (status, body) = call(TestRequest::get().uri("/products/7/reviews"), configure(reviews)).await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["count"], 2);
    assert_eq!(json["average_rating"], 4.5);
    assert_eq!(json["reviews"][1]["user_name"], "bob name");
}

#[actix_web::test]
async fn eligibility_depends_on_delivery() {
    let mut reviews = MockReviewManager::new();
    reviews.expect_fetch_review_by_user().returning(|_, _| Ok(None));
    reviews.expect_has_delivered_item().returning(|user, _| Ok(user == "alice"));
    let req = as_customer(TestRequest::get().uri("/products/7/reviews/eligibility"), "alice");
    let (status, body) = call(req, configure(reviews)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"product_id":7,"can_review":true,"eligibility":"Eligible"}"#);

    let mut reviews = MockReviewManager::new();
    reviews.expect_fetch_review_by_user().returning(|_, _| Ok(None));
    reviews.expect_has_delivered_item().returning(|_, _| Ok(false));
    let req = as_customer(TestRequest::get().uri("/products/7/reviews/eligibility"), "carol");
    let (_, body) = call(req, configure(reviews)).await;
    assert_eq!(body, r#"{"product_id":7,"can_review":false,"eligibility":"NotDelivered"}"#);
}

#[actix_web::test]
async fn reviews_are_submitted_for_moderation() {
    let mut reviews = MockReviewManager::new();
    reviews
        .expect_insert_review()
        .withf(|r| r.product_id == 7 && r.user_id == "alice" && r.user_name == "alice name" && r.rating == 5)
        .times(1)
        .returning(|r| Ok(review(11, r.product_id, &r.user_id, r.rating, false)));
    let req = as_customer(TestRequest::post().uri("/products/7/reviews"), "alice")
        .set_json(json!({"rating": 5, "title": "Great", "comment": "Installed in ten minutes"}));
    let (status, body) = call(req, configure(reviews)).await;
    assert_eq!(status, StatusCode::CREATED);
    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["id"], 11);
    assert_eq!(json["is_approved"], false);
}

#[actix_web::test]
async fn review_rejections() {
    let mut reviews = MockReviewManager::new();
    reviews.expect_insert_review().returning(|r| Err(StoreError::ReviewNotEligible(r.product_id)));
    let req = as_customer(TestRequest::post().uri("/products/7/reviews"), "carol")
        .set_json(json!({"rating": 4, "comment": "Looks nice"}));
    let (status, body) = call(req, configure(reviews)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body, r#"{"error":"Forbidden. Only customers who received product 7 may review it"}"#);

    let mut reviews = MockReviewManager::new();
    reviews.expect_insert_review().returning(|r| Err(StoreError::ReviewAlreadyExists(r.product_id)));
    let req = as_customer(TestRequest::post().uri("/products/7/reviews"), "alice")
        .set_json(json!({"rating": 4, "comment": "Second thoughts"}));
    let (status, _) = call(req, configure(reviews)).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let mut reviews = MockReviewManager::new();
    reviews.expect_insert_review().never();
    let req = as_customer(TestRequest::post().uri("/products/7/reviews"), "alice")
        .set_json(json!({"rating": 6, "comment": "Off the charts"}));
    let (status, body) = call(req, configure(reviews)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("Rating must be between 1 and 5"));

    let req = TestRequest::post().uri("/products/7/reviews").set_json(json!({"rating": 4, "comment": "Anonymous"}));
    let (status, _) = call(req, configure(MockReviewManager::new())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn admins_moderate_reviews() {
    let mut reviews = MockReviewManager::new();
    reviews
        .expect_set_review_approval()
        .with(eq(11), eq(true))
        .times(1)
        .returning(|id, approved| Ok(review(id, 7, "alice", 5, approved)));
    let req = TestRequest::patch().uri("/admin/reviews/11").set_json(json!({"approved": true}));
    let (status, body) = call(req, configure(reviews)).await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["is_approved"], true);
}

#[actix_web::test]
async fn moderating_a_missing_review() {
    let mut reviews = MockReviewManager::new();
    reviews.expect_set_review_approval().returning(|id, _| Err(StoreError::ReviewNotFound(id)));
    let req = TestRequest::patch().uri("/admin/reviews/12").set_json(json!({"approved": false}));
    let (status, body) = call(req, configure(reviews)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, r#"{"error":"The data was not found. Review 12 does not exist"}"#);
}
