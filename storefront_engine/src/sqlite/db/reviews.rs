use sqlx::SqliteConnection;

use super::is_unique_violation;
use crate::{
    db_types::{NewReview, ProductReview},
    traits::StoreError,
};

pub async fn has_delivered_item(
    user_id: &str,
    product_id: i64,
    conn: &mut SqliteConnection,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar(
        r#"
            SELECT EXISTS (
                SELECT 1 FROM orders JOIN order_items ON order_items.order_id = orders.id
                WHERE orders.user_id = $1 AND order_items.product_id = $2 AND orders.status = 'Delivered'
            );
        "#,
    )
    .bind(user_id)
    .bind(product_id)
    .fetch_one(conn)
    .await
}

pub async fn fetch_review_by_user(
    user_id: &str,
    product_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<ProductReview>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM product_reviews WHERE user_id = $1 AND product_id = $2")
        .bind(user_id)
        .bind(product_id)
        .fetch_optional(conn)
        .await
}

/// Inserts an unapproved review, in the same statement that checks the user received the product.
pub async fn insert_review(review: NewReview, conn: &mut SqliteConnection) -> Result<ProductReview, StoreError> {
    let product_id = review.product_id;
    let result = sqlx::query_as(
        r#"
            INSERT INTO product_reviews (product_id, user_id, user_name, rating, title, comment, is_approved)
            SELECT $1, $2, $3, $4, $5, $6, 0
            WHERE EXISTS (
                SELECT 1 FROM orders JOIN order_items ON order_items.order_id = orders.id
                WHERE orders.user_id = $2 AND order_items.product_id = $1 AND orders.status = 'Delivered'
            )
            RETURNING *;
        "#,
    )
    .bind(review.product_id)
    .bind(review.user_id)
    .bind(review.user_name)
    .bind(review.rating)
    .bind(review.title)
    .bind(review.comment)
    .fetch_optional(conn)
    .await;
    match result {
        Ok(Some(review)) => Ok(review),
        Ok(None) => Err(StoreError::ReviewNotEligible(product_id)),
        Err(e) if is_unique_violation(&e) => Err(StoreError::ReviewAlreadyExists(product_id)),
        Err(e) => Err(e.into()),
    }
}

pub async fn fetch_approved_reviews(
    product_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<ProductReview>, sqlx::Error> {
    sqlx::query_as(
        "SELECT * FROM product_reviews WHERE product_id = $1 AND is_approved = 1 ORDER BY datetime(created_at) DESC, \
         id DESC",
    )
    .bind(product_id)
    .fetch_all(conn)
    .await
}

pub async fn set_approval(
    review_id: i64,
    approved: bool,
    conn: &mut SqliteConnection,
) -> Result<Option<ProductReview>, sqlx::Error> {
    sqlx::query_as(
        "UPDATE product_reviews SET is_approved = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 RETURNING *",
    )
    .bind(approved)
    .bind(review_id)
    .fetch_optional(conn)
    .await
}
