use log::*;
use sqlx::{QueryBuilder, SqliteConnection};

use super::is_unique_violation;
use crate::{
    db_types::{NewProduct, Product},
    traits::StoreError,
};

pub async fn insert_product(product: NewProduct, conn: &mut SqliteConnection) -> Result<Product, StoreError> {
    let sku = product.sku.clone();
    let result = sqlx::query_as(
        r#"
            INSERT INTO products (name, slug, sku, price, discount_price, stock_quantity, main_image, is_active)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *;
        "#,
    )
    .bind(product.name)
    .bind(product.slug)
    .bind(product.sku)
    .bind(product.price)
    .bind(product.discount_price)
    .bind(product.stock_quantity)
    .bind(product.main_image)
    .bind(product.is_active)
    .fetch_one(conn)
    .await;
    match result {
        Ok(p) => Ok(p),
        Err(e) if is_unique_violation(&e) => {
            Err(StoreError::DatabaseError(format!("A product with the same slug or sku ({sku}) already exists")))
        },
        Err(e) => Err(e.into()),
    }
}

pub async fn fetch_product(product_id: i64, conn: &mut SqliteConnection) -> Result<Option<Product>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM products WHERE id = $1").bind(product_id).fetch_optional(conn).await
}

pub async fn fetch_products(ids: &[i64], conn: &mut SqliteConnection) -> Result<Vec<Product>, sqlx::Error> {
    if ids.is_empty() {
        return Ok(vec![]);
    }
    let mut builder = QueryBuilder::new("SELECT * FROM products WHERE id IN (");
    let mut list = builder.separated(", ");
    for id in ids {
        list.push_bind(*id);
    }
    builder.push(") ORDER BY id");
    builder.build_query_as().fetch_all(conn).await
}

/// Takes `quantity` units of an active product out of stock, provided that many are on hand.
///
/// Returns `(previous_stock, new_stock)`. The check and the decrement are a single statement, so two concurrent
/// callers can never both take the last unit.
pub async fn take_stock(
    product_id: i64,
    quantity: i64,
    conn: &mut SqliteConnection,
) -> Result<(i64, i64), StoreError> {
    let new_stock: Option<i64> = sqlx::query_scalar(
        r#"
            UPDATE products SET stock_quantity = stock_quantity - $1, updated_at = CURRENT_TIMESTAMP
            WHERE id = $2 AND is_active = 1 AND stock_quantity >= $1
            RETURNING stock_quantity;
        "#,
    )
    .bind(quantity)
    .bind(product_id)
    .fetch_optional(&mut *conn)
    .await?;
    match new_stock {
        Some(new_stock) => {
            trace!("📉️ Took {quantity} units of product {product_id}. {new_stock} left");
            Ok((new_stock + quantity, new_stock))
        },
        None => Err(explain_failed_update(product_id, quantity, conn).await),
    }
}

/// Applies a signed change to a product's stock level, regardless of whether the product is active. The update is
/// refused if the level would drop below zero.
///
/// Returns `(previous_stock, new_stock)`.
pub async fn change_stock(product_id: i64, delta: i64, conn: &mut SqliteConnection) -> Result<(i64, i64), StoreError> {
    let new_stock: Option<i64> = sqlx::query_scalar(
        r#"
            UPDATE products SET stock_quantity = stock_quantity + $1, updated_at = CURRENT_TIMESTAMP
            WHERE id = $2 AND stock_quantity + $1 >= 0
            RETURNING stock_quantity;
        "#,
    )
    .bind(delta)
    .bind(product_id)
    .fetch_optional(&mut *conn)
    .await?;
    match new_stock {
        Some(new_stock) => Ok((new_stock - delta, new_stock)),
        None => match fetch_product(product_id, conn).await? {
            None => Err(StoreError::ProductNotFound(product_id)),
            Some(p) => Err(StoreError::InsufficientStock {
                product_id,
                requested: -delta,
                available: p.stock_quantity,
            }),
        },
    }
}

async fn explain_failed_update(product_id: i64, quantity: i64, conn: &mut SqliteConnection) -> StoreError {
    match fetch_product(product_id, conn).await {
        Ok(None) => StoreError::ProductNotFound(product_id),
        Ok(Some(p)) if !p.is_active => StoreError::ProductUnavailable(product_id),
        Ok(Some(p)) => {
            StoreError::InsufficientStock { product_id, requested: quantity, available: p.stock_quantity }
        },
        Err(e) => e.into(),
    }
}
