use chrono::{DateTime, Utc};
use log::*;
use sqlx::{QueryBuilder, SqliteConnection};

use super::is_unique_violation;
use crate::{
    db_types::{NewOrder, NewOrderItem, Order, OrderItem, OrderNumber, OrderStatusType},
    sf_api::order_objects::OrderQueryFilter,
    traits::StoreError,
};

/// Inserts a `Pending` order and all of its line items. This is not atomic on its own: run it inside a transaction.
///
/// A clash on the order number is reported as [`StoreError::OrderNumberConflict`].
pub async fn insert_order(order: NewOrder, conn: &mut SqliteConnection) -> Result<(Order, Vec<OrderItem>), StoreError> {
    let order_number = order.order_number.clone();
    let shipping = order.shipping;
    let result = sqlx::query_as(
        r#"
            INSERT INTO orders (
                order_number,
                user_id,
                status,
                sub_total,
                shipping_cost,
                discount,
                tax,
                total_amount,
                shipping_address,
                shipping_city,
                shipping_postal_code,
                shipping_phone,
                notes,
                payment_method
            ) VALUES ($1, $2, 'Pending', $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING *;
        "#,
    )
    .bind(order.order_number)
    .bind(order.user_id)
    .bind(order.sub_total)
    .bind(order.shipping_cost)
    .bind(order.discount)
    .bind(order.tax)
    .bind(order.total_amount)
    .bind(shipping.address)
    .bind(shipping.city)
    .bind(shipping.postal_code)
    .bind(shipping.phone)
    .bind(shipping.notes)
    .bind(order.payment_method)
    .fetch_one(&mut *conn)
    .await;
    let stored: Order = match result {
        Ok(o) => o,
        Err(e) if is_unique_violation(&e) => return Err(StoreError::OrderNumberConflict(order_number)),
        Err(e) => return Err(e.into()),
    };
    let mut items = Vec::with_capacity(order.items.len());
    for item in order.items {
        items.push(insert_item(stored.id, item, conn).await?);
    }
    debug!("📦️ Order {} inserted with id {} and {} items", stored.order_number, stored.id, items.len());
    Ok((stored, items))
}

async fn insert_item(order_id: i64, item: NewOrderItem, conn: &mut SqliteConnection) -> Result<OrderItem, sqlx::Error> {
    let total_price = item.total_price();
    sqlx::query_as(
        r#"
            INSERT INTO order_items (order_id, product_id, product_name, unit_price, quantity, total_price)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *;
        "#,
    )
    .bind(order_id)
    .bind(item.product_id)
    .bind(item.product_name)
    .bind(item.unit_price)
    .bind(item.quantity)
    .bind(total_price)
    .fetch_one(conn)
    .await
}

pub async fn fetch_order_by_number(
    order_number: &OrderNumber,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM orders WHERE order_number = $1")
        .bind(order_number.as_str())
        .fetch_optional(conn)
        .await
}

pub async fn fetch_order_items(order_id: i64, conn: &mut SqliteConnection) -> Result<Vec<OrderItem>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM order_items WHERE order_id = $1 ORDER BY id").bind(order_id).fetch_all(conn).await
}

pub async fn fetch_orders_for_user(user_id: &str, conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM orders WHERE user_id = $1 ORDER BY datetime(created_at) DESC, id DESC")
        .bind(user_id)
        .fetch_all(conn)
        .await
}

/// Fetches orders according to the criteria in the `OrderQueryFilter`, oldest first.
pub async fn search_orders(query: OrderQueryFilter, conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    let mut builder = QueryBuilder::new("SELECT * FROM orders ");
    if !query.is_empty() {
        builder.push("WHERE ");
    }
    let mut where_clause = builder.separated(" AND ");
    if let Some(order_number) = query.order_number {
        where_clause.push("order_number = ");
        where_clause.push_bind_unseparated(order_number.0);
    }
    if let Some(user_id) = query.user_id {
        where_clause.push("user_id = ");
        where_clause.push_bind_unseparated(user_id);
    }
    if let Some(statuses) = query.status.filter(|s| !s.is_empty()) {
        where_clause.push("status IN (");
        for (i, status) in statuses.into_iter().enumerate() {
            if i > 0 {
                where_clause.push_unseparated(", ");
            }
            where_clause.push_bind_unseparated(status.to_string());
        }
        where_clause.push_unseparated(")");
    }
    if let Some(since) = query.since {
        where_clause.push("datetime(created_at) >= datetime(");
        where_clause.push_bind_unseparated(since);
        where_clause.push_unseparated(")");
    }
    if let Some(until) = query.until {
        where_clause.push("datetime(created_at) <= datetime(");
        where_clause.push_bind_unseparated(until);
        where_clause.push_unseparated(")");
    }
    builder.push(" ORDER BY datetime(created_at) ASC, id ASC");
    trace!("📦️ Executing query: {}", builder.sql());
    let orders = builder.build_query_as::<Order>().fetch_all(conn).await?;
    trace!("📦️ Order search returned {} rows", orders.len());
    Ok(orders)
}

/// Moves an order from `from` to `to`, but only if it is still in `from`. Returns `None` if nothing was updated.
///
/// Moving to `Delivered` also backfills `paid_at`.
pub async fn compare_and_set_status(
    order_number: &OrderNumber,
    from: OrderStatusType,
    to: OrderStatusType,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as(
        r#"
            UPDATE orders SET
                status = $1,
                paid_at = CASE WHEN $1 = 'Delivered' THEN COALESCE(paid_at, CURRENT_TIMESTAMP) ELSE paid_at END,
                updated_at = CURRENT_TIMESTAMP
            WHERE order_number = $2 AND status = $3
            RETURNING *;
        "#,
    )
    .bind(to.to_string())
    .bind(order_number.as_str())
    .bind(from.to_string())
    .fetch_optional(conn)
    .await
}

pub async fn mark_paid(
    order_id: i64,
    transaction_id: &str,
    payment_method: &str,
    paid_at: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Order, StoreError> {
    let result: Result<Option<Order>, sqlx::Error> = sqlx::query_as(
        r#"
            UPDATE orders SET
                status = 'Paid',
                paid_at = $1,
                payment_method = $2,
                transaction_id = $3,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $4 AND status = 'Pending'
            RETURNING *;
        "#,
    )
    .bind(paid_at)
    .bind(payment_method)
    .bind(transaction_id)
    .bind(order_id)
    .fetch_optional(conn)
    .await;
    match result {
        Ok(Some(order)) => Ok(order),
        Ok(None) => Err(StoreError::DatabaseError(format!("Order {order_id} is no longer pending"))),
        Err(e) if is_unique_violation(&e) => Err(StoreError::TransactionAlreadyUsed(transaction_id.to_string())),
        Err(e) => Err(e.into()),
    }
}
