use sqlx::SqliteConnection;

use crate::db_types::{NewStockLog, StockAction, StockLog};

pub async fn insert_stock_log(log: NewStockLog, conn: &mut SqliteConnection) -> Result<StockLog, sqlx::Error> {
    sqlx::query_as(
        r#"
            INSERT INTO stock_logs (product_id, action, quantity, previous_stock, new_stock, notes, user_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *;
        "#,
    )
    .bind(log.product_id)
    .bind(log.action)
    .bind(log.quantity)
    .bind(log.previous_stock)
    .bind(log.new_stock)
    .bind(log.notes)
    .bind(log.user_id)
    .fetch_one(conn)
    .await
}

pub async fn fetch_stock_logs(product_id: i64, conn: &mut SqliteConnection) -> Result<Vec<StockLog>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM stock_logs WHERE product_id = $1 ORDER BY id").bind(product_id).fetch_all(conn).await
}

/// The sum of the signed quantities of every log of the given action for a product.
pub async fn total_for_action(
    product_id: i64,
    action: StockAction,
    conn: &mut SqliteConnection,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COALESCE(SUM(quantity), 0) FROM stock_logs WHERE product_id = $1 AND action = $2")
        .bind(product_id)
        .bind(action)
        .fetch_one(conn)
        .await
}
