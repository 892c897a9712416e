use mockall::mock;
use storefront_engine::{
    db_types::{NewProduct, NewReview, Order, OrderItem, OrderNumber, OrderStatusType, Product, ProductReview},
    order_objects::OrderQueryFilter,
    traits::{CatalogManagement, OrderManagement, ReviewManagement, StoreError},
};

mock! {
    pub OrderManager {}
    impl OrderManagement for OrderManager {
        async fn fetch_order_by_number(&self, order_number: &OrderNumber) -> Result<Option<Order>, StoreError>;
        async fn fetch_order_items(&self, order_id: i64) -> Result<Vec<OrderItem>, StoreError>;
        async fn fetch_orders_for_user(&self, user_id: &str) -> Result<Vec<Order>, StoreError>;
        async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, StoreError>;
        async fn update_order_status(&self, order_number: &OrderNumber, from: OrderStatusType, to: OrderStatusType) -> Result<Order, StoreError>;
    }
}

mock! {
    pub ReviewManager {}
    impl ReviewManagement for ReviewManager {
        async fn has_delivered_item(&self, user_id: &str, product_id: i64) -> Result<bool, StoreError>;
        async fn fetch_review_by_user(&self, user_id: &str, product_id: i64) -> Result<Option<ProductReview>, StoreError>;
        async fn insert_review(&self, review: NewReview) -> Result<ProductReview, StoreError>;
        async fn fetch_approved_reviews(&self, product_id: i64) -> Result<Vec<ProductReview>, StoreError>;
        async fn set_review_approval(&self, review_id: i64, approved: bool) -> Result<ProductReview, StoreError>;
    }
}

mock! {
    pub Catalog {}
    impl CatalogManagement for Catalog {
        async fn fetch_product(&self, product_id: i64) -> Result<Option<Product>, StoreError>;
        async fn fetch_products(&self, ids: &[i64]) -> Result<Vec<Product>, StoreError>;
        async fn insert_product(&self, product: NewProduct) -> Result<Product, StoreError>;
        async fn fetch_setting(&self, key: &str) -> Result<Option<String>, StoreError>;
        async fn upsert_setting(&self, key: &str, value: &str) -> Result<(), StoreError>;
    }
}
