use crate::{
    db_types::{NewReview, ProductReview},
    traits::StoreError,
};

#[allow(async_fn_in_trait)]
pub trait ReviewManagement {
    /// True if `user_id` has an order in `Delivered` status containing `product_id`.
    async fn has_delivered_item(&self, user_id: &str, product_id: i64) -> Result<bool, StoreError>;

    async fn fetch_review_by_user(&self, user_id: &str, product_id: i64) -> Result<Option<ProductReview>, StoreError>;

    /// Stores a new, unapproved review.
    ///
    /// Eligibility is re-checked atomically with the insert. Fails with [`StoreError::ReviewNotEligible`] if the user
    /// has no delivered item for the product, and [`StoreError::ReviewAlreadyExists`] if they already reviewed it.
    async fn insert_review(&self, review: NewReview) -> Result<ProductReview, StoreError>;

    /// Approved reviews for a product, newest first.
    async fn fetch_approved_reviews(&self, product_id: i64) -> Result<Vec<ProductReview>, StoreError>;

    async fn set_review_approval(&self, review_id: i64, approved: bool) -> Result<ProductReview, StoreError>;
}
