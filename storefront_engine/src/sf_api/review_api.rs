use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{NewReview, ProductReview},
    sf_api::{
        errors::ReviewError,
        order_objects::{ReviewEligibility, ReviewSummary},
    },
    traits::ReviewManagement,
};

pub const MAX_COMMENT_LENGTH: usize = 2000;
pub const MAX_TITLE_LENGTH: usize = 120;

/// Product reviews. Only customers who have received a product may review it, and only once.
pub struct ReviewApi<B> {
    db: B,
}

impl<B> Debug for ReviewApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ReviewApi")
    }
}

impl<B> ReviewApi<B>
where B: ReviewManagement
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    pub async fn eligibility(&self, user_id: &str, product_id: i64) -> Result<ReviewEligibility, ReviewError> {
        if self.db.fetch_review_by_user(user_id, product_id).await?.is_some() {
            return Ok(ReviewEligibility::AlreadyReviewed);
        }
        if !self.db.has_delivered_item(user_id, product_id).await? {
            return Ok(ReviewEligibility::NotDelivered);
        }
        Ok(ReviewEligibility::Eligible)
    }

    pub async fn can_review(&self, user_id: &str, product_id: i64) -> Result<bool, ReviewError> {
        Ok(self.eligibility(user_id, product_id).await?.can_review())
    }

    /// Stores a review for moderation. New reviews are never visible until approved.
    pub async fn submit_review(&self, review: NewReview) -> Result<ProductReview, ReviewError> {
        let review = validate(review)?;
        let (user_id, product_id) = (review.user_id.clone(), review.product_id);
        let stored = self.db.insert_review(review).await.map_err(|e| {
            debug!("⭐️ Review of product {product_id} by {user_id} refused. {e}");
            ReviewError::from(e)
        })?;
        info!("⭐️ Review #{} of product {product_id} by {user_id} is awaiting moderation", stored.id);
        Ok(stored)
    }

    pub async fn approved_reviews(&self, product_id: i64) -> Result<ReviewSummary, ReviewError> {
        let reviews = self.db.fetch_approved_reviews(product_id).await?;
        Ok(ReviewSummary::new(product_id, reviews))
    }

    pub async fn moderate_review(&self, review_id: i64, approved: bool) -> Result<ProductReview, ReviewError> {
        let review = self.db.set_review_approval(review_id, approved).await?;
        info!("⭐️ Review #{review_id} is now {}", if approved { "approved" } else { "hidden" });
        Ok(review)
    }
}

fn validate(review: NewReview) -> Result<NewReview, ReviewError> {
    if !(1..=5).contains(&review.rating) {
        return Err(ReviewError::ValidationError(format!("Rating must be between 1 and 5, not {}", review.rating)));
    }
    let comment = review.comment.trim().to_string();
    if comment.is_empty() {
        return Err(ReviewError::ValidationError("A comment is required".into()));
    }
    if comment.chars().count() > MAX_COMMENT_LENGTH {
        return Err(ReviewError::ValidationError(format!("Comments are limited to {MAX_COMMENT_LENGTH} characters")));
    }
    let title = review.title.map(|t| t.trim().to_string()).filter(|t| !t.is_empty());
    if title.as_ref().is_some_and(|t| t.chars().count() > MAX_TITLE_LENGTH) {
        return Err(ReviewError::ValidationError(format!("Titles are limited to {MAX_TITLE_LENGTH} characters")));
    }
    let user_name = review.user_name.trim().to_string();
    if user_name.is_empty() || review.user_id.trim().is_empty() {
        return Err(ReviewError::ValidationError("Reviews need a user id and a display name".into()));
    }
    Ok(NewReview { comment, title, user_name, ..review })
}
