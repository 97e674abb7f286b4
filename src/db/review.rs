use futures::TryStreamExt;
use mongodb::bson::{Bson, DateTime, doc, oid::ObjectId};

use super::DBClient;
use crate::dtos::ReviewWithUser;
use crate::error::{ApiError, is_duplicate_key};
use crate::models::{ReportEntry, Review};
use crate::utils::query::{resolve_sort, skip_for};

const REVIEW_SORT_FIELDS: &[&str] = &["createdAt", "rating"];

const ALREADY_REVIEWED: &str = "You have already reviewed this movie";

/// Arithmetic-mean rating, rounded to one decimal.
fn round_rating(avg: f64) -> f64 {
    (avg * 10.0).round() / 10.0
}

#[derive(Debug, serde::Deserialize)]
struct RatingRollup {
    avg: f64,
    count: i64,
}

/// Review database operations.
pub trait ReviewExt {
    async fn get_review(&self, review_id: ObjectId) -> Result<Option<Review>, ApiError>;

    /// Paginated reviews for a movie, authors joined in.
    async fn get_movie_reviews(
        &self,
        movie_id: ObjectId,
        page: i64,
        limit: i64,
        sort: Option<&str>,
        order: Option<&str>,
    ) -> Result<(Vec<ReviewWithUser>, u64), ApiError>;

    /// One review per (movie, user); the unique index backs this against
    /// racing inserts. Recomputes the movie's cached rating on success.
    async fn create_review(
        &self,
        user_id: ObjectId,
        movie_id: ObjectId,
        rating: i32,
        comment: Option<String>,
    ) -> Result<Review, ApiError>;

    /// Author-only. Recomputes the movie's cached rating on success.
    async fn update_review(
        &self,
        review_id: ObjectId,
        user_id: ObjectId,
        rating: Option<i32>,
        comment: Option<String>,
    ) -> Result<Review, ApiError>;

    /// `user_id = None` is moderation (admin) scope; otherwise author-only.
    /// Recomputes the movie's cached rating on success.
    async fn delete_review(
        &self,
        review_id: ObjectId,
        user_id: Option<ObjectId>,
    ) -> Result<(), ApiError>;

    /// Idempotent like toggle; returns the new membership and count.
    async fn toggle_like(
        &self,
        review_id: ObjectId,
        user_id: ObjectId,
    ) -> Result<(bool, i64), ApiError>;

    /// One report per user, never on your own review. The first report sets
    /// the headline reason; later reporters only append to `reportedBy`.
    async fn report_review(
        &self,
        review_id: ObjectId,
        user_id: ObjectId,
        reason: &str,
    ) -> Result<(), ApiError>;

    async fn get_reviews_admin(
        &self,
        reported_only: bool,
        page: i64,
        limit: i64,
    ) -> Result<(Vec<Review>, u64), ApiError>;

    /// Rebuild the movie's `averageRating`/`totalReviews` from its reviews.
    /// Both reset to zero when no reviews remain.
    async fn recompute_movie_rating(&self, movie_id: ObjectId) -> Result<(), ApiError>;
}

impl ReviewExt for DBClient {
    async fn get_review(&self, review_id: ObjectId) -> Result<Option<Review>, ApiError> {
        Ok(self.reviews().find_one(doc! { "_id": review_id }).await?)
    }

    async fn get_movie_reviews(
        &self,
        movie_id: ObjectId,
        page: i64,
        limit: i64,
        sort: Option<&str>,
        order: Option<&str>,
    ) -> Result<(Vec<ReviewWithUser>, u64), ApiError> {
        let filter = doc! { "movie": movie_id };
        let total = self.reviews().count_documents(filter.clone()).await?;

        let pipeline = vec![
            doc! { "$match": filter },
            doc! { "$sort": resolve_sort(sort, order, REVIEW_SORT_FIELDS) },
            doc! { "$skip": skip_for(page, limit) as i64 },
            doc! { "$limit": limit },
            doc! { "$lookup": { "from": "users", "localField": "user", "foreignField": "_id", "as": "user" } },
            doc! { "$addFields": { "user": { "$arrayElemAt": ["$user", 0] } } },
        ];

        let reviews = self
            .reviews()
            .aggregate(pipeline)
            .with_type::<ReviewWithUser>()
            .await?
            .try_collect()
            .await?;
        Ok((reviews, total))
    }

    async fn create_review(
        &self,
        user_id: ObjectId,
        movie_id: ObjectId,
        rating: i32,
        comment: Option<String>,
    ) -> Result<Review, ApiError> {
        let movie_exists = self
            .movies()
            .find_one(doc! { "_id": movie_id })
            .await?
            .is_some();
        if !movie_exists {
            return Err(ApiError::NotFound("Movie not found".to_string()));
        }

        let existing = self
            .reviews()
            .find_one(doc! { "movie": movie_id, "user": user_id })
            .await?;
        if existing.is_some() {
            return Err(ApiError::BusinessRule(ALREADY_REVIEWED.to_string()));
        }

        let now = DateTime::now();
        let mut review = Review {
            id: None,
            movie: movie_id,
            user: user_id,
            rating,
            comment,
            likes: Vec::new(),
            is_edited: false,
            edited_at: None,
            is_reported: false,
            report_reason: None,
            reported_by: Vec::new(),
            created_at: now,
            updated_at: now,
        };

        // The unique (movie, user) index turns a concurrent double-submit
        // into a duplicate-key error here.
        let result = self.reviews().insert_one(&review).await.map_err(|e| {
            if is_duplicate_key(&e) {
                ApiError::BusinessRule(ALREADY_REVIEWED.to_string())
            } else {
                ApiError::from(e)
            }
        })?;
        if let Some(id) = result.inserted_id.as_object_id() {
            review.id = Some(id);
        }

        self.recompute_movie_rating(movie_id).await?;
        Ok(review)
    }

    async fn update_review(
        &self,
        review_id: ObjectId,
        user_id: ObjectId,
        rating: Option<i32>,
        comment: Option<String>,
    ) -> Result<Review, ApiError> {
        let review = self
            .get_review(review_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Review not found".to_string()))?;
        if review.user != user_id {
            return Err(ApiError::Forbidden(
                "You can only edit your own review".to_string(),
            ));
        }

        let now = DateTime::now();
        let mut set = doc! { "isEdited": true, "editedAt": now, "updatedAt": now };
        if let Some(rating) = rating {
            set.insert("rating", rating);
        }
        if let Some(comment) = comment {
            set.insert("comment", comment);
        }

        self.reviews()
            .update_one(doc! { "_id": review_id }, doc! { "$set": set })
            .await?;

        self.recompute_movie_rating(review.movie).await?;

        self.get_review(review_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Review not found".to_string()))
    }

    async fn delete_review(
        &self,
        review_id: ObjectId,
        user_id: Option<ObjectId>,
    ) -> Result<(), ApiError> {
        let review = self
            .get_review(review_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Review not found".to_string()))?;
        if let Some(user_id) = user_id {
            if review.user != user_id {
                return Err(ApiError::Forbidden(
                    "You can only delete your own review".to_string(),
                ));
            }
        }

        self.reviews().delete_one(doc! { "_id": review_id }).await?;
        self.recompute_movie_rating(review.movie).await?;
        Ok(())
    }

    async fn toggle_like(
        &self,
        review_id: ObjectId,
        user_id: ObjectId,
    ) -> Result<(bool, i64), ApiError> {
        let review = self
            .get_review(review_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Review not found".to_string()))?;

        let liked = !review.likes.contains(&user_id);
        let update = if liked {
            doc! { "$push": { "likes": user_id } }
        } else {
            doc! { "$pull": { "likes": user_id } }
        };
        self.reviews()
            .update_one(doc! { "_id": review_id }, update)
            .await?;

        let likes_count = if liked {
            review.likes.len() as i64 + 1
        } else {
            review.likes.len() as i64 - 1
        };
        Ok((liked, likes_count))
    }

    async fn report_review(
        &self,
        review_id: ObjectId,
        user_id: ObjectId,
        reason: &str,
    ) -> Result<(), ApiError> {
        let review = self
            .get_review(review_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Review not found".to_string()))?;

        if review.user == user_id {
            return Err(ApiError::BusinessRule(
                "You cannot report your own review".to_string(),
            ));
        }
        if review.reported_by.iter().any(|r| r.user == user_id) {
            return Err(ApiError::BusinessRule(
                "You have already reported this review".to_string(),
            ));
        }

        let entry = ReportEntry {
            user: user_id,
            reason: reason.to_string(),
            reported_at: DateTime::now(),
        };
        let mut update = doc! {
            "$push": { "reportedBy": mongodb::bson::to_bson(&entry)
                .map_err(|e| ApiError::Internal(e.to_string()))? },
        };
        if !review.is_reported {
            // The first reporter's reason becomes the headline reason.
            update.insert("$set", doc! { "isReported": true, "reportReason": reason });
        }

        self.reviews()
            .update_one(doc! { "_id": review_id }, update)
            .await?;
        Ok(())
    }

    async fn get_reviews_admin(
        &self,
        reported_only: bool,
        page: i64,
        limit: i64,
    ) -> Result<(Vec<Review>, u64), ApiError> {
        let filter = if reported_only {
            doc! { "isReported": true }
        } else {
            doc! {}
        };

        let total = self.reviews().count_documents(filter.clone()).await?;
        let reviews = self
            .reviews()
            .find(filter)
            .sort(doc! { "createdAt": -1 })
            .skip(skip_for(page, limit))
            .limit(limit)
            .await?
            .try_collect()
            .await?;
        Ok((reviews, total))
    }

    async fn recompute_movie_rating(&self, movie_id: ObjectId) -> Result<(), ApiError> {
        let pipeline = vec![
            doc! { "$match": { "movie": movie_id } },
            doc! { "$group": {
                "_id": Bson::Null,
                "avg": { "$avg": "$rating" },
                "count": { "$sum": 1 },
            } },
        ];

        let mut cursor = self
            .reviews()
            .aggregate(pipeline)
            .with_type::<RatingRollup>()
            .await?;
        let rollup = cursor.try_next().await?;

        let (average, count) = match rollup {
            Some(r) => (round_rating(r.avg), r.count),
            None => (0.0, 0),
        };

        self.movies()
            .update_one(
                doc! { "_id": movie_id },
                doc! { "$set": { "averageRating": average, "totalReviews": count } },
            )
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rating_rounds_to_one_decimal() {
        assert_eq!(round_rating(3.0), 3.0);
        assert_eq!(round_rating(3.6666666), 3.7);
        assert_eq!(round_rating(4.25), 4.3);
        assert_eq!(round_rating(4.24), 4.2);
        assert_eq!(round_rating(0.0), 0.0);
    }

    #[test]
    fn review_sort_whitelist() {
        assert!(REVIEW_SORT_FIELDS.contains(&"createdAt"));
        assert!(REVIEW_SORT_FIELDS.contains(&"rating"));
        assert!(!REVIEW_SORT_FIELDS.contains(&"likes"));
    }
}
