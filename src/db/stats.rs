use futures::TryStreamExt;
use mongodb::bson::{Bson, DateTime, Document, doc, oid::ObjectId};

use super::DBClient;
use crate::dtos::{
    AdminStatsDto, RatingStatsDto, RecentActivityDto, StatsOverviewDto, TopItemDto,
};
use crate::error::ApiError;

const RECENT_WINDOW_DAYS: i64 = 30;
const TOP_N: i64 = 5;

#[derive(Debug, serde::Deserialize)]
struct TopItemRow {
    #[serde(rename = "_id")]
    id: ObjectId,
    name: String,
    count: i64,
}

#[derive(Debug, serde::Deserialize)]
struct RatingRow {
    avg: f64,
    count: i64,
}

/// Admin dashboard aggregates. Read-only; any failing query aborts the whole
/// computation rather than returning partial numbers.
pub trait StatsExt {
    async fn get_stats(&self) -> Result<AdminStatsDto, ApiError>;
}

impl DBClient {
    async fn count(&self, collection: &str, filter: Document) -> Result<u64, ApiError> {
        Ok(self
            .database()
            .collection::<Document>(collection)
            .count_documents(filter)
            .await?)
    }

    /// Rank master-data records by the number of movies referencing them.
    /// `ref_field` is unwound (a no-op for the scalar director field), grouped
    /// and joined back to the named collection for display names.
    async fn top_referenced(
        &self,
        ref_field: &str,
        collection: &str,
    ) -> Result<Vec<TopItemDto>, ApiError> {
        let pipeline = vec![
            doc! { "$unwind": format!("${}", ref_field) },
            doc! { "$group": { "_id": format!("${}", ref_field), "count": { "$sum": 1 } } },
            doc! { "$sort": { "count": -1 } },
            doc! { "$limit": TOP_N },
            doc! { "$lookup": { "from": collection, "localField": "_id", "foreignField": "_id", "as": "record" } },
            doc! { "$unwind": "$record" },
            doc! { "$project": { "name": "$record.name", "count": 1 } },
        ];

        let rows: Vec<TopItemRow> = self
            .movies()
            .aggregate(pipeline)
            .with_type::<TopItemRow>()
            .await?
            .try_collect()
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| TopItemDto {
                id: row.id.to_hex(),
                name: row.name,
                count: row.count,
            })
            .collect())
    }

    async fn rating_stats(&self) -> Result<RatingStatsDto, ApiError> {
        let pipeline = vec![doc! { "$group": {
            "_id": Bson::Null,
            "avg": { "$avg": "$rating" },
            "count": { "$sum": 1 },
        } }];

        let mut cursor = self
            .reviews()
            .aggregate(pipeline)
            .with_type::<RatingRow>()
            .await?;
        let row = cursor.try_next().await?;

        Ok(match row {
            Some(r) => RatingStatsDto {
                average_rating: (r.avg * 10.0).round() / 10.0,
                total_ratings: r.count,
            },
            None => RatingStatsDto {
                average_rating: 0.0,
                total_ratings: 0,
            },
        })
    }
}

impl StatsExt for DBClient {
    async fn get_stats(&self) -> Result<AdminStatsDto, ApiError> {
        let overview = StatsOverviewDto {
            total_users: self.count("users", doc! {}).await?,
            active_users: self.count("users", doc! { "isActive": true }).await?,
            admin_users: self.count("users", doc! { "role": "admin" }).await?,
            total_movies: self.count("movies", doc! {}).await?,
            total_reviews: self.count("reviews", doc! {}).await?,
            total_actors: self.count("actors", doc! {}).await?,
            total_directors: self.count("directors", doc! {}).await?,
            total_writers: self.count("writers", doc! {}).await?,
            total_genres: self.count("genres", doc! {}).await?,
        };

        // Rolling window from the wall clock at request time.
        let cutoff = DateTime::from_millis(
            DateTime::now().timestamp_millis() - RECENT_WINDOW_DAYS * 24 * 60 * 60 * 1000,
        );
        let recent = doc! { "createdAt": { "$gte": cutoff } };
        let recent_activity = RecentActivityDto {
            new_users: self.count("users", recent.clone()).await?,
            new_movies: self.count("movies", recent.clone()).await?,
            new_reviews: self.count("reviews", recent).await?,
        };

        let top_genres = self.top_referenced("genres", "genres").await?;
        let top_directors = self.top_referenced("director", "directors").await?;
        let top_actors = self.top_referenced("cast", "actors").await?;

        let ratings = self.rating_stats().await?;

        Ok(AdminStatsDto {
            overview,
            recent_activity,
            top_genres,
            top_directors,
            top_actors,
            ratings,
        })
    }
}
