use chrono::Datelike;
use futures::TryStreamExt;
use mongodb::{
    bson::{self, Bson, DateTime, Document, doc, oid::ObjectId},
    options::ReturnDocument,
};

use super::DBClient;
use crate::db::MasterEntity;
use crate::dtos::{CreateMovieDto, PopulatedMovie, RefInput, UpdateMovieDto};
use crate::error::ApiError;
use crate::models::{Actor, Director, Genre, Movie, Writer};
use crate::utils::query::{contains_filter, escape_regex, resolve_sort, skip_for};

pub const MOVIE_SORT_FIELDS: &[&str] = &[
    "title",
    "year",
    "createdAt",
    "averageRating",
    "imdbRating",
    "duration",
];

const FAVORITES_SORT_FIELDS: &[&str] = &["title", "year", "averageRating", "createdAt"];

pub const MIN_MOVIE_YEAR: i32 = 1900;

/// Listing parameters after handler-side clamping.
#[derive(Debug, Default)]
pub struct MovieListQuery {
    pub search: Option<String>,
    pub year: Option<i32>,
    pub genre: Option<String>,
    pub director: Option<String>,
    pub owner: Option<ObjectId>,
    pub sort: Option<String>,
    pub order: Option<String>,
    pub page: i64,
    pub limit: i64,
}

pub fn validate_year(year: i32) -> Result<(), ApiError> {
    let max = chrono::Utc::now().year() + 5;
    if year < MIN_MOVIE_YEAR || year > max {
        return Err(ApiError::Validation(format!(
            "Year must be between {} and {}",
            MIN_MOVIE_YEAR, max
        )));
    }
    Ok(())
}

/// `$lookup` stages resolving every movie reference, flattening the
/// single-valued joins (director, user) to scalars.
fn populate_stages() -> Vec<Document> {
    vec![
        doc! { "$lookup": { "from": "directors", "localField": "director", "foreignField": "_id", "as": "director" } },
        doc! { "$lookup": { "from": "writers", "localField": "writers", "foreignField": "_id", "as": "writers" } },
        doc! { "$lookup": { "from": "actors", "localField": "cast", "foreignField": "_id", "as": "cast" } },
        doc! { "$lookup": { "from": "genres", "localField": "genres", "foreignField": "_id", "as": "genres" } },
        doc! { "$lookup": { "from": "users", "localField": "user", "foreignField": "_id", "as": "user" } },
        doc! { "$addFields": {
            "director": { "$arrayElemAt": ["$director", 0] },
            "user": { "$arrayElemAt": ["$user", 0] },
        } },
    ]
}

fn facet_count(facet: &Document) -> i64 {
    facet
        .get_array("total")
        .ok()
        .and_then(|arr| arr.first())
        .and_then(Bson::as_document)
        .and_then(|d| d.get("count"))
        .map(|count| match count {
            Bson::Int32(n) => *n as i64,
            Bson::Int64(n) => *n,
            _ => 0,
        })
        .unwrap_or(0)
}

/// Movie database operations.
pub trait MovieExt {
    async fn get_movie(&self, movie_id: ObjectId) -> Result<Option<Movie>, ApiError>;

    async fn create_movie(&self, input: CreateMovieDto, owner: ObjectId)
    -> Result<Movie, ApiError>;

    /// `owner = None` is the admin (global) scope. `acting_user` attributes
    /// any master-data records created on the fly by the resolver.
    async fn update_movie(
        &self,
        movie_id: ObjectId,
        input: UpdateMovieDto,
        owner: Option<ObjectId>,
        acting_user: ObjectId,
    ) -> Result<Movie, ApiError>;

    /// Deleting a movie also deletes its reviews.
    async fn delete_movie(&self, movie_id: ObjectId, owner: Option<ObjectId>)
    -> Result<(), ApiError>;

    async fn get_movies(&self, query: &MovieListQuery) -> Result<(Vec<Movie>, u64), ApiError>;

    /// Unordered random sample of `size` movies from the filtered set, with
    /// all references resolved. Never returns more than the pool holds.
    async fn sample_movies(
        &self,
        query: &MovieListQuery,
        size: i64,
    ) -> Result<Vec<PopulatedMovie>, ApiError>;

    async fn get_movies_by_actor(
        &self,
        actor_id: ObjectId,
        page: i64,
        limit: i64,
    ) -> Result<(Vec<Movie>, u64), ApiError>;

    async fn get_favorite_movies(
        &self,
        user_id: ObjectId,
        genre: Option<&str>,
        year: Option<i32>,
        sort: Option<&str>,
        order: Option<&str>,
        page: i64,
        limit: i64,
    ) -> Result<(Vec<PopulatedMovie>, u64), ApiError>;
}

impl DBClient {
    /// Resolve one reference input to a persisted id. Existing ids must point
    /// at a real record; by-name inputs reuse or create, attributed to the
    /// acting user. Failures name the offending field.
    async fn resolve_single<T: MasterEntity>(
        &self,
        input: &RefInput,
        field: &str,
        acting_user: ObjectId,
    ) -> Result<ObjectId, ApiError> {
        let repo = self.master::<T>();
        match input {
            RefInput::Id(raw) => {
                let id = ObjectId::parse_str(raw).map_err(|_| {
                    ApiError::Validation(format!("Invalid reference in field '{}'", field))
                })?;
                if !repo.exists(id).await? {
                    return Err(ApiError::Validation(format!(
                        "Unknown {} reference in field '{}'",
                        T::DISPLAY.to_lowercase(),
                        field
                    )));
                }
                Ok(id)
            }
            RefInput::ByName { name } => {
                if name.trim().is_empty() {
                    return Err(ApiError::Validation(format!(
                        "Name is required in field '{}'",
                        field
                    )));
                }
                repo.resolve_or_create_by_name(name, acting_user).await
            }
        }
    }

    /// Input order is preserved; repeated entries are not collapsed.
    async fn resolve_many<T: MasterEntity>(
        &self,
        inputs: &[RefInput],
        field: &str,
        acting_user: ObjectId,
    ) -> Result<Vec<ObjectId>, ApiError> {
        let mut ids = Vec::with_capacity(inputs.len());
        for input in inputs {
            ids.push(self.resolve_single::<T>(input, field, acting_user).await?);
        }
        Ok(ids)
    }

    /// Translate listing parameters into a find/aggregation filter. The
    /// search term matches title/description substrings or actor names
    /// (folded into a cast `$in`); genre and director filters resolve
    /// names to ids first.
    async fn build_movie_filter(&self, query: &MovieListQuery) -> Result<Document, ApiError> {
        let mut filter = doc! {};

        if let Some(term) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let mut clauses = vec![
                contains_filter("title", term),
                contains_filter("description", term),
            ];
            let matching_actors: Vec<ObjectId> = self
                .master::<Actor>()
                .list(Some(term), None, None, 1, 100, None)
                .await?
                .0
                .iter()
                .filter_map(|a| a.id)
                .collect();
            if !matching_actors.is_empty() {
                clauses.push(doc! { "cast": { "$in": matching_actors } });
            }
            filter.insert("$or", clauses);
        }

        if let Some(year) = query.year {
            filter.insert("year", year);
        }

        if let Some(genre) = query.genre.as_deref().filter(|s| !s.trim().is_empty()) {
            let genre_id = self.master::<Genre>().find_by_name(genre).await?.and_then(|g| g.id);
            match genre_id {
                Some(id) => filter.insert("genres", id),
                // Unknown genre name matches nothing.
                None => filter.insert("genres", doc! { "$in": Vec::<ObjectId>::new() }),
            };
        }

        if let Some(director) = query.director.as_deref().filter(|s| !s.trim().is_empty()) {
            let director_id = self
                .master::<Director>()
                .find_by_name(director)
                .await?
                .and_then(|d| d.id);
            match director_id {
                Some(id) => filter.insert("director", id),
                None => filter.insert("director", doc! { "$in": Vec::<ObjectId>::new() }),
            };
        }

        if let Some(owner) = query.owner {
            filter.insert("user", owner);
        }

        Ok(filter)
    }
}

impl MovieExt for DBClient {
    async fn get_movie(&self, movie_id: ObjectId) -> Result<Option<Movie>, ApiError> {
        Ok(self.movies().find_one(doc! { "_id": movie_id }).await?)
    }

    async fn create_movie(
        &self,
        input: CreateMovieDto,
        owner: ObjectId,
    ) -> Result<Movie, ApiError> {
        validate_year(input.year)?;

        let director = self
            .resolve_single::<Director>(&input.director, "director", owner)
            .await?;
        let writers = self
            .resolve_many::<Writer>(input.writers.as_deref().unwrap_or(&[]), "writers", owner)
            .await?;
        let cast = self
            .resolve_many::<Actor>(input.cast.as_deref().unwrap_or(&[]), "cast", owner)
            .await?;
        let genres = self
            .resolve_many::<Genre>(input.genres.as_deref().unwrap_or(&[]), "genres", owner)
            .await?;

        let now = DateTime::now();
        let mut movie = Movie {
            id: None,
            title: input.title,
            year: input.year,
            duration: input.duration,
            poster: input.poster,
            hero_image: input.hero_image,
            trailer: input.trailer,
            gallery: input.gallery.unwrap_or_default(),
            description: input.description,
            director,
            writers,
            cast,
            genres,
            user: owner,
            average_rating: 0.0,
            total_reviews: 0,
            created_at: now,
            updated_at: now,
        };

        let result = self.movies().insert_one(&movie).await?;
        if let Some(id) = result.inserted_id.as_object_id() {
            movie.id = Some(id);
        }
        Ok(movie)
    }

    async fn update_movie(
        &self,
        movie_id: ObjectId,
        input: UpdateMovieDto,
        owner: Option<ObjectId>,
        acting_user: ObjectId,
    ) -> Result<Movie, ApiError> {
        let mut set = doc! { "updatedAt": DateTime::now() };

        if let Some(title) = input.title {
            set.insert("title", title);
        }
        if let Some(year) = input.year {
            validate_year(year)?;
            set.insert("year", year);
        }
        if let Some(duration) = input.duration {
            set.insert("duration", duration);
        }
        if let Some(poster) = input.poster {
            set.insert("poster", poster);
        }
        if let Some(hero_image) = input.hero_image {
            set.insert("heroImage", hero_image);
        }
        if let Some(trailer) = input.trailer {
            set.insert("trailer", trailer);
        }
        if let Some(gallery) = input.gallery {
            set.insert("gallery", gallery);
        }
        if let Some(description) = input.description {
            set.insert("description", description);
        }

        if let Some(director) = &input.director {
            let id = self
                .resolve_single::<Director>(director, "director", acting_user)
                .await?;
            set.insert("director", id);
        }
        if let Some(writers) = &input.writers {
            let ids = self
                .resolve_many::<Writer>(writers, "writers", acting_user)
                .await?;
            set.insert("writers", ids);
        }
        if let Some(cast) = &input.cast {
            let ids = self.resolve_many::<Actor>(cast, "cast", acting_user).await?;
            set.insert("cast", ids);
        }
        if let Some(genres) = &input.genres {
            let ids = self
                .resolve_many::<Genre>(genres, "genres", acting_user)
                .await?;
            set.insert("genres", ids);
        }

        let filter = match owner {
            Some(owner) => doc! { "_id": movie_id, "user": owner },
            None => doc! { "_id": movie_id },
        };

        let updated = self
            .movies()
            .find_one_and_update(filter, doc! { "$set": set })
            .return_document(ReturnDocument::After)
            .await?;
        updated.ok_or_else(|| ApiError::NotFound("Movie not found".to_string()))
    }

    async fn delete_movie(
        &self,
        movie_id: ObjectId,
        owner: Option<ObjectId>,
    ) -> Result<(), ApiError> {
        let filter = match owner {
            Some(owner) => doc! { "_id": movie_id, "user": owner },
            None => doc! { "_id": movie_id },
        };
        let result = self.movies().delete_one(filter).await?;
        if result.deleted_count == 0 {
            return Err(ApiError::NotFound("Movie not found".to_string()));
        }
        self.reviews().delete_many(doc! { "movie": movie_id }).await?;
        Ok(())
    }

    async fn get_movies(&self, query: &MovieListQuery) -> Result<(Vec<Movie>, u64), ApiError> {
        let filter = self.build_movie_filter(query).await?;
        let total = self.movies().count_documents(filter.clone()).await?;
        let movies = self
            .movies()
            .find(filter)
            .sort(resolve_sort(
                query.sort.as_deref(),
                query.order.as_deref(),
                MOVIE_SORT_FIELDS,
            ))
            .skip(skip_for(query.page, query.limit))
            .limit(query.limit)
            .await?
            .try_collect()
            .await?;
        Ok((movies, total))
    }

    async fn sample_movies(
        &self,
        query: &MovieListQuery,
        size: i64,
    ) -> Result<Vec<PopulatedMovie>, ApiError> {
        let filter = self.build_movie_filter(query).await?;

        let mut pipeline = vec![
            doc! { "$match": filter },
            doc! { "$sample": { "size": size } },
        ];
        pipeline.extend(populate_stages());

        let movies = self
            .movies()
            .aggregate(pipeline)
            .with_type::<PopulatedMovie>()
            .await?
            .try_collect()
            .await?;
        Ok(movies)
    }

    async fn get_movies_by_actor(
        &self,
        actor_id: ObjectId,
        page: i64,
        limit: i64,
    ) -> Result<(Vec<Movie>, u64), ApiError> {
        if !self.master::<Actor>().exists(actor_id).await? {
            return Err(ApiError::NotFound("Actor not found".to_string()));
        }

        let filter = doc! { "cast": actor_id };
        let total = self.movies().count_documents(filter.clone()).await?;
        let movies = self
            .movies()
            .find(filter)
            .sort(doc! { "year": -1, "createdAt": -1 })
            .skip(skip_for(page, limit))
            .limit(limit)
            .await?
            .try_collect()
            .await?;
        Ok((movies, total))
    }

    async fn get_favorite_movies(
        &self,
        user_id: ObjectId,
        genre: Option<&str>,
        year: Option<i32>,
        sort: Option<&str>,
        order: Option<&str>,
        page: i64,
        limit: i64,
    ) -> Result<(Vec<PopulatedMovie>, u64), ApiError> {
        let mut pipeline = vec![
            doc! { "$match": { "_id": user_id } },
            doc! { "$project": { "favorites": 1 } },
            doc! { "$unwind": "$favorites" },
            doc! { "$lookup": { "from": "movies", "localField": "favorites", "foreignField": "_id", "as": "movie" } },
            doc! { "$unwind": "$movie" },
            doc! { "$replaceRoot": { "newRoot": "$movie" } },
        ];
        pipeline.extend(populate_stages());

        if let Some(genre) = genre.map(str::trim).filter(|s| !s.is_empty()) {
            pipeline.push(doc! { "$match": {
                "genres.name": { "$regex": format!("^{}$", escape_regex(genre)), "$options": "i" }
            } });
        }
        if let Some(year) = year {
            pipeline.push(doc! { "$match": { "year": year } });
        }

        // "rating" is accepted as an alias for the cached average.
        let sort = match sort {
            Some("rating") => Some("averageRating"),
            other => other,
        };
        pipeline.push(doc! { "$sort": resolve_sort(sort, order, FAVORITES_SORT_FIELDS) });

        // Count and window in one round trip.
        pipeline.push(doc! { "$facet": {
            "items": [ { "$skip": skip_for(page, limit) as i64 }, { "$limit": limit } ],
            "total": [ { "$count": "count" } ],
        } });

        let mut cursor = self.users().aggregate(pipeline).await?;
        let facet = cursor.try_next().await?.unwrap_or_default();

        let movies = facet
            .get_array("items")
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .filter_map(|b| b.as_document().cloned())
            .map(bson::from_document::<PopulatedMovie>)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| ApiError::Internal(format!("malformed favorites document: {}", e)))?;

        Ok((movies, facet_count(&facet) as u64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn year_bounds_follow_wall_clock() {
        assert!(validate_year(1900).is_ok());
        assert!(validate_year(1899).is_err());
        let max = chrono::Utc::now().year() + 5;
        assert!(validate_year(max).is_ok());
        assert!(validate_year(max + 1).is_err());
    }

    #[test]
    fn facet_count_reads_int32_and_int64() {
        let d32 = doc! { "total": [ { "count": 7_i32 } ] };
        assert_eq!(facet_count(&d32), 7);
        let d64 = doc! { "total": [ { "count": 7_i64 } ] };
        assert_eq!(facet_count(&d64), 7);
        let empty = doc! { "total": [] };
        assert_eq!(facet_count(&empty), 0);
    }

    #[test]
    fn movie_sort_whitelist_covers_listing_fields() {
        for field in ["title", "year", "createdAt", "averageRating", "imdbRating", "duration"] {
            assert!(MOVIE_SORT_FIELDS.contains(&field));
        }
    }
}
