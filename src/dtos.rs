use mongodb::bson::{DateTime, oid::ObjectId};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::{Actor, Director, Genre, Movie, Review, User, UserRole, Writer};

// DTOs define the structure of data exchanged with clients. They are separate
// from the document models to control exactly what is exposed: ObjectIds go
// out as hex strings, BSON dates as RFC 3339 strings, password hashes never.

fn date_string(dt: DateTime) -> String {
    dt.try_to_rfc3339_string().unwrap_or_default()
}

// ============================================================================
// Response envelope
// ============================================================================

/// Pagination block attached to listing responses.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PaginationDto {
    pub current_page: i64,
    pub total_pages: i64,
    pub total_items: i64,
    pub items_per_page: i64,
}

impl PaginationDto {
    pub fn new(page: i64, limit: i64, total_items: u64) -> Self {
        PaginationDto {
            current_page: page,
            total_pages: crate::utils::query::total_pages(total_items, limit),
            total_items: total_items as i64,
            items_per_page: limit,
        }
    }
}

/// Uniform response envelope used by every endpoint.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<PaginationDto>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        ApiResponse {
            success: true,
            message: message.into(),
            data: Some(data),
            pagination: None,
        }
    }

    pub fn ok_paginated(message: impl Into<String>, data: T, pagination: PaginationDto) -> Self {
        ApiResponse {
            success: true,
            message: message.into(),
            data: Some(data),
            pagination: Some(pagination),
        }
    }
}

impl ApiResponse<()> {
    pub fn message_only(message: impl Into<String>) -> Self {
        ApiResponse {
            success: true,
            message: message.into(),
            data: None,
            pagination: None,
        }
    }
}

// ============================================================================
// Auth DTOs
// ============================================================================

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct SignupDto {
    #[validate(length(min = 3, max = 30, message = "Username must be 3 to 30 characters"))]
    pub username: String,

    #[validate(
        length(min = 1, message = "Email is required"),
        email(message = "Email is invalid")
    )]
    pub email: String,

    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
}

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct LoginDto {
    #[validate(
        length(min = 1, message = "Email is required"),
        email(message = "Email is invalid")
    )]
    pub email: String,

    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginDataDto {
    pub token: String,
    pub user: FilterUserDto,
}

// ============================================================================
// User DTOs
// ============================================================================

/// Client-safe user projection; excludes the password hash.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct FilterUserDto {
    pub id: String,
    pub username: String,
    pub email: String,
    pub profile_pic: String,
    pub role: String,
    pub is_active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_login: Option<String>,
    pub favorites: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl FilterUserDto {
    pub fn filter_user(user: &User) -> Self {
        FilterUserDto {
            id: user.id.map(|id| id.to_hex()).unwrap_or_default(),
            username: user.username.to_owned(),
            email: user.email.to_owned(),
            profile_pic: user.profile_pic.to_owned(),
            role: user.role.to_str().to_string(),
            is_active: user.is_active,
            last_login: user.last_login.map(date_string),
            favorites: user.favorites.iter().map(|id| id.to_hex()).collect(),
            created_at: date_string(user.created_at),
            updated_at: date_string(user.updated_at),
        }
    }

    pub fn filter_users(users: &[User]) -> Vec<FilterUserDto> {
        users.iter().map(FilterUserDto::filter_user).collect()
    }
}

/// Abbreviated user shape embedded in populated movies and reviews.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UserSummaryDto {
    pub id: String,
    pub username: String,
    pub profile_pic: String,
}

impl UserSummaryDto {
    pub fn from_user(user: &User) -> Self {
        UserSummaryDto {
            id: user.id.map(|id| id.to_hex()).unwrap_or_default(),
            username: user.username.to_owned(),
            profile_pic: user.profile_pic.to_owned(),
        }
    }
}

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileDto {
    #[validate(length(min = 3, max = 30, message = "Username must be 3 to 30 characters"))]
    pub username: Option<String>,

    #[validate(email(message = "Email is invalid"))]
    pub email: Option<String>,

    #[validate(url(message = "Profile picture must be a valid url"))]
    pub profile_pic: Option<String>,
}

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePasswordDto {
    #[validate(length(min = 6, message = "Old password must be at least 6 characters"))]
    pub old_password: String,

    #[validate(length(min = 6, message = "New password must be at least 6 characters"))]
    pub new_password: String,
}

// ============================================================================
// Master-data DTOs
// ============================================================================

/// Listing query shared by every master-data collection.
#[derive(Debug, Deserialize, Validate)]
pub struct ListQueryDto {
    pub search: Option<String>,
    pub sort: Option<String>,
    pub order: Option<String>,
    #[validate(range(min = 1, message = "Page must be greater than 0"))]
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonInputDto {
    #[validate(length(min = 1, max = 100, message = "Name is required"))]
    pub name: String,

    #[validate(length(max = 1000, message = "Bio must not exceed 1000 characters"))]
    pub bio: Option<String>,

    #[validate(url(message = "Photo must be a valid url"))]
    pub photo: Option<String>,

    pub date_of_birth: Option<String>,
    pub nationality: Option<String>,
}

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonUpdateDto {
    #[validate(length(min = 1, max = 100, message = "Name must not be empty"))]
    pub name: Option<String>,

    #[validate(length(max = 1000, message = "Bio must not exceed 1000 characters"))]
    pub bio: Option<String>,

    #[validate(url(message = "Photo must be a valid url"))]
    pub photo: Option<String>,

    pub date_of_birth: Option<String>,
    pub nationality: Option<String>,
}

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct GenreInputDto {
    #[validate(length(min = 1, max = 50, message = "Name is required"))]
    pub name: String,

    #[validate(length(max = 500, message = "Description must not exceed 500 characters"))]
    pub description: Option<String>,
}

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct GenreUpdateDto {
    #[validate(length(min = 1, max = 50, message = "Name must not be empty"))]
    pub name: Option<String>,

    #[validate(length(max = 500, message = "Description must not exceed 500 characters"))]
    pub description: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PersonDto {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
    pub photo_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nationality: Option<String>,
    pub created_by: String,
    pub created_at: String,
    pub updated_at: String,
}

macro_rules! person_dto_from {
    ($model:ty) => {
        impl From<&$model> for PersonDto {
            fn from(p: &$model) -> Self {
                PersonDto {
                    id: p.id.map(|id| id.to_hex()).unwrap_or_default(),
                    name: p.name.to_owned(),
                    bio: p.bio.to_owned(),
                    photo: p.photo.to_owned(),
                    photo_url: p.photo_url(),
                    date_of_birth: p.date_of_birth.to_owned(),
                    nationality: p.nationality.to_owned(),
                    created_by: p.created_by.to_hex(),
                    created_at: date_string(p.created_at),
                    updated_at: date_string(p.updated_at),
                }
            }
        }
    };
}

person_dto_from!(Actor);
person_dto_from!(Director);
person_dto_from!(Writer);

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct GenreDto {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_by: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&Genre> for GenreDto {
    fn from(g: &Genre) -> Self {
        GenreDto {
            id: g.id.map(|id| id.to_hex()).unwrap_or_default(),
            name: g.name.to_owned(),
            description: g.description.to_owned(),
            created_by: g.created_by.to_hex(),
            created_at: date_string(g.created_at),
            updated_at: date_string(g.updated_at),
        }
    }
}

// ============================================================================
// Movie DTOs
// ============================================================================

/// Reference input for movie foreign keys: either an existing id, or an
/// object carrying a name to create the record on the fly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum RefInput {
    Id(String),
    ByName { name: String },
}

#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMovieDto {
    #[validate(length(min = 1, max = 200, message = "Title is required"))]
    pub title: String,

    pub year: i32,

    pub duration: Option<String>,

    #[validate(url(message = "Poster must be a valid url"))]
    pub poster: String,

    #[validate(url(message = "Hero image must be a valid url"))]
    pub hero_image: Option<String>,

    #[validate(url(message = "Trailer must be a valid url"))]
    pub trailer: Option<String>,

    pub gallery: Option<Vec<String>>,

    #[validate(length(max = 2000, message = "Description must not exceed 2000 characters"))]
    pub description: Option<String>,

    pub director: RefInput,
    pub writers: Option<Vec<RefInput>>,
    pub cast: Option<Vec<RefInput>>,
    pub genres: Option<Vec<RefInput>>,
}

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMovieDto {
    #[validate(length(min = 1, max = 200, message = "Title must not be empty"))]
    pub title: Option<String>,

    pub year: Option<i32>,

    pub duration: Option<String>,

    #[validate(url(message = "Poster must be a valid url"))]
    pub poster: Option<String>,

    #[validate(url(message = "Hero image must be a valid url"))]
    pub hero_image: Option<String>,

    #[validate(url(message = "Trailer must be a valid url"))]
    pub trailer: Option<String>,

    pub gallery: Option<Vec<String>>,

    #[validate(length(max = 2000, message = "Description must not exceed 2000 characters"))]
    pub description: Option<String>,

    pub director: Option<RefInput>,
    pub writers: Option<Vec<RefInput>>,
    pub cast: Option<Vec<RefInput>>,
    pub genres: Option<Vec<RefInput>>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct MovieQueryDto {
    pub search: Option<String>,
    pub year: Option<i32>,
    /// Genre name, resolved to an id before filtering.
    pub genre: Option<String>,
    /// Director name, resolved to an id before filtering.
    pub director: Option<String>,
    /// Restrict to the authenticated user's own movies.
    pub mine: Option<bool>,
    /// Unordered random sample instead of sorted pagination.
    pub random: Option<bool>,
    pub sort: Option<String>,
    pub order: Option<String>,
    #[validate(range(min = 1, message = "Page must be greater than 0"))]
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct FavoritesQueryDto {
    pub genre: Option<String>,
    pub year: Option<i32>,
    pub sort: Option<String>,
    pub order: Option<String>,
    #[validate(range(min = 1, message = "Page must be greater than 0"))]
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// Movie projection with references as hex ids.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct FilterMovieDto {
    pub id: String,
    pub title: String,
    pub year: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    pub poster: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hero_image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trailer: Option<String>,
    pub gallery: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub director: String,
    pub writers: Vec<String>,
    pub cast: Vec<String>,
    pub genres: Vec<String>,
    pub user: String,
    pub average_rating: f64,
    pub total_reviews: i64,
    pub created_at: String,
    pub updated_at: String,
}

impl FilterMovieDto {
    pub fn filter_movie(movie: &Movie) -> Self {
        FilterMovieDto {
            id: movie.id.map(|id| id.to_hex()).unwrap_or_default(),
            title: movie.title.to_owned(),
            year: movie.year,
            duration: movie.duration.to_owned(),
            poster: movie.poster.to_owned(),
            hero_image: movie.hero_image.to_owned(),
            trailer: movie.trailer.to_owned(),
            gallery: movie.gallery.to_owned(),
            description: movie.description.to_owned(),
            director: movie.director.to_hex(),
            writers: movie.writers.iter().map(|id| id.to_hex()).collect(),
            cast: movie.cast.iter().map(|id| id.to_hex()).collect(),
            genres: movie.genres.iter().map(|id| id.to_hex()).collect(),
            user: movie.user.to_hex(),
            average_rating: movie.average_rating,
            total_reviews: movie.total_reviews,
            created_at: date_string(movie.created_at),
            updated_at: date_string(movie.updated_at),
        }
    }

    pub fn filter_movies(movies: &[Movie]) -> Vec<FilterMovieDto> {
        movies.iter().map(FilterMovieDto::filter_movie).collect()
    }
}

/// Raw shape produced by the movie `$lookup` pipelines; single-valued joins
/// already flattened by `$arrayElemAt`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PopulatedMovie {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub title: String,
    pub year: i32,
    #[serde(default)]
    pub duration: Option<String>,
    pub poster: String,
    #[serde(default)]
    pub hero_image: Option<String>,
    #[serde(default)]
    pub trailer: Option<String>,
    #[serde(default)]
    pub gallery: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub director: Option<Director>,
    #[serde(default)]
    pub writers: Vec<Writer>,
    #[serde(default)]
    pub cast: Vec<Actor>,
    #[serde(default)]
    pub genres: Vec<Genre>,
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub average_rating: f64,
    #[serde(default)]
    pub total_reviews: i64,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct NamedRefDto {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PopulatedMovieDto {
    pub id: String,
    pub title: String,
    pub year: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    pub poster: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hero_image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trailer: Option<String>,
    pub gallery: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub director: Option<NamedRefDto>,
    pub writers: Vec<NamedRefDto>,
    pub cast: Vec<NamedRefDto>,
    pub genres: Vec<NamedRefDto>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserSummaryDto>,
    pub average_rating: f64,
    pub total_reviews: i64,
    pub created_at: String,
    pub updated_at: String,
}

impl PopulatedMovieDto {
    pub fn from_populated(movie: &PopulatedMovie) -> Self {
        let named = |id: Option<ObjectId>, name: &str| NamedRefDto {
            id: id.map(|id| id.to_hex()).unwrap_or_default(),
            name: name.to_owned(),
        };
        PopulatedMovieDto {
            id: movie.id.to_hex(),
            title: movie.title.to_owned(),
            year: movie.year,
            duration: movie.duration.to_owned(),
            poster: movie.poster.to_owned(),
            hero_image: movie.hero_image.to_owned(),
            trailer: movie.trailer.to_owned(),
            gallery: movie.gallery.to_owned(),
            description: movie.description.to_owned(),
            director: movie.director.as_ref().map(|d| named(d.id, &d.name)),
            writers: movie
                .writers
                .iter()
                .map(|w| named(w.id, &w.name))
                .collect(),
            cast: movie.cast.iter().map(|a| named(a.id, &a.name)).collect(),
            genres: movie.genres.iter().map(|g| named(g.id, &g.name)).collect(),
            user: movie.user.as_ref().map(UserSummaryDto::from_user),
            average_rating: movie.average_rating,
            total_reviews: movie.total_reviews,
            created_at: date_string(movie.created_at),
            updated_at: date_string(movie.updated_at),
        }
    }
}

// ============================================================================
// Review DTOs
// ============================================================================

#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
pub struct CreateReviewDto {
    #[validate(length(min = 1, message = "Movie id is required"))]
    pub movie: String,

    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: i32,

    #[validate(length(max = 500, message = "Comment must not exceed 500 characters"))]
    pub comment: Option<String>,
}

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct UpdateReviewDto {
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: Option<i32>,

    #[validate(length(max = 500, message = "Comment must not exceed 500 characters"))]
    pub comment: Option<String>,
}

#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
pub struct ReportReviewDto {
    #[validate(length(min = 1, max = 500, message = "Reason is required"))]
    pub reason: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ReviewQueryDto {
    #[validate(range(min = 1, message = "Page must be greater than 0"))]
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub sort: Option<String>,
    pub order: Option<String>,
}

/// Review joined with its author, as produced by the listing pipeline.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewWithUser {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub movie: ObjectId,
    #[serde(default)]
    pub user: Option<User>,
    pub rating: i32,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub likes: Vec<ObjectId>,
    #[serde(default)]
    pub is_edited: bool,
    #[serde(default)]
    pub edited_at: Option<DateTime>,
    #[serde(default)]
    pub is_reported: bool,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewDto {
    pub id: String,
    pub movie: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserSummaryDto>,
    pub rating: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub likes: Vec<String>,
    pub likes_count: i64,
    pub is_edited: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edited_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl ReviewDto {
    pub fn from_joined(review: &ReviewWithUser) -> Self {
        ReviewDto {
            id: review.id.to_hex(),
            movie: review.movie.to_hex(),
            user: review.user.as_ref().map(UserSummaryDto::from_user),
            rating: review.rating,
            comment: review.comment.to_owned(),
            likes: review.likes.iter().map(|id| id.to_hex()).collect(),
            likes_count: review.likes.len() as i64,
            is_edited: review.is_edited,
            edited_at: review.edited_at.map(date_string),
            created_at: date_string(review.created_at),
            updated_at: date_string(review.updated_at),
        }
    }
}

/// Review as returned from mutations, before any user join.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterReviewDto {
    pub id: String,
    pub movie: String,
    pub user: String,
    pub rating: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub likes_count: i64,
    pub is_edited: bool,
    pub is_reported: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl FilterReviewDto {
    pub fn filter_review(review: &Review) -> Self {
        FilterReviewDto {
            id: review.id.map(|id| id.to_hex()).unwrap_or_default(),
            movie: review.movie.to_hex(),
            user: review.user.to_hex(),
            rating: review.rating,
            comment: review.comment.to_owned(),
            likes_count: review.likes.len() as i64,
            is_edited: review.is_edited,
            is_reported: review.is_reported,
            created_at: date_string(review.created_at),
            updated_at: date_string(review.updated_at),
        }
    }

    pub fn filter_reviews(reviews: &[Review]) -> Vec<FilterReviewDto> {
        reviews.iter().map(FilterReviewDto::filter_review).collect()
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeResultDto {
    pub liked: bool,
    pub likes_count: i64,
}

// ============================================================================
// Admin DTOs
// ============================================================================

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminUpdateUserDto {
    pub role: Option<UserRole>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AdminUserQueryDto {
    pub search: Option<String>,
    #[validate(range(min = 1, message = "Page must be greater than 0"))]
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AdminReviewQueryDto {
    /// Restrict to reported reviews.
    pub reported: Option<bool>,
    #[validate(range(min = 1, message = "Page must be greater than 0"))]
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
pub struct BulkDeleteDto {
    #[validate(length(min = 1, message = "At least one id is required"))]
    pub ids: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkDeleteResultDto {
    pub deleted: Vec<String>,
    pub failed: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsOverviewDto {
    pub total_users: u64,
    pub active_users: u64,
    pub admin_users: u64,
    pub total_movies: u64,
    pub total_reviews: u64,
    pub total_actors: u64,
    pub total_directors: u64,
    pub total_writers: u64,
    pub total_genres: u64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentActivityDto {
    pub new_users: u64,
    pub new_movies: u64,
    pub new_reviews: u64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopItemDto {
    pub id: String,
    pub name: String,
    pub count: i64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingStatsDto {
    pub average_rating: f64,
    pub total_ratings: i64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminStatsDto {
    pub overview: StatsOverviewDto,
    pub recent_activity: RecentActivityDto,
    pub top_genres: Vec<TopItemDto>,
    pub top_directors: Vec<TopItemDto>,
    pub top_actors: Vec<TopItemDto>,
    pub ratings: RatingStatsDto,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_serializes_expected_keys() {
        let resp = ApiResponse::ok_paginated(
            "Movies fetched successfully",
            vec!["a"],
            PaginationDto::new(1, 24, 30),
        );
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["message"], "Movies fetched successfully");
        assert_eq!(json["data"][0], "a");
        assert_eq!(json["pagination"]["currentPage"], 1);
        assert_eq!(json["pagination"]["totalPages"], 2);
        assert_eq!(json["pagination"]["totalItems"], 30);
        assert_eq!(json["pagination"]["itemsPerPage"], 24);
    }

    #[test]
    fn envelope_omits_absent_data_and_pagination() {
        let resp = ApiResponse::message_only("Logged out successfully");
        let json = serde_json::to_value(&resp).unwrap();
        assert!(json.get("data").is_none());
        assert!(json.get("pagination").is_none());
    }

    #[test]
    fn ref_input_accepts_id_or_name_object() {
        let id: RefInput = serde_json::from_str(r#""64b5f0a1c2d3e4f5a6b7c8d9""#).unwrap();
        assert_eq!(id, RefInput::Id("64b5f0a1c2d3e4f5a6b7c8d9".to_string()));

        let by_name: RefInput =
            serde_json::from_str(r#"{"name":"Sofia Coppola","bio":"ignored"}"#).unwrap();
        assert_eq!(
            by_name,
            RefInput::ByName {
                name: "Sofia Coppola".to_string()
            }
        );
    }

    #[test]
    fn pagination_math() {
        let p = PaginationDto::new(2, 24, 49);
        assert_eq!(p.total_pages, 3);
        let empty = PaginationDto::new(1, 10, 0);
        assert_eq!(empty.total_pages, 0);
        assert_eq!(empty.total_items, 0);
    }

    #[test]
    fn populated_movie_deserializes_lookup_output() {
        use mongodb::bson::{DateTime, doc, oid::ObjectId};

        let director_id = ObjectId::new();
        let owner_id = ObjectId::new();
        let now = DateTime::now();

        // Shape produced by the $lookup/$arrayElemAt pipeline stages.
        let document = doc! {
            "_id": ObjectId::new(),
            "title": "Paris, Texas",
            "year": 1984,
            "poster": "https://example.com/poster.jpg",
            "director": {
                "_id": director_id,
                "name": "Wim Wenders",
                "createdBy": owner_id,
                "createdAt": now,
                "updatedAt": now,
            },
            "writers": [],
            "cast": [],
            "genres": [ {
                "_id": ObjectId::new(),
                "name": "drama",
                "createdBy": owner_id,
                "createdAt": now,
                "updatedAt": now,
            } ],
            "user": {
                "_id": owner_id,
                "email": "owner@example.com",
                "username": "owner",
                "password": "hash",
                "profilePic": "https://example.com/p.png",
                "role": "user",
                "isActive": true,
                "createdAt": now,
                "updatedAt": now,
            },
            "averageRating": 4.3,
            "totalReviews": 12_i64,
            "createdAt": now,
            "updatedAt": now,
        };

        let populated: PopulatedMovie = mongodb::bson::from_document(document).unwrap();
        let dto = PopulatedMovieDto::from_populated(&populated);

        assert_eq!(dto.title, "Paris, Texas");
        assert_eq!(dto.director.as_ref().unwrap().name, "Wim Wenders");
        assert_eq!(dto.director.as_ref().unwrap().id, director_id.to_hex());
        assert_eq!(dto.genres.len(), 1);
        assert_eq!(dto.genres[0].name, "drama");
        assert_eq!(dto.user.as_ref().unwrap().username, "owner");
        assert_eq!(dto.average_rating, 4.3);
        assert_eq!(dto.total_reviews, 12);
    }
}
