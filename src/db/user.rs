use futures::TryStreamExt;
use mongodb::{
    bson::{DateTime, Document, doc, oid::ObjectId},
    options::ReturnDocument,
};

use super::DBClient;
use crate::db::ReviewExt;
use crate::error::{ApiError, is_duplicate_key};
use crate::models::{User, UserRole, generated_avatar};
use crate::utils::query::{contains_filter, skip_for};

/// User database operations.
pub trait UserExt {
    async fn get_user_by_id(&self, user_id: ObjectId) -> Result<Option<User>, ApiError>;
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, ApiError>;

    /// Create a user with defaults (role `user`, active, generated avatar).
    /// Emails are stored lowercased; duplicates surface as Conflict.
    async fn save_user(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<User, ApiError>;

    async fn update_last_login(&self, user_id: ObjectId) -> Result<(), ApiError>;

    async fn update_profile(
        &self,
        user_id: ObjectId,
        username: Option<&str>,
        email: Option<&str>,
        profile_pic: Option<&str>,
    ) -> Result<User, ApiError>;

    async fn update_password(&self, user_id: ObjectId, password_hash: &str)
    -> Result<(), ApiError>;

    async fn add_favorite(&self, user_id: ObjectId, movie_id: ObjectId) -> Result<User, ApiError>;
    async fn remove_favorite(
        &self,
        user_id: ObjectId,
        movie_id: ObjectId,
    ) -> Result<User, ApiError>;

    async fn get_users(
        &self,
        search: Option<&str>,
        page: i64,
        limit: i64,
    ) -> Result<(Vec<User>, u64), ApiError>;

    async fn admin_update_user(
        &self,
        user_id: ObjectId,
        role: Option<UserRole>,
        is_active: Option<bool>,
    ) -> Result<User, ApiError>;

    /// Delete a user together with their reviews and movies (and the reviews
    /// of those movies). Refuses to remove the last admin.
    async fn delete_user_cascade(&self, user_id: ObjectId) -> Result<(), ApiError>;
}

impl UserExt for DBClient {
    async fn get_user_by_id(&self, user_id: ObjectId) -> Result<Option<User>, ApiError> {
        Ok(self.users().find_one(doc! { "_id": user_id }).await?)
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, ApiError> {
        let email = email.trim().to_lowercase();
        Ok(self.users().find_one(doc! { "email": email }).await?)
    }

    async fn save_user(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<User, ApiError> {
        let now = DateTime::now();
        let mut user = User {
            id: None,
            email: email.trim().to_lowercase(),
            username: username.to_string(),
            password: password_hash.to_string(),
            profile_pic: generated_avatar(username),
            role: UserRole::User,
            is_active: true,
            last_login: None,
            favorites: Vec::new(),
            created_at: now,
            updated_at: now,
        };

        let result = self.users().insert_one(&user).await.map_err(|e| {
            if is_duplicate_key(&e) {
                ApiError::Conflict("Email already in use".to_string())
            } else {
                ApiError::from(e)
            }
        })?;
        if let Some(id) = result.inserted_id.as_object_id() {
            user.id = Some(id);
        }
        Ok(user)
    }

    async fn update_last_login(&self, user_id: ObjectId) -> Result<(), ApiError> {
        self.users()
            .update_one(
                doc! { "_id": user_id },
                doc! { "$set": { "lastLogin": DateTime::now() } },
            )
            .await?;
        Ok(())
    }

    async fn update_profile(
        &self,
        user_id: ObjectId,
        username: Option<&str>,
        email: Option<&str>,
        profile_pic: Option<&str>,
    ) -> Result<User, ApiError> {
        let mut set = doc! { "updatedAt": DateTime::now() };
        if let Some(username) = username {
            set.insert("username", username);
        }
        if let Some(email) = email {
            set.insert("email", email.trim().to_lowercase());
        }
        if let Some(profile_pic) = profile_pic {
            set.insert("profilePic", profile_pic);
        }

        let updated = self
            .users()
            .find_one_and_update(doc! { "_id": user_id }, doc! { "$set": set })
            .return_document(ReturnDocument::After)
            .await
            .map_err(|e| {
                if is_duplicate_key(&e) {
                    ApiError::Conflict("Email already in use".to_string())
                } else {
                    ApiError::from(e)
                }
            })?;
        updated.ok_or_else(|| ApiError::NotFound("User not found".to_string()))
    }

    async fn update_password(
        &self,
        user_id: ObjectId,
        password_hash: &str,
    ) -> Result<(), ApiError> {
        let result = self
            .users()
            .update_one(
                doc! { "_id": user_id },
                doc! { "$set": { "password": password_hash, "updatedAt": DateTime::now() } },
            )
            .await?;
        if result.matched_count == 0 {
            return Err(ApiError::NotFound("User not found".to_string()));
        }
        Ok(())
    }

    async fn add_favorite(&self, user_id: ObjectId, movie_id: ObjectId) -> Result<User, ApiError> {
        let movie = self
            .movies()
            .find_one(doc! { "_id": movie_id })
            .await?
            .is_some();
        if !movie {
            return Err(ApiError::NotFound("Movie not found".to_string()));
        }

        let updated = self
            .users()
            .find_one_and_update(
                doc! { "_id": user_id },
                doc! {
                    "$push": { "favorites": movie_id },
                    "$set": { "updatedAt": DateTime::now() },
                },
            )
            .return_document(ReturnDocument::After)
            .await?;
        updated.ok_or_else(|| ApiError::NotFound("User not found".to_string()))
    }

    async fn remove_favorite(
        &self,
        user_id: ObjectId,
        movie_id: ObjectId,
    ) -> Result<User, ApiError> {
        let updated = self
            .users()
            .find_one_and_update(
                doc! { "_id": user_id },
                doc! {
                    "$pull": { "favorites": movie_id },
                    "$set": { "updatedAt": DateTime::now() },
                },
            )
            .return_document(ReturnDocument::After)
            .await?;
        updated.ok_or_else(|| ApiError::NotFound("User not found".to_string()))
    }

    async fn get_users(
        &self,
        search: Option<&str>,
        page: i64,
        limit: i64,
    ) -> Result<(Vec<User>, u64), ApiError> {
        let mut filter = doc! {};
        if let Some(term) = search.map(str::trim).filter(|s| !s.is_empty()) {
            filter.insert(
                "$or",
                vec![
                    contains_filter("username", term),
                    contains_filter("email", term),
                ],
            );
        }

        let total = self.users().count_documents(filter.clone()).await?;
        let users = self
            .users()
            .find(filter)
            .sort(doc! { "createdAt": -1 })
            .skip(skip_for(page, limit))
            .limit(limit)
            .await?
            .try_collect()
            .await?;

        Ok((users, total))
    }

    async fn admin_update_user(
        &self,
        user_id: ObjectId,
        role: Option<UserRole>,
        is_active: Option<bool>,
    ) -> Result<User, ApiError> {
        let mut set = doc! { "updatedAt": DateTime::now() };
        if let Some(role) = role {
            set.insert("role", role.to_str());
        }
        if let Some(is_active) = is_active {
            set.insert("isActive", is_active);
        }

        // Demoting or deactivating the last admin would lock the admin area.
        let target = self
            .get_user_by_id(user_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;
        if target.role == UserRole::Admin {
            let becomes_non_admin = matches!(role, Some(UserRole::User));
            let becomes_inactive = is_active == Some(false);
            if becomes_non_admin || becomes_inactive {
                let admins = self
                    .users()
                    .count_documents(doc! { "role": "admin", "isActive": true })
                    .await?;
                if admins <= 1 {
                    return Err(ApiError::BusinessRule(
                        "Cannot demote or deactivate the last admin user".to_string(),
                    ));
                }
            }
        }

        let updated = self
            .users()
            .find_one_and_update(doc! { "_id": user_id }, doc! { "$set": set })
            .return_document(ReturnDocument::After)
            .await?;
        updated.ok_or_else(|| ApiError::NotFound("User not found".to_string()))
    }

    async fn delete_user_cascade(&self, user_id: ObjectId) -> Result<(), ApiError> {
        let user = self
            .get_user_by_id(user_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

        if user.role == UserRole::Admin {
            let admins = self.users().count_documents(doc! { "role": "admin" }).await?;
            if admins <= 1 {
                return Err(ApiError::BusinessRule(
                    "Cannot delete the last admin user".to_string(),
                ));
            }
        }

        // Movies this user reviewed keep existing; their cached ratings must
        // be recomputed once the reviews are gone.
        let reviewed_movie_ids: Vec<ObjectId> = self
            .reviews()
            .clone_with_type::<Document>()
            .find(doc! { "user": user_id })
            .projection(doc! { "movie": 1 })
            .await?
            .try_collect::<Vec<Document>>()
            .await?
            .iter()
            .filter_map(|d| d.get_object_id("movie").ok())
            .collect();

        let owned_movie_ids: Vec<ObjectId> = self
            .movies()
            .clone_with_type::<Document>()
            .find(doc! { "user": user_id })
            .projection(doc! { "_id": 1 })
            .await?
            .try_collect::<Vec<Document>>()
            .await?
            .iter()
            .filter_map(|d| d.get_object_id("_id").ok())
            .collect();

        self.reviews().delete_many(doc! { "user": user_id }).await?;
        self.reviews()
            .delete_many(doc! { "movie": { "$in": owned_movie_ids.clone() } })
            .await?;
        self.movies().delete_many(doc! { "user": user_id }).await?;
        self.users().delete_one(doc! { "_id": user_id }).await?;

        for movie_id in reviewed_movie_ids {
            if !owned_movie_ids.contains(&movie_id) {
                self.recompute_movie_rating(movie_id).await?;
            }
        }

        Ok(())
    }
}
