use futures::TryStreamExt;
use mongodb::{
    Collection, Database,
    bson::{DateTime, Document, doc, oid::ObjectId},
    options::ReturnDocument,
};
use serde::{Serialize, de::DeserializeOwned};
use validator::Validate;

use crate::dtos::{GenreDto, GenreInputDto, GenreUpdateDto, PersonDto, PersonInputDto,
    PersonUpdateDto};
use crate::error::{ApiError, is_duplicate_key};
use crate::models::{Actor, Director, Genre, Movie, Writer};
use crate::utils::query::{contains_filter, resolve_sort, skip_for};

/// Static description of a master-data collection.
///
/// Each entity declares its searchable and sortable fields up front, so the
/// repository below stays one generic implementation instead of reflecting
/// over schemas at runtime.
pub trait MasterEntity:
    Serialize + DeserializeOwned + Unpin + Send + Sync + Sized + 'static
{
    const COLLECTION: &'static str;
    /// Human-readable singular name used in messages ("Actor", "Genre", ...).
    const DISPLAY: &'static str;
    const SEARCH_FIELDS: &'static [&'static str];
    const SORT_FIELDS: &'static [&'static str];
    /// The movie field holding references to this collection; used to refuse
    /// deleting records that are still referenced.
    const MOVIE_REF_FIELD: &'static str;

    type CreateInput: DeserializeOwned + Validate + Send + 'static;
    type UpdateInput: DeserializeOwned + Validate + Send + Sync + 'static;
    type Response: Serialize + Send;

    /// Names are matched and stored in this form (genres lowercase them).
    fn normalize_name(name: &str) -> String {
        name.trim().to_string()
    }

    fn from_input(input: Self::CreateInput, created_by: ObjectId) -> Self;
    /// Minimal record used when the relationship resolver creates by name.
    fn from_name(name: &str, created_by: ObjectId) -> Self;
    /// `$set` document for an update; implementations include `updatedAt`.
    fn update_document(input: &Self::UpdateInput) -> Document;

    fn id(&self) -> Option<ObjectId>;
    fn set_id(&mut self, id: ObjectId);
    fn response(&self) -> Self::Response;
}

/// Ownership-scoped CRUD over a single master-data collection.
///
/// When `owner` is given, every lookup predicate also matches `createdBy`, so
/// records belonging to someone else answer the same NotFound as absent ids.
/// Admin callers pass `None` for global scope.
pub struct MasterDataRepo<T: Send + Sync> {
    coll: Collection<T>,
    movies: Collection<Movie>,
}

fn scoped_filter(id: ObjectId, owner: Option<ObjectId>) -> Document {
    match owner {
        Some(owner) => doc! { "_id": id, "createdBy": owner },
        None => doc! { "_id": id },
    }
}

impl<T: MasterEntity> MasterDataRepo<T> {
    pub fn new(db: &Database) -> Self {
        MasterDataRepo {
            coll: db.collection(T::COLLECTION),
            movies: db.collection("movies"),
        }
    }

    fn not_found() -> ApiError {
        ApiError::NotFound(format!("{} not found", T::DISPLAY))
    }

    fn name_conflict() -> ApiError {
        ApiError::Conflict(format!("{} with this name already exists", T::DISPLAY))
    }

    pub async fn list(
        &self,
        search: Option<&str>,
        sort: Option<&str>,
        order: Option<&str>,
        page: i64,
        limit: i64,
        owner: Option<ObjectId>,
    ) -> Result<(Vec<T>, u64), ApiError> {
        let mut filter = doc! {};
        if let Some(term) = search.map(str::trim).filter(|s| !s.is_empty()) {
            let clauses: Vec<Document> = T::SEARCH_FIELDS
                .iter()
                .map(|field| contains_filter(field, term))
                .collect();
            filter.insert("$or", clauses);
        }
        if let Some(owner) = owner {
            filter.insert("createdBy", owner);
        }

        let total = self.coll.count_documents(filter.clone()).await?;
        let items = self
            .coll
            .find(filter)
            .sort(resolve_sort(sort, order, T::SORT_FIELDS))
            .skip(skip_for(page, limit))
            .limit(limit)
            .await?
            .try_collect()
            .await?;

        Ok((items, total))
    }

    pub async fn get(&self, id: ObjectId, owner: Option<ObjectId>) -> Result<T, ApiError> {
        self.coll
            .find_one(scoped_filter(id, owner))
            .await?
            .ok_or_else(Self::not_found)
    }

    pub async fn create(
        &self,
        input: T::CreateInput,
        created_by: ObjectId,
    ) -> Result<T, ApiError> {
        let mut entity = T::from_input(input, created_by);
        let result = self.coll.insert_one(&entity).await.map_err(|e| {
            if is_duplicate_key(&e) {
                Self::name_conflict()
            } else {
                ApiError::from(e)
            }
        })?;
        if let Some(id) = result.inserted_id.as_object_id() {
            entity.set_id(id);
        }
        Ok(entity)
    }

    pub async fn update(
        &self,
        id: ObjectId,
        input: &T::UpdateInput,
        owner: Option<ObjectId>,
    ) -> Result<T, ApiError> {
        let update = doc! { "$set": T::update_document(input) };
        let updated = self
            .coll
            .find_one_and_update(scoped_filter(id, owner), update)
            .return_document(ReturnDocument::After)
            .await
            .map_err(|e| {
                if is_duplicate_key(&e) {
                    Self::name_conflict()
                } else {
                    ApiError::from(e)
                }
            })?;
        updated.ok_or_else(Self::not_found)
    }

    /// Refuses while any movie still references the record. The scoped lookup
    /// runs first so records owned by someone else still answer NotFound
    /// instead of leaking their reference count.
    pub async fn delete(&self, id: ObjectId, owner: Option<ObjectId>) -> Result<(), ApiError> {
        self.get(id, owner).await?;

        let referencing = self
            .movies
            .count_documents(doc! { T::MOVIE_REF_FIELD: id })
            .await?;
        if referencing > 0 {
            return Err(ApiError::BusinessRule(format!(
                "Cannot delete {}: referenced by {} movie(s)",
                T::DISPLAY.to_lowercase(),
                referencing
            )));
        }

        let result = self.coll.delete_one(scoped_filter(id, owner)).await?;
        if result.deleted_count == 0 {
            return Err(Self::not_found());
        }
        Ok(())
    }

    pub async fn exists(&self, id: ObjectId) -> Result<bool, ApiError> {
        let found = self
            .coll
            .clone_with_type::<Document>()
            .find_one(doc! { "_id": id })
            .projection(doc! { "_id": 1 })
            .await?;
        Ok(found.is_some())
    }

    pub async fn find_by_name(&self, name: &str) -> Result<Option<T>, ApiError> {
        let normalized = T::normalize_name(name);
        Ok(self.coll.find_one(doc! { "name": normalized }).await?)
    }

    /// Resolve a by-name reference: reuse the existing record with that name,
    /// or create a minimal one attributed to `created_by`. Losing a creation
    /// race falls back to the winner's record.
    pub async fn resolve_or_create_by_name(
        &self,
        name: &str,
        created_by: ObjectId,
    ) -> Result<ObjectId, ApiError> {
        if let Some(existing) = self.find_by_name(name).await? {
            return existing
                .id()
                .ok_or_else(|| ApiError::Internal("stored record without an id".to_string()));
        }

        let normalized = T::normalize_name(name);
        let entity = T::from_name(&normalized, created_by);
        match self.coll.insert_one(&entity).await {
            Ok(result) => result
                .inserted_id
                .as_object_id()
                .ok_or_else(|| ApiError::Internal("insert returned a non-ObjectId".to_string())),
            Err(e) if is_duplicate_key(&e) => self
                .find_by_name(name)
                .await?
                .and_then(|t| t.id())
                .ok_or_else(Self::name_conflict),
            Err(e) => Err(e.into()),
        }
    }
}

// ---------------------------------------------------------------------------
// Entity declarations
// ---------------------------------------------------------------------------

const PERSON_SEARCH_FIELDS: &[&str] = &["name", "nationality"];
const PERSON_SORT_FIELDS: &[&str] = &["name", "createdAt", "dateOfBirth"];

macro_rules! person_master_entity {
    ($model:ty, $collection:literal, $display:literal, $movie_field:literal) => {
        impl MasterEntity for $model {
            const COLLECTION: &'static str = $collection;
            const DISPLAY: &'static str = $display;
            const SEARCH_FIELDS: &'static [&'static str] = PERSON_SEARCH_FIELDS;
            const SORT_FIELDS: &'static [&'static str] = PERSON_SORT_FIELDS;
            const MOVIE_REF_FIELD: &'static str = $movie_field;

            type CreateInput = PersonInputDto;
            type UpdateInput = PersonUpdateDto;
            type Response = PersonDto;

            fn from_input(input: PersonInputDto, created_by: ObjectId) -> Self {
                let now = DateTime::now();
                Self {
                    id: None,
                    name: Self::normalize_name(&input.name),
                    bio: input.bio,
                    photo: input.photo,
                    date_of_birth: input.date_of_birth,
                    nationality: input.nationality,
                    created_by,
                    created_at: now,
                    updated_at: now,
                }
            }

            fn from_name(name: &str, created_by: ObjectId) -> Self {
                let now = DateTime::now();
                Self {
                    id: None,
                    name: name.to_string(),
                    bio: None,
                    photo: None,
                    date_of_birth: None,
                    nationality: None,
                    created_by,
                    created_at: now,
                    updated_at: now,
                }
            }

            fn update_document(input: &PersonUpdateDto) -> Document {
                let mut set = doc! { "updatedAt": DateTime::now() };
                if let Some(name) = &input.name {
                    set.insert("name", Self::normalize_name(name));
                }
                if let Some(bio) = &input.bio {
                    set.insert("bio", bio);
                }
                if let Some(photo) = &input.photo {
                    set.insert("photo", photo);
                }
                if let Some(dob) = &input.date_of_birth {
                    set.insert("dateOfBirth", dob);
                }
                if let Some(nationality) = &input.nationality {
                    set.insert("nationality", nationality);
                }
                set
            }

            fn id(&self) -> Option<ObjectId> {
                self.id
            }

            fn set_id(&mut self, id: ObjectId) {
                self.id = Some(id);
            }

            fn response(&self) -> PersonDto {
                PersonDto::from(self)
            }
        }
    };
}

person_master_entity!(Actor, "actors", "Actor", "cast");
person_master_entity!(Director, "directors", "Director", "director");
person_master_entity!(Writer, "writers", "Writer", "writers");

impl MasterEntity for Genre {
    const COLLECTION: &'static str = "genres";
    const DISPLAY: &'static str = "Genre";
    const SEARCH_FIELDS: &'static [&'static str] = &["name", "description"];
    const SORT_FIELDS: &'static [&'static str] = &["name", "createdAt"];
    const MOVIE_REF_FIELD: &'static str = "genres";

    type CreateInput = GenreInputDto;
    type UpdateInput = GenreUpdateDto;
    type Response = GenreDto;

    fn normalize_name(name: &str) -> String {
        name.trim().to_lowercase()
    }

    fn from_input(input: GenreInputDto, created_by: ObjectId) -> Self {
        let now = DateTime::now();
        Genre {
            id: None,
            name: Self::normalize_name(&input.name),
            description: input.description,
            created_by,
            created_at: now,
            updated_at: now,
        }
    }

    fn from_name(name: &str, created_by: ObjectId) -> Self {
        let now = DateTime::now();
        Genre {
            id: None,
            name: name.to_string(),
            description: None,
            created_by,
            created_at: now,
            updated_at: now,
        }
    }

    fn update_document(input: &GenreUpdateDto) -> Document {
        let mut set = doc! { "updatedAt": DateTime::now() };
        if let Some(name) = &input.name {
            set.insert("name", Self::normalize_name(name));
        }
        if let Some(description) = &input.description {
            set.insert("description", description);
        }
        set
    }

    fn id(&self) -> Option<ObjectId> {
        self.id
    }

    fn set_id(&mut self, id: ObjectId) {
        self.id = Some(id);
    }

    fn response(&self) -> GenreDto {
        GenreDto::from(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn genre_names_are_lowercased() {
        assert_eq!(Genre::normalize_name("  Science Fiction "), "science fiction");
        let genre = Genre::from_input(
            GenreInputDto {
                name: "Drama".to_string(),
                description: None,
            },
            ObjectId::new(),
        );
        assert_eq!(genre.name, "drama");
    }

    #[test]
    fn person_names_keep_case() {
        assert_eq!(Actor::normalize_name(" Jodie Foster "), "Jodie Foster");
    }

    #[test]
    fn update_document_skips_absent_fields() {
        let set = Actor::update_document(&PersonUpdateDto {
            name: Some("New Name".to_string()),
            ..Default::default()
        });
        assert_eq!(set.get_str("name").unwrap(), "New Name");
        assert!(set.get("bio").is_none());
        assert!(set.get("updatedAt").is_some());
    }

    #[test]
    fn movie_ref_fields_match_schema() {
        assert_eq!(Actor::MOVIE_REF_FIELD, "cast");
        assert_eq!(Director::MOVIE_REF_FIELD, "director");
        assert_eq!(Writer::MOVIE_REF_FIELD, "writers");
        assert_eq!(Genre::MOVIE_REF_FIELD, "genres");
    }
}
