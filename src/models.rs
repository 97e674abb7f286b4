use mongodb::bson::{DateTime, oid::ObjectId};
use serde::{Deserialize, Serialize};

/// Role stored on the user document. Admin bypasses ownership scoping everywhere.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    User,
}

impl UserRole {
    pub fn to_str(&self) -> &str {
        match self {
            UserRole::Admin => "admin",
            UserRole::User => "user",
        }
    }
}

/// Placeholder avatar for users and people without an uploaded picture.
pub fn generated_avatar(name: &str) -> String {
    format!(
        "https://ui-avatars.com/api/?name={}&background=random",
        name.trim().replace(' ', "+")
    )
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    /// Stored lowercased so the unique index is case-insensitive in practice.
    pub email: String,
    pub username: String,
    pub password: String,
    pub profile_pic: String,
    pub role: UserRole,
    pub is_active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_login: Option<DateTime>,
    /// Ordered movie references; duplicates are permitted.
    #[serde(default)]
    pub favorites: Vec<ObjectId>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Movie {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub title: String,
    pub year: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    pub poster: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hero_image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trailer: Option<String>,
    #[serde(default)]
    pub gallery: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub director: ObjectId,
    #[serde(default)]
    pub writers: Vec<ObjectId>,
    #[serde(default)]
    pub cast: Vec<ObjectId>,
    #[serde(default)]
    pub genres: Vec<ObjectId>,
    /// Owner. The sole authorization boundary for non-admin mutation.
    pub user: ObjectId,
    /// Materialized cache, recomputed from reviews after every review mutation.
    #[serde(default)]
    pub average_rating: f64,
    #[serde(default)]
    pub total_reviews: i64,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ReportEntry {
    pub user: ObjectId,
    pub reason: String,
    pub reported_at: DateTime,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub movie: ObjectId,
    pub user: ObjectId,
    pub rating: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default)]
    pub likes: Vec<ObjectId>,
    #[serde(default)]
    pub is_edited: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edited_at: Option<DateTime>,
    #[serde(default)]
    pub is_reported: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_reason: Option<String>,
    #[serde(default)]
    pub reported_by: Vec<ReportEntry>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

// Actor, Director and Writer share one document shape but live in separate
// collections, so each gets its own type.
macro_rules! person_model {
    ($name:ident) => {
        #[derive(Debug, Deserialize, Serialize, Clone)]
        #[serde(rename_all = "camelCase")]
        pub struct $name {
            #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
            pub id: Option<ObjectId>,
            pub name: String,
            #[serde(skip_serializing_if = "Option::is_none")]
            pub bio: Option<String>,
            #[serde(skip_serializing_if = "Option::is_none")]
            pub photo: Option<String>,
            #[serde(skip_serializing_if = "Option::is_none")]
            pub date_of_birth: Option<String>,
            #[serde(skip_serializing_if = "Option::is_none")]
            pub nationality: Option<String>,
            pub created_by: ObjectId,
            pub created_at: DateTime,
            pub updated_at: DateTime,
        }

        impl $name {
            /// Uploaded photo, or a generated avatar when none is set.
            pub fn photo_url(&self) -> String {
                self.photo
                    .clone()
                    .unwrap_or_else(|| generated_avatar(&self.name))
            }
        }
    };
}

person_model!(Actor);
person_model!(Director);
person_model!(Writer);

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Genre {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    /// Normalized to lowercase before persisting.
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_by: ObjectId,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn avatar_url_replaces_spaces() {
        assert_eq!(
            generated_avatar("Jane Doe"),
            "https://ui-avatars.com/api/?name=Jane+Doe&background=random"
        );
    }

    #[test]
    fn photo_url_falls_back_to_avatar() {
        let actor = Actor {
            id: None,
            name: "Ed Harris".to_string(),
            bio: None,
            photo: None,
            date_of_birth: None,
            nationality: None,
            created_by: ObjectId::new(),
            created_at: DateTime::now(),
            updated_at: DateTime::now(),
        };
        assert!(actor.photo_url().starts_with("https://ui-avatars.com/"));

        let with_photo = Actor {
            photo: Some("https://example.com/ed.jpg".to_string()),
            ..actor
        };
        assert_eq!(with_photo.photo_url(), "https://example.com/ed.jpg");
    }
}
