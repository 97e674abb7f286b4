use mongodb::{Collection, Database};

use crate::models::{Movie, Review, User};

pub mod indexes;

mod master_data;
pub use master_data::{MasterDataRepo, MasterEntity};

mod user;
pub use user::UserExt;

mod movie;
pub use movie::{MovieExt, MovieListQuery};

mod review;
pub use review::ReviewExt;

mod stats;
pub use stats::StatsExt;

/// Handle to the document store. Cloning is cheap; the underlying driver
/// client is created once in main and reused for every request.
#[derive(Debug, Clone)]
pub struct DBClient {
    db: Database,
}

impl DBClient {
    pub fn new(db: Database) -> Self {
        DBClient { db }
    }

    pub(crate) fn users(&self) -> Collection<User> {
        self.db.collection("users")
    }

    pub(crate) fn movies(&self) -> Collection<Movie> {
        self.db.collection("movies")
    }

    pub(crate) fn reviews(&self) -> Collection<Review> {
        self.db.collection("reviews")
    }

    /// Typed repository over one of the master-data collections.
    pub fn master<T: MasterEntity>(&self) -> MasterDataRepo<T> {
        MasterDataRepo::new(&self.db)
    }

    pub(crate) fn database(&self) -> &Database {
        &self.db
    }
}
