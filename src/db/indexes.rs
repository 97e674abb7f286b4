use mongodb::{
    Database, IndexModel,
    bson::{Document, doc},
    options::IndexOptions,
};

fn unique_index(keys: Document) -> IndexModel {
    IndexModel::builder()
        .keys(keys)
        .options(IndexOptions::builder().unique(true).build())
        .build()
}

/// Create the unique indexes the application relies on. Safe to run on every
/// startup; existing indexes are left untouched.
///
/// Master-data names carry both a global unique index and a per-creator
/// compound one, mirroring the original schema (the global one is the
/// operative constraint; see DESIGN.md).
pub async fn ensure_indexes(db: &Database) -> mongodb::error::Result<()> {
    db.collection::<Document>("users")
        .create_index(unique_index(doc! { "email": 1 }))
        .await?;

    db.collection::<Document>("reviews")
        .create_index(unique_index(doc! { "movie": 1, "user": 1 }))
        .await?;

    db.collection::<Document>("genres")
        .create_index(unique_index(doc! { "name": 1 }))
        .await?;

    for coll in ["actors", "directors", "writers"] {
        let coll = db.collection::<Document>(coll);
        coll.create_index(unique_index(doc! { "name": 1 })).await?;
        coll.create_index(unique_index(doc! { "name": 1, "createdBy": 1 }))
            .await?;
    }

    Ok(())
}
