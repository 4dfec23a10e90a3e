use futures::TryStreamExt;
use mongodb::{
    Collection,
    bson::{Bson, Document, doc},
};
use tracing::debug;

use crate::MongoError;

/// Every document in the collection; empty when there are none.
pub async fn list_all(
    collection: &Collection<Document>,
) -> Result<Vec<Document>, MongoError> {
    let cursor = collection.find(doc! {}).await?;
    Ok(cursor.try_collect().await?)
}

/// Insert `fields` as a new document and return its `_id`.
pub async fn insert_school(
    collection: &Collection<Document>,
    fields: Document,
) -> Result<Bson, MongoError> {
    let result = collection.insert_one(fields).await?;
    debug!("Inserted school {}", result.inserted_id);
    Ok(result.inserted_id)
}

/// Schools whose `topics` array contains `topic`.
pub async fn schools_by_topic(
    collection: &Collection<Document>,
    topic: &str,
) -> Result<Vec<Document>, MongoError> {
    let cursor = collection.find(doc! { "topics": topic }).await?;
    Ok(cursor.try_collect().await?)
}
