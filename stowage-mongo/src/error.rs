use thiserror::Error;

#[derive(Error, Debug)]
pub enum MongoError {
    #[error("MongoDB error: {0}")]
    Mongo(#[from] mongodb::error::Error),

    #[error("MongoDB deserialization error: {0}")]
    BsonDe(#[from] mongodb::bson::de::Error),
}
