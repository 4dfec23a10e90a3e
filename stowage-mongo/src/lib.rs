//! MongoDB helpers: school and student collections, Nginx log statistics.
//!
//! Every function takes the collection to work on, so callers decide which
//! database and collection names are in play. Queries and aggregations run
//! on the server; nothing here post-processes beyond deserialization.
mod error;
mod logs;
mod schools;
mod students;

pub use error::MongoError;
pub use logs::{HTTP_METHODS, IpCount, LogStats, top_ips, top_ips_pipeline};
pub use schools::{insert_school, list_all, schools_by_topic};
pub use students::{StudentAverage, top_students, top_students_pipeline};
// re-export
pub use mongodb;

use mongodb::{Client, Database, options::ClientOptions};
use tracing::info;

/// Connect to `uri` and return a handle on `database`.
pub async fn connect(uri: &str, database: &str) -> Result<Database, MongoError> {
    let options = ClientOptions::parse(uri).await?;
    let client = Client::with_options(options)?;
    info!("MongoDB client ready, database {}", database);
    Ok(client.database(database))
}
